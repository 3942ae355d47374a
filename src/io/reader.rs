//! Load observation records from CSV and model config from JSON

use serde::{Deserialize, Deserializer};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use super::error::LoadError;
use crate::config::ModelConfig;
use crate::segment::ObservationRecord;

/// Raw CSV row; accepts both the record field names and the report column names
#[derive(Debug, Deserialize)]
struct CsvRow {
    segment_id: String,
    month_on_book: u32,
    #[serde(alias = "outstanding_balance")]
    beginning_balance: Option<f64>,
    #[serde(alias = "payments")]
    payment_amount: Option<f64>,
    #[serde(alias = "chargeoffs")]
    chargeoff_amount: Option<f64>,
    #[serde(default)]
    ending_balance: Option<f64>,
    #[serde(default, deserialize_with = "flag")]
    is_actual: Option<bool>,
}

impl CsvRow {
    /// Blank amounts become NaN so the validator reports them against the record
    fn into_record(self) -> ObservationRecord {
        let beginning_balance = self.beginning_balance.unwrap_or(f64::NAN);
        let payment_amount = self.payment_amount.unwrap_or(f64::NAN);
        let chargeoff_amount = self.chargeoff_amount.unwrap_or(f64::NAN);
        let ending_balance = self
            .ending_balance
            .unwrap_or(beginning_balance - payment_amount - chargeoff_amount);

        ObservationRecord {
            segment_id: self.segment_id.trim().to_string(),
            month_on_book: self.month_on_book,
            beginning_balance,
            payment_amount,
            chargeoff_amount,
            ending_balance,
            is_actual: self.is_actual.unwrap_or(true),
        }
    }
}

fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(Some(true)),
            "false" | "f" | "no" | "n" | "0" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("invalid is_actual flag: {other}"))),
        },
    }
}

/// Parse observation records from any CSV source with a header row
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<ObservationRecord>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let row: CsvRow = result?;
        records.push(row.into_record());
    }
    Ok(records)
}

/// Load observation records from a CSV file
pub fn load_observations(path: &Path) -> Result<Vec<ObservationRecord>, LoadError> {
    read_observations(File::open(path)?)
}

/// Load and validate a JSON model config
pub fn load_config(path: &Path) -> Result<ModelConfig, LoadError> {
    let text = fs::read_to_string(path)?;
    let config: ModelConfig = serde_json::from_str(&text)?;
    config.validate().map_err(LoadError::Config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{DataValidator, IssueCode};

    #[test]
    fn test_reads_report_column_names() {
        let csv = "\
segment_id,month_on_book,outstanding_balance,payments,chargeoffs
Prime_2021Q1,0,1000000,20000,5000
Prime_2021Q1,1,975000,19500,4875
";
        let records = read_observations(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ending_balance, 975_000.0);
        assert!(records[1].is_actual);
    }

    #[test]
    fn test_blank_cell_is_reported_as_missing() {
        let csv = "\
segment_id,month_on_book,beginning_balance,payment_amount,chargeoff_amount,ending_balance,is_actual
A,0,1000,,10,,true
A,1,990,50,5,935,false
";
        let records = read_observations(csv.as_bytes()).unwrap();

        assert!(records[0].payment_amount.is_nan());
        assert!(!records[1].is_actual);

        let report = DataValidator::default().validate(&records);
        assert_eq!(report.count(IssueCode::MissingField), 1);
        assert_eq!(report.issues[0].record_index, 0);
    }

    #[test]
    fn test_load_config_validates() {
        let dir = std::env::temp_dir();
        let good = dir.join(format!("survival_forecast_cfg_ok_{}.json", std::process::id()));
        let bad = dir.join(format!("survival_forecast_cfg_bad_{}.json", std::process::id()));
        fs::write(&good, r#"{"ramp_months": 9}"#).unwrap();
        fs::write(&bad, r#"{"smoothing_window": 0}"#).unwrap();

        assert_eq!(load_config(&good).unwrap().ramp_months, 9);
        assert!(matches!(load_config(&bad), Err(LoadError::Config(_))));

        fs::remove_file(good).unwrap();
        fs::remove_file(bad).unwrap();
    }

    #[test]
    fn test_rejects_bad_flag() {
        let csv = "\
segment_id,month_on_book,beginning_balance,payment_amount,chargeoff_amount,is_actual
A,0,1000,10,10,maybe
";
        assert!(matches!(read_observations(csv.as_bytes()), Err(LoadError::Csv(_))));
    }
}
