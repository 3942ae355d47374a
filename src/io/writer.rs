//! CSV writers for forecasts and trained curves

use serde::Serialize;
use std::io::Write;

use super::error::LoadError;
use crate::curve::HazardCurve;
use crate::forecast::{ForecastResult, Provenance};

#[derive(Debug, Serialize)]
struct ForecastCsvRow<'a> {
    segment_id: &'a str,
    month_on_book: u32,
    beginning_balance: f64,
    payment_amount: f64,
    chargeoff_amount: f64,
    ending_balance: f64,
    outstanding_balance_ratio: f64,
    payments_ratio: f64,
    chargeoffs_ratio: f64,
    payment_hazard_rate: f64,
    chargeoff_hazard_rate: f64,
    provenance: Provenance,
}

/// Write every segment's forecast as one long table
pub fn write_forecast_csv<W: Write>(writer: W, results: &[ForecastResult]) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_writer(writer);

    for result in results {
        let rows = result.output_rows()?;
        for (record, row) in result.records.iter().zip(rows) {
            wtr.serialize(ForecastCsvRow {
                segment_id: &result.segment_id,
                month_on_book: record.month_on_book,
                beginning_balance: record.beginning_balance,
                payment_amount: record.payment_amount,
                chargeoff_amount: record.chargeoff_amount,
                ending_balance: record.ending_balance,
                outstanding_balance_ratio: row.outstanding_balance_ratio,
                payments_ratio: row.payments_ratio,
                chargeoffs_ratio: row.chargeoffs_ratio,
                payment_hazard_rate: row.payment_hazard_rate,
                chargeoff_hazard_rate: row.chargeoff_hazard_rate,
                provenance: row.provenance,
            })?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Write a trained curve, one row per age
pub fn write_curve_csv<W: Write>(writer: W, curve: &HazardCurve) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for point in curve.points() {
        wtr.serialize(point)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtrapolationPolicy;
    use crate::curve::HazardRates;
    use crate::forecast::ForecastRecord;

    #[test]
    fn test_forecast_csv_layout() {
        let curve = HazardCurve::from_rates(&[HazardRates::new(0.1, 0.0)], ExtrapolationPolicy::Constant).unwrap();
        let mut result = ForecastResult::new("A", curve.version(), 1_000.0);
        result.add_record(ForecastRecord {
            month_on_book: 0,
            beginning_balance: 1_000.0,
            payment_amount: 100.0,
            chargeoff_amount: 0.0,
            ending_balance: 900.0,
            provenance: Provenance::Forecast,
        });

        let mut buf = Vec::new();
        write_forecast_csv(&mut buf, &[result]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert!(lines.next().unwrap().starts_with("segment_id,month_on_book,beginning_balance"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("A,0,1000.0,100.0,0.0,900.0,1.0,0.1,"));
        assert!(row.ends_with(",Forecast"));
    }

    #[test]
    fn test_curve_csv_has_one_row_per_age() {
        let rates = [HazardRates::new(0.05, 0.01); 4];
        let curve = HazardCurve::from_rates(&rates, ExtrapolationPolicy::Constant).unwrap();

        let mut buf = Vec::new();
        write_curve_csv(&mut buf, &curve).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().nth(1).unwrap().contains("Supplied"));
    }
}
