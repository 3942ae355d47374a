//! Deterministic synthetic loan portfolio shared by the integration tests

#![allow(dead_code)]

use survival_forecast::ObservationRecord;

/// Payment hazard rising from 2% towards 6% as loans season
pub fn payment_curve(age: u32) -> f64 {
    0.02 + 0.04 * (1.0 - (-(age as f64) / 6.0).exp())
}

/// Charge-off hazard peaking around month 12
pub fn chargeoff_curve(age: u32) -> f64 {
    let x = age as f64 - 12.0;
    0.002 + 0.006 * (-(x * x) / 72.0).exp()
}

/// One segment's history with rates scaled by `payment_scale` / `chargeoff_scale`
pub fn synthetic_segment(
    segment_id: &str,
    origination: f64,
    months: u32,
    payment_scale: f64,
    chargeoff_scale: f64,
) -> Vec<ObservationRecord> {
    let mut balance = origination;
    (0..months)
        .map(|age| {
            let payment = balance * payment_curve(age) * payment_scale;
            let chargeoff = balance * chargeoff_curve(age) * chargeoff_scale;
            let record = ObservationRecord::actual(segment_id, age, balance, payment, chargeoff);
            balance = record.ending_balance;
            record
        })
        .collect()
}

/// Quarterly vintages observed for 48, 45, 42, ... months (the censored triangle)
pub fn portfolio() -> Vec<ObservationRecord> {
    let tiers = [
        ("Prime", 10_000_000.0, 1.10, 0.6),
        ("Near_Prime", 6_000_000.0, 1.00, 1.0),
        ("Subprime", 3_000_000.0, 0.85, 1.8),
    ];

    let mut records = Vec::new();
    for (q, quarter) in ["2020Q1", "2020Q2", "2020Q3", "2020Q4"].iter().enumerate() {
        for (tier, origination, pay, co) in tiers {
            let id = format!("{tier}_{quarter}");
            let months = 48 - 3 * q as u32;
            records.extend(synthetic_segment(&id, origination, months, pay, co));
        }
    }
    records
}
