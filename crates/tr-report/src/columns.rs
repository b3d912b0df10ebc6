//! The legacy columnar encodings.
//!
//! One row per trigger: name, up to four thresholds, rate, rate error,
//! pure rate, pure rate error; then the summary totals. The fixed-width
//! form pads columns for alignment; the CSV form separates the same
//! columns with commas. Both are write-only — the JSON tree is the
//! encoding that reloads.

use crate::Result;
use std::io::Write;
use tr_common::MenuRate;

/// Number of threshold columns in the legacy layout.
const THRESHOLD_COLUMNS: usize = 4;

pub fn write_table(writer: &mut dyn Write, rate: &MenuRate) -> Result<()> {
    writeln!(
        writer,
        "{:<22} {:>9} {:>9} {:>9} {:>9} {:>14} {:>12} {:>12} {:>12}",
        "trigger",
        "thresh1",
        "thresh2",
        "thresh3",
        "thresh4",
        "rate",
        "rateErr",
        "pureRate",
        "pureRateErr"
    )?;

    for trigger_rate in &rate.trigger_rates {
        let thresholds = trigger_rate.trigger.threshold_values();
        write!(writer, "{:<22}", trigger_rate.trigger.name)?;
        for column in 0..THRESHOLD_COLUMNS {
            match thresholds.get(column) {
                Some(value) => write!(writer, " {value:>9.3}")?,
                None => write!(writer, " {:>9}", "")?,
            }
        }
        writeln!(
            writer,
            " {:>14.4} {:>12.4} {:>12.4} {:>12.4}",
            trigger_rate.rate,
            trigger_rate.rate_error,
            trigger_rate.pure_rate,
            trigger_rate.pure_rate_error
        )?;
    }

    writeln!(writer, "{}", "-".repeat(110))?;
    writeln!(
        writer,
        " Total rate (with overlaps)    = {:>12.4} +/- {:.4} Hz",
        rate.total_rate, rate.total_rate_error
    )?;
    writeln!(
        writer,
        " Total rate (without overlaps) = {:>12.4} Hz",
        rate.rate_without_overlaps()
    )?;
    writeln!(
        writer,
        " Total rate (pure triggers)    = {:>12.4} Hz",
        rate.pure_rate_total()
    )?;
    Ok(())
}

pub fn write_csv(writer: &mut dyn Write, rate: &MenuRate) -> Result<()> {
    writeln!(
        writer,
        "trigger,threshold1,threshold2,threshold3,threshold4,rate,rate_error,pure_rate,pure_rate_error"
    )?;

    for trigger_rate in &rate.trigger_rates {
        let thresholds = trigger_rate.trigger.threshold_values();
        write!(writer, "{}", trigger_rate.trigger.name)?;
        for column in 0..THRESHOLD_COLUMNS {
            match thresholds.get(column) {
                Some(value) => write!(writer, ",{value}")?,
                None => write!(writer, ",")?,
            }
        }
        writeln!(
            writer,
            ",{},{},{},{}",
            trigger_rate.rate,
            trigger_rate.rate_error,
            trigger_rate.pure_rate,
            trigger_rate.pure_rate_error
        )?;
    }

    writeln!(
        writer,
        "total_with_overlaps,,,,,{},{},,",
        rate.total_rate, rate.total_rate_error
    )?;
    writeln!(
        writer,
        "total_without_overlaps,,,,,{},,,",
        rate.rate_without_overlaps()
    )?;
    writeln!(writer, "total_pure,,,,,{},,,", rate.pure_rate_total())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_common::{ParameterValue, TriggerRate, TriggerSnapshot};

    fn rate_with(names: &[(&str, &[f64])]) -> MenuRate {
        MenuRate {
            total_fraction: 0.5,
            total_fraction_error: 0.05,
            total_rate: 500.0,
            total_rate_error: 50.0,
            trigger_rates: names
                .iter()
                .map(|(name, thresholds)| TriggerRate {
                    trigger: TriggerSnapshot {
                        name: name.to_string(),
                        version: 0,
                        parameters: thresholds
                            .iter()
                            .enumerate()
                            .map(|(index, &value)| ParameterValue {
                                name: format!("threshold{}", index + 1),
                                value,
                            })
                            .collect(),
                        thresholds: (0..thresholds.len())
                            .map(|index| format!("threshold{}", index + 1))
                            .collect(),
                    },
                    fraction: 0.3,
                    fraction_error: 0.03,
                    rate: 300.0,
                    rate_error: 30.0,
                    pure_fraction: 0.1,
                    pure_fraction_error: 0.01,
                    pure_rate: 100.0,
                    pure_rate_error: 10.0,
                })
                .collect(),
        }
    }

    #[test]
    fn table_has_one_row_per_trigger_plus_totals() {
        let rate = rate_with(&[("SingleJet", &[32.0]), ("DoubleJet", &[40.0, 24.0])]);
        let mut buffer = Vec::new();
        write_table(&mut buffer, &rate).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("SingleJet"));
        assert!(text.contains("DoubleJet"));
        assert!(text.contains("Total rate (with overlaps)"));
        assert!(text.contains("Total rate (pure triggers)"));
        // Header + 2 triggers + separator + 3 totals.
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn csv_pads_missing_threshold_columns() {
        let rate = rate_with(&[("SingleJet", &[32.0])]);
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &rate).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let row = text
            .lines()
            .find(|line| line.starts_with("SingleJet"))
            .unwrap();
        // name + 4 thresholds + 4 rate numbers = 9 fields.
        assert_eq!(row.split(',').count(), 9);
        assert!(row.starts_with("SingleJet,32,,,"));
    }

    #[test]
    fn totals_without_overlaps_sum_trigger_rates() {
        let rate = rate_with(&[("A", &[1.0]), ("B", &[2.0])]);
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &rate).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("total_without_overlaps,,,,,600,"));
    }
}
