//! Human-readable report rendering.
//!
//! Pure presentation of a computed [`MenuRate`]: one aligned row per
//! trigger with rate ± error and pure rate ± error, then the summary
//! totals. Nothing here computes anything.

use crate::Result;
use std::io::Write;
use tr_common::MenuRate;

pub fn dump_trigger_rates(writer: &mut dyn Write, rate: &MenuRate) -> Result<()> {
    for trigger_rate in &rate.trigger_rates {
        write!(writer, "{:<22}", trigger_rate.trigger.name)?;
        let thresholds = trigger_rate.trigger.threshold_values();
        for column in 0..4 {
            match thresholds.get(column) {
                Some(value) => write!(writer, " {value:>8.2}")?,
                None => write!(writer, " {:>8}", "-")?,
            }
        }
        writeln!(
            writer,
            "  rate {:>12.2} +/- {:>9.2} Hz  pure {:>12.2} +/- {:>9.2} Hz",
            trigger_rate.rate,
            trigger_rate.rate_error,
            trigger_rate.pure_rate,
            trigger_rate.pure_rate_error
        )?;
    }

    writeln!(writer, "{}", "-".repeat(100))?;
    writeln!(
        writer,
        " Total rate (with overlaps)    = {:>12.2} +/- {:.2} Hz",
        rate.total_rate, rate.total_rate_error
    )?;
    writeln!(
        writer,
        " Total rate (without overlaps) = {:>12.2} Hz",
        rate.rate_without_overlaps()
    )?;
    writeln!(
        writer,
        " Total rate (pure triggers)    = {:>12.2} Hz",
        rate.pure_rate_total()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_common::{TriggerRate, TriggerSnapshot};

    #[test]
    fn renders_rows_and_totals() {
        let rate = MenuRate {
            total_fraction: 0.1,
            total_fraction_error: 0.01,
            total_rate: 100.0,
            total_rate_error: 10.0,
            trigger_rates: vec![TriggerRate {
                trigger: TriggerSnapshot {
                    name: "MissingEnergy".into(),
                    version: 0,
                    parameters: vec![],
                    thresholds: vec![],
                },
                fraction: 0.1,
                fraction_error: 0.01,
                rate: 100.0,
                rate_error: 10.0,
                pure_fraction: 0.1,
                pure_fraction_error: 0.01,
                pure_rate: 100.0,
                pure_rate_error: 10.0,
            }],
        };

        let mut buffer = Vec::new();
        dump_trigger_rates(&mut buffer, &rate).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("MissingEnergy"));
        assert!(text.contains("+/-"));
        assert!(text.contains("Total rate (without overlaps)"));
    }
}
