//! The structured JSON encoding of a menu rate.
//!
//! The tree carries every number the aggregator produced — eight per
//! trigger, four menu totals, and the frozen trigger snapshots — so a rate
//! written here reloads bit-for-bit identical.

use crate::Result;
use std::io::{Read, Write};
use tr_common::MenuRate;

pub fn write_json(writer: &mut dyn Write, rate: &MenuRate) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, rate)?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub fn read_json(reader: impl Read) -> Result<MenuRate> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_common::{ParameterValue, TriggerRate, TriggerSnapshot};

    fn sample_rate() -> MenuRate {
        MenuRate {
            total_fraction: 0.4,
            total_fraction_error: 0.02,
            total_rate: 40_000.0,
            total_rate_error: 2_000.0,
            trigger_rates: vec![TriggerRate {
                trigger: TriggerSnapshot {
                    name: "SingleJet".into(),
                    version: 0,
                    parameters: vec![
                        ParameterValue {
                            name: "threshold1".into(),
                            value: 74.5,
                        },
                        ParameterValue {
                            name: "etaCut".into(),
                            value: 3.0,
                        },
                    ],
                    thresholds: vec!["threshold1".into()],
                },
                fraction: 0.25,
                fraction_error: 0.01,
                rate: 25_000.0,
                rate_error: 1_000.0,
                pure_fraction: 0.1,
                pure_fraction_error: 0.005,
                pure_rate: 10_000.0,
                pure_rate_error: 500.0,
            }],
        }
    }

    #[test]
    fn roundtrip_is_lossless() {
        let rate = sample_rate();
        let mut buffer = Vec::new();
        write_json(&mut buffer, &rate).unwrap();

        let reloaded = read_json(buffer.as_slice()).unwrap();
        assert_eq!(reloaded, rate);
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(read_json(&b"{]"[..]).is_err());
    }
}
