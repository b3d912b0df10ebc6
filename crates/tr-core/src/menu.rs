//! Trigger menus and menu-file loading.
//!
//! A menu is an ordered sequence of independent triggers; the order affects
//! reporting only, never computation. Menus load from two encodings:
//!
//! - The legacy whitespace table, one row per trigger:
//!   `name version threshold1 threshold2 threshold3 threshold4
//!   requested_rate locked`, with `-1` padding unused threshold columns,
//!   `#` starting a comment, and blank lines ignored. Malformed lines are
//!   logged and skipped, matching how historical menu tables were consumed.
//! - A JSON tree mirroring [`MenuEntryRecord`].
//!
//! Requested rates are absolute; the fitter normalizes them into bandwidth
//! fractions across the scalable (unlocked) triggers at load time.

use crate::trigger::{Trigger, TriggerRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tr_common::{Error, Result};
use tracing::warn;

/// An ordered sequence of independent triggers.
#[derive(Debug, Clone, Default)]
pub struct TriggerMenu {
    triggers: Vec<Trigger>,
}

impl TriggerMenu {
    pub fn new() -> Self {
        TriggerMenu::default()
    }

    pub fn add_trigger(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn trigger(&self, index: usize) -> &Trigger {
        &self.triggers[index]
    }

    pub fn trigger_mut(&mut self, index: usize) -> &mut Trigger {
        &mut self.triggers[index]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trigger> {
        self.triggers.iter()
    }
}

/// One menu trigger plus its fitter bookkeeping.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub trigger: Trigger,
    /// Requested absolute rate in Hz; the fitter normalizes these.
    pub requested_rate: f64,
    /// Locked triggers keep their thresholds; they still count toward the
    /// menu total.
    pub locked: bool,
}

/// JSON form of one menu entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEntryRecord {
    pub name: String,
    /// Omitted means "latest registered version".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Parameter overrides applied on top of the kind defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, f64>,
    #[serde(default)]
    pub requested_rate: f64,
    #[serde(default)]
    pub locked: bool,
}

/// JSON form of a whole menu file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuRecord {
    pub triggers: Vec<MenuEntryRecord>,
}

/// Build a menu from loaded entries, preserving order.
pub fn menu_from_entries(entries: &[MenuEntry]) -> TriggerMenu {
    let mut menu = TriggerMenu::new();
    for entry in entries {
        menu.add_trigger(entry.trigger.clone());
    }
    menu
}

/// Load a menu file, choosing the encoding from the extension
/// (`.json` is the JSON tree, everything else the legacy table).
pub fn load_menu_file(path: &Path, registry: &TriggerRegistry) -> Result<Vec<MenuEntry>> {
    let file = File::open(path).map_err(|error| Error::InvalidMenu {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    let reader = BufReader::new(file);

    let is_json = path
        .extension()
        .map(|extension| extension == "json")
        .unwrap_or(false);

    let result = if is_json {
        load_menu_json(reader, registry)
    } else {
        load_menu_table(reader, registry)
    };

    result.map_err(|error| match error {
        Error::InvalidMenu { message, .. } => Error::InvalidMenu {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Load the legacy whitespace table. Malformed lines are logged and
/// skipped; an empty result is a configuration error.
pub fn load_menu_table(reader: impl Read, registry: &TriggerRegistry) -> Result<Vec<MenuEntry>> {
    let mut entries = Vec::new();

    for (line_number, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        match parse_table_line(content, registry) {
            Ok(entry) => entries.push(entry),
            Err(error) => {
                warn!(
                    line = line_number + 1,
                    %error,
                    "skipping malformed menu line"
                );
            }
        }
    }

    if entries.is_empty() {
        return Err(Error::InvalidMenu {
            path: Default::default(),
            message: "no usable trigger lines".to_string(),
        });
    }
    Ok(entries)
}

fn parse_table_line(line: &str, registry: &TriggerRegistry) -> Result<MenuEntry> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() != 8 {
        return Err(Error::Config(format!(
            "menu line has {} columns, expected 8",
            columns.len()
        )));
    }

    let name = columns[0];
    let version: u32 = parse_number(columns[1])?;
    let mut trigger = registry.exact(name, version)?;

    // Threshold columns beyond what the trigger has must be -1 padding.
    let threshold_names = trigger.threshold_names();
    for (position, column) in columns[2..6].iter().enumerate() {
        let value: f64 = parse_number(column)?;
        match threshold_names.get(position) {
            Some(threshold_name) => trigger.set_parameter(threshold_name, value)?,
            None if value < 0.0 => {}
            None => {
                return Err(Error::Config(format!(
                    "trigger {name} has {} thresholds but column {} holds {value}",
                    threshold_names.len(),
                    position + 3,
                )))
            }
        }
    }

    let requested_rate: f64 = parse_number(columns[6])?;
    let locked = parse_number::<f64>(columns[7])? != 0.0;

    Ok(MenuEntry {
        trigger,
        requested_rate,
        locked,
    })
}

fn parse_number<T: std::str::FromStr>(column: &str) -> Result<T> {
    column
        .parse()
        .map_err(|_| Error::Config(format!("cannot parse {column:?} as a number")))
}

/// Load the JSON tree encoding.
pub fn load_menu_json(reader: impl Read, registry: &TriggerRegistry) -> Result<Vec<MenuEntry>> {
    let record: MenuRecord = serde_json::from_reader(reader)?;

    let mut entries = Vec::new();
    for entry_record in &record.triggers {
        let mut trigger = match entry_record.version {
            Some(version) => registry.exact(&entry_record.name, version)?,
            None => registry.latest(&entry_record.name)?,
        };
        for (parameter, value) in &entry_record.parameters {
            trigger.set_parameter(parameter, *value)?;
        }
        entries.push(MenuEntry {
            trigger,
            requested_rate: entry_record.requested_rate,
            locked: entry_record.locked,
        });
    }
    Ok(entries)
}

/// Write entries in the legacy table encoding.
pub fn write_menu_table(mut writer: impl Write, entries: &[MenuEntry]) -> Result<()> {
    writeln!(
        writer,
        "# name                 version  threshold1 threshold2 threshold3 threshold4 requested_rate locked"
    )?;
    for entry in entries {
        let trigger = &entry.trigger;
        write!(writer, "{:<22} {:<8}", trigger.name(), trigger.version())?;
        for position in 0..4 {
            let value = trigger
                .threshold_names()
                .get(position)
                .and_then(|name| trigger.try_parameter(name))
                .unwrap_or(-1.0);
            write!(writer, " {value:<10.4}")?;
        }
        writeln!(
            writer,
            " {:<14.4} {}",
            entry.requested_rate,
            if entry.locked { 1 } else { 0 }
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_roundtrip() {
        let registry = TriggerRegistry::standard();
        let table = "\
# a comment line
SingleJet    0   32.0  -1  -1  -1   5000.0  0
JetMuon      0   40.0  8.0 -1  -1   1500.0  1
";
        let entries = load_menu_table(table.as_bytes(), &registry).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].trigger.parameter("threshold1").unwrap(), 32.0);
        assert!(!entries[0].locked);
        assert!(entries[1].locked);
        assert_eq!(
            entries[1].trigger.parameter("leg2threshold1").unwrap(),
            8.0
        );

        let mut written = Vec::new();
        write_menu_table(&mut written, &entries).unwrap();
        let reloaded = load_menu_table(written.as_slice(), &registry).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded[1].trigger.parameter("leg1threshold1").unwrap(),
            40.0
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let registry = TriggerRegistry::standard();
        let table = "\
SingleJet    0   32.0  -1  -1  -1   5000.0  0
NoSuchTrigger 0  10.0  -1  -1  -1   1000.0  0
not even close
SingleMuon   1   14.0  -1  -1  -1   2000.0  0
";
        let entries = load_menu_table(table.as_bytes(), &registry).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].trigger.name(), "SingleMuon");
    }

    #[test]
    fn all_lines_malformed_is_an_error() {
        let registry = TriggerRegistry::standard();
        let result = load_menu_table(&b"garbage line\n"[..], &registry);
        assert!(matches!(result, Err(Error::InvalidMenu { .. })));
    }

    #[test]
    fn json_menu_applies_overrides_and_latest_version() {
        let registry = TriggerRegistry::standard();
        let json = r#"{
            "triggers": [
                {"name": "SingleMuon", "parameters": {"threshold1": 14.0},
                 "requested_rate": 2000.0},
                {"name": "SingleMuon", "version": 0, "locked": true}
            ]
        }"#;
        let entries = load_menu_json(json.as_bytes(), &registry).unwrap();
        assert_eq!(entries[0].trigger.version(), 1);
        assert_eq!(entries[0].trigger.parameter("threshold1").unwrap(), 14.0);
        assert_eq!(entries[1].trigger.version(), 0);
        assert!(entries[1].locked);
    }

    #[test]
    fn unknown_parameter_in_json_is_fatal() {
        let registry = TriggerRegistry::standard();
        let json = r#"{"triggers":[{"name":"SingleJet","parameters":{"bogus":1.0}}]}"#;
        let result = load_menu_json(json.as_bytes(), &registry);
        assert!(matches!(result, Err(Error::UnknownParameter { .. })));
    }
}
