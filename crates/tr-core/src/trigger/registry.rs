//! The trigger registry.
//!
//! Maps (name, version) to trigger kinds and carries the per-(trigger,
//! parameter) suggested-binning hints used when building rate curves. Built
//! once at startup, before any sample is loaded, and passed by reference
//! everywhere; it is never mutated afterwards.

use super::{catalogue, Trigger, TriggerKind};
use std::collections::HashMap;
use tr_common::{Error, Result};

/// Binning of a rate-curve axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    pub bins: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for Binning {
    /// The default axis when no hint is registered: 100 bins over [0, 100].
    fn default() -> Self {
        Binning {
            bins: 100,
            low: 0.0,
            high: 100.0,
        }
    }
}

/// Registry of trigger kinds plus suggested-binning hints.
pub struct TriggerRegistry {
    kinds: Vec<&'static TriggerKind>,
    binnings: HashMap<(String, String), Binning>,
}

impl TriggerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        TriggerRegistry {
            kinds: Vec::new(),
            binnings: HashMap::new(),
        }
    }

    /// The full standard catalogue with its binning hints.
    pub fn standard() -> Self {
        let mut registry = TriggerRegistry::new();
        for &kind in catalogue::ALL_KINDS {
            registry.register(kind);
        }
        catalogue::register_suggested_binnings(&mut registry);
        registry
    }

    pub fn register(&mut self, kind: &'static TriggerKind) {
        self.kinds.push(kind);
    }

    /// Create a trigger of the highest registered version of `name`.
    pub fn latest(&self, name: &str) -> Result<Trigger> {
        self.kinds
            .iter()
            .copied()
            .filter(|kind| kind.name == name)
            .max_by_key(|kind| kind.version)
            .map(Trigger::from_kind)
            .ok_or_else(|| Error::UnknownTrigger {
                name: name.to_string(),
            })
    }

    /// Create a trigger of an exact (name, version).
    pub fn exact(&self, name: &str, version: u32) -> Result<Trigger> {
        self.kinds
            .iter()
            .copied()
            .find(|kind| kind.name == name && kind.version == version)
            .map(Trigger::from_kind)
            .ok_or_else(|| {
                // Distinguish a wholly unknown name from a missing version.
                if self.kinds.iter().any(|kind| kind.name == name) {
                    Error::UnknownTriggerVersion {
                        name: name.to_string(),
                        version,
                    }
                } else {
                    Error::UnknownTrigger {
                        name: name.to_string(),
                    }
                }
            })
    }

    /// Every registered (name, version) pair, in registration order.
    pub fn list(&self) -> Vec<(&'static str, u32)> {
        self.kinds
            .iter()
            .map(|kind| (kind.name, kind.version))
            .collect()
    }

    /// Record a suggested rate-curve binning for one trigger parameter.
    pub fn register_suggested_binning(
        &mut self,
        trigger_name: &str,
        parameter_name: &str,
        binning: Binning,
    ) {
        self.binnings.insert(
            (trigger_name.to_string(), parameter_name.to_string()),
            binning,
        );
    }

    /// The suggested binning for one trigger parameter, if any.
    pub fn suggested_binning(&self, trigger_name: &str, parameter_name: &str) -> Option<Binning> {
        self.binnings
            .get(&(trigger_name.to_string(), parameter_name.to_string()))
            .copied()
    }

    /// The suggested binning, or the default axis when none is registered.
    pub fn binning_or_default(&self, trigger_name: &str, parameter_name: &str) -> Binning {
        self.suggested_binning(trigger_name, parameter_name)
            .unwrap_or_default()
    }
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_wins_on_unversioned_lookup() {
        let registry = TriggerRegistry::standard();
        let trigger = registry.latest("SingleMuon").unwrap();
        assert_eq!(trigger.version(), 1);

        let old = registry.exact("SingleMuon", 0).unwrap();
        assert_eq!(old.version(), 0);
    }

    #[test]
    fn unknown_lookups_are_configuration_errors() {
        let registry = TriggerRegistry::standard();
        assert!(matches!(
            registry.latest("NoSuchTrigger"),
            Err(Error::UnknownTrigger { .. })
        ));
        assert!(matches!(
            registry.exact("SingleJet", 99),
            Err(Error::UnknownTriggerVersion { .. })
        ));
        assert!(matches!(
            registry.exact("NoSuchTrigger", 0),
            Err(Error::UnknownTrigger { .. })
        ));
    }

    #[test]
    fn binning_hints() {
        let registry = TriggerRegistry::standard();

        let hinted = registry.binning_or_default("TotalEnergy", "threshold1");
        assert!(hinted.high > 100.0);

        let default = registry.binning_or_default("SingleJet", "nonsense");
        assert_eq!(default, Binning::default());
    }

    #[test]
    fn list_contains_both_muon_versions() {
        let registry = TriggerRegistry::standard();
        let listed = registry.list();
        assert!(listed.contains(&("SingleMuon", 0)));
        assert!(listed.contains(&("SingleMuon", 1)));
    }
}
