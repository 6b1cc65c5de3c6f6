//! Per-model acquisition quota

use firmsync_manifest::ModelFilter;
use std::collections::HashMap;

/// Counts how many releases have offered each model during a run.
///
/// With a quota of `n > 0`, a model matches once it has been counted `n`
/// times, which excludes it from every later (older) release. A quota of
/// zero disables the map: nothing ever matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionMap {
    required: u32,
    counts: HashMap<String, u32>,
}

impl AcquisitionMap {
    /// Create a map with quota `required`.
    pub fn new(required: u32) -> Self {
        Self {
            required,
            counts: HashMap::new(),
        }
    }

    /// Set the quota.
    pub fn require(&mut self, required: u32) {
        self.required = required;
    }

    /// The configured quota.
    pub fn required(&self) -> u32 {
        self.required
    }

    /// How many times `model` has been counted.
    pub fn count(&self, model: &str) -> u32 {
        self.counts.get(model).copied().unwrap_or(0)
    }

    /// Count each occurrence of each model once.
    pub fn add<I, S>(&mut self, models: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for model in models {
            let count = self.counts.entry(model.as_ref().to_string()).or_insert(0);
            *count = count.saturating_add(1);
        }
    }

    /// Whether `model` has reached the quota.
    pub fn matches(&self, model: &str) -> bool {
        self.required > 0 && self.count(model) >= self.required
    }
}

impl ModelFilter for AcquisitionMap {
    fn matches(&self, model: &str) -> bool {
        AcquisitionMap::matches(self, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firmsync_manifest::ModelSet;
    use proptest::prelude::*;

    #[test]
    fn test_quota_of_one() {
        let mut acquired = AcquisitionMap::new(1);
        assert!(!acquired.matches("D40"));
        acquired.add(["D40"]);
        assert!(acquired.matches("D40"));
        assert!(!acquired.matches("D50"));
    }

    #[test]
    fn test_duplicates_count_separately() {
        let mut acquired = AcquisitionMap::new(2);
        acquired.add(["D40", "D40"]);
        assert_eq!(acquired.count("D40"), 2);
        assert!(acquired.matches("D40"));
    }

    #[test]
    fn test_filters_model_sets() {
        let mut acquired = AcquisitionMap::new(1);
        acquired.add(&ModelSet::new(["D40"]));
        let wanted = ModelSet::new(["D40", "D50"]).exclude(&acquired);
        assert_eq!(wanted, ModelSet::new(["D50"]));
    }

    #[test]
    fn test_require_changes_quota() {
        let mut acquired = AcquisitionMap::default();
        acquired.add(["D40"]);
        assert!(!acquired.matches("D40"));
        acquired.require(1);
        assert_eq!(acquired.required(), 1);
        assert!(acquired.matches("D40"));
    }

    proptest! {
        #[test]
        fn prop_matches_once_quota_reached(quota in 1u32..8, adds in 0u32..16) {
            let mut acquired = AcquisitionMap::new(quota);
            for _ in 0..adds {
                acquired.add(["D60"]);
            }
            prop_assert_eq!(acquired.matches("D60"), adds >= quota);
        }

        #[test]
        fn prop_zero_quota_never_matches(adds in 0u32..16) {
            let mut acquired = AcquisitionMap::new(0);
            for _ in 0..adds {
                acquired.add(["D60"]);
            }
            prop_assert!(!acquired.matches("D60"));
        }
    }
}
