//! Device model sets and the filter seam used to narrow them

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::pattern::PatternSet;

/// Anything that can decide whether a model should be selected.
///
/// Implemented by [`PatternSet`] for include/exclude rules and by the
/// engine's acquisition map for quota filtering.
pub trait ModelFilter {
    /// Whether `model` matches this filter.
    fn matches(&self, model: &str) -> bool;
}

impl<F: ModelFilter + ?Sized> ModelFilter for &F {
    fn matches(&self, model: &str) -> bool {
        (**self).matches(model)
    }
}

/// An ordered sequence of device model names.
///
/// Order is preserved by every operation. Duplicates are allowed and kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelSet(Vec<String>);

impl ModelSet {
    /// Create a set from model names.
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(models.into_iter().map(Into::into).collect())
    }

    /// Number of entries, counting duplicates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the model names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    /// The model names as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Append a model name.
    pub fn push(&mut self, model: impl Into<String>) {
        self.0.push(model.into());
    }

    /// Keep only the models matched by `patterns`.
    ///
    /// An empty pattern set places no restriction and keeps every model.
    pub fn include(&self, patterns: &PatternSet) -> ModelSet {
        if patterns.is_empty() {
            return self.clone();
        }
        self.retain(|model| patterns.matches(model))
    }

    /// Drop the models matched by `filter`.
    pub fn exclude<F: ModelFilter + ?Sized>(&self, filter: &F) -> ModelSet {
        self.retain(|model| !filter.matches(model))
    }

    /// Build a membership-test view of the set.
    pub fn lookup(&self) -> ModelLookup<'_> {
        ModelLookup {
            models: self.iter().collect(),
        }
    }

    fn retain(&self, keep: impl Fn(&str) -> bool) -> ModelSet {
        ModelSet(self.0.iter().filter(|m| keep(m)).cloned().collect())
    }
}

impl fmt::Display for ModelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl<S: Into<String>> FromIterator<S> for ModelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a ModelSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Extend<String> for ModelSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Hash-set view of a [`ModelSet`] for membership tests.
#[derive(Debug, Clone)]
pub struct ModelLookup<'a> {
    models: HashSet<&'a str>,
}

impl ModelLookup<'_> {
    /// Whether `model` is present.
    pub fn contains(&self, model: &str) -> bool {
        self.models.contains(model)
    }

    /// Whether any of `models` is present.
    pub fn contains_any<S: AsRef<str>>(&self, models: &[S]) -> bool {
        models.iter().any(|model| self.contains(model.as_ref()))
    }
}

impl ModelFilter for ModelLookup<'_> {
    fn matches(&self, model: &str) -> bool {
        self.contains(model)
    }
}
