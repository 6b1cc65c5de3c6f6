//! Glob patterns for model and file filtering
//!
//! Model filters are sets of globs separated by commas or whitespace
//! (`"D4*, D70"`); a model passes when any glob matches. File filters are a
//! single glob matched against the archive-relative path of an entry. `*`
//! crosses directory separators, so `*.eff` matches `firmware_1_4_1/D40.eff`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PatternError;
use crate::model::ModelFilter;

/// Pattern that matches every model.
pub const WILDCARD: &str = "*";

fn compile(pattern: &str) -> Result<glob::Pattern, PatternError> {
    glob::Pattern::new(pattern).map_err(|source| PatternError::Invalid {
        pattern: pattern.to_string(),
        source,
    })
}

/// A set of model globs; matches when any member matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PatternSpec", into = "Vec<String>")]
pub struct PatternSet {
    patterns: Vec<glob::Pattern>,
}

impl PatternSet {
    /// Parse a comma or whitespace separated list of globs.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Invalid`] if any glob fails to compile.
    pub fn parse(list: &str) -> Result<Self, PatternError> {
        Self::from_patterns(
            list.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty()),
        )
    }

    /// Build a set from individual globs. Each glob may itself be a comma
    /// separated list.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Invalid`] if any glob fails to compile.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            for part in pattern
                .as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty())
            {
                compiled.push(compile(part)?);
            }
        }
        Ok(Self { patterns: compiled })
    }

    /// A set containing only [`WILDCARD`].
    pub fn wildcard() -> Self {
        Self {
            patterns: vec![glob::Pattern::new(WILDCARD).unwrap_or_default()],
        }
    }

    /// Whether the set has no globs.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether any glob matches `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(name))
    }

    /// Whether any glob matches any of `names`.
    pub fn contains<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| self.matches(name.as_ref()))
    }
}

impl ModelFilter for PatternSet {
    fn matches(&self, model: &str) -> bool {
        PatternSet::matches(self, model)
    }
}

impl fmt::Display for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for pattern in &self.patterns {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(pattern.as_str())?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternSpec {
    List(String),
    Patterns(Vec<String>),
}

impl TryFrom<PatternSpec> for PatternSet {
    type Error = PatternError;

    fn try_from(spec: PatternSpec) -> Result<Self, Self::Error> {
        match spec {
            PatternSpec::List(list) => Self::parse(&list),
            PatternSpec::Patterns(patterns) => Self::from_patterns(patterns),
        }
    }
}

impl From<PatternSet> for Vec<String> {
    fn from(set: PatternSet) -> Self {
        set.patterns
            .iter()
            .map(|pattern| pattern.as_str().to_string())
            .collect()
    }
}

/// A single optional glob matched against archive entry paths.
///
/// An empty pattern is "unset": it neither includes nor excludes anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilePattern {
    pattern: Option<glob::Pattern>,
}

impl FilePattern {
    /// Compile a file glob; an empty or blank string yields an unset pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Invalid`] if the glob fails to compile.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            pattern: Some(compile(pattern)?),
        })
    }

    /// Whether a glob has been configured.
    pub fn is_set(&self) -> bool {
        self.pattern.is_some()
    }

    /// Whether the configured glob matches `path`. Always false when unset.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.matches(path))
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            Some(pattern) => f.write_str(pattern.as_str()),
            None => Ok(()),
        }
    }
}

impl TryFrom<String> for FilePattern {
    type Error = PatternError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::parse(&pattern)
    }
}

impl From<FilePattern> for String {
    fn from(pattern: FilePattern) -> Self {
        pattern.to_string()
    }
}
