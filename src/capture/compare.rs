//! Projection of records into comparable entries and sequence diffs.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::core::Record;

/// The `(logger name, LEVEL, message)` view of a record used by checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub level: String,
    pub message: String,
}

impl Entry {
    pub fn new(
        name: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            level: level.into(),
            message: message.into(),
        }
    }
}

impl From<&Record> for Entry {
    fn from(record: &Record) -> Self {
        Self::new(record.name.clone(), record.level.as_str(), record.message.clone())
    }
}

impl<N, L, M> From<(N, L, M)> for Entry
where
    N: Into<String>,
    L: Into<String>,
    M: Into<String>,
{
    fn from((name, level, message): (N, L, M)) -> Self {
        Self::new(name, level, message)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?}, {:?})", self.name, self.level, self.message)
    }
}

/// An ordered list of entries, rendered one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entries(pub Vec<Entry>);

impl Deref for Entries {
    type Target = [Entry];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Entry>> for Entries {
    fn from(entries: Vec<Entry>) -> Self {
        Self(entries)
    }
}

impl fmt::Display for Entries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "  (none)");
        }
        for entry in &self.0 {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}

/// Difference between an expected and an actual entry sequence.
///
/// `same` is the longest common leading run; `expected` and `actual` hold
/// whatever follows it on each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDiff {
    pub same: Entries,
    pub expected: Entries,
    pub actual: Entries,
}

impl SequenceDiff {
    /// Compare two sequences; `None` when they are equal.
    #[must_use]
    pub fn between(expected: &[Entry], actual: &[Entry]) -> Option<Self> {
        if expected == actual {
            return None;
        }
        let common = expected
            .iter()
            .zip(actual)
            .take_while(|(e, a)| e == a)
            .count();
        Some(Self {
            same: Entries(actual[..common].to_vec()),
            expected: Entries(expected[common..].to_vec()),
            actual: Entries(actual[common..].to_vec()),
        })
    }
}

impl fmt::Display for SequenceDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "captured logging not as expected:\n\nsame:\n{}\nexpected:\n{}\nactual:\n{}",
            self.same, self.expected, self.actual
        )
    }
}

/// Indices into `actual` matching every entry of `expected`, or the
/// entries that could not be matched.
///
/// With `order_matters` the expected entries must occur as an ordered
/// subsequence; otherwise each expected entry consumes one distinct actual
/// entry anywhere in the sequence.
///
/// # Errors
///
/// The expected entries that have no match in `actual`.
pub fn find_present(
    expected: &[Entry],
    actual: &[Entry],
    order_matters: bool,
) -> Result<Vec<usize>, Vec<Entry>> {
    let mut used = vec![false; actual.len()];
    let mut matched = Vec::with_capacity(expected.len());
    let mut missing = Vec::new();
    let mut cursor = 0;

    for wanted in expected {
        let start = if order_matters { cursor } else { 0 };
        let hit = (start..actual.len()).find(|&idx| !used[idx] && actual[idx] == *wanted);
        match hit {
            Some(idx) => {
                used[idx] = true;
                matched.push(idx);
                cursor = idx + 1;
            }
            None => missing.push(wanted.clone()),
        }
    }

    if missing.is_empty() {
        Ok(matched)
    } else {
        Err(missing)
    }
}
