//! Short aliases for increment keywords.

use std::collections::HashMap;

use super::Increment;

/// Immutable mapping from a short alias to an increment keyword.
///
/// The default table covers `pa`, `pr`, `ma`, `mi`, `m`, `p` and `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: HashMap<&'static str, Increment>,
}

impl AliasTable {
    /// Build a table from `(alias, keyword)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Increment)>,
    {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Look up the keyword for an alias. Lookup is exact; callers lowercase first.
    pub fn get(&self, alias: &str) -> Option<Increment> {
        self.entries.get(alias).copied()
    }

    /// Expand `directive` if it is an alias, otherwise return it unchanged.
    pub fn expand<'a>(&self, directive: &'a str) -> &'a str {
        self.get(directive).map_or(directive, |level| level.as_str())
    }

    /// Number of aliases in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no aliases.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(alias, keyword)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Increment)> + '_ {
        self.entries.iter().map(|(alias, level)| (*alias, *level))
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::from_pairs([
            ("pa", Increment::Patch),
            ("pr", Increment::Prerelease),
            ("ma", Increment::Major),
            ("mi", Increment::Minor),
            ("m", Increment::Major),
            ("p", Increment::Patch),
            ("i", Increment::Minor),
        ])
    }
}
