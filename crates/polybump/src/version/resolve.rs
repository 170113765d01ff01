//! Directive resolution: turn `"patch"`, `"m"` or `"1.2.3"` into a version.

use tracing::{debug, instrument};

use super::{AliasTable, inc, valid};

/// Resolves a version directive against a file's current version.
///
/// A directive is one of:
/// - an alias from the [`AliasTable`] (`"m"`, `"pa"`, ...),
/// - an increment keyword (`"major"`, `"prerelease"`, ...),
/// - an explicit semantic version (`"9.9.9"`, `"v2.0.0-rc.1"`).
///
/// Directives are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct VersionResolver {
    aliases: AliasTable,
}

impl VersionResolver {
    /// Create a resolver using a custom alias table.
    pub const fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    /// The alias table this resolver expands directives with.
    pub const fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Lowercase a directive and expand it if it is an alias.
    pub fn normalize(&self, directive: &str) -> String {
        let lowered = directive.to_lowercase();
        self.aliases.expand(&lowered).to_string()
    }

    /// Resolve `directive` against `current`.
    ///
    /// An explicit version wins regardless of `current`. Otherwise the
    /// directive must be an increment keyword and `current` a valid version.
    /// Returns `None` when no valid version can be produced.
    #[instrument(skip(self))]
    pub fn resolve(&self, directive: &str, current: Option<&str>) -> Option<String> {
        let directive = self.normalize(directive);

        if let Some(explicit) = valid(&directive) {
            debug!(%explicit, "explicit version");
            return Some(explicit);
        }

        let next = current.and_then(|current| inc(current, &directive));
        debug!(?next, %directive, "incremented");
        next
    }
}
