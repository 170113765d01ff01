//! Version parsing and increment arithmetic.
//!
//! This module turns strings into [`semver::Version`] values and applies
//! increment keywords to them. Directive handling (aliases, explicit
//! versions) lives in [`resolve`].

pub mod alias;
pub mod resolve;

use std::str::FromStr;

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use alias::AliasTable;
pub use resolve::VersionResolver;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// The keyword is not one of the known increment keywords.
    #[error("unknown increment keyword: {0}")]
    UnknownKeyword(String),

    /// A version component would overflow.
    #[error("cannot increment {0}: component overflow")]
    Overflow(String),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver increment keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Increment {
    /// Major release (X.0.0).
    Major,
    /// Minor release (x.Y.0).
    Minor,
    /// Patch release (x.y.Z).
    Patch,
    /// Next prerelease of the current (or next patch) version.
    Prerelease,
    /// Next major as a prerelease (X.0.0-0).
    Premajor,
    /// Next minor as a prerelease (x.Y.0-0).
    Preminor,
    /// Next patch as a prerelease (x.y.Z-0).
    Prepatch,
}

impl Increment {
    /// Returns the keyword as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::Prerelease => "prerelease",
            Self::Premajor => "premajor",
            Self::Preminor => "preminor",
            Self::Prepatch => "prepatch",
        }
    }
}

impl std::fmt::Display for Increment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Increment {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            "prerelease" => Ok(Self::Prerelease),
            "premajor" => Ok(Self::Premajor),
            "preminor" => Ok(Self::Preminor),
            "prepatch" => Ok(Self::Prepatch),
            other => Err(VersionError::UnknownKeyword(other.to_string())),
        }
    }
}

/// Parse a version string, ignoring surrounding whitespace and an optional
/// `v` or `=` prefix.
///
/// Build metadata is dropped so the result always formats as
/// `major.minor.patch[-pre]`.
pub fn parse_version(s: &str) -> VersionResult<Version> {
    let s = s.trim();
    let s = s
        .strip_prefix('v')
        .or_else(|| s.strip_prefix('='))
        .unwrap_or(s);
    let mut version = Version::parse(s)?;
    version.build = BuildMetadata::EMPTY;
    Ok(version)
}

/// Return the canonical form of `s` if it is a valid semantic version.
pub fn valid(s: &str) -> Option<String> {
    parse_version(s).ok().map(|v| v.to_string())
}

/// Apply an increment to a version.
///
/// Versions already carrying a prerelease are "released" by `major`,
/// `minor` and `patch` when the lower components are zero, so
/// `1.0.0-rc.1` bumped by `major` becomes `1.0.0`.
pub fn increment(current: &Version, level: Increment) -> VersionResult<Version> {
    let on_pre = !current.pre.is_empty();
    let (major, minor, patch) = (current.major, current.minor, current.patch);

    let next = match level {
        Increment::Major if on_pre && minor == 0 && patch == 0 => Version::new(major, 0, 0),
        Increment::Major => Version::new(bump(major, current)?, 0, 0),
        Increment::Minor if on_pre && patch == 0 => Version::new(major, minor, 0),
        Increment::Minor => Version::new(major, bump(minor, current)?, 0),
        Increment::Patch if on_pre => Version::new(major, minor, patch),
        Increment::Patch => Version::new(major, minor, bump(patch, current)?),
        Increment::Premajor => with_pre(Version::new(bump(major, current)?, 0, 0), "0")?,
        Increment::Preminor => with_pre(Version::new(major, bump(minor, current)?, 0), "0")?,
        Increment::Prepatch => with_pre(Version::new(major, minor, bump(patch, current)?), "0")?,
        Increment::Prerelease if on_pre => {
            let pre = next_prerelease(current.pre.as_str(), current)?;
            with_pre(Version::new(major, minor, patch), &pre)?
        }
        Increment::Prerelease => with_pre(Version::new(major, minor, bump(patch, current)?), "0")?,
    };

    Ok(next)
}

/// String-level increment: parse `current`, apply `keyword`.
///
/// Returns `None` when either the version or the keyword is invalid.
pub fn inc(current: &str, keyword: &str) -> Option<String> {
    let level = keyword.parse::<Increment>().ok()?;
    let current = parse_version(current).ok()?;
    increment(&current, level).ok().map(|v| v.to_string())
}

fn bump(n: u64, current: &Version) -> VersionResult<u64> {
    n.checked_add(1)
        .ok_or_else(|| VersionError::Overflow(current.to_string()))
}

fn with_pre(mut version: Version, pre: &str) -> VersionResult<Version> {
    version.pre = Prerelease::new(pre)?;
    Ok(version)
}

/// Increment the last numeric prerelease identifier, or append `.0`.
fn next_prerelease(pre: &str, current: &Version) -> VersionResult<String> {
    let mut parts: Vec<String> = pre.split('.').map(str::to_string).collect();

    let numeric = parts
        .iter()
        .rposition(|part| part.bytes().all(|b| b.is_ascii_digit()));

    match numeric {
        Some(idx) => {
            let n: u64 = parts[idx]
                .parse()
                .map_err(|_| VersionError::Overflow(current.to_string()))?;
            parts[idx] = bump(n, current)?.to_string();
        }
        None => parts.push("0".into()),
    }

    Ok(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bumped(v: &str, level: Increment) -> String {
        increment(&parse_version(v).unwrap(), level)
            .unwrap()
            .to_string()
    }

    #[test]
    fn bump_patch() {
        assert_eq!(bumped("1.2.3", Increment::Patch), "1.2.4");
    }

    #[test]
    fn bump_minor() {
        assert_eq!(bumped("1.2.3", Increment::Minor), "1.3.0");
    }

    #[test]
    fn bump_major() {
        assert_eq!(bumped("1.2.3", Increment::Major), "2.0.0");
    }

    #[test]
    fn bump_from_zero() {
        assert_eq!(bumped("0.1.0", Increment::Patch), "0.1.1");
        assert_eq!(bumped("0.1.0", Increment::Minor), "0.2.0");
        assert_eq!(bumped("0.1.0", Increment::Major), "1.0.0");
    }

    #[test]
    fn release_bumps_drop_prerelease() {
        assert_eq!(bumped("2.0.0-rc.1", Increment::Major), "2.0.0");
        assert_eq!(bumped("1.3.0-beta", Increment::Minor), "1.3.0");
        assert_eq!(bumped("1.2.4-0", Increment::Patch), "1.2.4");
    }

    #[test]
    fn release_bumps_past_nonzero_components() {
        assert_eq!(bumped("1.2.0-rc.1", Increment::Major), "2.0.0");
        assert_eq!(bumped("1.2.3-rc.1", Increment::Minor), "1.3.0");
    }

    #[test]
    fn prerelease_from_release() {
        assert_eq!(bumped("1.2.3", Increment::Prerelease), "1.2.4-0");
    }

    #[test]
    fn prerelease_increments_last_number() {
        assert_eq!(bumped("1.2.3-0", Increment::Prerelease), "1.2.3-1");
        assert_eq!(bumped("1.2.3-rc.4", Increment::Prerelease), "1.2.3-rc.5");
        assert_eq!(bumped("1.2.3-1.beta", Increment::Prerelease), "1.2.3-2.beta");
    }

    #[test]
    fn prerelease_appends_counter() {
        assert_eq!(bumped("1.2.3-beta", Increment::Prerelease), "1.2.3-beta.0");
    }

    #[test]
    fn pre_component_bumps() {
        assert_eq!(bumped("1.2.3", Increment::Premajor), "2.0.0-0");
        assert_eq!(bumped("1.2.3", Increment::Preminor), "1.3.0-0");
        assert_eq!(bumped("1.2.3", Increment::Prepatch), "1.2.4-0");
    }

    #[test]
    fn overflow_is_an_error() {
        let v = Version::new(u64::MAX, 0, 0);
        assert!(matches!(
            increment(&v, Increment::Major),
            Err(VersionError::Overflow(_))
        ));
    }

    #[test]
    fn parse_with_prefixes() {
        assert_eq!(parse_version("v1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(parse_version("=1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(parse_version(" 1.2.3\n").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn parse_drops_build_metadata() {
        assert_eq!(parse_version("1.2.3+build.5").unwrap().to_string(), "1.2.3");
    }

    #[test]
    fn parse_invalid() {
        assert!(parse_version("not-a-version").is_err());
        assert!(parse_version("1.2").is_err());
        assert!(parse_version("1.0.0.0").is_err());
    }

    #[test]
    fn valid_returns_canonical_string() {
        assert_eq!(valid("v1.2.3-rc.1").as_deref(), Some("1.2.3-rc.1"));
        assert_eq!(valid("patch"), None);
    }

    #[test]
    fn inc_rejects_unknown_keyword_and_bad_version() {
        assert_eq!(inc("1.2.3", "patch").as_deref(), Some("1.2.4"));
        assert_eq!(inc("1.2.3", "bogus"), None);
        assert_eq!(inc("one.two", "patch"), None);
    }

    #[test]
    fn keyword_round_trips_through_display() {
        for level in [
            Increment::Major,
            Increment::Minor,
            Increment::Patch,
            Increment::Prerelease,
            Increment::Premajor,
            Increment::Preminor,
            Increment::Prepatch,
        ] {
            assert_eq!(level.to_string().parse::<Increment>().unwrap(), level);
        }
    }
}
