//! C# `AssemblyInfo.cs` files.
//!
//! Recognized attributes, one per line:
//!
//! ```text
//! [assembly: AssemblyVersion("1.2.3")]
//! [assembly: AssemblyFileVersion("1.2.3")]
//! [assembly: AssemblyInformationalVersion("1.2.3")]
//! ```
//!
//! `AssemblyVersion` is required; the other two are rewritten when present.
//! Only the quoted values change on rewrite.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{FormatError, FormatResult};

static ASSEMBLY_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| attribute_regex("AssemblyVersion"));

static ASSEMBLY_FILE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| attribute_regex("AssemblyFileVersion"));

static ASSEMBLY_INFORMATIONAL_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| attribute_regex("AssemblyInformationalVersion"));

/// Line-anchored pattern for `[assembly: <name>("<value>")]`.
///
/// Groups: 1 = everything before the value, 2 = the value, 3 = the rest.
fn attribute_regex(name: &str) -> Regex {
    let pattern = format!(
        r#"(?m)^([ \t]*\[[ \t]*assembly[ \t]*:[ \t]*{name}[ \t]*\([ \t]*")([^"\r\n]+)("[ \t]*\)[ \t]*\])"#
    );
    Regex::new(&pattern).expect("attribute pattern is a valid regex")
}

/// An AssemblyInfo source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyInfo {
    text: String,
    version: String,
}

impl AssemblyInfo {
    /// Parse the source text. Fails if no `AssemblyVersion` attribute is found.
    pub fn parse(text: &str) -> FormatResult<Self> {
        let version = ASSEMBLY_VERSION_RE
            .captures(text)
            .map(|caps| caps[2].to_string())
            .ok_or(FormatError::MissingAssemblyVersion)?;

        Ok(Self {
            text: text.to_string(),
            version,
        })
    }

    /// The `AssemblyVersion` value.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Replace the value of each recognized attribute with `version`.
    pub fn set_version(&mut self, version: &str) {
        let mut text = std::mem::take(&mut self.text);
        for re in [
            &*ASSEMBLY_VERSION_RE,
            &*ASSEMBLY_FILE_VERSION_RE,
            &*ASSEMBLY_INFORMATIONAL_VERSION_RE,
        ] {
            text = re
                .replace(&text, |caps: &Captures<'_>| {
                    format!("{}{version}{}", &caps[1], &caps[3])
                })
                .into_owned();
        }
        self.text = text;
        self.version = version.to_string();
    }

    /// The full source text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}
