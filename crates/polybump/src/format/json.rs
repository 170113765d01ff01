//! JSON manifests with a top-level `version` field.
//!
//! The document is re-serialized on write, so formatting is reproduced
//! from what was detected in the source: the indent unit, the line ending,
//! any UTF-8 byte order mark, and the exact whitespace around the root
//! object. Key order is kept as written.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use super::{FormatError, FormatResult};

const BOM: char = '\u{feff}';

/// A parsed JSON object plus the formatting needed to write it back.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    object: Map<String, Value>,
    indent: String,
    line_ending: &'static str,
    leading: String,
    trailing: String,
    bom: bool,
}

impl JsonDocument {
    /// Parse a JSON document. The top-level value must be an object.
    pub fn parse(text: &str) -> FormatResult<Self> {
        let (bom, body) = match text.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let Value::Object(object) = serde_json::from_str::<Value>(body)? else {
            return Err(FormatError::NotAnObject);
        };

        Ok(Self {
            object,
            indent: detect_indent(body).to_string(),
            line_ending: detect_line_ending(body),
            leading: body[..body.len() - body.trim_start().len()].to_string(),
            trailing: body[body.trim_end().len()..].to_string(),
            bom,
        })
    }

    /// The `version` field, when present and a string.
    pub fn version(&self) -> Option<&str> {
        self.object.get("version").and_then(Value::as_str)
    }

    /// Set the `version` field. A missing field is appended after the last key.
    pub fn set_version(&mut self, version: &str) {
        self.object
            .insert("version".into(), Value::String(version.to_string()));
    }

    /// The indent unit detected in the source (empty for single-line JSON).
    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Serialize back to bytes using the detected formatting.
    pub fn to_bytes(&self) -> FormatResult<Vec<u8>> {
        let mut buf = Vec::new();
        if self.indent.is_empty() {
            serde_json::to_writer(&mut buf, &self.object)?;
        } else {
            let formatter = PrettyFormatter::with_indent(self.indent.as_bytes());
            let mut ser = Serializer::with_formatter(&mut buf, formatter);
            self.object.serialize(&mut ser)?;
        }

        let mut body = String::from_utf8(buf).map_err(|e| FormatError::Utf8(e.utf8_error()))?;
        if self.line_ending != "\n" {
            body = body.replace('\n', self.line_ending);
        }

        let mut out =
            String::with_capacity(self.leading.len() + body.len() + self.trailing.len() + 3);
        if self.bom {
            out.push(BOM);
        }
        out.push_str(&self.leading);
        out.push_str(&body);
        out.push_str(&self.trailing);
        Ok(out.into_bytes())
    }
}

/// Leading whitespace of the first indented, non-blank line.
fn detect_indent(text: &str) -> &str {
    text.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let width = line.len() - line.trim_start_matches([' ', '\t']).len();
            &line[..width]
        })
        .find(|indent| !indent.is_empty())
        .unwrap_or("")
}

fn detect_line_ending(text: &str) -> &'static str {
    if text.contains("\r\n") { "\r\n" } else { "\n" }
}
