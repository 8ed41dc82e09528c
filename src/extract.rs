//! Structured-text extraction from research oracle output
//!
//! Oracle replies are free text: often a JSON payload wrapped in prose or a
//! markdown code fence. Extraction is a best-effort slice from the first
//! opening delimiter to the last closing delimiter. It does not check bracket
//! balance; parsing the slice is a separate, fallible step.

use serde_json::{Map, Value};
use thiserror::Error;

/// Which JSON container the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    Object,
    Array,
}

impl ExtractMode {
    fn delimiters(self) -> (char, char) {
        match self {
            ExtractMode::Object => ('{', '}'),
            ExtractMode::Array => ('[', ']'),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to parse JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("expected a JSON {expected}, got {found}")]
    WrongShape {
        expected: &'static str,
        found: &'static str,
        raw: String,
    },
}

impl ExtractionError {
    /// The text that failed to parse.
    pub fn raw(&self) -> &str {
        match self {
            ExtractionError::InvalidJson { raw, .. } => raw,
            ExtractionError::WrongShape { raw, .. } => raw,
        }
    }
}

/// Oracle output, either free text or an already-structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleOutput {
    Text(String),
    Structured(Value),
}

impl From<String> for OracleOutput {
    fn from(text: String) -> Self {
        OracleOutput::Text(text)
    }
}

impl From<&str> for OracleOutput {
    fn from(text: &str) -> Self {
        OracleOutput::Text(text.to_string())
    }
}

impl From<Value> for OracleOutput {
    fn from(value: Value) -> Self {
        OracleOutput::Structured(value)
    }
}

/// Slice `raw` from the first opening delimiter to the last closing one.
///
/// Returns the trimmed input unchanged when either delimiter is missing or
/// the closing delimiter does not come after the opening one.
pub fn extract_json_text(raw: &str, mode: ExtractMode) -> &str {
    let trimmed = raw.trim();
    let (open, close) = mode.delimiters();

    match (trimmed.find(open), trimmed.rfind(close)) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Object-mode extraction.
pub fn extract_json_object(raw: &str) -> &str {
    extract_json_text(raw, ExtractMode::Object)
}

/// Array-mode extraction.
pub fn extract_json_array(raw: &str) -> &str {
    extract_json_text(raw, ExtractMode::Array)
}

/// Extract and parse a JSON object. Structured input passes through untouched.
pub fn parse_object(output: impl Into<OracleOutput>) -> Result<Map<String, Value>, ExtractionError> {
    match parse_value(output.into(), ExtractMode::Object)? {
        (Value::Object(map), _) => Ok(map),
        (other, raw) => Err(ExtractionError::WrongShape {
            expected: "object",
            found: value_kind(&other),
            raw,
        }),
    }
}

/// Extract and parse a JSON array. Structured input passes through untouched.
pub fn parse_array(output: impl Into<OracleOutput>) -> Result<Vec<Value>, ExtractionError> {
    match parse_value(output.into(), ExtractMode::Array)? {
        (Value::Array(items), _) => Ok(items),
        (other, raw) => Err(ExtractionError::WrongShape {
            expected: "array",
            found: value_kind(&other),
            raw,
        }),
    }
}

fn parse_value(output: OracleOutput, mode: ExtractMode) -> Result<(Value, String), ExtractionError> {
    match output {
        OracleOutput::Structured(value) => {
            let raw = value.to_string();
            Ok((value, raw))
        }
        OracleOutput::Text(text) => {
            let candidate = extract_json_text(&text, mode);
            match serde_json::from_str::<Value>(candidate) {
                Ok(value) => Ok((value, text)),
                Err(source) => Err(ExtractionError::InvalidJson { source, raw: text }),
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
