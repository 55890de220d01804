// Output formatting — the JSON envelopes written to stdout.
//
// Callers parse stdout as JSON, so nothing else is ever printed there during
// classification. Separators are ", " and ": " (e.g. `{"tags": ["#art"]}`),
// the layout existing callers already compare against.

use std::io;

use anyhow::Result;
use serde::Serialize;
use serde_json::ser::Formatter;

/// Message returned when no article text was passed.
pub const MISSING_CONTENT_ERROR: &str = "No article content provided";

/// Successful classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// Invocation error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn missing_content() -> Self {
        Self {
            error: MISSING_CONTENT_ERROR.to_string(),
        }
    }
}

/// Compact JSON with a space after every separator.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serialize a response to a single-line JSON string.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

/// Write a response to stdout followed by a newline.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tag_layout() {
        let json = to_json(&TagsResponse {
            tags: vec!["#science".to_string()],
        })
        .unwrap();
        assert_eq!(json, r##"{"tags": ["#science"]}"##);
    }

    #[test]
    fn test_empty_tags_layout() {
        let json = to_json(&TagsResponse { tags: vec![] }).unwrap();
        assert_eq!(json, r#"{"tags": []}"#);
    }

    #[test]
    fn test_missing_content_layout() {
        let json = to_json(&ErrorResponse::missing_content()).unwrap();
        assert_eq!(json, r#"{"error": "No article content provided"}"#);
    }

    #[test]
    fn test_multiple_values_are_spaced() {
        let json = to_json(&serde_json::json!({"a": [1, 2]})).unwrap();
        assert_eq!(json, r#"{"a": [1, 2]}"#);
    }
}
