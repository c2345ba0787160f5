//! Field access over semi-structured source-1 payloads.
//!
//! Two readers live here:
//!
//! - [`CustomerDocument`]: locates the JSON document embedded in a prepaid
//!   blob after the `1:{` marker and reads leaves under `mCustomerData.result`,
//!   unwrapping `{"_text": ...}` wrappers.
//! - [`text_field`]: a small parser for the `"<field>":{"_text":"<value>"}`
//!   pattern, used directly on raw text windows where the blob cannot be
//!   parsed as a whole.
//!
//! Every reader returns `Result<String, ExtractionFailure>`. Callers that want
//! the best-effort contract (a missing field is an empty field) go through
//! [`best_effort`], the single place failures are collapsed.
use crate::errors::ExtractionFailure;
use serde_json::Value;

/// Marker preceding the embedded document; the document starts at its `{`.
pub const DOCUMENT_MARKER: &str = "1:{";
/// Path from the document root to the object holding customer fields.
pub const RESULT_PATH: [&str; 2] = ["mCustomerData", "result"];
/// Key under which wrapped leaves carry their value.
pub const TEXT_KEY: &str = "_text";

/// Collapses an extraction result to its value, or `""` on failure.
pub fn best_effort(result: Result<String, ExtractionFailure>) -> String {
    match result {
        Ok(value) => value,
        Err(failure) => {
            tracing::debug!("Extraction failed, using empty value: {}", failure);
            String::new()
        }
    }
}

/// Returns the slice of `blob` where the embedded document begins.
///
/// With the marker present the document starts two bytes after it (past
/// `1:`); otherwise the whole blob is treated as the document.
pub fn locate_document(blob: &str) -> &str {
    match blob.find(DOCUMENT_MARKER) {
        Some(pos) => &blob[pos + 2..],
        None => blob,
    }
}

/// Parsed view of the document embedded in a prepaid blob.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerDocument {
    root: Value,
}

impl CustomerDocument {
    /// Parses the first JSON value after the marker, ignoring trailing text.
    ///
    /// Loosely-escaped blobs (`\"` in place of `"`) get one retry with the
    /// escapes removed.
    pub fn parse(blob: &str) -> Result<Self, ExtractionFailure> {
        let fragment = locate_document(blob);
        let root = match first_json_value(fragment) {
            Ok(root) => root,
            Err(first_failure) if fragment.contains("\\\"") => {
                first_json_value(&fragment.replace("\\\"", "\"")).map_err(|_| first_failure)?
            }
            Err(failure) => return Err(failure),
        };
        Ok(Self { root })
    }

    /// Object at `mCustomerData.result`.
    pub fn result(&self) -> Result<&Value, ExtractionFailure> {
        RESULT_PATH.iter().try_fold(&self.root, |node, segment| {
            node.get(segment)
                .ok_or_else(|| ExtractionFailure::MissingKey(segment.to_string()))
        })
    }

    /// Text of a leaf under `mCustomerData.result`.
    pub fn field(&self, key: &str) -> Result<String, ExtractionFailure> {
        leaf_text(self.result()?, key)
    }
}

fn first_json_value(text: &str) -> Result<Value, ExtractionFailure> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(ExtractionFailure::InvalidDocument(e.to_string())),
        None => Err(ExtractionFailure::InvalidDocument(
            "no document in blob".to_string(),
        )),
    }
}

/// Reads `key` from `container` as text.
///
/// The `{"_text": v}` wrapper is checked first; otherwise the bare value is
/// stringified. `null`, objects and arrays are not text.
pub fn leaf_text(container: &Value, key: &str) -> Result<String, ExtractionFailure> {
    let value = container
        .get(key)
        .ok_or_else(|| ExtractionFailure::MissingKey(key.to_string()))?;
    match value.get(TEXT_KEY) {
        Some(wrapped) => scalar_text(key, wrapped),
        None => scalar_text(key, value),
    }
}

fn scalar_text(key: &str, value: &Value) -> Result<String, ExtractionFailure> {
    let found = match value {
        Value::String(s) => return Ok(s.clone()),
        Value::Number(n) => return Ok(n.to_string()),
        Value::Bool(b) => return Ok(b.to_string()),
        Value::Null => "null",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    Err(ExtractionFailure::UnexpectedShape {
        key: key.to_string(),
        found,
    })
}

/// Finds the first `"<field>":{"_text":"<value>"}` in `haystack`.
///
/// Occurrences of the quoted key that are not followed by the wrapper (for
/// instance the key appearing as a plain value) are skipped. The value ends
/// at the first unescaped quote; JSON escapes inside it are decoded. Works
/// on bytes so windows cut at arbitrary offsets are fine.
pub fn text_field(haystack: &[u8], field: &str) -> Result<String, ExtractionFailure> {
    let key = format!("\"{}\"", field);
    let key = key.as_bytes();
    let mut from = 0;
    let mut failure = None;

    while let Some(pos) = find_from(haystack, key, from) {
        let mut cursor = Cursor::new(&haystack[pos + key.len()..]);
        match cursor.wrapped_value(field) {
            Ok(value) => return Ok(value),
            Err(e @ ExtractionFailure::UnterminatedValue { .. }) => return Err(e),
            Err(e) => failure = Some(e),
        }
        from = pos + 1;
    }

    Err(failure.unwrap_or_else(|| ExtractionFailure::MarkerNotFound {
        field: field.to_string(),
    }))
}

/// Position of the first `needle` in `haystack` at or after `from`.
pub fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}

/// Tokens between a quoted field key and the opening quote of its value.
const WRAPPER_TOKENS: [&[u8]; 5] = [b":", b"{", b"\"_text\"", b":", b"\""];

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn skip_ws(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: &[u8]) -> bool {
        self.skip_ws();
        if self.bytes[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    /// Grammar: `: { "_text" : " VALUE "`, whitespace allowed between tokens.
    fn wrapped_value(&mut self, field: &str) -> Result<String, ExtractionFailure> {
        let malformed = || ExtractionFailure::MalformedWrapper {
            field: field.to_string(),
        };
        for token in WRAPPER_TOKENS {
            if !self.eat(token) {
                return Err(malformed());
            }
        }
        self.quoted_tail(field)
    }

    /// Reads up to the closing unescaped quote; the opening one is consumed.
    fn quoted_tail(&mut self, field: &str) -> Result<String, ExtractionFailure> {
        let mut out: Vec<u8> = Vec::new();
        while let Some(&b) = self.bytes.get(self.pos) {
            self.pos += 1;
            match b {
                b'"' => return Ok(String::from_utf8_lossy(&out).into_owned()),
                b'\\' => {
                    let Some(&escaped) = self.bytes.get(self.pos) else {
                        break;
                    };
                    self.pos += 1;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'u' => self.unicode_escape(&mut out),
                        // `\"`, `\\`, `\/` and anything loosely escaped.
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }
        Err(ExtractionFailure::UnterminatedValue {
            field: field.to_string(),
        })
    }

    fn unicode_escape(&mut self, out: &mut Vec<u8>) {
        let hex = self
            .bytes
            .get(self.pos..self.pos + 4)
            .and_then(|digits| std::str::from_utf8(digits).ok())
            .and_then(|digits| u32::from_str_radix(digits, 16).ok());
        match hex {
            Some(code) => {
                self.pos += 4;
                let ch = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            None => out.extend_from_slice(b"\\u"),
        }
    }
}
