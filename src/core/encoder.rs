//! Bulk-load encoder
//!
//! Serializes staging records into PostgreSQL's text `COPY` format. One record
//! becomes one newline-terminated line; fields are separated by a single
//! delimiter character.

use super::transform::StagingRecord;
use crate::domain::{AnonymizerError, Result, Value};
use bytes::{BufMut, Bytes, BytesMut};

/// ASCII unit separator, unlikely to appear in real data
pub const DEFAULT_DELIMITER: char = '\x1f';

/// NULL marker of the text format
pub const NULL_MARKER: &str = "\\N";

// COPY rejects these as delimiters, they carry meaning in the text format
const RESERVED_DELIMITERS: &str = "abcdefghijklmnopqrstuvwxyz0123456789.\\\n\r";

/// One encoded batch, ready for `COPY ... FROM STDIN`
#[derive(Debug, Clone, PartialEq)]
pub struct CopyPayload {
    /// Newline-terminated lines
    pub data: Bytes,
    /// Field delimiter used in `data`
    pub delimiter: char,
    /// Number of lines in `data`
    pub rows: usize,
}

impl CopyPayload {
    /// True when there is nothing to load
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// The delimiter as an SQL string literal, e.g. `E'\x1f'`
pub fn delimiter_literal(delimiter: char) -> String {
    if delimiter.is_ascii_graphic() && delimiter != '\'' {
        format!("'{}'", delimiter)
    } else {
        format!("E'\\x{:02x}'", delimiter as u32)
    }
}

/// Encodes staging records into a `COPY ... FROM STDIN` text stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyEncoder {
    delimiter: char,
}

impl Default for CopyEncoder {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl CopyEncoder {
    /// Create an encoder for `delimiter`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the delimiter is not a single-byte
    /// character or would be ambiguous in the text format.
    pub fn new(delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() {
            return Err(AnonymizerError::Configuration(format!(
                "delimiter {:?} must be a single-byte ASCII character",
                delimiter
            )));
        }
        if RESERVED_DELIMITERS.contains(delimiter.to_ascii_lowercase()) {
            return Err(AnonymizerError::Configuration(format!(
                "delimiter {:?} is not allowed in COPY text format",
                delimiter
            )));
        }
        Ok(Self { delimiter })
    }

    /// Delimiter character
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Encode one field value
    ///
    /// Text is trimmed of surrounding whitespace before escaping.
    pub fn encode_value(&self, value: &Value) -> String {
        match value {
            Value::Text(text) => self.escape(text.trim()),
            other => self.encode_key(other),
        }
    }

    /// Encode an identifying value
    ///
    /// Same as [`encode_value`](Self::encode_value) but text is kept verbatim,
    /// otherwise the merge join would miss keys with surrounding whitespace.
    pub fn encode_key(&self, value: &Value) -> String {
        match value {
            Value::Null => NULL_MARKER.to_string(),
            Value::Text(text) => self.escape(text),
            // serde_json::Value's Display is the compact form
            Value::Structured(json) => self.escape(&json.to_string()),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }

    fn escape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c == self.delimiter => {
                    out.push('\\');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out
    }

    /// Append one record as a line to `buf`
    pub fn encode_record(&self, record: &StagingRecord, buf: &mut BytesMut) {
        let mut delimiter = [0u8; 4];
        let delimiter = self.delimiter.encode_utf8(&mut delimiter).as_bytes();

        buf.put_slice(self.encode_key(&record.key).as_bytes());
        for value in &record.values {
            buf.put_slice(delimiter);
            buf.put_slice(self.encode_value(value).as_bytes());
        }
        buf.put_u8(b'\n');
    }

    /// Encode a whole batch into one buffer
    pub fn encode(&self, records: &[StagingRecord]) -> Bytes {
        let mut buf = BytesMut::with_capacity(records.len() * 128);
        for record in records {
            self.encode_record(record, &mut buf);
        }
        buf.freeze()
    }

    /// Encode a whole batch together with its delimiter and row count
    pub fn payload(&self, records: &[StagingRecord]) -> CopyPayload {
        CopyPayload {
            data: self.encode(records),
            delimiter: self.delimiter,
            rows: records.len(),
        }
    }
}
