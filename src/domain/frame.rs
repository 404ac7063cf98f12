//! Frame Codec - EVENT I/F Wire Records
//!
//! A frame is one text message from the event gateway:
//!
//! ```text
//! key \x02 value [\x03 value ...] \x01 key \x02 value ... [\r\n]
//! ```
//!
//! Keys may repeat across items; every sub-value is appended to the
//! key's list in arrival order. `p_cmd`, `p_no` and `p_date` are lifted
//! out into typed fields.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::command::Command;
use crate::error::{EventError, EventResult};

/// Separates items.
pub const DELIMITER_ITEM: char = '\x01';
/// Separates a key from its value.
pub const DELIMITER_KEY: char = '\x02';
/// Separates sub-values inside one value.
pub const DELIMITER_VALUE: char = '\x03';

/// Command field key.
pub const FIELD_COMMAND: &str = "p_cmd";
/// Per-frame sequence counter key.
pub const FIELD_NO: &str = "p_no";
/// Frame timestamp key.
pub const FIELD_DATE: &str = "p_date";

const DATE_FORMAT: &str = "%Y.%m.%d-%H:%M:%S%.f";

/// Multi-valued field map of a frame.
pub type FieldMap = BTreeMap<String, Vec<String>>;

/// One decoded wire message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Message text with trailing CR/LF removed.
    pub raw: String,
    /// Field key to ordered values.
    pub fields: FieldMap,
    /// `p_no`, 0 when missing or malformed.
    pub no: i64,
    /// `p_date`, verbatim.
    pub date: String,
    /// Upper-cased `p_cmd`.
    pub command: Command,
}

impl Frame {
    /// Command tag text.
    pub fn kind(&self) -> &str {
        self.command.as_str()
    }

    /// First value for `key`, or `""`.
    pub fn value(&self, key: &str) -> &str {
        self.fields
            .get(key)
            .and_then(|values| values.first())
            .map_or("", String::as_str)
    }

    /// All values for `key` as an owned copy.
    pub fn values(&self, key: &str) -> Vec<String> {
        self.fields.get(key).cloned().unwrap_or_default()
    }

    /// `p_date` parsed as a local timestamp, `None` if malformed.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.date.trim(), DATE_FORMAT).ok()
    }
}

/// Decode raw bytes into a frame.
///
/// # Errors
/// - `MissingDelimiter` when an item has no key delimiter.
/// - `Validation{p_cmd, required}` when the command is absent or blank.
pub fn decode_frame(data: &[u8]) -> EventResult<Frame> {
    let text = String::from_utf8_lossy(data);
    let raw = text.trim_end_matches(['\r', '\n']).to_string();
    let fields = parse_fields(&raw)?;

    let command = fields
        .get(FIELD_COMMAND)
        .and_then(|values| values.first())
        .and_then(|value| Command::parse(value))
        .ok_or_else(|| EventError::validation(FIELD_COMMAND, "required"))?;

    let mut frame = Frame {
        raw,
        fields,
        no: 0,
        date: String::new(),
        command,
    };
    frame.no = parse_i64_or_zero(frame.value(FIELD_NO));
    frame.date = frame.value(FIELD_DATE).to_string();

    Ok(frame)
}

/// Serialize a frame's fields back into wire bytes.
///
/// Keys are written in map order, each once, with all of its values
/// joined by the sub-value delimiter. Decoding the output yields the
/// same field map.
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    encode_fields(&frame.fields).into_bytes()
}

/// Serialize a field map into wire text.
pub fn encode_fields(fields: &FieldMap) -> String {
    fields
        .iter()
        .map(|(key, values)| {
            let joined = values.join(&DELIMITER_VALUE.to_string());
            format!("{key}{DELIMITER_KEY}{joined}")
        })
        .collect::<Vec<_>>()
        .join(&DELIMITER_ITEM.to_string())
}

fn parse_fields(raw: &str) -> EventResult<FieldMap> {
    let mut fields = FieldMap::new();
    if raw.is_empty() {
        return Ok(fields);
    }

    for item in raw.split(DELIMITER_ITEM) {
        if item.is_empty() {
            continue;
        }
        let (key, value) = item
            .split_once(DELIMITER_KEY)
            .ok_or(EventError::MissingDelimiter)?;
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        fields
            .entry(key.to_string())
            .or_default()
            .extend(value.split(DELIMITER_VALUE).map(str::to_string));
    }

    Ok(fields)
}

/// Parse a trimmed integer, falling back to 0.
pub(crate) fn parse_i64_or_zero(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}
