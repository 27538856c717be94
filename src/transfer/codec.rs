//! Record codec: one document per JSON line
//!
//! Encoding rules, applied per BSON variant:
//! - `DateTime` → ISO-8601 string (UTC, millisecond precision)
//! - `ObjectId` → 24-character hex string
//! - `Binary` → the bytes as UTF-8 text; fails for non-text payloads
//! - `Double` → JSON number; NaN and infinities are rejected
//! - strings, integers, booleans, null, documents and arrays map directly
//! - every other variant is written in relaxed extended JSON
//!
//! Decoding reads the line as plain JSON. Values written as strings stay
//! strings, so identifiers and timestamps come back as text.

use chrono::SecondsFormat;
use mongodb::bson::{Binary, Bson, DateTime, Document, oid::ObjectId};
use serde_json::{Map, Value as JsonValue};

use crate::error::{DecodingError, EncodingError, Result};

/// Stateless JSON Lines encoder/decoder for BSON documents
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl RecordCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode a document as a single line of JSON, without the trailing newline
    pub fn encode(&self, document: &Document) -> Result<String> {
        let mut path = Vec::new();
        let value = self.encode_document(document, &mut path)?;
        Ok(serde_json::to_string(&value).map_err(EncodingError::Json)?)
    }

    /// Decode one line of JSON into a document
    pub fn decode(&self, line: &str) -> Result<Document> {
        self.decode_line(line, 0)
    }

    /// Decode a line, reporting `line_number` in errors
    pub fn decode_line(&self, line: &str, line_number: u64) -> Result<Document> {
        let value: JsonValue =
            serde_json::from_str(line.trim_end_matches(['\n', '\r'])).map_err(|e| {
                DecodingError::InvalidJson {
                    line: line_number,
                    message: e.to_string(),
                }
            })?;

        if !value.is_object() {
            return Err(DecodingError::NotAnObject { line: line_number }.into());
        }

        match Bson::try_from(value) {
            Ok(Bson::Document(document)) => Ok(document),
            Ok(_) => Err(DecodingError::NotAnObject { line: line_number }.into()),
            Err(e) => Err(DecodingError::InvalidBson {
                line: line_number,
                message: e.to_string(),
            }
            .into()),
        }
    }

    fn encode_value(&self, value: &Bson, path: &mut Vec<String>) -> Result<JsonValue> {
        let json = match value {
            Bson::String(s) => JsonValue::String(s.clone()),
            Bson::Int32(n) => JsonValue::from(*n),
            Bson::Int64(n) => JsonValue::from(*n),
            Bson::Double(f) => self.encode_double(*f, path)?,
            Bson::Boolean(b) => JsonValue::Bool(*b),
            Bson::Null => JsonValue::Null,
            Bson::ObjectId(oid) => self.encode_object_id(oid),
            Bson::DateTime(dt) => self.encode_datetime(dt, path)?,
            Bson::Binary(bin) => self.encode_binary(bin, path)?,
            Bson::Document(doc) => self.encode_document(doc, path)?,
            Bson::Array(items) => self.encode_array(items, path)?,
            other => other.clone().into_relaxed_extjson(),
        };
        Ok(json)
    }

    fn encode_document(&self, document: &Document, path: &mut Vec<String>) -> Result<JsonValue> {
        let mut map = Map::with_capacity(document.len());
        for (key, value) in document {
            path.push(key.clone());
            let encoded = self.encode_value(value, path);
            path.pop();
            map.insert(key.clone(), encoded?);
        }
        Ok(JsonValue::Object(map))
    }

    fn encode_array(&self, items: &[Bson], path: &mut Vec<String>) -> Result<JsonValue> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            path.push(index.to_string());
            let encoded = self.encode_value(item, path);
            path.pop();
            out.push(encoded?);
        }
        Ok(JsonValue::Array(out))
    }

    fn encode_object_id(&self, oid: &ObjectId) -> JsonValue {
        JsonValue::String(oid.to_hex())
    }

    fn encode_datetime(&self, dt: &DateTime, path: &[String]) -> Result<JsonValue> {
        let millis = dt.timestamp_millis();
        chrono::DateTime::from_timestamp_millis(millis)
            .map(|utc| JsonValue::String(utc.to_rfc3339_opts(SecondsFormat::Millis, true)))
            .ok_or_else(|| {
                EncodingError::DateOutOfRange {
                    field: field_name(path),
                    millis,
                }
                .into()
            })
    }

    fn encode_binary(&self, bin: &Binary, path: &[String]) -> Result<JsonValue> {
        String::from_utf8(bin.bytes.clone())
            .map(JsonValue::String)
            .map_err(|_| {
                EncodingError::InvalidUtf8Binary {
                    field: field_name(path),
                }
                .into()
            })
    }

    fn encode_double(&self, f: f64, path: &[String]) -> Result<JsonValue> {
        serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .ok_or_else(|| {
                EncodingError::NonFiniteNumber {
                    field: field_name(path),
                }
                .into()
            })
    }
}

fn field_name(path: &[String]) -> String {
    path.join(".")
}
