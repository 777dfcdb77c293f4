//! CBOR map helpers shared by protocol messages and stored records.
//!
//! Messages are encoded as CBOR maps keyed by field name. Keys are sorted
//! before encoding so identical messages always produce identical bytes.

use crate::error::{ProtocolError, ProtocolResult};
use ciborium::Value;
use std::collections::BTreeMap;

/// Encodes a CBOR value to bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn to_cbor(value: &Value) -> ProtocolResult<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(out)
}

/// Decodes bytes into a CBOR value.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] if the bytes are not valid CBOR.
pub fn from_cbor(bytes: &[u8]) -> ProtocolResult<Value> {
    ciborium::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}

/// Builds a CBOR map field by field.
#[derive(Debug, Default)]
pub struct MapBuilder {
    pairs: Vec<(Value, Value)>,
}

impl MapBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an arbitrary value.
    pub fn value(mut self, key: &str, value: Value) -> Self {
        self.pairs.push((Value::Text(key.to_string()), value));
        self
    }

    /// Adds a text field.
    pub fn text(self, key: &str, value: impl Into<String>) -> Self {
        self.value(key, Value::Text(value.into()))
    }

    /// Adds a text field when `value` is present.
    pub fn optional_text(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(text) => self.text(key, text),
            None => self,
        }
    }

    /// Adds a byte string field.
    pub fn bytes(self, key: &str, value: &[u8]) -> Self {
        self.value(key, Value::Bytes(value.to_vec()))
    }

    /// Adds an integer field.
    pub fn int(self, key: &str, value: i64) -> Self {
        self.value(key, Value::Integer(value.into()))
    }

    /// Adds a boolean field.
    pub fn bool(self, key: &str, value: bool) -> Self {
        self.value(key, Value::Bool(value))
    }

    /// Adds a text-to-text map field.
    pub fn text_map(self, key: &str, map: &BTreeMap<String, String>) -> Self {
        let pairs = map
            .iter()
            .map(|(k, v)| (Value::Text(k.clone()), Value::Text(v.clone())))
            .collect();
        self.value(key, Value::Map(pairs))
    }

    /// Finishes the map with keys in sorted order.
    pub fn build(mut self) -> Value {
        self.pairs
            .sort_by(|(a, _), (b, _)| a.as_text().cmp(&b.as_text()));
        Value::Map(self.pairs)
    }

    /// Finishes the map and encodes it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(self) -> ProtocolResult<Vec<u8>> {
        to_cbor(&self.build())
    }
}

/// Typed read access to the fields of a CBOR map.
///
/// Accessors return `Ok(None)` for absent or null fields and an error for
/// fields present with the wrong type.
#[derive(Debug, Clone, Copy)]
pub struct MapReader<'a> {
    pairs: &'a [(Value, Value)],
}

impl<'a> MapReader<'a> {
    /// Wraps a decoded value, which must be a map.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] if `value` is not a map.
    pub fn new(value: &'a Value) -> ProtocolResult<Self> {
        value
            .as_map()
            .map(|pairs| Self { pairs })
            .ok_or_else(|| ProtocolError::Decode("expected map".into()))
    }

    /// Returns the raw value of a field.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.pairs
            .iter()
            .find(|(k, _)| k.as_text() == Some(name))
            .map(|(_, v)| v)
            .filter(|v| !v.is_null())
    }

    /// Reads a text field.
    pub fn text(&self, name: &str) -> ProtocolResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_text()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| ProtocolError::invalid_field(name, "text")),
        }
    }

    /// Reads a byte string field.
    pub fn bytes(&self, name: &str) -> ProtocolResult<Option<Vec<u8>>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_bytes()
                .map(|b| Some(b.clone()))
                .ok_or_else(|| ProtocolError::invalid_field(name, "bytes")),
        }
    }

    /// Reads an integer field that fits in an `i64`.
    pub fn int(&self, name: &str) -> ProtocolResult<Option<i64>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_integer()
                .and_then(|i| i64::try_from(i).ok())
                .map(Some)
                .ok_or_else(|| ProtocolError::invalid_field(name, "integer")),
        }
    }

    /// Reads a boolean field.
    pub fn bool(&self, name: &str) -> ProtocolResult<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| ProtocolError::invalid_field(name, "bool")),
        }
    }

    /// Reads an identifier that may be sent as text or as an integer.
    ///
    /// Integers are returned in decimal form.
    pub fn id_token(&self, name: &str) -> ProtocolResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Text(s)) => Ok(Some(s.clone())),
            Some(Value::Integer(i)) => Ok(Some(i128::from(*i).to_string())),
            Some(_) => Err(ProtocolError::invalid_field(name, "text or integer")),
        }
    }

    /// Reads an array field.
    pub fn array(&self, name: &str) -> ProtocolResult<Option<&'a [Value]>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_array()
                .map(|a| Some(a.as_slice()))
                .ok_or_else(|| ProtocolError::invalid_field(name, "array")),
        }
    }

    /// Reads a text-to-text map field. An absent field yields an empty map.
    pub fn text_map(&self, name: &str) -> ProtocolResult<BTreeMap<String, String>> {
        let Some(value) = self.get(name) else {
            return Ok(BTreeMap::new());
        };
        let pairs = value
            .as_map()
            .ok_or_else(|| ProtocolError::invalid_field(name, "map"))?;

        let mut out = BTreeMap::new();
        for (k, v) in pairs {
            match (k.as_text(), v.as_text()) {
                (Some(k), Some(v)) => {
                    out.insert(k.to_string(), v.to_string());
                }
                _ => return Err(ProtocolError::invalid_field(name, "map of text to text")),
            }
        }
        Ok(out)
    }
}
