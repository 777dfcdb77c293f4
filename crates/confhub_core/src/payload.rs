//! Opaque settings payload.

use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;
use std::fmt;

/// State of one settings section, as produced by its owner.
pub type SectionState = serde_json::Value;

/// Serialized settings state carried by a snapshot.
///
/// The bytes are the CBOR encoding of a `section name -> state` map. Only
/// [`Payload::from_sections`] and [`Payload::sections`] know that shape;
/// the store and the sync engine move the bytes around untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wraps already-serialized bytes without checking them.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Serializes a section map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if a state cannot be serialized.
    pub fn from_sections(sections: &BTreeMap<String, SectionState>) -> CoreResult<Self> {
        let mut bytes = Vec::new();
        ciborium::into_writer(sections, &mut bytes)
            .map_err(|e| CoreError::Codec(format!("failed to encode payload: {}", e)))?;
        Ok(Self(bytes))
    }

    /// Deserializes the section map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if the bytes are not a valid payload.
    pub fn sections(&self) -> CoreResult<BTreeMap<String, SectionState>> {
        ciborium::from_reader(self.0.as_slice())
            .map_err(|e| CoreError::Codec(format!("failed to decode payload: {}", e)))
    }

    /// Returns the serialized bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the payload, returning the serialized bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the serialized size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}
