//! Catalog records as listed by the hub.

use crate::codec::{from_cbor, MapBuilder, MapReader};
use crate::error::ProtocolResult;
use ciborium::Value;
use std::collections::BTreeMap;

/// One snapshot as the hub lists it.
///
/// Records are decoded leniently: a missing id or payload is kept as an
/// empty value so the receiver can reject the record explicitly instead of
/// failing the whole listing at the codec level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogRecord {
    /// Catalog id as sent by the hub (possibly blank).
    pub hub_id: String,
    /// Serialized settings payload.
    pub payload: Vec<u8>,
    /// Snapshot name.
    pub name: String,
    /// Snapshot description.
    pub description: String,
    /// Creation time recorded by the hub (seconds since the Unix epoch).
    pub created_time: i64,
    /// Whether the publisher may edit the record.
    pub editable: bool,
    /// Whether the publisher may remove the record.
    pub removable: bool,
    /// Whether the hub has vetted the record.
    pub official: bool,
    /// Per-section summaries captured alongside the payload.
    pub display_strings: BTreeMap<String, String>,
}

impl CatalogRecord {
    /// Creates a record with the given id, payload and name.
    pub fn new(hub_id: impl Into<String>, payload: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            hub_id: hub_id.into(),
            payload,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the creation time.
    pub fn with_created_time(mut self, created_time: i64) -> Self {
        self.created_time = created_time;
        self
    }

    /// Sets the editable, removable and official flags.
    pub fn with_flags(mut self, editable: bool, removable: bool, official: bool) -> Self {
        self.editable = editable;
        self.removable = removable;
        self.official = official;
        self
    }

    /// Sets the per-section summaries.
    pub fn with_display_strings(mut self, display_strings: BTreeMap<String, String>) -> Self {
        self.display_strings = display_strings;
        self
    }

    /// Encodes to a CBOR map value.
    pub fn to_value(&self) -> Value {
        MapBuilder::new()
            .text("hub_id", self.hub_id.clone())
            .bytes("payload", &self.payload)
            .text("name", self.name.clone())
            .text("description", self.description.clone())
            .int("created_time", self.created_time)
            .bool("editable", self.editable)
            .bool("removable", self.removable)
            .bool("official", self.official)
            .text_map("display_strings", &self.display_strings)
            .build()
    }

    /// Decodes from a CBOR map value.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let map = MapReader::new(value)?;

        Ok(Self {
            hub_id: map.id_token("hub_id")?.unwrap_or_default(),
            payload: map.bytes("payload")?.unwrap_or_default(),
            name: map.text("name")?.unwrap_or_default(),
            description: map.text("description")?.unwrap_or_default(),
            created_time: map.int("created_time")?.unwrap_or(0),
            editable: map.bool("editable")?.unwrap_or(false),
            removable: map.bool("removable")?.unwrap_or(false),
            official: map.bool("official")?.unwrap_or(false),
            display_strings: map.text_map("display_strings")?,
        })
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        crate::codec::to_cbor(&self.to_value())
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Self::from_value(&from_cbor(bytes)?)
    }
}
