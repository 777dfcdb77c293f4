//! Protocol messages exchanged with the hub.

use crate::codec::{from_cbor, to_cbor, MapBuilder, MapReader};
use crate::error::{ProtocolError, ProtocolResult};
use crate::hub_id::HubId;
use crate::record::CatalogRecord;
use ciborium::Value;
use std::collections::BTreeMap;

/// A hub protocol message.
#[derive(Debug, Clone)]
pub enum HubMessage {
    /// Publish request.
    PublishRequest(PublishRequest),
    /// Publish response.
    PublishResponse(PublishResponse),
    /// List request (carries no fields).
    ListRequest,
    /// List response.
    ListResponse(ListResponse),
    /// Remove request.
    RemoveRequest(RemoveRequest),
    /// Remove response.
    RemoveResponse(RemoveResponse),
}

impl HubMessage {
    /// Returns the message type code.
    pub fn type_code(&self) -> u8 {
        match self {
            HubMessage::PublishRequest(_) => 1,
            HubMessage::PublishResponse(_) => 2,
            HubMessage::ListRequest => 3,
            HubMessage::ListResponse(_) => 4,
            HubMessage::RemoveRequest(_) => 5,
            HubMessage::RemoveResponse(_) => 6,
        }
    }

    /// Returns the endpoint path the message is posted to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            HubMessage::PublishRequest(_) | HubMessage::PublishResponse(_) => "/hub/publish",
            HubMessage::ListRequest | HubMessage::ListResponse(_) => "/hub/list",
            HubMessage::RemoveRequest(_) | HubMessage::RemoveResponse(_) => "/hub/remove",
        }
    }
}

/// Request to publish a snapshot to the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    /// Serialized settings payload.
    pub payload: Vec<u8>,
    /// Snapshot name.
    pub name: String,
    /// Snapshot description.
    pub description: String,
    /// Per-section summaries.
    pub display_strings: BTreeMap<String, String>,
}

impl PublishRequest {
    /// Creates a new publish request.
    pub fn new(payload: Vec<u8>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            payload,
            name: name.into(),
            description: description.into(),
            display_strings: BTreeMap::new(),
        }
    }

    /// Attaches per-section summaries.
    pub fn with_display_strings(mut self, display_strings: BTreeMap<String, String>) -> Self {
        self.display_strings = display_strings;
        self
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        MapBuilder::new()
            .bytes("payload", &self.payload)
            .text("name", self.name.clone())
            .text("description", self.description.clone())
            .text_map("display_strings", &self.display_strings)
            .encode()
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let value = from_cbor(bytes)?;
        let map = MapReader::new(&value)?;

        Ok(Self {
            payload: map
                .bytes("payload")?
                .ok_or_else(|| ProtocolError::invalid_field("payload", "bytes"))?,
            name: map
                .text("name")?
                .ok_or_else(|| ProtocolError::invalid_field("name", "text"))?,
            description: map.text("description")?.unwrap_or_default(),
            display_strings: map.text_map("display_strings")?,
        })
    }
}

/// Response to a publish request.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResponse {
    /// Whether the hub accepted the snapshot.
    pub success: bool,
    /// Id assigned by the hub.
    pub hub_id: Option<HubId>,
    /// Error message if rejected.
    pub error: Option<String>,
}

impl PublishResponse {
    /// Creates a successful response.
    pub fn success(hub_id: HubId) -> Self {
        Self {
            success: true,
            hub_id: Some(hub_id),
            error: None,
        }
    }

    /// Creates a failed response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            hub_id: None,
            error: Some(message.into()),
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        MapBuilder::new()
            .bool("success", self.success)
            .optional_text("hub_id", self.hub_id.as_ref().map(HubId::as_str))
            .optional_text("error", self.error.as_deref())
            .encode()
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let value = from_cbor(bytes)?;
        let map = MapReader::new(&value)?;

        let hub_id = match map.id_token("hub_id")? {
            Some(token) => Some(HubId::new(token)?),
            None => None,
        };

        Ok(Self {
            success: map.bool("success")?.unwrap_or(false),
            hub_id,
            error: map.text("error")?,
        })
    }
}

/// Response to a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse {
    /// Whether the listing succeeded.
    pub success: bool,
    /// Every record known to the hub.
    pub records: Vec<CatalogRecord>,
    /// Error message if the listing failed.
    pub error: Option<String>,
}

impl ListResponse {
    /// Creates a successful response.
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self {
            success: true,
            records,
            error: None,
        }
    }

    /// Creates a failed response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            records: Vec::new(),
            error: Some(message.into()),
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let records = self.records.iter().map(CatalogRecord::to_value).collect();
        MapBuilder::new()
            .bool("success", self.success)
            .value("records", Value::Array(records))
            .optional_text("error", self.error.as_deref())
            .encode()
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let value = from_cbor(bytes)?;
        let map = MapReader::new(&value)?;

        let records = map
            .array("records")?
            .unwrap_or_default()
            .iter()
            .map(CatalogRecord::from_value)
            .collect::<ProtocolResult<Vec<_>>>()?;

        Ok(Self {
            success: map.bool("success")?.unwrap_or(false),
            records,
            error: map.text("error")?,
        })
    }
}

/// Request to remove a record from the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveRequest {
    /// Record to remove.
    pub hub_id: HubId,
}

impl RemoveRequest {
    /// Creates a new remove request.
    pub fn new(hub_id: HubId) -> Self {
        Self { hub_id }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        MapBuilder::new()
            .text("hub_id", self.hub_id.as_str())
            .encode()
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let value = from_cbor(bytes)?;
        let map = MapReader::new(&value)?;
        let token = map
            .id_token("hub_id")?
            .ok_or_else(|| ProtocolError::invalid_field("hub_id", "text or integer"))?;
        Ok(Self {
            hub_id: HubId::new(token)?,
        })
    }
}

/// Response to a remove request.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveResponse {
    /// Whether the record was removed.
    pub success: bool,
    /// Error message if refused.
    pub error: Option<String>,
    /// The hub has no record with the requested id.
    pub not_found: bool,
}

impl RemoveResponse {
    /// Creates a successful response.
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
            not_found: false,
        }
    }

    /// Creates a failed response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            not_found: false,
        }
    }

    /// Creates a response for an id the hub does not know.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            not_found: true,
            ..Self::error(message)
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        MapBuilder::new()
            .bool("success", self.success)
            .optional_text("error", self.error.as_deref())
            .bool("not_found", self.not_found)
            .encode()
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let value = from_cbor(bytes)?;
        let map = MapReader::new(&value)?;
        Ok(Self {
            success: map.bool("success")?.unwrap_or(false),
            error: map.text("error")?,
            not_found: map.bool("not_found")?.unwrap_or(false),
        })
    }
}

/// Encodes the empty body of a list request.
pub(crate) fn empty_body() -> ProtocolResult<Vec<u8>> {
    to_cbor(&Value::Map(Vec::new()))
}

impl HubMessage {
    /// Encodes the message body.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        match self {
            HubMessage::PublishRequest(m) => m.encode(),
            HubMessage::PublishResponse(m) => m.encode(),
            HubMessage::ListRequest => empty_body(),
            HubMessage::ListResponse(m) => m.encode(),
            HubMessage::RemoveRequest(m) => m.encode(),
            HubMessage::RemoveResponse(m) => m.encode(),
        }
    }
}
