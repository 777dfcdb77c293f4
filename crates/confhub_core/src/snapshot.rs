//! Snapshot value type and builder.

use crate::error::{CoreError, CoreResult};
use crate::id::LocalId;
use crate::payload::Payload;
use crate::settings::SettingsRegistry;
use confhub_sync_protocol::codec::{from_cbor, MapBuilder, MapReader};
use confhub_sync_protocol::{CatalogRecord, HubId, PublishRequest};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A named, timestamped capture of an installation's full settings state.
///
/// Snapshots are created either by [`Snapshot::capture`] (local-only, no
/// hub id) or by [`Snapshot::from_remote_record`] (hub id set). The
/// `local_id` is fixed at construction; the hub id can only be assigned
/// through [`crate::SnapshotStore::assign_hub_id`], which keeps hub ids
/// unique within a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    local_id: LocalId,
    hub_id: Option<HubId>,
    name: String,
    description: String,
    payload: Payload,
    display_strings: BTreeMap<String, String>,
    editable: bool,
    removable: bool,
    official: bool,
    timestamp: i64,
}

impl Snapshot {
    /// Captures the current state of every registered settings section.
    ///
    /// The snapshot gets a fresh `local_id`, the current time and no hub id.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or a section state cannot be
    /// serialized.
    pub fn capture(
        registry: &SettingsRegistry,
        name: &str,
        description: &str,
    ) -> CoreResult<Self> {
        let capture = registry.capture()?;
        SnapshotBuilder::new()
            .name(name)
            .description(description)
            .payload(capture.payload)
            .display_strings(capture.display_strings)
            .build()
    }

    /// Builds a snapshot from a record listed by the hub.
    ///
    /// The record must carry a non-blank catalog id and a payload that
    /// deserializes; otherwise an explicit [`CoreError::InvalidRecord`] is
    /// returned and the record must not be used. A name that sanitizes to
    /// nothing is replaced with [`UNTITLED_NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] on validation failure.
    pub fn from_remote_record(record: &CatalogRecord) -> CoreResult<Self> {
        let hub_id = HubId::new(&record.hub_id)
            .map_err(|_| CoreError::invalid_record(&record.hub_id, "missing catalog id"))?;

        let payload = Payload::from_bytes(record.payload.clone());
        payload
            .sections()
            .map_err(|e| CoreError::invalid_record(&record.hub_id, e.to_string()))?;

        let mut name = sanitize_name(&record.name);
        if name.is_empty() {
            tracing::debug!(%hub_id, "hub record has a blank name");
            name = UNTITLED_NAME.to_string();
        }

        SnapshotBuilder::new()
            .hub_id(hub_id)
            .name(&name)
            .description(&record.description)
            .payload(payload)
            .display_strings(record.display_strings.clone())
            .editable(record.editable)
            .removable(record.removable)
            .official(record.official)
            .timestamp(record.created_time)
            .build()
            .map_err(|e| CoreError::invalid_record(&record.hub_id, e.to_string()))
    }

    /// Returns the immutable local id.
    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    /// Returns the hub id, if published.
    pub fn hub_id(&self) -> Option<&HubId> {
        self.hub_id.as_ref()
    }

    /// Returns true if the hub has never acknowledged this snapshot.
    pub fn is_local_only(&self) -> bool {
        self.hub_id.is_none()
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the per-section summaries.
    pub fn display_strings(&self) -> &BTreeMap<String, String> {
        &self.display_strings
    }

    /// Returns whether the snapshot may be edited.
    pub fn editable(&self) -> bool {
        self.editable
    }

    /// Returns whether the snapshot may be removed.
    pub fn removable(&self) -> bool {
        self.removable
    }

    /// Returns whether the hub vetted this snapshot.
    pub fn official(&self) -> bool {
        self.official
    }

    /// Returns the creation time in seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Renames the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSnapshot`] if the sanitized name is empty.
    pub fn set_name(&mut self, name: &str) -> CoreResult<()> {
        let name = sanitize_name(name);
        if name.is_empty() {
            return Err(CoreError::InvalidSnapshot("name is required".into()));
        }
        self.name = name;
        Ok(())
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: &str) {
        self.description = sanitize_description(description);
    }

    /// Sets the official marker.
    pub fn set_official(&mut self, official: bool) {
        self.official = official;
    }

    /// Sets the editable right.
    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    /// Sets the removable right.
    pub fn set_removable(&mut self, removable: bool) {
        self.removable = removable;
    }

    /// Sets the timestamp.
    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    /// Overwrites catalog metadata from the hub's copy of this snapshot.
    ///
    /// Name, description, official marker, timestamp and the edit/remove
    /// rights are taken from `remote`. `local_id`, `hub_id` and the payload
    /// are left as they are.
    pub fn refresh_from(&mut self, remote: &Snapshot) {
        self.name = remote.name.clone();
        self.description = remote.description.clone();
        self.official = remote.official;
        self.timestamp = remote.timestamp;
        self.editable = remote.editable;
        self.removable = remote.removable;
    }

    /// Returns true if `refresh_from(remote)` would change anything.
    pub fn differs_in_metadata(&self, remote: &Snapshot) -> bool {
        self.name != remote.name
            || self.description != remote.description
            || self.official != remote.official
            || self.timestamp != remote.timestamp
            || self.editable != remote.editable
            || self.removable != remote.removable
    }

    /// Builds the request that publishes this snapshot.
    pub fn publish_request(&self) -> PublishRequest {
        PublishRequest::new(
            self.payload.as_bytes().to_vec(),
            self.name.clone(),
            self.description.clone(),
        )
        .with_display_strings(self.display_strings.clone())
    }

    pub(crate) fn set_hub_id(&mut self, hub_id: HubId) {
        self.hub_id = Some(hub_id);
    }

    /// Encodes the storage record.
    pub(crate) fn encode_record(&self) -> CoreResult<Vec<u8>> {
        Ok(MapBuilder::new()
            .text("local_id", self.local_id.to_string())
            .optional_text("hub_id", self.hub_id.as_ref().map(HubId::as_str))
            .text("name", self.name.clone())
            .text("description", self.description.clone())
            .bytes("payload", self.payload.as_bytes())
            .text_map("display_strings", &self.display_strings)
            .bool("editable", self.editable)
            .bool("removable", self.removable)
            .bool("official", self.official)
            .int("timestamp", self.timestamp)
            .encode()?)
    }

    /// Decodes a storage record.
    pub(crate) fn decode_record(bytes: &[u8]) -> CoreResult<Self> {
        let value = from_cbor(bytes)?;
        let map = MapReader::new(&value)?;

        let local_id = map
            .text("local_id")?
            .and_then(|s| s.parse::<LocalId>().ok())
            .ok_or_else(|| CoreError::InvalidSnapshot("record has no valid local_id".into()))?;

        let mut builder = SnapshotBuilder::new()
            .local_id(local_id)
            .name(&map.text("name")?.unwrap_or_default())
            .description(&map.text("description")?.unwrap_or_default())
            .display_strings(map.text_map("display_strings")?)
            .editable(map.bool("editable")?.unwrap_or(true))
            .removable(map.bool("removable")?.unwrap_or(true))
            .official(map.bool("official")?.unwrap_or(false))
            .timestamp(map.int("timestamp")?.unwrap_or(0));

        if let Some(payload) = map.bytes("payload")? {
            builder = builder.payload(Payload::from_bytes(payload));
        }
        if let Some(hub_id) = map.text("hub_id")? {
            builder = builder.hub_id(HubId::new(hub_id)?);
        }

        builder.build()
    }
}

/// Validating builder for [`Snapshot`].
///
/// A name (non-empty after sanitizing) and a payload are required.
/// Everything else has a default: a fresh local id, no hub id, editable
/// and removable, not official, stamped with the current time.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    local_id: Option<LocalId>,
    hub_id: Option<HubId>,
    name: Option<String>,
    description: String,
    payload: Option<Payload>,
    display_strings: BTreeMap<String, String>,
    editable: bool,
    removable: bool,
    official: bool,
    timestamp: Option<i64>,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self {
            local_id: None,
            hub_id: None,
            name: None,
            description: String::new(),
            payload: None,
            display_strings: BTreeMap::new(),
            editable: true,
            removable: true,
            official: false,
            timestamp: None,
        }
    }
}

impl SnapshotBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing local id instead of a fresh one.
    pub fn local_id(mut self, local_id: LocalId) -> Self {
        self.local_id = Some(local_id);
        self
    }

    /// Sets the hub id.
    pub fn hub_id(mut self, hub_id: HubId) -> Self {
        self.hub_id = Some(hub_id);
        self
    }

    /// Sets the name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(sanitize_name(name));
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: &str) -> Self {
        self.description = sanitize_description(description);
        self
    }

    /// Sets the payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the per-section summaries.
    pub fn display_strings(mut self, display_strings: BTreeMap<String, String>) -> Self {
        self.display_strings = display_strings;
        self
    }

    /// Sets the editable right.
    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Sets the removable right.
    pub fn removable(mut self, removable: bool) -> Self {
        self.removable = removable;
        self
    }

    /// Sets the official marker.
    pub fn official(mut self, official: bool) -> Self {
        self.official = official;
        self
    }

    /// Sets the timestamp (seconds since the Unix epoch).
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builds the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSnapshot`] if the name or payload is
    /// missing.
    pub fn build(self) -> CoreResult<Snapshot> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CoreError::InvalidSnapshot("name is required".into()))?;
        let payload = self
            .payload
            .ok_or_else(|| CoreError::InvalidSnapshot("payload is required".into()))?;

        Ok(Snapshot {
            local_id: self.local_id.unwrap_or_default(),
            hub_id: self.hub_id,
            name,
            description: self.description,
            payload,
            display_strings: self.display_strings,
            editable: self.editable,
            removable: self.removable,
            official: self.official,
            timestamp: self.timestamp.unwrap_or_else(unix_now),
        })
    }
}

/// Name given to hub records whose name is blank.
pub const UNTITLED_NAME: &str = "Untitled";

/// Trims a snapshot name and strips every control character.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Trims a description and strips control characters other than line
/// breaks and tabs.
pub fn sanitize_description(description: &str) -> String {
    description
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Current time in seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn empty_payload() -> Payload {
        Payload::from_sections(&BTreeMap::new()).unwrap()
    }

    #[test]
    fn builder_requires_name_and_payload() {
        let missing_name = SnapshotBuilder::new().payload(empty_payload()).build();
        assert!(matches!(missing_name, Err(CoreError::InvalidSnapshot(_))));

        let blank_name = SnapshotBuilder::new()
            .name("  \u{7} ")
            .payload(empty_payload())
            .build();
        assert!(matches!(blank_name, Err(CoreError::InvalidSnapshot(_))));

        let missing_payload = SnapshotBuilder::new().name("ok").build();
        assert!(matches!(missing_payload, Err(CoreError::InvalidSnapshot(_))));
    }

    #[test]
    fn builder_defaults() {
        let snapshot = SnapshotBuilder::new()
            .name("  My Config ")
            .description(" first\ttry\n")
            .payload(empty_payload())
            .build()
            .unwrap();

        assert_eq!(snapshot.name(), "My Config");
        assert_eq!(snapshot.description(), "first\ttry");
        assert!(snapshot.is_local_only());
        assert!(snapshot.editable());
        assert!(snapshot.removable());
        assert!(!snapshot.official());
        assert!(snapshot.timestamp() > 0);
    }

    #[test]
    fn from_remote_record_valid() {
        let record = CatalogRecord::new("42", empty_payload().into_bytes(), "Shop")
            .with_description("Store defaults")
            .with_created_time(1_650_000_000)
            .with_flags(false, true, true);

        let snapshot = Snapshot::from_remote_record(&record).unwrap();
        assert_eq!(snapshot.hub_id(), Some(&HubId::from(42)));
        assert_eq!(snapshot.name(), "Shop");
        assert_eq!(snapshot.description(), "Store defaults");
        assert_eq!(snapshot.timestamp(), 1_650_000_000);
        assert!(!snapshot.editable());
        assert!(snapshot.removable());
        assert!(snapshot.official());
    }

    #[test]
    fn from_remote_record_rejects_missing_id() {
        let record = CatalogRecord::new(" ", empty_payload().into_bytes(), "No id");
        let result = Snapshot::from_remote_record(&record);
        assert!(matches!(result, Err(CoreError::InvalidRecord { .. })));
    }

    #[test]
    fn from_remote_record_rejects_bad_payload() {
        let record = CatalogRecord::new("5", b"not cbor at all".to_vec(), "Broken");
        let result = Snapshot::from_remote_record(&record);
        assert!(matches!(result, Err(CoreError::InvalidRecord { .. })));
    }

    #[test]
    fn from_remote_record_names_blank_records() {
        for raw in ["", "   ", "\u{7}"] {
            let record = CatalogRecord::new("5", empty_payload().into_bytes(), raw);
            let snapshot = Snapshot::from_remote_record(&record).unwrap();
            assert_eq!(snapshot.name(), UNTITLED_NAME);
            assert_eq!(snapshot.hub_id(), Some(&HubId::from(5)));
        }
    }

    #[test]
    fn refresh_keeps_identity_and_payload() {
        let mut sections = BTreeMap::new();
        sections.insert("titles".to_string(), serde_json::json!({"sep": "|"}));
        let local_payload = Payload::from_sections(&sections).unwrap();

        let mut local = SnapshotBuilder::new()
            .name("Old")
            .hub_id(HubId::from(7))
            .payload(local_payload.clone())
            .timestamp(100)
            .build()
            .unwrap();
        let id = local.local_id();

        let remote = SnapshotBuilder::new()
            .name("New")
            .description("renamed on hub")
            .hub_id(HubId::from(7))
            .payload(empty_payload())
            .official(true)
            .timestamp(200)
            .build()
            .unwrap();

        assert!(local.differs_in_metadata(&remote));
        local.refresh_from(&remote);
        assert!(!local.differs_in_metadata(&remote));

        assert_eq!(local.local_id(), id);
        assert_eq!(local.payload(), &local_payload);
        assert_eq!(local.name(), "New");
        assert_eq!(local.description(), "renamed on hub");
        assert!(local.official());
        assert_eq!(local.timestamp(), 200);
    }

    #[test]
    fn record_roundtrip() {
        let mut labels = BTreeMap::new();
        labels.insert("sitemap".to_string(), "3 settings".to_string());

        let snapshot = SnapshotBuilder::new()
            .name("Stored")
            .description("kept on disk")
            .hub_id(HubId::new("abc").unwrap())
            .payload(empty_payload())
            .display_strings(labels)
            .official(true)
            .timestamp(12345)
            .build()
            .unwrap();

        let decoded = Snapshot::decode_record(&snapshot.encode_record().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn set_name_rejects_blank() {
        let mut snapshot = SnapshotBuilder::new()
            .name("Named")
            .payload(empty_payload())
            .build()
            .unwrap();
        assert!(snapshot.set_name("   ").is_err());
        assert_eq!(snapshot.name(), "Named");
        snapshot.set_name(" Renamed ").unwrap();
        assert_eq!(snapshot.name(), "Renamed");
    }

    #[test]
    fn publish_request_carries_payload() {
        let snapshot = SnapshotBuilder::new()
            .name("Push me")
            .description("desc")
            .payload(empty_payload())
            .build()
            .unwrap();
        let request = snapshot.publish_request();
        assert_eq!(request.payload, snapshot.payload().as_bytes());
        assert_eq!(request.name, "Push me");
        assert_eq!(request.description, "desc");
    }

    proptest! {
        #[test]
        fn sanitized_names_have_no_controls_or_padding(raw in "\\PC*[\\x00-\\x1f]?\\PC*") {
            let name = sanitize_name(&raw);
            prop_assert!(!name.chars().any(char::is_control));
            prop_assert_eq!(name.trim(), name.as_str());
        }
    }
}
