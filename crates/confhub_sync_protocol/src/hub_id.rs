//! Hub-assigned snapshot identifier.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;

/// Identifier assigned by the hub once a snapshot is published.
///
/// Hubs may hand out numeric or textual ids; numeric ids are kept in
/// their decimal form so both compare the same way. A `HubId` is never
/// blank.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HubId(String);

impl HubId {
    /// Creates a hub id from a token, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidHubId`] if the token is blank.
    pub fn new(token: impl AsRef<str>) -> ProtocolResult<Self> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::InvalidHubId(token.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the id as a number if the hub issued a numeric id.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl From<u64> for HubId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HubId({})", self.0)
    }
}
