//! Hub configuration.

/// Configuration for the hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Largest payload accepted by publish, in bytes.
    pub max_payload_bytes: usize,
    /// Longest name accepted by publish, in characters.
    pub max_name_len: usize,
    /// Edit right granted to newly published records.
    pub default_editable: bool,
    /// Remove right granted to newly published records.
    pub default_removable: bool,
}

impl HubConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            max_payload_bytes: 1024 * 1024,
            max_name_len: 200,
            default_editable: true,
            default_removable: true,
        }
    }

    /// Sets the maximum payload size.
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    /// Sets the maximum name length.
    pub fn with_max_name_len(mut self, max: usize) -> Self {
        self.max_name_len = max;
        self
    }

    /// Sets the rights granted to new records.
    pub fn with_default_rights(mut self, editable: bool, removable: bool) -> Self {
        self.default_editable = editable;
        self.default_removable = removable;
        self
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HubConfig::default();
        assert_eq!(config.max_payload_bytes, 1024 * 1024);
        assert!(config.default_editable);
        assert!(config.default_removable);
    }

    #[test]
    fn config_builder() {
        let config = HubConfig::new()
            .with_max_payload_bytes(16)
            .with_max_name_len(8)
            .with_default_rights(false, true);

        assert_eq!(config.max_payload_bytes, 16);
        assert_eq!(config.max_name_len, 8);
        assert!(!config.default_editable);
        assert!(config.default_removable);
    }
}
