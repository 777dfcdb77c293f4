//! Settings capture/apply registry.
//!
//! Each feature that owns settings registers a [`SettingsSection`]. A
//! capture asks every section for its current state and packs the results
//! into a [`Payload`]; applying a payload hands each state back to the
//! section that owns it.

use crate::error::{CoreError, CoreResult};
use crate::payload::{Payload, SectionState};
use std::collections::BTreeMap;

/// One named settings module whose state can be captured and restored.
pub trait SettingsSection {
    /// Unique section name used as the payload key.
    fn name(&self) -> &str;

    /// Returns the section's current state.
    fn current_state(&self) -> SectionState;

    /// Replaces the section's state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not acceptable to the section.
    fn apply_state(&mut self, state: &SectionState) -> CoreResult<()>;

    /// Human-readable summary of a state, shown next to the snapshot.
    fn summary(&self, state: &SectionState) -> String {
        summarize(state)
    }
}

/// Generic summary: entry counts for containers, the value itself for
/// scalars.
fn summarize(state: &SectionState) -> String {
    match state {
        SectionState::Null => "not configured".to_string(),
        SectionState::Object(map) if map.len() == 1 => "1 setting".to_string(),
        SectionState::Object(map) => format!("{} settings", map.len()),
        SectionState::Array(items) if items.len() == 1 => "1 entry".to_string(),
        SectionState::Array(items) => format!("{} entries", items.len()),
        other => other.to_string(),
    }
}

/// Output of [`SettingsRegistry::capture`].
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Serialized state of every section.
    pub payload: Payload,
    /// Summary per section.
    pub display_strings: BTreeMap<String, String>,
}

/// Outcome of [`SettingsRegistry::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Sections whose state was applied.
    pub applied: Vec<String>,
    /// Sections present in the payload but not registered here.
    pub skipped: Vec<String>,
}

/// Ordered collection of settings sections.
#[derive(Default)]
pub struct SettingsRegistry {
    sections: Vec<Box<dyn SettingsSection>>,
}

impl SettingsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a section.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateSection`] if the name is taken.
    pub fn register(&mut self, section: Box<dyn SettingsSection>) -> CoreResult<()> {
        if self.sections.iter().any(|s| s.name() == section.name()) {
            return Err(CoreError::DuplicateSection(section.name().to_string()));
        }
        self.sections.push(section);
        Ok(())
    }

    /// Returns the registered section names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of registered sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns true if no sections are registered.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Captures the current state of every section.
    ///
    /// # Errors
    ///
    /// Returns an error if the states cannot be serialized.
    pub fn capture(&self) -> CoreResult<Capture> {
        let mut states = BTreeMap::new();
        let mut display_strings = BTreeMap::new();

        for section in &self.sections {
            let state = section.current_state();
            display_strings.insert(section.name().to_string(), section.summary(&state));
            states.insert(section.name().to_string(), state);
        }

        Ok(Capture {
            payload: Payload::from_sections(&states)?,
            display_strings,
        })
    }

    /// Summarizes a payload with the registered sections' summaries.
    ///
    /// Sections not registered here are summarized generically.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not decode.
    pub fn describe(&self, payload: &Payload) -> CoreResult<BTreeMap<String, String>> {
        let states = payload.sections()?;
        Ok(states
            .iter()
            .map(|(name, state)| {
                let summary = match self.sections.iter().find(|s| s.name() == name) {
                    Some(section) => section.summary(state),
                    None => summarize(state),
                };
                (name.clone(), summary)
            })
            .collect())
    }

    /// Applies a payload to the registered sections.
    ///
    /// Sections absent from the payload are left untouched. Payload
    /// sections without a registered owner are skipped. The first section
    /// that fails stops the apply; sections applied before it keep their
    /// new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not decode or a section rejects
    /// its state.
    pub fn apply(&mut self, payload: &Payload) -> CoreResult<ApplyReport> {
        let states = payload.sections()?;
        let mut report = ApplyReport::default();

        for section in &mut self.sections {
            if let Some(state) = states.get(section.name()) {
                section.apply_state(state).map_err(|e| match e {
                    CoreError::Settings { .. } => e,
                    other => CoreError::settings(section.name(), other.to_string()),
                })?;
                tracing::debug!(section = section.name(), "applied settings section");
                report.applied.push(section.name().to_string());
            }
        }

        for name in states.keys() {
            if !self.sections.iter().any(|s| s.name() == name) {
                tracing::warn!(section = %name, "payload section has no registered owner, skipping");
                report.skipped.push(name.clone());
            }
        }

        Ok(report)
    }
}

impl std::fmt::Debug for SettingsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsRegistry")
            .field("sections", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Section backed by a shared cell so tests can observe applies.
    struct CellSection {
        name: &'static str,
        state: Arc<Mutex<SectionState>>,
    }

    impl CellSection {
        fn new(name: &'static str, state: SectionState) -> (Self, Arc<Mutex<SectionState>>) {
            let cell = Arc::new(Mutex::new(state));
            (
                Self {
                    name,
                    state: Arc::clone(&cell),
                },
                cell,
            )
        }
    }

    impl SettingsSection for CellSection {
        fn name(&self) -> &str {
            self.name
        }

        fn current_state(&self) -> SectionState {
            self.state.lock().unwrap().clone()
        }

        fn apply_state(&mut self, state: &SectionState) -> CoreResult<()> {
            if !state.is_object() {
                return Err(CoreError::settings(self.name, "expected an object"));
            }
            *self.state.lock().unwrap() = state.clone();
            Ok(())
        }
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut registry = SettingsRegistry::new();
        let (a, _) = CellSection::new("titles", json!({}));
        let (b, _) = CellSection::new("titles", json!({}));

        registry.register(Box::new(a)).unwrap();
        let result = registry.register(Box::new(b));
        assert!(matches!(result, Err(CoreError::DuplicateSection(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn capture_collects_every_section() {
        let mut registry = SettingsRegistry::new();
        let (titles, _) = CellSection::new("titles", json!({"separator": "-", "home": "Blog"}));
        let (sitemap, _) = CellSection::new("sitemap", json!({"enabled": true}));
        registry.register(Box::new(titles)).unwrap();
        registry.register(Box::new(sitemap)).unwrap();

        let capture = registry.capture().unwrap();
        let sections = capture.payload.sections().unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections["sitemap"], json!({"enabled": true}));
        assert_eq!(capture.display_strings["titles"], "2 settings");
        assert_eq!(capture.display_strings["sitemap"], "1 setting");
    }

    #[test]
    fn apply_restores_state_and_skips_unknown() {
        let mut registry = SettingsRegistry::new();
        let (titles, cell) = CellSection::new("titles", json!({"separator": "-"}));
        registry.register(Box::new(titles)).unwrap();

        let mut states = BTreeMap::new();
        states.insert("titles".to_string(), json!({"separator": "|"}));
        states.insert("legacy".to_string(), json!([1, 2]));
        let payload = Payload::from_sections(&states).unwrap();

        let report = registry.apply(&payload).unwrap();
        assert_eq!(report.applied, vec!["titles"]);
        assert_eq!(report.skipped, vec!["legacy"]);
        assert_eq!(*cell.lock().unwrap(), json!({"separator": "|"}));
    }

    #[test]
    fn apply_reports_failing_section() {
        let mut registry = SettingsRegistry::new();
        let (titles, _) = CellSection::new("titles", json!({}));
        registry.register(Box::new(titles)).unwrap();

        let mut states = BTreeMap::new();
        states.insert("titles".to_string(), json!("not an object"));
        let payload = Payload::from_sections(&states).unwrap();

        let result = registry.apply(&payload);
        assert!(matches!(result, Err(CoreError::Settings { ref section, .. }) if section == "titles"));
    }

    #[test]
    fn describe_uses_generic_summary_for_unknown_sections() {
        let registry = SettingsRegistry::new();
        let mut states = BTreeMap::new();
        states.insert("redirects".to_string(), json!([{"from": "/a"}, {"from": "/b"}]));
        states.insert("flag".to_string(), json!(true));
        let payload = Payload::from_sections(&states).unwrap();

        let summaries = registry.describe(&payload).unwrap();
        assert_eq!(summaries["redirects"], "2 entries");
        assert_eq!(summaries["flag"], "true");
    }
}
