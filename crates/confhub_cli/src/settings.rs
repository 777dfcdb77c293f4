//! Settings file backed by a JSON document.
//!
//! Each top-level key of the document is one settings section. The file
//! stands in for the per-feature settings modules of a real application.

use confhub_core::{CoreResult, SectionState, SettingsRegistry, SettingsSection};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// File name used when `--settings` is not given.
pub const DEFAULT_FILE: &str = "settings.json";

type Sections = Rc<RefCell<Map<String, Value>>>;

/// A JSON settings document on disk.
pub struct SettingsDocument {
    path: PathBuf,
    sections: Sections,
}

impl SettingsDocument {
    /// Loads the document; a missing file is an empty document.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let sections = if path.exists() {
            match serde_json::from_str(&std::fs::read_to_string(path)?)? {
                Value::Object(map) => map,
                _ => return Err(format!("{} must hold a JSON object", path.display()).into()),
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            sections: Rc::new(RefCell::new(sections)),
        })
    }

    /// Builds a registry with one section per document key plus `extra`.
    ///
    /// Sections registered through `extra` start out unset, so applying a
    /// payload can introduce sections the document does not have yet.
    pub fn registry<'a>(
        &self,
        extra: impl IntoIterator<Item = &'a String>,
    ) -> CoreResult<SettingsRegistry> {
        let mut names: BTreeSet<String> = self.sections.borrow().keys().cloned().collect();
        names.extend(extra.into_iter().cloned());

        let mut registry = SettingsRegistry::new();
        for name in names {
            registry.register(Box::new(DocumentSection {
                name,
                sections: Rc::clone(&self.sections),
            }))?;
        }
        Ok(registry)
    }

    /// Writes the document back to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let text = serde_json::to_string_pretty(&Value::Object(self.sections.borrow().clone()))?;
        std::fs::write(&self.path, text + "\n")?;
        Ok(())
    }
}

struct DocumentSection {
    name: String,
    sections: Sections,
}

impl SettingsSection for DocumentSection {
    fn name(&self) -> &str {
        &self.name
    }

    fn current_state(&self) -> SectionState {
        self.sections
            .borrow()
            .get(&self.name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn apply_state(&mut self, state: &SectionState) -> CoreResult<()> {
        self.sections
            .borrow_mut()
            .insert(self.name.clone(), state.clone());
        Ok(())
    }
}
