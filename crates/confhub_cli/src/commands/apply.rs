//! Apply command implementation.

use super::{resolve, Session};
use crate::settings::SettingsDocument;
use std::path::Path;

/// Writes a snapshot's sections into the settings file.
pub fn run(
    session: &Session,
    id: &str,
    settings_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let local_id = resolve(session, id)?;
    let snapshot = session
        .store()
        .by_local_id(&local_id)
        .ok_or_else(|| format!("No snapshot {}", local_id))?;
    let sections = snapshot.payload().sections()?;

    let document = SettingsDocument::load(settings_path)?;
    let mut registry = document.registry(sections.keys())?;
    let report = session.apply_snapshot(&local_id, &mut registry)?;
    document.save()?;

    println!("Applied {} to {}", snapshot.name(), settings_path.display());
    for name in &report.applied {
        println!("  applied: {}", name);
    }
    for name in &report.skipped {
        println!("  skipped: {}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{create, open_session};
    use serde_json::{json, Value};
    use tempfile::tempdir;

    #[test]
    fn restores_captured_sections() {
        let dir = tempdir().unwrap();
        let settings = dir.path().join("settings.json");
        std::fs::write(&settings, r#"{"editor": {"tab_width": 4}, "theme": "dark"}"#).unwrap();

        let mut session = open_session(&dir.path().join("store"), None).unwrap();
        create::run(&mut session, &settings, "Before", "").unwrap();
        let id = session.list_sorted()[0].local_id().to_string();

        std::fs::write(&settings, r#"{"editor": {"tab_width": 8}}"#).unwrap();
        run(&session, &id, &settings).unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&settings).unwrap()).unwrap();
        assert_eq!(written, json!({"editor": {"tab_width": 4}, "theme": "dark"}));
    }
}
