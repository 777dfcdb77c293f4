//! Create command implementation.

use super::Session;
use crate::settings::SettingsDocument;
use std::path::Path;

/// Captures the settings file into a new local snapshot.
pub fn run(
    session: &mut Session,
    settings_path: &Path,
    name: &str,
    description: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let document = SettingsDocument::load(settings_path)?;
    let registry = document.registry(std::iter::empty())?;
    if registry.is_empty() {
        tracing::warn!(path = %settings_path.display(), "settings file has no sections");
    }

    let local_id = session.create_from_current_state(&registry, name, description)?;
    println!("{}", local_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_session;
    use tempfile::tempdir;

    #[test]
    fn creates_local_only_snapshot() {
        let dir = tempdir().unwrap();
        let settings = dir.path().join("settings.json");
        std::fs::write(&settings, r#"{"theme": "dark"}"#).unwrap();

        let mut session = open_session(&dir.path().join("store"), None).unwrap();
        run(&mut session, &settings, "Dark", "").unwrap();

        let snapshots = session.list_sorted();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].name(), "Dark");
        assert!(snapshots[0].is_local_only());
        assert_eq!(snapshots[0].display_strings()["theme"], "\"dark\"");
    }
}
