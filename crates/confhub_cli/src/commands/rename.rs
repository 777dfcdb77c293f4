//! Rename command implementation.

use super::{resolve, Session};

/// Runs the rename command.
pub fn run(
    session: &mut Session,
    id: &str,
    name: &str,
    description: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let local_id = resolve(session, id)?;
    session.rename_snapshot(&local_id, name, description)?;

    if let Some(snapshot) = session.store().by_local_id(&local_id) {
        if !snapshot.is_local_only() {
            tracing::warn!(
                %local_id,
                "snapshot is published; the next sync restores the hub's name"
            );
        }
        println!("Renamed {} to {:?}", local_id, snapshot.name());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_session;
    use confhub_core::{HubId, Payload, SnapshotBuilder};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn read_only_published_snapshot_is_refused() {
        let dir = tempdir().unwrap();
        let mut session = open_session(dir.path(), None).unwrap();
        let snapshot = SnapshotBuilder::new()
            .name("Curated")
            .hub_id(HubId::from(3))
            .editable(false)
            .payload(Payload::from_sections(&BTreeMap::new()).unwrap())
            .build()
            .unwrap();
        session.store_mut().add(snapshot).unwrap();

        assert!(run(&mut session, "3", "Mine", "").is_err());
        assert_eq!(session.list_sorted()[0].name(), "Curated");
    }
}
