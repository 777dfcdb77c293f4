//! Remove command implementation.

use super::{resolve, Session};

/// Runs the remove command.
pub fn run(session: &mut Session, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let local_id = resolve(session, id)?;
    let removed = session.remove_snapshot(&local_id)?;
    println!("Removed {} ({})", removed.local_id(), removed.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_session;
    use confhub_core::{HubId, Payload, SnapshotBuilder};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn snapshot(name: &str, hub_id: Option<u64>) -> confhub_core::Snapshot {
        let mut builder = SnapshotBuilder::new()
            .name(name)
            .payload(Payload::from_sections(&BTreeMap::new()).unwrap());
        if let Some(id) = hub_id {
            builder = builder.hub_id(HubId::from(id));
        }
        builder.build().unwrap()
    }

    #[test]
    fn local_snapshot_is_removed_offline() {
        let dir = tempdir().unwrap();
        let mut session = open_session(dir.path(), None).unwrap();
        let local = snapshot("Local", None);
        let id = local.local_id().to_string();
        session.store_mut().add(local).unwrap();

        run(&mut session, &id).unwrap();
        assert!(session.store().is_empty());
    }

    #[test]
    fn published_snapshot_needs_the_hub() {
        let dir = tempdir().unwrap();
        let mut session = open_session(dir.path(), None).unwrap();
        session.store_mut().add(snapshot("Shared", Some(5))).unwrap();

        assert!(run(&mut session, "5").is_err());
        assert_eq!(session.store().len(), 1);
    }
}
