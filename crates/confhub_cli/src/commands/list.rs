//! List command implementation.

use super::Session;
use confhub_core::Snapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// One snapshot as shown by `list` and `show`.
#[derive(Debug, Serialize)]
pub struct SnapshotSummary {
    /// Local id.
    pub local_id: String,
    /// Hub id, absent while unpublished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Curated by the hub operator.
    pub official: bool,
    /// Metadata may be changed.
    pub editable: bool,
    /// May be deleted.
    pub removable: bool,
    /// Per-section summaries.
    pub display_strings: BTreeMap<String, String>,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            local_id: snapshot.local_id().to_string(),
            hub_id: snapshot.hub_id().map(|id| id.to_string()),
            name: snapshot.name().to_string(),
            description: snapshot.description().to_string(),
            timestamp: snapshot.timestamp(),
            official: snapshot.official(),
            editable: snapshot.editable(),
            removable: snapshot.removable(),
            display_strings: snapshot.display_strings().clone(),
        }
    }
}

/// Runs the list command.
pub fn run(session: &Session, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let summaries: Vec<SnapshotSummary> = session
        .list_sorted()
        .into_iter()
        .map(SnapshotSummary::from)
        .collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        _ => print_text_output(&summaries),
    }

    Ok(())
}

fn print_text_output(summaries: &[SnapshotSummary]) {
    if summaries.is_empty() {
        println!("No snapshots");
        return;
    }

    println!("{:<10} {:<8} {:<3} {}", "ID", "HUB", "", "NAME");
    for summary in summaries {
        let flag = if summary.official { "*" } else { "" };
        println!(
            "{:<10} {:<8} {:<3} {}",
            &summary.local_id[..8],
            summary.hub_id.as_deref().unwrap_or("-"),
            flag,
            summary.name
        );
    }
}
