//! Show command implementation.

use super::list::SnapshotSummary;
use super::{resolve, Session};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
struct SnapshotDetails {
    #[serde(flatten)]
    summary: SnapshotSummary,
    payload_bytes: usize,
    sections: BTreeMap<String, Value>,
}

/// Runs the show command.
pub fn run(session: &Session, id: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let local_id = resolve(session, id)?;
    let snapshot = session
        .store()
        .by_local_id(&local_id)
        .ok_or_else(|| format!("No snapshot {}", local_id))?;

    let details = SnapshotDetails {
        summary: SnapshotSummary::from(snapshot),
        payload_bytes: snapshot.payload().len(),
        sections: snapshot.payload().sections()?,
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        _ => print_text_output(&details)?,
    }

    Ok(())
}

fn print_text_output(details: &SnapshotDetails) -> Result<(), Box<dyn std::error::Error>> {
    let summary = &details.summary;
    println!("Snapshot:    {}", summary.name);
    println!("Local id:    {}", summary.local_id);
    println!(
        "Hub id:      {}",
        summary.hub_id.as_deref().unwrap_or("(not published)")
    );
    if !summary.description.is_empty() {
        println!("Description: {}", summary.description);
    }
    println!("Timestamp:   {}", summary.timestamp);
    println!(
        "Flags:       official={} editable={} removable={}",
        summary.official, summary.editable, summary.removable
    );
    println!("Payload:     {} bytes", details.payload_bytes);

    println!();
    println!("Sections:");
    for (name, state) in &details.sections {
        let label = summary
            .display_strings
            .get(name)
            .map(String::as_str)
            .unwrap_or("");
        println!("  {} ({})", name, label);
        for line in serde_json::to_string_pretty(state)?.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}
