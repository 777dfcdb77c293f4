//! Sync command implementation.

use super::Session;

/// Runs one sync cycle against the configured hub.
pub fn run(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let result = session.sync_cycle();

    println!("Sync completed in {:?}", result.duration);
    println!("  published: {}", result.published);
    println!("  added:     {}", result.added);
    println!("  updated:   {}", result.updated);
    println!("  removed:   {}", result.removed);

    if result.success() {
        return Ok(());
    }

    let reason = session
        .stats()
        .last_error
        .clone()
        .unwrap_or_else(|| "unknown error".to_string());
    Err(format!("Sync failed: {}", reason).into())
}
