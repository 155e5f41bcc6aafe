//! `capgate events` command.

use crate::kernel::Kernel;

/// Execute the `events` command, printing one JSON object per line.
///
/// With the memory backend only events from this process are visible.
///
/// # Errors
///
/// Returns an error string if the event log cannot be read.
pub fn run(kernel: &Kernel, event_type: Option<&str>) -> Result<(), String> {
    let events = kernel
        .events
        .list_events(event_type)
        .map_err(|e| format!("Failed to read events: {e}"))?;
    if events.is_empty() {
        eprintln!("No events recorded.");
    }
    for event in &events {
        let line = serde_json::to_string(event).map_err(|e| e.to_string())?;
        println!("{line}");
    }
    Ok(())
}
