//! Decode harvested journal lines into records
//!
//! The journal carries plenty of unrelated compositor chatter, so anything
//! that is not a single-line JSON object is skipped without complaint.

use crate::core::records::{META_MARKER, MetaRecord, WindowRecord};

/// Meta record (last one wins) and windows in journal order
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> (Option<MetaRecord>, Vec<WindowRecord>) {
    let mut meta = None;
    let mut windows = Vec::new();

    for line in lines {
        let s = line.as_ref().trim();
        if !(s.starts_with('{') && s.ends_with('}')) {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(s) else {
            continue;
        };
        if !value.is_object() {
            continue;
        }

        if value.get("__type").and_then(|t| t.as_str()) == Some(META_MARKER) {
            match serde_json::from_value::<MetaRecord>(value) {
                Ok(record) => meta = Some(record),
                Err(e) => tracing::debug!("Skipping malformed meta line: {}", e),
            }
        } else {
            match serde_json::from_value::<WindowRecord>(value) {
                Ok(record) => windows.push(record),
                Err(e) => tracing::debug!("Skipping malformed window line: {}", e),
            }
        }
    }

    (meta, windows)
}
