//! Canonical window handles
//!
//! KWin prints internal ids as braced UUIDs (`{6f1c...}`) while clients tend
//! to echo them back lowercased or without braces. All id comparisons go
//! through [`canonicalize`].

use super::records::WindowRecord;

/// Trim, lowercase and strip surrounding braces
///
/// Absent or blank input yields `""`, which never matches a record.
pub fn canonicalize(id: Option<&str>) -> String {
    let Some(id) = id else {
        return String::new();
    };
    id.trim()
        .to_lowercase()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .to_string()
}

/// Whether `target` names this record by either of its handles
pub fn matches(record: &WindowRecord, target: &str) -> bool {
    let target = canonicalize(Some(target));
    if target.is_empty() {
        return false;
    }
    canonicalize(record.internal_id.as_deref()) == target
        || canonicalize(record.window_id.as_deref()) == target
}

/// First record matching `target`
pub fn find_window<'a>(records: &'a [WindowRecord], target: &str) -> Option<&'a WindowRecord> {
    records.iter().find(|r| matches(r, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(window_id: Option<&str>, internal_id: Option<&str>) -> WindowRecord {
        WindowRecord {
            window_id: window_id.map(String::from),
            internal_id: internal_id.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn canonical_form_ignores_braces_case_and_whitespace() {
        assert_eq!(canonicalize(Some("{ABC-123}")), "abc-123");
        assert_eq!(canonicalize(Some("abc-123")), "abc-123");
        assert_eq!(canonicalize(Some("  {Abc-123} ")), "abc-123");
        assert_eq!(canonicalize(None), "");
        assert_eq!(canonicalize(Some("   ")), "");
    }

    #[test]
    fn absent_target_never_matches() {
        let r = record(None, None);
        assert!(!matches(&r, ""));
        assert!(!matches(&r, "  "));
        assert!(!matches(&r, "{}"));
    }

    #[test]
    fn matches_either_handle() {
        let r = record(Some("{W-1}"), Some("{I-1}"));
        assert!(matches(&r, "w-1"));
        assert!(matches(&r, "I-1"));
        assert!(!matches(&r, "x-1"));
    }

    #[test]
    fn find_window_returns_first_match() {
        let mut first = record(Some("a"), None);
        first.pid = Some(1);
        let mut second = record(None, Some("{A}"));
        second.pid = Some(2);
        let records = vec![first, second];
        assert_eq!(find_window(&records, "A").and_then(|r| r.pid), Some(1));
        assert!(find_window(&records, "b").is_none());
    }
}
