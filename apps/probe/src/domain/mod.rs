//! Per-domain measurement state
//!
//! A [`Domain`] carries the running latency statistics of one monitored name
//! together with the queue of events recorded since the last flush.

pub mod event;
pub mod stats;

pub use event::{Event, EventKind};
pub use stats::Domain;

/// Normalise a user-supplied domain name for storage and comparison.
///
/// Returns `None` for names that are empty once trimmed.
pub fn normalize_name(raw: &str) -> Option<String> {
    let name = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if name.is_empty() { None } else { Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Example.TEST."), Some("example.test".to_string()));
        assert_eq!(normalize_name("  example.org "), Some("example.org".to_string()));
        assert_eq!(normalize_name("."), None);
        assert_eq!(normalize_name("   "), None);
    }
}
