//! Hit-and-run badge detection.

/// Marker strings NexusPHP themes use for the hit-and-run badge.
/// Matching is case-sensitive.
const DEFAULT_MARKERS: [&str; 4] = ["hitandrun", "hit_run.gif", "Hit and Run", "Hit & Run"];

/// Scan a detail body for the default badge markers.
pub fn detect_hit_and_run(body: &str) -> bool {
    DEFAULT_MARKERS.iter().any(|marker| body.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_marker_detected() {
        for marker in ["hitandrun", "hit_run.gif", "Hit and Run", "Hit & Run"] {
            let body = format!("<body>prefix {marker} suffix</body>");
            assert!(detect_hit_and_run(&body), "marker {marker} not detected");
        }
    }

    #[test]
    fn test_plain_page_is_clean() {
        assert!(!detect_hit_and_run("<body>nothing to see</body>"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!detect_hit_and_run("<body>HITANDRUN</body>"));
        assert!(!detect_hit_and_run("<body>hit and run</body>"));
    }
}
