//! Event-ID extraction from free-form log text.
//!
//! The default extractor understands the tabular text export of the Windows
//! Event Viewer, where every record line looks like
//!
//! ```text
//! Information   8/13/2025 1:25:51 PM    Netwtw14    7021    None
//! ```
//!
//! and the event ID is the first standalone number after the source column.

use crate::EventId;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// `M/D/YYYY H:MM:SS AM|PM`, then the first standalone digit run that is
/// followed by whitespace or the end of the line.
static RE_EVENT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[0-9]{1,2}/[0-9]{1,2}/[0-9]{4}\s+[0-9]{1,2}:[0-9]{2}:[0-9]{2}\s+(?:AM|PM)\s+.*?\b([0-9]+)(?:\s|$)",
    )
    .expect("event line pattern is valid")
});

/// Turns raw log text into an ordered sequence of event IDs.
///
/// Implementations must be pure: the same text always yields the same
/// sequence. Lines that carry no event ID are skipped, so an empty result
/// means "nothing recognisable" rather than an error.
pub trait EventExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<EventId>;
}

/// Regex-based extractor for timestamped Event Viewer lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampedLineExtractor;

impl TimestampedLineExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the event ID from a single line, if it has one.
    pub fn extract_line(&self, line: &str) -> Option<EventId> {
        let caps = RE_EVENT_LINE.captures(line)?;
        let digits = caps.get(1)?.as_str();
        match digits.parse::<EventId>() {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(%digits, error = %e, "skipping event id outside the supported range");
                None
            }
        }
    }
}

impl EventExtractor for TimestampedLineExtractor {
    fn extract(&self, text: &str) -> Vec<EventId> {
        text.lines().filter_map(|line| self.extract_line(line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_LOG: &str = "\
Level\tDate and Time\tSource\tEvent ID\tTask Category
Information   8/13/2025 1:25:51 PM    Netwtw14    7021    None
Warning   8/13/2025 1:26:03 PM    Service Control Manager    7036    None
this line has no timestamp 1234 
Error\t12/1/2024 11:02:17 AM\tDistributedCOM\t10016\tNone
";

    #[test]
    fn test_windows_line_yields_event_id_after_source() {
        let ex = TimestampedLineExtractor::new();
        let line = "Information   8/13/2025 1:25:51 PM    Netwtw14    7021    None";
        assert_eq!(ex.extract(line), vec![7021]);
    }

    #[test]
    fn test_multi_line_log_keeps_line_order() {
        let ex = TimestampedLineExtractor::new();
        assert_eq!(ex.extract(SYSTEM_LOG), vec![7021, 7036, 10016]);
    }

    #[test]
    fn test_no_timestamp_gives_empty_sequence() {
        let ex = TimestampedLineExtractor::new();
        assert!(ex.extract("no timestamps here").is_empty());
        assert!(ex.extract("").is_empty());
        assert!(ex.extract("8/13/2025 without a time 7021 x").is_empty());
    }

    #[test]
    fn test_only_first_number_after_timestamp_is_taken() {
        let ex = TimestampedLineExtractor::new();
        let line = "Information 1/2/2025 9:00:00 AM Kernel-Power 41 63 None";
        assert_eq!(ex.extract_line(line), Some(41));
    }

    #[test]
    fn test_event_id_at_end_of_line() {
        let ex = TimestampedLineExtractor::new();
        assert_eq!(ex.extract("Information 1/2/2025 9:00:00 PM EventLog 6005"), vec![6005]);
        assert_eq!(
            ex.extract("Information 1/2/2025 9:00:00 PM EventLog 6005\r\nnext"),
            vec![6005]
        );
    }

    #[test]
    fn test_lowercase_meridiem_is_not_a_timestamp() {
        let ex = TimestampedLineExtractor::new();
        assert!(ex.extract("Information 1/2/2025 9:00:00 pm EventLog 6005 None").is_empty());
    }

    #[test]
    fn test_oversized_number_is_skipped() {
        let ex = TimestampedLineExtractor::new();
        let text = "Information 1/2/2025 9:00:00 PM Src 99999999999999999999 None\n\
                    Information 1/2/2025 9:00:01 PM Src 7 None";
        assert_eq!(ex.extract(text), vec![7]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let ex = TimestampedLineExtractor::new();
        assert_eq!(ex.extract(SYSTEM_LOG), ex.extract(SYSTEM_LOG));
    }
}
