//! Timed-text (LRC) parser.
//!
//! Accepts lines of the form `[mm:ss.ff]text` and returns them sorted by
//! start time. Anything that does not carry a timestamp tag — metadata
//! lines like `[ar:...]`, plain text, garbage — is dropped silently; the
//! parser never fails.

use once_cell::sync::Lazy;
use regex::Regex;

/// One lyric line with the playback position it becomes active at.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedLine {
    /// Seconds from track start, non-negative.
    pub start_time: f64,
    pub text: String,
}

impl TimedLine {
    pub fn new(start_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            text: text.into(),
        }
    }
}

// Only the first tag on a line is honored; lines carrying several tags
// (some LRC variants repeat a line under multiple timestamps) yield one
// entry, with the remaining tags left in the text.
static TIMESTAMP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+):(\d+\.?\d*)\]").expect("timestamp regex"));

/// Parse raw lyric text into timed lines, sorted ascending by start time.
/// Ties keep their input order. Unparseable input yields an empty vec.
pub fn parse(text: &str) -> Vec<TimedLine> {
    let mut lines = Vec::new();

    for raw in text.lines() {
        if raw.trim().is_empty() {
            continue;
        }

        let Some(caps) = TIMESTAMP_TAG.captures(raw) else {
            continue;
        };
        let (Ok(minutes), Ok(seconds)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) else {
            continue;
        };
        let start_time = minutes * 60.0 + seconds;
        if !start_time.is_finite() {
            continue;
        }

        let tag_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let line_text = raw[tag_end..].trim().to_string();
        lines.push(TimedLine::new(start_time, line_text));
    }

    lines.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_lrc() {
        let lrc = "[00:12.34]First line\n[00:15.00]Second line\n";
        let lines = parse(lrc);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].start_time, 12.34);
        assert_eq!(lines[0].text, "First line");
        assert_eq!(lines[1].start_time, 15.0);
    }

    #[test]
    fn skips_metadata_and_malformed_lines() {
        let lrc = "[ar:Some Artist]\n[00:10.00]good one\nnot a lyric\n[00:20.00]another\n";
        let lines = parse(lrc);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "good one");
        assert_eq!(lines[1].text, "another");
    }

    #[test]
    fn sorts_out_of_order_input() {
        let lrc = "[01:00.00]late\n[00:05.00]early\n[00:30.00]middle\n";
        let lines = parse(lrc);
        let times: Vec<f64> = lines.iter().map(|l| l.start_time).collect();
        assert_eq!(times, vec![5.0, 30.0, 60.0]);
    }

    #[test]
    fn sorted_input_round_trips() {
        let lrc = "[00:01.50]a\n[00:02.00]b\n[01:02.25]c\n";
        let lines = parse(lrc);
        assert_eq!(
            lines,
            vec![
                TimedLine::new(1.5, "a"),
                TimedLine::new(2.0, "b"),
                TimedLine::new(62.25, "c"),
            ]
        );
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let lrc = "[00:10.00]first\n[00:10.00]second\n";
        let lines = parse(lrc);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[1].text, "second");
    }

    #[test]
    fn multi_tag_line_yields_one_entry() {
        let lrc = "[00:10.00][00:40.00]chorus\n";
        let lines = parse(lrc);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].start_time, 10.0);
        assert_eq!(lines[0].text, "[00:40.00]chorus");
    }

    #[test]
    fn tag_not_anchored_to_line_start() {
        let lines = parse("  [00:07.00]indented");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].start_time, 7.0);
        assert_eq!(lines[0].text, "indented");
    }

    #[test]
    fn fractional_and_whole_seconds() {
        let lines = parse("[02:03]whole\n[00:01.5]frac\n");
        assert_eq!(lines[0].start_time, 1.5);
        assert_eq!(lines[1].start_time, 123.0);
    }

    #[test]
    fn empty_and_garbage_input() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
        assert!(parse("no tags here\njust text").is_empty());
    }
}
