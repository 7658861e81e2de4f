//! Position-to-lyric synchronizer.
//!
//! Pure state machine: feed it position samples, it tells you when the
//! active lyric line changes. The scheduling of samples (mpv's property
//! stream, a timer, a test loop) lives elsewhere.

use crate::lyrics::TimedLine;

/// Tracks "the active line" for a sorted line sequence and suppresses
/// repeat reports. The active line is the last one whose start time does
/// not exceed the playback position.
#[derive(Debug, Default)]
pub struct LyricSync {
    lines: Vec<TimedLine>,
    // None until the first sample after set_lines; Some(None) once "no
    // active line" has been reported. The distinction makes the first
    // sample always report, so a track change visibly clears the line.
    last_reported: Option<Option<String>>,
}

impl LyricSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new line sequence and forget what was last reported.
    pub fn set_lines(&mut self, lines: Vec<TimedLine>) {
        self.lines = lines;
        self.last_reported = None;
    }

    pub fn clear(&mut self) {
        self.set_lines(Vec::new());
    }

    pub fn lines(&self) -> &[TimedLine] {
        &self.lines
    }

    /// The line active at `position`, if any. Predecessor search over the
    /// sorted sequence; positions before the first line (including
    /// negative ones) have no active line.
    pub fn active_line(&self, position: f64) -> Option<&TimedLine> {
        let idx = self.lines.partition_point(|l| l.start_time <= position);
        idx.checked_sub(1).map(|i| &self.lines[i])
    }

    /// Feed one position sample. Returns `Some(new_active_text)` when the
    /// active line changed (`Some(None)` meaning "no active line"), and
    /// `None` when nothing changed since the last report.
    pub fn on_position(&mut self, position: f64) -> Option<Option<String>> {
        let current = self.active_line(position).map(|l| l.text.clone());
        match &self.last_reported {
            Some(prev) if *prev == current => None,
            _ => {
                self.last_reported = Some(current.clone());
                Some(current)
            }
        }
    }

    /// Text most recently reported, for state snapshots.
    pub fn current_text(&self) -> Option<&str> {
        self.last_reported.as_ref().and_then(|t| t.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_with(lines: &[(f64, &str)]) -> LyricSync {
        let mut s = LyricSync::new();
        s.set_lines(
            lines
                .iter()
                .map(|(t, x)| TimedLine::new(*t, *x))
                .collect(),
        );
        s
    }

    #[test]
    fn predecessor_search() {
        let s = sync_with(&[(0.0, "a"), (10.0, "b"), (20.0, "c")]);
        assert_eq!(s.active_line(9.9).unwrap().text, "a");
        assert_eq!(s.active_line(10.0).unwrap().text, "b");
        assert_eq!(s.active_line(25.0).unwrap().text, "c");
        assert!(s.active_line(-1.0).is_none());
    }

    #[test]
    fn change_suppression() {
        let mut s = sync_with(&[(0.0, "a"), (10.0, "b")]);
        assert_eq!(s.on_position(1.0), Some(Some("a".into())));
        assert_eq!(s.on_position(2.0), None);
        assert_eq!(s.on_position(9.9), None);
        assert_eq!(s.on_position(10.0), Some(Some("b".into())));
        assert_eq!(s.on_position(11.0), None);
    }

    #[test]
    fn empty_lines_report_none_exactly_once() {
        let mut s = LyricSync::new();
        s.set_lines(Vec::new());
        assert_eq!(s.on_position(0.0), Some(None));
        assert_eq!(s.on_position(1.0), None);
        assert_eq!(s.on_position(2.0), None);
    }

    #[test]
    fn position_before_first_line_reports_none_once() {
        let mut s = sync_with(&[(10.0, "a")]);
        assert_eq!(s.on_position(-1.0), Some(None));
        assert_eq!(s.on_position(5.0), None);
        assert_eq!(s.on_position(10.0), Some(Some("a".into())));
    }

    #[test]
    fn set_lines_resets_reporting() {
        let mut s = sync_with(&[(0.0, "a")]);
        assert_eq!(s.on_position(1.0), Some(Some("a".into())));

        s.set_lines(vec![TimedLine::new(0.0, "a")]);
        // Same text as before, but the reset makes it report again.
        assert_eq!(s.on_position(1.0), Some(Some("a".into())));

        s.clear();
        assert_eq!(s.on_position(1.0), Some(None));
        assert_eq!(s.current_text(), None);
    }

    #[test]
    fn seek_backwards_reports_earlier_line() {
        let mut s = sync_with(&[(0.0, "a"), (10.0, "b")]);
        assert_eq!(s.on_position(15.0), Some(Some("b".into())));
        assert_eq!(s.on_position(3.0), Some(Some("a".into())));
    }

    #[test]
    fn duplicate_text_on_distinct_lines_is_suppressed() {
        let mut s = sync_with(&[(0.0, "la"), (10.0, "la"), (20.0, "end")]);
        assert_eq!(s.on_position(1.0), Some(Some("la".into())));
        // Crossing into the second "la" keeps the same reported text.
        assert_eq!(s.on_position(11.0), None);
        assert_eq!(s.on_position(21.0), Some(Some("end".into())));
    }
}
