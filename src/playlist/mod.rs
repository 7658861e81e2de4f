//! Playlist with a derived shuffle order.
//!
//! The user-ordered track list is the source of truth and is never
//! modified by shuffle. Shuffle mode is an index permutation rebuilt
//! wholesale: on enable (current track pinned to the front) and on a
//! loop wrap (fresh permutation, nothing pinned).

use crate::library::{Track, TrackId};
use rand::seq::SliceRandom;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    current_index: Option<usize>,
    shuffle_enabled: bool,
    order: Vec<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole playlist and point the cursor at `current`.
    /// An id not present in `tracks` leaves the cursor unset.
    pub fn replace(&mut self, tracks: Vec<Track>, current: &TrackId) {
        self.tracks = tracks;
        self.current_index = self.tracks.iter().position(|t| &t.id == current);
        if self.shuffle_enabled {
            self.rebuild_order_with_current_first();
        }
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current_index = None;
        self.order.clear();
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn is_shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    /// Record a freshly written sidecar on the owning track record.
    pub fn set_sidecar(&mut self, id: &TrackId, path: &Path) {
        if let Some(track) = self.tracks.iter_mut().find(|t| &t.id == id) {
            track.lrc_path = Some(path.to_path_buf());
        }
    }

    /// Step forward in the active order. At the end: with `loop_enabled`
    /// wrap to index 0, first rebuilding a fresh shuffle permutation when
    /// shuffle is on; without it, return `None` (the caller stops).
    pub fn advance(&mut self, loop_enabled: bool) -> Option<&Track> {
        let current = self.current_index?;
        if let Some(next) = self.next_index(current) {
            self.current_index = Some(next);
            return self.tracks.get(next);
        }
        if !loop_enabled {
            return None;
        }
        if self.shuffle_enabled {
            self.reshuffle();
        }
        let first = self.first_index()?;
        self.current_index = Some(first);
        self.tracks.get(first)
    }

    /// Step backward in the active order. At the start: with
    /// `loop_enabled` wrap to the last index; without it, `None` (the
    /// caller treats this as a no-op).
    pub fn retreat(&mut self, loop_enabled: bool) -> Option<&Track> {
        let current = self.current_index?;
        if let Some(prev) = self.prev_index(current) {
            self.current_index = Some(prev);
            return self.tracks.get(prev);
        }
        if !loop_enabled {
            return None;
        }
        let last = self.last_index()?;
        self.current_index = Some(last);
        self.tracks.get(last)
    }

    /// Flip shuffle mode. Enabling derives a new permutation with the
    /// current track at index 0, so the next advance cannot repeat it.
    /// Disabling only drops the permutation; the original order stands.
    pub fn toggle_shuffle(&mut self) {
        self.shuffle_enabled = !self.shuffle_enabled;
        if self.shuffle_enabled {
            self.rebuild_order_with_current_first();
        } else {
            self.order.clear();
        }
    }

    fn next_index(&self, current: usize) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        if self.shuffle_enabled && !self.order.is_empty() {
            let pos = self.order.iter().position(|&i| i == current)?;
            self.order.get(pos + 1).copied()
        } else if current + 1 < self.tracks.len() {
            Some(current + 1)
        } else {
            None
        }
    }

    fn prev_index(&self, current: usize) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        if self.shuffle_enabled && !self.order.is_empty() {
            let pos = self.order.iter().position(|&i| i == current)?;
            pos.checked_sub(1).map(|p| self.order[p])
        } else {
            current.checked_sub(1)
        }
    }

    fn first_index(&self) -> Option<usize> {
        if self.shuffle_enabled && !self.order.is_empty() {
            self.order.first().copied()
        } else if self.tracks.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    fn last_index(&self) -> Option<usize> {
        if self.shuffle_enabled && !self.order.is_empty() {
            self.order.last().copied()
        } else {
            self.tracks.len().checked_sub(1)
        }
    }

    fn reshuffle(&mut self) {
        let mut rng = rand::rng();
        self.order = (0..self.tracks.len()).collect();
        self.order.shuffle(&mut rng);
    }

    fn rebuild_order_with_current_first(&mut self) {
        self.reshuffle();
        if let Some(current) = self.current_index
            && let Some(pos) = self.order.iter().position(|&i| i == current)
        {
            self.order.swap(0, pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_track(id: &str) -> Track {
        Track {
            id: TrackId::new(id),
            path: format!("/music/{id}.mp3").into(),
            title: format!("Track {id}"),
            artist: "Artist".into(),
            lrc_path: None,
            embedded_lyrics: None,
        }
    }

    fn playlist_of(n: usize) -> Playlist {
        let tracks: Vec<Track> = (0..n).map(|i| make_track(&i.to_string())).collect();
        let first = tracks[0].id.clone();
        let mut p = Playlist::new();
        p.replace(tracks, &first);
        p
    }

    #[test]
    fn replace_points_cursor_at_requested_track() {
        let tracks = vec![make_track("a"), make_track("b"), make_track("c")];
        let mut p = Playlist::new();
        p.replace(tracks, &TrackId::new("b"));
        assert_eq!(p.current_track().unwrap().id.as_str(), "b");
    }

    #[test]
    fn advance_walks_original_order() {
        let mut p = playlist_of(3);
        assert_eq!(p.advance(false).unwrap().id.as_str(), "1");
        assert_eq!(p.advance(false).unwrap().id.as_str(), "2");
        assert!(p.advance(false).is_none());
        // Cursor stays on the last track after a refused advance.
        assert_eq!(p.current_track().unwrap().id.as_str(), "2");
    }

    #[test]
    fn advance_wraps_when_looping() {
        let mut p = playlist_of(2);
        p.advance(true);
        assert_eq!(p.advance(true).unwrap().id.as_str(), "0");
    }

    #[test]
    fn retreat_is_refused_at_start_without_loop() {
        let mut p = playlist_of(3);
        assert!(p.retreat(false).is_none());
        assert_eq!(p.current_track().unwrap().id.as_str(), "0");
    }

    #[test]
    fn retreat_wraps_to_last_when_looping() {
        let mut p = playlist_of(3);
        assert_eq!(p.retreat(true).unwrap().id.as_str(), "2");
    }

    #[test]
    fn shuffle_order_is_a_permutation_with_current_first() {
        let mut p = playlist_of(20);
        p.advance(false);
        let current = p.current_track().unwrap().id.clone();

        p.toggle_shuffle();
        assert!(p.is_shuffle_enabled());
        assert_eq!(p.order.len(), p.tracks.len());

        let mut seen: Vec<usize> = p.order.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());

        assert_eq!(p.tracks[p.order[0]].id, current);
        assert_eq!(p.current_track().unwrap().id, current);
    }

    #[test]
    fn shuffle_advance_visits_every_track_once() {
        let mut p = playlist_of(10);
        p.toggle_shuffle();

        let mut visited = vec![p.current_track().unwrap().id.clone()];
        while let Some(t) = p.advance(false) {
            visited.push(t.id.clone());
        }
        assert_eq!(visited.len(), 10);
        visited.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        visited.dedup();
        assert_eq!(visited.len(), 10);
    }

    #[test]
    fn loop_wrap_with_shuffle_reshuffles_and_lands_on_front() {
        let mut p = playlist_of(8);
        p.toggle_shuffle();
        while p.advance(false).is_some() {}
        let old_order = p.order.clone();

        let landed = p.advance(true).unwrap().id.clone();
        assert_eq!(p.order.len(), old_order.len());
        assert_eq!(p.tracks[p.order[0]].id, landed);

        let mut seen = p.order.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn disabling_shuffle_preserves_original_order() {
        let mut p = playlist_of(5);
        p.toggle_shuffle();
        p.toggle_shuffle();
        assert!(!p.is_shuffle_enabled());
        let ids: Vec<&str> = p.tracks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
        // Navigation follows the original order again, from wherever the
        // cursor happens to be.
        assert_eq!(p.advance(false).unwrap().id.as_str(), "1");
    }

    #[test]
    fn set_sidecar_updates_track_record() {
        let mut p = playlist_of(2);
        p.set_sidecar(&TrackId::new("1"), Path::new("/music/Lyrics/1.lrc"));
        assert_eq!(
            p.tracks()[1].lrc_path.as_deref(),
            Some(Path::new("/music/Lyrics/1.lrc"))
        );
    }
}
