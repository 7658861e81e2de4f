//! Lyric resolution pipeline.
//!
//! Resolves timed lyrics for a track through three tiers, stopping at the
//! first that parses to something non-empty:
//! 1. the track's sidecar `.lrc` file,
//! 2. lyrics embedded in the track's metadata,
//! 3. an LRCLIB search, with the winning raw text persisted as a new
//!    sidecar so later sessions hit tier 1.
//!
//! Every failure along the way degrades to "no lyrics"; resolution never
//! errors out.

pub mod lrclib;
pub mod parser;

pub use lrclib::LrclibClient;
pub use parser::TimedLine;

use crate::library::{self, Track, TrackId};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Which tier produced the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsSource {
    Sidecar,
    Embedded,
    Remote,
}

/// Outcome of one resolution, tagged with the track that requested it.
/// Consumers must compare `track_id` against their current track before
/// applying `lines`; the tag is what makes late network completions safe
/// to drop.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub track_id: TrackId,
    pub lines: Vec<TimedLine>,
    pub source: Option<LyricsSource>,
    /// Set when the remote tier wrote a new sidecar file, so the library
    /// provider can update its track record.
    pub new_sidecar: Option<PathBuf>,
}

impl Resolution {
    fn empty(track_id: TrackId) -> Self {
        Self {
            track_id,
            lines: Vec::new(),
            source: None,
            new_sidecar: None,
        }
    }
}

/// Run the tiers for one track. `duration_hint` (seconds) narrows remote
/// candidate selection; zero means unknown.
pub async fn resolve(
    track: &Track,
    duration_hint: f64,
    client: &LrclibClient,
    tolerance_secs: f64,
) -> Resolution {
    if let Some(lrc_path) = &track.lrc_path {
        match tokio::fs::read_to_string(lrc_path).await {
            Ok(raw) => {
                let lines = parser::parse(&raw);
                if !lines.is_empty() {
                    return Resolution {
                        track_id: track.id.clone(),
                        lines,
                        source: Some(LyricsSource::Sidecar),
                        new_sidecar: None,
                    };
                }
                debug!(path = %lrc_path.display(), "sidecar parsed to nothing");
            }
            Err(e) => warn!(path = %lrc_path.display(), "sidecar read failed: {e}"),
        }
    }

    if let Some(embedded) = track.embedded_lyrics.as_deref()
        && !embedded.is_empty()
    {
        let lines = parser::parse(embedded);
        if !lines.is_empty() {
            return Resolution {
                track_id: track.id.clone(),
                lines,
                source: Some(LyricsSource::Embedded),
                new_sidecar: None,
            };
        }
        debug!(track = %track.id, "embedded lyrics parsed to nothing");
    }

    resolve_remote(track, duration_hint, client, tolerance_secs).await
}

async fn resolve_remote(
    track: &Track,
    duration_hint: f64,
    client: &LrclibClient,
    tolerance_secs: f64,
) -> Resolution {
    let candidates = match client.search(&track.artist, &track.title).await {
        Ok(c) => c,
        Err(e) => {
            warn!(track = %track.id, "lyrics search failed: {e:#}");
            return Resolution::empty(track.id.clone());
        }
    };

    let Some(chosen) = lrclib::pick_candidate(&candidates, duration_hint, tolerance_secs) else {
        debug!(track = %track.id, "no lyrics found");
        return Resolution::empty(track.id.clone());
    };
    let Some(raw) = chosen.best_text() else {
        return Resolution::empty(track.id.clone());
    };

    let lines = parser::parse(raw);
    if lines.is_empty() {
        debug!(track = %track.id, "remote lyrics carry no timed lines");
        return Resolution::empty(track.id.clone());
    }

    let new_sidecar = write_sidecar(track, raw).await;

    Resolution {
        track_id: track.id.clone(),
        lines,
        source: Some(LyricsSource::Remote),
        new_sidecar,
    }
}

/// Persist downloaded lyric text next to the track. A failed write is
/// logged and reported as "no sidecar"; the resolved lines still stand.
async fn write_sidecar(track: &Track, raw: &str) -> Option<PathBuf> {
    let path = library::sidecar_write_path(&track.path);
    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!(path = %parent.display(), "create lyrics dir failed: {e}");
            return None;
        }
    }
    match tokio::fs::write(&path, raw).await {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(path = %path.display(), "sidecar write failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_in(dir: &std::path::Path) -> Track {
        let audio = dir.join("song.mp3");
        std::fs::write(&audio, b"").unwrap();
        Track::from_path(audio)
    }

    // The client is never reached when a local tier succeeds; an
    // unroutable base URL makes an accidental network hop fail loudly.
    fn offline_client() -> LrclibClient {
        LrclibClient::new("http://127.0.0.1:9/api")
    }

    #[tokio::test]
    async fn sidecar_beats_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let mut track = track_in(dir.path());

        let lrc = dir.path().join("song.lrc");
        std::fs::write(&lrc, "[00:01.00]from sidecar\n").unwrap();
        track.lrc_path = Some(lrc);
        track.embedded_lyrics = Some("[00:01.00]from tags\n".into());

        let res = resolve(&track, 0.0, &offline_client(), 3.0).await;
        assert_eq!(res.source, Some(LyricsSource::Sidecar));
        assert_eq!(res.lines[0].text, "from sidecar");
        assert!(res.new_sidecar.is_none());
    }

    #[tokio::test]
    async fn empty_sidecar_falls_through_to_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let mut track = track_in(dir.path());

        let lrc = dir.path().join("song.lrc");
        std::fs::write(&lrc, "just unsynced text\n").unwrap();
        track.lrc_path = Some(lrc);
        track.embedded_lyrics = Some("[00:02.00]from tags\n".into());

        let res = resolve(&track, 0.0, &offline_client(), 3.0).await;
        assert_eq!(res.source, Some(LyricsSource::Embedded));
        assert_eq!(res.lines[0].text, "from tags");
    }

    #[tokio::test]
    async fn missing_sidecar_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut track = track_in(dir.path());
        track.lrc_path = Some(dir.path().join("gone.lrc"));
        track.embedded_lyrics = Some("[00:03.00]still here\n".into());

        let res = resolve(&track, 0.0, &offline_client(), 3.0).await;
        assert_eq!(res.source, Some(LyricsSource::Embedded));
    }

    #[tokio::test]
    async fn network_failure_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let track = track_in(dir.path());

        let res = resolve(&track, 0.0, &offline_client(), 3.0).await;
        assert!(res.lines.is_empty());
        assert_eq!(res.source, None);
        assert_eq!(res.track_id, track.id);
    }

    #[tokio::test]
    async fn resolution_is_tagged_with_requesting_track() {
        let dir = tempfile::tempdir().unwrap();
        let mut track = track_in(dir.path());
        track.embedded_lyrics = Some("[00:01.00]x\n".into());

        let res = resolve(&track, 0.0, &offline_client(), 3.0).await;
        assert_eq!(res.track_id, track.id);
    }

    #[tokio::test]
    async fn write_sidecar_creates_lyrics_dir() {
        let dir = tempfile::tempdir().unwrap();
        let track = track_in(dir.path());

        let path = write_sidecar(&track, "[00:01.00]hello\n").await.unwrap();
        assert_eq!(path, dir.path().join("Lyrics").join("song.lrc"));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "[00:01.00]hello\n");
    }
}
