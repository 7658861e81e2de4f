//! Track model and sidecar lyric discovery.
//!
//! Library scanning, metadata extraction, and artwork are collaborator
//! concerns; this module only defines the track value the engine consumes
//! and the naming convention that associates an audio file with its
//! sidecar `.lrc` file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque track identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    /// Audio source locator.
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    /// Known sidecar lyrics file, if the provider already located one.
    pub lrc_path: Option<PathBuf>,
    /// Lyrics text stored in the audio file's own metadata container.
    pub embedded_lyrics: Option<String>,
}

impl Track {
    /// Build a track directly from an audio file path: the id is the path
    /// itself, the title falls back to the file stem, and an existing
    /// sidecar is probed by convention.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let lrc_path = find_sidecar(&path);

        Self {
            id: TrackId::new(path.display().to_string()),
            path,
            title,
            artist: "Unknown Artist".to_string(),
            lrc_path,
            embedded_lyrics: None,
        }
    }
}

/// Probe the conventional sidecar locations for an audio file, most
/// specific first: `Lyrics/<base>.lrc`, `lyrics/<base>.lrc`, then
/// `<base>.lrc` next to the audio file.
pub fn find_sidecar(audio: &Path) -> Option<PathBuf> {
    for candidate in sidecar_candidates(audio) {
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Where the pipeline writes a freshly downloaded sidecar. This is the
/// preferred discovery location, so a later rescan finds it again.
pub fn sidecar_write_path(audio: &Path) -> PathBuf {
    let parent = audio.parent().unwrap_or_else(|| Path::new("."));
    parent
        .join("Lyrics")
        .join(base_name(audio))
        .with_extension("lrc")
}

fn sidecar_candidates(audio: &Path) -> Vec<PathBuf> {
    let parent = audio.parent().unwrap_or_else(|| Path::new("."));
    let base = base_name(audio);
    vec![
        parent.join("Lyrics").join(&base).with_extension("lrc"),
        parent.join("lyrics").join(&base).with_extension("lrc"),
        audio.with_extension("lrc"),
    ]
}

fn base_name(audio: &Path) -> String {
    audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_fills_title_from_stem() {
        let t = Track::from_path("/music/Some Song.mp3");
        assert_eq!(t.title, "Some Song");
        assert_eq!(t.artist, "Unknown Artist");
        assert_eq!(t.id.as_str(), "/music/Some Song.mp3");
    }

    #[test]
    fn sidecar_write_path_uses_lyrics_folder() {
        let p = sidecar_write_path(Path::new("/music/album/track.mp3"));
        assert_eq!(p, PathBuf::from("/music/album/Lyrics/track.lrc"));
    }

    #[test]
    fn find_sidecar_prefers_lyrics_folder() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("song.mp3");
        std::fs::write(&audio, b"").unwrap();

        assert_eq!(find_sidecar(&audio), None);

        let flat = dir.path().join("song.lrc");
        std::fs::write(&flat, b"[00:01.00]a").unwrap();
        assert_eq!(find_sidecar(&audio), Some(flat.clone()));

        let folder = dir.path().join("Lyrics");
        std::fs::create_dir(&folder).unwrap();
        let preferred = folder.join("song.lrc");
        std::fs::write(&preferred, b"[00:01.00]a").unwrap();
        assert_eq!(find_sidecar(&audio), Some(preferred));
    }
}
