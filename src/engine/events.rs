use crate::library::{Track, TrackId};
use crate::lyrics::Resolution;
use std::path::PathBuf;

/// Everything the engine task can receive. All state mutation happens by
/// draining these from one channel, which is what serializes the engine.
#[derive(Debug)]
pub enum Event {
    Command(Command),
    Player(PlayerEvent),
    Lyrics(LyricsEvent),
}

/// Transport commands issued through [`super::EngineHandle`].
#[derive(Debug)]
pub enum Command {
    Play { track: Track, playlist: Vec<Track> },
    Pause,
    Resume,
    TogglePlayPause,
    Stop,
    Next,
    Previous,
    ToggleShuffle,
    ToggleLoop,
    Seek(f64),
    SetVolume(u8),
    Shutdown,
}

/// Pushed by the playback backend. Events that only make sense for one
/// loaded source carry its id so the engine can drop stale ones.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Position { id: TrackId, secs: f64 },
    Duration { id: TrackId, secs: f64 },
    Paused(bool),
    Ended { id: TrackId },
    LoadFailed { id: TrackId, error: String },
    Error(String),
}

#[derive(Debug)]
pub enum LyricsEvent {
    Resolved(Resolution),
}

/// Pushed to the presentation layer. Best-effort: a slow consumer loses
/// intermediate notifications, never blocks the engine.
#[derive(Debug, Clone)]
pub enum Notification {
    StateChanged(super::state::PlaybackSnapshot),
    ActiveLineChanged(Option<String>),
    /// The pipeline persisted a new sidecar; the library provider may
    /// want to update its stored track record.
    SidecarWritten { track_id: TrackId, path: PathBuf },
    LoadFailed { track_id: TrackId, error: String },
}
