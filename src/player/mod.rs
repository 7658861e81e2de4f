//! Playback primitive boundary.
//!
//! The engine talks to the audio backend through a command channel, and
//! the backend reports back through the engine's event channel. Tests
//! hold the receiving end of [`channel`] and inject player events by
//! hand; production wires the receiver into the mpv adapter.

pub mod mpv;

use crate::library::TrackId;
use anyhow::Context;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum PlayerCmd {
    /// Load and start playing a source. Failures come back asynchronously
    /// as a `PlayerEvent::LoadFailed` carrying the same id.
    Load { id: TrackId, path: PathBuf },
    SetPause(bool),
    Seek(f64),
    SetVolume(u8),
    /// Unload the current source and go idle.
    Stop,
}

/// Cloneable sending half of the player command channel.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCmd>,
}

/// Create a player command channel. The adapter (or a test) drains the
/// receiver.
pub fn channel(capacity: usize) -> (PlayerHandle, mpsc::Receiver<PlayerCmd>) {
    let (tx, rx) = mpsc::channel(capacity);
    (PlayerHandle { tx }, rx)
}

impl PlayerHandle {
    pub async fn load(&self, id: TrackId, path: PathBuf) -> anyhow::Result<()> {
        self.send(PlayerCmd::Load { id, path }).await
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(PlayerCmd::SetPause(paused)).await
    }

    pub async fn seek(&self, secs: f64) -> anyhow::Result<()> {
        self.send(PlayerCmd::Seek(secs)).await
    }

    pub async fn set_volume(&self, volume_0_100: u8) -> anyhow::Result<()> {
        self.send(PlayerCmd::SetVolume(volume_0_100)).await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(PlayerCmd::Stop).await
    }

    async fn send(&self, cmd: PlayerCmd) -> anyhow::Result<()> {
        self.tx.send(cmd).await.context("player backend gone")
    }
}
