//! Playback controller.
//!
//! One task owns the transport state, the playlist, and the lyric
//! synchronizer, and drains a single event channel: commands from
//! [`EngineHandle`], player events from the backend, lyric resolutions
//! from spawned pipeline tasks. Everything off that task only sends
//! messages, so controller transitions never race.
//!
//! Lyric resolutions and player position/end events are tagged with a
//! track id and checked against the current track before they are
//! applied; a completion that arrives after the user has moved on is
//! dropped without touching any state.

pub mod events;
pub mod state;

use crate::library::Track;
use crate::lyrics::{self, LrclibClient, Resolution};
use crate::player::PlayerHandle;
use crate::playlist::Playlist;
use crate::sync::LyricSync;
use anyhow::Context;
use events::{Command, Event, LyricsEvent, Notification, PlayerEvent};
use state::{PlaybackSnapshot, PlaybackState};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct Engine {
    state: PlaybackState,
    playlist: Playlist,
    current: Option<Track>,
    position_secs: f64,
    duration_secs: f64,
    loop_enabled: bool,
    volume: u8,
    // Lyric resolution wants the track duration as a search hint, and the
    // backend only reports it after the load; the first Duration event
    // for the current track kicks the pipeline off.
    awaiting_duration: bool,
    lyric_sync: LyricSync,
    player: PlayerHandle,
    lrclib: LrclibClient,
    duration_tolerance_secs: f64,
    rx: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    notify_tx: mpsc::Sender<Notification>,
    shutdown: bool,
}

/// Cloneable command surface of the engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Event>,
}

impl Engine {
    pub fn new(
        player: PlayerHandle,
        lrclib: LrclibClient,
        duration_tolerance_secs: f64,
        volume: u8,
    ) -> (Self, EngineHandle, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(256);
        let (notify_tx, notify_rx) = mpsc::channel(256);
        let engine = Self {
            state: PlaybackState::Stopped,
            playlist: Playlist::new(),
            current: None,
            position_secs: 0.0,
            duration_secs: 0.0,
            loop_enabled: false,
            volume: volume.min(100),
            awaiting_duration: false,
            lyric_sync: LyricSync::new(),
            player,
            lrclib,
            duration_tolerance_secs,
            rx,
            tx: tx.clone(),
            notify_tx,
            shutdown: false,
        };
        (engine, EngineHandle { tx }, notify_rx)
    }

    /// Run until a `Shutdown` command arrives.
    pub async fn run(mut self) {
        while let Some(ev) = self.rx.recv().await {
            self.handle_event(ev).await;
            if self.shutdown {
                break;
            }
        }
    }

    async fn handle_event(&mut self, ev: Event) {
        match ev {
            Event::Command(cmd) => self.handle_command(cmd).await,
            Event::Player(pe) => self.handle_player(pe).await,
            Event::Lyrics(LyricsEvent::Resolved(res)) => self.apply_resolution(res),
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Play {
                track,
                mut playlist,
            } => {
                if !playlist.iter().any(|t| t.id == track.id) {
                    playlist.insert(0, track.clone());
                }
                self.playlist.replace(playlist, &track.id);
                self.load_current().await;
            }
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await,
            Command::TogglePlayPause => match self.state {
                PlaybackState::Playing => self.pause().await,
                PlaybackState::Paused => self.resume().await,
                PlaybackState::Stopped => {}
            },
            Command::Stop => self.stop().await,
            Command::Next => self.next().await,
            Command::Previous => {
                if self.playlist.retreat(self.loop_enabled).is_some() {
                    self.load_current().await;
                }
            }
            Command::ToggleShuffle => {
                self.playlist.toggle_shuffle();
                self.emit_state();
            }
            Command::ToggleLoop => {
                self.loop_enabled = !self.loop_enabled;
                self.emit_state();
            }
            Command::Seek(secs) => {
                if let Err(e) = self.player.seek(secs).await {
                    warn!("seek: {e:#}");
                }
            }
            Command::SetVolume(v) => {
                self.volume = v.min(100);
                if let Err(e) = self.player.set_volume(self.volume).await {
                    warn!("set volume: {e:#}");
                }
                self.emit_state();
            }
            Command::Shutdown => self.shutdown = true,
        }
    }

    async fn handle_player(&mut self, pe: PlayerEvent) {
        match pe {
            PlayerEvent::Position { id, secs } => {
                if !self.is_current(&id) {
                    return;
                }
                self.position_secs = secs;
                if let Some(change) = self.lyric_sync.on_position(secs) {
                    self.notify(Notification::ActiveLineChanged(change));
                }
            }
            PlayerEvent::Duration { id, secs } => {
                if !self.is_current(&id) {
                    return;
                }
                self.duration_secs = secs;
                if self.awaiting_duration {
                    self.awaiting_duration = false;
                    if let Some(track) = self.current.clone() {
                        self.spawn_resolution(track, secs);
                    }
                }
            }
            PlayerEvent::Paused(paused) => {
                if self.current.is_none() {
                    return;
                }
                match (self.state, paused) {
                    (PlaybackState::Playing, true) => self.set_state(PlaybackState::Paused),
                    (PlaybackState::Paused, false) => self.set_state(PlaybackState::Playing),
                    _ => {}
                }
            }
            PlayerEvent::Ended { id } => {
                if !self.is_current(&id) {
                    debug!(track = %id, "dropping end-of-file for inactive track");
                    return;
                }
                // Natural finish advances exactly like an explicit next().
                self.next().await;
            }
            PlayerEvent::LoadFailed { id, error } => {
                if !self.is_current(&id) {
                    return;
                }
                warn!(track = %id, "load failed: {error}");
                self.notify(Notification::LoadFailed {
                    track_id: id,
                    error,
                });
                self.stop().await;
            }
            PlayerEvent::Error(e) => warn!("player: {e}"),
        }
    }

    /// Apply a finished lyric resolution, unless the user has navigated
    /// away since it was spawned.
    fn apply_resolution(&mut self, res: Resolution) {
        let Some(current) = &self.current else {
            debug!(track = %res.track_id, "dropping lyrics resolution, nothing playing");
            return;
        };
        if res.track_id != current.id {
            debug!(track = %res.track_id, "dropping stale lyrics resolution");
            return;
        }
        if let Some(path) = res.new_sidecar.clone() {
            self.playlist.set_sidecar(&res.track_id, &path);
            if let Some(cur) = self.current.as_mut() {
                cur.lrc_path = Some(path.clone());
            }
            self.notify(Notification::SidecarWritten {
                track_id: res.track_id.clone(),
                path,
            });
        }
        self.lyric_sync.set_lines(res.lines);
    }

    async fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Err(e) = self.player.set_pause(true).await {
            warn!("pause: {e:#}");
        }
        self.set_state(PlaybackState::Paused);
    }

    async fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        if let Err(e) = self.player.set_pause(false).await {
            warn!("resume: {e:#}");
        }
        self.set_state(PlaybackState::Playing);
    }

    async fn next(&mut self) {
        if self.playlist.advance(self.loop_enabled).is_some() {
            self.load_current().await;
        } else {
            self.stop().await;
        }
    }

    /// Load whatever the playlist cursor points at: reset position and
    /// lyrics, hand the source to the backend, and wait for its duration
    /// to trigger resolution.
    async fn load_current(&mut self) {
        let Some(track) = self.playlist.current_track().cloned() else {
            self.stop().await;
            return;
        };
        self.current = Some(track.clone());
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
        self.awaiting_duration = true;
        self.lyric_sync.clear();
        self.set_state(PlaybackState::Playing);
        if let Err(e) = self.player.load(track.id.clone(), track.path.clone()).await {
            warn!("player load: {e:#}");
        }
    }

    async fn stop(&mut self) {
        if let Err(e) = self.player.stop().await {
            warn!("player stop: {e:#}");
        }
        self.current = None;
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
        self.awaiting_duration = false;
        self.lyric_sync.clear();
        self.set_state(PlaybackState::Stopped);
        self.notify(Notification::ActiveLineChanged(None));
    }

    fn spawn_resolution(&self, track: Track, duration_hint: f64) {
        let client = self.lrclib.clone();
        let tolerance = self.duration_tolerance_secs;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let res = lyrics::resolve(&track, duration_hint, &client, tolerance).await;
            let _ = tx.send(Event::Lyrics(LyricsEvent::Resolved(res))).await;
        });
    }

    fn is_current(&self, id: &crate::library::TrackId) -> bool {
        self.current.as_ref().is_some_and(|t| &t.id == id)
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
        self.emit_state();
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            current_track: self.current.clone(),
            position_secs: self.position_secs,
            duration_secs: self.duration_secs,
            shuffle_enabled: self.playlist.is_shuffle_enabled(),
            loop_enabled: self.loop_enabled,
            volume: self.volume,
        }
    }

    fn emit_state(&mut self) {
        self.notify(Notification::StateChanged(self.snapshot()));
    }

    fn notify(&mut self, n: Notification) {
        let _ = self.notify_tx.try_send(n);
    }
}

impl EngineHandle {
    pub async fn play(&self, track: Track, playlist: Vec<Track>) -> anyhow::Result<()> {
        self.send(Command::Play { track, playlist }).await
    }

    pub async fn pause(&self) -> anyhow::Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> anyhow::Result<()> {
        self.send(Command::Resume).await
    }

    pub async fn toggle_play_pause(&self) -> anyhow::Result<()> {
        self.send(Command::TogglePlayPause).await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(Command::Stop).await
    }

    pub async fn next(&self) -> anyhow::Result<()> {
        self.send(Command::Next).await
    }

    pub async fn previous(&self) -> anyhow::Result<()> {
        self.send(Command::Previous).await
    }

    pub async fn toggle_shuffle(&self) -> anyhow::Result<()> {
        self.send(Command::ToggleShuffle).await
    }

    pub async fn toggle_loop(&self) -> anyhow::Result<()> {
        self.send(Command::ToggleLoop).await
    }

    pub async fn seek(&self, secs: f64) -> anyhow::Result<()> {
        self.send(Command::Seek(secs)).await
    }

    pub async fn set_volume(&self, volume_0_100: u8) -> anyhow::Result<()> {
        self.send(Command::SetVolume(volume_0_100)).await
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.send(Command::Shutdown).await
    }

    /// Sender the playback backend pushes its events through.
    pub fn event_sender(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }

    async fn send(&self, cmd: Command) -> anyhow::Result<()> {
        self.tx
            .send(Event::Command(cmd))
            .await
            .context("engine gone")
    }
}
