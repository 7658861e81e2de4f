//! mpv playback backend over its JSON IPC socket.
//!
//! mpv runs as a child process in idle mode; commands go in over the
//! socket, observed properties (time-pos, duration, pause) come back and
//! are mapped to tagged [`PlayerEvent`]s. End-of-file and load errors are
//! told apart by the `end-file` reason.

use crate::engine::events::{Event, PlayerEvent};
use crate::library::TrackId;
use crate::player::PlayerCmd;
use anyhow::Context;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
    process::{Child, Command},
    sync::mpsc,
};
use tracing::warn;

/// Spawn mpv and wire it to the engine: `cmd_rx` feeds commands in,
/// `event_tx` carries player events back. Returns once the IPC socket is
/// up; the returned handle completes after the command channel closes
/// and the child has been told to die.
pub async fn spawn(
    cmd_rx: mpsc::Receiver<PlayerCmd>,
    event_tx: mpsc::Sender<Event>,
    audio_device: Option<&str>,
    log_file: Option<&Path>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let socket_path = std::env::temp_dir().join(format!("lyra-mpv-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new("mpv");
    cmd.args([
        "--no-video",
        "--idle=yes",
        "--input-terminal=no",
        "--really-quiet",
        "--audio-channels=stereo",
        "--audio-samplerate=48000",
        "--audio-format=s16",
    ]);
    if let Some(dev) = audio_device {
        cmd.arg(format!("--audio-device={dev}"));
    }
    if let Some(p) = log_file {
        cmd.arg(format!("--log-file={}", p.display()));
    }
    let child = cmd
        .arg(format!("--input-ipc-server={}", socket_path.display()))
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("spawn mpv")?;

    let stream = connect_with_retry(&socket_path).await?;
    let (reader, writer) = tokio::io::split(stream);

    // The source most recently loaded; the read loop uses it to tag
    // position/end events with a track identity.
    let current: Arc<Mutex<Option<TrackId>>> = Arc::new(Mutex::new(None));

    let mut ipc = Ipc {
        writer,
        request_id: 1,
    };
    ipc.command(json!({"command":["request_log_messages", "warn"]}))
        .await?;
    ipc.command(json!({"command":["observe_property", 1, "time-pos"]}))
        .await?;
    ipc.command(json!({"command":["observe_property", 2, "duration"]}))
        .await?;
    ipc.command(json!({"command":["observe_property", 3, "pause"]}))
        .await?;

    tokio::spawn(read_events_loop(reader, event_tx.clone(), current.clone()));
    let pump = tokio::spawn(command_loop(
        cmd_rx,
        ipc,
        child,
        socket_path,
        current,
        event_tx,
    ));

    Ok(pump)
}

struct Ipc {
    writer: tokio::io::WriteHalf<UnixStream>,
    request_id: u64,
}

impl Ipc {
    async fn command(&mut self, mut v: serde_json::Value) -> anyhow::Result<()> {
        // Tag requests so errors on the IPC stream can be attributed.
        if let serde_json::Value::Object(ref mut o) = v {
            o.insert("request_id".to_string(), serde_json::Value::from(self.request_id));
            self.request_id += 1;
        }
        let mut line = serde_json::to_vec(&v).context("encode mpv json")?;
        line.push(b'\n');
        self.writer.write_all(&line).await.context("write mpv ipc")?;
        self.writer.flush().await.context("flush mpv ipc")?;
        Ok(())
    }
}

async fn command_loop(
    mut rx: mpsc::Receiver<PlayerCmd>,
    mut ipc: Ipc,
    mut child: Child,
    socket_path: PathBuf,
    current: Arc<Mutex<Option<TrackId>>>,
    event_tx: mpsc::Sender<Event>,
) {
    while let Some(cmd) = rx.recv().await {
        let result = match cmd {
            PlayerCmd::Load { id, path } => {
                *current.lock().expect("current track lock") = Some(id.clone());
                let mut loaded = ipc
                    .command(json!({"command":["loadfile", path.to_string_lossy(), "replace"]}))
                    .await;
                if loaded.is_ok() {
                    loaded = ipc
                        .command(json!({"command":["set_property", "pause", false]}))
                        .await;
                }
                if let Err(e) = loaded {
                    let _ = event_tx
                        .send(Event::Player(PlayerEvent::LoadFailed {
                            id,
                            error: format!("{e:#}"),
                        }))
                        .await;
                }
                Ok(())
            }
            PlayerCmd::SetPause(paused) => {
                ipc.command(json!({"command":["set_property", "pause", paused]}))
                    .await
            }
            PlayerCmd::Seek(secs) => {
                ipc.command(json!({"command":["seek", secs, "absolute"]})).await
            }
            PlayerCmd::SetVolume(v) => {
                ipc.command(json!({"command":["set_property", "volume", v]}))
                    .await
            }
            PlayerCmd::Stop => {
                *current.lock().expect("current track lock") = None;
                ipc.command(json!({"command":["stop"]})).await
            }
        };
        if let Err(e) = result {
            let _ = event_tx
                .send(Event::Player(PlayerEvent::Error(format!("mpv ipc: {e:#}"))))
                .await;
        }
    }

    let _ = child.start_kill();
    let _ = std::fs::remove_file(&socket_path);
}

async fn connect_with_retry(path: &PathBuf) -> anyhow::Result<UnixStream> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        match UnixStream::connect(path).await {
            Ok(s) => return Ok(s),
            Err(e) => {
                if tokio::time::Instant::now() > deadline {
                    return Err(e).with_context(|| format!("connect to mpv ipc {}", path.display()));
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
    }
}

async fn read_events_loop(
    reader: tokio::io::ReadHalf<UnixStream>,
    event_tx: mpsc::Sender<Event>,
    current: Arc<Mutex<Option<TrackId>>>,
) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(v) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        // Command replies: {"request_id":..., "error":"..."}
        if let (Some(_rid), Some(err)) = (v.get("request_id"), v.get("error"))
            && let Some(err_s) = err.as_str()
            && err_s != "success"
        {
            warn!("mpv command error: {err_s}");
        }
        let id = current.lock().expect("current track lock").clone();
        if let Some(pe) = map_mpv_event(&v, id) {
            let _ = event_tx.send(Event::Player(pe)).await;
        }
    }
}

fn map_mpv_event(v: &serde_json::Value, current: Option<TrackId>) -> Option<PlayerEvent> {
    match v.get("event")?.as_str()? {
        "property-change" => {
            let name = v.get("name")?.as_str()?;
            match name {
                "time-pos" => Some(PlayerEvent::Position {
                    id: current?,
                    secs: v.get("data")?.as_f64()?,
                }),
                "duration" => Some(PlayerEvent::Duration {
                    id: current?,
                    secs: v.get("data")?.as_f64()?,
                }),
                "pause" => Some(PlayerEvent::Paused(v.get("data")?.as_bool()?)),
                _ => None,
            }
        }
        "end-file" => {
            // reason=eof is a natural finish; reason=error means the
            // source could not be played. Stops and replacements
            // (reason=stop/redirect) are engine-initiated and ignored.
            let reason = v.get("reason").and_then(|x| x.as_str()).unwrap_or("");
            match reason {
                "eof" => Some(PlayerEvent::Ended { id: current? }),
                "error" => {
                    let err = v.get("error").and_then(|x| x.as_str()).unwrap_or("unknown");
                    Some(PlayerEvent::LoadFailed {
                        id: current?,
                        error: err.to_string(),
                    })
                }
                _ => None,
            }
        }
        "log-message" => {
            let level = v.get("level")?.as_str().unwrap_or("info");
            let text = v.get("text")?.as_str().unwrap_or("").trim();
            if (level == "warn" || level == "error") && !text.is_empty() {
                Some(PlayerEvent::Error(format!("mpv {level}: {text}")))
            } else {
                None
            }
        }
        _ => None,
    }
}
