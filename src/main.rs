mod config;
mod engine;
mod library;
mod lyrics;
mod player;
mod playlist;
mod sync;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::events::Notification;
use engine::state::PlaybackState;
use library::Track;
use lyrics::LrclibClient;

#[derive(Debug, Parser)]
#[command(name = "lyra", version, about = "Local audio player with synced lyrics")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play audio files, printing lyric lines as they become active.
    Play {
        files: Vec<std::path::PathBuf>,
        /// Start with shuffle mode on.
        #[arg(long)]
        shuffle: bool,
        /// Start with loop mode on.
        #[arg(long = "loop")]
        loop_enabled: bool,
    },
    /// Parse an LRC file and print its timed lines (headless).
    Parse { file: std::path::PathBuf },
    /// Search the remote lyrics provider and print the selected match (headless).
    Search {
        title: String,
        artist: String,
        /// Track duration in seconds, used to narrow candidates.
        #[arg(long, default_value_t = 0.0)]
        duration: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command {
        Command::Play {
            files,
            shuffle,
            loop_enabled,
        } => run_play(&cfg, files, shuffle, loop_enabled).await,
        Command::Parse { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            for line in lyrics::parser::parse(&raw) {
                println!("{:>8.2}  {}", line.start_time, line.text);
            }
            Ok(())
        }
        Command::Search {
            title,
            artist,
            duration,
        } => {
            let client = LrclibClient::new(cfg.lyrics.base_url.as_str());
            let candidates = client.search(&artist, &title).await?;
            match lyrics::lrclib::pick_candidate(
                &candidates,
                duration,
                cfg.lyrics.duration_tolerance_secs,
            ) {
                Some(c) => {
                    eprintln!(
                        "# {} - {} [{}] ({}s)",
                        c.artist_name,
                        c.track_name,
                        c.album_name.as_deref().unwrap_or("-"),
                        c.duration.unwrap_or(0.0)
                    );
                    match c.best_text() {
                        Some(text) => println!("{text}"),
                        None => eprintln!("match carries no lyrics text"),
                    }
                }
                None => eprintln!("no match"),
            }
            Ok(())
        }
    }
}

async fn run_play(
    cfg: &config::Config,
    files: Vec<std::path::PathBuf>,
    shuffle: bool,
    loop_enabled: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(!files.is_empty(), "nothing to play");

    let tracks: Vec<Track> = files.into_iter().map(Track::from_path).collect();
    let first = tracks[0].clone();

    let (player_handle, player_rx) = player::channel(64);
    let client = LrclibClient::new(cfg.lyrics.base_url.as_str());
    let (eng, handle, mut notify_rx) = engine::Engine::new(
        player_handle,
        client,
        cfg.lyrics.duration_tolerance_secs,
        cfg.player.volume,
    );

    std::fs::create_dir_all(&cfg.paths.data_dir)
        .with_context(|| format!("create dir {}", cfg.paths.data_dir.display()))?;
    let mpv_log = cfg.paths.data_dir.join("mpv.log");
    let mpv_task = player::mpv::spawn(
        player_rx,
        handle.event_sender(),
        cfg.player.audio_device.as_deref(),
        Some(&mpv_log),
    )
    .await
    .context("start mpv")?;

    let engine_task = tokio::spawn(eng.run());

    handle.set_volume(cfg.player.volume).await?;
    if shuffle {
        handle.toggle_shuffle().await?;
    }
    if loop_enabled {
        handle.toggle_loop().await?;
    }
    handle.play(first, tracks).await?;

    let mut started = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                handle.stop().await?;
                break;
            }
            n = notify_rx.recv() => {
                let Some(n) = n else { break };
                match n {
                    Notification::StateChanged(snap) => {
                        match (snap.state, &snap.current_track) {
                            (PlaybackState::Playing, Some(t)) => {
                                started = true;
                                let mut flags = String::new();
                                if snap.shuffle_enabled {
                                    flags.push_str(" [shuffle]");
                                }
                                if snap.loop_enabled {
                                    flags.push_str(" [loop]");
                                }
                                eprintln!("Playing: {} - {}{}", t.artist, t.title, flags);
                            }
                            (PlaybackState::Paused, _) => {
                                eprintln!("Paused at {:.0}s", snap.position_secs);
                            }
                            (PlaybackState::Stopped, _) if started => break,
                            _ => {}
                        }
                    }
                    Notification::ActiveLineChanged(Some(text)) => println!("{text}"),
                    Notification::ActiveLineChanged(None) => {}
                    Notification::SidecarWritten { path, .. } => {
                        eprintln!("saved lyrics to {}", path.display());
                    }
                    Notification::LoadFailed { track_id, error } => {
                        eprintln!("failed to load {track_id}: {error}");
                    }
                }
            }
        }
    }

    handle.shutdown().await?;
    let _ = engine_task.await;
    let _ = mpv_task.await;
    Ok(())
}
