//! LRCLIB API client.
//!
//! LRCLIB is a free lyrics API that serves synchronized (LRC format) lyrics.
//! API Documentation: https://lrclib.net/docs

use serde::Deserialize;

/// One search result from the provider.
#[derive(Debug, Deserialize, Clone)]
pub struct LyricsCandidate {
    #[serde(rename = "trackName")]
    pub track_name: String,
    #[serde(rename = "artistName")]
    pub artist_name: String,
    #[serde(rename = "albumName")]
    pub album_name: Option<String>,
    pub duration: Option<f64>,
    #[serde(rename = "plainLyrics")]
    pub plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    pub synced_lyrics: Option<String>,
}

impl LyricsCandidate {
    /// The text worth parsing: time-synced lyrics when present, plain
    /// lyrics otherwise.
    pub fn best_text(&self) -> Option<&str> {
        self.synced_lyrics
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.plain_lyrics.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://lrclib.net/api";
    const USER_AGENT: &'static str = "lyra/0.1.0 (https://github.com/lyra-player)";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(Self::USER_AGENT)
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to create reqwest client"),
            base_url: base_url.into(),
        }
    }

    /// Search by `"{artist} {title}"` and return every candidate the
    /// provider offers, in provider order.
    pub async fn search(&self, artist: &str, title: &str) -> anyhow::Result<Vec<LyricsCandidate>> {
        let query = format!("{} {}", artist, title);
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(&query));

        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            let results: Vec<LyricsCandidate> = response.json().await?;
            Ok(results)
        } else if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(Vec::new())
        } else {
            anyhow::bail!("LRCLIB search error: {}", response.status());
        }
    }
}

impl Default for LrclibClient {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}

/// Pick the candidate to use: the first one whose reported duration lies
/// within `tolerance_secs` of the hint, else the first candidate overall.
/// A zero/unknown hint skips the duration matching entirely.
pub fn pick_candidate(
    candidates: &[LyricsCandidate],
    duration_hint: f64,
    tolerance_secs: f64,
) -> Option<&LyricsCandidate> {
    if duration_hint > 0.0
        && let Some(matched) = candidates.iter().find(|c| {
            c.duration
                .is_some_and(|d| (d - duration_hint).abs() < tolerance_secs)
        })
    {
        return Some(matched);
    }
    candidates.first()
}
