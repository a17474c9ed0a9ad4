use std::str::FromStr;
use std::time::Duration;

use crate::music::{PlaybackSettings, SkipPolicy};

pub struct Config {
    pub discord_token: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub ytdlp_path: String,
    pub page_size: usize,
    pub low_water: usize,
    pub resolve_timeout: Duration,
    pub control_timeout: Duration,
    pub playlist_control_timeout: Duration,
    pub skip_honors_loop: bool,
    pub empty_channel_grace: Duration,
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(parsed(key, default))
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            discord_token: std::env::var("DISCORD_TOKEN")
                .expect("DISCORD_TOKEN environment variable is required"),
            spotify_client_id: non_empty("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: non_empty("SPOTIFY_CLIENT_SECRET"),
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            page_size: parsed("MUSIC_PAGE_SIZE", 5usize).max(1),
            low_water: parsed("MUSIC_LOW_WATER", 5usize).max(1),
            resolve_timeout: secs("MUSIC_RESOLVE_TIMEOUT_SECS", 30),
            control_timeout: secs("MUSIC_CONTROL_TIMEOUT_SECS", 60),
            playlist_control_timeout: secs("MUSIC_PLAYLIST_CONTROL_TIMEOUT_SECS", 120),
            skip_honors_loop: parsed("MUSIC_SKIP_HONORS_LOOP", false),
            empty_channel_grace: secs("MUSIC_EMPTY_CHANNEL_GRACE_SECS", 0),
        }
    }

    /// Both halves of the client-credentials pair, or nothing.
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        }
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            skip_policy: if self.skip_honors_loop {
                SkipPolicy::HonorLoop
            } else {
                SkipPolicy::Advance
            },
            low_water: self.low_water,
            page_size: self.page_size,
            control_timeout: self.control_timeout,
            playlist_control_timeout: self.playlist_control_timeout,
        }
    }
}
