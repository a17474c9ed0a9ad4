use thiserror::Error;

use super::TrackId;

/// Failures of the music subsystem. The `Display` text is what users see.
#[derive(Debug, Error)]
pub enum MusicError {
    #[error("Could not resolve that track: {0}")]
    Resolution(String),

    #[error("You need to join a voice channel first.")]
    NoVoiceChannel,

    #[error("Bot is not in a voice channel.")]
    NotConnected,

    #[error("You must be in the same voice channel.")]
    ChannelMismatch,

    #[error("No song currently playing.")]
    NothingPlaying,

    #[error("Song is already played or not found.")]
    StaleTarget(TrackId),

    #[error("These controls have expired.")]
    ControlsExpired,

    #[error("Voice session failure: {0}")]
    Session(String),
}

impl MusicError {
    pub fn resolution(msg: impl std::fmt::Display) -> Self {
        Self::Resolution(msg.to_string())
    }

    pub fn session(msg: impl std::fmt::Display) -> Self {
        Self::Session(msg.to_string())
    }
}

impl From<reqwest::Error> for MusicError {
    fn from(e: reqwest::Error) -> Self {
        Self::Resolution(e.to_string())
    }
}

impl From<serde_json::Error> for MusicError {
    fn from(e: serde_json::Error) -> Self {
        Self::Resolution(format!("unexpected response: {e}"))
    }
}

impl From<tokio::time::error::Elapsed> for MusicError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Resolution("timed out".to_string())
    }
}
