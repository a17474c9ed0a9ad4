use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateMessage, EditMessage};
use serenity::http::Http;
use serenity::model::id::ChannelId;
use tracing::{debug, warn};

use super::{MessageRef, MusicError, Track};
use crate::utils::{components, embed};

/// Why a voice session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    Stopped { by: String },
    Left { by: String },
    ChannelEmpty,
    QueueFinished,
    Disconnected,
}

impl CloseReason {
    /// Sessions closed without a user asking get a channel notice.
    pub fn is_automatic(&self) -> bool {
        matches!(self, Self::ChannelEmpty | Self::QueueFinished | Self::Disconnected)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped { by } => write!(f, "Stopped (Stopped by: {by})"),
            Self::Left { by } => write!(f, "Bot left the channel by command ({by})."),
            Self::ChannelEmpty => write!(
                f,
                "Automatically left because no users remained in voice channel."
            ),
            Self::QueueFinished => write!(f, "Queue finished."),
            Self::Disconnected => write!(f, "Disconnected from voice."),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelStatus {
    Finished,
    Skipped,
    Closed(CloseReason),
}

impl std::fmt::Display for PanelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finished => write!(f, "Finished"),
            Self::Skipped => write!(f, "Skipped"),
            Self::Closed(reason) => write!(f, "{reason}"),
        }
    }
}

/// Text-channel side effects of playback. Failures are logged by the
/// implementation, never returned.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Posts the now-playing panel and returns a handle to it.
    async fn now_playing(
        &self,
        channel_id: ChannelId,
        track: &Track,
        looping: bool,
    ) -> Option<MessageRef>;

    /// Disables a now-playing panel and stamps it with `status`.
    async fn retire(&self, panel: MessageRef, track: &Track, status: &PanelStatus);

    /// Creates or refreshes the jump-to panel. An empty `upcoming` removes
    /// its controls and yields `None`.
    async fn playlist_panel(
        &self,
        channel_id: ChannelId,
        existing: Option<MessageRef>,
        upcoming: &[Track],
    ) -> Option<MessageRef>;

    async fn session_closed(&self, channel_id: ChannelId, reason: &CloseReason);

    async fn playback_failed(&self, channel_id: ChannelId, track: &Track, error: &MusicError);
}

/// [`Announcer`] that talks to Discord over HTTP.
pub struct DiscordAnnouncer {
    http: Arc<Http>,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn now_playing(
        &self,
        channel_id: ChannelId,
        track: &Track,
        looping: bool,
    ) -> Option<MessageRef> {
        let message = CreateMessage::new()
            .embed(embed::now_playing(track, "Playing"))
            .components(components::now_playing_controls(track.id, looping, true));

        match channel_id.send_message(&self.http, message).await {
            Ok(msg) => Some(MessageRef {
                channel_id,
                message_id: msg.id,
            }),
            Err(e) => {
                warn!(channel = %channel_id, "could not post now-playing panel: {e}");
                None
            }
        }
    }

    async fn retire(&self, panel: MessageRef, track: &Track, status: &PanelStatus) {
        let edit = EditMessage::new()
            .embed(embed::now_playing(track, &status.to_string()))
            .components(components::now_playing_controls(track.id, false, false));

        if let Err(e) = panel
            .channel_id
            .edit_message(&self.http, panel.message_id, edit)
            .await
        {
            debug!(message = %panel.message_id, "could not retire panel: {e}");
        }
    }

    async fn playlist_panel(
        &self,
        channel_id: ChannelId,
        existing: Option<MessageRef>,
        upcoming: &[Track],
    ) -> Option<MessageRef> {
        if upcoming.is_empty() {
            if let Some(panel) = existing {
                let edit = EditMessage::new()
                    .content("Playlist skip options removed.")
                    .components(Vec::new());
                if let Err(e) = panel
                    .channel_id
                    .edit_message(&self.http, panel.message_id, edit)
                    .await
                {
                    debug!(message = %panel.message_id, "could not clear playlist panel: {e}");
                }
            }
            return None;
        }

        let rows = components::playlist_controls(upcoming, true);
        if let Some(panel) = existing {
            let edit = EditMessage::new()
                .content("Playlist skip options updated:")
                .components(rows.clone());
            match panel
                .channel_id
                .edit_message(&self.http, panel.message_id, edit)
                .await
            {
                Ok(_) => return Some(panel),
                Err(e) => debug!(message = %panel.message_id, "playlist panel gone, reposting: {e}"),
            }
        }

        let message = CreateMessage::new()
            .content("Click buttons to skip to songs in playlist:")
            .components(rows);
        match channel_id.send_message(&self.http, message).await {
            Ok(msg) => Some(MessageRef {
                channel_id,
                message_id: msg.id,
            }),
            Err(e) => {
                warn!(channel = %channel_id, "could not post playlist panel: {e}");
                None
            }
        }
    }

    async fn session_closed(&self, channel_id: ChannelId, reason: &CloseReason) {
        let message = CreateMessage::new().embed(embed::session_closed(reason));
        if let Err(e) = channel_id.send_message(&self.http, message).await {
            warn!(channel = %channel_id, "could not post disconnect notice: {e}");
        }
    }

    async fn playback_failed(&self, channel_id: ChannelId, track: &Track, error: &MusicError) {
        let message = CreateMessage::new().embed(embed::error(&format!(
            "Could not play **{}**: {error}",
            track.title
        )));
        if let Err(e) = channel_id.send_message(&self.http, message).await {
            warn!(channel = %channel_id, "could not post playback failure: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automatic_reasons() {
        assert!(CloseReason::ChannelEmpty.is_automatic());
        assert!(CloseReason::QueueFinished.is_automatic());
        assert!(CloseReason::Disconnected.is_automatic());
        assert!(!CloseReason::Stopped { by: "a".into() }.is_automatic());
        assert!(!CloseReason::Left { by: "a".into() }.is_automatic());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(PanelStatus::Skipped.to_string(), "Skipped");
        let stopped = PanelStatus::Closed(CloseReason::Stopped { by: "mia".into() });
        assert_eq!(stopped.to_string(), "Stopped (Stopped by: mia)");
    }
}
