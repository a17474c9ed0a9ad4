use std::sync::Arc;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::events::{Event, EventContext, EventHandler, TrackEvent};
use songbird::input::HttpRequest;
use songbird::Songbird;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::{MusicError, Track};

/// Emitted when a stream started with `generation` stops on its own or fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackEnded {
    pub guild_id: GuildId,
    pub generation: u64,
    pub errored: bool,
}

/// Voice connection primitives the controller drives.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError>;

    /// Replaces whatever is playing with `track`. When it ends, a
    /// [`TrackEnded`] tagged with `generation` must be reported.
    async fn start(
        &self,
        guild_id: GuildId,
        track: &Track,
        generation: u64,
    ) -> Result<(), MusicError>;

    async fn halt(&self, guild_id: GuildId);

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), MusicError>;
}

struct TrackEndNotifier {
    ended: UnboundedSender<TrackEnded>,
    guild_id: GuildId,
    generation: u64,
    errored: bool,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let event = TrackEnded {
            guild_id: self.guild_id,
            generation: self.generation,
            errored: self.errored,
        };
        if self.ended.send(event).is_err() {
            debug!(guild = %self.guild_id, "track-end listener is gone");
        }
        None
    }
}

/// [`VoiceGateway`] backed by songbird.
pub struct SongbirdVoice {
    manager: Arc<Songbird>,
    http_client: reqwest::Client,
    ended: UnboundedSender<TrackEnded>,
}

impl SongbirdVoice {
    pub fn new(
        manager: Arc<Songbird>,
        http_client: reqwest::Client,
        ended: UnboundedSender<TrackEnded>,
    ) -> Self {
        Self {
            manager,
            http_client,
            ended,
        }
    }

    fn notifier(&self, guild_id: GuildId, generation: u64, errored: bool) -> TrackEndNotifier {
        TrackEndNotifier {
            ended: self.ended.clone(),
            guild_id,
            generation,
            errored,
        }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdVoice {
    async fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let call = self.manager.get(guild_id)?;
        let handler = call.lock().await;
        handler.current_channel().map(|ch| ChannelId::new(ch.0.get()))
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        self.manager
            .join(guild_id, channel_id)
            .await
            .map_err(MusicError::session)?;
        info!(guild = %guild_id, channel = %channel_id, "joined voice channel");
        Ok(())
    }

    async fn start(
        &self,
        guild_id: GuildId,
        track: &Track,
        generation: u64,
    ) -> Result<(), MusicError> {
        let call = self.manager.get(guild_id).ok_or(MusicError::NotConnected)?;
        let src = HttpRequest::new(self.http_client.clone(), track.stream_url.clone());

        let mut handler = call.lock().await;
        let track_handle = handler.play_only(src.into());

        track_handle
            .add_event(
                Event::Track(TrackEvent::End),
                self.notifier(guild_id, generation, false),
            )
            .map_err(MusicError::session)?;
        track_handle
            .add_event(
                Event::Track(TrackEvent::Error),
                self.notifier(guild_id, generation, true),
            )
            .map_err(MusicError::session)?;

        Ok(())
    }

    async fn halt(&self, guild_id: GuildId) {
        if let Some(call) = self.manager.get(guild_id) {
            call.lock().await.stop();
        }
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), MusicError> {
        if self.manager.get(guild_id).is_none() {
            return Ok(());
        }
        if let Err(e) = self.manager.remove(guild_id).await {
            warn!(guild = %guild_id, "voice disconnect failed: {e}");
            return Err(MusicError::session(e));
        }
        info!(guild = %guild_id, "left voice channel");
        Ok(())
    }
}
