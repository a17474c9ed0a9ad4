use std::sync::Arc;
use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::announce::{Announcer, CloseReason, PanelStatus};
use super::control::ControlAction;
use super::paginator::Paginator;
use super::source::{Resolution, TrackResolver};
use super::voice::{TrackEnded, VoiceGateway};
use super::{GuildPlaybackState, MusicError, Platform, QueueStore, Requester, Track, TrackId};

/// Whether an explicit skip restarts a looping track or moves on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    #[default]
    Advance,
    HonorLoop,
}

#[derive(Clone, Debug)]
pub struct PlaybackSettings {
    pub skip_policy: SkipPolicy,
    pub low_water: usize,
    pub page_size: usize,
    pub control_timeout: Duration,
    pub playlist_control_timeout: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            skip_policy: SkipPolicy::Advance,
            low_water: 5,
            page_size: 5,
            control_timeout: Duration::from_secs(60),
            playlist_control_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug)]
pub enum PlayOutcome {
    Started(Track),
    Queued { track: Track, position: usize },
    Playlist {
        platform: Platform,
        started: Option<Track>,
        queued: usize,
        total: Option<usize>,
    },
}

#[derive(Debug)]
pub enum ControlOutcome {
    Skipped { next: Option<Track> },
    Jumped { next: Option<Track> },
    LoopToggled(bool),
    Stopped,
}

/// Drives voice playback for every guild. All public operations take the
/// guild's lock from [`QueueStore`] and hold it for the whole transition.
pub struct PlaybackController {
    store: QueueStore,
    voice: Arc<dyn VoiceGateway>,
    resolver: Arc<TrackResolver>,
    announcer: Arc<dyn Announcer>,
    paginator: Paginator,
    settings: PlaybackSettings,
}

impl PlaybackController {
    pub fn new(
        store: QueueStore,
        voice: Arc<dyn VoiceGateway>,
        resolver: Arc<TrackResolver>,
        announcer: Arc<dyn Announcer>,
        settings: PlaybackSettings,
    ) -> Self {
        Self {
            store,
            voice,
            resolver,
            announcer,
            paginator: Paginator::new(settings.low_water),
            settings,
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn voice(&self) -> &Arc<dyn VoiceGateway> {
        &self.voice
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Feeds track-end events from the voice gateway back into the
    /// controller. Each event is handled on its own task.
    pub fn listen(self: Arc<Self>, mut ended: UnboundedReceiver<TrackEnded>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = ended.recv().await {
                let controller = Arc::clone(&self);
                tokio::spawn(async move {
                    controller.on_track_end(event).await;
                });
            }
            debug!("track-end channel closed");
        })
    }

    async fn ensure_session(
        &self,
        guild_id: GuildId,
        user_channel: Option<ChannelId>,
    ) -> Result<ChannelId, MusicError> {
        if let Some(channel) = self.voice.connected_channel(guild_id).await {
            return Ok(channel);
        }
        let channel = user_channel.ok_or(MusicError::NoVoiceChannel)?;
        self.voice.connect(guild_id, channel).await?;
        Ok(channel)
    }

    pub async fn join(
        &self,
        guild_id: GuildId,
        user_channel: Option<ChannelId>,
        text_channel: ChannelId,
    ) -> Result<ChannelId, MusicError> {
        let channel = user_channel.ok_or(MusicError::NoVoiceChannel)?;
        let mut state = self.store.lock(guild_id).await;
        state.text_channel = Some(text_channel);
        self.voice.connect(guild_id, channel).await?;
        Ok(channel)
    }

    /// Resolves `query` and either starts it or queues it. Resolution runs
    /// before the guild lock is taken; state is re-read afterwards.
    pub async fn request(
        &self,
        guild_id: GuildId,
        user_channel: Option<ChannelId>,
        text_channel: ChannelId,
        query: &str,
        requester: &Requester,
    ) -> Result<PlayOutcome, MusicError> {
        if user_channel.is_none() && self.voice.connected_channel(guild_id).await.is_none() {
            return Err(MusicError::NoVoiceChannel);
        }

        let resolution = self.resolver.resolve(query, requester).await?;

        let mut state = self.store.lock(guild_id).await;
        state.text_channel = Some(text_channel);
        self.ensure_session(guild_id, user_channel).await?;

        match resolution {
            Resolution::Single(track) => {
                if state.playlist.take().is_some() {
                    info!(guild = %guild_id, "playlist mode turned off by a new request");
                    self.close_playlist_panel(&mut state).await;
                }

                if state.current.is_some() {
                    let position = state.enqueue(track.clone());
                    return Ok(PlayOutcome::Queued { track, position });
                }

                state.queue.push_front(track);
                self.advance(guild_id, &mut state, false, PanelStatus::Finished)
                    .await
                    .map(PlayOutcome::Started)
                    .ok_or_else(|| MusicError::session("the stream could not be started"))
            }
            Resolution::Playlist {
                platform,
                tracks,
                cursor,
            } => {
                let queued = tracks.len();
                let total = cursor.as_ref().map(|c| c.total_count);
                state.playlist = cursor;
                state.queue.extend(tracks);

                let started = if state.current.is_none() {
                    self.advance(guild_id, &mut state, false, PanelStatus::Finished)
                        .await
                } else {
                    None
                };
                self.refresh_playlist_panel(&mut state).await;

                Ok(PlayOutcome::Playlist {
                    platform,
                    started,
                    queued,
                    total,
                })
            }
        }
    }

    /// Natural end (or failure) of a stream.
    pub async fn on_track_end(&self, event: TrackEnded) {
        let mut state = self.store.lock(event.guild_id).await;
        if state.generation != event.generation || state.current.is_none() {
            debug!(guild = %event.guild_id, generation = event.generation, "ignoring stale track end");
            return;
        }

        if event.errored {
            warn!(guild = %event.guild_id, "stream ended with an error");
        }

        // A broken stream is never looped.
        let honor_loop = !event.errored;
        self.advance(event.guild_id, &mut state, honor_loop, PanelStatus::Finished)
            .await;
    }

    /// Skips the current track. Returns the skipped track and its successor.
    pub async fn skip(&self, guild_id: GuildId) -> Result<(Track, Option<Track>), MusicError> {
        let mut state = self.store.lock(guild_id).await;
        let skipped = state.current.clone().ok_or(MusicError::NothingPlaying)?;
        let honor_loop = self.settings.skip_policy == SkipPolicy::HonorLoop;
        let next = self
            .advance(guild_id, &mut state, honor_loop, PanelStatus::Skipped)
            .await;
        Ok((skipped, next))
    }

    /// Drops everything queued ahead of `id` and plays it.
    pub async fn jump_to(&self, guild_id: GuildId, id: TrackId) -> Result<Option<Track>, MusicError> {
        let mut state = self.store.lock(guild_id).await;
        state.jump_to(id)?;
        Ok(self
            .advance(guild_id, &mut state, false, PanelStatus::Skipped)
            .await)
    }

    pub async fn set_loop(&self, guild_id: GuildId, looping: bool) {
        self.store.lock(guild_id).await.looping = looping;
    }

    pub async fn toggle_loop(&self, guild_id: GuildId) -> bool {
        self.store.lock(guild_id).await.toggle_loop()
    }

    /// Tears the session down and resets the guild to Idle. Returns `false`
    /// when there was nothing to stop.
    pub async fn stop(&self, guild_id: GuildId, reason: CloseReason) -> bool {
        let mut state = self.store.lock(guild_id).await;
        let connected = self.voice.connected_channel(guild_id).await.is_some();
        if !connected && state.is_idle() {
            return false;
        }
        self.close_session(guild_id, &mut state, reason).await;
        true
    }

    /// The voice connection went away underneath us.
    pub async fn session_lost(&self, guild_id: GuildId) {
        let mut state = self.store.lock(guild_id).await;
        if state.is_idle() {
            return;
        }
        self.close_session(guild_id, &mut state, CloseReason::Disconnected)
            .await;
    }

    /// Runs a button action. Session and membership checks happen before
    /// this is called; whether the target track still exists is checked
    /// here, under the lock.
    pub async fn apply(
        &self,
        guild_id: GuildId,
        action: ControlAction,
        actor: &str,
    ) -> Result<ControlOutcome, MusicError> {
        let mut state = self.store.lock(guild_id).await;

        match action {
            ControlAction::Skip(id) => {
                if state.is_current(id) {
                    let honor_loop = self.settings.skip_policy == SkipPolicy::HonorLoop;
                    let next = self
                        .advance(guild_id, &mut state, honor_loop, PanelStatus::Skipped)
                        .await;
                    Ok(ControlOutcome::Skipped { next })
                } else {
                    state.jump_to(id)?;
                    let next = self
                        .advance(guild_id, &mut state, false, PanelStatus::Skipped)
                        .await;
                    Ok(ControlOutcome::Skipped { next })
                }
            }
            ControlAction::JumpTo(id) => {
                state.jump_to(id)?;
                let next = self
                    .advance(guild_id, &mut state, false, PanelStatus::Skipped)
                    .await;
                Ok(ControlOutcome::Jumped { next })
            }
            ControlAction::ToggleLoop(id) => {
                if !state.holds(id) {
                    return Err(MusicError::StaleTarget(id));
                }
                Ok(ControlOutcome::LoopToggled(state.toggle_loop()))
            }
            ControlAction::Stop(id) => {
                if !state.holds(id) {
                    return Err(MusicError::StaleTarget(id));
                }
                let reason = CloseReason::Stopped {
                    by: actor.to_string(),
                };
                self.close_session(guild_id, &mut state, reason).await;
                Ok(ControlOutcome::Stopped)
            }
        }
    }

    /// Moves playback forward and returns the track now playing. Streams
    /// that fail to start are skipped; an exhausted queue closes the session.
    async fn advance(
        &self,
        guild_id: GuildId,
        state: &mut GuildPlaybackState,
        honor_loop: bool,
        status: PanelStatus,
    ) -> Option<Track> {
        let mut honor_loop = honor_loop;

        loop {
            let replay = honor_loop && state.looping && state.current.is_some();

            if !replay {
                self.retire_panel(state, &status).await;
                if state.playlist.is_some() {
                    let added = self.paginator.refill(&self.resolver, state).await;
                    if added > 0 {
                        info!(guild = %guild_id, added, "playlist refilled");
                    }
                }
            }

            let Some(track) = state.next_track(honor_loop) else {
                self.close_session(guild_id, state, CloseReason::QueueFinished)
                    .await;
                return None;
            };

            match self.start(guild_id, state, &track, replay).await {
                Ok(()) => {
                    if !replay && state.playlist_panel.is_some() {
                        self.refresh_playlist_panel(state).await;
                    }
                    return Some(track);
                }
                Err(e) => {
                    error!(guild = %guild_id, track = %track.title, "could not start stream: {e}");
                    if let Some(channel) = state.text_channel {
                        self.announcer.playback_failed(channel, &track, &e).await;
                    }
                    honor_loop = false;
                }
            }
        }
    }

    async fn start(
        &self,
        guild_id: GuildId,
        state: &mut GuildPlaybackState,
        track: &Track,
        replay: bool,
    ) -> Result<(), MusicError> {
        state.generation += 1;
        self.voice.start(guild_id, track, state.generation).await?;
        info!(guild = %guild_id, track = %track.title, id = track.id, replay, "now playing");

        if replay && state.panel.is_some() {
            return Ok(());
        }
        if let Some(channel) = state.text_channel {
            state.panel = self
                .announcer
                .now_playing(channel, track, state.looping)
                .await;
        }
        Ok(())
    }

    async fn retire_panel(&self, state: &mut GuildPlaybackState, status: &PanelStatus) {
        if let (Some(panel), Some(track)) = (state.panel.take(), state.current.as_ref()) {
            self.announcer.retire(panel, track, status).await;
        }
    }

    async fn refresh_playlist_panel(&self, state: &mut GuildPlaybackState) {
        let Some(channel) = state.text_channel else {
            return;
        };
        let upcoming = state.peek(self.settings.page_size);
        let existing = state.playlist_panel.take();
        if existing.is_none() && upcoming.is_empty() {
            return;
        }
        state.playlist_panel = self
            .announcer
            .playlist_panel(channel, existing, &upcoming)
            .await;
    }

    async fn close_playlist_panel(&self, state: &mut GuildPlaybackState) {
        if let (Some(panel), Some(channel)) = (state.playlist_panel.take(), state.text_channel) {
            self.announcer.playlist_panel(channel, Some(panel), &[]).await;
        }
    }

    async fn close_session(
        &self,
        guild_id: GuildId,
        state: &mut GuildPlaybackState,
        reason: CloseReason,
    ) {
        self.retire_panel(state, &PanelStatus::Closed(reason.clone()))
            .await;
        self.close_playlist_panel(state).await;

        self.voice.halt(guild_id).await;
        if let Err(e) = self.voice.disconnect(guild_id).await {
            warn!(guild = %guild_id, "disconnect failed: {e}");
        }
        state.reset();
        info!(guild = %guild_id, %reason, "session closed");

        if reason.is_automatic() {
            if let Some(channel) = state.text_channel {
                self.announcer.session_closed(channel, &reason).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::testing::{harness, Harness};

    fn guild() -> GuildId {
        GuildId::new(42)
    }

    async fn playing(h: &Harness, ids: &[TrackId]) {
        let mut state = h.controller.store().lock(guild()).await;
        state.text_channel = Some(ChannelId::new(5));
        for id in ids {
            state.enqueue(crate::music::testing::track(*id));
        }
        drop(state);
        h.voice.set_channel(guild(), Some(ChannelId::new(9)));
        let mut state = h.controller.store().lock(guild()).await;
        h.controller
            .advance(guild(), &mut state, false, PanelStatus::Finished)
            .await;
    }

    #[tokio::test]
    async fn test_stale_track_end_is_ignored() {
        let h = harness(PlaybackSettings::default());
        playing(&h, &[1, 2, 3]).await;
        let first_generation = h.controller.store().lock(guild()).await.generation;

        h.controller.skip(guild()).await.unwrap();
        h.controller
            .on_track_end(TrackEnded {
                guild_id: guild(),
                generation: first_generation,
                errored: false,
            })
            .await;

        let (current, queue) = h.controller.store().snapshot(guild()).await;
        assert_eq!(current.unwrap().id, 2);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_moves_on() {
        let h = harness(PlaybackSettings::default());
        h.voice.fail_track(1);
        playing(&h, &[1, 2]).await;

        let current = h.controller.store().current(guild()).await;
        assert_eq!(current.unwrap().id, 2);
        assert_eq!(h.announcer.failures(), vec![1]);
    }

    #[tokio::test]
    async fn test_errored_stream_does_not_loop() {
        let h = harness(PlaybackSettings::default());
        playing(&h, &[1, 2]).await;
        h.controller.set_loop(guild(), true).await;
        let generation = h.controller.store().lock(guild()).await.generation;

        h.controller
            .on_track_end(TrackEnded {
                guild_id: guild(),
                generation,
                errored: true,
            })
            .await;

        assert_eq!(h.controller.store().current(guild()).await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_loop_replay_keeps_panel() {
        let h = harness(PlaybackSettings::default());
        playing(&h, &[1, 2]).await;
        h.controller.set_loop(guild(), true).await;
        let generation = h.controller.store().lock(guild()).await.generation;

        h.controller
            .on_track_end(TrackEnded {
                guild_id: guild(),
                generation,
                errored: false,
            })
            .await;

        assert_eq!(h.announcer.now_playing_ids(), vec![1]);
        assert!(h.announcer.retired().is_empty());
        assert_eq!(h.voice.started_ids(), vec![1, 1]);
    }
}
