//! In-memory stand-ins for the collaborators of the playback controller.
//!
//! Every fake records what it was asked to do so tests can assert on the
//! side effects without a Discord connection, yt-dlp or Spotify.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId};

use super::announce::{Announcer, CloseReason, PanelStatus};
use super::player::{PlaybackController, PlaybackSettings};
use super::source::{MediaBackend, MediaInfo, TrackResolver};
use super::spotify::{CatalogBackend, CatalogTrack};
use super::voice::VoiceGateway;
use super::{MessageRef, MusicError, Platform, QueueStore, Requester, Track, TrackId, TrackIds};

pub fn track(id: TrackId) -> Track {
    Track {
        id,
        platform: Platform::Youtube,
        title: format!("Track {id}"),
        display_url: format!("https://youtube.test/watch?v={id}"),
        stream_url: format!("https://stream.test/{id}"),
        duration_seconds: 180,
        requester: Requester {
            name: "tester".to_string(),
            avatar_url: String::new(),
        },
    }
}

#[derive(Default)]
pub struct FakeMedia {
    targets: Mutex<Vec<String>>,
    fail_on: Option<String>,
    stalled: bool,
}

impl FakeMedia {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    /// Every extraction hangs forever.
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::default()
        }
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaBackend for FakeMedia {
    async fn extract(&self, target: &str) -> Result<MediaInfo, MusicError> {
        self.targets.lock().unwrap().push(target.to_string());
        if self.stalled {
            std::future::pending::<()>().await;
        }
        if self.fail_on.as_deref().is_some_and(|n| target.contains(n)) {
            return Err(MusicError::resolution("no match"));
        }
        let title = target.trim_start_matches("ytsearch1:").to_string();
        Ok(MediaInfo {
            webpage_url: Some(format!("https://youtube.test/{}", title.replace(' ', "_"))),
            stream_url: format!("https://stream.test/{}", title.replace(' ', "_")),
            title: Some(title),
            duration: Some(200.0),
        })
    }

    async fn extract_playlist(
        &self,
        url: &str,
        limit: usize,
    ) -> Result<Vec<MediaInfo>, MusicError> {
        self.targets.lock().unwrap().push(url.to_string());
        Ok((1..=limit)
            .map(|i| MediaInfo {
                title: Some(format!("Entry {i}")),
                webpage_url: Some(format!("https://youtube.test/entry{i}")),
                stream_url: format!("https://stream.test/entry{i}"),
                duration: Some(120.0),
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    tracks: Vec<CatalogTrack>,
    requests: Mutex<Vec<(usize, usize)>>,
    fail_pages: AtomicBool,
    stall_after: Mutex<Option<usize>>,
}

impl FakeCatalog {
    pub fn with_tracks(tracks: Vec<CatalogTrack>) -> Self {
        Self {
            tracks,
            ..Self::default()
        }
    }

    /// A playlist of `n` tracks named "Track i" by "Artist i".
    pub fn playlist(n: usize) -> Self {
        Self::with_tracks(
            (1..=n)
                .map(|i| CatalogTrack {
                    name: format!("Track {i}"),
                    artist: format!("Artist {i}"),
                })
                .collect(),
        )
    }

    pub fn fail_pages(&self) {
        self.fail_pages.store(true, Ordering::SeqCst);
    }

    /// Page requests after the first `served` ones never return.
    pub fn stall_pages_after(&self, served: usize) {
        *self.stall_after.lock().unwrap() = Some(served);
    }

    pub fn page_requests(&self) -> Vec<(usize, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogBackend for FakeCatalog {
    async fn track(&self, _id: &str) -> Result<CatalogTrack, MusicError> {
        self.tracks
            .first()
            .cloned()
            .ok_or_else(|| MusicError::resolution("Could not fetch Spotify song"))
    }

    async fn playlist_total(&self, _id: &str) -> Result<usize, MusicError> {
        Ok(self.tracks.len())
    }

    async fn playlist_page(
        &self,
        _id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Option<CatalogTrack>>, MusicError> {
        if self.fail_pages.load(Ordering::SeqCst) {
            return Err(MusicError::resolution("page unavailable"));
        }
        let served = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((offset, limit));
            requests.len() - 1
        };
        let stall_after = *self.stall_after.lock().unwrap();
        if stall_after.is_some_and(|n| served >= n) {
            std::future::pending::<()>().await;
        }
        let end = (offset + limit).min(self.tracks.len());
        Ok(self
            .tracks
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .cloned()
            .map(Some)
            .collect())
    }
}

#[derive(Default)]
pub struct FakeVoice {
    channels: Mutex<HashMap<GuildId, ChannelId>>,
    started: Mutex<Vec<(TrackId, u64)>>,
    failing: Mutex<HashSet<TrackId>>,
    disconnects: AtomicU64,
}

impl FakeVoice {
    pub fn set_channel(&self, guild_id: GuildId, channel: Option<ChannelId>) {
        let mut channels = self.channels.lock().unwrap();
        match channel {
            Some(ch) => channels.insert(guild_id, ch),
            None => channels.remove(&guild_id),
        };
    }

    pub fn fail_track(&self, id: TrackId) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn started_ids(&self) -> Vec<TrackId> {
        self.started.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    pub fn last_generation(&self) -> Option<u64> {
        self.started.lock().unwrap().last().map(|(_, g)| *g)
    }

    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceGateway for FakeVoice {
    async fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.channels.lock().unwrap().get(&guild_id).copied()
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        self.set_channel(guild_id, Some(channel_id));
        Ok(())
    }

    async fn start(
        &self,
        guild_id: GuildId,
        track: &Track,
        generation: u64,
    ) -> Result<(), MusicError> {
        if !self.channels.lock().unwrap().contains_key(&guild_id) {
            return Err(MusicError::NotConnected);
        }
        if self.failing.lock().unwrap().contains(&track.id) {
            return Err(MusicError::session("stream refused"));
        }
        self.started.lock().unwrap().push((track.id, generation));
        Ok(())
    }

    async fn halt(&self, _guild_id: GuildId) {}

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), MusicError> {
        self.set_channel(guild_id, None);
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Announcement {
    NowPlaying(TrackId),
    Retired(TrackId, PanelStatus),
    PlaylistPanel(Vec<TrackId>),
    Closed(CloseReason),
    Failed(TrackId),
}

#[derive(Default)]
pub struct FakeAnnouncer {
    log: Mutex<Vec<Announcement>>,
    next_message: AtomicU64,
}

impl FakeAnnouncer {
    fn push(&self, announcement: Announcement) {
        self.log.lock().unwrap().push(announcement);
    }

    fn message(&self, channel_id: ChannelId) -> MessageRef {
        MessageRef {
            channel_id,
            message_id: MessageId::new(self.next_message.fetch_add(1, Ordering::SeqCst) + 1),
        }
    }

    pub fn log(&self) -> Vec<Announcement> {
        self.log.lock().unwrap().clone()
    }

    pub fn now_playing_ids(&self) -> Vec<TrackId> {
        self.log()
            .into_iter()
            .filter_map(|a| match a {
                Announcement::NowPlaying(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn retired(&self) -> Vec<(TrackId, PanelStatus)> {
        self.log()
            .into_iter()
            .filter_map(|a| match a {
                Announcement::Retired(id, status) => Some((id, status)),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<CloseReason> {
        self.log()
            .into_iter()
            .filter_map(|a| match a {
                Announcement::Closed(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<TrackId> {
        self.log()
            .into_iter()
            .filter_map(|a| match a {
                Announcement::Failed(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn playlist_panels(&self) -> Vec<Vec<TrackId>> {
        self.log()
            .into_iter()
            .filter_map(|a| match a {
                Announcement::PlaylistPanel(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Announcer for FakeAnnouncer {
    async fn now_playing(
        &self,
        channel_id: ChannelId,
        track: &Track,
        _looping: bool,
    ) -> Option<MessageRef> {
        self.push(Announcement::NowPlaying(track.id));
        Some(self.message(channel_id))
    }

    async fn retire(&self, _panel: MessageRef, track: &Track, status: &PanelStatus) {
        self.push(Announcement::Retired(track.id, status.clone()));
    }

    async fn playlist_panel(
        &self,
        channel_id: ChannelId,
        existing: Option<MessageRef>,
        upcoming: &[Track],
    ) -> Option<MessageRef> {
        self.push(Announcement::PlaylistPanel(
            upcoming.iter().map(|t| t.id).collect(),
        ));
        if upcoming.is_empty() {
            None
        } else {
            Some(existing.unwrap_or_else(|| self.message(channel_id)))
        }
    }

    async fn session_closed(&self, _channel_id: ChannelId, reason: &CloseReason) {
        self.push(Announcement::Closed(reason.clone()));
    }

    async fn playback_failed(&self, _channel_id: ChannelId, track: &Track, _error: &MusicError) {
        self.push(Announcement::Failed(track.id));
    }
}

pub struct Harness {
    pub controller: Arc<PlaybackController>,
    pub voice: Arc<FakeVoice>,
    pub announcer: Arc<FakeAnnouncer>,
    pub media: Arc<FakeMedia>,
    pub catalog: Arc<FakeCatalog>,
}

/// Controller wired to fakes, with a twelve-track Spotify playlist behind
/// the catalog.
pub fn harness(settings: PlaybackSettings) -> Harness {
    harness_with(settings, FakeMedia::default(), FakeCatalog::playlist(12))
}

pub fn harness_with(settings: PlaybackSettings, media: FakeMedia, catalog: FakeCatalog) -> Harness {
    let voice = Arc::new(FakeVoice::default());
    let announcer = Arc::new(FakeAnnouncer::default());
    let media = Arc::new(media);
    let catalog = Arc::new(catalog);

    let resolver = TrackResolver::new(
        media.clone(),
        Some(catalog.clone() as Arc<dyn CatalogBackend>),
        TrackIds::default(),
        settings.page_size,
        Duration::from_secs(5),
    );

    let controller = PlaybackController::new(
        QueueStore::new(),
        voice.clone(),
        Arc::new(resolver),
        announcer.clone(),
        settings,
    );

    Harness {
        controller: Arc::new(controller),
        voice,
        announcer,
        media,
        catalog,
    }
}
