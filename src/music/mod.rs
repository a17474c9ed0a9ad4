pub mod announce;
pub mod control;
pub mod error;
pub mod paginator;
pub mod player;
pub mod queue;
pub mod source;
pub mod spotify;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod voice;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serenity::model::id::{ChannelId, MessageId};

pub use error::MusicError;
pub use player::{PlaybackController, PlaybackSettings, SkipPolicy};
pub use queue::QueueStore;

pub type TrackId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Youtube,
    Spotify,
}

impl Platform {
    pub fn color(self) -> u32 {
        match self {
            Self::Youtube => 0xFF0000,
            Self::Spotify => 0x1DB954,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Youtube => write!(f, "YouTube"),
            Self::Spotify => write!(f, "Spotify"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Requester {
    pub name: String,
    pub avatar_url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub platform: Platform,
    pub title: String,
    pub display_url: String,
    pub stream_url: String,
    pub duration_seconds: u64,
    pub requester: Requester,
}

impl Track {
    pub fn duration_label(&self) -> String {
        format_duration(self.duration_seconds)
    }
}

pub fn format_duration(secs: u64) -> String {
    let mins = secs / 60;
    let remaining = secs % 60;
    format!("{mins:02}:{remaining:02}")
}

/// Process-wide allocator for [`TrackId`]s. Ids start at 1 and only grow.
#[derive(Clone, Debug, Default)]
pub struct TrackIds(Arc<AtomicU64>);

impl TrackIds {
    pub fn next(&self) -> TrackId {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Where an external playlist left off.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistCursor {
    pub source_id: String,
    pub total_count: usize,
    pub fetched_offset: usize,
    pub requester: Requester,
}

impl PlaylistCursor {
    pub fn is_exhausted(&self) -> bool {
        self.fetched_offset >= self.total_count
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Playback state of one guild. Only reachable through [`QueueStore::lock`],
/// so every mutation below runs under that guild's lock.
#[derive(Debug, Default)]
pub struct GuildPlaybackState {
    pub queue: VecDeque<Track>,
    pub current: Option<Track>,
    pub looping: bool,
    pub playlist: Option<PlaylistCursor>,
    /// Bumped every time a stream is started; track-end events from older
    /// generations are stale.
    pub generation: u64,
    pub text_channel: Option<ChannelId>,
    pub panel: Option<MessageRef>,
    pub playlist_panel: Option<MessageRef>,
}

impl GuildPlaybackState {
    /// Appends a track and returns its 1-based queue position.
    pub fn enqueue(&mut self, track: Track) -> usize {
        self.queue.push_back(track);
        self.queue.len()
    }

    /// Picks the track to play next. With `honor_loop` and looping on, the
    /// current track is returned again and the queue is left alone.
    pub fn next_track(&mut self, honor_loop: bool) -> Option<Track> {
        if honor_loop && self.looping {
            if let Some(current) = &self.current {
                return Some(current.clone());
            }
        }

        self.current = self.queue.pop_front();
        self.current.clone()
    }

    pub fn dequeue_next(&mut self) -> Option<Track> {
        self.next_track(true)
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        self.looping
    }

    pub fn peek(&self, n: usize) -> Vec<Track> {
        self.queue.iter().take(n).cloned().collect()
    }

    pub fn position_of(&self, id: TrackId) -> Option<usize> {
        self.queue.iter().position(|t| t.id == id)
    }

    pub fn is_current(&self, id: TrackId) -> bool {
        self.current.as_ref().is_some_and(|t| t.id == id)
    }

    pub fn holds(&self, id: TrackId) -> bool {
        self.is_current(id) || self.position_of(id).is_some()
    }

    /// Drops every queued track ahead of `id`, leaving `id` at the head.
    pub fn jump_to(&mut self, id: TrackId) -> Result<(), MusicError> {
        let index = self.position_of(id).ok_or(MusicError::StaleTarget(id))?;
        self.queue.drain(..index);
        Ok(())
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    /// Back to Idle. The text channel binding survives so the next notice
    /// still has somewhere to go.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.current = None;
        self.looping = false;
        self.playlist = None;
        self.panel = None;
        self.playlist_panel = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::testing::track;

    fn state_with(ids: &[TrackId]) -> GuildPlaybackState {
        let mut state = GuildPlaybackState::default();
        for id in ids {
            state.enqueue(track(*id));
        }
        state
    }

    fn queued_ids(state: &GuildPlaybackState) -> Vec<TrackId> {
        state.queue.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_track_ids_are_monotonic() {
        let ids = TrackIds::default();
        let first = ids.next();
        let second = ids.clone().next();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(61), "01:01");
        assert_eq!(format_duration(3599), "59:59");
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::Youtube.to_string(), "YouTube");
        assert_eq!(Platform::Spotify.to_string(), "Spotify");
    }

    #[test]
    fn test_dequeue_sets_current_and_shrinks_queue() {
        let mut state = state_with(&[1, 2, 3]);
        let next = state.dequeue_next().unwrap();
        assert_eq!(next.id, 1);
        assert!(state.is_current(1));
        assert_eq!(queued_ids(&state), vec![2, 3]);
    }

    #[test]
    fn test_loop_replays_current_without_touching_queue() {
        let mut state = state_with(&[1, 2]);
        state.dequeue_next();
        state.looping = true;

        for _ in 0..3 {
            assert_eq!(state.dequeue_next().unwrap().id, 1);
        }
        assert_eq!(queued_ids(&state), vec![2]);

        state.looping = false;
        assert_eq!(state.dequeue_next().unwrap().id, 2);
    }

    #[test]
    fn test_loop_without_current_takes_head() {
        let mut state = state_with(&[4]);
        state.looping = true;
        assert_eq!(state.dequeue_next().unwrap().id, 4);
    }

    #[test]
    fn test_jump_to_discards_earlier_tracks() {
        let mut state = state_with(&[1, 2, 3, 4]);
        state.jump_to(3).unwrap();
        assert_eq!(queued_ids(&state), vec![3, 4]);
    }

    #[test]
    fn test_jump_to_unknown_is_stale_and_leaves_queue() {
        let mut state = state_with(&[1, 2]);
        let err = state.jump_to(9).unwrap_err();
        assert!(matches!(err, MusicError::StaleTarget(9)));
        assert_eq!(queued_ids(&state), vec![1, 2]);
    }

    #[test]
    fn test_queue_never_holds_current() {
        let mut state = state_with(&[1, 2, 3, 4, 5]);
        let ops: [&dyn Fn(&mut GuildPlaybackState); 4] = [
            &|s| {
                s.dequeue_next();
            },
            &|s| {
                let _ = s.jump_to(4);
            },
            &|s| {
                s.enqueue(track(10));
            },
            &|s| {
                s.dequeue_next();
            },
        ];

        for op in ops {
            op(&mut state);
            if let Some(current) = &state.current {
                assert!(state.position_of(current.id).is_none());
            }
        }
    }

    #[test]
    fn test_reset_keeps_text_channel() {
        let mut state = state_with(&[1, 2]);
        state.dequeue_next();
        state.looping = true;
        state.text_channel = Some(ChannelId::new(7));
        state.reset();
        assert!(state.is_idle());
        assert!(!state.looping);
        assert!(state.playlist.is_none());
        assert_eq!(state.text_channel, Some(ChannelId::new(7)));
    }
}
