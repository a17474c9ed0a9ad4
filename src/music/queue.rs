use std::collections::HashMap;
use std::sync::Arc;

use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{GuildPlaybackState, MusicError, Track, TrackId};

type Slot = Arc<Mutex<GuildPlaybackState>>;

/// Registry owning one [`GuildPlaybackState`] per guild, each behind its own
/// mutex. Holding the guard returned by [`QueueStore::lock`] serializes every
/// transition for that guild.
#[derive(Clone, Default)]
pub struct QueueStore {
    guilds: Arc<RwLock<HashMap<GuildId, Slot>>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, guild_id: GuildId) -> Slot {
        {
            let guilds = self.guilds.read().await;
            if let Some(slot) = guilds.get(&guild_id) {
                return slot.clone();
            }
        }

        let mut guilds = self.guilds.write().await;
        guilds.entry(guild_id).or_default().clone()
    }

    pub async fn lock(&self, guild_id: GuildId) -> OwnedMutexGuard<GuildPlaybackState> {
        self.slot(guild_id).await.lock_owned().await
    }

    pub async fn enqueue(&self, guild_id: GuildId, track: Track) -> usize {
        self.lock(guild_id).await.enqueue(track)
    }

    pub async fn dequeue_next(&self, guild_id: GuildId) -> Option<Track> {
        self.lock(guild_id).await.dequeue_next()
    }

    pub async fn set_loop(&self, guild_id: GuildId, looping: bool) {
        self.lock(guild_id).await.looping = looping;
    }

    pub async fn clear(&self, guild_id: GuildId) {
        self.lock(guild_id).await.reset();
    }

    pub async fn peek(&self, guild_id: GuildId, n: usize) -> Vec<Track> {
        self.lock(guild_id).await.peek(n)
    }

    pub async fn jump_to(&self, guild_id: GuildId, id: TrackId) -> Result<(), MusicError> {
        self.lock(guild_id).await.jump_to(id)
    }

    pub async fn current(&self, guild_id: GuildId) -> Option<Track> {
        self.lock(guild_id).await.current.clone()
    }

    pub async fn is_looping(&self, guild_id: GuildId) -> bool {
        self.lock(guild_id).await.looping
    }

    /// Current track plus a copy of the whole queue.
    pub async fn snapshot(&self, guild_id: GuildId) -> (Option<Track>, Vec<Track>) {
        let state = self.lock(guild_id).await;
        (state.current.clone(), state.queue.iter().cloned().collect())
    }

    pub async fn bind_text_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.lock(guild_id).await.text_channel = Some(channel_id);
    }

    pub async fn text_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.lock(guild_id).await.text_channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::testing::track;

    #[tokio::test]
    async fn test_enqueue_reports_position() {
        let store = QueueStore::new();
        let gid = GuildId::new(1);
        assert_eq!(store.enqueue(gid, track(1)).await, 1);
        assert_eq!(store.enqueue(gid, track(2)).await, 2);
        assert_eq!(store.peek(gid, 5).await.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let store = QueueStore::new();
        let gid = GuildId::new(2);
        store.enqueue(gid, track(1)).await;
        store.enqueue(gid, track(2)).await;
        store.dequeue_next(gid).await;
        store.set_loop(gid, true).await;

        store.clear(gid).await;

        let (current, queue) = store.snapshot(gid).await;
        assert!(current.is_none());
        assert!(queue.is_empty());
        assert!(!store.is_looping(gid).await);
    }

    #[tokio::test]
    async fn test_guilds_are_isolated() {
        let store = QueueStore::new();
        let g1 = GuildId::new(100);
        let g2 = GuildId::new(200);
        store.enqueue(g1, track(1)).await;
        store.enqueue(g2, track(2)).await;

        store.clear(g1).await;

        assert!(store.peek(g1, 5).await.is_empty());
        assert_eq!(store.peek(g2, 5).await[0].id, 2);
    }

    #[tokio::test]
    async fn test_concurrent_enqueues_keep_every_track() {
        let store = QueueStore::new();
        let gid = GuildId::new(3);

        let mut handles = Vec::new();
        for id in 1..=20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.enqueue(gid, track(id)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut ids: Vec<_> = store.peek(gid, 50).await.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_jump_to_through_store() {
        let store = QueueStore::new();
        let gid = GuildId::new(4);
        for id in 1..=3 {
            store.enqueue(gid, track(id)).await;
        }
        store.jump_to(gid, 3).await.unwrap();
        assert_eq!(store.peek(gid, 5).await[0].id, 3);
        assert!(store.jump_to(gid, 1).await.is_err());
    }
}
