use tracing::{debug, warn};

use super::source::TrackResolver;
use super::{GuildPlaybackState, PlaylistCursor};

/// Keeps an active playlist topped up to the low-water mark.
#[derive(Clone, Copy, Debug)]
pub struct Paginator {
    low_water: usize,
}

impl Paginator {
    pub fn new(low_water: usize) -> Self {
        Self { low_water }
    }

    /// How many entries to fetch, or `None` when no fetch should happen.
    pub fn plan(&self, cursor: &PlaylistCursor, queued: usize) -> Option<usize> {
        if cursor.is_exhausted() || queued >= self.low_water {
            return None;
        }
        let remaining = cursor.total_count - cursor.fetched_offset;
        Some((self.low_water - queued).min(remaining))
    }

    /// Extends the queue from the guild's playlist. Returns how many tracks
    /// were added; failures only cost the entries they affected. While the
    /// queue stays empty, further pages are fetched until one resolves or
    /// the playlist runs out.
    pub async fn refill(&self, resolver: &TrackResolver, state: &mut GuildPlaybackState) -> usize {
        let mut added = 0;

        loop {
            let queued = state.queue.len();
            let Some(cursor) = state.playlist.as_mut() else {
                return added;
            };
            let Some(limit) = self.plan(cursor, queued) else {
                debug!(playlist = %cursor.source_id, "no refill needed");
                return added;
            };

            match resolver.fetch_page(cursor, limit).await {
                Ok(tracks) => {
                    added += tracks.len();
                    state.queue.extend(tracks);
                }
                Err(e) => {
                    warn!(playlist = %cursor.source_id, "playlist page fetch failed: {e}");
                    return added;
                }
            }

            if !state.queue.is_empty() {
                return added;
            }
        }
    }
}
