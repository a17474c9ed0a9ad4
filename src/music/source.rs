use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use super::spotify::CatalogBackend;
use super::{MusicError, Platform, PlaylistCursor, Requester, Track, TrackIds};

/// What a raw `/play` argument refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryKind {
    SpotifyTrack(String),
    SpotifyPlaylist(String),
    YoutubePlaylist(String),
    Url(String),
    Search(String),
}

fn spotify_id_after<'a>(input: &'a str, marker: &str) -> Option<&'a str> {
    let start = input.find(marker)? + marker.len();
    let id = input[start..]
        .split(['?', '&', '/', '#'])
        .next()
        .unwrap_or_default();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(id)
    } else {
        None
    }
}

/// Removes `/intl-xx` locale segments from open.spotify.com links.
fn strip_spotify_locale(input: &str) -> String {
    match input.find("/intl-") {
        Some(start) => {
            let rest = &input[start + 1..];
            match rest.find('/') {
                Some(end) => format!("{}{}", &input[..start], &rest[end..]),
                None => input[..start].to_string(),
            }
        }
        None => input.to_string(),
    }
}

pub fn classify(input: &str) -> Result<QueryKind, MusicError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MusicError::resolution("empty query"));
    }

    let is_url = input.starts_with("http://") || input.starts_with("https://");

    if input.starts_with("spotify:") || (is_url && input.contains("open.spotify.com")) {
        let cleaned = strip_spotify_locale(input);
        if let Some(id) = spotify_id_after(&cleaned, "playlist/")
            .or_else(|| spotify_id_after(&cleaned, "spotify:playlist:"))
        {
            return Ok(QueryKind::SpotifyPlaylist(id.to_string()));
        }
        if let Some(id) = spotify_id_after(&cleaned, "track/")
            .or_else(|| spotify_id_after(&cleaned, "spotify:track:"))
        {
            return Ok(QueryKind::SpotifyTrack(id.to_string()));
        }
        return Err(MusicError::resolution("unsupported Spotify link"));
    }

    if is_url {
        let is_youtube = input.contains("youtube.com") || input.contains("youtu.be");
        if is_youtube && input.contains("list=") && !input.contains("v=") {
            return Ok(QueryKind::YoutubePlaylist(input.to_string()));
        }
        return Ok(QueryKind::Url(input.to_string()));
    }

    Ok(QueryKind::Search(input.to_string()))
}

/// A playable stream as reported by the media backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub webpage_url: Option<String>,
    pub stream_url: String,
    pub duration: Option<f64>,
}

#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Extracts one stream from a URL or a `ytsearch1:` query.
    async fn extract(&self, target: &str) -> Result<MediaInfo, MusicError>;

    /// Extracts the first `limit` entries of a playlist URL.
    async fn extract_playlist(&self, url: &str, limit: usize)
        -> Result<Vec<MediaInfo>, MusicError>;
}

#[derive(Deserialize)]
struct YtDlpOutput {
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    url: Option<String>,
}

impl YtDlpOutput {
    fn into_media(self) -> Option<MediaInfo> {
        let stream_url = self.url?;
        Some(MediaInfo {
            title: self.title,
            webpage_url: self.webpage_url.or(self.original_url),
            stream_url,
            duration: self.duration,
        })
    }
}

/// [`MediaBackend`] that shells out to yt-dlp.
pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, MusicError> {
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MusicError::resolution(format!("yt-dlp unavailable: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::resolution(format!("yt-dlp error: {}", stderr.trim())));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaBackend for YtDlp {
    async fn extract(&self, target: &str) -> Result<MediaInfo, MusicError> {
        let stdout = self
            .run(&[
                "-j",
                "-f",
                "bestaudio/best",
                "--no-playlist",
                "--no-warnings",
                target,
            ])
            .await?;

        let info: YtDlpOutput = serde_json::from_slice(&stdout)?;
        info.into_media()
            .ok_or_else(|| MusicError::resolution("could not get stream URL"))
    }

    async fn extract_playlist(
        &self,
        url: &str,
        limit: usize,
    ) -> Result<Vec<MediaInfo>, MusicError> {
        let end = limit.to_string();
        let stdout = self
            .run(&[
                "-j",
                "-f",
                "bestaudio/best",
                "--yes-playlist",
                "--playlist-end",
                &end,
                "--ignore-errors",
                "--no-warnings",
                url,
            ])
            .await?;

        let entries = parse_json_lines(&stdout);
        if entries.is_empty() {
            return Err(MusicError::resolution("playlist is empty or could not be fetched"));
        }
        Ok(entries)
    }
}

/// One JSON document per line; unusable lines are skipped.
fn parse_json_lines(stdout: &[u8]) -> Vec<MediaInfo> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<YtDlpOutput>(line) {
            Ok(out) => out.into_media(),
            Err(e) => {
                debug!("skipping playlist entry: {e}");
                None
            }
        })
        .collect()
}

/// Result of resolving one user request.
#[derive(Debug)]
pub enum Resolution {
    Single(Track),
    Playlist {
        platform: Platform,
        tracks: Vec<Track>,
        cursor: Option<PlaylistCursor>,
    },
}

/// Turns user input into [`Track`]s using a media backend and, for Spotify
/// links, a catalog backend.
pub struct TrackResolver {
    media: Arc<dyn MediaBackend>,
    catalog: Option<Arc<dyn CatalogBackend>>,
    ids: TrackIds,
    page_size: usize,
    timeout: Duration,
}

impl TrackResolver {
    pub fn new(
        media: Arc<dyn MediaBackend>,
        catalog: Option<Arc<dyn CatalogBackend>>,
        ids: TrackIds,
        page_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            media,
            catalog,
            ids,
            page_size: page_size.max(1),
            timeout,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn catalog(&self) -> Result<&Arc<dyn CatalogBackend>, MusicError> {
        self.catalog
            .as_ref()
            .ok_or_else(|| MusicError::resolution("Spotify support is not configured"))
    }

    fn build(
        &self,
        info: MediaInfo,
        platform: Platform,
        display_url: Option<String>,
        fallback_title: &str,
        requester: &Requester,
    ) -> Track {
        Track {
            id: self.ids.next(),
            platform,
            title: info.title.unwrap_or_else(|| fallback_title.to_string()),
            display_url: display_url
                .or(info.webpage_url)
                .unwrap_or_else(|| "https://www.youtube.com".to_string()),
            stream_url: info.stream_url,
            duration_seconds: info.duration.map_or(0, |d| d.max(0.0) as u64),
            requester: requester.clone(),
        }
    }

    /// Bounds a backend call by the resolve timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, MusicError>>,
    ) -> Result<T, MusicError> {
        tokio::time::timeout(self.timeout, call).await?
    }

    pub async fn resolve(
        &self,
        input: &str,
        requester: &Requester,
    ) -> Result<Resolution, MusicError> {
        tokio::time::timeout(self.timeout, self.resolve_inner(input, requester)).await?
    }

    async fn resolve_inner(
        &self,
        input: &str,
        requester: &Requester,
    ) -> Result<Resolution, MusicError> {
        match classify(input)? {
            QueryKind::Search(text) => {
                let info = self.media.extract(&format!("ytsearch1:{text}")).await?;
                Ok(Resolution::Single(self.build(
                    info,
                    Platform::Youtube,
                    None,
                    "Song",
                    requester,
                )))
            }
            QueryKind::Url(url) => {
                let info = self.media.extract(&url).await?;
                Ok(Resolution::Single(self.build(
                    info,
                    Platform::Youtube,
                    Some(url),
                    "Song",
                    requester,
                )))
            }
            QueryKind::SpotifyTrack(id) => {
                let meta = self.catalog()?.track(&id).await?;
                let query = meta.search_query();
                let info = self.media.extract(&format!("ytsearch1:{query}")).await?;
                Ok(Resolution::Single(self.build(
                    info,
                    Platform::Spotify,
                    Some(input.trim().to_string()),
                    &meta.name,
                    requester,
                )))
            }
            QueryKind::YoutubePlaylist(url) => {
                let entries = self.media.extract_playlist(&url, self.page_size).await?;
                let tracks = entries
                    .into_iter()
                    .map(|info| self.build(info, Platform::Youtube, None, "Song", requester))
                    .collect();
                Ok(Resolution::Playlist {
                    platform: Platform::Youtube,
                    tracks,
                    cursor: None,
                })
            }
            QueryKind::SpotifyPlaylist(id) => {
                let total = self.catalog()?.playlist_total(&id).await?;
                let mut cursor = PlaylistCursor {
                    source_id: id,
                    total_count: total,
                    fetched_offset: 0,
                    requester: requester.clone(),
                };
                // Keep paging while whole pages fail to resolve.
                let mut tracks = Vec::new();
                while tracks.is_empty() && !cursor.is_exhausted() {
                    tracks = self.fetch_page(&mut cursor, self.page_size).await?;
                }
                if tracks.is_empty() {
                    return Err(MusicError::resolution("Spotify playlist is empty"));
                }
                Ok(Resolution::Playlist {
                    platform: Platform::Spotify,
                    tracks,
                    cursor: Some(cursor),
                })
            }
        }
    }

    /// Fetches `limit` entries at the cursor and resolves each one to a
    /// stream. The cursor only moves once the page itself was fetched;
    /// entries that fail to resolve are dropped. The page request itself is
    /// bounded by the resolve timeout.
    pub async fn fetch_page(
        &self,
        cursor: &mut PlaylistCursor,
        limit: usize,
    ) -> Result<Vec<Track>, MusicError> {
        let limit = limit.min(cursor.total_count.saturating_sub(cursor.fetched_offset));
        if limit == 0 {
            return Ok(Vec::new());
        }

        let catalog = self.catalog()?;
        let entries = self
            .bounded(catalog.playlist_page(&cursor.source_id, cursor.fetched_offset, limit))
            .await?;
        cursor.fetched_offset += limit;

        let mut tracks = Vec::with_capacity(entries.len());
        for entry in entries.into_iter().flatten() {
            let query = entry.search_query();
            match self
                .bounded(self.media.extract(&format!("ytsearch1:{query}")))
                .await
            {
                Ok(info) => {
                    let display_url = info.webpage_url.clone().unwrap_or(query);
                    tracks.push(self.build(
                        info,
                        Platform::Spotify,
                        Some(display_url),
                        &entry.name,
                        &cursor.requester,
                    ));
                }
                Err(e) => warn!(playlist = %cursor.source_id, "skipping '{query}': {e}"),
            }
        }
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::spotify::CatalogTrack;
    use crate::music::testing::{FakeCatalog, FakeMedia};

    fn requester() -> Requester {
        Requester {
            name: "tester".to_string(),
            avatar_url: String::new(),
        }
    }

    fn resolver(media: Arc<FakeMedia>, catalog: Option<Arc<FakeCatalog>>) -> TrackResolver {
        TrackResolver::new(
            media,
            catalog.map(|c| c as Arc<dyn CatalogBackend>),
            TrackIds::default(),
            5,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_classify_search_and_urls() {
        assert_eq!(
            classify("never gonna give you up").unwrap(),
            QueryKind::Search("never gonna give you up".to_string())
        );
        assert_eq!(
            classify("https://www.youtube.com/watch?v=abc").unwrap(),
            QueryKind::Url("https://www.youtube.com/watch?v=abc".to_string())
        );
        assert_eq!(
            classify("https://www.youtube.com/playlist?list=PL123").unwrap(),
            QueryKind::YoutubePlaylist("https://www.youtube.com/playlist?list=PL123".to_string())
        );
        assert!(classify("   ").is_err());
    }

    #[test]
    fn test_classify_spotify() {
        assert_eq!(
            classify("https://open.spotify.com/intl-tr/track/4uLU6hMCjMI75M1A2tKUQC?si=x").unwrap(),
            QueryKind::SpotifyTrack("4uLU6hMCjMI75M1A2tKUQC".to_string())
        );
        assert_eq!(
            classify("spotify:track:4uLU6hMCjMI75M1A2tKUQC").unwrap(),
            QueryKind::SpotifyTrack("4uLU6hMCjMI75M1A2tKUQC".to_string())
        );
        assert_eq!(
            classify("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M").unwrap(),
            QueryKind::SpotifyPlaylist("37i9dQZF1DXcBWIGoYBM5M".to_string())
        );
        assert_eq!(
            classify("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").unwrap(),
            QueryKind::SpotifyPlaylist("37i9dQZF1DXcBWIGoYBM5M".to_string())
        );
    }

    #[test]
    fn test_classify_unsupported_spotify_link() {
        let err = classify("https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3").unwrap_err();
        assert!(matches!(err, MusicError::Resolution(_)));
    }

    #[test]
    fn test_parse_json_lines_skips_garbage() {
        let stdout = br#"{"title":"A","url":"https://a","duration":10}
not json
{"title":"B"}
{"title":"C","url":"https://c","webpage_url":"https://yt/c"}
"#;
        let entries = parse_json_lines(stdout);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].webpage_url.as_deref(), Some("https://yt/c"));
    }

    #[tokio::test]
    async fn test_resolve_search_uses_ytsearch() {
        let media = Arc::new(FakeMedia::default());
        let resolver = resolver(media.clone(), None);

        let resolution = resolver.resolve("lofi beats", &requester()).await.unwrap();
        let Resolution::Single(track) = resolution else {
            panic!("expected a single track");
        };
        assert_eq!(track.platform, Platform::Youtube);
        assert_eq!(track.requester.name, "tester");
        assert_eq!(media.targets(), vec!["ytsearch1:lofi beats".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_spotify_track_searches_title_and_artist() {
        let media = Arc::new(FakeMedia::default());
        let catalog = Arc::new(FakeCatalog::with_tracks(vec![CatalogTrack {
            name: "Blue".to_string(),
            artist: "Eiffel 65".to_string(),
        }]));
        let resolver = resolver(media.clone(), Some(catalog));

        let resolution = resolver
            .resolve("spotify:track:abc123", &requester())
            .await
            .unwrap();
        let Resolution::Single(track) = resolution else {
            panic!("expected a single track");
        };
        assert_eq!(track.platform, Platform::Spotify);
        assert_eq!(track.display_url, "spotify:track:abc123");
        assert_eq!(media.targets(), vec!["ytsearch1:Blue Eiffel 65".to_string()]);
    }

    #[tokio::test]
    async fn test_spotify_without_credentials_fails() {
        let resolver = resolver(Arc::new(FakeMedia::default()), None);
        let err = resolver
            .resolve("spotify:track:abc123", &requester())
            .await
            .unwrap_err();
        assert!(matches!(err, MusicError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_spotify_playlist_first_page_and_cursor() {
        let media = Arc::new(FakeMedia::default());
        let catalog = Arc::new(FakeCatalog::playlist(12));
        let resolver = resolver(media, Some(catalog.clone()));

        let resolution = resolver
            .resolve("https://open.spotify.com/playlist/pl1", &requester())
            .await
            .unwrap();
        let Resolution::Playlist {
            platform,
            tracks,
            cursor,
        } = resolution
        else {
            panic!("expected a playlist");
        };
        let cursor = cursor.unwrap();
        assert_eq!(platform, Platform::Spotify);
        assert_eq!(tracks.len(), 5);
        assert_eq!(cursor.total_count, 12);
        assert_eq!(cursor.fetched_offset, 5);
        assert_eq!(catalog.page_requests(), vec![(0, 5)]);
    }

    #[tokio::test]
    async fn test_failed_entries_are_skipped() {
        let media = Arc::new(FakeMedia::failing_on("Track 2"));
        let catalog = Arc::new(FakeCatalog::playlist(3));
        let resolver = resolver(media, Some(catalog));

        let mut cursor = PlaylistCursor {
            source_id: "pl".to_string(),
            total_count: 3,
            fetched_offset: 0,
            requester: requester(),
        };
        let tracks = resolver.fetch_page(&mut cursor, 5).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(cursor.fetched_offset, 3);
    }

    #[tokio::test]
    async fn test_failed_first_page_moves_to_the_next() {
        let media = Arc::new(FakeMedia::failing_on("Track 1 "));
        let catalog = Arc::new(FakeCatalog::playlist(12));
        let resolver = TrackResolver::new(
            media,
            Some(catalog.clone() as Arc<dyn CatalogBackend>),
            TrackIds::default(),
            1,
            Duration::from_secs(5),
        );

        let resolution = resolver
            .resolve("https://open.spotify.com/playlist/pl1", &requester())
            .await
            .unwrap();
        let Resolution::Playlist { tracks, cursor, .. } = resolution else {
            panic!("expected a playlist");
        };
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Track 2 Artist 2");
        assert_eq!(cursor.unwrap().fetched_offset, 2);
        assert_eq!(catalog.page_requests(), vec![(0, 1), (1, 1)]);
    }

    #[tokio::test]
    async fn test_playlist_where_nothing_resolves_is_an_error() {
        let media = Arc::new(FakeMedia::failing_on("Track"));
        let catalog = Arc::new(FakeCatalog::playlist(7));
        let resolver = resolver(media, Some(catalog.clone()));

        let err = resolver
            .resolve("https://open.spotify.com/playlist/pl1", &requester())
            .await
            .unwrap_err();
        assert!(matches!(err, MusicError::Resolution(_)));
        assert_eq!(catalog.page_requests(), vec![(0, 5), (5, 2)]);
    }

    #[tokio::test]
    async fn test_resolve_youtube_playlist_has_no_cursor() {
        let media = Arc::new(FakeMedia::default());
        let resolver = resolver(media.clone(), None);
        let url = "https://www.youtube.com/playlist?list=PL123";

        let resolution = resolver.resolve(url, &requester()).await.unwrap();
        let Resolution::Playlist {
            platform,
            tracks,
            cursor,
        } = resolution
        else {
            panic!("expected a playlist");
        };
        assert_eq!(platform, Platform::Youtube);
        assert_eq!(tracks.len(), 5);
        assert_eq!(tracks[0].title, "Entry 1");
        assert!(cursor.is_none());
        assert_eq!(media.targets(), vec![url.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_times_out() {
        let resolver = resolver(Arc::new(FakeMedia::stalled()), None);

        let err = resolver.resolve("lofi beats", &requester()).await.unwrap_err();
        assert!(matches!(err, MusicError::Resolution(ref msg) if msg == "timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_page_request_times_out() {
        let catalog = Arc::new(FakeCatalog::playlist(12));
        catalog.stall_pages_after(0);
        let resolver = resolver(Arc::new(FakeMedia::default()), Some(catalog));
        let mut cursor = PlaylistCursor {
            source_id: "pl".to_string(),
            total_count: 12,
            fetched_offset: 5,
            requester: requester(),
        };

        let err = resolver.fetch_page(&mut cursor, 5).await.unwrap_err();
        assert!(matches!(err, MusicError::Resolution(_)));
        assert_eq!(cursor.fetched_offset, 5);
    }
}
