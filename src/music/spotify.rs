use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::MusicError;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";
// Refresh a little before Spotify says the token dies.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogTrack {
    pub name: String,
    pub artist: String,
}

impl CatalogTrack {
    pub fn search_query(&self) -> String {
        format!("{} {}", self.name, self.artist).trim().to_string()
    }
}

/// Track and playlist metadata lookups.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn track(&self, id: &str) -> Result<CatalogTrack, MusicError>;

    async fn playlist_total(&self, id: &str) -> Result<usize, MusicError>;

    /// `None` entries are playlist slots without a playable track
    /// (removed or local files).
    async fn playlist_page(
        &self,
        id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Option<CatalogTrack>>, MusicError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Deserialize)]
struct ApiTrack {
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

impl From<ApiTrack> for CatalogTrack {
    fn from(t: ApiTrack) -> Self {
        Self {
            artist: t.artists.into_iter().next().map(|a| a.name).unwrap_or_default(),
            name: t.name,
        }
    }
}

#[derive(Deserialize)]
struct PlaylistMeta {
    tracks: PlaylistTotal,
}

#[derive(Deserialize)]
struct PlaylistTotal {
    total: usize,
}

#[derive(Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

/// Spotify Web API client using the client-credentials flow.
pub struct SpotifyClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<(String, Instant)>>,
}

impl SpotifyClient {
    pub fn new(http: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            token: RwLock::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, MusicError> {
        {
            let token = self.token.read().await;
            if let Some((value, expires_at)) = token.as_ref() {
                if Instant::now() < *expires_at {
                    return Ok(value.clone());
                }
            }
        }

        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_SLACK);
        let mut token = self.token.write().await;
        *token = Some((response.access_token.clone(), Instant::now() + lifetime));
        Ok(response.access_token)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MusicError> {
        let token = self.access_token().await?;
        let value = self
            .http
            .get(format!("{API_URL}{path}"))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl CatalogBackend for SpotifyClient {
    async fn track(&self, id: &str) -> Result<CatalogTrack, MusicError> {
        let track: ApiTrack = self
            .get(&format!("/tracks/{id}"), &[])
            .await
            .map_err(|e| MusicError::resolution(format!("Could not fetch Spotify song: {e}")))?;
        Ok(track.into())
    }

    async fn playlist_total(&self, id: &str) -> Result<usize, MusicError> {
        let meta: PlaylistMeta = self
            .get(
                &format!("/playlists/{id}"),
                &[("fields", "tracks.total".to_string())],
            )
            .await
            .map_err(|e| {
                MusicError::resolution(format!("Could not fetch Spotify playlist: {e}"))
            })?;
        Ok(meta.tracks.total)
    }

    async fn playlist_page(
        &self,
        id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Option<CatalogTrack>>, MusicError> {
        let page: PlaylistPage = self
            .get(
                &format!("/playlists/{id}/tracks"),
                &[
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                    ("fields", "items(track(name,artists(name)))".to_string()),
                ],
            )
            .await?;
        Ok(page
            .items
            .into_iter()
            .map(|item| item.track.map(CatalogTrack::from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_joins_title_and_artist() {
        let track = CatalogTrack {
            name: "Blue".to_string(),
            artist: "Eiffel 65".to_string(),
        };
        assert_eq!(track.search_query(), "Blue Eiffel 65");

        let no_artist = CatalogTrack {
            name: "Untitled".to_string(),
            artist: String::new(),
        };
        assert_eq!(no_artist.search_query(), "Untitled");
    }

    #[test]
    fn test_playlist_page_tolerates_missing_tracks() {
        let body = r#"{"items":[{"track":{"name":"A","artists":[{"name":"X"},{"name":"Y"}]}},{"track":null}]}"#;
        let page: PlaylistPage = serde_json::from_str(body).unwrap();
        let tracks: Vec<Option<CatalogTrack>> = page
            .items
            .into_iter()
            .map(|item| item.track.map(CatalogTrack::from))
            .collect();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].as_ref().unwrap().artist, "X");
        assert!(tracks[1].is_none());
    }

    #[test]
    fn test_playlist_meta_total() {
        let meta: PlaylistMeta = serde_json::from_str(r#"{"tracks":{"total":42}}"#).unwrap();
        assert_eq!(meta.tracks.total, 42);
    }
}
