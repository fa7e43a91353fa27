//!
//! src/fetch.rs  Andrew Belles  Sept 10th, 2025
//!
//! Defines methods for hitting catalog endpoints and mapping the responses
//! into domain records. Every response passes through one status check so
//! an authorization failure always invalidates the held token, no matter
//! which component issued the call
//!

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header, redirect};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use url::Url;

use crate::config::{CatalogConfig, HttpConfig};
use crate::errors::SyncError;
use crate::token::TokenGuard;
use crate::types::{
    ArtistId, CatalogArtist, CatalogTrack, Collection, NewCollection, Page, UserProfile
};

/// Operations the sync core needs from the catalog service
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Artist search, ranked by the service
    async fn search_artists(&self, query: &str, limit: u32) ->
        Result<Vec<CatalogArtist>, SyncError>;

    /// Top tracks of an artist in the service's popularity order
    async fn artist_top_tracks(&self, artist: &ArtistId, market: &str) ->
        Result<Vec<CatalogTrack>, SyncError>;

    async fn current_user(&self) -> Result<UserProfile, SyncError>;

    async fn current_user_playlists(&self, limit: u32, offset: u32) ->
        Result<Page<Collection>, SyncError>;

    async fn create_playlist(&self, user_id: &str, request: &NewCollection) ->
        Result<Collection, SyncError>;

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) ->
        Result<(), SyncError>;

    async fn playlist_track_uris(&self, playlist_id: &str, limit: u32, offset: u32) ->
        Result<Page<String>, SyncError>;

    async fn remove_tracks(&self, playlist_id: &str, uris: &[String]) ->
        Result<(), SyncError>;

    /// Epoch of the credential calls would go out with, `None` when there
    /// is none and every call would fail with `AuthExpired`
    fn session(&self) -> Option<u64> {
        Some(0)
    }
}

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, SyncError> {
    client_helper(http)
        .default_headers(headers)
        .build()
        .map_err(|e| SyncError::Http(format!("build client: {e}")))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, SyncError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_with_headers(http, h)
}

/// Client for fetching html pages, identifies as a regular browser
pub fn page_client(http: &HttpConfig, user_agent: &str) -> Result<Client, SyncError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("text/html,*/*"));
    h.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(user_agent)
            .map_err(|e| SyncError::Config(format!("invalid user agent {e}")))?
    );
    client_with_headers(http, h)
}

///
/// Wire shapes of the catalog's JSON responses
///

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    artists: Paging<ArtistObject>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    tracks: Vec<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: Option<String>,
    name: String,
    uri: String,
    album: AlbumObject,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserObject {
    id: String,
    display_name: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnerObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TracksTotal {
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    owner: OwnerObject,
    #[serde(default)]
    collaborative: bool,
    public: Option<bool>,
    tracks: Option<TracksTotal>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ItemTrack>,
}

#[derive(Debug, Deserialize)]
struct ItemTrack {
    uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatePlaylistBody<'a> {
    name: &'a str,
    description: &'a str,
    public: bool,
}

#[derive(Debug, Serialize)]
struct AddTracksBody<'a> {
    uris: &'a [String],
}

#[derive(Debug, Serialize)]
struct RemoveTracksBody {
    tracks: Vec<UriObject>,
}

#[derive(Debug, Serialize)]
struct UriObject {
    uri: String,
}

impl From<PlaylistObject> for Collection {
    fn from(p: PlaylistObject) -> Self {
        Collection {
            id: p.id,
            name: p.name,
            owner_id: p.owner.id,
            collaborative: p.collaborative,
            public: p.public,
            tracks_total: p.tracks.map(|t| t.total).unwrap_or(0),
        }
    }
}

/// Offset-paging keeps going while the service reports a next page
fn next_offset(next: &Option<String>, offset: u32, returned: usize) -> Option<u32> {
    match next {
        Some(_) if returned > 0 => Some(offset + returned as u32),
        _ => None
    }
}

///
/// Bearer-authenticated Spotify Web API client
///
#[derive(Clone, Debug)]
pub struct CatalogClient {
    pub http: Client,
    pub cfg: CatalogConfig,
    guard: Arc<TokenGuard>,
}

impl CatalogClient {
    pub fn new(http_config: &HttpConfig, cfg: &CatalogConfig, guard: Arc<TokenGuard>) ->
        Result<Self, SyncError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone(),
            guard
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.cfg.api_base.join(path)
            .map_err(|e| SyncError::Config(format!("bad endpoint {path}: {e}")))
    }

    /// Maps a non-success status into the taxonomy; 401 invalidates the token
    pub(crate) fn status_error(&self, status: StatusCode, body: &str) -> SyncError {
        if status == StatusCode::UNAUTHORIZED {
            self.guard.invalidate();
            return SyncError::AuthExpired;
        }
        let reason = status.canonical_reason().unwrap_or("unknown");
        warn!(status = status.as_u16(), body = %body, "catalog.error");
        SyncError::unavailable(
            Some(status.as_u16()),
            format!("status {} {reason}", status.as_u16())
        )
    }

    /// Attaches the bearer, sends, checks the status. No retry.
    async fn send(&self, request: reqwest::RequestBuilder) ->
        Result<reqwest::Response, SyncError> {
        let bearer = self.guard.bearer()?;
        let response = request
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| SyncError::unavailable(None, format!("transport: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.status_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) ->
        Result<T, SyncError> {
        let response = self.send(request).await?;
        response.json::<T>()
            .await
            .map_err(|e| SyncError::Parse(format!("catalog response: {e}")))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    /// GET /v1/search?q=artist:{name}&type=artist&limit=
    async fn search_artists(&self, query: &str, limit: u32) ->
        Result<Vec<CatalogArtist>, SyncError> {
        let url = self.endpoint("search")?;
        // exact name, no normalization of case or diacritics
        let q = format!("artist:{query}");
        let limit = limit.to_string();
        let request = self.http.get(url).query(&[
            ("q", q.as_str()),
            ("type", "artist"),
            ("limit", limit.as_str())
        ]);
        let response: SearchResponse = self.send_json(request).await?;
        Ok(response.artists.items.into_iter()
            .map(|a| CatalogArtist { id: ArtistId(a.id), name: a.name })
            .collect())
    }

    /// GET /v1/artists/{id}/top-tracks?market=
    async fn artist_top_tracks(&self, artist: &ArtistId, market: &str) ->
        Result<Vec<CatalogTrack>, SyncError> {
        let url = self.endpoint(&format!("artists/{}/top-tracks", artist.0))?;
        let request = self.http.get(url).query(&[("market", market)]);
        let response: TopTracksResponse = self.send_json(request).await?;
        debug!(artist = %artist, found = response.tracks.len(), "catalog.top_tracks");
        Ok(response.tracks.into_iter()
            .map(|t| CatalogTrack {
                id: t.id.unwrap_or_default(),
                name: t.name,
                album: t.album.name,
                uri: t.uri,
            })
            .collect())
    }

    /// GET /v1/me
    async fn current_user(&self) -> Result<UserProfile, SyncError> {
        let url = self.endpoint("me")?;
        let user: UserObject = self.send_json(self.http.get(url)).await?;
        Ok(UserProfile { id: user.id, display_name: user.display_name, country: user.country })
    }

    /// GET /v1/me/playlists?limit=&offset=
    async fn current_user_playlists(&self, limit: u32, offset: u32) ->
        Result<Page<Collection>, SyncError> {
        let url = self.endpoint("me/playlists")?;
        let request = self.http.get(url).query(&[
            ("limit", limit.to_string()),
            ("offset", offset.to_string())
        ]);
        let page: Paging<PlaylistObject> = self.send_json(request).await?;
        let next_offset = next_offset(&page.next, offset, page.items.len());
        Ok(Page {
            items: page.items.into_iter().map(Collection::from).collect(),
            next_offset
        })
    }

    /// POST /v1/users/{user_id}/playlists
    async fn create_playlist(&self, user_id: &str, request: &NewCollection) ->
        Result<Collection, SyncError> {
        let url = self.endpoint(&format!("users/{user_id}/playlists"))?;
        let body = CreatePlaylistBody {
            name: &request.name,
            description: &request.description,
            public: request.public
        };
        let created: PlaylistObject = self.send_json(self.http.post(url).json(&body)).await?;
        Ok(Collection::from(created))
    }

    /// POST /v1/playlists/{id}/tracks
    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) ->
        Result<(), SyncError> {
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        self.send(self.http.post(url).json(&AddTracksBody { uris })).await?;
        Ok(())
    }

    /// GET /v1/playlists/{id}/tracks?fields=items(track(uri)),next&limit=&offset=
    async fn playlist_track_uris(&self, playlist_id: &str, limit: u32, offset: u32) ->
        Result<Page<String>, SyncError> {
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        let request = self.http.get(url).query(&[
            ("fields", "items(track(uri)),next".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string())
        ]);
        let page: Paging<PlaylistItem> = self.send_json(request).await?;
        let next_offset = next_offset(&page.next, offset, page.items.len());
        Ok(Page {
            items: page.items.into_iter()
                .filter_map(|item| item.track.and_then(|t| t.uri))
                .collect(),
            next_offset
        })
    }

    /// DELETE /v1/playlists/{id}/tracks
    async fn remove_tracks(&self, playlist_id: &str, uris: &[String]) ->
        Result<(), SyncError> {
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        let body = RemoveTracksBody {
            tracks: uris.iter().map(|uri| UriObject { uri: uri.clone() }).collect()
        };
        self.send(self.http.delete(url).json(&body)).await?;
        Ok(())
    }

    fn session(&self) -> Option<u64> {
        self.guard.session()
    }
}
