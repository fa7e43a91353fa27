//!
//! src/testing.rs  Andrew Belles  Sept 15th, 2025
//!
//! In-memory catalog for unit tests. Records every call in order
//!

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::SyncError;
use crate::fetch::CatalogApi;
use crate::types::{
    ArtistId, CatalogArtist, CatalogTrack, Collection, NewCollection, Page, UserProfile
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search(String),
    TopTracks(String, String),
    CurrentUser,
    Playlists(u32, u32),
    Create(String, NewCollection),
    Add(String, Vec<String>),
    Items(String, u32, u32),
    Remove(String, Vec<String>),
}

pub fn track(id: &str, name: &str, album: &str) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        name: name.to_string(),
        album: album.to_string(),
        uri: format!("spotify:track:{id}"),
    }
}

pub fn collection(id: &str, owner: &str, collaborative: bool) -> Collection {
    Collection {
        id: id.to_string(),
        name: format!("playlist {id}"),
        owner_id: owner.to_string(),
        collaborative,
        public: Some(false),
        tracks_total: 0,
    }
}

fn profile(id: &str, country: Option<&str>) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        display_name: Some(id.to_string()),
        country: country.map(str::to_string),
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    artists: HashMap<String, String>,
    tracks: HashMap<String, Vec<CatalogTrack>>,
    failing_search: HashSet<String>,
    failing_tracks: HashSet<String>,
    auth_expired: bool,
    user: Mutex<Option<UserProfile>>,
    epoch: Mutex<u64>,
    playlists: Mutex<Vec<Collection>>,
    items: Mutex<HashMap<String, Vec<String>>>,
    fail_add_on: Option<usize>,
    adds: Mutex<usize>,
    fail_remove_on: Option<usize>,
    removes: Mutex<usize>,
    calls: Mutex<Vec<Call>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artist(mut self, name: &str, id: &str, tracks: Vec<CatalogTrack>) -> Self {
        self.artists.insert(name.to_string(), id.to_string());
        self.tracks.insert(id.to_string(), tracks);
        self
    }

    pub fn with_failing_search(mut self, name: &str) -> Self {
        self.failing_search.insert(name.to_string());
        self
    }

    pub fn with_failing_tracks(mut self, artist_id: &str) -> Self {
        self.failing_tracks.insert(artist_id.to_string());
        self
    }

    pub fn with_expired_auth(mut self) -> Self {
        self.auth_expired = true;
        self
    }

    pub fn with_user(self, id: &str, country: Option<&str>) -> Self {
        *self.user.lock().unwrap() = Some(profile(id, country));
        self
    }

    /// Re-authorization as a different user: new profile, new session epoch
    pub fn switch_user(&self, id: &str) {
        *self.user.lock().unwrap() = Some(profile(id, None));
        *self.epoch.lock().unwrap() += 1;
    }

    pub fn with_playlists(self, playlists: Vec<Collection>) -> Self {
        *self.playlists.lock().unwrap() = playlists;
        self
    }

    pub fn with_items(self, playlist_id: &str, uris: &[&str]) -> Self {
        self.items.lock().unwrap().insert(
            playlist_id.to_string(),
            uris.iter().map(|u| u.to_string()).collect()
        );
        self
    }

    /// The nth (1-based) add_tracks call fails with a server error
    pub fn failing_add_on(mut self, nth: usize) -> Self {
        self.fail_add_on = Some(nth);
        self
    }

    /// The nth (1-based) remove_tracks call fails with a server error
    pub fn failing_remove_on(mut self, nth: usize) -> Self {
        self.fail_remove_on = Some(nth);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn items(&self, playlist_id: &str) -> Vec<String> {
        self.items.lock().unwrap().get(playlist_id).cloned().unwrap_or_default()
    }

    pub fn add_sizes(&self) -> Vec<usize> {
        self.calls().into_iter()
            .filter_map(|c| match c {
                Call::Add(_, uris) => Some(uris.len()),
                _ => None
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(call);
        if self.auth_expired {
            return Err(SyncError::AuthExpired);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn search_artists(&self, query: &str, limit: u32) ->
        Result<Vec<CatalogArtist>, SyncError> {
        self.record(Call::Search(query.to_string()))?;
        if self.failing_search.contains(query) {
            return Err(SyncError::unavailable(Some(503), "search down"));
        }
        Ok(self.artists.get(query)
            .map(|id| CatalogArtist { id: ArtistId(id.clone()), name: query.to_string() })
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn artist_top_tracks(&self, artist: &ArtistId, market: &str) ->
        Result<Vec<CatalogTrack>, SyncError> {
        self.record(Call::TopTracks(artist.0.clone(), market.to_string()))?;
        if self.failing_tracks.contains(&artist.0) {
            return Err(SyncError::unavailable(Some(500), "tracks down"));
        }
        Ok(self.tracks.get(&artist.0).cloned().unwrap_or_default())
    }

    async fn current_user(&self) -> Result<UserProfile, SyncError> {
        self.record(Call::CurrentUser)?;
        self.user.lock().unwrap().clone()
            .ok_or_else(|| SyncError::unavailable(Some(500), "profile down"))
    }

    async fn current_user_playlists(&self, limit: u32, offset: u32) ->
        Result<Page<Collection>, SyncError> {
        self.record(Call::Playlists(limit, offset))?;
        let all = self.playlists.lock().unwrap().clone();
        let start = (offset as usize).min(all.len());
        let end = (start + limit as usize).min(all.len());
        let next_offset = (end < all.len()).then_some(end as u32);
        Ok(Page { items: all[start..end].to_vec(), next_offset })
    }

    async fn create_playlist(&self, user_id: &str, request: &NewCollection) ->
        Result<Collection, SyncError> {
        self.record(Call::Create(user_id.to_string(), request.clone()))?;
        let mut playlists = self.playlists.lock().unwrap();
        let created = Collection {
            id: format!("created-{}", playlists.len() + 1),
            name: request.name.clone(),
            owner_id: user_id.to_string(),
            collaborative: false,
            public: Some(request.public),
            tracks_total: 0,
        };
        playlists.push(created.clone());
        Ok(created)
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) ->
        Result<(), SyncError> {
        self.record(Call::Add(playlist_id.to_string(), uris.to_vec()))?;
        let nth = {
            let mut adds = self.adds.lock().unwrap();
            *adds += 1;
            *adds
        };
        if self.fail_add_on == Some(nth) {
            return Err(SyncError::unavailable(Some(500), "write rejected"));
        }
        self.items.lock().unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .extend(uris.iter().cloned());
        Ok(())
    }

    async fn playlist_track_uris(&self, playlist_id: &str, limit: u32, offset: u32) ->
        Result<Page<String>, SyncError> {
        self.record(Call::Items(playlist_id.to_string(), limit, offset))?;
        let all = self.items(playlist_id);
        let start = (offset as usize).min(all.len());
        let end = (start + limit as usize).min(all.len());
        let next_offset = (end < all.len()).then_some(end as u32);
        Ok(Page { items: all[start..end].to_vec(), next_offset })
    }

    async fn remove_tracks(&self, playlist_id: &str, uris: &[String]) ->
        Result<(), SyncError> {
        self.record(Call::Remove(playlist_id.to_string(), uris.to_vec()))?;
        let nth = {
            let mut removes = self.removes.lock().unwrap();
            *removes += 1;
            *removes
        };
        if self.fail_remove_on == Some(nth) {
            return Err(SyncError::unavailable(Some(500), "remove rejected"));
        }
        if let Some(items) = self.items.lock().unwrap().get_mut(playlist_id) {
            items.retain(|u| !uris.contains(u));
        }
        Ok(())
    }

    fn session(&self) -> Option<u64> {
        if self.auth_expired {
            None
        } else {
            Some(*self.epoch.lock().unwrap())
        }
    }
}
