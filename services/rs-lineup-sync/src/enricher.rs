//!
//! src/enricher.rs  Andrew Belles  Sept 14th, 2025
//!
//! Top track lookup for a resolved artist, capped and market scoped
//!

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::TRACKS_PER_ARTIST;
use crate::errors::SyncError;
use crate::fetch::CatalogApi;
use crate::types::{ArtistId, TrackRef};

pub struct TrackEnricher<C: ?Sized> {
    catalog: Arc<C>,
    limit: usize,
    fallback_market: String,
}

impl<C: CatalogApi + ?Sized> TrackEnricher<C> {
    pub fn new(catalog: Arc<C>, limit: usize, fallback_market: impl Into<String>) -> Self {
        Self {
            catalog,
            limit: limit.clamp(1, TRACKS_PER_ARTIST),
            fallback_market: fallback_market.into(),
        }
    }

    /// Region of the authenticated user, or the fallback. Never fails.
    pub async fn market_hint(&self) -> String {
        match self.catalog.current_user().await {
            Ok(user) => match user.country.filter(|c| !c.trim().is_empty()) {
                Some(country) => country,
                None => self.fallback_market.clone()
            },
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback_market, "enricher.market.fallback");
                self.fallback_market.clone()
            }
        }
    }

    /// At most `limit` tracks in the catalog's own order
    pub async fn try_top_tracks(&self, artist: &ArtistId, market: &str) ->
        Result<Vec<TrackRef>, SyncError> {
        let tracks = self.catalog.artist_top_tracks(artist, market).await?;
        debug!(artist = %artist, market, found = tracks.len(), "enricher.tracks");
        Ok(tracks.into_iter()
            .take(self.limit)
            .map(TrackRef::from)
            .collect())
    }

    /// Failure degrades to an empty list, indistinguishable from an artist
    /// without tracks. Use `try_top_tracks` to tell them apart.
    pub async fn top_tracks(&self, artist: &ArtistId, market: &str) -> Vec<TrackRef> {
        match self.try_top_tracks(artist, market).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(artist = %artist, error = %e, "enricher.failed");
                Vec::new()
            }
        }
    }
}
