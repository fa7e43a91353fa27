//!
//! src/resolver.rs  Andrew Belles  Sept 14th, 2025
//!
//! Name to artist lookup against the catalog search endpoint
//!

use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::SyncError;
use crate::fetch::CatalogApi;
use crate::types::{ArtistMatch, CandidateName};

/// Maps a candidate name to the catalog's top-ranked artist, if any.
///
/// The query is the exact scraped string, no case folding or diacritic
/// stripping, and only the first result counts.
pub struct IdentityResolver<C: ?Sized> {
    catalog: Arc<C>,
}

impl<C: CatalogApi + ?Sized> IdentityResolver<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self { catalog }
    }

    /// `Ok(None)` when the catalog answered but had no match. Errors are
    /// `AuthExpired` or `CatalogUnavailable` as produced by the catalog.
    pub async fn resolve(&self, name: &CandidateName) -> Result<Option<ArtistMatch>, SyncError> {
        let hits = self.catalog.search_artists(name.as_str(), 1).await?;

        match hits.into_iter().next() {
            Some(artist) => {
                info!(name = %name, artist = %artist.id, catalog_name = %artist.name, "resolver.match");
                Ok(Some(ArtistMatch {
                    candidate: name.clone(),
                    artist_id: artist.id,
                    catalog_name: artist.name,
                }))
            }
            None => {
                debug!(name = %name, "resolver.no_match");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeCatalog};

    fn name(s: &str) -> CandidateName {
        CandidateName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn top_result_becomes_match() {
        let catalog = Arc::new(FakeCatalog::new().with_artist("Alpha", "a1", vec![]));
        let resolver = IdentityResolver::new(catalog.clone());

        let m = resolver.resolve(&name("Alpha")).await.unwrap().unwrap();
        assert_eq!(m.artist_id.0, "a1");
        assert_eq!(m.candidate.as_str(), "Alpha");
        assert_eq!(catalog.calls(), vec![Call::Search("Alpha".into())]);
    }

    #[tokio::test]
    async fn empty_result_is_none_not_error() {
        let resolver = IdentityResolver::new(Arc::new(FakeCatalog::new()));
        assert_eq!(resolver.resolve(&name("Nobody")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn name_is_passed_through_unmodified() {
        let catalog = Arc::new(FakeCatalog::new().with_artist("Sigur Rós", "sr", vec![]));
        let resolver = IdentityResolver::new(catalog.clone());

        assert!(resolver.resolve(&name("sigur ros")).await.unwrap().is_none());
        assert!(resolver.resolve(&name("Sigur Rós")).await.unwrap().is_some());
        assert_eq!(catalog.calls()[0], Call::Search("sigur ros".into()));
    }

    #[tokio::test]
    async fn repeated_resolution_is_stable() {
        let catalog = Arc::new(FakeCatalog::new().with_artist("Alpha", "a1", vec![]));
        let resolver = IdentityResolver::new(catalog);

        let first = resolver.resolve(&name("Alpha")).await.unwrap();
        let second = resolver.resolve(&name("Alpha")).await.unwrap();
        assert_eq!(first, second);

        let first = resolver.resolve(&name("Beta")).await.unwrap();
        let second = resolver.resolve(&name("Beta")).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn catalog_failures_propagate() {
        let resolver = IdentityResolver::new(Arc::new(FakeCatalog::new().with_failing_search("Alpha")));
        let err = resolver.resolve(&name("Alpha")).await.unwrap_err();
        assert!(matches!(err, SyncError::CatalogUnavailable { .. }));

        let resolver = IdentityResolver::new(Arc::new(FakeCatalog::new().with_expired_auth()));
        let err = resolver.resolve(&name("Alpha")).await.unwrap_err();
        assert!(matches!(err, SyncError::AuthExpired));
    }
}
