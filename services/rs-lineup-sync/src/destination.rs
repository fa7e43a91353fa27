//!
//! src/destination.rs  Andrew Belles  Sept 15th, 2025
//!
//! Picks the collection the preview gets written into. Lists what the user
//! may write to, and creates a private collection on request
//!

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::fetch::CatalogApi;
use crate::types::{Collection, NewCollection, Selection, UserProfile};

/// Outcome of resolving a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub id: String,
    pub created: bool,
}

/// Value read on behalf of the user in one credential session
type SessionSlot<T> = Mutex<Option<(u64, T)>>;

fn cached<T: Clone>(slot: &SessionSlot<T>, session: Option<u64>) -> Option<T> {
    let session = session?;
    let held = slot.lock().ok()?;
    match held.as_ref() {
        Some((epoch, value)) if *epoch == session => Some(value.clone()),
        _ => None
    }
}

fn remember<T>(slot: &SessionSlot<T>, session: Option<u64>, value: T) {
    if let (Some(session), Ok(mut held)) = (session, slot.lock()) {
        *held = Some((session, value));
    }
}

pub struct DestinationResolver<C: ?Sized> {
    catalog: Arc<C>,
    page_size: u32,
    default_name: String,
    description: String,
    owner: SessionSlot<UserProfile>,
    cache: SessionSlot<Vec<Collection>>,
}

impl<C: CatalogApi + ?Sized> DestinationResolver<C> {
    pub fn new(catalog: Arc<C>, cfg: &SyncConfig) -> Self {
        Self {
            catalog,
            page_size: cfg.page_size.max(1),
            default_name: cfg.default_playlist_name.clone(),
            description: cfg.playlist_description.clone(),
            owner: Mutex::new(None),
            cache: Mutex::new(None),
        }
    }

    /// Drops the cached user and listing once the credential is rejected
    fn check_auth(&self, e: SyncError) -> SyncError {
        if e.is_auth_expired() {
            debug!("destination.cache.dropped");
            if let Ok(mut owner) = self.owner.lock() {
                *owner = None;
            }
            if let Ok(mut cache) = self.cache.lock() {
                *cache = None;
            }
        }
        e
    }

    /// Acting user, looked up once per credential session. `AuthExpired`
    /// passes through as is, anything else becomes `OwnerLookupFailed`.
    pub async fn owner(&self) -> Result<UserProfile, SyncError> {
        let session = self.catalog.session();
        if let Some(user) = cached(&self.owner, session) {
            return Ok(user);
        }

        let user = self.catalog.current_user().await.map_err(|e| match self.check_auth(e) {
            SyncError::AuthExpired => SyncError::AuthExpired,
            other => SyncError::OwnerLookupFailed(other.to_string())
        })?;

        remember(&self.owner, session, user.clone());
        Ok(user)
    }

    /// Every collection the user owns or may collaborate on. Filtering
    /// happens here, once per session, and the result is cached.
    pub async fn list_writable(&self) -> Result<Vec<Collection>, SyncError> {
        let session = self.catalog.session();
        if let Some(listed) = cached(&self.cache, session) {
            return Ok(listed);
        }

        let owner = self.owner().await?;
        let mut writable = Vec::new();
        let mut offset = 0u32;
        let mut pages = 0usize;

        loop {
            let page = self.catalog.current_user_playlists(self.page_size, offset)
                .await
                .map_err(|e| self.check_auth(e))?;
            pages += 1;
            writable.extend(
                page.items.into_iter().filter(|c| c.is_writable_by(&owner.id))
            );

            match page.next_offset {
                Some(next) if next > offset => offset = next,
                _ => break
            }
        }

        info!(pages, writable = writable.len(), "destination.listed");
        remember(&self.cache, session, writable.clone());
        Ok(writable)
    }

    /// Existing ids are taken as given. Creation needs the acting user and
    /// falls back to the default name when the requested one is blank.
    pub async fn resolve(&self, selection: &Selection) -> Result<Destination, SyncError> {
        match selection {
            Selection::Existing(id) => {
                debug!(destination = %id, "destination.existing");
                Ok(Destination { id: id.clone(), created: false })
            }
            Selection::CreateNew { name } => {
                let owner = self.owner().await?;
                let name = match name.trim() {
                    "" => self.default_name.clone(),
                    given => given.to_string()
                };
                let request = NewCollection {
                    name,
                    description: self.description.clone(),
                    public: false,
                };

                let created = self.catalog.create_playlist(&owner.id, &request)
                    .await
                    .map_err(|e| self.check_auth(e))?;
                info!(destination = %created.id, name = %created.name, owner = %owner.id, "destination.created");

                if let Ok(mut cache) = self.cache.lock() {
                    if let Some((_, list)) = cache.as_mut() {
                        list.push(created.clone());
                    }
                }
                Ok(Destination { id: created.id, created: true })
            }
        }
    }
}
