//!
//! src/sync.rs  Andrew Belles  Sept 15th, 2025
//!
//! The two entry points a caller needs: resolve a candidate list into a
//! preview, then write a confirmed preview into a destination collection
//!

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{PipelineConfig, SyncConfig};
use crate::destination::DestinationResolver;
use crate::errors::SyncError;
use crate::fetch::CatalogApi;
use crate::pipeline::ResolutionPipeline;
use crate::types::{
    CandidateName, Collection, PreviewEntry, Resolution, Selection, SyncResult,
    collect_track_uris
};
use crate::writer::BatchWriter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Empty an existing destination before appending
    pub clear_first: bool,
}

pub struct LineupSync<C: ?Sized> {
    catalog: Arc<C>,
    pipeline: ResolutionPipeline<C>,
    destinations: DestinationResolver<C>,
    writer: BatchWriter<C>,
}

impl<C: CatalogApi + ?Sized> LineupSync<C> {
    pub fn new(catalog: Arc<C>, pipeline: &PipelineConfig, sync: &SyncConfig) -> Self {
        Self {
            pipeline: ResolutionPipeline::new(catalog.clone(), pipeline),
            destinations: DestinationResolver::new(catalog.clone(), sync),
            writer: BatchWriter::new(catalog.clone(), sync.chunk_size),
            catalog,
        }
    }

    /// Preview entries in candidate order. Dropped candidates are not
    /// reported; use `resolve_candidates` to see them.
    pub async fn run_resolution(&self, candidates: &[CandidateName]) ->
        Result<Vec<PreviewEntry>, SyncError> {
        Ok(self.resolve_candidates(candidates).await?.entries)
    }

    /// Fails up front with `AuthExpired` when there is no credential, so
    /// the run is not spent skipping every candidate. A credential lost
    /// midway shows up as `Resolution::needs_reconnect`.
    pub async fn resolve_candidates(&self, candidates: &[CandidateName]) ->
        Result<Resolution, SyncError> {
        if self.catalog.session().is_none() {
            warn!(candidates = candidates.len(), "sync.unauthorized");
            return Err(SyncError::AuthExpired);
        }
        Ok(self.pipeline.run(candidates).await)
    }

    pub async fn writable_destinations(&self) -> Result<Vec<Collection>, SyncError> {
        self.destinations.list_writable().await
    }

    /// Resolves the destination and appends every preview track to it.
    ///
    /// An empty preview fails with `NoTracksToWrite` before anything is
    /// created. A failed chunk surfaces as `WriteFailed`; chunks written
    /// before it stay in the destination. A failed clear surfaces as
    /// `ClearFailed` and nothing is appended.
    pub async fn sync_to_destination(
        &self,
        selection: &Selection,
        entries: &[PreviewEntry],
        options: SyncOptions,
    ) -> Result<SyncResult, SyncError> {
        let uris = collect_track_uris(entries);
        if uris.is_empty() {
            return Err(SyncError::NoTracksToWrite);
        }

        let destination = self.destinations.resolve(selection).await?;

        let cleared = if options.clear_first && !destination.created {
            self.writer.clear(&destination.id).await?
        } else {
            0
        };

        let appended = self.writer.append(&destination.id, &uris).await?;
        info!(
            destination = %destination.id,
            created = destination.created,
            cleared,
            appended,
            "sync.done"
        );

        Ok(SyncResult {
            destination_id: destination.id,
            created: destination.created,
            cleared,
            appended,
        })
    }
}
