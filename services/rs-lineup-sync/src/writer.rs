//!
//! src/writer.rs  Andrew Belles  Sept 15th, 2025
//!
//! Chunked writes into a destination collection. Chunks go out strictly in
//! order and the first failure stops the batch. Nothing already written is
//! rolled back, callers learn how far the batch got through `WriteFailed`
//! or `ClearFailed`
//!

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::MAX_CHUNK_SIZE;
use crate::errors::SyncError;
use crate::fetch::CatalogApi;

/// Page size used when reading a collection back before clearing it
const CLEAR_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy)]
enum ChunkOp {
    Add,
    Remove,
}

impl ChunkOp {
    fn as_str(self) -> &'static str {
        match self {
            ChunkOp::Add => "append",
            ChunkOp::Remove => "remove"
        }
    }
}

pub struct BatchWriter<C: ?Sized> {
    catalog: Arc<C>,
    chunk_size: usize,
}

impl<C: CatalogApi + ?Sized> BatchWriter<C> {
    pub fn new(catalog: Arc<C>, chunk_size: usize) -> Self {
        Self { catalog, chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE) }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Appends `uris` in `ceil(len / chunk_size)` calls. Returns the number
    /// of uris in completed chunks.
    pub async fn append(&self, destination: &str, uris: &[String]) -> Result<usize, SyncError> {
        if uris.is_empty() {
            return Err(SyncError::NoTracksToWrite);
        }

        let written = self.in_chunks(destination, uris, ChunkOp::Add).await?;
        info!(destination, written, "writer.appended");
        Ok(written)
    }

    /// Removes every track currently in the destination. Returns how many
    /// were removed; an empty destination is not an error.
    pub async fn clear(&self, destination: &str) -> Result<usize, SyncError> {
        let existing = self.read_all(destination).await?;
        if existing.is_empty() {
            debug!(destination, "writer.clear.empty");
            return Ok(0);
        }

        let removed = self.in_chunks(destination, &existing, ChunkOp::Remove).await?;
        info!(destination, removed, "writer.cleared");
        Ok(removed)
    }

    async fn read_all(&self, destination: &str) -> Result<Vec<String>, SyncError> {
        let mut uris = Vec::new();
        let mut offset = 0u32;
        loop {
            let page = self.catalog
                .playlist_track_uris(destination, CLEAR_PAGE_SIZE, offset)
                .await?;
            uris.extend(page.items);
            match page.next_offset {
                Some(next) if next > offset => offset = next,
                _ => break
            }
        }
        Ok(uris)
    }

    async fn in_chunks(&self, destination: &str, uris: &[String], op: ChunkOp) ->
        Result<usize, SyncError> {
        let total_chunks = uris.len().div_ceil(self.chunk_size);
        let mut written = 0usize;

        for (index, chunk) in uris.chunks(self.chunk_size).enumerate() {
            let outcome = match op {
                ChunkOp::Add => self.catalog.add_tracks(destination, chunk).await,
                ChunkOp::Remove => self.catalog.remove_tracks(destination, chunk).await
            };

            if let Err(e) = outcome {
                warn!(
                    destination, op = op.as_str(), chunk = index + 1, total_chunks, written,
                    error = %e, "writer.chunk.failed"
                );
                let source = Box::new(e);
                return Err(match op {
                    ChunkOp::Add => SyncError::WriteFailed { written, source },
                    ChunkOp::Remove => SyncError::ClearFailed { removed: written, source }
                });
            }

            written += chunk.len();
            debug!(destination, op = op.as_str(), chunk = index + 1, total_chunks, size = chunk.len(), "writer.chunk");
        }
        Ok(written)
    }
}
