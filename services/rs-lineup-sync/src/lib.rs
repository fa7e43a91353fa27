//!
//! src/lib.rs  Andrew Belles  Sept 15th, 2025
//!
//! Venue lineup to playlist sync. Scraped performer names are resolved
//! against the catalog, enriched with top tracks, previewed, and written
//! into a collection the user owns
//!
//!

pub mod config;
pub mod errors;
pub mod logging;

pub mod auth;
pub mod fetch;
pub mod pacing;
pub mod token;
pub mod types;

pub mod destination;
pub mod enricher;
pub mod pipeline;
pub mod resolver;
pub mod writer;

pub mod snapshot;
pub mod source;
pub mod sync;

#[cfg(test)]
mod testing;

pub use errors::SyncError;
pub use fetch::{CatalogApi, CatalogClient};
pub use sync::{LineupSync, SyncOptions};
pub use token::{FileTokenStore, Token, TokenGuard, TokenProvider};
pub use types::{CandidateName, PreviewEntry, Resolution, Selection, SyncResult};
