//!
//! src/pipeline.rs  Andrew Belles  Sept 14th, 2025
//!
//! Drives the resolver and enricher over the candidate list, one candidate
//! at a time, behind the pacer. A failing candidate is folded into a skip
//! and never stops the run
//!

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::enricher::TrackEnricher;
use crate::fetch::CatalogApi;
use crate::pacing::{Pacer, PacingPolicy};
use crate::resolver::IdentityResolver;
use crate::types::{CandidateName, PreviewEntry, Resolution, SkipReason, Skipped};

pub struct ResolutionPipeline<C: ?Sized> {
    resolver: IdentityResolver<C>,
    enricher: TrackEnricher<C>,
    pacer: Pacer,
    progress_every: usize,
}

impl<C: CatalogApi + ?Sized> ResolutionPipeline<C> {
    pub fn new(catalog: Arc<C>, cfg: &PipelineConfig) -> Self {
        Self {
            resolver: IdentityResolver::new(catalog.clone()),
            enricher: TrackEnricher::new(
                catalog,
                cfg.tracks_per_artist,
                cfg.fallback_market.clone()
            ),
            pacer: Pacer::new(PacingPolicy::Fixed(cfg.pacing)),
            progress_every: cfg.progress_every.max(1),
        }
    }

    /// Swap the delay policy, e.g. `MinInterval` for a tighter schedule
    pub fn with_pacing(mut self, policy: PacingPolicy) -> Self {
        self.pacer = Pacer::new(policy);
        self
    }

    /// Visits every candidate exactly once, in order. Never fails.
    pub async fn run(&self, candidates: &[CandidateName]) -> Resolution {
        let total = candidates.len();
        if candidates.is_empty() {
            debug!("pipeline.empty");
            return Resolution::default();
        }
        let pacing_ms = self.pacer.policy().interval().as_millis() as u64;
        info!(total, pacing_ms, "pipeline.start");

        let market = self.enricher.market_hint().await;
        let mut resolution = Resolution::default();

        for (index, name) in candidates.iter().enumerate() {
            let processed = index + 1;
            if processed % self.progress_every == 0 {
                info!(processed, total, "pipeline.progress");
            }

            match self.process(name, &market).await {
                Ok(entry) => resolution.entries.push(entry),
                Err(skipped) => {
                    debug!(name = %skipped.name, reason = %skipped.reason, "pipeline.skip");
                    resolution.skipped.push(skipped);
                }
            }
        }

        info!(
            total,
            found = resolution.entries.len(),
            skipped = resolution.skipped.len(),
            tracks = resolution.track_count(),
            "pipeline.done"
        );
        resolution
    }

    async fn process(&self, name: &CandidateName, market: &str) -> Result<PreviewEntry, Skipped> {
        let skip = |reason| Skipped { name: name.clone(), reason };

        self.pacer.wait().await;

        let matched = match self.resolver.resolve(name).await {
            Ok(Some(m)) => m,
            Ok(None) => return Err(skip(SkipReason::NoArtistMatch)),
            Err(e) if e.is_auth_expired() => return Err(skip(SkipReason::AuthExpired)),
            Err(e) => {
                warn!(name = %name, error = %e, "pipeline.resolve.failed");
                return Err(skip(SkipReason::ResolveFailed(e.to_string())));
            }
        };

        let tracks = match self.enricher.try_top_tracks(&matched.artist_id, market).await {
            Ok(tracks) if tracks.is_empty() => return Err(skip(SkipReason::NoTracks)),
            Ok(tracks) => tracks,
            Err(e) if e.is_auth_expired() => return Err(skip(SkipReason::AuthExpired)),
            Err(e) => {
                warn!(name = %name, artist = %matched.artist_id, error = %e, "pipeline.enrich.failed");
                return Err(skip(SkipReason::EnrichFailed(e.to_string())));
            }
        };

        Ok(PreviewEntry { name: name.clone(), tracks })
    }
}
