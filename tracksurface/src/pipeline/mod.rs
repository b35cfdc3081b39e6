//! Ingestion orchestrator.
//!
//! [`IngestPipeline`] is the top-level facade over the track-ingestion
//! components: it creates jobs, hands the parse/classify/segment work to
//! a bounded background task, and exposes snapshot/subscribe/cancel plus
//! the ad-hoc batch classification entry point. All collaborators are
//! injected; nothing in this module is process-global, so several
//! independent pipelines can coexist in one process.

use crate::artifact::{ArtifactRef, ArtifactStore};
use crate::config::PipelineConfig;
use crate::coord::TrackPoint;
use crate::job::{
    next_token, JobId, JobRecord, JobSnapshot, JobStore, RouteSummary, SurfaceShare,
};
use crate::progress::{ProgressChannel, ProgressEvent};
use crate::segment::{segment, UnpavedSection};
use crate::surface::{CacheStats, LookupError, SurfaceCache, SurfaceLookup, SurfaceType};
use crate::track::TrackParser;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// The track-ingestion pipeline facade.
///
/// Ingestion is fire-and-forget: [`IngestPipeline::ingest`] creates the
/// job and returns its id immediately, while a background task parses
/// the upload, classifies every point through the shared surface cache,
/// segments the classification into unpaved sections and writes the
/// terminal job state. Callers observe the outcome only through
/// [`snapshot`](IngestPipeline::snapshot) (pull) or
/// [`subscribe`](IngestPipeline::subscribe) (push).
pub struct IngestPipeline {
    store: Arc<dyn JobStore>,
    cache: Arc<SurfaceCache>,
    parser: Arc<dyn TrackParser>,
    artifacts: Arc<dyn ArtifactStore>,
    progress: ProgressChannel,
    permits: Arc<Semaphore>,
}

impl IngestPipeline {
    /// Creates a pipeline from its collaborators.
    pub fn new(
        store: Arc<dyn JobStore>,
        lookup: Arc<dyn SurfaceLookup>,
        parser: Arc<dyn TrackParser>,
        artifacts: Arc<dyn ArtifactStore>,
        config: PipelineConfig,
    ) -> Self {
        let cache = Arc::new(SurfaceCache::with_precision(lookup, config.cache_precision));
        let progress = ProgressChannel::with_interval(Arc::clone(&store), config.progress_interval);
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            store,
            cache,
            parser,
            artifacts,
            progress,
            permits,
        }
    }

    /// Accepts an uploaded track and returns the job id immediately.
    ///
    /// Must be called from within a tokio runtime; the actual work runs
    /// on a spawned task and never blocks the caller.
    pub fn ingest(&self, raw: Vec<u8>) -> JobId {
        self.ingest_with_artifact(raw, None)
    }

    /// Like [`ingest`](Self::ingest), additionally recording the uploaded
    /// artifact so cancellation can clean it up.
    pub fn ingest_with_artifact(&self, raw: Vec<u8>, artifact: Option<ArtifactRef>) -> JobId {
        let id = self.store.create(JobRecord::new(artifact));
        info!(job = %id, bytes = raw.len(), "track ingestion accepted");

        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let parser = Arc::clone(&self.parser);
        let permits = Arc::clone(&self.permits);
        let job_id = id.clone();
        tokio::spawn(async move {
            run_job(store, cache, parser, permits, job_id, raw).await;
        });

        id
    }

    /// Returns the current job state for polling, `None` if the id is
    /// unknown (cancelled, expired, or never created).
    pub fn snapshot(&self, id: &JobId) -> Option<JobSnapshot> {
        self.store.snapshot(id)
    }

    /// Subscribes to streamed progress for a job.
    ///
    /// See [`ProgressChannel::subscribe`] for the event sequence.
    pub fn subscribe(&self, id: &JobId) -> mpsc::Receiver<ProgressEvent> {
        self.progress.subscribe(id)
    }

    /// Cancels a job: removes it from the store and best-effort deletes
    /// its uploaded artifact. Idempotent; cancelling an unknown id does
    /// nothing.
    ///
    /// An in-flight background task is not interrupted, but its eventual
    /// terminal write lands on a removed entry and is ignored.
    pub async fn cancel(&self, id: &JobId) {
        let Some(record) = self.store.remove(id) else {
            debug!(job = %id, "cancel of unknown job ignored");
            return;
        };
        info!(job = %id, "job cancelled");
        if let Some(artifact) = record.artifact {
            if let Err(e) = self.artifacts.delete(&artifact).await {
                // Cleanup is best-effort; the job itself is already gone.
                warn!(job = %id, artifact = %artifact, "artifact cleanup failed: {}", e);
            }
        }
    }

    /// Classifies a batch of coordinates outside the job pipeline and
    /// segments the result, sharing the pipeline's surface cache.
    ///
    /// Classification is per point (one batched lookup for residual
    /// cache misses), so the sections reflect genuine surface changes
    /// along the input.
    pub async fn classify_batch(
        &self,
        points: &[TrackPoint],
    ) -> Result<Vec<UnpavedSection>, LookupError> {
        let surfaces = self.cache.classify_batch(points).await?;
        Ok(segment(points, &surfaces))
    }

    /// Returns the surface cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Stops all active progress subscriptions.
    ///
    /// Background ingestion tasks keep running to their terminal write.
    pub fn shutdown(&self) {
        self.progress.shutdown();
    }
}

/// The background ingestion task for one job.
///
/// Every failure is converted into a `Failed` job; nothing propagates,
/// since the submitter stopped listening when `ingest` returned. All
/// terminal writes are no-ops if the job was cancelled or expired.
async fn run_job(
    store: Arc<dyn JobStore>,
    cache: Arc<SurfaceCache>,
    parser: Arc<dyn TrackParser>,
    permits: Arc<Semaphore>,
    id: JobId,
    raw: Vec<u8>,
) {
    let Ok(_permit) = Arc::clone(&permits).acquire_owned().await else {
        return;
    };

    if !store.set_processing(&id) {
        debug!(job = %id, "job vanished before processing started");
        return;
    }
    store.set_progress(&id, 10);

    let parsed = match parser.parse(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(job = %id, "track parse failed: {}", e);
            store.fail(&id, &e.to_string());
            return;
        }
    };
    store.set_progress(&id, 50);

    let surfaces = match cache.classify_batch(&parsed.points).await {
        Ok(surfaces) => surfaces,
        Err(e) => {
            warn!(job = %id, "surface classification failed: {}", e);
            store.fail(&id, &e.to_string());
            return;
        }
    };
    store.set_progress(&id, 70);

    let sections = segment(&parsed.points, &surfaces);
    store.set_progress(&id, 90);

    let summary = assemble_summary(parsed.name, parsed.points.len(), &surfaces, sections);
    let section_count = summary.unpaved_sections.len();
    if store.complete(&id, summary) {
        info!(
            job = %id,
            points = parsed.points.len(),
            sections = section_count,
            "track ingestion completed"
        );
    } else {
        debug!(job = %id, "terminal write ignored; job cancelled or expired");
    }
}

/// Builds the terminal payload from the classified, segmented track.
fn assemble_summary(
    name: Option<String>,
    point_count: usize,
    surfaces: &[SurfaceType],
    unpaved_sections: Vec<UnpavedSection>,
) -> RouteSummary {
    let mut breakdown: Vec<SurfaceShare> = Vec::new();
    for surface in surfaces {
        match breakdown.iter_mut().find(|s| s.surface_type == *surface) {
            Some(share) => share.points += 1,
            None => breakdown.push(SurfaceShare {
                surface_type: surface.clone(),
                points: 1,
                percentage: 0.0,
            }),
        }
    }
    if point_count > 0 {
        for share in &mut breakdown {
            share.percentage = share.points as f64 * 100.0 / point_count as f64;
        }
    }

    RouteSummary {
        route_id: next_token("route"),
        name,
        point_count,
        unpaved_sections,
        surface_breakdown: breakdown,
    }
}
