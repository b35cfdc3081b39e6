//! Integration tests for the track-ingestion pipeline.
//!
//! These tests verify the complete ingestion workflow including:
//! - GPX upload through to a completed route summary
//! - Surface cache reuse across jobs
//! - Failure handling (malformed uploads, unavailable lookup)
//! - Cancellation racing an in-flight job, with artifact cleanup
//! - Streamed progress ordering
//! - TTL-backed stores expiring jobs out from under their tasks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracksurface::artifact::{ArtifactRef, FsArtifactStore, NoopArtifactStore};
use tracksurface::config::PipelineConfig;
use tracksurface::coord::TrackPoint;
use tracksurface::job::{InMemoryJobStore, JobId, JobSnapshot, JobStatus, JobStore, TtlJobStore};
use tracksurface::pipeline::IngestPipeline;
use tracksurface::progress::ProgressEvent;
use tracksurface::surface::{LookupError, LookupFuture, SurfaceLookup, SurfaceType};
use tracksurface::track::GpxTrackParser;

// =============================================================================
// Test Helpers
// =============================================================================

/// Classifies by latitude: everything south of -42.5 is gravel, the rest
/// is paved. Counts how many lookup calls were issued.
struct BandLookup {
    calls: Arc<AtomicUsize>,
}

impl BandLookup {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl SurfaceLookup for BandLookup {
    fn lookup<'a>(&'a self, points: &'a [TrackPoint]) -> LookupFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(points
                .iter()
                .map(|p| {
                    if p.lat <= -42.5 {
                        SurfaceType::Gravel
                    } else {
                        SurfaceType::Paved
                    }
                })
                .collect())
        })
    }

    fn name(&self) -> &str {
        "band"
    }
}

/// A lookup that signals when entered and blocks until released.
struct GatedLookup {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

impl SurfaceLookup for GatedLookup {
    fn lookup<'a>(&'a self, points: &'a [TrackPoint]) -> LookupFuture<'a> {
        Box::pin(async move {
            self.started.notify_one();
            self.release.notified().await;
            Ok(vec![SurfaceType::Paved; points.len()])
        })
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// A lookup that always fails.
struct UnavailableLookup;

impl SurfaceLookup for UnavailableLookup {
    fn lookup<'a>(&'a self, _points: &'a [TrackPoint]) -> LookupFuture<'a> {
        Box::pin(async { Err(LookupError::Transport("connection refused".to_string())) })
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Builds a GPX document with one track segment over the given points.
fn gpx_document(name: Option<&str>, points: &[(f64, f64)]) -> Vec<u8> {
    let mut doc = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <gpx version=\"1.1\" creator=\"tracksurface-tests\" \
         xmlns=\"http://www.topografix.com/GPX/1/1\">\n<trk>",
    );
    if let Some(name) = name {
        doc.push_str(&format!("<name>{}</name>", name));
    }
    doc.push_str("<trkseg>");
    for (lon, lat) in points {
        doc.push_str(&format!("<trkpt lat=\"{}\" lon=\"{}\"></trkpt>", lat, lon));
    }
    doc.push_str("</trkseg></trk></gpx>");
    doc.into_bytes()
}

/// Ten points where indices 3..=6 sit in the gravel band.
fn mixed_track() -> Vec<(f64, f64)> {
    vec![
        (147.00, -42.00),
        (147.01, -42.10),
        (147.02, -42.20),
        (147.03, -42.60),
        (147.04, -42.70),
        (147.05, -42.80),
        (147.06, -42.90),
        (147.07, -42.20),
        (147.08, -42.10),
        (147.09, -42.00),
    ]
}

fn fast_config() -> PipelineConfig {
    PipelineConfig::new().with_progress_interval(Duration::from_millis(10))
}

/// Polls the pipeline until the job reaches a terminal state.
async fn wait_terminal(pipeline: &IngestPipeline, id: &JobId) -> JobSnapshot {
    let deadline = Duration::from_secs(2);
    let poll = async {
        loop {
            if let Some(snap) = pipeline.snapshot(id) {
                if snap.status.is_terminal() {
                    return snap;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(deadline, poll)
        .await
        .expect("job did not reach a terminal state in time")
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_ingestion_produces_route_summary() {
    let (lookup, _) = BandLookup::new();
    let pipeline = IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );

    let id = pipeline.ingest(gpx_document(Some("Kunanyi loop"), &mixed_track()));
    let snap = wait_terminal(&pipeline, &id).await;

    assert_eq!(snap.status, JobStatus::Completed);
    assert_eq!(snap.progress, 100);

    let summary = snap.result.expect("completed job must carry a result");
    assert_eq!(summary.name.as_deref(), Some("Kunanyi loop"));
    assert_eq!(summary.point_count, 10);
    assert!(summary.route_id.starts_with("route-"));

    assert_eq!(summary.unpaved_sections.len(), 1);
    let section = &summary.unpaved_sections[0];
    assert_eq!((section.start_index, section.end_index), (3, 6));
    assert_eq!(section.surface_type, SurfaceType::Gravel);
    assert_eq!(section.coordinates.len(), 4);

    let gravel = summary
        .surface_breakdown
        .iter()
        .find(|s| s.surface_type == SurfaceType::Gravel)
        .expect("gravel share present");
    assert_eq!(gravel.points, 4);
    assert!((gravel.percentage - 40.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_second_ingestion_served_from_cache() {
    let (lookup, calls) = BandLookup::new();
    let pipeline = IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );
    let raw = gpx_document(None, &mixed_track());

    let first = pipeline.ingest(raw.clone());
    wait_terminal(&pipeline, &first).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = pipeline.ingest(raw);
    let snap = wait_terminal(&pipeline, &second).await;

    assert_eq!(snap.status, JobStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = pipeline.cache_stats();
    assert_eq!(stats.lookup_calls, 1);
    assert_eq!(stats.hits, 10);
}

#[tokio::test]
async fn test_malformed_upload_fails_job() {
    let (lookup, calls) = BandLookup::new();
    let pipeline = IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );

    let id = pipeline.ingest(b"not a gpx document".to_vec());
    let snap = wait_terminal(&pipeline, &id).await;

    assert_eq!(snap.status, JobStatus::Failed);
    let error = snap.error.expect("failed job must carry an error");
    assert!(error.contains("malformed track file"));
    assert!(snap.result.is_none());
    // Classification never ran.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lookup_outage_fails_job() {
    let pipeline = IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(UnavailableLookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );

    let id = pipeline.ingest(gpx_document(None, &mixed_track()));
    let snap = wait_terminal(&pipeline, &id).await;

    assert_eq!(snap.status, JobStatus::Failed);
    assert!(snap.error.unwrap().contains("connection refused"));
    // Parse succeeded before the outage, so progress reached 50.
    assert_eq!(snap.progress, 50);
}

#[tokio::test]
async fn test_progress_stream_delivers_terminal_event() {
    let (lookup, _) = BandLookup::new();
    let pipeline = IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );

    let id = pipeline.ingest(gpx_document(None, &mixed_track()));
    let mut events = pipeline.subscribe(&id);

    let mut last_progress = 0u8;
    let mut completed = None;
    let collect = async {
        while let Some(event) = events.recv().await {
            match event {
                ProgressEvent::Progress(value) => {
                    assert!(value >= last_progress, "progress went backwards");
                    last_progress = value;
                }
                ProgressEvent::Completed(summary) => {
                    completed = Some(summary);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), collect)
        .await
        .expect("stream did not terminate in time");

    let summary = completed.expect("stream must end with the terminal payload");
    assert_eq!(summary.point_count, 10);
}

#[tokio::test]
async fn test_subscribe_unknown_job() {
    let (lookup, _) = BandLookup::new();
    let pipeline = IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );

    let mut events = pipeline.subscribe(&JobId::new("never-created"));

    assert_eq!(events.recv().await, Some(ProgressEvent::InvalidJob));
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn test_cancellation_deletes_artifact_and_discards_result() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let lookup = GatedLookup {
        started: Arc::clone(&started),
        release: Arc::clone(&release),
    };

    let upload_dir = tempfile::tempdir().expect("tempdir");
    let upload_path = upload_dir.path().join("upload.gpx");
    let raw = gpx_document(None, &mixed_track());
    std::fs::write(&upload_path, &raw).expect("write upload");

    let store = Arc::new(InMemoryJobStore::new());
    let pipeline = IngestPipeline::new(
        Arc::clone(&store) as Arc<dyn JobStore>,
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(FsArtifactStore::new(upload_dir.path())),
        fast_config(),
    );

    let id = pipeline.ingest_with_artifact(raw, Some(ArtifactRef::new("upload.gpx")));

    // Cancel while the job is blocked inside the surface lookup.
    started.notified().await;
    pipeline.cancel(&id).await;

    assert!(pipeline.snapshot(&id).is_none());
    assert!(!upload_path.exists(), "artifact not cleaned up");

    // Let the background task finish; its terminal write must land on
    // nothing and the job must stay gone.
    release.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(pipeline.snapshot(&id).is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let (lookup, _) = BandLookup::new();
    let pipeline = IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );

    let id = pipeline.ingest(gpx_document(None, &mixed_track()));
    wait_terminal(&pipeline, &id).await;

    pipeline.cancel(&id).await;
    pipeline.cancel(&id).await;

    assert!(pipeline.snapshot(&id).is_none());
}

#[tokio::test]
async fn test_concurrency_bound_serializes_jobs() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let lookup = GatedLookup {
        started: Arc::clone(&started),
        release: Arc::clone(&release),
    };

    let pipeline = IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config().with_max_concurrent_jobs(1),
    );

    // Distinct coordinates per job so the second cannot be served from
    // the cache.
    let first = pipeline.ingest(gpx_document(None, &[(147.0, -42.0)]));
    started.notified().await;
    let second = pipeline.ingest(gpx_document(None, &[(148.0, -41.0)]));

    // The single slot is taken; the second job cannot have started.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snap = pipeline.snapshot(&second).expect("second job exists");
    assert_eq!(snap.status, JobStatus::Pending);

    release.notify_one();
    started.notified().await;
    release.notify_one();

    let first_snap = wait_terminal(&pipeline, &first).await;
    let second_snap = wait_terminal(&pipeline, &second).await;
    assert_eq!(first_snap.status, JobStatus::Completed);
    assert_eq!(second_snap.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_ttl_store_expires_job_before_terminal_write() {
    let (lookup, _) = BandLookup::new();
    let pipeline = IngestPipeline::new(
        Arc::new(TtlJobStore::with_ttl(Duration::from_millis(0))),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );

    let id = pipeline.ingest(gpx_document(None, &mixed_track()));

    // Already expired: the job reads as absent and the background task's
    // writes all land on nothing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(pipeline.snapshot(&id).is_none());

    let mut events = pipeline.subscribe(&id);
    assert_eq!(events.recv().await, Some(ProgressEvent::InvalidJob));
}

#[tokio::test]
async fn test_ttl_store_live_ingestion_completes() {
    let (lookup, _) = BandLookup::new();
    let pipeline = IngestPipeline::new(
        Arc::new(TtlJobStore::new()),
        Arc::new(lookup),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        fast_config(),
    );

    let id = pipeline.ingest(gpx_document(None, &mixed_track()));
    let snap = wait_terminal(&pipeline, &id).await;

    assert_eq!(snap.status, JobStatus::Completed);
}
