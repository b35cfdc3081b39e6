//! # TrackSurface
//!
//! Asynchronous track-ingestion pipeline: GPX uploads become background
//! jobs that classify every track point's road surface and extract the
//! contiguous unpaved sections of the route.
//!
//! ## Architecture
//!
//! - **coord**: validated WGS84 track points
//! - **track**: GPX parsing into point sequences
//! - **surface**: surface labels, the external lookup contract, and the
//!   memoizing classification cache
//! - **segment**: contiguous unpaved-section extraction
//! - **job**: job lifecycle state machine and stores (plain and TTL)
//! - **progress**: interval-driven push delivery of job progress
//! - **artifact**: cleanup of uploaded files on cancellation
//! - **pipeline**: the [`pipeline::IngestPipeline`] facade tying it all
//!   together
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tracksurface::artifact::NoopArtifactStore;
//! use tracksurface::config::PipelineConfig;
//! use tracksurface::job::InMemoryJobStore;
//! use tracksurface::pipeline::IngestPipeline;
//! use tracksurface::surface::SurfaceLookup;
//! use tracksurface::track::GpxTrackParser;
//!
//! # fn lookup() -> Arc<dyn SurfaceLookup> { unimplemented!() }
//! # async fn run(gpx_bytes: Vec<u8>) {
//! let pipeline = IngestPipeline::new(
//!     Arc::new(InMemoryJobStore::new()),
//!     lookup(),
//!     Arc::new(GpxTrackParser::new()),
//!     Arc::new(NoopArtifactStore),
//!     PipelineConfig::default(),
//! );
//!
//! let job = pipeline.ingest(gpx_bytes);
//! let mut events = pipeline.subscribe(&job);
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod coord;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod segment;
pub mod surface;
pub mod track;

/// Library version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
