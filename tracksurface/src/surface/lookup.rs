//! External surface-lookup contract.
//!
//! The actual geospatial classification provider (vector tile query,
//! OSM tag inspection, etc.) lives outside this crate. Implementors of
//! [`SurfaceLookup`] answer "what is the ground surface at these
//! coordinates" and nothing else; caching and segmentation are handled
//! by the pipeline.

use super::types::SurfaceType;
use crate::coord::TrackPoint;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur when querying the external surface provider.
///
/// Lookups are not retried; a failed lookup fails the job that issued it
/// and the caller resubmits.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Transport-level failure reaching the provider
    #[error("surface lookup transport failed: {0}")]
    Transport(String),

    /// Provider answered but the response could not be interpreted
    #[error("malformed lookup response: expected {expected} classifications, got {actual}")]
    MalformedResponse { expected: usize, actual: usize },

    /// Provider-specific error
    #[error("surface provider error: {0}")]
    Provider(String),
}

/// Boxed future returned by [`SurfaceLookup::lookup`].
pub type LookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<SurfaceType>, LookupError>> + Send + 'a>>;

/// Trait for external geospatial surface classification providers.
///
/// `lookup` takes a batch of coordinates and must return exactly one
/// classification per input point, in input order. An unrecognized
/// surface is a normal `Unknown`/`Other` value, never an error.
///
/// The method returns a boxed future so the trait stays object-safe;
/// the pipeline holds providers as `Arc<dyn SurfaceLookup>`.
pub trait SurfaceLookup: Send + Sync {
    /// Classifies the ground surface at each of the given points.
    fn lookup<'a>(&'a self, points: &'a [TrackPoint]) -> LookupFuture<'a>;

    /// Returns the provider's name for logging and identification.
    fn name(&self) -> &str;
}
