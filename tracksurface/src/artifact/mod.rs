//! Uploaded-artifact cleanup contract.
//!
//! The pipeline never reads uploaded files back; the only operation it
//! needs from the artifact layer is deletion when a job is cancelled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::{Component, PathBuf};
use std::pin::Pin;
use thiserror::Error;

/// Opaque reference to an uploaded artifact (object key, file name, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur while deleting an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The reference escapes the store's root or is otherwise unusable
    #[error("invalid artifact reference: {0}")]
    InvalidReference(String),

    /// Underlying storage failed
    #[error("artifact storage error: {0}")]
    Storage(String),
}

/// Boxed future returned by [`ArtifactStore::delete`].
pub type DeleteFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ArtifactError>> + Send + 'a>>;

/// Trait for the storage holding originally uploaded track files.
///
/// Deleting a reference that no longer exists must succeed: cancellation
/// is idempotent and cleanup may race with retention policies upstream.
pub trait ArtifactStore: Send + Sync {
    /// Deletes the artifact behind the given reference.
    fn delete<'a>(&'a self, artifact: &'a ArtifactRef) -> DeleteFuture<'a>;
}

/// Artifact store over a local directory.
///
/// References are paths relative to the root; anything trying to step
/// outside the root is rejected.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, artifact: &ArtifactRef) -> Result<PathBuf, ArtifactError> {
        let relative = PathBuf::from(artifact.as_str());
        let escapes = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes || relative.as_os_str().is_empty() {
            return Err(ArtifactError::InvalidReference(artifact.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn delete<'a>(&'a self, artifact: &'a ArtifactRef) -> DeleteFuture<'a> {
        Box::pin(async move {
            let path = self.resolve(artifact)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ArtifactError::Storage(e.to_string())),
            }
        })
    }
}

/// Artifact store for deployments that keep no uploaded files around.
///
/// Every delete succeeds without touching anything.
#[derive(Debug, Default, Clone)]
pub struct NoopArtifactStore;

impl ArtifactStore for NoopArtifactStore {
    fn delete<'a>(&'a self, _artifact: &'a ArtifactRef) -> DeleteFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}
