//! Job identifiers, lifecycle state machine and result payloads.

mod store;

pub use store::{InMemoryJobStore, JobStore, TtlJobStore, DEFAULT_JOB_TTL};

use crate::artifact::ArtifactRef;
use crate::segment::UnpavedSection;
use crate::surface::SurfaceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter distinguishing tokens generated in the same millisecond.
static TOKEN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates an opaque token of the form `{prefix}-{millis}-{n}`.
pub(crate) fn next_token(prefix: &str) -> String {
    let counter = TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), counter)
}

/// Unique identifier for an ingestion job.
///
/// The id is the only external handle to a job; callers poll or stream
/// progress against it and never see the record directly.
#[derive(Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a job id with the given string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a unique auto-generated job id.
    pub fn generate() -> Self {
        Self(next_token("job"))
    }

    /// Returns the string value of this job id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job lifecycle status.
///
/// Transitions: `Pending → Processing → {Completed | Failed}`.
/// No transition leaves a terminal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, background work not yet started
    #[default]
    Pending,

    /// Background task is consuming input
    Processing,

    /// Finished successfully, result available
    Completed,

    /// Finished with an unrecoverable error
    Failed,
}

impl JobStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Share of track points carrying one surface label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceShare {
    pub surface_type: SurfaceType,
    /// Number of points with this label
    pub points: usize,
    /// Share of the whole track, 0-100
    pub percentage: f64,
}

/// Terminal payload of a completed ingestion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Opaque route token for downstream persistence
    pub route_id: String,
    /// Track name from the uploaded document, if present
    pub name: Option<String>,
    /// Number of parsed track points
    pub point_count: usize,
    /// Contiguous non-paved runs in index order
    pub unpaved_sections: Vec<UnpavedSection>,
    /// Per-label share of the track's points
    pub surface_breakdown: Vec<SurfaceShare>,
}

/// Read-only view of a job returned to pollers.
///
/// Exactly one of `result`/`error` is present, and only in a terminal
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    /// Progress in 0..=100; forced to 100 on completion
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RouteSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full lifecycle state of one ingestion job.
///
/// Owned by the job store; mutated only through the transition methods,
/// which enforce the state machine. All transition methods return whether
/// the transition applied — writes against a terminal record are no-ops.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<RouteSummary>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// The uploaded artifact to delete if the job is cancelled
    pub artifact: Option<ArtifactRef>,
}

impl JobRecord {
    /// Creates a fresh `Pending` record with a generated id.
    pub fn new(artifact: Option<ArtifactRef>) -> Self {
        Self {
            id: JobId::generate(),
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            created_at: Utc::now(),
            expires_at: None,
            artifact,
        }
    }

    /// Enters `Processing`. Applies only from `Pending`.
    pub fn begin_processing(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Processing;
        true
    }

    /// Raises progress to `progress` (clamped to 100).
    ///
    /// Progress is monotonic: a lower value than the current one is
    /// ignored, and nothing changes once the record is terminal.
    pub fn set_progress(&mut self, progress: u8) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.progress = self.progress.max(progress.min(100));
        true
    }

    /// Enters `Completed` with the final payload; progress becomes 100.
    pub fn complete(&mut self, result: RouteSummary) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result = Some(result);
        true
    }

    /// Enters `Failed` with a message; progress keeps its last value.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        true
    }

    /// Returns the poller-facing view of this record.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}
