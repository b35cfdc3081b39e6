//! Job store implementations.
//!
//! Two stores back the same contract with different lifetime guarantees:
//! [`InMemoryJobStore`] keeps jobs for the process lifetime (the simple
//! deployment), [`TtlJobStore`] bounds retention per entry the way a
//! shared external store with expiry would.
//!
//! Every write against a missing or expired id is a no-op returning
//! `false`. This is what makes cancellation and expiry race-safe: a
//! background task finishing after its job was cancelled simply writes
//! into nothing.

use super::{JobId, JobRecord, JobSnapshot, RouteSummary};
use chrono::Utc;
use dashmap::DashMap;
use std::time::Duration;

/// Default retention for TTL-backed stores (matches the source system's
/// one-hour upload job expiry).
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(60 * 60);

/// Lifecycle storage for in-flight ingestion jobs.
///
/// Concurrent reads are always safe; each job has a single logical
/// writer (the background task that owns it), so implementations only
/// need per-entry locking.
pub trait JobStore: Send + Sync {
    /// Inserts a new record and returns its id.
    fn create(&self, record: JobRecord) -> JobId;

    /// Returns the poller-facing view of a job, `None` if unknown.
    fn snapshot(&self, id: &JobId) -> Option<JobSnapshot>;

    /// Transitions a job to `Processing`.
    fn set_processing(&self, id: &JobId) -> bool;

    /// Raises a job's progress (monotonic, ignored once terminal).
    fn set_progress(&self, id: &JobId, progress: u8) -> bool;

    /// Writes the terminal `Completed` state.
    fn complete(&self, id: &JobId, result: RouteSummary) -> bool;

    /// Writes the terminal `Failed` state.
    fn fail(&self, id: &JobId, error: &str) -> bool;

    /// Deletes a job, returning the removed record.
    ///
    /// Used for explicit cancellation; the caller is responsible for any
    /// artifact cleanup recorded on the returned record.
    fn remove(&self, id: &JobId) -> Option<JobRecord>;

    /// Returns true if the job currently exists.
    fn contains(&self, id: &JobId) -> bool {
        self.snapshot(id).is_some()
    }
}

/// Process-local job store without retention bounds.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, JobRecord>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, record: JobRecord) -> JobId {
        let id = record.id.clone();
        self.jobs.insert(id.clone(), record);
        id
    }

    fn snapshot(&self, id: &JobId) -> Option<JobSnapshot> {
        self.jobs.get(id).map(|record| record.snapshot())
    }

    fn set_processing(&self, id: &JobId) -> bool {
        match self.jobs.get_mut(id) {
            Some(mut record) => record.begin_processing(),
            None => false,
        }
    }

    fn set_progress(&self, id: &JobId, progress: u8) -> bool {
        match self.jobs.get_mut(id) {
            Some(mut record) => record.set_progress(progress),
            None => false,
        }
    }

    fn complete(&self, id: &JobId, result: RouteSummary) -> bool {
        match self.jobs.get_mut(id) {
            Some(mut record) => record.complete(result),
            None => false,
        }
    }

    fn fail(&self, id: &JobId, error: &str) -> bool {
        match self.jobs.get_mut(id) {
            Some(mut record) => record.fail(error),
            None => false,
        }
    }

    fn remove(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.remove(id).map(|(_, record)| record)
    }
}

/// Job store with per-entry expiry.
///
/// An expired entry reads as absent and rejects writes, independent of
/// any sweep; [`TtlJobStore::sweep_expired`] reclaims the memory and is
/// meant to run periodically.
pub struct TtlJobStore {
    jobs: DashMap<JobId, JobRecord>,
    ttl: chrono::Duration,
}

impl TtlJobStore {
    /// Creates a store with the default one-hour retention.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_JOB_TTL)
    }

    /// Creates a store with an explicit retention period.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    fn is_expired(record: &JobRecord) -> bool {
        matches!(record.expires_at, Some(expires_at) if expires_at <= Utc::now())
    }

    /// Removes expired entries, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, record| !Self::is_expired(record));
        before - self.jobs.len()
    }

    /// Number of stored jobs, including not-yet-swept expired entries.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Runs `apply` against a live (non-expired) record.
    ///
    /// An expired record is dropped on access rather than waiting for
    /// the sweep.
    fn with_live_record<T>(
        &self,
        id: &JobId,
        apply: impl FnOnce(&mut JobRecord) -> T,
    ) -> Option<T> {
        let expired = match self.jobs.get_mut(id) {
            Some(mut record) => {
                if !Self::is_expired(&record) {
                    return Some(apply(&mut record));
                }
                true
            }
            None => false,
        };
        if expired {
            self.jobs.remove(id);
        }
        None
    }
}

impl Default for TtlJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for TtlJobStore {
    fn create(&self, mut record: JobRecord) -> JobId {
        record.expires_at = Some(Utc::now() + self.ttl);
        let id = record.id.clone();
        self.jobs.insert(id.clone(), record);
        id
    }

    fn snapshot(&self, id: &JobId) -> Option<JobSnapshot> {
        self.with_live_record(id, |record| record.snapshot())
    }

    fn set_processing(&self, id: &JobId) -> bool {
        self.with_live_record(id, |record| record.begin_processing())
            .unwrap_or(false)
    }

    fn set_progress(&self, id: &JobId, progress: u8) -> bool {
        self.with_live_record(id, |record| record.set_progress(progress))
            .unwrap_or(false)
    }

    fn complete(&self, id: &JobId, result: RouteSummary) -> bool {
        self.with_live_record(id, |record| record.complete(result))
            .unwrap_or(false)
    }

    fn fail(&self, id: &JobId, error: &str) -> bool {
        self.with_live_record(id, |record| record.fail(error))
            .unwrap_or(false)
    }

    fn remove(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs
            .remove(id)
            .map(|(_, record)| record)
            .filter(|record| !Self::is_expired(record))
    }
}
