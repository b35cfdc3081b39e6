//! Push delivery of job progress.
//!
//! A subscription is a timer-driven poll-and-push loop over the job
//! store: it emits the current progress immediately, re-emits on a fixed
//! interval, delivers the terminal payload exactly once, and closes. The
//! loop is bound to one subscriber and stops as soon as the receiver is
//! dropped, so a disconnecting client leaves no dangling timer.
//!
//! Pull delivery is just [`JobStore::snapshot`]; both modes read the same
//! store and neither mutates the job.

use crate::job::{JobId, JobStatus, JobStore, RouteSummary};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default interval between progress emissions.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// One message on a progress subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Current progress, 0..=100
    Progress(u8),
    /// Terminal: the job finished with this payload
    Completed(RouteSummary),
    /// Terminal: the job failed with this message
    Failed(String),
    /// Terminal: the job id is unknown (never existed, cancelled, or expired)
    InvalidJob,
}

impl ProgressEvent {
    /// Returns true if this event ends the subscription.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Streams progress updates for jobs in a shared store.
///
/// Cloning is cheap; all clones share the same store and shutdown token.
#[derive(Clone)]
pub struct ProgressChannel {
    store: Arc<dyn JobStore>,
    period: Duration,
    shutdown: CancellationToken,
}

impl ProgressChannel {
    /// Creates a channel emitting at the default one-second interval.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self::with_interval(store, DEFAULT_PROGRESS_INTERVAL)
    }

    /// Creates a channel with an explicit emission interval.
    pub fn with_interval(store: Arc<dyn JobStore>, period: Duration) -> Self {
        Self {
            store,
            period,
            shutdown: CancellationToken::new(),
        }
    }

    /// Subscribes to a job's progress.
    ///
    /// The returned receiver yields zero or more `Progress` events
    /// followed by exactly one terminal event, after which it closes.
    /// Multiple subscribers per job are fine; subscriptions never mutate
    /// the job.
    pub fn subscribe(&self, id: &JobId) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(16);
        let store = Arc::clone(&self.store);
        let id = id.clone();
        let period = self.period;
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            // Immediate emission so a subscriber never waits a full
            // interval for its first event.
            if !emit_current(store.as_ref(), &id, &tx).await {
                return;
            }

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {
                        if !emit_current(store.as_ref(), &id, &tx).await {
                            break;
                        }
                    }
                }
            }
        });

        rx
    }

    /// Stops all active subscription loops.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Emits the job's current state; returns whether the loop should
/// continue (`false` after a terminal event or a dropped receiver).
async fn emit_current(
    store: &dyn JobStore,
    id: &JobId,
    tx: &mpsc::Sender<ProgressEvent>,
) -> bool {
    let (event, keep_going) = match store.snapshot(id) {
        None => (ProgressEvent::InvalidJob, false),
        Some(snap) => match snap.status {
            JobStatus::Completed => match snap.result {
                Some(summary) => (ProgressEvent::Completed(summary), false),
                // Store invariant violated upstream; surface as a failure
                // rather than hanging the subscriber.
                None => (
                    ProgressEvent::Failed("job completed without a result".to_string()),
                    false,
                ),
            },
            JobStatus::Failed => {
                let message = snap
                    .error
                    .unwrap_or_else(|| "unknown processing error".to_string());
                (ProgressEvent::Failed(message), false)
            }
            JobStatus::Pending | JobStatus::Processing => {
                (ProgressEvent::Progress(snap.progress), true)
            }
        },
    };

    tx.send(event).await.is_ok() && keep_going
}
