//! Caller-level driver that uploads every part of a session.
//!
//! The session itself never retries: a failed part is data for the caller.
//! `PartUploader` is that caller — it fans the parts out with bounded
//! concurrency and re-runs the session's incomplete list for a fixed
//! number of rounds.

use std::sync::Arc;

use partlift_protocol::PartStatus;
use partlift_session::{SessionError, UploadSession};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::Error;

/// Default number of parts in flight at once.
const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Default number of rounds (first pass + retries).
const DEFAULT_MAX_ROUNDS: usize = 3;

/// Progress events emitted while the driver runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    PartCompleted { part_number: usize },
    PartFailed { part_number: usize },
    Finished,
}

/// Uploads every part of a session with bounded concurrency and retries.
///
/// Each round uploads the session's incomplete parts in parallel; parts
/// that failed are picked up by the next round. Pacing between retries
/// stays with the caller — the driver adds no backoff.
pub struct PartUploader {
    max_in_flight: usize,
    max_rounds: usize,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl Default for PartUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl PartUploader {
    /// Creates a driver with default limits.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_rounds: DEFAULT_MAX_ROUNDS,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets how many parts may be in flight at once.
    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.max(1);
        self
    }

    /// Sets how many rounds (first pass + retries) to run.
    pub fn with_max_rounds(mut self, n: usize) -> Self {
        self.max_rounds = n.max(1);
        self
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are dropped, not queued, when the receiver lags.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this upload.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads `parts[i]` into slot `i` until the session finishes or the
    /// round budget is spent.
    pub async fn run(&self, session: Arc<UploadSession>, parts: Vec<Vec<u8>>) -> Result<(), Error> {
        if parts.len() != session.part_count() {
            return Err(Error::PartCountMismatch {
                have: parts.len(),
                want: session.part_count(),
            });
        }
        let parts = Arc::new(parts);

        for round in 0..self.max_rounds {
            let pending = session.incomplete_parts();
            if pending.is_empty() {
                break;
            }
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            debug!(round, pending = pending.len(), "upload round started");

            let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
            let mut handles = Vec::with_capacity(pending.len());
            for index in pending {
                let session = Arc::clone(&session);
                let parts = Arc::clone(&parts);
                let semaphore = Arc::clone(&semaphore);
                let cancel = self.cancel.clone();
                let events_tx = self.events_tx.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.unwrap();
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    match session.upload_part(index, &parts[index]).await {
                        Ok(Some(result)) => {
                            let event = match result.status {
                                PartStatus::Completed => UploadEvent::PartCompleted {
                                    part_number: index,
                                },
                                PartStatus::Failed => UploadEvent::PartFailed {
                                    part_number: index,
                                },
                            };
                            let _ = events_tx.try_send(event);
                            Ok(())
                        }
                        Ok(None) => Ok(()),
                        // Lost the completion race: the winner already
                        // finished the session.
                        Err(SessionError::AlreadyFinished) => Ok(()),
                        // Session stays unfinished; completion is retried
                        // after the rounds.
                        Err(SessionError::FinalizeRejected) => Ok(()),
                        Err(SessionError::Transport(reason)) => {
                            warn!(part = index, %reason, "part transfer failed in transit");
                            let _ = events_tx.try_send(UploadEvent::PartFailed {
                                part_number: index,
                            });
                            Ok(())
                        }
                        Err(e) => Err(Error::Session(e)),
                    }
                }));
            }

            for handle in handles {
                handle
                    .await
                    .map_err(|e| Error::Driver(format!("task join error: {e}")))??;
            }
        }

        if !session.is_finished() {
            let pending = session.incomplete_parts();
            if !pending.is_empty() {
                return Err(Error::PartsIncomplete(pending));
            }
            // Every part landed but completion was rejected mid-run; one
            // more attempt before giving up.
            match session.finalize().await {
                Ok(()) | Err(SessionError::AlreadyFinished) => {}
                Err(e) => return Err(Error::Session(e)),
            }
        }

        let _ = self.events_tx.try_send(UploadEvent::Finished);
        Ok(())
    }
}
