use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use partlift_protocol::{MAX_PART_COUNT, MIN_PART_COUNT, PartStatus, PartUploadResult};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::SessionError;
use crate::transport::{PartTransport, TransferOutcome};

/// One part slot: its upload target and completion flag.
struct PartSlot {
    target: String,
    completed: AtomicBool,
}

/// Tracks one multipart upload from provisioning to completion.
///
/// Shared by `Arc` between any number of concurrent callers. Part slots are
/// never added, removed or reordered, and a completion flag only ever moves
/// from `false` to `true`.
pub struct UploadSession {
    transport: Arc<dyn PartTransport>,
    upload_id: String,
    object_id: i64,
    parts: Vec<PartSlot>,
    finished: AtomicBool,
    /// Serializes check-then-complete so the backend completion call is
    /// issued at most once across racing callers.
    finalize_lock: Mutex<()>,
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession")
            .field("upload_id", &self.upload_id)
            .field("object_id", &self.object_id)
            .field("parts", &self.parts.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl UploadSession {
    /// Creates a session over backend-issued upload targets.
    ///
    /// `targets[i]` is where part `i`'s bytes go. The slot count is fixed
    /// for the session's lifetime and must lie in [1, 250].
    pub fn new(
        transport: Arc<dyn PartTransport>,
        upload_id: impl Into<String>,
        object_id: i64,
        targets: Vec<String>,
    ) -> Result<Self, SessionError> {
        if targets.len() < MIN_PART_COUNT || targets.len() > MAX_PART_COUNT {
            return Err(SessionError::InvalidPartCount {
                count: targets.len(),
            });
        }
        let parts = targets
            .into_iter()
            .map(|target| PartSlot {
                target,
                completed: AtomicBool::new(false),
            })
            .collect();
        Ok(Self {
            transport,
            upload_id: upload_id.into(),
            object_id,
            parts,
            finished: AtomicBool::new(false),
            finalize_lock: Mutex::new(()),
        })
    }

    /// Uploads one part.
    ///
    /// Callable any number of times, from any number of tasks, in any
    /// order. Returns `None` when no transfer was performed: either this
    /// part was already completed (idempotent retry), or every part was
    /// already completed and the call went straight to
    /// [`finalize`](Self::finalize).
    ///
    /// A `Failed` result means the target answered with a non-success
    /// status. That is data, not an error: the part stays incomplete and
    /// the caller retries the same index.
    pub async fn upload_part(
        &self,
        index: usize,
        content: &[u8],
    ) -> Result<Option<PartUploadResult>, SessionError> {
        if content.is_empty() {
            return Err(SessionError::EmptyContent);
        }
        if index >= self.parts.len() {
            return Err(SessionError::InvalidPartIndex {
                index,
                part_count: self.parts.len(),
            });
        }

        // Nothing left to transfer: the only remaining work is completion.
        // On a session that already finished this surfaces AlreadyFinished.
        if self.all_parts_completed() {
            self.finalize().await?;
            return Ok(None);
        }
        if self.parts[index].completed.load(Ordering::Acquire) {
            trace!(part = index, "part already completed, skipping transfer");
            return Ok(None);
        }

        let outcome = self
            .transport
            .send_part(&self.parts[index].target, content)
            .await?;
        match outcome {
            TransferOutcome::Accepted => {
                self.parts[index].completed.store(true, Ordering::Release);
                debug!(part = index, upload_id = %self.upload_id, "part completed");
                if self.all_parts_completed() {
                    self.finalize().await?;
                }
                Ok(Some(PartUploadResult {
                    part_number: index,
                    status: PartStatus::Completed,
                }))
            }
            TransferOutcome::Rejected => {
                debug!(part = index, upload_id = %self.upload_id, "part transfer rejected");
                Ok(Some(PartUploadResult {
                    part_number: index,
                    status: PartStatus::Failed,
                }))
            }
        }
    }

    /// Issues the one-time backend completion call.
    ///
    /// At most one caller reaches the backend; a concurrent loser gets
    /// [`SessionError::AlreadyFinished`], as does any call after the
    /// session finished — a second completion is a caller error, never a
    /// silent success. With parts still outstanding this is a no-op. A
    /// rejected completion leaves the session unfinished so a later call
    /// can retry.
    pub async fn finalize(&self) -> Result<(), SessionError> {
        let _guard = self.finalize_lock.lock().await;
        if self.finished.load(Ordering::Acquire) {
            return Err(SessionError::AlreadyFinished);
        }
        if !self.all_parts_completed() {
            return Ok(());
        }
        let outcome = self
            .transport
            .complete_upload(&self.upload_id, self.object_id)
            .await?;
        match outcome {
            TransferOutcome::Accepted => {
                self.finished.store(true, Ordering::Release);
                debug!(upload_id = %self.upload_id, object_id = self.object_id, "upload finished");
                Ok(())
            }
            TransferOutcome::Rejected => Err(SessionError::FinalizeRejected),
        }
    }

    /// Indices of parts not yet completed, ascending.
    ///
    /// Pure read; callers use it to drive retry loops over failed or
    /// never-attempted parts.
    pub fn incomplete_parts(&self) -> Vec<usize> {
        self.parts
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.completed.load(Ordering::Acquire))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether the backend completion call has succeeded.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// The backend-issued upload identifier.
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// The file record id the parts assemble into.
    pub fn object_id(&self) -> i64 {
        self.object_id
    }

    /// Number of part slots, fixed at creation.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn all_parts_completed(&self) -> bool {
        self.parts
            .iter()
            .all(|slot| slot.completed.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    /// Mock transport recording every call; targets and completion can be
    /// programmed to answer `Rejected`.
    #[derive(Default)]
    struct MockTransport {
        part_calls: StdMutex<Vec<String>>,
        complete_calls: AtomicUsize,
        reject_targets: StdMutex<HashSet<String>>,
        reject_completes: AtomicUsize,
    }

    impl MockTransport {
        fn reject_target(&self, target: &str) {
            self.reject_targets.lock().unwrap().insert(target.into());
        }

        fn accept_target(&self, target: &str) {
            self.reject_targets.lock().unwrap().remove(target);
        }

        fn part_call_count(&self) -> usize {
            self.part_calls.lock().unwrap().len()
        }

        fn complete_call_count(&self) -> usize {
            self.complete_calls.load(Ordering::SeqCst)
        }
    }

    impl PartTransport for MockTransport {
        fn send_part(
            &self,
            target: &str,
            _content: &[u8],
        ) -> Pin<Box<dyn Future<Output = Result<TransferOutcome, SessionError>> + Send + '_>>
        {
            self.part_calls.lock().unwrap().push(target.to_string());
            let rejected = self.reject_targets.lock().unwrap().contains(target);
            Box::pin(async move {
                if rejected {
                    Ok(TransferOutcome::Rejected)
                } else {
                    Ok(TransferOutcome::Accepted)
                }
            })
        }

        fn complete_upload(
            &self,
            _upload_id: &str,
            _object_id: i64,
        ) -> Pin<Box<dyn Future<Output = Result<TransferOutcome, SessionError>> + Send + '_>>
        {
            self.complete_calls.fetch_add(1, Ordering::SeqCst);
            let rejected = self
                .reject_completes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            Box::pin(async move {
                if rejected {
                    Ok(TransferOutcome::Rejected)
                } else {
                    Ok(TransferOutcome::Accepted)
                }
            })
        }
    }

    fn targets(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://store/p{i}")).collect()
    }

    fn session(transport: &Arc<MockTransport>, n: usize) -> UploadSession {
        UploadSession::new(Arc::clone(transport) as Arc<dyn PartTransport>, "u-1", 42, targets(n))
            .unwrap()
    }

    #[test]
    fn new_session_lists_all_parts_incomplete() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 5);
        assert_eq!(s.incomplete_parts(), vec![0, 1, 2, 3, 4]);
        assert!(!s.is_finished());
        assert_eq!(s.part_count(), 5);
        assert_eq!(s.upload_id(), "u-1");
        assert_eq!(s.object_id(), 42);
    }

    #[test]
    fn part_count_bounds_enforced() {
        let transport = Arc::new(MockTransport::default());
        let t = Arc::clone(&transport) as Arc<dyn PartTransport>;
        assert!(matches!(
            UploadSession::new(Arc::clone(&t), "u", 1, targets(0)),
            Err(SessionError::InvalidPartCount { count: 0 })
        ));
        assert!(matches!(
            UploadSession::new(Arc::clone(&t), "u", 1, targets(251)),
            Err(SessionError::InvalidPartCount { count: 251 })
        ));
        assert!(UploadSession::new(Arc::clone(&t), "u", 1, targets(1)).is_ok());
        assert!(UploadSession::new(t, "u", 1, targets(250)).is_ok());
    }

    #[tokio::test]
    async fn empty_content_rejected_before_index_check() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 2);
        // Even with an out-of-range index, empty content wins.
        let err = s.upload_part(99, b"").await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyContent));
        assert_eq!(transport.part_call_count(), 0);
    }

    #[tokio::test]
    async fn out_of_range_index_rejected() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 2);
        let err = s.upload_part(2, b"data").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidPartIndex {
                index: 2,
                part_count: 2
            }
        ));
        assert_eq!(transport.part_call_count(), 0);
    }

    #[tokio::test]
    async fn sequential_upload_completes_and_finalizes() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 5);

        for i in 0..5 {
            let result = s.upload_part(i, b"data").await.unwrap().unwrap();
            assert_eq!(result.part_number, i);
            assert_eq!(result.status, PartStatus::Completed);
        }

        assert!(s.is_finished());
        assert!(s.incomplete_parts().is_empty());
        assert_eq!(transport.part_call_count(), 5);
        assert_eq!(transport.complete_call_count(), 1);
    }

    #[tokio::test]
    async fn repeat_upload_is_idempotent() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 2);

        assert!(s.upload_part(0, b"data").await.unwrap().is_some());
        // Same part again while part 1 is outstanding: no transfer, no result.
        assert!(s.upload_part(0, b"data").await.unwrap().is_none());
        assert_eq!(transport.part_call_count(), 1);
        assert_eq!(s.incomplete_parts(), vec![1]);
    }

    #[tokio::test]
    async fn rejected_part_stays_incomplete_and_can_retry() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 5);
        transport.reject_target("https://store/p2");

        for i in 0..5 {
            let result = s.upload_part(i, b"data").await.unwrap().unwrap();
            let expected = if i == 2 {
                PartStatus::Failed
            } else {
                PartStatus::Completed
            };
            assert_eq!(result.status, expected);
        }

        assert_eq!(s.incomplete_parts(), vec![2]);
        assert!(!s.is_finished());
        assert_eq!(transport.complete_call_count(), 0);

        // Target recovers; retrying the failed index finishes the session.
        transport.accept_target("https://store/p2");
        let result = s.upload_part(2, b"data").await.unwrap().unwrap();
        assert_eq!(result.status, PartStatus::Completed);
        assert!(s.incomplete_parts().is_empty());
        assert!(s.is_finished());
        assert_eq!(transport.complete_call_count(), 1);
    }

    #[tokio::test]
    async fn rejected_completion_is_retryable() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 2);
        transport.reject_completes.store(1, Ordering::SeqCst);

        assert!(s.upload_part(0, b"data").await.unwrap().is_some());
        // Last part lands, but the completion call is rejected.
        let err = s.upload_part(1, b"data").await.unwrap_err();
        assert!(matches!(err, SessionError::FinalizeRejected));
        assert!(!s.is_finished());
        assert!(s.incomplete_parts().is_empty());

        // Any later upload_part goes straight to completion and succeeds.
        assert!(s.upload_part(0, b"data").await.unwrap().is_none());
        assert!(s.is_finished());
        assert_eq!(transport.complete_call_count(), 2);
    }

    #[tokio::test]
    async fn upload_after_finished_raises_already_finished() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 1);
        assert!(s.upload_part(0, b"data").await.unwrap().is_some());
        assert!(s.is_finished());

        let err = s.upload_part(0, b"data").await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyFinished));
        // The rejected retry never reached the backend again.
        assert_eq!(transport.part_call_count(), 1);
        assert_eq!(transport.complete_call_count(), 1);
    }

    #[tokio::test]
    async fn explicit_finalize_with_outstanding_parts_is_noop() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 3);
        s.finalize().await.unwrap();
        assert!(!s.is_finished());
        assert_eq!(transport.complete_call_count(), 0);
    }

    #[tokio::test]
    async fn second_finalize_raises() {
        let transport = Arc::new(MockTransport::default());
        let s = session(&transport, 1);
        assert!(s.upload_part(0, b"data").await.unwrap().is_some());
        let err = s.finalize().await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyFinished));
        assert_eq!(transport.complete_call_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_uploads_finalize_exactly_once() {
        let transport = Arc::new(MockTransport::default());
        let s = Arc::new(session(&transport, 10));

        let mut handles = vec![];
        for i in 0..10 {
            let s = Arc::clone(&s);
            handles.push(tokio::spawn(async move {
                s.upload_part(i, format!("part{i}").as_bytes()).await
            }));
        }

        for h in handles {
            match h.await.unwrap() {
                Ok(_) => {}
                // A caller that loses the completion race sees this; the
                // winner has already finished the session.
                Err(SessionError::AlreadyFinished) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert!(s.is_finished());
        assert!(s.incomplete_parts().is_empty());
        assert_eq!(transport.part_call_count(), 10);
        assert_eq!(transport.complete_call_count(), 1);
    }
}
