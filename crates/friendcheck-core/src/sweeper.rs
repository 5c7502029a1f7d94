//! Retention sweeper.
//!
//! Keeps the number of live collections bounded. Each run lists every
//! collection, keeps the first `floor` in listing order and deletes the
//! rest concurrently. The run returns as soon as one deletion succeeds;
//! the others keep going in the background and anything left over is
//! picked up by the next run.

use crate::backend::{BackendError, RecognitionBackend};
use crate::types::CollectionId;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Below this many live collections a run does nothing.
pub const DEFAULT_RETENTION_FLOOR: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub floor: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            floor: DEFAULT_RETENTION_FLOOR,
        }
    }
}

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("failed to list collections: {0}")]
    List(#[source] BackendError),
    #[error("all {attempted} collection deletions failed; last error: {last}")]
    AllDeletionsFailed {
        attempted: usize,
        #[source]
        last: BackendError,
    },
}

type Deletion = (CollectionId, Result<(), BackendError>);

/// Deletions still in flight when a run returned.
///
/// Dropping this detaches them; they run to completion on the runtime.
#[derive(Default)]
pub struct Stragglers {
    pending: FuturesUnordered<JoinHandle<Deletion>>,
}

/// Final outcome of straggler deletions.
#[derive(Debug, Default)]
pub struct SettledDeletions {
    pub deleted: Vec<CollectionId>,
    pub failed: Vec<(Option<CollectionId>, BackendError)>,
}

impl Stragglers {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for every remaining deletion.
    pub async fn settle(mut self) -> SettledDeletions {
        let mut settled = SettledDeletions::default();
        while let Some(joined) = self.pending.next().await {
            match joined {
                Ok((id, Ok(()))) => settled.deleted.push(id),
                Ok((id, Err(e))) => settled.failed.push((Some(id), e)),
                Err(e) => settled
                    .failed
                    .push((None, BackendError::Transport(format!("deletion task: {e}")))),
            }
        }
        settled
    }
}

/// Result of a successful run.
pub struct SweepReport {
    /// Collections seen in the listing.
    pub listed: usize,
    /// Collections left alone.
    pub kept: usize,
    /// Collections a deletion was issued for, in listing order.
    pub scheduled: Vec<CollectionId>,
    /// First deletion confirmed; `None` when nothing was scheduled.
    pub first_deleted: Option<CollectionId>,
    /// Deletions that had already failed when the run returned.
    pub failed_early: usize,
    pub stragglers: Stragglers,
}

impl SweepReport {
    fn idle(listed: usize) -> Self {
        Self {
            listed,
            kept: listed,
            scheduled: Vec::new(),
            first_deleted: None,
            failed_early: 0,
            stragglers: Stragglers::default(),
        }
    }
}

pub struct Sweeper {
    backend: Arc<dyn RecognitionBackend>,
    policy: RetentionPolicy,
}

impl Sweeper {
    pub fn new(backend: Arc<dyn RecognitionBackend>, policy: RetentionPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Run one sweep.
    pub async fn run(&self) -> Result<SweepReport, SweepError> {
        let mut ids = self
            .backend
            .list_collections()
            .await
            .map_err(SweepError::List)?;
        let listed = ids.len();
        let floor = self.policy.floor;

        if listed < floor {
            tracing::info!(listed, floor, "fewer collections than the floor; no cleanup done");
            return Ok(SweepReport::idle(listed));
        }

        let excess = ids.split_off(floor);
        if excess.is_empty() {
            tracing::info!(listed, floor, "no collections beyond the floor");
            return Ok(SweepReport::idle(listed));
        }

        tracing::info!(listed, kept = floor, deleting = excess.len(), "sweeping collections");

        let mut pending: FuturesUnordered<JoinHandle<Deletion>> = excess
            .iter()
            .cloned()
            .map(|id| {
                let backend = Arc::clone(&self.backend);
                tokio::spawn(async move {
                    let result = backend.delete_collection(&id).await;
                    (id, result)
                })
            })
            .collect();

        let attempted = excess.len();
        let mut failed_early = 0;
        let mut last_error = None;

        while let Some(joined) = pending.next().await {
            match joined {
                Ok((id, Ok(()))) => {
                    tracing::info!(
                        collection = %id,
                        outstanding = pending.len(),
                        "collection deleted; not waiting for the rest"
                    );
                    return Ok(SweepReport {
                        listed,
                        kept: floor,
                        scheduled: excess,
                        first_deleted: Some(id),
                        failed_early,
                        stragglers: Stragglers { pending },
                    });
                }
                Ok((id, Err(e))) => {
                    tracing::warn!(collection = %id, error = %e, "collection deletion failed");
                    failed_early += 1;
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "deletion task did not complete");
                    failed_early += 1;
                    last_error = Some(BackendError::Transport(format!("deletion task: {e}")));
                }
            }
        }

        let last = last_error.unwrap_or_else(|| {
            BackendError::Transport("no deletion outcome observed".to_string())
        });
        tracing::error!(attempted, error = %last, "every deletion failed");
        Err(SweepError::AllDeletionsFailed { attempted, last })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CollectionPage;
    use crate::testing::{ids, StubBackend};
    use std::time::Duration;

    fn sweeper(backend: &Arc<StubBackend>) -> Sweeper {
        Sweeper::new(backend.clone(), RetentionPolicy::default())
    }

    #[tokio::test]
    async fn test_below_floor_deletes_nothing() {
        let backend = Arc::new(StubBackend::default().with_collections(ids(4)));
        let report = sweeper(&backend).run().await.unwrap();
        assert_eq!(report.listed, 4);
        assert_eq!(report.kept, 4);
        assert!(report.scheduled.is_empty());
        assert!(backend.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_exactly_floor_deletes_nothing() {
        let backend = Arc::new(StubBackend::default().with_collections(ids(5)));
        let report = sweeper(&backend).run().await.unwrap();
        assert!(report.first_deleted.is_none());
        assert!(backend.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_seven_collections_two_deletes() {
        let backend = Arc::new(StubBackend::default().with_collections(ids(7)));
        let report = sweeper(&backend).run().await.unwrap();
        assert_eq!(report.kept, 5);
        assert_eq!(report.scheduled, ids(7)[5..].to_vec());
        assert!(report.first_deleted.is_some());

        let settled = report.stragglers.settle().await;
        assert!(settled.failed.is_empty());

        let mut deleted = backend.deleted();
        deleted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(deleted, ids(7)[5..].to_vec());
    }

    #[tokio::test]
    async fn test_all_deletions_failed() {
        let backend = Arc::new(
            StubBackend::default()
                .with_collections(ids(7))
                .failing_delete("c5")
                .failing_delete("c6"),
        );
        match sweeper(&backend).run().await {
            Err(SweepError::AllDeletionsFailed { attempted, last }) => {
                assert_eq!(attempted, 2);
                assert_eq!(last.code(), Some("ResourceNotFoundException"));
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected failure"),
        }
        assert_eq!(backend.deleted().len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_is_success() {
        let backend = Arc::new(
            StubBackend::default()
                .with_collections(ids(8))
                .failing_delete("c5")
                .failing_delete("c7"),
        );
        let report = sweeper(&backend).run().await.unwrap();
        assert_eq!(report.first_deleted.as_ref().map(|id| id.as_str()), Some("c6"));

        let settled = report.stragglers.settle().await;
        assert_eq!(report.failed_early + settled.failed.len(), 2);
    }

    #[tokio::test]
    async fn test_returns_without_waiting_for_stragglers() {
        let backend = Arc::new(
            StubBackend::default()
                .with_collections(ids(7))
                .hanging_delete("c5"),
        );
        let report = tokio::time::timeout(Duration::from_secs(5), sweeper(&backend).run())
            .await
            .expect("sweep must not wait on the hanging deletion")
            .unwrap();
        assert_eq!(report.first_deleted.as_ref().map(|id| id.as_str()), Some("c6"));
        assert_eq!(report.stragglers.len(), 1);
    }

    #[tokio::test]
    async fn test_list_failure_aborts() {
        let backend = Arc::new(StubBackend::default().failing_list());
        assert!(matches!(
            sweeper(&backend).run().await,
            Err(SweepError::List(_))
        ));
        assert!(backend.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_listing_pages_are_aggregated_in_order() {
        let all = ids(7);
        let pages = vec![
            CollectionPage {
                ids: all[0..3].to_vec(),
                next_token: Some("1".into()),
            },
            CollectionPage {
                ids: all[3..6].to_vec(),
                next_token: Some("2".into()),
            },
            CollectionPage {
                ids: all[6..].to_vec(),
                next_token: None,
            },
        ];
        let backend = Arc::new(StubBackend::default().with_pages(pages));
        let report = sweeper(&backend).run().await.unwrap();
        assert_eq!(report.listed, 7);
        assert_eq!(report.scheduled, all[5..].to_vec());
        report.stragglers.settle().await;
        assert_eq!(backend.deleted().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_token_is_list_error() {
        let pages = vec![
            CollectionPage {
                ids: ids(2),
                next_token: Some("1".into()),
            },
            CollectionPage {
                ids: ids(2),
                next_token: Some("1".into()),
            },
        ];
        let backend = Arc::new(StubBackend::default().with_pages(pages));
        assert!(matches!(
            sweeper(&backend).run().await,
            Err(SweepError::List(BackendError::MalformedResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_custom_floor() {
        let backend = Arc::new(StubBackend::default().with_collections(ids(3)));
        let report = Sweeper::new(backend.clone(), RetentionPolicy { floor: 1 })
            .run()
            .await
            .unwrap();
        assert_eq!(report.scheduled.len(), 2);
        report.stragglers.settle().await;
        assert_eq!(backend.deleted().len(), 2);
    }
}
