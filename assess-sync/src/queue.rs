//! Pending action queue
//!
//! Buffers reviewer writes made while disconnected (or before the remote
//! confirms acceptance) and replays them idempotently. An action moves
//! `pending -> synced` and nowhere else; a failed submission attempt keeps
//! it `pending` with the failure recorded. There is no failed terminal
//! state.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{QueueError, StoreError};
use crate::model::{Collection, LocalRecord, PendingAction, PendingActionInput, SyncStatus};
use crate::remote::RemoteService;
use crate::store::LocalStore;

const QUEUE_COLLECTION: Collection = Collection::PendingReviewActions;

/// Outcome of one reconnect reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Actions the remote had already processed; marked synced without
    /// re-sending.
    pub confirmed: usize,
    /// Actions re-submitted and accepted.
    pub resubmitted: usize,
    /// Actions that could not be confirmed and remain queued.
    pub still_pending: usize,
}

/// Queue of locally created, not-yet-confirmed reviewer actions.
#[derive(Clone)]
pub struct PendingActionQueue {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteService>,
}

impl PendingActionQueue {
    pub fn new(store: Arc<LocalStore>, remote: Arc<dyn RemoteService>) -> Self {
        Self { store, remote }
    }

    /// Create and persist a new `pending` entry, returning it immediately so
    /// the caller can render it optimistically before any network call.
    pub async fn enqueue(&self, input: PendingActionInput) -> Result<PendingAction, StoreError> {
        let action = PendingAction {
            id: Uuid::new_v4(),
            target_id: input.target_id,
            payload: input.payload,
            reviewer: input.reviewer,
            created_at: Utc::now(),
            sync_status: SyncStatus::Pending,
            attempts: 0,
            last_error: None,
        };

        self.persist(&action).await?;

        tracing::debug!(
            action_id = %action.id,
            target_id = %action.target_id,
            reviewer = %action.reviewer,
            "queued review action"
        );

        Ok(action)
    }

    /// Send the action's payload to the remote endpoint. On success the
    /// stored entry is marked `synced`; on failure it stays `pending` with
    /// the attempt recorded, and the error is returned for a user-visible
    /// notification.
    pub async fn attempt_submit(
        &self,
        action: &PendingAction,
    ) -> Result<PendingAction, QueueError> {
        match self
            .remote
            .post_report(&action.target_id, &action.payload)
            .await
        {
            Ok(()) => {
                let confirmed = PendingAction {
                    sync_status: SyncStatus::Synced,
                    last_error: None,
                    ..action.clone()
                };
                self.persist(&confirmed).await?;

                tracing::debug!(action_id = %confirmed.id, "review action confirmed");
                Ok(confirmed)
            }
            Err(e) => {
                let failed = PendingAction {
                    attempts: action.attempts + 1,
                    last_error: Some(e.to_string()),
                    ..action.clone()
                };
                self.persist(&failed).await?;

                tracing::warn!(
                    action_id = %failed.id,
                    attempts = failed.attempts,
                    error = %e,
                    "review action submission failed; kept pending"
                );
                Err(QueueError::Submit(e))
            }
        }
    }

    /// Reconcile queued actions after connectivity returns.
    ///
    /// Re-sending blindly risks duplicate remote side effects when the
    /// original attempt succeeded server-side but the confirmation was lost,
    /// so each pending action is first checked against the remote reports
    /// collection: if a report for its target already exists, the action is
    /// marked `synced` without re-sending; otherwise it is re-submitted.
    pub async fn reconcile_on_reconnect(&self) -> Result<ReconcileStats, StoreError> {
        let pending = self.list_pending().await?;
        if pending.is_empty() {
            return Ok(ReconcileStats::default());
        }

        let processed: BTreeSet<String> = match self.remote.get_reports().await {
            Ok(reports) => reports
                .into_iter()
                .filter_map(|report| report.submission_id)
                .collect(),
            Err(e) => {
                // Without the report list nothing can be confirmed; fall
                // through and re-submit everything.
                tracing::warn!(error = %e, "could not fetch reports for reconciliation");
                BTreeSet::new()
            }
        };

        let mut stats = ReconcileStats::default();
        for action in pending {
            if processed.contains(&action.target_id) {
                let confirmed = PendingAction {
                    sync_status: SyncStatus::Synced,
                    last_error: None,
                    ..action
                };
                self.persist(&confirmed).await?;
                stats.confirmed += 1;
            } else {
                match self.attempt_submit(&action).await {
                    Ok(_) => stats.resubmitted += 1,
                    Err(QueueError::Store(e)) => return Err(e),
                    Err(QueueError::Submit(_)) => stats.still_pending += 1,
                }
            }
        }

        tracing::info!(
            confirmed = stats.confirmed,
            resubmitted = stats.resubmitted,
            still_pending = stats.still_pending,
            "reconciled pending actions after reconnect"
        );

        Ok(stats)
    }

    /// All `pending` actions in creation order, for the "N pending sync"
    /// indicator and reconciliation.
    pub async fn list_pending(&self) -> Result<Vec<PendingAction>, StoreError> {
        let records: Vec<LocalRecord<PendingAction>> = self
            .store
            .query_by_status(QUEUE_COLLECTION, SyncStatus::Pending)
            .await?;

        let mut actions: Vec<PendingAction> =
            records.into_iter().map(|record| record.payload).collect();
        actions.sort_by_key(|action| action.created_at);
        Ok(actions)
    }

    /// Persist the action, keeping the record wrapper's status in lockstep
    /// with the action's own.
    async fn persist(&self, action: &PendingAction) -> Result<(), StoreError> {
        let last_synced_at = match action.sync_status {
            SyncStatus::Synced => Utc::now(),
            _ => action.created_at,
        };
        let record = LocalRecord {
            id: action.id.to_string(),
            payload: action.clone(),
            sync_status: action.sync_status,
            last_synced_at,
        };
        self.store.upsert(QUEUE_COLLECTION, &record).await?;
        Ok(())
    }
}
