//! Full-sync orchestration
//!
//! Drives one "full sync" pass: for each collection the current session is
//! eligible for, fetch from the remote service, transform, and upsert into
//! the local store, collecting a per-collection [`SyncResult`]. Collections
//! are independent units of work; one collection's failure never stops the
//! others, and there is no fatal error path inside a pass.
//!
//! A single-flight guard serializes overlapping passes: the losing caller
//! observes an all-zero no-op result and no second network round-trip is
//! made. Background triggers (periodic interval, reconnect, window focus)
//! are owned by the orchestrator's own `start`/`stop` lifecycle, not by the
//! consuming UI.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::OrchestratorConfig;
use crate::connectivity::{ConnectivityMonitor, FocusSignal};
use crate::error::{RemoteError, TransformError};
use crate::model::{Collection, LocalRecord, SyncResult};
use crate::queue::PendingActionQueue;
use crate::remote::RemoteService;
use crate::session::{SessionInfo, SessionProvider, ROLE_ADMIN};
use crate::store::{LocalStore, Upsert};
use crate::transform;

/// Result map of one full sync pass, keyed by collection.
pub type FullSyncReport = BTreeMap<Collection, SyncResult>;

/// Metadata key recording the completion time of the latest full pass.
pub const META_LAST_FULL_SYNC: &str = "last_full_sync_at";

/// Collections every authenticated session syncs.
const STANDARD_COLLECTIONS: [Collection; 5] = [
    Collection::Questions,
    Collection::Categories,
    Collection::Assessments,
    Collection::Submissions,
    Collection::Reports,
];

/// Additional collections per role. New roles are additive entries here.
const ROLE_COLLECTIONS: [(&str, &[Collection]); 1] = [(
    ROLE_ADMIN,
    &[Collection::Organizations, Collection::Users],
)];

/// The collection set a session is eligible to sync, in fetch order.
pub fn eligible_collections(session: &SessionInfo) -> Vec<Collection> {
    let mut collections = STANDARD_COLLECTIONS.to_vec();
    for (role, extra) in ROLE_COLLECTIONS {
        if session.has_role(role) {
            collections.extend_from_slice(extra);
        }
    }
    collections
}

/// Clears the in-flight flag when the pass ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Pulls authoritative collections into the local store.
#[derive(Clone)]
pub struct SyncOrchestrator {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteService>,
    session: Arc<dyn SessionProvider>,
    connectivity: ConnectivityMonitor,
    focus: FocusSignal,
    queue: PendingActionQueue,
    config: OrchestratorConfig,
    in_flight: Arc<AtomicBool>,
    runner: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteService>,
        session: Arc<dyn SessionProvider>,
        connectivity: ConnectivityMonitor,
        focus: FocusSignal,
        queue: PendingActionQueue,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            remote,
            session,
            connectivity,
            focus,
            queue,
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
            runner: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a sync pass is currently in flight, for UI indicators.
    pub fn is_currently_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run one full sync pass across all eligible collections.
    ///
    /// Short-circuits with an all-zero result map, without touching the
    /// network, when the device is offline, the session is unauthenticated,
    /// or another pass is already in flight.
    pub async fn perform_full_sync(&self) -> FullSyncReport {
        let session = self.session.session();
        let eligible = eligible_collections(&session);

        if !self.connectivity.is_online() {
            tracing::debug!("skipping sync pass: offline");
            return Self::zero_report(&eligible);
        }

        if !session.is_authenticated {
            tracing::debug!("skipping sync pass: unauthenticated");
            return Self::zero_report(&eligible);
        }

        let _guard = match InFlightGuard::acquire(&self.in_flight) {
            Some(guard) => guard,
            None => {
                tracing::debug!("skipping sync pass: already in flight");
                return Self::zero_report(&eligible);
            }
        };

        tracing::info!(collections = eligible.len(), "starting full sync pass");

        let mut report = FullSyncReport::new();
        for collection in eligible {
            let result = self.sync_collection(collection).await;
            tracing::debug!(
                collection = %collection,
                added = result.added,
                updated = result.updated,
                errors = result.errors.len(),
                "collection sync finished"
            );
            report.insert(collection, result);
        }

        if let Err(e) = self
            .store
            .set_meta(META_LAST_FULL_SYNC, &Utc::now().to_rfc3339())
            .await
        {
            tracing::warn!(error = %e, "failed to record sync timestamp");
        }

        report
    }

    /// Sync a single collection. Never propagates an error: fetch and
    /// transform failures are captured in the returned result.
    pub(crate) async fn sync_collection(&self, collection: Collection) -> SyncResult {
        match collection {
            Collection::Questions => {
                self.pull(collection, self.remote.get_questions().await, transform::question)
                    .await
            }
            Collection::Categories => {
                self.pull(collection, self.remote.get_categories().await, transform::category)
                    .await
            }
            Collection::Assessments => {
                self.pull(
                    collection,
                    self.remote.get_assessments().await,
                    transform::assessment,
                )
                .await
            }
            Collection::Submissions => {
                self.pull(
                    collection,
                    self.remote.get_submissions().await,
                    transform::submission,
                )
                .await
            }
            Collection::Reports => {
                self.pull(collection, self.remote.get_reports().await, transform::report)
                    .await
            }
            Collection::Organizations => {
                self.pull(
                    collection,
                    self.remote.get_organizations().await,
                    transform::organization,
                )
                .await
            }
            Collection::Users => {
                self.pull(collection, self.remote.get_users().await, transform::user)
                    .await
            }
            // Locally sourced; never pulled from the remote.
            Collection::PendingReviewActions => SyncResult::default(),
        }
    }

    /// Transform-then-upsert each fetched item, preserving remote order.
    /// A fetch failure fails the whole collection for this pass; a transform
    /// failure is recorded per item and the remaining items still apply.
    async fn pull<W, T, F>(
        &self,
        collection: Collection,
        fetched: Result<Vec<W>, RemoteError>,
        transform_one: F,
    ) -> SyncResult
    where
        T: Serialize,
        F: Fn(W) -> Result<LocalRecord<T>, TransformError>,
    {
        let items = match fetched {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "fetch failed");
                return SyncResult::failed(e.to_string());
            }
        };

        let mut result = SyncResult::default();
        for item in items {
            let record = match transform_one(item) {
                Ok(record) => record,
                Err(e) => {
                    result.errors.push(e.to_string());
                    continue;
                }
            };
            match self.store.upsert(collection, &record).await {
                Ok(Upsert::Inserted) => result.added += 1,
                Ok(Upsert::Replaced) => result.updated += 1,
                Err(e) => result.errors.push(e.to_string()),
            }
        }
        result
    }

    /// Start the background triggers: an immediate pass (mount), a periodic
    /// interval, reconnect, and window focus. Idempotent while running.
    pub async fn start(&self) {
        let mut runner = self.runner.lock().await;
        if runner.is_some() {
            return;
        }

        let orchestrator = self.clone();
        let handle = tokio::spawn(async move { orchestrator.run().await });
        *runner = Some(handle);

        tracing::info!(
            interval_secs = self.config.sync_interval_secs,
            "sync orchestrator started"
        );
    }

    /// Tear down the background task and its timer/listener subscriptions.
    pub async fn stop(&self) {
        if let Some(handle) = self.runner.lock().await.take() {
            handle.abort();
            tracing::info!("sync orchestrator stopped");
        }
    }

    async fn run(&self) {
        let mut online = self.connectivity.subscribe();
        let mut focus = self.focus.subscribe();
        // The first tick completes immediately, which doubles as the
        // on-mount pass.
        let mut ticker = tokio::time::interval(self.config.sync_interval());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.perform_full_sync().await;
                }
                changed = online.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *online.borrow_and_update() {
                        tracing::info!("connectivity restored");
                        if let Err(e) = self.queue.reconcile_on_reconnect().await {
                            tracing::warn!(error = %e, "reconnect reconciliation failed");
                        }
                        self.perform_full_sync().await;
                    }
                }
                changed = focus.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    focus.borrow_and_update();
                    self.perform_full_sync().await;
                }
            }
        }
    }

    fn zero_report(eligible: &[Collection]) -> FullSyncReport {
        eligible
            .iter()
            .map(|collection| (*collection, SyncResult::default()))
            .collect()
    }
}
