//! Offline-first synchronization engine for the Assess platform
//!
//! Provides:
//! - Local SQLite store with one table per collection and per-record sync
//!   status
//! - Pull-based full sync across role-eligible collections, single-flight
//!   guarded
//! - Pending review action queue with optimistic writes, retry, and
//!   reconnect reconciliation
//! - Connectivity and focus signals driving background sync triggers

pub mod config;
pub mod connectivity;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod queue;
pub mod remote;
pub mod session;
pub mod store;
pub mod transform;

pub use config::{OrchestratorConfig, RemoteConfig, StoreConfig};
pub use connectivity::{ConnectivityMonitor, FocusSignal};
pub use error::{QueueError, RemoteError, StoreError, TransformError};
pub use model::{
    review_summary, Collection, LocalRecord, PendingAction, PendingActionInput, ReviewStatus,
    ReviewSummary, SyncResult, SyncStatus,
};
pub use orchestrator::{eligible_collections, FullSyncReport, SyncOrchestrator};
pub use queue::{PendingActionQueue, ReconcileStats};
pub use remote::{HttpRemoteService, RemoteService};
pub use session::{SessionInfo, SessionProvider, StaticSession};
pub use store::{LocalStore, Upsert};

use std::sync::Arc;

/// Sync engine facade wiring the store, queue, and orchestrator together.
pub struct SyncEngine {
    store: Arc<LocalStore>,
    queue: PendingActionQueue,
    orchestrator: SyncOrchestrator,
}

impl SyncEngine {
    /// Open the local store and assemble the engine around the given
    /// collaborators.
    pub async fn new(
        store_config: StoreConfig,
        orchestrator_config: OrchestratorConfig,
        remote: Arc<dyn RemoteService>,
        session: Arc<dyn SessionProvider>,
        connectivity: ConnectivityMonitor,
        focus: FocusSignal,
    ) -> Result<Self, StoreError> {
        let store = Arc::new(LocalStore::new(store_config).await?);
        let queue = PendingActionQueue::new(Arc::clone(&store), Arc::clone(&remote));
        let orchestrator = SyncOrchestrator::new(
            Arc::clone(&store),
            remote,
            session,
            connectivity,
            focus,
            queue.clone(),
            orchestrator_config,
        );

        Ok(Self {
            store,
            queue,
            orchestrator,
        })
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn queue(&self) -> &PendingActionQueue {
        &self.queue
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ROLE_REVIEWER;
    use async_trait::async_trait;
    use tempfile::NamedTempFile;

    struct EmptyRemote;

    #[async_trait]
    impl RemoteService for EmptyRemote {
        async fn get_questions(&self) -> Result<Vec<remote::RemoteQuestion>, RemoteError> {
            Ok(vec![])
        }
        async fn get_categories(&self) -> Result<Vec<remote::RemoteCategory>, RemoteError> {
            Ok(vec![])
        }
        async fn get_assessments(&self) -> Result<Vec<remote::RemoteAssessment>, RemoteError> {
            Ok(vec![])
        }
        async fn get_submissions(&self) -> Result<Vec<remote::RemoteSubmission>, RemoteError> {
            Ok(vec![])
        }
        async fn get_reports(&self) -> Result<Vec<remote::RemoteReport>, RemoteError> {
            Ok(vec![])
        }
        async fn get_organizations(&self) -> Result<Vec<remote::RemoteOrganization>, RemoteError> {
            Ok(vec![])
        }
        async fn get_users(&self) -> Result<Vec<remote::RemoteUser>, RemoteError> {
            Ok(vec![])
        }
        async fn post_report(
            &self,
            _submission_id: &str,
            _recommendations: &[model::CategoryRecommendation],
        ) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_engine_creation() {
        let temp_file = NamedTempFile::new().unwrap();
        let store_config = StoreConfig {
            db_path: temp_file.path().to_str().unwrap().to_string(),
            ..StoreConfig::default()
        };

        let engine = SyncEngine::new(
            store_config,
            OrchestratorConfig::default(),
            Arc::new(EmptyRemote),
            Arc::new(StaticSession(SessionInfo::authenticated([ROLE_REVIEWER]))),
            ConnectivityMonitor::default(),
            FocusSignal::default(),
        )
        .await
        .unwrap();

        assert!(!engine.orchestrator().is_currently_syncing());
        assert_eq!(engine.store().count(Collection::Questions).await.unwrap(), 0);

        let report = engine.orchestrator().perform_full_sync().await;
        assert_eq!(report.len(), 5);
        assert!(engine.queue().list_pending().await.unwrap().is_empty());
    }
}
