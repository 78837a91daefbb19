//! Record, collection, and domain types for the sync engine
//!
//! Every locally persisted item is a [`LocalRecord`]: a domain payload plus
//! the synchronization metadata the engine tracks per record. Records live in
//! exactly one [`Collection`], keyed by the entity's natural identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::StoreError;

/// Synchronization state of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Reconciled with the remote authority
    Synced,
    /// Awaiting remote confirmation
    Pending,
    /// Exists only in the local store
    LocalOnly,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::LocalOnly => "local_only",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, StoreError> {
        match s {
            "synced" => Ok(SyncStatus::Synced),
            "pending" => Ok(SyncStatus::Pending),
            "local_only" => Ok(SyncStatus::LocalOnly),
            _ => Err(StoreError::InvalidStatus(s.to_string())),
        }
    }
}

/// A domain payload wrapped with its synchronization metadata
///
/// Invariant: at most one record exists per (collection, id); upsert
/// replaces by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord<T> {
    /// Identifier, unique within the record's collection
    pub id: String,
    pub payload: T,
    pub sync_status: SyncStatus,
    pub last_synced_at: DateTime<Utc>,
}

/// The closed set of local collections
///
/// Each variant maps to one durable table. Collection membership is
/// determined solely by entity type, never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Questions,
    Categories,
    Assessments,
    Submissions,
    Reports,
    Organizations,
    Users,
    PendingReviewActions,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Questions,
        Collection::Categories,
        Collection::Assessments,
        Collection::Submissions,
        Collection::Reports,
        Collection::Organizations,
        Collection::Users,
        Collection::PendingReviewActions,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Questions => "questions",
            Collection::Categories => "categories",
            Collection::Assessments => "assessments",
            Collection::Submissions => "submissions",
            Collection::Reports => "reports",
            Collection::Organizations => "organizations",
            Collection::Users => "users",
            Collection::PendingReviewActions => "pending_review_actions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.table_name() == s)
            .ok_or_else(|| StoreError::UnknownCollection(s.to_string()))
    }
}

/// Per-collection outcome of one full sync pass
///
/// `errors` is non-aborting: a populated list for one collection never
/// prevents other collections from being attempted in the same pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub added: u64,
    pub updated: u64,
    pub errors: Vec<String>,
}

impl SyncResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            added: 0,
            updated: 0,
            errors: vec![message.into()],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Review state of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    UnderReview,
    Approved,
    Rejected,
    Reviewed,
}

impl ReviewStatus {
    /// Everything past `UnderReview` counts as a completed review.
    pub fn is_completed(&self) -> bool {
        !matches!(self, ReviewStatus::UnderReview)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub category_id: Option<String>,
    pub text: String,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub category_ids: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub assessment_id: String,
    pub organization_id: Option<String>,
    pub respondent: Option<String>,
    pub review_status: ReviewStatus,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub submission_id: String,
    pub reviewer: Option<String>,
    pub recommendations: Vec<CategoryRecommendation>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub roles: Vec<String>,
}

/// One reviewer recommendation against an assessment category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecommendation {
    pub category_id: String,
    pub recommendation: String,
}

/// A locally queued, not-yet-confirmed reviewer write
///
/// Created atomically with the optimistic UI update and never silently
/// dropped: it is either marked `synced` after confirmed remote acceptance
/// or remains `pending` indefinitely for later retry. `attempts` and
/// `last_error` record failed confirmation attempts without changing the
/// state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Client-generated identifier
    pub id: Uuid,
    /// The submission the review applies to
    pub target_id: String,
    pub payload: Vec<CategoryRecommendation>,
    /// Acting user identity
    pub reviewer: String,
    pub created_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
}

/// Caller-supplied fields for a new pending action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingActionInput {
    pub target_id: String,
    pub payload: Vec<CategoryRecommendation>,
    pub reviewer: String,
}

/// Aggregate review counts over the submissions collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    /// Submissions still under review
    pub pending: usize,
    /// Approved, rejected, or otherwise reviewed submissions
    pub completed: usize,
}

pub fn review_summary(submissions: &[LocalRecord<Submission>]) -> ReviewSummary {
    let mut summary = ReviewSummary::default();
    for record in submissions {
        if record.payload.review_status.is_completed() {
            summary.completed += 1;
        } else {
            summary.pending += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(id: &str, review_status: ReviewStatus) -> LocalRecord<Submission> {
        LocalRecord {
            id: id.to_string(),
            payload: Submission {
                id: id.to_string(),
                assessment_id: "a1".to_string(),
                organization_id: None,
                respondent: None,
                review_status,
                submitted_at: None,
            },
            sync_status: SyncStatus::Synced,
            last_synced_at: Utc::now(),
        }
    }

    #[test]
    fn test_review_summary_counts() {
        let submissions = vec![
            submission("s1", ReviewStatus::UnderReview),
            submission("s2", ReviewStatus::Approved),
            submission("s3", ReviewStatus::Rejected),
            submission("s4", ReviewStatus::Reviewed),
        ];

        let summary = review_summary(&submissions);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.completed, 3);
    }

    #[test]
    fn test_review_summary_empty() {
        assert_eq!(review_summary(&[]), ReviewSummary::default());
    }

    #[test]
    fn test_collection_name_roundtrip() {
        for collection in Collection::ALL {
            let parsed: Collection = collection.table_name().parse().unwrap();
            assert_eq!(parsed, collection);
        }
    }

    #[test]
    fn test_unknown_collection_rejected() {
        let err = "patients".parse::<Collection>().unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(name) if name == "patients"));
    }

    #[test]
    fn test_sync_status_roundtrip() {
        for status in [SyncStatus::Synced, SyncStatus::Pending, SyncStatus::LocalOnly] {
            assert_eq!(SyncStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(SyncStatus::from_str("done").is_err());
    }

    #[test]
    fn test_review_status_serde_shape() {
        let json = serde_json::to_string(&ReviewStatus::UnderReview).unwrap();
        assert_eq!(json, "\"under_review\"");
    }
}
