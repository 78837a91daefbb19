//! Wire-to-local mapping
//!
//! One pure function per entity type. Each transform is deterministic and
//! total over well-formed input, stamping the produced record as `synced`
//! (data just pulled from the authority is by definition reconciled) with
//! `last_synced_at` set to the moment of transformation. Malformed input
//! fails with a [`TransformError`] the orchestrator captures as a
//! per-collection error string.

use chrono::Utc;

use crate::error::TransformError;
use crate::model::{
    Assessment, Category, LocalRecord, Organization, Question, Report, ReviewStatus, Submission,
    SyncStatus, UserAccount,
};
use crate::remote::{
    RemoteAssessment, RemoteCategory, RemoteOrganization, RemoteQuestion, RemoteReport,
    RemoteSubmission, RemoteUser,
};

fn require_id(entity: &'static str, id: Option<String>) -> Result<String, TransformError> {
    match id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(TransformError::MissingId { entity }),
    }
}

fn synced<T>(id: String, payload: T) -> LocalRecord<T> {
    LocalRecord {
        id,
        payload,
        sync_status: SyncStatus::Synced,
        last_synced_at: Utc::now(),
    }
}

pub fn question(remote: RemoteQuestion) -> Result<LocalRecord<Question>, TransformError> {
    let id = require_id("question", remote.id)?;
    Ok(synced(
        id.clone(),
        Question {
            id,
            category_id: remote.category_id,
            text: remote.text.unwrap_or_default(),
            weight: remote.weight,
        },
    ))
}

pub fn category(remote: RemoteCategory) -> Result<LocalRecord<Category>, TransformError> {
    let id = require_id("category", remote.id)?;
    Ok(synced(
        id.clone(),
        Category {
            id,
            name: remote.name.unwrap_or_default(),
            description: remote.description,
        },
    ))
}

pub fn assessment(remote: RemoteAssessment) -> Result<LocalRecord<Assessment>, TransformError> {
    let id = require_id("assessment", remote.id)?;
    Ok(synced(
        id.clone(),
        Assessment {
            id,
            title: remote.title.unwrap_or_default(),
            category_ids: remote.category_ids,
            active: remote.active.unwrap_or(true),
        },
    ))
}

pub fn submission(remote: RemoteSubmission) -> Result<LocalRecord<Submission>, TransformError> {
    let id = require_id("submission", remote.id)?;
    Ok(synced(
        id.clone(),
        Submission {
            id,
            assessment_id: remote.assessment_id.unwrap_or_default(),
            organization_id: remote.organization_id,
            respondent: remote.respondent,
            review_status: remote.review_status.unwrap_or(ReviewStatus::UnderReview),
            submitted_at: remote.submitted_at,
        },
    ))
}

pub fn report(remote: RemoteReport) -> Result<LocalRecord<Report>, TransformError> {
    let id = require_id("report", remote.id)?;
    // A report that cannot be tied back to a submission is unusable for
    // reconciliation, so the link is required.
    let submission_id = remote.submission_id.filter(|s| !s.is_empty()).ok_or(
        TransformError::MissingField {
            entity: "report",
            id: id.clone(),
            field: "submission_id",
        },
    )?;
    Ok(synced(
        id.clone(),
        Report {
            id,
            submission_id,
            reviewer: remote.reviewer,
            recommendations: remote.recommendations,
            created_at: remote.created_at,
        },
    ))
}

pub fn organization(
    remote: RemoteOrganization,
) -> Result<LocalRecord<Organization>, TransformError> {
    let id = require_id("organization", remote.id)?;
    Ok(synced(
        id.clone(),
        Organization {
            id,
            name: remote.name.unwrap_or_default(),
        },
    ))
}

pub fn user(remote: RemoteUser) -> Result<LocalRecord<UserAccount>, TransformError> {
    let id = require_id("user", remote.id)?;
    Ok(synced(
        id.clone(),
        UserAccount {
            id,
            email: remote.email.unwrap_or_default(),
            roles: remote.roles,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_is_stamped_synced() {
        let record = question(RemoteQuestion {
            id: Some("q1".to_string()),
            category_id: Some("c1".to_string()),
            text: Some("Is access logged?".to_string()),
            weight: None,
        })
        .unwrap();

        assert_eq!(record.id, "q1");
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert_eq!(record.payload.text, "Is access logged?");
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let err = question(RemoteQuestion {
            id: None,
            category_id: None,
            text: None,
            weight: None,
        })
        .unwrap_err();

        assert_eq!(err, TransformError::MissingId { entity: "question" });

        let err = question(RemoteQuestion {
            id: Some(String::new()),
            category_id: None,
            text: None,
            weight: None,
        })
        .unwrap_err();
        assert_eq!(err, TransformError::MissingId { entity: "question" });
    }

    #[test]
    fn test_report_requires_submission_link() {
        let err = report(RemoteReport {
            id: Some("r1".to_string()),
            submission_id: None,
            reviewer: None,
            recommendations: vec![],
            created_at: None,
        })
        .unwrap_err();

        assert!(matches!(err, TransformError::MissingField { field: "submission_id", .. }));
    }

    #[test]
    fn test_submission_defaults_to_under_review() {
        let record = submission(RemoteSubmission {
            id: Some("s1".to_string()),
            assessment_id: Some("a1".to_string()),
            organization_id: None,
            respondent: None,
            review_status: None,
            submitted_at: None,
        })
        .unwrap();

        assert_eq!(record.payload.review_status, ReviewStatus::UnderReview);
    }
}
