//! Remote service boundary
//!
//! The engine consumes the remote API through the [`RemoteService`] trait:
//! one fetch operation per collection plus the report submission endpoint.
//! [`HttpRemoteService`] is the production implementation; tests substitute
//! in-process fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::model::{CategoryRecommendation, ReviewStatus};

/// Wire shape of a question as returned by the remote API.
///
/// Identifiers are optional on the wire; the transformation layer validates
/// their presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteQuestion {
    pub id: Option<String>,
    pub category_id: Option<String>,
    pub text: Option<String>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCategory {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAssessment {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSubmission {
    pub id: Option<String>,
    pub assessment_id: Option<String>,
    pub organization_id: Option<String>,
    pub respondent: Option<String>,
    pub review_status: Option<ReviewStatus>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReport {
    pub id: Option<String>,
    pub submission_id: Option<String>,
    pub reviewer: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<CategoryRecommendation>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOrganization {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The remote authority the engine pulls from and submits to.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn get_questions(&self) -> Result<Vec<RemoteQuestion>, RemoteError>;
    async fn get_categories(&self) -> Result<Vec<RemoteCategory>, RemoteError>;
    async fn get_assessments(&self) -> Result<Vec<RemoteAssessment>, RemoteError>;
    async fn get_submissions(&self) -> Result<Vec<RemoteSubmission>, RemoteError>;
    async fn get_reports(&self) -> Result<Vec<RemoteReport>, RemoteError>;
    async fn get_organizations(&self) -> Result<Vec<RemoteOrganization>, RemoteError>;
    async fn get_users(&self) -> Result<Vec<RemoteUser>, RemoteError>;

    /// Submit a reviewer's recommendations for a submission.
    async fn post_report(
        &self,
        submission_id: &str,
        recommendations: &[CategoryRecommendation],
    ) -> Result<(), RemoteError>;
}

#[derive(Serialize)]
struct PostReportBody<'a> {
    recommendations: &'a [CategoryRecommendation],
}

/// HTTP implementation of [`RemoteService`]
pub struct HttpRemoteService {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpRemoteService {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                endpoint: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn get_questions(&self) -> Result<Vec<RemoteQuestion>, RemoteError> {
        self.get_json("questions").await
    }

    async fn get_categories(&self) -> Result<Vec<RemoteCategory>, RemoteError> {
        self.get_json("categories").await
    }

    async fn get_assessments(&self) -> Result<Vec<RemoteAssessment>, RemoteError> {
        self.get_json("assessments").await
    }

    async fn get_submissions(&self) -> Result<Vec<RemoteSubmission>, RemoteError> {
        self.get_json("submissions").await
    }

    async fn get_reports(&self) -> Result<Vec<RemoteReport>, RemoteError> {
        self.get_json("reports").await
    }

    async fn get_organizations(&self) -> Result<Vec<RemoteOrganization>, RemoteError> {
        self.get_json("organizations").await
    }

    async fn get_users(&self) -> Result<Vec<RemoteUser>, RemoteError> {
        self.get_json("users").await
    }

    async fn post_report(
        &self,
        submission_id: &str,
        recommendations: &[CategoryRecommendation],
    ) -> Result<(), RemoteError> {
        let path = format!("submissions/{submission_id}/reports");
        let mut request = self
            .client
            .post(self.url(&path))
            .json(&PostReportBody { recommendations });
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                endpoint: path,
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let service = HttpRemoteService::new(RemoteConfig {
            base_url: "http://example.test/api/v1/".to_string(),
            ..RemoteConfig::default()
        })
        .unwrap();

        assert_eq!(service.url("questions"), "http://example.test/api/v1/questions");
    }

    #[test]
    fn test_wire_shapes_tolerate_missing_fields() {
        let question: RemoteQuestion = serde_json::from_str("{}").unwrap();
        assert!(question.id.is_none());

        let report: RemoteReport =
            serde_json::from_str(r#"{"id": "r1", "submission_id": "s1"}"#).unwrap();
        assert!(report.recommendations.is_empty());
    }
}
