//! SubmissionService: the "create submission" operation a finished draft
//! is handed to.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SubmissionError;
use crate::store::{Database, StoredSubmission};

use super::model::SubmissionDraft;

/// Acknowledgement of a created submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Creates a submission record from a completed draft.
#[async_trait]
pub trait SubmissionService: Send + Sync {
    async fn create_submission(
        &self,
        draft: &SubmissionDraft,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Posts the draft as JSON to the hosted backend.
pub struct HttpSubmissionService {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
}

impl HttpSubmissionService {
    pub fn new(url: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
        }
    }
}

/// Fields of the endpoint's reply we care about.
#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: serde_json::Value,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl SubmissionService for HttpSubmissionService {
    async fn create_submission(
        &self,
        draft: &SubmissionDraft,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut request = self.client.post(&self.url).json(draft);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedResponse = resp
            .json()
            .await
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))?;

        let id = match created.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(SubmissionError::InvalidResponse(format!(
                    "unexpected id: {other}"
                )));
            }
        };

        tracing::info!(submission_id = %id, url = %self.url, "Submission created");
        Ok(SubmissionReceipt {
            id,
            created_at: created.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Writes the draft into the local `submissions` table.
pub struct StoreSubmissionService {
    db: Arc<dyn Database>,
    user_id: String,
}

impl StoreSubmissionService {
    pub fn new(db: Arc<dyn Database>, user_id: impl Into<String>) -> Self {
        Self {
            db,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl SubmissionService for StoreSubmissionService {
    async fn create_submission(
        &self,
        draft: &SubmissionDraft,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let record = serde_json::to_value(draft)
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))?;
        let submission = StoredSubmission {
            id: Uuid::new_v4(),
            user_id: self.user_id.clone(),
            record,
            created_at: Utc::now(),
        };
        self.db.insert_submission(&submission).await?;

        tracing::info!(submission_id = %submission.id, "Submission stored locally");
        Ok(SubmissionReceipt {
            id: submission.id.to_string(),
            created_at: submission.created_at,
        })
    }
}
