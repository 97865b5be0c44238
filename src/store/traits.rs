//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;

/// A submission record handed over by a completed wizard.
#[derive(Debug, Clone)]
pub struct StoredSubmission {
    pub id: Uuid,
    pub user_id: String,
    pub record: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic database trait covering settings slots and submissions.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Settings ────────────────────────────────────────────────────

    /// Read a JSON setting. Stored text that is not valid JSON reads as `Null`.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a JSON setting.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a setting. Returns whether a row was removed.
    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError>;

    // ── Submissions ─────────────────────────────────────────────────

    /// Insert a finished submission record.
    async fn insert_submission(&self, submission: &StoredSubmission) -> Result<(), DatabaseError>;

    /// Get a submission by ID.
    async fn get_submission(&self, id: Uuid) -> Result<Option<StoredSubmission>, DatabaseError>;
}
