//! SubmissionStore: the accumulated draft and completion flags, written
//! through to progress persistence on every change.

use std::sync::Arc;

use crate::error::PersistenceError;

use super::model::{FieldMap, ProgressSnapshot, ProgressState, SubmissionDraft};
use super::persistence::ProgressPersistence;
use super::steps::StepId;
use super::validator;

/// Draft and progress for one wizard session.
pub struct SubmissionStore {
    draft: SubmissionDraft,
    progress: ProgressState,
    persistence: Arc<dyn ProgressPersistence>,
}

impl SubmissionStore {
    /// An empty store. Nothing is written until the first merge.
    pub fn empty(persistence: Arc<dyn ProgressPersistence>) -> Self {
        Self {
            draft: SubmissionDraft::new(),
            progress: ProgressState::default(),
            persistence,
        }
    }

    /// Restore the store from the persisted snapshot.
    ///
    /// A missing or malformed snapshot yields an empty store. Completion
    /// flags are re-checked against the current step schemas; a step whose
    /// stored values no longer validate is reopened, keeping its values as
    /// prefill.
    pub async fn rehydrate(persistence: Arc<dyn ProgressPersistence>) -> Self {
        let Some(snapshot) = persistence.load().await else {
            tracing::info!("No saved submission progress, starting fresh");
            return Self::empty(persistence);
        };

        let ProgressSnapshot {
            draft,
            mut progress,
            saved_at,
        } = snapshot;

        for step in StepId::ALL {
            if progress.is_complete(step) {
                if let Err(errors) = validator::validate(step, &draft.raw_slice(step)) {
                    tracing::warn!(
                        step = %step,
                        %errors,
                        "Saved step no longer validates, reopening"
                    );
                    progress.mark_incomplete(step);
                }
            }
        }

        tracing::info!(
            %saved_at,
            completed = progress.completed_count(),
            fields = draft.len(),
            "Restored submission progress"
        );

        Self {
            draft,
            progress,
            persistence,
        }
    }

    /// Current accumulated draft.
    pub fn get_all(&self) -> &SubmissionDraft {
        &self.draft
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn is_step_complete(&self, step: StepId) -> bool {
        self.progress.is_complete(step)
    }

    /// Values currently held for `step`'s fields.
    pub fn step_values(&self, step: StepId) -> SubmissionDraft {
        self.draft.slice(step)
    }

    /// Merge validated fields for `step`, mark it complete, and save.
    ///
    /// The in-memory update stands even if the save fails.
    pub async fn merge(&mut self, step: StepId, fields: FieldMap) -> Result<(), PersistenceError> {
        self.draft.replace_slice(step, fields);
        self.progress.mark_complete(step);
        self.persist().await
    }

    /// Clear draft and progress, in memory and in the durable slot.
    ///
    /// If the slot cannot be cleared it is overwritten with an empty
    /// snapshot instead; the clear error is returned only when that fails
    /// too.
    pub async fn reset(&mut self) -> Result<(), PersistenceError> {
        self.draft.clear();
        self.progress.clear();
        let Err(clear_err) = self.persistence.clear().await else {
            return Ok(());
        };

        tracing::warn!(
            "Failed to clear submission progress, saving empty snapshot: {}",
            clear_err
        );
        match self.persist().await {
            Ok(()) => Ok(()),
            Err(_) => Err(clear_err),
        }
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        let snapshot = ProgressSnapshot::new(self.draft.clone(), self.progress.clone());
        self.persistence.save(&snapshot).await.inspect_err(|e| {
            tracing::error!("Failed to persist submission progress: {}", e);
        })
    }
}
