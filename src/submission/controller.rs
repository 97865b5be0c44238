//! WizardController: step order, forward gating, revisit, resume, and
//! final submission for one wizard session.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{AdvanceError, WizardError};

use super::model::{ProgressState, SubmissionDraft};
use super::persistence::ProgressPersistence;
use super::service::{SubmissionReceipt, SubmissionService};
use super::steps::{Position, StepId};
use super::store::SubmissionStore;
use super::validator::{self, RawInput};

/// Snapshot of where the session stands, for the wizard shell.
#[derive(Debug, Clone, Serialize)]
pub struct WizardStatus {
    pub position: Position,
    pub progress: ProgressState,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub draft: SubmissionDraft,
}

/// Owns one submission session.
pub struct WizardController {
    store: SubmissionStore,
    current: Position,
}

impl WizardController {
    /// Start a session, resuming from persisted progress if any.
    pub async fn init(persistence: Arc<dyn ProgressPersistence>) -> Self {
        let store = SubmissionStore::rehydrate(persistence).await;
        let mut controller = Self {
            store,
            current: Position::first(),
        };
        controller.resume();
        controller
    }

    /// The position the shell should currently show.
    pub fn current(&self) -> Position {
        self.current
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    /// Move to the first incomplete step, or to `Complete` if all are done.
    pub fn resume(&mut self) -> Position {
        self.current = match self.store.progress().first_incomplete() {
            Some(step) => Position::Step(step),
            None => Position::Complete,
        };
        self.current
    }

    /// Whether the user may leave `step` going forward: it is already
    /// complete, or it is unlocked and `input` validates. Never merges.
    pub fn can_advance(&self, step: StepId, input: Option<&RawInput>) -> bool {
        if self.store.is_step_complete(step) {
            return true;
        }
        if self.missing_predecessor(step).is_some() {
            return false;
        }
        input.is_some_and(|raw| validator::validate(step, raw).is_ok())
    }

    /// Validate `input` for `step`, merge it, and move to the next position.
    pub async fn advance(
        &mut self,
        step: StepId,
        input: &RawInput,
    ) -> Result<Position, AdvanceError> {
        if let Some(missing) = self.missing_predecessor(step) {
            return Err(AdvanceError::Locked { step, missing });
        }

        let fields = validator::validate(step, input).map_err(AdvanceError::Invalid)?;

        let saved = self.store.merge(step, fields).await;
        let next = Position::after(step);
        self.current = next;
        tracing::info!(step = %step, next = %next, "Step completed");

        match saved {
            Ok(()) => Ok(next),
            Err(source) => Err(AdvanceError::ProgressNotSaved { next, source }),
        }
    }

    /// Go back to `step` for editing. Completion is kept until the step is
    /// submitted again. Returns the values currently held for the step.
    pub fn revisit(&mut self, step: StepId) -> Result<SubmissionDraft, WizardError> {
        if !self.store.is_step_complete(step) {
            if let Some(missing) = self.missing_predecessor(step) {
                return Err(WizardError::Locked { step, missing });
            }
        }
        self.current = Position::Step(step);
        tracing::debug!(step = %step, "Revisiting step");
        Ok(self.store.step_values(step))
    }

    /// Hand the completed draft to `service`; reset on success.
    ///
    /// On a service failure the draft and progress are kept so the caller
    /// can retry without re-entering data.
    pub async fn submit(
        &mut self,
        service: &dyn SubmissionService,
    ) -> Result<SubmissionReceipt, WizardError> {
        if let Some(next) = self.store.progress().first_incomplete() {
            return Err(WizardError::Incomplete { next });
        }

        let receipt = service
            .create_submission(self.store.get_all())
            .await
            .inspect_err(|e| tracing::error!("Final submission failed: {}", e))?;

        let cleared = self.store.reset().await;
        self.current = Position::first();
        match cleared {
            Ok(()) => Ok(receipt),
            Err(source) => Err(WizardError::ProgressNotCleared {
                submission_id: receipt.id,
                source,
            }),
        }
    }

    /// Start over: clear draft and progress and return to the first step.
    pub async fn cancel(&mut self) -> Result<Position, WizardError> {
        let cleared = self.store.reset().await;
        self.current = Position::first();
        tracing::info!("Submission wizard reset");
        cleared?;
        Ok(self.current)
    }

    pub fn status(&self) -> WizardStatus {
        let progress = self.store.progress().clone();
        WizardStatus {
            position: self.current,
            completed_steps: progress.completed_count(),
            total_steps: StepId::ALL.len(),
            progress,
            draft: self.store.get_all().clone(),
        }
    }

    fn missing_predecessor(&self, step: StepId) -> Option<StepId> {
        step.predecessor()
            .filter(|prev| !self.store.is_step_complete(*prev))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::SubmissionError;
    use crate::store::LibSqlBackend;
    use crate::submission::model::FieldValue;
    use crate::submission::persistence::{MemoryPersistence, SettingsPersistence};

    // ── Fixtures ────────────────────────────────────────────────────

    fn raw(value: serde_json::Value) -> RawInput {
        value.as_object().cloned().unwrap()
    }

    fn valid_input(step: StepId) -> RawInput {
        raw(match step {
            StepId::BasicInfo => json!({
                "title": "Remote cardiac monitoring",
                "category": "medical_device",
                "description": "A wearable ECG patch that streams rhythm data to a clinician dashboard.",
                "developmentStage": "pilot",
            }),
            StepId::Technical => json!({
                "technicalSpecifications": "Bluetooth LE patch, 14-day battery, FHIR R4 export to the EHR.",
                "targetUsers": "doctors and nurses",
                "teamSize": 8,
            }),
            StepId::Regulatory => json!({
                "regulatoryStatus": "in_progress",
                "regulatoryBody": "MHRA",
                "handlesPatientData": true,
                "dataProtectionMeasures": "Encrypted at rest and in transit, UK data residency.",
            }),
            StepId::Contact => json!({
                "contactName": "Dr. Ada Obi",
                "contactEmail": "ada@clinic.org",
                "organization": "Lagos Heart Clinic",
                "consentToContact": true,
            }),
        })
    }

    async fn settings_persistence() -> Arc<dyn ProgressPersistence> {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        Arc::new(SettingsPersistence::new(db, "default", "submission_progress"))
    }

    async fn controller() -> (WizardController, Arc<dyn ProgressPersistence>) {
        let persistence = settings_persistence().await;
        (WizardController::init(persistence.clone()).await, persistence)
    }

    async fn complete_through(controller: &mut WizardController, last: StepId) {
        for step in StepId::ALL.into_iter().take(last.index() + 1) {
            controller.advance(step, &valid_input(step)).await.unwrap();
        }
    }

    /// Records what it was handed; fails while `fail` is set.
    #[derive(Default)]
    struct RecordingService {
        fail: Mutex<bool>,
        received: Mutex<Vec<SubmissionDraft>>,
    }

    #[async_trait]
    impl SubmissionService for RecordingService {
        async fn create_submission(
            &self,
            draft: &SubmissionDraft,
        ) -> Result<SubmissionReceipt, SubmissionError> {
            if *self.fail.lock().unwrap() {
                return Err(SubmissionError::Rejected {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.received.lock().unwrap().push(draft.clone());
            Ok(SubmissionReceipt {
                id: "sub-1".to_string(),
                created_at: chrono::Utc::now(),
            })
        }
    }

    // ── Advance ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn fresh_session_starts_at_first_step() {
        let (controller, _) = controller().await;
        assert_eq!(controller.current(), Position::Step(StepId::BasicInfo));
        assert!(controller.store().get_all().is_empty());
    }

    #[tokio::test]
    async fn advance_walks_all_steps_to_complete() {
        let (mut controller, _) = controller().await;

        for step in StepId::ALL {
            let next = controller.advance(step, &valid_input(step)).await.unwrap();
            assert_eq!(next, Position::after(step));
            assert!(controller.store().is_step_complete(step));
        }
        assert_eq!(controller.current(), Position::Complete);
    }

    #[tokio::test]
    async fn advance_leaves_other_flags_unchanged() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::Technical).await;
        let before = controller.store().progress().clone();

        controller
            .advance(StepId::Regulatory, &valid_input(StepId::Regulatory))
            .await
            .unwrap();

        for step in [StepId::BasicInfo, StepId::Technical, StepId::Contact] {
            assert_eq!(
                controller.store().is_step_complete(step),
                before.is_complete(step)
            );
        }
        assert!(controller.store().is_step_complete(StepId::Regulatory));
    }

    #[tokio::test]
    async fn each_rule_failure_is_reported_without_merging() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::Technical).await;

        let cases = [
            ("regulatoryStatus", json!("pending-ish")),
            ("regulatoryBody", json!(null)),
            ("dataProtectionMeasures", json!("short")),
            ("handlesPatientData", json!("perhaps")),
        ];

        for (field, bad) in cases {
            let before = controller.store().get_all().clone();
            let mut input = valid_input(StepId::Regulatory);
            input.insert(field.to_string(), bad);

            match controller.advance(StepId::Regulatory, &input).await {
                Err(AdvanceError::Invalid(errors)) => {
                    assert!(errors.contains(field), "{field} missing from {errors}");
                }
                other => panic!("expected validation failure for {field}, got {other:?}"),
            }
            assert_eq!(controller.store().get_all(), &before);
            assert!(!controller.store().is_step_complete(StepId::Regulatory));
            assert_eq!(controller.current(), Position::Step(StepId::Regulatory));
        }
    }

    #[tokio::test]
    async fn short_technical_specification_is_rejected() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::BasicInfo).await;

        let input = raw(json!({
            "technicalSpecifications": "short",
            "targetUsers": "doctors and nurses",
        }));
        let err = controller.advance(StepId::Technical, &input).await.unwrap_err();

        let AdvanceError::Invalid(errors) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("technicalSpecifications"));
        assert!(!controller.store().is_step_complete(StepId::Technical));
        assert!(controller.store().get_all().get("targetUsers").is_none());
    }

    #[tokio::test]
    async fn advance_twice_is_idempotent() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::Technical).await;
        let once = controller.store().get_all().clone();

        controller
            .advance(StepId::Technical, &valid_input(StepId::Technical))
            .await
            .unwrap();

        assert_eq!(controller.store().get_all(), &once);
    }

    #[tokio::test]
    async fn advance_is_locked_until_predecessor_completes() {
        let (mut controller, _) = controller().await;

        let err = controller
            .advance(StepId::Regulatory, &valid_input(StepId::Regulatory))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AdvanceError::Locked {
                step: StepId::Regulatory,
                missing: StepId::Technical
            }
        ));
        assert!(controller.store().get_all().is_empty());
    }

    #[tokio::test]
    async fn can_advance_checks_without_merging() {
        let (mut controller, _) = controller().await;

        assert!(!controller.can_advance(StepId::BasicInfo, None));
        assert!(controller.can_advance(StepId::BasicInfo, Some(&valid_input(StepId::BasicInfo))));
        assert!(controller.store().get_all().is_empty());

        complete_through(&mut controller, StepId::BasicInfo).await;
        assert!(controller.can_advance(StepId::BasicInfo, None));
        assert!(controller.can_advance(StepId::BasicInfo, Some(&RawInput::new())));
    }

    #[tokio::test]
    async fn can_advance_agrees_with_advance() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::BasicInfo).await;

        let cases = [
            // Locked: technical is not complete yet.
            (StepId::Regulatory, valid_input(StepId::Regulatory)),
            (StepId::Regulatory, raw(json!({"regulatoryStatus": "not_started"}))),
            // Open.
            (StepId::Technical, raw(json!({"technicalSpecifications": "short"}))),
            (StepId::Technical, valid_input(StepId::Technical)),
        ];

        for (step, input) in cases {
            let predicted = controller.can_advance(step, Some(&input));
            let outcome = controller.advance(step, &input).await;
            assert_eq!(predicted, outcome.is_ok(), "{step}: {outcome:?}");
        }
    }

    #[tokio::test]
    async fn persistence_failure_is_surfaced_but_session_continues() {
        let memory = Arc::new(MemoryPersistence::default());
        memory.fail_save.store(true, Ordering::SeqCst);
        let mut controller = WizardController::init(memory).await;

        let err = controller
            .advance(StepId::BasicInfo, &valid_input(StepId::BasicInfo))
            .await
            .unwrap_err();

        match err {
            AdvanceError::ProgressNotSaved { next, .. } => {
                assert_eq!(next, Position::Step(StepId::Technical));
            }
            other => panic!("expected ProgressNotSaved, got {other:?}"),
        }
        assert!(controller.store().is_step_complete(StepId::BasicInfo));
        assert_eq!(controller.current(), Position::Step(StepId::Technical));
    }

    // ── Resume ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn resume_returns_first_incomplete_step() {
        let (mut controller, persistence) = controller().await;
        complete_through(&mut controller, StepId::Technical).await;

        let mut resumed = WizardController::init(persistence).await;
        assert_eq!(resumed.resume(), Position::Step(StepId::Regulatory));
        assert_eq!(resumed.store().get_all(), controller.store().get_all());
    }

    #[tokio::test]
    async fn resume_with_all_complete_is_terminal() {
        let (mut controller, persistence) = controller().await;
        complete_through(&mut controller, StepId::Contact).await;

        let resumed = WizardController::init(persistence).await;
        assert_eq!(resumed.current(), Position::Complete);
    }

    // ── Revisit ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn revisit_keeps_completion_and_returns_values() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::Regulatory).await;

        let values = controller.revisit(StepId::Technical).unwrap();

        assert_eq!(controller.current(), Position::Step(StepId::Technical));
        assert!(controller.store().is_step_complete(StepId::Technical));
        assert_eq!(
            values.get("targetUsers"),
            Some(&FieldValue::Text("doctors and nurses".into()))
        );
        assert!(values.get("title").is_none());

        // Re-submitting moves forward again; later steps stay complete.
        let next = controller
            .advance(StepId::Technical, &valid_input(StepId::Technical))
            .await
            .unwrap();
        assert_eq!(next, Position::Step(StepId::Regulatory));
        assert!(controller.store().is_step_complete(StepId::Regulatory));
    }

    #[tokio::test]
    async fn revisit_beyond_frontier_is_locked() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::BasicInfo).await;

        assert!(controller.revisit(StepId::Technical).is_ok());
        let err = controller.revisit(StepId::Contact).unwrap_err();
        assert!(matches!(err, WizardError::Locked { missing: StepId::Regulatory, .. }));
    }

    // ── Submit / reset ──────────────────────────────────────────────

    #[tokio::test]
    async fn submit_requires_all_steps() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::Technical).await;
        let service = RecordingService::default();

        let err = controller.submit(&service).await.unwrap_err();
        assert!(matches!(err, WizardError::Incomplete { next: StepId::Regulatory }));
        assert!(service.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_success_resets_session() {
        let (mut controller, persistence) = controller().await;
        complete_through(&mut controller, StepId::Contact).await;
        let expected = controller.store().get_all().clone();
        let service = RecordingService::default();

        let receipt = controller.submit(&service).await.unwrap();

        assert_eq!(receipt.id, "sub-1");
        assert_eq!(service.received.lock().unwrap().as_slice(), &[expected]);
        assert!(controller.store().get_all().is_empty());
        assert_eq!(controller.current(), Position::first());
        assert!(persistence.load().await.is_none());
    }

    #[tokio::test]
    async fn submit_failure_keeps_draft_for_retry() {
        let (mut controller, persistence) = controller().await;
        complete_through(&mut controller, StepId::Contact).await;
        let service = RecordingService::default();
        *service.fail.lock().unwrap() = true;

        let err = controller.submit(&service).await.unwrap_err();
        assert!(matches!(err, WizardError::Submission(_)));
        assert_eq!(controller.store().progress().completed_count(), 4);
        assert!(persistence.load().await.is_some());

        *service.fail.lock().unwrap() = false;
        assert!(controller.submit(&service).await.is_ok());
    }

    #[tokio::test]
    async fn submit_with_stuck_slot_does_not_resume_old_draft() {
        let memory = Arc::new(MemoryPersistence::default());
        let mut controller = WizardController::init(memory.clone()).await;
        complete_through(&mut controller, StepId::Contact).await;
        memory.fail_clear.store(true, Ordering::SeqCst);

        controller.submit(&RecordingService::default()).await.unwrap();

        let restarted = WizardController::init(memory).await;
        assert_eq!(restarted.current(), Position::first());
        assert!(restarted.store().get_all().is_empty());
    }

    #[tokio::test]
    async fn submit_reports_progress_not_cleared() {
        let memory = Arc::new(MemoryPersistence::default());
        let mut controller = WizardController::init(memory.clone()).await;
        complete_through(&mut controller, StepId::Contact).await;
        memory.fail_clear.store(true, Ordering::SeqCst);
        memory.fail_save.store(true, Ordering::SeqCst);
        let service = RecordingService::default();

        let err = controller.submit(&service).await.unwrap_err();

        match err {
            WizardError::ProgressNotCleared { submission_id, .. } => {
                assert_eq!(submission_id, "sub-1");
            }
            other => panic!("expected ProgressNotCleared, got {other:?}"),
        }
        assert_eq!(service.received.lock().unwrap().len(), 1);
        assert!(controller.store().get_all().is_empty());
        assert_eq!(controller.current(), Position::first());
    }

    #[tokio::test]
    async fn cancel_after_two_steps_clears_everything() {
        let (mut controller, persistence) = controller().await;
        complete_through(&mut controller, StepId::Regulatory).await;

        let position = controller.cancel().await.unwrap();

        assert_eq!(position, Position::first());
        assert!(controller.store().get_all().is_empty());
        for step in StepId::ALL {
            assert!(!controller.store().is_step_complete(step));
        }
        assert!(persistence.load().await.is_none());
    }

    #[tokio::test]
    async fn status_summarizes_progress() {
        let (mut controller, _) = controller().await;
        complete_through(&mut controller, StepId::BasicInfo).await;

        let status = controller.status();
        assert_eq!(status.position, Position::Step(StepId::Technical));
        assert_eq!(status.completed_steps, 1);
        assert_eq!(status.total_steps, 4);
        assert_eq!(
            status.draft.get("category"),
            Some(&FieldValue::Choice("medical_device".into()))
        );
    }
}
