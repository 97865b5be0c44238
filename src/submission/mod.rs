//! Innovation submission wizard.
//!
//! A fixed, linear sequence of form steps. Each step validates its own
//! fields; validated output accumulates into one draft that is persisted
//! after every accepted step, so a reload resumes at the first incomplete
//! step. Once every step is complete the draft is handed to a
//! `SubmissionService` and the session is reset.

pub mod controller;
pub mod model;
pub mod persistence;
pub mod routes;
pub mod service;
pub mod steps;
pub mod store;
pub mod validator;

pub use controller::{WizardController, WizardStatus};
pub use model::{FieldValue, ProgressSnapshot, ProgressState, SubmissionDraft};
pub use persistence::{ProgressPersistence, SettingsPersistence};
pub use routes::{SubmissionRouteState, submission_routes};
pub use service::{
    HttpSubmissionService, StoreSubmissionService, SubmissionReceipt, SubmissionService,
};
pub use steps::{Position, StepDefinition, StepId, next_step_id};
pub use store::SubmissionStore;
pub use validator::{FieldErrors, RawInput, validate};
