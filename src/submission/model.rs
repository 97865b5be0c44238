//! Submission draft, progress flags, and the persisted snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::steps::StepId;

/// A validated, normalized field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Choice(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Convert back to the untyped form a step page would send.
    pub fn to_raw(&self) -> serde_json::Value {
        match self {
            Self::Text(s) | Self::Choice(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => serde_json::json!(n),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::List(items) => serde_json::json!(items),
        }
    }
}

/// Validated fields keyed by field name.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// The accumulated submission record, one flat namespace across all steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionDraft {
    fields: FieldMap,
}

impl SubmissionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace the slice owned by `step` with `fields`.
    ///
    /// Fields declared by `step` but missing from `fields` are removed.
    /// Fields owned by other steps are untouched.
    pub fn replace_slice(&mut self, step: StepId, fields: FieldMap) {
        let def = step.definition();
        self.fields.retain(|name, _| !def.owns(name));
        self.fields
            .extend(fields.into_iter().filter(|(name, _)| def.owns(name)));
    }

    /// The values currently held for `step`'s fields.
    pub fn slice(&self, step: StepId) -> SubmissionDraft {
        let def = step.definition();
        SubmissionDraft {
            fields: self
                .fields
                .iter()
                .filter(|(name, _)| def.owns(name))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// The slice for `step` in raw input form, for re-validation.
    pub fn raw_slice(&self, step: StepId) -> serde_json::Map<String, serde_json::Value> {
        self.slice(step)
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_raw()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

impl From<FieldMap> for SubmissionDraft {
    fn from(fields: FieldMap) -> Self {
        Self { fields }
    }
}

/// Per-step completion flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressState {
    completed: BTreeMap<StepId, bool>,
}

impl ProgressState {
    pub fn is_complete(&self, step: StepId) -> bool {
        self.completed.get(&step).copied().unwrap_or(false)
    }

    pub fn mark_complete(&mut self, step: StepId) {
        self.completed.insert(step, true);
    }

    pub fn mark_incomplete(&mut self, step: StepId) {
        self.completed.insert(step, false);
    }

    /// Number of steps marked complete.
    pub fn completed_count(&self) -> usize {
        self.completed.values().filter(|done| **done).count()
    }

    /// First step in wizard order that is not complete.
    pub fn first_incomplete(&self) -> Option<StepId> {
        StepId::ALL.into_iter().find(|step| !self.is_complete(*step))
    }

    pub fn clear(&mut self) {
        self.completed.clear();
    }
}

impl FromIterator<(StepId, bool)> for ProgressState {
    fn from_iter<I: IntoIterator<Item = (StepId, bool)>>(iter: I) -> Self {
        Self {
            completed: iter.into_iter().collect(),
        }
    }
}

/// The serialized (draft, progress) pair held in the durable slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub draft: SubmissionDraft,
    pub progress: ProgressState,
    pub saved_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn new(draft: SubmissionDraft, progress: ProgressState) -> Self {
        Self {
            draft,
            progress,
            saved_at: Utc::now(),
        }
    }
}

/// Settings keys used for progress persistence.
pub mod settings_keys {
    /// Key for the ProgressSnapshot JSON blob in the settings table.
    pub const SUBMISSION_PROGRESS: &str = "submission_progress";
    /// Default user ID (single-user system).
    pub const DEFAULT_USER: &str = "default";
}
