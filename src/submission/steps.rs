//! Step table: the fixed, ordered wizard steps and their field schemas.

use serde::{Deserialize, Serialize};

/// The steps of the submission wizard.
///
/// Progresses linearly: BasicInfo → Technical → Regulatory → Contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    BasicInfo,
    Technical,
    Regulatory,
    Contact,
}

impl StepId {
    /// All steps in wizard order.
    pub const ALL: [StepId; 4] = [
        StepId::BasicInfo,
        StepId::Technical,
        StepId::Regulatory,
        StepId::Contact,
    ];

    /// Zero-based position of this step in the wizard.
    pub fn index(&self) -> usize {
        match self {
            Self::BasicInfo => 0,
            Self::Technical => 1,
            Self::Regulatory => 2,
            Self::Contact => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasicInfo => "basic_info",
            Self::Technical => "technical",
            Self::Regulatory => "regulatory",
            Self::Contact => "contact",
        }
    }

    /// Parse a step identifier as used in URLs and snapshots.
    pub fn parse(s: &str) -> Option<StepId> {
        Self::ALL.into_iter().find(|step| step.as_str() == s)
    }

    /// The step that must be complete before this one can be submitted.
    pub fn predecessor(&self) -> Option<StepId> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// The static definition for this step.
    pub fn definition(&self) -> &'static StepDefinition {
        &STEPS[self.index()]
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The step after `current`, or `None` if `current` is the last step.
pub fn next_step_id(current: StepId) -> Option<StepId> {
    StepId::ALL.get(current.index() + 1).copied()
}

/// Where the wizard is: on a step, or past the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "step")]
pub enum Position {
    Step(StepId),
    Complete,
}

impl Position {
    /// The first position of a fresh wizard.
    pub fn first() -> Self {
        Self::Step(StepId::ALL[0])
    }

    /// Whether this position is terminal (ready for final submission).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The position reached after completing `step`.
    pub fn after(step: StepId) -> Self {
        match next_step_id(step) {
            Some(next) => Self::Step(next),
            None => Self::Complete,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step(step) => write!(f, "{step}"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Semantic type a raw value is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Choice,
    List,
}

/// Condition on a sibling field, used by `FieldRule::RequiredWhen`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Predicate {
    Equals(&'static str),
    OneOf(&'static [&'static str]),
    IsTrue,
}

/// A single constraint on a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum FieldRule {
    Required,
    MinLength { min: usize },
    MaxLength { max: usize },
    Range { min: f64, max: f64 },
    OneOf { values: &'static [&'static str] },
    Email,
    MustBeTrue,
    RequiredWhen {
        field: &'static str,
        predicate: Predicate,
    },
}

/// A declared field of a step.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub rules: &'static [FieldRule],
}

/// Static definition of one wizard step.
#[derive(Debug, Clone, Serialize)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

impl StepDefinition {
    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether this step declares `name`.
    pub fn owns(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

const CATEGORIES: &[&str] = &[
    "digital_health",
    "medical_device",
    "diagnostics",
    "therapeutics",
    "care_delivery",
    "other",
];

const DEVELOPMENT_STAGES: &[&str] = &["concept", "prototype", "pilot", "market_ready", "scaling"];

const INTEGRATIONS: &[&str] = &["ehr", "fhir", "hl7", "api", "mobile", "wearables"];

const REGULATORY_STATUSES: &[&str] = &["not_required", "not_started", "in_progress", "approved"];

/// The step table, indexed by `StepId::index`.
pub static STEPS: [StepDefinition; 4] = [
    StepDefinition {
        id: StepId::BasicInfo,
        title: "Basic information",
        fields: &[
            FieldSpec {
                name: "title",
                label: "Innovation title",
                kind: FieldKind::Text,
                rules: &[
                    FieldRule::Required,
                    FieldRule::MinLength { min: 5 },
                    FieldRule::MaxLength { max: 120 },
                ],
            },
            FieldSpec {
                name: "category",
                label: "Category",
                kind: FieldKind::Choice,
                rules: &[FieldRule::Required, FieldRule::OneOf { values: CATEGORIES }],
            },
            FieldSpec {
                name: "otherCategory",
                label: "Other category",
                kind: FieldKind::Text,
                rules: &[
                    FieldRule::RequiredWhen {
                        field: "category",
                        predicate: Predicate::Equals("other"),
                    },
                    FieldRule::MaxLength { max: 80 },
                ],
            },
            FieldSpec {
                name: "description",
                label: "Description",
                kind: FieldKind::Text,
                rules: &[
                    FieldRule::Required,
                    FieldRule::MinLength { min: 50 },
                    FieldRule::MaxLength { max: 2000 },
                ],
            },
            FieldSpec {
                name: "developmentStage",
                label: "Development stage",
                kind: FieldKind::Choice,
                rules: &[
                    FieldRule::Required,
                    FieldRule::OneOf {
                        values: DEVELOPMENT_STAGES,
                    },
                ],
            },
        ],
    },
    StepDefinition {
        id: StepId::Technical,
        title: "Technical details",
        fields: &[
            FieldSpec {
                name: "technicalSpecifications",
                label: "Technical specifications",
                kind: FieldKind::Text,
                rules: &[FieldRule::Required, FieldRule::MinLength { min: 50 }],
            },
            FieldSpec {
                name: "targetUsers",
                label: "Target users",
                kind: FieldKind::Text,
                rules: &[FieldRule::Required, FieldRule::MinLength { min: 10 }],
            },
            FieldSpec {
                name: "implementationRequirements",
                label: "Implementation requirements",
                kind: FieldKind::Text,
                rules: &[FieldRule::MaxLength { max: 1000 }],
            },
            FieldSpec {
                name: "integrationCapabilities",
                label: "Integration capabilities",
                kind: FieldKind::List,
                rules: &[FieldRule::OneOf {
                    values: INTEGRATIONS,
                }],
            },
            FieldSpec {
                name: "teamSize",
                label: "Team size",
                kind: FieldKind::Number,
                rules: &[FieldRule::Range {
                    min: 1.0,
                    max: 10_000.0,
                }],
            },
        ],
    },
    StepDefinition {
        id: StepId::Regulatory,
        title: "Regulatory details",
        fields: &[
            FieldSpec {
                name: "regulatoryStatus",
                label: "Regulatory status",
                kind: FieldKind::Choice,
                rules: &[
                    FieldRule::Required,
                    FieldRule::OneOf {
                        values: REGULATORY_STATUSES,
                    },
                ],
            },
            FieldSpec {
                name: "certifications",
                label: "Certifications",
                kind: FieldKind::List,
                rules: &[FieldRule::RequiredWhen {
                    field: "regulatoryStatus",
                    predicate: Predicate::Equals("approved"),
                }],
            },
            FieldSpec {
                name: "regulatoryBody",
                label: "Regulatory body",
                kind: FieldKind::Text,
                rules: &[FieldRule::RequiredWhen {
                    field: "regulatoryStatus",
                    predicate: Predicate::OneOf(&["in_progress", "approved"]),
                }],
            },
            FieldSpec {
                name: "handlesPatientData",
                label: "Handles patient data",
                kind: FieldKind::Boolean,
                rules: &[],
            },
            FieldSpec {
                name: "dataProtectionMeasures",
                label: "Data protection measures",
                kind: FieldKind::Text,
                rules: &[
                    FieldRule::RequiredWhen {
                        field: "handlesPatientData",
                        predicate: Predicate::IsTrue,
                    },
                    FieldRule::MinLength { min: 20 },
                ],
            },
        ],
    },
    StepDefinition {
        id: StepId::Contact,
        title: "Contact",
        fields: &[
            FieldSpec {
                name: "contactName",
                label: "Contact name",
                kind: FieldKind::Text,
                rules: &[
                    FieldRule::Required,
                    FieldRule::MinLength { min: 2 },
                    FieldRule::MaxLength { max: 100 },
                ],
            },
            FieldSpec {
                name: "contactEmail",
                label: "Contact email",
                kind: FieldKind::Text,
                rules: &[FieldRule::Required, FieldRule::Email],
            },
            FieldSpec {
                name: "organization",
                label: "Organization",
                kind: FieldKind::Text,
                rules: &[FieldRule::Required, FieldRule::MinLength { min: 2 }],
            },
            FieldSpec {
                name: "phone",
                label: "Phone",
                kind: FieldKind::Text,
                rules: &[
                    FieldRule::MinLength { min: 7 },
                    FieldRule::MaxLength { max: 20 },
                ],
            },
            FieldSpec {
                name: "consentToContact",
                label: "Consent to contact",
                kind: FieldKind::Boolean,
                rules: &[FieldRule::MustBeTrue],
            },
        ],
    },
];

/// The step that owns `field`, if any.
pub fn owner_of(field: &str) -> Option<StepId> {
    STEPS.iter().find(|def| def.owns(field)).map(|def| def.id)
}
