//! Step validation: coerces raw step input and checks it against the
//! step's declared rules.
//!
//! Validation is all-or-nothing: either every declared field passes and the
//! caller gets the normalized values, or it gets one message per failing
//! field and nothing else.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{FieldMap, FieldValue};
use super::steps::{FieldKind, FieldRule, FieldSpec, Predicate, StepId};

/// Untyped input collected by a step page.
pub type RawInput = serde_json::Map<String, Value>;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Field name → human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Validate `raw` against `step`'s schema.
///
/// On success the map holds exactly the declared fields that carry a value,
/// coerced to their declared kind. Unknown input keys are ignored.
pub fn validate(step: StepId, raw: &RawInput) -> Result<FieldMap, FieldErrors> {
    let def = step.definition();
    let mut errors = FieldErrors::new();

    let mut coerced: BTreeMap<&'static str, Option<FieldValue>> = BTreeMap::new();
    for field_spec in def.fields {
        match coerce(field_spec, raw.get(field_spec.name)) {
            Ok(value) => {
                coerced.insert(field_spec.name, value);
            }
            Err(message) => errors.insert(field_spec.name, message),
        }
    }

    for field_spec in def.fields {
        let Some(value) = coerced.get(field_spec.name) else {
            continue;
        };
        if let Some(message) = check_rules(field_spec, value.as_ref(), &coerced) {
            errors.insert(field_spec.name, message);
        }
    }

    if !errors.is_empty() {
        tracing::debug!(step = %step, errors = errors.len(), "Step validation failed");
        return Err(errors);
    }

    Ok(coerced
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
        .collect())
}

/// Coerce one raw value to the field's kind. `Ok(None)` means absent.
fn coerce(field_spec: &FieldSpec, raw: Option<&Value>) -> Result<Option<FieldValue>, String> {
    let raw = match raw {
        None | Some(Value::Null) => None,
        Some(v) => Some(v),
    };

    match field_spec.kind {
        FieldKind::Text => Ok(coerce_text(field_spec, raw)?.map(FieldValue::Text)),
        FieldKind::Choice => Ok(coerce_text(field_spec, raw)?.map(FieldValue::Choice)),
        FieldKind::Number => coerce_number(field_spec, raw),
        FieldKind::Boolean => coerce_bool(field_spec, raw).map(|b| Some(FieldValue::Boolean(b))),
        FieldKind::List => coerce_list(field_spec, raw),
    }
}

fn coerce_text(field_spec: &FieldSpec, raw: Option<&Value>) -> Result<Option<String>, String> {
    let text = match raw {
        None => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => return Err(format!("{} must be text", field_spec.label)),
    };
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn coerce_number(
    field_spec: &FieldSpec,
    raw: Option<&Value>,
) -> Result<Option<FieldValue>, String> {
    let invalid = || format!("{} must be a number", field_spec.label);
    let n = match raw {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(invalid)?,
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
    };
    if !n.is_finite() {
        return Err(invalid());
    }
    Ok(Some(FieldValue::Number(n)))
}

fn coerce_bool(field_spec: &FieldSpec, raw: Option<&Value>) -> Result<bool, String> {
    let invalid = || format!("{} must be true or false", field_spec.label);
    match raw {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(invalid()),
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" | "" => Ok(false),
            _ => Err(invalid()),
        },
        Some(_) => Err(invalid()),
    }
}

fn coerce_list(field_spec: &FieldSpec, raw: Option<&Value>) -> Result<Option<FieldValue>, String> {
    let items: Vec<String> = match raw {
        None => return Ok(None),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.trim().to_string()),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(format!("{} must be a list of text values", field_spec.label)),
            })
            .collect::<Result<_, _>>()?,
        Some(Value::String(s)) => s.split(',').map(|item| item.trim().to_string()).collect(),
        Some(_) => return Err(format!("{} must be a list", field_spec.label)),
    };
    let items: Vec<String> = items.into_iter().filter(|item| !item.is_empty()).collect();
    Ok(if items.is_empty() {
        None
    } else {
        Some(FieldValue::List(items))
    })
}

/// Return the message of the first rule `value` violates.
fn check_rules(
    field_spec: &FieldSpec,
    value: Option<&FieldValue>,
    siblings: &BTreeMap<&'static str, Option<FieldValue>>,
) -> Option<String> {
    for rule in field_spec.rules {
        let failure = match (rule, value) {
            (FieldRule::Required, None) => Some(format!("{} is required", field_spec.label)),
            (FieldRule::RequiredWhen { field, predicate }, None) => {
                let sibling = siblings.get(field).and_then(Option::as_ref);
                predicate_holds(predicate, sibling)
                    .then(|| format!("{} is required", field_spec.label))
            }
            (FieldRule::MustBeTrue, v) => (v != Some(&FieldValue::Boolean(true)))
                .then(|| format!("{} must be accepted", field_spec.label)),
            (_, None) => None,
            (FieldRule::MinLength { min }, Some(v)) => match v {
                FieldValue::List(items) if items.len() < *min => Some(format!(
                    "{} must have at least {min} items",
                    field_spec.label
                )),
                FieldValue::Text(s) | FieldValue::Choice(s) if s.chars().count() < *min => Some(
                    format!("{} must be at least {min} characters", field_spec.label),
                ),
                _ => None,
            },
            (FieldRule::MaxLength { max }, Some(v)) => match v {
                FieldValue::List(items) if items.len() > *max => Some(format!(
                    "{} must have at most {max} items",
                    field_spec.label
                )),
                FieldValue::Text(s) | FieldValue::Choice(s) if s.chars().count() > *max => Some(
                    format!("{} must be at most {max} characters", field_spec.label),
                ),
                _ => None,
            },
            (FieldRule::Range { min, max }, Some(FieldValue::Number(n))) => {
                (*n < *min || *n > *max)
                    .then(|| format!("{} must be between {min} and {max}", field_spec.label))
            }
            (FieldRule::OneOf { values }, Some(v)) => {
                let ok = match v {
                    FieldValue::Choice(s) | FieldValue::Text(s) => values.contains(&s.as_str()),
                    FieldValue::List(items) => {
                        items.iter().all(|item| values.contains(&item.as_str()))
                    }
                    _ => true,
                };
                (!ok).then(|| format!("{} must be one of: {}", field_spec.label, values.join(", ")))
            }
            (FieldRule::Email, Some(FieldValue::Text(s))) => (!EMAIL_RE.is_match(s))
                .then(|| format!("{} must be a valid email address", field_spec.label)),
            _ => None,
        };
        if failure.is_some() {
            return failure;
        }
    }
    None
}

fn predicate_holds(predicate: &Predicate, value: Option<&FieldValue>) -> bool {
    match (predicate, value) {
        (Predicate::Equals(expected), Some(FieldValue::Choice(s) | FieldValue::Text(s))) => {
            s.as_str() == *expected
        }
        (Predicate::OneOf(options), Some(FieldValue::Choice(s) | FieldValue::Text(s))) => {
            options.contains(&s.as_str())
        }
        (Predicate::IsTrue, Some(FieldValue::Boolean(b))) => *b,
        _ => false,
    }
}
