//! Metadata matcher: conjunctive constraint list for filtered loads.
//!
//! A matcher is an ordered set of constraints, each naming a field
//! (from the event's metadata map or a structural message property),
//! an operator and a comparison value. An event matches only if every
//! constraint holds; there is no OR or grouping.

use crate::error::{Result, StrataError};
use crate::types::RecordedEvent;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Where a constraint's field is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// The event's metadata map.
    Metadata,
    /// A structural property of the message itself
    /// (`event_id`, `event_type`, `created_at`, `number`).
    MessageProperty,
}

/// Comparison operator of a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEquals,
    LowerThan,
    LowerThanEquals,
    In,
    NotIn,
    Regex,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanEquals => ">=",
            Operator::LowerThan => "<",
            Operator::LowerThanEquals => "<=",
            Operator::In => "in",
            Operator::NotIn => "nin",
            Operator::Regex => "regex",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
struct Constraint {
    field_type: FieldType,
    field: String,
    operator: Operator,
    value: Value,
    /// Compiled pattern, present iff `operator == Regex`.
    pattern: Option<Regex>,
}

/// Ordered, conjunctive constraint list over event metadata/properties.
///
/// Constraints are validated when added: `In`/`NotIn` require an array
/// value, `Regex` requires a string pattern that compiles. A malformed
/// pattern surfaces as [`StrataError::InvalidRegex`] immediately rather
/// than being silently ignored at evaluation time.
///
/// Evaluation never mutates the event. A constraint on a missing field
/// fails, except `NotIn`, which passes vacuously.
#[derive(Debug, Clone, Default)]
pub struct MetadataMatcher {
    constraints: Vec<Constraint>,
}

impl MetadataMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint. Returns the extended matcher.
    pub fn with_match(
        mut self,
        field_type: FieldType,
        field: impl Into<String>,
        operator: Operator,
        value: Value,
    ) -> Result<Self> {
        let field = field.into();
        let pattern = match operator {
            Operator::In | Operator::NotIn => {
                if !value.is_array() {
                    return Err(StrataError::InvalidArgument(format!(
                        "operator '{}' on field '{}' requires an array value",
                        operator, field
                    )));
                }
                None
            }
            Operator::Regex => {
                let pattern = value.as_str().ok_or_else(|| {
                    StrataError::InvalidArgument(format!(
                        "operator 'regex' on field '{}' requires a string pattern",
                        field
                    ))
                })?;
                Some(Regex::new(pattern)?)
            }
            _ => None,
        };

        self.constraints.push(Constraint {
            field_type,
            field,
            operator,
            value,
            pattern,
        });
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Evaluate all constraints against one event (AND semantics).
    pub fn matches(&self, event: &RecordedEvent) -> bool {
        self.constraints.iter().all(|c| c.matches(event))
    }
}

impl Constraint {
    fn matches(&self, event: &RecordedEvent) -> bool {
        let field_value = match self.field_type {
            FieldType::Metadata => event.metadata.get(&self.field).cloned(),
            FieldType::MessageProperty => event.property(&self.field),
        };

        let Some(actual) = field_value else {
            // Absent fields fail every constraint except the negative
            // membership test, which holds vacuously.
            return self.operator == Operator::NotIn;
        };

        match self.operator {
            Operator::Equals => loosely_equal(&actual, &self.value),
            Operator::NotEquals => !loosely_equal(&actual, &self.value),
            Operator::GreaterThan => compare(&actual, &self.value) == Some(Ordering::Greater),
            Operator::GreaterThanEquals => matches!(
                compare(&actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::LowerThan => compare(&actual, &self.value) == Some(Ordering::Less),
            Operator::LowerThanEquals => matches!(
                compare(&actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::In => contains(&self.value, &actual),
            Operator::NotIn => !contains(&self.value, &actual),
            Operator::Regex => {
                let (Some(actual), Some(pattern)) = (actual.as_str(), self.pattern.as_ref()) else {
                    return false;
                };
                pattern.is_match(actual)
            }
        }
    }
}

/// Ordering comparison: numeric for numbers, lexical for strings.
/// Mismatched or unordered types compare as `None`.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality with numeric coercion (1 == 1.0); everything else is
/// structural.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match compare(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    haystack
        .as_array()
        .is_some_and(|values| values.iter().any(|v| loosely_equal(v, needle)))
}
