use serde::{Deserialize, Serialize};

use super::value::{parse_decimal, ParcelAttributes};

/// Comparison operators understood by eligibility conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    In,
    Equal,
    NotEqual,
    Between,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

impl Operator {
    /// Case-insensitive, whitespace-tolerant lookup. Unknown spellings yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "in" => Some(Self::In),
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "between" => Some(Self::Between),
            ">" => Some(Self::Greater),
            "<" => Some(Self::Less),
            ">=" => Some(Self::GreaterOrEqual),
            "<=" => Some(Self::LessOrEqual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::In => "in",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Between => "between",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
        }
    }
}

/// One leaf predicate of a practice rule.
///
/// The operator is kept verbatim so that a misspelled operator in the rule source still
/// loads and simply never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    field: String,
    operator: String,
    value: String,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_met_by(&self, parcel: &ParcelAttributes) -> bool {
        evaluate(parcel, &self.field, &self.operator, &self.value)
    }
}

/// Evaluates `field <operator> value` against the parcel.
///
/// Fails closed: an unknown operator, a value that does not parse, or a field that is
/// missing or non-numeric where a number is required all evaluate to `false`.
pub fn evaluate(parcel: &ParcelAttributes, field: &str, operator: &str, value: &str) -> bool {
    let Some(operator) = Operator::parse(operator) else {
        return false;
    };

    match operator {
        Operator::In => {
            let actual = parcel.text(field);
            value.split(',').map(str::trim).any(|token| token == actual)
        }
        Operator::Equal => parcel.text(field) == value,
        Operator::NotEqual => parcel.text(field) != value,
        Operator::Between => match (parcel.number(field), parse_range(value)) {
            (Some(actual), Some((low, high))) => low <= actual && actual <= high,
            _ => false,
        },
        comparison => match (parcel.number(field), parse_decimal(value)) {
            (Some(actual), Some(expected)) => compare(comparison, actual, expected),
            _ => false,
        },
    }
}

fn parse_range(raw: &str) -> Option<(f64, f64)> {
    let mut parts = raw.split(',');
    let low = parse_decimal(parts.next()?)?;
    let high = parse_decimal(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((low, high))
}

fn compare(operator: Operator, actual: f64, expected: f64) -> bool {
    match operator {
        Operator::Greater => actual > expected,
        Operator::Less => actual < expected,
        Operator::GreaterOrEqual => actual >= expected,
        Operator::LessOrEqual => actual <= expected,
        _ => false,
    }
}
