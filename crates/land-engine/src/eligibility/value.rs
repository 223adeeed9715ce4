use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Textual form of an attribute that is not present on the parcel.
pub const MISSING_TEXT: &str = "None";

/// Single attribute value carried by a parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Numeric reading of the value. Text is parsed as a decimal and flags read as 1/0;
    /// `None` means the value cannot take part in a numeric comparison.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(value) => Some(*value),
            AttributeValue::Text(raw) => parse_decimal(raw),
            AttributeValue::Flag(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Flag(true) => f.write_str("True"),
            AttributeValue::Flag(false) => f.write_str("False"),
            AttributeValue::Number(value) => write_number(f, *value),
            AttributeValue::Text(text) => f.write_str(text),
        }
    }
}

/// Rule sheets spell floats the way they are usually exported: whole numbers keep a
/// trailing `.0` and non-finite values read `nan`, `inf` and `-inf`.
fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("nan")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "inf" } else { "-inf" })
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Loosely typed attribute bag describing a parcel for rule evaluation.
///
/// Lookups never fail: an absent key reads as [`MISSING_TEXT`] in string comparisons and
/// as no number at all in numeric ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelAttributes(BTreeMap<String, AttributeValue>);

impl ParcelAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        self.0.get(field)
    }

    /// String form of a field as used by `in`, `==` and `!=`.
    pub fn text(&self, field: &str) -> Cow<'_, str> {
        match self.0.get(field) {
            Some(AttributeValue::Text(text)) => Cow::Borrowed(text.as_str()),
            Some(other) => Cow::Owned(other.to_string()),
            None => Cow::Borrowed(MISSING_TEXT),
        }
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(AttributeValue::as_number)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for ParcelAttributes
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

pub(crate) fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}
