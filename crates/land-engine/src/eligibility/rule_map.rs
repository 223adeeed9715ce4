use std::collections::BTreeMap;
use std::io::Read;

use serde::Serialize;
use tracing::{debug, warn};

use super::condition::Condition;
use super::value::ParcelAttributes;

/// Accepted spellings of the practice-code column, in lookup order.
pub const CODE_COLUMNS: &[&str] = &["crp_practice_code", "practice_code"];
pub const FIELD_COLUMN: &str = "field_name";
pub const OPERATOR_COLUMN: &str = "operator";
pub const VALUE_COLUMN: &str = "value";

/// Raw tabular rule source: a header row and string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSheet {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RuleSheet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Reads a CSV rule sheet. Ragged rows are accepted and missing cells read as empty;
    /// rows that cannot be decoded are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let columns = csv_reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            match record {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
                Err(err) if err.is_io_error() => return Err(err),
                Err(err) => warn!(line = index + 2, error = %err, "skipping rule row"),
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Required columns that cannot be found, after trimming and lowercasing headers.
    pub fn missing_columns(&self) -> Vec<&'static str> {
        let layout = ColumnLayout::resolve(&self.columns);
        let mut missing = Vec::new();
        if layout.code.is_none() {
            missing.push(CODE_COLUMNS[0]);
        }
        if layout.field.is_none() {
            missing.push(FIELD_COLUMN);
        }
        if layout.operator.is_none() {
            missing.push(OPERATOR_COLUMN);
        }
        if layout.value.is_none() {
            missing.push(VALUE_COLUMN);
        }
        missing
    }
}

struct ColumnLayout {
    code: Option<usize>,
    field: Option<usize>,
    operator: Option<usize>,
    value: Option<usize>,
}

impl ColumnLayout {
    fn resolve(columns: &[String]) -> Self {
        let normalized = columns
            .iter()
            .map(|column| column.trim().to_lowercase())
            .collect::<Vec<_>>();
        let position = |name: &str| normalized.iter().position(|column| column == name);

        Self {
            code: CODE_COLUMNS.iter().find_map(|name| position(name)),
            field: position(FIELD_COLUMN),
            operator: position(OPERATOR_COLUMN),
            value: position(VALUE_COLUMN),
        }
    }
}

/// Conditions a parcel must meet, all of them, to qualify for one practice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rule {
    conditions: Vec<Condition>,
}

impl Rule {
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_satisfied_by(&self, parcel: &ParcelAttributes) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.is_met_by(parcel))
    }
}

/// Practice code to rule mapping. An empty map means rule filtering is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuleMap {
    rules: BTreeMap<String, Rule>,
}

impl RuleMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the map from a sheet.
    ///
    /// A sheet missing any required column yields an empty map. Rows with a blank code,
    /// field or operator are skipped; a blank value is kept.
    pub fn from_sheet(sheet: &RuleSheet) -> Self {
        let layout = ColumnLayout::resolve(sheet.columns());
        let (Some(code_at), Some(field_at), Some(operator_at), Some(value_at)) =
            (layout.code, layout.field, layout.operator, layout.value)
        else {
            debug!(
                columns = ?sheet.columns(),
                "rule sheet lacks required columns; rules disabled"
            );
            return Self::empty();
        };

        let mut map = Self::empty();
        let mut skipped = 0usize;
        for row in sheet.rows() {
            let cell = |index: usize| row.get(index).map(|value| value.trim()).unwrap_or("");
            let (code, field, operator, value) =
                (cell(code_at), cell(field_at), cell(operator_at), cell(value_at));

            if code.is_empty() || field.is_empty() || operator.is_empty() {
                skipped += 1;
                continue;
            }

            map.push(code, Condition::new(field, operator, value));
        }

        if skipped > 0 {
            debug!(skipped, "incomplete rule rows ignored");
        }

        map
    }

    /// Appends a condition to the practice's rule, creating the rule if needed.
    pub fn push(&mut self, code: impl Into<String>, condition: Condition) {
        self.rules
            .entry(code.into())
            .or_default()
            .conditions
            .push(condition);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn get(&self, code: &str) -> Option<&Rule> {
        self.rules.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(code, rule)| (code.as_str(), rule))
    }
}
