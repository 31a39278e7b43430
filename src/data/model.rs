use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const COL_CREDIT_SCORE: &str = "credit_score";
pub const COL_LOAN_STATUS: &str = "loan_status";
pub const COL_PERSON_AGE: &str = "person_age";
pub const COL_LOAN_AMOUNT: &str = "loan_amnt";
pub const COL_EMPLOYMENT_EXP: &str = "person_emp_exp";
pub const COL_HOME_OWNERSHIP: &str = "person_home_ownership";
pub const COL_EDUCATION: &str = "person_education";
pub const COL_LOAN_INTENT: &str = "loan_intent";
pub const COL_INTEREST_RATE: &str = "loan_int_rate";
pub const COL_PRIOR_DEFAULTS: &str = "previous_loan_defaults_on_file";
pub const COL_TERM: &str = "term";

/// Columns the statistics and charts depend on.  Validated at the parse
/// boundary so a schema drift upstream fails the request instead of
/// producing silent nonsense.  `term` is deliberately absent: the source
/// data may omit it, in which case the term chart has no bars.
pub const EXPECTED_COLUMNS: [&str; 10] = [
    COL_CREDIT_SCORE,
    COL_LOAN_STATUS,
    COL_PERSON_AGE,
    COL_LOAN_AMOUNT,
    COL_EMPLOYMENT_EXP,
    COL_HOME_OWNERSHIP,
    COL_EDUCATION,
    COL_LOAN_INTENT,
    COL_INTEREST_RATE,
    COL_PRIOR_DEFAULTS,
];

// ---------------------------------------------------------------------------
// FieldValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.  Numeric coercion happens once at parse
/// time; anything that does not read as a number stays trimmed text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// The numeric value, if this cell coerced to a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    /// The textual value, if this cell stayed text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the dataset
// ---------------------------------------------------------------------------

/// One parsed row: column name → value.  Field access goes through the
/// mapping; column order is not part of the contract.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        Record { fields }
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    /// Numeric value of a column, `None` when absent or non-numeric.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.fields.get(column).and_then(FieldValue::as_f64)
    }

    /// Textual value of a column, `None` when absent or numeric.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(FieldValue::as_str)
    }
}

// ---------------------------------------------------------------------------
// LoanDataset – the complete parsed table
// ---------------------------------------------------------------------------

/// The full dataset for one refresh: ordered rows plus the header columns.
/// Immutable once parsed; shared between handlers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct LoanDataset {
    /// All rows, in file order.
    pub records: Vec<Record>,
    /// Header columns as they appeared in the file (empty names dropped).
    pub columns: Vec<String>,
}

impl LoanDataset {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
