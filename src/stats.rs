use log::warn;
use serde::Serialize;
use thiserror::Error;

use crate::data::model::{
    LoanDataset, Record, COL_CREDIT_SCORE, COL_EDUCATION, COL_EMPLOYMENT_EXP, COL_HOME_OWNERSHIP,
    COL_INTEREST_RATE, COL_LOAN_AMOUNT, COL_LOAN_INTENT, COL_LOAN_STATUS, COL_PERSON_AGE,
    COL_PRIOR_DEFAULTS,
};

// ---------------------------------------------------------------------------
// Category sets
// ---------------------------------------------------------------------------

/// Education levels reported in the breakdown, in display order.  Values
/// outside this set are excluded from the breakdown but stay in the total,
/// so the percentages need not sum to 100.
pub const EDUCATION_LEVELS: [&str; 4] = ["High School", "Bachelor", "Master", "PhD"];

/// Loan intents reported in the breakdown, in display order.  Same
/// exclusion policy as [`EDUCATION_LEVELS`].
pub const LOAN_INTENTS: [&str; 3] = ["PERSONAL", "EDUCATION", "VENTURE"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("cannot compute statistics over an empty dataset")]
    EmptyDataset,
}

// ---------------------------------------------------------------------------
// Aggregation primitives
// ---------------------------------------------------------------------------

/// Arithmetic mean of a numeric column.
///
/// The numerator sums the numeric values; the denominator is the full
/// record count, so non-numeric cells dilute the mean the same way
/// out-of-set categories dilute a breakdown.
pub fn mean(dataset: &LoanDataset, column: &str) -> Result<f64, StatsError> {
    if dataset.is_empty() {
        return Err(StatsError::EmptyDataset);
    }
    let sum: f64 = dataset
        .records
        .iter()
        .filter_map(|r| r.number(column))
        .sum();
    Ok(sum / dataset.len() as f64)
}

/// Number of records matching a predicate.
pub fn count_matching<P>(dataset: &LoanDataset, predicate: P) -> usize
where
    P: Fn(&Record) -> bool,
{
    dataset.records.iter().filter(|r| predicate(r)).count()
}

/// Percentage of records matching a predicate, in [0, 100].
pub fn rate<P>(dataset: &LoanDataset, predicate: P) -> Result<f64, StatsError>
where
    P: Fn(&Record) -> bool,
{
    if dataset.is_empty() {
        return Err(StatsError::EmptyDataset);
    }
    Ok(100.0 * count_matching(dataset, predicate) as f64 / dataset.len() as f64)
}

/// One category's share of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub label: String,
    pub percentage: f64,
}

/// Percentage breakdown of a text column over a fixed category set, in the
/// set's order.  Records whose value falls outside the set are logged and
/// excluded from every bucket while still counting toward the total.
pub fn category_breakdown(
    dataset: &LoanDataset,
    column: &str,
    categories: &[&str],
) -> Result<Vec<CategoryShare>, StatsError> {
    if dataset.is_empty() {
        return Err(StatsError::EmptyDataset);
    }

    let mut counts = vec![0usize; categories.len()];
    for record in &dataset.records {
        let Some(value) = record.text(column) else {
            continue;
        };
        match categories.iter().position(|c| *c == value) {
            Some(idx) => counts[idx] += 1,
            None => warn!("unexpected {column} value: {value}"),
        }
    }

    let total = dataset.len() as f64;
    Ok(categories
        .iter()
        .zip(counts)
        .map(|(label, count)| CategoryShare {
            label: label.to_string(),
            percentage: 100.0 * count as f64 / total,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// The summary bundle
// ---------------------------------------------------------------------------

/// Share of records falling into the three fixed interest-rate bands.
/// Non-numeric rates land in no band (but remain in the total).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestRateDistribution {
    /// Rate below 7%.
    pub low: f64,
    /// Rate in [7%, 15%].
    pub medium: f64,
    /// Rate above 15%.
    pub high: f64,
}

/// The full statistics bundle: a pure function of one dataset, computed at
/// full precision.  [`SummaryStats::report`] formats it for the JSON
/// boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub average_credit_score: f64,
    pub total_loan_approvals: usize,
    pub average_age: f64,
    pub approval_rate: f64,
    pub average_loan_amount: f64,
    pub average_experience: f64,
    pub renter_percentage: f64,
    pub owner_percentage: f64,
    pub education_breakdown: Vec<CategoryShare>,
    pub loan_intent_breakdown: Vec<CategoryShare>,
    pub interest_rate_distribution: InterestRateDistribution,
    pub default_rate: f64,
}

impl SummaryStats {
    pub fn compute(dataset: &LoanDataset) -> Result<Self, StatsError> {
        if dataset.is_empty() {
            return Err(StatsError::EmptyDataset);
        }

        let approved = |r: &Record| r.number(COL_LOAN_STATUS) == Some(1.0);

        Ok(SummaryStats {
            average_credit_score: mean(dataset, COL_CREDIT_SCORE)?,
            total_loan_approvals: count_matching(dataset, approved),
            average_age: mean(dataset, COL_PERSON_AGE)?,
            approval_rate: rate(dataset, approved)?,
            average_loan_amount: mean(dataset, COL_LOAN_AMOUNT)?,
            average_experience: mean(dataset, COL_EMPLOYMENT_EXP)?,
            renter_percentage: rate(dataset, |r| r.text(COL_HOME_OWNERSHIP) == Some("RENT"))?,
            owner_percentage: rate(dataset, |r| r.text(COL_HOME_OWNERSHIP) == Some("OWN"))?,
            education_breakdown: category_breakdown(dataset, COL_EDUCATION, &EDUCATION_LEVELS)?,
            loan_intent_breakdown: category_breakdown(dataset, COL_LOAN_INTENT, &LOAN_INTENTS)?,
            interest_rate_distribution: InterestRateDistribution {
                low: rate(dataset, |r| {
                    r.number(COL_INTEREST_RATE).is_some_and(|v| v < 7.0)
                })?,
                medium: rate(dataset, |r| {
                    r.number(COL_INTEREST_RATE)
                        .is_some_and(|v| (7.0..=15.0).contains(&v))
                })?,
                high: rate(dataset, |r| {
                    r.number(COL_INTEREST_RATE).is_some_and(|v| v > 15.0)
                })?,
            },
            default_rate: rate(dataset, |r| r.text(COL_PRIOR_DEFAULTS) == Some("Yes"))?,
        })
    }

    /// Format the bundle for the JSON boundary: averages and percentages as
    /// two-decimal strings, counts untouched.
    pub fn report(&self) -> StatsReport {
        StatsReport {
            average_credit_score: fmt2(self.average_credit_score),
            total_loan_approvals: self.total_loan_approvals,
            average_age: fmt2(self.average_age),
            approval_rate: fmt2(self.approval_rate),
            average_loan_amount: fmt2(self.average_loan_amount),
            average_experience: fmt2(self.average_experience),
            home_ownership: HomeOwnershipReport {
                renter_percentage: fmt2(self.renter_percentage),
                owner_percentage: fmt2(self.owner_percentage),
            },
            education_breakdown: self.education_breakdown.iter().map(share_report).collect(),
            loan_intent_breakdown: self
                .loan_intent_breakdown
                .iter()
                .map(share_report)
                .collect(),
            interest_rate_distribution: InterestRateReport {
                low: fmt2(self.interest_rate_distribution.low),
                medium: fmt2(self.interest_rate_distribution.medium),
                high: fmt2(self.interest_rate_distribution.high),
            },
            default_rate: fmt2(self.default_rate),
        }
    }
}

// ---------------------------------------------------------------------------
// Presentation-boundary report (two-decimal display convention)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HomeOwnershipReport {
    pub renter_percentage: String,
    pub owner_percentage: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryShareReport {
    pub label: String,
    pub percentage: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterestRateReport {
    pub low: String,
    pub medium: String,
    pub high: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub average_credit_score: String,
    pub total_loan_approvals: usize,
    pub average_age: String,
    pub approval_rate: String,
    pub average_loan_amount: String,
    pub average_experience: String,
    pub home_ownership: HomeOwnershipReport,
    pub education_breakdown: Vec<CategoryShareReport>,
    pub loan_intent_breakdown: Vec<CategoryShareReport>,
    pub interest_rate_distribution: InterestRateReport,
    pub default_rate: String,
}

fn fmt2(value: f64) -> String {
    format!("{value:.2}")
}

fn share_report(share: &CategoryShare) -> CategoryShareReport {
    CategoryShareReport {
        label: share.label.clone(),
        percentage: fmt2(share.percentage),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::data::model::FieldValue;

    use super::*;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        let fields: BTreeMap<String, FieldValue> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Record::new(fields)
    }

    fn number(v: f64) -> FieldValue {
        FieldValue::Number(v)
    }

    fn text(v: &str) -> FieldValue {
        FieldValue::Text(v.to_string())
    }

    fn dataset(records: Vec<Record>) -> LoanDataset {
        LoanDataset {
            records,
            columns: Vec::new(),
        }
    }

    /// Four rows exercising every aggregated column.
    fn sample() -> LoanDataset {
        dataset(vec![
            record(&[
                (COL_CREDIT_SCORE, number(600.0)),
                (COL_LOAN_STATUS, number(1.0)),
                (COL_PERSON_AGE, number(22.0)),
                (COL_LOAN_AMOUNT, number(1000.0)),
                (COL_EMPLOYMENT_EXP, number(1.0)),
                (COL_HOME_OWNERSHIP, text("RENT")),
                (COL_EDUCATION, text("Bachelor")),
                (COL_LOAN_INTENT, text("PERSONAL")),
                (COL_INTEREST_RATE, number(5.0)),
                (COL_PRIOR_DEFAULTS, text("No")),
            ]),
            record(&[
                (COL_CREDIT_SCORE, number(650.0)),
                (COL_LOAN_STATUS, number(0.0)),
                (COL_PERSON_AGE, number(30.0)),
                (COL_LOAN_AMOUNT, number(2000.0)),
                (COL_EMPLOYMENT_EXP, number(5.0)),
                (COL_HOME_OWNERSHIP, text("OWN")),
                (COL_EDUCATION, text("Master")),
                (COL_LOAN_INTENT, text("EDUCATION")),
                (COL_INTEREST_RATE, number(7.0)),
                (COL_PRIOR_DEFAULTS, text("Yes")),
            ]),
            record(&[
                (COL_CREDIT_SCORE, number(700.0)),
                (COL_LOAN_STATUS, number(1.0)),
                (COL_PERSON_AGE, number(40.0)),
                (COL_LOAN_AMOUNT, number(3000.0)),
                (COL_EMPLOYMENT_EXP, number(10.0)),
                (COL_HOME_OWNERSHIP, text("RENT")),
                (COL_EDUCATION, text("High School")),
                (COL_LOAN_INTENT, text("VENTURE")),
                (COL_INTEREST_RATE, number(15.0)),
                (COL_PRIOR_DEFAULTS, text("No")),
            ]),
            record(&[
                (COL_CREDIT_SCORE, number(750.0)),
                (COL_LOAN_STATUS, number(0.0)),
                (COL_PERSON_AGE, number(28.0)),
                (COL_LOAN_AMOUNT, number(6000.0)),
                (COL_EMPLOYMENT_EXP, number(4.0)),
                (COL_HOME_OWNERSHIP, text("MORTGAGE")),
                (COL_EDUCATION, text("Associate")),
                (COL_LOAN_INTENT, text("MEDICAL")),
                (COL_INTEREST_RATE, number(16.5)),
                (COL_PRIOR_DEFAULTS, text("Yes")),
            ]),
        ])
    }

    #[test]
    fn mean_is_the_arithmetic_mean() {
        let ds = dataset(vec![
            record(&[(COL_LOAN_AMOUNT, number(1000.0))]),
            record(&[(COL_LOAN_AMOUNT, number(2000.0))]),
            record(&[(COL_LOAN_AMOUNT, number(3000.0))]),
        ]);
        assert_eq!(mean(&ds, COL_LOAN_AMOUNT).unwrap(), 2000.0);
    }

    #[test]
    fn approval_rate_two_of_four_is_fifty() {
        let stats = SummaryStats::compute(&sample()).unwrap();
        assert_eq!(stats.total_loan_approvals, 2);
        assert_eq!(stats.approval_rate, 50.0);
        assert_eq!(stats.report().approval_rate, "50.00");
    }

    #[test]
    fn every_percentage_lies_in_range() {
        let stats = SummaryStats::compute(&sample()).unwrap();
        let mut percentages = vec![
            stats.approval_rate,
            stats.renter_percentage,
            stats.owner_percentage,
            stats.interest_rate_distribution.low,
            stats.interest_rate_distribution.medium,
            stats.interest_rate_distribution.high,
            stats.default_rate,
        ];
        percentages.extend(stats.education_breakdown.iter().map(|s| s.percentage));
        percentages.extend(stats.loan_intent_breakdown.iter().map(|s| s.percentage));

        for p in percentages {
            assert!((0.0..=100.0).contains(&p), "{p} out of range");
        }
    }

    #[test]
    fn unknown_categories_dilute_the_breakdown() {
        // One of four rows has "Associate", which is outside the fixed set:
        // the breakdown covers only 75% of the dataset.
        let stats = SummaryStats::compute(&sample()).unwrap();
        let covered: f64 = stats.education_breakdown.iter().map(|s| s.percentage).sum();
        assert_eq!(covered, 75.0);

        let labels: Vec<&str> = stats
            .education_breakdown
            .iter()
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(labels, EDUCATION_LEVELS);
    }

    #[test]
    fn interest_bands_include_their_edges() {
        // 5.0 → low, 7.0 and 15.0 → medium, 16.5 → high.
        let stats = SummaryStats::compute(&sample()).unwrap();
        assert_eq!(stats.interest_rate_distribution.low, 25.0);
        assert_eq!(stats.interest_rate_distribution.medium, 50.0);
        assert_eq!(stats.interest_rate_distribution.high, 25.0);
    }

    #[test]
    fn non_numeric_cells_dilute_the_mean() {
        let ds = dataset(vec![
            record(&[(COL_CREDIT_SCORE, number(600.0))]),
            record(&[(COL_CREDIT_SCORE, text("n/a"))]),
        ]);
        assert_eq!(mean(&ds, COL_CREDIT_SCORE).unwrap(), 300.0);
    }

    #[test]
    fn empty_dataset_is_an_error_not_nan() {
        let ds = dataset(Vec::new());
        assert_eq!(mean(&ds, COL_CREDIT_SCORE), Err(StatsError::EmptyDataset));
        assert_eq!(
            rate(&ds, |_| true).unwrap_err(),
            StatsError::EmptyDataset
        );
        assert_eq!(
            category_breakdown(&ds, COL_EDUCATION, &EDUCATION_LEVELS).unwrap_err(),
            StatsError::EmptyDataset
        );
        assert!(SummaryStats::compute(&ds).is_err());
    }

    #[test]
    fn report_formats_two_decimals() {
        let stats = SummaryStats::compute(&sample()).unwrap();
        let report = stats.report();
        assert_eq!(report.average_loan_amount, "3000.00");
        assert_eq!(report.home_ownership.renter_percentage, "50.00");
        assert_eq!(report.default_rate, "50.00");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["approval_rate"], "50.00");
        assert_eq!(json["total_loan_approvals"], 2);
    }
}
