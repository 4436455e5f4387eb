//! Monetary aggregation over normalized records.
//!
//! Five category sums are fixed linear combinations of the monetary column
//! positions: each contribution column (9-14, 23) pairs with its adjustment
//! column (17-22, 24). Salary columns 15-16 take part in no category.

use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::payroll::unifier::model::EXTRACTED_FIELDS;
use crate::payroll::unifier::normalize;

/// Personal contribution (9) + its adjustment (17).
pub const PERSONAL_COLUMNS: [usize; 2] = [9, 17];
/// Secondary affiliate, child under 35, dependent minor (10, 12, 13) plus
/// their adjustments (18, 20, 21).
pub const AFFILIATE_COLUMNS: [usize; 6] = [10, 12, 13, 18, 20, 21];
/// Voluntary fund (11) + adjustment (19).
pub const VOLUNTARY_FUND_COLUMNS: [usize; 2] = [11, 19];
/// Assistance credit (14) + adjustment (22).
pub const ASSISTANCE_CREDIT_COLUMNS: [usize; 2] = [14, 22];
/// Employer contribution (23) + adjustment (24).
pub const EMPLOYER_COLUMNS: [usize; 2] = [23, 24];

/// The five named monetary aggregates of one record set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct CategorySums {
    pub personal: f64,
    pub affiliate: f64,
    pub voluntary_fund: f64,
    pub assistance_credit: f64,
    pub employer: f64,
}

impl CategorySums {
    /// Sum of the five categories.
    pub fn total(&self) -> f64 {
        self.personal + self.affiliate + self.voluntary_fund + self.assistance_credit + self.employer
    }

    /// Named view over the five categories plus the derived total, in a
    /// stable order shared by reports and the reconciliation check.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("personal", self.personal),
            ("affiliate", self.affiliate),
            ("voluntary-fund", self.voluntary_fund),
            ("assistance-credit", self.assistance_credit),
            ("employer", self.employer),
            ("total", self.total()),
        ]
    }
}

impl AddAssign for CategorySums {
    fn add_assign(&mut self, rhs: Self) {
        self.personal += rhs.personal;
        self.affiliate += rhs.affiliate;
        self.voluntary_fund += rhs.voluntary_fund;
        self.assistance_credit += rhs.assistance_credit;
        self.employer += rhs.employer;
    }
}

impl Add for CategorySums {
    type Output = CategorySums;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

/// Result of aggregating one record set.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AggregateOutcome {
    pub sums: CategorySums,
    /// Rows that contributed to the sums.
    pub rows: usize,
    /// Rows skipped for having fewer than 24 fields.
    pub skipped: usize,
}

/// Computes the category sums of a row set.
///
/// Rows shorter than the 24 extracted columns are skipped and counted, not
/// fatal. Cell values run through the same coercion as extraction, so
/// unparseable cells contribute zero.
pub fn sum_categories<'a, I>(rows: I) -> AggregateOutcome
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut outcome = AggregateOutcome::default();

    for row in rows {
        if row.len() < EXTRACTED_FIELDS {
            outcome.skipped += 1;
            continue;
        }

        outcome.sums.personal += column_sum(row, &PERSONAL_COLUMNS);
        outcome.sums.affiliate += column_sum(row, &AFFILIATE_COLUMNS);
        outcome.sums.voluntary_fund += column_sum(row, &VOLUNTARY_FUND_COLUMNS);
        outcome.sums.assistance_credit += column_sum(row, &ASSISTANCE_CREDIT_COLUMNS);
        outcome.sums.employer += column_sum(row, &EMPLOYER_COLUMNS);
        outcome.rows += 1;
    }

    outcome
}

fn column_sum(row: &[String], positions: &[usize]) -> f64 {
    positions
        .iter()
        .map(|&position| {
            row.get(position - 1)
                .map(|value| normalize::parse_amount(value))
                .unwrap_or(0.0)
        })
        .sum()
}
