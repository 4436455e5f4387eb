//! Processing-period handling.
//!
//! A run processes one calendar month, passed down explicitly from the
//! entry point; nothing reads the wall clock from ambient state. June and
//! December carry an extra half-year bonus payment, so those months expand
//! into a second period backed by its own worksheet and extract.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::payroll::unifier::error::{Result, UnifierError};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Worksheet tab names used by the source workbooks for the bonus periods.
const FIRST_BONUS_SHEET: &str = "1º sac";
const SECOND_BONUS_SHEET: &str = "2º sac";

/// One payroll period: a calendar month or a half-year bonus payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    Month(u32),
    FirstBonus,
    SecondBonus,
}

impl Period {
    /// Parses a zero-padded month number (`"01"` to `"12"`).
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().parse::<u32>() {
            Ok(month @ 1..=12) => Ok(Period::Month(month)),
            _ => Err(UnifierError::InvalidPeriod(raw.to_string())),
        }
    }

    /// The month preceding `today`, the default period of a run.
    pub fn previous_month(today: NaiveDate) -> Self {
        let month = today.month();
        Period::Month(if month == 1 { 12 } else { month - 1 })
    }

    /// All periods a run for this month covers. June and December add
    /// their half-year bonus period.
    pub fn expand(self) -> Vec<Period> {
        match self {
            Period::Month(6) => vec![self, Period::FirstBonus],
            Period::Month(12) => vec![self, Period::SecondBonus],
            other => vec![other],
        }
    }

    /// Name of the worksheet holding this period inside a source workbook.
    pub fn sheet_name(&self) -> String {
        match self {
            Period::Month(month) => format!("{month:02}"),
            Period::FirstBonus => FIRST_BONUS_SHEET.to_string(),
            Period::SecondBonus => SECOND_BONUS_SHEET.to_string(),
        }
    }

    /// Short label used in generated file names (`Unified_<Label><Year>.csv`).
    pub fn label(&self) -> String {
        match self {
            Period::Month(month) => MONTH_NAMES
                .get(*month as usize - 1)
                .unwrap_or(&"???")
                .to_string(),
            Period::FirstBonus => "1SAC".to_string(),
            Period::SecondBonus => "2SAC".to_string(),
        }
    }

    /// Calendar year the period belongs to. A December or second-bonus run
    /// executes in January and settles the previous year.
    pub fn year_for(self, today: NaiveDate) -> i32 {
        match self {
            Period::Month(12) | Period::SecondBonus => today.year() - 1,
            _ => today.year(),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sheet_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn parses_zero_padded_months() {
        assert_eq!(Period::parse("06").unwrap(), Period::Month(6));
        assert_eq!(Period::parse("12").unwrap(), Period::Month(12));
        assert!(Period::parse("13").is_err());
        assert!(Period::parse("bonus").is_err());
    }

    #[test]
    fn june_and_december_gain_a_bonus_period() {
        assert_eq!(
            Period::Month(6).expand(),
            vec![Period::Month(6), Period::FirstBonus]
        );
        assert_eq!(
            Period::Month(12).expand(),
            vec![Period::Month(12), Period::SecondBonus]
        );
        assert_eq!(Period::Month(3).expand(), vec![Period::Month(3)]);
    }

    #[test]
    fn sheet_names_match_workbook_tabs() {
        assert_eq!(Period::Month(6).sheet_name(), "06");
        assert_eq!(Period::FirstBonus.sheet_name(), "1º sac");
    }

    #[test]
    fn previous_month_wraps_january_to_december() {
        assert_eq!(Period::previous_month(date(2026, 1, 5)), Period::Month(12));
        assert_eq!(Period::previous_month(date(2026, 8, 29)), Period::Month(7));
    }

    #[test]
    fn december_runs_settle_the_previous_year() {
        assert_eq!(Period::Month(12).year_for(date(2026, 1, 5)), 2025);
        assert_eq!(Period::SecondBonus.year_for(date(2026, 1, 5)), 2025);
        assert_eq!(Period::Month(7).year_for(date(2026, 8, 29)), 2026);
    }
}
