//! Survival flags for each panel row.
//!
//! Alive precedence, evaluated against the row's month end:
//!   1. Start month: dead only if the account also cancels that month
//!   2. Not yet started: dead
//!   3. End date strictly before the month end: dead
//!   4. Otherwise alive
//!
//! `months_alive` is a running count of alive months per account.

use crate::{
    dates::{months_between, same_month},
    error::PanelResult,
    panel::{account_runs_mut, PanelRow},
    stage::PanelStage,
    summary::AccountTable,
};
use chrono::NaiveDate;

/// Months from start to this month end; None if the month precedes the start.
pub fn panel_age(start_date: NaiveDate, end_of_month: NaiveDate) -> Option<u32> {
    if start_date > end_of_month {
        return None;
    }
    u32::try_from(months_between(start_date, end_of_month)).ok()
}

pub fn is_alive(start_date: NaiveDate, end_date: Option<NaiveDate>, end_of_month: NaiveDate) -> bool {
    if same_month(start_date, end_of_month) {
        return !end_date.is_some_and(|end| same_month(end, end_of_month));
    }
    if start_date > end_of_month {
        return false;
    }
    match end_date {
        Some(end) if end < end_of_month => false,
        _ => true,
    }
}

pub fn is_starting_month(start_date: NaiveDate, end_of_month: NaiveDate) -> bool {
    same_month(start_date, end_of_month)
}

pub fn is_cancelation_month(end_date: Option<NaiveDate>, end_of_month: NaiveDate) -> bool {
    end_date.is_some_and(|end| same_month(end, end_of_month))
}

pub struct SurvivalStage;

impl PanelStage for SurvivalStage {
    fn name(&self) -> &'static str { "survival" }

    fn apply(&self, rows: &mut [PanelRow], _accounts: &AccountTable) -> PanelResult<()> {
        for row in rows.iter_mut() {
            row.age = panel_age(row.start_date, row.end_of_month);
            row.alive = is_alive(row.start_date, row.end_date, row.end_of_month);
            row.is_starting_month = is_starting_month(row.start_date, row.end_of_month);
            row.is_cancelation_month = is_cancelation_month(row.end_date, row.end_of_month);
        }

        for run in account_runs_mut(rows) {
            let mut months_alive = 0;
            for row in run.iter_mut() {
                months_alive += u32::from(row.alive);
                row.months_alive = months_alive;
            }
        }

        log::debug!(
            "survival: {} of {} rows alive",
            rows.iter().filter(|r| r.alive).count(),
            rows.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn start_month_is_alive_unless_cancelled_that_month() {
        let start = d(2020, 1, 1);
        assert!(is_alive(start, None, d(2020, 1, 31)));
        assert!(is_alive(start, Some(d(2020, 3, 1)), d(2020, 1, 31)));
        assert!(!is_alive(start, Some(d(2020, 1, 1)), d(2020, 1, 31)));
    }

    #[test]
    fn months_after_cancellation_are_dead() {
        let start = d(2020, 1, 1);
        let end = Some(d(2020, 3, 1));
        assert!(is_alive(start, end, d(2020, 2, 29)));
        assert!(!is_alive(start, end, d(2020, 3, 31)), "cancellation month itself has ended");
        assert!(!is_alive(start, end, d(2020, 4, 30)));
    }

    #[test]
    fn not_yet_started_is_dead_with_undefined_age() {
        assert!(!is_alive(d(2020, 5, 1), None, d(2020, 4, 30)));
        assert_eq!(panel_age(d(2020, 5, 1), d(2020, 4, 30)), None);
        assert_eq!(panel_age(d(2020, 1, 1), d(2020, 3, 31)), Some(2));
        assert_eq!(panel_age(d(2020, 1, 1), d(2020, 1, 31)), Some(0));
    }

    #[test]
    fn month_flags_match_calendar_month() {
        assert!(is_starting_month(d(2020, 1, 1), d(2020, 1, 31)));
        assert!(!is_starting_month(d(2020, 1, 1), d(2020, 2, 29)));
        assert!(is_cancelation_month(Some(d(2020, 2, 1)), d(2020, 2, 29)));
        assert!(!is_cancelation_month(None, d(2020, 2, 29)));
    }
}
