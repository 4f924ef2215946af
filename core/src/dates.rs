//! Calendar-month arithmetic.
//!
//! Account dates are normalized to the first day of their month. Panel
//! rows are keyed by the last day of each calendar month.

use chrono::{Datelike, Days, Months, NaiveDate};

/// Map a date to the first day of its calendar month. Missing dates stay missing.
pub fn normalize(date: Option<NaiveDate>) -> Option<NaiveDate> {
    date.map(first_of_month)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Last calendar day of the month containing `date`.
/// None only at the upper edge of the representable range.
pub fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
}

/// Whole calendar months from `from` to `to`, ignoring the day of month.
/// Negative when `to` lies in an earlier month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    12 * (to.year() - from.year()) + (to.month() as i32 - from.month() as i32)
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Every month-end date `m` with `from <= m <= through`, ascending.
pub fn month_ends(from: NaiveDate, through: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut cursor = month_end(from);
    while let Some(m) = cursor {
        if m > through {
            break;
        }
        if m >= from {
            months.push(m);
        }
        cursor = m.succ_opt().and_then(month_end);
    }
    months
}
