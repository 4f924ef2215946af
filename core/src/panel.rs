//! Panel expander: the account × month grid.
//!
//! The grid runs from the month of the earliest start date through the
//! last month end on or before `as_of`. Rows before an account's start are
//! never emitted, so the table is O(accounts × months) at most.

use crate::{
    dates::month_ends,
    summary::AccountTable,
    types::{AccountId, Amount, MonthEnd},
};
use chrono::NaiveDate;
use serde::Serialize;

/// One account in one calendar month. Keyed by (account_id, end_of_month).
///
/// `expand` fills the key and the account dates; the panel stages fill
/// everything else.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PanelRow {
    pub account_id:                AccountId,
    pub end_of_month:              MonthEnd,
    pub start_date:                NaiveDate,
    pub end_date:                  Option<NaiveDate>,
    /// Months since start. None only for rows preceding the start.
    pub age:                       Option<u32>,
    pub alive:                     bool,
    pub is_starting_month:         bool,
    pub is_cancelation_month:      bool,
    pub months_alive:              u32,
    pub subscription_value_base:   Amount,
    pub subscription_value_linear: Amount,
    pub value_to_date_base:        Amount,
    pub value_to_date_linear:      Amount,
}

impl PanelRow {
    pub fn skeleton(account_id: AccountId, start_date: NaiveDate, end_date: Option<NaiveDate>, end_of_month: MonthEnd) -> Self {
        Self {
            account_id,
            end_of_month,
            start_date,
            end_date,
            age: None,
            alive: false,
            is_starting_month: false,
            is_cancelation_month: false,
            months_alive: 0,
            subscription_value_base: 0.0,
            subscription_value_linear: 0.0,
            value_to_date_base: 0.0,
            value_to_date_linear: 0.0,
        }
    }
}

/// Build the pruned grid for every account with a known start date.
pub fn expand(accounts: &AccountTable, through: NaiveDate) -> Vec<PanelRow> {
    let Some(earliest) = accounts.earliest_start() else {
        log::warn!("no account has a start date; the panel is empty");
        return Vec::new();
    };
    let months = month_ends(earliest, through);
    if months.is_empty() {
        log::warn!("no month ends between {earliest} and {through}; the panel is empty");
        return Vec::new();
    }

    let bound = accounts.len() * months.len();
    log::debug!(
        "expanding {} accounts x {} months (grid bound {bound})",
        accounts.len(),
        months.len()
    );

    let mut rows = Vec::with_capacity(bound);
    for account in accounts.iter() {
        let Some(start) = account.start_date else { continue };
        // months ascend, so every month end from the first one >= start qualifies
        let first = months.partition_point(|m| *m < start);
        for &end_of_month in &months[first..] {
            rows.push(PanelRow::skeleton(
                account.account_id.clone(),
                start,
                account.end_date,
                end_of_month,
            ));
        }
    }
    log::info!("panel expanded to {} rows ({} .. {})", rows.len(), months[0], months[months.len() - 1]);
    rows
}

/// True when rows are grouped by account in summary order, each group
/// ascending by month. `expand` always emits this order.
pub fn is_grouped_by_account(rows: &[PanelRow], accounts: &AccountTable) -> bool {
    rows.windows(2).all(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        if a.account_id == b.account_id {
            a.end_of_month < b.end_of_month
        } else {
            accounts.position(&a.account_id) < accounts.position(&b.account_id)
        }
    })
}

/// Contiguous per-account runs. Rows must satisfy `is_grouped_by_account`.
pub fn account_runs_mut(rows: &mut [PanelRow]) -> impl Iterator<Item = &mut [PanelRow]> {
    rows.chunk_by_mut(|a, b| a.account_id == b.account_id)
}

/// Running sum that skips NaN addends; a NaN addend yields a NaN row total.
pub fn running_sum<G, S>(run: &mut [PanelRow], get: G, mut set: S)
where
    G: Fn(&PanelRow) -> Amount,
    S: FnMut(&mut PanelRow, Amount),
{
    let mut total = 0.0;
    for row in run.iter_mut() {
        let addend = get(row);
        if addend.is_nan() {
            set(row, f64::NAN);
        } else {
            total += addend;
            set(row, total);
        }
    }
}
