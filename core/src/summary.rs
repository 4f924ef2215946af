//! Lifecycle summarizer: the one-row-per-account table.
//!
//! For every dataset row this derives:
//!   1. Start and end dates, normalized to the first of the month
//!   2. Age in whole months (floor 1), measured to `as_of` while active
//!   3. The alive flag
//!   4. Initial, last and current subscription amounts
//!   5. The per-month linear subscription trend
//!
//! then merges the configured pass-through columns.

use crate::{
    columns::merge_columns,
    config::{PipelineConfig, DEFAULT_END_DATE_COL, DEFAULT_START_DATE_COL},
    dataset::{Cell, Dataset, DatasetRow},
    dates::{months_between, normalize},
    error::{PanelError, PanelResult},
    types::{AccountId, Amount},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountRecord {
    pub account_id:           AccountId,
    pub start_date:           Option<NaiveDate>,
    pub end_date:             Option<NaiveDate>,
    pub age:                  u32,
    pub alive:                bool,
    pub subscription_initial: Amount,
    pub subscription_last:    Amount,
    /// `subscription_last` while alive, zero once churned.
    pub subscription_current: Amount,
    /// NaN when either amount is missing.
    pub subscription_trend:   Amount,
    pub extra:                BTreeMap<String, Cell>,
}

/// Ordered account records with a by-identifier index.
#[derive(Debug, Clone, Default)]
pub struct AccountTable {
    extra_columns: Vec<String>,
    records:       Vec<AccountRecord>,
    index:         HashMap<AccountId, usize>,
}

impl AccountTable {
    pub fn new(extra_columns: Vec<String>, records: Vec<AccountRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.account_id.clone(), i))
            .collect();
        Self { extra_columns, records, index }
    }

    pub fn records(&self) -> &[AccountRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn get(&self, account_id: &str) -> Option<&AccountRecord> {
        self.position(account_id).map(|i| &self.records[i])
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.index.contains_key(account_id)
    }

    /// Row position of an account; panel rows are grouped in this order.
    pub fn position(&self, account_id: &str) -> Option<usize> {
        self.index.get(account_id).copied()
    }

    pub fn earliest_start(&self) -> Option<NaiveDate> {
        self.records.iter().filter_map(|r| r.start_date).min()
    }

    /// Copy the selected positions into a new table, in the given order.
    pub fn select(&self, positions: &[usize]) -> AccountTable {
        let records = positions
            .iter()
            .filter_map(|&i| self.records.get(i).cloned())
            .collect();
        AccountTable::new(self.extra_columns.clone(), records)
    }

    pub fn filter<F>(&self, keep: F) -> AccountTable
    where
        F: Fn(&AccountRecord) -> bool,
    {
        let records = self.records.iter().filter(|r| keep(r)).cloned().collect();
        AccountTable::new(self.extra_columns.clone(), records)
    }
}

/// Build the account summary from `dataset` under `config`.
pub fn summarize(
    dataset: &Dataset,
    config: &PipelineConfig,
    as_of: NaiveDate,
) -> PanelResult<AccountTable> {
    let start_col = date_column(dataset, config.start_date_col.as_deref(), DEFAULT_START_DATE_COL)?;
    let end_col = date_column(dataset, config.end_date_col.as_deref(), DEFAULT_END_DATE_COL)?;
    let age_col = bound_column(dataset, config.age_col.as_deref())?;
    let alive_col = bound_column(dataset, config.alive_col.as_deref())?;
    let initial_col = bound_column(dataset, config.subscription_initial.as_deref())?;
    let last_col = bound_column(dataset, config.subscription_current.as_deref())?;

    let mut records = Vec::with_capacity(dataset.len());
    for row in dataset.rows() {
        let start_date = normalize(row.get(start_col).as_date());
        let end_date = normalize(row.get(end_col).as_date());
        if start_date.is_none() {
            log::warn!("account {} has no start date; it is excluded from the panel", row.id);
        }

        let age = match age_col {
            Some(col) => explicit_age(row.get(col)),
            None => lifecycle_age(start_date, end_date, as_of),
        };
        let alive = match alive_col {
            Some(col) => row.get(col).as_flag().unwrap_or(end_date.is_none()),
            None => end_date.is_none(),
        };

        let subscription_initial = amount(row, initial_col);
        let subscription_last = amount(row, last_col);

        records.push(AccountRecord {
            account_id: row.id.clone(),
            start_date,
            end_date,
            age,
            alive,
            subscription_initial,
            subscription_last,
            subscription_current: if alive { subscription_last } else { 0.0 },
            subscription_trend: subscription_trend(subscription_initial, subscription_last, age),
            extra: BTreeMap::new(),
        });
    }

    let extra_columns = merge_columns(&config.additional_cols, dataset, &mut records)?;
    let table = AccountTable::new(extra_columns, records);
    log::info!(
        "summarized {} accounts ({} alive) as of {as_of}",
        table.len(),
        table.iter().filter(|r| r.alive).count()
    );
    Ok(table)
}

/// Months from start to end (or `as_of` while active), floored at 1.
pub fn lifecycle_age(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    as_of: NaiveDate,
) -> u32 {
    let Some(start) = start_date else { return 1 };
    let months = months_between(start, end_date.unwrap_or(as_of));
    months.max(1) as u32
}

/// Monthly linear drift between the first and last observed amounts.
pub fn subscription_trend(initial: Amount, last: Amount, age: u32) -> Amount {
    let span = age.saturating_sub(1).max(1);
    (last - initial) / f64::from(span)
}

fn explicit_age(cell: &Cell) -> u32 {
    let months = cell.as_f64().map(f64::trunc).unwrap_or(0.0);
    months.max(1.0) as u32
}

fn amount(row: &DatasetRow, column: Option<&str>) -> Amount {
    column
        .and_then(|c| row.get(c).as_f64())
        .unwrap_or(f64::NAN)
}

/// A required date column: the explicit binding, else the default name.
fn date_column<'a>(
    dataset: &Dataset,
    explicit: Option<&'a str>,
    default: &'a str,
) -> PanelResult<&'a str> {
    let column = explicit.unwrap_or(default);
    if dataset.has_column(column) {
        Ok(column)
    } else {
        Err(PanelError::MissingColumn { column: column.to_string() })
    }
}

/// An optional binding. Naming a column that does not exist is an error.
fn bound_column<'a>(dataset: &Dataset, explicit: Option<&'a str>) -> PanelResult<Option<&'a str>> {
    match explicit {
        Some(column) if !dataset.has_column(column) => {
            Err(PanelError::MissingColumn { column: column.to_string() })
        }
        other => Ok(other),
    }
}
