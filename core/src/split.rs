//! Training / validation partitioning.
//!
//! A fraction shuffles accounts with a seeded RNG and takes the leading
//! `floor(fraction * n)` for training. A date sends accounts that started
//! strictly before it to training. The panel follows the same rule: by
//! month end for a date, by account membership for a fraction.

use crate::{
    dataset::parse_date,
    error::{PanelError, PanelResult},
    panel::PanelRow,
    rng::SplitRng,
    summary::AccountTable,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `split_at` exactly as configured. Validated into a SplitRule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SplitAt {
    Fraction(f64),
    Date(NaiveDate),
    Text(String),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitRule {
    Fraction(f64),
    Cutoff(NaiveDate),
}

impl SplitRule {
    pub fn from_split_at(split_at: &SplitAt) -> PanelResult<Self> {
        match split_at {
            SplitAt::Fraction(f) if *f > 0.0 && *f <= 1.0 => Ok(Self::Fraction(*f)),
            SplitAt::Date(d) => Ok(Self::Cutoff(*d)),
            SplitAt::Text(s) => parse_date(s)
                .map(Self::Cutoff)
                .ok_or_else(|| invalid(s)),
            SplitAt::Fraction(f) => Err(invalid(f)),
            SplitAt::Other(v) => Err(invalid(v)),
        }
    }
}

fn invalid(value: impl fmt::Display) -> PanelError {
    PanelError::InvalidSplitRule { value: value.to_string() }
}

impl fmt::Display for SplitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fraction(x) => write!(f, "fraction:{x}"),
            Self::Cutoff(d) => write!(f, "cutoff:{d}"),
        }
    }
}

/// Partition accounts into (training, validation).
pub fn split_accounts(accounts: &AccountTable, rule: SplitRule, seed: u64) -> (AccountTable, AccountTable) {
    let (train, validation) = match rule {
        SplitRule::Fraction(fraction) => {
            let mut order: Vec<usize> = (0..accounts.len()).collect();
            SplitRng::new(seed).shuffle(&mut order);
            let n_train = ((fraction * accounts.len() as f64).floor() as usize).min(order.len());
            (accounts.select(&order[..n_train]), accounts.select(&order[n_train..]))
        }
        SplitRule::Cutoff(cutoff) => {
            let unplaced = accounts.iter().filter(|r| r.start_date.is_none()).count();
            if unplaced > 0 {
                log::warn!("{unplaced} accounts without a start date are in neither subset");
            }
            (
                accounts.filter(|r| r.start_date.is_some_and(|s| s < cutoff)),
                accounts.filter(|r| r.start_date.is_some_and(|s| s >= cutoff)),
            )
        }
    };
    log::info!("split {rule}: {} training, {} validation accounts", train.len(), validation.len());
    (train, validation)
}

/// Partition panel rows consistently with `split_accounts`.
pub fn split_panel(
    rows: &[PanelRow],
    rule: SplitRule,
    train: &AccountTable,
    validation: &AccountTable,
) -> (Vec<PanelRow>, Vec<PanelRow>) {
    match rule {
        SplitRule::Cutoff(cutoff) => rows.iter().cloned().partition(|r| r.end_of_month < cutoff),
        SplitRule::Fraction(_) => (
            rows.iter().filter(|r| train.contains(&r.account_id)).cloned().collect(),
            rows.iter().filter(|r| validation.contains(&r.account_id)).cloned().collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_outside_unit_interval_are_rejected() {
        assert_eq!(SplitRule::from_split_at(&SplitAt::Fraction(1.0)).unwrap(), SplitRule::Fraction(1.0));
        for bad in [0.0, -0.5, 1.5] {
            assert!(matches!(
                SplitRule::from_split_at(&SplitAt::Fraction(bad)),
                Err(PanelError::InvalidSplitRule { .. })
            ));
        }
    }

    #[test]
    fn text_must_parse_as_a_date() {
        let d = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        assert_eq!(SplitRule::from_split_at(&SplitAt::Text("2018-01-01".into())).unwrap(), SplitRule::Cutoff(d));
        assert!(matches!(
            SplitRule::from_split_at(&SplitAt::Text("soon".into())),
            Err(PanelError::InvalidSplitRule { .. })
        ));
    }

    #[test]
    fn other_json_values_are_rejected() {
        let split_at: SplitAt = serde_json::from_str("[1, 2]").unwrap();
        assert!(matches!(
            SplitRule::from_split_at(&split_at),
            Err(PanelError::InvalidSplitRule { .. })
        ));
        let split_at: SplitAt = serde_json::from_str("true").unwrap();
        assert!(SplitRule::from_split_at(&split_at).is_err());
    }
}
