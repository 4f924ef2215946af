//! Value projection for each panel row.
//!
//! Base value is the initial amount while alive. The linear value follows
//! the account's monthly trend from the initial amount but never moves past
//! the last observed amount. Both are accumulated per account.

use crate::{
    error::PanelResult,
    panel::{account_runs_mut, running_sum, PanelRow},
    stage::PanelStage,
    summary::AccountTable,
    types::Amount,
};

fn indicator(alive: bool) -> f64 {
    f64::from(u8::from(alive))
}

pub fn base_value(initial: Amount, alive: bool) -> Amount {
    initial * indicator(alive)
}

/// Trend-adjusted value bounded by the last observed amount.
///
/// Declining accounts (`last < initial`) never drop below `last`; growing
/// and flat accounts never rise above it. Missing amounts or age give NaN.
pub fn linear_value(initial: Amount, last: Amount, trend: Amount, age: Option<u32>, alive: bool) -> Amount {
    let Some(age) = age else { return f64::NAN };
    if initial.is_nan() || last.is_nan() {
        return f64::NAN;
    }
    let projected = if age > 0 { initial + trend * f64::from(age) } else { initial };
    if projected.is_nan() {
        return f64::NAN;
    }
    let bounded = if last < initial {
        last.max(projected)
    } else {
        last.min(projected)
    };
    bounded * indicator(alive)
}

pub struct ValueStage;

impl PanelStage for ValueStage {
    fn name(&self) -> &'static str { "valuation" }

    fn apply(&self, rows: &mut [PanelRow], accounts: &AccountTable) -> PanelResult<()> {
        for row in rows.iter_mut() {
            let Some(account) = accounts.get(&row.account_id) else {
                log::warn!("panel row for unknown account {}", row.account_id);
                row.subscription_value_base = f64::NAN;
                row.subscription_value_linear = f64::NAN;
                continue;
            };
            row.subscription_value_base = base_value(account.subscription_initial, row.alive);
            row.subscription_value_linear = linear_value(
                account.subscription_initial,
                account.subscription_last,
                account.subscription_trend,
                row.age,
                row.alive,
            );
        }

        for run in account_runs_mut(rows) {
            running_sum(run, |r| r.subscription_value_base, |r, v| r.value_to_date_base = v);
            running_sum(run, |r| r.subscription_value_linear, |r, v| r.value_to_date_linear = v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growing_account_is_capped_at_last_amount() {
        // trend 50/month from 100, last observed 150
        assert_eq!(linear_value(100.0, 150.0, 50.0, Some(1), true), 150.0);
        assert_eq!(linear_value(100.0, 150.0, 50.0, Some(2), true), 150.0);
        assert_eq!(linear_value(100.0, 300.0, 50.0, Some(2), true), 200.0);
    }

    #[test]
    fn declining_account_is_floored_at_last_amount() {
        assert_eq!(linear_value(100.0, 40.0, -20.0, Some(1), true), 80.0);
        assert_eq!(linear_value(100.0, 40.0, -20.0, Some(5), true), 40.0);
    }

    #[test]
    fn flat_account_takes_the_min_branch() {
        assert_eq!(linear_value(100.0, 100.0, 0.0, Some(3), true), 100.0);
    }

    #[test]
    fn age_zero_uses_initial_amount() {
        assert_eq!(linear_value(100.0, 150.0, 50.0, Some(0), true), 100.0);
        assert_eq!(linear_value(100.0, 40.0, -20.0, Some(0), true), 100.0);
    }

    #[test]
    fn dead_rows_are_zero_and_missing_inputs_are_nan() {
        assert_eq!(linear_value(100.0, 150.0, 50.0, Some(4), false), 0.0);
        assert_eq!(base_value(100.0, false), 0.0);
        assert!(linear_value(f64::NAN, 150.0, f64::NAN, Some(2), true).is_nan());
        assert!(linear_value(100.0, 150.0, 50.0, None, true).is_nan());
    }
}
