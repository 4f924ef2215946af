//! Panel expansion, survival flag and value accumulation tests.

use chrono::NaiveDate;
use cohort_core::{
    panel::{expand, is_grouped_by_account, PanelRow},
    summary::summarize,
    Cell, Dataset, PipelineConfig, SubscriptionData,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn push(ds: &mut Dataset, id: &str, start: NaiveDate, end: Option<NaiveDate>, initial: f64, current: f64) {
    ds.push_row(id, vec![
        ("start_date", Cell::from(start)),
        ("end_date", Cell::from(end)),
        ("initial_amount", Cell::from(initial)),
        ("current_amount", Cell::from(current)),
    ]).unwrap();
}

fn fixture() -> Dataset {
    let mut ds = Dataset::new();
    push(&mut ds, "early", d(2020, 1, 20), None, 100.0, 150.0);
    push(&mut ds, "churned", d(2020, 3, 2), Some(d(2020, 7, 14)), 60.0, 30.0);
    push(&mut ds, "late", d(2020, 11, 1), None, 40.0, 40.0);
    push(&mut ds, "same-month", d(2020, 5, 5), Some(d(2020, 5, 25)), 10.0, 10.0);
    ds
}

fn build() -> SubscriptionData {
    let config = PipelineConfig::default_test().with_as_of(d(2021, 3, 15));
    SubscriptionData::build(&fixture(), &config).unwrap()
}

fn runs(data: &SubscriptionData) -> Vec<Vec<&PanelRow>> {
    data.accounts().iter().map(|a| data.panel_for(&a.account_id)).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn grid_spans_earliest_start_through_as_of() {
    let config = PipelineConfig::default_test();
    let accounts = summarize(&fixture(), &config, d(2021, 3, 15)).unwrap();
    let rows = expand(&accounts, d(2021, 3, 15));

    let first = rows.iter().map(|r| r.end_of_month).min().unwrap();
    let last = rows.iter().map(|r| r.end_of_month).max().unwrap();
    assert_eq!(first, d(2020, 1, 31));
    assert_eq!(last, d(2021, 2, 28), "March 2021 has not ended by the 15th");

    // early: Jan 2020..Feb 2021 = 14, churned: Mar..Feb = 12, late: Nov..Feb = 4, same-month: May..Feb = 10
    assert_eq!(rows.len(), 14 + 12 + 4 + 10);
}

#[test]
fn expanded_rows_are_grouped_by_account_and_month() {
    let accounts = summarize(&fixture(), &PipelineConfig::default_test(), d(2021, 3, 15)).unwrap();
    let mut rows = expand(&accounts, d(2021, 3, 15));
    assert!(is_grouped_by_account(&rows, &accounts), "expand output must already be ordered");

    let order: Vec<_> = rows.chunk_by(|a, b| a.account_id == b.account_id).map(|run| run[0].account_id.clone()).collect();
    assert_eq!(order, ["early", "churned", "late", "same-month"]);

    rows.swap(0, 1);
    assert!(!is_grouped_by_account(&rows, &accounts));
}

#[test]
fn no_row_precedes_its_account_start() {
    let data = build();
    for row in data.panel() {
        assert!(row.end_of_month >= row.start_date, "row {row:?} precedes its start");
        assert!(row.age.is_some());
    }
}

#[test]
fn keys_are_unique() {
    let data = build();
    let mut keys: Vec<_> = data.panel().iter().map(|r| (r.account_id.clone(), r.end_of_month)).collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), before);
}

#[test]
fn months_alive_increments_by_alive() {
    let data = build();
    for run in runs(&data) {
        let mut previous = 0;
        for row in run {
            assert_eq!(row.months_alive, previous + u32::from(row.alive),
                "months_alive for {} at {}", row.account_id, row.end_of_month);
            previous = row.months_alive;
        }
    }
}

#[test]
fn churned_account_flags() {
    let data = build();
    let rows = data.panel_for("churned");

    let starting: Vec<_> = rows.iter().filter(|r| r.is_starting_month).map(|r| r.end_of_month).collect();
    let cancelling: Vec<_> = rows.iter().filter(|r| r.is_cancelation_month).map(|r| r.end_of_month).collect();
    assert_eq!(starting, vec![d(2020, 3, 31)]);
    assert_eq!(cancelling, vec![d(2020, 7, 31)]);

    let alive: Vec<_> = rows.iter().filter(|r| r.alive).map(|r| r.end_of_month).collect();
    assert_eq!(alive, vec![d(2020, 3, 31), d(2020, 4, 30), d(2020, 5, 31), d(2020, 6, 30)]);
    assert_eq!(rows.last().unwrap().months_alive, 4);
}

#[test]
fn same_month_start_and_cancel_is_never_alive() {
    let data = build();
    let rows = data.panel_for("same-month");
    assert!(rows[0].is_starting_month && rows[0].is_cancelation_month);
    assert!(rows.iter().all(|r| !r.alive));
    assert!(rows.iter().all(|r| r.value_to_date_base == 0.0));
}

#[test]
fn value_to_date_is_non_decreasing() {
    let data = build();
    for run in runs(&data) {
        for pair in run.windows(2) {
            assert!(pair[1].value_to_date_base >= pair[0].value_to_date_base,
                "base to-date dropped for {} at {}", pair[1].account_id, pair[1].end_of_month);
            assert!(pair[1].value_to_date_linear >= pair[0].value_to_date_linear,
                "linear to-date dropped for {} at {}", pair[1].account_id, pair[1].end_of_month);
        }
    }
}

#[test]
fn linear_value_stays_between_initial_and_last() {
    let data = build();
    for row in data.panel() {
        let account = data.accounts().get(&row.account_id).unwrap();
        let a = f64::from(u8::from(row.alive));
        let lo = (account.subscription_initial * a).min(account.subscription_last * a);
        let hi = (account.subscription_initial * a).max(account.subscription_last * a);
        assert!(
            row.subscription_value_linear >= lo - 1e-9 && row.subscription_value_linear <= hi + 1e-9,
            "{} at {}: {} not in [{lo}, {hi}]",
            row.account_id, row.end_of_month, row.subscription_value_linear
        );
    }
}

#[test]
fn declining_account_converges_to_last_amount() {
    let data = build();
    let rows = data.panel_for("churned");
    // age 4 (Mar → Jul 2020), trend (30 - 60) / 3 = -10
    let linear: Vec<_> = rows.iter().take(4).map(|r| r.subscription_value_linear).collect();
    assert_eq!(linear, vec![60.0, 50.0, 40.0, 30.0]);
    assert_eq!(rows[3].value_to_date_linear, 180.0);
    assert!(rows[4..].iter().all(|r| r.subscription_value_linear == 0.0));
}

#[test]
fn empty_grid_when_as_of_precedes_first_month_end() {
    let config = PipelineConfig::default_test().with_as_of(d(2020, 1, 25));
    let data = SubscriptionData::build(&fixture(), &config).unwrap();
    assert!(data.panel().is_empty());
    assert_eq!(data.accounts().len(), 4);
}

#[test]
fn account_without_start_date_is_kept_out_of_the_panel() {
    let mut ds = fixture();
    ds.push_row("undated", vec![
        ("start_date", Cell::Null),
        ("end_date", Cell::Null),
        ("initial_amount", Cell::from(5.0)),
        ("current_amount", Cell::from(5.0)),
    ]).unwrap();
    let config = PipelineConfig::default_test().with_as_of(d(2021, 3, 15));
    let data = SubscriptionData::build(&ds, &config).unwrap();

    assert_eq!(data.accounts().get("undated").unwrap().age, 1);
    assert!(data.panel_for("undated").is_empty());
}
