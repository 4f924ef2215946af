//! panel-runner: headless pipeline runner.
//!
//! Usage:
//!   panel-runner --data accounts.json --config pipeline.json
//!   panel-runner --data accounts.json --config pipeline.json --db panel.db
//!   panel-runner --data accounts.json --summary-json summary.json

use anyhow::Result;
use cohort_core::{
    panel::PanelRow,
    store::{PanelStore, Partition},
    Dataset, PipelineConfig, SubscriptionData,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_path = find_arg(&args, "--data")
        .ok_or_else(|| anyhow::anyhow!("--data <accounts.json> is required"))?;
    let config = match find_arg(&args, "--config") {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let id_col = find_arg(&args, "--id-col").unwrap_or(config.id_col.as_str());
    let db = find_arg(&args, "--db");

    println!("panel-runner");
    println!("  data:      {data_path}");
    println!("  id column: {id_col}");
    println!("  seed:      {}", config.seed);
    println!("  db:        {}", db.unwrap_or("(none)"));
    println!();

    let dataset = Dataset::load_json(data_path, id_col)?;
    log::info!("loaded {} accounts from {data_path}", dataset.len());
    let data = SubscriptionData::build(&dataset, &config)?;

    print_summary(&data);

    if let Some(path) = find_arg(&args, "--summary-json") {
        std::fs::write(path, data.summary_json()?)?;
        log::info!("account summary written to {path}");
    }

    if let Some(path) = db {
        let store = PanelStore::open(path)?;
        store.migrate()?;
        let run_id = store.insert_run(&data, env!("CARGO_PKG_VERSION"))?;
        store.save(&run_id, &data)?;
        println!();
        println!("  saved run:  {run_id}");
        println!("  rows (full/train/validation): {} / {} / {}",
            store.panel_row_count(&run_id, Partition::Full)?,
            store.panel_row_count(&run_id, Partition::Train)?,
            store.panel_row_count(&run_id, Partition::Validation)?,
        );
    }

    Ok(())
}

fn print_summary(data: &SubscriptionData) {
    let panel = data.panel();
    let alive_rows = panel.iter().filter(|r| r.alive).count();
    let alive_share = if panel.is_empty() { 0.0 } else { alive_rows as f64 / panel.len() as f64 };
    let first = panel.iter().map(|r| r.end_of_month).min();
    let last = panel.iter().map(|r| r.end_of_month).max();

    println!("=== RUN SUMMARY ===");
    println!("  as of:          {}", data.as_of());
    println!("  split:          {}", data.split_rule());
    println!("  accounts:       {}", data.accounts().len());
    println!("    training:     {}", data.train_accounts().len());
    println!("    validation:   {}", data.validation_accounts().len());
    println!("  panel rows:     {}", panel.len());
    println!("    training:     {}", data.train_panel().len());
    println!("    validation:   {}", data.validation_panel().len());
    match (first, last) {
        (Some(f), Some(l)) => println!("  months:         {f} .. {l}"),
        _ => println!("  months:         (none)"),
    }
    println!("  alive share:    {:.1}%", alive_share * 100.0);
    println!("  base value:     {:.2}", total(panel, |r| r.subscription_value_base));
    println!("  linear value:   {:.2}", total(panel, |r| r.subscription_value_linear));
}

/// Sum of a value column, skipping missing amounts.
fn total(rows: &[PanelRow], value: impl Fn(&PanelRow) -> f64) -> f64 {
    rows.iter().map(value).filter(|v| !v.is_nan()).sum()
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
