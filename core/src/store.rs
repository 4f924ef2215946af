//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! A run's six views are written together in one transaction.

use crate::{
    error::PanelResult,
    panel::PanelRow,
    pipeline::SubscriptionData,
    summary::AccountTable,
    types::{Amount, RunId},
};
use rusqlite::{params, Connection, Transaction};

/// Which view a persisted row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Full,
    Train,
    Validation,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full       => "full",
            Self::Train      => "train",
            Self::Validation => "validation",
        }
    }
}

/// A persisted panel row, as read back for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPanelRow {
    pub end_of_month:              String,
    pub alive:                     bool,
    pub months_alive:              u32,
    pub subscription_value_linear: Option<f64>,
    pub value_to_date_linear:      Option<f64>,
}

pub struct PanelStore {
    conn: Connection,
}

impl PanelStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> PanelResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PanelResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PanelResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_panel.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, data: &SubscriptionData, version: &str) -> PanelResult<RunId> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO run (run_id, seed, split_rule, as_of, version) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                data.seed() as i64,
                data.split_rule().to_string(),
                data.as_of().to_string(),
                version,
            ],
        )?;
        Ok(run_id)
    }

    // ── Views ──────────────────────────────────────────────────

    pub fn save(&self, run_id: &str, data: &SubscriptionData) -> PanelResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        insert_accounts(&tx, run_id, Partition::Full, data.accounts())?;
        insert_accounts(&tx, run_id, Partition::Train, data.train_accounts())?;
        insert_accounts(&tx, run_id, Partition::Validation, data.validation_accounts())?;
        insert_panel(&tx, run_id, Partition::Full, data.panel())?;
        insert_panel(&tx, run_id, Partition::Train, data.train_panel())?;
        insert_panel(&tx, run_id, Partition::Validation, data.validation_panel())?;
        tx.commit()?;
        log::info!(
            "saved run {run_id}: {} accounts, {} panel rows",
            data.accounts().len(),
            data.panel().len()
        );
        Ok(())
    }

    pub fn account_count(&self, run_id: &str, partition: Partition) -> PanelResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM account_summary WHERE run_id = ?1 AND partition = ?2",
            params![run_id, partition.as_str()],
            |row| row.get(0),
        )?)
    }

    pub fn panel_row_count(&self, run_id: &str, partition: Partition) -> PanelResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM panel_row WHERE run_id = ?1 AND partition = ?2",
            params![run_id, partition.as_str()],
            |row| row.get(0),
        )?)
    }

    pub fn panel_rows_for_account(
        &self,
        run_id: &str,
        account_id: &str,
    ) -> PanelResult<Vec<StoredPanelRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT end_of_month, alive, months_alive, subscription_value_linear, value_to_date_linear
             FROM panel_row
             WHERE run_id = ?1 AND partition = 'full' AND account_id = ?2
             ORDER BY end_of_month ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, account_id], |row| {
                Ok(StoredPanelRow {
                    end_of_month:              row.get(0)?,
                    alive:                     row.get::<_, i64>(1)? != 0,
                    months_alive:              row.get::<_, i64>(2)? as u32,
                    subscription_value_linear: row.get(3)?,
                    value_to_date_linear:      row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn insert_accounts(
    tx: &Transaction<'_>,
    run_id: &str,
    partition: Partition,
    accounts: &AccountTable,
) -> PanelResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO account_summary (
            run_id, partition, account_id, start_date, end_date, age, alive,
            subscription_initial, subscription_last, subscription_current,
            subscription_trend, extra_json
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
    )?;
    for r in accounts.iter() {
        stmt.execute(params![
            run_id,
            partition.as_str(),
            r.account_id,
            r.start_date.map(|d| d.to_string()),
            r.end_date.map(|d| d.to_string()),
            i64::from(r.age),
            r.alive,
            finite(r.subscription_initial),
            finite(r.subscription_last),
            finite(r.subscription_current),
            finite(r.subscription_trend),
            serde_json::to_string(&r.extra)?,
        ])?;
    }
    Ok(())
}

fn insert_panel(
    tx: &Transaction<'_>,
    run_id: &str,
    partition: Partition,
    rows: &[PanelRow],
) -> PanelResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO panel_row (
            run_id, partition, account_id, end_of_month, start_date, end_date, age,
            alive, is_starting_month, is_cancelation_month, months_alive,
            subscription_value_base, subscription_value_linear,
            value_to_date_base, value_to_date_linear
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
    )?;
    for r in rows {
        stmt.execute(params![
            run_id,
            partition.as_str(),
            r.account_id,
            r.end_of_month.to_string(),
            r.start_date.to_string(),
            r.end_date.map(|d| d.to_string()),
            r.age.map(i64::from),
            r.alive,
            r.is_starting_month,
            r.is_cancelation_month,
            i64::from(r.months_alive),
            finite(r.subscription_value_base),
            finite(r.subscription_value_linear),
            finite(r.value_to_date_base),
            finite(r.value_to_date_linear),
        ])?;
    }
    Ok(())
}

/// SQLite has no NaN; missing amounts are stored as NULL.
fn finite(x: Amount) -> Option<f64> {
    (!x.is_nan()).then_some(x)
}
