//! The pipeline: builds every account and panel view in one pass.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Lifecycle summary
//!   2. Account split
//!   3. Panel expansion (all accounts, ignoring the split)
//!   4. Survival stage
//!   5. Valuation stage   (reads alive and age from step 4)
//!   6. Panel split
//!
//! RULES:
//!   - Any error aborts the build; no partial views are returned.
//!   - Views are read-only and rebuilt wholesale on every build.
//!   - All randomness flows through the seeded split RNG.

use crate::{
    config::PipelineConfig,
    dataset::Dataset,
    error::PanelResult,
    panel::{expand, is_grouped_by_account, PanelRow},
    split::{split_accounts, split_panel, SplitRule},
    stage::PanelStage,
    summary::{summarize, AccountRecord, AccountTable},
    survival::SurvivalStage,
    valuation::ValueStage,
};
use chrono::NaiveDate;

pub struct SubscriptionData {
    accounts:            AccountTable,
    train_accounts:      AccountTable,
    validation_accounts: AccountTable,
    panel:               Vec<PanelRow>,
    train_panel:         Vec<PanelRow>,
    validation_panel:    Vec<PanelRow>,
    split_rule:          SplitRule,
    seed:                u64,
    as_of:               NaiveDate,
}

impl SubscriptionData {
    pub fn build(dataset: &Dataset, config: &PipelineConfig) -> PanelResult<Self> {
        let split_rule = SplitRule::from_split_at(&config.split_at)?;
        let as_of = config.as_of_or_today();

        let accounts = summarize(dataset, config, as_of)?;
        let (train_accounts, validation_accounts) = split_accounts(&accounts, split_rule, config.seed);

        let mut panel = expand(&accounts, as_of);
        debug_assert!(is_grouped_by_account(&panel, &accounts), "expand must group rows by account");
        for stage in Self::stages() {
            stage.apply(&mut panel, &accounts)?;
            log::debug!("stage '{}' applied to {} rows", stage.name(), panel.len());
        }

        let (train_panel, validation_panel) =
            split_panel(&panel, split_rule, &train_accounts, &validation_accounts);
        log::info!(
            "panel split {split_rule}: {} training, {} validation rows",
            train_panel.len(),
            validation_panel.len()
        );

        Ok(Self {
            accounts,
            train_accounts,
            validation_accounts,
            panel,
            train_panel,
            validation_panel,
            split_rule,
            seed: config.seed,
            as_of,
        })
    }

    /// Panel stages in execution order.
    fn stages() -> Vec<Box<dyn PanelStage>> {
        vec![Box::new(SurvivalStage), Box::new(ValueStage)]
    }

    pub fn accounts(&self) -> &AccountTable {
        &self.accounts
    }

    pub fn train_accounts(&self) -> &AccountTable {
        &self.train_accounts
    }

    pub fn validation_accounts(&self) -> &AccountTable {
        &self.validation_accounts
    }

    pub fn panel(&self) -> &[PanelRow] {
        &self.panel
    }

    pub fn train_panel(&self) -> &[PanelRow] {
        &self.train_panel
    }

    pub fn validation_panel(&self) -> &[PanelRow] {
        &self.validation_panel
    }

    pub fn split_rule(&self) -> SplitRule {
        self.split_rule
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Panel rows of one account, months ascending.
    pub fn panel_for(&self, account_id: &str) -> Vec<&PanelRow> {
        self.panel.iter().filter(|r| r.account_id == account_id).collect()
    }

    /// The full account summary as a JSON array.
    pub fn summary_json(&self) -> PanelResult<String> {
        let records: &[AccountRecord] = self.accounts.records();
        Ok(serde_json::to_string(records)?)
    }
}
