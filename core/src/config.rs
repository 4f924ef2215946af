use crate::{columns::ColumnDescriptor, split::SplitAt};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ID_COL: &str = "account_id";
pub const DEFAULT_START_DATE_COL: &str = "start_date";
pub const DEFAULT_END_DATE_COL: &str = "end_date";
pub const DEFAULT_SPLIT_FRACTION: f64 = 0.8;
pub const DEFAULT_SEED: u64 = 7;

/// Column bindings and run parameters for one pipeline build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_id_col")]
    pub id_col: String,
    /// Falls back to a column literally named `start_date`.
    #[serde(default)]
    pub start_date_col: Option<String>,
    /// Falls back to a column literally named `end_date`.
    #[serde(default)]
    pub end_date_col: Option<String>,
    /// Derived from start/end dates when absent.
    #[serde(default)]
    pub age_col: Option<String>,
    /// Derived from the end date when absent.
    #[serde(default)]
    pub alive_col: Option<String>,
    #[serde(default)]
    pub subscription_initial: Option<String>,
    /// Latest observed amount; becomes `subscription_last`.
    #[serde(default)]
    pub subscription_current: Option<String>,
    #[serde(default)]
    pub additional_cols: Vec<ColumnDescriptor>,
    #[serde(default = "default_split_at")]
    pub split_at: SplitAt,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// "Today" for age and month-grid purposes. Defaults to the local date.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

fn default_id_col() -> String {
    DEFAULT_ID_COL.to_string()
}

fn default_split_at() -> SplitAt {
    SplitAt::Fraction(DEFAULT_SPLIT_FRACTION)
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            id_col: default_id_col(),
            start_date_col: None,
            end_date_col: None,
            age_col: None,
            alive_col: None,
            subscription_initial: None,
            subscription_current: None,
            additional_cols: Vec::new(),
            split_at: default_split_at(),
            seed: default_seed(),
            as_of: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    /// Bindings for the `initial_amount` / `current_amount` test fixtures,
    /// pinned to 2021-06-15 so results never depend on the wall clock.
    pub fn default_test() -> Self {
        Self {
            subscription_initial: Some("initial_amount".into()),
            subscription_current: Some("current_amount".into()),
            as_of: NaiveDate::from_ymd_opt(2021, 6, 15),
            ..Self::default()
        }
    }

    pub fn with_split_at(mut self, split_at: SplitAt) -> Self {
        self.split_at = split_at;
        self
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn as_of_or_today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.id_col, "account_id");
        assert_eq!(config.seed, 7);
        assert_eq!(config.split_at, SplitAt::Fraction(0.8));
        assert!(config.additional_cols.is_empty());
    }

    #[test]
    fn json_accepts_date_split_and_mixed_columns() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "start_date_col": "first_paying_date",
                "split_at": "2018-01-01",
                "additional_cols": ["frequency", {"name": "tier", "values": {"a": "gold"}}],
                "as_of": "2019-06-30"
            }"#,
        )
        .unwrap();
        assert_eq!(config.start_date_col.as_deref(), Some("first_paying_date"));
        assert_eq!(config.split_at, SplitAt::Date(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()));
        assert_eq!(config.additional_cols[0], ColumnDescriptor::named("frequency"));
        assert_eq!(config.additional_cols[1].name(), "tier");
        assert_eq!(config.as_of, NaiveDate::from_ymd_opt(2019, 6, 30));
    }
}
