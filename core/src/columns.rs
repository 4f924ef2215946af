//! Pass-through columns merged into the account summary.
//!
//! Descriptors are applied in order after the core fields are derived.
//! When two descriptors yield the same name the later one wins.

use crate::{
    dataset::{Cell, Dataset},
    error::PanelResult,
    summary::AccountRecord,
    types::AccountId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnDescriptor {
    /// Copy a dataset column under its own name.
    Named(String),
    /// A caller-provided series keyed by account identifier.
    /// Accounts missing from the series get `Null`.
    Derived {
        name: String,
        values: HashMap<AccountId, Cell>,
    },
}

impl ColumnDescriptor {
    pub fn named(name: &str) -> Self {
        Self::Named(name.to_string())
    }

    pub fn derived(name: &str, values: HashMap<AccountId, Cell>) -> Self {
        Self::Derived { name: name.to_string(), values }
    }

    /// Build a derived series by mapping every value of `source`.
    pub fn map_column<F>(dataset: &Dataset, source: &str, name: &str, f: F) -> PanelResult<Self>
    where
        F: Fn(&Cell) -> Cell,
    {
        let values = dataset
            .column(source)?
            .into_iter()
            .map(|(id, cell)| {
                let mapped = f(&cell);
                (id, mapped)
            })
            .collect();
        Ok(Self::derived(name, values))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Derived { name, .. } => name,
        }
    }

    fn resolve(&self, dataset: &Dataset) -> PanelResult<HashMap<AccountId, Cell>> {
        match self {
            Self::Named(name) => dataset.column(name),
            Self::Derived { values, .. } => Ok(values.clone()),
        }
    }
}

/// Apply `descriptors` to `records`, returning the ordered extra column names.
pub fn merge_columns(
    descriptors: &[ColumnDescriptor],
    dataset: &Dataset,
    records: &mut [AccountRecord],
) -> PanelResult<Vec<String>> {
    let mut names: Vec<String> = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let mut series = descriptor.resolve(dataset)?;
        let name = descriptor.name();
        if names.iter().any(|n| n == name) {
            log::debug!("column '{name}' merged again; later values replace earlier ones");
        } else {
            names.push(name.to_string());
        }
        for record in records.iter_mut() {
            let cell = series.remove(&record.account_id).unwrap_or_default();
            record.extra.insert(name.to_string(), cell);
        }
    }
    Ok(names)
}
