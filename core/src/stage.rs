//! Panel stage trait.
//!
//! RULE: Every panel enrichment step implements PanelStage.
//! The pipeline calls apply() on each registered stage in
//! registration order, once per build. Order is fixed in pipeline.rs.

use crate::{error::PanelResult, panel::PanelRow, summary::AccountTable};

pub trait PanelStage {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Enrich `rows` in place.
    ///
    /// - `rows`:     the whole panel, grouped by account, months ascending
    /// - `accounts`: the account summary the panel was expanded from
    fn apply(&self, rows: &mut [PanelRow], accounts: &AccountTable) -> PanelResult<()>;
}
