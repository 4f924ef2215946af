//! Subscription cohort panel construction.
//!
//! Turns one-row-per-account subscription records into a lifecycle
//! summary table and an account × calendar-month panel carrying survival
//! flags and projected subscription value, with matching training and
//! validation partitions of both.

pub mod columns;
pub mod config;
pub mod dataset;
pub mod dates;
pub mod error;
pub mod panel;
pub mod pipeline;
pub mod rng;
pub mod split;
pub mod stage;
pub mod store;
pub mod summary;
pub mod survival;
pub mod types;
pub mod valuation;

pub use config::PipelineConfig;
pub use dataset::{Cell, Dataset};
pub use error::{PanelError, PanelResult};
pub use pipeline::SubscriptionData;
