use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Column '{column}' not found: pass the column name explicitly or include a column with that name")]
    MissingColumn { column: String },

    #[error("split_at must be a fraction in (0, 1] or a date (%Y-%m-%d), got {value}")]
    InvalidSplitRule { value: String },

    #[error("Account '{account_id}' appears more than once in the dataset")]
    DuplicateAccount { account_id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PanelResult<T> = Result<T, PanelError>;
