//! Fatal conditions raised by the merge engine.
//!
//! Malformed rows are not errors: they are reported as
//! [`RowOutcome::Skip`](crate::rows::RowOutcome) and dropped by callers.
//! Everything in [`MigrationError`] aborts the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("No assets found in {source_name}; at least one well-formed asset row is required")]
    EmptyInput { source_name: String },

    #[error(
        "Variation {record} has locale '{locale}' but the asset family has no localizable reference field"
    )]
    UnexpectedLocale { record: String, locale: String },

    #[error(
        "Variation {record} has no locale but the asset family only has localizable reference fields"
    )]
    MissingLocale { record: String },

    #[error("Key '{key}' is not a valid mapping (allowed: {allowed})")]
    UnknownMappingKey { key: String, allowed: String },

    #[error("Column '{column}' is missing from the {table} header")]
    MissingColumn { table: &'static str, column: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// True for the two variants that signal a variation/reference-type conflict.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            MigrationError::UnexpectedLocale { .. } | MigrationError::MissingLocale { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
