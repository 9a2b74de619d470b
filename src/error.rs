use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid override configuration: {0}")]
    InvalidConfig(String),

    #[error("No usable cell layout found for this template")]
    LayoutNotResolved,

    #[error("No template workbook supplied")]
    MissingTemplate,

    #[error("Missing numeric parameter: {0}")]
    MissingRateOrParameters(String),

    #[error("Skipped write to '{address}': {reason}")]
    CellWriteSkipped { address: String, reason: String },

    #[error("Network collaborator unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn skipped(address: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::CellWriteSkipped {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Conditions that block generation entirely.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::MissingTemplate
                | EngineError::MissingRateOrParameters(_)
                | EngineError::LayoutNotResolved
        )
    }
}
