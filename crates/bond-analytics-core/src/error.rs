use thiserror::Error;

#[derive(Debug, Error)]
pub enum BondAnalyticsError {
    #[error("Invalid bond terms: {field}: {reason}")]
    InvalidTerms { field: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BondAnalyticsError {
    /// Name of the offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            BondAnalyticsError::InvalidTerms { field, .. }
            | BondAnalyticsError::InvalidInput { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BondAnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        BondAnalyticsError::SerializationError(e.to_string())
    }
}
