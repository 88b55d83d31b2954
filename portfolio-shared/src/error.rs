use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    /// One entry per rejected form field, in form order.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Security check failed: {0}")]
    Security(String),
    #[error("Template error: {0}")]
    Template(String),
}

impl PortfolioError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortfolioError::Validation(vec![message.into()])
    }
}

impl From<std::io::Error> for PortfolioError {
    fn from(err: std::io::Error) -> Self {
        PortfolioError::Io(err.to_string())
    }
}

impl From<sea_orm::DbErr> for PortfolioError {
    fn from(err: sea_orm::DbErr) -> Self {
        PortfolioError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_fields() {
        let err = PortfolioError::Validation(vec![
            "fname: must be between 1 and 50 characters".to_string(),
            "phone: must be 9 to 15 digits".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: fname: must be between 1 and 50 characters; phone: must be 9 to 15 digits"
        );
    }
}
