// Tue Jan 13 2026 - Alex

use crate::model::{ErrorResponse, Headers, StatusCode};
use thiserror::Error;

pub const ZERO_TIMEOUT_MESSAGE: &str = "timeout must not be zero if response or acknowledgements are requested";

#[derive(Error, Debug)]
pub enum AckError {
    #[error("Invalid header: {0}")]
    HeaderInvalid(String),
    #[error("Process name already taken: {0}")]
    NameConflict(String),
    #[error("Correlation id '{0}' is already in use by another request")]
    DuplicateCorrelationId(String),
    #[error("No free correlation id for prefix '{prefix}' after {attempts} attempts")]
    ConflictFreeExhausted { prefix: String, attempts: u32 },
    #[error("Failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    ConfigInvalid(String),
}

impl AckError {
    pub fn zero_timeout() -> Self {
        AckError::HeaderInvalid(ZERO_TIMEOUT_MESSAGE.to_string())
    }

    pub fn is_name_conflict(&self) -> bool {
        matches!(self, AckError::NameConflict(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AckError::HeaderInvalid(_) => StatusCode::BAD_REQUEST,
            AckError::NameConflict(_) | AckError::DuplicateCorrelationId(_) => StatusCode::CONFLICT,
            AckError::ConflictFreeExhausted { .. } => StatusCode::CONFLICT,
            AckError::Spawn(_) | AckError::ConfigIo(_) | AckError::ConfigParse(_) | AckError::ConfigInvalid(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AckError::HeaderInvalid(_) => "headers:invalid",
            AckError::NameConflict(_) => "acknowledgement:name.conflict",
            AckError::DuplicateCorrelationId(_) => "acknowledgement:duplicate.correlation.id",
            AckError::ConflictFreeExhausted { .. } => "acknowledgement:correlation.id.exhausted",
            AckError::Spawn(_) => "acknowledgement:spawn.failed",
            AckError::ConfigIo(_) | AckError::ConfigParse(_) | AckError::ConfigInvalid(_) => "config:invalid",
        }
    }

    pub fn to_error_response(&self, headers: Headers) -> ErrorResponse {
        ErrorResponse::new(self.error_code(), self.status(), &self.to_string(), headers)
    }
}

pub type AckResult<T> = Result<T, AckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_message() {
        let err = AckError::zero_timeout();
        assert!(err.to_string().contains("must not be zero"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicate_correlation_id_response() {
        let err = AckError::DuplicateCorrelationId("abc".to_string());
        let response = err.to_error_response(Headers::new().with_correlation_id("abc"));
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert_eq!(response.body()["error"], "acknowledgement:duplicate.correlation.id");
        assert_eq!(response.headers.correlation_id(), Some("abc"));
    }
}
