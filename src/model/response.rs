// Tue Jan 13 2026 - Alex

use crate::model::acknowledgement::AcknowledgementsResponse;
use crate::model::headers::Headers;
use crate::model::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub const REQUEST_TIMEOUT_ERROR: &str = "acknowledgement:request.timeout";

/// A plain response coming back from the persistence or live path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub entity_id: String,
    pub status: StatusCode,
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Value>,
}

impl CommandResponse {
    pub fn new(entity_id: &str, status: StatusCode, headers: Headers) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            status,
            headers,
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: Value) -> Self {
        self.entity = Some(entity);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub status: StatusCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub headers: Headers,
}

impl ErrorResponse {
    pub fn new(error_code: &str, status: StatusCode, message: &str, headers: Headers) -> Self {
        Self {
            error_code: error_code.to_string(),
            status,
            message: message.to_string(),
            description: None,
            headers,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn request_timeout(timeout: Duration, headers: Headers) -> Self {
        Self::new(
            REQUEST_TIMEOUT_ERROR,
            StatusCode::REQUEST_TIMEOUT,
            &format!("The request did not receive a response within {}ms.", timeout.as_millis()),
            headers,
        )
        .with_description("Increase the request timeout or check that the responder is reachable.")
    }

    /// JSON body used as the payload of negative acknowledgements.
    pub fn body(&self) -> Value {
        let mut body = json!({
            "status": self.status.as_u16(),
            "error": self.error_code,
            "message": self.message,
        });
        if let Some(description) = &self.description {
            body["description"] = Value::String(description.clone());
        }
        body
    }
}

/// The single terminal value a session hands to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AggregationResult {
    Response(CommandResponse),
    Acknowledgements(AcknowledgementsResponse),
    Error(ErrorResponse),
}

impl AggregationResult {
    pub fn status(&self) -> StatusCode {
        match self {
            AggregationResult::Response(response) => response.status,
            AggregationResult::Acknowledgements(acks) => acks.status,
            AggregationResult::Error(error) => error.status,
        }
    }

    pub fn headers(&self) -> &Headers {
        match self {
            AggregationResult::Response(response) => &response.headers,
            AggregationResult::Acknowledgements(acks) => &acks.headers,
            AggregationResult::Error(error) => &error.headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        match self {
            AggregationResult::Response(response) => &mut response.headers,
            AggregationResult::Acknowledgements(acks) => &mut acks.headers,
            AggregationResult::Error(error) => &mut error.headers,
        }
    }

    pub fn is_envelope(&self) -> bool {
        matches!(self, AggregationResult::Acknowledgements(_))
    }
}
