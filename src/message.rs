// Tue Jan 13 2026 - Alex

use crate::model::{Acknowledgement, CommandResponse, ErrorResponse, Headers};

/// Everything that can land in a session's or a forwarder's mailbox.
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Plain response from the persistence path (or the live responder when the
    /// request went out on the live channel).
    PersistenceResponse(CommandResponse),
    /// Plain response to a message command; `message_headers` are the headers
    /// of the message itself and win over the response headers.
    MessageResponse {
        response: CommandResponse,
        message_headers: Headers,
    },
    Acknowledgement(Acknowledgement),
    Acknowledgements(Vec<Acknowledgement>),
    /// Unrecoverable error for the in-flight request.
    Abort(ErrorResponse),
    Unrecognized(String),
}

impl SessionMessage {
    pub fn is_acknowledgement(&self) -> bool {
        matches!(self, SessionMessage::Acknowledgement(_) | SessionMessage::Acknowledgements(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SessionMessage::PersistenceResponse(_) => "persistence-response",
            SessionMessage::MessageResponse { .. } => "message-response",
            SessionMessage::Acknowledgement(_) => "acknowledgement",
            SessionMessage::Acknowledgements(_) => "acknowledgements",
            SessionMessage::Abort(_) => "abort",
            SessionMessage::Unrecognized(_) => "unrecognized",
        }
    }
}
