// Tue Jan 13 2026 - Alex

use crate::model::headers::{Channel, Headers};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    ModifyCommand,
    QueryCommand,
    MessageCommand,
    Event,
    PolicyAnnouncement,
    Other,
}

/// An inbound command, event or announcement as the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub entity_id: String,
    pub headers: Headers,
}

impl Signal {
    pub fn new(kind: SignalKind, entity_id: &str, headers: Headers) -> Self {
        Self {
            kind,
            entity_id: entity_id.to_string(),
            headers,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn channel(&self) -> Channel {
        self.headers.channel()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.headers.correlation_id()
    }

    pub fn is_command(&self) -> bool {
        matches!(self.kind, SignalKind::ModifyCommand | SignalKind::QueryCommand)
    }

    pub fn is_twin_modify_command(&self) -> bool {
        self.kind == SignalKind::ModifyCommand && !self.channel().is_live()
    }

    pub fn is_twin_query_command(&self) -> bool {
        self.kind == SignalKind::QueryCommand && !self.channel().is_live()
    }

    pub fn is_live_command(&self) -> bool {
        self.is_command() && self.channel().is_live()
    }

    pub fn is_message_command(&self) -> bool {
        self.kind == SignalKind::MessageCommand
    }

    pub fn is_twin_event(&self) -> bool {
        self.kind == SignalKind::Event && !self.channel().is_live()
    }

    pub fn is_policy_announcement(&self) -> bool {
        self.kind == SignalKind::PolicyAnnouncement
    }
}
