// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const PERSISTED_LABEL: &str = "twin-persisted";
pub const LIVE_RESPONSE_LABEL: &str = "live-response";

/// What an acknowledgement confirms.
///
/// The two built-in labels are produced by the engine itself (a durable write
/// on the twin channel, a live responder's answer on the live channel). Every
/// other label is issued by an external integration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AcknowledgementLabel {
    Persisted,
    LiveResponse,
    Custom(String),
}

impl AcknowledgementLabel {
    pub fn custom(name: &str) -> Self {
        Self::from(name)
    }

    pub fn is_built_in(&self) -> bool {
        matches!(self, Self::Persisted | Self::LiveResponse)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Persisted => PERSISTED_LABEL,
            Self::LiveResponse => LIVE_RESPONSE_LABEL,
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for AcknowledgementLabel {
    fn from(value: &str) -> Self {
        match value {
            PERSISTED_LABEL => Self::Persisted,
            LIVE_RESPONSE_LABEL => Self::LiveResponse,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl FromStr for AcknowledgementLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("acknowledgement label must not be empty".to_string());
        }
        Ok(Self::from(trimmed))
    }
}

impl fmt::Display for AcknowledgementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AcknowledgementLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AcknowledgementLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A requester asking for one label to be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AcknowledgementRequest {
    label: AcknowledgementLabel,
}

impl AcknowledgementRequest {
    pub fn new(label: AcknowledgementLabel) -> Self {
        Self { label }
    }

    pub fn label(&self) -> &AcknowledgementLabel {
        &self.label
    }
}

impl From<AcknowledgementLabel> for AcknowledgementRequest {
    fn from(label: AcknowledgementLabel) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for AcknowledgementRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.label.fmt(f)
    }
}
