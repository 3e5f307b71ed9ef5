// Tue Jan 13 2026 - Alex

use crate::model::label::{AcknowledgementLabel, AcknowledgementRequest};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

pub const CORRELATION_ID: &str = "correlation-id";
pub const TIMEOUT: &str = "timeout";
pub const CHANNEL: &str = "channel";
pub const RESPONSE_REQUIRED: &str = "response-required";
pub const REQUESTED_ACKS: &str = "requested-acks";
pub const EXPECTED_RESPONSE_TYPES: &str = "expected-response-types";
pub const INBOUND_PAYLOAD_MAPPER: &str = "inbound-payload-mapper";
pub const REPLY_TARGET: &str = "reply-target";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Twin,
    Live,
}

impl Channel {
    pub fn is_live(self) -> bool {
        self == Channel::Live
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Twin => f.write_str("twin"),
            Channel::Live => f.write_str("live"),
        }
    }
}

/// Headers travelling with a signal, response or acknowledgement.
///
/// The typed entries are `None` when the requester did not set them, which the
/// header policy needs to tell "not asked" apart from "asked for nothing".
/// Everything else (routing metadata included) lives in the free-form map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    #[serde(rename = "correlation-id", default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(rename = "timeout", default, skip_serializing_if = "Option::is_none", with = "duration_ms")]
    timeout: Option<Duration>,
    #[serde(rename = "channel", default, skip_serializing_if = "Option::is_none")]
    channel: Option<Channel>,
    #[serde(rename = "response-required", default, skip_serializing_if = "Option::is_none")]
    response_required: Option<bool>,
    #[serde(rename = "requested-acks", default, skip_serializing_if = "Option::is_none")]
    requested_acks: Option<BTreeSet<AcknowledgementRequest>>,
    #[serde(flatten)]
    entries: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        self.correlation_id = Some(correlation_id.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_response_required(mut self, required: bool) -> Self {
        self.response_required = Some(required);
        self
    }

    pub fn with_requested_acks<I>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = AcknowledgementLabel>,
    {
        self.set_requested_acks(labels.into_iter().map(AcknowledgementRequest::new).collect());
        self
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn set_correlation_id(&mut self, correlation_id: &str) {
        self.correlation_id = Some(correlation_id.to_string());
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn channel(&self) -> Channel {
        self.channel.unwrap_or_default()
    }

    pub fn response_required(&self) -> Option<bool> {
        self.response_required
    }

    /// Response-required defaults to true when nobody said otherwise.
    pub fn is_response_required(&self) -> bool {
        self.response_required.unwrap_or(true)
    }

    pub fn set_response_required(&mut self, required: bool) {
        self.response_required = Some(required);
    }

    pub fn requested_acks(&self) -> Option<&BTreeSet<AcknowledgementRequest>> {
        self.requested_acks.as_ref()
    }

    pub fn set_requested_acks(&mut self, requests: BTreeSet<AcknowledgementRequest>) {
        self.requested_acks = Some(requests);
    }

    pub fn ack_requests(&self) -> BTreeSet<AcknowledgementRequest> {
        self.requested_acks.clone().unwrap_or_default()
    }

    pub fn ack_labels(&self) -> BTreeSet<AcknowledgementLabel> {
        self.requested_acks
            .iter()
            .flatten()
            .map(|request| request.label().clone())
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Overlay `other` on top of these headers; entries set in `other` win.
    pub fn merged_with(&self, other: &Headers) -> Headers {
        let mut merged = self.clone();
        if other.correlation_id.is_some() {
            merged.correlation_id = other.correlation_id.clone();
        }
        if other.timeout.is_some() {
            merged.timeout = other.timeout;
        }
        if other.channel.is_some() {
            merged.channel = other.channel;
        }
        if other.response_required.is_some() {
            merged.response_required = other.response_required;
        }
        if other.requested_acks.is_some() {
            merged.requested_acks = other.requested_acks.clone();
        }
        for (key, value) in &other.entries {
            merged.entries.insert(key.clone(), value.clone());
        }
        merged
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_u64(duration.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
