// Tue Jan 13 2026 - Alex

use crate::model::{AcknowledgementLabel, AcknowledgementRequest, Channel, Signal};
use std::collections::BTreeSet;
use std::time::Duration;

/// What a session needs to know about the request it aggregates for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    pub correlation_id: String,
    pub deadline: Duration,
    pub channel: Channel,
    pub ack_requests: BTreeSet<AcknowledgementRequest>,
}

impl RequestMetadata {
    /// The deadline is the signal's own timeout capped by `fallback`; a signal
    /// without a timeout gets `fallback`.
    pub fn from_signal(signal: &Signal, fallback: Duration) -> Self {
        let headers = &signal.headers;
        let deadline = headers.timeout().map_or(fallback, |timeout| timeout.min(fallback));

        Self {
            correlation_id: headers.correlation_id().unwrap_or_default().to_string(),
            deadline,
            channel: headers.channel(),
            ack_requests: headers.ack_requests(),
        }
    }

    pub fn expected_labels(&self) -> BTreeSet<AcknowledgementLabel> {
        self.ack_requests.iter().map(|request| request.label().clone()).collect()
    }
}
