// Tue Jan 13 2026 - Alex

use crate::message::SessionMessage;
use crate::namespace::ActorRef;
use crate::utils::url_encode;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

pub const FORWARDER_NAME_PREFIX: &str = "ackForwarder-";

/// One-shot relay for acknowledgements arriving out of band.
pub struct Forwarder {
    correlation_id: String,
    target: ActorRef,
    fallback_timeout: Duration,
}

impl Forwarder {
    pub fn new(correlation_id: &str, target: ActorRef, fallback_timeout: Duration) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            target,
            fallback_timeout,
        }
    }

    pub fn name_for(correlation_id: &str) -> String {
        format!("{}{}", FORWARDER_NAME_PREFIX, url_encode(correlation_id))
    }

    pub fn run(self, mailbox: Receiver<SessionMessage>) {
        let deadline_at = Instant::now() + self.fallback_timeout;

        loop {
            let remaining = deadline_at.saturating_duration_since(Instant::now());
            match mailbox.recv_timeout(remaining) {
                Ok(message) if message.is_acknowledgement() => {
                    log::debug!("Forwarding {} for {} to {}", message.kind(), self.correlation_id, self.target.name());
                    if !self.target.tell(message) {
                        log::warn!("Target {} of forwarder {} is gone", self.target.name(), self.correlation_id);
                    }
                    return;
                }
                Ok(message) => {
                    log::warn!("Forwarder {} ignoring {}", self.correlation_id, message.kind());
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::debug!("Forwarder {} timed out without an acknowledgement", self.correlation_id);
                    return;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}
