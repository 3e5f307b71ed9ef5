// Tue Jan 13 2026 - Alex

use crate::aggregation::metadata::RequestMetadata;
use crate::message::SessionMessage;
use crate::model::headers::{EXPECTED_RESPONSE_TYPES, INBOUND_PAYLOAD_MAPPER, REPLY_TARGET};
use crate::model::{
    Acknowledgement, AcknowledgementCombiner, AcknowledgementLabel, AcknowledgementSet, AcknowledgementsResponse,
    AggregationResult, Channel, CommandResponse, ErrorResponse, Headers, Signal,
};
use itertools::Itertools;
use std::collections::BTreeSet;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type ResultCallback = Box<dyn FnOnce(AggregationResult) + Send + 'static>;

const ROUTING_HEADERS: [&str; 3] = [EXPECTED_RESPONSE_TYPES, INBOUND_PAYLOAD_MAPPER, REPLY_TARGET];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Collecting,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeTrigger {
    AllReceived,
    Deadline,
    Abort,
}

/// Collects the acknowledgements for one request and delivers exactly one
/// result to the caller.
pub struct AggregationSession {
    correlation_id: String,
    entity_id: String,
    channel: Channel,
    expected: BTreeSet<AcknowledgementLabel>,
    received: AcknowledgementSet,
    plain_response: Option<(AcknowledgementLabel, CommandResponse)>,
    request_headers: Headers,
    deadline: Duration,
    combiner: Arc<dyn AcknowledgementCombiner>,
    callback: Option<ResultCallback>,
    state: SessionState,
}

impl AggregationSession {
    pub fn new(
        signal: &Signal,
        fallback_timeout: Duration,
        combiner: Arc<dyn AcknowledgementCombiner>,
        callback: ResultCallback,
    ) -> Self {
        let metadata = RequestMetadata::from_signal(signal, fallback_timeout);

        Self {
            expected: metadata.expected_labels(),
            correlation_id: metadata.correlation_id,
            entity_id: signal.entity_id.clone(),
            channel: metadata.channel,
            received: AcknowledgementSet::new(),
            plain_response: None,
            request_headers: signal.headers.clone(),
            deadline: metadata.deadline,
            combiner,
            callback: Some(callback),
            state: SessionState::Collecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn expected_labels(&self) -> &BTreeSet<AcknowledgementLabel> {
        &self.expected
    }

    pub fn received(&self) -> &AcknowledgementSet {
        &self.received
    }

    /// Drains the mailbox until the session completes. The deadline bounds
    /// every wait, so no timer outlives the loop.
    pub fn run(mut self, mailbox: Receiver<SessionMessage>) {
        let deadline_at = Instant::now() + self.deadline;
        log::debug!(
            "Session {} waiting up to {}ms for [{}]",
            self.correlation_id,
            self.deadline.as_millis(),
            self.expected.iter().join(", ")
        );

        while self.state == SessionState::Collecting {
            let remaining = deadline_at.saturating_duration_since(Instant::now());
            match mailbox.recv_timeout(remaining) {
                Ok(message) => self.handle(message),
                Err(RecvTimeoutError::Timeout) => self.finalize(FinalizeTrigger::Deadline),
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("Session {} lost its mailbox, finalizing early", self.correlation_id);
                    self.finalize(FinalizeTrigger::Deadline);
                }
            }
        }
    }

    pub fn handle(&mut self, message: SessionMessage) {
        if self.state == SessionState::Completed {
            log::debug!("Session {} already completed, dropping {}", self.correlation_id, message.kind());
            return;
        }

        match message {
            SessionMessage::PersistenceResponse(response) => {
                let label = if self.channel.is_live() {
                    AcknowledgementLabel::LiveResponse
                } else {
                    AcknowledgementLabel::Persisted
                };
                let ack = Self::acknowledge_plain(label.clone(), &response, response.headers.clone());
                self.plain_response = Some((label, response));
                self.store(ack);
                self.complete_if_all_received();
            }
            SessionMessage::MessageResponse { response, message_headers } => {
                let headers = response.headers.merged_with(&message_headers);
                let ack = Self::acknowledge_plain(AcknowledgementLabel::LiveResponse, &response, headers);
                self.plain_response = Some((AcknowledgementLabel::LiveResponse, response));
                self.store(ack);
                self.complete_if_all_received();
            }
            SessionMessage::Acknowledgement(ack) => {
                self.store(ack);
                self.complete_if_all_received();
            }
            SessionMessage::Acknowledgements(acks) => {
                for ack in acks {
                    self.store(ack);
                }
                self.complete_if_all_received();
            }
            SessionMessage::Abort(error) => {
                log::debug!("Session {} aborted: {}", self.correlation_id, error.message);
                self.deliver(AggregationResult::Error(error), FinalizeTrigger::Abort);
            }
            SessionMessage::Unrecognized(description) => {
                log::warn!("Session {} ignoring unrecognized message: {}", self.correlation_id, description);
            }
        }
    }

    pub fn finalize(&mut self, trigger: FinalizeTrigger) {
        if self.state == SessionState::Completed {
            return;
        }

        let result = match self.single_built_in_label() {
            Some(label) => match self.plain_response.take() {
                Some((plain_label, response)) if plain_label == label => AggregationResult::Response(response),
                _ if !self.received.contains(&label) => AggregationResult::Error(ErrorResponse::request_timeout(
                    self.deadline,
                    self.request_headers.clone(),
                )),
                _ => AggregationResult::Acknowledgements(self.combine()),
            },
            None => AggregationResult::Acknowledgements(self.combine()),
        };

        self.deliver(result, trigger);
    }

    fn acknowledge_plain(label: AcknowledgementLabel, response: &CommandResponse, headers: Headers) -> Acknowledgement {
        let ack = Acknowledgement::new(label, &response.entity_id, response.status, headers);
        match &response.entity {
            Some(entity) => ack.with_payload(entity.clone()),
            None => ack,
        }
    }

    fn store(&mut self, ack: Acknowledgement) {
        if !self.expected.contains(&ack.label) {
            log::debug!("Session {} received unrequested label {}", self.correlation_id, ack.label);
        }
        self.received.insert(ack);
    }

    fn complete_if_all_received(&mut self) {
        if self.received.contains_all(&self.expected) {
            self.finalize(FinalizeTrigger::AllReceived);
        }
    }

    fn single_built_in_label(&self) -> Option<AcknowledgementLabel> {
        match self.expected.iter().exactly_one() {
            Ok(label) if label.is_built_in() => Some(label.clone()),
            _ => None,
        }
    }

    fn combine(&self) -> AcknowledgementsResponse {
        self.combiner
            .combine(&self.entity_id, &self.expected, &self.received, self.deadline, &self.request_headers)
    }

    fn deliver(&mut self, mut result: AggregationResult, trigger: FinalizeTrigger) {
        if self.state == SessionState::Completed {
            return;
        }
        self.state = SessionState::Completed;

        reconcile_headers(result.headers_mut(), &self.request_headers);
        log::info!(
            "Session {} completed ({:?}) with status {} after {} of {} acknowledgements",
            self.correlation_id,
            trigger,
            result.status(),
            self.expected.iter().filter(|label| self.received.contains(label)).count(),
            self.expected.len()
        );

        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

/// Routing metadata in a result always comes from the original request, never
/// from whichever responder answered.
pub fn reconcile_headers(result: &mut Headers, request: &Headers) {
    for key in ROUTING_HEADERS {
        result.remove(key);
    }
    for key in ROUTING_HEADERS {
        if let Some(value) = request.get(key) {
            result.insert(key, value);
        }
    }
}
