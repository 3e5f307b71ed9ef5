// Tue Jan 13 2026 - Alex

use crate::model::headers::Headers;
use crate::model::label::AcknowledgementLabel;
use crate::model::response::ErrorResponse;
use crate::model::status::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

/// One responder's answer for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub label: AcknowledgementLabel,
    pub entity_id: String,
    pub status: StatusCode,
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Acknowledgement {
    pub fn new(label: AcknowledgementLabel, entity_id: &str, status: StatusCode, headers: Headers) -> Self {
        Self {
            label,
            entity_id: entity_id.to_string(),
            status,
            headers,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Stand-in for a label that was requested but never answered.
    pub fn timed_out(label: AcknowledgementLabel, entity_id: &str, timeout: Duration, headers: Headers) -> Self {
        let error = ErrorResponse::request_timeout(timeout, headers.clone());
        Self::new(label, entity_id, StatusCode::REQUEST_TIMEOUT, headers).with_payload(error.body())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Acknowledgements collected so far, one per label, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcknowledgementSet {
    acks: IndexMap<AcknowledgementLabel, Acknowledgement>,
}

impl AcknowledgementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `ack`, replacing an earlier one with the same label. The replaced
    /// entry moves to the back so iteration reflects the latest arrival.
    pub fn insert(&mut self, ack: Acknowledgement) -> Option<Acknowledgement> {
        let previous = self.acks.shift_remove(&ack.label);
        self.acks.insert(ack.label.clone(), ack);
        previous
    }

    pub fn get(&self, label: &AcknowledgementLabel) -> Option<&Acknowledgement> {
        self.acks.get(label)
    }

    pub fn contains(&self, label: &AcknowledgementLabel) -> bool {
        self.acks.contains_key(label)
    }

    pub fn contains_all(&self, labels: &BTreeSet<AcknowledgementLabel>) -> bool {
        labels.iter().all(|label| self.acks.contains_key(label))
    }

    pub fn labels(&self) -> impl Iterator<Item = &AcknowledgementLabel> {
        self.acks.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Acknowledgement> {
        self.acks.values()
    }

    pub fn len(&self) -> usize {
        self.acks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acks.is_empty()
    }
}

/// The combined envelope delivered when a caller asked for more than the
/// implicit built-in confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgementsResponse {
    pub entity_id: String,
    pub status: StatusCode,
    pub acknowledgements: Vec<Acknowledgement>,
    pub headers: Headers,
}

impl AcknowledgementsResponse {
    pub fn get(&self, label: &AcknowledgementLabel) -> Option<&Acknowledgement> {
        self.acknowledgements.iter().find(|ack| &ack.label == label)
    }

    pub fn missing(&self) -> Vec<&AcknowledgementLabel> {
        self.acknowledgements
            .iter()
            .filter(|ack| ack.status == StatusCode::REQUEST_TIMEOUT)
            .map(|ack| &ack.label)
            .collect()
    }
}

/// Reduces a collected set into one envelope with an overall status.
pub trait AcknowledgementCombiner: Send + Sync {
    /// Every label in `expected` that is absent from `received` must come out
    /// as a timed-out acknowledgement.
    fn combine(
        &self,
        entity_id: &str,
        expected: &BTreeSet<AcknowledgementLabel>,
        received: &AcknowledgementSet,
        timeout: Duration,
        headers: &Headers,
    ) -> AcknowledgementsResponse;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCombiner;

impl StatusCombiner {
    pub fn new() -> Self {
        Self
    }

    fn overall_status(acks: &[Acknowledgement]) -> StatusCode {
        let first = match acks.first() {
            Some(ack) => ack.status,
            None => return StatusCode::REQUEST_TIMEOUT,
        };

        if acks.iter().all(|ack| ack.status == first) {
            first
        } else if acks.iter().all(Acknowledgement::is_success) {
            StatusCode::OK
        } else {
            StatusCode::FAILED_DEPENDENCY
        }
    }
}

impl AcknowledgementCombiner for StatusCombiner {
    fn combine(
        &self,
        entity_id: &str,
        expected: &BTreeSet<AcknowledgementLabel>,
        received: &AcknowledgementSet,
        timeout: Duration,
        headers: &Headers,
    ) -> AcknowledgementsResponse {
        let mut acknowledgements: Vec<Acknowledgement> = received.iter().cloned().collect();

        for label in expected {
            if !received.contains(label) {
                acknowledgements.push(Acknowledgement::timed_out(label.clone(), entity_id, timeout, headers.clone()));
            }
        }

        AcknowledgementsResponse {
            entity_id: entity_id.to_string(),
            status: Self::overall_status(&acknowledgements),
            acknowledgements,
            headers: headers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ack(label: &str, status: StatusCode) -> Acknowledgement {
        Acknowledgement::new(AcknowledgementLabel::from(label), "thing:1", status, Headers::new())
    }

    fn labels(names: &[&str]) -> BTreeSet<AcknowledgementLabel> {
        names.iter().map(|name| AcknowledgementLabel::from(*name)).collect()
    }

    #[test]
    fn test_last_write_wins_and_moves_to_back() {
        let mut set = AcknowledgementSet::new();
        set.insert(ack("a", StatusCode::OK));
        set.insert(ack("b", StatusCode::OK));
        let previous = set.insert(ack("a", StatusCode::CONFLICT));

        assert_eq!(previous.map(|p| p.status), Some(StatusCode::OK));
        assert_eq!(set.len(), 2);
        let order: Vec<&str> = set.labels().map(|l| l.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(set.get(&AcknowledgementLabel::from("a")).unwrap().status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_missing_labels_become_timeouts() {
        let mut set = AcknowledgementSet::new();
        set.insert(ack("twin-persisted", StatusCode::NO_CONTENT));

        let combined = StatusCombiner.combine(
            "thing:1",
            &labels(&["twin-persisted", "custom-x"]),
            &set,
            Duration::from_secs(1),
            &Headers::new(),
        );

        assert_eq!(combined.acknowledgements.len(), 2);
        assert_eq!(combined.get(&AcknowledgementLabel::from("custom-x")).unwrap().status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(combined.missing(), vec![&AcknowledgementLabel::from("custom-x")]);
        assert_eq!(combined.status, StatusCode::FAILED_DEPENDENCY);
    }

    #[test]
    fn test_overall_status() {
        let same = [ack("a", StatusCode::NO_CONTENT), ack("b", StatusCode::NO_CONTENT)];
        assert_eq!(StatusCombiner::overall_status(&same), StatusCode::NO_CONTENT);

        let mixed_success = [ack("a", StatusCode::CREATED), ack("b", StatusCode::NO_CONTENT)];
        assert_eq!(StatusCombiner::overall_status(&mixed_success), StatusCode::OK);

        let single_failure = [ack("a", StatusCode::CONFLICT)];
        assert_eq!(StatusCombiner::overall_status(&single_failure), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unexpected_labels_are_kept() {
        let mut set = AcknowledgementSet::new();
        set.insert(ack("twin-persisted", StatusCode::OK));
        set.insert(ack("stray", StatusCode::OK));

        let combined = StatusCombiner.combine("thing:1", &labels(&["twin-persisted"]), &set, Duration::from_secs(1), &Headers::new());
        assert_eq!(combined.acknowledgements.len(), 2);
        assert_eq!(combined.status, StatusCode::OK);
    }
}
