// Tue Jan 13 2026 - Alex

//! Header policy: decides which acknowledgement requests and which
//! response-required flag a signal ends up carrying.
//!
//! The policy is an ordered table of `(predicate, transform)` rules. The first
//! rule whose predicate matches rewrites the headers; no match leaves the
//! signal unchanged.

use crate::model::{AcknowledgementLabel, AcknowledgementRequest, Headers, Signal};
use std::collections::BTreeSet;

type Predicate = Box<dyn Fn(&Signal) -> bool + Send + Sync>;
type Transform = Box<dyn Fn(Headers) -> Headers + Send + Sync>;

struct PolicyRule {
    name: &'static str,
    applies: Predicate,
    transform: Transform,
}

pub struct HeaderPolicy {
    rules: Vec<PolicyRule>,
}

impl HeaderPolicy {
    pub fn builder() -> HeaderPolicyBuilder {
        HeaderPolicyBuilder { rules: Vec::new() }
    }

    /// A policy that never touches a signal.
    pub fn identity() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn standard() -> Self {
        Self::builder()
            .rule("twin-query", Signal::is_twin_query_command, |mut headers| {
                headers.set_requested_acks(BTreeSet::new());
                headers
            })
            .rule("twin-modify", Signal::is_twin_modify_command, |headers| {
                with_implicit_label(headers, AcknowledgementLabel::Persisted, &AcknowledgementLabel::LiveResponse)
            })
            .rule(
                "live-or-message",
                |signal: &Signal| signal.is_live_command() || signal.is_message_command(),
                |headers| with_implicit_label(headers, AcknowledgementLabel::LiveResponse, &AcknowledgementLabel::Persisted),
            )
            .build()
    }

    pub fn apply(&self, signal: Signal) -> Signal {
        match self.rules.iter().find(|rule| (rule.applies)(&signal)) {
            Some(rule) => {
                log::trace!("Header policy '{}' applies to {:?} on {}", rule.name, signal.kind, signal.entity_id);
                let headers = (rule.transform)(signal.headers.clone());
                signal.with_headers(headers)
            }
            None => signal,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

pub struct HeaderPolicyBuilder {
    rules: Vec<PolicyRule>,
}

impl HeaderPolicyBuilder {
    pub fn rule<P, T>(mut self, name: &'static str, applies: P, transform: T) -> Self
    where
        P: Fn(&Signal) -> bool + Send + Sync + 'static,
        T: Fn(Headers) -> Headers + Send + Sync + 'static,
    {
        self.rules.push(PolicyRule {
            name,
            applies: Box::new(applies),
            transform: Box::new(transform),
        });
        self
    }

    pub fn build(self) -> HeaderPolicy {
        HeaderPolicy { rules: self.rules }
    }
}

/// Drops the built-in label that cannot be satisfied on this channel and adds
/// the channel's own built-in label when the requester left acks unspecified.
fn with_implicit_label(
    mut headers: Headers,
    implicit: AcknowledgementLabel,
    unsupported: &AcknowledgementLabel,
) -> Headers {
    match headers.requested_acks().cloned() {
        None => {
            let required = headers.is_response_required();
            let mut requests = BTreeSet::new();
            if required {
                requests.insert(AcknowledgementRequest::new(implicit));
            }
            headers.set_requested_acks(requests);
            headers.set_response_required(required);
        }
        Some(requests) => {
            let explicitly_empty = requests.is_empty();
            let filtered: BTreeSet<AcknowledgementRequest> = requests
                .into_iter()
                .filter(|request| request.label() != unsupported)
                .collect();
            headers.set_requested_acks(filtered);
            if headers.response_required().is_none() {
                headers.set_response_required(!explicitly_empty);
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Channel, SignalKind};

    fn signal(kind: SignalKind, headers: Headers) -> Signal {
        Signal::new(kind, "thing:1", headers)
    }

    #[test]
    fn test_twin_modify_gets_persisted_by_default() {
        let adjusted = HeaderPolicy::standard().apply(signal(SignalKind::ModifyCommand, Headers::new()));
        assert_eq!(
            adjusted.headers.ack_labels(),
            BTreeSet::from([AcknowledgementLabel::Persisted])
        );
        assert_eq!(adjusted.headers.response_required(), Some(true));
    }

    #[test]
    fn test_twin_modify_without_response_requests_nothing() {
        let headers = Headers::new().with_response_required(false);
        let adjusted = HeaderPolicy::standard().apply(signal(SignalKind::ModifyCommand, headers));
        assert!(adjusted.headers.ack_labels().is_empty());
        assert_eq!(adjusted.headers.response_required(), Some(false));
    }

    #[test]
    fn test_twin_modify_drops_live_response() {
        let headers = Headers::new().with_requested_acks([
            AcknowledgementLabel::LiveResponse,
            AcknowledgementLabel::custom("custom-x"),
        ]);
        let adjusted = HeaderPolicy::standard().apply(signal(SignalKind::ModifyCommand, headers));
        assert_eq!(
            adjusted.headers.ack_labels(),
            BTreeSet::from([AcknowledgementLabel::custom("custom-x")])
        );
    }

    #[test]
    fn test_explicit_empty_acks_disable_response() {
        let headers = Headers::new().with_requested_acks(Vec::<AcknowledgementLabel>::new());
        let adjusted = HeaderPolicy::standard().apply(signal(SignalKind::ModifyCommand, headers));
        assert_eq!(adjusted.headers.response_required(), Some(false));
    }

    #[test]
    fn test_live_command_gets_live_response() {
        let headers = Headers::new()
            .with_channel(Channel::Live)
            .with_requested_acks([AcknowledgementLabel::Persisted, AcknowledgementLabel::custom("x")]);
        let adjusted = HeaderPolicy::standard().apply(signal(SignalKind::ModifyCommand, headers));
        assert_eq!(adjusted.headers.ack_labels(), BTreeSet::from([AcknowledgementLabel::custom("x")]));

        let adjusted = HeaderPolicy::standard().apply(signal(SignalKind::MessageCommand, Headers::new()));
        assert_eq!(adjusted.headers.ack_labels(), BTreeSet::from([AcknowledgementLabel::LiveResponse]));
    }

    #[test]
    fn test_twin_query_clears_acks() {
        let headers = Headers::new().with_requested_acks([AcknowledgementLabel::Persisted]);
        let adjusted = HeaderPolicy::standard().apply(signal(SignalKind::QueryCommand, headers));
        assert!(adjusted.headers.ack_labels().is_empty());
    }

    #[test]
    fn test_events_pass_through() {
        let headers = Headers::new().with_requested_acks([AcknowledgementLabel::custom("x")]);
        let original = signal(SignalKind::Event, headers);
        assert_eq!(HeaderPolicy::standard().apply(original.clone()), original);
        assert_eq!(HeaderPolicy::identity().rule_count(), 0);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let policy = HeaderPolicy::builder()
            .rule("first", |_: &Signal| true, |headers| headers.with_entry("rule", "first"))
            .rule("second", |_: &Signal| true, |headers| headers.with_entry("rule", "second"))
            .build();
        let adjusted = policy.apply(signal(SignalKind::Other, Headers::new()));
        assert_eq!(adjusted.headers.get("rule"), Some("first"));
    }
}
