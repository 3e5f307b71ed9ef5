// Tue Jan 13 2026 - Alex

use crate::config::EngineConfig;
use crate::error::{AckError, AckResult};
use crate::forwarder::relay::Forwarder;
use crate::message::SessionMessage;
use crate::model::{Acknowledgement, AcknowledgementLabel, AcknowledgementRequest, Signal};
use crate::namespace::{ActorRef, ProcessNamespace};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

static SUFFIXED_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)#(\d+)$").expect("suffix pattern is valid"));

/// Starts the forwarder that lets out-of-band acknowledgements for one signal
/// find their way back to the session waiting for them.
pub struct ForwarderStarter {
    namespace: Arc<ProcessNamespace>,
    config: Arc<EngineConfig>,
    signal: Signal,
    requester: ActorRef,
    allowed: BTreeSet<AcknowledgementRequest>,
}

impl ForwarderStarter {
    /// `is_label_allowed` is the channel's policy for custom labels;
    /// `LiveResponse` passes regardless.
    pub fn new<P>(
        namespace: Arc<ProcessNamespace>,
        config: Arc<EngineConfig>,
        signal: Signal,
        requester: ActorRef,
        is_label_allowed: P,
    ) -> Self
    where
        P: Fn(&AcknowledgementLabel) -> bool,
    {
        let allowed = signal
            .headers
            .ack_requests()
            .into_iter()
            .filter(|request| *request.label() == AcknowledgementLabel::LiveResponse || is_label_allowed(request.label()))
            .collect();

        Self {
            namespace,
            config,
            signal,
            requester,
            allowed,
        }
    }

    pub fn allowed_ack_requests(&self) -> &BTreeSet<AcknowledgementRequest> {
        &self.allowed
    }

    pub fn has_effective_ack_requests(signal: &Signal, allowed: &BTreeSet<AcknowledgementRequest>) -> bool {
        if signal.is_twin_event() {
            allowed.iter().any(|request| !request.label().is_built_in())
        } else if signal.is_message_command() || signal.is_live_command() {
            allowed.iter().any(|request| *request.label() != AcknowledgementLabel::Persisted)
                || signal.headers.is_response_required()
        } else if signal.is_policy_announcement() {
            !allowed.is_empty()
        } else {
            false
        }
    }

    fn is_effective(&self) -> bool {
        Self::has_effective_ack_requests(&self.signal, &self.allowed)
    }

    /// Starts a forwarder named after the signal's correlation id. A name
    /// collision is answered with one negative acknowledgement per custom
    /// label instead of a forwarder.
    pub fn get(&self) -> Option<ActorRef> {
        if !self.is_effective() {
            return None;
        }

        let correlation_id = match self.signal.correlation_id() {
            Some(id) => id.to_string(),
            None => {
                log::warn!("Signal for {} has no correlation id, not starting a forwarder", self.signal.entity_id);
                return None;
            }
        };

        match self.start_forwarder(&correlation_id) {
            Ok(forwarder) => Some(forwarder),
            Err(err) if err.is_name_conflict() => {
                log::warn!("Correlation id {} already has a forwarder, rejecting its acknowledgements", correlation_id);
                self.reject_duplicate(&correlation_id);
                None
            }
            Err(err) => {
                log::error!("Failed to start forwarder for {}: {}", correlation_id, err);
                None
            }
        }
    }

    /// Starts a forwarder under a correlation id nobody else holds, appending
    /// or bumping a `#<n>` suffix until a free name is found.
    pub fn get_conflict_free(&self) -> AckResult<Option<String>> {
        if !self.is_effective() {
            return Ok(None);
        }

        let (prefix, mut next) = search_start(self.signal.correlation_id());
        let max_attempts = self.config.conflict_free_max_attempts;

        for _ in 0..max_attempts {
            let candidate = join_correlation_id(&prefix, next);
            match self.start_forwarder(&candidate) {
                Ok(_) => return Ok(Some(candidate)),
                Err(err) if err.is_name_conflict() => {
                    log::debug!("Correlation id {} is taken, trying the next suffix", candidate);
                    next = match next {
                        None => Some(0),
                        Some(n) => match n.checked_add(1) {
                            Some(bumped) => Some(bumped),
                            None => break,
                        },
                    };
                }
                Err(err) => return Err(err),
            }
        }

        Err(AckError::ConflictFreeExhausted {
            prefix,
            attempts: max_attempts,
        })
    }

    /// Like `get_conflict_free`, returning the signal rewritten to the chosen
    /// correlation id.
    pub fn get_conflict_free_signal(&self) -> AckResult<Option<Signal>> {
        Ok(self.get_conflict_free()?.map(|correlation_id| {
            let mut signal = self.signal.clone();
            signal.headers.set_correlation_id(&correlation_id);
            signal
        }))
    }

    fn start_forwarder(&self, correlation_id: &str) -> AckResult<ActorRef> {
        let name = Forwarder::name_for(correlation_id);
        let forwarder = Forwarder::new(
            correlation_id,
            self.requester.clone(),
            self.config.forwarder_fallback_timeout(),
        );
        let actor = self.namespace.spawn(&name, move |mailbox, _| forwarder.run(mailbox))?;
        log::debug!("Started forwarder {} for {}", name, self.requester.name());
        Ok(actor)
    }

    fn reject_duplicate(&self, correlation_id: &str) {
        let error = AckError::DuplicateCorrelationId(correlation_id.to_string());
        let response = error.to_error_response(self.signal.headers.clone());

        for request in &self.allowed {
            let label = request.label();
            if label.is_built_in() {
                continue;
            }
            let nack = Acknowledgement::new(label.clone(), &self.signal.entity_id, error.status(), self.signal.headers.clone())
                .with_payload(response.body());
            if !self.requester.tell(SessionMessage::Acknowledgement(nack)) {
                log::warn!("Requester {} is gone, dropping NACK for {}", self.requester.name(), label);
            }
        }
    }
}

/// Prefix and first suffix to try. An id that already carries `#<n>` was
/// handed out by an earlier round, so the search starts past it; when `n`
/// cannot be bumped, the whole id becomes the prefix of a fresh `#0`.
fn search_start(correlation_id: Option<&str>) -> (String, Option<u64>) {
    let id = match correlation_id {
        Some(id) => id,
        None => return (Uuid::new_v4().to_string(), None),
    };

    if let Some(captures) = SUFFIXED_ID.captures(id) {
        if let Ok(counter) = captures[2].parse::<u64>() {
            return match counter.checked_add(1) {
                Some(next) => (captures[1].to_string(), Some(next)),
                None => (id.to_string(), Some(0)),
            };
        }
    }
    (id.to_string(), None)
}

fn join_correlation_id(prefix: &str, suffix: Option<u64>) -> String {
    match suffix {
        Some(n) => format!("{}#{}", prefix, n),
        None => prefix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Channel, Headers, SignalKind, StatusCode};
    use std::sync::mpsc::Receiver;
    use std::time::Duration;

    fn config() -> Arc<EngineConfig> {
        Arc::new(EngineConfig::default().with_forwarder_fallback_timeout(Duration::from_secs(5)))
    }

    fn signal(kind: SignalKind, headers: Headers) -> Signal {
        Signal::new(kind, "thing:1", headers)
    }

    fn live_command(correlation_id: &str, labels: &[AcknowledgementLabel]) -> Signal {
        signal(
            SignalKind::ModifyCommand,
            Headers::new()
                .with_correlation_id(correlation_id)
                .with_channel(Channel::Live)
                .with_requested_acks(labels.iter().cloned()),
        )
    }

    fn start_for(namespace: &Arc<ProcessNamespace>, signal: Signal) -> (ForwarderStarter, Receiver<SessionMessage>) {
        let (requester, inbox) = ActorRef::channel("requester");
        let starter = ForwarderStarter::new(Arc::clone(namespace), config(), signal, requester, |_| true);
        (starter, inbox)
    }

    /// Occupies a forwarder name until the returned reference is told anything.
    fn occupy(namespace: &Arc<ProcessNamespace>, correlation_id: &str) -> ActorRef {
        namespace
            .spawn(&Forwarder::name_for(correlation_id), |mailbox, _| {
                let _ = mailbox.recv_timeout(Duration::from_secs(5));
            })
            .unwrap()
    }

    #[test]
    fn test_allowed_requests_always_keep_live_response() {
        let namespace = ProcessNamespace::new();
        let (requester, _inbox) = ActorRef::channel("requester");
        let signal = live_command(
            "c",
            &[
                AcknowledgementLabel::LiveResponse,
                AcknowledgementLabel::custom("allowed"),
                AcknowledgementLabel::custom("denied"),
            ],
        );
        let starter = ForwarderStarter::new(namespace, config(), signal, requester, |label| label.as_str() == "allowed");

        let labels: Vec<&str> = starter.allowed_ack_requests().iter().map(|r| r.label().as_str()).collect();
        assert_eq!(labels.len(), 2);
        assert!(labels.contains(&"live-response"));
        assert!(labels.contains(&"allowed"));
    }

    #[test]
    fn test_effective_ack_requests() {
        let custom: BTreeSet<AcknowledgementRequest> = [AcknowledgementRequest::new(AcknowledgementLabel::custom("x"))].into();
        let persisted: BTreeSet<AcknowledgementRequest> = [AcknowledgementRequest::new(AcknowledgementLabel::Persisted)].into();
        let live: BTreeSet<AcknowledgementRequest> = [AcknowledgementRequest::new(AcknowledgementLabel::LiveResponse)].into();
        let none = BTreeSet::new();

        let twin_event = signal(SignalKind::Event, Headers::new());
        assert!(ForwarderStarter::has_effective_ack_requests(&twin_event, &custom));
        assert!(!ForwarderStarter::has_effective_ack_requests(&twin_event, &persisted));
        assert!(!ForwarderStarter::has_effective_ack_requests(&twin_event, &live));

        let message = signal(SignalKind::MessageCommand, Headers::new().with_response_required(false));
        assert!(ForwarderStarter::has_effective_ack_requests(&message, &live));
        assert!(!ForwarderStarter::has_effective_ack_requests(&message, &persisted));
        let message_with_response = signal(SignalKind::MessageCommand, Headers::new().with_response_required(true));
        assert!(ForwarderStarter::has_effective_ack_requests(&message_with_response, &none));

        let announcement = signal(SignalKind::PolicyAnnouncement, Headers::new());
        assert!(ForwarderStarter::has_effective_ack_requests(&announcement, &persisted));
        assert!(!ForwarderStarter::has_effective_ack_requests(&announcement, &none));

        let twin_command = signal(SignalKind::ModifyCommand, Headers::new());
        assert!(!ForwarderStarter::has_effective_ack_requests(&twin_command, &custom));
    }

    #[test]
    fn test_get_starts_forwarder_by_correlation_id() {
        let namespace = ProcessNamespace::new();
        let (starter, _inbox) = start_for(&namespace, live_command("c-1", &[AcknowledgementLabel::custom("x")]));

        let forwarder = starter.get().unwrap();
        assert_eq!(forwarder.name(), "ackForwarder-c-1");
        assert!(namespace.contains("ackForwarder-c-1"));
    }

    #[test]
    fn test_second_get_nacks_custom_labels_only() {
        let namespace = ProcessNamespace::new();
        let labels = [
            AcknowledgementLabel::LiveResponse,
            AcknowledgementLabel::custom("x"),
            AcknowledgementLabel::custom("y"),
        ];
        let (first, _first_inbox) = start_for(&namespace, live_command("dup", &labels));
        assert!(first.get().is_some());

        let (second, inbox) = start_for(&namespace, live_command("dup", &labels));
        assert!(second.get().is_none());

        let mut nacked = Vec::new();
        while let Ok(message) = inbox.try_recv() {
            match message {
                SessionMessage::Acknowledgement(nack) => {
                    assert_eq!(nack.status, StatusCode::CONFLICT);
                    assert_eq!(nack.payload.as_ref().unwrap()["error"], "acknowledgement:duplicate.correlation.id");
                    nacked.push(nack.label.to_string());
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        nacked.sort();
        assert_eq!(nacked, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_get_without_effective_requests_starts_nothing() {
        let namespace = ProcessNamespace::new();
        let twin_command = signal(
            SignalKind::ModifyCommand,
            Headers::new()
                .with_correlation_id("c")
                .with_requested_acks([AcknowledgementLabel::custom("x")]),
        );
        let (starter, _inbox) = start_for(&namespace, twin_command);

        assert!(starter.get().is_none());
        assert_eq!(starter.get_conflict_free().unwrap(), None);
        assert!(namespace.is_empty());
    }

    #[test]
    fn test_conflict_free_bumps_suffix() {
        let namespace = ProcessNamespace::new();
        let _taken = occupy(&namespace, "abc#4");
        let (starter, _inbox) = start_for(&namespace, live_command("abc#3", &[AcknowledgementLabel::custom("x")]));

        assert_eq!(starter.get_conflict_free().unwrap(), Some("abc#5".to_string()));
        assert!(!namespace.contains(&Forwarder::name_for("abc#3")));
    }

    #[test]
    fn test_conflict_free_without_suffix() {
        let namespace = ProcessNamespace::new();
        let (starter, _inbox) = start_for(&namespace, live_command("plain", &[AcknowledgementLabel::custom("x")]));
        assert_eq!(starter.get_conflict_free().unwrap(), Some("plain".to_string()));

        let (again, _inbox) = start_for(&namespace, live_command("plain", &[AcknowledgementLabel::custom("x")]));
        let rewritten = again.get_conflict_free_signal().unwrap().unwrap();
        assert_eq!(rewritten.correlation_id(), Some("plain#0"));
    }

    #[test]
    fn test_conflict_free_generates_id_when_absent() {
        let namespace = ProcessNamespace::new();
        let headers = Headers::new()
            .with_channel(Channel::Live)
            .with_requested_acks([AcknowledgementLabel::custom("x")]);
        let (starter, _inbox) = start_for(&namespace, signal(SignalKind::ModifyCommand, headers));

        let id = starter.get_conflict_free().unwrap().unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_conflict_free_is_bounded() {
        let namespace = ProcessNamespace::new();
        let _a = occupy(&namespace, "b");
        let _b = occupy(&namespace, "b#0");
        let (requester, _inbox) = ActorRef::channel("requester");
        let bounded = Arc::new(EngineConfig::default().with_conflict_free_max_attempts(2));
        let starter = ForwarderStarter::new(
            Arc::clone(&namespace),
            bounded,
            live_command("b", &[AcknowledgementLabel::custom("x")]),
            requester,
            |_| true,
        );

        let err = starter.get_conflict_free().unwrap_err();
        assert!(matches!(err, AckError::ConflictFreeExhausted { attempts: 2, .. }));
    }

    #[test]
    fn test_search_start() {
        assert_eq!(search_start(Some("abc#3")), ("abc".to_string(), Some(4)));
        assert_eq!(search_start(Some("a#b#12")), ("a#b".to_string(), Some(13)));
        assert_eq!(search_start(Some("abc#")), ("abc#".to_string(), None));
        assert_eq!(search_start(Some("abc#x1")), ("abc#x1".to_string(), None));
        assert_eq!(search_start(Some("abc#99999999999999999999")), ("abc#99999999999999999999".to_string(), None));
        assert_eq!(join_correlation_id("abc", Some(0)), "abc#0");
        assert_eq!(join_correlation_id("abc", None), "abc");
    }

    #[test]
    fn test_search_start_at_largest_suffix() {
        let start = format!("abc#{}", u64::MAX);
        assert_eq!(search_start(Some(&start)), (start.clone(), Some(0)));
    }

    #[test]
    fn test_conflict_free_never_reuses_largest_suffix() {
        let start = format!("abc#{}", u64::MAX);
        let namespace = ProcessNamespace::new();
        let (starter, _inbox) = start_for(&namespace, live_command(&start, &[AcknowledgementLabel::custom("x")]));

        let chosen = starter.get_conflict_free().unwrap().unwrap();
        assert_ne!(chosen, start);
        assert_eq!(chosen, format!("{}#0", start));

        let (again, _inbox) = start_for(&namespace, live_command(&start, &[AcknowledgementLabel::custom("x")]));
        assert_eq!(again.get_conflict_free().unwrap(), Some(format!("{}#1", start)));
    }
}
