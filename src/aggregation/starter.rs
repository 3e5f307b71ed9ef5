// Tue Jan 13 2026 - Alex

use crate::aggregation::session::{AggregationSession, ResultCallback};
use crate::config::EngineConfig;
use crate::error::{AckError, AckResult};
use crate::model::{AcknowledgementCombiner, AcknowledgementLabel, Signal};
use crate::namespace::{ActorRef, ProcessNamespace};
use crate::policy::HeaderPolicy;
use crate::utils::url_encode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const SESSION_NAME_PREFIX: &str = "ackr";

/// A signal after the header policy ran, and whether it needs a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    pub signal: Signal,
    pub should_start: bool,
}

/// Decides per signal whether acknowledgements must be aggregated and spawns
/// the session doing it.
pub struct AggregationStarter {
    config: Arc<EngineConfig>,
    namespace: Arc<ProcessNamespace>,
    policy: Arc<HeaderPolicy>,
    combiner: Arc<dyn AcknowledgementCombiner>,
    counter: AtomicU64,
}

impl AggregationStarter {
    pub fn new(
        config: Arc<EngineConfig>,
        namespace: Arc<ProcessNamespace>,
        policy: Arc<HeaderPolicy>,
        combiner: Arc<dyn AcknowledgementCombiner>,
    ) -> Self {
        Self {
            config,
            namespace,
            policy,
            combiner,
            counter: AtomicU64::new(0),
        }
    }

    pub fn preprocess(&self, signal: Signal) -> AckResult<Preprocessed> {
        let mut adjusted = self.policy.apply(signal);
        Self::validate(&adjusted)?;

        if adjusted.correlation_id().is_none() {
            adjusted.headers.set_correlation_id(&Uuid::new_v4().to_string());
        }

        let should_start = Self::should_start(&adjusted);
        Ok(Preprocessed {
            signal: adjusted,
            should_start,
        })
    }

    pub fn validate(signal: &Signal) -> AckResult<()> {
        let zero_timeout = signal.headers.timeout() == Some(Duration::ZERO);
        let wants_answer = signal.headers.is_response_required() || !signal.headers.ack_labels().is_empty();

        if zero_timeout && wants_answer {
            return Err(AckError::zero_timeout());
        }
        Ok(())
    }

    pub fn should_start(signal: &Signal) -> bool {
        let labels = signal.headers.ack_labels();

        if signal.is_twin_modify_command() {
            labels.iter().any(|label| *label != AcknowledgementLabel::LiveResponse)
        } else if signal.is_message_command() || signal.is_live_command() {
            labels.iter().any(|label| *label != AcknowledgementLabel::Persisted)
        } else {
            false
        }
    }

    /// Preprocesses `signal`, then either spawns a session delivering to
    /// `callback` and continues with `if_started`, or hands the adjusted
    /// signal to `if_not_started`.
    pub fn start<T, S, N>(&self, signal: Signal, callback: ResultCallback, if_started: S, if_not_started: N) -> AckResult<T>
    where
        S: FnOnce(Signal, ActorRef) -> T,
        N: FnOnce(Signal) -> T,
    {
        let Preprocessed { signal, should_start } = self.preprocess(signal)?;

        if should_start {
            let session = self.spawn_session(&signal, callback)?;
            Ok(if_started(signal, session))
        } else {
            log::trace!("No aggregation needed for {:?} on {}", signal.kind, signal.entity_id);
            Ok(if_not_started(signal))
        }
    }

    /// Name collisions are surfaced to the caller as `NameConflict`.
    pub fn spawn_session(&self, signal: &Signal, callback: ResultCallback) -> AckResult<ActorRef> {
        let correlation_id = signal.correlation_id().unwrap_or_default();
        let name = self.next_session_name(correlation_id);
        let session = AggregationSession::new(
            signal,
            self.config.forwarder_fallback_timeout(),
            Arc::clone(&self.combiner),
            callback,
        );

        match self.namespace.spawn(&name, move |mailbox, _| session.run(mailbox)) {
            Ok(actor) => {
                log::debug!("Started aggregation session {}", name);
                Ok(actor)
            }
            Err(err) => {
                log::warn!("Could not start aggregation session {}: {}", name, err);
                Err(err)
            }
        }
    }

    fn next_session_name(&self, correlation_id: &str) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{:x}-{}", SESSION_NAME_PREFIX, id, url_encode(correlation_id))
    }
}
