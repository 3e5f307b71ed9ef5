// Tue Jan 13 2026 - Alex

use crate::aggregation::AggregationStarter;
use crate::config::EngineConfig;
use crate::error::AckResult;
use crate::forwarder::{Forwarder, ForwarderStarter};
use crate::message::SessionMessage;
use crate::model::{Acknowledgement, AcknowledgementCombiner, AcknowledgementLabel, AggregationResult, Signal, StatusCombiner};
use crate::namespace::{ActorRef, ProcessNamespace};
use crate::policy::HeaderPolicy;
use std::sync::Arc;

/// What became of a dispatched signal.
#[derive(Debug)]
pub enum Dispatch {
    /// A session is collecting acknowledgements; responses go to `session`.
    Aggregating { signal: Signal, session: ActorRef },
    /// Nothing to aggregate. The signal carries the adjusted headers.
    PassThrough(Signal),
}

impl Dispatch {
    pub fn signal(&self) -> &Signal {
        match self {
            Dispatch::Aggregating { signal, .. } => signal,
            Dispatch::PassThrough(signal) => signal,
        }
    }

    pub fn session(&self) -> Option<&ActorRef> {
        match self {
            Dispatch::Aggregating { session, .. } => Some(session),
            Dispatch::PassThrough(_) => None,
        }
    }
}

pub struct AckEngine {
    config: Arc<EngineConfig>,
    namespace: Arc<ProcessNamespace>,
    starter: AggregationStarter,
}

impl AckEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(config, HeaderPolicy::standard(), Arc::new(StatusCombiner::new()))
    }

    pub fn with_parts(config: EngineConfig, policy: HeaderPolicy, combiner: Arc<dyn AcknowledgementCombiner>) -> Self {
        let config = Arc::new(config);
        let namespace = ProcessNamespace::new();
        let starter = AggregationStarter::new(Arc::clone(&config), Arc::clone(&namespace), Arc::new(policy), combiner);

        Self {
            config,
            namespace,
            starter,
        }
    }

    /// Runs the signal through the header policy and, when acknowledgements
    /// must be collected, starts a session that calls `on_result` exactly once.
    pub fn dispatch<F>(&self, signal: Signal, on_result: F) -> AckResult<Dispatch>
    where
        F: FnOnce(AggregationResult) + Send + 'static,
    {
        self.starter.start(
            signal,
            Box::new(on_result),
            |signal, session| Dispatch::Aggregating { signal, session },
            Dispatch::PassThrough,
        )
    }

    pub fn forwarder_starter<P>(&self, signal: &Signal, requester: ActorRef, is_label_allowed: P) -> ForwarderStarter
    where
        P: Fn(&AcknowledgementLabel) -> bool,
    {
        ForwarderStarter::new(
            Arc::clone(&self.namespace),
            Arc::clone(&self.config),
            signal.clone(),
            requester,
            is_label_allowed,
        )
    }

    /// Hands an acknowledgement to the forwarder registered for its
    /// correlation id. Returns false when there is none.
    pub fn route_acknowledgement(&self, ack: Acknowledgement) -> bool {
        let name = match ack.headers.correlation_id() {
            Some(correlation_id) => Forwarder::name_for(correlation_id),
            None => {
                log::warn!("Acknowledgement {} for {} has no correlation id", ack.label, ack.entity_id);
                return false;
            }
        };

        let label = ack.label.clone();
        let delivered = self.namespace.tell(&name, SessionMessage::Acknowledgement(ack));
        if !delivered {
            log::debug!("No forwarder {} for acknowledgement {}", name, label);
        }
        delivered
    }

    pub fn namespace(&self) -> &Arc<ProcessNamespace> {
        &self.namespace
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for AckEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
