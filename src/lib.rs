// Tue Jan 15 2026 - Alex

pub mod aggregation;
pub mod config;
pub mod engine;
pub mod error;
pub mod forwarder;
pub mod message;
pub mod model;
pub mod namespace;
pub mod policy;
pub mod utils;

pub use aggregation::{AggregationSession, AggregationStarter};
pub use config::EngineConfig;
pub use engine::{AckEngine, Dispatch};
pub use error::{AckError, AckResult};
pub use forwarder::{Forwarder, ForwarderStarter};
pub use message::SessionMessage;
pub use namespace::{ActorRef, ProcessNamespace};
pub use policy::HeaderPolicy;
