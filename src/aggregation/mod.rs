// Tue Jan 13 2026 - Alex

pub mod metadata;
pub mod session;
pub mod starter;

pub use metadata::RequestMetadata;
pub use session::{reconcile_headers, AggregationSession, FinalizeTrigger, ResultCallback, SessionState};
pub use starter::{AggregationStarter, Preprocessed};
