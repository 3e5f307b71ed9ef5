// Tue Jan 13 2026 - Alex

pub mod acknowledgement;
pub mod headers;
pub mod label;
pub mod response;
pub mod signal;
pub mod status;

pub use acknowledgement::{
    Acknowledgement, AcknowledgementCombiner, AcknowledgementSet, AcknowledgementsResponse, StatusCombiner,
};
pub use headers::{Channel, Headers};
pub use label::{AcknowledgementLabel, AcknowledgementRequest};
pub use response::{AggregationResult, CommandResponse, ErrorResponse};
pub use signal::{Signal, SignalKind};
pub use status::StatusCode;
