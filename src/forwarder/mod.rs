// Tue Jan 13 2026 - Alex

pub mod relay;
pub mod starter;

pub use relay::Forwarder;
pub use starter::ForwarderStarter;
