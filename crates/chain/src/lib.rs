//! Chain access for hivesplit: an HTTP gateway over a delegation index
//! service, implementing the engine's `ChainGateway` port.

pub mod asset;
pub mod gateway;

pub use asset::*;
pub use gateway::*;
