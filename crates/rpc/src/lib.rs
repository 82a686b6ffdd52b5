//! HTTP API surface for hivesplit: payout runs and distribution previews
//! over the engine, plus a health endpoint.

pub mod server;

pub use server::{start_server, AppState};
