//! hivesplit engine: the curation reward distribution core.
//!
//! Reconstructs delegator stakes from the append-only delegation event log,
//! applies eligibility filters, splits a reward pool proportionally to stake
//! and derives a bounded dynamic payout rate from recent reward accrual.
//!
//! Units: VESTS is the raw on-chain stake unit, HP the human-facing stake
//! unit derived from it, HIVE the currency payouts are denominated in.

pub mod allocator;
pub mod config;
pub mod distributor;
pub mod errors;
pub mod filter;
pub mod ports;
pub mod rate;
pub mod snapshot;

pub use allocator::*;
pub use config::*;
pub use distributor::*;
pub use errors::*;
pub use filter::*;
pub use ports::*;
pub use rate::*;
pub use snapshot::*;
