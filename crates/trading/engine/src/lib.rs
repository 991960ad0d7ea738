//! Composition root: wires the feed handler (C5), venue router (C6), risk
//! gate (C7), order lifecycle manager (C8), and position reconciliation
//! manager (C9) into the tick-to-trade core described in §2's control-flow
//! summary. C1 (clock/histogram) and C4 (instrument/price/yield) live in
//! `common` and are used throughout rather than re-exposed here.

pub mod core;
pub mod execution;
pub mod memory;
pub mod metrics;

pub use core::{Engine, EngineConfig};
pub use execution::ExecutionLayer;
pub use memory::OrderStagingPool;
pub use metrics::EngineSnapshot;
