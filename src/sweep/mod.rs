//! Batch settlement of pending bets.

pub mod core;
pub mod runner;

pub use self::core::{run_sweep, SweepReport};
pub use self::runner::{build_gateway, build_store, run_sweep_job, settle_one};
