pub mod client;
pub mod domain;
pub mod gateway;
pub mod monitoring;
pub mod odds;
pub mod resolver;
pub mod settlement;
pub mod stats;
pub mod storage;
pub mod sweep;
pub mod types;
pub mod utils;
pub mod validation;

pub use crate::types::*;
