//! Common test utilities for vd-agent integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod engine;

#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use engine::*;
