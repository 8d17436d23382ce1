//! # PriceNet Node Runtime
//!
//! Wires the mining coordinator, the grader, and the stat tracker into a
//! running node. The binary entry point lives in `main.rs`; this library
//! exposes the runtime and the in-memory dev adapters so the test suite
//! can assemble the same node the binary runs.

pub mod adapters;
pub mod runtime;

pub use runtime::{NodeConfig, NodeRuntime};
