//! Step dependency analysis and phased execution planning for multi-run
//! test scenarios.
//!
//! A scenario's steps produce and consume named values. A producer run stores
//! them, a later consumer run reads them back, and a permutational run
//! shuffles step order to expose hidden ordering assumptions.

pub mod cli;
pub mod config;
pub mod dependency;
pub mod emit;
pub mod extract;
pub mod graph;
pub mod phase;
pub mod plan;
pub mod store;
