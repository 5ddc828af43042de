//! Diffgate — diff-based human approval gateway library.
//!
//! This library exposes the core components of diffgate for integration
//! testing and programmatic use. The binary entrypoint is in `main.rs`.

// Many items are pub for use by integration tests and embedding hosts,
// which are separate compilation units — suppress false dead_code warnings.
#![allow(dead_code)]

pub mod agent;
pub mod approval;
pub mod audit;
pub mod cli;
pub mod diff;
pub mod surface;
pub mod utils;
