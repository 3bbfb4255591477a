//! Deterministic, pure logic behind discovery and rendering.
//!
//! Core modules are free of I/O side effects. Runtime facts arrive through
//! [`environment::RuntimeFacts`], captured by the caller.

pub mod environment;
pub mod error;
pub mod formula;
pub mod input;
pub mod iterator;
pub mod renderer;
pub mod scope;
pub mod types;
