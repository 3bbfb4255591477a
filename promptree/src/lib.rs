//! Two-phase prompt tree interpreter.
//!
//! A prompt is an immutable [`tree::Node`] tree of components. The same tree
//! is walked twice:
//!
//! - **discovery** finds the inputs still needed given the answers so far,
//!   driven step by step by [`core::iterator::InputIterator`];
//! - **final rendering** substitutes the answers and produces provider-aware
//!   text plus post-execution actions.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (environment, formulas, renderer).
//! - **[`components`]**: The component contract and builtin components.
//! - **[`io`]**: Side-effecting loaders (config files, tree files, host facts).
//!
//! [`render`] ties them together for the CLI and other callers.

pub mod components;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
