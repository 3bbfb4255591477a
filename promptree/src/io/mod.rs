//! Side-effecting helpers for the CLI: files, terminals and host facts.

pub mod answers;
pub mod config;
pub mod runtime;
pub mod tree_store;
