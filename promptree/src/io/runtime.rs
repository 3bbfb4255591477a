//! Host facts captured once per render call.

use std::env;
use std::fs;

use chrono::Utc;
use tracing::debug;

use crate::core::environment::RuntimeFacts;

const UNKNOWN: &str = "unknown";

/// Capture hostname, username, working directory and the current time.
///
/// Lookups that fail fall back to `"unknown"`; capturing never errors.
pub fn capture() -> RuntimeFacts {
    let facts = RuntimeFacts {
        hostname: hostname(),
        username: username(),
        cwd: env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|_| UNKNOWN.to_string()),
        now: Utc::now(),
    };
    debug!(hostname = %facts.hostname, username = %facts.username, "captured runtime facts");
    facts
}

fn hostname() -> String {
    non_empty(env::var("HOSTNAME").ok())
        .or_else(|| non_empty(env::var("COMPUTERNAME").ok()))
        .or_else(|| non_empty(fs::read_to_string("/etc/hostname").ok()))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn username() -> String {
    non_empty(env::var("USER").ok())
        .or_else(|| non_empty(env::var("USERNAME").ok()))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
