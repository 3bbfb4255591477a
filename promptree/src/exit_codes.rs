//! Stable exit codes for promptree CLI commands.

/// Command succeeded; for `render`, the output is complete.
pub const OK: i32 = 0;
/// Invalid tree, config or arguments, or a fatal render error.
pub const INVALID: i32 = 1;
/// Render finished best-effort: inputs are missing or subtrees were skipped.
pub const INCOMPLETE: i32 = 2;
