//! Process-wide cache of compiled path expressions.
//!
//! Patterns are compiled once per distinct source string and reused forever
//! (the cache is insert-only and bounded by the distinct patterns the
//! process ever uses). Many clone calls may compile the same pattern
//! concurrently, so the cache is a concurrent read-through map; racing
//! compilers produce identical expressions and the first insert wins.
//!
//! # References
//! - Read-through memoization of parsed queries: the compiled-statement
//!   caches of SQL drivers; Fowler, "Patterns of Enterprise Application
//!   Architecture", Registry (2002)

use crate::pattern::{compile, PathExpr, PatternSyntaxError};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::debug;

static COMPILED: Lazy<DashMap<String, Arc<PathExpr>>> = Lazy::new(DashMap::new);

/// Returns the compiled expression for `pattern`, compiling on first use.
///
/// Malformed patterns fail with [`PatternSyntaxError`] and are not cached;
/// only successful compiles enter the cache.
pub fn compiled(pattern: &str) -> Result<Arc<PathExpr>, PatternSyntaxError> {
    if let Some(hit) = COMPILED.get(pattern) {
        return Ok(Arc::clone(&hit));
    }
    let expr = Arc::new(compile(pattern)?);
    debug!(pattern, "compiled path expression");
    let entry = COMPILED
        .entry(pattern.to_string())
        .or_insert_with(|| expr);
    Ok(Arc::clone(&entry))
}

/// Returns the number of distinct patterns compiled so far in this process.
pub fn compiled_count() -> usize {
    COMPILED.len()
}
