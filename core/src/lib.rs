#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

extern crate alloc;

// Re-export for convenience so other modules don't need alloc:: prefix
#[allow(unused_imports)]
pub(crate) use alloc::{boxed::Box, format, string::String, string::ToString, vec, vec::Vec};

pub mod api;
pub mod approximation;
pub mod dimension;
pub mod interrupt;
pub mod parser;
pub mod precision;
pub mod projection;
pub mod reduction;
pub mod render;
pub mod tree;
pub mod units;

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    use crate::tree::TreeArena;

    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_projection() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }

    /// Parse `source` into a fresh arena and return it with the root position.
    pub fn parse_into(source: &str) -> (TreeArena, usize) {
        let mut arena = TreeArena::default();
        let root = crate::parser::parse_into_arena(&mut arena, source)
            .unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"));
        (arena, root)
    }
}
