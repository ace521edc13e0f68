//! The `utils` module provides shared plumbing used across the `mqpush`
//! application: the bridge-wide error type and logging initialization.

pub mod error;
pub mod logging;
