//! Shared types used around the filter core.
//!
//! The filter itself never fails; these errors cover configuration and
//! trace loading only.

pub mod errors;

pub use errors::CoreError;
