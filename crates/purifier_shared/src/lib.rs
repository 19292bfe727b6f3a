//! Shared functionality
//!
//! Types used by more than one purifier crate: source locations and the common error and
//! result types.

pub mod location;
pub mod types;
