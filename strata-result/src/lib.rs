//! Error types and result definitions for the strata table store.
//!
//! This crate provides the unified error type ([`Error`]) and result type
//! alias ([`Result<T>`]) used throughout the strata crates. All operations
//! that could fail return `Result<T>` and propagate failures with the `?`
//! operator; at API boundaries, callers can match on the variant to tell a
//! rejected layout apart from a missing column or an I/O problem.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
