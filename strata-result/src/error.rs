use std::io;
use thiserror::Error;

/// Unified error type for all strata operations.
///
/// Errors propagate upward through the call stack using Rust's `?` operator.
/// The layout compiler never partially succeeds: either a fully frozen layout
/// is returned, or one of these errors is, and nothing was built.
///
/// # Thread Safety
///
/// `Error` implements `Send` and `Sync`, so failures can cross thread
/// boundaries (layouts are routinely validated on worker pools).
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a layout descriptor.
    ///
    /// Raised by the JSON entry points when the underlying reader fails.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The descriptor text is not valid JSON, or does not decode into a
    /// layout descriptor record.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The layout descriptor is invalid, or an update descriptor is
    /// inconsistent with the prior layout it builds on.
    ///
    /// This single kind covers every validation failure: invalid names and
    /// aliases, duplicate names or IDs among siblings, ID disagreements with
    /// the prior layout, forbidden mutations (family kind flips, row-key
    /// encoding changes, cell storage changes), invalid renames and deletes,
    /// prior entities left unaccounted for, malformed cell schemas, and
    /// out-of-range parameters. The message carries the specifics.
    #[error("{0}")]
    InvalidLayout(String),

    /// A lookup named a column that does not exist in the layout.
    ///
    /// Distinct from [`Error::InvalidLayout`]: the layout itself is fine,
    /// the caller asked for something it does not contain.
    #[error("{0}")]
    NoSuchColumn(String),

    /// Invalid API parameter, such as querying the cell schema of an entire
    /// group-type family without a qualifier.
    ///
    /// # Recovery
    ///
    /// These errors are recoverable — fix the argument and retry.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Internal error indicating a bug or unexpected state.
    ///
    /// This should never occur during normal operation; it means an internal
    /// invariant of the layout builder was violated.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}
