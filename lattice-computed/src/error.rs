//! Error Types
//!
//! Reads never fail in this crate: an unresolved key path yields
//! `Value::Null`. Errors only come from writes into the object model, from
//! the run loop, and from loading configuration.

use thiserror::Error;

use crate::object::ObjectId;

/// Errors produced by the object model, the run loop and configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Attempted to write a computed property that has no setter.
    #[error("cannot set read-only computed property `{key}`")]
    ReadOnly { key: String },

    /// Attempted to write to an object whose teardown has completed.
    #[error("cannot modify destroyed object {id:?}")]
    Destroyed { id: ObjectId },

    /// The key path cannot be used for the requested operation.
    #[error("invalid key path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// `push` was called on a path that does not hold an array.
    #[error("value at `{path}` is not an array")]
    NotAnArray { path: String },

    /// Deferred work kept scheduling more deferred work.
    #[error("run loop did not settle after {passes} flush passes")]
    RunLoopExhausted { passes: usize },

    /// Engine configuration could not be parsed.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
