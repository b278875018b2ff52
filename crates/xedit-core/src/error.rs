//! Unified error types for the xEdit wrapper.
//!
//! Every fallible operation in the workspace returns [`XEditResult`]. The
//! variants mirror the layers a call passes through on its way to the
//! engine:
//!
//! ```text
//! XEditError
//! ├── InvalidHandleUse     - wrapper used after its frame released the handle
//! ├── NativeCall           - engine returned a failure flag (NativeCallFailure)
//! ├── SchemaMismatch       - path or field absent under the current descriptor
//! ├── InvariantViolation   - master ordering, non-removable/non-addable nodes
//! └── plumbing             - library loading, argument shapes, frames, decoding
//! ```
//!
//! [`ResourceLeak`] is deliberately not a variant: leaks are logged by the
//! handle registry and never returned to the caller.

use thiserror::Error;

use crate::handle::{FrameId, Handle};

/// Result alias used throughout the workspace.
pub type XEditResult<T> = Result<T, XEditError>;

// ============================================================================
// Native call failures
// ============================================================================

/// Failure reported by the engine through its boolean success flag.
///
/// `message` and `stack` are read from the engine's last-error side channel
/// immediately after the failing call, before anything else can overwrite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCallFailure {
    /// Catalog name of the failing function.
    pub operation: &'static str,
    /// Rendered input arguments.
    pub args: Vec<String>,
    pub message: String,
    pub stack: String,
}

impl std::fmt::Display for NativeCallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.operation, self.args.join(", "))?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

// ============================================================================
// Top-level error
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum XEditError {
    /// A wrapper addressed a handle whose frame already released it.
    #[error("invalid use of released handle {handle}")]
    InvalidHandleUse { handle: Handle },

    #[error("native call failed: {0}")]
    NativeCall(NativeCallFailure),

    /// The requested path or field does not exist under the element.
    #[error("no element at '{path}' under {handle}")]
    SchemaMismatch { handle: Handle, path: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("failed to load library '{path}': {reason}")]
    Library { path: String, reason: String },

    #[error("native symbol '{0}' is not exported by the loaded library")]
    MissingSymbol(&'static str),

    /// Arguments handed to the bridge do not match the catalog entry.
    #[error("argument mismatch for {operation}: {detail}")]
    ArgumentMismatch {
        operation: &'static str,
        detail: String,
    },

    #[error("no enclosing frame to promote {handle} into")]
    NoEnclosingFrame { handle: Handle },

    #[error("no active scope to exit")]
    NoActiveScope,

    #[error("unknown {kind} code {code}")]
    UnknownEnumCode { kind: &'static str, code: u8 },

    #[error("invalid signature '{0}'")]
    InvalidSignature(String),

    #[error("failed to decode native result: {0}")]
    Decode(String),

    #[error("plugin loader failed: {0}")]
    Loader(String),

    #[error("engine worker thread is gone")]
    WorkerGone,
}

impl XEditError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        XEditError::InvariantViolation(msg.into())
    }

    pub fn schema(handle: Handle, path: impl Into<String>) -> Self {
        XEditError::SchemaMismatch {
            handle,
            path: path.into(),
        }
    }

    /// The engine-side failure, if this error came from a native call.
    pub fn native(&self) -> Option<&NativeCallFailure> {
        match self {
            XEditError::NativeCall(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<NativeCallFailure> for XEditError {
    fn from(failure: NativeCallFailure) -> Self {
        XEditError::NativeCall(failure)
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// A handle that could not be released when its frame was torn down.
///
/// Logged at `warn` level by the registry; never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("resource leak: {handle} in {frame} could not be released: {cause}")]
pub struct ResourceLeak {
    pub frame: FrameId,
    pub handle: Handle,
    pub cause: XEditError,
}
