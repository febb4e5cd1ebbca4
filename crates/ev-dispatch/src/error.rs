//! Errors surfaced by the call-dispatch path.

use alloy_primitives::Bytes;
use thiserror::Error;

/// Errors that precompile logic and nested calls can run into.
///
/// These are ordinary runtime outcomes which untrusted contract input can trigger. They are
/// propagated unchanged to the caller and never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Not enough gas remained to complete the operation.
    #[error("out of gas")]
    OutOfGas,
    /// A state mutation was attempted in a read-only context.
    #[error("write protection")]
    WriteProtection,
    /// The maximum call depth was exceeded.
    #[error("max call depth exceeded")]
    CallDepthExceeded,
    /// The caller cannot cover the value of the call.
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    /// Execution reverted with the given data; remaining gas is returned.
    #[error("execution reverted")]
    Reverted(Bytes),
    /// The current block header could not be retrieved.
    #[error(transparent)]
    Header(#[from] HeaderError),
    /// Precompile-specific failure.
    #[error("{0}")]
    Other(String),
}

impl ExecutionError {
    /// Returns whether the error returns unused gas to the caller.
    pub const fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted(_))
    }
}

/// Failure to retrieve the current block header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// The host has no header for the block being executed.
    #[error("block header unavailable")]
    Unavailable,
}

/// Defects in the dispatch layer itself.
///
/// Reaching any of these means the dispatcher was bypassed or fed a state it can never
/// construct. Callers above the dispatch boundary must not attempt to recover from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchBug {
    /// A stateful precompile was invoked through the stateless entry point.
    #[error("BUG: call to stateless entry point of a stateful precompile; MUST dispatch through the environment")]
    StatefulViaStatelessEntry,
    /// A `DELEGATECALL` was resolved without a calling frame to inherit from.
    #[error("BUG: DELEGATECALL resolved without a caller frame")]
    DelegateWithoutFrame,
}

/// The error type of every call through the dispatch path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// A runtime failure; see [`ExecutionError`].
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// An internal defect; see [`DispatchBug`].
    #[error(transparent)]
    Fatal(#[from] DispatchBug),
}

impl CallError {
    /// Returns whether the error signals a dispatch-layer defect.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Returns whether the error returns unused gas to the caller.
    pub const fn is_revert(&self) -> bool {
        matches!(self, Self::Execution(err) if err.is_revert())
    }

    /// Returns the execution error, if this is not a fatal error.
    pub const fn as_execution(&self) -> Option<&ExecutionError> {
        match self {
            Self::Execution(err) => Some(err),
            Self::Fatal(_) => None,
        }
    }
}

impl From<HeaderError> for CallError {
    fn from(err: HeaderError) -> Self {
        Self::Execution(err.into())
    }
}

/// Errors observable by the caller of a whole transaction.
#[derive(Debug, Error)]
pub enum TransactError {
    /// A precompile invalidated the transaction, overriding the outcome of the call.
    #[error("execution invalidated: {0}")]
    Invalidated(Box<dyn std::error::Error + Send + Sync + 'static>),
}
