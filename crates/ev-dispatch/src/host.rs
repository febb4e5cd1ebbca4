//! The interface between precompile environments and the call-dispatch path that hosts them.

use crate::{
    call_type::CallType,
    contract::CallerRef,
    error::{CallError, HeaderError},
    state::{StateDb, StateReader},
};
use alloy_consensus::Header;
use alloy_genesis::ChainConfig;
use alloy_primitives::{Address, Bytes, U256};
use revm::primitives::hardfork::SpecId;

/// Call depth and read-only state of one execution.
///
/// A single value is shared by the entire nested-call tree of a transaction. Frames don't copy
/// it; each frame restores it to the value it received before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Number of frames currently executing.
    pub depth: usize,
    /// Whether state mutation is forbidden. Once set, descendants cannot clear it.
    pub read_only: bool,
}

/// Activated rules of the block being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Chain identifier.
    pub chain_id: u64,
    /// Latest activated hardfork.
    pub spec: SpecId,
}

impl Rules {
    /// Creates the rules for `spec` on chain `chain_id`.
    pub const fn new(chain_id: u64, spec: SpecId) -> Self {
        Self { chain_id, spec }
    }

    /// Returns whether `fork` is active.
    pub fn is_active(&self, fork: SpecId) -> bool {
        self.spec.is_enabled_in(fork)
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::new(1, SpecId::default())
    }
}

/// Result of a call through [`Host::call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// Returned data, or the reason the call failed.
    pub result: Result<Bytes, CallError>,
    /// Gas left over for the caller.
    pub gas_left: u64,
}

impl CallOutcome {
    /// Creates a successful outcome.
    pub const fn success(output: Bytes, gas_left: u64) -> Self {
        Self { result: Ok(output), gas_left }
    }

    /// Creates a failed outcome.
    pub fn failure(err: impl Into<CallError>, gas_left: u64) -> Self {
        Self { result: Err(err.into()), gas_left }
    }

    /// Returns whether the call succeeded.
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a precompile environment needs from the engine executing it.
///
/// Implemented by [`Evm`](crate::Evm); alternative engines implement it to host stateful
/// precompiles on their own call path.
pub trait Host {
    /// Returns the chain configuration.
    fn chain_config(&self) -> &ChainConfig;

    /// Returns the activated rules.
    fn rules(&self) -> Rules;

    /// Returns read access to state.
    fn state(&self) -> &dyn StateReader;

    /// Returns write access to state. Callers are responsible for honouring
    /// [`CallContext::read_only`].
    fn state_mut(&mut self) -> &mut dyn StateDb;

    /// Returns the current call context.
    fn call_context(&self) -> CallContext;

    /// Returns the call context for modification.
    fn call_context_mut(&mut self) -> &mut CallContext;

    /// Returns the transaction origin.
    fn origin(&self) -> Address;

    /// Returns the header of the block being executed.
    fn block_header(&self) -> Result<Header, HeaderError>;

    /// Returns the number of the block being executed.
    fn block_number(&self) -> U256;

    /// Returns the timestamp of the block being executed.
    fn block_time(&self) -> u64;

    /// Marks the whole transaction as invalid.
    fn invalidate_execution(&mut self, reason: Box<dyn std::error::Error + Send + Sync + 'static>);

    /// Dispatches a call of the given type, exactly as the corresponding opcode would.
    ///
    /// `value` is ignored for call types that carry none.
    fn call(
        &mut self,
        call_type: CallType,
        caller: CallerRef<'_>,
        address: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome;
}
