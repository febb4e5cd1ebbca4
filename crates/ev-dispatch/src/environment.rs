//! The view of the executing engine handed to stateful precompiles.

use crate::{
    call_type::CallType,
    contract::{CallerRef, Contract},
    error::{ExecutionError, HeaderError},
    host::{Host, Rules},
    precompile::PrecompileResult,
    state::{StateDb, StateReader},
};
use alloy_consensus::Header;
use alloy_genesis::ChainConfig;
use alloy_primitives::{Address, U256};
use tracing::warn;

/// A caller/callee pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerAndSelf {
    /// The calling account.
    pub caller: Address,
    /// The called account.
    pub this: Address,
}

/// The addresses involved in a precompile call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressContext {
    /// The transaction origin, equivalent to the `ORIGIN` opcode.
    pub origin: Address,
    /// Caller and self as bytecode would observe them via `CALLER` and `ADDRESS`. These differ
    /// from the raw addresses under `CALLCODE` and `DELEGATECALL`.
    pub evm_semantic: CallerAndSelf,
    /// Caller and callee as passed to the call, i.e. the precompile's own address as `this`.
    pub raw: CallerAndSelf,
}

/// Options for [`PrecompileEnvironment::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOption {
    /// Makes the outbound call with the precompile's caller, instead of the precompile itself,
    /// as the caller.
    ///
    /// This lets the precompile act on behalf of whoever called it, which is unsafe unless the
    /// precompile has authorised the callee for exactly that.
    UnsafeCallerAddressProxying,
}

/// Information about the context in which a stateful precompile runs, and the means of calling
/// other contracts.
pub struct PrecompileEnvironment<'a> {
    pub(crate) host: &'a mut dyn Host,
    pub(crate) contract: Contract,
    pub(crate) call_type: CallType,
    pub(crate) raw_caller: Address,
    pub(crate) raw_self: Address,
}

impl PrecompileEnvironment<'_> {
    /// Returns the chain configuration.
    pub fn chain_config(&self) -> &ChainConfig {
        self.host.chain_config()
    }

    /// Returns the activated rules.
    pub fn rules(&self) -> Rules {
        self.host.rules()
    }

    /// Returns write access to state, `None` iff [`read_only`](Self::read_only).
    pub fn state_db(&mut self) -> Option<&mut dyn StateDb> {
        if self.read_only() {
            return None;
        }
        Some(self.host.state_mut())
    }

    /// Returns read access to state. Always available.
    pub fn read_only_state(&self) -> &dyn StateReader {
        self.host.state()
    }

    /// Returns the type of the call that invoked the precompile.
    pub const fn incoming_call_type(&self) -> CallType {
        self.call_type
    }

    /// Returns the addresses involved in the call.
    pub fn addresses(&self) -> AddressContext {
        AddressContext {
            origin: self.host.origin(),
            evm_semantic: CallerAndSelf {
                caller: self.contract.caller,
                this: self.contract.address,
            },
            raw: CallerAndSelf {
                caller: self.raw_caller,
                this: self.raw_self,
            },
        }
    }

    /// Returns the synthesized identity the precompile executes as.
    pub const fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Returns whether state is read-only, including read-only state inherited from an
    /// enclosing static call.
    pub fn read_only(&self) -> bool {
        self.host.call_context().read_only
    }

    /// Returns the gas still available to the precompile.
    pub const fn gas(&self) -> u64 {
        self.contract.gas
    }

    /// Consumes `amount` gas. Returns `false`, consuming nothing, if not enough gas remains; the
    /// precompile should then fail with [`ExecutionError::OutOfGas`].
    pub fn use_gas(&mut self, amount: u64) -> bool {
        self.contract.use_gas(amount)
    }

    /// Returns the value attached to the call.
    pub const fn value(&self) -> U256 {
        self.contract.value
    }

    /// Returns the header of the current block.
    pub fn block_header(&self) -> Result<Header, HeaderError> {
        self.host.block_header()
    }

    /// Returns the number of the current block.
    pub fn block_number(&self) -> U256 {
        self.host.block_number()
    }

    /// Returns the timestamp of the current block.
    pub fn block_time(&self) -> u64 {
        self.host.block_time()
    }

    /// Invalidates the transaction calling this precompile.
    ///
    /// This is stronger than returning an error: the outcome of the entire transaction is
    /// overridden, not only this call.
    pub fn invalidate_execution(
        &mut self,
        reason: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) {
        let reason = reason.into();
        warn!(
            target: "ev_dispatch::environment",
            precompile = %self.raw_self,
            %reason,
            "Precompile invalidated execution"
        );
        self.host.invalidate_execution(reason);
    }

    /// Calls `address` with the precompile's identity as the caller, equivalent to `CALL`.
    ///
    /// `gas` is deducted from the precompile before the call and whatever the callee leaves
    /// over is refunded afterwards.
    ///
    /// WARNING: this makes the precompile susceptible to reentrancy exactly like a regular
    /// contract. Checks-Effects-Interactions or an equivalent guard MUST be applied by the
    /// precompile; the environment applies none.
    pub fn call(
        &mut self,
        address: Address,
        input: &[u8],
        gas: u64,
        value: U256,
        options: &[CallOption],
    ) -> PrecompileResult {
        if self.read_only() && !value.is_zero() {
            return Err(ExecutionError::WriteProtection.into());
        }
        if !self.use_gas(gas) {
            return Err(ExecutionError::OutOfGas.into());
        }

        let proxy = options.contains(&CallOption::UnsafeCallerAddressProxying);
        let caller = if proxy {
            match self.call_type {
                CallType::DelegateCall => CallerRef::Account(self.raw_caller),
                CallType::Call | CallType::CallCode | CallType::StaticCall => {
                    CallerRef::Account(self.contract.caller)
                }
            }
        } else {
            CallerRef::Contract(&self.contract)
        };

        let outcome = self.host.call(CallType::Call, caller, address, input, gas, value);
        self.contract.gas = self.contract.gas.saturating_add(outcome.gas_left);
        outcome.result
    }
}

impl std::fmt::Debug for PrecompileEnvironment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecompileEnvironment")
            .field("contract", &self.contract)
            .field("call_type", &self.call_type)
            .field("raw_caller", &self.raw_caller)
            .field("raw_self", &self.raw_self)
            .finish_non_exhaustive()
    }
}
