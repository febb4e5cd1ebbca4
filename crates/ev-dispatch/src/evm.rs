//! The call-dispatch path: `CALL`, `CALLCODE`, `DELEGATECALL` and `STATICCALL` as the
//! interpreter issues them, with precompiled targets intercepted.
//!
//! Targets without a precompile are treated as code-less accounts; bytecode is executed by the
//! interpreter, which is not part of this crate.

use crate::{
    args::CallArgs,
    call_type::CallType,
    config::EvmConfig,
    contract::CallerRef,
    error::{ExecutionError, HeaderError, TransactError},
    host::{CallContext, CallOutcome, Host, Rules},
    precompile::{NoopHooks, Precompile, PrecompileHooks, PrecompileResult, PrecompileSet},
    state::{StateDb, StateReader},
};
use alloy_consensus::Header;
use alloy_genesis::ChainConfig;
use alloy_primitives::{Address, Bytes, U256};
use revm::context::BlockEnv;
use std::{fmt, sync::Arc};
use tracing::{debug, trace};

type InvalidationReason = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Executes calls against `DB`, dispatching precompiled targets.
pub struct Evm<DB> {
    db: DB,
    config: EvmConfig,
    chain_config: Arc<ChainConfig>,
    rules: Rules,
    block: BlockEnv,
    header: Option<Header>,
    origin: Address,
    context: CallContext,
    registered: PrecompileSet,
    hooks: Box<dyn PrecompileHooks + Send + Sync>,
    active: PrecompileSet,
    invalidation: Option<InvalidationReason>,
}

impl<DB: StateDb> Evm<DB> {
    /// Creates an EVM over `db` with every precompile in `precompiles` active.
    pub fn new(db: DB, precompiles: PrecompileSet) -> Self {
        let rules = Rules::default();
        let active = precompiles.activate(&rules, &NoopHooks);
        Self {
            db,
            config: EvmConfig::default(),
            chain_config: Arc::default(),
            rules,
            block: BlockEnv::default(),
            header: None,
            origin: Address::ZERO,
            context: CallContext::default(),
            registered: precompiles,
            hooks: Box::new(NoopHooks),
            active,
            invalidation: None,
        }
    }

    /// Sets the call-path configuration.
    pub const fn with_config(mut self, config: EvmConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the chain configuration.
    pub fn with_chain_config(mut self, chain_config: Arc<ChainConfig>) -> Self {
        self.chain_config = chain_config;
        self
    }

    /// Sets the activated rules, re-selecting the active precompiles.
    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self.activate_precompiles();
        self
    }

    /// Installs the hook selecting active precompiles.
    pub fn with_hooks(mut self, hooks: impl PrecompileHooks + Send + Sync + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self.activate_precompiles();
        self
    }

    /// Sets the block environment.
    pub fn with_block(mut self, block: BlockEnv) -> Self {
        self.block = block;
        self
    }

    /// Sets the header of the block being executed.
    pub fn with_header(mut self, header: Header) -> Self {
        self.header = Some(header);
        self
    }

    /// Returns the state.
    pub const fn db(&self) -> &DB {
        &self.db
    }

    /// Returns the state for modification.
    pub fn db_mut(&mut self) -> &mut DB {
        &mut self.db
    }

    /// Consumes the EVM, returning its state.
    pub fn into_db(self) -> DB {
        self.db
    }

    /// Returns the call-path configuration.
    pub const fn config(&self) -> &EvmConfig {
        &self.config
    }

    /// Returns the active precompiles.
    pub const fn precompiles(&self) -> &PrecompileSet {
        &self.active
    }

    /// Returns the current call depth and read-only state.
    pub const fn context(&self) -> CallContext {
        self.context
    }

    fn activate_precompiles(&mut self) {
        self.active = self.registered.activate(&self.rules, self.hooks.as_ref());
    }

    /// Executes a transaction-level call from `origin`.
    ///
    /// Returns [`TransactError::Invalidated`] if a precompile invalidated the execution,
    /// regardless of the call's own outcome.
    pub fn transact(
        &mut self,
        origin: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> Result<CallOutcome, TransactError> {
        self.origin = origin;
        self.context = CallContext::default();
        self.invalidation = None;

        let outcome = self.call(CallerRef::Account(origin), to, input, gas, value);

        match self.invalidation.take() {
            Some(reason) => Err(TransactError::Invalidated(reason)),
            None => Ok(outcome),
        }
    }

    /// `CALL`: executes `address` in its own context, transferring `value` to it.
    pub fn call(
        &mut self,
        caller: CallerRef<'_>,
        address: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        self.dispatch(CallType::Call, caller, address, input, gas, value)
    }

    /// `CALLCODE`: executes `address` in the caller's context with the given value.
    pub fn call_code(
        &mut self,
        caller: CallerRef<'_>,
        address: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        self.dispatch(CallType::CallCode, caller, address, input, gas, value)
    }

    /// `DELEGATECALL`: executes `address` in the calling frame's context, inheriting its caller
    /// and value.
    pub fn delegate_call(
        &mut self,
        caller: CallerRef<'_>,
        address: Address,
        input: &[u8],
        gas: u64,
    ) -> CallOutcome {
        self.dispatch(CallType::DelegateCall, caller, address, input, gas, U256::ZERO)
    }

    /// `STATICCALL`: as [`call`](Self::call) without value, with state read-only.
    pub fn static_call(
        &mut self,
        caller: CallerRef<'_>,
        address: Address,
        input: &[u8],
        gas: u64,
    ) -> CallOutcome {
        self.dispatch(CallType::StaticCall, caller, address, input, gas, U256::ZERO)
    }

    fn dispatch(
        &mut self,
        call_type: CallType,
        caller: CallerRef<'_>,
        address: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        if self.context.depth > self.config.max_call_depth {
            debug!(
                target: "ev_dispatch::evm",
                depth = self.context.depth,
                %address,
                %call_type,
                "Refusing call above max depth"
            );
            return CallOutcome::failure(ExecutionError::CallDepthExceeded, gas);
        }

        let value = if call_type.carries_value() { value } else { U256::ZERO };
        let from = caller.address();
        if !value.is_zero() && self.db.balance(from) < value {
            return CallOutcome::failure(ExecutionError::InsufficientBalance, gas);
        }

        trace!(
            target: "ev_dispatch::evm",
            %from,
            %address,
            %call_type,
            gas,
            depth = self.context.depth,
            "Dispatching call"
        );

        let snapshot = self.db.snapshot();
        let transferred = match call_type {
            CallType::Call => self.transfer(from, address, value),
            CallType::CallCode | CallType::DelegateCall | CallType::StaticCall => true,
        };

        let (result, mut gas_left) = if !transferred {
            (Err(ExecutionError::InsufficientBalance.into()), gas)
        } else if let Some(precompile) = self.active.get(&address).cloned() {
            self.run_precompile(&precompile, call_type, caller, address, input, gas, value)
        } else {
            (Ok(Bytes::new()), gas)
        };

        match &result {
            Ok(_) => self.db.commit_snapshot(snapshot),
            Err(err) => {
                self.db.revert_to_snapshot(snapshot);
                if !err.is_revert() {
                    gas_left = 0;
                }
            }
        }

        CallOutcome { result, gas_left }
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> bool {
        if value.is_zero() {
            return true;
        }
        self.db.sub_balance(from, value) && self.db.add_balance(to, value)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_precompile(
        &mut self,
        precompile: &Precompile,
        call_type: CallType,
        caller: CallerRef<'_>,
        address: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> (PrecompileResult, u64) {
        let Some(gas_remaining) = gas.checked_sub(precompile.required_gas(input)) else {
            return (Err(ExecutionError::OutOfGas.into()), 0);
        };

        let mut args = CallArgs {
            host: self,
            call_type,
            caller,
            address,
            input,
            gas_remaining,
            value,
        };
        let result = args.run(precompile);
        (result, args.gas_remaining)
    }
}

impl<DB: StateDb> Host for Evm<DB> {
    fn chain_config(&self) -> &ChainConfig {
        &self.chain_config
    }

    fn rules(&self) -> Rules {
        self.rules
    }

    fn state(&self) -> &dyn StateReader {
        &self.db
    }

    fn state_mut(&mut self) -> &mut dyn StateDb {
        &mut self.db
    }

    fn call_context(&self) -> CallContext {
        self.context
    }

    fn call_context_mut(&mut self) -> &mut CallContext {
        &mut self.context
    }

    fn origin(&self) -> Address {
        self.origin
    }

    fn block_header(&self) -> Result<Header, HeaderError> {
        self.header.clone().ok_or(HeaderError::Unavailable)
    }

    fn block_number(&self) -> U256 {
        U256::from(self.block.number)
    }

    fn block_time(&self) -> u64 {
        U256::from(self.block.timestamp).saturating_to()
    }

    fn invalidate_execution(&mut self, reason: InvalidationReason) {
        if self.invalidation.is_none() {
            self.invalidation = Some(reason);
        }
    }

    fn call(
        &mut self,
        call_type: CallType,
        caller: CallerRef<'_>,
        address: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        self.dispatch(call_type, caller, address, input, gas, value)
    }
}

impl<DB: fmt::Debug> fmt::Debug for Evm<DB> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evm")
            .field("db", &self.db)
            .field("config", &self.config)
            .field("rules", &self.rules)
            .field("origin", &self.origin)
            .field("context", &self.context)
            .field("active", &self.active)
            .field("invalidated", &self.invalidation.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::MemoryState, StatelessPrecompile};
    use alloy_primitives::address;

    const ALICE: Address = address!("0x00000000000000000000000000000000000000a1");
    const BOB: Address = address!("0x00000000000000000000000000000000000000b0");
    const ECHO: Address = address!("0x0000000000000000000000000000000000000004");

    struct Echo;

    impl StatelessPrecompile for Echo {
        fn required_gas(&self, input: &[u8]) -> u64 {
            100 + input.len() as u64
        }

        fn run(&self, input: &[u8]) -> PrecompileResult {
            Ok(Bytes::copy_from_slice(input))
        }
    }

    fn evm() -> Evm<MemoryState> {
        let mut state = MemoryState::new();
        state.set_balance(ALICE, U256::from(1_000));
        let mut precompiles = PrecompileSet::new();
        precompiles.insert_stateless(ECHO, Echo);
        Evm::new(state, precompiles)
    }

    #[test]
    fn call_transfers_value_to_plain_accounts() {
        let mut evm = evm();

        let outcome = evm.call(ALICE.into(), BOB, &[], 50_000, U256::from(300));

        assert_eq!(outcome, CallOutcome::success(Bytes::new(), 50_000));
        assert_eq!(evm.db().balance(ALICE), U256::from(700));
        assert_eq!(evm.db().balance(BOB), U256::from(300));
    }

    #[test]
    fn call_without_funds_keeps_gas_and_state() {
        let mut evm = evm();

        let outcome = evm.call(BOB.into(), ALICE, &[], 50_000, U256::from(1));

        assert_eq!(
            outcome,
            CallOutcome::failure(ExecutionError::InsufficientBalance, 50_000)
        );
        assert_eq!(evm.db().balance(ALICE), U256::from(1_000));
    }

    #[test]
    fn stateless_precompiles_charge_required_gas_upfront() {
        let mut evm = evm();

        let outcome = evm.static_call(ALICE.into(), ECHO, b"ping", 1_000);
        assert_eq!(outcome, CallOutcome::success(Bytes::from_static(b"ping"), 896));
        assert_eq!(evm.context(), CallContext::default());

        let outcome = evm.static_call(ALICE.into(), ECHO, b"ping", 103);
        assert_eq!(outcome, CallOutcome::failure(ExecutionError::OutOfGas, 0));
    }

    #[test]
    fn calls_above_max_depth_are_refused() {
        let mut evm = evm().with_config(EvmConfig::new(0));
        evm.call_context_mut().depth = 1;

        let outcome = evm.call(ALICE.into(), ECHO, b"x", 1_000, U256::ZERO);

        assert_eq!(
            outcome,
            CallOutcome::failure(ExecutionError::CallDepthExceeded, 1_000)
        );
    }

    #[test]
    fn header_lookup_fails_without_header() {
        let evm = evm();
        assert_eq!(evm.block_header(), Err(HeaderError::Unavailable));

        let evm = evm.with_header(Header { number: 7, ..Default::default() });
        assert_eq!(evm.block_header().map(|header| header.number), Ok(7));
    }
}
