//! Token Duality Precompile
//!
//! Enables native tokens to be used as ERC-20 compatible tokens without wrapping.
//! Based on the Celo token duality pattern, adapted for the Evolve ecosystem.
//!
//! ## Overview
//!
//! This precompile allows smart contracts to interact with native tokens using
//! familiar ERC-20 patterns. The key function is `transfer(from, to, amount)`
//! which directly manipulates native balances.
//!
//! **This precompile is NOT a full ERC-20 implementation.** An ERC-20 wrapper contract
//! calls it for `transfer()` and `transferFrom()` and provides the views and events itself.
//!
//! ## Address
//!
//! The precompile is deployed at address `0x00..00FD` (253).
//!
//! ## Interface
//!
//! ```solidity
//! interface ITokenDuality {
//!     function transfer(address from, address to, uint256 amount) external;
//!     function addToAllowList(address account) external;
//!     function removeFromAllowList(address account) external;
//!     function allowlist(address account) external view returns (bool);
//!     function transferredThisBlock() external view returns (uint256);
//!     function perCallCap() external view returns (uint256);
//!     function perBlockCap() external view returns (uint256);
//! }
//! ```
//!
//! Only the admin or allowlisted callers may transfer, and only the admin manages the
//! allowlist. The caller is the one bytecode would observe, so a `DELEGATECALL` from a
//! wrapper is authorized as the wrapper's own caller.
//!
//! ## Storage Layout
//!
//! The precompile uses the following storage slots in its account (`0x..FD`):
//!
//! | Slot | Description |
//! |------|-------------|
//! | `U256(address)` | Allowlist entry (1 = allowed, 0 = not allowed) |
//! | `0xff..ff` | Block number of the transfer counter |
//! | `0xff..fe` | Amount transferred in that block |
//!
//! Addresses only occupy the lower 20 bytes of a word, so allowlist entries never collide
//! with the counter slots. Being regular state, the counter is reverted together with a
//! failed call.
//!
//! ## Gas Costs
//!
//! | Operation | Gas |
//! |-----------|-----|
//! | `transfer` | [`GAS_TRANSFER_ESTIMATE`] |
//! | allowlist updates | [`GAS_BASE`] + [`GAS_SSTORE_COLD`] |
//! | views | [`GAS_ALLOWLIST_CHECK`] |
//!
//! ## References
//!
//! - [Celo Token Duality Specification](https://specs.celo.org/token_duality.html)
//! - [ERC-20 Token Standard](https://eips.ethereum.org/EIPS/eip-20)

use alloy_primitives::{address, b256, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolInterface, SolValue};
use ev_dispatch::{
    CallError, ExecutionError, PrecompileEnvironment, PrecompileResult, StateDb, StateReader,
    StatefulPrecompile,
};

sol! {
    /// Token Duality interface for native token as ERC-20
    interface ITokenDuality {
        /// Transfer native tokens between addresses
        function transfer(address from, address to, uint256 amount) external;

        /// Add an address to the authorized callers list
        function addToAllowList(address account) external;

        /// Remove an address from the authorized callers list
        function removeFromAllowList(address account) external;

        /// Check if an address is in the allowlist
        function allowlist(address account) external view returns (bool);

        /// Get total amount transferred in current block
        function transferredThisBlock() external view returns (uint256);

        /// Get the per-call transfer cap
        function perCallCap() external view returns (uint256);

        /// Get the per-block transfer cap
        function perBlockCap() external view returns (uint256);
    }
}

/// Token Duality Precompile Address: 0x00..fd (253)
pub const TOKEN_DUALITY_PRECOMPILE_ADDR: Address =
    address!("0x00000000000000000000000000000000000000fd");

/// Base gas cost for token duality operations (Celo-compatible).
pub const GAS_BASE: u64 = 9_000;

/// Gas cost per storage read (SLOAD, cold).
pub const GAS_SLOAD: u64 = 2_100;

/// Gas cost per storage write (SSTORE, cold).
pub const GAS_SSTORE_COLD: u64 = 20_000;

/// Gas for a transfer operation (base + 2 balance updates).
pub const GAS_TRANSFER_ESTIMATE: u64 = GAS_BASE + (2 * GAS_SSTORE_COLD);

/// Gas for an allowlist check or any other view.
pub const GAS_ALLOWLIST_CHECK: u64 = GAS_BASE + GAS_SLOAD;

/// Default per-call cap: 1 million tokens (with 18 decimals)
const DEFAULT_PER_CALL_CAP: u128 = 1_000_000;

/// Default per-block cap: 10 million tokens (with 18 decimals)
const DEFAULT_PER_BLOCK_CAP: u128 = 10_000_000;

const TRACKER_BLOCK_SLOT: B256 =
    b256!("0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff");
const TRACKER_TOTAL_SLOT: B256 =
    b256!("0xfffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe");

/// Multiplier for token decimals (10^18)
fn decimals_multiplier() -> U256 {
    U256::from(10u64).pow(U256::from(18))
}

/// Configuration for the Token Duality Precompile
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenDualityConfig {
    /// Admin address that can manage the allowlist
    pub admin: Address,
    /// Maximum amount per single transfer (None = unlimited)
    pub per_call_cap: Option<U256>,
    /// Maximum total amount per block (None = unlimited)
    pub per_block_cap: Option<U256>,
}

impl Default for TokenDualityConfig {
    /// Default configuration for testing only.
    ///
    /// Uses `Address::ZERO` as admin, which is NOT production-ready; see
    /// [`TokenDualityConfig::is_production_ready`]. The caps are 1 million tokens per call and
    /// 10 million tokens per block.
    fn default() -> Self {
        Self {
            admin: Address::ZERO,
            per_call_cap: Some(U256::from(DEFAULT_PER_CALL_CAP) * decimals_multiplier()),
            per_block_cap: Some(U256::from(DEFAULT_PER_BLOCK_CAP) * decimals_multiplier()),
        }
    }
}

impl TokenDualityConfig {
    /// Create config with only admin (no caps)
    pub fn with_admin(admin: Address) -> eyre::Result<Self> {
        Self::new(admin, None, None)
    }

    /// Create config with admin and caps.
    ///
    /// Fails if admin is the zero address or `per_call_cap` exceeds `per_block_cap`.
    pub fn new(
        admin: Address,
        per_call_cap: Option<U256>,
        per_block_cap: Option<U256>,
    ) -> eyre::Result<Self> {
        eyre::ensure!(!admin.is_zero(), "token duality admin cannot be zero address");

        if let (Some(call_cap), Some(block_cap)) = (per_call_cap, per_block_cap) {
            eyre::ensure!(
                call_cap <= block_cap,
                "per_call_cap ({call_cap}) cannot exceed per_block_cap ({block_cap})"
            );
        }

        Ok(Self {
            admin,
            per_call_cap,
            per_block_cap,
        })
    }

    /// Check if the configuration is valid for production use
    pub fn is_production_ready(&self) -> bool {
        !self.admin.is_zero()
    }
}

/// Token Duality Precompile
///
/// Enables native tokens to function as ERC-20 compatible tokens.
#[derive(Clone, Debug, Default)]
pub struct TokenDualityPrecompile {
    config: TokenDualityConfig,
}

impl TokenDualityPrecompile {
    /// Create new precompile with configuration
    pub const fn new(config: TokenDualityConfig) -> Self {
        Self { config }
    }

    /// Get the admin address
    pub const fn admin(&self) -> Address {
        self.config.admin
    }

    /// Get the per-call cap
    pub const fn per_call_cap(&self) -> Option<U256> {
        self.config.per_call_cap
    }

    /// Get the per-block cap
    pub const fn per_block_cap(&self) -> Option<U256> {
        self.config.per_block_cap
    }

    fn other(msg: impl Into<String>) -> CallError {
        ExecutionError::Other(msg.into()).into()
    }

    fn charge(env: &mut PrecompileEnvironment<'_>, gas: u64) -> Result<(), CallError> {
        if env.use_gas(gas) {
            Ok(())
        } else {
            Err(ExecutionError::OutOfGas.into())
        }
    }

    fn writable<'e>(
        env: &'e mut PrecompileEnvironment<'_>,
    ) -> Result<&'e mut dyn StateDb, CallError> {
        env.state_db().ok_or_else(|| ExecutionError::WriteProtection.into())
    }

    // === Authorization ===

    fn ensure_admin(&self, caller: Address) -> Result<(), CallError> {
        if caller == self.config.admin {
            Ok(())
        } else {
            Err(Self::other("unauthorized caller"))
        }
    }

    fn ensure_authorized<S: StateReader + ?Sized>(
        &self,
        state: &S,
        caller: Address,
    ) -> Result<(), CallError> {
        if caller == self.config.admin {
            tracing::debug!(target: "token_duality", ?caller, "authorization granted: admin");
            return Ok(());
        }

        if Self::is_allowlisted(state, caller) {
            tracing::debug!(target: "token_duality", ?caller, "authorization granted: allowlist");
            Ok(())
        } else {
            tracing::warn!(target: "token_duality", ?caller, "authorization denied");
            Err(Self::other("unauthorized caller"))
        }
    }

    // === Allowlist Storage ===

    fn is_allowlisted<S: StateReader + ?Sized>(state: &S, addr: Address) -> bool {
        let key = Self::allowlist_key(addr);
        let value = state.storage(TOKEN_DUALITY_PRECOMPILE_ADDR, key);
        let allowlisted = !value.is_zero();
        tracing::debug!(
            target: "token_duality",
            ?addr,
            slot = %key,
            value = %value,
            allowlisted,
            "allowlist lookup"
        );
        allowlisted
    }

    fn set_allowlisted(state: &mut dyn StateDb, addr: Address, allowed: bool) {
        let value = if allowed { B256::with_last_byte(1) } else { B256::ZERO };
        state.create_account(TOKEN_DUALITY_PRECOMPILE_ADDR);
        state.set_storage(TOKEN_DUALITY_PRECOMPILE_ADDR, Self::allowlist_key(addr), value);
    }

    /// Converts an address to a storage key for the allowlist: the address's 32-byte word
    /// representation, zero-padded on the left.
    fn allowlist_key(addr: Address) -> B256 {
        addr.into_word()
    }

    // === Rate Limiting ===

    fn transferred_in<S: StateReader + ?Sized>(state: &S, block_number: U256) -> U256 {
        let tracked_block = state.storage(TOKEN_DUALITY_PRECOMPILE_ADDR, TRACKER_BLOCK_SLOT);
        if U256::from_be_bytes(tracked_block.0) != block_number {
            return U256::ZERO;
        }
        U256::from_be_bytes(state.storage(TOKEN_DUALITY_PRECOMPILE_ADDR, TRACKER_TOTAL_SLOT).0)
    }

    fn validate_and_track_transfer(
        &self,
        state: &mut dyn StateDb,
        amount: U256,
        block_number: U256,
    ) -> Result<(), CallError> {
        if let Some(cap) = self.config.per_call_cap {
            if amount > cap {
                return Err(Self::other(format!(
                    "transfer exceeds per-call cap: {amount} > {cap}"
                )));
            }
        }

        if let Some(cap) = self.config.per_block_cap {
            let new_total = Self::transferred_in(&*state, block_number)
                .checked_add(amount)
                .ok_or_else(|| Self::other("transfer tracking overflow"))?;

            if new_total > cap {
                return Err(Self::other(format!(
                    "transfer exceeds per-block cap: {new_total} > {cap}"
                )));
            }

            state.create_account(TOKEN_DUALITY_PRECOMPILE_ADDR);
            state.set_storage(
                TOKEN_DUALITY_PRECOMPILE_ADDR,
                TRACKER_BLOCK_SLOT,
                block_number.into(),
            );
            state.set_storage(TOKEN_DUALITY_PRECOMPILE_ADDR, TRACKER_TOTAL_SLOT, new_total.into());
        }

        Ok(())
    }

    // === Transfer Execution ===

    /// Execute a native token transfer.
    ///
    /// Validation order: non-zero recipient, zero amounts and self-transfers skipped, rate
    /// limits, then the balance updates. A failing step leaves state to be reverted with the
    /// call.
    fn execute_transfer(
        &self,
        state: &mut dyn StateDb,
        from: Address,
        to: Address,
        amount: U256,
        block_number: U256,
    ) -> Result<(), CallError> {
        if to.is_zero() {
            return Err(Self::other("cannot transfer to zero address"));
        }

        if amount.is_zero() {
            return Ok(());
        }

        if from == to {
            tracing::debug!(target: "token_duality", ?from, "skipping self-transfer");
            return Ok(());
        }

        self.validate_and_track_transfer(state, amount, block_number)?;

        tracing::info!(
            target: "token_duality",
            ?from,
            ?to,
            %amount,
            %block_number,
            "executing transfer"
        );

        state.create_account(from);
        state.create_account(to);
        if !state.sub_balance(from, amount) {
            return Err(Self::other("insufficient balance"));
        }
        if !state.add_balance(to, amount) {
            return Err(Self::other("balance overflow"));
        }

        tracing::info!(target: "token_duality", "transfer successful");
        Ok(())
    }
}

impl StatefulPrecompile for TokenDualityPrecompile {
    fn run(&self, env: &mut PrecompileEnvironment<'_>, input: &[u8]) -> PrecompileResult {
        let caller = env.addresses().evm_semantic.caller;

        tracing::info!(
            target: "token_duality",
            ?caller,
            gas = env.gas(),
            calldata_len = input.len(),
            "precompile call invoked"
        );

        let decoded = ITokenDuality::ITokenDualityCalls::abi_decode(input)
            .map_err(|e| Self::other(e.to_string()))?;

        let block_number = env.block_number();

        match decoded {
            ITokenDuality::ITokenDualityCalls::transfer(call) => {
                Self::charge(env, GAS_TRANSFER_ESTIMATE)?;
                self.ensure_authorized(env.read_only_state(), caller)?;
                let state = Self::writable(env)?;
                self.execute_transfer(state, call.from, call.to, call.amount, block_number)?;
                Ok(Bytes::new())
            }
            ITokenDuality::ITokenDualityCalls::addToAllowList(call) => {
                Self::charge(env, GAS_BASE + GAS_SSTORE_COLD)?;
                self.ensure_admin(caller)?;
                Self::set_allowlisted(Self::writable(env)?, call.account, true);
                tracing::info!(target: "token_duality", account = ?call.account, "added to allowlist");
                Ok(Bytes::new())
            }
            ITokenDuality::ITokenDualityCalls::removeFromAllowList(call) => {
                Self::charge(env, GAS_BASE + GAS_SSTORE_COLD)?;
                self.ensure_admin(caller)?;
                Self::set_allowlisted(Self::writable(env)?, call.account, false);
                tracing::info!(target: "token_duality", account = ?call.account, "removed from allowlist");
                Ok(Bytes::new())
            }
            ITokenDuality::ITokenDualityCalls::allowlist(call) => {
                Self::charge(env, GAS_ALLOWLIST_CHECK)?;
                let is_allowed = Self::is_allowlisted(env.read_only_state(), call.account);
                Ok(is_allowed.abi_encode().into())
            }
            ITokenDuality::ITokenDualityCalls::transferredThisBlock(_) => {
                Self::charge(env, GAS_ALLOWLIST_CHECK)?;
                let transferred = Self::transferred_in(env.read_only_state(), block_number);
                Ok(transferred.abi_encode().into())
            }
            ITokenDuality::ITokenDualityCalls::perCallCap(_) => {
                Self::charge(env, GAS_ALLOWLIST_CHECK)?;
                let cap = self.config.per_call_cap.unwrap_or(U256::MAX);
                Ok(cap.abi_encode().into())
            }
            ITokenDuality::ITokenDualityCalls::perBlockCap(_) => {
                Self::charge(env, GAS_ALLOWLIST_CHECK)?;
                let cap = self.config.per_block_cap.unwrap_or(U256::MAX);
                Ok(cap.abi_encode().into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;
    use ev_dispatch::{CallOutcome, Evm, MemoryState, PrecompileSet};
    use revm::context::BlockEnv;

    const GAS_LIMIT: u64 = 1_000_000;

    fn setup_evm(config: TokenDualityConfig) -> Evm<MemoryState> {
        let mut precompiles = PrecompileSet::new();
        precompiles.insert_stateful(
            TOKEN_DUALITY_PRECOMPILE_ADDR,
            TokenDualityPrecompile::new(config),
        );
        Evm::new(MemoryState::new(), precompiles)
    }

    fn admin_config(admin: Address) -> TokenDualityConfig {
        TokenDualityConfig::with_admin(admin).expect("valid admin")
    }

    fn at_block(evm: Evm<MemoryState>, number: u64) -> Evm<MemoryState> {
        evm.with_block(BlockEnv {
            number: U256::from(number),
            ..Default::default()
        })
    }

    fn run_call(evm: &mut Evm<MemoryState>, caller: Address, data: &[u8]) -> CallOutcome {
        evm.call(
            caller.into(),
            TOKEN_DUALITY_PRECOMPILE_ADDR,
            data,
            GAS_LIMIT,
            U256::ZERO,
        )
    }

    fn expect_other(outcome: CallOutcome) -> String {
        match outcome.result {
            Err(CallError::Execution(ExecutionError::Other(msg))) => msg,
            other => panic!("expected precompile error, got {other:?}"),
        }
    }

    fn transfer_calldata(from: Address, to: Address, amount: U256) -> Vec<u8> {
        ITokenDuality::transferCall { from, to, amount }.abi_encode()
    }

    #[test]
    fn transfer_moves_balance() {
        let admin = address!("0x00000000000000000000000000000000000000a1");
        let sender = address!("0x00000000000000000000000000000000000000b1");
        let recipient = address!("0x00000000000000000000000000000000000000c1");
        let amount = U256::from(1000u64);
        let initial_balance = U256::from(5000u64);

        let mut evm = setup_evm(admin_config(admin));
        evm.db_mut().set_balance(sender, initial_balance);

        let outcome = run_call(&mut evm, admin, &transfer_calldata(sender, recipient, amount));

        assert!(outcome.is_success(), "transfer should succeed: {outcome:?}");
        assert_eq!(outcome.gas_left, GAS_LIMIT - GAS_TRANSFER_ESTIMATE);
        assert_eq!(
            evm.db().balance(sender),
            initial_balance - amount,
            "sender balance should decrease"
        );
        assert_eq!(evm.db().balance(recipient), amount, "recipient should receive amount");
    }

    #[test]
    fn unauthorized_caller_is_denied() {
        let admin = address!("0x00000000000000000000000000000000000000a2");
        let unauthorized = address!("0x00000000000000000000000000000000000000ff");
        let sender = address!("0x00000000000000000000000000000000000000b2");
        let recipient = address!("0x00000000000000000000000000000000000000c2");

        let mut evm = setup_evm(admin_config(admin));
        evm.db_mut().set_balance(sender, U256::from(1000u64));

        let calldata = transfer_calldata(sender, recipient, U256::from(100u64));
        let msg = expect_other(run_call(&mut evm, unauthorized, &calldata));

        assert_eq!(msg, "unauthorized caller", "expected unauthorized error");
        assert_eq!(evm.db().balance(sender), U256::from(1000u64));
    }

    #[test]
    fn allowlist_grants_and_revokes_access() {
        let admin = address!("0x00000000000000000000000000000000000000a3");
        let operator = address!("0x00000000000000000000000000000000000000b3");
        let sender = address!("0x00000000000000000000000000000000000000c3");
        let recipient = address!("0x00000000000000000000000000000000000000d3");
        let amount = U256::from(500u64);

        let mut evm = setup_evm(admin_config(admin));
        evm.db_mut().set_balance(sender, U256::from(1000u64));

        let add_calldata = ITokenDuality::addToAllowListCall { account: operator }.abi_encode();
        assert!(run_call(&mut evm, admin, &add_calldata).is_success());

        let transfer = transfer_calldata(sender, recipient, amount);
        assert!(
            run_call(&mut evm, operator, &transfer).is_success(),
            "allowlisted operator should transfer"
        );
        assert_eq!(evm.db().balance(recipient), amount, "recipient receives amount");

        let remove_calldata =
            ITokenDuality::removeFromAllowListCall { account: operator }.abi_encode();
        assert!(run_call(&mut evm, admin, &remove_calldata).is_success());

        let msg = expect_other(run_call(&mut evm, operator, &transfer));
        assert_eq!(msg, "unauthorized caller", "revoked access should deny");
    }

    #[test]
    fn non_admin_cannot_modify_allowlist() {
        let admin = address!("0x00000000000000000000000000000000000000a5");
        let unauthorized = address!("0x00000000000000000000000000000000000000f5");
        let target = address!("0x00000000000000000000000000000000000000b5");

        let mut evm = setup_evm(admin_config(admin));

        let calldata = ITokenDuality::addToAllowListCall { account: target }.abi_encode();
        let msg = expect_other(run_call(&mut evm, unauthorized, &calldata));

        assert_eq!(msg, "unauthorized caller", "non-admin must not modify allowlist");
    }

    #[test]
    fn insufficient_balance_is_rejected() {
        let admin = address!("0x00000000000000000000000000000000000000a6");
        let sender = address!("0x00000000000000000000000000000000000000b6");
        let recipient = address!("0x00000000000000000000000000000000000000c6");

        let mut evm = setup_evm(admin_config(admin));
        evm.db_mut().set_balance(sender, U256::from(10u64));

        let calldata = transfer_calldata(sender, recipient, U256::from(11u64));
        let msg = expect_other(run_call(&mut evm, admin, &calldata));

        assert_eq!(msg, "insufficient balance");
        assert_eq!(evm.db().balance(sender), U256::from(10u64));
        assert_eq!(evm.db().balance(recipient), U256::ZERO);
    }

    #[test]
    fn transfer_to_zero_address_is_rejected() {
        let admin = address!("0x00000000000000000000000000000000000000a7");
        let sender = address!("0x00000000000000000000000000000000000000b7");

        let mut evm = setup_evm(admin_config(admin));
        evm.db_mut().set_balance(sender, U256::from(1000u64));

        let calldata = transfer_calldata(sender, Address::ZERO, U256::from(1u64));
        let msg = expect_other(run_call(&mut evm, admin, &calldata));

        assert_eq!(msg, "cannot transfer to zero address");
    }

    #[test]
    fn per_call_cap_is_enforced() {
        let admin = address!("0x00000000000000000000000000000000000000a8");
        let sender = address!("0x00000000000000000000000000000000000000b8");
        let recipient = address!("0x00000000000000000000000000000000000000c8");

        let config = TokenDualityConfig::new(admin, Some(U256::from(100u64)), None)
            .expect("valid config");
        let mut evm = setup_evm(config);
        evm.db_mut().set_balance(sender, U256::from(1000u64));

        let within = transfer_calldata(sender, recipient, U256::from(100u64));
        assert!(run_call(&mut evm, admin, &within).is_success());

        let above = transfer_calldata(sender, recipient, U256::from(101u64));
        let msg = expect_other(run_call(&mut evm, admin, &above));
        assert!(msg.contains("per-call cap"), "{msg}");
    }

    #[test]
    fn per_block_cap_resets_on_new_block() {
        let admin = address!("0x00000000000000000000000000000000000000b0");
        let sender = address!("0x00000000000000000000000000000000000000c0");
        let recipient = address!("0x00000000000000000000000000000000000000d0");
        let block_cap = U256::from(1000u64);
        let amount = U256::from(600u64);

        let config = TokenDualityConfig::new(admin, None, Some(block_cap)).expect("valid config");
        let mut evm = setup_evm(config);
        evm.db_mut().set_balance(sender, U256::from(100_000u64));
        let calldata = transfer_calldata(sender, recipient, amount);

        // Block 0: the second transfer would exceed the cap (600 + 600 > 1000)
        assert!(run_call(&mut evm, admin, &calldata).is_success());
        let msg = expect_other(run_call(&mut evm, admin, &calldata));
        assert!(msg.contains("per-block cap"), "{msg}");

        // Block 1: the cap resets
        let mut evm = at_block(evm, 1);
        assert!(
            run_call(&mut evm, admin, &calldata).is_success(),
            "transfer in new block should succeed"
        );
        assert!(
            !run_call(&mut evm, admin, &calldata).is_success(),
            "should hit cap again in block 1"
        );
        assert_eq!(evm.db().balance(recipient), amount * U256::from(2));
    }

    #[test]
    fn transferred_this_block_tracks_correctly() {
        let admin = address!("0x00000000000000000000000000000000000000b1");
        let sender = address!("0x00000000000000000000000000000000000000c1");
        let recipient = address!("0x00000000000000000000000000000000000000d1");
        let amount = U256::from(500u64);

        let config =
            TokenDualityConfig::new(admin, None, Some(U256::from(10_000u64))).expect("valid config");
        let mut evm = at_block(setup_evm(config), 5);
        evm.db_mut().set_balance(sender, U256::from(10_000u64));

        let query = ITokenDuality::transferredThisBlockCall {}.abi_encode();
        let transferred = |evm: &mut Evm<MemoryState>| {
            let output = run_call(evm, admin, &query).result.expect("query should succeed");
            U256::abi_decode(&output).expect("decode result")
        };

        assert_eq!(transferred(&mut evm), U256::ZERO, "should start at zero");

        assert!(run_call(&mut evm, admin, &transfer_calldata(sender, recipient, amount)).is_success());
        assert_eq!(transferred(&mut evm), amount, "should track transferred amount");

        let mut evm = at_block(evm, 6);
        assert_eq!(transferred(&mut evm), U256::ZERO, "new block starts from zero");
    }

    #[test]
    fn views_work_in_static_context() {
        let admin = address!("0x00000000000000000000000000000000000000b2");
        let operator = address!("0x00000000000000000000000000000000000000c2");

        let config = TokenDualityConfig::new(admin, Some(U256::from(7u64)), Some(U256::from(70u64)))
            .expect("valid config");
        let mut evm = setup_evm(config);
        let add_calldata = ITokenDuality::addToAllowListCall { account: operator }.abi_encode();
        assert!(run_call(&mut evm, admin, &add_calldata).is_success());

        let mut view = |data: Vec<u8>| {
            evm.static_call(operator.into(), TOKEN_DUALITY_PRECOMPILE_ADDR, &data, GAS_LIMIT)
                .result
                .expect("view should succeed")
        };

        let allowed = view(ITokenDuality::allowlistCall { account: operator }.abi_encode());
        assert!(bool::abi_decode(&allowed).expect("decode bool"));
        let stranger = view(ITokenDuality::allowlistCall { account: admin }.abi_encode());
        assert!(!bool::abi_decode(&stranger).expect("decode bool"));

        let call_cap = view(ITokenDuality::perCallCapCall {}.abi_encode());
        assert_eq!(U256::abi_decode(&call_cap).expect("decode cap"), U256::from(7u64));
        let block_cap = view(ITokenDuality::perBlockCapCall {}.abi_encode());
        assert_eq!(U256::abi_decode(&block_cap).expect("decode cap"), U256::from(70u64));
    }

    #[test]
    fn writes_are_refused_in_static_context() {
        let admin = address!("0x00000000000000000000000000000000000000b3");
        let sender = address!("0x00000000000000000000000000000000000000c3");
        let recipient = address!("0x00000000000000000000000000000000000000d3");

        let mut evm = setup_evm(admin_config(admin));
        evm.db_mut().set_balance(sender, U256::from(1000u64));

        let calldata = transfer_calldata(sender, recipient, U256::from(1u64));
        let outcome = evm.static_call(
            admin.into(),
            TOKEN_DUALITY_PRECOMPILE_ADDR,
            &calldata,
            GAS_LIMIT,
        );

        assert_eq!(outcome, CallOutcome::failure(ExecutionError::WriteProtection, 0));
        assert_eq!(evm.db().balance(sender), U256::from(1000u64));
    }

    #[test]
    fn unlimited_caps_report_max() {
        let admin = address!("0x00000000000000000000000000000000000000b4");
        let mut evm = setup_evm(admin_config(admin));

        let output = run_call(&mut evm, admin, &ITokenDuality::perBlockCapCall {}.abi_encode())
            .result
            .expect("query should succeed");

        assert_eq!(U256::abi_decode(&output).expect("decode cap"), U256::MAX);
    }

    #[test]
    fn zero_amount_and_self_transfers_are_noops() {
        let admin = address!("0x00000000000000000000000000000000000000b5");
        let sender = address!("0x00000000000000000000000000000000000000c5");
        let recipient = address!("0x00000000000000000000000000000000000000d5");

        let mut evm = setup_evm(admin_config(admin));
        evm.db_mut().set_balance(sender, U256::from(1000u64));

        let zero = transfer_calldata(sender, recipient, U256::ZERO);
        assert!(run_call(&mut evm, admin, &zero).is_success());
        let to_self = transfer_calldata(sender, sender, U256::from(10u64));
        assert!(run_call(&mut evm, admin, &to_self).is_success());

        assert_eq!(evm.db().balance(sender), U256::from(1000u64));
        assert!(!evm.db().exists(recipient));
    }

    #[test]
    fn invalid_calldata_returns_error() {
        let admin = address!("0x00000000000000000000000000000000000000b6");
        let mut evm = setup_evm(admin_config(admin));

        let outcome = run_call(&mut evm, admin, &[0xde, 0xad, 0xbe, 0xef]);

        assert!(!outcome.is_success());
        assert!(!outcome.result.unwrap_err().is_fatal());
    }

    #[test]
    fn config_rejects_zero_admin() {
        assert!(TokenDualityConfig::with_admin(Address::ZERO).is_err());
    }

    #[test]
    fn config_rejects_invalid_caps() {
        let admin = address!("0x00000000000000000000000000000000000000b7");
        let err = TokenDualityConfig::new(admin, Some(U256::from(2u64)), Some(U256::from(1u64)))
            .unwrap_err();
        assert!(err.to_string().contains("cannot exceed"), "{err}");
    }

    #[test]
    fn config_is_production_ready() {
        let admin = address!("0x00000000000000000000000000000000000000b8");
        assert!(!TokenDualityConfig::default().is_production_ready());
        assert!(admin_config(admin).is_production_ready());
    }
}
