// Mint precompile

use alloy_primitives::{address, Address, Bytes};
use alloy_sol_types::{sol, SolInterface};
use ev_dispatch::{
    CallError, ExecutionError, PrecompileEnvironment, PrecompileResult, StatefulPrecompile,
};
use tracing::debug;

sol! {
    interface INativeToken {
        function mint(address to, uint256 amount);
        function burn(address from, uint256 amount);
    }
}

pub const MINT_PRECOMPILE_ADDR: Address = address!("0x000000000000000000000000000000000000F100");

/// Gas consumed by a single mint or burn.
pub const MINT_GAS_COST: u64 = 9_000;

/// A custom precompile that mints and burns the native token
#[derive(Clone, Debug, Default)]
pub struct MintPrecompile {
    admin: Address,
}

impl MintPrecompile {
    pub const fn new(admin: Address) -> Self {
        Self { admin }
    }

    pub const fn admin(&self) -> Address {
        self.admin
    }

    fn is_authorized(&self, caller: Address) -> bool {
        caller == self.admin
    }

    fn other(msg: impl Into<String>) -> CallError {
        ExecutionError::Other(msg.into()).into()
    }
}

impl StatefulPrecompile for MintPrecompile {
    fn run(&self, env: &mut PrecompileEnvironment<'_>, input: &[u8]) -> PrecompileResult {
        let caller = env.addresses().evm_semantic.caller;

        // Enforce access control.
        if !self.is_authorized(caller) {
            return Err(Self::other("unauthorized caller"));
        }
        if !env.use_gas(MINT_GAS_COST) {
            return Err(ExecutionError::OutOfGas.into());
        }

        let decoded = INativeToken::INativeTokenCalls::abi_decode(input)
            .map_err(|e| Self::other(e.to_string()))?;

        let Some(state) = env.state_db() else {
            return Err(ExecutionError::WriteProtection.into());
        };

        match decoded {
            INativeToken::INativeTokenCalls::mint(call) => {
                state.create_account(call.to);
                if !state.add_balance(call.to, call.amount) {
                    return Err(Self::other("balance overflow"));
                }
                debug!(target: "mint", to = ?call.to, amount = %call.amount, "minted");
            }
            INativeToken::INativeTokenCalls::burn(call) => {
                state.create_account(call.from);
                if !state.sub_balance(call.from, call.amount) {
                    return Err(Self::other("insufficient balance"));
                }
                debug!(target: "mint", from = ?call.from, amount = %call.amount, "burned");
            }
        }

        Ok(Bytes::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use alloy_sol_types::SolCall;
    use ev_dispatch::{CallOutcome, Evm, MemoryState, PrecompileSet, StateReader};

    const GAS_LIMIT: u64 = 1_000_000;

    fn setup_evm(precompile: MintPrecompile) -> Evm<MemoryState> {
        let mut precompiles = PrecompileSet::new();
        precompiles.insert_stateful(MINT_PRECOMPILE_ADDR, precompile);
        Evm::new(MemoryState::new(), precompiles)
    }

    fn run_call(evm: &mut Evm<MemoryState>, caller: Address, data: &[u8]) -> CallOutcome {
        evm.call(caller.into(), MINT_PRECOMPILE_ADDR, data, GAS_LIMIT, U256::ZERO)
    }

    #[test]
    fn mint_increases_balance() {
        let admin = address!("0x00000000000000000000000000000000000000a1");
        let recipient = address!("0x00000000000000000000000000000000000000b1");
        let amount = U256::from(42u64);
        let mut evm = setup_evm(MintPrecompile::new(admin));

        let calldata = INativeToken::mintCall {
            to: recipient,
            amount,
        }
        .abi_encode();

        let outcome = run_call(&mut evm, admin, &calldata);

        assert!(outcome.is_success(), "mint call should succeed");
        assert_eq!(outcome.gas_left, GAS_LIMIT - MINT_GAS_COST);
        assert!(evm.db().exists(recipient), "recipient account should be created");
        assert_eq!(
            evm.db().balance(recipient),
            amount,
            "recipient balance must increase by minted amount"
        );
    }

    #[test]
    fn burn_decreases_balance() {
        let admin = address!("0x00000000000000000000000000000000000000a2");
        let holder = address!("0x00000000000000000000000000000000000000b2");
        let mint_amount = U256::from(100u64);
        let burn_amount = U256::from(60u64);
        let mut evm = setup_evm(MintPrecompile::new(admin));

        let mint_calldata = INativeToken::mintCall {
            to: holder,
            amount: mint_amount,
        }
        .abi_encode();
        assert!(run_call(&mut evm, admin, &mint_calldata).is_success());

        let burn_calldata = INativeToken::burnCall {
            from: holder,
            amount: burn_amount,
        }
        .abi_encode();
        let outcome = run_call(&mut evm, admin, &burn_calldata);

        assert!(outcome.is_success(), "burn call should succeed");
        assert_eq!(
            evm.db().balance(holder),
            mint_amount - burn_amount,
            "holder balance must decrease"
        );
    }

    #[test]
    fn burn_underflow_is_rejected() {
        let admin = address!("0x00000000000000000000000000000000000000a3");
        let holder = address!("0x00000000000000000000000000000000000000b3");
        let initial_amount = U256::from(25u64);
        let mut evm = setup_evm(MintPrecompile::new(admin));

        let mint_calldata = INativeToken::mintCall {
            to: holder,
            amount: initial_amount,
        }
        .abi_encode();
        assert!(run_call(&mut evm, admin, &mint_calldata).is_success());

        let burn_calldata = INativeToken::burnCall {
            from: holder,
            amount: U256::from(50u64),
        }
        .abi_encode();
        let outcome = run_call(&mut evm, admin, &burn_calldata);

        match outcome.result {
            Err(CallError::Execution(ExecutionError::Other(msg))) => {
                assert_eq!(msg, "insufficient balance", "expected insufficient balance error")
            }
            other => panic!("expected underflow error, got {other:?}"),
        }
        assert_eq!(
            evm.db().balance(holder),
            initial_amount,
            "balance should remain unchanged on underflow"
        );
    }

    #[test]
    fn unauthorized_caller_is_denied() {
        let admin = address!("0x00000000000000000000000000000000000000a4");
        let caller = address!("0x00000000000000000000000000000000000000ff");
        let recipient = address!("0x00000000000000000000000000000000000000cc");
        let mut evm = setup_evm(MintPrecompile::new(admin));

        let calldata = INativeToken::mintCall {
            to: recipient,
            amount: U256::from(10u64),
        }
        .abi_encode();
        let outcome = run_call(&mut evm, caller, &calldata);

        match outcome.result {
            Err(CallError::Execution(ExecutionError::Other(msg))) => {
                assert_eq!(msg, "unauthorized caller", "expected unauthorized caller error")
            }
            other => panic!("expected unauthorized error, got {other:?}"),
        }
        assert!(
            !evm.db().exists(recipient),
            "unauthorized call must not create new accounts"
        );
    }

    #[test]
    fn static_call_cannot_mint() {
        let admin = address!("0x00000000000000000000000000000000000000a5");
        let recipient = address!("0x00000000000000000000000000000000000000b5");
        let mut evm = setup_evm(MintPrecompile::new(admin));

        let calldata = INativeToken::mintCall {
            to: recipient,
            amount: U256::from(1u64),
        }
        .abi_encode();
        let outcome = evm.static_call(admin.into(), MINT_PRECOMPILE_ADDR, &calldata, GAS_LIMIT);

        assert_eq!(outcome, CallOutcome::failure(ExecutionError::WriteProtection, 0));
        assert_eq!(evm.db().balance(recipient), U256::ZERO);
    }

    #[test]
    fn insufficient_gas_is_out_of_gas() {
        let admin = address!("0x00000000000000000000000000000000000000a6");
        let mut evm = setup_evm(MintPrecompile::new(admin));

        let calldata = INativeToken::mintCall {
            to: admin,
            amount: U256::from(1u64),
        }
        .abi_encode();
        let outcome = evm.call(
            admin.into(),
            MINT_PRECOMPILE_ADDR,
            &calldata,
            MINT_GAS_COST - 1,
            U256::ZERO,
        );

        assert_eq!(outcome, CallOutcome::failure(ExecutionError::OutOfGas, 0));
        assert_eq!(evm.db().balance(admin), U256::ZERO);
    }
}
