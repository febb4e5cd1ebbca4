//! Call arguments and the stateful-precompile dispatcher.

use crate::{
    call_type::CallType,
    contract::{CallerRef, Contract},
    environment::PrecompileEnvironment,
    error::DispatchBug,
    host::Host,
    precompile::{Precompile, PrecompileResult},
};
use alloy_primitives::{Address, U256};
use tracing::trace;

/// The parameters of one call into a precompile.
///
/// The fields mirror those of [`Evm::call`](crate::Evm::call) and its siblings, prepended with
/// the host and the call type. `value` is ignored for [`CallType::DelegateCall`] and
/// [`CallType::StaticCall`].
pub struct CallArgs<'a> {
    /// The engine the call is made in.
    pub host: &'a mut dyn Host,
    /// The flavour of the call.
    pub call_type: CallType,
    /// The calling account or frame.
    pub caller: CallerRef<'a>,
    /// The precompile's address.
    pub address: Address,
    /// Call data.
    pub input: &'a [u8],
    /// Gas available to the precompile; updated with the gas left after a stateful run.
    pub gas_remaining: u64,
    /// Value attached to the call.
    pub value: U256,
}

impl CallArgs<'_> {
    /// Builds the environment the precompile executes in.
    ///
    /// The synthesized identity is the `Contract` the interpreter would construct for a
    /// non-precompiled target of the same call:
    ///
    /// | Call type      | self          | value               |
    /// |----------------|---------------|---------------------|
    /// | `CALL`         | target        | given               |
    /// | `STATICCALL`   | target        | zero                |
    /// | `CALLCODE`     | caller        | given               |
    /// | `DELEGATECALL` | caller        | inherited by caller |
    pub fn env(&mut self) -> Result<PrecompileEnvironment<'_>, DispatchBug> {
        let caller = self.caller.address();
        let gas = self.gas_remaining;

        let contract = match self.call_type {
            CallType::Call => Contract::new(caller, self.address, self.value, gas),
            CallType::StaticCall => Contract::new(caller, self.address, U256::ZERO, gas),
            CallType::CallCode => Contract::new(caller, caller, self.value, gas),
            CallType::DelegateCall => {
                let parent = self.caller.frame().ok_or(DispatchBug::DelegateWithoutFrame)?;
                Contract::new(caller, caller, U256::ZERO, gas).into_delegate(parent)
            }
        };

        Ok(PrecompileEnvironment {
            host: &mut *self.host,
            contract,
            call_type: self.call_type,
            raw_caller: caller,
            raw_self: self.address,
        })
    }

    /// Runs the precompile, differentiating between stateless and stateful ones.
    ///
    /// Stateless precompiles run directly. Stateful ones get an environment; since the
    /// interpreter loop that usually maintains call depth and read-only state isn't involved,
    /// both are maintained here and restored on every exit path, unwinding included.
    /// `gas_remaining` is updated with the environment's gas when a stateful run returns,
    /// whether it succeeded or not.
    pub fn run(&mut self, precompile: &Precompile) -> PrecompileResult {
        let stateful = match precompile {
            Precompile::Stateless(precompile) => return precompile.run(self.input),
            Precompile::Stateful(precompile) => precompile,
        };

        trace!(
            target: "ev_dispatch::args",
            address = %self.address,
            call_type = %self.call_type,
            gas = self.gas_remaining,
            "Dispatching stateful precompile"
        );

        let input = self.input;
        let call_type = self.call_type;
        let received = self.host.call_context();
        let mut env = scopeguard::guard(self.env()?, move |env| {
            *env.host.call_context_mut() = received;
        });

        let context = env.host.call_context_mut();
        context.depth += 1;
        if call_type.read_only() && !context.read_only {
            context.read_only = true;
        }

        let result = stateful.run(&mut env, input);
        let gas = env.gas();
        drop(env);

        self.gas_remaining = gas;
        result
    }
}

impl std::fmt::Debug for CallArgs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallArgs")
            .field("call_type", &self.call_type)
            .field("caller", &self.caller)
            .field("address", &self.address)
            .field("input", &self.input)
            .field("gas_remaining", &self.gas_remaining)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
