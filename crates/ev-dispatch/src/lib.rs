//! Stateful precompile dispatch.
//!
//! Plain precompiles map input bytes to output bytes for an upfront gas cost. Stateful ones
//! additionally read and write state, consume gas as they go, inspect the block and call other
//! contracts. This crate routes both kinds through one entry point, [`CallArgs::run`], which
//! hands stateful precompiles a [`PrecompileEnvironment`] and keeps call depth and read-only
//! state consistent across the call.
//!
//! | Type | Role |
//! |------|------|
//! | [`CallType`] | `CALL`, `CALLCODE`, `DELEGATECALL` or `STATICCALL` |
//! | [`CallArgs`] | One call into a precompile; resolves the environment and dispatches |
//! | [`PrecompileEnvironment`] | Everything a stateful precompile may observe or do |
//! | [`Precompile`] | Registered precompile, stateless or stateful |
//! | [`Host`] | The engine hosting the environment; implemented by [`Evm`] |
//!
//! ```ignore
//! use ev_dispatch::{Evm, MemoryState, PrecompileSet};
//!
//! let mut precompiles = PrecompileSet::new();
//! precompiles.insert_stateful(address, MyPrecompile);
//!
//! let mut evm = Evm::new(MemoryState::new(), precompiles);
//! let outcome = evm.transact(origin, address, &input, 100_000, U256::ZERO)?;
//! ```

pub mod args;
pub mod call_type;
pub mod config;
pub mod contract;
pub mod environment;
pub mod error;
pub mod evm;
pub mod host;
pub mod precompile;
pub mod state;

pub use args::CallArgs;
pub use call_type::{CallType, InvalidCallType};
pub use config::{ConfigError, EvmConfig, DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH_ENV};
pub use contract::{CallerRef, Contract};
pub use environment::{AddressContext, CallOption, CallerAndSelf, PrecompileEnvironment};
pub use error::{CallError, DispatchBug, ExecutionError, HeaderError, TransactError};
pub use evm::Evm;
pub use host::{CallContext, CallOutcome, Host, Rules};
pub use precompile::{
    NoopHooks, Precompile, PrecompileHooks, PrecompileResult, PrecompileSet, StatefulPrecompile,
    StatelessPrecompile,
};
pub use state::{MemoryAccount, MemoryState, StateDb, StateReader};
