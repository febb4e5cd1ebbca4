//! Precompile registration.
//!
//! Whether a precompile needs the full [`PrecompileEnvironment`] is decided once, when it is
//! registered, by wrapping it in the matching [`Precompile`] variant.

use crate::{
    environment::PrecompileEnvironment,
    error::{CallError, DispatchBug},
    host::Rules,
};
use alloy_primitives::{Address, Bytes};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};
use tracing::{debug, warn, Level};

/// Output of a precompile run.
pub type PrecompileResult = Result<Bytes, CallError>;

/// A plain input → output precompile with an upfront gas cost.
pub trait StatelessPrecompile: Send + Sync {
    /// Gas charged by the caller before [`run`](Self::run) is invoked.
    fn required_gas(&self, input: &[u8]) -> u64;

    /// Computes the output for `input`.
    fn run(&self, input: &[u8]) -> PrecompileResult;
}

/// A precompile that consumes gas, reads and writes state, and calls other contracts through
/// its [`PrecompileEnvironment`].
///
/// Instead of receiving and returning gas amounts, implementations use
/// [`PrecompileEnvironment::use_gas`]; if it returns `false` they SHOULD fail with
/// [`ExecutionError::OutOfGas`](crate::ExecutionError::OutOfGas).
pub trait StatefulPrecompile: Send + Sync {
    /// Runs the precompile.
    fn run(&self, env: &mut PrecompileEnvironment<'_>, input: &[u8]) -> PrecompileResult;
}

impl<F> StatefulPrecompile for F
where
    F: Fn(&mut PrecompileEnvironment<'_>, &[u8]) -> PrecompileResult + Send + Sync,
{
    fn run(&self, env: &mut PrecompileEnvironment<'_>, input: &[u8]) -> PrecompileResult {
        self(env, input)
    }
}

/// A registered precompile.
#[derive(Clone)]
pub enum Precompile {
    /// Dispatched directly, without an environment.
    Stateless(Arc<dyn StatelessPrecompile>),
    /// Dispatched through a [`PrecompileEnvironment`].
    Stateful(Arc<dyn StatefulPrecompile>),
}

impl Precompile {
    /// Wraps a stateless precompile.
    pub fn stateless(precompile: impl StatelessPrecompile + 'static) -> Self {
        Self::Stateless(Arc::new(precompile))
    }

    /// Wraps a stateful precompile.
    pub fn stateful(precompile: impl StatefulPrecompile + 'static) -> Self {
        Self::Stateful(Arc::new(precompile))
    }

    /// Wraps a closure as a stateful precompile.
    pub fn stateful_fn<F>(run: F) -> Self
    where
        F: Fn(&mut PrecompileEnvironment<'_>, &[u8]) -> PrecompileResult + Send + Sync + 'static,
    {
        Self::Stateful(Arc::new(run))
    }

    /// Returns whether the precompile must be dispatched through an environment.
    pub const fn is_stateful(&self) -> bool {
        matches!(self, Self::Stateful(_))
    }

    /// Gas charged by the caller before the precompile runs.
    ///
    /// Always zero for stateful precompiles; they consume gas through their environment.
    pub fn required_gas(&self, input: &[u8]) -> u64 {
        match self {
            Self::Stateless(precompile) => precompile.required_gas(input),
            Self::Stateful(_) => 0,
        }
    }

    /// The stateless entry point.
    ///
    /// A stateful precompile refuses with [`DispatchBug::StatefulViaStatelessEntry`]; it MUST
    /// be run via [`CallArgs::run`](crate::CallArgs::run).
    pub fn run(&self, input: &[u8]) -> PrecompileResult {
        match self {
            Self::Stateless(precompile) => precompile.run(input),
            Self::Stateful(_) => Err(DispatchBug::StatefulViaStatelessEntry.into()),
        }
    }
}

impl fmt::Debug for Precompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stateless(_) => f.write_str("Precompile::Stateless"),
            Self::Stateful(_) => f.write_str("Precompile::Stateful"),
        }
    }
}

/// Policy hook selecting which registered precompiles are active.
pub trait PrecompileHooks {
    /// Returns the active precompile addresses, given the registered ones under `rules`.
    fn active_precompiles(&self, rules: &Rules, registered: Vec<Address>) -> Vec<Address> {
        let _ = rules;
        registered
    }
}

/// Hooks that keep every registered precompile active.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl PrecompileHooks for NoopHooks {}

/// Precompiles keyed by address.
#[derive(Debug, Clone, Default)]
pub struct PrecompileSet {
    precompiles: HashMap<Address, Precompile>,
}

impl PrecompileSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a precompile, returning the one it replaces.
    pub fn insert(&mut self, address: Address, precompile: Precompile) -> Option<Precompile> {
        self.precompiles.insert(address, precompile)
    }

    /// Registers a stateless precompile.
    pub fn insert_stateless(
        &mut self,
        address: Address,
        precompile: impl StatelessPrecompile + 'static,
    ) -> Option<Precompile> {
        self.insert(address, Precompile::stateless(precompile))
    }

    /// Registers a stateful precompile.
    pub fn insert_stateful(
        &mut self,
        address: Address,
        precompile: impl StatefulPrecompile + 'static,
    ) -> Option<Precompile> {
        self.insert(address, Precompile::stateful(precompile))
    }

    /// Unregisters a precompile.
    pub fn remove(&mut self, address: &Address) -> Option<Precompile> {
        self.precompiles.remove(address)
    }

    /// Returns the precompile at `address`.
    pub fn get(&self, address: &Address) -> Option<&Precompile> {
        self.precompiles.get(address)
    }

    /// Returns whether a precompile is registered at `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.precompiles.contains_key(address)
    }

    /// Returns the number of registered precompiles.
    pub fn len(&self) -> usize {
        self.precompiles.len()
    }

    /// Returns whether no precompile is registered.
    pub fn is_empty(&self) -> bool {
        self.precompiles.is_empty()
    }

    /// Returns the registered addresses in ascending order.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<_> = self.precompiles.keys().copied().collect();
        addresses.sort_unstable();
        addresses
    }

    /// Returns the subset selected by `hooks` under `rules`.
    ///
    /// Addresses selected without a registered implementation are skipped.
    pub fn activate(&self, rules: &Rules, hooks: &dyn PrecompileHooks) -> Self {
        let registered = self.addresses();
        let active = hooks.active_precompiles(rules, registered.clone());

        if tracing::enabled!(Level::DEBUG) {
            let before: HashSet<_> = registered.iter().copied().collect();
            let after: HashSet<_> = active.iter().copied().collect();
            debug!(
                target: "ev_dispatch::precompile",
                added = ?sorted(after.difference(&before)),
                removed = ?sorted(before.difference(&after)),
                unchanged = ?sorted(after.intersection(&before)),
                "Overriding active precompiles"
            );
        }

        let mut selected = Self::new();
        for address in active {
            match self.precompiles.get(&address) {
                Some(precompile) => {
                    selected.insert(address, precompile.clone());
                }
                None => warn!(
                    target: "ev_dispatch::precompile",
                    %address,
                    "Ignoring active precompile without an implementation"
                ),
            }
        }
        selected
    }
}

fn sorted<'a>(addresses: impl Iterator<Item = &'a Address>) -> Vec<Address> {
    let mut addresses: Vec<_> = addresses.copied().collect();
    addresses.sort_unstable();
    addresses
}
