//! Call-frame identities.

use alloy_primitives::{Address, U256};

/// The identity of an executing call frame, as the interpreter would construct it for a
/// non-precompiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    /// Address visible to the frame as `CALLER`.
    pub caller: Address,
    /// Address whose context (balance, storage) the frame executes in.
    pub address: Address,
    /// Value attached to the frame.
    pub value: U256,
    /// Gas still available to the frame.
    pub gas: u64,
    delegate: bool,
}

impl Contract {
    /// Creates a frame identity.
    pub const fn new(caller: Address, address: Address, value: U256, gas: u64) -> Self {
        Self { caller, address, value, gas, delegate: false }
    }

    /// Turns the frame into a delegate of `parent`, inheriting its caller and value.
    pub fn into_delegate(mut self, parent: &Self) -> Self {
        self.delegate = true;
        self.caller = parent.caller;
        self.value = parent.value;
        self
    }

    /// Returns whether the frame executes on behalf of its parent via `DELEGATECALL`.
    pub const fn is_delegate(&self) -> bool {
        self.delegate
    }

    /// Deducts `amount` from the frame's gas. Returns `false`, without deducting, if the frame
    /// does not have enough.
    pub fn use_gas(&mut self, amount: u64) -> bool {
        match self.gas.checked_sub(amount) {
            Some(gas) => {
                self.gas = gas;
                true
            }
            None => false,
        }
    }
}

/// The caller of a call: either a bare account or a live frame whose identity can be inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRef<'a> {
    /// An account without an executing frame, e.g. the transaction origin.
    Account(Address),
    /// An executing frame.
    Contract(&'a Contract),
}

impl CallerRef<'_> {
    /// Returns the caller's own address.
    pub const fn address(&self) -> Address {
        match self {
            Self::Account(address) => *address,
            Self::Contract(contract) => contract.address,
        }
    }

    /// Returns the caller's frame, if any.
    pub const fn frame(&self) -> Option<&Contract> {
        match self {
            Self::Account(_) => None,
            Self::Contract(contract) => Some(*contract),
        }
    }
}

impl From<Address> for CallerRef<'_> {
    fn from(address: Address) -> Self {
        Self::Account(address)
    }
}

impl<'a> From<&'a Contract> for CallerRef<'a> {
    fn from(contract: &'a Contract) -> Self {
        Self::Contract(contract)
    }
}
