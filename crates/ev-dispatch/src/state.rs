//! State access consumed by the dispatch path.
//!
//! The state database proper (storage layout, trie, persistence) lives outside this crate; the
//! dispatcher only needs the narrow view defined by [`StateReader`] and [`StateDb`].
//! [`MemoryState`] is a snapshotting in-memory implementation for embedding and tests.

use alloy_primitives::{Address, B256, U256};
use std::collections::HashMap;

/// Read access to account state.
pub trait StateReader {
    /// Returns whether the account exists.
    fn exists(&self, address: Address) -> bool;

    /// Returns the balance of the account, zero if it does not exist.
    fn balance(&self, address: Address) -> U256;

    /// Returns the nonce of the account, zero if it does not exist.
    fn nonce(&self, address: Address) -> u64;

    /// Returns the value of a storage slot, zero if unset.
    fn storage(&self, address: Address, key: B256) -> B256;
}

/// Full read/write access to account state.
///
/// Only handed out to precompiles when the call stack is not read-only.
pub trait StateDb: StateReader {
    /// Creates the account if it does not exist yet.
    fn create_account(&mut self, address: Address);

    /// Overwrites the balance of the account, creating it if needed.
    fn set_balance(&mut self, address: Address, balance: U256);

    /// Overwrites the nonce of the account, creating it if needed.
    fn set_nonce(&mut self, address: Address, nonce: u64);

    /// Overwrites a storage slot of the account, creating it if needed.
    fn set_storage(&mut self, address: Address, key: B256, value: B256);

    /// Records the current state and returns an identifier to revert to.
    fn snapshot(&mut self) -> usize;

    /// Reverts all changes made since the snapshot with the given identifier was taken.
    ///
    /// Snapshots taken after `id` are discarded.
    fn revert_to_snapshot(&mut self, id: usize);

    /// Keeps all changes made since the snapshot with the given identifier was taken and
    /// releases it, along with any snapshot taken after it.
    fn commit_snapshot(&mut self, id: usize);

    /// Credits `amount` to the account. Returns `false` on overflow, leaving state untouched.
    fn add_balance(&mut self, address: Address, amount: U256) -> bool {
        match self.balance(address).checked_add(amount) {
            Some(balance) => {
                self.set_balance(address, balance);
                true
            }
            None => false,
        }
    }

    /// Debits `amount` from the account. Returns `false` on underflow, leaving state untouched.
    fn sub_balance(&mut self, address: Address, amount: U256) -> bool {
        match self.balance(address).checked_sub(amount) {
            Some(balance) => {
                self.set_balance(address, balance);
                true
            }
            None => false,
        }
    }
}

/// A single account in [`MemoryState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryAccount {
    /// Account balance in wei.
    pub balance: U256,
    /// Account nonce.
    pub nonce: u64,
    /// Non-zero storage slots.
    pub storage: HashMap<B256, B256>,
}

/// In-memory [`StateDb`] with snapshot support.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    accounts: HashMap<Address, MemoryAccount>,
    snapshots: Vec<HashMap<Address, MemoryAccount>>,
}

impl MemoryState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account.
    pub fn insert_account(&mut self, address: Address, account: MemoryAccount) {
        self.accounts.insert(address, account);
    }

    /// Returns the account, if it exists.
    pub fn account(&self, address: Address) -> Option<&MemoryAccount> {
        self.accounts.get(&address)
    }

    fn account_mut(&mut self, address: Address) -> &mut MemoryAccount {
        self.accounts.entry(address).or_default()
    }
}

impl StateReader for MemoryState {
    fn exists(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    fn balance(&self, address: Address) -> U256 {
        self.accounts.get(&address).map_or(U256::ZERO, |account| account.balance)
    }

    fn nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map_or(0, |account| account.nonce)
    }

    fn storage(&self, address: Address, key: B256) -> B256 {
        self.accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key).copied())
            .unwrap_or_default()
    }
}

impl StateDb for MemoryState {
    fn create_account(&mut self, address: Address) {
        self.account_mut(address);
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        self.account_mut(address).balance = balance;
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.account_mut(address).nonce = nonce;
    }

    fn set_storage(&mut self, address: Address, key: B256, value: B256) {
        let storage = &mut self.account_mut(address).storage;
        if value.is_zero() {
            storage.remove(&key);
        } else {
            storage.insert(key, value);
        }
    }

    fn snapshot(&mut self) -> usize {
        self.snapshots.push(self.accounts.clone());
        self.snapshots.len() - 1
    }

    fn revert_to_snapshot(&mut self, id: usize) {
        if id >= self.snapshots.len() {
            return;
        }
        self.snapshots.truncate(id + 1);
        if let Some(accounts) = self.snapshots.pop() {
            self.accounts = accounts;
        }
    }

    fn commit_snapshot(&mut self, id: usize) {
        self.snapshots.truncate(id);
    }
}
