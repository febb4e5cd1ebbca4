//! The identity precompile: returns its input unchanged.

use alloy_primitives::{address, Address, Bytes};
use ev_dispatch::{PrecompileResult, StatelessPrecompile};

/// Identity precompile address: 0x00..04
pub const IDENTITY_ADDR: Address = address!("0x0000000000000000000000000000000000000004");

/// Flat gas cost of every call.
pub const IDENTITY_BASE_GAS: u64 = 15;

/// Gas per started 32-byte word of input.
pub const IDENTITY_PER_WORD_GAS: u64 = 3;

/// Copies its input to its output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl StatelessPrecompile for Identity {
    fn required_gas(&self, input: &[u8]) -> u64 {
        let words = (input.len() as u64).div_ceil(32);
        IDENTITY_BASE_GAS.saturating_add(words.saturating_mul(IDENTITY_PER_WORD_GAS))
    }

    fn run(&self, input: &[u8]) -> PrecompileResult {
        Ok(Bytes::copy_from_slice(input))
    }
}
