//! # Evolve Custom EVM Precompiles
//!
//! This crate provides precompiled contracts that extend the EVM with
//! Evolve-specific functionality for sovereign rollups.
//!
//! ## Available Precompiles
//!
//! | Address | Name | Kind | Description |
//! |---------|------|------|-------------|
//! | `0x0004` | [`identity`] | stateless | Returns its input |
//! | `0xF100` | [`mint`] | stateful | Native token supply management (mint/burn) |
//! | `0x00FD` | [`token_duality`] | stateful | Native token as ERC-20 (Celo-style transfer) |
//!
//! ## Architecture
//!
//! Stateful precompiles run through [`ev_dispatch::PrecompileEnvironment`]:
//!
//! 1. **Authorization**: Admin-based access control against the caller bytecode would observe
//! 2. **Gas**: Consumed through the environment; running short is `OutOfGas`
//! 3. **State Management**: Balance and storage updates through the environment's state,
//!    refused with `WriteProtection` in a static context
//! 4. **Safety**: Checked arithmetic, zero-address validation, rate limiting
//!
//! ## Integration
//!
//! ```ignore
//! use ev_dispatch::{Evm, MemoryState, PrecompileSet};
//! use ev_precompiles::{install_precompiles, PrecompilesConfig};
//!
//! let mut precompiles = PrecompileSet::new();
//! install_precompiles(&mut precompiles, &PrecompilesConfig::from_env()?);
//! let evm = Evm::new(MemoryState::new(), precompiles);
//! ```
//!
//! ## References
//!
//! - [Celo Token Duality](https://specs.celo.org/token_duality.html)

pub mod config;
pub mod identity;
pub mod mint;
pub mod token_duality;

pub use config::PrecompilesConfig;

use ev_dispatch::PrecompileSet;
use identity::{Identity, IDENTITY_ADDR};
use mint::{MintPrecompile, MINT_PRECOMPILE_ADDR};
use token_duality::{TokenDualityPrecompile, TOKEN_DUALITY_PRECOMPILE_ADDR};

/// Registers the identity precompile and every custom precompile `config` enables.
pub fn install_precompiles(precompiles: &mut PrecompileSet, config: &PrecompilesConfig) {
    precompiles.insert_stateless(IDENTITY_ADDR, Identity);

    if let Some(admin) = config.mint_admin {
        precompiles.insert_stateful(MINT_PRECOMPILE_ADDR, MintPrecompile::new(admin));
        tracing::info!(target: "ev_precompiles", ?admin, "installed native mint precompile");
    }

    if let Some(token_duality) = &config.token_duality {
        if !token_duality.is_production_ready() {
            tracing::warn!(target: "ev_precompiles", "token duality admin is the zero address");
        }
        precompiles.insert_stateful(
            TOKEN_DUALITY_PRECOMPILE_ADDR,
            TokenDualityPrecompile::new(token_duality.clone()),
        );
        tracing::info!(
            target: "ev_precompiles",
            admin = ?token_duality.admin,
            "installed token duality precompile"
        );
    }
}
