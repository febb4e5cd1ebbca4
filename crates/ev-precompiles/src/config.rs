use crate::token_duality::TokenDualityConfig;
use alloy_primitives::{Address, U256};
use std::str::FromStr;

/// Environment variable holding the native mint admin.
pub const MINT_ADMIN_ENV: &str = "EV_MINT_ADMIN";
/// Environment variable holding the token duality admin.
pub const TOKEN_DUALITY_ADMIN_ENV: &str = "EV_TOKEN_DUALITY_ADMIN";
/// Environment variable holding the token duality per-call cap.
pub const TOKEN_DUALITY_PER_CALL_CAP_ENV: &str = "EV_TOKEN_DUALITY_PER_CALL_CAP";
/// Environment variable holding the token duality per-block cap.
pub const TOKEN_DUALITY_PER_BLOCK_CAP_ENV: &str = "EV_TOKEN_DUALITY_PER_BLOCK_CAP";

/// Configuration of the custom precompiles.
///
/// A precompile without an admin is not installed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrecompilesConfig {
    /// Admin of the native mint precompile.
    pub mint_admin: Option<Address>,
    /// Configuration of the token duality precompile.
    pub token_duality: Option<TokenDualityConfig>,
}

impl PrecompilesConfig {
    /// Creates a new `PrecompilesConfig` from environment variables.
    ///
    /// All variables are optional, but the token duality caps require its admin.
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Creates a new `PrecompilesConfig` from the variables `lookup` returns. Blank values
    /// count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mint_admin = var(MINT_ADMIN_ENV)
            .map(|s| Address::from_str(s.trim()))
            .transpose()?;

        let token_duality_admin = var(TOKEN_DUALITY_ADMIN_ENV)
            .map(|s| Address::from_str(s.trim()))
            .transpose()?;

        let per_call_cap = var(TOKEN_DUALITY_PER_CALL_CAP_ENV)
            .map(|s| U256::from_str(s.trim()))
            .transpose()?;

        let per_block_cap = var(TOKEN_DUALITY_PER_BLOCK_CAP_ENV)
            .map(|s| U256::from_str(s.trim()))
            .transpose()?;

        let token_duality = match token_duality_admin {
            Some(admin) => Some(TokenDualityConfig::new(admin, per_call_cap, per_block_cap)?),
            None => {
                eyre::ensure!(
                    per_call_cap.is_none() && per_block_cap.is_none(),
                    "{TOKEN_DUALITY_ADMIN_ENV} is required when token duality caps are set"
                );
                None
            }
        };

        Ok(Self {
            mint_admin,
            token_duality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> eyre::Result<PrecompilesConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        PrecompilesConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_installs_nothing() {
        let config = from_map(&[]).expect("empty config");
        assert_eq!(config, PrecompilesConfig::default());
    }

    #[test]
    fn parses_admins_and_caps() {
        let config = from_map(&[
            (MINT_ADMIN_ENV, "0x00000000000000000000000000000000000000a1"),
            (TOKEN_DUALITY_ADMIN_ENV, " 0x00000000000000000000000000000000000000a2 "),
            (TOKEN_DUALITY_PER_CALL_CAP_ENV, "100"),
            (TOKEN_DUALITY_PER_BLOCK_CAP_ENV, "1000"),
        ])
        .expect("valid config");

        assert_eq!(
            config.mint_admin,
            Some(address!("0x00000000000000000000000000000000000000a1"))
        );
        let token_duality = config.token_duality.expect("token duality configured");
        assert_eq!(
            token_duality.admin,
            address!("0x00000000000000000000000000000000000000a2")
        );
        assert_eq!(token_duality.per_call_cap, Some(U256::from(100u64)));
        assert_eq!(token_duality.per_block_cap, Some(U256::from(1000u64)));
    }

    #[test]
    fn caps_without_admin_are_rejected() {
        let err = from_map(&[(TOKEN_DUALITY_PER_BLOCK_CAP_ENV, "1000")]).unwrap_err();
        assert!(err.to_string().contains(TOKEN_DUALITY_ADMIN_ENV), "{err}");
    }

    #[test]
    fn invalid_address_is_rejected() {
        assert!(from_map(&[(MINT_ADMIN_ENV, "not-an-address")]).is_err());
    }
}
