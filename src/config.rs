use crate::utils::errors::{ProvisionError, Result};
use std::env;

pub const DEFAULT_VAULT_ADDR: &str = "http://127.0.0.1:8200";

/// Connection settings for the provisioning run: where Vault lives and the
/// bootstrap root token used to drive it.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub vault_addr: String,
    pub root_token: String,
}

impl ProvisionConfig {
    /// Resolve configuration from already-collected sources. The address may
    /// be absent (falls back to the local dev server); the root token is
    /// mandatory and its absence aborts before any step runs.
    pub fn resolve(vault_addr: Option<String>, root_token: Option<String>) -> Result<Self> {
        let vault_addr = vault_addr
            .filter(|addr| !addr.is_empty())
            .unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string());
        let vault_addr = vault_addr.trim_end_matches('/').to_string();

        let root_token = root_token.filter(|token| !token.is_empty()).ok_or_else(|| {
            ProvisionError::Config(
                "The VAULT_ROOT_TOKEN environment variable must be set".to_string(),
            )
        })?;

        Ok(Self {
            vault_addr,
            root_token,
        })
    }

    /// Build configuration from the CLI flag (already merged with VAULT_ADDR
    /// by clap) and the VAULT_ROOT_TOKEN environment variable.
    pub fn from_env(vault_addr: Option<String>) -> Result<Self> {
        Self::resolve(vault_addr, env::var("VAULT_ROOT_TOKEN").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_explicit_values() {
        let config = ProvisionConfig::resolve(
            Some("https://vault.example.com:8200".to_string()),
            Some("hvs.root".to_string()),
        )
        .unwrap();
        assert_eq!(config.vault_addr, "https://vault.example.com:8200");
        assert_eq!(config.root_token, "hvs.root");
    }

    #[test]
    fn test_resolve_defaults_vault_addr() {
        let config = ProvisionConfig::resolve(None, Some("hvs.root".to_string())).unwrap();
        assert_eq!(config.vault_addr, DEFAULT_VAULT_ADDR);
    }

    #[test]
    fn test_resolve_strips_trailing_slash() {
        let config = ProvisionConfig::resolve(
            Some("http://127.0.0.1:8200/".to_string()),
            Some("hvs.root".to_string()),
        )
        .unwrap();
        assert_eq!(config.vault_addr, "http://127.0.0.1:8200");
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let err = ProvisionConfig::resolve(None, None).unwrap_err();
        assert!(matches!(err, ProvisionError::Config(_)));
    }

    #[test]
    fn test_empty_token_is_config_error() {
        let err = ProvisionConfig::resolve(None, Some(String::new())).unwrap_err();
        assert!(matches!(err, ProvisionError::Config(_)));
    }
}
