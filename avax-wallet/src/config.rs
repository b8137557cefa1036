//! Configuration for the wallet.
//!
//! Settings come from a TOML file, with command line flags applied on top.
//! The resolved values are handed to each command as plain
//! [`NodeSettings`] and [`DeviceSettings`] structs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{WalletError, WalletResult};
use crate::keys::HARDENED;
use crate::utxo::AssetId;

/// Wallet configuration file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Base URL of the node API
    #[serde(default = "default_node_url")]
    pub node_url: String,

    /// Base URL of the device's HTTP APDU bridge
    #[serde(default = "default_device_url")]
    pub device_url: String,

    /// Chain alias used in the RPC endpoint and as address prefix
    #[serde(default = "default_chain_alias")]
    pub chain_alias: String,

    /// Hardened BIP44 account index
    #[serde(default)]
    pub account: u32,

    /// Asset whose balance is reported and transferred
    #[serde(default = "default_asset_id")]
    pub asset_id: String,

    /// Timeout for each node request and device exchange
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_node_url() -> String {
    "https://testapi.avax.network".to_string()
}

fn default_device_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_chain_alias() -> String {
    "X".to_string()
}

fn default_asset_id() -> String {
    "9xc4gcJYYg1zfLeeEFQDLx4HnCk81yUmV1DAUc6VfJFj".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            device_url: default_device_url(),
            chain_alias: default_chain_alias(),
            account: 0,
            asset_id: default_asset_id(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// How to reach the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSettings {
    pub url: String,
    pub chain_alias: String,
    pub asset_id: AssetId,
    pub request_timeout_secs: u64,
}

/// How to reach the signing device, and which account to use on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub url: String,
    pub account: u32,
    pub request_timeout_secs: u64,
}

impl WalletConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> WalletResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("{}: {}", path.display(), e)))?;
        let config: WalletConfig = toml::from_str(&content)
            .map_err(|e| WalletError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else use defaults.
    pub fn load(path: Option<&Path>) -> WalletResult<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading configuration");
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `~/.avax-wallet/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".avax-wallet").join("config.toml"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> WalletResult<()> {
        if self.node_url.trim().is_empty() {
            return Err(WalletError::Config("node_url must not be empty".to_string()));
        }
        if self.device_url.trim().is_empty() {
            return Err(WalletError::Config("device_url must not be empty".to_string()));
        }
        if self.chain_alias.trim().is_empty() {
            return Err(WalletError::Config("chain_alias must not be empty".to_string()));
        }
        if self.asset_id.trim().is_empty() {
            return Err(WalletError::Config("asset_id must not be empty".to_string()));
        }
        if self.account >= HARDENED {
            return Err(WalletError::Config(format!(
                "account must be below {}, got {}",
                HARDENED, self.account
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(WalletError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn node_settings(&self) -> NodeSettings {
        NodeSettings {
            url: self.node_url.clone(),
            chain_alias: self.chain_alias.clone(),
            asset_id: AssetId::new(self.asset_id.clone()),
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            url: self.device_url.clone(),
            account: self.account,
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}
