//! CLI Commands
//!
//! Each command has a `run` entry point that resolves settings, opens the
//! node client and the device, and prints its result to stdout. The work
//! itself is done by functions generic over [`NodeClient`] and
//! [`SigningDevice`], which is what the tests drive.

pub mod address;
pub mod balance;
pub mod device;
pub mod transfer;
pub mod utxos;

use anyhow::Result;
use clap::Args;

use crate::config::WalletConfig;
use crate::device::{LedgerApp, SpeculosTransport};
use crate::node::RpcNodeClient;

/// Options selecting the node
#[derive(Debug, Clone, Default, Args)]
pub struct NodeOptions {
    /// Node API base URL
    #[arg(long, value_name = "URL")]
    pub node: Option<String>,

    /// Asset id to report and transfer
    #[arg(long, value_name = "ASSET_ID")]
    pub asset: Option<String>,
}

/// Options selecting the signing device
#[derive(Debug, Clone, Default, Args)]
pub struct DeviceOptions {
    /// Device APDU bridge base URL
    #[arg(long, value_name = "URL")]
    pub device: Option<String>,

    /// BIP44 account index
    #[arg(long)]
    pub account: Option<u32>,
}

impl NodeOptions {
    fn apply(&self, config: &mut WalletConfig) {
        if let Some(node) = &self.node {
            config.node_url = node.clone();
        }
        if let Some(asset) = &self.asset {
            config.asset_id = asset.clone();
        }
    }
}

impl DeviceOptions {
    fn apply(&self, config: &mut WalletConfig) {
        if let Some(device) = &self.device {
            config.device_url = device.clone();
        }
        if let Some(account) = self.account {
            config.account = account;
        }
    }
}

/// Apply command line overrides to the loaded configuration.
pub fn resolve(
    config: &WalletConfig,
    node: Option<&NodeOptions>,
    device: Option<&DeviceOptions>,
) -> Result<WalletConfig> {
    let mut resolved = config.clone();
    if let Some(node) = node {
        node.apply(&mut resolved);
    }
    if let Some(device) = device {
        device.apply(&mut resolved);
    }
    resolved.validate()?;
    Ok(resolved)
}

fn connect_node(config: &WalletConfig) -> Result<RpcNodeClient> {
    Ok(RpcNodeClient::new(&config.node_settings())?)
}

fn open_device(config: &WalletConfig) -> Result<LedgerApp<SpeculosTransport>> {
    Ok(crate::device::open(&config.device_settings())?)
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("\x1b[31mError:\x1b[0m {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let config = WalletConfig::default();
        let node = NodeOptions {
            node: Some("http://localhost:9650".to_string()),
            asset: None,
        };
        let device = DeviceOptions {
            device: None,
            account: Some(4),
        };

        let resolved = resolve(&config, Some(&node), Some(&device)).unwrap();
        assert_eq!(resolved.node_url, "http://localhost:9650");
        assert_eq!(resolved.account, 4);
        assert_eq!(resolved.asset_id, config.asset_id);
        assert_eq!(resolved.device_url, config.device_url);
    }

    #[test]
    fn test_overrides_are_validated() {
        let device = DeviceOptions {
            device: Some(String::new()),
            account: None,
        };
        assert!(resolve(&WalletConfig::default(), None, Some(&device)).is_err());
    }
}
