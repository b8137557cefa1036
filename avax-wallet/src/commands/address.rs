//! Frontier address commands

use anyhow::Result;
use tracing::info;

use crate::config::WalletConfig;
use crate::device::{load_account_key, SigningDevice};
use crate::error::WalletResult;
use crate::frontier::{Frontier, FrontierResolver};
use crate::keys::Chain;
use crate::node::NodeClient;
use crate::scan::AddressScanner;

use super::{connect_node, open_device, resolve, DeviceOptions, NodeOptions};

/// Print the next unused address on `chain`
pub async fn run(
    config: &WalletConfig,
    node_options: &NodeOptions,
    device_options: &DeviceOptions,
    chain: Chain,
) -> Result<()> {
    let config = resolve(config, Some(node_options), Some(device_options))?;
    let node = connect_node(&config)?;
    let mut device = open_device(&config)?;

    let frontier = frontier(&node, &mut device, config.account, &config.chain_alias).await?;
    let address = match chain {
        Chain::External => &frontier.external,
        Chain::Internal => &frontier.internal,
    };

    info!(path = %address.path, "Next unused address");
    println!("{}", address.address);
    Ok(())
}

/// Scan the account and resolve its frontier address pair.
pub async fn frontier<N, D>(
    node: &N,
    device: &mut D,
    account: u32,
    chain_alias: &str,
) -> WalletResult<Frontier>
where
    N: NodeClient + ?Sized,
    D: SigningDevice + ?Sized,
{
    let key = load_account_key(device, account, chain_alias).await?;

    let mut resolver = FrontierResolver::new();
    AddressScanner::new(node, &key).scan(&mut resolver).await?;
    resolver.resolve()
}
