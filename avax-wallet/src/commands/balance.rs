//! Balance commands

use anyhow::Result;
use tracing::info;

use crate::amount::Amount;
use crate::balance::{AddressBalance, BalanceAggregator};
use crate::config::WalletConfig;
use crate::device::{load_account_key, SigningDevice};
use crate::error::WalletResult;
use crate::node::NodeClient;
use crate::scan::AddressScanner;
use crate::utxo::{Address, AssetId};

use super::{connect_node, open_device, resolve, DeviceOptions, NodeOptions};

/// Print the balance of a single address
pub async fn run(config: &WalletConfig, options: &NodeOptions, address: &str) -> Result<()> {
    let config = resolve(config, Some(options), None)?;
    let node = connect_node(&config)?;

    let balance = node
        .get_balance(&Address::from(address), &config.node_settings().asset_id)
        .await?;
    println!("{}", balance);
    Ok(())
}

/// Print the total balance of the device's account.
///
/// With `accounts`, each funded address is listed on stderr as
/// `chain/index address amount` before the total.
pub async fn run_wallet(
    config: &WalletConfig,
    node_options: &NodeOptions,
    device_options: &DeviceOptions,
    accounts: bool,
) -> Result<()> {
    let config = resolve(config, Some(node_options), Some(device_options))?;
    let node = connect_node(&config)?;
    let mut device = open_device(&config)?;

    let (total, breakdown) = wallet_balance(
        &node,
        &mut device,
        config.account,
        &config.chain_alias,
        &config.node_settings().asset_id,
        accounts,
    )
    .await?;

    for entry in &breakdown {
        eprintln!("{} {} {}", entry.path, entry.address, entry.amount);
    }
    println!("{}", total);
    Ok(())
}

/// Scan the account and sum its balance of `asset_id`.
pub async fn wallet_balance<N, D>(
    node: &N,
    device: &mut D,
    account: u32,
    chain_alias: &str,
    asset_id: &AssetId,
    breakdown: bool,
) -> WalletResult<(Amount, Vec<AddressBalance>)>
where
    N: NodeClient + ?Sized,
    D: SigningDevice + ?Sized,
{
    let key = load_account_key(device, account, chain_alias).await?;

    let mut aggregator = BalanceAggregator::new(asset_id.clone());
    if breakdown {
        aggregator = aggregator.with_breakdown();
    }

    info!("Discovering accounts...");
    AddressScanner::new(node, &key).scan(&mut aggregator).await?;

    Ok((aggregator.total(), aggregator.breakdown().to_vec()))
}
