//! Transfer command

use anyhow::Result;
use tracing::info;

use crate::amount::{parse_amount, Amount};
use crate::config::WalletConfig;
use crate::device::{load_account_key, SigningDevice};
use crate::error::WalletResult;
use crate::frontier::FrontierResolver;
use crate::node::NodeClient;
use crate::scan::AddressScanner;
use crate::signing::sign_transaction;
use crate::transfer::TransferPreparer;
use crate::utxo::{Address, AssetId, TxId};

use super::{connect_node, open_device, resolve, DeviceOptions, NodeOptions};

/// Transfer `amount` nanoAVAX to `to` and print the transaction id
pub async fn run(
    config: &WalletConfig,
    node_options: &NodeOptions,
    device_options: &DeviceOptions,
    amount: &str,
    to: &str,
) -> Result<()> {
    // Reject a bad amount before touching the network or the device.
    let amount = parse_amount(amount)?;

    let config = resolve(config, Some(node_options), Some(device_options))?;
    let node = connect_node(&config)?;
    let mut device = open_device(&config)?;

    let tx_id = transfer(
        &node,
        &mut device,
        config.account,
        &config.chain_alias,
        &config.node_settings().asset_id,
        amount,
        &Address::from(to),
    )
    .await?;

    println!("{}", tx_id);
    Ok(())
}

/// Discover the account's funds, then build, sign and submit a transfer.
///
/// Change goes to the internal chain's frontier address.
pub async fn transfer<N, D>(
    node: &N,
    device: &mut D,
    account: u32,
    chain_alias: &str,
    asset_id: &AssetId,
    amount: Amount,
    to: &Address,
) -> WalletResult<TxId>
where
    N: NodeClient + ?Sized,
    D: SigningDevice + ?Sized,
{
    let key = load_account_key(&mut *device, account, chain_alias).await?;

    info!("Discovering accounts...");
    let mut consumers = (TransferPreparer::new(), FrontierResolver::new());
    AddressScanner::new(node, &key).scan(&mut consumers).await?;
    let (preparer, resolver) = consumers;

    let prepared = preparer.finish();
    let change = resolver.resolve()?.internal.address;
    info!(utxos = prepared.utxos.len(), change = %change, "Building TX...");

    let unsigned = node
        .build_transaction(
            &prepared.utxos,
            amount,
            std::slice::from_ref(to),
            &prepared.ordered_addresses,
            std::slice::from_ref(&change),
            asset_id,
        )
        .await?;

    let signed = sign_transaction(device, account, unsigned, &prepared.utxo_paths).await?;

    info!("Issuing TX...");
    Ok(node.submit_transaction(&signed).await?)
}
