//! UTXO listing command

use anyhow::Result;

use crate::config::WalletConfig;
use crate::node::NodeClient;
use crate::utxo::Address;

use super::{connect_node, resolve, NodeOptions};

/// Print the UTXOs of a single address as JSON
pub async fn run(config: &WalletConfig, options: &NodeOptions, address: &str) -> Result<()> {
    let config = resolve(config, Some(options), None)?;
    let node = connect_node(&config)?;

    let utxos = node.get_utxos(&[Address::from(address)]).await?;
    for utxo in utxos.iter() {
        println!("{}", serde_json::to_string(utxo)?);
    }
    Ok(())
}
