//! Device inspection commands

use anyhow::Result;

use crate::config::WalletConfig;
use crate::device::SigningDevice;
use crate::keys::{address_from_public_key, Bip32Path};

use super::{open_device, resolve, DeviceOptions};

/// Print the id of the wallet loaded on the device
pub async fn wallet_id(config: &WalletConfig, options: &DeviceOptions) -> Result<()> {
    let config = resolve(config, None, Some(options))?;
    let mut device = open_device(&config)?;

    let id = device.wallet_id().await?;
    println!("{}", hex::encode(id));
    Ok(())
}

/// Print the public key at `m/44'/9000'/{suffix}` and its address
pub async fn public_key(config: &WalletConfig, options: &DeviceOptions, suffix: &str) -> Result<()> {
    let path = Bip32Path::from_suffix(suffix)?;
    let config = resolve(config, None, Some(options))?;
    let mut device = open_device(&config)?;

    let key = device.get_public_key(&path).await?;
    let address = address_from_public_key(&config.chain_alias, &key)?;
    println!("{}", hex::encode(&key));
    println!("{}", address);
    Ok(())
}

/// Print the public key and chain code at `m/44'/9000'/{suffix}`
pub async fn extended_public_key(
    config: &WalletConfig,
    options: &DeviceOptions,
    suffix: &str,
) -> Result<()> {
    let path = Bip32Path::from_suffix(suffix)?;
    let config = resolve(config, None, Some(options))?;
    let mut device = open_device(&config)?;

    let key = device.get_extended_public_key(&path).await?;
    println!("public_key: {}", hex::encode(&key.public_key));
    println!("chain_code: {}", hex::encode(&key.chain_code));
    Ok(())
}
