//! Hardware signing device.
//!
//! The device holds the account's private keys. The wallet asks it for
//! public key material to derive addresses and for one signature per
//! transaction input; it never sees a private key.

pub mod apdu;
pub mod ledger;
pub mod speculos;

pub use apdu::{ApduAnswer, ApduCommand, ApduTransport};
pub use ledger::LedgerApp;
pub use speculos::SpeculosTransport;

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::config::DeviceSettings;
use crate::error::{DeviceError, WalletResult};
use crate::keys::{AccountKey, Bip32Path};

/// Public key and chain code at a derivation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    pub public_key: Vec<u8>,
    pub chain_code: Vec<u8>,
}

/// Operations the wallet needs from a signing device.
///
/// Methods take `&mut self`: a device session handles one request at a time
/// and must not be shared between concurrent operations.
#[async_trait]
pub trait SigningDevice: Send {
    /// Identifier of the wallet seed loaded on the device
    async fn wallet_id(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// Public key at `path`
    async fn get_public_key(&mut self, path: &Bip32Path) -> Result<Vec<u8>, DeviceError>;

    /// Public key and chain code at `path`
    async fn get_extended_public_key(
        &mut self,
        path: &Bip32Path,
    ) -> Result<ExtendedPublicKey, DeviceError>;

    /// Sign a 32 byte hash with the key at `path`
    async fn sign_hash(&mut self, path: &Bip32Path, hash: &[u8; 32])
        -> Result<Vec<u8>, DeviceError>;
}

/// Open the configured device.
pub fn open(settings: &DeviceSettings) -> Result<LedgerApp<SpeculosTransport>, DeviceError> {
    let transport = SpeculosTransport::new(
        &settings.url,
        Duration::from_secs(settings.request_timeout_secs),
    )?;
    Ok(LedgerApp::new(transport))
}

/// Fetch the account-level extended public key and build an [`AccountKey`].
pub async fn load_account_key<D: SigningDevice + ?Sized>(
    device: &mut D,
    account: u32,
    chain_alias: &str,
) -> WalletResult<AccountKey> {
    let path = Bip32Path::account(account)?;
    info!(path = %path, "Fetching account key from device");

    let extended = device.get_extended_public_key(&path).await?;
    AccountKey::from_parts(
        account,
        &extended.public_key,
        &extended.chain_code,
        chain_alias,
    )
}
