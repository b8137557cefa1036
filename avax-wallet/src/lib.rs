//! Avalanche X-Chain Hardware Wallet
//!
//! A command line wallet whose keys live on a Ledger device. The wallet
//! derives addresses from the account's extended public key, discovers
//! funded addresses with a gap-limit scan against a node, and has the device
//! sign each transaction input.
//!
//! ## Security Model
//!
//! - Private keys never leave the device
//! - Every signature is confirmed by the user on the device
//! - The node is trusted for UTXO data and transaction construction

pub mod amount;
pub mod balance;
pub mod config;
pub mod device;
pub mod error;
pub mod frontier;
pub mod keys;
pub mod node;
pub mod scan;
pub mod signing;
pub mod transfer;
pub mod utxo;

pub mod commands;

pub use amount::Amount;
pub use config::WalletConfig;
pub use error::{DeviceError, NodeError, WalletError, WalletResult};
pub use keys::{AccountKey, Bip32Path, Chain, DerivationPath, DerivedAddress};
pub use node::{NodeClient, RpcNodeClient};
pub use device::SigningDevice;
pub use scan::{AddressScanner, ScanBatch, ScanVisitor, INDEX_RANGE, SCAN_SIZE};
pub use utxo::{Address, AssetId, TxId, Utxo, UtxoId, UtxoSet};
