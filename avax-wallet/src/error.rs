//! Error types for the wallet core.
//!
//! Device and node failures are kept in their own enums so that callers can
//! tell the two external collaborators apart; everything else is a
//! [`WalletError`].

use displaydoc::Display;
use thiserror::Error;

use crate::utxo::UtxoId;

/// Errors raised while talking to the hardware signing device.
#[derive(Debug, Display, Error)]
pub enum DeviceError {
    /// Device transport failed: {0}
    Transport(String),

    /// Request was rejected on the device
    UserRejected,

    /// Device returned status word {0:#06x}
    Status(u16),

    /// Malformed device response: {0}
    MalformedResponse(String),

    /// Device returned an invalid public key: {0}
    InvalidPublicKey(String),

    /// APDU payload of {0} bytes exceeds the 255 byte limit
    PayloadTooLarge(usize),
}

/// Errors raised by the node API client.
#[derive(Debug, Display, Error)]
pub enum NodeError {
    /// HTTP request failed: {0}
    Http(String),

    /// Node returned RPC error {code}: {message}
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// Malformed node response: {0}
    MalformedResponse(String),
}

impl From<reqwest::Error> for NodeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NodeError::MalformedResponse(err.to_string())
        } else {
            NodeError::Http(err.to_string())
        }
    }
}

/// Errors produced by the wallet core.
#[derive(Debug, Display, Error)]
pub enum WalletError {
    /// {0}
    Device(#[from] DeviceError),

    /// {0}
    Node(#[from] NodeError),

    /// Couldn't parse amount "{input}": {reason}. Hint: Amount should be an integer, specified in nanoAVAX.
    InvalidAmount {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Key derivation failed: {0}
    Derivation(String),

    /// Invalid derivation path "{0}"
    InvalidPath(String),

    /// Invalid address "{0}"
    InvalidAddress(String),

    /// Scan returned no addresses
    EmptyScan,

    /// Every scanned address is in use
    NoUnusedAddress,

    /// No derivation path is known for UTXO {0}
    MissingSigningPath(UtxoId),

    /// Amount overflow
    AmountOverflow,

    /// Configuration error: {0}
    Config(String),
}

impl From<bip32::Error> for WalletError {
    fn from(err: bip32::Error) -> Self {
        WalletError::Derivation(err.to_string())
    }
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
