//! Key Derivation
//!
//! Derives X-Chain addresses from the account-level extended public key
//! exported by the hardware device. Only public derivation happens here: the
//! private keys never leave the device.
//!
//! Derivation is a pure function of the account key and the
//! `change/address_index` pair, so repeated scans always agree on the
//! addresses they produce.

use bip32::{ChildNumber, ExtendedKey, ExtendedKeyAttrs, Prefix, XPub};
use k256::ecdsa::VerifyingKey;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

use crate::error::{WalletError, WalletResult};
use crate::utxo::Address;

/// BIP44 purpose
pub const BIP44_PURPOSE: u32 = 44;

/// SLIP-0044 coin type for AVAX
pub const AVAX_COIN_TYPE: u32 = 9000;

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// Ledger apps refuse paths deeper than this
const MAX_PATH_DEPTH: usize = 10;

const CB58_CHECKSUM_LEN: usize = 4;

/// The two sub-chains of an account key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Chain {
    /// Receiving addresses (`0`)
    External,
    /// Change addresses (`1`)
    Internal,
}

impl Chain {
    /// The BIP44 `change` component
    pub fn index(self) -> u32 {
        match self {
            Chain::External => 0,
            Chain::Internal => 1,
        }
    }
}

/// A `change/address_index` path relative to the account key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DerivationPath {
    pub chain: Chain,
    pub index: u32,
}

impl DerivationPath {
    pub fn new(chain: Chain, index: u32) -> Self {
        Self { chain, index }
    }

    pub fn external(index: u32) -> Self {
        Self::new(Chain::External, index)
    }

    pub fn internal(index: u32) -> Self {
        Self::new(Chain::Internal, index)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chain.index(), self.index)
    }
}

/// A full BIP32 path such as `m/44'/9000'/0'/0/5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bip32Path(Vec<u32>);

impl Bip32Path {
    /// `m/44'/9000'/{account}'`
    pub fn account(account: u32) -> WalletResult<Self> {
        if account >= HARDENED {
            return Err(WalletError::InvalidPath(format!("account {account}")));
        }
        Ok(Self(vec![
            BIP44_PURPOSE | HARDENED,
            AVAX_COIN_TYPE | HARDENED,
            account | HARDENED,
        ]))
    }

    /// `m/44'/9000'/{account}'/{change}/{index}`
    pub fn for_address(account: u32, path: &DerivationPath) -> WalletResult<Self> {
        let mut full = Self::account(account)?;
        full.0.push(path.chain.index());
        full.0.push(path.index);
        Ok(full)
    }

    /// Append an `account'/change/address_index` suffix to `m/44'/9000'/`.
    pub fn from_suffix(suffix: &str) -> WalletResult<Self> {
        let suffix: Bip32Path = suffix.parse()?;
        let mut components = vec![BIP44_PURPOSE | HARDENED, AVAX_COIN_TYPE | HARDENED];
        components.extend(suffix.0);
        Self::from_components(components)
    }

    fn from_components(components: Vec<u32>) -> WalletResult<Self> {
        if components.len() > MAX_PATH_DEPTH {
            return Err(WalletError::InvalidPath(format!(
                "{} components exceeds the maximum of {}",
                components.len(),
                MAX_PATH_DEPTH
            )));
        }
        Ok(Self(components))
    }

    /// Raw components, hardened ones with the top bit set
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// APDU encoding: component count followed by big-endian components
    pub fn to_apdu_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 4 * self.0.len());
        bytes.push(self.0.len() as u8);
        for component in &self.0 {
            bytes.extend_from_slice(&component.to_be_bytes());
        }
        bytes
    }
}

impl FromStr for Bip32Path {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("m/")
            .or_else(|| trimmed.strip_prefix("M/"))
            .unwrap_or(trimmed);

        if body.is_empty() || body == "m" {
            return Err(WalletError::InvalidPath(s.to_string()));
        }

        let components = body
            .split('/')
            .map(|part| {
                let (digits, hardened) = match part
                    .strip_suffix('\'')
                    .or_else(|| part.strip_suffix('h'))
                {
                    Some(digits) => (digits, true),
                    None => (part, false),
                };
                let value: u32 = digits
                    .parse()
                    .map_err(|_| WalletError::InvalidPath(s.to_string()))?;
                if value >= HARDENED {
                    return Err(WalletError::InvalidPath(s.to_string()));
                }
                Ok(if hardened { value | HARDENED } else { value })
            })
            .collect::<WalletResult<Vec<u32>>>()?;

        Self::from_components(components)
    }
}

impl fmt::Display for Bip32Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for component in &self.0 {
            if component & HARDENED != 0 {
                write!(f, "/{}'", component & !HARDENED)?;
            } else {
                write!(f, "/{}", component)?;
            }
        }
        Ok(())
    }
}

/// An address derived from the account key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAddress {
    pub path: DerivationPath,
    pub public_key_hash: [u8; 20],
    pub address: Address,
}

/// Account-level extended public key, positioned at `m/44'/9000'/{account}'`.
///
/// The external and internal chain keys are derived once up front; every
/// address derivation after that is a single public child derivation.
#[derive(Clone)]
pub struct AccountKey {
    account: u32,
    chain_alias: String,
    external: XPub,
    internal: XPub,
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey")
            .field("account", &self.account)
            .field("chain_alias", &self.chain_alias)
            .finish()
    }
}

impl AccountKey {
    /// Build the account key from the public key and chain code exported by
    /// the device. The public key may be SEC1 compressed or uncompressed.
    pub fn from_parts(
        account: u32,
        public_key: &[u8],
        chain_code: &[u8],
        chain_alias: &str,
    ) -> WalletResult<Self> {
        let chain_code: [u8; 32] = chain_code.try_into().map_err(|_| {
            WalletError::Derivation(format!(
                "chain code must be 32 bytes, got {}",
                chain_code.len()
            ))
        })?;

        let extended = ExtendedKey {
            prefix: Prefix::XPUB,
            attrs: ExtendedKeyAttrs {
                depth: 3,
                parent_fingerprint: [0u8; 4],
                child_number: ChildNumber::new(account, true)?,
                chain_code,
            },
            key_bytes: compress_public_key(public_key)?,
        };
        let account_key = XPub::try_from(extended)?;

        Ok(Self {
            account,
            chain_alias: chain_alias.to_string(),
            external: account_key.derive_child(ChildNumber::new(Chain::External.index(), false)?)?,
            internal: account_key.derive_child(ChildNumber::new(Chain::Internal.index(), false)?)?,
        })
    }

    /// The hardened account index this key belongs to
    pub fn account(&self) -> u32 {
        self.account
    }

    /// The chain alias used as address prefix
    pub fn chain_alias(&self) -> &str {
        &self.chain_alias
    }

    /// Derive the address at `path`.
    pub fn derive(&self, path: DerivationPath) -> WalletResult<DerivedAddress> {
        let chain_key = match path.chain {
            Chain::External => &self.external,
            Chain::Internal => &self.internal,
        };
        let child = chain_key.derive_child(ChildNumber::new(path.index, false)?)?;
        let public_key_hash = public_key_hash(&child.to_bytes());

        Ok(DerivedAddress {
            path,
            public_key_hash,
            address: format_address(&self.chain_alias, &public_key_hash),
        })
    }

    /// Derive `count` consecutive addresses on `chain` starting at `start`.
    pub fn derive_range(
        &self,
        chain: Chain,
        start: u32,
        count: u32,
    ) -> WalletResult<Vec<DerivedAddress>> {
        (0..count)
            .map(|offset| {
                let index = start.checked_add(offset).ok_or_else(|| {
                    WalletError::Derivation("address index overflow".to_string())
                })?;
                self.derive(DerivationPath::new(chain, index))
            })
            .collect()
    }
}

/// SEC1-encode a public key in compressed form.
pub fn compress_public_key(public_key: &[u8]) -> WalletResult<[u8; 33]> {
    let key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| WalletError::Derivation(format!("invalid public key: {e}")))?;
    key.to_encoded_point(true)
        .as_bytes()
        .try_into()
        .map_err(|_| WalletError::Derivation("unexpected compressed key length".to_string()))
}

/// `RIPEMD160(SHA256(compressed_public_key))`
pub fn public_key_hash(compressed_public_key: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(compressed_public_key);
    Ripemd160::digest(sha).into()
}

/// Address for a public key in any SEC1 encoding.
pub fn address_from_public_key(chain_alias: &str, public_key: &[u8]) -> WalletResult<Address> {
    let compressed = compress_public_key(public_key)?;
    Ok(format_address(chain_alias, &public_key_hash(&compressed)))
}

/// `{alias}-{cb58(public_key_hash)}`
pub fn format_address(chain_alias: &str, public_key_hash: &[u8; 20]) -> Address {
    Address::new(format!("{}-{}", chain_alias, cb58_encode(public_key_hash)))
}

/// Recover the public key hash from an address string.
pub fn parse_address(address: &str) -> WalletResult<[u8; 20]> {
    let (_, encoded) = address
        .split_once('-')
        .ok_or_else(|| WalletError::InvalidAddress(address.to_string()))?;
    cb58_decode(encoded)?
        .try_into()
        .map_err(|_| WalletError::InvalidAddress(address.to_string()))
}

/// Base58 with a 4 byte SHA-256 checksum suffix.
pub fn cb58_encode(payload: &[u8]) -> String {
    let checksum = Sha256::digest(payload);
    let mut bytes = Vec::with_capacity(payload.len() + CB58_CHECKSUM_LEN);
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&checksum[checksum.len() - CB58_CHECKSUM_LEN..]);
    bs58::encode(bytes).into_string()
}

/// Decode a CB58 string, verifying its checksum.
pub fn cb58_decode(encoded: &str) -> WalletResult<Vec<u8>> {
    let invalid = || WalletError::InvalidAddress(encoded.to_string());
    let mut bytes = bs58::decode(encoded).into_vec().map_err(|_| invalid())?;
    if bytes.len() < CB58_CHECKSUM_LEN {
        return Err(invalid());
    }

    let checksum = bytes.split_off(bytes.len() - CB58_CHECKSUM_LEN);
    let expected = Sha256::digest(&bytes);
    if checksum[..] != expected[expected.len() - CB58_CHECKSUM_LEN..] {
        return Err(invalid());
    }
    Ok(bytes)
}
