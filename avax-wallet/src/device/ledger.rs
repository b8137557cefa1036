//! Avalanche Ledger app commands.

use async_trait::async_trait;
use tracing::debug;

use super::apdu::{ApduCommand, ApduTransport};
use super::{ExtendedPublicKey, SigningDevice};
use crate::error::DeviceError;
use crate::keys::Bip32Path;

const CLA: u8 = 0x80;
const INS_GET_WALLET_ID: u8 = 0x01;
const INS_GET_PUBLIC_KEY: u8 = 0x02;
const INS_GET_EXTENDED_PUBLIC_KEY: u8 = 0x03;
const INS_SIGN_HASH: u8 = 0x04;

const HASH_LEN: usize = 32;

/// The Avalanche app on a Ledger device, reached through `T`.
pub struct LedgerApp<T: ApduTransport> {
    transport: T,
}

impl<T: ApduTransport> LedgerApp<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn send(&mut self, ins: u8, data: Vec<u8>) -> Result<Vec<u8>, DeviceError> {
        let command = ApduCommand {
            cla: CLA,
            ins,
            p1: 0,
            p2: 0,
            data,
        };
        debug!(ins, len = command.data.len(), "Sending APDU");
        self.transport.exchange(&command).await?.into_data()
    }
}

/// Split a `[len][bytes]` field off the front of `data`.
fn take_prefixed<'a>(data: &mut &'a [u8], field: &str) -> Result<&'a [u8], DeviceError> {
    let current: &'a [u8] = data;
    let (&len, rest) = current
        .split_first()
        .ok_or_else(|| DeviceError::MalformedResponse(format!("missing {field} length")))?;
    let len = len as usize;
    if rest.len() < len {
        return Err(DeviceError::MalformedResponse(format!(
            "{field} truncated: expected {len} bytes, got {}",
            rest.len()
        )));
    }
    let (value, rest) = rest.split_at(len);
    *data = rest;
    Ok(value)
}

#[async_trait]
impl<T: ApduTransport> SigningDevice for LedgerApp<T> {
    async fn wallet_id(&mut self) -> Result<Vec<u8>, DeviceError> {
        self.send(INS_GET_WALLET_ID, Vec::new()).await
    }

    async fn get_public_key(&mut self, path: &Bip32Path) -> Result<Vec<u8>, DeviceError> {
        let public_key = self.send(INS_GET_PUBLIC_KEY, path.to_apdu_bytes()).await?;
        if public_key.is_empty() {
            return Err(DeviceError::InvalidPublicKey("empty".to_string()));
        }
        Ok(public_key)
    }

    async fn get_extended_public_key(
        &mut self,
        path: &Bip32Path,
    ) -> Result<ExtendedPublicKey, DeviceError> {
        let answer = self
            .send(INS_GET_EXTENDED_PUBLIC_KEY, path.to_apdu_bytes())
            .await?;

        let mut rest = answer.as_slice();
        let public_key = take_prefixed(&mut rest, "public key")?.to_vec();
        let chain_code = take_prefixed(&mut rest, "chain code")?.to_vec();

        if public_key.is_empty() {
            return Err(DeviceError::InvalidPublicKey("empty".to_string()));
        }

        Ok(ExtendedPublicKey {
            public_key,
            chain_code,
        })
    }

    async fn sign_hash(
        &mut self,
        path: &Bip32Path,
        hash: &[u8; 32],
    ) -> Result<Vec<u8>, DeviceError> {
        let mut data = path.to_apdu_bytes();
        data.extend_from_slice(hash);

        let answer = self.send(INS_SIGN_HASH, data).await?;
        if answer.len() <= HASH_LEN {
            return Err(DeviceError::MalformedResponse(format!(
                "signature answer of {} bytes",
                answer.len()
            )));
        }

        let (echoed, signature) = answer.split_at(HASH_LEN);
        if echoed != hash {
            return Err(DeviceError::MalformedResponse(
                "device signed a different hash".to_string(),
            ));
        }
        Ok(signature.to_vec())
    }
}
