//! Transaction signing with the hardware device.
//!
//! The node builds the unsigned transaction; this module maps each input
//! back to the derivation path that owns its UTXO and asks the device for
//! one signature per signature slot. Requests are strictly sequential and
//! any failure discards every signature collected so far.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::device::SigningDevice;
use crate::error::{WalletError, WalletResult};
use crate::keys::{Bip32Path, DerivationPath};
use crate::utxo::UtxoId;

/// One input of an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    /// UTXO being spent
    pub utxo_id: UtxoId,
    /// Credential type id expected for this input
    pub credential_type: u32,
    /// Owner indices that must sign; one signature per entry
    pub signature_indices: Vec<u32>,
}

/// A transaction as built by the node, before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// Serialized transaction
    pub bytes: Vec<u8>,
    pub inputs: Vec<TransactionInput>,
}

impl UnsignedTransaction {
    /// SHA-256 of the serialized transaction
    pub fn signing_hash(&self) -> [u8; 32] {
        Sha256::digest(&self.bytes).into()
    }
}

/// A device signature and the path it was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathKeyedSignature {
    pub path: DerivationPath,
    pub signature: Vec<u8>,
}

/// Signatures authorizing one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub credential_type: u32,
    pub signatures: Vec<PathKeyedSignature>,
}

/// An unsigned transaction paired 1:1 with its credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub unsigned: UnsignedTransaction,
    pub credentials: Vec<Credential>,
}

/// Sign every input of `unsigned` with the device.
///
/// All input paths are resolved before the first device request, so an
/// unknown UTXO never leaves the device with a half-signed transaction.
pub async fn sign_transaction<D: SigningDevice + ?Sized>(
    device: &mut D,
    account: u32,
    unsigned: UnsignedTransaction,
    utxo_paths: &BTreeMap<UtxoId, DerivationPath>,
) -> WalletResult<SignedTransaction> {
    let paths = unsigned
        .inputs
        .iter()
        .map(|input| {
            utxo_paths
                .get(&input.utxo_id)
                .copied()
                .ok_or_else(|| WalletError::MissingSigningPath(input.utxo_id.clone()))
        })
        .collect::<WalletResult<Vec<DerivationPath>>>()?;

    let hash = unsigned.signing_hash();
    let mut credentials = Vec::with_capacity(unsigned.inputs.len());

    for (input, path) in unsigned.inputs.iter().zip(paths) {
        let full_path = Bip32Path::for_address(account, &path)?;
        let mut signatures = Vec::with_capacity(input.signature_indices.len());

        for _ in &input.signature_indices {
            info!(
                hash = %hex::encode_upper(hash),
                path = %full_path,
                "Signing hash. Please verify on your ledger device"
            );
            let signature = device.sign_hash(&full_path, &hash).await?;
            debug!(utxo = %input.utxo_id, path = %path, "Input signed");
            signatures.push(PathKeyedSignature { path, signature });
        }

        credentials.push(Credential {
            credential_type: input.credential_type,
            signatures,
        });
    }

    Ok(SignedTransaction {
        unsigned,
        credentials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ExtendedPublicKey;
    use crate::error::DeviceError;
    use async_trait::async_trait;

    /// Device that signs by echoing a counter and records each request.
    #[derive(Default)]
    struct RecordingDevice {
        requests: Vec<(String, [u8; 32])>,
        reject_at: Option<usize>,
    }

    #[async_trait]
    impl SigningDevice for RecordingDevice {
        async fn wallet_id(&mut self) -> Result<Vec<u8>, DeviceError> {
            Ok(vec![1, 2, 3, 4, 5, 6])
        }

        async fn get_public_key(&mut self, _: &Bip32Path) -> Result<Vec<u8>, DeviceError> {
            unimplemented!()
        }

        async fn get_extended_public_key(
            &mut self,
            _: &Bip32Path,
        ) -> Result<ExtendedPublicKey, DeviceError> {
            unimplemented!()
        }

        async fn sign_hash(
            &mut self,
            path: &Bip32Path,
            hash: &[u8; 32],
        ) -> Result<Vec<u8>, DeviceError> {
            if Some(self.requests.len()) == self.reject_at {
                return Err(DeviceError::UserRejected);
            }
            self.requests.push((path.to_string(), *hash));
            Ok(vec![self.requests.len() as u8; 65])
        }
    }

    fn input(id: &str, signatures: usize) -> TransactionInput {
        TransactionInput {
            utxo_id: id.into(),
            credential_type: 9,
            signature_indices: (0..signatures as u32).collect(),
        }
    }

    fn paths() -> BTreeMap<UtxoId, DerivationPath> {
        BTreeMap::from([
            ("a".into(), DerivationPath::internal(0)),
            ("b".into(), DerivationPath::external(2)),
            ("c".into(), DerivationPath::external(7)),
        ])
    }

    #[tokio::test]
    async fn test_inputs_are_signed_in_order() {
        let unsigned = UnsignedTransaction {
            bytes: vec![0xde, 0xad, 0xbe, 0xef],
            inputs: vec![input("c", 1), input("a", 1), input("b", 1)],
        };
        let hash = unsigned.signing_hash();
        let mut device = RecordingDevice::default();

        let signed = sign_transaction(&mut device, 0, unsigned, &paths())
            .await
            .unwrap();

        let requested: Vec<&str> = device.requests.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            requested,
            vec!["m/44'/9000'/0'/0/7", "m/44'/9000'/0'/1/0", "m/44'/9000'/0'/0/2"]
        );
        assert!(device.requests.iter().all(|(_, h)| *h == hash));

        assert_eq!(signed.credentials.len(), 3);
        for (n, credential) in signed.credentials.iter().enumerate() {
            assert_eq!(credential.credential_type, 9);
            assert_eq!(credential.signatures.len(), 1);
            assert_eq!(credential.signatures[0].signature[0], n as u8 + 1);
        }
        assert_eq!(
            signed.credentials[1].signatures[0].path,
            DerivationPath::internal(0)
        );
    }

    #[tokio::test]
    async fn test_multi_signature_input() {
        let unsigned = UnsignedTransaction {
            bytes: vec![1],
            inputs: vec![input("a", 2)],
        };
        let mut device = RecordingDevice::default();

        let signed = sign_transaction(&mut device, 3, unsigned, &paths())
            .await
            .unwrap();

        assert_eq!(device.requests.len(), 2);
        assert_eq!(device.requests[0].0, "m/44'/9000'/3'/1/0");
        assert_eq!(signed.credentials[0].signatures.len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_aborts_signing() {
        let unsigned = UnsignedTransaction {
            bytes: vec![1],
            inputs: vec![input("a", 1), input("b", 1), input("c", 1)],
        };
        let mut device = RecordingDevice {
            reject_at: Some(1),
            ..Default::default()
        };

        let result = sign_transaction(&mut device, 0, unsigned, &paths()).await;

        assert!(matches!(
            result,
            Err(WalletError::Device(DeviceError::UserRejected))
        ));
        assert_eq!(device.requests.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_utxo_fails_before_any_device_request() {
        let unsigned = UnsignedTransaction {
            bytes: vec![1],
            inputs: vec![input("a", 1), input("zz", 1)],
        };
        let mut device = RecordingDevice::default();

        let result = sign_transaction(&mut device, 0, unsigned, &paths()).await;

        assert!(matches!(result, Err(WalletError::MissingSigningPath(id)) if id.as_str() == "zz"));
        assert!(device.requests.is_empty());
    }
}
