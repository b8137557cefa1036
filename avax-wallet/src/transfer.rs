//! Transfer preparation.
//!
//! Collects everything the transaction builder and the signer need from one
//! scan: the discovered UTXOs, the from-address list in preference order and
//! the derivation path owning each UTXO.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::warn;

use crate::error::WalletResult;
use crate::keys::DerivationPath;
use crate::scan::{ScanBatch, ScanVisitor};
use crate::utxo::{Address, UtxoId, UtxoSet};

/// Inputs for building and signing a transfer.
///
/// Every UTXO in `utxos` has an entry in `utxo_paths`.
#[derive(Debug, Clone, Default)]
pub struct PreparedTransfer {
    pub utxos: UtxoSet,
    /// Internal chain addresses then external chain addresses, each ascending
    pub ordered_addresses: Vec<Address>,
    pub utxo_paths: BTreeMap<UtxoId, DerivationPath>,
}

impl PreparedTransfer {
    /// Path owning `id`
    pub fn path_of(&self, id: &UtxoId) -> Option<DerivationPath> {
        self.utxo_paths.get(id).copied()
    }
}

/// Accumulates a [`PreparedTransfer`] over the windows of a scan.
#[derive(Debug, Default)]
pub struct TransferPreparer {
    utxos: UtxoSet,
    external: Vec<Address>,
    internal: Vec<Address>,
    utxo_paths: BTreeMap<UtxoId, DerivationPath>,
}

impl TransferPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> PreparedTransfer {
        let mut ordered_addresses = self.internal;
        ordered_addresses.extend(self.external);

        PreparedTransfer {
            utxos: self.utxos,
            ordered_addresses,
            utxo_paths: self.utxo_paths,
        }
    }
}

impl ScanVisitor for TransferPreparer {
    fn visit(&mut self, batch: &ScanBatch) -> WalletResult<()> {
        self.utxos.extend(&batch.utxos);
        self.external
            .extend(batch.external.iter().map(|derived| derived.address.clone()));
        self.internal
            .extend(batch.internal.iter().map(|derived| derived.address.clone()));

        // Addresses map 1:1 to paths, so a UTXO id has exactly one owner.
        for derived in batch.addresses() {
            for id in batch.utxos.ids_owned_by(&derived.address) {
                match self.utxo_paths.entry(id.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(derived.path);
                    }
                    Entry::Occupied(entry) if *entry.get() != derived.path => {
                        warn!(
                            utxo = %id,
                            kept = %entry.get(),
                            ignored = %derived.path,
                            "UTXO reported under two derivation paths"
                        );
                    }
                    Entry::Occupied(_) => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::keys::tests::test_account_key;
    use crate::keys::{AccountKey, Chain};
    use crate::utxo::Utxo;

    fn batch(key: &AccountKey, start: u32, funded: &[(&str, DerivationPath)]) -> ScanBatch {
        ScanBatch {
            start,
            external: key.derive_range(Chain::External, start, 3).unwrap(),
            internal: key.derive_range(Chain::Internal, start, 3).unwrap(),
            utxos: funded
                .iter()
                .map(|(id, path)| Utxo {
                    id: (*id).into(),
                    address: key.derive(*path).unwrap().address,
                    asset_id: "AVAX".into(),
                    amount: Amount::from(10),
                })
                .collect(),
        }
    }

    #[test]
    fn test_every_utxo_has_a_path() {
        let key = test_account_key();
        let mut preparer = TransferPreparer::new();
        preparer
            .visit(&batch(
                &key,
                0,
                &[
                    ("a", DerivationPath::external(2)),
                    ("b", DerivationPath::internal(0)),
                ],
            ))
            .unwrap();
        preparer
            .visit(&batch(&key, 3, &[("c", DerivationPath::internal(4))]))
            .unwrap();

        let prepared = preparer.finish();
        assert_eq!(prepared.utxos.len(), 3);
        for utxo in prepared.utxos.iter() {
            assert!(prepared.path_of(&utxo.id).is_some(), "{}", utxo.id);
        }
        assert_eq!(
            prepared.path_of(&"c".into()),
            Some(DerivationPath::internal(4))
        );
    }

    #[test]
    fn test_internal_addresses_come_first() {
        let key = test_account_key();
        let mut preparer = TransferPreparer::new();
        preparer.visit(&batch(&key, 0, &[])).unwrap();
        preparer.visit(&batch(&key, 3, &[])).unwrap();

        let prepared = preparer.finish();
        let expected: Vec<Address> = key
            .derive_range(Chain::Internal, 0, 6)
            .unwrap()
            .into_iter()
            .chain(key.derive_range(Chain::External, 0, 6).unwrap())
            .map(|derived| derived.address)
            .collect();
        assert_eq!(prepared.ordered_addresses, expected);
    }

    #[test]
    fn test_first_path_mapping_wins() {
        let key = test_account_key();
        let mut preparer = TransferPreparer::new();
        preparer
            .visit(&batch(&key, 0, &[("a", DerivationPath::external(1))]))
            .unwrap();
        preparer
            .visit(&batch(&key, 3, &[("a", DerivationPath::external(4))]))
            .unwrap();

        let prepared = preparer.finish();
        assert_eq!(prepared.utxos.len(), 1);
        assert_eq!(
            prepared.path_of(&"a".into()),
            Some(DerivationPath::external(1))
        );
    }
}
