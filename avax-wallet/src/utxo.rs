//! UTXO bookkeeping.
//!
//! Identifiers, addresses and asset ids are opaque ledger-defined strings;
//! the wallet only compares and hashes them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::amount::Amount;
use crate::error::WalletResult;

macro_rules! opaque_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a ledger-encoded string
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// The encoded string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_string!(
    /// Globally unique identifier of an unspent output
    UtxoId
);
opaque_string!(
    /// A chain-prefixed address string, e.g. `X-...`
    Address
);
opaque_string!(
    /// Ledger asset identifier
    AssetId
);
opaque_string!(
    /// Identifier of a submitted transaction
    TxId
);

/// An unspent transaction output as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    /// Output identifier
    #[serde(rename = "utxoID")]
    pub id: UtxoId,
    /// Address that owns the output
    pub address: Address,
    /// Asset held by the output
    #[serde(rename = "assetID")]
    pub asset_id: AssetId,
    /// Amount held by the output
    pub amount: Amount,
}

/// A set of UTXOs indexed both by id and by owning address.
///
/// Inserting the same id twice keeps a single entry, which makes
/// [`UtxoSet::union`] idempotent and commutative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    utxos: BTreeMap<UtxoId, Utxo>,
    by_address: BTreeMap<Address, BTreeSet<UtxoId>>,
}

impl UtxoSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a UTXO; returns false if its id was already present
    pub fn insert(&mut self, utxo: Utxo) -> bool {
        if self.utxos.contains_key(&utxo.id) {
            return false;
        }
        self.by_address
            .entry(utxo.address.clone())
            .or_default()
            .insert(utxo.id.clone());
        self.utxos.insert(utxo.id.clone(), utxo);
        true
    }

    /// Merge another set into this one
    pub fn extend(&mut self, other: &UtxoSet) {
        for utxo in other.utxos.values() {
            self.insert(utxo.clone());
        }
    }

    /// Union of two sets
    pub fn union(&self, other: &UtxoSet) -> UtxoSet {
        let mut result = self.clone();
        result.extend(other);
        result
    }

    /// Keep only the UTXOs whose owner satisfies `keep`
    pub fn retain_owners(&mut self, mut keep: impl FnMut(&Address) -> bool) {
        let dropped: Vec<Address> = self
            .by_address
            .keys()
            .filter(|address| !keep(address))
            .cloned()
            .collect();

        for address in dropped {
            if let Some(ids) = self.by_address.remove(&address) {
                for id in ids {
                    self.utxos.remove(&id);
                }
            }
        }
    }

    /// Look up a UTXO by id
    pub fn get(&self, id: &UtxoId) -> Option<&Utxo> {
        self.utxos.get(id)
    }

    /// Whether the set contains the given id
    pub fn contains(&self, id: &UtxoId) -> bool {
        self.utxos.contains_key(id)
    }

    /// All UTXOs, ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos.values()
    }

    /// Ids of the UTXOs owned by `address`
    pub fn ids_owned_by<'a>(&'a self, address: &Address) -> impl Iterator<Item = &'a UtxoId> {
        self.by_address.get(address).into_iter().flatten()
    }

    /// Owners and the ids they hold
    pub fn owners(&self) -> impl Iterator<Item = (&Address, &BTreeSet<UtxoId>)> {
        self.by_address.iter()
    }

    /// Whether `address` owns at least one UTXO
    pub fn owns_any(&self, address: &Address) -> bool {
        self.by_address
            .get(address)
            .map(|ids| !ids.is_empty())
            .unwrap_or(false)
    }

    /// Total amount of `asset_id` held by `address`
    pub fn balance_of(&self, address: &Address, asset_id: &AssetId) -> WalletResult<Amount> {
        Amount::sum(
            self.ids_owned_by(address)
                .filter_map(|id| self.utxos.get(id))
                .filter(|utxo| &utxo.asset_id == asset_id)
                .map(|utxo| &utxo.amount),
        )
    }

    /// Number of UTXOs
    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

impl FromIterator<Utxo> for UtxoSet {
    fn from_iter<I: IntoIterator<Item = Utxo>>(iter: I) -> Self {
        let mut set = UtxoSet::new();
        for utxo in iter {
            set.insert(utxo);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(id: &str, address: &str, amount: u64) -> Utxo {
        Utxo {
            id: id.into(),
            address: address.into(),
            asset_id: "AVAX".into(),
            amount: Amount::from(amount),
        }
    }

    #[test]
    fn test_union_is_idempotent() {
        let set: UtxoSet = [utxo("a", "X-1", 10), utxo("b", "X-2", 20)]
            .into_iter()
            .collect();

        let unioned = set.union(&set);
        assert_eq!(unioned, set);
        assert_eq!(unioned.len(), 2);
    }

    #[test]
    fn test_union_is_commutative_over_overlap() {
        let left: UtxoSet = [utxo("a", "X-1", 10), utxo("b", "X-2", 20)]
            .into_iter()
            .collect();
        let right: UtxoSet = [utxo("b", "X-2", 20), utxo("c", "X-1", 5)]
            .into_iter()
            .collect();

        let lr = left.union(&right);
        assert_eq!(lr, right.union(&left));
        assert_eq!(lr.len(), 3);
        assert_eq!(lr.ids_owned_by(&"X-1".into()).count(), 2);
    }

    #[test]
    fn test_balance_of_filters_asset() {
        let mut set: UtxoSet = [utxo("a", "X-1", 10), utxo("b", "X-1", 32)]
            .into_iter()
            .collect();
        set.insert(Utxo {
            id: "c".into(),
            address: "X-1".into(),
            asset_id: "OTHER".into(),
            amount: Amount::from(1000),
        });

        let balance = set.balance_of(&"X-1".into(), &"AVAX".into()).unwrap();
        assert_eq!(balance, Amount::from(42));
        assert_eq!(
            set.balance_of(&"X-9".into(), &"AVAX".into()).unwrap(),
            Amount::ZERO
        );
    }

    #[test]
    fn test_retain_owners() {
        let mut set: UtxoSet = [utxo("a", "X-1", 10), utxo("b", "X-2", 20)]
            .into_iter()
            .collect();
        set.retain_owners(|address| address.as_str() == "X-1");

        assert_eq!(set.len(), 1);
        assert!(set.contains(&"a".into()));
        assert!(!set.owns_any(&"X-2".into()));
    }
}
