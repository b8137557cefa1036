//! Balance aggregation over a scan.

use std::collections::HashSet;
use tracing::debug;

use crate::amount::Amount;
use crate::error::WalletResult;
use crate::keys::DerivationPath;
use crate::scan::{ScanBatch, ScanVisitor};
use crate::utxo::{Address, AssetId, UtxoId};

/// Balance held by a single derived address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBalance {
    pub path: DerivationPath,
    pub address: Address,
    pub amount: Amount,
}

/// Sums the amounts of one asset over every window of a scan.
///
/// Each UTXO id is counted at most once, however many windows report it.
#[derive(Debug)]
pub struct BalanceAggregator {
    asset_id: AssetId,
    total: Amount,
    counted: HashSet<UtxoId>,
    breakdown: Option<Vec<AddressBalance>>,
}

impl BalanceAggregator {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            total: Amount::ZERO,
            counted: HashSet::new(),
            breakdown: None,
        }
    }

    /// Also record the balance of every funded address
    pub fn with_breakdown(mut self) -> Self {
        self.breakdown = Some(Vec::new());
        self
    }

    /// Running total
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Per-address balances in scan order, if requested
    pub fn breakdown(&self) -> &[AddressBalance] {
        self.breakdown.as_deref().unwrap_or(&[])
    }
}

impl ScanVisitor for BalanceAggregator {
    fn visit(&mut self, batch: &ScanBatch) -> WalletResult<()> {
        for derived in batch.addresses() {
            let mut subtotal = Amount::ZERO;
            let mut owns_asset = false;

            for id in batch.utxos.ids_owned_by(&derived.address) {
                let Some(utxo) = batch.utxos.get(id) else {
                    continue;
                };
                if utxo.asset_id != self.asset_id || !self.counted.insert(id.clone()) {
                    continue;
                }
                subtotal = subtotal.checked_add(utxo.amount)?;
                owns_asset = true;
            }

            if !owns_asset {
                continue;
            }

            self.total = self.total.checked_add(subtotal)?;
            debug!(path = %derived.path, address = %derived.address, amount = %subtotal, "Funded address");

            if let Some(breakdown) = self.breakdown.as_mut() {
                breakdown.push(AddressBalance {
                    path: derived.path,
                    address: derived.address.clone(),
                    amount: subtotal,
                });
            }
        }
        Ok(())
    }
}
