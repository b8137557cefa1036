//! Frontier address resolution.
//!
//! The frontier is the lowest index whose external and internal addresses
//! both hold no UTXOs. It is the next address pair to hand out for receiving
//! or for change.

use tracing::debug;

use crate::error::{WalletError, WalletResult};
use crate::keys::DerivedAddress;
use crate::scan::{ScanBatch, ScanVisitor};
use crate::utxo::UtxoSet;

/// The resolved address pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontier {
    pub index: u32,
    pub external: DerivedAddress,
    pub internal: DerivedAddress,
}

/// Collects the address pairs of a scan and resolves the frontier.
#[derive(Debug, Default)]
pub struct FrontierResolver {
    pairs: Vec<(DerivedAddress, DerivedAddress)>,
    utxos: UtxoSet,
}

impl FrontierResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the frontier over everything visited so far.
    ///
    /// Fails with [`WalletError::EmptyScan`] if no batch was visited, and
    /// with [`WalletError::NoUnusedAddress`] if every scanned index is used.
    pub fn resolve(&self) -> WalletResult<Frontier> {
        if self.pairs.is_empty() {
            return Err(WalletError::EmptyScan);
        }

        let (external, internal) = self
            .pairs
            .iter()
            .find(|(external, internal)| {
                !self.utxos.owns_any(&external.address) && !self.utxos.owns_any(&internal.address)
            })
            .ok_or(WalletError::NoUnusedAddress)?;

        debug!(index = external.path.index, "Resolved frontier");
        Ok(Frontier {
            index: external.path.index,
            external: external.clone(),
            internal: internal.clone(),
        })
    }
}

impl ScanVisitor for FrontierResolver {
    fn visit(&mut self, batch: &ScanBatch) -> WalletResult<()> {
        self.pairs.extend(
            batch
                .external
                .iter()
                .cloned()
                .zip(batch.internal.iter().cloned()),
        );
        self.utxos.extend(&batch.utxos);
        Ok(())
    }
}
