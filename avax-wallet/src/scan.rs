//! Gap-limit address discovery.
//!
//! The scanner walks the external and internal chains of an account key in
//! windows of [`INDEX_RANGE`] indices. Each window costs one `getUTXOs` call
//! for both chains together, and the resulting [`ScanBatch`] is handed to a
//! [`ScanVisitor`]. Scanning stops once at least [`SCAN_SIZE`] indices have
//! been covered and the most recent window held no UTXOs at all.
//!
//! Activity is judged by unspent outputs only. An address that received and
//! spent everything looks unused, and because both chains share one stop
//! decision a long run of activity on one chain keeps the other chain's scan
//! alive as well.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{WalletError, WalletResult};
use crate::keys::{AccountKey, Chain, DerivationPath, DerivedAddress};
use crate::node::NodeClient;
use crate::utxo::{Address, UtxoSet};

/// Number of consecutive indices derived per chain and per window
pub const INDEX_RANGE: u32 = 20;

/// Minimum number of indices covered before an empty window may end the scan
pub const SCAN_SIZE: u32 = 70;

/// One window of the scan: the addresses derived on both chains and the
/// UTXOs the node reported for them.
#[derive(Debug, Clone)]
pub struct ScanBatch {
    /// First index of the window
    pub start: u32,
    /// External chain addresses, ascending index
    pub external: Vec<DerivedAddress>,
    /// Internal chain addresses, ascending index
    pub internal: Vec<DerivedAddress>,
    /// UTXOs owned by the addresses of this window
    pub utxos: UtxoSet,
}

impl ScanBatch {
    /// All addresses of the window, external chain first
    pub fn addresses(&self) -> impl Iterator<Item = &DerivedAddress> {
        self.external.iter().chain(self.internal.iter())
    }

    /// Derivation path of an address in this window
    pub fn path_of(&self, address: &Address) -> Option<DerivationPath> {
        self.addresses()
            .find(|derived| &derived.address == address)
            .map(|derived| derived.path)
    }

    /// Whether no address of the window owns a UTXO
    pub fn is_unused(&self) -> bool {
        self.utxos.is_empty()
    }
}

/// Consumer of scan batches.
///
/// Each of the balance, frontier and transfer consumers implements this, so
/// they can be driven by one scan or tested with hand-built batches.
pub trait ScanVisitor {
    /// Called once per window, in ascending index order
    fn visit(&mut self, batch: &ScanBatch) -> WalletResult<()>;
}

impl<V: ScanVisitor + ?Sized> ScanVisitor for &mut V {
    fn visit(&mut self, batch: &ScanBatch) -> WalletResult<()> {
        (**self).visit(batch)
    }
}

impl<A: ScanVisitor, B: ScanVisitor> ScanVisitor for (A, B) {
    fn visit(&mut self, batch: &ScanBatch) -> WalletResult<()> {
        self.0.visit(batch)?;
        self.1.visit(batch)
    }
}

/// Outcome of a completed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Number of windows queried
    pub batches: usize,
    /// Cursor position when the scan stopped
    pub end_index: u32,
    /// UTXOs seen across all windows
    pub utxo_count: usize,
}

/// Drives a gap-limit scan of one account against a node.
pub struct AddressScanner<'a, N: NodeClient + ?Sized> {
    node: &'a N,
    account: &'a AccountKey,
    index_range: u32,
    scan_size: u32,
}

impl<'a, N: NodeClient + ?Sized> AddressScanner<'a, N> {
    /// Scanner with the standard window and gap sizes
    pub fn new(node: &'a N, account: &'a AccountKey) -> Self {
        Self {
            node,
            account,
            index_range: INDEX_RANGE,
            scan_size: SCAN_SIZE,
        }
    }

    /// Run the scan to completion, feeding every window to `visitor`.
    ///
    /// A node failure aborts the scan; the visitor has then seen a prefix of
    /// the windows and its state must be discarded.
    pub async fn scan<V: ScanVisitor + ?Sized>(&self, visitor: &mut V) -> WalletResult<ScanSummary> {
        let mut cursor = 0u32;
        let mut summary = ScanSummary {
            batches: 0,
            end_index: 0,
            utxo_count: 0,
        };

        loop {
            let batch = self.fetch_window(cursor).await?;
            visitor.visit(&batch)?;

            summary.batches += 1;
            summary.utxo_count += batch.utxos.len();
            cursor = cursor.checked_add(self.index_range).ok_or_else(|| {
                WalletError::Derivation("address index overflow".to_string())
            })?;

            if cursor >= self.scan_size && batch.is_unused() {
                break;
            }
        }

        summary.end_index = cursor;
        debug!(
            batches = summary.batches,
            end_index = summary.end_index,
            utxos = summary.utxo_count,
            "Scan complete"
        );
        Ok(summary)
    }

    async fn fetch_window(&self, start: u32) -> WalletResult<ScanBatch> {
        let external = self
            .account
            .derive_range(Chain::External, start, self.index_range)?;
        let internal = self
            .account
            .derive_range(Chain::Internal, start, self.index_range)?;

        let addresses: Vec<Address> = external
            .iter()
            .chain(internal.iter())
            .map(|derived| derived.address.clone())
            .collect();

        let mut utxos = self.node.get_utxos(&addresses).await?;

        let queried: HashSet<&Address> = addresses.iter().collect();
        let reported = utxos.len();
        utxos.retain_owners(|owner| queried.contains(owner));
        if utxos.len() != reported {
            warn!(
                discarded = reported - utxos.len(),
                start, "Node returned UTXOs for addresses outside the window"
            );
        }

        debug!(start, utxos = utxos.len(), "Scanned address window");

        Ok(ScanBatch {
            start,
            external,
            internal,
            utxos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::error::NodeError;
    use crate::keys::tests::test_account_key;
    use crate::signing::{SignedTransaction, UnsignedTransaction};
    use crate::utxo::{AssetId, TxId, Utxo};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Node that knows a fixed set of UTXOs and records every query.
    struct FakeNode {
        utxos: HashMap<Address, Vec<Utxo>>,
        queries: Mutex<Vec<usize>>,
        fail_after: Option<usize>,
    }

    impl FakeNode {
        fn with_external(key: &AccountKey, indices: &[u32]) -> Self {
            let mut utxos = HashMap::new();
            for index in indices {
                let derived = key.derive(DerivationPath::external(*index)).unwrap();
                utxos.insert(
                    derived.address.clone(),
                    vec![Utxo {
                        id: format!("utxo-{index}").as_str().into(),
                        address: derived.address,
                        asset_id: "AVAX".into(),
                        amount: Amount::from(100),
                    }],
                );
            }
            Self {
                utxos,
                queries: Mutex::new(Vec::new()),
                fail_after: None,
            }
        }
    }

    #[async_trait]
    impl NodeClient for FakeNode {
        async fn get_utxos(&self, addresses: &[Address]) -> Result<UtxoSet, NodeError> {
            let mut queries = self.queries.lock().unwrap();
            if Some(queries.len()) == self.fail_after {
                return Err(NodeError::Http("connection reset".to_string()));
            }
            queries.push(addresses.len());
            Ok(addresses
                .iter()
                .filter_map(|address| self.utxos.get(address))
                .flatten()
                .cloned()
                .collect())
        }

        async fn get_balance(&self, _: &Address, _: &AssetId) -> Result<Amount, NodeError> {
            unimplemented!()
        }

        async fn build_transaction(
            &self,
            _: &UtxoSet,
            _: Amount,
            _: &[Address],
            _: &[Address],
            _: &[Address],
            _: &AssetId,
        ) -> Result<UnsignedTransaction, NodeError> {
            unimplemented!()
        }

        async fn submit_transaction(&self, _: &SignedTransaction) -> Result<TxId, NodeError> {
            unimplemented!()
        }
    }

    #[derive(Default)]
    struct Recorder {
        starts: Vec<u32>,
        utxos: usize,
    }

    impl ScanVisitor for Recorder {
        fn visit(&mut self, batch: &ScanBatch) -> WalletResult<()> {
            assert_eq!(batch.external.len(), INDEX_RANGE as usize);
            assert_eq!(batch.internal.len(), INDEX_RANGE as usize);
            self.starts.push(batch.start);
            self.utxos += batch.utxos.len();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_gap_limit_stops_after_first_empty_window_past_scan_size() {
        let key = test_account_key();
        let node = FakeNode::with_external(&key, &[0, 5, 12]);
        let mut recorder = Recorder::default();

        let summary = AddressScanner::new(&node, &key)
            .scan(&mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.starts, vec![0, 20, 40, 60]);
        assert_eq!(summary.end_index, 80);
        assert_eq!(summary.utxo_count, 3);
        assert_eq!(recorder.utxos, 3);
        assert!(node
            .queries
            .lock()
            .unwrap()
            .iter()
            .all(|count| *count == 2 * INDEX_RANGE as usize));
    }

    #[tokio::test]
    async fn test_activity_late_in_the_window_extends_the_scan() {
        let key = test_account_key();
        let node = FakeNode::with_external(&key, &[65]);
        let mut recorder = Recorder::default();

        let summary = AddressScanner::new(&node, &key)
            .scan(&mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.starts, vec![0, 20, 40, 60, 80]);
        assert_eq!(summary.end_index, 100);
    }

    #[tokio::test]
    async fn test_empty_wallet_still_covers_scan_size() {
        let key = test_account_key();
        let node = FakeNode::with_external(&key, &[]);
        let mut recorder = Recorder::default();

        let summary = AddressScanner::new(&node, &key)
            .scan(&mut recorder)
            .await
            .unwrap();

        assert_eq!(summary.batches, 4);
        assert_eq!(summary.end_index, 80);
    }

    #[tokio::test]
    async fn test_node_failure_aborts_scan() {
        let key = test_account_key();
        let mut node = FakeNode::with_external(&key, &[0]);
        node.fail_after = Some(1);
        let mut recorder = Recorder::default();

        let result = AddressScanner::new(&node, &key).scan(&mut recorder).await;

        assert!(matches!(result, Err(WalletError::Node(NodeError::Http(_)))));
        assert_eq!(recorder.starts, vec![0]);
    }

    #[tokio::test]
    async fn test_tuple_visitor_sees_every_batch() {
        let key = test_account_key();
        let node = FakeNode::with_external(&key, &[3]);
        let mut pair = (Recorder::default(), Recorder::default());

        AddressScanner::new(&node, &key)
            .scan(&mut pair)
            .await
            .unwrap();

        assert_eq!(pair.0.starts, pair.1.starts);
        assert_eq!(pair.0.utxos, 1);
    }

    #[test]
    fn test_path_of_covers_both_chains() {
        let key = test_account_key();
        let batch = ScanBatch {
            start: 0,
            external: key.derive_range(Chain::External, 0, 2).unwrap(),
            internal: key.derive_range(Chain::Internal, 0, 2).unwrap(),
            utxos: UtxoSet::new(),
        };

        let internal = &batch.internal[1];
        assert_eq!(
            batch.path_of(&internal.address),
            Some(DerivationPath::internal(1))
        );
        assert_eq!(batch.path_of(&"X-unknown".into()), None);
        assert!(batch.is_unused());
    }
}
