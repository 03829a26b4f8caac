use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ledger_core::{Account, Block, CancelToken, Hash, LedgerError, PendingBlock, State, Tx};
use log::{info, warn};
use tokio::sync::mpsc;

use crate::types::PeerNode;

const PENDING_TX_CHANNEL_CAPACITY: usize = 10_000;

struct Inner {
    state: State,
    peers: HashMap<String, PeerNode>,
    pending: HashMap<Hash, Tx>,
    archived: HashMap<Hash, Tx>,
    is_mining: bool,
    mining_cancel: Option<CancelToken>,
}

/// Owns everything the HTTP handlers, the sync loop, and the mining loop
/// touch concurrently: ledger state, the peer table, and the pending/archived
/// tx maps. All of it lives behind one short-critical-section lock; nothing
/// here ever awaits while holding it.
pub struct Node {
    pub self_ip: String,
    pub self_port: u16,
    pub account: Account,
    inner: Mutex<Inner>,
    pending_tx_tx: mpsc::Sender<Tx>,
    synced_block_tx: mpsc::UnboundedSender<Block>,
}

pub type NodeHandle = Arc<Node>;

impl Node {
    /// Builds the coordinator and returns the two receiver ends so the
    /// caller can hand them to the mining and cancellation-watcher loops.
    pub fn new(
        self_ip: String,
        self_port: u16,
        account: Account,
        state: State,
        bootstrap: Option<PeerNode>,
    ) -> (NodeHandle, mpsc::Receiver<Tx>, mpsc::UnboundedReceiver<Block>) {
        let mut peers = HashMap::new();
        if let Some(peer) = bootstrap {
            peers.insert(peer.key(), peer);
        }

        let (pending_tx_tx, pending_tx_rx) = mpsc::channel(PENDING_TX_CHANNEL_CAPACITY);
        let (synced_block_tx, synced_block_rx) = mpsc::unbounded_channel();

        let node = Arc::new(Node {
            self_ip,
            self_port,
            account,
            inner: Mutex::new(Inner {
                state,
                peers,
                pending: HashMap::new(),
                archived: HashMap::new(),
                is_mining: false,
                mining_cancel: None,
            }),
            pending_tx_tx,
            synced_block_tx,
        });

        (node, pending_tx_rx, synced_block_rx)
    }

    pub fn self_key(&self) -> String {
        format!("{}:{}", self.self_ip, self.self_port)
    }

    pub fn balances(&self) -> (Hash, HashMap<Account, u64>) {
        let inner = self.inner.lock().unwrap();
        (inner.state.latest_block_hash(), inner.state.balances().clone())
    }

    pub fn block_number(&self) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .latest_block()
            .map(|b| b.header.number)
            .unwrap_or(0)
    }

    pub fn block_hash(&self) -> Hash {
        self.inner.lock().unwrap().state.latest_block_hash()
    }

    pub fn is_mining(&self) -> bool {
        self.inner.lock().unwrap().is_mining
    }

    pub fn peers(&self) -> HashMap<String, PeerNode> {
        self.inner.lock().unwrap().peers.clone()
    }

    pub fn add_peer(&self, peer: PeerNode) {
        let mut inner = self.inner.lock().unwrap();
        inner.peers.entry(peer.key()).or_insert(peer);
    }

    pub fn mark_peer_connected(&self, key: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(peer) = inner.peers.get_mut(key) {
            peer.connected = true;
        }
    }

    pub fn remove_peer(&self, key: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.peers.remove(key);
    }

    pub fn pending_txs(&self) -> Vec<Tx> {
        self.inner.lock().unwrap().pending.values().cloned().collect()
    }

    /// Validates `tx` against current balances and, if it is neither
    /// pending nor already archived, inserts it and wakes the mining loop.
    /// Returns `true` if the tx was newly admitted.
    pub fn add_pending_tx(&self, tx: Tx) -> ledger_core::Result<bool> {
        let hash = tx.hash().map_err(LedgerError::Decode)?;

        {
            let mut inner = self.inner.lock().unwrap();
            if inner.pending.contains_key(&hash) || inner.archived.contains_key(&hash) {
                return Ok(false);
            }
            inner.state.validate_tx(&tx)?;
            inner.pending.insert(hash, tx.clone());
        }

        if let Err(e) = self.pending_tx_tx.try_send(tx) {
            warn!("[NODE] pending tx channel full or closed: {}", e);
        }
        Ok(true)
    }

    /// Starts a mining attempt if one isn't already running and there is at
    /// least one pending tx. Returns the candidate block and a handle the
    /// caller uses to poll for cancellation.
    pub fn begin_mining(&self) -> Option<(PendingBlock, CancelToken)> {
        let mut inner = self.inner.lock().unwrap();
        if inner.is_mining || inner.pending.is_empty() {
            return None;
        }

        let txs: Vec<Tx> = inner.pending.values().cloned().collect();
        let parent = inner.state.latest_block_hash();
        let number = inner.state.next_block_number();
        let pb = PendingBlock::new(parent, number, self.account.clone(), txs);

        let cancel = CancelToken::new();
        inner.is_mining = true;
        inner.mining_cancel = Some(cancel.clone());
        Some((pb, cancel))
    }

    pub fn finish_mining_success(&self, block: Block) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state.add_block(block.clone()) {
            Ok(hash) => {
                for tx in &block.txs {
                    if let Ok(tx_hash) = tx.hash() {
                        if let Some(tx) = inner.pending.remove(&tx_hash) {
                            inner.archived.insert(tx_hash, tx);
                        }
                    }
                }
                info!(
                    "[NODE] mined and applied block #{} hash={}",
                    block.header.number, hash
                );
            }
            Err(e) => warn!("[NODE] mined block rejected by state: {}", e),
        }
        inner.is_mining = false;
        inner.mining_cancel = None;
    }

    pub fn finish_mining_failure(&self, err: LedgerError) {
        let mut inner = self.inner.lock().unwrap();
        match &err {
            LedgerError::MiningCancelled { reason } => {
                info!("[NODE] mining cancelled: {}", reason)
            }
            LedgerError::EmptyBlock => info!("[NODE] nothing to mine, pending set emptied first"),
            other => warn!("[NODE] mining failed: {}", other),
        }
        inner.is_mining = false;
        inner.mining_cancel = None;
    }

    /// Called when sync imports a block while a mining attempt may be in
    /// flight: cancels the current search (if any) and drops any pending tx
    /// the imported block already confirmed.
    pub fn on_synced_block(&self, block: &Block) {
        let mut inner = self.inner.lock().unwrap();
        if inner.is_mining {
            info!("[NODE] lost the mining race, cancelling local search");
            if let Some(cancel) = &inner.mining_cancel {
                cancel.cancel();
            }
        }
        for tx in &block.txs {
            if let Ok(tx_hash) = tx.hash() {
                if let Some(tx) = inner.pending.remove(&tx_hash) {
                    inner.archived.insert(tx_hash, tx);
                }
            }
        }
    }

    /// Applies a block received from a peer and announces it on the
    /// synced-blocks channel. The cancellation watcher (a separate task)
    /// reacts to that announcement by cancelling any in-flight mining
    /// attempt and pruning the pending set — kept out of this call so
    /// `import_synced_block` never blocks on mining-side bookkeeping.
    pub fn import_synced_block(&self, block: Block) -> ledger_core::Result<Hash> {
        let hash = {
            let mut inner = self.inner.lock().unwrap();
            inner.state.add_block(block.clone())?
        };
        let _ = self.synced_block_tx.send(block);
        Ok(hash)
    }

    pub fn data_dir_tip(&self) -> Hash {
        self.inner.lock().unwrap().state.latest_block_hash()
    }

    pub fn blocks_after(&self, parent_hash: Hash) -> ledger_core::Result<Vec<Block>> {
        self.inner.lock().unwrap().state.blocks_after(parent_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::State;
    use tempfile::tempdir;

    fn fresh_node() -> NodeHandle {
        let dir = tempdir().unwrap();
        let state = State::new_from_disk(dir.path()).unwrap();
        let (node, _rx, _blk_rx) = Node::new(
            "127.0.0.1".into(),
            8080,
            "andrej".into(),
            state,
            None,
        );
        node
    }

    #[test]
    fn add_pending_tx_rejects_duplicates() {
        let node = fresh_node();
        let tx = Tx::new("andrej".into(), "babayaga".into(), 1, "".into(), 0);
        assert!(node.add_pending_tx(tx.clone()).unwrap());
        assert!(!node.add_pending_tx(tx).unwrap());
        assert_eq!(node.pending_txs().len(), 1);
    }

    #[test]
    fn add_pending_tx_rejects_insufficient_funds() {
        let node = fresh_node();
        let tx = Tx::new("babayaga".into(), "andrej".into(), 10, "".into(), 0);
        assert!(node.add_pending_tx(tx).is_err());
        assert!(node.pending_txs().is_empty());
    }

    #[test]
    fn begin_mining_returns_none_with_no_pending_txs() {
        let node = fresh_node();
        assert!(node.begin_mining().is_none());
    }

    #[test]
    fn begin_mining_then_begin_mining_again_is_refused_while_in_flight() {
        let node = fresh_node();
        let tx = Tx::new("andrej".into(), "babayaga".into(), 1, "".into(), 0);
        node.add_pending_tx(tx).unwrap();
        let first = node.begin_mining();
        assert!(first.is_some());
        assert!(node.is_mining());
        assert!(node.begin_mining().is_none());
    }

    #[test]
    fn a_synced_block_cancels_in_flight_mining_and_prunes_confirmed_pending_txs() {
        let node = fresh_node();
        let tx = Tx::new("andrej".into(), "babayaga".into(), 1, "".into(), 0);
        node.add_pending_tx(tx).unwrap();

        let (pb, cancel) = node.begin_mining().unwrap();
        assert!(node.is_mining());

        // A peer wins the race; we learn of their block before our own
        // search finishes.
        let peer_block = ledger_core::mine(&pb, &CancelToken::new()).unwrap();
        node.on_synced_block(&peer_block);
        assert!(cancel.is_cancelled());
        assert!(node.pending_txs().is_empty());

        // The in-flight search notices the cancellation and reports it,
        // releasing the mining flag.
        node.finish_mining_failure(LedgerError::MiningCancelled {
            reason: "cancelled by caller".to_string(),
        });
        assert!(!node.is_mining());
    }
}
