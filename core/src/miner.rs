use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use rand::Rng;

use crate::block::{Block, BlockHeader};
use crate::error::{LedgerError, Result};
use crate::transaction::{Account, Tx};

const PROGRESS_LOG_INTERVAL: u64 = 1_000_000;

/// A candidate block not yet mined. `time` is fixed at construction and
/// does not change across nonce attempts.
#[derive(Debug, Clone)]
pub struct PendingBlock {
    pub parent: crate::hash::Hash,
    pub number: u64,
    pub time: u64,
    pub miner: Account,
    pub txs: Vec<Tx>,
}

impl PendingBlock {
    pub fn new(parent: crate::hash::Hash, number: u64, miner: Account, txs: Vec<Tx>) -> Self {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        PendingBlock {
            parent,
            number,
            time,
            miner,
            txs,
        }
    }
}

/// A handle the caller can use to abort an in-flight `mine` call. Cloning
/// shares the same underlying flag.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Searches for a nonce satisfying the difficulty predicate by drawing a
/// fresh random u32 each attempt, checking `cancel` every iteration. Blocking
/// and CPU-bound; callers on an async runtime should run this on a dedicated
/// blocking thread.
pub fn mine(pb: &PendingBlock, cancel: &CancelToken) -> Result<Block> {
    if pb.txs.is_empty() {
        return Err(LedgerError::EmptyBlock);
    }

    let mut rng = rand::thread_rng();
    let mut attempts: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(LedgerError::MiningCancelled {
                reason: "cancelled by caller".to_string(),
            });
        }

        let nonce: u32 = rng.r#gen();
        let candidate = Block::new(
            BlockHeader {
                parent: pb.parent,
                number: pb.number,
                nonce,
                time: pb.time,
                miner: pb.miner.clone(),
            },
            pb.txs.clone(),
        );

        let hash = candidate.hash().map_err(LedgerError::Decode)?;
        if hash.satisfies_pow() {
            info!(
                "[MINER] found valid nonce {} after {} attempts, hash={}",
                nonce, attempts, hash
            );
            return Ok(candidate);
        }

        attempts += 1;
        if attempts % PROGRESS_LOG_INTERVAL == 0 {
            info!("[MINER] still searching, {} attempts so far", attempts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;

    #[test]
    fn mining_an_empty_block_fails_fast() {
        let pb = PendingBlock::new(Hash::ZERO, 1, "andrej".to_string(), vec![]);
        let cancel = CancelToken::new();
        let err = mine(&pb, &cancel).unwrap_err();
        assert!(matches!(err, LedgerError::EmptyBlock));
    }

    #[test]
    fn mining_succeeds_and_satisfies_the_difficulty_predicate() {
        let txs = vec![Tx::new(
            "andrej".into(),
            "babayaga".into(),
            1,
            "".into(),
            1579451695,
        )];
        let pb = PendingBlock::new(Hash::ZERO, 1, "andrej".to_string(), txs);
        let cancel = CancelToken::new();
        let block = mine(&pb, &cancel).unwrap();
        assert!(block.hash().unwrap().satisfies_pow());
        assert_eq!(block.header.miner, "andrej");
    }

    #[test]
    fn cancelling_mid_search_from_another_thread_stops_mining() {
        use std::thread;
        use std::time::Duration;

        let txs = vec![Tx::new(
            "andrej".into(),
            "babayaga".into(),
            1,
            "".into(),
            0,
        )];
        let pb = PendingBlock::new(Hash::ZERO, 1, "andrej".to_string(), txs);
        let cancel = CancelToken::new();

        let canceller = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_micros(100));
                cancel.cancel();
            })
        };

        let err = mine(&pb, &cancel).unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, LedgerError::MiningCancelled { .. }));
    }

    #[test]
    fn an_already_cancelled_token_aborts_immediately() {
        let txs = vec![Tx::new(
            "andrej".into(),
            "babayaga".into(),
            1,
            "".into(),
            0,
        )];
        let pb = PendingBlock::new(Hash::ZERO, 1, "andrej".to_string(), txs);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = mine(&pb, &cancel).unwrap_err();
        assert!(matches!(err, LedgerError::MiningCancelled { .. }));
    }
}
