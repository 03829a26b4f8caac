use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::info;

use crate::block::{Block, BlockFS};
use crate::error::{LedgerError, Result};
use crate::genesis::Genesis;
use crate::hash::Hash;
use crate::store::Store;
use crate::transaction::{Account, Tx};

/// In-memory balances plus enough bookkeeping to validate and append new
/// blocks. Construction replays the entire ledger file; from then on,
/// `add_block` keeps it in sync one block at a time.
pub struct State {
    data_dir: PathBuf,
    store: Store,
    balances: HashMap<Account, u64>,
    latest_block: Option<Block>,
    latest_block_hash: Hash,
    has_genesis: bool,
}

impl State {
    /// Loads genesis balances, opens the ledger file, and replays every
    /// block in it to reconstruct current balances and the chain tip.
    pub fn new_from_disk(data_dir: &Path) -> Result<State> {
        let genesis = Genesis::load(data_dir)?;
        let store = Store::open(data_dir)?;

        let mut state = State {
            data_dir: data_dir.to_path_buf(),
            store,
            balances: genesis.balances.clone(),
            latest_block: None,
            latest_block_hash: Hash::ZERO,
            has_genesis: false,
        };

        for record in state.store.scan_all()? {
            state.apply_block(&record.block)?;
            state.latest_block = Some(record.block);
            state.latest_block_hash = record.hash;
            state.has_genesis = true;
        }

        Ok(state)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn balances(&self) -> &HashMap<Account, u64> {
        &self.balances
    }

    pub fn balance_of(&self, account: &str) -> u64 {
        *self.balances.get(account).unwrap_or(&0)
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.latest_block.as_ref()
    }

    pub fn latest_block_hash(&self) -> Hash {
        self.latest_block_hash
    }

    pub fn has_genesis(&self) -> bool {
        self.has_genesis
    }

    /// Every block persisted strictly after the one hashing to `parent_hash`
    /// (or every block, if `parent_hash` is zero).
    pub fn blocks_after(&self, parent_hash: Hash) -> Result<Vec<Block>> {
        Ok(self
            .store
            .scan_after(parent_hash)?
            .into_iter()
            .map(|fs| fs.block)
            .collect())
    }

    pub fn next_block_number(&self) -> u64 {
        if self.has_genesis {
            self.latest_block
                .as_ref()
                .map(|b| b.header.number + 1)
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Checks `tx` against current balances without mutating state. Used by
    /// callers that want to gate a tx into a pending set before it is ever
    /// part of a candidate block.
    pub fn validate_tx(&self, tx: &Tx) -> Result<()> {
        if tx.is_reward() {
            return Ok(());
        }
        let balance = self.balance_of(&tx.from);
        if tx.value > balance {
            return Err(LedgerError::InsufficientFunds {
                from: tx.from.clone(),
                balance,
                value: tx.value,
            });
        }
        Ok(())
    }

    fn validate_block(&self, block: &Block) -> Result<()> {
        let expected_number = self.next_block_number();
        if block.header.number != expected_number {
            return Err(LedgerError::WrongHeight {
                expected: expected_number,
                got: block.header.number,
            });
        }

        let checking_parent = self.has_genesis
            && self.latest_block.as_ref().map_or(false, |b| b.header.number > 0);
        if checking_parent {
            if block.header.parent != self.latest_block_hash {
                return Err(LedgerError::WrongParent {
                    expected: self.latest_block_hash.to_hex(),
                    got: block.header.parent.to_hex(),
                });
            }
        }

        let hash = block.hash().map_err(LedgerError::Decode)?;
        if !hash.satisfies_pow() {
            return Err(LedgerError::InvalidPow);
        }

        Ok(())
    }

    /// Applies `block.txs` against a scratch copy of balances, without
    /// touching `self.balances`; used both by replay (where validation has
    /// already happened via the PoW check on disk) and by `add_block`'s
    /// copy-validate-commit path.
    fn apply_block(&mut self, block: &Block) -> Result<()> {
        let mut scratch = self.balances.clone();
        apply_txs(&mut scratch, &block.txs)?;
        self.balances = scratch;
        Ok(())
    }

    /// Validates `block`, appends it to the ledger file, and commits its
    /// balance effects — or fails without mutating anything.
    pub fn add_block(&mut self, block: Block) -> Result<Hash> {
        self.validate_block(&block)?;

        let mut scratch = self.balances.clone();
        apply_txs(&mut scratch, &block.txs)?;

        let hash = block.hash().map_err(LedgerError::Decode)?;
        self.store.append(&BlockFS {
            hash,
            block: block.clone(),
        })?;

        self.balances = scratch;
        self.latest_block = Some(block);
        self.latest_block_hash = hash;
        self.has_genesis = true;

        info!("[STATE] applied block #{} hash={}", self.latest_block.as_ref().unwrap().header.number, hash);
        Ok(hash)
    }
}

/// Applies a sequence of txs to `balances` in order, failing (and leaving
/// `balances` partially mutated — callers must apply to a scratch copy) on
/// the first tx that would overdraw its sender.
fn apply_txs(balances: &mut HashMap<Account, u64>, txs: &[Tx]) -> Result<()> {
    for tx in txs {
        if tx.is_reward() {
            *balances.entry(tx.to.clone()).or_insert(0) += tx.value;
            continue;
        }
        let from_balance = *balances.get(&tx.from).unwrap_or(&0);
        if tx.value > from_balance {
            return Err(LedgerError::InsufficientFunds {
                from: tx.from.clone(),
                balance: from_balance,
                value: tx.value,
            });
        }
        *balances.get_mut(&tx.from).unwrap() -= tx.value;
        *balances.entry(tx.to.clone()).or_insert(0) += tx.value;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockHeader;
    use tempfile::tempdir;

    fn mine_stub_block(parent: Hash, number: u64, miner: &str, txs: Vec<Tx>) -> Block {
        // Not actually proof-of-work-valid; only used where validation is bypassed.
        Block::new(
            BlockHeader {
                parent,
                number,
                nonce: 0,
                time: number,
                miner: miner.to_string(),
            },
            txs,
        )
    }

    #[test]
    fn fresh_state_reflects_genesis_balances() {
        let dir = tempdir().unwrap();
        let state = State::new_from_disk(dir.path()).unwrap();
        assert_eq!(state.balance_of("andrej"), 1_000_000);
        assert_eq!(state.balance_of("babayaga"), 0);
        assert!(!state.has_genesis());
        assert_eq!(state.next_block_number(), 0);
    }

    #[test]
    fn validate_tx_rejects_insufficient_funds_without_mutating_balances() {
        let dir = tempdir().unwrap();
        let state = State::new_from_disk(dir.path()).unwrap();
        let tx = Tx::new("babayaga".into(), "andrej".into(), 10, "".into(), 0);
        let err = state.validate_tx(&tx).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(state.balance_of("babayaga"), 0);
    }

    #[test]
    fn reward_tx_credits_without_requiring_balance() {
        let dir = tempdir().unwrap();
        let state = State::new_from_disk(dir.path()).unwrap();
        let tx = Tx::new("nobody".into(), "babayaga".into(), 100, "reward".into(), 0);
        assert!(state.validate_tx(&tx).is_ok());
    }

    #[test]
    fn add_block_rejects_wrong_height() {
        let dir = tempdir().unwrap();
        let mut state = State::new_from_disk(dir.path()).unwrap();
        let bad = mine_stub_block(Hash::ZERO, 5, "andrej", vec![]);
        let err = state.add_block(bad).unwrap_err();
        assert!(matches!(err, LedgerError::WrongHeight { .. }));
    }
}
