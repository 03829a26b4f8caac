use serde::{Deserialize, Serialize};

use crate::hash::{hash_of, Hash};
use crate::transaction::{Account, Tx};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent: Hash,
    pub number: u64,
    pub nonce: u32,
    pub time: u64,
    pub miner: Account,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Tx>,
}

impl Block {
    pub fn new(header: BlockHeader, txs: Vec<Tx>) -> Self {
        Block { header, txs }
    }

    pub fn genesis(time: u64) -> Self {
        Block {
            header: BlockHeader {
                parent: Hash::ZERO,
                number: 0,
                nonce: 0,
                time,
                miner: String::new(),
            },
            txs: Vec::new(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.header.number == 0 && self.header.parent.is_zero()
    }

    /// Hash over the canonical JSON of the whole block, nonce included.
    /// Mutating any field, including the nonce, changes this digest.
    pub fn hash(&self) -> Result<Hash, serde_json::Error> {
        hash_of(self)
    }
}

/// The on-disk envelope: one line per block in the ledger file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockFS {
    pub hash: Hash,
    pub block: Block,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_zero_parent_and_number() {
        let g = Block::genesis(1579451695);
        assert!(g.is_genesis());
        assert_eq!(g.header.number, 0);
        assert!(g.header.parent.is_zero());
    }

    #[test]
    fn nonce_change_changes_hash() {
        let mut b = Block::new(
            BlockHeader {
                parent: Hash::ZERO,
                number: 1,
                nonce: 1,
                time: 0,
                miner: "andrej".into(),
            },
            vec![Tx::new("andrej".into(), "babayaga".into(), 1, "".into(), 0)],
        );
        let h1 = b.hash().unwrap();
        b.header.nonce = 2;
        let h2 = b.hash().unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn block_fs_round_trips_through_json() {
        let b = Block::genesis(0);
        let fs = BlockFS {
            hash: b.hash().unwrap(),
            block: b,
        };
        let line = serde_json::to_string(&fs).unwrap();
        let back: BlockFS = serde_json::from_str(&line).unwrap();
        assert_eq!(back.hash, fs.hash);
        assert_eq!(back.block, fs.block);
    }
}
