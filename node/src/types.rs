use ledger_core::{Account, Block, Hash, Tx};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A node we know about. `connected` reflects whether the handshake has
/// completed this run; it is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerNode {
    pub ip: String,
    pub port: u16,
    pub is_bootstrap: bool,
    pub account: Account,
    #[serde(skip, default)]
    pub connected: bool,
}

impl PeerNode {
    pub fn key(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrRes {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BalancesRes {
    pub block_hash: Hash,
    pub balances: HashMap<Account, u64>,
}

#[derive(Debug, Deserialize)]
pub struct TxAddReq {
    pub from: Account,
    pub to: Account,
    pub value: u64,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct TxAddRes {
    pub block_hash: Hash,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRes {
    pub block_hash: Hash,
    pub block_number: u64,
    pub peers_known: HashMap<String, PeerNode>,
    pub pending_txs: Vec<Tx>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncRes {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Deserialize)]
pub struct PeerQuery {
    pub ip: String,
    pub port: u16,
    pub miner: Account,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeerRes {
    pub known_peers: HashMap<String, PeerNode>,
    pub success: bool,
    pub error: String,
}
