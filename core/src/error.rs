use thiserror::Error;

/// The taxonomy of failures the ledger core can produce. Every variant is
/// distinct on purpose so callers (HTTP handlers, sync, the miner) can match
/// on `kind` rather than string-sniffing a message.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("wrong block height: expected {expected}, got {got}")]
    WrongHeight { expected: u64, got: u64 },

    #[error("wrong parent hash: expected {expected}, got {got}")]
    WrongParent { expected: String, got: String },

    #[error("insufficient funds: {from} has {balance}, needs {value}")]
    InsufficientFunds {
        from: String,
        balance: u64,
        value: u64,
    },

    #[error("block hash does not satisfy the proof-of-work predicate")]
    InvalidPow,

    #[error("cannot mine an empty block")]
    EmptyBlock,

    #[error("mining cancelled: {reason}")]
    MiningCancelled { reason: String },

    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
