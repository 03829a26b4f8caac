pub mod block;
pub mod error;
pub mod fs_layout;
pub mod genesis;
pub mod hash;
pub mod miner;
pub mod state;
pub mod store;
pub mod transaction;

pub use block::{Block, BlockFS, BlockHeader};
pub use error::{LedgerError, Result};
pub use hash::Hash;
pub use miner::{mine, CancelToken, PendingBlock};
pub use state::State;
pub use transaction::{Account, Tx};
