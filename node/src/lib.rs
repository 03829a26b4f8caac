pub mod client;
pub mod coordinator;
pub mod http;
pub mod mining;
pub mod sync;
pub mod types;

pub use coordinator::{Node, NodeHandle};
pub use types::PeerNode;
