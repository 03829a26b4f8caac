use std::time::Duration;

use ledger_core::Block;
use log::warn;
use tokio::sync::mpsc;

use crate::coordinator::NodeHandle;

const MINING_TICK: Duration = Duration::from_secs(10);

/// Every tick, attempts to mine the current pending set into a block if
/// nothing is already in flight. The actual proof-of-work search runs on a
/// blocking thread so it never starves the reactor driving HTTP and sync.
pub async fn run_mining_loop(node: NodeHandle) {
    let mut ticker = tokio::time::interval(MINING_TICK);
    loop {
        ticker.tick().await;
        try_mine(node.clone()).await;
    }
}

async fn try_mine(node: NodeHandle) {
    let Some((pb, cancel)) = node.begin_mining() else {
        return;
    };

    let join_result = tokio::task::spawn_blocking(move || ledger_core::mine(&pb, &cancel)).await;

    match join_result {
        Ok(Ok(block)) => node.finish_mining_success(block),
        Ok(Err(e)) => node.finish_mining_failure(e),
        Err(join_err) => {
            warn!("[MINING] mining task panicked or was aborted: {}", join_err);
        }
    }
}

/// Watches the synced-blocks channel for the lifetime of the node: whenever
/// sync imports a block while a mining attempt is in flight, this cancels
/// it and prunes now-confirmed txs out of the pending set.
pub async fn run_cancellation_watcher(node: NodeHandle, mut synced_blocks: mpsc::UnboundedReceiver<Block>) {
    while let Some(block) = synced_blocks.recv().await {
        node.on_synced_block(&block);
    }
}
