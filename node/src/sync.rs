use std::time::Duration;

use anyhow::anyhow;
use log::{info, warn};

use crate::client::PeerClient;
use crate::coordinator::NodeHandle;
use crate::types::PeerNode;

const SYNC_TICK: Duration = Duration::from_secs(10);

/// Every tick, tries each known peer in turn and stops at the first one
/// that completes a full status -> handshake -> import -> gossip pass
/// without error.
pub async fn run_sync_loop(node: NodeHandle, client: PeerClient) {
    let mut ticker = tokio::time::interval(SYNC_TICK);
    loop {
        ticker.tick().await;
        sync_once(&node, &client).await;
    }
}

/// Why a pass with one peer didn't complete. Only `Unreachable` (the
/// status or handshake call itself failed) evicts the peer; a rejected
/// handshake or a block the local ledger refuses just fails this tick's
/// iteration, retried next tick.
enum SyncFailure {
    Unreachable(anyhow::Error),
    Rejected(anyhow::Error),
}

async fn sync_once(node: &NodeHandle, client: &PeerClient) {
    let self_key = node.self_key();
    let peers: Vec<PeerNode> = node
        .peers()
        .into_values()
        .filter(|p| p.key() != self_key)
        .collect();

    for peer in peers {
        match sync_with_peer(node, client, &peer).await {
            Ok(()) => {
                info!("[SYNC] completed a sync pass with {}", peer.key());
                return;
            }
            Err(SyncFailure::Unreachable(e)) => {
                warn!("[SYNC] peer {} unreachable: {}, evicting", peer.key(), e);
                node.remove_peer(&peer.key());
            }
            Err(SyncFailure::Rejected(e)) => {
                warn!("[SYNC] peer {} failed this pass: {}", peer.key(), e);
            }
        }
    }
}

async fn sync_with_peer(
    node: &NodeHandle,
    client: &PeerClient,
    peer: &PeerNode,
) -> Result<(), SyncFailure> {
    let status = client
        .status(&peer.ip, peer.port)
        .await
        .map_err(|e| SyncFailure::Unreachable(anyhow!("status probe failed: {}", e)))?;

    if !peer.connected {
        let handshake = client
            .handshake(&peer.ip, peer.port, &node.self_ip, node.self_port, &node.account)
            .await
            .map_err(|e| SyncFailure::Unreachable(anyhow!("handshake failed: {}", e)))?;
        if !handshake.success {
            return Err(SyncFailure::Rejected(anyhow!(
                "peer rejected handshake: {}",
                handshake.error
            )));
        }
        node.mark_peer_connected(&peer.key());
        for (key, known) in handshake.known_peers {
            if key != node.self_key() {
                node.add_peer(known);
            }
        }
    }

    let local_number = node.block_number();
    let local_hash = node.block_hash();
    let peer_has_blocks_we_lack = !status.block_hash.is_zero() && status.block_number >= local_number;

    if peer_has_blocks_we_lack {
        let sync_res = client
            .sync_from(&peer.ip, peer.port, local_hash)
            .await
            .map_err(|e| SyncFailure::Unreachable(anyhow!("block fetch failed: {}", e)))?;
        for block in sync_res.blocks {
            node.import_synced_block(block)
                .map_err(|e| SyncFailure::Rejected(anyhow!("imported block rejected: {}", e)))?;
        }
    }

    for (key, known) in status.peers_known {
        if key != node.self_key() {
            node.add_peer(known);
        }
    }

    for tx in status.pending_txs {
        let _ = node.add_pending_tx(tx);
    }

    Ok(())
}
