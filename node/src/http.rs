use std::net::SocketAddr;

use ledger_core::Tx;
use log::{error, info};
use warp::Filter;

use crate::coordinator::NodeHandle;
use crate::types::{BalancesRes, ErrRes, PeerQuery, PeerRes, StatusRes, SyncRes, TxAddReq, TxAddRes};

/// Wires the five HTTP endpoints the sync and client surfaces expect, and
/// serves them on `bind_addr`.
pub async fn run_server(node: NodeHandle, bind_addr: SocketAddr) {
    let node_filter = {
        let node = node.clone();
        warp::any().map(move || node.clone())
    };

    let balances_list = warp::path!("balances" / "list")
        .and(warp::get())
        .and(node_filter.clone())
        .and_then(|node: NodeHandle| async move {
            let (hash, balances) = node.balances();
            Ok::<_, warp::Rejection>(warp::reply::json(&BalancesRes {
                block_hash: hash,
                balances,
            }))
        });

    let tx_add = warp::path!("tx" / "add")
        .and(warp::post())
        .and(warp::body::json())
        .and(node_filter.clone())
        .and_then(|req: TxAddReq, node: NodeHandle| async move {
            let tx = Tx::new(
                req.from,
                req.to,
                req.value,
                req.data,
                now_unix(),
            );
            match node.add_pending_tx(tx) {
                Ok(_) => {
                    info!("[HTTP] accepted new tx into pending set");
                    Ok::<_, warp::Rejection>(warp::reply::json(&TxAddRes {
                        block_hash: node.block_hash(),
                    }))
                }
                Err(e) => {
                    error!("[HTTP] tx rejected: {}", e);
                    Ok::<_, warp::Rejection>(warp::reply::json(&ErrRes {
                        error: e.to_string(),
                    }))
                }
            }
        });

    let node_status = warp::path!("node" / "status")
        .and(warp::get())
        .and(node_filter.clone())
        .and_then(|node: NodeHandle| async move {
            Ok::<_, warp::Rejection>(warp::reply::json(&StatusRes {
                block_hash: node.block_hash(),
                block_number: node.block_number(),
                peers_known: node.peers(),
                pending_txs: node.pending_txs(),
            }))
        });

    let node_sync = warp::path!("node" / "sync")
        .and(warp::get())
        .and(warp::query::<std::collections::HashMap<String, String>>())
        .and(node_filter.clone())
        .and_then(
            |params: std::collections::HashMap<String, String>, node: NodeHandle| async move {
                let from_block = params
                    .get("fromBlock")
                    .and_then(|s| ledger_core::Hash::from_hex(s).ok())
                    .unwrap_or(ledger_core::Hash::ZERO);

                let blocks = node.blocks_after(from_block).unwrap_or_default();
                Ok::<_, warp::Rejection>(warp::reply::json(&SyncRes { blocks }))
            },
        );

    let node_peer = warp::path!("node" / "peer")
        .and(warp::get())
        .and(warp::query::<PeerQuery>())
        .and(node_filter.clone())
        .and_then(|query: PeerQuery, node: NodeHandle| async move {
            let peer = crate::types::PeerNode {
                ip: query.ip,
                port: query.port,
                is_bootstrap: false,
                account: query.miner,
                connected: true,
            };
            node.add_peer(peer);
            Ok::<_, warp::Rejection>(warp::reply::json(&PeerRes {
                known_peers: node.peers(),
                success: true,
                error: String::new(),
            }))
        });

    let routes = balances_list
        .or(tx_add)
        .or(node_status)
        .or(node_sync)
        .or(node_peer);

    warp::serve(routes).run(bind_addr).await;
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
