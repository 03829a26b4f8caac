use std::net::SocketAddr;
use std::sync::Arc;

use ledger_config::Config;
use ledger_core::State;
use ledger_node::client::PeerClient;
use ledger_node::coordinator::Node;
use ledger_node::mining::{run_cancellation_watcher, run_mining_loop};
use ledger_node::sync::run_sync_loop;
use ledger_node::types::PeerNode;
use log::info;
use tokio::signal;

#[tokio::main]
async fn main() {
    println!("🚀 ledger node starting...");

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cfg = Config::load_with_cli();
    let data_dir = cfg.data_dir_resolved();

    print!("Initializing ledger state from {:?}...\n", data_dir);
    let state = State::new_from_disk(&data_dir).expect("failed to load ledger state from disk");

    let bootstrap = cfg.bootstrap.as_ref().map(|b| PeerNode {
        ip: b.ip.clone(),
        port: b.port,
        is_bootstrap: true,
        account: String::new(),
        connected: false,
    });

    let (node, _pending_rx, synced_blocks_rx) = Node::new(
        cfg.ip.clone(),
        cfg.port,
        cfg.miner.clone(),
        state,
        bootstrap,
    );

    info!(
        "[MAIN] node ready: account={} tip={}",
        node.account,
        node.block_hash()
    );

    let bind_addr: SocketAddr = format!("{}:{}", cfg.ip, cfg.port)
        .parse()
        .expect("invalid bind address");

    let server_handle = {
        let node = node.clone();
        tokio::spawn(async move {
            ledger_node::http::run_server(node, bind_addr).await;
        })
    };

    let sync_handle = {
        let node = node.clone();
        tokio::spawn(run_sync_loop(node, PeerClient::default()))
    };

    let mining_handle = {
        let node = node.clone();
        tokio::spawn(run_mining_loop(node))
    };

    let cancellation_handle = {
        let node = node.clone();
        tokio::spawn(run_cancellation_watcher(node, synced_blocks_rx))
    };

    match signal::ctrl_c().await {
        Ok(()) => println!("\n⚠️  shutdown signal received, stopping..."),
        Err(err) => eprintln!("error setting up signal handler: {}", err),
    }

    server_handle.abort();
    sync_handle.abort();
    mining_handle.abort();
    cancellation_handle.abort();

    println!(
        "🔍 Arc strong references remaining: {}",
        Arc::strong_count(&node)
    );
    println!("👋 ledger node stopped");
}
