use std::time::Duration;

use ledger_core::{Account, Hash};
use reqwest::Client;

use crate::types::{PeerRes, StatusRes, SyncRes};

const PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// A thin reqwest wrapper for the handful of calls the sync engine makes
/// against a peer. Every call carries a bounded timeout so a stalled peer
/// cannot block a sync tick indefinitely.
#[derive(Clone)]
pub struct PeerClient {
    http: Client,
}

impl Default for PeerClient {
    fn default() -> Self {
        let http = Client::builder()
            .connect_timeout(PEER_TIMEOUT)
            .timeout(PEER_TIMEOUT)
            .build()
            .expect("failed to build peer http client");
        PeerClient { http }
    }
}

impl PeerClient {
    pub async fn status(&self, ip: &str, port: u16) -> reqwest::Result<StatusRes> {
        let url = format!("http://{}:{}/node/status", ip, port);
        self.http.get(url).send().await?.json().await
    }

    pub async fn handshake(
        &self,
        ip: &str,
        port: u16,
        self_ip: &str,
        self_port: u16,
        self_account: &Account,
    ) -> reqwest::Result<PeerRes> {
        let url = format!(
            "http://{}:{}/node/peer?ip={}&port={}&miner={}",
            ip, port, self_ip, self_port, self_account
        );
        self.http.get(url).send().await?.json().await
    }

    pub async fn sync_from(&self, ip: &str, port: u16, from_block: Hash) -> reqwest::Result<SyncRes> {
        let url = format!(
            "http://{}:{}/node/sync?fromBlock={}",
            ip,
            port,
            from_block.to_hex()
        );
        self.http.get(url).send().await?.json().await
    }
}
