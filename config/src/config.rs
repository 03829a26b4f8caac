use clap::Parser;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// A peer to reach out to on startup, before any gossip has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAddr {
    pub ip: String,
    pub port: u16,
}

/// CLI overlay. Every field is optional: whatever the user doesn't pass
/// falls back to the config file, and whatever the config file doesn't set
/// falls back to `Config::default()`.
#[derive(Debug, Parser)]
#[command(name = "ledger-node", version, about = "Pedagogical proof-of-work ledger node")]
pub struct Cli {
    /// Override the data directory.
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Override the HTTP bind IP.
    #[arg(long)]
    pub ip: Option<String>,

    /// Override the HTTP bind port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Account name this node mines under.
    #[arg(long)]
    pub miner: Option<String>,

    /// A bootstrap peer to connect to, formatted "ip:port".
    #[arg(long)]
    pub bootstrap: Option<String>,

    /// Use an explicit config file instead of the default location.
    #[arg(long)]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: String,
    pub ip: String,
    pub port: u16,
    pub miner: String,
    pub bootstrap: Option<PeerAddr>,
}

impl Config {
    fn expand_path(path: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path);
        PathBuf::from(expanded.into_owned())
    }

    /// Compute the default data directory depending on the target OS.
    fn default_data_dir() -> String {
        let home = dirs::home_dir().expect("Cannot find home directory");

        if cfg!(target_os = "windows") {
            let base = dirs::data_dir().unwrap_or(home).join("ledger-node");
            return base.join("data").to_string_lossy().into_owned();
        }

        home.join(".ledger-node")
            .join("data")
            .to_string_lossy()
            .into_owned()
    }

    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().expect("Cannot find home directory");
        home.join(".ledger-node/config.json")
    }

    /// Data directory with tilde expansion applied.
    pub fn data_dir_resolved(&self) -> PathBuf {
        Self::expand_path(&self.data_dir)
    }

    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            println!(
                "Configuration file not found. Creating default configuration.: {:?}",
                path
            );
            let cfg = Self::default();
            cfg.save();
            return cfg;
        }
        let data = fs::read_to_string(&path).expect("Failed to read configuration file");
        serde_json::from_str(&data).expect("Configuration file format error")
    }

    pub fn load_from(path: &PathBuf) -> Self {
        let data = fs::read_to_string(path).expect("Failed to read configuration file");
        serde_json::from_str(&data).expect("Configuration file format error")
    }

    pub fn save(&self) {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let json = serde_json::to_string_pretty(self).unwrap();
        fs::write(&path, json).unwrap();
    }

    /// Parses CLI flags and layers them over the config file (or defaults).
    pub fn load_with_cli() -> Self {
        let cli = Cli::parse();
        let mut cfg = match &cli.config_path {
            Some(p) => Self::load_from(&PathBuf::from(p)),
            None => Self::load(),
        };

        if let Some(dir) = cli.data_dir {
            cfg.data_dir = dir;
        }
        if let Some(ip) = cli.ip {
            cfg.ip = ip;
        }
        if let Some(port) = cli.port {
            cfg.port = port;
        }
        if let Some(miner) = cli.miner {
            cfg.miner = miner;
        }
        if let Some(bootstrap) = cli.bootstrap {
            cfg.bootstrap = parse_peer_addr(&bootstrap);
        }

        cfg
    }

    pub fn view(&self) {
        println!("{}", serde_json::to_string_pretty(self).unwrap());
    }
}

fn parse_peer_addr(s: &str) -> Option<PeerAddr> {
    let (ip, port) = s.rsplit_once(':')?;
    Some(PeerAddr {
        ip: ip.to_string(),
        port: port.parse().ok()?,
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            ip: "127.0.0.1".to_string(),
            port: 8080,
            miner: "andrej".to_string(),
            bootstrap: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ip_and_port_from_bootstrap_string() {
        let p = parse_peer_addr("127.0.0.1:8081").unwrap();
        assert_eq!(p.ip, "127.0.0.1");
        assert_eq!(p.port, 8081);
    }

    #[test]
    fn rejects_a_bootstrap_string_without_a_port() {
        assert!(parse_peer_addr("127.0.0.1").is_none());
    }

    #[test]
    fn default_config_has_sane_bind_address() {
        let cfg = Config::default();
        assert_eq!(cfg.ip, "127.0.0.1");
        assert_eq!(cfg.port, 8080);
        assert!(cfg.bootstrap.is_none());
    }
}
