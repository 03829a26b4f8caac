use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::fs_layout::{genesis_path, init_data_dir_if_not_exists};
use crate::transaction::Account;

/// The genesis file's on-disk shape. Only `balances` is consulted by the
/// core; `time`/`chain_id` exist for humans reading the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genesis {
    pub balances: HashMap<Account, u64>,
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub chain_id: String,
}

impl Genesis {
    pub fn load(data_dir: &Path) -> Result<Genesis> {
        init_data_dir_if_not_exists(data_dir)?;
        let path = genesis_path(data_dir);
        if !path.exists() {
            let genesis = Genesis::default();
            genesis.write(data_dir)?;
            return Ok(genesis);
        }
        let raw = std::fs::read_to_string(&path)?;
        let genesis: Genesis = serde_json::from_str(&raw)?;
        Ok(genesis)
    }

    pub fn write(&self, data_dir: &Path) -> Result<()> {
        init_data_dir_if_not_exists(data_dir)?;
        let path = genesis_path(data_dir);
        let json = serde_json::to_string_pretty(self).map_err(LedgerError::Decode)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for Genesis {
    fn default() -> Self {
        let mut balances = HashMap::new();
        balances.insert("andrej".to_string(), 1_000_000u64);
        Genesis {
            balances,
            time: 0,
            chain_id: "ledger-devnet".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_creates_default_genesis_if_missing() {
        let dir = tempdir().unwrap();
        let g = Genesis::load(dir.path()).unwrap();
        assert_eq!(g.balances.get("andrej"), Some(&1_000_000));
        assert!(genesis_path(dir.path()).exists());
    }

    #[test]
    fn load_reads_back_an_existing_genesis() {
        let dir = tempdir().unwrap();
        let mut balances = HashMap::new();
        balances.insert("alice".to_string(), 42u64);
        let g = Genesis {
            balances,
            time: 7,
            chain_id: "test".to_string(),
        };
        g.write(dir.path()).unwrap();

        let loaded = Genesis::load(dir.path()).unwrap();
        assert_eq!(loaded.balances.get("alice"), Some(&42));
        assert_eq!(loaded.chain_id, "test");
    }
}
