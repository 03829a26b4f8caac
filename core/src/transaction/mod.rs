use serde::{Deserialize, Serialize};

use crate::hash::{hash_of, Hash};

pub type Account = String;

pub const REWARD_DATA: &str = "reward";

/// An account-model transfer. `data == "reward"` marks a reward tx, which
/// credits `to` without debiting `from`. `time` is part of the hash so two
/// otherwise-identical transfers are distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub from: Account,
    pub to: Account,
    pub value: u64,
    pub data: String,
    pub time: u64,
}

impl Tx {
    pub fn new(from: Account, to: Account, value: u64, data: String, time: u64) -> Self {
        Tx {
            from,
            to,
            value,
            data,
            time,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.data == REWARD_DATA
    }

    pub fn hash(&self) -> Result<Hash, serde_json::Error> {
        hash_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_tx_is_detected_by_data_field() {
        let tx = Tx::new("andrej".into(), "babayaga".into(), 100, REWARD_DATA.into(), 0);
        assert!(tx.is_reward());

        let tx2 = Tx::new("andrej".into(), "babayaga".into(), 100, "".into(), 0);
        assert!(!tx2.is_reward());
    }

    #[test]
    fn distinct_time_yields_distinct_hash() {
        let a = Tx::new("andrej".into(), "babayaga".into(), 1, "".into(), 1579451695);
        let b = Tx::new("andrej".into(), "babayaga".into(), 1, "".into(), 1579451696);
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }
}
