use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte SHA-256 digest, serialized as lowercase hex in JSON and in its
/// `Display`/`Debug` forms. This is the only hash type the ledger uses; block
/// hashes and tx hashes share it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Hash(arr))
    }

    /// First three hex digits zero, fourth non-zero: the difficulty predicate
    /// every persisted block hash must satisfy.
    pub fn satisfies_pow(&self) -> bool {
        let hex = self.to_hex();
        let digits = hex.as_bytes();
        digits.len() >= 4
            && digits[0] == b'0'
            && digits[1] == b'0'
            && digits[2] == b'0'
            && digits[3] != b'0'
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hashes any serializable value as SHA-256 over its canonical JSON encoding.
/// Field order and numeric encoding are part of this digest, so renaming or
/// reordering struct fields changes every hash that depends on them.
pub fn hash_of<T: Serialize>(value: &T) -> Result<Hash, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(Hash(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_round_trips_through_hex() {
        assert_eq!(Hash::ZERO.to_hex(), "0".repeat(64));
        assert!(Hash::ZERO.is_zero());
        assert_eq!(Hash::from_hex(&Hash::ZERO.to_hex()).unwrap(), Hash::ZERO);
    }

    #[test]
    fn pow_predicate_matches_first_four_digits() {
        let h = Hash::from_hex(
            "000000fa04f8160395c387277f8b2f14837603383d33809a4db586086168edfa",
        )
        .unwrap();
        assert!(h.satisfies_pow());

        let h2 = Hash::from_hex(
            "000001fa04f8160395c387277f8b2f14837603383d33809a4db586086168edfa",
        )
        .unwrap();
        assert!(!h2.satisfies_pow());
    }

    #[test]
    fn hash_of_is_stable_for_identical_values() {
        let a = serde_json::json!({"from": "andrej", "to": "babayaga", "value": 1});
        let b = serde_json::json!({"from": "andrej", "to": "babayaga", "value": 1});
        assert_eq!(hash_of(&a).unwrap(), hash_of(&b).unwrap());
    }
}
