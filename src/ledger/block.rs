use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

use super::transaction::Transaction;

/// Error produced when a block cannot be serialized for hashing
#[derive(Debug, Error)]
#[error("Failed to serialize block for hashing: {0}")]
pub struct HashError(#[from] serde_json::Error);

/// A SHA-256 content address: 32 bytes, rendered externally as a
/// 64-character lowercase hex string
///
/// The all-zero hash denotes "no parent" and appears only in the header of
/// the first block of a chain.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Hash([u8; 32]);

impl Hash {
    /// The "no parent" hash: all zero bytes
    pub const ZERO: Hash = Hash([0u8; 32]);
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Hash(bytes))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// The header linking a block into the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of the previous block, or the zero hash for the first block
    pub parent: Hash,

    /// Unix timestamp of block construction
    pub time: u64,
}

/// A batch of transactions chained to its predecessor by hash
///
/// Transaction order inside the payload is significant: later transactions
/// observe the balance mutations made by earlier ones in the same block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Vec<Transaction>,
}

impl Block {
    /// Creates a new block
    ///
    /// # Arguments
    ///
    /// * `parent` - The hash of the preceding block (zero for the first)
    /// * `time` - Unix timestamp of construction
    /// * `payload` - The transactions carried by this block
    pub fn new(parent: Hash, time: u64, payload: Vec<Transaction>) -> Self {
        Block {
            header: BlockHeader { parent, time },
            payload,
        }
    }

    /// Computes the content address of this block
    ///
    /// The digest is SHA-256 over the block's canonical JSON encoding:
    /// compact (no whitespace), `header` before `payload`, `parent` before
    /// `time` inside the header, and each payload entry as
    /// `{"from","to","value","data"}`. The encoding is deterministic across
    /// processes, so the chain can be independently re-derived.
    pub fn hash(&self) -> Result<Hash, HashError> {
        let encoded = serde_json::to_vec(self)?;

        let mut hasher = Sha256::new();
        hasher.update(&encoded);

        Ok(Hash(hasher.finalize().into()))
    }
}

/// The unit persisted to the block log: a block keyed by its own hash
///
/// The hash is computed once, before writing, and is trusted on read; replay
/// never recomputes it. `State::verify` is the opt-in integrity check for
/// callers that do not want to trust disk contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnvelope {
    pub hash: Hash,
    pub block: Block,
}

impl BlockEnvelope {
    /// Hashes a block and wraps it for persistence
    pub fn seal(block: Block) -> Result<Self, HashError> {
        let hash = block.hash()?;
        Ok(BlockEnvelope { hash, block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Account;

    fn sample_payload() -> Vec<Transaction> {
        vec![
            Transaction::Transfer {
                from: Account::new("alice"),
                to: Account::new("bob"),
                value: 5,
            },
            Transaction::Reward {
                to: Account::new("alice"),
                value: 100,
            },
        ]
    }

    #[test]
    fn test_zero_hash_renders_as_64_zeros() {
        assert_eq!(Hash::ZERO.to_string(), "0".repeat(64));
        assert_eq!(Hash::default(), Hash::ZERO);
    }

    #[test]
    fn test_hash_hex_round_trip() {
        let block = Block::new(Hash::ZERO, 1, sample_payload());
        let hash = block.hash().unwrap();

        let text = hash.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text, text.to_lowercase());

        let parsed: Hash = text.parse().unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn test_hash_rejects_malformed_hex() {
        assert!("abc".parse::<Hash>().is_err());
        assert!("zz".repeat(32).parse::<Hash>().is_err());
        assert!("00".repeat(33).parse::<Hash>().is_err());
    }

    #[test]
    fn test_canonical_block_encoding() {
        let block = Block::new(
            Hash::ZERO,
            1631216422,
            vec![Transaction::Transfer {
                from: Account::new("alice"),
                to: Account::new("bob"),
                value: 5,
            }],
        );

        let expected = format!(
            "{{\"header\":{{\"parent\":\"{}\",\"time\":1631216422}},\
             \"payload\":[{{\"from\":\"alice\",\"to\":\"bob\",\"value\":5,\"data\":\"\"}}]}}",
            "0".repeat(64)
        );
        assert_eq!(serde_json::to_string(&block).unwrap(), expected);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = Block::new(Hash::ZERO, 42, sample_payload());
        let b = Block::new(Hash::ZERO, 42, sample_payload());

        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn test_hash_is_sensitive_to_every_field() {
        let base = Block::new(Hash::ZERO, 42, sample_payload());
        let base_hash = base.hash().unwrap();

        let other_time = Block::new(Hash::ZERO, 43, sample_payload());
        assert_ne!(other_time.hash().unwrap(), base_hash);

        let other_parent = Block::new(base_hash, 42, sample_payload());
        assert_ne!(other_parent.hash().unwrap(), base_hash);

        let mut other_payload = sample_payload();
        other_payload[0] = Transaction::Transfer {
            from: Account::new("alice"),
            to: Account::new("bob"),
            value: 6,
        };
        let other_tx = Block::new(Hash::ZERO, 42, other_payload);
        assert_ne!(other_tx.hash().unwrap(), base_hash);
    }

    #[test]
    fn test_envelope_seal_and_round_trip() {
        let block = Block::new(Hash::ZERO, 7, sample_payload());
        let envelope = BlockEnvelope::seal(block.clone()).unwrap();

        assert_eq!(envelope.hash, block.hash().unwrap());

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.starts_with("{\"hash\":\""));

        let back: BlockEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
