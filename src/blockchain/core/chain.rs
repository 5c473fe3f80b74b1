use super::encoding::{float_repr, to_spaced_ascii_json};
use crate::crypto::{hash_password, sha256_hex};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// `previous_hash` of the first block in a chain.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

pub fn genesis_hash() -> &'static str {
    GENESIS_PREVIOUS_HASH
}

/// Wall-clock seconds since the Unix epoch, microsecond resolution.
pub fn current_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Payload of a block: a username and the hex digest of its password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// `null` in ledgers that accepted registrations without a username.
    /// Such records are kept but no lookup ever matches them.
    pub username: Option<String>,
    pub password: String,
}

impl CredentialRecord {
    /// Build a record from a plaintext password.
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: Some(username.into()),
            password: hash_password(password),
        }
    }
}

/// Digest of a block: SHA-256 over [`float_repr`] of the timestamp followed
/// by the payload in spaced, ASCII-escaped JSON.
pub fn compute_hash(timestamp: f64, data: &CredentialRecord) -> Result<String> {
    let mut preimage = float_repr(timestamp).into_bytes();
    preimage.extend(to_spaced_ascii_json(data)?);
    Ok(sha256_hex(&preimage))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: f64,
    pub data: CredentialRecord,
    pub previous_hash: String,
    pub hash: String,
}

impl Block {
    pub fn new(previous_hash: impl Into<String>, data: CredentialRecord) -> Result<Self> {
        Self::with_timestamp(current_timestamp(), previous_hash, data)
    }

    /// The same timestamp is stored and folded into the digest.
    pub fn with_timestamp(
        timestamp: f64,
        previous_hash: impl Into<String>,
        data: CredentialRecord,
    ) -> Result<Self> {
        let hash = compute_hash(timestamp, &data)?;
        Ok(Block {
            timestamp,
            data,
            previous_hash: previous_hash.into(),
            hash,
        })
    }

    pub fn calculate_hash(&self) -> Result<String> {
        compute_hash(self.timestamp, &self.data)
    }

    pub fn username(&self) -> Option<&str> {
        self.data.username.as_deref()
    }
}

/// Ordered, append-only sequence of blocks. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain {
    pub blocks: Vec<Block>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Hash the next block must link to.
    pub fn last_hash(&self) -> &str {
        self.blocks
            .last()
            .map(|b| b.hash.as_str())
            .unwrap_or(GENESIS_PREVIOUS_HASH)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Append a new block carrying `data`, linked to the current tip.
    ///
    /// The block is fully built before it is pushed, so on error the chain
    /// is left as it was.
    pub fn append(&mut self, data: CredentialRecord) -> Result<&Block> {
        let block = Block::new(self.last_hash(), data)?;
        self.blocks.push(block);
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    /// First block, in insertion order, whose record carries `username`.
    /// Later blocks with the same username are unreachable.
    pub fn find_by_username(&self, username: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.username() == Some(username))
    }

    pub fn contains_username(&self, username: &str) -> bool {
        self.find_by_username(username).is_some()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> CredentialRecord {
        CredentialRecord::new(name, "secret")
    }

    #[test]
    fn test_first_block_links_to_genesis() {
        let mut chain = Chain::new();
        assert_eq!(chain.last_hash(), "0");

        let block = chain.append(record("alice")).unwrap();
        assert_eq!(block.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis_hash(), "0");
    }

    #[test]
    fn test_blocks_link_to_predecessor() {
        let mut chain = Chain::new();
        for name in ["a", "b", "c", "d"] {
            chain.append(record(name)).unwrap();
        }

        for i in 1..chain.len() {
            assert_eq!(chain.blocks[i].previous_hash, chain.blocks[i - 1].hash);
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        let data = record("alice");
        let h1 = compute_hash(1700000000.25, &data).unwrap();
        let h2 = compute_hash(1700000000.25, &data).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);

        let other = compute_hash(1700000000.5, &data).unwrap();
        assert_ne!(h1, other);
    }

    #[test]
    fn test_hash_matches_existing_ledgers() {
        // Digests taken from ledgers written by the earlier service.
        assert_eq!(
            compute_hash(1700000000.0, &record("alice")).unwrap(),
            "643b92d1b5adba826df26025a15ea0dd7a2ad0f246c26efc54f32c4728a72a1a"
        );
        assert_eq!(
            compute_hash(1700000000.25, &record("jos\u{e9}")).unwrap(),
            "92176add09d9d602e99dc3ff08c9aa16b6d64e4bda4136c21a64f1047a3c3a2d"
        );

        let anonymous = CredentialRecord {
            username: None,
            password: hash_password("x"),
        };
        assert_eq!(
            compute_hash(1700000042.5, &anonymous).unwrap(),
            "a462537a2d03859755d3d1fca06f6f4dad30256628e3c0d109e77f3aa8ea73fa"
        );
    }

    #[test]
    fn test_null_username_never_matches() {
        let mut chain = Chain::new();
        chain
            .append(CredentialRecord {
                username: None,
                password: hash_password("x"),
            })
            .unwrap();
        chain.append(record("bob")).unwrap();

        assert!(chain.find_by_username("").is_none());
        assert!(chain.find_by_username("null").is_none());
        assert_eq!(chain.find_by_username("bob").unwrap().username(), Some("bob"));
    }

    #[test]
    fn test_stored_timestamp_reproduces_hash() {
        let block = Block::new("0", record("alice")).unwrap();
        assert_eq!(block.calculate_hash().unwrap(), block.hash);
    }

    #[test]
    fn test_find_by_username_first_match_wins() {
        let mut chain = Chain::new();
        chain.append(CredentialRecord::new("bob", "first")).unwrap();
        chain.append(record("carol")).unwrap();
        // Duplicates can only appear in hand-edited ledgers.
        chain.append(CredentialRecord::new("bob", "second")).unwrap();

        let found = chain.find_by_username("bob").unwrap();
        assert_eq!(found.data.password, hash_password("first"));
        assert!(chain.find_by_username("dave").is_none());
        assert!(chain.contains_username("carol"));
    }

    #[test]
    fn test_empty_strings_are_accepted() {
        let mut chain = Chain::new();
        chain.append(CredentialRecord::new("", "")).unwrap();
        assert!(chain.contains_username(""));
    }

    #[test]
    fn test_chain_serializes_as_array() {
        let mut chain = Chain::new();
        chain.append(record("alice")).unwrap();

        let value = serde_json::to_value(&chain).unwrap();
        let blocks = value.as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0]["timestamp"].is_number());
        assert_eq!(blocks[0]["data"]["username"], "alice");
        assert_eq!(blocks[0]["previous_hash"], "0");
        assert_eq!(
            blocks[0]["hash"],
            compute_hash(chain.blocks[0].timestamp, &chain.blocks[0].data).unwrap()
        );
        assert!(blocks[0]["hash"].is_string());
    }
}
