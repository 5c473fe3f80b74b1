use crate::error::LedgerError;
use std::collections::HashMap;
use std::fmt;

use super::chain::{Chain, GENESIS_PREVIOUS_HASH};

/// Check every block's `previous_hash` against its predecessor. Returns the
/// index of the first broken link.
pub fn validate_linkage(chain: &Chain) -> Result<(), LedgerError> {
    let mut expected = GENESIS_PREVIOUS_HASH;
    for (i, block) in chain.iter().enumerate() {
        if block.previous_hash != expected {
            return Err(LedgerError::InvalidBlockLinkage(i));
        }
        expected = block.hash.as_str();
    }
    Ok(())
}

/// Linkage-only verification. Digests are not recomputed.
pub fn verify_chain(chain: &Chain) -> bool {
    validate_linkage(chain).is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainIssue {
    BrokenLink { index: usize },
    HashMismatch { index: usize },
    DuplicateUsername { index: usize, first: usize },
    Unhashable { index: usize, reason: String },
}

impl fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainIssue::BrokenLink { index } if *index == 0 => {
                write!(f, "block 0 does not link to the genesis sentinel")
            }
            ChainIssue::BrokenLink { index } => {
                write!(f, "block {} previous_hash mismatch", index)
            }
            ChainIssue::HashMismatch { index } => write!(f, "block {} hash mismatch", index),
            ChainIssue::DuplicateUsername { index, first } => write!(
                f,
                "block {} repeats the username of block {} and is unreachable",
                index, first
            ),
            ChainIssue::Unhashable { index, reason } => {
                write!(f, "block {} could not be hashed: {}", index, reason)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    pub length: usize,
    pub issues: Vec<ChainIssue>,
}

impl ChainReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn linkage_ok(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| matches!(i, ChainIssue::BrokenLink { .. }))
    }
}

/// Full audit: linkage, digest recomputation and username uniqueness.
///
/// Ledgers written by deployments that hashed a second timestamp report
/// `HashMismatch` for every block while their linkage stays intact.
pub fn audit_chain(chain: &Chain) -> ChainReport {
    let mut issues = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut expected = GENESIS_PREVIOUS_HASH;

    for (index, block) in chain.iter().enumerate() {
        if block.previous_hash != expected {
            issues.push(ChainIssue::BrokenLink { index });
        }
        expected = block.hash.as_str();

        match block.calculate_hash() {
            Ok(h) if h != block.hash => issues.push(ChainIssue::HashMismatch { index }),
            Ok(_) => {}
            Err(e) => issues.push(ChainIssue::Unhashable {
                index,
                reason: e.to_string(),
            }),
        }

        // Records without a username are never looked up, so never shadowed.
        if let Some(username) = block.username() {
            if let Some(first) = seen.get(username) {
                issues.push(ChainIssue::DuplicateUsername {
                    index,
                    first: *first,
                });
            } else {
                seen.insert(username, index);
            }
        }
    }

    ChainReport {
        length: chain.len(),
        issues,
    }
}
