//! Image archive kept beside the credential ledger
//!
//! Uploaded images receive sequential numeric codes starting at 1. Every
//! retrieval is appended to the image's access log with the retrieving user
//! and a UTC timestamp. The archive is a single JSON document rewritten as a
//! whole on each change, with the same write options as the ledger.

use crate::error::LedgerError;
use crate::persistence::{encode_pretty, read_snapshot, write_snapshot, FileStoreOptions};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// One entry in an image's access log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retrieval {
    pub user: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub id: u64,
    pub username: String,
    pub image_data: String,
    pub timestamp: String,
    #[serde(default)]
    pub retrieved_by: Vec<Retrieval>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArchive {
    #[serde(default)]
    pub images: Vec<StoredImage>,
}

impl ImageArchive {
    /// Code for the next upload. Hand-edited archives with gaps never
    /// reuse an existing code.
    pub fn next_code(&self) -> u64 {
        self.images.iter().map(|img| img.id).max().unwrap_or(0) + 1
    }

    pub fn find_mut(&mut self, code: u64) -> Option<&mut StoredImage> {
        self.images.iter_mut().find(|img| img.id == code)
    }
}

/// Retrieval code as sent by clients: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ImageCode {
    Number(u64),
    Text(String),
}

impl ImageCode {
    /// Numeric value of the code. Strings contribute their leading digits
    /// after surrounding whitespace; a string without any yields `None`.
    pub fn value(&self) -> Option<u64> {
        match self {
            ImageCode::Number(n) => Some(*n),
            ImageCode::Text(s) => {
                let trimmed = s.trim_start().trim_start_matches('+');
                let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            }
        }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct ImageStore {
    path: PathBuf,
    options: FileStoreOptions,
    write_lock: Mutex<()>,
}

impl ImageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, FileStoreOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: FileStoreOptions) -> Self {
        ImageStore {
            path: path.into(),
            options,
            write_lock: Mutex::new(()),
        }
    }

    /// Current archive. A missing file is an empty archive.
    pub fn load(&self) -> Result<ImageArchive, LedgerError> {
        match read_snapshot(&self.path)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                LedgerError::FormatError(format!(
                    "Failed to parse image archive {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            None => Ok(ImageArchive::default()),
        }
    }

    fn save(&self, archive: &ImageArchive) -> Result<(), LedgerError> {
        let bytes = encode_pretty(archive)?;
        write_snapshot(&self.path, &bytes, &self.options)
    }

    /// Store `image_data` for `username` and return its retrieval code.
    pub fn upload(&self, username: &str, image_data: &str) -> Result<u64, LedgerError> {
        let _writer = self.write_lock.lock();

        let mut archive = self.load()?;
        let code = archive.next_code();
        archive.images.push(StoredImage {
            id: code,
            username: username.to_string(),
            image_data: image_data.to_string(),
            timestamp: now_iso(),
            retrieved_by: Vec::new(),
        });
        self.save(&archive)?;

        info!(username, code, bytes = image_data.len(), "image stored");
        Ok(code)
    }

    /// Image data stored under `code`, logging `username` as a reader.
    /// `Ok(None)` when no image carries the code; nothing is written then.
    pub fn retrieve(&self, code: u64, username: &str) -> Result<Option<String>, LedgerError> {
        let _writer = self.write_lock.lock();

        let mut archive = self.load()?;
        let image_data = match archive.find_mut(code) {
            Some(image) => {
                image.retrieved_by.push(Retrieval {
                    user: username.to_string(),
                    timestamp: now_iso(),
                });
                image.image_data.clone()
            }
            None => {
                debug!(code, "image not found");
                return Ok(None);
            }
        };
        self.save(&archive)?;

        info!(username, code, "image retrieved");
        Ok(Some(image_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> ImageStore {
        ImageStore::new(temp_dir.path().join("images.json"))
    }

    #[test]
    fn test_codes_are_sequential() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        assert_eq!(store.upload("alice", "data:image/png;base64,AAAA").unwrap(), 1);
        assert_eq!(store.upload("bob", "data:image/png;base64,BBBB").unwrap(), 2);
        assert_eq!(store.load().unwrap().images.len(), 2);
    }

    #[test]
    fn test_retrieval_is_logged() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let code = store.upload("alice", "AAAA").unwrap();

        assert_eq!(store.retrieve(code, "bob").unwrap().as_deref(), Some("AAAA"));
        assert_eq!(store.retrieve(code, "carol").unwrap().as_deref(), Some("AAAA"));

        let archive = store.load().unwrap();
        let readers: Vec<&str> = archive.images[0]
            .retrieved_by
            .iter()
            .map(|r| r.user.as_str())
            .collect();
        assert_eq!(readers, vec!["bob", "carol"]);
        assert!(archive.images[0].retrieved_by[0].timestamp.ends_with('Z'));
    }

    #[test]
    fn test_unknown_code_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        assert_eq!(store.retrieve(7, "bob").unwrap(), None);
        assert!(!temp_dir.path().join("images.json").exists());
    }

    #[test]
    fn test_next_code_skips_past_gaps() {
        let mut archive = ImageArchive::default();
        for id in [1, 5] {
            archive.images.push(StoredImage {
                id,
                username: "alice".to_string(),
                image_data: String::new(),
                timestamp: now_iso(),
                retrieved_by: Vec::new(),
            });
        }
        assert_eq!(archive.next_code(), 6);
    }

    #[test]
    fn test_archive_uses_camel_case_fields() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.upload("alice", "AAAA").unwrap();

        let text = std::fs::read_to_string(temp_dir.path().join("images.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["images"][0]["imageData"], "AAAA");
        assert!(value["images"][0]["retrievedBy"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_code_parsing() {
        let parse = |s: &str| serde_json::from_str::<ImageCode>(s).unwrap().value();
        assert_eq!(parse("3"), Some(3));
        assert_eq!(parse("\"12\""), Some(12));
        assert_eq!(parse("\" 4abc\""), Some(4));
        assert_eq!(parse("\"abc\""), None);
        assert_eq!(parse("\"-2\""), None);
    }
}
