//! Ledger persistence layer for credchain
//!
//! The ledger is stored as a whole-file snapshot: every save rewrites the
//! complete chain. Each call opens, reads or writes, and closes the backing
//! file; no handle outlives an operation.

use crate::blockchain::{validate_linkage, Chain};
use crate::error::LedgerError;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const BACKUP_SUFFIX: &str = ".backup";
const TEMP_SUFFIX: &str = ".tmp";

/// Abstraction for ledger backends. A missing ledger loads as an empty
/// chain; a save replaces the stored chain as a whole.
pub trait Persistence: Send + Sync {
    fn load_chain(&self) -> Result<Chain, LedgerError>;
    fn save_chain(&self, chain: &Chain) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone)]
pub struct FileStoreOptions {
    /// Write to a temporary file, fsync, then rename over the ledger.
    pub atomic_writes: bool,
    /// Copy the previous ledger to `<path>.backup` before each save.
    pub backup: bool,
    /// Reject chains with broken linkage on load.
    pub verify_on_load: bool,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            atomic_writes: true,
            backup: false,
            verify_on_load: false,
        }
    }
}

/// `<path><suffix>` beside `path`, on the same filesystem.
pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Pretty JSON with a four-space indent.
pub(crate) fn encode_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Read a whole snapshot file. `Ok(None)` when it does not exist yet.
pub(crate) fn read_snapshot(path: &Path) -> Result<Option<Vec<u8>>, LedgerError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LedgerError::IoError(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Replace the snapshot at `path` with `bytes`, honouring `options`.
pub(crate) fn write_snapshot(
    path: &Path,
    bytes: &[u8],
    options: &FileStoreOptions,
) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                LedgerError::IoError(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    if options.backup && path.exists() {
        fs::copy(path, sibling(path, BACKUP_SUFFIX))
            .map_err(|e| LedgerError::IoError(format!("Failed to create backup: {}", e)))?;
    }

    if options.atomic_writes {
        write_atomic(path, bytes)
    } else {
        write_in_place(path, bytes)
    }
}

fn write_in_place(path: &Path, bytes: &[u8]) -> Result<(), LedgerError> {
    let mut file = File::create(path).map_err(|e| {
        LedgerError::IoError(format!("Failed to open {} for writing: {}", path.display(), e))
    })?;
    file.write_all(bytes)
        .map_err(|e| LedgerError::IoError(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LedgerError> {
    let temp_path = sibling(path, TEMP_SUFFIX);
    let mut file = File::create(&temp_path)
        .map_err(|e| LedgerError::IoError(format!("Failed to create temp file: {}", e)))?;

    if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(LedgerError::IoError(format!("Failed to write {}: {}", path.display(), e)));
    }
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LedgerError::IoError(format!("Failed to finalize write of {}: {}", path.display(), e))
    })
}

/// JSON array of blocks in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    options: FileStoreOptions,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, FileStoreOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: FileStoreOptions) -> Self {
        JsonFileStore {
            path: path.into(),
            options,
        }
    }
}

impl Persistence for JsonFileStore {
    fn load_chain(&self) -> Result<Chain, LedgerError> {
        let contents = match read_snapshot(&self.path)? {
            Some(bytes) => bytes,
            None => {
                debug!(path = %self.path.display(), "ledger absent, starting empty chain");
                return Ok(Chain::new());
            }
        };

        let chain: Chain = serde_json::from_slice(&contents).map_err(|e| {
            LedgerError::FormatError(format!("Failed to parse ledger {}: {}", self.path.display(), e))
        })?;

        if self.options.verify_on_load {
            if let Err(e) = validate_linkage(&chain) {
                warn!(path = %self.path.display(), error = %e, "ledger failed verification");
                return Err(e);
            }
        }

        Ok(chain)
    }

    fn save_chain(&self, chain: &Chain) -> Result<(), LedgerError> {
        let bytes = encode_pretty(chain)?;
        write_snapshot(&self.path, &bytes, &self.options)?;
        debug!(path = %self.path.display(), blocks = chain.len(), "ledger saved");
        Ok(())
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    pub chain: Arc<Mutex<Chain>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn load_chain(&self) -> Result<Chain, LedgerError> {
        Ok(self.chain.lock().clone())
    }

    fn save_chain(&self, chain: &Chain) -> Result<(), LedgerError> {
        *self.chain.lock() = chain.clone();
        Ok(())
    }
}
