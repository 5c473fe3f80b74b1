//! credchain - a credential registry kept in an append-only, hash-linked ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Ledger
//! - [`blockchain`] - Blocks, the chain, and chain verification
//! - [`persistence`] - Whole-file snapshot storage of the chain
//! - [`images`] - Image archive with a per-image retrieval log
//!
//! ## Credentials
//! - [`credentials`] - Register/login on top of the ledger
//! - [`crypto`] - SHA-256 digest helpers
//!
//! ## Integration
//! - [`api`] - HTTP endpoints (`/register`, `/login`, ...)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - Shared bootstrap for the binaries
//!
//! # Security
//!
//! Passwords are stored as unsalted SHA-256 digests for compatibility with
//! existing ledgers. That is not adequate password storage; deployments
//! exposed to untrusted networks should put a salted, slow hash in front.

#![forbid(unsafe_code)]

// ============================================================================
// Ledger
// ============================================================================
pub mod blockchain;
pub mod images;
pub mod persistence;

// ============================================================================
// Credentials
// ============================================================================
pub mod credentials;
pub mod crypto;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
