// Thin re-export module: implementation lives in `blockchain/core.rs`, split
// into chain structure and verification.

pub mod core;
pub use core::*;
