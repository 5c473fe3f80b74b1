// core.rs splits the ledger into the chain structure, the digest encoding
// and verification.
pub mod chain;
pub mod encoding;
pub mod validation;

pub use chain::*;
pub use validation::*;
