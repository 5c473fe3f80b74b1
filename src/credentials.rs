//! Register/login semantics on top of the ledger
//!
//! Every call reloads the chain from the backing store. Registrations go
//! through a single writer lock so that the load, uniqueness check, append
//! and save of one registration never interleave with another's.

use crate::blockchain::{audit_chain, Chain, ChainReport, CredentialRecord};
use crate::crypto::password_matches;
use crate::error::LedgerError;
use crate::persistence::Persistence;
use parking_lot::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    UsernameExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    IncorrectPassword,
    UserNotFound,
}

impl RegisterOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            RegisterOutcome::Registered => "Registration successful",
            RegisterOutcome::UsernameExists => "Username already exists",
        }
    }
}

impl LoginOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            LoginOutcome::Success => "Login successful",
            LoginOutcome::IncorrectPassword => "Incorrect password",
            LoginOutcome::UserNotFound => "User not found",
        }
    }
}

pub struct CredentialService {
    store: Box<dyn Persistence>,
    write_lock: Mutex<()>,
}

impl CredentialService {
    pub fn new(store: Box<dyn Persistence>) -> Self {
        CredentialService {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Register `username` with the digest of `password`.
    ///
    /// Empty usernames and passwords are accepted. Storage faults are
    /// returned as `Err` and leave the stored chain untouched.
    pub fn register(&self, username: &str, password: &str) -> Result<RegisterOutcome, LedgerError> {
        let _writer = self.write_lock.lock();

        let mut chain = self.store.load_chain()?;
        if chain.find_by_username(username).is_some() {
            debug!(username, "registration rejected: username exists");
            return Ok(RegisterOutcome::UsernameExists);
        }

        let record = CredentialRecord::new(username, password);
        let height = chain.len();
        chain.append(record)?;
        self.store.save_chain(&chain)?;

        info!(username, height, "credential registered");
        Ok(RegisterOutcome::Registered)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, LedgerError> {
        let chain = self.store.load_chain()?;
        let outcome = match chain.find_by_username(username) {
            None => LoginOutcome::UserNotFound,
            Some(block) if password_matches(password, &block.data.password) => {
                LoginOutcome::Success
            }
            Some(_) => LoginOutcome::IncorrectPassword,
        };
        debug!(username, ?outcome, "login attempt");
        Ok(outcome)
    }

    /// Current chain as stored.
    pub fn chain(&self) -> Result<Chain, LedgerError> {
        self.store.load_chain()
    }

    pub fn audit(&self) -> Result<ChainReport, LedgerError> {
        Ok(audit_chain(&self.store.load_chain()?))
    }
}
