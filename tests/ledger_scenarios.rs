//! Integration tests for the ledger and credential service against real files

use credchain::blockchain::{verify_chain, GENESIS_PREVIOUS_HASH};
use credchain::credentials::{CredentialService, LoginOutcome, RegisterOutcome};
use credchain::persistence::{JsonFileStore, Persistence};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn service_at(path: &Path) -> CredentialService {
    CredentialService::new(Box::new(JsonFileStore::new(path)))
}

#[test]
fn test_first_registration_links_to_genesis() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("credentials.json");
    let store = JsonFileStore::new(&path);
    assert!(store.load_chain()?.is_empty());

    service_at(&path).register("alice", "p@ss")?;

    let chain = store.load_chain()?;
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.blocks[0].previous_hash, GENESIS_PREVIOUS_HASH);
    Ok(())
}

#[test]
fn test_state_survives_service_restart() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("credentials.json");

    {
        let service = service_at(&path);
        assert_eq!(service.register("alice", "p@ss")?, RegisterOutcome::Registered);
        assert_eq!(service.register("bob", "hunter2")?, RegisterOutcome::Registered);
    }

    let service = service_at(&path);
    assert_eq!(service.login("alice", "p@ss")?, LoginOutcome::Success);
    assert_eq!(service.login("alice", "wrong")?, LoginOutcome::IncorrectPassword);
    assert_eq!(service.login("bob", "hunter2")?, LoginOutcome::Success);
    assert_eq!(service.register("bob", "again")?, RegisterOutcome::UsernameExists);
    assert!(verify_chain(&service.chain()?));
    Ok(())
}

#[test]
fn test_concurrent_registrations_are_not_lost() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("credentials.json");
    let service = Arc::new(service_at(&path));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = service.clone();
            thread::spawn(move || service.register(&format!("user{}", i), "pw"))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap()?, RegisterOutcome::Registered);
    }

    let chain = JsonFileStore::new(&path).load_chain()?;
    assert_eq!(chain.len(), 16);
    assert!(verify_chain(&chain));
    for i in 0..16 {
        assert!(chain.contains_username(&format!("user{}", i)));
    }
    Ok(())
}

#[test]
fn test_concurrent_duplicate_registration_has_one_winner() -> Result<(), Box<dyn std::error::Error>>
{
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("credentials.json");
    let service = Arc::new(service_at(&path));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            thread::spawn(move || service.register("shared", &format!("pw{}", i)))
        })
        .collect();

    let mut registered = 0;
    for handle in handles {
        if handle.join().unwrap()? == RegisterOutcome::Registered {
            registered += 1;
        }
    }

    assert_eq!(registered, 1);
    assert_eq!(service.chain()?.len(), 1);
    Ok(())
}

#[test]
fn test_ledger_with_anonymous_block_stays_usable() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("credentials.json");
    let ledger = r#"[
    {
        "timestamp": 1700000000.123456,
        "data": {
            "username": "bob",
            "password": "5b11618c2e44027877d0cd0921ed166b9f176f50587fc91e7534dd2946db77d6"
        },
        "previous_hash": "0",
        "hash": "c480009e8f45c8289f318e2c4149cf00d8ce60b72a257678734d53e26a51393a"
    },
    {
        "timestamp": 1700000042.5,
        "data": {
            "username": null,
            "password": "2d711642b726b04401627ca9fbac32f5c8530fb1903cc4db02258717921a4881"
        },
        "previous_hash": "c480009e8f45c8289f318e2c4149cf00d8ce60b72a257678734d53e26a51393a",
        "hash": "a462537a2d03859755d3d1fca06f6f4dad30256628e3c0d109e77f3aa8ea73fa"
    }
]"#;
    std::fs::write(&path, ledger)?;

    let service = service_at(&path);
    assert_eq!(service.login("bob", "secret1")?, LoginOutcome::Success);
    assert_eq!(service.login("", "x")?, LoginOutcome::UserNotFound);
    assert_eq!(service.register("carol", "pw")?, RegisterOutcome::Registered);

    let chain = service.chain()?;
    assert_eq!(chain.len(), 3);
    assert!(verify_chain(&chain));
    assert!(service.audit()?.is_ok());
    Ok(())
}
