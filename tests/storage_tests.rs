// Storage tests
// Validate the compressed key-value store the history and settings live in.

use std::sync::Arc;
use tempfile::TempDir;
use xcmwallet::storage::{Store, CF_HISTORY, CF_SETTINGS};

#[tokio::test]
async fn test_storage_round_trips_large_and_small_values() {
    println!("🧪 Testing storage integrity...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Store::open(temp_dir.path().join("integrity_db").to_str().unwrap()).expect("Failed to open store");

    let small = "dmxAlice".to_string();
    store.put(CF_SETTINGS, b"small", &small).expect("Failed to store small value");
    let back: Option<String> = store.get(CF_SETTINGS, b"small").expect("Failed to read small value");
    assert_eq!(back, Some(small));

    // repetitive data compresses well; patterned data does not
    let repetitive = vec![0x55u8; 100_000];
    let mut patterned = vec![0u8; 10_000];
    for (i, b) in patterned.iter_mut().enumerate() {
        *b = (i * 137 + 42) as u8;
    }
    store.put(CF_HISTORY, b"repetitive", &repetitive).unwrap();
    store.put(CF_HISTORY, b"patterned", &patterned).unwrap();
    assert_eq!(store.get::<Vec<u8>>(CF_HISTORY, b"repetitive").unwrap(), Some(repetitive));
    assert_eq!(store.get::<Vec<u8>>(CF_HISTORY, b"patterned").unwrap(), Some(patterned));

    println!("✅ Values survive compression in both column families");
}

#[tokio::test]
async fn test_storage_reads_uncompressed_values() {
    println!("🧪 Testing plain bincode fallback...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Store::open(temp_dir.path().to_str().unwrap()).expect("Failed to open store");
    let raw = bincode::serialize(&vec!["polkadot-js".to_string()]).unwrap();
    let cf = store.db.cf_handle(CF_SETTINGS).unwrap();
    store.db.put_cf(cf, b"authed_wallets", raw).unwrap();

    let wallets: Option<Vec<String>> = store.get(CF_SETTINGS, b"authed_wallets").unwrap();
    assert_eq!(wallets, Some(vec!["polkadot-js".to_string()]));

    println!("✅ Uncompressed fixtures still load");
}

#[tokio::test]
async fn test_storage_missing_and_deleted_keys() {
    println!("🧪 Testing missing keys and deletes...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Store::open(temp_dir.path().to_str().unwrap()).expect("Failed to open store");

    assert_eq!(store.get::<String>(CF_SETTINGS, b"current_token").unwrap(), None);
    store.put(CF_SETTINGS, b"current_token", &"KAR".to_string()).unwrap();
    store.delete(CF_SETTINGS, b"current_token").unwrap();
    assert_eq!(store.get::<String>(CF_SETTINGS, b"current_token").unwrap(), None);

    assert!(store.get::<String>("no_such_cf", b"k").is_err(), "unknown column family is an error");

    println!("✅ Missing and deleted keys read as None");
}

#[tokio::test]
async fn test_storage_concurrent_writers() {
    println!("🧪 Testing concurrent access...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(Store::open(temp_dir.path().to_str().unwrap()).expect("Failed to open store"));

    let mut handles = vec![];
    for writer in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let key = format!("writer_{writer}_key_{i}");
                store.put(CF_HISTORY, key.as_bytes(), &format!("value_{writer}_{i}")).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for writer in 0..8 {
        for i in 0..50 {
            let key = format!("writer_{writer}_key_{i}");
            let value: Option<String> = store.get(CF_HISTORY, key.as_bytes()).unwrap();
            assert_eq!(value, Some(format!("value_{writer}_{i}")));
        }
    }
    store.close().unwrap();

    println!("✅ Concurrent writes all landed");
}
