// History persistence and reconciliation tests

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use xcmwallet::{
    history::{HistoryEventStatus, HistoryRecorder, HistoryStore, PrivateTxType, TxHistoryEvent, TxIntent},
    reconcile::{ExplorerClient, ExtrinsicRecord, Reconciler},
    settings::Settings,
    storage::Store,
    TxStatus, TxStatusHandle,
};

fn open_store(dir: &TempDir) -> Arc<Store> {
    Arc::new(Store::open(dir.path().to_str().unwrap()).expect("Failed to open store"))
}

fn event(hash: &str, age_ms: i64) -> TxHistoryEvent {
    TxHistoryEvent {
        transaction_type: PrivateTxType::ToPrivate,
        asset_ticker: "DOL".into(),
        amount: "1".into(),
        date: Utc::now() - ChronoDuration::milliseconds(age_ms),
        status: HistoryEventStatus::Pending,
        extrinsic_hash: hash.into(),
        explorer_url: None,
    }
}

enum Answer {
    Found(Option<serde_json::Value>),
    Missing,
    Broken,
}

/// Explorer that answers from a fixed table.
struct FakeExplorer {
    answers: HashMap<String, Answer>,
}

#[async_trait]
impl ExplorerClient for FakeExplorer {
    async fn extrinsic(&self, hash: &str) -> Result<Option<ExtrinsicRecord>> {
        match self.answers.get(hash) {
            Some(Answer::Found(error)) => Ok(Some(ExtrinsicRecord { error: error.clone() })),
            Some(Answer::Broken) => Err(anyhow!("explorer returned 502")),
            Some(Answer::Missing) | None => Ok(None),
        }
    }
}

#[tokio::test]
async fn test_history_store_operations() {
    println!("🧪 Testing history list operations...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let history = HistoryStore::new(open_store(&temp_dir));
    assert!(history.all().unwrap().is_empty());

    assert!(history.append(event("0x1", 0)).unwrap());
    assert!(history.append(event("0x2", 0)).unwrap());
    assert!(!history.append(event("0x1", 0)).unwrap(), "duplicate hash is ignored");
    assert_eq!(history.all().unwrap().len(), 2);

    assert!(history.update_status(HistoryEventStatus::Success, "0x1").unwrap());
    assert!(!history.update_status(HistoryEventStatus::Failed, "0x1").unwrap(), "finalized entries stay final");
    assert_eq!(history.pending().unwrap().len(), 1);

    assert!(!history.remove_pending(Some("0x1")).unwrap(), "only pending entries are removed");
    assert!(history.remove_pending(None).unwrap(), "last entry 0x2 is pending");
    assert!(!history.remove_pending(None).unwrap(), "last entry 0x1 is final");
    assert_eq!(history.all().unwrap().len(), 1);

    history.clear().unwrap();
    assert!(history.all().unwrap().is_empty());
    assert!(!history.remove_pending(None).unwrap());

    println!("✅ Append, update, remove and clear behave");
}

#[tokio::test]
async fn test_history_survives_reopen() {
    println!("🧪 Testing history persistence across restarts...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    {
        let store = open_store(&temp_dir);
        HistoryStore::new(store.clone()).append(event("0xabc", 0)).unwrap();
        store.close().unwrap();
    }
    let history = HistoryStore::new(open_store(&temp_dir));
    let events = history.all().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].extrinsic_hash, "0xabc");

    println!("✅ History reloaded from disk");
}

#[tokio::test]
async fn test_private_address_change_resets_history() {
    println!("🧪 Testing history reset on zkAddress change...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = open_store(&temp_dir);
    let history = HistoryStore::new(store.clone());
    let settings = Settings::new(store);

    assert!(!history.reset_on_private_address_change(&settings, "zkA").unwrap());
    history.append(event("0x1", 0)).unwrap();
    assert!(!history.reset_on_private_address_change(&settings, "zkA").unwrap(), "same address keeps history");
    assert_eq!(history.all().unwrap().len(), 1);

    assert!(history.reset_on_private_address_change(&settings, "zkB").unwrap());
    assert!(history.all().unwrap().is_empty());
    assert_eq!(settings.last_seen_private_address().unwrap().as_deref(), Some("zkB"));

    println!("✅ History cleared only when the address changes");
}

#[tokio::test]
async fn test_recorder_appends_on_processing_with_extrinsic() {
    println!("🧪 Testing recorder...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let history = HistoryStore::new(open_store(&temp_dir));
    let recorder = HistoryRecorder::new(history.clone(), None);

    // nothing is recorded without an intent or an extrinsic
    recorder.observe(&TxStatus::Processing { extrinsic: Some("0x1".into()) }).unwrap();
    recorder.set_intent(TxIntent { transaction_type: PrivateTxType::ToPublic, asset_ticker: "KAR".into(), amount: "3".into() });
    recorder.observe(&TxStatus::processing()).unwrap();
    assert!(history.all().unwrap().is_empty());

    recorder.observe(&TxStatus::Processing { extrinsic: Some("0x2".into()) }).unwrap();
    let events = history.all().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].transaction_type, PrivateTxType::ToPublic);
    assert!(events[0].is_pending());

    recorder.observe(&TxStatus::Failed { reason: "dropped".into() }).unwrap();
    assert!(history.all().unwrap().is_empty(), "failed transaction leaves no pending entry");

    println!("✅ Pending entries follow the transaction status");
}

#[tokio::test]
async fn test_recorder_uses_each_intent_once() {
    println!("🧪 Testing intent reuse...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let history = HistoryStore::new(open_store(&temp_dir));
    let recorder = HistoryRecorder::new(history.clone(), None);

    recorder.set_intent(TxIntent { transaction_type: PrivateTxType::Bridge, asset_ticker: "ROC".into(), amount: "2".into() });
    recorder.observe(&TxStatus::Processing { extrinsic: Some("0x1".into()) }).unwrap();
    recorder.observe(&TxStatus::Success { extrinsic: Some("0x1".into()) }).unwrap();

    // a later submission nobody described must not inherit the bridge transfer
    recorder.observe(&TxStatus::Processing { extrinsic: Some("0x2".into()) }).unwrap();
    let events = history.all().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].extrinsic_hash, "0x1");
    assert_eq!(events[0].status, HistoryEventStatus::Success);

    println!("✅ Intent consumed by the submission it describes");
}

#[test]
fn test_concurrent_history_writers_lose_nothing() {
    println!("🧪 Testing concurrent history writers...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let history = HistoryStore::new(open_store(&temp_dir));

    let handles: Vec<_> = (0..4)
        .map(|writer| {
            let history = history.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    let hash = format!("0x{writer}_{i}");
                    assert!(history.append(event(&hash, 0)).unwrap());
                    if i % 5 == 0 {
                        history.update_status(HistoryEventStatus::Success, &hash).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let events = history.all().unwrap();
    assert_eq!(events.len(), 100, "every append must survive concurrent writers");
    assert_eq!(events.iter().filter(|e| e.status == HistoryEventStatus::Success).count(), 20);

    println!("✅ All 100 entries landed");
}

#[tokio::test]
async fn test_reconciliation_resolves_pending_entries() {
    println!("🧪 Testing explorer reconciliation...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let history = HistoryStore::new(open_store(&temp_dir));
    history.append(event("0xok", 5_000)).unwrap();
    history.append(event("0xerr", 5_000)).unwrap();
    history.append(event("0xold", 200_001)).unwrap();
    history.append(event("0xnew", 1_000)).unwrap();
    history.append(event("0xflaky", 300_000)).unwrap();

    let mut answers = HashMap::new();
    answers.insert("0xok".to_string(), Answer::Found(None));
    answers.insert("0xerr".to_string(), Answer::Found(Some(serde_json::json!({ "module": "xTokens" }))));
    answers.insert("0xold".to_string(), Answer::Missing);
    answers.insert("0xflaky".to_string(), Answer::Broken);
    let reconciler = Reconciler::new(history.clone(), Arc::new(FakeExplorer { answers }), TxStatusHandle::new(), 200_000);

    let report = reconciler.sync_pending(Utc::now()).await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.removed, 2, "0xold timed out, 0xflaky errored and timed out");
    assert_eq!(report.still_pending, 1);

    let by_hash: HashMap<String, HistoryEventStatus> =
        history.all().unwrap().into_iter().map(|e| (e.extrinsic_hash, e.status)).collect();
    assert_eq!(by_hash.get("0xok"), Some(&HistoryEventStatus::Success));
    assert_eq!(by_hash.get("0xerr"), Some(&HistoryEventStatus::Failed));
    assert_eq!(by_hash.get("0xnew"), Some(&HistoryEventStatus::Pending));
    assert!(!by_hash.contains_key("0xold"));
    assert!(!by_hash.contains_key("0xflaky"));

    println!("✅ Success, failure and timeout handled");
}

#[tokio::test]
async fn test_reconciliation_waits_while_processing() {
    println!("🧪 Testing reconciliation pause during a transaction...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let history = HistoryStore::new(open_store(&temp_dir));
    history.append(event("0xold", 300_000)).unwrap();

    let status = TxStatusHandle::new();
    status.set(TxStatus::processing());
    let reconciler = Arc::new(Reconciler::new(
        history.clone(),
        Arc::new(FakeExplorer { answers: HashMap::new() }),
        status.clone(),
        200_000,
    ));
    assert_eq!(reconciler.tick().await.unwrap(), None);
    assert_eq!(history.pending().unwrap().len(), 1);

    status.set(TxStatus::Success { extrinsic: None });
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let handle = reconciler.clone().spawn(Duration::from_millis(20), shutdown_tx.subscribe());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(history.pending().unwrap().is_empty(), "timed-out entry removed once idle");

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle).await.expect("reconciler should stop").unwrap();

    println!("✅ Reconciler paused during processing and resumed afterwards");
}
