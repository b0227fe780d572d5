// history.rs
// Private transaction history: persisted list, status updates, activity rows.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::metrics;
use crate::settings::Settings;
use crate::storage::{Store, CF_HISTORY};
use crate::tx_status::TxStatus;

const PRIVATE_TRANSACTION_HISTORY: &[u8] = b"private_transaction_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivateTxType {
    ToPrivate,
    ToPublic,
    PrivateTransfer,
    Bridge,
}

impl PrivateTxType {
    pub fn transaction_msg(&self) -> &'static str {
        match self {
            PrivateTxType::ToPrivate => "Deposit",
            PrivateTxType::ToPublic => "Withdraw",
            PrivateTxType::PrivateTransfer => "Send",
            PrivateTxType::Bridge => "Bridge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEventStatus {
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for HistoryEventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HistoryEventStatus::Pending => "Pending",
            HistoryEventStatus::Success => "Success",
            HistoryEventStatus::Failed => "Failed",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHistoryEvent {
    pub transaction_type: PrivateTxType,
    pub asset_ticker: String,
    /// Human-readable amount as shown when the transaction was sent.
    pub amount: String,
    pub date: DateTime<Utc>,
    pub status: HistoryEventStatus,
    pub extrinsic_hash: String,
    pub explorer_url: Option<String>,
}

impl TxHistoryEvent {
    pub fn pending(intent: &TxIntent, extrinsic_hash: &str, explorer_base: Option<&str>, date: DateTime<Utc>) -> Self {
        Self {
            transaction_type: intent.transaction_type,
            asset_ticker: intent.asset_ticker.clone(),
            amount: intent.amount.clone(),
            date,
            status: HistoryEventStatus::Pending,
            extrinsic_hash: extrinsic_hash.to_string(),
            explorer_url: explorer_base.map(|base| format!("{}/extrinsic/{}", base.trim_end_matches('/'), extrinsic_hash)),
        }
    }

    pub fn is_pending(&self) -> bool { self.status == HistoryEventStatus::Pending }

    /// Milliseconds since the event was recorded, as of `now`.
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.date).num_milliseconds()
    }
}

/// What the next recorded transaction is, captured before it is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIntent {
    pub transaction_type: PrivateTxType,
    pub asset_ticker: String,
    pub amount: String,
}

/// The whole history is stored as one list under a single key; every
/// operation is read-modify-write of that list, serialized across clones.
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<Store>,
    write_lock: Arc<Mutex<()>>,
}

impl HistoryStore {
    pub fn new(db: Arc<Store>) -> Self { Self { db, write_lock: Arc::new(Mutex::new(())) } }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| anyhow!("history write lock poisoned"))
    }

    pub fn all(&self) -> Result<Vec<TxHistoryEvent>> {
        Ok(self.db.get(CF_HISTORY, PRIVATE_TRANSACTION_HISTORY)?.unwrap_or_default())
    }

    pub fn set_all(&self, events: &[TxHistoryEvent]) -> Result<()> {
        let _guard = self.lock()?;
        self.write(events)
    }

    fn write(&self, events: &[TxHistoryEvent]) -> Result<()> {
        self.db.put(CF_HISTORY, PRIVATE_TRANSACTION_HISTORY, &events.to_vec())?;
        metrics::PENDING_HISTORY.set(events.iter().filter(|e| e.is_pending()).count() as i64);
        Ok(())
    }

    /// Adds `event` at the end. An event whose hash is already present is ignored.
    pub fn append(&self, event: TxHistoryEvent) -> Result<bool> {
        let _guard = self.lock()?;
        let mut events = self.all()?;
        if events.iter().any(|e| e.extrinsic_hash == event.extrinsic_hash) {
            debug!("history already has {}", event.extrinsic_hash);
            return Ok(false);
        }
        events.push(event);
        self.write(&events)?;
        Ok(true)
    }

    /// Sets `status` on the pending entry with `extrinsic_hash`. Finalized
    /// entries are left alone.
    pub fn update_status(&self, status: HistoryEventStatus, extrinsic_hash: &str) -> Result<bool> {
        let _guard = self.lock()?;
        let mut events = self.all()?;
        let mut changed = false;
        for event in events.iter_mut() {
            if event.extrinsic_hash == extrinsic_hash && event.is_pending() {
                event.status = status;
                changed = true;
            }
        }
        if changed {
            self.write(&events)?;
        }
        Ok(changed)
    }

    /// Removes the pending entry with `extrinsic_hash`, or with no hash the
    /// last entry if it is pending.
    pub fn remove_pending(&self, extrinsic_hash: Option<&str>) -> Result<bool> {
        let _guard = self.lock()?;
        let mut events = self.all()?;
        let index = match extrinsic_hash {
            Some(hash) => events.iter().position(|e| e.extrinsic_hash == hash),
            None => events.len().checked_sub(1),
        };
        let Some(index) = index else {
            return Ok(false);
        };
        if !events[index].is_pending() {
            return Ok(false);
        }
        events.remove(index);
        self.write(&events)?;
        Ok(true)
    }

    pub fn pending(&self) -> Result<Vec<TxHistoryEvent>> {
        Ok(self.all()?.into_iter().filter(TxHistoryEvent::is_pending).collect())
    }

    pub fn clear(&self) -> Result<()> {
        self.set_all(&[])
    }

    /// Clears the history when the private address differs from the one
    /// last seen on this device. Returns whether anything was cleared.
    pub fn reset_on_private_address_change(&self, settings: &Settings, private_address: &str) -> Result<bool> {
        if private_address.is_empty() || settings.last_seen_private_address()?.as_deref() == Some(private_address) {
            return Ok(false);
        }
        settings.set_last_seen_private_address(private_address)?;
        let _guard = self.lock()?;
        if self.all()?.is_empty() {
            return Ok(false);
        }
        info!("🧹 private address changed, clearing transaction history");
        self.write(&[])?;
        Ok(true)
    }
}

/// Turns transaction status changes into history entries.
pub struct HistoryRecorder {
    store: HistoryStore,
    explorer_url: Option<String>,
    intent: Mutex<Option<TxIntent>>,
    last_recorded: Mutex<Option<String>>,
}

impl HistoryRecorder {
    pub fn new(store: HistoryStore, explorer_url: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            store,
            explorer_url,
            intent: Mutex::new(None),
            last_recorded: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &HistoryStore { &self.store }

    pub fn set_intent(&self, intent: TxIntent) {
        if let Ok(mut slot) = self.intent.lock() {
            *slot = Some(intent);
        }
    }

    /// A processing status carrying an extrinsic appends a pending event;
    /// a successful one finalizes it; a failure drops what was recorded.
    pub fn observe(&self, status: &TxStatus) -> Result<()> {
        match status {
            TxStatus::Processing { extrinsic: Some(hash) } => {
                // an intent describes exactly one submission
                let intent = self.intent.lock().ok().and_then(|mut i| i.take());
                let Some(intent) = intent else {
                    debug!("no intent recorded for {}, not adding it to history", hash);
                    return Ok(());
                };
                let event = TxHistoryEvent::pending(&intent, hash, self.explorer_url.as_deref(), Utc::now());
                if self.store.append(event)? {
                    if let Ok(mut last) = self.last_recorded.lock() {
                        *last = Some(hash.clone());
                    }
                }
            }
            TxStatus::Success { extrinsic: Some(hash) } => {
                self.store.update_status(HistoryEventStatus::Success, hash)?;
            }
            TxStatus::Failed { .. } => {
                let last = self.last_recorded.lock().ok().and_then(|mut l| l.take());
                if let Some(hash) = last {
                    self.store.remove_pending(Some(&hash))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// One line of the activity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRow {
    pub transaction_msg: &'static str,
    pub activity: String,
    pub status: HistoryEventStatus,
    /// Day and abbreviated month, e.g. `18 Oct`.
    pub date: String,
    pub explorer_url: Option<String>,
}

impl ActivityRow {
    pub fn from_event(event: &TxHistoryEvent) -> Self {
        let amount = &event.amount;
        let ticker = &event.asset_ticker;
        let activity = match event.transaction_type {
            PrivateTxType::ToPrivate => format!("{amount} {ticker} → {amount} zk{ticker}"),
            PrivateTxType::ToPublic => format!("{amount} zk{ticker} → {amount} {ticker}"),
            PrivateTxType::PrivateTransfer => format!("{amount} zk{ticker}"),
            PrivateTxType::Bridge => format!("{amount} {ticker}"),
        };
        Self {
            transaction_msg: event.transaction_type.transaction_msg(),
            activity,
            status: event.status,
            date: event.date.format("%d %b").to_string(),
            explorer_url: event.explorer_url.clone(),
        }
    }
}

/// Most recent first.
pub fn activity_rows(events: &[TxHistoryEvent]) -> Vec<ActivityRow> {
    events.iter().rev().map(ActivityRow::from_event).collect()
}
