// reconcile.rs
// Finalizes pending history entries against the block explorer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::history::{HistoryEventStatus, HistoryStore};
use crate::metrics;
use crate::tx_status::TxStatusHandle;

/// What the explorer knows about an included extrinsic.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrinsicRecord {
    /// Dispatch error, if the extrinsic failed on chain.
    pub error: Option<serde_json::Value>,
}

#[async_trait]
pub trait ExplorerClient: Send + Sync {
    /// `None` when the explorer has no record of `hash` (yet).
    async fn extrinsic(&self, hash: &str) -> Result<Option<ExtrinsicRecord>>;
}

#[derive(Deserialize)]
struct SubscanResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Subscan-style API: `POST {endpoint}/extrinsic` with `{"hash": ...}`.
#[derive(Clone)]
pub struct SubscanExplorer {
    endpoint: String,
    client: reqwest::Client,
}

impl SubscanExplorer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self { endpoint: endpoint.into(), client })
    }
}

#[async_trait]
impl ExplorerClient for SubscanExplorer {
    async fn extrinsic(&self, hash: &str) -> Result<Option<ExtrinsicRecord>> {
        let url = format!("{}/extrinsic", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "hash": hash }))
            .send()
            .await
            .with_context(|| format!("explorer request to {url} failed"))?
            .error_for_status()?;
        let body: SubscanResponse = response.json().await.context("invalid explorer response")?;
        Ok(parse_record(body.data))
    }
}

fn parse_record(data: Option<serde_json::Value>) -> Option<ExtrinsicRecord> {
    let data = data.filter(|d| !d.is_null())?;
    let error = data.get("error").filter(|e| !e.is_null()).cloned();
    Some(ExtrinsicRecord { error })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub succeeded: usize,
    pub failed: usize,
    pub removed: usize,
    pub still_pending: usize,
}

pub struct Reconciler {
    store: HistoryStore,
    explorer: Arc<dyn ExplorerClient>,
    tx_status: TxStatusHandle,
    pending_tx_max_wait_ms: i64,
}

impl Reconciler {
    pub fn new(store: HistoryStore, explorer: Arc<dyn ExplorerClient>, tx_status: TxStatusHandle, pending_tx_max_wait_ms: u64) -> Self {
        Self {
            store,
            explorer,
            tx_status,
            pending_tx_max_wait_ms: i64::try_from(pending_tx_max_wait_ms).unwrap_or(i64::MAX),
        }
    }

    /// Resolves every pending entry once, as of `now`. Explorer errors count
    /// as "no record".
    pub async fn sync_pending(&self, now: DateTime<Utc>) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        for event in self.store.pending()? {
            let record = match self.explorer.extrinsic(&event.extrinsic_hash).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("⚠️  explorer lookup for {} failed: {e:#}", event.extrinsic_hash);
                    None
                }
            };
            match record {
                Some(ExtrinsicRecord { error: Some(_) }) => {
                    self.store.update_status(HistoryEventStatus::Failed, &event.extrinsic_hash)?;
                    report.failed += 1;
                }
                Some(ExtrinsicRecord { error: None }) => {
                    self.store.update_status(HistoryEventStatus::Success, &event.extrinsic_hash)?;
                    report.succeeded += 1;
                }
                None if event.age_ms(now) > self.pending_tx_max_wait_ms => {
                    info!("🗑️  dropping {} after {} ms without an explorer record", event.extrinsic_hash, event.age_ms(now));
                    self.store.remove_pending(Some(&event.extrinsic_hash))?;
                    report.removed += 1;
                }
                None => report.still_pending += 1,
            }
        }
        metrics::RECONCILE_RUNS.inc();
        Ok(report)
    }

    /// One scheduled pass: skipped while a transaction is processing or
    /// nothing is pending.
    pub async fn tick(&self) -> Result<Option<ReconcileReport>> {
        if self.tx_status.is_processing() {
            debug!("transaction in flight, skipping history sync");
            return Ok(None);
        }
        if self.store.pending()?.is_empty() {
            return Ok(None);
        }
        self.sync_pending(Utc::now()).await.map(Some)
    }

    pub fn spawn(self: Arc<Self>, interval: Duration, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("🛑 history reconciler received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.tick().await {
                            Ok(Some(report)) => debug!("history sync: {:?}", report),
                            Ok(None) => {}
                            Err(e) => warn!("⚠️  history sync failed: {e:#}"),
                        }
                    }
                }
            }
        })
    }
}
