//! Seam to the external chain node client.
//!
//! The wallet never speaks the node protocol itself; it shapes queries and
//! calls and hands them to a [`ChainClient`]. [`OfflineChainClient`] keeps
//! everything in memory and backs the CLI dry-run mode and the tests.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::chain::ChainName;

/// An account exposed by a browser-extension wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub name: Option<String>,
    /// Extension the account came from, e.g. `polkadot-js`.
    pub source: String,
}

/// Opaque signing handle. Keys stay inside the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    pub address: String,
    pub source: String,
}

impl Signer {
    pub fn for_account(account: &Account) -> Self {
        Self { address: account.address.clone(), source: account.source.clone() }
    }
}

/// Where the transferred funds are debited from on the origin chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssetSource {
    /// `system.account` free balance.
    Native,
    /// `assets.account(asset_id, who)`.
    Assets(u32),
}

/// A cross-chain transfer call, ready to be signed and submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XcmCall {
    pub pallet: &'static str,
    pub method: &'static str,
    pub origin: ChainName,
    pub destination: ChainName,
    pub dest_para_id: Option<u32>,
    pub beneficiary: String,
    pub asset_ticker: String,
    pub source: AssetSource,
    pub amount: u128,
    pub weight_limit: u64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain(&self) -> ChainName;

    async fn is_connected(&self) -> bool;

    /// Free balance of the chain's native token.
    async fn system_account_free(&self, address: &str) -> Result<u128>;

    /// Assets-pallet balance; `None` when the account entry is empty.
    async fn assets_account(&self, asset_id: u32, address: &str) -> Result<Option<u128>>;

    /// Signs and submits; resolves to the extrinsic hash once included.
    async fn submit(&self, signer: &Signer, call: &XcmCall) -> Result<String>;
}

/// Chain clients keyed by chain, one per configured origin.
#[derive(Clone, Default)]
pub struct ChainApis {
    apis: HashMap<ChainName, Arc<dyn ChainClient>>,
}

impl ChainApis {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, client: Arc<dyn ChainClient>) {
        self.apis.insert(client.chain(), client);
    }

    pub fn get(&self, chain: ChainName) -> Option<Arc<dyn ChainClient>> {
        self.apis.get(&chain).cloned()
    }

    pub fn is_empty(&self) -> bool { self.apis.is_empty() }
}

#[derive(Default)]
struct Ledger {
    native: HashMap<String, u128>,
    assets: HashMap<(u32, String), u128>,
    submitted: Vec<XcmCall>,
    fail_next: Option<String>,
}

/// In-memory chain. Hashes are blake3 over the bincode-encoded call.
pub struct OfflineChainClient {
    chain: ChainName,
    connected: AtomicBool,
    nonce: AtomicU64,
    latency: Mutex<Option<Duration>>,
    ledger: Mutex<Ledger>,
}

impl OfflineChainClient {
    pub fn new(chain: ChainName) -> Self {
        Self {
            chain,
            connected: AtomicBool::new(true),
            nonce: AtomicU64::new(0),
            latency: Mutex::new(None),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Delays every query, to exercise out-of-order responses.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().await = latency;
    }

    pub async fn set_native_balance(&self, address: &str, amount: u128) {
        self.ledger.lock().await.native.insert(address.to_string(), amount);
    }

    pub async fn set_asset_balance(&self, asset_id: u32, address: &str, amount: u128) {
        self.ledger.lock().await.assets.insert((asset_id, address.to_string()), amount);
    }

    /// The next `submit` fails with `reason`.
    pub async fn fail_next_submit(&self, reason: &str) {
        self.ledger.lock().await.fail_next = Some(reason.to_string());
    }

    pub async fn submitted(&self) -> Vec<XcmCall> {
        self.ledger.lock().await.submitted.clone()
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().await;
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            bail!("{} client is not connected", self.chain);
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for OfflineChainClient {
    fn chain(&self) -> ChainName { self.chain }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn system_account_free(&self, address: &str) -> Result<u128> {
        self.simulate_latency().await;
        self.ensure_connected()?;
        Ok(self.ledger.lock().await.native.get(address).copied().unwrap_or(0))
    }

    async fn assets_account(&self, asset_id: u32, address: &str) -> Result<Option<u128>> {
        self.simulate_latency().await;
        self.ensure_connected()?;
        Ok(self.ledger.lock().await.assets.get(&(asset_id, address.to_string())).copied())
    }

    async fn submit(&self, signer: &Signer, call: &XcmCall) -> Result<String> {
        self.simulate_latency().await;
        self.ensure_connected()?;
        let mut ledger = self.ledger.lock().await;
        if let Some(reason) = ledger.fail_next.take() {
            bail!(reason);
        }
        let slot = match call.source {
            AssetSource::Native => ledger.native.get_mut(&signer.address),
            AssetSource::Assets(id) => ledger.assets.get_mut(&(id, signer.address.clone())),
        };
        let available = slot.ok_or_else(|| anyhow!("{} has no {} balance on {}", signer.address, call.asset_ticker, self.chain))?;
        if *available < call.amount {
            bail!("balances.InsufficientBalance");
        }
        *available -= call.amount;

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = blake3::Hasher::new();
        hasher.update(&bincode::serialize(call)?);
        hasher.update(signer.address.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        let hash = format!("0x{}", hex::encode(hasher.finalize().as_bytes()));
        ledger.submitted.push(call.clone());
        Ok(hash)
    }
}
