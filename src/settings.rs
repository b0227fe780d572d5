use anyhow::Result;
use std::sync::Arc;

use crate::storage::{Store, CF_SETTINGS};

const CURRENT_TOKEN: &[u8] = b"current_token";
const LAST_SEEN_PRIVATE_ADDRESS: &[u8] = b"last_seen_private_address";
const AUTHED_WALLETS: &[u8] = b"authed_wallets";

/// Device-local preferences. Written independently of the history list.
#[derive(Clone)]
pub struct Settings {
    db: Arc<Store>,
}

impl Settings {
    pub fn new(db: Arc<Store>) -> Self { Self { db } }

    /// Ticker of the asset last selected in the bridge form.
    pub fn current_token(&self) -> Result<Option<String>> {
        self.db.get(CF_SETTINGS, CURRENT_TOKEN)
    }

    pub fn set_current_token(&self, ticker: &str) -> Result<()> {
        self.db.put(CF_SETTINGS, CURRENT_TOKEN, &ticker.to_string())
    }

    pub fn last_seen_private_address(&self) -> Result<Option<String>> {
        self.db.get(CF_SETTINGS, LAST_SEEN_PRIVATE_ADDRESS)
    }

    pub fn set_last_seen_private_address(&self, address: &str) -> Result<()> {
        self.db.put(CF_SETTINGS, LAST_SEEN_PRIVATE_ADDRESS, &address.to_string())
    }

    pub fn authed_wallets(&self) -> Result<Vec<String>> {
        Ok(self.db.get(CF_SETTINGS, AUTHED_WALLETS)?.unwrap_or_default())
    }

    pub fn set_authed_wallets(&self, wallets: &[String]) -> Result<()> {
        self.db.put(CF_SETTINGS, AUTHED_WALLETS, &wallets.to_vec())
    }
}
