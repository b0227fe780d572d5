// wallets.rs
// Browser-extension wallets: which are installed, which are authorized, and
// how their connection errors are shown.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::client::Account;
use crate::config::WalletEntry;
use crate::settings::Settings;

pub const MANTA_WALLET: &str = "manta-wallet-js";
pub const TALISMAN: &str = "talisman";

const TALISMAN_NOT_CONFIGURED: &str = "Talisman extension has not been configured yet. Please continue with onboarding.";
const TALISMAN_NO_ACCOUNT: &str = "You have no account in Talisman. Please create one first.";

/// The page-injected side of a wallet extension.
#[async_trait]
pub trait WalletExtension: Send + Sync {
    fn extension_name(&self) -> &str;

    /// Asks the user to authorize `app_name`; resolves to the exposed accounts.
    async fn enable(&self, app_name: &str) -> Result<Vec<Account>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletConnection {
    NotInstalled,
    Installed,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub extension_name: String,
    pub display_name: String,
    pub install_url: String,
    pub installed: bool,
}

impl From<&WalletEntry> for WalletInfo {
    fn from(entry: &WalletEntry) -> Self {
        Self {
            extension_name: entry.extension_name.clone(),
            display_name: entry.display_name.clone(),
            install_url: entry.install_url.clone(),
            installed: entry.installed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletListing {
    pub wallet: WalletInfo,
    pub connection: WalletConnection,
    pub error: Option<String>,
}

pub struct WalletRegistry {
    app_name: String,
    wallets: Vec<WalletInfo>,
    extensions: HashMap<String, Arc<dyn WalletExtension>>,
    authed: Mutex<Vec<String>>,
    errors: Mutex<HashMap<String, String>>,
    settings: Option<Settings>,
}

impl WalletRegistry {
    pub fn new(app_name: impl Into<String>, entries: &[WalletEntry], settings: Option<Settings>) -> Result<Self> {
        let authed = match &settings {
            Some(s) => s.authed_wallets()?,
            None => Vec::new(),
        };
        Ok(Self {
            app_name: app_name.into(),
            wallets: entries.iter().map(WalletInfo::from).collect(),
            extensions: HashMap::new(),
            authed: Mutex::new(authed),
            errors: Mutex::new(HashMap::new()),
            settings,
        })
    }

    /// Registers an injected extension; it counts as installed from now on.
    pub fn register_extension(&mut self, extension: Arc<dyn WalletExtension>) {
        let name = extension.extension_name().to_string();
        if let Some(w) = self.wallets.iter_mut().find(|w| w.extension_name == name) {
            w.installed = true;
        }
        self.extensions.insert(name, extension);
    }

    pub fn authed_wallets(&self) -> Vec<String> {
        self.authed.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn connection(&self, wallet: &WalletInfo, has_external_account: bool) -> WalletConnection {
        if has_external_account && self.authed_wallets().contains(&wallet.extension_name) {
            WalletConnection::Connected
        } else if wallet.installed {
            WalletConnection::Installed
        } else {
            WalletConnection::NotInstalled
        }
    }

    /// Wallets to offer. The Manta wallet goes first when it is in use and is
    /// hidden otherwise.
    pub fn list(&self, using_manta_wallet: bool, has_external_account: bool) -> Vec<WalletListing> {
        let mut wallets: Vec<WalletInfo> = self.wallets.clone();
        if using_manta_wallet {
            if let Some(i) = wallets.iter().position(|w| w.extension_name == MANTA_WALLET) {
                let manta = wallets.remove(i);
                wallets.insert(0, manta);
            }
        } else {
            wallets.retain(|w| w.extension_name != MANTA_WALLET);
        }
        wallets
            .into_iter()
            .map(|wallet| WalletListing {
                connection: self.connection(&wallet, has_external_account),
                error: self.display_error(&wallet.extension_name),
                wallet,
            })
            .collect()
    }

    /// Enables `extension_name`. On success the wallet is added to the
    /// persisted authorized list; on failure the error is kept for display.
    pub async fn connect(&self, extension_name: &str) -> Result<Option<Vec<Account>>> {
        let Some(extension) = self.extensions.get(extension_name).cloned() else {
            self.record_error(extension_name, &format!("{extension_name} is not installed"));
            return Ok(None);
        };
        match extension.enable(&self.app_name).await {
            Ok(accounts) => {
                self.clear_error(extension_name);
                let authed = {
                    let mut authed = self.authed.lock().map_err(|_| anyhow::anyhow!("wallet list lock poisoned"))?;
                    if !authed.iter().any(|w| w == extension_name) {
                        authed.push(extension_name.to_string());
                    }
                    authed.clone()
                };
                if let Some(settings) = &self.settings {
                    settings.set_authed_wallets(&authed)?;
                }
                info!("🔌 connected {} ({} accounts)", extension_name, accounts.len());
                Ok(Some(accounts))
            }
            Err(e) => {
                warn!("⚠️  {} refused to connect: {e:#}", extension_name);
                self.record_error(extension_name, &e.to_string());
                Ok(None)
            }
        }
    }

    fn record_error(&self, extension_name: &str, message: &str) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.insert(extension_name.to_string(), message.to_string());
        }
    }

    fn clear_error(&self, extension_name: &str) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.remove(extension_name);
        }
    }

    /// Last connection error for `extension_name`, as shown to the user.
    pub fn display_error(&self, extension_name: &str) -> Option<String> {
        let message = self.errors.lock().ok()?.get(extension_name)?.clone();
        Some(displayed_error_message(extension_name, &message))
    }
}

pub fn displayed_error_message(extension_name: &str, message: &str) -> String {
    if extension_name == TALISMAN && message == TALISMAN_NOT_CONFIGURED {
        return TALISMAN_NO_ACCOUNT.to_string();
    }
    strip_pathname(message).to_string()
}

/// Drops a leading `<url or path>: ` that extensions prepend to their errors.
fn strip_pathname(message: &str) -> &str {
    let Some((prefix, rest)) = message.split_once(": ") else {
        return message;
    };
    let looks_like_location = prefix.contains("://") || prefix.starts_with('/') || prefix.contains(".js");
    if looks_like_location && !prefix.contains(' ') {
        rest
    } else {
        message
    }
}
