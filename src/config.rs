use serde::Deserialize;
use std::{fs, path::Path};
use anyhow::{bail, Context, Result};

use crate::asset::AssetCatalog;
use crate::chain::ChainCatalog;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: Storage,
    #[serde(default)]
    pub polling: Polling,
    pub explorer: Explorer,
    #[serde(default)]
    pub sbt: Sbt,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub wallet: WalletPrefs,
    pub chains: Vec<ChainEntry>,
    pub assets: Vec<AssetEntry>,
    #[serde(default)]
    pub wallets: Vec<WalletEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Storage {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Polling {
    #[serde(default = "default_balance_interval")]
    pub balance_interval_ms: u64,
    #[serde(default = "default_history_interval")]
    pub history_interval_ms: u64,
    #[serde(default = "default_pending_wait")]
    pub pending_tx_max_wait_ms: u64,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            balance_interval_ms: default_balance_interval(),
            history_interval_ms: default_history_interval(),
            pending_tx_max_wait_ms: default_pending_wait(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Explorer {
    /// Base of the explorer API; `/extrinsic` is appended per query.
    pub endpoint: String,
    /// Human-facing explorer site used to build per-extrinsic links.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Sbt {
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metrics {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for Metrics {
    fn default() -> Self { Self { bind: default_bind() } }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WalletPrefs {
    #[serde(default)]
    pub using_manta_wallet: bool,
}

/// A `[[chains]]` table. Amounts are strings so 18-decimal values fit.
#[derive(Debug, Deserialize, Clone)]
pub struct ChainEntry {
    pub name: String,
    pub display_name: String,
    pub socket: String,
    #[serde(default)]
    pub para_id: Option<u32>,
    pub native_asset: String,
    pub existential_deposit: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetEntry {
    pub ticker: String,
    pub name: String,
    pub asset_id: u32,
    pub decimals: u8,
    #[serde(default)]
    pub is_native: bool,
    pub existential_deposit: String,
    /// `[origin, destination]` chain name pairs this asset may cross.
    #[serde(default)]
    pub routes: Vec<(String, String)>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalletEntry {
    pub extension_name: String,
    pub display_name: String,
    pub install_url: String,
    #[serde(default)]
    pub installed: bool,
}

fn default_balance_interval() -> u64 { 200 }
fn default_history_interval() -> u64 { 10_000 }
fn default_pending_wait() -> u64 { 200_000 }
fn default_bind() -> String { "127.0.0.1:9110".into() }

impl Config {
    /// Builds the immutable chain catalog. Fails on unknown chain names.
    pub fn chain_catalog(&self) -> Result<ChainCatalog> {
        ChainCatalog::from_entries(&self.chains)
    }

    pub fn asset_catalog(&self) -> Result<AssetCatalog> {
        AssetCatalog::from_entries(&self.assets)
    }

    /// Cross-checks chains, assets and routes against each other.
    pub fn validate(&self) -> Result<()> {
        let chains = self.chain_catalog()?;
        let assets = self.asset_catalog()?;
        if chains.len() < 2 {
            bail!("at least two chains are required to bridge, found {}", chains.len());
        }
        for chain in chains.all() {
            if assets.by_ticker(&chain.native_asset).is_none() {
                bail!("chain {} names native asset {} which is not in [[assets]]", chain.name, chain.native_asset);
            }
        }
        for asset in assets.all() {
            for (origin, destination) in asset.routes() {
                for name in [origin, destination] {
                    if chains.get(*name).is_none() {
                        bail!("asset {} routes through {} which is not in [[chains]]", asset.ticker, name);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Read the TOML file at `p` and deserialize into `Config`.
/// *Adds context* so user errors print a friendlier message.
///
/// # Errors
/// * Returns an anyhow::Error if the file cannot be read, parsed or validated.
pub fn load<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .with_context(|| format!("🗂️  couldn't read config file {}", p.as_ref().display()))?;
    load_from_str(&text)
}

pub fn load_from_str(text: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(text)
        .with_context(|| "📝  invalid TOML in config file".to_string())?;
    cfg.validate()?;
    Ok(cfg)
}

/// The config shipped inside the binary, used when no file is found.
pub const EMBEDDED_CONFIG: &str = include_str!("../config.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_is_valid() {
        let cfg = load_from_str(EMBEDDED_CONFIG).expect("embedded config");
        assert_eq!(cfg.polling.balance_interval_ms, 200);
        assert_eq!(cfg.polling.history_interval_ms, 10_000);
        assert_eq!(cfg.polling.pending_tx_max_wait_ms, 200_000);
        assert_eq!(cfg.chain_catalog().unwrap().len(), 3);
    }

    #[test]
    fn rejects_unknown_chain_name() {
        let text = EMBEDDED_CONFIG.replace("name = \"Karura\"", "name = \"Atlantis\"");
        let err = load_from_str(&text).unwrap_err();
        assert!(format!("{err:#}").contains("Atlantis"));
    }

    #[test]
    fn rejects_route_through_missing_chain() {
        let text = EMBEDDED_CONFIG.replace("[\"Dolphin\", \"Karura\"]", "[\"Dolphin\", \"Calamari\"]");
        let err = load_from_str(&text).unwrap_err();
        assert!(format!("{err:#}").contains("Calamari"));
    }
}
