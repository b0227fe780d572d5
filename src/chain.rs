use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use anyhow::{Context, Result};
use thiserror::Error;

use crate::config::ChainEntry;

/// Every chain the wallet knows how to query and bridge between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainName {
    Calamari,
    Dolphin,
    Rococo,
    Karura,
}

impl ChainName {
    pub const ALL: [ChainName; 4] = [ChainName::Calamari, ChainName::Dolphin, ChainName::Rococo, ChainName::Karura];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainName::Calamari => "Calamari",
            ChainName::Dolphin => "Dolphin",
            ChainName::Rococo => "Rococo",
            ChainName::Karura => "Karura",
        }
    }
}

impl fmt::Display for ChainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("unrecognized chain: {0}")]
    UnknownChain(String),
    #[error("chain {0} is not configured")]
    NotConfigured(ChainName),
}

impl FromStr for ChainName {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChainName::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ChainError::UnknownChain(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub name: ChainName,
    pub display_name: String,
    pub socket: String,
    /// Parachain id; `None` for a relay chain.
    pub para_id: Option<u32>,
    /// Ticker of the asset fees are paid in.
    pub native_asset: String,
    /// Atomic units of the native asset an account must keep.
    pub existential_deposit: u128,
}

impl Chain {
    pub fn is_relay(&self) -> bool { self.para_id.is_none() }

    fn from_entry(entry: &ChainEntry) -> Result<Self> {
        let name: ChainName = entry.name.parse()?;
        let existential_deposit = entry.existential_deposit.trim().parse::<u128>()
            .with_context(|| format!("invalid existential_deposit for chain {}", entry.name))?;
        Ok(Chain {
            name,
            display_name: entry.display_name.clone(),
            socket: entry.socket.clone(),
            para_id: entry.para_id,
            native_asset: entry.native_asset.clone(),
            existential_deposit,
        })
    }
}

/// Configured chains, in config order. The first entry is the default origin.
#[derive(Debug, Clone)]
pub struct ChainCatalog {
    chains: Vec<Chain>,
}

impl ChainCatalog {
    pub fn new(chains: Vec<Chain>) -> Self { Self { chains } }

    pub fn from_entries(entries: &[ChainEntry]) -> Result<Self> {
        let mut chains: Vec<Chain> = Vec::with_capacity(entries.len());
        for entry in entries {
            let chain = Chain::from_entry(entry)?;
            if chains.iter().any(|c| c.name == chain.name) {
                anyhow::bail!("chain {} configured twice", chain.name);
            }
            chains.push(chain);
        }
        Ok(Self { chains })
    }

    pub fn all(&self) -> &[Chain] { &self.chains }

    pub fn len(&self) -> usize { self.chains.len() }

    pub fn is_empty(&self) -> bool { self.chains.is_empty() }

    pub fn get(&self, name: ChainName) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// Parses a user-supplied name and resolves it against the catalog.
    pub fn resolve(&self, name: &str) -> Result<&Chain, ChainError> {
        let parsed: ChainName = name.parse()?;
        self.get(parsed).ok_or(ChainError::NotConfigured(parsed))
    }
}
