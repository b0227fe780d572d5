use serde::{Deserialize, Serialize};
use anyhow::{bail, Context, Result};

use crate::chain::{Chain, ChainName};
use crate::config::AssetEntry;

/// A token the wallet can hold and, for some chain pairs, bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetType {
    pub ticker: String,
    pub name: String,
    pub asset_id: u32,
    pub decimals: u8,
    pub is_native: bool,
    pub existential_deposit: u128,
    routes: Vec<(ChainName, ChainName)>,
}

impl AssetType {
    pub fn new(
        ticker: impl Into<String>,
        name: impl Into<String>,
        asset_id: u32,
        decimals: u8,
        is_native: bool,
        existential_deposit: u128,
        routes: Vec<(ChainName, ChainName)>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            asset_id,
            decimals,
            is_native,
            existential_deposit,
            routes,
        }
    }

    pub fn routes(&self) -> &[(ChainName, ChainName)] { &self.routes }

    pub fn can_transfer_xcm(&self, origin: &Chain, destination: &Chain) -> bool {
        self.routes.iter().any(|(o, d)| *o == origin.name && *d == destination.name)
    }

    /// Fees on `chain` are paid in this asset. `is_native` alone says nothing
    /// about which chain the asset is native to.
    pub fn is_native_on(&self, chain: &Chain) -> bool {
        self.ticker == chain.native_asset
    }

    fn from_entry(entry: &AssetEntry) -> Result<Self> {
        let existential_deposit = entry.existential_deposit.trim().parse::<u128>()
            .with_context(|| format!("invalid existential_deposit for asset {}", entry.ticker))?;
        if entry.decimals > 30 {
            bail!("asset {} has {} decimals; at most 30 are supported", entry.ticker, entry.decimals);
        }
        let mut routes = Vec::with_capacity(entry.routes.len());
        for (origin, destination) in &entry.routes {
            let pair = (origin.parse::<ChainName>()?, destination.parse::<ChainName>()?);
            if pair.0 == pair.1 {
                bail!("asset {} lists a route from {} to itself", entry.ticker, pair.0);
            }
            routes.push(pair);
        }
        Ok(AssetType {
            ticker: entry.ticker.clone(),
            name: entry.name.clone(),
            asset_id: entry.asset_id,
            decimals: entry.decimals,
            is_native: entry.is_native,
            existential_deposit,
            routes,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCatalog {
    assets: Vec<AssetType>,
}

impl AssetCatalog {
    pub fn new(assets: Vec<AssetType>) -> Self { Self { assets } }

    pub fn from_entries(entries: &[AssetEntry]) -> Result<Self> {
        let mut assets: Vec<AssetType> = Vec::with_capacity(entries.len());
        for entry in entries {
            let asset = AssetType::from_entry(entry)?;
            if assets.iter().any(|a| a.asset_id == asset.asset_id || a.ticker == asset.ticker) {
                bail!("asset {} (id {}) configured twice", asset.ticker, asset.asset_id);
            }
            assets.push(asset);
        }
        Ok(Self { assets })
    }

    pub fn all(&self) -> &[AssetType] { &self.assets }

    pub fn by_ticker(&self, ticker: &str) -> Option<&AssetType> {
        self.assets.iter().find(|a| a.ticker.eq_ignore_ascii_case(ticker))
    }

    pub fn by_id(&self, asset_id: u32) -> Option<&AssetType> {
        self.assets.iter().find(|a| a.asset_id == asset_id)
    }

    /// Assets that may cross from `origin` to `destination`, in catalog order.
    pub fn transferable(&self, origin: &Chain, destination: &Chain) -> Vec<AssetType> {
        self.assets
            .iter()
            .filter(|a| a.can_transfer_xcm(origin, destination))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(name: ChainName, native: &str) -> Chain {
        Chain {
            name,
            display_name: name.to_string(),
            socket: String::new(),
            para_id: None,
            native_asset: native.into(),
            existential_deposit: 1,
        }
    }

    #[test]
    fn native_only_on_the_chain_that_charges_fees_in_it() {
        let dol = AssetType::new("DOL", "Dolphin", 1, 18, true, 1, vec![]);
        let kar = AssetType::new("KAR", "Karura", 9, 12, false, 1, vec![]);
        let dolphin = chain(ChainName::Dolphin, "DOL");
        let karura = chain(ChainName::Karura, "KAR");
        let rococo = chain(ChainName::Rococo, "ROC");

        assert!(dol.is_native_on(&dolphin));
        assert!(!dol.is_native_on(&karura));
        assert!(!dol.is_native_on(&rococo));
        assert!(kar.is_native_on(&karura));
        assert!(!kar.is_native_on(&dolphin));
    }
}
