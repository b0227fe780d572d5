//! Per-chain balance queries.

use anyhow::Result;
use tracing::debug;

use crate::asset::AssetType;
use crate::balance::Balance;
use crate::chain::{Chain, ChainName};
use crate::client::ChainClient;

/// How balances are read on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStrategy {
    /// Native token from `system.account`, everything else from the assets pallet.
    Manta,
    /// Relay chain: only ROC, natively.
    Rococo,
    /// Only KAR, natively.
    Karura,
}

pub fn strategy_for(chain: ChainName) -> BalanceStrategy {
    match chain {
        ChainName::Calamari => BalanceStrategy::Manta,
        ChainName::Dolphin => BalanceStrategy::Manta,
        ChainName::Rococo => BalanceStrategy::Rococo,
        ChainName::Karura => BalanceStrategy::Karura,
    }
}

pub async fn fetch_native_token_balance(client: &dyn ChainClient, address: &str, asset: &AssetType) -> Result<Balance> {
    let free = client.system_account_free(address).await?;
    Ok(Balance::new(asset.clone(), free))
}

/// Balance of `asset` for `address` on `chain`. `None` when the chain does
/// not carry that asset.
pub async fn fetch_asset_balance(
    client: &dyn ChainClient,
    chain: &Chain,
    address: &str,
    asset: &AssetType,
) -> Result<Option<Balance>> {
    match strategy_for(chain.name) {
        BalanceStrategy::Manta => {
            if asset.is_native_on(chain) {
                return Ok(Some(fetch_native_token_balance(client, address, asset).await?));
            }
            let atomic = client.assets_account(asset.asset_id, address).await?.unwrap_or(0);
            Ok(Some(Balance::new(asset.clone(), atomic)))
        }
        BalanceStrategy::Rococo => native_if_ticker(client, chain, address, asset, "ROC").await,
        BalanceStrategy::Karura => native_if_ticker(client, chain, address, asset, "KAR").await,
    }
}

async fn native_if_ticker(
    client: &dyn ChainClient,
    chain: &Chain,
    address: &str,
    asset: &AssetType,
    ticker: &str,
) -> Result<Option<Balance>> {
    if asset.ticker != ticker {
        debug!("{} holds no {} balance", chain.name, asset.ticker);
        return Ok(None);
    }
    Ok(Some(fetch_native_token_balance(client, address, asset).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::OfflineChainClient;

    fn chain(name: ChainName, native: &str) -> Chain {
        Chain {
            name,
            display_name: name.to_string(),
            socket: String::new(),
            para_id: None,
            native_asset: native.into(),
            existential_deposit: 0,
        }
    }

    #[test]
    fn calamari_and_dolphin_share_a_strategy() {
        assert_eq!(strategy_for(ChainName::Calamari), strategy_for(ChainName::Dolphin));
        assert_ne!(strategy_for(ChainName::Rococo), strategy_for(ChainName::Karura));
    }

    #[tokio::test]
    async fn manta_reads_assets_pallet_for_foreign_assets() {
        let client = OfflineChainClient::new(ChainName::Dolphin);
        let dolphin = chain(ChainName::Dolphin, "DOL");
        let dol = AssetType::new("DOL", "Dolphin", 1, 18, true, 0, vec![]);
        let kar = AssetType::new("KAR", "Karura", 9, 12, false, 0, vec![]);
        client.set_native_balance("alice", 42).await;
        client.set_asset_balance(9, "alice", 7).await;

        let native = fetch_asset_balance(&client, &dolphin, "alice", &dol).await.unwrap().unwrap();
        assert_eq!(native.atomic, 42);
        let foreign = fetch_asset_balance(&client, &dolphin, "alice", &kar).await.unwrap().unwrap();
        assert_eq!(foreign.atomic, 7);
        let empty = fetch_asset_balance(&client, &dolphin, "bob", &kar).await.unwrap().unwrap();
        assert_eq!(empty.atomic, 0);
    }

    #[tokio::test]
    async fn relay_only_knows_its_own_token() {
        let client = OfflineChainClient::new(ChainName::Rococo);
        let rococo = chain(ChainName::Rococo, "ROC");
        let roc = AssetType::new("ROC", "Rococo", 8, 12, false, 0, vec![]);
        let kar = AssetType::new("KAR", "Karura", 9, 12, false, 0, vec![]);
        client.set_native_balance("alice", 5).await;
        assert_eq!(fetch_asset_balance(&client, &rococo, "alice", &roc).await.unwrap().unwrap().atomic, 5);
        assert!(fetch_asset_balance(&client, &rococo, "alice", &kar).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disconnected_client_is_an_error() {
        let client = OfflineChainClient::new(ChainName::Karura);
        client.set_connected(false);
        let kar = AssetType::new("KAR", "Karura", 9, 12, false, 0, vec![]);
        assert!(fetch_asset_balance(&client, &chain(ChainName::Karura, "KAR"), "alice", &kar).await.is_err());
    }
}
