//! Cross-chain transfer calls, one per supported `(origin, destination)` pair.

use anyhow::{bail, Result};
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::info;

use crate::balance::Balance;
use crate::chain::{Chain, ChainName};
use crate::client::{AssetSource, ChainClient, Signer, XcmCall};

/// Upper bound on destination execution weight attached to every call.
pub const XCM_WEIGHT_LIMIT: u64 = 5_000_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("transaction is not valid to send")]
    NotValidToSend,
    #[error("no transfer route from {origin} to {destination}")]
    UnsupportedRoute { origin: ChainName, destination: ChainName },
    #[error("transfer failed: {0}")]
    Failed(String),
}

pub struct TransferArgs<'a> {
    pub client: &'a dyn ChainClient,
    pub signer: &'a Signer,
    /// Beneficiary address on the destination chain.
    pub recipient: &'a str,
    pub amount: &'a Balance,
    pub destination: &'a Chain,
}

/// Builds and submits the call; resolves to the extrinsic hash.
pub type TransferFn = for<'a> fn(TransferArgs<'a>) -> BoxFuture<'a, Result<String>>;

const ROUTES: &[((ChainName, ChainName), TransferFn)] = &[
    ((ChainName::Dolphin, ChainName::Rococo), transfer_roc_from_dolphin_to_rococo),
    ((ChainName::Dolphin, ChainName::Karura), transfer_kar_from_dolphin_to_karura),
    ((ChainName::Rococo, ChainName::Dolphin), transfer_roc_from_rococo_to_dolphin),
    ((ChainName::Karura, ChainName::Dolphin), transfer_kar_from_karura_to_dolphin),
];

pub fn route(origin: ChainName, destination: ChainName) -> Result<TransferFn, SendError> {
    ROUTES
        .iter()
        .find(|((o, d), _)| *o == origin && *d == destination)
        .map(|(_, f)| *f)
        .ok_or(SendError::UnsupportedRoute { origin, destination })
}

/// Pairs with a transfer function, in table order.
pub fn supported_routes() -> impl Iterator<Item = (ChainName, ChainName)> {
    ROUTES.iter().map(|(pair, _)| *pair)
}

fn expect_ticker(amount: &Balance, ticker: &str) -> Result<()> {
    if amount.asset.ticker != ticker {
        bail!("route carries {} only, got {}", ticker, amount.asset.ticker);
    }
    Ok(())
}

async fn submit(args: TransferArgs<'_>, pallet: &'static str, method: &'static str, source: AssetSource) -> Result<String> {
    let call = XcmCall {
        pallet,
        method,
        origin: args.client.chain(),
        destination: args.destination.name,
        dest_para_id: args.destination.para_id,
        beneficiary: args.recipient.to_string(),
        asset_ticker: args.amount.asset.ticker.clone(),
        source,
        amount: args.amount.atomic,
        weight_limit: XCM_WEIGHT_LIMIT,
    };
    info!("🌉 {}.{} {} {} → {}", pallet, method, args.amount, call.origin, call.destination);
    args.client.submit(args.signer, &call).await
}

fn transfer_roc_from_dolphin_to_rococo(args: TransferArgs<'_>) -> BoxFuture<'_, Result<String>> {
    Box::pin(async move {
        expect_ticker(args.amount, "ROC")?;
        let source = AssetSource::Assets(args.amount.asset.asset_id);
        submit(args, "xTokens", "transfer", source).await
    })
}

fn transfer_kar_from_dolphin_to_karura(args: TransferArgs<'_>) -> BoxFuture<'_, Result<String>> {
    Box::pin(async move {
        expect_ticker(args.amount, "KAR")?;
        let source = AssetSource::Assets(args.amount.asset.asset_id);
        submit(args, "xTokens", "transfer", source).await
    })
}

fn transfer_roc_from_rococo_to_dolphin(args: TransferArgs<'_>) -> BoxFuture<'_, Result<String>> {
    Box::pin(async move {
        expect_ticker(args.amount, "ROC")?;
        submit(args, "xcmPallet", "limitedReserveTransferAssets", AssetSource::Native).await
    })
}

fn transfer_kar_from_karura_to_dolphin(args: TransferArgs<'_>) -> BoxFuture<'_, Result<String>> {
    Box::pin(async move {
        expect_ticker(args.amount, "KAR")?;
        submit(args, "xTokens", "transfer", AssetSource::Native).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetType;
    use crate::client::OfflineChainClient;

    fn dolphin() -> Chain {
        Chain {
            name: ChainName::Dolphin,
            display_name: "Dolphin".into(),
            socket: String::new(),
            para_id: Some(2084),
            native_asset: "DOL".into(),
            existential_deposit: 0,
        }
    }

    #[test]
    fn only_four_pairs_route() {
        assert_eq!(supported_routes().count(), 4);
        assert!(route(ChainName::Rococo, ChainName::Karura).is_err());
        assert_eq!(
            route(ChainName::Calamari, ChainName::Dolphin).err(),
            Some(SendError::UnsupportedRoute { origin: ChainName::Calamari, destination: ChainName::Dolphin })
        );
        for (o, d) in supported_routes() {
            assert!(route(o, d).is_ok());
        }
    }

    #[tokio::test]
    async fn karura_to_dolphin_debits_native_balance() {
        let client = OfflineChainClient::new(ChainName::Karura);
        client.set_native_balance("alice", 100).await;
        let kar = AssetType::new("KAR", "Karura", 9, 12, false, 0, vec![]);
        let signer = Signer { address: "alice".into(), source: "polkadot-js".into() };
        let amount = Balance::new(kar, 40);
        let destination = dolphin();
        let transfer = route(ChainName::Karura, ChainName::Dolphin).unwrap();
        let hash = transfer(TransferArgs { client: &client, signer: &signer, recipient: "alice", amount: &amount, destination: &destination })
            .await
            .unwrap();
        assert!(hash.starts_with("0x"));
        let calls = client.submitted().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].dest_para_id, Some(2084));
        assert_eq!(calls[0].source, AssetSource::Native);
        assert_eq!(client.system_account_free("alice").await.unwrap(), 60);
    }

    #[tokio::test]
    async fn wrong_asset_for_route_is_rejected() {
        let client = OfflineChainClient::new(ChainName::Karura);
        let roc = AssetType::new("ROC", "Rococo", 8, 12, false, 0, vec![]);
        let signer = Signer { address: "alice".into(), source: "polkadot-js".into() };
        let amount = Balance::new(roc, 1);
        let destination = dolphin();
        let transfer = route(ChainName::Karura, ChainName::Dolphin).unwrap();
        let result = transfer(TransferArgs { client: &client, signer: &signer, recipient: "alice", amount: &amount, destination: &destination }).await;
        assert!(result.is_err());
        assert!(client.submitted().await.is_empty());
    }
}
