// Library interface for the xcmwallet core
// This allows the CLI, tests and external front-ends to drive the wallet

pub mod config;
pub mod chain;
pub mod asset;
pub mod balance;
pub mod client;
pub mod storage;
pub mod settings;
pub mod tx_status;
pub mod bridge;
pub mod history;
pub mod reconcile;
pub mod wallets;
pub mod sbt;
pub mod metrics;

pub use asset::{AssetCatalog, AssetType};
pub use balance::{Balance, BalanceError};
pub use chain::{Chain, ChainCatalog, ChainError, ChainName};
pub use client::{Account, ChainApis, ChainClient, OfflineChainClient, Signer};
pub use storage::Store;
pub use tx_status::{TxStatus, TxStatusHandle};
pub use bridge::{BridgeContext, BridgePhase, SendError};
pub use history::{HistoryRecorder, HistoryStore, TxHistoryEvent};
pub use reconcile::{ExplorerClient, Reconciler, SubscanExplorer};
