//! Shared bridge form: state behind a lock, chain clients, signer, and the
//! transaction status the rest of the wallet watches.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::asset::{AssetCatalog, AssetType};
use crate::balance::Balance;
use crate::bridge::fetch::{fetch_asset_balance, fetch_native_token_balance};
use crate::bridge::state::{balance_update_is_stale, reduce, BridgeAction, BridgeState};
use crate::bridge::validation::form_is_valid;
use crate::bridge::xcm::{route, SendError, TransferArgs};
use crate::chain::{ChainCatalog, ChainError, ChainName};
use crate::client::{Account, ChainApis, ChainClient, Signer};
use crate::history::{HistoryRecorder, PrivateTxType, TxIntent};
use crate::metrics;
use crate::settings::Settings;
use crate::tx_status::{TxStatus, TxStatusHandle};

/// Coarse view of where the bridge form is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    /// No sender or no routable asset.
    Idle,
    BalancesLoading,
    ReadyToSend,
    Processing,
    Success,
    Failed,
}

pub struct BridgeContext {
    state: Mutex<BridgeState>,
    chains: ChainCatalog,
    apis: ChainApis,
    signer: Mutex<Option<Signer>>,
    tx_status: TxStatusHandle,
    settings: Option<Settings>,
    history: Option<Arc<HistoryRecorder>>,
}

impl BridgeContext {
    /// The remembered asset ticker, if any, is read from `settings`.
    pub fn new(
        chains: ChainCatalog,
        assets: Arc<AssetCatalog>,
        apis: ChainApis,
        tx_status: TxStatusHandle,
        settings: Option<Settings>,
    ) -> Result<Self> {
        let preferred = match &settings {
            Some(s) => s.current_token()?,
            None => None,
        };
        let state = BridgeState::new(&chains, assets, preferred.as_deref())?;
        Ok(Self {
            state: Mutex::new(state),
            chains,
            apis,
            signer: Mutex::new(None),
            tx_status,
            settings,
            history: None,
        })
    }

    pub fn with_history(mut self, recorder: Arc<HistoryRecorder>) -> Self {
        self.history = Some(recorder);
        self
    }

    pub fn tx_status(&self) -> &TxStatusHandle { &self.tx_status }

    pub async fn snapshot(&self) -> BridgeState {
        self.state.lock().await.clone()
    }

    pub async fn dispatch(&self, action: BridgeAction) {
        let mut state = self.state.lock().await;
        *state = reduce(&state, action);
    }

    pub async fn set_origin_chain(&self, name: ChainName) -> Result<(), ChainError> {
        let chain = self.chains.get(name).ok_or(ChainError::NotConfigured(name))?.clone();
        self.dispatch(BridgeAction::SetOriginChain(chain)).await;
        Ok(())
    }

    pub async fn set_destination_chain(&self, name: ChainName) -> Result<(), ChainError> {
        let chain = self.chains.get(name).ok_or(ChainError::NotConfigured(name))?.clone();
        self.dispatch(BridgeAction::SetDestinationChain(chain)).await;
        Ok(())
    }

    /// Selects `asset` (or the first valid option) and remembers the choice.
    pub async fn set_selected_asset_type(&self, asset: AssetType) -> Result<()> {
        let selected = {
            let mut state = self.state.lock().await;
            *state = reduce(&state, BridgeAction::SetSelectedAssetType(asset));
            state.asset.clone()
        };
        if let (Some(settings), Some(asset)) = (&self.settings, selected) {
            settings.set_current_token(&asset.ticker)?;
        }
        Ok(())
    }

    pub async fn set_sender_account(&self, account: Option<Account>) {
        self.dispatch(BridgeAction::SetSenderAccount(account)).await;
    }

    pub async fn set_sender_account_options(&self, accounts: Vec<Account>) {
        self.dispatch(BridgeAction::SetSenderAccountOptions(accounts)).await;
    }

    pub async fn set_signer(&self, signer: Option<Signer>) {
        *self.signer.lock().await = signer;
    }

    pub async fn set_target_balance(&self, balance: Option<Balance>) {
        self.dispatch(BridgeAction::SetTargetBalance(balance)).await;
    }

    /// Parses a user-typed amount. Empty or zero clears the target;
    /// input that does not parse leaves it as it was. Returns whether the
    /// target changed.
    pub async fn set_target_amount(&self, input: &str) -> bool {
        let mut state = self.state.lock().await;
        let input = input.trim();
        let target = if input.is_empty() {
            None
        } else {
            let Some(asset) = state.asset.clone() else {
                return false;
            };
            match Balance::from_base_units(asset, input) {
                Ok(b) if b.is_zero() => None,
                Ok(b) => Some(b),
                Err(e) => {
                    debug!("ignoring amount {:?}: {}", input, e);
                    return false;
                }
            }
        };
        *state = reduce(&state, BridgeAction::SetTargetBalance(target));
        true
    }

    /// Refreshes the selected asset balance of the sender on the origin chain.
    pub async fn fetch_balance(&self) -> Result<()> {
        let state = self.snapshot().await;
        let (Some(account), Some(asset)) = (state.sender_account.as_ref(), state.asset.as_ref()) else {
            return Ok(());
        };
        let Some(api) = self.apis.get(state.origin_chain.name) else {
            return Ok(());
        };
        if !api.is_connected().await {
            return Ok(());
        }
        metrics::BALANCE_POLLS.inc();
        let balance = fetch_asset_balance(api.as_ref(), &state.origin_chain, &account.address, asset).await?;
        self.apply_balance(state.generation, balance, false).await;
        Ok(())
    }

    /// Refreshes the origin-chain native balance used to pay fees.
    pub async fn fetch_fee_balance(&self) -> Result<()> {
        let state = self.snapshot().await;
        let Some(account) = state.sender_account.as_ref() else {
            return Ok(());
        };
        let Some(native) = state.origin_native_asset().cloned() else {
            return Ok(());
        };
        let Some(api) = self.apis.get(state.origin_chain.name) else {
            return Ok(());
        };
        if !api.is_connected().await {
            return Ok(());
        }
        metrics::BALANCE_POLLS.inc();
        let balance = fetch_native_token_balance(api.as_ref(), &account.address, &native).await?;
        self.apply_balance(state.generation, Some(balance), true).await;
        Ok(())
    }

    async fn apply_balance(&self, generation: u64, balance: Option<Balance>, fee: bool) {
        let mut state = self.state.lock().await;
        let stale = if fee {
            generation != state.generation
        } else {
            balance_update_is_stale(&state, generation, balance.as_ref())
        };
        if stale {
            metrics::STALE_BALANCE_UPDATES.inc();
            debug!("dropping balance from generation {} (now {})", generation, state.generation);
            return;
        }
        let action = if fee {
            BridgeAction::SetNativeTokenBalance { generation, balance }
        } else {
            BridgeAction::SetCurrentBalance { generation, balance }
        };
        *state = reduce(&state, action);
    }

    /// One poll of both balances. Errors are logged, never fatal.
    pub async fn poll_balances(&self) {
        if let Err(e) = self.fetch_balance().await {
            warn!("⚠️  balance fetch failed: {e:#}");
        }
        if let Err(e) = self.fetch_fee_balance().await {
            warn!("⚠️  fee balance fetch failed: {e:#}");
        }
    }

    pub async fn is_valid_to_send(&self) -> bool {
        let state = self.snapshot().await;
        self.sendable(&state).await.is_some()
    }

    /// Client, signer and amount for `state`, if that exact form may be sent.
    async fn sendable(&self, state: &BridgeState) -> Option<(Arc<dyn ChainClient>, Signer, Balance)> {
        if !form_is_valid(state) {
            return None;
        }
        let api = self.apis.get(state.origin_chain.name)?;
        if !api.is_connected().await {
            return None;
        }
        let signer = self.signer.lock().await.clone()?;
        let amount = state.target_balance.clone()?;
        Some((api, signer, amount))
    }

    pub async fn phase(&self) -> BridgePhase {
        match self.tx_status.current() {
            Some(TxStatus::Processing { .. }) => return BridgePhase::Processing,
            Some(TxStatus::Success { .. }) => return BridgePhase::Success,
            Some(TxStatus::Failed { .. }) => return BridgePhase::Failed,
            None => {}
        }
        let state = self.snapshot().await;
        if state.sender_account.is_none() || state.asset.is_none() {
            BridgePhase::Idle
        } else if state.current_balance.is_none() || state.native_balance.is_none() {
            BridgePhase::BalancesLoading
        } else {
            BridgePhase::ReadyToSend
        }
    }

    /// Submits the transfer to the sender's own address on the destination.
    /// The route is resolved before the status moves; submission failures
    /// end in `Failed` and are not retried.
    pub async fn send(&self) -> Result<String, SendError> {
        // validated and submitted from one snapshot; later form edits do not leak in
        let state = self.snapshot().await;
        let Some((api, signer, amount)) = self.sendable(&state).await else {
            return Err(SendError::NotValidToSend);
        };
        let transfer = route(state.origin_chain.name, state.destination_chain.name)?;

        if let Some(history) = &self.history {
            history.set_intent(TxIntent {
                transaction_type: PrivateTxType::Bridge,
                asset_ticker: amount.asset.ticker.clone(),
                amount: amount.format_amount(false),
            });
        }
        self.set_status(TxStatus::processing());
        info!("🚀 sending {} from {} to {}", amount, state.origin_chain.name, state.destination_chain.name);

        let result = transfer(TransferArgs {
            client: api.as_ref(),
            signer: &signer,
            recipient: &signer.address,
            amount: &amount,
            destination: &state.destination_chain,
        })
        .await;

        match result {
            Ok(hash) => {
                self.set_status(TxStatus::Processing { extrinsic: Some(hash.clone()) });
                self.set_status(TxStatus::Success { extrinsic: Some(hash.clone()) });
                metrics::SENDS.with_label_values(&["success"]).inc();
                info!("✅ bridge transfer included: {}", hash);
                Ok(hash)
            }
            Err(e) => {
                let reason = format!("{e:#}");
                self.set_status(TxStatus::Failed { reason: reason.clone() });
                metrics::SENDS.with_label_values(&["failed"]).inc();
                warn!("❌ bridge transfer failed: {}", reason);
                Err(SendError::Failed(reason))
            }
        }
    }

    fn set_status(&self, status: TxStatus) {
        if let Some(history) = &self.history {
            if let Err(e) = history.observe(&status) {
                warn!("⚠️  could not record history: {e:#}");
            }
        }
        self.tx_status.set(status);
    }

    /// Polls balances every `interval` until shutdown.
    pub fn spawn_balance_poller(self: Arc<Self>, interval: Duration, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("🛑 balance poller received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.poll_balances().await;
                    }
                }
            }
        })
    }
}
