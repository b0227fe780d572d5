//! Bridge form state and its reducer.
//!
//! `reduce` is a pure function of `(state, action)`. Every change of origin,
//! destination, asset or sender account bumps `generation`; balance results
//! carry the generation they were requested under and are dropped when it
//! no longer matches, or when their asset is not the one selected now.

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::asset::{AssetCatalog, AssetType};
use crate::balance::Balance;
use crate::chain::{Chain, ChainCatalog};
use crate::client::Account;

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeState {
    pub sender_account: Option<Account>,
    pub sender_account_options: Vec<Account>,

    pub asset: Option<AssetType>,
    pub asset_options: Vec<AssetType>,
    pub current_balance: Option<Balance>,
    pub target_balance: Option<Balance>,
    /// Origin-chain native balance of the fee payer.
    pub native_balance: Option<Balance>,

    pub origin_chain: Chain,
    pub origin_options: Vec<Chain>,
    pub destination_chain: Chain,
    pub destination_options: Vec<Chain>,

    pub generation: u64,
    catalog: Arc<AssetCatalog>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAction {
    SetSelectedAssetType(AssetType),
    SetSenderAccount(Option<Account>),
    SetSenderAccountOptions(Vec<Account>),
    SetCurrentBalance { generation: u64, balance: Option<Balance> },
    SetTargetBalance(Option<Balance>),
    SetNativeTokenBalance { generation: u64, balance: Option<Balance> },
    SetOriginChain(Chain),
    SetDestinationChain(Chain),
    SetChainOptions(Vec<Chain>),
}

pub fn destination_options(origin: &Chain, chains: &[Chain]) -> Vec<Chain> {
    chains.iter().filter(|c| c.name != origin.name).cloned().collect()
}

pub fn asset_options(catalog: &AssetCatalog, origin: &Chain, destination: &Chain) -> Vec<AssetType> {
    catalog.transferable(origin, destination)
}

/// Keeps `preferred` if it is still an option, else the first option, else nothing.
pub fn pick_asset(preferred: Option<&AssetType>, options: &[AssetType]) -> Option<AssetType> {
    preferred
        .and_then(|p| options.iter().find(|a| a.asset_id == p.asset_id))
        .or_else(|| options.first())
        .cloned()
}

impl BridgeState {
    /// Initial form: first chain as origin, next as destination, and the
    /// remembered asset ticker if it can cross that pair.
    pub fn new(chains: &ChainCatalog, catalog: Arc<AssetCatalog>, preferred_ticker: Option<&str>) -> Result<Self> {
        let origin_options = chains.all().to_vec();
        let Some(origin_chain) = origin_options.first().cloned() else {
            bail!("no chains configured");
        };
        let destination_options = destination_options(&origin_chain, &origin_options);
        let Some(destination_chain) = destination_options.first().cloned() else {
            bail!("bridging needs at least two chains");
        };
        let asset_options = asset_options(&catalog, &origin_chain, &destination_chain);
        let preferred = preferred_ticker.and_then(|t| catalog.by_ticker(t)).cloned();
        let asset = pick_asset(preferred.as_ref(), &asset_options);
        Ok(Self {
            sender_account: None,
            sender_account_options: Vec::new(),
            asset,
            asset_options,
            current_balance: None,
            target_balance: None,
            native_balance: None,
            origin_chain,
            origin_options,
            destination_chain,
            destination_options,
            generation: 0,
            catalog,
        })
    }

    pub fn catalog(&self) -> &AssetCatalog { &self.catalog }

    /// The asset fees on the origin chain are paid in.
    pub fn origin_native_asset(&self) -> Option<&AssetType> {
        self.catalog.by_ticker(&self.origin_chain.native_asset)
    }

    /// Whether the selected asset is what the origin chain charges fees in.
    pub fn asset_is_native_on_origin(&self) -> bool {
        self.asset.as_ref().map_or(false, |a| a.is_native_on(&self.origin_chain))
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// A balance result for `update` is stale if the form moved on since it was requested.
pub fn balance_update_is_stale(state: &BridgeState, generation: u64, update: Option<&Balance>) -> bool {
    if generation != state.generation {
        return true;
    }
    match (update, state.asset.as_ref()) {
        (None, _) => false,
        (Some(b), Some(selected)) => b.asset.asset_id != selected.asset_id,
        (Some(_), None) => true,
    }
}

pub fn reduce(state: &BridgeState, action: BridgeAction) -> BridgeState {
    match action {
        BridgeAction::SetSelectedAssetType(asset) => set_selected_asset_type(state, asset),
        BridgeAction::SetSenderAccount(account) => {
            let mut next = state.clone();
            next.sender_account = account;
            next.current_balance = None;
            next.native_balance = None;
            next.bump();
            next
        }
        BridgeAction::SetSenderAccountOptions(options) => {
            let mut next = state.clone();
            next.sender_account_options = options;
            next
        }
        BridgeAction::SetCurrentBalance { generation, balance } => {
            if balance_update_is_stale(state, generation, balance.as_ref()) {
                return state.clone();
            }
            let mut next = state.clone();
            next.current_balance = balance;
            next
        }
        BridgeAction::SetTargetBalance(balance) => {
            if let (Some(b), Some(selected)) = (balance.as_ref(), state.asset.as_ref()) {
                if b.asset.asset_id != selected.asset_id {
                    return state.clone();
                }
            }
            let mut next = state.clone();
            next.target_balance = balance;
            next
        }
        BridgeAction::SetNativeTokenBalance { generation, balance } => {
            if generation != state.generation {
                return state.clone();
            }
            if let Some(b) = balance.as_ref() {
                if b.asset.ticker != state.origin_chain.native_asset {
                    return state.clone();
                }
            }
            let mut next = state.clone();
            next.native_balance = balance;
            next
        }
        BridgeAction::SetOriginChain(origin) => set_origin_chain(state, origin),
        BridgeAction::SetDestinationChain(destination) => set_destination_chain(state, destination),
        BridgeAction::SetChainOptions(chains) => set_chain_options(state, chains),
    }
}

fn set_selected_asset_type(state: &BridgeState, requested: AssetType) -> BridgeState {
    let mut next = state.clone();
    let asset = pick_asset(Some(&requested), &state.asset_options);
    next.target_balance = match (&state.target_balance, &asset) {
        (Some(target), Some(asset)) => target.redenominate(asset.clone()),
        _ => None,
    };
    next.asset = asset;
    next.current_balance = None;
    next.bump();
    next
}

fn set_origin_chain(state: &BridgeState, origin: Chain) -> BridgeState {
    if !state.origin_options.iter().any(|c| c.name == origin.name) {
        return state.clone();
    }
    let destination_options = destination_options(&origin, &state.origin_options);
    let destination_chain = if state.destination_chain.name == origin.name {
        match destination_options.first() {
            Some(c) => c.clone(),
            None => return state.clone(),
        }
    } else {
        state.destination_chain.clone()
    };
    retarget(state, origin, destination_chain, destination_options)
}

fn set_destination_chain(state: &BridgeState, destination: Chain) -> BridgeState {
    if !state.destination_options.iter().any(|c| c.name == destination.name) {
        return state.clone();
    }
    retarget(state, state.origin_chain.clone(), destination, state.destination_options.clone())
}

fn set_chain_options(state: &BridgeState, chains: Vec<Chain>) -> BridgeState {
    let (Some(origin), Some(destination)) = (chains.first().cloned(), chains.get(1).cloned()) else {
        return state.clone();
    };
    let destination_options = destination_options(&origin, &chains);
    let mut next = retarget(state, origin, destination, destination_options);
    next.origin_options = chains;
    next
}

fn retarget(state: &BridgeState, origin: Chain, destination: Chain, destination_options: Vec<Chain>) -> BridgeState {
    let mut next = state.clone();
    let asset_options = asset_options(&state.catalog, &origin, &destination);
    let asset = pick_asset(state.asset.as_ref(), &asset_options);
    if asset.as_ref().map(|a| a.asset_id) != state.asset.as_ref().map(|a| a.asset_id) {
        next.target_balance = match (&state.target_balance, &asset) {
            (Some(target), Some(asset)) => target.redenominate(asset.clone()),
            _ => None,
        };
    }
    next.origin_chain = origin;
    next.destination_chain = destination;
    next.destination_options = destination_options;
    next.asset_options = asset_options;
    next.asset = asset;
    next.native_balance = None;
    next.current_balance = None;
    next.bump();
    next
}
