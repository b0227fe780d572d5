//! Send-form checks over a [`BridgeState`] snapshot.
//!
//! Predicates return `None` while an input they need has not loaded yet;
//! callers treat `None` as "not valid".

use crate::balance::{atomic_per_unit, Balance};
use crate::bridge::state::BridgeState;

/// Conservative fee estimate, in tenths of a native token.
const FEE_ESTIMATE_TENTHS: u128 = 1;
/// Whole native tokens we suggest keeping for future fees.
const SUGGESTED_MIN_FEE_UNITS: u128 = 1;

/// Native token the fee payer must not go below: fee estimate + existential deposit.
pub fn reserved_native_token_balance(state: &BridgeState) -> Option<Balance> {
    state.native_balance.as_ref()?;
    let native = state.origin_native_asset()?.clone();
    let fee_estimate = atomic_per_unit(&native) / 10 * FEE_ESTIMATE_TENTHS;
    let reserved = fee_estimate.checked_add(state.origin_chain.existential_deposit)?;
    Some(Balance::new(native, reserved))
}

/// Highest amount of the selected asset that may be sent.
pub fn max_sendable_balance(state: &BridgeState) -> Option<Balance> {
    let current = state.current_balance.as_ref()?;
    let asset = state.asset.as_ref()?;
    state.native_balance.as_ref()?;
    if state.asset_is_native_on_origin() {
        let reserved = reserved_native_token_balance(state)?;
        let zero = Balance::zero(asset.clone());
        let remaining = current.sub(&reserved).ok()?;
        return Balance::max(&remaining, &zero).ok();
    }
    Some(current.value_over_existential_deposit())
}

/// True when sending the native token would leave less than the suggested
/// fee cushion behind.
pub fn tx_would_deplete_suggested_min_fee_balance(state: &BridgeState) -> bool {
    let (Some(current), Some(target)) = (state.current_balance.as_ref(), state.target_balance.as_ref()) else {
        return false;
    };
    if !(current.asset.is_native_on(&state.origin_chain) && target.asset.is_native_on(&state.origin_chain)) {
        return false;
    }
    let Some(native) = state.origin_native_asset() else {
        return false;
    };
    let suggested = Balance::new(native.clone(), atomic_per_unit(native) * SUGGESTED_MIN_FEE_UNITS);
    let Ok(after) = current.sub(target) else {
        return false;
    };
    // `after` is denominated in the sent asset, which is the native one here
    suggested.atomic >= after.atomic
}

pub fn user_has_sufficient_funds(state: &BridgeState) -> Option<bool> {
    let target = state.target_balance.as_ref()?;
    let current = state.current_balance.as_ref()?;
    state.asset.as_ref()?;
    if !target.same_asset(current) {
        return None;
    }
    max_sendable_balance(state)?.gte(target).ok()
}

pub fn user_can_pay_fee(state: &BridgeState) -> Option<bool> {
    let native_balance = state.native_balance.as_ref()?;
    let mut required = reserved_native_token_balance(state)?;
    if state.asset_is_native_on_origin() {
        if let Some(target) = state.target_balance.as_ref() {
            required = Balance::new(required.asset.clone(), required.atomic.checked_add(target.atomic)?);
        }
    }
    native_balance.gte(&required).ok()
}

pub fn receiver_amount_is_over_existential_deposit(state: &BridgeState) -> Option<bool> {
    let target = state.target_balance.as_ref()?;
    let asset = state.asset.as_ref()?;
    Some(target.atomic >= asset.existential_deposit)
}

/// Everything `is_valid_to_send` checks that lives in the form itself.
pub fn form_is_valid(state: &BridgeState) -> bool {
    state.target_balance.is_some()
        && state.current_balance.is_some()
        && user_has_sufficient_funds(state) == Some(true)
        && user_can_pay_fee(state) == Some(true)
        && receiver_amount_is_over_existential_deposit(state) == Some(true)
}
