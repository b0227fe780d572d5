//! Unit-checked token amounts.
//!
//! A [`Balance`] pairs an [`AssetType`] with an amount in atomic units. Any
//! arithmetic or comparison between balances of different assets is an
//! error rather than a silently wrong number.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::asset::AssetType;

/// Fractional digits shown by the rounded display form.
const ROUNDED_DISPLAY_DIGITS: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("cannot combine {left} with {right}")]
    AssetMismatch { left: String, right: String },
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    #[error("amount '{input}' has more than {decimals} decimal places")]
    TooPrecise { input: String, decimals: u8 },
    #[error("amount overflows")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: AssetType,
    pub atomic: u128,
}

/// 10^decimals, i.e. how many atomic units make one whole token.
pub fn atomic_per_unit(asset: &AssetType) -> u128 {
    10u128.pow(asset.decimals as u32)
}

impl Balance {
    pub fn new(asset: AssetType, atomic: u128) -> Self {
        Self { asset, atomic }
    }

    pub fn zero(asset: AssetType) -> Self {
        Self::new(asset, 0)
    }

    /// Parses a human amount such as `"12.5"` into atomic units of `asset`.
    pub fn from_base_units(asset: AssetType, input: &str) -> Result<Self, BalanceError> {
        let trimmed = input.trim();
        let invalid = || BalanceError::InvalidAmount(input.to_string());
        if trimmed.is_empty() {
            return Err(invalid());
        }
        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(invalid());
        }
        let frac = frac.trim_end_matches('0');
        if frac.len() > asset.decimals as usize {
            return Err(BalanceError::TooPrecise { input: input.to_string(), decimals: asset.decimals });
        }
        let unit = atomic_per_unit(&asset);
        let whole_units: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| BalanceError::Overflow)? };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let scale = 10u128.pow((asset.decimals as usize - frac.len()) as u32);
            frac.parse::<u128>().map_err(|_| invalid())? * scale
        };
        let atomic = whole_units
            .checked_mul(unit)
            .and_then(|v| v.checked_add(frac_units))
            .ok_or(BalanceError::Overflow)?;
        Ok(Self::new(asset, atomic))
    }

    /// The same human amount denominated in `asset`, rescaled for its
    /// decimals. `None` when the amount has no exact representation there.
    pub fn redenominate(&self, asset: AssetType) -> Option<Self> {
        let (from, to) = (self.asset.decimals as u32, asset.decimals as u32);
        let atomic = if to >= from {
            self.atomic.checked_mul(10u128.checked_pow(to - from)?)?
        } else {
            let scale = 10u128.pow(from - to);
            if self.atomic % scale != 0 {
                return None;
            }
            self.atomic / scale
        };
        Some(Self::new(asset, atomic))
    }

    pub fn is_zero(&self) -> bool { self.atomic == 0 }

    pub fn same_asset(&self, other: &Balance) -> bool {
        self.asset.asset_id == other.asset.asset_id
    }

    fn check(&self, other: &Balance) -> Result<(), BalanceError> {
        if self.same_asset(other) {
            Ok(())
        } else {
            Err(BalanceError::AssetMismatch { left: self.asset.ticker.clone(), right: other.asset.ticker.clone() })
        }
    }

    pub fn add(&self, other: &Balance) -> Result<Balance, BalanceError> {
        self.check(other)?;
        let atomic = self.atomic.checked_add(other.atomic).ok_or(BalanceError::Overflow)?;
        Ok(Self::new(self.asset.clone(), atomic))
    }

    /// Subtraction floors at zero.
    pub fn sub(&self, other: &Balance) -> Result<Balance, BalanceError> {
        self.check(other)?;
        Ok(Self::new(self.asset.clone(), self.atomic.saturating_sub(other.atomic)))
    }

    pub fn gte(&self, other: &Balance) -> Result<bool, BalanceError> {
        self.check(other)?;
        Ok(self.atomic >= other.atomic)
    }

    pub fn gt(&self, other: &Balance) -> Result<bool, BalanceError> {
        self.check(other)?;
        Ok(self.atomic > other.atomic)
    }

    pub fn max(a: &Balance, b: &Balance) -> Result<Balance, BalanceError> {
        Ok(if a.gte(b)? { a.clone() } else { b.clone() })
    }

    /// What can leave the account while keeping the asset's existential deposit.
    pub fn value_over_existential_deposit(&self) -> Balance {
        Self::new(self.asset.clone(), self.atomic.saturating_sub(self.asset.existential_deposit))
    }

    /// Decimal rendering without the ticker. `rounded` truncates to a few
    /// fractional digits for compact display.
    pub fn format_amount(&self, rounded: bool) -> String {
        let unit = atomic_per_unit(&self.asset);
        let whole = self.atomic / unit;
        let frac = self.atomic % unit;
        if self.asset.decimals == 0 || frac == 0 {
            return whole.to_string();
        }
        let mut digits = format!("{:0width$}", frac, width = self.asset.decimals as usize);
        if rounded {
            digits.truncate(ROUNDED_DISPLAY_DIGITS);
        }
        let digits = digits.trim_end_matches('0');
        if digits.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{digits}")
        }
    }

    pub fn to_display_string(&self, rounded: bool) -> String {
        format!("{} {}", self.format_amount(rounded), self.asset.ticker)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string(false))
    }
}
