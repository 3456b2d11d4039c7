// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fixed-point money with a denomination tag.
//!
//! Amounts are [`Decimal`] values, so `0.1 + 0.2` is exactly `0.3`. Every
//! arithmetic or comparison operation checks that both sides share a [`Unit`];
//! moving between units goes through [`Money::convert`], which refuses to drop
//! precision below one satoshi.
//!
//! # Example
//!
//! ```
//! use btc_invoice_rs::{Money, Unit};
//!
//! let a = Money::parse("0.1", Unit::Btc).unwrap();
//! let b = Money::parse("0.2", Unit::Btc).unwrap();
//! assert_eq!(a.checked_add(&b).unwrap(), Money::parse("0.3", Unit::Btc).unwrap());
//! assert_eq!(a.to_sats().unwrap(), 10_000_000);
//! ```

use crate::InvoiceError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Satoshis in one bitcoin.
pub const SATS_PER_BTC: Decimal = dec!(100000000);

/// Denomination of a [`Money`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Whole bitcoin, 8 fractional digits down to one satoshi.
    Btc,
    /// Satoshi, the smallest settlement unit.
    Sat,
}

impl Unit {
    /// Fractional digits needed to express one satoshi in this unit.
    pub const fn satoshi_scale(self) -> u32 {
        match self {
            Unit::Btc => 8,
            Unit::Sat => 0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Btc => f.write_str("btc"),
            Unit::Sat => f.write_str("sat"),
        }
    }
}

impl FromStr for Unit {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "btc" => Ok(Unit::Btc),
            "sat" | "sats" | "satoshi" => Ok(Unit::Sat),
            other => Err(InvoiceError::Validation(format!("unknown unit '{other}'"))),
        }
    }
}

/// An amount of currency in a given [`Unit`].
///
/// `==` is numeric within a unit (`0.10 btc == 0.1 btc`) and compares the unit
/// as well, so `0.01 btc != 1000000 sat`. Use [`Money::try_eq`] or
/// [`Money::try_cmp`] where a unit mismatch must surface as
/// [`InvoiceError::UnitMismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    value: Decimal,
    unit: Unit,
}

impl Money {
    pub const fn new(value: Decimal, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub const fn zero(unit: Unit) -> Self {
        Self::new(Decimal::ZERO, unit)
    }

    pub const fn btc(value: Decimal) -> Self {
        Self::new(value, Unit::Btc)
    }

    pub fn sats(value: u64) -> Self {
        Self::new(Decimal::from(value), Unit::Sat)
    }

    /// Parses a decimal string without any binary floating-point step.
    ///
    /// # Errors
    ///
    /// [`InvoiceError::Validation`] when the string is not a decimal number or
    /// carries more digits than a [`Decimal`] can hold exactly.
    pub fn parse(input: &str, unit: Unit) -> Result<Self, InvoiceError> {
        let value = Decimal::from_str_exact(input.trim())
            .map_err(|e| InvoiceError::Validation(format!("invalid amount '{input}': {e}")))?;
        Ok(Self::new(value, unit))
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    fn same_unit(&self, other: &Money) -> Result<(), InvoiceError> {
        if self.unit == other.unit {
            Ok(())
        } else {
            Err(InvoiceError::UnitMismatch {
                left: self.unit,
                right: other.unit,
            })
        }
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, InvoiceError> {
        self.same_unit(other)?;
        let value = self
            .value
            .checked_add(other.value)
            .ok_or_else(|| InvoiceError::Validation("amount overflow".into()))?;
        Ok(Money::new(value, self.unit))
    }

    /// Subtracts `other`. The result may be negative; callers producing
    /// user-facing amounts must reject that themselves.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, InvoiceError> {
        self.same_unit(other)?;
        let value = self
            .value
            .checked_sub(other.value)
            .ok_or_else(|| InvoiceError::Validation("amount overflow".into()))?;
        Ok(Money::new(value, self.unit))
    }

    /// Returns `rate` percent of this amount, `value * (rate / 100)`.
    pub fn percent(&self, rate: Decimal) -> Result<Money, InvoiceError> {
        let value = (rate / Decimal::ONE_HUNDRED)
            .checked_mul(self.value)
            .ok_or_else(|| InvoiceError::Validation("amount overflow".into()))?;
        Ok(Money::new(value, self.unit))
    }

    pub fn try_cmp(&self, other: &Money) -> Result<Ordering, InvoiceError> {
        self.same_unit(other)?;
        Ok(self.value.cmp(&other.value))
    }

    pub fn try_eq(&self, other: &Money) -> Result<bool, InvoiceError> {
        Ok(self.try_cmp(other)? == Ordering::Equal)
    }

    /// Converts into `unit`.
    ///
    /// Satoshi to bitcoin is always exact. Any conversion whose input holds a
    /// fraction of a satoshi fails with [`InvoiceError::PrecisionLoss`] instead
    /// of truncating.
    pub fn convert(&self, unit: Unit) -> Result<Money, InvoiceError> {
        if self.has_sub_satoshi_fraction() {
            return Err(InvoiceError::PrecisionLoss {
                value: self.value,
                unit: self.unit,
            });
        }

        let value = match (self.unit, unit) {
            (Unit::Btc, Unit::Sat) => self
                .value
                .checked_mul(SATS_PER_BTC)
                .ok_or_else(|| InvoiceError::Validation("amount overflow".into()))?,
            (Unit::Sat, Unit::Btc) => self.value / SATS_PER_BTC,
            _ => self.value,
        };

        Ok(Money::new(value.normalize(), unit))
    }

    /// Whole satoshis represented by this amount.
    pub fn to_sats(&self) -> Result<u64, InvoiceError> {
        let sats = self.convert(Unit::Sat)?;
        sats.value
            .to_u64()
            .ok_or_else(|| InvoiceError::Validation(format!("{self} is not a payable amount")))
    }

    /// True when the value has digits below one satoshi.
    pub fn has_sub_satoshi_fraction(&self) -> bool {
        self.value.normalize().scale() > self.unit.satoshi_scale()
    }

    /// Sums `items`, all of which must be in `unit`.
    pub fn sum<'a, I>(items: I, unit: Unit) -> Result<Money, InvoiceError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(unit), |acc, item| acc.checked_add(item))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value.normalize(), self.unit)
    }
}
