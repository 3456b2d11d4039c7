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

//! Percentage fee calculation.

use crate::{InvoiceError, Money};
use rust_decimal::Decimal;

/// Checks that `rate` is a percentage in `[0, 100)`.
pub fn validate_rate(rate: Decimal) -> Result<(), InvoiceError> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE_HUNDRED {
        return Err(InvoiceError::InvalidRate(rate));
    }
    Ok(())
}

/// Computes `amount * (rate / 100)` in exact decimal arithmetic.
///
/// The result keeps the unit of `amount`.
///
/// # Errors
///
/// [`InvoiceError::InvalidRate`] if `rate` is negative or at least 100.
///
/// # Example
///
/// ```
/// use btc_invoice_rs::{fee, Money};
/// use rust_decimal_macros::dec;
///
/// let charged = fee(&Money::btc(dec!(1.00)), dec!(2)).unwrap();
/// assert_eq!(charged, Money::btc(dec!(0.02)));
/// ```
pub fn fee(amount: &Money, rate: Decimal) -> Result<Money, InvoiceError> {
    validate_rate(rate)?;
    amount.percent(rate)
}
