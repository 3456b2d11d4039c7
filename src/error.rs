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

//! Error types for invoice settlement and disbursement.

use crate::base::Address;
use crate::money::Unit;
use crate::wallet::WalletError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Invoice processing errors.
///
/// Domain errors ([`UnitMismatch`](Self::UnitMismatch), [`InvalidRate`](Self::InvalidRate),
/// [`NegativeNetAmount`](Self::NegativeNetAmount), [`PrecisionLoss`](Self::PrecisionLoss),
/// [`Validation`](Self::Validation)) are always raised before the wallet is contacted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    /// No invoice matches the id and owner
    #[error("invoice not found")]
    NotFound,

    /// Malformed request input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Two amounts with different units were combined or compared
    #[error("unit mismatch ({left} vs {right})")]
    UnitMismatch { left: Unit, right: Unit },

    /// Fee rate outside `[0, 100)`
    #[error("invalid fee rate {0} (must be in [0, 100))")]
    InvalidRate(Decimal),

    /// Fee exceeds the payout amount
    #[error("negative net amount {net} for {vendor}")]
    NegativeNetAmount { vendor: Address, net: Decimal },

    /// Converting would drop precision below one satoshi
    #[error("{value} {unit} cannot be represented in whole satoshis")]
    PrecisionLoss { value: Decimal, unit: Unit },

    /// Another withdraw, release or delete holds the invoice
    #[error("another operation is in progress for this invoice")]
    SpendInProgress,

    /// The persistence store failed
    #[error("storage error: {0}")]
    Storage(String),

    /// The wallet collaborator failed
    #[error("wallet error: {0}")]
    Wallet(String),

    /// The wallet collaborator did not answer in time
    #[error("wallet request timed out")]
    WalletTimeout,
}

impl From<WalletError> for InvoiceError {
    fn from(err: WalletError) -> Self {
        InvoiceError::Wallet(err.to_string())
    }
}
