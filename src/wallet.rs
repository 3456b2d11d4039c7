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

//! Wallet collaborator interface.
//!
//! Key generation, UTXO lookup, signing and broadcast all live behind the
//! [`Wallet`] trait. The service never touches a private key directly; it lends
//! an invoice's [`KeyMaterial`] to [`Wallet::broadcast`] or [`Wallet::sweep`].

use crate::base::{Address, TransactionId};
use crate::disbursement::Payout;
use crate::{KeyMaterial, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An amount received at an address and not yet spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub amount: Money,
    pub confirmations: u32,
}

impl UnspentOutput {
    pub fn new(amount: Money, confirmations: u32) -> Self {
        Self {
            amount,
            confirmations,
        }
    }
}

/// Failures reported by a wallet backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Backend-specific failure, already reduced to a short description
    #[error("{0}")]
    Backend(String),

    /// The address holds nothing to spend
    #[error("no spendable outputs")]
    NoSpendableOutputs,

    /// Requested outputs exceed the spendable balance
    #[error("insufficient funds ({available} available, {required} required)")]
    InsufficientFunds { available: Money, required: Money },

    /// The key material is not known to this wallet
    #[error("unknown key")]
    UnknownKey,
}

/// Wallet and key provider.
///
/// Implementations target a single network, chosen when they are built.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Generates fresh key material and the receiving address derived from it.
    async fn generate_key(&self) -> Result<(Address, KeyMaterial), WalletError>;

    /// Current unspent outputs at `address`, in no particular order.
    async fn unspent_outputs(&self, address: &Address) -> Result<Vec<UnspentOutput>, WalletError>;

    /// Signs and broadcasts a transaction paying `outputs` from the funds
    /// controlled by `key`. Any leftover returns to the key's own address.
    async fn broadcast(
        &self,
        key: &KeyMaterial,
        outputs: &[Payout],
    ) -> Result<TransactionId, WalletError>;

    /// Sends everything controlled by `key` to `destination`.
    async fn sweep(
        &self,
        key: &KeyMaterial,
        destination: &Address,
    ) -> Result<TransactionId, WalletError>;
}
