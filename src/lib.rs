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

//! # BTC Invoice
//!
//! This library issues per-invoice Bitcoin receiving addresses, decides when an
//! invoice is settled from the unspent outputs at its address, and forwards
//! collected funds to vendors net of fees.
//!
//! ## Core Components
//!
//! - [`Money`]: Exact decimal amount tagged with a [`Unit`]
//! - [`fee()`]: Percentage fee calculator
//! - [`Invoice`]: Immutable payment request owning its [`KeyMaterial`]
//! - [`evaluate`]: Settlement evaluator producing a [`SettlementState`]
//! - [`plan`]: Disbursement planner producing [`Payout`] outputs
//! - [`InvoiceService`]: Orchestrates the above over a [`Wallet`] and an [`InvoiceStore`]
//! - [`InvoiceError`]: Error types for every failure path
//!
//! ## Example
//!
//! ```
//! use btc_invoice_rs::{evaluate, Money, SettlementState, UnspentOutput};
//! use rust_decimal_macros::dec;
//!
//! let owed = Money::btc(dec!(0.01));
//! let snapshot = [UnspentOutput::new(Money::sats(1_000_000), 2)];
//!
//! let state = evaluate(&owed, &snapshot, 3).unwrap();
//! assert!(matches!(state, SettlementState::PendingConfirmation { confirmations: 2, .. }));
//! assert_eq!(state.message(), "payment is not confirmed yet (2 < 3)");
//! ```
//!
//! ## Collaborators
//!
//! Key generation, signing, broadcast and persistence are behind the [`Wallet`]
//! and [`InvoiceStore`] traits. [`MemoryWallet`] and [`MemoryStore`] are
//! in-process implementations for tests and local runs.

mod base;
pub mod config;
pub mod disbursement;
pub mod error;
mod fee;
pub mod http;
mod invoice;
pub mod memory_wallet;
mod money;
pub mod service;
pub mod settlement;
pub mod store;
pub mod wallet;

pub use base::{Address, InvoiceId, OwnerId, TransactionId};
pub use config::{Config, Network};
pub use disbursement::{DisbursementEntry, DisbursementRequest, Payout, plan};
pub use error::InvoiceError;
pub use fee::{fee, validate_rate};
pub use invoice::{Invoice, KeyMaterial};
pub use memory_wallet::MemoryWallet;
pub use money::{Money, SATS_PER_BTC, Unit};
pub use service::InvoiceService;
pub use settlement::{SettlementState, evaluate};
pub use store::{InvoiceStore, MemoryStore};
pub use wallet::{UnspentOutput, Wallet, WalletError};
