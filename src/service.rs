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

//! Invoice service.
//!
//! [`InvoiceService`] composes the invoice record, settlement evaluator and
//! disbursement planner with the [`Wallet`] and [`InvoiceStore`] collaborators.
//!
//! # Failure ordering
//!
//! Every operation validates its input and runs the planner before talking to
//! the wallet, so domain errors never leave partial wallet side effects. Wallet
//! calls are bounded by [`Config::wallet_timeout`] and are never retried.
//!
//! # Concurrency
//!
//! Operations are independent and may run concurrently. Withdraw, release and
//! delete on the same invoice take the store's spend lock and fail with
//! [`InvoiceError::SpendInProgress`] instead of racing each other.

use crate::base::{Address, InvoiceId, OwnerId, TransactionId};
use crate::disbursement::{DisbursementRequest, Payout, plan};
use crate::settlement::{SettlementState, evaluate};
use crate::store::InvoiceStore;
use crate::wallet::{Wallet, WalletError};
use crate::{Config, Invoice, InvoiceError, Money, Unit};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Holds an invoice's spend lock until dropped.
struct SpendGuard<'a, S: InvoiceStore> {
    store: &'a S,
    id: InvoiceId,
}

impl<S: InvoiceStore> Drop for SpendGuard<'_, S> {
    fn drop(&mut self) {
        self.store.unlock(&self.id);
    }
}

/// Invoice lifecycle and settlement operations, scoped by owner.
pub struct InvoiceService<W, S> {
    wallet: W,
    store: S,
    config: Config,
}

impl<W: Wallet, S: InvoiceStore> InvoiceService<W, S> {
    pub fn new(wallet: W, store: S, config: Config) -> Self {
        Self {
            wallet,
            store,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an invoice owing `amount` at a freshly generated address.
    ///
    /// `amount` may be given in any unit and is stored in BTC.
    ///
    /// # Errors
    ///
    /// - [`InvoiceError::Validation`] - Amount is not positive or has sub-satoshi digits.
    /// - [`InvoiceError::Wallet`] / [`InvoiceError::WalletTimeout`] - Key generation failed.
    pub async fn create(
        &self,
        owner: OwnerId,
        amount: Money,
    ) -> Result<Arc<Invoice>, InvoiceError> {
        if amount.is_negative() || amount.is_zero() {
            return Err(InvoiceError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        let amount = amount.convert(Unit::Btc).map_err(|_| {
            InvoiceError::Validation(format!("amount {amount} is finer than one satoshi"))
        })?;

        let (address, key) = self
            .call_wallet("generate_key", self.wallet.generate_key())
            .await?;
        let invoice = self
            .store
            .insert(Invoice::new(owner, amount, address, key))
            .await?;

        info!(
            invoice_id = %invoice.id(),
            owner = %invoice.owner(),
            amount = %invoice.amount(),
            address = %invoice.address(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// All invoices belonging to `owner`.
    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<Arc<Invoice>>, InvoiceError> {
        self.store.list(owner).await
    }

    pub async fn details(
        &self,
        id: &InvoiceId,
        owner: &OwnerId,
    ) -> Result<Arc<Invoice>, InvoiceError> {
        self.store
            .fetch(id, owner)
            .await?
            .ok_or(InvoiceError::NotFound)
    }

    /// Destroys an invoice. Refused while a withdraw or release is in flight.
    pub async fn delete(&self, id: &InvoiceId, owner: &OwnerId) -> Result<(), InvoiceError> {
        let (_guard, _invoice) = self.claim(id, owner).await?;

        if !self.store.remove(id, owner).await? {
            return Err(InvoiceError::NotFound);
        }
        info!(invoice_id = %id, owner = %owner, "Invoice deleted");
        Ok(())
    }

    /// Sum of all unspent outputs at the invoice address, in BTC.
    pub async fn balance(&self, id: &InvoiceId, owner: &OwnerId) -> Result<Money, InvoiceError> {
        let invoice = self.details(id, owner).await?;
        let outputs = self
            .call_wallet(
                "unspent_outputs",
                self.wallet.unspent_outputs(invoice.address()),
            )
            .await?;

        let amounts = outputs
            .iter()
            .map(|output| output.amount.convert(Unit::Btc))
            .collect::<Result<Vec<Money>, InvoiceError>>()?;
        Money::sum(&amounts, Unit::Btc)
    }

    /// Evaluates settlement against a fresh snapshot of the invoice address.
    pub async fn check(
        &self,
        id: &InvoiceId,
        owner: &OwnerId,
    ) -> Result<SettlementState, InvoiceError> {
        let invoice = self.details(id, owner).await?;
        let outputs = self
            .call_wallet(
                "unspent_outputs",
                self.wallet.unspent_outputs(invoice.address()),
            )
            .await?;

        let state = evaluate(&invoice.amount(), &outputs, self.config.confirmations)?;
        debug!(invoice_id = %id, outputs = outputs.len(), outcome = %state.message(), "Settlement evaluated");
        Ok(state)
    }

    /// Sweeps everything at the invoice address to `destination`.
    pub async fn withdraw(
        &self,
        id: &InvoiceId,
        owner: &OwnerId,
        destination: &Address,
    ) -> Result<TransactionId, InvoiceError> {
        self.config.network.validate_address(destination)?;
        let (_guard, invoice) = self.claim(id, owner).await?;

        let txid = self
            .call_wallet(
                "sweep",
                self.wallet.sweep(invoice.key_material(), destination),
            )
            .await?;

        info!(invoice_id = %id, destination = %destination, txid = %txid, "Invoice funds withdrawn");
        Ok(txid)
    }

    /// Pays vendors from the invoice address, net of their fees.
    ///
    /// # Errors
    ///
    /// - [`InvoiceError::NotFound`] - No invoice matches `id` and `owner`.
    /// - [`InvoiceError::Validation`] - No vendors, a malformed vendor address or a zero payout.
    /// - [`InvoiceError::InvalidRate`] / [`InvoiceError::NegativeNetAmount`] - From the planner.
    /// - [`InvoiceError::PrecisionLoss`] - A net amount is not a whole number of satoshis.
    /// - [`InvoiceError::Wallet`] / [`InvoiceError::WalletTimeout`] - Broadcast failed.
    pub async fn release(
        &self,
        id: &InvoiceId,
        owner: &OwnerId,
        request: &DisbursementRequest,
    ) -> Result<TransactionId, InvoiceError> {
        self.details(id, owner).await?;
        let payouts = self.prepare_payouts(request)?;
        let (_guard, invoice) = self.claim(id, owner).await?;

        let txid = self
            .call_wallet(
                "broadcast",
                self.wallet.broadcast(invoice.key_material(), &payouts),
            )
            .await?;

        info!(invoice_id = %id, vendors = payouts.len(), txid = %txid, "Invoice funds released");
        Ok(txid)
    }

    /// Validates a disbursement request and turns it into broadcastable outputs.
    fn prepare_payouts(&self, request: &DisbursementRequest) -> Result<Vec<Payout>, InvoiceError> {
        if request.is_empty() {
            return Err(InvoiceError::Validation("no vendors to pay".into()));
        }
        for entry in request.entries() {
            self.config.network.validate_address(&entry.vendor)?;
        }

        let payouts = plan(request)?;
        for payout in &payouts {
            if payout.amount.to_sats()? == 0 {
                return Err(InvoiceError::Validation(format!(
                    "net amount for {} is zero",
                    payout.destination
                )));
            }
        }
        Ok(payouts)
    }

    /// Takes the spend lock and re-reads the invoice under it, so a delete that
    /// committed before the lock was taken surfaces as `NotFound`.
    async fn claim(
        &self,
        id: &InvoiceId,
        owner: &OwnerId,
    ) -> Result<(SpendGuard<'_, S>, Arc<Invoice>), InvoiceError> {
        // Foreign callers never take the lock.
        self.details(id, owner).await?;

        if !self.store.try_lock(id) {
            warn!(invoice_id = %id, "Concurrent operation rejected");
            return Err(InvoiceError::SpendInProgress);
        }
        let guard = SpendGuard {
            store: &self.store,
            id: *id,
        };

        let invoice = self.details(id, owner).await?;
        Ok((guard, invoice))
    }

    async fn call_wallet<T, F>(&self, operation: &'static str, call: F) -> Result<T, InvoiceError>
    where
        F: Future<Output = Result<T, WalletError>>,
    {
        match tokio::time::timeout(self.config.wallet_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Wallet call failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.wallet_timeout.as_millis() as u64,
                    "Wallet call timed out"
                );
                Err(InvoiceError::WalletTimeout)
            }
        }
    }
}
