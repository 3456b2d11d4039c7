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

//! Simulated wallet for tests, demos and regtest-style runs.
//!
//! [`MemoryWallet`] keeps its own ledger of unspent outputs per address and
//! settles broadcasts instantly. It issues random opaque identifiers instead of
//! real keys and never touches the network. Outputs are tracked in satoshis,
//! as a chain backend would report them.

use crate::base::{Address, TransactionId};
use crate::config::Network;
use crate::disbursement::Payout;
use crate::wallet::{UnspentOutput, Wallet, WalletError};
use crate::{KeyMaterial, Money};
use async_trait::async_trait;
use bitcoin::{WitnessProgram, WitnessVersion};
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// A transaction the wallet has "broadcast".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub txid: TransactionId,
    pub source: Address,
    /// Destination and satoshi amount of each output, change excluded.
    pub outputs: Vec<(Address, u64)>,
}

#[derive(Debug, Default)]
struct Ledger {
    /// Secret to the address it controls.
    keys: HashMap<String, Address>,
    utxos: HashMap<Address, Vec<UnspentOutput>>,
}

impl Ledger {
    fn address_for(&self, key: &KeyMaterial) -> Result<Address, WalletError> {
        self.keys
            .get(key.expose_secret())
            .cloned()
            .ok_or(WalletError::UnknownKey)
    }

    fn balance_sats(&self, address: &Address) -> Result<u64, WalletError> {
        self.utxos
            .get(address)
            .into_iter()
            .flatten()
            .try_fold(0u64, |acc, utxo| {
                let sats = utxo
                    .amount
                    .to_sats()
                    .map_err(|e| WalletError::Backend(e.to_string()))?;
                acc.checked_add(sats)
                    .ok_or_else(|| WalletError::Backend("balance overflow".into()))
            })
    }

    fn credit(&mut self, address: &Address, sats: u64, confirmations: u32) {
        self.utxos
            .entry(address.clone())
            .or_default()
            .push(UnspentOutput::new(Money::sats(sats), confirmations));
    }
}

/// In-memory [`Wallet`] implementation.
#[derive(Debug)]
pub struct MemoryWallet {
    network: Network,
    ledger: Mutex<Ledger>,
    /// Every broadcast in submission order.
    broadcasts: SegQueue<Broadcast>,
    latency: Mutex<Duration>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryWallet {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ledger: Mutex::new(Ledger::default()),
            broadcasts: SegQueue::new(),
            latency: Mutex::new(Duration::ZERO),
            offline: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Adds an unspent output of `amount` at `address`.
    ///
    /// # Errors
    ///
    /// [`WalletError::Backend`] if `amount` is negative or not a whole number
    /// of satoshis.
    pub fn fund(
        &self,
        address: &Address,
        amount: Money,
        confirmations: u32,
    ) -> Result<(), WalletError> {
        let sats = amount
            .to_sats()
            .map_err(|e| WalletError::Backend(e.to_string()))?;
        self.ledger.lock().credit(address, sats, confirmations);
        Ok(())
    }

    /// Adds `blocks` confirmations to every output in the ledger.
    pub fn mine(&self, blocks: u32) {
        let mut ledger = self.ledger.lock();
        for utxo in ledger.utxos.values_mut().flatten() {
            utxo.confirmations = utxo.confirmations.saturating_add(blocks);
        }
    }

    /// Drains the broadcast log.
    pub fn take_broadcasts(&self) -> Vec<Broadcast> {
        std::iter::from_fn(|| self.broadcasts.pop()).collect()
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Makes every subsequent call fail with a backend error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of wallet calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), WalletError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(WalletError::Backend("wallet backend offline".into()));
        }
        Ok(())
    }

    /// A random P2WSH address on the wallet's network.
    fn fresh_address(&self) -> Result<Address, WalletError> {
        let mut program = [0u8; 32];
        program[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        program[16..].copy_from_slice(Uuid::new_v4().as_bytes());
        let program = WitnessProgram::new(WitnessVersion::V0, &program)
            .map_err(|e| WalletError::Backend(e.to_string()))?;
        let address = bitcoin::Address::from_witness_program(program, self.network.to_bitcoin());
        Ok(Address(address.to_string()))
    }

    fn new_txid() -> TransactionId {
        TransactionId(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }

    /// Spends every output controlled by `key`, pays the outputs built from the
    /// available balance and returns any change to the source unconfirmed.
    fn spend<F>(&self, key: &KeyMaterial, build: F) -> Result<TransactionId, WalletError>
    where
        F: FnOnce(u64) -> Vec<(Address, u64)>,
    {
        let mut ledger = self.ledger.lock();
        let source = ledger.address_for(key)?;
        let available = ledger.balance_sats(&source)?;
        if available == 0 {
            return Err(WalletError::NoSpendableOutputs);
        }

        let outputs = build(available);
        let required = outputs
            .iter()
            .try_fold(0u64, |acc, (_, sats)| acc.checked_add(*sats))
            .ok_or_else(|| WalletError::Backend("output total overflow".into()))?;
        if required > available {
            return Err(WalletError::InsufficientFunds {
                available: Money::sats(available),
                required: Money::sats(required),
            });
        }

        ledger.utxos.remove(&source);
        for (destination, sats) in &outputs {
            ledger.credit(destination, *sats, 0);
        }
        let change = available - required;
        if change > 0 {
            ledger.credit(&source, change, 0);
        }

        let txid = Self::new_txid();
        self.broadcasts.push(Broadcast {
            txid: txid.clone(),
            source,
            outputs,
        });
        Ok(txid)
    }
}

#[async_trait]
impl Wallet for MemoryWallet {
    async fn generate_key(&self) -> Result<(Address, KeyMaterial), WalletError> {
        self.enter().await?;
        let secret = format!("mem{}", Uuid::new_v4().simple());
        let address = self.fresh_address()?;
        self.ledger
            .lock()
            .keys
            .insert(secret.clone(), address.clone());
        Ok((address, KeyMaterial::new(secret)))
    }

    async fn unspent_outputs(&self, address: &Address) -> Result<Vec<UnspentOutput>, WalletError> {
        self.enter().await?;
        Ok(self
            .ledger
            .lock()
            .utxos
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn broadcast(
        &self,
        key: &KeyMaterial,
        outputs: &[Payout],
    ) -> Result<TransactionId, WalletError> {
        self.enter().await?;
        let outputs = outputs
            .iter()
            .map(|payout| {
                let sats = payout
                    .amount
                    .to_sats()
                    .map_err(|e| WalletError::Backend(e.to_string()))?;
                Ok((payout.destination.clone(), sats))
            })
            .collect::<Result<Vec<_>, WalletError>>()?;
        self.spend(key, |_| outputs)
    }

    async fn sweep(
        &self,
        key: &KeyMaterial,
        destination: &Address,
    ) -> Result<TransactionId, WalletError> {
        self.enter().await?;
        self.spend(key, |available| vec![(destination.clone(), available)])
    }
}
