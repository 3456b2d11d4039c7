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

//! Invoice persistence.
//!
//! [`InvoiceStore`] is the persistence collaborator: CRUD keyed by invoice id
//! and owner, plus a per-invoice spend lock that keeps withdraw, release and
//! delete on the same invoice mutually exclusive. [`MemoryStore`] is the
//! in-process implementation.

use crate::base::{InvoiceId, OwnerId};
use crate::{Invoice, InvoiceError};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Persistence collaborator for invoices.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Stores a new invoice. Fails if the id is already taken.
    async fn insert(&self, invoice: Invoice) -> Result<Arc<Invoice>, InvoiceError>;

    /// Fetches the invoice matching both `id` and `owner`. A miss is `Ok(None)`.
    async fn fetch(
        &self,
        id: &InvoiceId,
        owner: &OwnerId,
    ) -> Result<Option<Arc<Invoice>>, InvoiceError>;

    /// All invoices belonging to `owner`, ordered by id.
    async fn list(&self, owner: &OwnerId) -> Result<Vec<Arc<Invoice>>, InvoiceError>;

    /// Removes the invoice matching `id` and `owner`, returning whether it existed.
    async fn remove(&self, id: &InvoiceId, owner: &OwnerId) -> Result<bool, InvoiceError>;

    /// Takes the spend lock for `id`. Returns `false` if it is already held.
    fn try_lock(&self, id: &InvoiceId) -> bool;

    /// Releases the spend lock for `id`.
    fn unlock(&self, id: &InvoiceId);
}

/// In-memory invoice store backed by [`DashMap`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    invoices: DashMap<InvoiceId, Arc<Invoice>>,
    locks: DashMap<InvoiceId, ()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert(&self, invoice: Invoice) -> Result<Arc<Invoice>, InvoiceError> {
        match self.invoices.entry(invoice.id()) {
            Entry::Occupied(_) => Err(InvoiceError::Storage("duplicate invoice id".into())),
            Entry::Vacant(entry) => {
                let invoice = Arc::new(invoice);
                entry.insert(Arc::clone(&invoice));
                Ok(invoice)
            }
        }
    }

    async fn fetch(
        &self,
        id: &InvoiceId,
        owner: &OwnerId,
    ) -> Result<Option<Arc<Invoice>>, InvoiceError> {
        Ok(self
            .invoices
            .get(id)
            .filter(|invoice| invoice.is_owned_by(owner))
            .map(|invoice| Arc::clone(invoice.value())))
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Arc<Invoice>>, InvoiceError> {
        let mut invoices: Vec<Arc<Invoice>> = self
            .invoices
            .iter()
            .filter(|entry| entry.value().is_owned_by(owner))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        invoices.sort_by_key(|invoice| invoice.id());
        Ok(invoices)
    }

    async fn remove(&self, id: &InvoiceId, owner: &OwnerId) -> Result<bool, InvoiceError> {
        Ok(self
            .invoices
            .remove_if(id, |_, invoice| invoice.is_owned_by(owner))
            .is_some())
    }

    fn try_lock(&self, id: &InvoiceId) -> bool {
        match self.locks.entry(*id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(());
                true
            }
        }
    }

    fn unlock(&self, id: &InvoiceId) {
        self.locks.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Address;
    use crate::{KeyMaterial, Money};
    use rust_decimal_macros::dec;

    fn invoice_for(owner: &str) -> Invoice {
        Invoice::new(
            OwnerId::from(owner),
            Money::btc(dec!(0.01)),
            Address::from("tb1qreceive"),
            KeyMaterial::new("secret"),
        )
    }

    #[tokio::test]
    async fn fetch_requires_matching_owner() {
        let store = MemoryStore::new();
        let stored = store.insert(invoice_for("alice")).await.unwrap();

        let hit = store.fetch(&stored.id(), &OwnerId::from("alice")).await.unwrap();
        assert_eq!(hit.map(|i| i.id()), Some(stored.id()));

        let miss = store.fetch(&stored.id(), &OwnerId::from("bob")).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn remove_requires_matching_owner() {
        let store = MemoryStore::new();
        let stored = store.insert(invoice_for("alice")).await.unwrap();

        assert!(!store.remove(&stored.id(), &OwnerId::from("bob")).await.unwrap());
        assert_eq!(store.len(), 1);
        assert!(store.remove(&stored.id(), &OwnerId::from("alice")).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn list_is_scoped_and_sorted() {
        let store = MemoryStore::new();
        for _ in 0..5 {
            store.insert(invoice_for("alice")).await.unwrap();
        }
        store.insert(invoice_for("bob")).await.unwrap();

        let listed = store.list(&OwnerId::from("alice")).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed.windows(2).all(|pair| pair[0].id() < pair[1].id()));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = MemoryStore::new();
        let first = store.insert(invoice_for("alice")).await.unwrap();
        let clash = Invoice::from_parts(
            first.id(),
            OwnerId::from("alice"),
            Money::btc(dec!(1)),
            Address::from("tb1qother"),
            KeyMaterial::new("other"),
        );
        assert!(matches!(
            store.insert(clash).await,
            Err(InvoiceError::Storage(_))
        ));
    }

    #[test]
    fn spend_lock_is_exclusive() {
        let store = MemoryStore::new();
        let id = InvoiceId::new_v4();
        assert!(store.try_lock(&id));
        assert!(!store.try_lock(&id));
        store.unlock(&id);
        assert!(store.try_lock(&id));
    }
}
