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

//! Invoice records.
//!
//! An [`Invoice`] is immutable once created: its amount, receiving address and
//! key material are fixed at creation and only ever read afterwards. The key
//! material is kept out of every serialized view.
//!
//! # Example
//!
//! ```
//! use btc_invoice_rs::{Address, Invoice, KeyMaterial, Money, OwnerId};
//! use rust_decimal_macros::dec;
//!
//! let invoice = Invoice::new(
//!     OwnerId::from("alice"),
//!     Money::btc(dec!(0.01)),
//!     Address::from("tb1qreceive"),
//!     KeyMaterial::new("secret"),
//! );
//! let json = serde_json::to_string(&invoice).unwrap();
//! assert!(!json.contains("secret"));
//! ```

use crate::Money;
use crate::base::{Address, InvoiceId, OwnerId};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

/// Secret needed to spend funds received at an invoice address.
///
/// Not `Clone` and not serializable: it lives inside exactly one [`Invoice`]
/// and is only lent to the wallet for sweep or broadcast calls.
pub struct KeyMaterial(String);

impl KeyMaterial {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, for wallet implementations only.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// A payment request with a fixed owed amount and a dedicated receiving address.
#[derive(Debug)]
pub struct Invoice {
    id: InvoiceId,
    owner: OwnerId,
    amount: Money,
    address: Address,
    key: KeyMaterial,
}

impl Invoice {
    /// Creates an invoice with a fresh id.
    pub fn new(owner: OwnerId, amount: Money, address: Address, key: KeyMaterial) -> Self {
        Self::from_parts(InvoiceId::new_v4(), owner, amount, address, key)
    }

    /// Rebuilds an invoice from stored fields.
    pub fn from_parts(
        id: InvoiceId,
        owner: OwnerId,
        amount: Money,
        address: Address,
        key: KeyMaterial,
    ) -> Self {
        Self {
            id,
            owner,
            amount,
            address,
            key,
        }
    }

    pub fn id(&self) -> InvoiceId {
        self.id
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn key_material(&self) -> &KeyMaterial {
        &self.key
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner == owner
    }
}

impl Serialize for Invoice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Invoice", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("owner", &self.owner)?;
        state.serialize_field("amount", &self.amount)?;
        state.serialize_field("address", &self.address)?;
        state.end()
    }
}
