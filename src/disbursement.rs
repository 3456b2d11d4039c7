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

//! Disbursement planning.
//!
//! A [`DisbursementRequest`] maps each vendor address to a gross amount and a
//! fee rate. [`plan`] turns it into the [`Payout`] outputs of a single payout
//! transaction, in the order vendors were added, without moving any funds.
//!
//! # Example
//!
//! ```
//! use btc_invoice_rs::{plan, Address, DisbursementRequest, Money};
//! use rust_decimal_macros::dec;
//!
//! let mut request = DisbursementRequest::new();
//! request.push(Address::from("vendorA"), Money::btc(dec!(1.00)), dec!(2)).unwrap();
//!
//! let payouts = plan(&request).unwrap();
//! assert_eq!(payouts[0].amount, Money::btc(dec!(0.98)));
//! ```

use crate::base::Address;
use crate::{InvoiceError, Money, Unit, fee};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One vendor's share before fees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisbursementEntry {
    pub vendor: Address,
    pub amount: Money,
    /// Percentage kept as fee, expected in `[0, 100)`.
    pub fee_rate: Decimal,
}

/// Vendor payouts requested for one invoice, in insertion order.
///
/// Deserializes from a JSON object whose keys are vendor addresses and whose
/// values carry a BTC `amount` and a percentage `fee`, as decimal strings or
/// JSON numbers:
///
/// ```json
/// {"tb1q...": {"amount": "1.00", "fee": "2"}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisbursementRequest {
    entries: Vec<DisbursementEntry>,
}

impl DisbursementRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a vendor.
    ///
    /// # Errors
    ///
    /// [`InvoiceError::Validation`] if `vendor` is already present.
    pub fn push(
        &mut self,
        vendor: Address,
        amount: Money,
        fee_rate: Decimal,
    ) -> Result<(), InvoiceError> {
        if self.entries.iter().any(|entry| entry.vendor == vendor) {
            return Err(InvoiceError::Validation(format!("duplicate vendor {vendor}")));
        }
        self.entries.push(DisbursementEntry {
            vendor,
            amount,
            fee_rate,
        });
        Ok(())
    }

    pub fn entries(&self) -> &[DisbursementEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Amounts and rates may be JSON strings or numbers; numbers keep their
/// literal digits.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawShare {
    #[serde(deserialize_with = "rust_decimal::serde::arbitrary_precision::deserialize")]
    amount: Decimal,
    #[serde(deserialize_with = "rust_decimal::serde::arbitrary_precision::deserialize")]
    fee: Decimal,
}

struct RequestVisitor;

impl<'de> Visitor<'de> for RequestVisitor {
    type Value = DisbursementRequest;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of vendor address to {amount, fee}")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut request = DisbursementRequest::new();
        while let Some((vendor, share)) = map.next_entry::<Address, RawShare>()? {
            request
                .push(vendor, Money::btc(share.amount), share.fee)
                .map_err(de::Error::custom)?;
        }
        Ok(request)
    }
}

impl<'de> Deserialize<'de> for DisbursementRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RequestVisitor)
    }
}

/// A single output of a payout transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub destination: Address,
    /// Net amount sent to `destination`.
    pub amount: Money,
    /// Fee withheld from the gross amount.
    pub fee: Money,
}

impl Payout {
    /// Total net amount across `payouts`, in `unit`.
    pub fn total(payouts: &[Payout], unit: Unit) -> Result<Money, InvoiceError> {
        Money::sum(payouts.iter().map(|payout| &payout.amount), unit)
    }
}

/// Computes `net = amount - fee(amount, fee_rate)` for every vendor.
///
/// Output order matches the request's insertion order.
///
/// # Errors
///
/// - [`InvoiceError::InvalidRate`] - A fee rate lies outside `[0, 100)`.
/// - [`InvoiceError::NegativeNetAmount`] - A vendor would receive less than zero.
pub fn plan(request: &DisbursementRequest) -> Result<Vec<Payout>, InvoiceError> {
    request
        .entries()
        .iter()
        .map(|entry| {
            let withheld = fee(&entry.amount, entry.fee_rate)?;
            let net = entry.amount.checked_sub(&withheld)?;
            if net.is_negative() {
                return Err(InvoiceError::NegativeNetAmount {
                    vendor: entry.vendor.clone(),
                    net: net.value(),
                });
            }
            Ok(Payout {
                destination: entry.vendor.clone(),
                amount: net,
                fee: withheld,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn two_percent_fee() {
        let mut request = DisbursementRequest::new();
        request
            .push(Address::from("vendorA"), Money::btc(dec!(1.00)), dec!(2))
            .unwrap();

        let payouts = plan(&request).unwrap();
        assert_eq!(
            payouts,
            vec![Payout {
                destination: Address::from("vendorA"),
                amount: Money::btc(dec!(0.98)),
                fee: Money::btc(dec!(0.02)),
            }]
        );
    }

    #[test]
    fn invalid_rate_fails_whole_plan() {
        let mut request = DisbursementRequest::new();
        request
            .push(Address::from("vendorA"), Money::btc(dec!(1)), dec!(1))
            .unwrap();
        request
            .push(Address::from("vendorB"), Money::btc(dec!(1)), dec!(150))
            .unwrap();

        assert_eq!(plan(&request), Err(InvoiceError::InvalidRate(dec!(150))));
    }

    #[test]
    fn negative_gross_amount_is_caught() {
        let mut request = DisbursementRequest::new();
        request
            .push(Address::from("vendorA"), Money::btc(dec!(-0.5)), dec!(0))
            .unwrap();

        assert_eq!(
            plan(&request),
            Err(InvoiceError::NegativeNetAmount {
                vendor: Address::from("vendorA"),
                net: dec!(-0.5),
            })
        );
    }

    #[test]
    fn duplicate_vendor_rejected() {
        let mut request = DisbursementRequest::new();
        request
            .push(Address::from("vendorA"), Money::btc(dec!(1)), dec!(1))
            .unwrap();
        let err = request
            .push(Address::from("vendorA"), Money::btc(dec!(2)), dec!(1))
            .unwrap_err();
        assert!(matches!(err, InvoiceError::Validation(_)));
        assert_eq!(request.len(), 1);
    }

    #[test]
    fn deserializes_in_document_order() {
        let json = r#"{
            "vendorC": {"amount": "0.3", "fee": "1"},
            "vendorA": {"amount": "0.1", "fee": "0"},
            "vendorB": {"amount": "0.2", "fee": "2.5"}
        }"#;
        let request: DisbursementRequest = serde_json::from_str(json).unwrap();
        let vendors: Vec<&str> = request.entries().iter().map(|e| e.vendor.as_str()).collect();
        assert_eq!(vendors, ["vendorC", "vendorA", "vendorB"]);
        assert_eq!(request.entries()[2].fee_rate, dec!(2.5));
        assert_eq!(request.entries()[0].amount, Money::btc(dec!(0.3)));
    }

    #[test]
    fn deserializes_json_numbers_exactly() {
        let json = r#"{
            "vendorA": {"amount": 1.00, "fee": 2},
            "vendorB": {"amount": 0.123456789012345678, "fee": "0.5"}
        }"#;
        let request: DisbursementRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.entries()[0].amount.value().to_string(), "1.00");
        assert_eq!(request.entries()[0].fee_rate, dec!(2));
        assert_eq!(
            request.entries()[1].amount.value().to_string(),
            "0.123456789012345678"
        );
        assert_eq!(request.entries()[1].fee_rate, dec!(0.5));
        assert_eq!(plan(&request).unwrap()[0].amount, Money::btc(dec!(0.98)));
    }

    #[test]
    fn deserialize_rejects_duplicate_keys() {
        let json = r#"{"v": {"amount": "1", "fee": "1"}, "v": {"amount": "2", "fee": "1"}}"#;
        let err = serde_json::from_str::<DisbursementRequest>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate vendor v"));
    }

    #[test]
    fn total_sums_net_amounts() {
        let mut request = DisbursementRequest::new();
        request
            .push(Address::from("a"), Money::btc(dec!(1)), dec!(10))
            .unwrap();
        request
            .push(Address::from("b"), Money::btc(dec!(0.5)), dec!(0))
            .unwrap();
        let payouts = plan(&request).unwrap();
        assert_eq!(
            Payout::total(&payouts, Unit::Btc).unwrap(),
            Money::btc(dec!(1.4))
        );
    }
}
