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

//! Worked examples for money arithmetic, fees, planning and settlement.

use btc_invoice_rs::{
    Address, DisbursementRequest, InvoiceError, Money, Payout, SettlementState, Unit,
    UnspentOutput, evaluate, fee, plan,
};
use rust_decimal_macros::dec;

// === Money ===

#[test]
fn decimal_addition_is_exact() {
    let a = Money::parse("0.1", Unit::Btc).unwrap();
    let b = Money::parse("0.2", Unit::Btc).unwrap();
    assert_eq!(a.checked_add(&b).unwrap(), Money::parse("0.3", Unit::Btc).unwrap());
}

#[test]
fn mixed_units_need_explicit_conversion() {
    let btc = Money::btc(dec!(0.01));
    let sats = Money::sats(1_000_000);

    assert_eq!(
        btc.checked_add(&sats),
        Err(InvoiceError::UnitMismatch {
            left: Unit::Btc,
            right: Unit::Sat,
        })
    );
    assert_eq!(sats.convert(Unit::Btc).unwrap(), btc);
}

#[test]
fn conversion_never_truncates_below_a_satoshi() {
    let dust = Money::btc(dec!(0.000000015));
    assert_eq!(
        dust.convert(Unit::Sat),
        Err(InvoiceError::PrecisionLoss {
            value: dec!(0.000000015),
            unit: Unit::Btc,
        })
    );
}

// === Fees and planning ===

#[test]
fn two_percent_fee_on_one_btc() {
    assert_eq!(
        fee(&Money::btc(dec!(1.00)), dec!(2)).unwrap(),
        Money::btc(dec!(0.02))
    );
}

#[test]
fn single_vendor_plan() {
    let mut request = DisbursementRequest::new();
    request
        .push(Address::from("vendorA"), Money::btc(dec!(1.00)), dec!(2))
        .unwrap();

    let payouts = plan(&request).unwrap();
    let paid: Vec<(Address, Money)> = payouts
        .iter()
        .map(|payout| (payout.destination.clone(), payout.amount))
        .collect();
    assert_eq!(paid, vec![(Address::from("vendorA"), Money::btc(dec!(0.98)))]);
}

#[test]
fn rate_of_150_is_invalid() {
    let mut request = DisbursementRequest::new();
    request
        .push(Address::from("vendorA"), Money::btc(dec!(1.00)), dec!(150))
        .unwrap();
    assert_eq!(plan(&request), Err(InvoiceError::InvalidRate(dec!(150))));
}

#[test]
fn rate_of_exactly_100_is_invalid() {
    assert_eq!(
        fee(&Money::btc(dec!(1)), dec!(100)),
        Err(InvoiceError::InvalidRate(dec!(100)))
    );
}

#[test]
fn plan_totals() {
    let request: DisbursementRequest = serde_json::from_str(
        r#"{
            "vendorA": {"amount": "1.00", "fee": "2"},
            "vendorB": {"amount": "0.50", "fee": "10"}
        }"#,
    )
    .unwrap();

    let payouts = plan(&request).unwrap();
    assert_eq!(
        Payout::total(&payouts, Unit::Btc).unwrap(),
        Money::btc(dec!(1.43))
    );
}

// === Settlement ===

#[test]
fn empty_snapshot_is_unpaid() {
    let state = evaluate(&Money::btc(dec!(0.01)), &[], 1).unwrap();
    assert_eq!(state.message(), "amount not paid");
    assert!(!state.is_settled());
}

#[test]
fn half_payment_is_underpaid() {
    let outputs = [UnspentOutput::new(Money::btc(dec!(0.005)), 6)];
    let state = evaluate(&Money::btc(dec!(0.01)), &outputs, 1).unwrap();

    assert_eq!(
        state,
        SettlementState::Underpaid {
            received: Money::btc(dec!(0.005)),
            required: Money::btc(dec!(0.01)),
            deficit: Money::btc(dec!(0.005)),
        }
    );
    assert_eq!(state.message(), "paid amount is less (0.005 btc < 0.01 btc)");
}

#[test]
fn full_payment_short_of_confirmations_is_pending() {
    let outputs = [UnspentOutput::new(Money::btc(dec!(0.01)), 2)];
    let state = evaluate(&Money::btc(dec!(0.01)), &outputs, 3).unwrap();

    assert_eq!(
        state,
        SettlementState::PendingConfirmation {
            received: Money::btc(dec!(0.01)),
            required: Money::btc(dec!(0.01)),
            confirmations: 2,
            required_confirmations: 3,
        }
    );
    assert_eq!(state.message(), "payment is not confirmed yet (2 < 3)");
}

#[test]
fn payment_in_several_parts_settles() {
    let outputs = [
        UnspentOutput::new(Money::sats(300_000), 4),
        UnspentOutput::new(Money::sats(700_000), 3),
    ];
    let state = evaluate(&Money::btc(dec!(0.01)), &outputs, 3).unwrap();
    assert_eq!(
        state,
        SettlementState::Settled {
            received: Money::btc(dec!(0.01)),
            confirmations: 3,
        }
    );
}

#[test]
fn unconfirmed_surplus_does_not_hold_back_settlement() {
    let outputs = [
        UnspentOutput::new(Money::btc(dec!(0.002)), 0),
        UnspentOutput::new(Money::btc(dec!(0.01)), 6),
    ];
    let state = evaluate(&Money::btc(dec!(0.01)), &outputs, 3).unwrap();
    assert_eq!(
        state,
        SettlementState::Settled {
            received: Money::btc(dec!(0.012)),
            confirmations: 6,
        }
    );
}

#[test]
fn zero_threshold_settles_on_arrival() {
    let outputs = [UnspentOutput::new(Money::btc(dec!(0.01)), 0)];
    assert!(evaluate(&Money::btc(dec!(0.01)), &outputs, 0).unwrap().is_settled());
}
