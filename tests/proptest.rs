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

//! Property-based tests for fees, disbursement planning and settlement.

use btc_invoice_rs::{
    Address, DisbursementRequest, InvoiceError, Money, SettlementState, UnspentOutput, evaluate,
    fee, plan,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Non-negative BTC amount with 8 fractional digits, up to 1000 BTC.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..=100_000_000_000i64).prop_map(|sats| Decimal::new(sats, 8))
}

/// Valid fee rate in [0, 100) with two decimal places.
fn arb_rate() -> impl Strategy<Value = Decimal> {
    (0i64..10_000i64).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

fn arb_outputs() -> impl Strategy<Value = Vec<UnspentOutput>> {
    prop::collection::vec(
        (1u64..=5_000_000u64, 0u32..10u32)
            .prop_map(|(sats, confirmations)| UnspentOutput::new(Money::sats(sats), confirmations)),
        0..8,
    )
}

fn arb_request() -> impl Strategy<Value = DisbursementRequest> {
    prop::collection::vec((arb_amount(), arb_rate()), 1..12).prop_map(|shares| {
        let mut request = DisbursementRequest::new();
        for (i, (amount, rate)) in shares.into_iter().enumerate() {
            request
                .push(Address(format!("vendor{i}")), Money::btc(amount), rate)
                .unwrap();
        }
        request
    })
}

// =============================================================================
// Fee Calculator
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn zero_rate_means_zero_fee(amount in arb_amount()) {
        let withheld = fee(&Money::btc(amount), Decimal::ZERO).unwrap();
        prop_assert!(withheld.is_zero());
    }

    #[test]
    fn fee_is_monotonic_in_rate(amount in arb_amount(), a in arb_rate(), b in arb_rate()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let amount = Money::btc(amount);
        let low_fee = fee(&amount, low).unwrap();
        let high_fee = fee(&amount, high).unwrap();
        prop_assert!(low_fee.value() <= high_fee.value());
    }

    #[test]
    fn fee_never_exceeds_amount(amount in arb_amount(), rate in arb_rate()) {
        let withheld = fee(&Money::btc(amount), rate).unwrap();
        prop_assert!(withheld.value() <= amount);
    }

    #[test]
    fn out_of_range_rates_are_rejected(
        amount in arb_amount(),
        excess in 0i64..1_000_000i64,
        negative in 1i64..1_000_000i64,
    ) {
        let amount = Money::btc(amount);
        let too_high = Decimal::new(10_000 + excess, 2);
        let too_low = Decimal::new(-negative, 2);
        prop_assert_eq!(fee(&amount, too_high), Err(InvoiceError::InvalidRate(too_high)));
        prop_assert_eq!(fee(&amount, too_low), Err(InvoiceError::InvalidRate(too_low)));
    }
}

// =============================================================================
// Disbursement Planner
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn net_amounts_are_never_negative(request in arb_request()) {
        for payout in plan(&request).unwrap() {
            prop_assert!(!payout.amount.is_negative());
        }
    }

    #[test]
    fn net_plus_fee_is_gross(request in arb_request()) {
        let payouts = plan(&request).unwrap();
        for (entry, payout) in request.entries().iter().zip(&payouts) {
            let gross = payout.amount.checked_add(&payout.fee).unwrap();
            prop_assert_eq!(gross, entry.amount);
        }
    }

    #[test]
    fn vendor_set_and_order_are_preserved(request in arb_request()) {
        let payouts = plan(&request).unwrap();
        let requested: Vec<&Address> = request.entries().iter().map(|e| &e.vendor).collect();
        let paid: Vec<&Address> = payouts.iter().map(|p| &p.destination).collect();
        prop_assert_eq!(&requested, &paid);

        let unique: BTreeSet<&Address> = paid.iter().copied().collect();
        prop_assert_eq!(unique.len(), payouts.len());
    }

    #[test]
    fn planning_is_deterministic(request in arb_request()) {
        prop_assert_eq!(plan(&request).unwrap(), plan(&request).unwrap());
    }
}

// =============================================================================
// Settlement Evaluator
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn evaluation_classifies_every_snapshot(
        owed_sats in 1u64..=20_000_000u64,
        outputs in arb_outputs(),
        threshold in 0u32..10u32,
    ) {
        let owed = Money::sats(owed_sats);
        let state = evaluate(&owed, &outputs, threshold).unwrap();
        let total: u64 = outputs.iter().map(|o| o.amount.to_sats().unwrap()).sum();

        match state {
            SettlementState::Unpaid { required } => {
                prop_assert!(outputs.is_empty());
                prop_assert_eq!(required, owed);
            }
            SettlementState::Underpaid { received, required, deficit } => {
                prop_assert!(total < owed_sats);
                prop_assert_eq!(received, Money::sats(total));
                prop_assert_eq!(required, owed);
                prop_assert_eq!(deficit, Money::sats(owed_sats - total));
            }
            SettlementState::PendingConfirmation { confirmations, required_confirmations, .. } => {
                prop_assert!(total >= owed_sats);
                prop_assert!(confirmations < threshold);
                prop_assert_eq!(required_confirmations, threshold);
            }
            SettlementState::Settled { received, confirmations } => {
                prop_assert!(total >= owed_sats);
                prop_assert!(confirmations >= threshold);
                prop_assert_eq!(received, Money::sats(total));
            }
        }
    }

    #[test]
    fn snapshot_order_does_not_matter(
        owed_sats in 1u64..=20_000_000u64,
        outputs in arb_outputs(),
        threshold in 0u32..10u32,
    ) {
        let owed = Money::sats(owed_sats);
        let mut reversed = outputs.clone();
        reversed.reverse();
        prop_assert_eq!(
            evaluate(&owed, &outputs, threshold).unwrap(),
            evaluate(&owed, &reversed, threshold).unwrap()
        );
    }

    #[test]
    fn fully_confirmed_funding_settles(
        owed_sats in 1u64..=5_000_000u64,
        extra in 0u64..1_000_000u64,
        threshold in 0u32..10u32,
    ) {
        let outputs = vec![UnspentOutput::new(Money::sats(owed_sats + extra), threshold)];
        let state = evaluate(&Money::sats(owed_sats), &outputs, threshold).unwrap();
        prop_assert!(state.is_settled());
    }
}
