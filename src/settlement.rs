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

//! Settlement evaluation.
//!
//! Settlement is recomputed from scratch on every call from three inputs: the
//! amount owed, a fresh snapshot of the invoice address's unspent outputs, and
//! the confirmation threshold. Nothing is persisted between calls.
//!
//! ```text
//!  no outputs ──► Unpaid
//!  total < owed ──► Underpaid
//!  total ≥ owed, gating confirmations < threshold ──► PendingConfirmation
//!  total ≥ owed, gating confirmations ≥ threshold ──► Settled
//! ```
//!
//! All outputs are aggregated. The gating confirmation count is the lowest
//! confirmation count among the outputs needed to cover the owed amount, taking
//! the most-confirmed outputs first. Output order in the snapshot never changes
//! the outcome.

use crate::wallet::UnspentOutput;
use crate::{InvoiceError, Money};
use serde::Serialize;
use std::cmp::{Ordering, Reverse};

/// Outcome of a settlement check, with the values that were compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettlementState {
    /// Nothing has been received.
    Unpaid { required: Money },
    /// Funds arrived but do not cover the owed amount.
    Underpaid {
        received: Money,
        required: Money,
        deficit: Money,
    },
    /// Enough funds arrived but are not yet buried deep enough.
    PendingConfirmation {
        received: Money,
        required: Money,
        confirmations: u32,
        required_confirmations: u32,
    },
    /// Funds cover the owed amount with enough confirmations.
    Settled { received: Money, confirmations: u32 },
}

impl SettlementState {
    pub fn is_settled(&self) -> bool {
        matches!(self, SettlementState::Settled { .. })
    }

    /// Human-readable summary naming the values compared.
    pub fn message(&self) -> String {
        match self {
            SettlementState::Unpaid { .. } => "amount not paid".to_string(),
            SettlementState::Underpaid {
                received, required, ..
            } => format!("paid amount is less ({received} < {required})"),
            SettlementState::PendingConfirmation {
                confirmations,
                required_confirmations,
                ..
            } => format!(
                "payment is not confirmed yet ({confirmations} < {required_confirmations})"
            ),
            SettlementState::Settled { .. } => "payment settled".to_string(),
        }
    }
}

/// Evaluates an invoice owing `owed` against an unspent-output snapshot.
///
/// Output amounts are converted into the unit of `owed` before summing.
///
/// # Errors
///
/// [`InvoiceError::PrecisionLoss`] if an output cannot be expressed in the
/// owed unit without dropping sub-satoshi digits.
pub fn evaluate(
    owed: &Money,
    outputs: &[UnspentOutput],
    required_confirmations: u32,
) -> Result<SettlementState, InvoiceError> {
    if outputs.is_empty() {
        return Ok(SettlementState::Unpaid { required: *owed });
    }

    let mut funding = outputs
        .iter()
        .map(|output| Ok((output.amount.convert(owed.unit())?, output.confirmations)))
        .collect::<Result<Vec<(Money, u32)>, InvoiceError>>()?;

    let received = Money::sum(funding.iter().map(|(amount, _)| amount), owed.unit())?;
    if received.try_cmp(owed)? == Ordering::Less {
        return Ok(SettlementState::Underpaid {
            received,
            required: *owed,
            deficit: owed.checked_sub(&received)?,
        });
    }

    // Most-confirmed first; the last output taken bounds the confirmations.
    funding.sort_by_key(|(_, confirmations)| Reverse(*confirmations));

    let mut covered = Money::zero(owed.unit());
    let mut confirmations = 0;
    for (amount, depth) in &funding {
        covered = covered.checked_add(amount)?;
        confirmations = *depth;
        if covered.try_cmp(owed)? != Ordering::Less {
            break;
        }
    }

    if confirmations < required_confirmations {
        return Ok(SettlementState::PendingConfirmation {
            received,
            required: *owed,
            confirmations,
            required_confirmations,
        });
    }

    Ok(SettlementState::Settled {
        received,
        confirmations,
    })
}
