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

//! Service configuration.

use crate::InvoiceError;
use crate::base::Address;
use bitcoin::address::NetworkUnchecked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Bitcoin network targeted by the wallet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    /// The matching `bitcoin` crate network.
    pub const fn to_bitcoin(self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
        }
    }

    /// Parses `address`, checksum included, and checks that it belongs to
    /// this network.
    pub fn validate_address(self, address: &Address) -> Result<(), InvoiceError> {
        let invalid = |reason: String| {
            InvoiceError::Validation(format!("invalid {self} address '{address}': {reason}"))
        };

        address
            .as_str()
            .parse::<bitcoin::Address<NetworkUnchecked>>()
            .map_err(|e| invalid(e.to_string()))?
            .require_network(self.to_bitcoin())
            .map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

/// Settings handed to [`InvoiceService::new`](crate::InvoiceService::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub network: Network,
    /// Confirmations an invoice's funding outputs need before it is settled.
    pub confirmations: u32,
    /// Upper bound on every wallet call.
    pub wallet_timeout: Duration,
}

impl Config {
    pub const DEFAULT_CONFIRMATIONS: u32 = 1;
    pub const DEFAULT_WALLET_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(network: Network, confirmations: u32) -> Self {
        Self {
            network,
            confirmations,
            wallet_timeout: Self::DEFAULT_WALLET_TIMEOUT,
        }
    }

    pub fn with_wallet_timeout(mut self, timeout: Duration) -> Self {
        self.wallet_timeout = timeout;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Network::default(), Self::DEFAULT_CONFIRMATIONS)
    }
}
