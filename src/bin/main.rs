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

use btc_invoice_rs::{
    Address, Config, DisbursementRequest, InvoiceError, InvoiceService, MemoryStore, MemoryWallet,
    Money, Network, Payout, http, plan,
};
use clap::{Args, Parser, Subcommand};
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Bitcoin invoice engine
///
/// Serves the invoice API, or plans vendor disbursements from a CSV file.
#[derive(Parser, Debug)]
#[command(name = "btc-invoice-rs")]
#[command(about = "Bitcoin invoices with settlement checks and vendor disbursements", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "INVOICE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API over the in-memory store and simulated wallet
    Serve(ServeArgs),
    /// Compute a disbursement plan from a CSV file and write it to stdout
    ///
    /// Expected format: vendor,amount,fee
    /// Example: cargo run -- plan payouts.csv > plan.csv
    Plan {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "INVOICE_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    #[arg(long, value_enum, env = "INVOICE_NETWORK", default_value_t = Network::Testnet)]
    network: Network,

    /// Confirmations required before an invoice counts as settled
    #[arg(long, env = "INVOICE_CONFIRMATIONS", default_value_t = Config::DEFAULT_CONFIRMATIONS)]
    confirmations: u32,

    /// Upper bound on each wallet call, in seconds
    #[arg(long, env = "INVOICE_WALLET_TIMEOUT_SECS", default_value_t = 30)]
    wallet_timeout_secs: u64,
}

impl ServeArgs {
    fn config(&self) -> Config {
        Config::new(self.network, self.confirmations)
            .with_wallet_timeout(Duration::from_secs(self.wallet_timeout_secs))
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Plan { input } => run_plan(&input),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}

async fn serve(args: ServeArgs) -> Result<(), CliError> {
    let config = args.config();
    info!(
        network = %config.network,
        confirmations = config.confirmations,
        wallet_timeout_secs = args.wallet_timeout_secs,
        "Starting invoice API"
    );

    let service = InvoiceService::new(MemoryWallet::new(config.network), MemoryStore::new(), config);
    let app = http::router(Arc::new(service));

    let listener = TcpListener::bind(args.listen).await?;
    info!("Listening on http://{}", args.listen);
    axum::serve(listener, app).await?;
    Ok(())
}

fn run_plan(input: &Path) -> Result<(), CliError> {
    let file = File::open(input).map_err(|e| CliError::Open {
        path: input.to_path_buf(),
        source: e,
    })?;
    let request = read_disbursements(BufReader::new(file))?;
    let payouts = plan(&request)?;
    write_plan(&payouts, std::io::stdout())?;
    info!(vendors = payouts.len(), "Disbursement plan written");
    Ok(())
}

#[derive(Debug, Error)]
enum CliError {
    #[error("error opening file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {source}")]
    Row { line: u64, source: InvoiceError },

    #[error(transparent)]
    Invoice(#[from] InvoiceError),
}

/// Raw CSV record matching the input format.
///
/// Fields: `vendor, amount, fee`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    vendor: String,
    amount: Decimal,
    fee: Decimal,
}

/// Reads a disbursement request from CSV.
///
/// Every row must parse; the first bad row fails the whole import.
///
/// # CSV Format
///
/// ```csv
/// vendor,amount,fee
/// tb1qvendora...,1.00,2
/// tb1qvendorb...,0.5,0
/// ```
fn read_disbursements<R: Read>(reader: R) -> Result<DisbursementRequest, CliError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    let mut request = DisbursementRequest::new();
    for result in rdr.deserialize::<CsvRecord>() {
        let record = result?;
        let line = request.len() as u64 + 2;
        request
            .push(Address(record.vendor), Money::btc(record.amount), record.fee)
            .map_err(|source| CliError::Row { line, source })?;
    }

    Ok(request)
}

/// Output row of the plan CSV.
#[derive(Debug, Serialize)]
struct PlanRow<'a> {
    vendor: &'a Address,
    amount: Decimal,
    fee: Decimal,
    net: Decimal,
}

/// Writes payouts as CSV with columns `vendor, amount, fee, net`.
fn write_plan<W: Write>(payouts: &[Payout], writer: W) -> Result<(), CliError> {
    let mut wtr = Writer::from_writer(writer);

    for payout in payouts {
        wtr.serialize(PlanRow {
            vendor: &payout.destination,
            amount: payout.amount.checked_add(&payout.fee)?.value().normalize(),
            fee: payout.fee.value().normalize(),
            net: payout.amount.value().normalize(),
        })?;
    }

    wtr.flush()?;
    Ok(())
}
