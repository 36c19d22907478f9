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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use fuel_dispense_rs::{
    DispenseController, DispenseEvent, DispenseState, FuelTransaction, InMemorySlipStatus,
    InMemoryTransactionStore, Screen, SlipStatusQuery, TransactionId, TransactionStore,
    WorkflowConfig,
};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Fuel Dispense - Confirm fuel dispenses from scanned gas slip QR codes
///
/// Loads known transactions and slip statuses from CSV files, then feeds each
/// scanned QR payload (one per line) through the dispense workflow.
#[derive(Parser, Debug)]
#[command(name = "fuel-dispense")]
#[command(about = "Confirms fuel dispenses from scanned gas slip QR payloads", long_about = None)]
struct Args {
    /// Path to CSV file with known transactions
    ///
    /// Expected format: id,reference_number,vehicle_id,driver_name,fuel_type,liters_to_pump,status,created_at
    #[arg(value_name = "FILE")]
    transactions: PathBuf,

    /// Path to CSV file with gas slip statuses (transaction_id,status)
    #[arg(long, value_name = "FILE")]
    slips: Option<PathBuf>,

    /// File with one raw QR payload per line (defaults to stdin)
    #[arg(long, value_name = "FILE")]
    scans: Option<PathBuf>,

    /// Confirm every matched transaction instead of dismissing it
    #[arg(long)]
    auto_confirm: bool,

    /// Wait after a forced store refresh before the lookup is retried
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    refresh_wait_ms: u64,

    /// Window in which identical scans are dropped
    #[arg(long, value_name = "MS", default_value_t = 500)]
    debounce_ms: u64,

    /// Write the final transaction states as CSV to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

impl Args {
    fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            refresh_wait: Duration::from_millis(self.refresh_wait_ms),
            debounce_window: Duration::from_millis(self.debounce_ms),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let store = InMemoryTransactionStore::new();
    if let Err(e) = open(&args.transactions).and_then(|file| load_transactions(file, &store)) {
        eprintln!("Error loading transactions '{}': {}", args.transactions.display(), e);
        process::exit(1);
    }

    let slips = Arc::new(InMemorySlipStatus::new());
    if let Some(path) = &args.slips
        && let Err(e) = open(path).and_then(|file| load_slips(file, &slips))
    {
        eprintln!("Error loading slips '{}': {}", path.display(), e);
        process::exit(1);
    }

    let scans: Box<dyn AsyncBufRead + Unpin + Send> = match &args.scans {
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(file) => Box::new(tokio::io::BufReader::new(file)),
            Err(e) => {
                eprintln!("Error opening file '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => Box::new(tokio::io::BufReader::new(tokio::io::stdin())),
    };

    let controller = DispenseController::new(store.clone(), slips, args.workflow_config());
    if let Err(e) = drive(controller, scans, args.auto_confirm, std::io::stdout()).await {
        eprintln!("Error reading scans: {}", e);
        process::exit(1);
    }

    if let Some(path) = &args.report {
        let result = File::create(path)
            .map_err(csv::Error::from)
            .and_then(|file| write_transactions(&store.transactions(), file));
        if let Err(e) = result {
            eprintln!("Error writing report '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>, csv::Error> {
    Ok(BufReader::new(File::open(path)?))
}

/// Feeds every scanned line through the workflow, answering each prompt.
///
/// The screen is drawn to `out` after every step, before any banner is
/// acknowledged, so each outcome of a scan is shown.
async fn drive<S, Q, R, W>(
    mut controller: DispenseController<S, Q>,
    scans: R,
    auto_confirm: bool,
    mut out: W,
) -> std::io::Result<()>
where
    S: TransactionStore,
    Q: SlipStatusQuery,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = scans.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if !controller.decoded(line).await {
            continue;
        }
        draw(&mut out, &controller.state())?;

        if let DispenseState::AwaitingConfirmation { transaction } = controller.state() {
            let event = if auto_confirm {
                DispenseEvent::Confirm
            } else {
                info!(reference = %transaction.reference_number, "dismissing without confirmation");
                DispenseEvent::Dismiss
            };
            let state = controller.handle(event).await;
            draw(&mut out, &state)?;
        }
        if controller.state().needs_acknowledgement() {
            controller.handle(DispenseEvent::Acknowledge).await;
        }
    }
    out.flush()
}

fn draw<W: Write>(out: &mut W, state: &DispenseState) -> std::io::Result<()> {
    writeln!(out, "{}", Screen::from(state))
}

/// Raw slip status record.
///
/// Fields: `transaction_id, status`
#[derive(Debug, Deserialize)]
struct SlipRecord {
    transaction_id: String,
    status: String,
}

/// Loads transactions from a CSV reader into the store.
///
/// Malformed rows are skipped and logged; they never abort the load.
///
/// # CSV Format
///
/// ```csv
/// id,reference_number,vehicle_id,driver_name,fuel_type,liters_to_pump,status,created_at
/// tx-1,MDRRMO-2024-0001,AMB-01,J. Santos,DIESEL,40.0,PENDING,2024-01-01T08:00:00Z
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the header cannot be read.
pub fn load_transactions<R: Read>(
    reader: R,
    store: &InMemoryTransactionStore,
) -> Result<usize, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    let mut loaded = 0;
    for result in rdr.deserialize::<FuelTransaction>() {
        match result {
            Ok(transaction) => {
                store.insert(transaction);
                loaded += 1;
            }
            Err(e) => warn!(error = %e, "skipping malformed transaction row"),
        }
    }

    info!(loaded, "transactions loaded");
    Ok(loaded)
}

/// Loads gas slip statuses from a CSV reader.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the header cannot be read.
pub fn load_slips<R: Read>(reader: R, slips: &InMemorySlipStatus) -> Result<usize, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    let mut loaded = 0;
    for result in rdr.deserialize::<SlipRecord>() {
        match result {
            Ok(record) => {
                slips.set(TransactionId(record.transaction_id), record.status);
                loaded += 1;
            }
            Err(e) => warn!(error = %e, "skipping malformed slip row"),
        }
    }

    info!(loaded, "slip statuses loaded");
    Ok(loaded)
}

/// Writes transaction states as CSV.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_transactions<W: Write>(
    transactions: &[FuelTransaction],
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for transaction in transactions {
        wtr.serialize(transaction)?;
    }
    wtr.flush()?;
    Ok(())
}
