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

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use csv::{ReaderBuilder, Trim, Writer};
use library_lending_rs::{
    BookId, Engine, IssueRequest, LendingConfig, LibrarySnapshot, ManualClock, MemberId,
    MembershipType, NewBook, NewMember, StaffId, TransactionFilter, TransactionId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Library Lending - Run circulation from CSV files
///
/// Imports catalog and member CSVs, replays issue/return/payment logs and
/// prints reports as CSV on stdout. State is kept in a JSON snapshot.
#[derive(Parser, Debug)]
#[command(name = "library-lending-rs")]
#[command(about = "A library lending engine driven by CSV files", long_about = None)]
struct Args {
    /// JSON snapshot to load on start and save after changes
    #[arg(long, value_name = "FILE", global = true)]
    state: Option<PathBuf>,

    /// Fine charged per day late
    #[arg(long, env = "LIBRARY_FINE_PER_DAY", global = true)]
    fine_per_day: Option<Decimal>,

    /// Default loan period in days
    #[arg(long, env = "LIBRARY_LOAN_DAYS", global = true)]
    loan_days: Option<u32>,

    /// Longest loan period a request may ask for
    #[arg(long, global = true)]
    max_loan_days: Option<u32>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add books from a CSV file
    ///
    /// Expected format: isbn,title,category,authors,publisher,publication_year,price,total_copies
    /// Multiple authors are separated by ';'.
    ImportBooks {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Add members from a CSV file
    ///
    /// Expected format: first_name,last_name,email,phone,address,membership_type,join_date,expiry_date
    ImportMembers {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Replay an operations log and print every transaction
    ///
    /// Expected format: type,date,book,member,staff,tx,days
    /// where type is issue, return or pay.
    Replay {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Print overdue loans, most overdue first
    Overdue,
    /// Print today's circulation statistics
    Stats,
}

impl Command {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Command::ImportBooks { .. } | Command::ImportMembers { .. } | Command::Replay { .. }
        )
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let Some(fine_per_day) = args.fine_per_day else {
        bail!("a fine rate is required: pass --fine-per-day or set LIBRARY_FINE_PER_DAY");
    };
    let mut config = LendingConfig::new(fine_per_day);
    if let Some(max) = args.max_loan_days {
        config = config.with_loan_bounds(LendingConfig::MIN_LOAN_DAYS, max);
    }
    if let Some(days) = args.loan_days {
        config = config.with_loan_days(days);
    }

    let clock = Arc::new(ManualClock::new(
        args.today.unwrap_or_else(|| Local::now().date_naive()),
    ));
    let engine = match &args.state {
        Some(path) => {
            let snapshot = LibrarySnapshot::load_or_default(path)
                .with_context(|| format!("loading state from '{}'", path.display()))?;
            Engine::restore(snapshot, config, clock.clone())
                .with_context(|| format!("restoring state from '{}'", path.display()))?
        }
        None => Engine::with_clock(config, clock.clone()).context("invalid configuration")?,
    };

    let stdout = std::io::stdout();
    match &args.command {
        Command::ImportBooks { input } => {
            let added = import_books(&engine, open(input)?)?;
            info!(added, "books imported");
        }
        Command::ImportMembers { input } => {
            let added = import_members(&engine, open(input)?)?;
            info!(added, "members imported");
        }
        Command::Replay { input } => {
            let summary = replay(&engine, &clock, open(input)?)?;
            info!(applied = summary.applied, rejected = summary.rejected, "replay finished");
            let transactions = engine.transactions(&TransactionFilter::default());
            write_rows(transactions.iter().rev(), stdout.lock())?;
        }
        Command::Overdue => {
            write_rows(engine.reports().overdue_books(), stdout.lock())?;
        }
        Command::Stats => {
            write_rows([engine.reports().daily_statistics()], stdout.lock())?;
        }
    }

    if let (Some(path), true) = (&args.state, args.command.mutates()) {
        engine
            .snapshot()
            .save(path)
            .with_context(|| format!("saving state to '{}'", path.display()))?;
    }
    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("opening file '{}'", path.display()))?;
    Ok(BufReader::new(file))
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " issue "
        .flexible(true) // Allow trailing optional columns to be absent
        .has_headers(true)
        .from_reader(reader)
}

/// Raw book row.
#[derive(Debug, Deserialize)]
struct BookRow {
    isbn: String,
    title: String,
    category: String,
    authors: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    publisher: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    publication_year: Option<i32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    price: Option<Decimal>,
    total_copies: u32,
}

/// Adds every valid book row; rejected rows are logged and skipped.
fn import_books<R: Read>(engine: &Engine, reader: R) -> Result<usize> {
    let mut added = 0;
    for (line, result) in csv_reader(reader).deserialize::<BookRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(line = line + 2, error = %e, "skipping malformed book row");
                continue;
            }
        };
        let outcome = engine.catalog().ensure_category(&row.category).and_then(|category| {
            engine.catalog().add_book(NewBook {
                isbn: row.isbn,
                title: row.title,
                category_id: category.id,
                publisher: row.publisher.filter(|p| !p.is_empty()),
                publication_year: row.publication_year,
                price: row.price,
                authors: row.authors.split(';').map(str::to_string).collect(),
                total_copies: row.total_copies,
            })
        });
        match outcome {
            Ok(_) => added += 1,
            Err(e) => warn!(line = line + 2, error = %e, code = e.code(), "book rejected"),
        }
    }
    Ok(added)
}

/// Raw member row.
#[derive(Debug, Deserialize)]
struct MemberRow {
    first_name: String,
    last_name: String,
    email: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    address: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    membership_type: Option<MembershipType>,
    join_date: NaiveDate,
    expiry_date: NaiveDate,
}

fn import_members<R: Read>(engine: &Engine, reader: R) -> Result<usize> {
    let mut added = 0;
    for (line, result) in csv_reader(reader).deserialize::<MemberRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(line = line + 2, error = %e, "skipping malformed member row");
                continue;
            }
        };
        let outcome = engine.roster().add_member(NewMember {
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone.filter(|p| !p.is_empty()),
            address: row.address.filter(|a| !a.is_empty()),
            membership_type: row.membership_type,
            join_date: row.join_date,
            expiry_date: row.expiry_date,
        });
        match outcome {
            Ok(_) => added += 1,
            Err(e) => warn!(line = line + 2, error = %e, code = e.code(), "member rejected"),
        }
    }
    Ok(added)
}

/// Raw operation row.
///
/// Fields: `type, date, book, member, staff, tx, days`
#[derive(Debug, Deserialize)]
struct OperationRow {
    #[serde(rename = "type")]
    op_type: String,
    date: NaiveDate,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    book: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    member: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    staff: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    tx: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    days: Option<u32>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ReplaySummary {
    applied: usize,
    rejected: usize,
}

/// Applies an operations log in order, moving the clock to each row's date.
///
/// # CSV Format
///
/// ```csv
/// type,date,book,member,staff,tx,days
/// issue,2025-01-02,1,1,1,,
/// return,2025-01-20,,,,1,
/// pay,2025-01-21,,,,1,
/// ```
///
/// `pay` settles the fine raised by transaction `tx`. Rejected operations
/// are logged and counted but do not stop the replay.
fn replay<R: Read>(engine: &Engine, clock: &ManualClock, reader: R) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    for (line, result) in csv_reader(reader).deserialize::<OperationRow>().enumerate() {
        let line = line + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(line, error = %e, "skipping malformed operation row");
                summary.rejected += 1;
                continue;
            }
        };
        clock.set(row.date);
        match apply(engine, &row) {
            Ok(()) => summary.applied += 1,
            Err(e) => {
                warn!(line, op = %row.op_type, error = %e, "operation rejected");
                summary.rejected += 1;
            }
        }
    }
    Ok(summary)
}

fn apply(engine: &Engine, row: &OperationRow) -> Result<()> {
    match row.op_type.to_lowercase().as_str() {
        "issue" => {
            let (Some(book), Some(member)) = (row.book, row.member) else {
                bail!("issue needs book and member");
            };
            engine.issue_book(IssueRequest {
                book_id: BookId(book),
                member_id: MemberId(member),
                staff_id: StaffId(row.staff.unwrap_or_default()),
                loan_days: row.days,
            })?;
        }
        "return" => {
            let tx = row.tx.context("return needs tx")?;
            engine.return_book(TransactionId(tx))?;
        }
        "pay" => {
            let tx = row.tx.context("pay needs tx")?;
            let fine = engine
                .fines()
                .fine_for_transaction(TransactionId(tx))
                .with_context(|| format!("transaction {tx} has no fine"))?;
            engine.pay_fine(fine.id)?;
        }
        other => bail!("unknown operation type '{other}'"),
    }
    Ok(())
}

/// Writes rows as CSV with a header.
fn write_rows<T, I, W>(rows: I, writer: W) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
    W: Write,
{
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
