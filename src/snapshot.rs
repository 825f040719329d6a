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

//! Whole-store JSON snapshots.
//!
//! A snapshot is only accepted back if it describes a state the engine
//! could have reached: every open loan points at an existing book and
//! member, and each book's available copies plus its open loans equal its
//! total copies.

use crate::base::{BookId, MemberId};
use crate::book::BookRecord;
use crate::calendar::Clock;
use crate::catalog::{Author, Category};
use crate::engine::Engine;
use crate::fine::Fine;
use crate::member::Member;
use crate::transaction::Transaction;
use crate::{LendingConfig, LendingError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    pub categories: Vec<Category>,
    pub authors: Vec<Author>,
    pub books: Vec<BookRecord>,
    pub members: Vec<Member>,
    pub transactions: Vec<Transaction>,
    pub fines: Vec<Fine>,
}

fn store_error(path: &Path, err: impl std::fmt::Display) -> LendingError {
    LendingError::StoreUnavailable(format!("{}: {err}", path.display()))
}

impl LibrarySnapshot {
    /// Reads a snapshot from `path`.
    ///
    /// # Errors
    ///
    /// [`LendingError::StoreUnavailable`] when the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, LendingError> {
        let bytes = fs::read(path).map_err(|e| store_error(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| store_error(path, e))
    }

    /// Like [`LibrarySnapshot::load`], but a missing file is an empty library.
    pub fn load_or_default(path: &Path) -> Result<Self, LendingError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Writes the snapshot to `path`, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<(), LendingError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| store_error(path, e))?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|e| store_error(&staging, e))?;
        fs::rename(&staging, path).map_err(|e| store_error(path, e))?;
        info!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    fn check_loans(&self) -> Result<HashMap<MemberId, u32>, LendingError> {
        let books: HashMap<BookId, &BookRecord> = self.books.iter().map(|b| (b.id, b)).collect();
        let members: HashSet<MemberId> = self.members.iter().map(|m| m.id).collect();
        let mut open_per_book: HashMap<BookId, u32> = HashMap::new();
        let mut open_per_member: HashMap<MemberId, u32> = HashMap::new();

        for t in &self.transactions {
            if !t.is_consistent() {
                return Err(reject(format!("transaction {} has an invalid state", t.id())));
            }
            if !t.is_open() {
                continue;
            }
            if !books.contains_key(&t.book_id()) {
                return Err(reject(format!(
                    "open transaction {} references missing book {}",
                    t.id(),
                    t.book_id()
                )));
            }
            if !members.contains(&t.member_id()) {
                return Err(reject(format!(
                    "open transaction {} references missing member {}",
                    t.id(),
                    t.member_id()
                )));
            }
            *open_per_book.entry(t.book_id()).or_default() += 1;
            *open_per_member.entry(t.member_id()).or_default() += 1;
        }

        for book in &self.books {
            let open = open_per_book.get(&book.id).copied().unwrap_or(0);
            if u64::from(book.available_copies) + u64::from(open) != u64::from(book.total_copies) {
                return Err(reject(format!(
                    "book {} has {} available and {} on loan but {} total",
                    book.id, book.available_copies, open, book.total_copies
                )));
            }
        }

        let returned: HashSet<_> = self
            .transactions
            .iter()
            .filter(|t| !t.is_open())
            .map(|t| t.id())
            .collect();
        if let Some(fine) = self.fines.iter().find(|f| !returned.contains(&f.transaction_id)) {
            return Err(reject(format!(
                "fine {} references transaction {} which is not returned",
                fine.id, fine.transaction_id
            )));
        }

        Ok(open_per_member)
    }
}

fn reject(reason: String) -> LendingError {
    warn!(%reason, "snapshot rejected");
    LendingError::InconsistentSnapshot(reason)
}

impl Engine {
    /// Copies the whole store. Rows are read one at a time, so take
    /// snapshots while no writes are in flight.
    pub fn snapshot(&self) -> LibrarySnapshot {
        let mut books = self.catalog.records();
        books.sort_by_key(|b| b.id);
        let mut members = self.roster.members(None);
        members.sort_by_key(|m| m.id);
        let mut transactions = self.ledger.all();
        transactions.sort_by_key(|t| t.id());
        let mut categories = self.catalog.categories();
        categories.sort_by_key(|c| c.id);

        LibrarySnapshot {
            categories,
            authors: self.catalog.authors(),
            books,
            members,
            transactions,
            fines: self.fines.fines(),
        }
    }

    /// Rebuilds an engine from a snapshot after checking it is consistent.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InconsistentSnapshot`] when loans and copies
    ///   disagree or records are dangling.
    /// - Duplicate-key errors when ISBNs, emails or category names clash.
    pub fn restore(
        snapshot: LibrarySnapshot,
        config: LendingConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LendingError> {
        let open_loans = snapshot.check_loans()?;
        let engine = Engine::with_clock(config, clock)?;

        let book_count = snapshot.books.len();
        let transaction_count = snapshot.transactions.len();
        engine
            .catalog
            .restore(snapshot.categories, snapshot.authors, snapshot.books)?;
        engine.roster.restore(snapshot.members)?;
        for (member_id, count) in open_loans {
            engine.roster.set_open_loans(member_id, count);
        }
        for transaction in snapshot.transactions {
            engine.ledger.push(transaction)?;
        }
        engine.fines.restore(snapshot.fines)?;

        info!(books = book_count, transactions = transaction_count, "snapshot restored");
        Ok(engine)
    }
}
