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

//! Thread-safe transaction ledger with duplicate detection.
//!
//! Each transaction lives in its own row behind a [`Mutex`] so that a
//! return can hold it while it touches the book row. The surrounding
//! [`DashMap`] is only used to find rows and is never held across a row
//! lock.

use crate::LendingError;
use crate::base::{IdSequence, TransactionId};
use crate::transaction::Transaction;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) type TransactionRow = Arc<Mutex<Transaction>>;

#[derive(Debug, Default)]
pub struct Ledger {
    /// Map of transaction ids to rows.
    transactions: DashMap<TransactionId, TransactionRow>,
    transaction_ids: IdSequence,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_id(&self) -> TransactionId {
        TransactionId(self.transaction_ids.next())
    }

    /// Adds a transaction row.
    ///
    /// # Errors
    ///
    /// Returns [`LendingError::InconsistentSnapshot`] if a transaction with
    /// the same id is already recorded.
    pub(crate) fn push(&self, transaction: Transaction) -> Result<(), LendingError> {
        let id = transaction.id();
        // Entry API for an atomic check-and-insert.
        match self.transactions.entry(id) {
            Entry::Occupied(_) => Err(LendingError::InconsistentSnapshot(format!(
                "transaction {id} recorded twice"
            ))),
            Entry::Vacant(entry) => {
                self.transaction_ids.observe(id.0);
                entry.insert(Arc::new(Mutex::new(transaction)));
                Ok(())
            }
        }
    }

    pub(crate) fn row(&self, id: TransactionId) -> Result<TransactionRow, LendingError> {
        self.transactions
            .get(&id)
            .map(|row| Arc::clone(row.value()))
            .ok_or(LendingError::TransactionNotFound(id))
    }

    /// Copy of one transaction.
    pub fn get(&self, id: TransactionId) -> Result<Transaction, LendingError> {
        Ok(self.row(id)?.lock().clone())
    }

    /// Copies of every transaction, in no particular order.
    pub fn all(&self) -> Vec<Transaction> {
        let rows: Vec<TransactionRow> = self
            .transactions
            .iter()
            .map(|row| Arc::clone(row.value()))
            .collect();
        rows.iter().map(|row| row.lock().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{BookId, MemberId, StaffId};
    use chrono::NaiveDate;

    fn loan(id: u32) -> Transaction {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        Transaction::issued(
            TransactionId(id),
            BookId(1),
            MemberId(1),
            StaffId(1),
            day,
            day,
        )
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let ledger = Ledger::new();
        ledger.push(loan(1)).unwrap();
        assert!(matches!(
            ledger.push(loan(1)),
            Err(LendingError::InconsistentSnapshot(_))
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn pushed_ids_advance_the_sequence() {
        let ledger = Ledger::new();
        ledger.push(loan(7)).unwrap();
        assert_eq!(ledger.next_id(), TransactionId(8));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let ledger = Ledger::new();
        assert_eq!(
            ledger.get(TransactionId(3)),
            Err(LendingError::TransactionNotFound(TransactionId(3)))
        );
    }
}
