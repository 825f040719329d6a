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

//! Book rows and availability bookkeeping.
//!
//! A [`Book`] is one catalog row behind its own mutex. The lending engine
//! holds that mutex across an issue or return, which is what makes the
//! availability change and the transaction write a single atomic unit.
//!
//! # Example
//!
//! ```
//! use library_lending_rs::{AuthorId, Book, BookId, BookRecord, CategoryId};
//!
//! let book = Book::new(BookRecord::new(
//!     BookId(1),
//!     "978-0131103627",
//!     "The C Programming Language",
//!     CategoryId(1),
//!     vec![AuthorId(1)],
//!     2,
//! ));
//! assert_eq!(book.available_copies(), 2);
//! assert_eq!(book.on_loan(), 0);
//! ```

use crate::LendingError;
use crate::base::{AuthorId, BookId, CategoryId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

/// Persisted book fields.
//
//  available_copies: 0 ──issue──► ... ◄──return── total_copies
//  on_loan = total_copies - available_copies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub isbn: String,
    pub title: String,
    pub category_id: CategoryId,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub price: Option<Decimal>,
    pub authors: Vec<AuthorId>,
    pub total_copies: u32,
    pub available_copies: u32,
}

impl BookRecord {
    /// A fresh record with every copy on the shelf.
    pub fn new(
        id: BookId,
        isbn: impl Into<String>,
        title: impl Into<String>,
        category_id: CategoryId,
        authors: Vec<AuthorId>,
        total_copies: u32,
    ) -> Self {
        Self {
            id,
            isbn: isbn.into(),
            title: title.into(),
            category_id,
            publisher: None,
            publication_year: None,
            price: None,
            authors,
            total_copies,
            available_copies: total_copies,
        }
    }

    pub fn on_loan(&self) -> u32 {
        self.total_copies - self.available_copies
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.available_copies <= self.total_copies,
            "Invariant violated: available {} exceeds total {} for book {}",
            self.available_copies,
            self.total_copies,
            self.id
        );
    }

    /// Takes one copy off the shelf.
    pub(crate) fn checkout(&mut self) -> Result<(), LendingError> {
        if self.available_copies == 0 {
            return Err(LendingError::NoCopiesAvailable);
        }
        self.available_copies -= 1;
        self.assert_invariants();
        Ok(())
    }

    /// Puts one copy back on the shelf.
    pub(crate) fn checkin(&mut self) -> Result<(), LendingError> {
        self.can_checkin()?;
        self.available_copies += 1;
        self.assert_invariants();
        Ok(())
    }

    pub(crate) fn can_checkin(&self) -> Result<(), LendingError> {
        if self.available_copies >= self.total_copies {
            return Err(LendingError::CapacityExceeded);
        }
        Ok(())
    }

    /// Changes the number of copies owned, keeping copies on loan fixed.
    pub(crate) fn set_total_copies(&mut self, total: u32) -> Result<(), LendingError> {
        let on_loan = self.on_loan();
        if total == 0 || total < on_loan {
            return Err(LendingError::InvalidCopies);
        }
        self.total_copies = total;
        self.available_copies = total - on_loan;
        self.assert_invariants();
        Ok(())
    }
}

/// Catalog row with interior locking.
#[derive(Debug)]
pub struct Book {
    pub(crate) inner: Mutex<BookRecord>,
}

impl Book {
    pub fn new(record: BookRecord) -> Self {
        Self {
            inner: Mutex::new(record),
        }
    }

    pub fn id(&self) -> BookId {
        self.inner.lock().id
    }

    pub fn title(&self) -> String {
        self.inner.lock().title.clone()
    }

    pub fn isbn(&self) -> String {
        self.inner.lock().isbn.clone()
    }

    pub fn total_copies(&self) -> u32 {
        self.inner.lock().total_copies
    }

    pub fn available_copies(&self) -> u32 {
        self.inner.lock().available_copies
    }

    /// Returns `total_copies - available_copies`.
    pub fn on_loan(&self) -> u32 {
        self.inner.lock().on_loan()
    }

    /// Consistent copy of every field.
    pub fn record(&self) -> BookRecord {
        self.inner.lock().clone()
    }
}

impl Serialize for Book {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.inner.lock().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: u32) -> BookRecord {
        BookRecord::new(BookId(1), "isbn-1", "Dune", CategoryId(1), vec![AuthorId(1)], total)
    }

    #[test]
    fn checkout_decrements_until_empty() {
        let mut data = record(2);
        data.checkout().unwrap();
        data.checkout().unwrap();
        assert_eq!(data.available_copies, 0);
        assert_eq!(data.checkout(), Err(LendingError::NoCopiesAvailable));
        assert_eq!(data.available_copies, 0);
    }

    #[test]
    fn checkin_never_exceeds_total() {
        let mut data = record(1);
        assert_eq!(data.checkin(), Err(LendingError::CapacityExceeded));
        data.checkout().unwrap();
        data.checkin().unwrap();
        assert_eq!(data.available_copies, 1);
    }

    #[test]
    fn set_total_keeps_loans_fixed() {
        let mut data = record(3);
        data.checkout().unwrap();
        data.checkout().unwrap();

        data.set_total_copies(5).unwrap();
        assert_eq!(data.total_copies, 5);
        assert_eq!(data.available_copies, 3);
        assert_eq!(data.on_loan(), 2);

        data.set_total_copies(2).unwrap();
        assert_eq!(data.available_copies, 0);

        assert_eq!(data.set_total_copies(1), Err(LendingError::InvalidCopies));
        assert_eq!(data.total_copies, 2);
    }

    #[test]
    fn zero_total_is_rejected() {
        let mut data = record(1);
        assert_eq!(data.set_total_copies(0), Err(LendingError::InvalidCopies));
    }

    #[test]
    fn serializes_current_row() {
        let book = Book::new(record(2));
        book.inner.lock().checkout().unwrap();

        let parsed: serde_json::Value = serde_json::to_value(&book).unwrap();
        assert_eq!(parsed["isbn"], "isbn-1");
        assert_eq!(parsed["total_copies"], 2);
        assert_eq!(parsed["available_copies"], 1);
    }
}
