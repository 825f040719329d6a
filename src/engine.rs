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

//! Lending engine.
//!
//! The [`Engine`] is the central component that issues and returns books.
//! It owns the catalog, the member roster, the transaction ledger and the
//! fine register, and is the only writer of loan state.
//!
//! # Operations
//!
//! - **Issue**: take one copy of a book off the shelf for an active member.
//! - **Return**: put the copy back, closing the transaction and fining late
//!   returns.
//! - **Pay fine**: settle a fine.
//!
//! # Thread Safety
//!
//! Each book and each transaction is a row behind its own mutex. Rows are
//! taken in a fixed order (transaction, then book) with bounded waits, so
//! loans of different books proceed in parallel and no two writers can
//! deadlock.

use crate::base::{BookId, FineId, MemberId, StaffId, TransactionId};
use crate::calendar::{self, Clock, SystemClock};
use crate::catalog::Catalog;
use crate::fine::{self, Fine, FineBook};
use crate::ledger::Ledger;
use crate::lock::lock_row;
use crate::report::Reports;
use crate::roster::Roster;
use crate::transaction::{Transaction, TransactionStatus};
use crate::{LendingConfig, LendingError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Input for [`Engine::issue_book`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueRequest {
    pub book_id: BookId,
    pub member_id: MemberId,
    pub staff_id: StaffId,
    /// Loan period; the configured default when `None`.
    pub loan_days: Option<u32>,
}

/// Outcome of [`Engine::return_book`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnReceipt {
    pub transaction: Transaction,
    pub returned_on: NaiveDate,
    pub days_late: u32,
    /// Zero when the book came back on time.
    pub fine_amount: Decimal,
    pub fine: Option<Fine>,
}

/// Optional filters for [`Engine::transactions`]; unset fields match all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Matched against the status as of today, so `Overdue` works.
    pub status: Option<TransactionStatus>,
    pub member_id: Option<MemberId>,
    pub book_id: Option<BookId>,
}

impl TransactionFilter {
    fn matches(&self, transaction: &Transaction, today: NaiveDate) -> bool {
        self.status.is_none_or(|s| transaction.status_on(today) == s)
            && self.member_id.is_none_or(|m| transaction.member_id() == m)
            && self.book_id.is_none_or(|b| transaction.book_id() == b)
    }
}

/// A member's open loan with its book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowedBook {
    pub transaction_id: TransactionId,
    pub book_id: BookId,
    pub title: String,
    pub isbn: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: TransactionStatus,
    pub days_overdue: u32,
}

/// Lending engine over an in-memory store.
///
/// # Invariants
///
/// - For every book, `available_copies` plus its open transactions equals
///   `total_copies`.
/// - `0 <= available_copies <= total_copies` at all times.
/// - A transaction is returned at most once and fined at most once.
/// - `Overdue` is never stored; it is derived from the clock's today.
#[derive(Debug)]
pub struct Engine {
    pub(crate) catalog: Catalog,
    pub(crate) roster: Roster,
    pub(crate) ledger: Ledger,
    pub(crate) fines: FineBook,
    pub(crate) config: LendingConfig,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Engine {
    /// Creates an empty engine on the system clock.
    ///
    /// # Errors
    ///
    /// [`LendingError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: LendingConfig) -> Result<Self, LendingError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty engine reading today from `clock`.
    pub fn with_clock(config: LendingConfig, clock: Arc<dyn Clock>) -> Result<Self, LendingError> {
        config.validate()?;
        Ok(Self {
            catalog: Catalog::with_lock_budget(config.lock_budget),
            roster: Roster::new(),
            ledger: Ledger::new(),
            fines: FineBook::new(),
            config,
            clock,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn fines(&self) -> &FineBook {
        &self.fines
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Read-only rollups over the current state.
    pub fn reports(&self) -> Reports<'_> {
        Reports::new(self)
    }

    /// Issues one copy of a book to a member.
    ///
    /// The availability decrement, the member's open-loan count and the new
    /// transaction are committed together under the book's row lock.
    ///
    /// # Errors
    ///
    /// - [`LendingError::LoanPeriodOutOfRange`] - loan period outside bounds.
    /// - [`LendingError::BookNotFound`] / [`LendingError::MemberNotFound`].
    /// - [`LendingError::MemberNotActive`] - member is expired or suspended.
    /// - [`LendingError::NoCopiesAvailable`] - every copy is out.
    /// - [`LendingError::ConflictRetryExhausted`] - the book row stayed locked.
    pub fn issue_book(&self, request: IssueRequest) -> Result<Transaction, LendingError> {
        let loan_days = self.config.loan_days(request.loan_days)?;
        let today = self.clock.today();
        let due_date = calendar::due_date(today, loan_days).ok_or(LendingError::InvalidDateRange)?;

        let book = self.catalog.book(request.book_id)?;
        if !self.roster.member(request.member_id)?.is_active() {
            return Err(LendingError::MemberNotActive);
        }

        let mut row = lock_row(&book.inner, self.config.lock_budget)?;
        if !self.catalog.contains(request.book_id) {
            return Err(LendingError::BookNotFound(request.book_id));
        }
        let mut staged = row.clone();
        staged.checkout()?;
        // Re-checks status under the member entry; nothing is written yet
        // if this fails.
        self.roster.begin_loan(request.member_id)?;

        let transaction = Transaction::issued(
            self.ledger.next_id(),
            request.book_id,
            request.member_id,
            request.staff_id,
            today,
            due_date,
        );
        // Copy leaves the shelf before the loan is visible: visible open
        // loans never exceed copies out.
        let previous = std::mem::replace(&mut *row, staged);
        if let Err(err) = self.ledger.push(transaction.clone()) {
            *row = previous;
            self.roster.end_loan(request.member_id);
            return Err(err);
        }
        drop(row);

        info!(
            transaction = %transaction.id(),
            book = %request.book_id,
            member = %request.member_id,
            due = %due_date,
            "book issued"
        );
        Ok(transaction)
    }

    /// Returns the copy held under `transaction_id`.
    ///
    /// Closing the transaction, restoring availability, releasing the
    /// member's loan and recording a fine for late returns all happen while
    /// both the transaction and book rows are held.
    ///
    /// # Errors
    ///
    /// - [`LendingError::TransactionNotFound`] - unknown transaction.
    /// - [`LendingError::AlreadyReturned`] - transaction is already closed.
    /// - [`LendingError::InvalidDateRange`] - today precedes the issue date.
    /// - [`LendingError::CapacityExceeded`] - the book has no copy out.
    /// - [`LendingError::ConflictRetryExhausted`] - a row stayed locked.
    pub fn return_book(&self, transaction_id: TransactionId) -> Result<ReturnReceipt, LendingError> {
        let today = self.clock.today();
        let slot = self.ledger.row(transaction_id)?;
        let mut transaction = lock_row(&slot, self.config.lock_budget)?;
        if !transaction.is_open() {
            return Err(LendingError::AlreadyReturned);
        }
        if today < transaction.issue_date() {
            return Err(LendingError::InvalidDateRange);
        }

        let book = self.catalog.book(transaction.book_id())?;
        let mut row = lock_row(&book.inner, self.config.lock_budget)?;
        row.can_checkin()?;

        let days_late = calendar::days_late(transaction.due_date(), today);
        let fine_amount = fine::fine_amount(days_late, self.config.fine_per_day);

        row.checkin()?;
        transaction.close(today);
        self.roster.end_loan(transaction.member_id());
        let fine = (days_late > 0).then(|| self.fines.assess(transaction_id, fine_amount, today));
        let transaction = transaction.clone();
        drop(row);

        info!(
            transaction = %transaction_id,
            book = %transaction.book_id(),
            days_late,
            fine = %fine_amount,
            "book returned"
        );
        Ok(ReturnReceipt {
            transaction,
            returned_on: today,
            days_late,
            fine_amount,
            fine,
        })
    }

    /// Marks a fine paid as of today.
    pub fn pay_fine(&self, fine_id: FineId) -> Result<Fine, LendingError> {
        self.fines.pay(fine_id, self.clock.today())
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Transaction, LendingError> {
        self.ledger.get(id)
    }

    /// Transactions matching `filter`, newest first.
    pub fn transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        let today = self.clock.today();
        let mut transactions: Vec<Transaction> = self
            .ledger
            .all()
            .into_iter()
            .filter(|t| filter.matches(t, today))
            .collect();
        transactions.sort_by(|a, b| b.id().cmp(&a.id()));
        transactions
    }

    /// A member's full history, most recent issue first.
    pub fn member_transactions(&self, member_id: MemberId) -> Result<Vec<Transaction>, LendingError> {
        self.roster.member(member_id)?;
        let filter = TransactionFilter {
            member_id: Some(member_id),
            ..Default::default()
        };
        let mut transactions = self.transactions(&filter);
        // Stable sort keeps id-descending order within a day.
        transactions.sort_by(|a, b| b.issue_date().cmp(&a.issue_date()));
        Ok(transactions)
    }

    /// Books a member currently holds, most overdue first.
    pub fn borrowed_books(&self, member_id: MemberId) -> Result<Vec<BorrowedBook>, LendingError> {
        let today = self.clock.today();
        let mut borrowed: Vec<BorrowedBook> = self
            .member_transactions(member_id)?
            .into_iter()
            .filter(Transaction::is_open)
            .filter_map(|t| {
                let book = self.catalog.book(t.book_id()).ok()?;
                Some(BorrowedBook {
                    transaction_id: t.id(),
                    book_id: t.book_id(),
                    title: book.title(),
                    isbn: book.isbn(),
                    issue_date: t.issue_date(),
                    due_date: t.due_date(),
                    status: t.status_on(today),
                    days_overdue: t.days_overdue(today),
                })
            })
            .collect();
        borrowed.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
        Ok(borrowed)
    }

    /// Expires memberships that lapsed before today.
    pub fn expire_lapsed_memberships(&self) -> usize {
        self.roster.expire_lapsed(self.clock.today())
    }
}
