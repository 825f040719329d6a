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

//! Lending transactions.
//!
//! Transactions follow a state machine with a single written transition:
//! - [`Issued`] → [`Returned`] (via return, terminal)
//!
//! [`Overdue`] is never stored. It is what an [`Issued`] transaction reports
//! once its due date has passed, see [`Transaction::status_on`].
//!
//! [`Issued`]: TransactionStatus::Issued
//! [`Returned`]: TransactionStatus::Returned
//! [`Overdue`]: TransactionStatus::Overdue

use crate::base::{BookId, MemberId, StaffId, TransactionId};
use crate::calendar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Issued,
    Returned,
    Overdue,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Issued => "Issued",
            TransactionStatus::Returned => "Returned",
            TransactionStatus::Overdue => "Overdue",
        };
        f.write_str(name)
    }
}

/// A single loan of one copy of a book to one member.
///
/// Everything except the return date and status is fixed at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    book_id: BookId,
    member_id: MemberId,
    staff_id: StaffId,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    return_date: Option<NaiveDate>,
    status: TransactionStatus,
}

impl Transaction {
    pub(crate) fn issued(
        id: TransactionId,
        book_id: BookId,
        member_id: MemberId,
        staff_id: StaffId,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            book_id,
            member_id,
            staff_id,
            issue_date,
            due_date,
            return_date: None,
            status: TransactionStatus::Issued,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn staff_id(&self) -> StaffId {
        self.staff_id
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        self.return_date
    }

    /// Stored status: `Issued` or `Returned`.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status != TransactionStatus::Returned
    }

    /// Status as reported on `today`: open loans past due read as `Overdue`.
    pub fn status_on(&self, today: NaiveDate) -> TransactionStatus {
        match self.status {
            TransactionStatus::Returned => TransactionStatus::Returned,
            _ if calendar::is_overdue(self.due_date, today) => TransactionStatus::Overdue,
            _ => TransactionStatus::Issued,
        }
    }

    /// Days past due for an open loan, zero for returned or on-time loans.
    pub fn days_overdue(&self, today: NaiveDate) -> u32 {
        if self.is_open() {
            calendar::days_overdue(self.due_date, today)
        } else {
            0
        }
    }

    /// Days the book came back late, zero while open.
    pub fn days_late(&self) -> u32 {
        self.return_date
            .map(|returned| calendar::days_late(self.due_date, returned))
            .unwrap_or(0)
    }

    pub(crate) fn close(&mut self, return_date: NaiveDate) {
        debug_assert!(self.is_open(), "closing transaction {} twice", self.id);
        self.return_date = Some(return_date);
        self.status = TransactionStatus::Returned;
    }

    /// Checks the stored fields describe a reachable state.
    pub(crate) fn is_consistent(&self) -> bool {
        let dates_ok = self.due_date >= self.issue_date
            && self.return_date.is_none_or(|r| r >= self.issue_date);
        let status_ok = match self.status {
            TransactionStatus::Issued => self.return_date.is_none(),
            TransactionStatus::Returned => self.return_date.is_some(),
            TransactionStatus::Overdue => false,
        };
        dates_ok && status_ok
    }
}
