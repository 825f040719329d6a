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

//! Loan day arithmetic and the engine clock.
//!
//! Every place that needs to know whether a loan is overdue, or by how
//! many days, goes through the functions in this module. Dates are calendar
//! days; a loan due on day `D` becomes overdue on day `D + 1`.

use chrono::{Days, Local, NaiveDate};
use crossbeam::atomic::AtomicCell;
use std::fmt;

/// Due date for a loan issued on `issue_date` for `loan_days` days.
///
/// Returns `None` only if the date overflows the calendar.
pub fn due_date(issue_date: NaiveDate, loan_days: u32) -> Option<NaiveDate> {
    issue_date.checked_add_days(Days::new(u64::from(loan_days)))
}

/// An open loan is overdue once today is past its due date.
pub fn is_overdue(due_date: NaiveDate, today: NaiveDate) -> bool {
    due_date < today
}

/// Whole days between the due date and the return date, zero when on time.
pub fn days_late(due_date: NaiveDate, return_date: NaiveDate) -> u32 {
    let days = (return_date - due_date).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Days an open loan has been overdue as of `today`.
pub fn days_overdue(due_date: NaiveDate, today: NaiveDate) -> u32 {
    days_late(due_date, today)
}

/// Source of "today" for the engine.
pub trait Clock: Send + Sync + fmt::Debug {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to.
///
/// Used by the CLI replay (each row carries its own date) and by tests that
/// walk a loan through several days.
#[derive(Debug)]
pub struct ManualClock {
    today: AtomicCell<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: AtomicCell::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        self.today.store(today);
    }

    /// Moves the clock forward by `days`.
    pub fn advance(&self, days: u32) {
        let current = self.today.load();
        if let Some(next) = current.checked_add_days(Days::new(u64::from(days))) {
            self.today.store(next);
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        self.today.load()
    }
}
