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

//! Bounded row locking.
//!
//! Rows (books, transactions) are acquired with a timed lock so that no
//! write ever waits forever. Lock order across the crate is
//! transaction row, then book row, then map shards.

use crate::LendingError;
use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// How long to wait for a contended row, and how many times to try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockBudget {
    pub wait: Duration,
    pub retries: u32,
}

impl Default for LockBudget {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(50),
            retries: 3,
        }
    }
}

/// Locks `row`, failing with [`LendingError::ConflictRetryExhausted`] once
/// `1 + budget.retries` timed attempts have all expired.
pub(crate) fn lock_row<'a, T>(
    row: &'a Mutex<T>,
    budget: LockBudget,
) -> Result<MutexGuard<'a, T>, LendingError> {
    for attempt in 0..=budget.retries {
        if let Some(guard) = row.try_lock_for(budget.wait) {
            return Ok(guard);
        }
        debug!(attempt, "row lock contended");
    }
    Err(LendingError::ConflictRetryExhausted)
}
