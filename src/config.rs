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

//! Lending policy configuration.

use crate::LendingError;
use crate::lock::LockBudget;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Lending policy and lock tuning.
///
/// The per-day fine rate has no default: it is library policy and must be
/// supplied by whoever builds the engine.
///
/// # Example
///
/// ```
/// use library_lending_rs::LendingConfig;
/// use rust_decimal_macros::dec;
///
/// let config = LendingConfig::new(dec!(0.50)).with_loan_days(21);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.default_loan_days, 21);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingConfig {
    /// Fine charged per day a book is returned late.
    pub fine_per_day: Decimal,
    /// Loan period used when an issue request does not name one.
    pub default_loan_days: u32,
    pub min_loan_days: u32,
    pub max_loan_days: u32,
    /// Bounded wait for contended book and transaction rows.
    pub lock_budget: LockBudget,
}

impl LendingConfig {
    pub const DEFAULT_LOAN_DAYS: u32 = 14;
    pub const MIN_LOAN_DAYS: u32 = 1;
    pub const MAX_LOAN_DAYS: u32 = 90;
    /// Keeps `days_late × fine_per_day` inside `Decimal` range for any
    /// `u32` day count.
    pub const MAX_FINE_PER_DAY: Decimal = dec!(1_000_000);

    pub fn new(fine_per_day: Decimal) -> Self {
        Self {
            fine_per_day,
            default_loan_days: Self::DEFAULT_LOAN_DAYS,
            min_loan_days: Self::MIN_LOAN_DAYS,
            max_loan_days: Self::MAX_LOAN_DAYS,
            lock_budget: LockBudget::default(),
        }
    }

    pub fn with_loan_days(mut self, days: u32) -> Self {
        self.default_loan_days = days;
        self
    }

    pub fn with_loan_bounds(mut self, min: u32, max: u32) -> Self {
        self.min_loan_days = min;
        self.max_loan_days = max;
        self
    }

    pub fn with_lock_budget(mut self, wait: Duration, retries: u32) -> Self {
        self.lock_budget = LockBudget { wait, retries };
        self
    }

    /// Checks the rate is within `0..=MAX_FINE_PER_DAY` and the loan bounds
    /// are coherent.
    pub fn validate(&self) -> Result<(), LendingError> {
        if self.fine_per_day < Decimal::ZERO {
            return Err(LendingError::InvalidConfig(
                "fine_per_day must not be negative".into(),
            ));
        }
        if self.fine_per_day > Self::MAX_FINE_PER_DAY {
            return Err(LendingError::InvalidConfig(format!(
                "fine_per_day must not exceed {}",
                Self::MAX_FINE_PER_DAY
            )));
        }
        if self.min_loan_days == 0 || self.min_loan_days > self.max_loan_days {
            return Err(LendingError::InvalidConfig(format!(
                "loan bounds {}..={} are invalid",
                self.min_loan_days, self.max_loan_days
            )));
        }
        self.check_loan_days(self.default_loan_days)
            .map_err(|_| {
                LendingError::InvalidConfig(format!(
                    "default loan period {} is outside {}..={}",
                    self.default_loan_days, self.min_loan_days, self.max_loan_days
                ))
            })
    }

    /// Resolves the requested loan period against the configured bounds.
    pub fn loan_days(&self, requested: Option<u32>) -> Result<u32, LendingError> {
        let days = requested.unwrap_or(self.default_loan_days);
        self.check_loan_days(days)?;
        Ok(days)
    }

    fn check_loan_days(&self, days: u32) -> Result<(), LendingError> {
        if (self.min_loan_days..=self.max_loan_days).contains(&days) {
            Ok(())
        } else {
            Err(LendingError::LoanPeriodOutOfRange {
                days,
                min: self.min_loan_days,
                max: self.max_loan_days,
            })
        }
    }
}
