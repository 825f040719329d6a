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

//! Late-return fines.

use crate::LendingError;
use crate::base::{FineId, IdSequence, TransactionId};
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fines are kept to whole cents.
pub const FINE_PRECISION: u32 = 2;

/// `days_late × per_day`, rounded half away from zero to cents.
///
/// Saturates at `Decimal::MAX`; a validated
/// [`LendingConfig`](crate::LendingConfig) rate never gets there.
pub fn fine_amount(days_late: u32, per_day: Decimal) -> Decimal {
    Decimal::from(days_late)
        .saturating_mul(per_day)
        .round_dp_with_strategy(FINE_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fine {
    pub id: FineId,
    pub transaction_id: TransactionId,
    pub fine_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub assessed_on: NaiveDate,
    pub payment_date: Option<NaiveDate>,
}

/// Fine register, at most one fine per transaction.
#[derive(Debug, Default)]
pub struct FineBook {
    fines: DashMap<FineId, Fine>,
    by_transaction: DashMap<TransactionId, FineId>,
    fine_ids: IdSequence,
}

impl FineBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an unpaid fine. Only called from a return, under the
    /// transaction's row lock, so a transaction is never fined twice.
    pub(crate) fn assess(
        &self,
        transaction_id: TransactionId,
        amount: Decimal,
        today: NaiveDate,
    ) -> Fine {
        let fine = Fine {
            id: FineId(self.fine_ids.next()),
            transaction_id,
            fine_amount: amount,
            payment_status: PaymentStatus::Unpaid,
            assessed_on: today,
            payment_date: None,
        };
        self.by_transaction.insert(transaction_id, fine.id);
        self.fines.insert(fine.id, fine.clone());
        fine
    }

    /// Marks a fine paid on `today`.
    ///
    /// # Errors
    ///
    /// - [`LendingError::FineNotFound`] for an unknown id.
    /// - [`LendingError::FineAlreadyPaid`] if it was settled before.
    pub fn pay(&self, id: FineId, today: NaiveDate) -> Result<Fine, LendingError> {
        let mut fine = self.fines.get_mut(&id).ok_or(LendingError::FineNotFound(id))?;
        if fine.payment_status == PaymentStatus::Paid {
            return Err(LendingError::FineAlreadyPaid);
        }
        fine.payment_status = PaymentStatus::Paid;
        fine.payment_date = Some(today);
        info!(fine = %id, amount = %fine.fine_amount, "fine paid");
        Ok(fine.clone())
    }

    pub fn fine(&self, id: FineId) -> Result<Fine, LendingError> {
        self.fines
            .get(&id)
            .map(|f| f.clone())
            .ok_or(LendingError::FineNotFound(id))
    }

    pub fn fine_for_transaction(&self, transaction_id: TransactionId) -> Option<Fine> {
        let id = *self.by_transaction.get(&transaction_id)?;
        self.fines.get(&id).map(|f| f.clone())
    }

    /// All fines in id order.
    pub fn fines(&self) -> Vec<Fine> {
        let mut fines: Vec<Fine> = self.fines.iter().map(|f| f.clone()).collect();
        fines.sort_by_key(|f| f.id);
        fines
    }

    /// Sum of fines not yet paid.
    pub fn unpaid_total(&self) -> Decimal {
        self.fines
            .iter()
            .filter(|f| f.payment_status == PaymentStatus::Unpaid)
            .map(|f| f.fine_amount)
            .sum()
    }

    pub(crate) fn restore(&self, fines: Vec<Fine>) -> Result<(), LendingError> {
        for fine in fines {
            if fine.fine_amount < Decimal::ZERO {
                return Err(LendingError::InconsistentSnapshot(format!(
                    "fine {} has a negative amount",
                    fine.id
                )));
            }
            if self.by_transaction.insert(fine.transaction_id, fine.id).is_some() {
                return Err(LendingError::InconsistentSnapshot(format!(
                    "transaction {} is fined twice",
                    fine.transaction_id
                )));
            }
            self.fine_ids.observe(fine.id.0);
            self.fines.insert(fine.id, fine);
        }
        Ok(())
    }
}
