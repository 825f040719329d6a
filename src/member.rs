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

//! Member records.

use crate::base::MemberId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Only `Active` members may borrow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberStatus {
    #[default]
    Active,
    Expired,
    Suspended,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MembershipType {
    Student,
    Teacher,
    #[default]
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub membership_type: MembershipType,
    pub status: MemberStatus,
    pub join_date: NaiveDate,
    pub expiry_date: NaiveDate,
    /// Loans issued and not yet returned. Rebuilt from the ledger on restore.
    #[serde(skip)]
    pub(crate) open_loans: u32,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn open_loans(&self) -> u32 {
        self.open_loans
    }

    pub(crate) fn matches(&self, lowered_needle: &str) -> bool {
        use crate::catalog::contains_ci;
        contains_ci(&self.first_name, lowered_needle)
            || contains_ci(&self.last_name, lowered_needle)
            || contains_ci(&self.full_name(), lowered_needle)
            || contains_ci(&self.email, lowered_needle)
            || self
                .phone
                .as_deref()
                .is_some_and(|p| contains_ci(p, lowered_needle))
    }
}

/// Input for [`crate::Roster::add_member`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub membership_type: Option<MembershipType>,
    pub join_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

/// Partial update for [`crate::Roster::update_member`]. `None` keeps the field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub membership_type: Option<MembershipType>,
    pub expiry_date: Option<NaiveDate>,
    pub status: Option<MemberStatus>,
}
