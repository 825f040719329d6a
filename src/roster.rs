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

//! Membership store.
//!
//! Members sit directly in a [`DashMap`]; a member entry is only ever held
//! as the innermost lock (the engine takes it while already holding a book
//! row), and the email index is only touched after or without it.

use crate::LendingError;
use crate::base::{IdSequence, MemberId};
use crate::member::{Member, MemberStatus, MemberUpdate, NewMember};
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;

fn required(value: &str, field: &'static str) -> Result<String, LendingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LendingError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Default)]
pub struct Roster {
    members: DashMap<MemberId, Member>,
    /// Lower-cased email to member id.
    email_index: DashMap<String, MemberId>,
    member_ids: IdSequence,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new, active member.
    ///
    /// # Errors
    ///
    /// - [`LendingError::MissingField`] for blank names or email.
    /// - [`LendingError::InvalidDateRange`] when expiry precedes joining.
    /// - [`LendingError::DuplicateEmail`] when the email is taken.
    pub fn add_member(&self, new_member: NewMember) -> Result<Member, LendingError> {
        let first_name = required(&new_member.first_name, "first_name")?;
        let last_name = required(&new_member.last_name, "last_name")?;
        let email = required(&new_member.email, "email")?;
        if new_member.expiry_date < new_member.join_date {
            return Err(LendingError::InvalidDateRange);
        }

        let id = match self.email_index.entry(email.to_lowercase()) {
            Entry::Occupied(_) => return Err(LendingError::DuplicateEmail(email)),
            Entry::Vacant(entry) => {
                let id = MemberId(self.member_ids.next());
                entry.insert(id);
                id
            }
        };

        let member = Member {
            id,
            first_name,
            last_name,
            email,
            phone: new_member.phone,
            address: new_member.address,
            membership_type: new_member.membership_type.unwrap_or_default(),
            status: MemberStatus::Active,
            join_date: new_member.join_date,
            expiry_date: new_member.expiry_date,
            open_loans: 0,
        };
        self.members.insert(id, member.clone());
        info!(member = %id, "member added");
        Ok(member)
    }

    pub fn member(&self, id: MemberId) -> Result<Member, LendingError> {
        self.members
            .get(&id)
            .map(|m| m.clone())
            .ok_or(LendingError::MemberNotFound(id))
    }

    /// Members newest first, optionally filtered by status.
    pub fn members(&self, status: Option<MemberStatus>) -> Vec<Member> {
        let mut members: Vec<Member> = self
            .members
            .iter()
            .filter(|m| status.is_none_or(|s| m.status == s))
            .map(|m| m.clone())
            .collect();
        members.sort_by(|a, b| b.id.cmp(&a.id));
        members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Case-insensitive search over names, email and phone.
    pub fn search_members(&self, query: &str) -> Vec<Member> {
        let needle = query.trim().to_lowercase();
        self.members(None)
            .into_iter()
            .filter(|m| needle.is_empty() || m.matches(&needle))
            .collect()
    }

    /// Applies a partial update. Status changes (suspend, reinstate) go
    /// through here too.
    pub fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<Member, LendingError> {
        let first_name = update
            .first_name
            .as_deref()
            .map(|v| required(v, "first_name"))
            .transpose()?;
        let last_name = update
            .last_name
            .as_deref()
            .map(|v| required(v, "last_name"))
            .transpose()?;
        let email = update.email.as_deref().map(|v| required(v, "email")).transpose()?;

        let mut member = self
            .members
            .get_mut(&id)
            .ok_or(LendingError::MemberNotFound(id))?;

        if let Some(expiry) = update.expiry_date {
            if expiry < member.join_date {
                return Err(LendingError::InvalidDateRange);
            }
        }
        if let Some(email) = email.filter(|e| !e.eq_ignore_ascii_case(&member.email)) {
            match self.email_index.entry(email.to_lowercase()) {
                Entry::Occupied(_) => return Err(LendingError::DuplicateEmail(email)),
                Entry::Vacant(entry) => {
                    entry.insert(id);
                }
            }
            self.email_index.remove(&member.email.to_lowercase());
            member.email = email;
        }

        if let Some(first_name) = first_name {
            member.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            member.last_name = last_name;
        }
        if update.phone.is_some() {
            member.phone = update.phone;
        }
        if update.address.is_some() {
            member.address = update.address;
        }
        if let Some(membership_type) = update.membership_type {
            member.membership_type = membership_type;
        }
        if let Some(expiry) = update.expiry_date {
            member.expiry_date = expiry;
        }
        if let Some(status) = update.status {
            member.status = status;
        }

        info!(member = %id, status = ?member.status, "member updated");
        Ok(member.clone())
    }

    /// Removes a member who holds no unreturned books.
    pub fn remove_member(&self, id: MemberId) -> Result<Member, LendingError> {
        match self.members.remove_if(&id, |_, m| m.open_loans == 0) {
            Some((_, member)) => {
                self.email_index.remove(&member.email.to_lowercase());
                info!(member = %id, "member removed");
                Ok(member)
            }
            None if self.members.contains_key(&id) => Err(LendingError::MemberHasOpenLoans),
            None => Err(LendingError::MemberNotFound(id)),
        }
    }

    /// Marks active members whose membership lapsed before `today` as
    /// expired. Returns how many changed.
    pub fn expire_lapsed(&self, today: NaiveDate) -> usize {
        let mut expired = 0;
        for mut member in self.members.iter_mut() {
            if member.status == MemberStatus::Active && member.expiry_date < today {
                member.status = MemberStatus::Expired;
                expired += 1;
            }
        }
        if expired > 0 {
            info!(expired, %today, "lapsed memberships expired");
        }
        expired
    }

    // === Engine hooks ===

    /// Checks the member may borrow and counts the new loan, atomically
    /// with respect to other writers of this member.
    pub(crate) fn begin_loan(&self, id: MemberId) -> Result<(), LendingError> {
        let mut member = self
            .members
            .get_mut(&id)
            .ok_or(LendingError::MemberNotFound(id))?;
        if !member.is_active() {
            return Err(LendingError::MemberNotActive);
        }
        member.open_loans += 1;
        Ok(())
    }

    pub(crate) fn end_loan(&self, id: MemberId) {
        if let Some(mut member) = self.members.get_mut(&id) {
            member.open_loans = member.open_loans.saturating_sub(1);
        }
    }

    pub(crate) fn set_open_loans(&self, id: MemberId, count: u32) {
        if let Some(mut member) = self.members.get_mut(&id) {
            member.open_loans = count;
        }
    }

    pub(crate) fn restore(&self, members: Vec<Member>) -> Result<(), LendingError> {
        for mut member in members {
            if self
                .email_index
                .insert(member.email.to_lowercase(), member.id)
                .is_some()
            {
                return Err(LendingError::DuplicateEmail(member.email));
            }
            member.open_loans = 0;
            self.member_ids.observe(member.id.0);
            self.members.insert(member.id, member);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_member(email: &str) -> NewMember {
        NewMember {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            phone: Some("555-0100".into()),
            address: None,
            membership_type: None,
            join_date: date(2025, 1, 1),
            expiry_date: date(2025, 12, 31),
        }
    }

    #[test]
    fn begin_loan_requires_active_status() {
        let roster = Roster::new();
        let member = roster.add_member(new_member("ada@example.com")).unwrap();
        roster.begin_loan(member.id).unwrap();
        assert_eq!(roster.member(member.id).unwrap().open_loans(), 1);

        roster
            .update_member(
                member.id,
                MemberUpdate {
                    status: Some(MemberStatus::Suspended),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(roster.begin_loan(member.id), Err(LendingError::MemberNotActive));
        assert_eq!(roster.member(member.id).unwrap().open_loans(), 1);
    }

    #[test]
    fn remove_member_with_open_loan_fails() {
        let roster = Roster::new();
        let member = roster.add_member(new_member("ada@example.com")).unwrap();
        roster.begin_loan(member.id).unwrap();
        assert_eq!(
            roster.remove_member(member.id),
            Err(LendingError::MemberHasOpenLoans)
        );
        roster.end_loan(member.id);
        roster.remove_member(member.id).unwrap();
        assert_eq!(
            roster.remove_member(member.id),
            Err(LendingError::MemberNotFound(member.id))
        );
    }

    #[test]
    fn email_change_updates_index() {
        let roster = Roster::new();
        let ada = roster.add_member(new_member("ada@example.com")).unwrap();
        roster.add_member(new_member("bob@example.com")).unwrap();

        let clash = MemberUpdate {
            email: Some("BOB@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            roster.update_member(ada.id, clash),
            Err(LendingError::DuplicateEmail(_))
        ));

        let change = MemberUpdate {
            email: Some("countess@example.com".into()),
            ..Default::default()
        };
        roster.update_member(ada.id, change).unwrap();
        // Old address is free again.
        assert!(roster.add_member(new_member("ada@example.com")).is_ok());
    }

    #[test]
    fn expire_lapsed_only_touches_active_members() {
        let roster = Roster::new();
        let ada = roster.add_member(new_member("ada@example.com")).unwrap();
        let bob = roster.add_member(new_member("bob@example.com")).unwrap();
        roster
            .update_member(
                bob.id,
                MemberUpdate {
                    status: Some(MemberStatus::Suspended),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(roster.expire_lapsed(date(2025, 12, 31)), 0);
        assert_eq!(roster.expire_lapsed(date(2026, 1, 1)), 1);
        assert_eq!(roster.member(ada.id).unwrap().status, MemberStatus::Expired);
        assert_eq!(roster.member(bob.id).unwrap().status, MemberStatus::Suspended);
    }
}
