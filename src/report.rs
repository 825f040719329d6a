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

//! Read-only rollups.
//!
//! Reports copy rows out one at a time and never take a global lock, so a
//! report running alongside writers sees each row as of some committed
//! state. Overdue figures are evaluated against the engine clock.

use crate::base::{BookId, CategoryId, MemberId, TransactionId};
use crate::engine::Engine;
use crate::fine::{self, PaymentStatus};
use crate::member::{MemberStatus, MembershipType};
use crate::transaction::Transaction;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueLoan {
    pub transaction_id: TransactionId,
    pub book_id: BookId,
    pub title: String,
    pub isbn: String,
    pub member_id: MemberId,
    pub member_name: String,
    pub member_email: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub days_overdue: u32,
    /// What the fine would be if the book came back today.
    pub estimated_fine: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularBook {
    pub book_id: BookId,
    pub title: String,
    pub isbn: String,
    pub borrow_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub issued_today: usize,
    pub returned_today: usize,
    pub currently_issued: usize,
    pub overdue: usize,
    pub active_members: usize,
    pub total_books: usize,
    pub total_copies: u64,
    pub available_copies: u64,
    pub pending_fines: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub month: u32,
    pub issues: usize,
    pub returns: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category_id: CategoryId,
    pub category_name: String,
    pub book_count: usize,
    pub total_copies: u64,
    pub available_copies: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberStats {
    pub membership_type: MembershipType,
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub suspended: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueDay {
    pub date: NaiveDate,
    pub payments: usize,
    pub total: Decimal,
}

/// Report view over an [`Engine`], see [`Engine::reports`].
#[derive(Debug, Clone, Copy)]
pub struct Reports<'a> {
    engine: &'a Engine,
}

impl<'a> Reports<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    fn open_loans(&self) -> Vec<Transaction> {
        self.engine
            .ledger
            .all()
            .into_iter()
            .filter(Transaction::is_open)
            .collect()
    }

    /// Open loans past their due date, most overdue first.
    pub fn overdue_books(&self) -> Vec<OverdueLoan> {
        let today = self.engine.today();
        let rate = self.engine.config.fine_per_day;
        let mut loans: Vec<OverdueLoan> = self
            .open_loans()
            .into_iter()
            .filter(|t| t.days_overdue(today) > 0)
            .filter_map(|t| {
                let book = self.engine.catalog.book(t.book_id()).ok()?;
                let member = self.engine.roster.member(t.member_id()).ok()?;
                let days_overdue = t.days_overdue(today);
                Some(OverdueLoan {
                    transaction_id: t.id(),
                    book_id: t.book_id(),
                    title: book.title(),
                    isbn: book.isbn(),
                    member_id: member.id,
                    member_name: member.full_name(),
                    member_email: member.email,
                    issue_date: t.issue_date(),
                    due_date: t.due_date(),
                    days_overdue,
                    estimated_fine: fine::fine_amount(days_overdue, rate),
                })
            })
            .collect();
        loans.sort_by(|a, b| {
            b.days_overdue
                .cmp(&a.days_overdue)
                .then(a.transaction_id.cmp(&b.transaction_id))
        });
        loans
    }

    /// Most borrowed books, ties broken by id.
    pub fn popular_books(&self, limit: usize) -> Vec<PopularBook> {
        let mut counts: HashMap<BookId, usize> = HashMap::new();
        for transaction in self.engine.ledger.all() {
            *counts.entry(transaction.book_id()).or_default() += 1;
        }
        let mut ranked: Vec<(BookId, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .filter_map(|(book_id, borrow_count)| {
                // Books removed since are skipped.
                let book = self.engine.catalog.book(book_id).ok()?;
                Some(PopularBook {
                    book_id,
                    title: book.title(),
                    isbn: book.isbn(),
                    borrow_count,
                })
            })
            .take(limit)
            .collect()
    }

    pub fn daily_statistics(&self) -> DailyStatistics {
        let today = self.engine.today();
        let transactions = self.engine.ledger.all();
        let records = self.engine.catalog.records();

        DailyStatistics {
            date: today,
            issued_today: transactions.iter().filter(|t| t.issue_date() == today).count(),
            returned_today: transactions
                .iter()
                .filter(|t| t.return_date() == Some(today))
                .count(),
            currently_issued: transactions.iter().filter(|t| t.is_open()).count(),
            overdue: transactions.iter().filter(|t| t.days_overdue(today) > 0).count(),
            active_members: self.engine.roster.members(Some(MemberStatus::Active)).len(),
            total_books: records.len(),
            total_copies: records.iter().map(|r| u64::from(r.total_copies)).sum(),
            available_copies: records.iter().map(|r| u64::from(r.available_copies)).sum(),
            pending_fines: self.engine.fines.unpaid_total(),
        }
    }

    /// Per month of issue within `year`; months without issues are omitted.
    pub fn monthly_report(&self, year: i32) -> Vec<MonthlySummary> {
        let today = self.engine.today();
        let mut months: BTreeMap<u32, MonthlySummary> = BTreeMap::new();
        for t in self.engine.ledger.all() {
            if t.issue_date().year() != year {
                continue;
            }
            let month = t.issue_date().month();
            let summary = months.entry(month).or_insert(MonthlySummary {
                month,
                issues: 0,
                returns: 0,
                overdue: 0,
            });
            summary.issues += 1;
            if t.return_date().is_some() {
                summary.returns += 1;
            }
            if t.days_overdue(today) > 0 {
                summary.overdue += 1;
            }
        }
        months.into_values().collect()
    }

    /// Every category with its books, busiest first.
    pub fn category_stats(&self) -> Vec<CategoryStats> {
        let records = self.engine.catalog.records();
        let mut stats: Vec<CategoryStats> = self
            .engine
            .catalog
            .categories()
            .into_iter()
            .map(|category| {
                let books = records.iter().filter(|r| r.category_id == category.id);
                let mut entry = CategoryStats {
                    category_id: category.id,
                    category_name: category.name,
                    book_count: 0,
                    total_copies: 0,
                    available_copies: 0,
                };
                for record in books {
                    entry.book_count += 1;
                    entry.total_copies += u64::from(record.total_copies);
                    entry.available_copies += u64::from(record.available_copies);
                }
                entry
            })
            .collect();
        stats.sort_by(|a, b| b.book_count.cmp(&a.book_count));
        stats
    }

    pub fn member_stats(&self) -> Vec<MemberStats> {
        let mut by_type: BTreeMap<MembershipType, MemberStats> = BTreeMap::new();
        for member in self.engine.roster.members(None) {
            let stats = by_type
                .entry(member.membership_type)
                .or_insert(MemberStats {
                    membership_type: member.membership_type,
                    total: 0,
                    active: 0,
                    expired: 0,
                    suspended: 0,
                });
            stats.total += 1;
            match member.status {
                MemberStatus::Active => stats.active += 1,
                MemberStatus::Expired => stats.expired += 1,
                MemberStatus::Suspended => stats.suspended += 1,
            }
        }
        by_type.into_values().collect()
    }

    /// Paid fines per payment date, newest first. Bounds are inclusive.
    pub fn revenue_report(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<RevenueDay> {
        let mut days: BTreeMap<NaiveDate, RevenueDay> = BTreeMap::new();
        for fine in self.engine.fines.fines() {
            if fine.payment_status != PaymentStatus::Paid {
                continue;
            }
            let Some(date) = fine.payment_date else {
                continue;
            };
            if from.is_some_and(|f| date < f) || to.is_some_and(|t| date > t) {
                continue;
            }
            let day = days.entry(date).or_insert(RevenueDay {
                date,
                payments: 0,
                total: Decimal::ZERO,
            });
            day.payments += 1;
            day.total += fine.fine_amount;
        }
        days.into_values().rev().collect()
    }
}
