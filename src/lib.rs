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

//! # Library Lending
//!
//! This library provides a circulation engine for a lending library:
//! issuing books to members, taking them back, tracking overdue loans and
//! charging fines for late returns.
//!
//! ## Core Components
//!
//! - [`Engine`]: Issues and returns books, owns all loan state
//! - [`Catalog`]: Books, categories and authors with copy counts
//! - [`Roster`]: Members and their status
//! - [`Transaction`]: One loan, `Issued` until returned
//! - [`LendingError`]: Error types, each classified by an [`ErrorKind`]
//!
//! ## Example
//!
//! ```
//! use library_lending_rs::{
//!     Engine, IssueRequest, LendingConfig, ManualClock, NewBook, NewMember, StaffId,
//! };
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
//! let engine = Engine::with_clock(LendingConfig::new(dec!(0.25)), clock.clone()).unwrap();
//!
//! let category = engine.catalog().add_category("Fiction").unwrap();
//! let book = engine
//!     .catalog()
//!     .add_book(NewBook {
//!         isbn: "978-0441013593".into(),
//!         title: "Dune".into(),
//!         category_id: category.id,
//!         authors: vec!["Frank Herbert".into()],
//!         total_copies: 1,
//!         ..Default::default()
//!     })
//!     .unwrap();
//! let member = engine
//!     .roster()
//!     .add_member(NewMember {
//!         first_name: "Paul".into(),
//!         last_name: "Atreides".into(),
//!         email: "paul@example.com".into(),
//!         phone: None,
//!         address: None,
//!         membership_type: None,
//!         join_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!         expiry_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
//!     })
//!     .unwrap();
//!
//! let loan = engine
//!     .issue_book(IssueRequest {
//!         book_id: book.id,
//!         member_id: member.id,
//!         staff_id: StaffId(1),
//!         loan_days: None,
//!     })
//!     .unwrap();
//!
//! // Four days past the 14 day loan.
//! clock.advance(18);
//! let receipt = engine.return_book(loan.id()).unwrap();
//! assert_eq!(receipt.fine_amount, dec!(1.00));
//! ```
//!
//! ## Thread Safety
//!
//! The engine is `Sync`; share it behind an `Arc` and call it from any
//! number of threads. Loans of different books never contend.

pub mod api;
mod base;
mod book;
pub mod calendar;
mod catalog;
mod config;
mod engine;
pub mod error;
mod fine;
mod ledger;
mod lock;
mod member;
pub mod report;
mod roster;
mod snapshot;
mod transaction;

pub use base::{AuthorId, BookId, CategoryId, FineId, MemberId, StaffId, TransactionId};
pub use book::{Book, BookRecord};
pub use calendar::{Clock, ManualClock, SystemClock};
pub use catalog::{Author, BookDetails, BookUpdate, Catalog, Category, NewBook};
pub use config::LendingConfig;
pub use engine::{BorrowedBook, Engine, IssueRequest, ReturnReceipt, TransactionFilter};
pub use error::{ErrorKind, LendingError};
pub use fine::{Fine, FineBook, PaymentStatus, fine_amount};
pub use ledger::Ledger;
pub use lock::LockBudget;
pub use member::{Member, MemberStatus, MemberUpdate, MembershipType, NewMember};
pub use report::Reports;
pub use roster::Roster;
pub use snapshot::LibrarySnapshot;
pub use transaction::{Transaction, TransactionStatus};
