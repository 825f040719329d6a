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

//! Reporting and snapshot integration tests.

use chrono::NaiveDate;
use library_lending_rs::{
    BookId, Engine, ErrorKind, IssueRequest, LendingConfig, LendingError, LibrarySnapshot,
    ManualClock, MemberId, MemberStatus, MemberUpdate, MembershipType, NewBook, NewMember,
    StaffId, TransactionId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

/// Two categories, three books, three members.
fn seeded(clock: Arc<ManualClock>) -> Engine {
    let engine = Engine::with_clock(LendingConfig::new(dec!(0.50)), clock).unwrap();
    let fiction = engine.catalog().add_category("Fiction").unwrap();
    let science = engine.catalog().add_category("Science").unwrap();
    engine.catalog().add_category("Empty").unwrap();

    for (isbn, title, category, copies) in [
        ("111", "Emma", fiction.id, 2),
        ("222", "Persuasion", fiction.id, 1),
        ("333", "Cosmos", science.id, 3),
    ] {
        engine
            .catalog()
            .add_book(NewBook {
                isbn: isbn.into(),
                title: title.into(),
                category_id: category,
                authors: vec!["Someone".into()],
                total_copies: copies,
                ..Default::default()
            })
            .unwrap();
    }

    for (name, kind) in [
        ("anne", MembershipType::Student),
        ("bea", MembershipType::Student),
        ("cid", MembershipType::Teacher),
    ] {
        engine
            .roster()
            .add_member(NewMember {
                first_name: name.into(),
                last_name: "Elliot".into(),
                email: format!("{name}@example.com"),
                phone: None,
                address: None,
                membership_type: Some(kind),
                join_date: date(1, 1),
                expiry_date: date(12, 31),
            })
            .unwrap();
    }
    engine
}

fn issue(engine: &Engine, book: u32, member: u32, days: u32) -> TransactionId {
    engine
        .issue_book(IssueRequest {
            book_id: BookId(book),
            member_id: MemberId(member),
            staff_id: StaffId(1),
            loan_days: Some(days),
        })
        .unwrap()
        .id()
}

#[test]
fn overdue_books_most_overdue_first_with_estimated_fine() {
    let clock = Arc::new(ManualClock::new(date(3, 1)));
    let engine = seeded(clock.clone());
    issue(&engine, 1, 1, 10); // due 3/11
    issue(&engine, 3, 2, 5); // due 3/6
    issue(&engine, 2, 3, 30); // due 3/31

    clock.set(date(3, 16));
    let overdue = engine.reports().overdue_books();
    assert_eq!(overdue.len(), 2);
    assert_eq!(overdue[0].title, "Cosmos");
    assert_eq!(overdue[0].days_overdue, 10);
    assert_eq!(overdue[0].estimated_fine, dec!(5.00));
    assert_eq!(overdue[0].member_name, "bea Elliot");
    assert_eq!(overdue[0].member_email, "bea@example.com");
    assert_eq!(overdue[1].title, "Emma");
    assert_eq!(overdue[1].days_overdue, 5);
}

#[test]
fn popular_books_rank_by_borrow_count() {
    let clock = Arc::new(ManualClock::new(date(3, 1)));
    let engine = seeded(clock);
    for _ in 0..3 {
        let tx = issue(&engine, 3, 1, 7);
        engine.return_book(tx).unwrap();
    }
    let tx = issue(&engine, 1, 1, 7);
    engine.return_book(tx).unwrap();
    issue(&engine, 2, 2, 7);

    let popular = engine.reports().popular_books(2);
    assert_eq!(popular.len(), 2);
    assert_eq!(popular[0].book_id, BookId(3));
    assert_eq!(popular[0].borrow_count, 3);
    // Tie between books 1 and 2 goes to the lower id.
    assert_eq!(popular[1].book_id, BookId(1));
}

#[test]
fn daily_statistics_count_today() {
    let clock = Arc::new(ManualClock::new(date(4, 1)));
    let engine = seeded(clock.clone());
    let early = issue(&engine, 1, 1, 3); // due 4/4
    clock.set(date(4, 10));
    issue(&engine, 3, 2, 14);
    engine.return_book(early).unwrap(); // 6 days late
    issue(&engine, 3, 3, 14);
    let stale = issue(&engine, 2, 1, 14);
    engine.return_book(stale).unwrap();

    let stats = engine.reports().daily_statistics();
    assert_eq!(stats.date, date(4, 10));
    assert_eq!(stats.issued_today, 3);
    assert_eq!(stats.returned_today, 2);
    assert_eq!(stats.currently_issued, 2);
    assert_eq!(stats.overdue, 0);
    assert_eq!(stats.active_members, 3);
    assert_eq!(stats.total_books, 3);
    assert_eq!(stats.total_copies, 6);
    assert_eq!(stats.available_copies, 4);
    assert_eq!(stats.pending_fines, dec!(3.00));
}

#[test]
fn monthly_report_groups_by_issue_month() {
    let clock = Arc::new(ManualClock::new(date(1, 5)));
    let engine = seeded(clock.clone());
    let jan = issue(&engine, 1, 1, 7);
    issue(&engine, 3, 1, 7);
    clock.set(date(1, 10));
    engine.return_book(jan).unwrap();
    clock.set(date(3, 2));
    issue(&engine, 3, 2, 30);

    let report = engine.reports().monthly_report(2025);
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].month, 1);
    assert_eq!(report[0].issues, 2);
    assert_eq!(report[0].returns, 1);
    assert_eq!(report[0].overdue, 1);
    assert_eq!(report[1].month, 3);
    assert_eq!(report[1].overdue, 0);
    assert!(engine.reports().monthly_report(2024).is_empty());
}

#[test]
fn category_and_member_stats() {
    let clock = Arc::new(ManualClock::new(date(2, 1)));
    let engine = seeded(clock);
    issue(&engine, 1, 1, 7);
    engine
        .roster()
        .update_member(
            MemberId(2),
            MemberUpdate {
                status: Some(MemberStatus::Suspended),
                ..Default::default()
            },
        )
        .unwrap();

    let categories = engine.reports().category_stats();
    assert_eq!(categories.len(), 3);
    assert_eq!(categories[0].category_name, "Fiction");
    assert_eq!(categories[0].book_count, 2);
    assert_eq!(categories[0].total_copies, 3);
    assert_eq!(categories[0].available_copies, 2);
    assert_eq!(categories[2].book_count, 0);

    let members = engine.reports().member_stats();
    assert_eq!(members.len(), 2);
    let students = &members[0];
    assert_eq!(students.membership_type, MembershipType::Student);
    assert_eq!(students.total, 2);
    assert_eq!(students.active, 1);
    assert_eq!(students.suspended, 1);
    assert_eq!(members[1].membership_type, MembershipType::Teacher);
}

#[test]
fn revenue_report_sums_paid_fines_by_day() {
    let clock = Arc::new(ManualClock::new(date(5, 1)));
    let engine = seeded(clock.clone());
    let a = issue(&engine, 1, 1, 1);
    let b = issue(&engine, 3, 2, 1);
    let c = issue(&engine, 2, 3, 1);
    clock.set(date(5, 5)); // three days late: 1.50 each
    let fines: Vec<_> = [a, b, c]
        .into_iter()
        .map(|tx| engine.return_book(tx).unwrap().fine.unwrap().id)
        .collect();

    clock.set(date(5, 6));
    engine.pay_fine(fines[0]).unwrap();
    engine.pay_fine(fines[1]).unwrap();
    clock.set(date(5, 8));
    engine.pay_fine(fines[2]).unwrap();

    let revenue = engine.reports().revenue_report(None, None);
    assert_eq!(revenue.len(), 2);
    assert_eq!(revenue[0].date, date(5, 8));
    assert_eq!(revenue[0].total, dec!(1.50));
    assert_eq!(revenue[1].payments, 2);
    assert_eq!(revenue[1].total, dec!(3.00));

    let bounded = engine.reports().revenue_report(Some(date(5, 7)), None);
    assert_eq!(bounded.len(), 1);
    assert_eq!(engine.fines().unpaid_total(), Decimal::ZERO);
}

#[test]
fn snapshot_round_trip_preserves_loans() {
    let clock = Arc::new(ManualClock::new(date(6, 1)));
    let engine = seeded(clock.clone());
    let open = issue(&engine, 1, 1, 7);
    let closed = issue(&engine, 3, 2, 7);
    clock.set(date(6, 10));
    engine.return_book(closed).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.json");
    engine.snapshot().save(&path).unwrap();

    let restored = Engine::restore(
        LibrarySnapshot::load(&path).unwrap(),
        LendingConfig::new(dec!(0.50)),
        clock.clone(),
    )
    .unwrap();

    assert_eq!(restored.catalog().book(BookId(1)).unwrap().available_copies(), 1);
    assert_eq!(restored.roster().member(MemberId(1)).unwrap().open_loans(), 1);
    assert_eq!(restored.fines().fines().len(), 1);
    assert_eq!(restored.snapshot(), engine.snapshot());

    // The restored engine keeps lending from where it left off.
    let receipt = restored.return_book(open).unwrap();
    assert_eq!(receipt.days_late, 2);
    let next = issue(&restored, 1, 1, 7);
    assert_eq!(next, TransactionId(3));
}

#[test]
fn restore_rejects_broken_conservation() {
    let clock = Arc::new(ManualClock::new(date(6, 1)));
    let engine = seeded(clock.clone());
    issue(&engine, 1, 1, 7);

    let mut snapshot = engine.snapshot();
    snapshot.books[0].available_copies = 2;
    let err = Engine::restore(snapshot, LendingConfig::new(dec!(0.50)), clock).unwrap_err();
    assert!(matches!(err, LendingError::InconsistentSnapshot(_)));
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[test]
fn corrupt_snapshot_is_store_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = LibrarySnapshot::load(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
}
