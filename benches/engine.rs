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

//! Benchmarks for the lending engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded issue and return
//! - Multi-threaded lending with varying contention
//! - Read paths: catalog search and reports over a growing ledger
//! - Thread scaling

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use library_lending_rs::{
    BookId, Engine, IssueRequest, LendingConfig, ManualClock, MemberId, NewBook, NewMember,
    StaffId,
};
use rayon::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// An engine on a fixed clock with `books` titles of `copies` each and
/// `members` active members.
fn library(books: u32, copies: u32, members: u32) -> Engine {
    let clock = Arc::new(ManualClock::new(start()));
    let engine = Engine::with_clock(LendingConfig::new(dec!(0.25)), clock).unwrap();
    let category = engine.catalog().add_category("Bench").unwrap();
    for i in 0..books {
        engine
            .catalog()
            .add_book(NewBook {
                isbn: format!("isbn-{i}"),
                title: format!("Title {i}"),
                category_id: category.id,
                authors: vec![format!("Author {}", i % 50)],
                total_copies: copies,
                ..Default::default()
            })
            .unwrap();
    }
    for i in 0..members {
        engine
            .roster()
            .add_member(NewMember {
                first_name: "Reader".into(),
                last_name: i.to_string(),
                email: format!("reader{i}@example.com"),
                phone: None,
                address: None,
                membership_type: None,
                join_date: start(),
                expiry_date: NaiveDate::from_ymd_opt(2035, 1, 1).unwrap(),
            })
            .unwrap();
    }
    engine
}

fn make_issue(book: u32, member: u32) -> IssueRequest {
    IssueRequest {
        book_id: BookId(book),
        member_id: MemberId(member),
        staff_id: StaffId(1),
        loan_days: None,
    }
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_issue(c: &mut Criterion) {
    c.bench_function("single_issue", |b| {
        b.iter_batched(
            || library(1, 1, 1),
            |engine| {
                engine.issue_book(black_box(make_issue(1, 1))).unwrap();
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_issue_return_cycle(c: &mut Criterion) {
    c.bench_function("issue_return_cycle", |b| {
        let engine = library(1, 1, 1);
        b.iter(|| {
            let tx = engine.issue_book(make_issue(1, 1)).unwrap();
            engine.return_book(black_box(tx.id())).unwrap();
        })
    });
}

fn bench_issue_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("issue_throughput");

    for count in [100u32, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || library(1, count, 1),
                |engine| {
                    for _ in 0..count {
                        engine.issue_book(make_issue(1, 1)).unwrap();
                    }
                    black_box(&engine);
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_rejected_issue(c: &mut Criterion) {
    c.bench_function("rejected_issue_no_copies", |b| {
        let engine = library(1, 1, 2);
        engine.issue_book(make_issue(1, 1)).unwrap();
        b.iter(|| {
            let _ = black_box(engine.issue_book(make_issue(1, 2)));
        })
    });
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_lending_different_books(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_lending_different_books");

    for count in [1_000u32, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64 * 2)); // issue + return
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || library(count, 1, count),
                |engine| {
                    (1..=count).into_par_iter().for_each(|i| {
                        let tx = engine.issue_book(make_issue(i, i)).unwrap();
                        engine.return_book(tx.id()).unwrap();
                    });
                    black_box(&engine);
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    let total_ops = 10_000u32;

    // Fewer books means more threads competing for the same row lock.
    for num_books in [1u32, 10, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(total_ops as u64));
        group.bench_with_input(
            BenchmarkId::new("books", num_books),
            num_books,
            |b, &num_books| {
                b.iter_batched(
                    || library(num_books, 4, 100),
                    |engine| {
                        (0..total_ops).into_par_iter().for_each(|i| {
                            let book = i % num_books + 1;
                            let member = i % 100 + 1;
                            if let Ok(tx) = engine.issue_book(make_issue(book, member)) {
                                engine.return_book(tx.id()).unwrap();
                            }
                        });
                        black_box(&engine);
                    },
                    criterion::BatchSize::LargeInput,
                )
            },
        );
    }
    group.finish();
}

// =============================================================================
// Read Path Benchmarks
// =============================================================================

fn bench_search_books(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_books");

    for catalog_size in [100u32, 1_000, 10_000].iter() {
        let engine = library(*catalog_size, 1, 1);
        group.bench_with_input(
            BenchmarkId::from_parameter(catalog_size),
            &engine,
            |b, engine| {
                b.iter(|| black_box(engine.catalog().search_books(black_box("author 7"))))
            },
        );
    }
    group.finish();
}

fn bench_reports(c: &mut Criterion) {
    let mut group = c.benchmark_group("reports");

    // How report cost grows with the ledger.
    for history_size in [100u32, 1_000, 10_000].iter() {
        let engine = library(100, 1_000, 100);
        for i in 0..*history_size {
            let tx = engine.issue_book(make_issue(i % 100 + 1, i % 100 + 1)).unwrap();
            if i % 2 == 0 {
                engine.return_book(tx.id()).unwrap();
            }
        }
        group.bench_with_input(
            BenchmarkId::new("overdue_books", history_size),
            &engine,
            |b, engine| b.iter(|| black_box(engine.reports().overdue_books())),
        );
        group.bench_with_input(
            BenchmarkId::new("daily_statistics", history_size),
            &engine,
            |b, engine| b.iter(|| black_box(engine.reports().daily_statistics())),
        );
    }
    group.finish();
}

// =============================================================================
// Scaling Benchmarks
// =============================================================================

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    let total_ops = 20_000u32;

    for num_threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(total_ops as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                // Configure rayon thread pool for this benchmark
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .unwrap();

                b.iter_batched(
                    || library(1_000, 2, 1_000),
                    |engine| {
                        pool.install(|| {
                            (0..total_ops).into_par_iter().for_each(|i| {
                                let id = i % 1_000 + 1;
                                if let Ok(tx) = engine.issue_book(make_issue(id, id)) {
                                    engine.return_book(tx.id()).unwrap();
                                }
                            });
                        });
                        black_box(&engine);
                    },
                    criterion::BatchSize::LargeInput,
                )
            },
        );
    }
    group.finish();
}

// =============================================================================
// Criterion Groups
// =============================================================================

criterion_group!(
    single_threaded,
    bench_single_issue,
    bench_issue_return_cycle,
    bench_issue_throughput,
    bench_rejected_issue,
);

criterion_group!(
    multi_threaded,
    bench_parallel_lending_different_books,
    bench_contention,
);

criterion_group!(read_paths, bench_search_books, bench_reports);

criterion_group!(scaling, bench_thread_scaling);

criterion_main!(single_threaded, multi_threaded, read_paths, scaling);
