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

//! Error types for lending, catalog and roster operations.
//!
//! Every [`LendingError`] belongs to exactly one [`ErrorKind`], the
//! machine-readable class callers branch on. Transport layers map kinds
//! (and occasionally individual variants) to their own status codes.

use crate::base::{BookId, CategoryId, FineId, MemberId, TransactionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse classification of a [`LendingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A referenced book, member, transaction, fine or category is absent.
    NotFound,
    /// The entity exists but is in the wrong state for the operation.
    PreconditionFailed,
    /// Missing or out-of-range input.
    ValidationError,
    /// A contended row could not be locked within the retry budget.
    ConflictRetryExhausted,
    /// The underlying persistence failed.
    StoreUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ConflictRetryExhausted => "ConflictRetryExhausted",
            ErrorKind::StoreUnavailable => "StoreUnavailable",
        };
        f.write_str(name)
    }
}

/// Lending engine errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LendingError {
    #[error("book {0} not found")]
    BookNotFound(BookId),

    #[error("member {0} not found")]
    MemberNotFound(MemberId),

    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    #[error("fine {0} not found")]
    FineNotFound(FineId),

    #[error("category {0} not found")]
    CategoryNotFound(CategoryId),

    /// Every copy of the book is out on loan
    #[error("no copies available")]
    NoCopiesAvailable,

    /// Member status is Expired or Suspended
    #[error("member is not active")]
    MemberNotActive,

    /// Transaction was already closed by an earlier return
    #[error("this book has already been returned")]
    AlreadyReturned,

    /// Returning a copy would push availability above the total
    #[error("available copies would exceed total copies")]
    CapacityExceeded,

    #[error("book has copies out on loan")]
    BookOnLoan,

    #[error("member has unreturned books")]
    MemberHasOpenLoans,

    #[error("fine already paid")]
    FineAlreadyPaid,

    #[error("loan period of {days} days is outside {min}..={max}")]
    LoanPeriodOutOfRange { days: u32, min: u32, max: u32 },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Request body could not be read as the expected shape
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("total copies must be at least 1 and not below copies on loan")]
    InvalidCopies,

    #[error("book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    #[error("member with email {0} already exists")]
    DuplicateEmail(String),

    #[error("category {0} already exists")]
    DuplicateCategory(String),

    #[error("dates are out of order")]
    InvalidDateRange,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),

    #[error("row lock contended beyond retry budget")]
    ConflictRetryExhausted,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LendingError {
    pub fn kind(&self) -> ErrorKind {
        use LendingError::*;
        match self {
            BookNotFound(_) | MemberNotFound(_) | TransactionNotFound(_) | FineNotFound(_)
            | CategoryNotFound(_) => ErrorKind::NotFound,
            NoCopiesAvailable | MemberNotActive | AlreadyReturned | CapacityExceeded
            | BookOnLoan | MemberHasOpenLoans | FineAlreadyPaid => ErrorKind::PreconditionFailed,
            LoanPeriodOutOfRange { .. }
            | MissingField(_)
            | MalformedRequest(_)
            | InvalidCopies
            | DuplicateIsbn(_)
            | DuplicateEmail(_)
            | DuplicateCategory(_)
            | InvalidDateRange
            | InvalidConfig(_)
            | InconsistentSnapshot(_) => ErrorKind::ValidationError,
            ConflictRetryExhausted => ErrorKind::ConflictRetryExhausted,
            StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Stable reason code, e.g. `NO_COPIES_AVAILABLE`.
    pub fn code(&self) -> &'static str {
        use LendingError::*;
        match self {
            BookNotFound(_) => "BOOK_NOT_FOUND",
            MemberNotFound(_) => "MEMBER_NOT_FOUND",
            TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            FineNotFound(_) => "FINE_NOT_FOUND",
            CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            NoCopiesAvailable => "NO_COPIES_AVAILABLE",
            MemberNotActive => "MEMBER_NOT_ACTIVE",
            AlreadyReturned => "ALREADY_RETURNED",
            CapacityExceeded => "CAPACITY_EXCEEDED",
            BookOnLoan => "BOOK_ON_LOAN",
            MemberHasOpenLoans => "MEMBER_HAS_OPEN_LOANS",
            FineAlreadyPaid => "FINE_ALREADY_PAID",
            LoanPeriodOutOfRange { .. } => "LOAN_PERIOD_OUT_OF_RANGE",
            MissingField(_) => "MISSING_FIELD",
            MalformedRequest(_) => "MALFORMED_REQUEST",
            InvalidCopies => "INVALID_COPIES",
            DuplicateIsbn(_) => "DUPLICATE_ISBN",
            DuplicateEmail(_) => "DUPLICATE_EMAIL",
            DuplicateCategory(_) => "DUPLICATE_CATEGORY",
            InvalidDateRange => "INVALID_DATE_RANGE",
            InvalidConfig(_) => "INVALID_CONFIG",
            InconsistentSnapshot(_) => "INCONSISTENT_SNAPSHOT",
            ConflictRetryExhausted => "CONFLICT_RETRY_EXHAUSTED",
            StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }
}
