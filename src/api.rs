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

//! Request and response bodies for the HTTP lending endpoints.
//!
//! These are transport shapes only; any web framework can wrap them. See
//! `demos/server.rs` for an axum server built on them.

use crate::base::{BookId, MemberId, StaffId, TransactionId};
use crate::engine::{IssueRequest, ReturnReceipt};
use crate::error::ErrorKind;
use crate::transaction::{Transaction, TransactionStatus};
use crate::LendingError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /transactions/issue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBookRequest {
    pub book_id: BookId,
    pub member_id: MemberId,
    pub staff_id: StaffId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl From<IssueBookRequest> for IssueRequest {
    fn from(request: IssueBookRequest) -> Self {
        IssueRequest {
            book_id: request.book_id,
            member_id: request.member_id,
            staff_id: request.staff_id,
            loan_days: request.days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBookResponse {
    pub transaction_id: TransactionId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: TransactionStatus,
}

impl From<&Transaction> for IssueBookResponse {
    fn from(transaction: &Transaction) -> Self {
        IssueBookResponse {
            transaction_id: transaction.id(),
            issue_date: transaction.issue_date(),
            due_date: transaction.due_date(),
            status: transaction.status(),
        }
    }
}

/// Body of `POST /transactions/return`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBookRequest {
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBookResponse {
    pub transaction_id: TransactionId,
    pub return_date: NaiveDate,
    pub status: TransactionStatus,
    pub fine_amount: Decimal,
}

impl From<&ReturnReceipt> for ReturnBookResponse {
    fn from(receipt: &ReturnReceipt) -> Self {
        ReturnBookResponse {
            transaction_id: receipt.transaction.id(),
            return_date: receipt.returned_on,
            status: receipt.transaction.status(),
            fine_amount: receipt.fine_amount,
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

impl From<&LendingError> for ErrorResponse {
    fn from(err: &LendingError) -> Self {
        ErrorResponse {
            kind: err.kind(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl LendingError {
    /// HTTP status for this error.
    ///
    /// | Error | Status |
    /// |-------|--------|
    /// | any `NotFound` | 404 |
    /// | `NoCopiesAvailable`, `ConflictRetryExhausted` | 409 |
    /// | `StoreUnavailable` | 503 |
    /// | everything else | 400 |
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::ConflictRetryExhausted => 409,
            ErrorKind::StoreUnavailable => 503,
            ErrorKind::PreconditionFailed if *self == LendingError::NoCopiesAvailable => 409,
            ErrorKind::PreconditionFailed | ErrorKind::ValidationError => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_request_days_is_optional() {
        let request: IssueBookRequest =
            serde_json::from_str(r#"{"book_id":1,"member_id":2,"staff_id":3}"#).unwrap();
        assert_eq!(request.days, None);
        let engine_request = IssueRequest::from(request);
        assert_eq!(engine_request.book_id, BookId(1));
        assert_eq!(engine_request.loan_days, None);
    }

    #[test]
    fn statuses_follow_contract() {
        assert_eq!(LendingError::BookNotFound(BookId(1)).http_status(), 404);
        assert_eq!(LendingError::NoCopiesAvailable.http_status(), 409);
        assert_eq!(LendingError::ConflictRetryExhausted.http_status(), 409);
        assert_eq!(LendingError::MemberNotActive.http_status(), 400);
        assert_eq!(LendingError::AlreadyReturned.http_status(), 400);
        assert_eq!(
            LendingError::LoanPeriodOutOfRange {
                days: 0,
                min: 1,
                max: 90
            }
            .http_status(),
            400
        );
        assert_eq!(LendingError::StoreUnavailable("io".into()).http_status(), 503);
    }

    #[test]
    fn return_response_uses_receipt_date() {
        use crate::calendar::ManualClock;
        use crate::catalog::NewBook;
        use crate::member::NewMember;
        use crate::{Engine, LendingConfig};
        use rust_decimal_macros::dec;
        use std::sync::Arc;

        let issued_on = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let clock = Arc::new(ManualClock::new(issued_on));
        let engine = Engine::with_clock(LendingConfig::new(dec!(0.20)), clock.clone()).unwrap();
        let category = engine.catalog().add_category("Poetry").unwrap();
        let book = engine
            .catalog()
            .add_book(NewBook {
                isbn: "isbn-9".into(),
                title: "Odes".into(),
                category_id: category.id,
                authors: vec!["Keats".into()],
                total_copies: 1,
                ..Default::default()
            })
            .unwrap();
        let member = engine
            .roster()
            .add_member(NewMember {
                first_name: "Fanny".into(),
                last_name: "Brawne".into(),
                email: "fanny@example.com".into(),
                phone: None,
                address: None,
                membership_type: None,
                join_date: issued_on,
                expiry_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            })
            .unwrap();
        let loan = engine
            .issue_book(IssueRequest {
                book_id: book.id,
                member_id: member.id,
                staff_id: StaffId(1),
                loan_days: Some(7),
            })
            .unwrap();

        clock.advance(10);
        let receipt = engine.return_book(loan.id()).unwrap();
        let body = ReturnBookResponse::from(&receipt);
        assert_eq!(body.return_date, NaiveDate::from_ymd_opt(2025, 2, 11).unwrap());
        assert_eq!(Some(body.return_date), receipt.transaction.return_date());
        assert_eq!(body.status, TransactionStatus::Returned);
        assert_eq!(body.fine_amount, dec!(0.60));
    }

    #[test]
    fn malformed_request_is_a_bad_request() {
        let err = LendingError::MalformedRequest("missing field `book_id`".into());
        assert_eq!(err.http_status(), 400);
        let body = ErrorResponse::from(&err);
        assert_eq!(body.kind, ErrorKind::ValidationError);
        assert_eq!(body.code, "MALFORMED_REQUEST");
    }

    #[test]
    fn error_body_carries_kind_and_code() {
        let body = ErrorResponse::from(&LendingError::AlreadyReturned);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "PreconditionFailed");
        assert_eq!(json["code"], "ALREADY_RETURNED");
        assert_eq!(json["message"], "this book has already been returned");
    }
}
