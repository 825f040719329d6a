//! Simple REST API server example for the lending engine.
//!
//! Run with: `cargo run --example server -- --fine-per-day 0.50`
//!
//! The server starts with one book (id 1, two copies) and one member
//! (id 1) so the endpoints can be tried straight away. The fine rate is
//! required: pass `--fine-per-day` or set `LIBRARY_FINE_PER_DAY`.
//!
//! Malformed request bodies get `400` with a `ValidationError` body, like
//! every other invalid input.
//!
//! ## Endpoints
//!
//! - `POST /transactions/issue` - Issue a book to a member
//! - `POST /transactions/return` - Return an issued book
//! - `GET /transactions/:id` - Get a transaction by ID
//! - `GET /books` - List the catalog
//! - `GET /reports/overdue` - Overdue loans, most overdue first
//!
//! ## Example Usage
//!
//! ```bash
//! # Issue
//! curl -X POST http://localhost:3000/transactions/issue \
//!   -H "Content-Type: application/json" \
//!   -d '{"book_id": 1, "member_id": 1, "staff_id": 1, "days": 14}'
//!
//! # Return
//! curl -X POST http://localhost:3000/transactions/return \
//!   -H "Content-Type: application/json" \
//!   -d '{"transaction_id": 1}'
//!
//! # Get transaction
//! curl http://localhost:3000/transactions/1
//! ```

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, Months};
use clap::Parser;
use library_lending_rs::api::{
    ErrorResponse, IssueBookRequest, IssueBookResponse, ReturnBookRequest, ReturnBookResponse,
};
use library_lending_rs::report::OverdueLoan;
use library_lending_rs::{
    BookDetails, Engine, LendingConfig, LendingError, NewBook, NewMember, Transaction,
    TransactionId,
};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

// === Arguments ===

/// Lending API server
#[derive(Parser, Debug)]
#[command(name = "server", about = "REST API for the lending engine", long_about = None)]
struct Args {
    /// Fine charged per day late
    #[arg(long, env = "LIBRARY_FINE_PER_DAY")]
    fine_per_day: Decimal,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
}

// === Application State ===

/// Shared application state containing the lending engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

// === Error Handling ===

/// Wrapper for converting `LendingError` into HTTP responses.
pub struct AppError(LendingError);

impl From<LendingError> for AppError {
    fn from(err: LendingError) -> Self {
        AppError(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError(LendingError::MalformedRequest(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

// === Handlers ===

/// POST /transactions/issue - Issue a book.
async fn issue_book(
    State(state): State<AppState>,
    payload: Result<Json<IssueBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueBookResponse>), AppError> {
    let Json(request) = payload?;
    let transaction = state.engine.issue_book(request.into())?;
    Ok((
        StatusCode::CREATED,
        Json(IssueBookResponse::from(&transaction)),
    ))
}

/// POST /transactions/return - Return a book.
async fn return_book(
    State(state): State<AppState>,
    payload: Result<Json<ReturnBookRequest>, JsonRejection>,
) -> Result<Json<ReturnBookResponse>, AppError> {
    let Json(request) = payload?;
    let receipt = state.engine.return_book(request.transaction_id)?;
    Ok(Json(ReturnBookResponse::from(&receipt)))
}

/// GET /transactions/:id - Get a transaction.
async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.engine.transaction(TransactionId(id))?))
}

/// GET /books - List the catalog.
async fn list_books(State(state): State<AppState>) -> Json<Vec<BookDetails>> {
    Json(state.engine.catalog().books())
}

/// GET /reports/overdue - Overdue loans.
async fn overdue(State(state): State<AppState>) -> Json<Vec<OverdueLoan>> {
    Json(state.engine.reports().overdue_books())
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/transactions/issue", post(issue_book))
        .route("/transactions/return", post(return_book))
        .route("/transactions/{id}", get(get_transaction))
        .route("/books", get(list_books))
        .route("/reports/overdue", get(overdue))
        .with_state(state)
}

fn seed(engine: &Engine) -> Result<(), LendingError> {
    let today = Local::now().date_naive();
    let category = engine.catalog().add_category("Computing")?;
    engine.catalog().add_book(NewBook {
        isbn: "978-1718503106".into(),
        title: "The Rust Programming Language".into(),
        category_id: category.id,
        authors: vec!["Steve Klabnik".into(), "Carol Nichols".into()],
        total_copies: 2,
        ..Default::default()
    })?;
    engine.roster().add_member(NewMember {
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        email: "grace@example.com".into(),
        phone: None,
        address: None,
        membership_type: None,
        join_date: today,
        expiry_date: today.checked_add_months(Months::new(12)).unwrap_or(today),
    })?;
    Ok(())
}

// === Main ===

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();
    let engine =
        Engine::new(LendingConfig::new(args.fine_per_day)).context("invalid configuration")?;
    seed(&engine).context("seeding demo data")?;

    let state = AppState {
        engine: Arc::new(engine),
    };

    let app = create_router(state);

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    println!("Lending API server running on http://{}", args.listen);
    println!("Fine per day: {}", args.fine_per_day);
    println!();
    println!("Endpoints:");
    println!("  POST /transactions/issue   - Issue a book");
    println!("  POST /transactions/return  - Return a book");
    println!("  GET  /transactions/:id     - Get a transaction");
    println!("  GET  /books                - List the catalog");
    println!("  GET  /reports/overdue      - Overdue loans");

    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
