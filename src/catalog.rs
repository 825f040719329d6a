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

//! Book catalog: categories, authors and book rows.
//!
//! Unique keys (ISBN, category name, author name) are enforced with the
//! [`DashMap`] entry API so that concurrent inserts cannot both win. Index
//! reservations are released before the row map is touched, so no two map
//! shards are ever held at once here.

use crate::LendingError;
use crate::base::{AuthorId, BookId, CategoryId, IdSequence};
use crate::book::{Book, BookRecord};
use crate::lock::{LockBudget, lock_row};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
}

/// Input for [`Catalog::add_book`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub category_id: CategoryId,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub price: Option<Decimal>,
    /// Author names; unknown names are registered on the fly.
    pub authors: Vec<String>,
    pub total_copies: u32,
}

/// Partial update for [`Catalog::update_book`]. `None` keeps the field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookUpdate {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub category_id: Option<CategoryId>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub price: Option<Decimal>,
    pub total_copies: Option<u32>,
}

/// A book joined with its category and author names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookDetails {
    #[serde(flatten)]
    pub record: BookRecord,
    pub category_name: Option<String>,
    pub author_names: Vec<String>,
}

impl BookDetails {
    fn matches(&self, needle: &str) -> bool {
        let record = &self.record;
        contains_ci(&record.title, needle)
            || contains_ci(&record.isbn, needle)
            || record
                .publisher
                .as_deref()
                .is_some_and(|p| contains_ci(p, needle))
            || self
                .category_name
                .as_deref()
                .is_some_and(|c| contains_ci(c, needle))
            || self.author_names.iter().any(|a| contains_ci(a, needle))
    }
}

pub(crate) fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

fn required(value: &str, field: &'static str) -> Result<String, LendingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LendingError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Catalog store.
#[derive(Debug)]
pub struct Catalog {
    books: DashMap<BookId, Arc<Book>>,
    isbn_index: DashMap<String, BookId>,
    categories: DashMap<CategoryId, Category>,
    category_names: DashMap<String, CategoryId>,
    authors: DashMap<AuthorId, Author>,
    author_names: DashMap<String, AuthorId>,
    book_ids: IdSequence,
    category_ids: IdSequence,
    author_ids: IdSequence,
    lock_budget: LockBudget,
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_lock_budget(LockBudget::default())
    }

    pub fn with_lock_budget(lock_budget: LockBudget) -> Self {
        Self {
            books: DashMap::new(),
            isbn_index: DashMap::new(),
            categories: DashMap::new(),
            category_names: DashMap::new(),
            authors: DashMap::new(),
            author_names: DashMap::new(),
            book_ids: IdSequence::new(),
            category_ids: IdSequence::new(),
            author_ids: IdSequence::new(),
            lock_budget,
        }
    }

    // === Categories ===

    /// Registers a category. Names are unique ignoring case.
    pub fn add_category(&self, name: &str) -> Result<Category, LendingError> {
        let name = required(name, "category_name")?;
        let id = match self.category_names.entry(name.to_lowercase()) {
            Entry::Occupied(_) => return Err(LendingError::DuplicateCategory(name)),
            Entry::Vacant(entry) => {
                let id = CategoryId(self.category_ids.next());
                entry.insert(id);
                id
            }
        };
        let category = Category { id, name };
        self.categories.insert(id, category.clone());
        info!(category = %id, name = %category.name, "category added");
        Ok(category)
    }

    /// Finds a category by name, creating it when absent.
    pub fn ensure_category(&self, name: &str) -> Result<Category, LendingError> {
        let key = required(name, "category_name")?.to_lowercase();
        if let Some(id) = self.category_names.get(&key).map(|r| *r) {
            if let Some(category) = self.categories.get(&id) {
                return Ok(category.clone());
            }
        }
        match self.add_category(name) {
            Err(LendingError::DuplicateCategory(_)) => {
                // Lost a race with another writer; the winner is now visible.
                let id = self
                    .category_names
                    .get(&key)
                    .map(|r| *r)
                    .ok_or(LendingError::MissingField("category_name"))?;
                self.category(id)
            }
            other => other,
        }
    }

    pub fn category(&self, id: CategoryId) -> Result<Category, LendingError> {
        self.categories
            .get(&id)
            .map(|c| c.clone())
            .ok_or(LendingError::CategoryNotFound(id))
    }

    /// All categories sorted by name.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.categories.iter().map(|c| c.clone()).collect();
        categories.sort_by_key(|c| c.name.to_lowercase());
        categories
    }

    // === Authors ===

    fn resolve_author(&self, name: &str) -> AuthorId {
        let name = name.trim().to_string();
        let id = match self.author_names.entry(name.to_lowercase()) {
            Entry::Occupied(entry) => return *entry.get(),
            Entry::Vacant(entry) => {
                let id = AuthorId(self.author_ids.next());
                entry.insert(id);
                id
            }
        };
        self.authors.insert(id, Author { id, name });
        id
    }

    pub fn authors(&self) -> Vec<Author> {
        let mut authors: Vec<Author> = self.authors.iter().map(|a| a.clone()).collect();
        authors.sort_by_key(|a| a.id);
        authors
    }

    fn author_names(&self, ids: &[AuthorId]) -> Vec<String> {
        let mut names: Vec<String> = ids
            .iter()
            .filter_map(|id| self.authors.get(id).map(|a| a.name.clone()))
            .collect();
        names.sort();
        names
    }

    // === Books ===

    /// Adds a title with every copy available.
    ///
    /// # Errors
    ///
    /// - [`LendingError::MissingField`] for a blank ISBN, title or author list.
    /// - [`LendingError::InvalidCopies`] when `total_copies` is zero.
    /// - [`LendingError::CategoryNotFound`] for an unknown category.
    /// - [`LendingError::DuplicateIsbn`] when the ISBN is already catalogued.
    pub fn add_book(&self, new_book: NewBook) -> Result<BookRecord, LendingError> {
        let isbn = required(&new_book.isbn, "isbn")?;
        let title = required(&new_book.title, "title")?;
        if new_book.total_copies == 0 {
            return Err(LendingError::InvalidCopies);
        }
        self.category(new_book.category_id)?;
        let author_names: Vec<&str> = new_book
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect();
        if author_names.is_empty() {
            return Err(LendingError::MissingField("authors"));
        }

        // Reserve the ISBN first so a duplicate never registers authors.
        let id = match self.isbn_index.entry(isbn.clone()) {
            Entry::Occupied(_) => return Err(LendingError::DuplicateIsbn(isbn)),
            Entry::Vacant(entry) => {
                let id = BookId(self.book_ids.next());
                entry.insert(id);
                id
            }
        };

        let mut authors: Vec<AuthorId> = author_names
            .into_iter()
            .map(|name| self.resolve_author(name))
            .collect();
        authors.sort();
        authors.dedup();

        let mut record = BookRecord::new(
            id,
            isbn,
            title,
            new_book.category_id,
            authors,
            new_book.total_copies,
        );
        record.publisher = new_book.publisher;
        record.publication_year = new_book.publication_year;
        record.price = new_book.price;

        self.books.insert(id, Arc::new(Book::new(record.clone())));
        info!(book = %id, isbn = %record.isbn, copies = record.total_copies, "book added");
        Ok(record)
    }

    /// Shared handle to a book row.
    pub fn book(&self, id: BookId) -> Result<Arc<Book>, LendingError> {
        self.books
            .get(&id)
            .map(|b| Arc::clone(b.value()))
            .ok_or(LendingError::BookNotFound(id))
    }

    pub(crate) fn contains(&self, id: BookId) -> bool {
        self.books.contains_key(&id)
    }

    pub fn book_details(&self, id: BookId) -> Result<BookDetails, LendingError> {
        let record = self.book(id)?.record();
        Ok(self.details(record))
    }

    fn details(&self, record: BookRecord) -> BookDetails {
        let category_name = self.categories.get(&record.category_id).map(|c| c.name.clone());
        let author_names = self.author_names(&record.authors);
        BookDetails {
            record,
            category_name,
            author_names,
        }
    }

    /// Every book, newest first.
    pub fn books(&self) -> Vec<BookDetails> {
        let mut records = self.records();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.into_iter().map(|r| self.details(r)).collect()
    }

    pub(crate) fn records(&self) -> Vec<BookRecord> {
        let handles: Vec<Arc<Book>> = self.books.iter().map(|b| Arc::clone(b.value())).collect();
        handles.iter().map(|b| b.record()).collect()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Case-insensitive search over title, ISBN, publisher, category and
    /// author names. A blank query returns the whole catalog.
    pub fn search_books(&self, query: &str) -> Vec<BookDetails> {
        let needle = query.trim().to_lowercase();
        self.books()
            .into_iter()
            .filter(|details| needle.is_empty() || details.matches(&needle))
            .collect()
    }

    /// Applies a partial update under the book's row lock.
    ///
    /// Changing `total_copies` keeps the copies on loan fixed; a total below
    /// the number on loan fails with [`LendingError::InvalidCopies`].
    pub fn update_book(&self, id: BookId, update: BookUpdate) -> Result<BookRecord, LendingError> {
        if let Some(category_id) = update.category_id {
            self.category(category_id)?;
        }
        let title = update.title.as_deref().map(|t| required(t, "title")).transpose()?;
        let isbn = update.isbn.as_deref().map(|i| required(i, "isbn")).transpose()?;

        let book = self.book(id)?;
        let mut row = lock_row(&book.inner, self.lock_budget)?;
        if !self.contains(id) {
            return Err(LendingError::BookNotFound(id));
        }

        // Validate copies before any write so a failure leaves the row intact.
        let mut staged = row.clone();
        if let Some(total) = update.total_copies {
            staged.set_total_copies(total)?;
        }

        if let Some(isbn) = isbn.filter(|isbn| *isbn != staged.isbn) {
            match self.isbn_index.entry(isbn.clone()) {
                Entry::Occupied(_) => return Err(LendingError::DuplicateIsbn(isbn)),
                Entry::Vacant(entry) => {
                    entry.insert(id);
                }
            }
            self.isbn_index.remove(&staged.isbn);
            staged.isbn = isbn;
        }
        if let Some(title) = title {
            staged.title = title;
        }
        if let Some(category_id) = update.category_id {
            staged.category_id = category_id;
        }
        if update.publisher.is_some() {
            staged.publisher = update.publisher;
        }
        if update.publication_year.is_some() {
            staged.publication_year = update.publication_year;
        }
        if update.price.is_some() {
            staged.price = update.price;
        }

        *row = staged.clone();
        info!(book = %id, "book updated");
        Ok(staged)
    }

    /// Removes a book and its author links.
    ///
    /// # Errors
    ///
    /// [`LendingError::BookOnLoan`] while any copy is out.
    pub fn remove_book(&self, id: BookId) -> Result<BookRecord, LendingError> {
        let book = self.book(id)?;
        let row = lock_row(&book.inner, self.lock_budget)?;
        if row.on_loan() > 0 {
            return Err(LendingError::BookOnLoan);
        }
        // Removal happens under the row lock; the engine re-checks
        // membership after locking, so no loan can start on a removed book.
        if self.books.remove(&id).is_none() {
            return Err(LendingError::BookNotFound(id));
        }
        self.isbn_index.remove(&row.isbn);
        info!(book = %id, isbn = %row.isbn, "book removed");
        Ok(row.clone())
    }

    // === Snapshot support ===

    pub(crate) fn restore(
        &self,
        categories: Vec<Category>,
        authors: Vec<Author>,
        books: Vec<BookRecord>,
    ) -> Result<(), LendingError> {
        for category in categories {
            if self
                .category_names
                .insert(category.name.to_lowercase(), category.id)
                .is_some()
            {
                return Err(LendingError::DuplicateCategory(category.name));
            }
            self.category_ids.observe(category.id.0);
            self.categories.insert(category.id, category);
        }
        for author in authors {
            self.author_ids.observe(author.id.0);
            self.author_names.insert(author.name.to_lowercase(), author.id);
            self.authors.insert(author.id, author);
        }
        for record in books {
            if record.available_copies > record.total_copies {
                return Err(LendingError::InconsistentSnapshot(format!(
                    "book {} has more available than total copies",
                    record.id
                )));
            }
            if !self.categories.contains_key(&record.category_id) {
                return Err(LendingError::CategoryNotFound(record.category_id));
            }
            if self.isbn_index.insert(record.isbn.clone(), record.id).is_some() {
                return Err(LendingError::DuplicateIsbn(record.isbn));
            }
            self.book_ids.observe(record.id.0);
            self.books.insert(record.id, Arc::new(Book::new(record)));
        }
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
