//! Persistence for book records against the `books` table.

use sqlx::SqlitePool;
use thiserror::Error;

use super::models::{Book, BookFields, BookFilter};

const COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("There is no book with isbn '{isbn}'")]
    NotFound { isbn: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Book CRUD, one statement per operation.
#[derive(Debug, Clone)]
pub struct BookStore {
    pool: SqlitePool,
}

impl BookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All books ordered by title, optionally narrowed by a title substring.
    ///
    /// Matching lowercases both sides with Rust's Unicode rules rather than
    /// SQLite's ASCII-only `lower()`, and treats the query literally.
    pub async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>, StoreError> {
        let mut books =
            sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books ORDER BY title"))
                .fetch_all(&self.pool)
                .await?;

        if let Some(title) = filter.title.as_deref() {
            let needle = title.to_lowercase();
            books.retain(|book| book.title.to_lowercase().contains(&needle));
        }

        tracing::debug!(count = books.len(), title = ?filter.title, "listed books");
        Ok(books)
    }

    pub async fn get(&self, isbn: &str) -> Result<Book, StoreError> {
        sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books WHERE isbn = ?"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(isbn))
    }

    /// Insert `book` as given. A duplicate isbn fails with the database's
    /// constraint error.
    pub async fn create(&self, book: &Book) -> Result<Book, StoreError> {
        let created = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(&book.isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(isbn = %created.isbn, "book created");
        Ok(created)
    }

    /// Overwrite every non-key column of the book stored under `isbn`.
    pub async fn update(&self, isbn: &str, fields: &BookFields) -> Result<Book, StoreError> {
        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books
             SET amazon_url = ?, author = ?, language = ?, pages = ?,
                 publisher = ?, title = ?, year = ?
             WHERE isbn = ?
             RETURNING {COLUMNS}"
        ))
        .bind(&fields.amazon_url)
        .bind(&fields.author)
        .bind(&fields.language)
        .bind(fields.pages)
        .bind(&fields.publisher)
        .bind(&fields.title)
        .bind(fields.year)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(isbn))?;

        tracing::info!(isbn = %updated.isbn, "book updated");
        Ok(updated)
    }

    pub async fn delete(&self, isbn: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(isbn));
        }

        tracing::info!(%isbn, "book deleted");
        Ok(())
    }
}

fn not_found(isbn: &str) -> StoreError {
    StoreError::NotFound {
        isbn: isbn.to_string(),
    }
}
