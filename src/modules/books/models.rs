use serde::{Deserialize, Serialize};

/// A stored book record, keyed by ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// External identifier and primary key; never changed by an update
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    /// Page count, never negative
    pub pages: i64,
    pub publisher: String,
    pub title: String,
    pub year: i64,
}

impl Book {
    pub fn new(isbn: impl Into<String>, fields: BookFields) -> Self {
        let BookFields {
            amazon_url,
            author,
            language,
            pages,
            publisher,
            title,
            year,
        } = fields;

        Self {
            isbn: isbn.into(),
            amazon_url,
            author,
            language,
            pages,
            publisher,
            title,
            year,
        }
    }
}

/// Every book attribute except the key; what an update may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFields {
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i64,
    pub publisher: String,
    pub title: String,
    pub year: i64,
}

/// Filter accepted by the list operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookFilter {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Vec<Book>,
}

#[derive(Debug, Serialize)]
pub struct BookEnvelope {
    pub book: Book,
}

#[derive(Debug, Serialize)]
pub struct DeletedMessage {
    pub message: &'static str,
}
