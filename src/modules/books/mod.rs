pub mod models;
pub mod routes;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_db::Database;
use libris_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use store::BookStore;

pub const BOOKS_MIGRATION: Migration = Migration {
    id: "001_create_books",
    up: r#"
        CREATE TABLE IF NOT EXISTS books (
            isbn       TEXT PRIMARY KEY,
            amazon_url TEXT NOT NULL,
            author     TEXT NOT NULL,
            language   TEXT NOT NULL,
            pages      INTEGER NOT NULL,
            publisher  TEXT NOT NULL,
            title      TEXT NOT NULL,
            year       INTEGER NOT NULL
        );
    "#,
};

/// Book records served under `/books`
pub struct BooksModule {
    store: BookStore,
}

impl BooksModule {
    pub fn new(db: &Database) -> Self {
        Self {
            store: BookStore::new(db.pool().clone()),
        }
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        ctx.db.ping().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_envelope = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/BookEnvelope" }
                    }
                }
            })
        };
        let isbn_param = json!({
            "name": "isbn",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });

        let text = json!({ "type": "string" });
        let book_properties = json!({
            "isbn": { "type": "string", "description": "Unique book identifier" },
            "amazon_url": text,
            "author": text,
            "language": text,
            "pages": { "type": "integer", "minimum": 0 },
            "publisher": text,
            "title": text,
            "year": { "type": "integer" }
        });

        let collection = json!({
            "get": {
                "summary": "List books",
                "tags": ["Books"],
                "parameters": [{
                    "name": "title",
                    "in": "query",
                    "required": false,
                    "description": "Case-insensitive partial title match",
                    "schema": { "type": "string" }
                }],
                "responses": {
                    "200": {
                        "description": "All matching books",
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookList" }
                            }
                        }
                    },
                    "500": error("Internal server error")
                }
            },
            "post": {
                "summary": "Create a book",
                "tags": ["Books"],
                "requestBody": {
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": { "$ref": "#/components/schemas/BookPayload" }
                        }
                    }
                },
                "responses": {
                    "201": book_envelope("Created book"),
                    "400": error("Invalid payload"),
                    "500": error("Internal server error")
                }
            }
        });
        let item = json!({
            "get": {
                "summary": "Get a book",
                "tags": ["Books"],
                "parameters": [isbn_param],
                "responses": {
                    "200": book_envelope("The book"),
                    "404": error("No book with this isbn")
                }
            },
            "put": {
                "summary": "Update a book; the path isbn wins over any in the body",
                "tags": ["Books"],
                "parameters": [isbn_param],
                "requestBody": {
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": { "$ref": "#/components/schemas/BookPayload" }
                        }
                    }
                },
                "responses": {
                    "200": book_envelope("Updated book"),
                    "400": error("Invalid payload"),
                    "404": error("No book with this isbn")
                }
            },
            "delete": {
                "summary": "Delete a book",
                "tags": ["Books"],
                "parameters": [isbn_param],
                "responses": {
                    "200": {
                        "description": "Deleted",
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "properties": { "message": { "type": "string" } }
                                }
                            }
                        }
                    },
                    "404": error("No book with this isbn")
                }
            }
        });
        let schemas = json!({
            "Book": {
                "type": "object",
                "properties": book_properties,
                "required": ["isbn", "amazon_url", "author", "language", "pages", "publisher", "title", "year"]
            },
            "BookPayload": {
                "type": "object",
                "description": "Book fields; unknown keys are ignored and isbn is ignored on update",
                "properties": book_properties
            },
            "BookEnvelope": {
                "type": "object",
                "properties": { "book": { "$ref": "#/components/schemas/Book" } }
            },
            "BookList": {
                "type": "object",
                "properties": {
                    "books": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Book" }
                    }
                }
            }
        });

        Some(json!({
            "paths": {
                "/": collection,
                "/{isbn}": item
            },
            "components": { "schemas": schemas }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![BOOKS_MIGRATION]
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

pub fn create_module(db: &Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(db))
}
