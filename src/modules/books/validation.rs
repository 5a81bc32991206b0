//! Shape checks for book payloads.
//!
//! The schema is a static rule table. Every rule is evaluated, so a rejected
//! payload reports all of its problems at once. Fields outside the table are
//! ignored and never reach the store.

use serde_json::{Map, Value};
use thiserror::Error;

use super::models::{Book, BookFields};

/// Which write path the payload is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    /// The key comes from the request path; a payload `isbn` is ignored.
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Integer { min: Option<i64> },
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    name: &'static str,
    kind: FieldKind,
    /// Key fields are only checked in create mode.
    key: bool,
}

const BOOK_SCHEMA: &[FieldRule] = &[
    FieldRule { name: "isbn", kind: FieldKind::Text, key: true },
    FieldRule { name: "amazon_url", kind: FieldKind::Text, key: false },
    FieldRule { name: "author", kind: FieldKind::Text, key: false },
    FieldRule { name: "language", kind: FieldKind::Text, key: false },
    FieldRule { name: "pages", kind: FieldKind::Integer { min: Some(0) }, key: false },
    FieldRule { name: "publisher", kind: FieldKind::Text, key: false },
    FieldRule { name: "title", kind: FieldKind::Text, key: false },
    FieldRule { name: "year", kind: FieldKind::Integer { min: None }, key: false },
];

/// A payload rejected by the schema, with one message per violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid book payload: {}", .messages.join("; "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

/// A payload that passed the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPayload {
    /// Always present in create mode; always `None` in update mode.
    pub isbn: Option<String>,
    pub fields: BookFields,
}

/// Check `payload` against the book schema for the given write path.
pub fn validate(payload: &Value, mode: Mode) -> Result<ValidPayload, ValidationError> {
    let Some(object) = payload.as_object() else {
        return Err(ValidationError {
            messages: vec!["payload must be a JSON object".to_string()],
        });
    };

    let messages: Vec<String> = BOOK_SCHEMA
        .iter()
        .filter(|rule| mode == Mode::Create || !rule.key)
        .filter_map(|rule| check(object, rule))
        .collect();

    if !messages.is_empty() {
        return Err(ValidationError { messages });
    }

    let fields = BookFields {
        amazon_url: text(object, "amazon_url"),
        author: text(object, "author"),
        language: text(object, "language"),
        pages: integer(object, "pages"),
        publisher: text(object, "publisher"),
        title: text(object, "title"),
        year: integer(object, "year"),
    };

    let isbn = match mode {
        Mode::Create => Some(text(object, "isbn")),
        Mode::Update => None,
    };

    Ok(ValidPayload { isbn, fields })
}

/// Validate a create payload into the book to insert.
pub fn validate_create(payload: &Value) -> Result<Book, ValidationError> {
    let ValidPayload { isbn, fields } = validate(payload, Mode::Create)?;
    Ok(Book::new(isbn.unwrap_or_default(), fields))
}

/// Validate an update payload into the replacement field values.
pub fn validate_update(payload: &Value) -> Result<BookFields, ValidationError> {
    validate(payload, Mode::Update).map(|valid| valid.fields)
}

fn check(object: &Map<String, Value>, rule: &FieldRule) -> Option<String> {
    let value = match object.get(rule.name) {
        None | Some(Value::Null) => return Some(format!("{} is required", rule.name)),
        Some(value) => value,
    };

    match rule.kind {
        FieldKind::Text if !value.is_string() => Some(format!("{} must be a string", rule.name)),
        FieldKind::Text => None,
        FieldKind::Integer { min } => match value.as_i64() {
            None => Some(format!("{} must be an integer", rule.name)),
            Some(n) => match min {
                Some(min) if n < min => Some(format!(
                    "{} must be greater than or equal to {}",
                    rule.name, min
                )),
                _ => None,
            },
        },
    }
}

// Accessors below run only after every rule passed.

fn text(object: &Map<String, Value>, name: &str) -> String {
    object
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn integer(object: &Map<String, Value>, name: &str) -> i64 {
    object.get(name).and_then(Value::as_i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> Value {
        json!({
            "isbn": "B0BPFXF18R",
            "amazon_url": "https://www.amazon.com/dp/B0BPFXF18R",
            "author": "Amber Vittoria",
            "language": "English",
            "pages": 141,
            "publisher": "Andrews McMeel Publishing",
            "title": "These Are My Big Girl Pants",
            "year": 2023
        })
    }

    #[test]
    fn create_accepts_complete_payload() {
        let book = validate_create(&full_payload()).unwrap();
        assert_eq!(book.isbn, "B0BPFXF18R");
        assert_eq!(book.pages, 141);
        assert_eq!(book.year, 2023);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut payload = full_payload();
        payload["badField"] = json!("I AM A BOOK");
        assert!(validate(&payload, Mode::Create).is_ok());
    }

    #[test]
    fn every_violation_is_reported() {
        let payload = json!({
            "isbn": 12,
            "author": "Someone",
            "language": "English",
            "pages": "many",
            "publisher": "Nobody",
            "title": null,
            "year": 1999.5
        });

        let err = validate(&payload, Mode::Create).unwrap_err();
        assert_eq!(
            err.messages,
            vec![
                "isbn must be a string",
                "amazon_url is required",
                "pages must be an integer",
                "title is required",
                "year must be an integer",
            ]
        );
    }

    #[test]
    fn negative_pages_rejected() {
        let mut payload = full_payload();
        payload["pages"] = json!(-1);
        let err = validate(&payload, Mode::Create).unwrap_err();
        assert_eq!(err.messages, vec!["pages must be greater than or equal to 0"]);
    }

    #[test]
    fn update_ignores_isbn() {
        let mut payload = full_payload();
        payload["isbn"] = json!(false);
        let valid = validate(&payload, Mode::Update).unwrap();
        assert_eq!(valid.isbn, None);

        payload.as_object_mut().unwrap().remove("isbn");
        let fields = validate_update(&payload).unwrap();
        assert_eq!(fields.author, "Amber Vittoria");
    }

    #[test]
    fn update_still_requires_other_fields() {
        let err = validate(&json!({"isbn": "123432122"}), Mode::Update).unwrap_err();
        assert_eq!(err.messages.len(), 7);
        assert!(err.messages.iter().all(|m| !m.starts_with("isbn")));
    }

    #[test]
    fn non_object_payload_rejected() {
        for payload in [Value::Null, json!([1, 2]), json!("book")] {
            let err = validate(&payload, Mode::Create).unwrap_err();
            assert_eq!(err.messages, vec!["payload must be a JSON object"]);
        }
    }
}
