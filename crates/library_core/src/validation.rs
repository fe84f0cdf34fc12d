//! crates/library_core/src/validation.rs
//!
//! Field validation and normalisation for book forms and account data.

use crate::domain::BookInput;
use crate::error::{LibraryError, LibraryResult};

const MAX_TITLE: usize = 200;
const MAX_AUTHOR: usize = 200;
const MAX_ISBN: usize = 64;
const MAX_PUBLISHER: usize = 200;
const MAX_LANGUAGE: usize = 64;
const MAX_DESCRIPTION: usize = 2000;
const MAX_TAGS: usize = 500;
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 3000;
pub const MIN_PASSWORD_LEN: usize = 8;

fn required(field: &str, value: &str, max: usize) -> LibraryResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LibraryError::invalid(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(LibraryError::invalid(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

// Blank optional strings are treated as absent.
fn optional(field: &str, value: Option<&str>, max: usize) -> LibraryResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) if v.chars().count() > max => Err(LibraryError::invalid(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Trims tags, drops empties and case-insensitive duplicates, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        let key = tag.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(tag.to_string());
        }
    }
    out
}

/// Splits a comma-separated tag string.
pub fn split_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

/// Validates a book form and returns its normalised copy.
pub fn validate_book(input: &BookInput) -> LibraryResult<BookInput> {
    let title = required("title", &input.title, MAX_TITLE)?;
    let author = required("author", &input.author, MAX_AUTHOR)?;
    let isbn = optional("isbn", input.isbn.as_deref(), MAX_ISBN)?;
    let publisher = optional("publisher", input.publisher.as_deref(), MAX_PUBLISHER)?;
    let language = optional("language", input.language.as_deref(), MAX_LANGUAGE)?;
    let description = optional("description", input.description.as_deref(), MAX_DESCRIPTION)?;

    if let Some(year) = input.published_year {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(LibraryError::invalid(format!(
                "published year must be between {} and {}",
                MIN_YEAR, MAX_YEAR
            )));
        }
    }

    let tags = normalize_tags(&input.tags);
    if tags.join(",").chars().count() > MAX_TAGS {
        return Err(LibraryError::invalid(format!(
            "tags must be at most {} characters in total",
            MAX_TAGS
        )));
    }

    Ok(BookInput {
        title,
        author,
        isbn,
        publisher,
        published_year: input.published_year,
        language,
        description,
        tags,
    })
}

/// Trims and lower-cases an email address.
pub fn normalize_email(email: &str) -> LibraryResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(LibraryError::invalid("email is required"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(LibraryError::invalid(format!("'{}' is not a valid email", email))),
    }
}

pub fn validate_password(password: &str) -> LibraryResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LibraryError::invalid(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
