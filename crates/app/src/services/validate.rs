//! Row validation.
//!
//! Validation is row-local: no cross-row uniqueness or duplicate-handle
//! checks. The import endpoints are all-or-nothing at this stage - one
//! invalid row rejects the whole batch before any remote call is made.

use collectify_core::CollectionHandle;

use crate::models::{CollectionRow, CollectionType, SortOrder};

/// Maximum title length accepted by the platform.
pub const MAX_TITLE_CHARS: usize = 255;

/// Validate every row, returning human-readable errors tagged with the
/// 1-based file line (the header is line 1).
#[must_use]
pub fn validate_rows(rows: &[CollectionRow]) -> Vec<String> {
    let mut errors = Vec::new();
    for row in rows {
        validate_row(row, &mut errors);
    }
    errors
}

fn validate_row(row: &CollectionRow, errors: &mut Vec<String>) {
    let line = row.line;

    if row.title.trim().is_empty() {
        errors.push(format!("Row {line}: title is required"));
    } else if row.title.chars().count() > MAX_TITLE_CHARS {
        errors.push(format!(
            "Row {line}: title must be at most {MAX_TITLE_CHARS} characters"
        ));
    }

    if !row.handle.trim().is_empty()
        && let Err(e) = CollectionHandle::parse(row.handle.trim())
    {
        errors.push(format!("Row {line}: invalid handle: {e}"));
    }

    // An empty type column defaults to manual.
    let declared = if row.collection_type.trim().is_empty() {
        Some(CollectionType::Manual)
    } else {
        row.declared_type()
    };

    match declared {
        None => errors.push(format!("Row {line}: type must be manual or smart")),
        Some(CollectionType::Manual) => {
            if row.products.trim().is_empty() {
                errors.push(format!(
                    "Row {line}: manual collections require a products list"
                ));
            }
        }
        Some(CollectionType::Smart) => {
            if row.rules.trim().is_empty() {
                errors.push(format!("Row {line}: smart collections require a rules list"));
            }
        }
    }

    if !row.sort_order.trim().is_empty() && row.sort_order.parse::<SortOrder>().is_err() {
        errors.push(format!(
            "Row {line}: invalid sortOrder '{}'",
            row.sort_order.trim()
        ));
    }
}
