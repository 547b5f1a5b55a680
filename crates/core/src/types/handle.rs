//! Collection handle type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CollectionHandle`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum HandleError {
    /// The input string is empty.
    #[error("handle cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("handle must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The handle contains characters outside `[a-z0-9-]`.
    #[error("handle may only contain lowercase letters, digits, and hyphens")]
    InvalidCharacters,
}

/// A URL-safe collection handle.
///
/// Handles appear in storefront URLs, so Shopify restricts them to lowercase
/// letters, digits, and hyphens. The handle column in an import file is
/// optional; when present it must parse as this type.
///
/// ## Examples
///
/// ```
/// use collectify_core::CollectionHandle;
///
/// assert!(CollectionHandle::parse("summer-sale-2026").is_ok());
///
/// assert!(CollectionHandle::parse("Summer Sale").is_err());
/// assert!(CollectionHandle::parse("").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CollectionHandle(String);

impl CollectionHandle {
    /// Maximum length of a handle.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `CollectionHandle` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or contains
    /// characters outside `[a-z0-9-]`.
    pub fn parse(s: &str) -> Result<Self, HandleError> {
        if s.is_empty() {
            return Err(HandleError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(HandleError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(HandleError::InvalidCharacters);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CollectionHandle` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CollectionHandle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CollectionHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_handles() {
        assert!(CollectionHandle::parse("summer-sale").is_ok());
        assert!(CollectionHandle::parse("sale2026").is_ok());
        assert!(CollectionHandle::parse("a").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            CollectionHandle::parse(""),
            Err(HandleError::Empty)
        ));
    }

    #[test]
    fn test_parse_invalid_characters() {
        assert!(matches!(
            CollectionHandle::parse("Summer-Sale"),
            Err(HandleError::InvalidCharacters)
        ));
        assert!(matches!(
            CollectionHandle::parse("summer sale"),
            Err(HandleError::InvalidCharacters)
        ));
        assert!(matches!(
            CollectionHandle::parse("sale_2026"),
            Err(HandleError::InvalidCharacters)
        ));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(256);
        assert!(matches!(
            CollectionHandle::parse(&long),
            Err(HandleError::TooLong { .. })
        ));
    }
}
