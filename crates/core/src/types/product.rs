//! Product GID type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ProductGid`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ProductGidError {
    /// The input string is empty.
    #[error("product id cannot be empty")]
    Empty,
    /// The input does not start with the product GID prefix.
    #[error("product id must start with {prefix}")]
    WrongPrefix {
        /// Required prefix.
        prefix: &'static str,
    },
    /// The part after the prefix is not a number.
    #[error("product id must end with a numeric identifier")]
    NonNumericId,
}

/// A Shopify product global ID (`gid://shopify/Product/<n>`).
///
/// The `products` column of an import file is a comma-separated list of
/// these; tokens that do not parse are reported as row warnings and skipped.
///
/// ## Examples
///
/// ```
/// use collectify_core::ProductGid;
///
/// let gid = ProductGid::parse("gid://shopify/Product/632910392").unwrap();
/// assert_eq!(gid.numeric_id(), 632_910_392);
///
/// assert!(ProductGid::parse("632910392").is_err());
/// assert!(ProductGid::parse("gid://shopify/Collection/1").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ProductGid(String);

impl ProductGid {
    /// The GID prefix shared by all product ids.
    pub const PREFIX: &'static str = "gid://shopify/Product/";

    /// Parse a `ProductGid` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, does not carry the
    /// `gid://shopify/Product/` prefix, or has a non-numeric tail.
    pub fn parse(s: &str) -> Result<Self, ProductGidError> {
        if s.is_empty() {
            return Err(ProductGidError::Empty);
        }

        let tail = s
            .strip_prefix(Self::PREFIX)
            .ok_or(ProductGidError::WrongPrefix {
                prefix: Self::PREFIX,
            })?;

        if tail.is_empty() || !tail.chars().all(|c| c.is_ascii_digit()) {
            return Err(ProductGidError::NonNumericId);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the GID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ProductGid` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the numeric part of the GID.
    #[must_use]
    pub fn numeric_id(&self) -> u64 {
        self.0
            .strip_prefix(Self::PREFIX)
            .and_then(|tail| tail.parse().ok())
            .unwrap_or(0)
    }
}

impl fmt::Display for ProductGid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProductGid {
    type Err = ProductGidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ProductGid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
