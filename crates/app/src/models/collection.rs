//! Collection row and rule types.
//!
//! A [`CollectionRow`] is the raw output of the CSV parser: every field is a
//! string, and nothing beyond quote-stripping has happened to it. The
//! validator and mapper layers coerce the typed fields from here.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether a collection's membership is an explicit product list or a
/// computed rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    /// Explicit list of product GIDs.
    Manual,
    /// Membership computed by the platform from a rule set.
    Smart,
}

impl CollectionType {
    /// Lowercase name as it appears in the CSV `type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Smart => "smart",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CollectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "smart" => Ok(Self::Smart),
            other => Err(format!("unknown collection type: {other}")),
        }
    }
}

/// Product attribute a smart-collection rule matches against.
///
/// Serialized in the platform's SCREAMING_SNAKE form; human-friendly names
/// (`price`, `compare-at-price`, `variant title`, ...) are accepted on
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleColumn {
    #[serde(alias = "title")]
    Title,
    #[serde(alias = "type")]
    Type,
    #[serde(alias = "vendor")]
    Vendor,
    #[serde(alias = "tag")]
    Tag,
    #[serde(alias = "category")]
    Category,
    #[serde(alias = "price", alias = "variant_price")]
    VariantPrice,
    #[serde(
        alias = "compare-at-price",
        alias = "compare_at_price",
        alias = "variant_compare_at_price"
    )]
    VariantCompareAtPrice,
    #[serde(alias = "weight", alias = "variant_weight")]
    VariantWeight,
    #[serde(alias = "inventory", alias = "variant_inventory")]
    VariantInventory,
    #[serde(alias = "variant title", alias = "variant-title", alias = "variant_title")]
    VariantTitle,
}

impl RuleColumn {
    /// All columns, in the order exposed by the metadata endpoint.
    pub const ALL: [Self; 10] = [
        Self::Title,
        Self::Type,
        Self::Vendor,
        Self::Tag,
        Self::Category,
        Self::VariantPrice,
        Self::VariantCompareAtPrice,
        Self::VariantWeight,
        Self::VariantInventory,
        Self::VariantTitle,
    ];

    /// Canonical SCREAMING_SNAKE name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "TITLE",
            Self::Type => "TYPE",
            Self::Vendor => "VENDOR",
            Self::Tag => "TAG",
            Self::Category => "CATEGORY",
            Self::VariantPrice => "VARIANT_PRICE",
            Self::VariantCompareAtPrice => "VARIANT_COMPARE_AT_PRICE",
            Self::VariantWeight => "VARIANT_WEIGHT",
            Self::VariantInventory => "VARIANT_INVENTORY",
            Self::VariantTitle => "VARIANT_TITLE",
        }
    }

    /// True for columns whose ordering relations require numeric conditions.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::VariantPrice
                | Self::VariantCompareAtPrice
                | Self::VariantWeight
                | Self::VariantInventory
        )
    }
}

impl fmt::Display for RuleColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuleColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "TITLE" => Ok(Self::Title),
            "TYPE" => Ok(Self::Type),
            "VENDOR" => Ok(Self::Vendor),
            "TAG" => Ok(Self::Tag),
            "CATEGORY" => Ok(Self::Category),
            "PRICE" | "VARIANT_PRICE" => Ok(Self::VariantPrice),
            "COMPARE_AT_PRICE" | "VARIANT_COMPARE_AT_PRICE" => Ok(Self::VariantCompareAtPrice),
            "WEIGHT" | "VARIANT_WEIGHT" => Ok(Self::VariantWeight),
            "INVENTORY" | "VARIANT_INVENTORY" => Ok(Self::VariantInventory),
            "VARIANT_TITLE" => Ok(Self::VariantTitle),
            _ => Err(format!("unknown rule column: {s}")),
        }
    }
}

/// Comparison applied between a [`RuleColumn`] and a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleRelation {
    #[serde(alias = "equals")]
    Equals,
    #[serde(alias = "not-equals", alias = "not_equals")]
    NotEquals,
    #[serde(alias = "contains")]
    Contains,
    #[serde(alias = "not-contains", alias = "not_contains")]
    NotContains,
    #[serde(alias = "starts-with", alias = "starts_with")]
    StartsWith,
    #[serde(alias = "ends-with", alias = "ends_with")]
    EndsWith,
    #[serde(alias = "greater-than", alias = "greater_than")]
    GreaterThan,
    #[serde(alias = "less-than", alias = "less_than")]
    LessThan,
    #[serde(alias = "is-set", alias = "is_set")]
    IsSet,
    #[serde(alias = "is-not-set", alias = "is_not_set")]
    IsNotSet,
}

impl RuleRelation {
    /// All relations, in the order exposed by the metadata endpoint.
    pub const ALL: [Self; 10] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
        Self::EndsWith,
        Self::GreaterThan,
        Self::LessThan,
        Self::IsSet,
        Self::IsNotSet,
    ];

    /// Canonical SCREAMING_SNAKE name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT_CONTAINS",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
            Self::GreaterThan => "GREATER_THAN",
            Self::LessThan => "LESS_THAN",
            Self::IsSet => "IS_SET",
            Self::IsNotSet => "IS_NOT_SET",
        }
    }

    /// True for relations that do not take a condition.
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self, Self::IsSet | Self::IsNotSet)
    }

    /// True for ordering relations that require a numeric condition on
    /// numeric columns.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::GreaterThan | Self::LessThan)
    }
}

impl fmt::Display for RuleRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuleRelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "EQUALS" => Ok(Self::Equals),
            "NOT_EQUALS" => Ok(Self::NotEquals),
            "CONTAINS" => Ok(Self::Contains),
            "NOT_CONTAINS" => Ok(Self::NotContains),
            "STARTS_WITH" => Ok(Self::StartsWith),
            "ENDS_WITH" => Ok(Self::EndsWith),
            "GREATER_THAN" => Ok(Self::GreaterThan),
            "LESS_THAN" => Ok(Self::LessThan),
            "IS_SET" => Ok(Self::IsSet),
            "IS_NOT_SET" => Ok(Self::IsNotSet),
            _ => Err(format!("unknown rule relation: {s}")),
        }
    }
}

/// One smart-collection rule as embedded in the CSV `rules` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRule {
    pub column: RuleColumn,
    pub relation: RuleRelation,
    /// Required unless the relation is IS_SET / IS_NOT_SET.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Collection sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Manual,
    BestSelling,
    AlphaAsc,
    AlphaDesc,
    PriceAsc,
    PriceDesc,
    Created,
    CreatedDesc,
}

impl SortOrder {
    /// All sort orders, in the order exposed by the metadata endpoint.
    pub const ALL: [Self; 8] = [
        Self::Manual,
        Self::BestSelling,
        Self::AlphaAsc,
        Self::AlphaDesc,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::Created,
        Self::CreatedDesc,
    ];

    /// Canonical SCREAMING_SNAKE name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::BestSelling => "BEST_SELLING",
            Self::AlphaAsc => "ALPHA_ASC",
            Self::AlphaDesc => "ALPHA_DESC",
            Self::PriceAsc => "PRICE_ASC",
            Self::PriceDesc => "PRICE_DESC",
            Self::Created => "CREATED",
            Self::CreatedDesc => "CREATED_DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "MANUAL" => Ok(Self::Manual),
            "BEST_SELLING" => Ok(Self::BestSelling),
            "ALPHA_ASC" => Ok(Self::AlphaAsc),
            "ALPHA_DESC" => Ok(Self::AlphaDesc),
            "PRICE_ASC" => Ok(Self::PriceAsc),
            "PRICE_DESC" => Ok(Self::PriceDesc),
            "CREATED" => Ok(Self::Created),
            "CREATED_DESC" => Ok(Self::CreatedDesc),
            _ => Err(format!("unknown sort order: {s}")),
        }
    }
}

/// A parsed CSV row, all fields raw.
///
/// `line` is the 1-based line in the source file, counting the header as
/// line 1 - it is the number validation errors and row results report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRow {
    pub line: usize,
    pub id: String,
    pub title: String,
    pub handle: String,
    pub description_html: String,
    pub collection_type: String,
    pub products: String,
    pub rules: String,
    pub applied_disjunctively: String,
    pub sort_order: String,
    pub image_url: String,
    pub image_alt: String,
    pub seo_title: String,
    pub seo_description: String,
    pub template_suffix: String,
    pub published: String,
}

impl CollectionRow {
    /// Recognized CSV columns, in canonical export order.
    pub const COLUMNS: [&'static str; 15] = [
        "id",
        "title",
        "handle",
        "descriptionHtml",
        "type",
        "products",
        "rules",
        "appliedDisjunctively",
        "sortOrder",
        "imageUrl",
        "imageAlt",
        "seoTitle",
        "seoDescription",
        "templateSuffix",
        "published",
    ];

    /// Build a row from a header list and a matching field list.
    ///
    /// Unrecognized headers are ignored; recognized headers missing from the
    /// file leave their field empty.
    #[must_use]
    pub fn from_fields(line: usize, headers: &[String], fields: &[String]) -> Self {
        let mut row = Self {
            line,
            ..Self::default()
        };

        for (header, value) in headers.iter().zip(fields.iter()) {
            let value = value.clone();
            match header.trim() {
                "id" => row.id = value,
                "title" => row.title = value,
                "handle" => row.handle = value,
                "descriptionHtml" => row.description_html = value,
                "type" => row.collection_type = value,
                "products" => row.products = value,
                "rules" => row.rules = value,
                "appliedDisjunctively" => row.applied_disjunctively = value,
                "sortOrder" => row.sort_order = value,
                "imageUrl" => row.image_url = value,
                "imageAlt" => row.image_alt = value,
                "seoTitle" => row.seo_title = value,
                "seoDescription" => row.seo_description = value,
                "templateSuffix" => row.template_suffix = value,
                "published" => row.published = value,
                _ => {}
            }
        }

        row
    }

    /// The declared collection type, if it parses.
    #[must_use]
    pub fn declared_type(&self) -> Option<CollectionType> {
        self.collection_type.parse().ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_column_aliases() {
        assert_eq!("price".parse::<RuleColumn>().unwrap(), RuleColumn::VariantPrice);
        assert_eq!(
            "compare-at-price".parse::<RuleColumn>().unwrap(),
            RuleColumn::VariantCompareAtPrice
        );
        assert_eq!(
            "variant title".parse::<RuleColumn>().unwrap(),
            RuleColumn::VariantTitle
        );
        assert_eq!("TAG".parse::<RuleColumn>().unwrap(), RuleColumn::Tag);
        assert!("sku".parse::<RuleColumn>().is_err());
    }

    #[test]
    fn test_rule_column_numeric() {
        assert!(RuleColumn::VariantPrice.is_numeric());
        assert!(RuleColumn::VariantInventory.is_numeric());
        assert!(!RuleColumn::Title.is_numeric());
        assert!(!RuleColumn::Tag.is_numeric());
    }

    #[test]
    fn test_rule_relation_parsing() {
        assert_eq!(
            "starts-with".parse::<RuleRelation>().unwrap(),
            RuleRelation::StartsWith
        );
        assert_eq!(
            "IS_NOT_SET".parse::<RuleRelation>().unwrap(),
            RuleRelation::IsNotSet
        );
        assert!(RuleRelation::IsSet.is_unary());
        assert!(RuleRelation::GreaterThan.is_ordering());
        assert!(!RuleRelation::Contains.is_ordering());
    }

    #[test]
    fn test_rules_json_accepts_friendly_names() {
        let json = r#"[{"column":"tag","relation":"equals","condition":"sale"}]"#;
        let rules: Vec<CollectionRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules[0].column, RuleColumn::Tag);
        assert_eq!(rules[0].relation, RuleRelation::Equals);
        assert_eq!(rules[0].condition.as_deref(), Some("sale"));
    }

    #[test]
    fn test_rules_json_roundtrip_canonical() {
        let rules = vec![CollectionRule {
            column: RuleColumn::VariantPrice,
            relation: RuleRelation::GreaterThan,
            condition: Some("10.00".to_string()),
        }];
        let json = serde_json::to_string(&rules).unwrap();
        assert!(json.contains("VARIANT_PRICE"));
        assert!(json.contains("GREATER_THAN"));

        let back: Vec<CollectionRule> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("MANUAL".parse::<SortOrder>().unwrap(), SortOrder::Manual);
        assert_eq!(
            "best-selling".parse::<SortOrder>().unwrap(),
            SortOrder::BestSelling
        );
        assert!("RANDOM".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_row_from_fields() {
        let headers: Vec<String> = ["title", "type", "products", "bogus"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let fields: Vec<String> = ["Summer", "manual", "gid://shopify/Product/1", "ignored"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let row = CollectionRow::from_fields(2, &headers, &fields);
        assert_eq!(row.line, 2);
        assert_eq!(row.title, "Summer");
        assert_eq!(row.declared_type(), Some(CollectionType::Manual));
        assert_eq!(row.products, "gid://shopify/Product/1");
        assert_eq!(row.handle, "");
    }
}
