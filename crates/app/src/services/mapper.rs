//! Row-to-input mapping.
//!
//! Converts a validated [`CollectionRow`] into the platform's
//! `CollectionInput`. Mapping is a pure function: the same row always maps
//! to an identical input. Dirty optional data (malformed product tokens,
//! unparseable rules JSON, rules violating the numeric-condition constraint)
//! degrades to warnings on the row rather than failing it.

use collectify_core::ProductGid;

use crate::models::{CollectionRow, CollectionRule, CollectionType, SortOrder};
use crate::shopify::{CollectionInput, ImageInput, RuleInput, RuleSetInput, SeoInput};

/// A mapped row: the API input plus any degradation warnings.
#[derive(Debug, Clone)]
pub struct MappedRow {
    pub input: CollectionInput,
    pub warnings: Vec<String>,
}

/// Map a validated row to a `CollectionInput`.
#[must_use]
pub fn map_row(row: &CollectionRow) -> MappedRow {
    let mut warnings = Vec::new();

    let mut input = CollectionInput::titled(row.title.trim());
    input.id = non_empty(&row.id);
    input.handle = non_empty(&row.handle);
    input.description_html = non_empty(&row.description_html);
    input.template_suffix = non_empty(&row.template_suffix);
    input.sort_order = row.sort_order.parse::<SortOrder>().ok();

    match row.declared_type().unwrap_or(CollectionType::Manual) {
        CollectionType::Manual => {
            input.products = Some(parse_products(&row.products, &mut warnings));
        }
        CollectionType::Smart => {
            input.rule_set = parse_rule_set(row, &mut warnings);
        }
    }

    if !row.image_url.trim().is_empty() {
        input.image = Some(ImageInput {
            src: row.image_url.trim().to_string(),
            alt_text: non_empty(&row.image_alt),
        });
    }

    let seo_title = non_empty(&row.seo_title);
    let seo_description = non_empty(&row.seo_description);
    if seo_title.is_some() || seo_description.is_some() {
        input.seo = Some(SeoInput {
            title: seo_title,
            description: seo_description,
        });
    }

    MappedRow { input, warnings }
}

/// Parse a boolean-ish CSV field.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split the products field on commas, keeping only valid product GIDs.
fn parse_products(raw: &str, warnings: &mut Vec<String>) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match ProductGid::parse(token) {
            Ok(gid) => Some(gid.into_inner()),
            Err(e) => {
                warnings.push(format!("ignored product id '{token}': {e}"));
                None
            }
        })
        .collect()
}

/// Parse the rules JSON into a rule-set input.
///
/// A JSON parse failure omits the rule set entirely; individual rules that
/// violate the condition constraints are dropped. Either way the row keeps
/// going - if the platform rejects a smart collection without rules, that
/// surfaces as the row's remote error.
fn parse_rule_set(row: &CollectionRow, warnings: &mut Vec<String>) -> Option<RuleSetInput> {
    let raw = row.rules.trim();
    if raw.is_empty() {
        return None;
    }

    let rules: Vec<CollectionRule> = match serde_json::from_str(raw) {
        Ok(rules) => rules,
        Err(e) => {
            warnings.push(format!("rules JSON could not be parsed ({e}); rule set omitted"));
            return None;
        }
    };

    let applied_disjunctively = match parse_bool(&row.applied_disjunctively) {
        Some(value) => value,
        None => {
            if !row.applied_disjunctively.trim().is_empty() {
                warnings.push(format!(
                    "appliedDisjunctively '{}' is not a boolean; defaulting to false",
                    row.applied_disjunctively.trim()
                ));
            }
            false
        }
    };

    let rules = rules
        .into_iter()
        .filter_map(|rule| convert_rule(rule, warnings))
        .collect();

    Some(RuleSetInput {
        applied_disjunctively,
        rules,
    })
}

fn convert_rule(rule: CollectionRule, warnings: &mut Vec<String>) -> Option<RuleInput> {
    let condition = rule
        .condition
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    if rule.relation.is_unary() {
        return Some(RuleInput {
            column: rule.column,
            relation: rule.relation,
            condition: String::new(),
        });
    }

    if condition.is_empty() {
        warnings.push(format!(
            "rule {} {} requires a condition; rule dropped",
            rule.column, rule.relation
        ));
        return None;
    }

    if rule.relation.is_ordering()
        && rule.column.is_numeric()
        && condition.parse::<f64>().is_err()
    {
        warnings.push(format!(
            "rule {} {} needs a numeric condition, got '{condition}'; rule dropped",
            rule.column, rule.relation
        ));
        return None;
    }

    Some(RuleInput {
        column: rule.column,
        relation: rule.relation,
        condition,
    })
}
