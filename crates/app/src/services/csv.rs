//! CSV parsing and rendering for collection files.
//!
//! Parsing stops at strings: quoted fields are unwrapped (doubled quotes,
//! embedded commas and newlines handled by the `csv` reader), but no field
//! is coerced here. Rows whose field count does not match the header row are
//! skipped and reported in the parse warnings instead of failing the file.

use csv::{ReaderBuilder, WriterBuilder};
use thiserror::Error;

use crate::models::CollectionRow;
use crate::shopify::RemoteCollection;

/// Errors that fail the whole file (as opposed to per-row warnings).
#[derive(Debug, Error)]
pub enum CsvError {
    /// The reader could not make sense of the input at all.
    #[error("{0}")]
    Read(#[from] csv::Error),

    /// The file has no header row.
    #[error("file has no header row")]
    MissingHeader,

    /// Rendering the export failed.
    #[error("failed to render CSV: {0}")]
    Render(String),
}

/// Result of parsing an import file.
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    /// Header names, in file order.
    pub headers: Vec<String>,
    /// Rows whose field count matched the header row.
    pub rows: Vec<CollectionRow>,
    /// Skipped-row notices (field-count mismatches).
    pub warnings: Vec<String>,
}

/// Parse an uploaded collections CSV.
///
/// # Errors
///
/// Returns `CsvError` when the file itself is unreadable; malformed
/// individual rows are reported in [`ParsedCsv::warnings`].
pub fn parse_collections_csv(text: &str) -> Result<ParsedCsv, CsvError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::MissingHeader);
    }

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // Fallback line numbering assumes one source line per record; the
        // reader position is authoritative when fields contain newlines.
        let line = record
            .position()
            .map_or(index + 2, |p| usize::try_from(p.line()).unwrap_or(index + 2));

        if record.len() != headers.len() {
            warnings.push(format!(
                "Row {line}: expected {} fields, found {}; row skipped",
                headers.len(),
                record.len()
            ));
            continue;
        }

        let fields: Vec<String> = record.iter().map(ToString::to_string).collect();
        rows.push(CollectionRow::from_fields(line, &headers, &fields));
    }

    Ok(ParsedCsv {
        headers,
        rows,
        warnings,
    })
}

/// Render exported collections in the canonical CSV layout.
///
/// The column order matches [`CollectionRow::COLUMNS`], so a rendered file
/// round-trips through [`parse_collections_csv`] and validation unchanged.
///
/// # Errors
///
/// Returns `CsvError::Render` if the writer fails.
pub fn write_collections_csv(collections: &[RemoteCollection]) -> Result<String, CsvError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer.write_record(CollectionRow::COLUMNS)?;

    for collection in collections {
        let is_smart = collection.is_smart();

        let rules = match &collection.rule_set {
            Some(rule_set) => serde_json::to_string(&rule_set.rules)
                .map_err(|e| CsvError::Render(e.to_string()))?,
            None => String::new(),
        };
        let applied_disjunctively = collection
            .rule_set
            .as_ref()
            .map(|rs| rs.applied_disjunctively.to_string())
            .unwrap_or_default();
        let products = if is_smart {
            String::new()
        } else {
            collection.product_ids.join(",")
        };

        writer.write_record([
            collection.id.as_str(),
            collection.title.as_str(),
            collection.handle.as_str(),
            collection.description_html.as_deref().unwrap_or(""),
            if is_smart { "smart" } else { "manual" },
            products.as_str(),
            rules.as_str(),
            applied_disjunctively.as_str(),
            collection.sort_order.as_deref().unwrap_or(""),
            collection
                .image
                .as_ref()
                .map(|i| i.url.as_str())
                .unwrap_or(""),
            collection
                .image
                .as_ref()
                .and_then(|i| i.alt_text.as_deref())
                .unwrap_or(""),
            collection.seo_title.as_deref().unwrap_or(""),
            collection.seo_description.as_deref().unwrap_or(""),
            collection.template_suffix.as_deref().unwrap_or(""),
            if collection.published { "true" } else { "false" },
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Render(e.to_string()))
}
