//! Collection endpoints: form create, CSV import (sync + bulk), export.

use axum::{
    Json, Router,
    extract::{Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use collectify_core::{CollectionHandle, ProductGid};

use crate::{
    db::UsageOperation,
    error::AppError,
    middleware::RequireShop,
    models::{CollectionRow, CollectionRule, ImportReport, RuleColumn, RuleRelation, SortOrder},
    services::{
        bulk::{BulkSubmission, MAX_BULK_ROWS, submit_bulk_import},
        csv::{parse_collections_csv, write_collections_csv},
        import::{run_export, run_import},
        usage::{UsageDecision, UsageService},
        validate::{MAX_TITLE_CHARS, validate_rows},
    },
    shopify::{BulkOperation, CollectionInput, CreatedCollection, ImageInput, RemoteCollection,
        RuleInput, RuleSetInput, SeoInput},
    state::AppState,
};

/// Build the collections router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/collections/create",
            post(create_collection).get(create_metadata),
        )
        .route("/collections/import", post(import_collections))
        .route("/collections/import-bulk", post(import_collections_bulk))
        .route("/collections/bulk-status", get(bulk_status))
        .route("/collections/export", get(export_collections))
}

// =============================================================================
// POST /collections/create
// =============================================================================

/// Request body for the form-based create endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    pub title: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub template_suffix: Option<String>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
    /// Product GIDs (manual collection).
    #[serde(default)]
    pub products: Option<Vec<String>>,
    /// Rule set (smart collection).
    #[serde(default)]
    pub rule_set: Option<RuleSetRequest>,
    #[serde(default)]
    pub image: Option<ImageRequest>,
    #[serde(default)]
    pub seo: Option<SeoRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetRequest {
    #[serde(default)]
    pub applied_disjunctively: bool,
    pub rules: Vec<CollectionRule>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateCollectionResponse {
    success: bool,
    collection: CreatedCollection,
}

/// Create one collection from a JSON form.
///
/// Unlike the CSV path, the form is strict: malformed product ids or rules
/// are validation errors, not warnings.
async fn create_collection(
    RequireShop(ctx): RequireShop,
    Json(body): Json<CreateCollectionRequest>,
) -> Result<Json<CreateCollectionResponse>, AppError> {
    let mut errors = Vec::new();

    if body.title.trim().is_empty() {
        errors.push("title is required".to_string());
    } else if body.title.chars().count() > MAX_TITLE_CHARS {
        errors.push(format!("title must be at most {MAX_TITLE_CHARS} characters"));
    }

    if let Some(handle) = body.handle.as_deref()
        && let Err(e) = CollectionHandle::parse(handle.trim())
    {
        errors.push(format!("invalid handle: {e}"));
    }

    match (&body.products, &body.rule_set) {
        (Some(_), Some(_)) => {
            errors.push("provide either products or ruleSet, not both".to_string());
        }
        (None, None) => {
            errors.push("provide either products (manual) or ruleSet (smart)".to_string());
        }
        (Some(products), None) => {
            for token in products {
                if let Err(e) = ProductGid::parse(token.trim()) {
                    errors.push(format!("invalid product id '{token}': {e}"));
                }
            }
        }
        (None, Some(rule_set)) => {
            if rule_set.rules.is_empty() {
                errors.push("ruleSet.rules must not be empty".to_string());
            }
            for rule in &rule_set.rules {
                validate_form_rule(rule, &mut errors);
            }
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mut input = CollectionInput::titled(body.title.trim());
    input.handle = body.handle.map(|h| h.trim().to_string());
    input.description_html = body.description_html.filter(|s| !s.trim().is_empty());
    input.template_suffix = body.template_suffix.filter(|s| !s.trim().is_empty());
    input.sort_order = body.sort_order;
    input.products = body
        .products
        .map(|products| products.iter().map(|p| p.trim().to_string()).collect());
    input.rule_set = body.rule_set.map(|rs| RuleSetInput {
        applied_disjunctively: rs.applied_disjunctively,
        rules: rs
            .rules
            .into_iter()
            .map(|rule| RuleInput {
                column: rule.column,
                relation: rule.relation,
                condition: if rule.relation.is_unary() {
                    String::new()
                } else {
                    rule.condition.unwrap_or_default().trim().to_string()
                },
            })
            .collect(),
    });
    input.image = body.image.map(|image| ImageInput {
        src: image.url.trim().to_string(),
        alt_text: image.alt.filter(|s| !s.trim().is_empty()),
    });
    input.seo = body.seo.and_then(|seo| {
        let title = seo.title.filter(|s| !s.trim().is_empty());
        let description = seo.description.filter(|s| !s.trim().is_empty());
        (title.is_some() || description.is_some()).then_some(SeoInput { title, description })
    });

    let collection = ctx.client.create_collection(&input).await?;

    Ok(Json(CreateCollectionResponse {
        success: true,
        collection,
    }))
}

fn validate_form_rule(rule: &CollectionRule, errors: &mut Vec<String>) {
    let condition = rule.condition.as_deref().map(str::trim).unwrap_or_default();

    if rule.relation.is_unary() {
        return;
    }
    if condition.is_empty() {
        errors.push(format!(
            "rule {} {} requires a condition",
            rule.column, rule.relation
        ));
        return;
    }
    if rule.relation.is_ordering() && rule.column.is_numeric() && condition.parse::<f64>().is_err() {
        errors.push(format!(
            "rule {} {} requires a numeric condition, got '{condition}'",
            rule.column, rule.relation
        ));
    }
}

// =============================================================================
// GET /collections/create (metadata)
// =============================================================================

/// Enumerations and example payloads for building the create form.
async fn create_metadata() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "ruleColumns": RuleColumn::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        "ruleRelations": RuleRelation::ALL.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "sortOrders": SortOrder::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "examples": {
            "manual": {
                "title": "Staff picks",
                "products": ["gid://shopify/Product/632910392"],
                "sortOrder": "MANUAL"
            },
            "smart": {
                "title": "Summer sale",
                "ruleSet": {
                    "appliedDisjunctively": false,
                    "rules": [
                        {"column": "TAG", "relation": "EQUALS", "condition": "summer"},
                        {"column": "VARIANT_PRICE", "relation": "LESS_THAN", "condition": "50"}
                    ]
                }
            }
        }
    }))
}

// =============================================================================
// POST /collections/import
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    success: bool,
    dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(flatten)]
    report: ImportReport,
}

struct ImportUpload {
    text: String,
    dry_run: bool,
}

async fn read_import_upload(mut multipart: Multipart) -> Result<ImportUpload, AppError> {
    let mut text = None;
    let mut dry_run = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("file") => text = Some(field.text().await?),
            Some("dryRun") => {
                dry_run = field.text().await?.trim().eq_ignore_ascii_case("true");
            }
            _ => {}
        }
    }

    let text = text.ok_or_else(|| AppError::BadRequest("missing 'file' field".to_string()))?;
    Ok(ImportUpload { text, dry_run })
}

/// Synchronous CSV import. All-or-nothing validation, then sequential
/// per-row creation with partial success.
async fn import_collections(
    RequireShop(ctx): RequireShop,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let upload = read_import_upload(multipart).await?;

    let parsed = parse_collections_csv(&upload.text)?;
    if parsed.rows.is_empty() {
        return Err(AppError::BadRequest(
            "file contains no data rows".to_string(),
        ));
    }

    let errors = validate_rows(&parsed.rows);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let usage = UsageService::new(state.pool());
    let requested = row_count(&parsed.rows)?;
    let decision = usage.check(&ctx.shop, requested).await?;
    if !decision.can_proceed {
        return Err(AppError::UsageLimit(decision));
    }

    if upload.dry_run {
        let report = run_import(&ctx.client, &parsed.rows, true).await;
        return Ok(Json(ImportResponse {
            success: true,
            dry_run: true,
            warnings: parsed.warnings,
            report,
        }));
    }

    // Atomic reservation closes the gap between the friendly check above
    // and the work below.
    if !usage
        .try_reserve(&ctx.shop, UsageOperation::Import, requested)
        .await?
    {
        return Err(AppError::UsageLimit(denied(decision)));
    }

    let report = run_import(&ctx.client, &parsed.rows, false).await;

    // Hand failed rows' capacity back.
    let failed = u32::try_from(report.errors).unwrap_or(0);
    usage
        .release(&ctx.shop, UsageOperation::Import, failed)
        .await?;

    Ok(Json(ImportResponse {
        success: true,
        dry_run: false,
        warnings: parsed.warnings,
        report,
    }))
}

fn row_count(rows: &[CollectionRow]) -> Result<u32, AppError> {
    u32::try_from(rows.len())
        .map_err(|_| AppError::BadRequest("file contains too many rows".to_string()))
}

/// A decision re-stamped as denied, for the race where the preview check
/// passed but the reservation lost.
fn denied(decision: UsageDecision) -> UsageDecision {
    UsageDecision {
        can_proceed: false,
        ..decision
    }
}

// =============================================================================
// POST /collections/import-bulk
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkImportResponse {
    success: bool,
    bulk_operation_id: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

/// Asynchronous bulk import: NDJSON staged upload + remote bulk mutation.
async fn import_collections_bulk(
    RequireShop(ctx): RequireShop,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BulkImportResponse>, AppError> {
    let upload = read_import_upload(multipart).await?;

    let parsed = parse_collections_csv(&upload.text)?;
    if parsed.rows.is_empty() {
        return Err(AppError::BadRequest(
            "file contains no data rows".to_string(),
        ));
    }
    if parsed.rows.len() > MAX_BULK_ROWS {
        return Err(AppError::BadRequest(format!(
            "bulk import accepts at most {MAX_BULK_ROWS} rows per file"
        )));
    }

    let errors = validate_rows(&parsed.rows);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let usage = UsageService::new(state.pool());
    let requested = row_count(&parsed.rows)?;
    let decision = usage.check(&ctx.shop, requested).await?;
    if !decision.can_proceed {
        return Err(AppError::UsageLimit(decision));
    }
    if !usage
        .try_reserve(&ctx.shop, UsageOperation::Import, requested)
        .await?
    {
        return Err(AppError::UsageLimit(denied(decision)));
    }

    let BulkSubmission {
        operation_id,
        rows,
        mut warnings,
    } = match submit_bulk_import(&ctx.client, &parsed.rows).await {
        Ok(submission) => submission,
        Err(e) => {
            // Nothing was launched; give the capacity back.
            usage
                .release(&ctx.shop, UsageOperation::Import, requested)
                .await?;
            return Err(e.into());
        }
    };

    let mut all_warnings = parsed.warnings;
    all_warnings.append(&mut warnings);

    Ok(Json(BulkImportResponse {
        success: true,
        bulk_operation_id: operation_id,
        message: format!("Bulk import of {rows} collections started"),
        warnings: all_warnings,
    }))
}

// =============================================================================
// GET /collections/bulk-status
// =============================================================================

#[derive(Debug, Deserialize)]
struct BulkStatusQuery {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkStatusResponse {
    success: bool,
    bulk_operation: BulkOperation,
}

/// Re-query the remote job; nothing is cached locally.
async fn bulk_status(
    RequireShop(ctx): RequireShop,
    Query(query): Query<BulkStatusQuery>,
) -> Result<Json<BulkStatusResponse>, AppError> {
    let operation = ctx
        .client
        .bulk_operation(&query.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("bulk operation {}", query.id)))?;

    Ok(Json(BulkStatusResponse {
        success: true,
        bulk_operation: operation,
    }))
}

// =============================================================================
// GET /collections/export
// =============================================================================

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportResponse {
    success: bool,
    collections: Vec<RemoteCollection>,
    total_count: usize,
    truncated: bool,
}

/// Export collections, gated by the usage limiter. The exported count is
/// only known after the fetch, so the monthly gate runs first and the
/// actual count is recorded after success.
async fn export_collections(
    RequireShop(ctx): RequireShop,
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let usage = UsageService::new(state.pool());
    let decision = usage.check(&ctx.shop, 1).await?;
    if !decision.can_proceed {
        return Err(AppError::UsageLimit(decision));
    }

    let outcome = run_export(&ctx.client).await?;

    let exported = u32::try_from(outcome.collections.len()).unwrap_or(0);
    usage
        .record(&ctx.shop, UsageOperation::Export, exported)
        .await?;

    if query.format.as_deref() == Some("csv") {
        let csv = write_collections_csv(&outcome.collections)?;
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"collections.csv\"",
                ),
            ],
            csv,
        )
            .into_response());
    }

    Ok(Json(ExportResponse {
        success: true,
        total_count: outcome.collections.len(),
        collections: outcome.collections,
        truncated: outcome.truncated,
    })
    .into_response())
}
