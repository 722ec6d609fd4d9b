use crate::auth::AccessContext;
use crate::cache::{
    self, CacheService, ReportKind, PROSPECT_TTL_SECS, REPORT_TTL_SECS,
};
use crate::classify::{
    self, DEFAULT_INACTIVE_DAYS,
};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::filters;
use crate::health::HealthAnalyzer;
use crate::models::*;
use crate::pardot_client::{PardotClient, PROSPECT_HEALTH_FIELDS};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Checksum-validated response cache keyed per caller token prefix.
    pub cache: CacheService,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "prospect-health-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Builds the full classification output for one fetched collection.
fn analyze_prospects(all_prospects: Vec<Prospect>) -> ProspectAnalysis {
    let now = Utc::now();
    let duplicates = classify::find_duplicates(&all_prospects);
    let inactive_prospects = classify::find_inactive(&all_prospects, DEFAULT_INACTIVE_DAYS, now);
    let missing_fields = classify::find_missing_fields(&all_prospects);
    let scoring_issues = classify::find_scoring_issues(&all_prospects);

    ProspectAnalysis {
        total_prospects: all_prospects.len(),
        all_prospects,
        duplicates,
        inactive_prospects,
        missing_fields,
        scoring_issues,
    }
}

/// Loads the cached prospect analysis or fails with the retry hint the
/// dashboard expects.
async fn require_analysis(
    state: &AppState,
    ctx: &AccessContext,
) -> Result<ProspectAnalysis, AppError> {
    let key = cache::prospects_key(ctx.token_prefix());
    state
        .cache
        .get_json::<ProspectAnalysis>(&key)
        .await
        .ok_or_else(|| {
            AppError::AnalysisNotReady("Please run prospect health analysis first".to_string())
        })
}

/// Loads the cached full report (default parameters) or fails with the
/// retry hint the dashboard expects.
async fn require_report(state: &AppState, ctx: &AccessContext) -> Result<HealthReport, AppError> {
    let key = cache::report_key(
        ReportKind::ProspectHealth,
        ctx.token_prefix(),
        &ReportQueryParams::default(),
    );
    state
        .cache
        .get_json::<HealthReport>(&key)
        .await
        .ok_or_else(|| {
            AppError::AnalysisNotReady("Please fetch prospect health data first".to_string())
        })
}

async fn build_report(
    state: &AppState,
    ctx: &AccessContext,
    kind: ReportKind,
    params: &ReportQueryParams,
) -> Result<HealthReport, AppError> {
    let key = cache::report_key(kind, ctx.token_prefix(), params);

    if let Some(report) = state.cache.get_json::<HealthReport>(&key).await {
        tracing::info!("{}: served from cache - key: {}", kind.as_str(), key);
        return Ok(report);
    }

    tracing::info!("{}: fetching from upstream - key: {}", kind.as_str(), key);
    let client = PardotClient::new(&state.config, &ctx.token)?;
    let analyzer = HealthAnalyzer::new(&client, &state.config);
    let report = analyzer.get_comprehensive_stats(params).await;

    state.cache.set_json(&key, &report, REPORT_TTL_SECS).await;
    Ok(report)
}

/// GET /api/v1/health/stats
///
/// Comprehensive database health statistics, cached per caller and filter
/// combination. Upstream failures degrade to a structurally complete
/// fallback report rather than an error.
pub async fn get_health_stats(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<ReportQueryParams>,
) -> Result<Json<HealthReport>, AppError> {
    let report = build_report(&state, &ctx, ReportKind::DatabaseHealth, &params).await?;
    Ok(Json(report))
}

/// GET /api/v1/health/report
///
/// Same computation as the stats endpoint, cached under an independent key
/// so the sectioned dashboard can refresh without disturbing the stats
/// view.
pub async fn get_health_report(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<ReportQueryParams>,
) -> Result<Json<HealthReport>, AppError> {
    let report = build_report(&state, &ctx, ReportKind::ProspectHealth, &params).await?;
    Ok(Json(report))
}

/// GET /api/v1/health/sections/:section
///
/// One section of the previously fetched report. Valid section names are
/// `active`, `inactive`, `data-quality`, and `scoring`.
pub async fn get_health_section(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Path(section): Path<String>,
) -> Result<Json<ReportSection>, AppError> {
    let report = require_report(&state, &ctx).await?;
    let section_data = match section.as_str() {
        "active" => report.active_contacts,
        "inactive" => report.inactive_contacts,
        "data-quality" => report.empty_details,
        "scoring" => report.scoring_issues,
        other => {
            return Err(AppError::NotFound(format!(
                "Unknown report section: {}",
                other
            )))
        }
    };
    Ok(Json(section_data))
}

/// GET /api/v1/health/charts
///
/// Chart descriptors from the previously fetched report, wrapped with the
/// metadata the visualization layer uses to pick renderers and palettes.
pub async fn get_health_charts(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = require_report(&state, &ctx).await?;
    let charts = report.chart_data;
    let chart_count = charts.len();
    Ok(Json(json!({
        "charts": charts,
        "chart_count": chart_count,
        "supported_types": ["line", "bar", "doughnut", "pie", "horizontalBar", "funnel"],
        "color_schemes": {
            "primary": ["rgba(54, 162, 235, 0.8)", "rgba(255, 99, 132, 0.8)", "rgba(255, 205, 86, 0.8)"],
            "success": ["rgba(75, 192, 192, 0.8)", "rgba(153, 255, 153, 0.8)", "rgba(144, 238, 144, 0.8)"],
            "warning": ["rgba(255, 159, 64, 0.8)", "rgba(255, 206, 86, 0.8)", "rgba(255, 235, 59, 0.8)"]
        }
    })))
}

/// GET /api/v1/health/recommendations
pub async fn get_health_recommendations(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = require_report(&state, &ctx).await?;
    Ok(Json(json!({ "recommendations": report.recommendations })))
}

/// GET /api/v1/prospects/health
///
/// Runs (or reuses) the full prospect analysis and returns its summary.
/// The underlying analysis is cached so the per-category listing endpoints
/// can page through it without refetching.
pub async fn get_prospect_health(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
) -> Result<Json<ProspectHealthSummary>, AppError> {
    let key = cache::prospects_key(ctx.token_prefix());

    if let Some(analysis) = state.cache.get_json::<ProspectAnalysis>(&key).await {
        tracing::info!("Prospect analysis served from cache - key: {}", key);
        return Ok(Json(ProspectHealthSummary::from_analysis(&analysis)));
    }

    tracing::info!("Prospect analysis: fetching from upstream - key: {}", key);
    let client = PardotClient::new(&state.config, &ctx.token)?;
    let prospects = client
        .fetch_prospects_by_url(PROSPECT_HEALTH_FIELDS, state.config.prospect_record_cap)
        .await
        .context("Failed to fetch prospect collection")?;

    let analysis = analyze_prospects(prospects);
    state.cache.set_json(&key, &analysis, PROSPECT_TTL_SECS).await;

    Ok(Json(ProspectHealthSummary::from_analysis(&analysis)))
}

/// GET /api/v1/prospects/all
pub async fn get_all_prospects(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analysis = require_analysis(&state, &ctx).await?;
    let (page_items, pagination) =
        filters::paginate(&analysis.all_prospects, params.page, params.per_page);
    Ok(Json(json!({
        "total_prospects": analysis.all_prospects.len(),
        "all_prospects": page_items,
        "pagination": pagination
    })))
}

/// GET /api/v1/prospects/active
pub async fn get_active_prospects(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analysis = require_analysis(&state, &ctx).await?;
    let active = analysis.active_prospects();
    let (page_items, pagination) = filters::paginate(&active, params.page, params.per_page);
    Ok(Json(json!({
        "total_active": active.len(),
        "active_prospects": page_items,
        "pagination": pagination
    })))
}

/// GET /api/v1/prospects/duplicates
///
/// Pagination is over duplicate groups, not individual records.
pub async fn get_duplicate_prospects(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analysis = require_analysis(&state, &ctx).await?;
    let (page_items, pagination) =
        filters::paginate(&analysis.duplicates, params.page, params.per_page);
    Ok(Json(json!({
        "total_duplicate_groups": analysis.duplicates.len(),
        "duplicate_prospects": page_items,
        "pagination": pagination
    })))
}

/// GET /api/v1/prospects/inactive
pub async fn get_inactive_prospects(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analysis = require_analysis(&state, &ctx).await?;
    let (page_items, pagination) =
        filters::paginate(&analysis.inactive_prospects, params.page, params.per_page);
    Ok(Json(json!({
        "total_inactive": analysis.inactive_prospects.len(),
        "inactive_prospects": page_items,
        "pagination": pagination
    })))
}

/// GET /api/v1/prospects/missing-fields
pub async fn get_missing_fields_prospects(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analysis = require_analysis(&state, &ctx).await?;
    let (page_items, pagination) =
        filters::paginate(&analysis.missing_fields, params.page, params.per_page);
    Ok(Json(json!({
        "total_with_missing_fields": analysis.missing_fields.len(),
        "prospects_missing_fields": page_items,
        "pagination": pagination
    })))
}

/// GET /api/v1/prospects/scoring-issues
pub async fn get_scoring_issues_prospects(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analysis = require_analysis(&state, &ctx).await?;
    let (page_items, pagination) =
        filters::paginate(&analysis.scoring_issues, params.page, params.per_page);
    Ok(Json(json!({
        "total_scoring_issues": analysis.scoring_issues.len(),
        "prospects_scoring_issues": page_items,
        "pagination": pagination
    })))
}

/// POST /api/v1/prospects/filter
///
/// Applies view, date-field, and date-range filters to the cached
/// collection, then paginates the result. Runs entirely against cached
/// data; no upstream call is made.
pub async fn filter_prospects(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Json(body): Json<FilterProspectsBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analysis = require_analysis(&state, &ctx).await?;
    if analysis.all_prospects.is_empty() {
        return Err(AppError::BadRequest("No prospect data available".to_string()));
    }

    let now = Utc::now();
    let filtered = filters::apply_filters(&analysis.all_prospects, &body.filters, now);
    let (page_items, pagination) = filters::paginate(&filtered, body.page, body.per_page);

    Ok(Json(json!({
        "total_prospects": analysis.all_prospects.len(),
        "filtered_count": filtered.len(),
        "prospects": page_items,
        "filters_applied": {
            "view": body.filters.view,
            "date_field": body.filters.date_field,
            "date_range": body.filters.date_range
        },
        "pagination": pagination
    })))
}

/// GET /api/v1/activities/count
///
/// Pageset-bounded activity count for one activity type; `days_back`
/// restricts the window.
pub async fn count_activities(
    State(state): State<Arc<AppState>>,
    ctx: AccessContext,
    Query(params): Query<ActivityCountParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let client = PardotClient::new(&state.config, &ctx.token)?;
    let count = client
        .count_activities(params.activity_type.as_deref(), params.days_back)
        .await
        .context("Failed to count visitor activities")?;
    Ok(Json(json!({
        "count": count,
        "type": params.activity_type,
        "days_back": params.days_back
    })))
}
