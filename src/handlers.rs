use crate::errors::AppError;
use crate::filter::RecordFilter;
use crate::metrics::{goal_progress, FunnelMetrics};
use crate::models::{
    AppSettings, Category, CategoryInput, DailyRecord, DashboardResponse, FilterQuery, Lead,
    LeadDetail, LeadEditRequest, LeadHistory, NewScheduleEvent, ProductInput, ProductListing,
    RecordInput, ScheduleEvent, User, View, ViewsQuery,
};
use crate::state::AppState;
use crate::stats::build_stats;
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    Json,
};
use chrono::{Local, NaiveDate};
use tracing::{info, warn};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let metrics = {
        let store = state.records.lock().await;
        FunnelMetrics::compute(store.records())
    };
    let settings = state.settings.lock().await.current().clone();
    Html(render_index(&metrics, &settings))
}

// ========== Local records ==========

pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<DailyRecord>>, AppError> {
    let filter = filter_from(&query)?;
    let store = state.records.lock().await;
    Ok(Json(filter.apply(store.records())))
}

pub async fn add_record(
    State(state): State<AppState>,
    Json(input): Json<RecordInput>,
) -> Result<(StatusCode, Json<DailyRecord>), AppError> {
    validate_date(&input)?;
    let mut store = state.records.lock().await;
    let record = store.add(input, today()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn edit_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<RecordInput>,
) -> Result<Json<DailyRecord>, AppError> {
    validate_date(&input)?;
    let mut store = state.records.lock().await;
    let record = store.edit(&id, input, today()).await?;
    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.records.lock().await;
    store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn begin_editing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DailyRecord>, AppError> {
    let mut store = state.records.lock().await;
    let record = store.begin_edit(&id)?.clone();
    Ok(Json(record))
}

pub async fn get_editing(State(state): State<AppState>) -> Json<Option<DailyRecord>> {
    let store = state.records.lock().await;
    Json(store.editing().cloned())
}

pub async fn cancel_editing(State(state): State<AppState>) -> StatusCode {
    state.records.lock().await.cancel_edit();
    StatusCode::NO_CONTENT
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let filter = filter_from(&query)?;
    let records = {
        let store = state.records.lock().await;
        filter.apply(store.records())
    };
    let monthly_goal = state.settings.lock().await.current().monthly_goal;

    let metrics = FunnelMetrics::compute(&records);
    let goal_progress = goal_progress(metrics.totals.revenue, monthly_goal);

    Ok(Json(DashboardResponse {
        record_count: records.len(),
        goal_progress,
        stats: build_stats(&records),
        metrics,
    }))
}

// ========== Settings ==========

pub async fn get_settings(State(state): State<AppState>) -> Json<AppSettings> {
    Json(state.settings.lock().await.current().clone())
}

pub async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<AppSettings>,
) -> Result<Json<AppSettings>, AppError> {
    let mut store = state.settings.lock().await;
    let saved = store.save(settings).await?.clone();
    Ok(Json(saved))
}

/// Clears every local document and goes back to seed data and defaults.
pub async fn reset_local_data(State(state): State<AppState>) -> Result<Redirect, AppError> {
    state.records.lock().await.reset().await?;
    state.settings.lock().await.reset().await?;
    warn!("local data cleared");
    Ok(Redirect::to("/"))
}

pub async fn get_views(Query(query): Query<ViewsQuery>) -> Json<Vec<View>> {
    let user = User {
        id: String::new(),
        name: String::new(),
        email: String::new(),
        role: query.role,
        active: query.active,
    };
    Json(user.visible_views())
}

// ========== CRM ==========

pub async fn list_leads(State(state): State<AppState>) -> Result<Json<Vec<Lead>>, AppError> {
    Ok(Json(state.gateway()?.list_leads().await?))
}

pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LeadDetail>, AppError> {
    Ok(Json(lead_detail(&state, &id).await?))
}

pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LeadEditRequest>,
) -> Result<Json<LeadDetail>, AppError> {
    let gateway = state.gateway()?;
    let previous = gateway.get_lead(&id).await?;
    gateway
        .update_lead(&previous, &request.changes, request.note.as_deref())
        .await?;

    Ok(Json(lead_detail(&state, &id).await?))
}

pub async fn lead_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<LeadHistory>>, AppError> {
    Ok(Json(state.gateway()?.lead_history(&id).await?))
}

pub async fn schedule_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<NewScheduleEvent>,
) -> Result<(StatusCode, Json<ScheduleEvent>), AppError> {
    let scheduled = state.gateway()?.schedule(&id, &event).await?;
    info!(lead = %id, date = %scheduled.date, "lead scheduled");
    Ok((StatusCode::CREATED, Json(scheduled)))
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ProductListing>, AppError> {
    Ok(Json(state.gateway()?.list_products().await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<Json<ProductListing>, AppError> {
    let gateway = state.gateway()?;
    gateway.create_product(&input).await?;
    Ok(Json(gateway.list_products().await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<Json<ProductListing>, AppError> {
    let gateway = state.gateway()?;
    gateway.update_product(&id, &input).await?;
    Ok(Json(gateway.list_products().await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductListing>, AppError> {
    let gateway = state.gateway()?;
    gateway.delete_product(&id).await?;
    Ok(Json(gateway.list_products().await?))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.gateway()?.list_categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Vec<Category>>, AppError> {
    let gateway = state.gateway()?;
    gateway.create_category(&input).await?;
    Ok(Json(gateway.list_categories().await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Vec<Category>>, AppError> {
    let gateway = state.gateway()?;
    gateway.update_category(&id, &input).await?;
    Ok(Json(gateway.list_categories().await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Category>>, AppError> {
    let gateway = state.gateway()?;
    gateway.delete_category(&id).await?;
    Ok(Json(gateway.list_categories().await?))
}

async fn lead_detail(state: &AppState, id: &str) -> Result<LeadDetail, AppError> {
    let gateway = state.gateway()?;
    let lead = gateway.get_lead(id).await?;
    let history = gateway.lead_history(id).await?;
    Ok(LeadDetail { lead, history })
}

fn filter_from(query: &FilterQuery) -> Result<RecordFilter, AppError> {
    RecordFilter::from_query(
        query.month.as_deref(),
        query.start.as_deref(),
        query.end.as_deref(),
    )
}

fn validate_date(input: &RecordInput) -> Result<(), AppError> {
    match input.date.as_deref().map(str::trim) {
        Some(date) if !date.is_empty() => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|_| ())
            .map_err(|_| AppError::bad_request("date must be formatted as YYYY-MM-DD")),
        _ => Ok(()),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
