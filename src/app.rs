use crate::handlers;
use crate::state::AppState;
use crate::ui::render_failure;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::index))
        .route("/api/records", get(handlers::list_records).post(handlers::add_record))
        .route(
            "/api/records/editing",
            get(handlers::get_editing).delete(handlers::cancel_editing),
        )
        .route(
            "/api/records/:id",
            put(handlers::edit_record).delete(handlers::delete_record),
        )
        .route("/api/records/:id/edit", post(handlers::begin_editing))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route(
            "/api/settings",
            get(handlers::get_settings).put(handlers::put_settings),
        )
        .route("/api/reset", post(handlers::reset_local_data))
        .route("/api/views", get(handlers::get_views))
        .route("/api/leads", get(handlers::list_leads))
        .route(
            "/api/leads/:id",
            get(handlers::get_lead).patch(handlers::update_lead),
        )
        .route("/api/leads/:id/history", get(handlers::lead_history))
        .route("/api/leads/:id/schedule", post(handlers::schedule_lead))
        .route(
            "/api/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/api/products/:id",
            put(handlers::update_product).delete(handlers::delete_product),
        )
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/categories/:id",
            put(handlers::update_category).delete(handlers::delete_category),
        );

    with_failure_boundary(routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A panic anywhere below this layer becomes a 500 with the failure page.
pub(crate) fn with_failure_boundary<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(CatchPanicLayer::custom(handle_panic))
}

/// Replaces whatever was being rendered with the generic failure page.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("request handler panicked: {detail}");

    (StatusCode::INTERNAL_SERVER_ERROR, Html(render_failure())).into_response()
}
