//! HTTP route definitions

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method},
    middleware,
    response::Json,
    routing::{delete, get, patch, post, put, MethodRouter},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::http::middleware::require_auth;
use crate::http::{catalog, inventory, ledger, menu, reports, sales, staff, users};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(users::me_handler))
        .route("/users", post(users::create_handler))
        // Catalog
        .route(
            "/ingredients",
            get(catalog::list_ingredients_handler).post(catalog::create_ingredient_handler),
        )
        .route("/ingredients/:id", patch(catalog::update_ingredient_handler))
        .route(
            "/suppliers",
            get(catalog::list_suppliers_handler).post(catalog::create_supplier_handler),
        )
        .route("/suppliers/:id", patch(catalog::update_supplier_handler))
        // Menu
        .route("/menu", get(menu::list_handler).post(menu::create_handler))
        .route(
            "/menu/:id",
            put(menu::update_handler).delete(menu::deactivate_handler),
        )
        .route("/menu/:id/image", image_route(&state))
        // Inventory
        .route("/inventory", get(inventory::list_handler))
        .route("/inventory/movements", get(inventory::movements_handler))
        .route("/inventory/adjust", post(inventory::adjust_handler))
        .route("/inventory/counts", post(inventory::count_handler))
        .route("/inventory/:id/settings", put(inventory::settings_handler))
        // Sales
        .route("/sales", get(sales::list_handler).post(sales::process_handler))
        .route("/sales/line-items/:id", patch(sales::update_line_item_handler))
        .route(
            "/sales/buffer",
            get(sales::buffer_list_handler)
                .post(sales::buffer_add_handler)
                .delete(sales::buffer_clear_handler),
        )
        .route("/sales/buffer/flush", post(sales::buffer_flush_handler))
        .route("/sales/buffer/:entry_id", delete(sales::buffer_remove_handler))
        // Purchases and expenses
        .route(
            "/purchases",
            get(ledger::list_purchases_handler).post(ledger::create_purchase_handler),
        )
        .route("/purchases/:id", patch(ledger::update_purchase_handler))
        .route(
            "/expenses",
            get(ledger::list_expenses_handler).post(ledger::create_expense_handler),
        )
        .route("/expenses/:id", patch(ledger::update_expense_handler))
        // Staff forms and reports
        .route("/staff/forms", post(staff::submit_handler))
        .route("/reports/daily", get(reports::daily_handler))
        .route("/reports/weekly", get(reports::weekly_handler))
        .route("/reports/overview", get(reports::overview_handler))
        .route("/reports/low-stock", get(reports::low_stock_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Image upload; one byte over the cap still reaches the handler, which answers with a JSON 413
fn image_route(state: &AppState) -> MethodRouter<AppState> {
    put(menu::image_handler)
        .layer(DefaultBodyLimit::max(state.config.max_image_bytes.saturating_add(1)))
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    buffered_entries: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        buffered_entries: state.sale_buffers.total_entries(),
    })
}
