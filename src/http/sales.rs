//! Sales endpoints: process a sale, list sales, edit line items, and the sale batch buffer

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::buffer::BufferEntry;
use crate::stock::preflight_sale;
use crate::store::rpc::{BufferSalesParams, ProcessSaleParams, SaleLineParam, SaleLineUpdateParams};
use crate::store::sales::SaleWithLines;
use crate::store::Stores;
use crate::util::time::{today, DateRange};
use crate::validate::{self, ValidationError};

use super::error::AppError;
use super::middleware::AuthenticatedUser;

fn validate_line(line: &SaleLineParam) -> Result<(), ValidationError> {
    validate::positive("quantity", line.quantity)?;
    validate::non_negative("unit_price", line.unit_price)?;
    Ok(())
}

/// Refuse with the shortfall list when stock cannot cover `lines`
async fn ensure_stock(stores: &Stores, lines: &[(Uuid, f64)]) -> Result<(), AppError> {
    let shortfalls = preflight_sale(stores, lines).await?;
    if shortfalls.is_empty() {
        Ok(())
    } else {
        Err(AppError::InsufficientStock(shortfalls))
    }
}

// ============================================================================
// Listing
// ============================================================================

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RangeQuery {
    pub fn resolve(&self) -> Result<DateRange, ValidationError> {
        DateRange::resolve(self.from, self.to, today())
    }
}

pub async fn list_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<SaleWithLines>>, AppError> {
    let range = query.resolve()?;
    let sales = state.stores_for(&auth.access_token).sales.list(&range).await?;
    Ok(Json(sales))
}

// ============================================================================
// Process sale
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaleRequest {
    #[serde(default)]
    sale_date: Option<NaiveDate>,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    lines: Vec<SaleLineParam>,
}

impl SaleRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.lines.is_empty() {
            return Err(ValidationError::new("lines", "a sale needs at least one line"));
        }
        self.lines.iter().try_for_each(validate_line)
    }
}

#[derive(Serialize)]
pub struct SaleResponse {
    sale: serde_json::Value,
    total_amount: f64,
}

pub async fn process_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<SaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    req.validate()?;
    let stores = state.stores_for(&auth.access_token);

    let portions: Vec<(Uuid, f64)> = req.lines.iter().map(|l| (l.menu_item_id, l.quantity)).collect();
    ensure_stock(&stores, &portions).await?;

    let total_amount = crate::costing::round_cents(
        req.lines.iter().map(|l| l.quantity * l.unit_price).sum::<f64>(),
    );

    let sale = stores
        .rpc
        .process_sale(&ProcessSaleParams {
            p_sale_date: req.sale_date.unwrap_or_else(today),
            p_payment_method: validate::optional_text(req.payment_method.as_deref()),
            p_notes: validate::optional_text(req.notes.as_deref()),
            p_line_items: req.lines,
        })
        .await?;

    info!(user_id = %auth.user_id, total_amount, "Sale processed");

    Ok((StatusCode::CREATED, Json(SaleResponse { sale, total_amount })))
}

// ============================================================================
// Line item edits
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LineItemUpdateRequest {
    #[serde(default)]
    quantity: Option<f64>,
    #[serde(default)]
    unit_price: Option<f64>,
}

impl LineItemUpdateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity.is_none() && self.unit_price.is_none() {
            return Err(ValidationError::new("body", "nothing to update"));
        }
        if let Some(quantity) = self.quantity {
            validate::positive("quantity", quantity)?;
        }
        if let Some(price) = self.unit_price {
            validate::non_negative("unit_price", price)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub id: Uuid,
    pub result: serde_json::Value,
}

pub async fn update_line_item_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(line_item_id): Path<Uuid>,
    Json(req): Json<LineItemUpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    req.validate()?;
    let stores = state.stores_for(&auth.access_token);

    let line = stores
        .sales
        .get_line_item(line_item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale line item not found".to_string()))?;

    // Only the extra portions consume stock
    if let Some(quantity) = req.quantity {
        let extra = quantity - line.quantity;
        if extra > 0.0 {
            ensure_stock(&stores, &[(line.menu_item_id, extra)]).await?;
        }
    }

    let result = stores
        .rpc
        .update_sale_line_item(&SaleLineUpdateParams {
            p_line_item_id: line_item_id,
            p_quantity: req.quantity,
            p_unit_price: req.unit_price,
        })
        .await?;

    info!(user_id = %auth.user_id, line_item_id = %line_item_id, "Sale line item updated");

    Ok(Json(UpdateResponse { id: line_item_id, result }))
}

// ============================================================================
// Sale buffer
// ============================================================================

#[derive(Serialize)]
pub struct BufferView {
    entries: Vec<BufferEntry>,
    total_amount: f64,
    capacity: usize,
}

fn buffer_total(entries: &[BufferEntry]) -> f64 {
    crate::costing::round_cents(
        entries
            .iter()
            .map(|e| e.line.quantity * e.line.unit_price)
            .sum::<f64>(),
    )
}

fn buffer_view(state: &AppState, entries: Vec<BufferEntry>) -> BufferView {
    BufferView {
        total_amount: buffer_total(&entries),
        entries,
        capacity: state.config.max_buffer_entries,
    }
}

pub async fn buffer_list_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Json<BufferView> {
    let entries = state.sale_buffers.list(auth.user_id);
    Json(buffer_view(&state, entries))
}

pub async fn buffer_add_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(line): Json<SaleLineParam>,
) -> Result<(StatusCode, Json<BufferEntry>), AppError> {
    validate_line(&line)?;
    let entry = state.sale_buffers.add(auth.user_id, line)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn buffer_remove_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sale_buffers.remove(auth.user_id, entry_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct ClearResponse {
    removed: usize,
}

pub async fn buffer_clear_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<ClearResponse>, AppError> {
    let removed = state.sale_buffers.clear(auth.user_id)?;
    Ok(Json(ClearResponse { removed }))
}

#[derive(Debug, Default, Deserialize)]
pub struct FlushRequest {
    #[serde(default)]
    sale_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct FlushResponse {
    flushed: usize,
    total_amount: f64,
    result: serde_json::Value,
}

/// Log every buffered entry in one call; the buffer is only trimmed after success
pub async fn buffer_flush_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    req: Option<Json<FlushRequest>>,
) -> Result<Json<FlushResponse>, AppError> {
    let req = req.map(|Json(r)| r).unwrap_or_default();

    // Held until the end of the handler; a concurrent flush for this user gets a 409
    let pending = state.sale_buffers.begin_flush(auth.user_id)?;
    if pending.entries().is_empty() {
        return Err(AppError::BadRequest("Sale buffer is empty".to_string()));
    }

    let stores = state.stores_for(&auth.access_token);
    let portions: Vec<(Uuid, f64)> = pending
        .entries()
        .iter()
        .map(|e| (e.line.menu_item_id, e.line.quantity))
        .collect();
    ensure_stock(&stores, &portions).await?;

    let total_amount = buffer_total(pending.entries());
    let params = BufferSalesParams {
        p_sale_date: req.sale_date.unwrap_or_else(today),
        p_entries: pending.entries().iter().map(|e| e.line.clone()).collect(),
    };

    let result = stores.rpc.log_buffer_sales(&params).await.map_err(|e| {
        warn!(user_id = %auth.user_id, entries = params.p_entries.len(), "Buffer flush failed, keeping entries");
        e
    })?;

    let flushed = pending.commit();

    info!(user_id = %auth.user_id, flushed, total_amount, "Sale buffer flushed");

    Ok(Json(FlushResponse {
        flushed,
        total_amount,
        result,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use serde_json::json;

    use crate::http::middleware::test_user;
    use crate::store::mock::MockBackend;
    use crate::store::profiles::Role;

    fn line(quantity: f64, unit_price: f64) -> SaleLineParam {
        SaleLineParam {
            menu_item_id: Uuid::new_v4(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn sale_needs_lines_with_positive_quantity() {
        let empty = SaleRequest { sale_date: None, payment_method: None, notes: None, lines: vec![] };
        assert_eq!(empty.validate().unwrap_err().field, "lines");

        let zero = SaleRequest { sale_date: None, payment_method: None, notes: None, lines: vec![line(0.0, 5.0)] };
        assert_eq!(zero.validate().unwrap_err().field, "quantity");

        let negative_price = SaleRequest { sale_date: None, payment_method: None, notes: None, lines: vec![line(1.0, -5.0)] };
        assert_eq!(negative_price.validate().unwrap_err().field, "unit_price");

        let ok = SaleRequest { sale_date: None, payment_method: None, notes: None, lines: vec![line(2.0, 0.0)] };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn line_update_needs_a_change() {
        let nothing = LineItemUpdateRequest { quantity: None, unit_price: None };
        assert_eq!(nothing.validate().unwrap_err().field, "body");

        let price_only = LineItemUpdateRequest { quantity: None, unit_price: Some(3.0) };
        assert!(price_only.validate().is_ok());
    }

    async fn flush_against(
        respond: impl Fn(&Method, &str) -> (StatusCode, serde_json::Value) + Send + Sync + 'static,
    ) -> (MockBackend, AppState, AuthenticatedUser, Result<Json<FlushResponse>, AppError>) {
        let backend = MockBackend::start(respond).await;
        let state = AppState::new(backend.config()).unwrap();
        let user = test_user(Role::Staff);
        state.sale_buffers.add(user.user_id, line(2.0, 4.5)).unwrap();
        state.sale_buffers.add(user.user_id, line(1.0, 3.0)).unwrap();

        let result =
            buffer_flush_handler(State(state.clone()), Extension(user.clone()), None).await;
        (backend, state, user, result)
    }

    #[tokio::test]
    async fn failed_flush_keeps_every_entry() {
        let (backend, state, user, result) = flush_against(|method, path| match (method.as_str(), path) {
            ("GET", "/rest/v1/recipe_ingredients") => (StatusCode::OK, json!([])),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "connection reset" })),
        })
        .await;

        assert!(matches!(result, Err(AppError::Backend(_))));
        assert_eq!(backend.count(Method::POST, "/rest/v1/rpc/log_buffer_sales"), 1);
        assert_eq!(state.sale_buffers.list(user.user_id).len(), 2);
        // The failed flush no longer blocks the next one
        assert!(state.sale_buffers.begin_flush(user.user_id).is_ok());
    }

    #[tokio::test]
    async fn successful_flush_empties_the_buffer() {
        let (_backend, state, user, result) = flush_against(|method, path| match (method.as_str(), path) {
            ("GET", "/rest/v1/recipe_ingredients") => (StatusCode::OK, json!([])),
            ("POST", "/rest/v1/rpc/log_buffer_sales") => (StatusCode::OK, json!([Uuid::new_v4()])),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "unexpected" })),
        })
        .await;

        let Json(response) = result.unwrap();
        assert_eq!(response.flushed, 2);
        assert_eq!(response.total_amount, 12.0);
        assert!(state.sale_buffers.list(user.user_id).is_empty());
    }

    #[tokio::test]
    async fn concurrent_flush_is_a_conflict() {
        let state = AppState::new(crate::config::test_config()).unwrap();
        let user = test_user(Role::Staff);
        state.sale_buffers.add(user.user_id, line(1.0, 2.0)).unwrap();

        let in_flight = state.sale_buffers.begin_flush(user.user_id).unwrap();
        let result =
            buffer_flush_handler(State(state.clone()), Extension(user.clone()), None).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        drop(in_flight);
        assert_eq!(state.sale_buffers.list(user.user_id).len(), 1);
    }

    #[test]
    fn buffer_view_totals_entries() {
        let state = AppState::new(crate::config::test_config()).unwrap();
        let user = Uuid::new_v4();
        state.sale_buffers.add(user, line(2.0, 4.5)).unwrap();
        state.sale_buffers.add(user, line(1.0, 0.99)).unwrap();

        let view = buffer_view(&state, state.sale_buffers.list(user));
        assert_eq!(view.total_amount, 9.99);
        assert_eq!(view.capacity, 3);
        assert_eq!(view.entries.len(), 2);
    }
}
