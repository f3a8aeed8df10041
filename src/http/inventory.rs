//! Inventory endpoints: stock list, movements, adjustments, counts, settings

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::app::AppState;
use crate::stock::{check_level, StockLevel, StockStatus, TOLERANCE};
use crate::store::inventory::{InventoryMovement, MovementType, NewMovement};
use crate::store::profiles::Role;
use crate::store::rpc::{InventorySettingsParams, StockCountParams};
use crate::validate::{self, ValidationError};

use super::error::AppError;
use super::middleware::AuthenticatedUser;

const DEFAULT_MOVEMENT_LIMIT: usize = 100;
const MAX_MOVEMENT_LIMIT: usize = 500;

// ============================================================================
// Stock list
// ============================================================================

#[derive(Serialize)]
pub struct InventoryRow {
    ingredient_id: Uuid,
    name: String,
    unit: String,
    category: Option<String>,
    quantity: f64,
    par_level: f64,
    reorder_point: f64,
    unit_cost: f64,
    stock_value: f64,
    status: StockStatus,
    last_counted_at: Option<DateTime<Utc>>,
}

pub async fn list_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<InventoryRow>>, AppError> {
    let rows = state
        .stores_for(&auth.access_token)
        .inventory
        .list_on_hand()
        .await?;

    let mut items: Vec<InventoryRow> = rows
        .into_iter()
        .filter_map(|row| {
            row.ingredient.map(|ingredient| InventoryRow {
                ingredient_id: row.ingredient_id,
                status: StockStatus::classify(row.quantity, ingredient.reorder_point),
                stock_value: crate::costing::round_cents(row.quantity * ingredient.unit_cost),
                name: ingredient.name,
                unit: ingredient.unit,
                category: ingredient.category,
                quantity: row.quantity,
                par_level: ingredient.par_level,
                reorder_point: ingredient.reorder_point,
                unit_cost: ingredient.unit_cost,
                last_counted_at: row.last_counted_at,
            })
        })
        .collect();

    items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(Json(items))
}

#[derive(Deserialize)]
pub struct MovementQuery {
    ingredient_id: Option<Uuid>,
    limit: Option<usize>,
}

pub async fn movements_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<MovementQuery>,
) -> Result<Json<Vec<InventoryMovement>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
        .clamp(1, MAX_MOVEMENT_LIMIT);

    let movements = state
        .stores_for(&auth.access_token)
        .inventory
        .movements(query.ingredient_id, limit)
        .await?;

    Ok(Json(movements))
}

// ============================================================================
// Adjustments
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    ingredient_id: Uuid,
    delta: f64,
    reason: String,
}

impl AdjustRequest {
    /// Returns the trimmed reason
    fn validate(&self) -> Result<String, ValidationError> {
        validate::finite("delta", self.delta)?;
        if self.delta.abs() <= TOLERANCE {
            return Err(ValidationError::new("delta", "must not be zero"));
        }
        validate::required_text("reason", &self.reason)
    }
}

#[derive(Serialize)]
pub struct AdjustResponse {
    ingredient_id: Uuid,
    quantity_before: f64,
    quantity_after: f64,
    /// `None` when the stock changed but the movement row could not be written
    movement_id: Option<Uuid>,
}

/// Apply a manual stock correction with a compare-and-swap on the on-hand row
pub async fn adjust_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<AdjustResponse>, AppError> {
    auth.require(Role::Manager)?;
    let reason = req.validate()?;
    let stores = state.stores_for(&auth.access_token);

    let ingredient = stores
        .catalog
        .ingredients_by_ids(&[req.ingredient_id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Ingredient not found".to_string()))?;

    let max_attempts = state.config.adjust_max_attempts.max(1);
    let mut attempt = 0;

    let (before, after) = loop {
        attempt += 1;

        let current = stores.inventory.get_on_hand(req.ingredient_id).await?;
        let before = current.as_ref().map(|row| row.quantity).unwrap_or(0.0);
        let after = before + req.delta;

        if after < -TOLERANCE {
            let level = StockLevel {
                name: ingredient.name.clone(),
                unit: ingredient.unit.clone(),
                on_hand: before,
            };
            let shortfall = check_level(req.ingredient_id, Some(&level), -req.delta);
            return Err(AppError::InsufficientStock(shortfall.into_iter().collect()));
        }
        let after = after.max(0.0);

        let applied = match current {
            Some(_) => {
                stores
                    .inventory
                    .compare_and_set(req.ingredient_id, before, after)
                    .await?
            }
            None => match stores.inventory.create_on_hand(req.ingredient_id, after).await {
                Ok(_) => true,
                // Someone created the row first; re-read and try again
                Err(e) if e.status() == Some(409) => false,
                Err(e) => return Err(e.into()),
            },
        };

        if applied {
            break (before, after);
        }
        if attempt >= max_attempts {
            return Err(AppError::Conflict(
                "Stock changed concurrently, please retry".to_string(),
            ));
        }
        debug!(ingredient_id = %req.ingredient_id, attempt, "Concurrent stock change, retrying adjustment");
    };

    // Stock is already committed; report the adjustment even without its movement row
    let movement_id = match stores
        .inventory
        .record_movement(&NewMovement {
            ingredient_id: req.ingredient_id,
            movement_type: MovementType::Adjustment,
            quantity_change: after - before,
            quantity_after: Some(after),
            reason: Some(reason),
            reference_id: None,
            created_by: Some(auth.user_id),
        })
        .await
    {
        Ok(movement) => Some(movement.id),
        Err(e) => {
            error!(
                user_id = %auth.user_id,
                ingredient_id = %req.ingredient_id,
                before,
                after,
                error = %e,
                "Adjustment applied but movement not recorded"
            );
            None
        }
    };

    info!(
        user_id = %auth.user_id,
        ingredient_id = %req.ingredient_id,
        before,
        after,
        "Inventory adjusted"
    );

    Ok(Json(AdjustResponse {
        ingredient_id: req.ingredient_id,
        quantity_before: before,
        quantity_after: after,
        movement_id,
    }))
}

// ============================================================================
// Counts and settings
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StockCountRequest {
    ingredient_id: Uuid,
    counted_quantity: f64,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Serialize)]
pub struct RpcResponse {
    pub status: &'static str,
    pub result: serde_json::Value,
}

pub async fn count_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<StockCountRequest>,
) -> Result<Json<RpcResponse>, AppError> {
    validate::non_negative("counted_quantity", req.counted_quantity)?;

    let result = state
        .stores_for(&auth.access_token)
        .rpc
        .log_stock_count(&StockCountParams {
            p_ingredient_id: req.ingredient_id,
            p_counted_quantity: req.counted_quantity,
            p_notes: validate::optional_text(req.notes.as_deref()),
        })
        .await?;

    info!(
        user_id = %auth.user_id,
        ingredient_id = %req.ingredient_id,
        counted = req.counted_quantity,
        "Stock count logged"
    );

    Ok(Json(RpcResponse { status: "recorded", result }))
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    par_level: f64,
    reorder_point: f64,
    #[serde(default)]
    unit_cost: Option<f64>,
}

impl SettingsRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_negative("par_level", self.par_level)?;
        validate::non_negative("reorder_point", self.reorder_point)?;
        if let Some(cost) = self.unit_cost {
            validate::non_negative("unit_cost", cost)?;
        }
        if self.reorder_point > self.par_level + TOLERANCE {
            return Err(ValidationError::new("reorder_point", "must not exceed par_level"));
        }
        Ok(())
    }
}

pub async fn settings_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(ingredient_id): Path<Uuid>,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<RpcResponse>, AppError> {
    auth.require(Role::Manager)?;
    req.validate()?;

    let result = state
        .stores_for(&auth.access_token)
        .rpc
        .update_inventory_settings(&InventorySettingsParams {
            p_ingredient_id: ingredient_id,
            p_par_level: req.par_level,
            p_reorder_point: req.reorder_point,
            p_unit_cost: req.unit_cost,
        })
        .await?;

    info!(user_id = %auth.user_id, ingredient_id = %ingredient_id, "Inventory settings updated");

    Ok(Json(RpcResponse { status: "updated", result }))
}
