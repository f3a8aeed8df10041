//! Report endpoints over the backend summaries

use axum::{
    extract::{Extension, Query, State},
    response::Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::costing::{round_cents, Overview};
use crate::stock::StockStatus;
use crate::store::inventory::OnHandWithIngredient;
use crate::store::summaries::{DailySummary, WeeklySummary};

use super::error::AppError;
use super::middleware::AuthenticatedUser;
use super::sales::RangeQuery;

pub async fn daily_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<DailySummary>>, AppError> {
    let range = query.resolve()?;
    let days = state
        .stores_for(&auth.access_token)
        .summaries
        .daily(&range)
        .await?;
    Ok(Json(days))
}

pub async fn weekly_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<WeeklySummary>>, AppError> {
    let range = query.resolve()?.widened_to_weeks()?;
    let weeks = state
        .stores_for(&auth.access_token)
        .summaries
        .weekly(&range)
        .await?;
    Ok(Json(weeks))
}

pub async fn overview_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Overview>, AppError> {
    let range = query.resolve()?;
    let days = state
        .stores_for(&auth.access_token)
        .summaries
        .daily(&range)
        .await?;
    Ok(Json(Overview::from_daily(&range, &days)))
}

/// Ingredient at or below its reorder point
#[derive(Debug, Serialize)]
pub struct LowStockItem {
    ingredient_id: Uuid,
    name: String,
    unit: String,
    quantity: f64,
    reorder_point: f64,
    par_level: f64,
    /// Quantity needed to get back to par
    to_par: f64,
    status: StockStatus,
}

fn low_stock(rows: Vec<OnHandWithIngredient>) -> Vec<LowStockItem> {
    let mut items: Vec<LowStockItem> = rows
        .into_iter()
        .filter_map(|row| {
            let ingredient = row.ingredient?;
            let status = StockStatus::classify(row.quantity, ingredient.reorder_point);
            if status == StockStatus::Ok {
                return None;
            }
            Some(LowStockItem {
                ingredient_id: row.ingredient_id,
                to_par: round_cents((ingredient.par_level - row.quantity).max(0.0)),
                name: ingredient.name,
                unit: ingredient.unit,
                quantity: row.quantity,
                reorder_point: ingredient.reorder_point,
                par_level: ingredient.par_level,
                status,
            })
        })
        .collect();

    // Out of stock first, then alphabetical
    items.sort_by(|a, b| {
        (a.status != StockStatus::Out)
            .cmp(&(b.status != StockStatus::Out))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    items
}

pub async fn low_stock_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<LowStockItem>>, AppError> {
    let rows = state
        .stores_for(&auth.access_token)
        .inventory
        .list_on_hand()
        .await?;
    Ok(Json(low_stock(rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(name: &str, quantity: f64, reorder_point: f64, par_level: f64) -> OnHandWithIngredient {
        serde_json::from_value(json!({
            "ingredient_id": Uuid::new_v4(),
            "quantity": quantity,
            "ingredients": {
                "id": Uuid::new_v4(),
                "name": name,
                "unit": "kg",
                "unit_cost": 1.0,
                "par_level": par_level,
                "reorder_point": reorder_point
            }
        }))
        .unwrap()
    }

    #[test]
    fn only_low_and_out_items_are_listed() {
        let items = low_stock(vec![
            row("tomatoes", 2.0, 5.0, 20.0),
            row("basil", 0.0, 1.0, 3.0),
            row("flour", 40.0, 10.0, 50.0),
        ]);

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["basil", "tomatoes"]);
        assert_eq!(items[0].status, StockStatus::Out);
        assert_eq!(items[1].to_par, 18.0);
    }

    #[test]
    fn rows_without_ingredient_are_skipped() {
        let orphan: OnHandWithIngredient = serde_json::from_value(json!({
            "ingredient_id": Uuid::new_v4(),
            "quantity": 0.0,
            "ingredients": null
        }))
        .unwrap();
        assert!(low_stock(vec![orphan]).is_empty());
    }
}
