//! Purchase and expense endpoints

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::costing::round_cents;
use crate::store::ledger::{Expense, NewExpense, NewPurchase, Purchase};
use crate::store::profiles::Role;
use crate::store::rpc::{ExpenseUpdateParams, PurchaseUpdateParams};
use crate::util::time::today;
use crate::validate::{self, ValidationError};

use super::error::AppError;
use super::middleware::AuthenticatedUser;
use super::sales::{RangeQuery, UpdateResponse};

// ============================================================================
// Purchases
// ============================================================================

pub async fn list_purchases_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    let range = query.resolve()?;
    let purchases = state
        .stores_for(&auth.access_token)
        .ledger
        .list_purchases(&range)
        .await?;
    Ok(Json(purchases))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    #[serde(default)]
    purchase_date: Option<NaiveDate>,
    #[serde(default)]
    supplier_id: Option<Uuid>,
    ingredient_id: Uuid,
    quantity: f64,
    unit_cost: f64,
    #[serde(default)]
    notes: Option<String>,
}

impl PurchaseRequest {
    fn into_new(self, created_by: Uuid, today: NaiveDate) -> Result<NewPurchase, ValidationError> {
        let quantity = validate::positive("quantity", self.quantity)?;
        let unit_cost = validate::non_negative("unit_cost", self.unit_cost)?;
        Ok(NewPurchase {
            purchase_date: self.purchase_date.unwrap_or(today),
            supplier_id: self.supplier_id,
            ingredient_id: self.ingredient_id,
            quantity,
            unit_cost,
            total_cost: round_cents(quantity * unit_cost),
            notes: validate::optional_text(self.notes.as_deref()),
            created_by,
        })
    }
}

pub async fn create_purchase_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<Purchase>), AppError> {
    let purchase = req.into_new(auth.user_id, today())?;

    let created = state
        .stores_for(&auth.access_token)
        .ledger
        .create_purchase(&purchase)
        .await?;

    info!(
        user_id = %auth.user_id,
        purchase_id = %created.id,
        ingredient_id = %created.ingredient_id,
        quantity = created.quantity,
        "Purchase logged"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseUpdateRequest {
    #[serde(default)]
    quantity: Option<f64>,
    #[serde(default)]
    unit_cost: Option<f64>,
    #[serde(default)]
    supplier_id: Option<Uuid>,
    #[serde(default)]
    notes: Option<String>,
}

impl PurchaseUpdateRequest {
    fn into_params(self, purchase_id: Uuid) -> Result<PurchaseUpdateParams, ValidationError> {
        if self.quantity.is_none()
            && self.unit_cost.is_none()
            && self.supplier_id.is_none()
            && self.notes.is_none()
        {
            return Err(ValidationError::new("body", "nothing to update"));
        }
        Ok(PurchaseUpdateParams {
            p_purchase_id: purchase_id,
            p_quantity: self.quantity.map(|q| validate::positive("quantity", q)).transpose()?,
            p_unit_cost: self.unit_cost.map(|c| validate::non_negative("unit_cost", c)).transpose()?,
            p_supplier_id: self.supplier_id,
            p_notes: self.notes,
        })
    }
}

pub async fn update_purchase_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(purchase_id): Path<Uuid>,
    Json(req): Json<PurchaseUpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    auth.require(Role::Manager)?;
    let params = req.into_params(purchase_id)?;

    let result = state
        .stores_for(&auth.access_token)
        .rpc
        .update_purchase(&params)
        .await?;

    info!(user_id = %auth.user_id, purchase_id = %purchase_id, "Purchase updated");

    Ok(Json(UpdateResponse { id: purchase_id, result }))
}

// ============================================================================
// Expenses
// ============================================================================

pub async fn list_expenses_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let range = query.resolve()?;
    let expenses = state
        .stores_for(&auth.access_token)
        .ledger
        .list_expenses(&range)
        .await?;
    Ok(Json(expenses))
}

#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    #[serde(default)]
    expense_date: Option<NaiveDate>,
    category: String,
    amount: f64,
    #[serde(default)]
    description: Option<String>,
}

impl ExpenseRequest {
    fn into_new(self, created_by: Uuid, today: NaiveDate) -> Result<NewExpense, ValidationError> {
        Ok(NewExpense {
            expense_date: self.expense_date.unwrap_or(today),
            category: validate::required_text("category", &self.category)?,
            amount: validate::positive("amount", self.amount)?,
            description: validate::optional_text(self.description.as_deref()),
            created_by,
        })
    }
}

pub async fn create_expense_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<ExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let expense = req.into_new(auth.user_id, today())?;

    let created = state
        .stores_for(&auth.access_token)
        .ledger
        .create_expense(&expense)
        .await?;

    info!(user_id = %auth.user_id, expense_id = %created.id, amount = created.amount, "Expense logged");

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct ExpenseUpdateRequest {
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ExpenseUpdateRequest {
    fn into_params(self, expense_id: Uuid) -> Result<ExpenseUpdateParams, ValidationError> {
        if self.amount.is_none() && self.category.is_none() && self.description.is_none() {
            return Err(ValidationError::new("body", "nothing to update"));
        }
        Ok(ExpenseUpdateParams {
            p_expense_id: expense_id,
            p_amount: self.amount.map(|a| validate::positive("amount", a)).transpose()?,
            p_category: self
                .category
                .as_deref()
                .map(|c| validate::required_text("category", c))
                .transpose()?,
            p_description: self.description,
        })
    }
}

pub async fn update_expense_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(expense_id): Path<Uuid>,
    Json(req): Json<ExpenseUpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    auth.require(Role::Manager)?;
    let params = req.into_params(expense_id)?;

    let result = state
        .stores_for(&auth.access_token)
        .rpc
        .update_expense(&params)
        .await?;

    info!(user_id = %auth.user_id, expense_id = %expense_id, "Expense updated");

    Ok(Json(UpdateResponse { id: expense_id, result }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[test]
    fn purchase_total_is_derived() {
        let req: PurchaseRequest = serde_json::from_value(serde_json::json!({
            "ingredient_id": Uuid::nil(),
            "quantity": 3,
            "unit_cost": 2.25
        }))
        .unwrap();
        let purchase = req.into_new(Uuid::nil(), day()).unwrap();
        assert_eq!(purchase.total_cost, 6.75);
        assert_eq!(purchase.purchase_date, day());
    }

    #[test]
    fn purchase_quantity_must_be_positive() {
        let req: PurchaseRequest = serde_json::from_value(serde_json::json!({
            "ingredient_id": Uuid::nil(),
            "quantity": 0,
            "unit_cost": 1
        }))
        .unwrap();
        assert_eq!(req.into_new(Uuid::nil(), day()).unwrap_err().field, "quantity");
    }

    #[test]
    fn expense_rules() {
        let req = ExpenseRequest {
            expense_date: None,
            category: " ".to_string(),
            amount: 10.0,
            description: None,
        };
        assert_eq!(req.into_new(Uuid::nil(), day()).unwrap_err().field, "category");

        let req = ExpenseRequest {
            expense_date: None,
            category: "utilities".to_string(),
            amount: -1.0,
            description: None,
        };
        assert_eq!(req.into_new(Uuid::nil(), day()).unwrap_err().field, "amount");
    }

    #[test]
    fn empty_updates_are_rejected() {
        let purchase = PurchaseUpdateRequest { quantity: None, unit_cost: None, supplier_id: None, notes: None };
        assert_eq!(purchase.into_params(Uuid::nil()).unwrap_err().field, "body");

        let expense = ExpenseUpdateRequest { amount: None, category: None, description: None };
        assert_eq!(expense.into_params(Uuid::nil()).unwrap_err().field, "body");

        let expense = ExpenseUpdateRequest { amount: Some(12.0), category: None, description: None };
        assert_eq!(expense.into_params(Uuid::nil()).unwrap().p_amount, Some(12.0));
    }
}
