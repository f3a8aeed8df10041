//! End-of-shift staff forms: counts, waste and petty expenses in one submission

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;
use crate::store::rpc::{CountEntry, ExpenseEntry, StaffFormsParams, WasteEntry};
use crate::util::time::today;
use crate::validate::{self, ValidationError};

use super::error::AppError;
use super::inventory::RpcResponse;
use super::middleware::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct StaffFormRequest {
    #[serde(default)]
    form_date: Option<NaiveDate>,
    #[serde(default)]
    counts: Vec<CountEntry>,
    #[serde(default)]
    waste: Vec<WasteEntry>,
    #[serde(default)]
    expenses: Vec<ExpenseEntry>,
    #[serde(default)]
    notes: Option<String>,
}

impl StaffFormRequest {
    fn into_params(self, today: NaiveDate) -> Result<StaffFormsParams, ValidationError> {
        if self.counts.is_empty() && self.waste.is_empty() && self.expenses.is_empty() {
            return Err(ValidationError::new("form", "needs at least one count, waste or expense entry"));
        }

        validate::unique("counts", self.counts.iter().map(|c| c.ingredient_id))?;
        for count in &self.counts {
            validate::non_negative("counts.counted_quantity", count.counted_quantity)?;
        }

        let waste = self
            .waste
            .into_iter()
            .map(|entry| {
                Ok(WasteEntry {
                    quantity: validate::positive("waste.quantity", entry.quantity)?,
                    reason: validate::optional_text(entry.reason.as_deref()),
                    ingredient_id: entry.ingredient_id,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let expenses = self
            .expenses
            .into_iter()
            .map(|entry| {
                Ok(ExpenseEntry {
                    category: validate::required_text("expenses.category", &entry.category)?,
                    amount: validate::positive("expenses.amount", entry.amount)?,
                    description: validate::optional_text(entry.description.as_deref()),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(StaffFormsParams {
            p_form_date: self.form_date.unwrap_or(today),
            p_counts: self.counts,
            p_waste: waste,
            p_expenses: expenses,
            p_notes: validate::optional_text(self.notes.as_deref()),
        })
    }
}

pub async fn submit_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<StaffFormRequest>,
) -> Result<(StatusCode, Json<RpcResponse>), AppError> {
    let params = req.into_params(today())?;
    let (counts, waste, expenses) = (params.p_counts.len(), params.p_waste.len(), params.p_expenses.len());

    let result = state
        .stores_for(&auth.access_token)
        .rpc
        .submit_staff_forms(&params)
        .await?;

    info!(
        user_id = %auth.user_id,
        form_date = %params.p_form_date,
        counts,
        waste,
        expenses,
        "Staff forms submitted"
    );

    Ok((StatusCode::CREATED, Json(RpcResponse { status: "submitted", result })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn parse(value: serde_json::Value) -> StaffFormRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_form_is_rejected() {
        let err = parse(json!({ "notes": "quiet night" })).into_params(day()).unwrap_err();
        assert_eq!(err.field, "form");
    }

    #[test]
    fn duplicate_counts_are_rejected() {
        let id = Uuid::new_v4();
        let err = parse(json!({
            "counts": [
                { "ingredient_id": id, "counted_quantity": 3 },
                { "ingredient_id": id, "counted_quantity": 4 }
            ]
        }))
        .into_params(day())
        .unwrap_err();
        assert_eq!(err.field, "counts");
    }

    #[test]
    fn entries_are_validated_and_normalized() {
        let params = parse(json!({
            "counts": [{ "ingredient_id": Uuid::new_v4(), "counted_quantity": 0 }],
            "waste": [{ "ingredient_id": Uuid::new_v4(), "quantity": 0.5, "reason": "  " }],
            "expenses": [{ "category": " ice ", "amount": 12.5 }]
        }))
        .into_params(day())
        .unwrap();

        assert_eq!(params.p_form_date, day());
        assert_eq!(params.p_waste[0].reason, None);
        assert_eq!(params.p_expenses[0].category, "ice");
    }

    #[test]
    fn zero_waste_is_rejected() {
        let err = parse(json!({
            "waste": [{ "ingredient_id": Uuid::new_v4(), "quantity": 0 }]
        }))
        .into_params(day())
        .unwrap_err();
        assert_eq!(err.field, "waste.quantity");
    }
}
