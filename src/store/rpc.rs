//! Typed facade over the backend stored procedures.
//!
//! The procedures own the transactional logic (stock deduction, cost aggregation,
//! reconciliation); this module only fixes their parameter shapes and classifies failures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};
use crate::stock::{parse_shortfalls, Shortfall};

/// One sold menu item, as the sale procedures expect it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLineParam {
    pub menu_item_id: Uuid,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessSaleParams {
    pub p_sale_date: NaiveDate,
    pub p_payment_method: Option<String>,
    pub p_notes: Option<String>,
    pub p_line_items: Vec<SaleLineParam>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockCountParams {
    pub p_ingredient_id: Uuid,
    pub p_counted_quantity: f64,
    pub p_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BufferSalesParams {
    pub p_sale_date: NaiveDate,
    pub p_entries: Vec<SaleLineParam>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventorySettingsParams {
    pub p_ingredient_id: Uuid,
    pub p_par_level: f64,
    pub p_reorder_point: f64,
    pub p_unit_cost: Option<f64>,
}

/// Counted quantity of one ingredient on a staff form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountEntry {
    pub ingredient_id: Uuid,
    pub counted_quantity: f64,
}

/// Wasted stock on a staff form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteEntry {
    pub ingredient_id: Uuid,
    pub quantity: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Petty expense on a staff form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffFormsParams {
    pub p_form_date: NaiveDate,
    pub p_counts: Vec<CountEntry>,
    pub p_waste: Vec<WasteEntry>,
    pub p_expenses: Vec<ExpenseEntry>,
    pub p_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleLineUpdateParams {
    pub p_line_item_id: Uuid,
    pub p_quantity: Option<f64>,
    pub p_unit_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseUpdateParams {
    pub p_purchase_id: Uuid,
    pub p_quantity: Option<f64>,
    pub p_unit_cost: Option<f64>,
    pub p_supplier_id: Option<Uuid>,
    pub p_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseUpdateParams {
    pub p_expense_id: Uuid,
    pub p_amount: Option<f64>,
    pub p_category: Option<String>,
    pub p_description: Option<String>,
}

/// Stored procedure calls made on behalf of one user
#[derive(Clone)]
pub struct BackendRpc {
    client: SupabaseClient,
}

impl BackendRpc {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn call<P: Serialize>(&self, name: &'static str, params: &P) -> Result<Value, RpcError> {
        self.client.rpc(name, params).await.map_err(|err| {
            let classified = RpcError::classify(err);
            if let RpcError::Backend(inner) = &classified {
                warn!(rpc = name, error = %inner, "Backend procedure failed");
            }
            classified
        })
    }

    pub async fn process_sale(&self, params: &ProcessSaleParams) -> Result<Value, RpcError> {
        self.call("process_sale", params).await
    }

    pub async fn log_stock_count(&self, params: &StockCountParams) -> Result<Value, RpcError> {
        self.call("log_stock_count", params).await
    }

    pub async fn log_buffer_sales(&self, params: &BufferSalesParams) -> Result<Value, RpcError> {
        self.call("log_buffer_sales", params).await
    }

    pub async fn update_inventory_settings(
        &self,
        params: &InventorySettingsParams,
    ) -> Result<Value, RpcError> {
        self.call("update_inventory_settings", params).await
    }

    pub async fn submit_staff_forms(&self, params: &StaffFormsParams) -> Result<Value, RpcError> {
        self.call("submit_staff_forms", params).await
    }

    pub async fn update_sale_line_item(&self, params: &SaleLineUpdateParams) -> Result<Value, RpcError> {
        self.call("update_sale_line_item", params).await
    }

    pub async fn update_purchase(&self, params: &PurchaseUpdateParams) -> Result<Value, RpcError> {
        self.call("update_purchase", params).await
    }

    pub async fn update_expense(&self, params: &ExpenseUpdateParams) -> Result<Value, RpcError> {
        self.call("update_expense", params).await
    }
}

/// Stored procedure failures
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Insufficient stock for {} ingredient(s)", .0.len())]
    InsufficientStock(Vec<Shortfall>),

    #[error(transparent)]
    Backend(SupabaseError),
}

impl RpcError {
    /// Split insufficient-stock failures from every other backend error
    pub fn classify(err: SupabaseError) -> Self {
        if let Some(body) = err.postgrest() {
            let shortfalls = parse_shortfalls(&body);
            if !shortfalls.is_empty() {
                return RpcError::InsufficientStock(shortfalls);
            }
        }
        RpcError::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_errors_are_classified() {
        let err = SupabaseError::Api {
            status: 400,
            body: r#"{"code":"P0001","message":"Insufficient stock for Eggs: required 12, available 6","details":null,"hint":null}"#.to_string(),
        };
        match RpcError::classify(err) {
            RpcError::InsufficientStock(shortfalls) => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].ingredient_name, "Eggs");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn other_errors_stay_backend_errors() {
        let err = SupabaseError::Api {
            status: 403,
            body: r#"{"code":"42501","message":"permission denied for function process_sale"}"#.to_string(),
        };
        assert!(matches!(RpcError::classify(err), RpcError::Backend(_)));
        assert!(matches!(
            RpcError::classify(SupabaseError::NoRowReturned),
            RpcError::Backend(SupabaseError::NoRowReturned)
        ));
    }

    #[test]
    fn sale_params_use_procedure_argument_names() {
        let params = ProcessSaleParams {
            p_sale_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            p_payment_method: Some("card".to_string()),
            p_notes: None,
            p_line_items: vec![SaleLineParam {
                menu_item_id: Uuid::nil(),
                quantity: 2.0,
                unit_price: 9.5,
            }],
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["p_sale_date"], "2026-05-04");
        assert_eq!(value["p_line_items"][0]["unit_price"], 9.5);
        assert!(value["p_notes"].is_null());
    }
}
