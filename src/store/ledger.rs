//! Purchases and expenses

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};
use crate::util::time::DateRange;

/// Purchase row (stock bought from a supplier)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub purchase_date: NaiveDate,
    pub supplier_id: Option<Uuid>,
    pub ingredient_id: Uuid,
    pub quantity: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// New purchase for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewPurchase {
    pub purchase_date: NaiveDate,
    pub supplier_id: Option<Uuid>,
    pub ingredient_id: Uuid,
    pub quantity: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

/// Expense row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub expense_date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// New expense for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewExpense {
    pub expense_date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Ledger store operations
#[derive(Clone)]
pub struct LedgerStore {
    client: SupabaseClient,
}

impl LedgerStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list_purchases(&self, range: &DateRange) -> Result<Vec<Purchase>, SupabaseError> {
        let query = format!("{}&order=purchase_date.desc", range.filter("purchase_date"));
        self.client.get("purchases", &query).await
    }

    pub async fn create_purchase(&self, purchase: &NewPurchase) -> Result<Purchase, SupabaseError> {
        self.client.insert("purchases", purchase).await
    }

    pub async fn list_expenses(&self, range: &DateRange) -> Result<Vec<Expense>, SupabaseError> {
        let query = format!("{}&order=expense_date.desc", range.filter("expense_date"));
        self.client.get("expenses", &query).await
    }

    pub async fn create_expense(&self, expense: &NewExpense) -> Result<Expense, SupabaseError> {
        self.client.insert("expenses", expense).await
    }
}
