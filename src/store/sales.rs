//! Sales and sale line items

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};
use crate::util::time::DateRange;

/// Sale header row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub sale_date: NaiveDate,
    pub total_amount: f64,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Sale line item row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub menu_item_id: Uuid,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
}

/// Sale with its line items (joined)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleWithLines {
    #[serde(flatten)]
    pub sale: Sale,
    #[serde(default)]
    pub sale_line_items: Vec<SaleLineItem>,
}

/// Sales store operations
#[derive(Clone)]
pub struct SalesStore {
    client: SupabaseClient,
}

impl SalesStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, range: &DateRange) -> Result<Vec<SaleWithLines>, SupabaseError> {
        let query = format!(
            "select=*,sale_line_items(*)&{}&order=sale_date.desc,created_at.desc",
            range.filter("sale_date")
        );
        self.client.get("sales", &query).await
    }

    pub async fn get_line_item(&self, id: Uuid) -> Result<Option<SaleLineItem>, SupabaseError> {
        self.client
            .get_one("sale_line_items", &format!("id=eq.{}", id))
            .await
    }
}
