//! Daily and weekly summaries maintained by the backend

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::supabase::{SupabaseClient, SupabaseError};
use crate::util::time::DateRange;

/// Figures shared by daily and weekly summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    #[serde(default)]
    pub total_sales: f64,
    #[serde(default)]
    pub total_cogs: f64,
    #[serde(default)]
    pub total_purchases: f64,
    #[serde(default)]
    pub total_expenses: f64,
    #[serde(default)]
    pub sale_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    pub summary_date: NaiveDate,
    #[serde(flatten)]
    pub totals: SummaryTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    #[serde(flatten)]
    pub totals: SummaryTotals,
}

/// Summary store operations
#[derive(Clone)]
pub struct SummaryStore {
    client: SupabaseClient,
}

impl SummaryStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn daily(&self, range: &DateRange) -> Result<Vec<DailySummary>, SupabaseError> {
        let query = format!("{}&order=summary_date.asc", range.filter("summary_date"));
        self.client.get("daily_summaries", &query).await
    }

    /// Weeks starting inside the range
    pub async fn weekly(&self, range: &DateRange) -> Result<Vec<WeeklySummary>, SupabaseError> {
        let query = format!("{}&order=week_start.asc", range.filter("week_start"));
        self.client.get("weekly_summaries", &query).await
    }
}
