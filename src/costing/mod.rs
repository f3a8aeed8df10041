//! Recipe costing and report aggregation

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::store::menu::RecipeIngredient;
use crate::store::summaries::{DailySummary, SummaryTotals};
use crate::util::time::DateRange;

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole` as a percentage with two decimals, undefined for a zero whole
pub fn percentage(part: f64, whole: f64) -> Option<f64> {
    if whole.abs() < f64::EPSILON {
        None
    } else {
        Some(round_cents(part / whole * 100.0))
    }
}

/// Cost and margin of one portion of a menu item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuCosting {
    pub plate_cost: f64,
    pub margin: f64,
    pub food_cost_pct: Option<f64>,
}

impl MenuCosting {
    /// Ingredients without a known unit cost contribute nothing
    pub fn compute(price: f64, recipe: &[RecipeIngredient], unit_costs: &HashMap<Uuid, f64>) -> Self {
        let plate_cost: f64 = recipe
            .iter()
            .map(|line| line.quantity * unit_costs.get(&line.ingredient_id).copied().unwrap_or(0.0))
            .sum();

        Self {
            plate_cost: round_cents(plate_cost),
            margin: round_cents(price - plate_cost),
            food_cost_pct: percentage(plate_cost, price),
        }
    }
}

/// Profit and loss over a date range, built from daily summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_with_activity: usize,
    #[serde(flatten)]
    pub totals: SummaryTotals,
    pub gross_profit: f64,
    pub net_profit: f64,
    pub food_cost_pct: Option<f64>,
    pub average_ticket: Option<f64>,
    pub best_day: Option<NaiveDate>,
}

impl Overview {
    pub fn from_daily(range: &DateRange, days: &[DailySummary]) -> Self {
        let mut totals = SummaryTotals::default();
        for day in days {
            totals.total_sales += day.totals.total_sales;
            totals.total_cogs += day.totals.total_cogs;
            totals.total_purchases += day.totals.total_purchases;
            totals.total_expenses += day.totals.total_expenses;
            totals.sale_count += day.totals.sale_count;
        }

        let gross_profit = totals.total_sales - totals.total_cogs;
        let net_profit = gross_profit - totals.total_expenses;

        let best_day = days
            .iter()
            .filter(|d| d.totals.total_sales > 0.0)
            .max_by(|a, b| a.totals.total_sales.total_cmp(&b.totals.total_sales))
            .map(|d| d.summary_date);

        let average_ticket = (totals.sale_count > 0)
            .then(|| round_cents(totals.total_sales / totals.sale_count as f64));

        let food_cost_pct = percentage(totals.total_cogs, totals.total_sales);

        totals.total_sales = round_cents(totals.total_sales);
        totals.total_cogs = round_cents(totals.total_cogs);
        totals.total_purchases = round_cents(totals.total_purchases);
        totals.total_expenses = round_cents(totals.total_expenses);

        Self {
            from: range.from,
            to: range.to,
            days_with_activity: days.iter().filter(|d| d.totals.sale_count > 0).count(),
            totals,
            gross_profit: round_cents(gross_profit),
            net_profit: round_cents(net_profit),
            food_cost_pct,
            average_ticket,
            best_day,
        }
    }
}
