//! Stock-consistency logic: requirement expansion, shortfall preflight, stock status

pub mod preflight;
pub mod shortfall;

pub use preflight::preflight_sale;
pub use shortfall::{parse_shortfalls, Shortfall};

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::store::menu::RecipeIngredient;

/// Slack for floating point stock comparisons
pub const TOLERANCE: f64 = 1e-9;

/// What the backend says is on hand for one ingredient
#[derive(Debug, Clone)]
pub struct StockLevel {
    pub name: String,
    pub unit: String,
    pub on_hand: f64,
}

/// Expand sale lines `(menu_item_id, quantity)` through recipes into required ingredient totals
pub fn required_ingredients(
    recipes: &[RecipeIngredient],
    lines: &[(Uuid, f64)],
) -> HashMap<Uuid, f64> {
    let mut sold: HashMap<Uuid, f64> = HashMap::new();
    for (menu_item_id, quantity) in lines {
        *sold.entry(*menu_item_id).or_default() += quantity;
    }

    let mut required: HashMap<Uuid, f64> = HashMap::new();
    for recipe in recipes {
        if let Some(portions) = sold.get(&recipe.menu_item_id) {
            *required.entry(recipe.ingredient_id).or_default() += recipe.quantity * portions;
        }
    }
    required
}

/// Ingredients whose requirement exceeds stock; missing levels count as zero on hand
pub fn find_shortfalls(
    required: &HashMap<Uuid, f64>,
    levels: &HashMap<Uuid, StockLevel>,
) -> Vec<Shortfall> {
    let mut shortfalls: Vec<Shortfall> = required
        .iter()
        .filter_map(|(id, needed)| check_level(*id, levels.get(id), *needed))
        .collect();

    shortfalls.sort_by(|a, b| a.ingredient_name.cmp(&b.ingredient_name));
    shortfalls
}

/// Shortfall for a single ingredient if `required` cannot be covered
pub fn check_level(id: Uuid, level: Option<&StockLevel>, required: f64) -> Option<Shortfall> {
    let available = level.map(|l| l.on_hand).unwrap_or(0.0);
    if required <= available + TOLERANCE {
        return None;
    }

    Some(Shortfall {
        ingredient_id: Some(id),
        ingredient_name: level
            .map(|l| l.name.clone())
            .unwrap_or_else(|| id.to_string()),
        required: Some(required),
        available: Some(available),
        unit: level.map(|l| l.unit.clone()),
    })
}

/// Inventory status shown on the stock list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Out,
    Low,
    Ok,
}

impl StockStatus {
    pub fn classify(on_hand: f64, reorder_point: f64) -> Self {
        if on_hand <= TOLERANCE {
            StockStatus::Out
        } else if on_hand <= reorder_point + TOLERANCE {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(menu_item_id: Uuid, ingredient_id: Uuid, quantity: f64) -> RecipeIngredient {
        RecipeIngredient {
            id: None,
            menu_item_id,
            ingredient_id,
            quantity,
        }
    }

    fn level(name: &str, on_hand: f64) -> StockLevel {
        StockLevel {
            name: name.to_string(),
            unit: "kg".to_string(),
            on_hand,
        }
    }

    #[test]
    fn requirements_aggregate_across_lines_and_dishes() {
        let pizza = Uuid::new_v4();
        let calzone = Uuid::new_v4();
        let soup = Uuid::new_v4();
        let flour = Uuid::new_v4();
        let cheese = Uuid::new_v4();
        let recipes = vec![
            recipe(pizza, flour, 0.25),
            recipe(pizza, cheese, 0.1),
            recipe(calzone, flour, 0.3),
        ];

        let required = required_ingredients(&recipes, &[(pizza, 2.0), (calzone, 1.0), (pizza, 1.0), (soup, 4.0)]);

        assert_eq!(required.len(), 2);
        assert!((required[&flour] - 1.05).abs() < 1e-9);
        assert!((required[&cheese] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn shortfalls_report_missing_and_unknown_levels() {
        let flour = Uuid::new_v4();
        let cheese = Uuid::new_v4();
        let basil = Uuid::new_v4();
        let required = HashMap::from([(flour, 1.0), (cheese, 2.0), (basil, 0.1)]);
        let levels = HashMap::from([(flour, level("Flour", 1.0)), (cheese, level("Cheese", 0.5))]);

        let shortfalls = find_shortfalls(&required, &levels);

        assert_eq!(shortfalls.len(), 2);
        let cheese_shortfall = shortfalls.iter().find(|s| s.ingredient_id == Some(cheese)).unwrap();
        assert_eq!(cheese_shortfall.ingredient_name, "Cheese");
        assert_eq!(cheese_shortfall.missing(), Some(1.5));
        let basil_shortfall = shortfalls.iter().find(|s| s.ingredient_id == Some(basil)).unwrap();
        assert_eq!(basil_shortfall.available, Some(0.0));
        assert_eq!(basil_shortfall.unit, None);
    }

    #[test]
    fn exact_stock_is_enough() {
        let id = Uuid::new_v4();
        assert!(check_level(id, Some(&level("Rice", 0.3)), 0.1 + 0.2).is_none());
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(StockStatus::classify(0.0, 5.0), StockStatus::Out);
        assert_eq!(StockStatus::classify(5.0, 5.0), StockStatus::Low);
        assert_eq!(StockStatus::classify(5.5, 5.0), StockStatus::Ok);
        assert_eq!(StockStatus::classify(-1.0, 0.0), StockStatus::Out);
    }
}
