//! Local stock check before a stock-consuming procedure is invoked

use std::collections::HashMap;

use futures::try_join;
use uuid::Uuid;

use super::{find_shortfalls, required_ingredients, Shortfall, StockLevel};
use crate::store::supabase::SupabaseError;
use crate::store::Stores;

/// Shortfalls that selling `lines` (menu item, portions) would cause right now
pub async fn preflight_sale(
    stores: &Stores,
    lines: &[(Uuid, f64)],
) -> Result<Vec<Shortfall>, SupabaseError> {
    let mut menu_ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
    menu_ids.sort();
    menu_ids.dedup();

    let recipes = stores.menu.recipes_for(&menu_ids).await?;
    let required = required_ingredients(&recipes, lines);
    if required.is_empty() {
        return Ok(Vec::new());
    }

    let ingredient_ids: Vec<Uuid> = required.keys().copied().collect();
    let levels = stock_levels(stores, &ingredient_ids).await?;

    Ok(find_shortfalls(&required, &levels))
}

/// Names, units and on-hand quantities for a set of ingredients
pub async fn stock_levels(
    stores: &Stores,
    ingredient_ids: &[Uuid],
) -> Result<HashMap<Uuid, StockLevel>, SupabaseError> {
    let (ingredients, on_hand) = try_join!(
        stores.catalog.ingredients_by_ids(ingredient_ids),
        stores.inventory.on_hand_for(ingredient_ids),
    )?;

    let quantities: HashMap<Uuid, f64> = on_hand
        .into_iter()
        .map(|row| (row.ingredient_id, row.quantity))
        .collect();

    Ok(ingredients
        .into_iter()
        .map(|ingredient| {
            let on_hand = quantities.get(&ingredient.id).copied().unwrap_or(0.0);
            (
                ingredient.id,
                StockLevel {
                    name: ingredient.name,
                    unit: ingredient.unit,
                    on_hand,
                },
            )
        })
        .collect())
}
