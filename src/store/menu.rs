//! Menu items and their recipes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::in_list;
use super::supabase::{SupabaseClient, SupabaseError};

/// Menu item row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub price: f64,
    pub is_active: bool,
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Menu item with its recipe lines embedded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemWithRecipe {
    #[serde(flatten)]
    pub item: MenuItem,
    #[serde(default)]
    pub recipe_ingredients: Vec<RecipeIngredient>,
}

/// Recipe line: how much of an ingredient one portion uses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub menu_item_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: f64,
}

/// Writable menu item columns
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemFields {
    pub name: String,
    pub category: Option<String>,
    pub price: f64,
    pub is_active: bool,
}

/// Menu store operations
#[derive(Clone)]
pub struct MenuStore {
    client: SupabaseClient,
}

impl MenuStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// All menu items with recipes, active ones only unless asked otherwise
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<MenuItemWithRecipe>, SupabaseError> {
        let mut query = "select=*,recipe_ingredients(id,menu_item_id,ingredient_id,quantity)&order=name.asc".to_string();
        if !include_inactive {
            query.push_str("&is_active=eq.true");
        }
        self.client.get("menu_items", &query).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<MenuItem>, SupabaseError> {
        self.client.get_one("menu_items", &format!("id=eq.{}", id)).await
    }

    pub async fn create(&self, fields: &MenuItemFields) -> Result<MenuItem, SupabaseError> {
        self.client.insert("menu_items", fields).await
    }

    /// Update a menu item; `None` when it does not exist (or RLS hides it)
    pub async fn update(
        &self,
        id: Uuid,
        fields: &MenuItemFields,
    ) -> Result<Option<MenuItem>, SupabaseError> {
        let rows: Vec<MenuItem> = self
            .client
            .update_returning("menu_items", &format!("id=eq.{}", id), fields)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Replace the whole recipe of a menu item
    pub async fn replace_recipe(
        &self,
        menu_item_id: Uuid,
        lines: &[(Uuid, f64)],
    ) -> Result<Vec<RecipeIngredient>, SupabaseError> {
        self.client
            .delete("recipe_ingredients", &format!("menu_item_id=eq.{}", menu_item_id))
            .await?;

        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<RecipeIngredient> = lines
            .iter()
            .map(|(ingredient_id, quantity)| RecipeIngredient {
                id: None,
                menu_item_id,
                ingredient_id: *ingredient_id,
                quantity: *quantity,
            })
            .collect();

        self.client.insert_many("recipe_ingredients", &rows).await
    }

    /// Recipe lines for a set of menu items
    pub async fn recipes_for(
        &self,
        menu_item_ids: &[Uuid],
    ) -> Result<Vec<RecipeIngredient>, SupabaseError> {
        if menu_item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("menu_item_id=in.({})", in_list(menu_item_ids));
        self.client.get("recipe_ingredients", &query).await
    }

    /// Soft delete; returns false when nothing matched
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, SupabaseError> {
        #[derive(Serialize)]
        struct Deactivate {
            is_active: bool,
        }

        let rows: Vec<MenuItem> = self
            .client
            .update_returning("menu_items", &format!("id=eq.{}", id), &Deactivate { is_active: false })
            .await?;
        Ok(!rows.is_empty())
    }

    pub async fn set_image_url(&self, id: Uuid, url: &str) -> Result<(), SupabaseError> {
        #[derive(Serialize)]
        struct ImageUpdate<'a> {
            image_url: &'a str,
        }

        self.client
            .update("menu_items", &format!("id=eq.{}", id), &ImageUpdate { image_url: url })
            .await
    }
}
