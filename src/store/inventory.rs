//! Inventory on hand and stock movements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::in_list;
use super::supabase::{SupabaseClient, SupabaseError};

/// Current quantity of one ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnHand {
    pub ingredient_id: Uuid,
    pub quantity: f64,
    #[serde(default)]
    pub last_counted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// On-hand row with ingredient details (joined)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnHandWithIngredient {
    pub ingredient_id: Uuid,
    pub quantity: f64,
    #[serde(default)]
    pub last_counted_at: Option<DateTime<Utc>>,
    #[serde(rename = "ingredients")]
    pub ingredient: Option<IngredientDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientDetails {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub category: Option<String>,
    pub par_level: f64,
    pub reorder_point: f64,
    pub unit_cost: f64,
}

/// Why stock moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Sale,
    Purchase,
    Adjustment,
    Count,
    Waste,
}

/// Inventory movement row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub movement_type: MovementType,
    pub quantity_change: f64,
    pub quantity_after: Option<f64>,
    pub reason: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// New movement for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewMovement {
    pub ingredient_id: Uuid,
    pub movement_type: MovementType,
    pub quantity_change: f64,
    pub quantity_after: Option<f64>,
    pub reason: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Inventory store operations
#[derive(Clone)]
pub struct InventoryStore {
    client: SupabaseClient,
}

impl InventoryStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Every on-hand row with ingredient details
    pub async fn list_on_hand(&self) -> Result<Vec<OnHandWithIngredient>, SupabaseError> {
        self.client
            .get(
                "inventory_on_hand",
                "select=ingredient_id,quantity,last_counted_at,ingredients(id,name,unit,category,par_level,reorder_point,unit_cost)",
            )
            .await
    }

    pub async fn on_hand_for(&self, ids: &[Uuid]) -> Result<Vec<OnHand>, SupabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .get("inventory_on_hand", &format!("ingredient_id=in.({})", in_list(ids)))
            .await
    }

    pub async fn get_on_hand(&self, ingredient_id: Uuid) -> Result<Option<OnHand>, SupabaseError> {
        self.client
            .get_one("inventory_on_hand", &format!("ingredient_id=eq.{}", ingredient_id))
            .await
    }

    /// Set the quantity only if it still equals `expected`; false when another writer got there first
    pub async fn compare_and_set(
        &self,
        ingredient_id: Uuid,
        expected: f64,
        quantity: f64,
    ) -> Result<bool, SupabaseError> {
        #[derive(Serialize)]
        struct QuantityUpdate {
            quantity: f64,
            updated_at: DateTime<Utc>,
        }

        let rows: Vec<OnHand> = self
            .client
            .update_returning(
                "inventory_on_hand",
                &format!("ingredient_id=eq.{}&quantity=eq.{}", ingredient_id, expected),
                &QuantityUpdate {
                    quantity,
                    updated_at: Utc::now(),
                },
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// First stock for an ingredient that has no on-hand row yet
    pub async fn create_on_hand(&self, ingredient_id: Uuid, quantity: f64) -> Result<OnHand, SupabaseError> {
        #[derive(Serialize)]
        struct NewOnHand {
            ingredient_id: Uuid,
            quantity: f64,
        }

        self.client
            .insert("inventory_on_hand", &NewOnHand { ingredient_id, quantity })
            .await
    }

    pub async fn record_movement(&self, movement: &NewMovement) -> Result<InventoryMovement, SupabaseError> {
        self.client.insert("inventory_movements", movement).await
    }

    /// Most recent movements, optionally for one ingredient
    pub async fn movements(
        &self,
        ingredient_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<InventoryMovement>, SupabaseError> {
        let mut query = format!("order=created_at.desc&limit={}", limit);
        if let Some(id) = ingredient_id {
            query.push_str(&format!("&ingredient_id=eq.{}", id));
        }
        self.client.get("inventory_movements", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_types_use_backend_names() {
        let movement = NewMovement {
            ingredient_id: Uuid::nil(),
            movement_type: MovementType::Adjustment,
            quantity_change: -2.0,
            quantity_after: Some(3.0),
            reason: Some("spoiled".to_string()),
            reference_id: None,
            created_by: None,
        };
        let value = serde_json::to_value(&movement).unwrap();
        assert_eq!(value["movement_type"], "adjustment");
        assert_eq!(value["quantity_change"], -2.0);
    }

    #[test]
    fn joined_on_hand_row_tolerates_missing_ingredient() {
        let row: OnHandWithIngredient = serde_json::from_value(serde_json::json!({
            "ingredient_id": "9a1d2c3b-4e5f-4a6b-8c7d-0e1f2a3b4c5d",
            "quantity": 4.5,
            "last_counted_at": null,
            "ingredients": null
        }))
        .unwrap();
        assert!(row.ingredient.is_none());
        assert_eq!(row.quantity, 4.5);
    }
}
