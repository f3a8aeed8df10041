//! Ingredients and suppliers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::in_list;
use super::supabase::{SupabaseClient, SupabaseError};

/// Ingredient row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub category: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub unit_cost: f64,
    pub par_level: f64,
    pub reorder_point: f64,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// New ingredient for insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub unit_cost: f64,
    #[serde(default)]
    pub par_level: f64,
    #[serde(default)]
    pub reorder_point: f64,
}

/// Ingredient update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Supplier row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

/// New supplier for insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Catalog store operations
#[derive(Clone)]
pub struct CatalogStore {
    client: SupabaseClient,
}

impl CatalogStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list_ingredients(&self) -> Result<Vec<Ingredient>, SupabaseError> {
        self.client.get("ingredients", "order=name.asc").await
    }

    pub async fn ingredients_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Ingredient>, SupabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .get("ingredients", &format!("id=in.({})", in_list(ids)))
            .await
    }

    pub async fn create_ingredient(&self, ingredient: &NewIngredient) -> Result<Ingredient, SupabaseError> {
        self.client.insert("ingredients", ingredient).await
    }

    pub async fn update_ingredient(
        &self,
        id: Uuid,
        update: &IngredientUpdate,
    ) -> Result<Option<Ingredient>, SupabaseError> {
        let rows: Vec<Ingredient> = self
            .client
            .update_returning("ingredients", &format!("id=eq.{}", id), update)
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, SupabaseError> {
        self.client.get("suppliers", "order=name.asc").await
    }

    pub async fn create_supplier(&self, supplier: &NewSupplier) -> Result<Supplier, SupabaseError> {
        self.client.insert("suppliers", supplier).await
    }

    pub async fn update_supplier(
        &self,
        id: Uuid,
        update: &SupplierUpdate,
    ) -> Result<Option<Supplier>, SupabaseError> {
        let rows: Vec<Supplier> = self
            .client
            .update_returning("suppliers", &format!("id=eq.{}", id), update)
            .await?;
        Ok(rows.into_iter().next())
    }
}
