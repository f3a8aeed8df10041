//! Menu endpoints: listing with costing, save with recipe, deactivate, image upload

use std::collections::HashMap;

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::costing::MenuCosting;
use crate::store::menu::{MenuItem, MenuItemFields, RecipeIngredient};
use crate::store::profiles::Role;
use crate::store::storage::{image_object_path, ImageKind};
use crate::validate::{self, ValidationError};

use super::error::AppError;
use super::middleware::AuthenticatedUser;

// ============================================================================
// Listing
// ============================================================================

#[derive(Deserialize)]
pub struct MenuQuery {
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Serialize)]
pub struct MenuEntry {
    #[serde(flatten)]
    item: MenuItem,
    recipe: Vec<RecipeIngredient>,
    #[serde(flatten)]
    costing: MenuCosting,
}

pub async fn list_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<Vec<MenuEntry>>, AppError> {
    let stores = state.stores_for(&auth.access_token);
    let items = stores.menu.list(query.include_inactive).await?;

    let mut ingredient_ids: Vec<Uuid> = items
        .iter()
        .flat_map(|item| item.recipe_ingredients.iter().map(|r| r.ingredient_id))
        .collect();
    ingredient_ids.sort();
    ingredient_ids.dedup();

    let unit_costs: HashMap<Uuid, f64> = stores
        .catalog
        .ingredients_by_ids(&ingredient_ids)
        .await?
        .into_iter()
        .map(|ingredient| (ingredient.id, ingredient.unit_cost))
        .collect();

    let entries = items
        .into_iter()
        .map(|entry| MenuEntry {
            costing: MenuCosting::compute(entry.item.price, &entry.recipe_ingredients, &unit_costs),
            item: entry.item,
            recipe: entry.recipe_ingredients,
        })
        .collect();

    Ok(Json(entries))
}

// ============================================================================
// Save
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecipeLine {
    ingredient_id: Uuid,
    quantity: f64,
}

#[derive(Debug, Deserialize)]
pub struct MenuSaveRequest {
    name: String,
    #[serde(default)]
    category: Option<String>,
    price: f64,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    recipe: Vec<RecipeLine>,
}

fn default_active() -> bool {
    true
}

impl MenuSaveRequest {
    /// Normalized row fields and recipe lines
    fn validate(&self) -> Result<(MenuItemFields, Vec<(Uuid, f64)>), ValidationError> {
        let fields = MenuItemFields {
            name: validate::required_text("name", &self.name)?,
            category: validate::optional_text(self.category.as_deref()),
            price: validate::non_negative("price", self.price)?,
            is_active: self.is_active,
        };

        validate::unique("recipe", self.recipe.iter().map(|line| line.ingredient_id))?;
        let lines = self
            .recipe
            .iter()
            .map(|line| Ok((line.ingredient_id, validate::positive("recipe.quantity", line.quantity)?)))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok((fields, lines))
    }
}

#[derive(Serialize)]
pub struct MenuSaveResponse {
    #[serde(flatten)]
    item: MenuItem,
    recipe: Vec<RecipeIngredient>,
}

pub async fn create_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<MenuSaveRequest>,
) -> Result<(StatusCode, Json<MenuSaveResponse>), AppError> {
    auth.require(Role::Manager)?;
    let (fields, lines) = req.validate()?;
    let stores = state.stores_for(&auth.access_token);

    let item = stores.menu.create(&fields).await?;
    let recipe = stores.menu.replace_recipe(item.id, &lines).await?;

    info!(user_id = %auth.user_id, menu_item_id = %item.id, recipe_lines = recipe.len(), "Menu item created");

    Ok((StatusCode::CREATED, Json(MenuSaveResponse { item, recipe })))
}

pub async fn update_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(menu_item_id): Path<Uuid>,
    Json(req): Json<MenuSaveRequest>,
) -> Result<Json<MenuSaveResponse>, AppError> {
    auth.require(Role::Manager)?;
    let (fields, lines) = req.validate()?;
    let stores = state.stores_for(&auth.access_token);

    let item = stores
        .menu
        .update(menu_item_id, &fields)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu item not found".to_string()))?;
    let recipe = stores.menu.replace_recipe(item.id, &lines).await?;

    info!(user_id = %auth.user_id, menu_item_id = %item.id, recipe_lines = recipe.len(), "Menu item saved");

    Ok(Json(MenuSaveResponse { item, recipe }))
}

pub async fn deactivate_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(menu_item_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require(Role::Manager)?;

    let found = state
        .stores_for(&auth.access_token)
        .menu
        .deactivate(menu_item_id)
        .await?;
    if !found {
        return Err(AppError::NotFound("Menu item not found".to_string()));
    }

    info!(user_id = %auth.user_id, menu_item_id = %menu_item_id, "Menu item deactivated");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Image upload
// ============================================================================

#[derive(Serialize)]
pub struct ImageResponse {
    image_url: String,
}

pub async fn image_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(menu_item_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImageResponse>, AppError> {
    auth.require(Role::Manager)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let kind = ImageKind::from_content_type(content_type).ok_or_else(|| {
        AppError::UnsupportedMediaType("expected image/png, image/jpeg or image/webp".to_string())
    })?;

    if body.is_empty() {
        return Err(AppError::BadRequest("Image body is empty".to_string()));
    }
    if body.len() > state.config.max_image_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "image exceeds {} bytes",
            state.config.max_image_bytes
        )));
    }

    let stores = state.stores_for(&auth.access_token);
    stores
        .menu
        .get(menu_item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu item not found".to_string()))?;

    let path = image_object_path(menu_item_id, kind, &body);
    let size = body.len();
    let image_url = stores.storage.upload(&path, kind, body).await?;
    stores.menu.set_image_url(menu_item_id, &image_url).await?;

    info!(user_id = %auth.user_id, menu_item_id = %menu_item_id, bytes = size, "Menu image uploaded");

    Ok(Json(ImageResponse { image_url }))
}
