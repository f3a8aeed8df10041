//! Ingredient and supplier endpoints

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::store::catalog::{
    Ingredient, IngredientUpdate, NewIngredient, NewSupplier, Supplier, SupplierUpdate,
};
use crate::store::profiles::Role;
use crate::validate::{self, ValidationError};

use super::error::AppError;
use super::middleware::AuthenticatedUser;

fn normalize_ingredient(mut ingredient: NewIngredient) -> Result<NewIngredient, ValidationError> {
    ingredient.name = validate::required_text("name", &ingredient.name)?;
    ingredient.unit = validate::required_text("unit", &ingredient.unit)?;
    ingredient.category = validate::optional_text(ingredient.category.as_deref());
    validate::non_negative("unit_cost", ingredient.unit_cost)?;
    validate::non_negative("par_level", ingredient.par_level)?;
    validate::non_negative("reorder_point", ingredient.reorder_point)?;
    if ingredient.reorder_point > ingredient.par_level {
        return Err(ValidationError::new("reorder_point", "must not exceed par_level"));
    }
    Ok(ingredient)
}

fn normalize_ingredient_update(mut update: IngredientUpdate) -> Result<IngredientUpdate, ValidationError> {
    if let Some(name) = &update.name {
        update.name = Some(validate::required_text("name", name)?);
    }
    if let Some(unit) = &update.unit {
        update.unit = Some(validate::required_text("unit", unit)?);
    }
    Ok(update)
}

pub async fn list_ingredients_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Ingredient>>, AppError> {
    let ingredients = state
        .stores_for(&auth.access_token)
        .catalog
        .list_ingredients()
        .await?;
    Ok(Json(ingredients))
}

pub async fn create_ingredient_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<NewIngredient>,
) -> Result<(StatusCode, Json<Ingredient>), AppError> {
    auth.require(Role::Manager)?;
    let ingredient = normalize_ingredient(req)?;

    let created = state
        .stores_for(&auth.access_token)
        .catalog
        .create_ingredient(&ingredient)
        .await?;

    info!(user_id = %auth.user_id, ingredient_id = %created.id, name = %created.name, "Ingredient created");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_ingredient_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(ingredient_id): Path<Uuid>,
    Json(req): Json<IngredientUpdate>,
) -> Result<Json<Ingredient>, AppError> {
    auth.require(Role::Manager)?;
    let update = normalize_ingredient_update(req)?;

    let updated = state
        .stores_for(&auth.access_token)
        .catalog
        .update_ingredient(ingredient_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient not found".to_string()))?;

    info!(user_id = %auth.user_id, ingredient_id = %ingredient_id, "Ingredient updated");

    Ok(Json(updated))
}

pub async fn list_suppliers_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Supplier>>, AppError> {
    let suppliers = state
        .stores_for(&auth.access_token)
        .catalog
        .list_suppliers()
        .await?;
    Ok(Json(suppliers))
}

pub async fn create_supplier_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(mut req): Json<NewSupplier>,
) -> Result<(StatusCode, Json<Supplier>), AppError> {
    auth.require(Role::Manager)?;
    req.name = validate::required_text("name", &req.name)?;
    if let Some(email) = &req.email {
        req.email = Some(validate::email("email", email)?);
    }

    let created = state
        .stores_for(&auth.access_token)
        .catalog
        .create_supplier(&req)
        .await?;

    info!(user_id = %auth.user_id, supplier_id = %created.id, "Supplier created");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_supplier_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(supplier_id): Path<Uuid>,
    Json(mut req): Json<SupplierUpdate>,
) -> Result<Json<Supplier>, AppError> {
    auth.require(Role::Manager)?;
    if let Some(name) = &req.name {
        req.name = Some(validate::required_text("name", name)?);
    }
    if let Some(email) = &req.email {
        req.email = Some(validate::email("email", email)?);
    }

    let updated = state
        .stores_for(&auth.access_token)
        .catalog
        .update_supplier(supplier_id, &req)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier not found".to_string()))?;

    info!(user_id = %auth.user_id, supplier_id = %supplier_id, "Supplier updated");

    Ok(Json(updated))
}
