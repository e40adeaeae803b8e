use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use color_eyre::eyre::WrapErr;
use db::{Ingredient, Meal, NewIngredient, NewMeal};
use serde::{Deserialize, Serialize};

use super::meal_plan::{swap_candidate, swap_filter};
use crate::{
    http_server::{
        errors::{ServerError, WithStatus as _},
        ResponseResult,
    },
    AppState,
};

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct SwapMealRequest {
    pub meal_id: i32,
    #[serde(default)]
    pub exclude_red_meat: bool,
}

#[axum_macros::debug_handler]
pub async fn list(State(state): State<AppState>) -> ResponseResult<impl IntoResponse> {
    let mut meals = Meal::list_all(state.db())
        .await
        .wrap_err("Failed to fetch meals")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    meals.sort_by_cached_key(|meal| meal.meal_name.to_lowercase());

    Ok(Json(meals))
}

#[axum_macros::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Json(new_meal): Json<NewMeal>,
) -> ResponseResult<impl IntoResponse> {
    if new_meal.meal_name.trim().is_empty() {
        return Err(ServerError::bad_request("Meal name is required"));
    }

    let meal = Meal::create(state.db(), new_meal)
        .await
        .wrap_err("Error creating meal")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(meal)))
}

#[axum_macros::debug_handler]
pub async fn swap(
    State(state): State<AppState>,
    Json(request): Json<SwapMealRequest>,
) -> ResponseResult<impl IntoResponse> {
    let filter = swap_filter(
        request.meal_id,
        None,
        request.exclude_red_meat,
        chrono::Utc::now(),
    );
    let meal = swap_candidate(&state, &filter).await?;

    Ok(Json(meal))
}

#[axum_macros::debug_handler]
pub async fn delete_meal(
    State(state): State<AppState>,
    Path(meal_id): Path<i32>,
) -> ResponseResult<impl IntoResponse> {
    let deleted = Meal::delete(state.db(), meal_id)
        .await
        .wrap_err("Failed to delete meal")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !deleted {
        return Err(ServerError::not_found("Meal not found"));
    }

    Ok(StatusCode::OK)
}

#[axum_macros::debug_handler]
pub async fn update_ingredient(
    State(state): State<AppState>,
    Path((meal_id, ingredient_id)): Path<(i32, i32)>,
    Json(ingredient): Json<NewIngredient>,
) -> ResponseResult<impl IntoResponse> {
    let updated = Ingredient::update(state.db(), meal_id, ingredient_id, ingredient)
        .await
        .wrap_err("Failed to update ingredient")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !updated {
        return Err(ServerError::not_found("Ingredient not found"));
    }

    Ok(Json(fetch_meal(&state, meal_id).await?))
}

#[axum_macros::debug_handler]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    Path((meal_id, ingredient_id)): Path<(i32, i32)>,
) -> ResponseResult<impl IntoResponse> {
    let deleted = Ingredient::delete(state.db(), meal_id, ingredient_id)
        .await
        .wrap_err("Failed to delete ingredient")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !deleted {
        return Err(ServerError::not_found("Ingredient not found"));
    }

    Ok(Json(fetch_meal(&state, meal_id).await?))
}

async fn fetch_meal(state: &AppState, meal_id: i32) -> ResponseResult<Meal> {
    Meal::get_by_id(state.db(), meal_id)
        .await
        .wrap_err("Failed to fetch meal")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| ServerError::not_found("Meal not found"))
}
