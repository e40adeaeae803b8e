use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use color_eyre::eyre::WrapErr;
use db::Meal;
use serde::{Deserialize, Serialize};

use crate::{
    http_server::{errors::WithStatus as _, ResponseResult},
    AppState,
};

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ShoppingListRequest {
    pub plan: Vec<i32>,
}

#[axum_macros::debug_handler]
pub async fn shopping_list(
    State(state): State<AppState>,
    Json(request): Json<ShoppingListRequest>,
) -> ResponseResult<impl IntoResponse> {
    let meals = Meal::get_by_ids(state.db(), &request.plan)
        .await
        .wrap_err("Error retrieving meals")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::debug!(meals = meals.len(), "Building shopping list");

    Ok(Json(crate::shopping_list::shopping_list(&meals)))
}
