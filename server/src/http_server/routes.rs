use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::api::{health, meal_plan, meals, shopping_list, steps};
use crate::AppState;

pub(crate) fn make_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/mealplan", get(meal_plan::current))
        .route("/api/mealplan/generate", post(meal_plan::generate))
        .route("/api/mealplan/finalize", post(meal_plan::finalize))
        .route("/api/mealplan/swap", post(meal_plan::swap))
        .route("/api/mealplan/replace", post(meal_plan::replace))
        .route("/api/mealplan/ics", get(meal_plan::ics))
        .route("/api/shoppinglist", post(shopping_list::shopping_list))
        .route("/api/meals", get(meals::list).post(meals::create))
        .route("/api/meals/swap", post(meals::swap))
        .route("/api/meals/{meal_id}", delete(meals::delete_meal))
        .route(
            "/api/meals/{meal_id}/ingredients/{ingredient_id}",
            put(meals::update_ingredient).delete(meals::delete_ingredient),
        )
        .route(
            "/api/meals/{meal_id}/steps",
            get(steps::list).post(steps::add).delete(steps::delete_all),
        )
        .route("/api/meals/{meal_id}/steps/bulk", post(steps::add_bulk))
        .route("/api/meals/{meal_id}/steps/reorder", put(steps::reorder))
        .route(
            "/api/meals/{meal_id}/steps/{step_id}",
            put(steps::update).delete(steps::delete_step),
        )
}
