use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::eyre::WrapErr;
use db::{Meal, MealFilter};
use serde::{Deserialize, Serialize};

use crate::{
    http_server::{
        errors::{ServerError, WithStatus as _},
        ResponseResult,
    },
    meal_plan::{
        current_plan, generate_weekly_plan_skipping, plan_to_ics, week_start, MealSource as _,
        Weekday, RECENCY_WINDOW_DAYS,
    },
    AppState,
};

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct GenerateRequest {
    #[serde(default)]
    pub skip_days: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct PlanEntry {
    #[serde(default)]
    pub id: i32,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct FinalizeRequest {
    #[serde(default)]
    pub plan: HashMap<String, Option<PlanEntry>>,
}

impl FinalizeRequest {
    /// Distinct ids of real meals. Empty days and the eating-out slot are skipped.
    fn meal_ids(&self) -> Vec<i32> {
        let mut meal_ids: Vec<i32> = self
            .plan
            .values()
            .flatten()
            .map(|entry| entry.id)
            .filter(|id| *id > 0)
            .collect();
        meal_ids.sort_unstable();
        meal_ids.dedup();

        meal_ids
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct SwapRequest {
    pub meal_id: i32,
    #[serde(default)]
    pub day: Option<String>,
    /// Set when the rest of the week already has its red-meat meal.
    #[serde(default)]
    pub exclude_red_meat: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ReplaceRequest {
    pub day: String,
    pub new_meal_id: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IcsQuery {
    pub start: Option<NaiveDate>,
}

#[axum_macros::debug_handler]
pub async fn current(State(state): State<AppState>) -> ResponseResult<impl IntoResponse> {
    let plan = current_plan(state.db(), Utc::now())
        .await
        .wrap_err("Error generating meal plan")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(plan))
}

/// A fresh plan. The body is optional; `skip_days` leaves those days out.
#[axum_macros::debug_handler]
pub async fn generate(State(state): State<AppState>, body: Bytes) -> ResponseResult<impl IntoResponse> {
    let request: GenerateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateRequest::default()
    } else {
        serde_json::from_slice(&body)
            .wrap_err("Invalid request payload")
            .with_status(StatusCode::BAD_REQUEST)?
    };

    let skip_days = request
        .skip_days
        .iter()
        .map(|name| {
            Weekday::from_name(name)
                .ok_or_else(|| ServerError::bad_request(format!("Unknown day {name:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let plan = generate_weekly_plan_skipping(state.db(), Utc::now(), &skip_days)
        .await
        .wrap_err("Error generating meal plan")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(plan))
}

/// Stamps every real meal in the plan as planned now.
#[axum_macros::debug_handler]
pub async fn finalize(
    State(state): State<AppState>,
    Json(request): Json<FinalizeRequest>,
) -> ResponseResult<impl IntoResponse> {
    let meal_ids = request.meal_ids();

    let updated = Meal::mark_planned(state.db(), &meal_ids, Utc::now())
        .await
        .wrap_err("Failed to finalize meal plan")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(updated, "Meal plan finalized");

    Ok("Plan finalized")
}

#[axum_macros::debug_handler]
pub async fn swap(
    State(state): State<AppState>,
    Json(request): Json<SwapRequest>,
) -> ResponseResult<impl IntoResponse> {
    let day = request.day.as_deref().and_then(Weekday::from_name);
    let filter = swap_filter(request.meal_id, day, request.exclude_red_meat, Utc::now());
    let meal = swap_candidate(&state, &filter).await?;

    Ok(Json(meal))
}

#[axum_macros::debug_handler]
pub async fn replace(
    State(state): State<AppState>,
    Json(request): Json<ReplaceRequest>,
) -> ResponseResult<impl IntoResponse> {
    tracing::debug!(day = %request.day, meal_id = request.new_meal_id, "Replacing plan day");

    let meal = Meal::get_by_id(state.db(), request.new_meal_id)
        .await
        .wrap_err("Failed to fetch replacement meal")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| ServerError::not_found("Meal not found"))?;

    Ok(Json(meal))
}

/// The current plan as an iCalendar file. `start` is snapped back to its Monday.
#[axum_macros::debug_handler]
pub async fn ics(
    State(state): State<AppState>,
    Query(query): Query<IcsQuery>,
) -> ResponseResult<impl IntoResponse> {
    let now = Utc::now();
    let monday = week_start(query.start.unwrap_or_else(|| now.date_naive()));

    let plan = current_plan(state.db(), now)
        .await
        .wrap_err("Error generating meal plan")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"mealplan.ics\"",
            ),
        ],
        plan_to_ics(&plan, monday, now),
    ))
}

/// Constraints for a meal to stand in for `current_meal_id`.
///
/// The replacement respects the recency window and, when a day is known, that
/// day's effort range. Red meat is only ruled out when the caller asks.
pub(crate) fn swap_filter(
    current_meal_id: i32,
    day: Option<Weekday>,
    exclude_red_meat: bool,
    now: DateTime<Utc>,
) -> MealFilter {
    let (min_effort, max_effort) = day
        .and_then(Weekday::effort_range)
        .unwrap_or((i32::MIN, i32::MAX));

    MealFilter {
        min_effort,
        max_effort,
        planned_before: now - chrono::Duration::days(RECENCY_WINDOW_DAYS),
        exclude_red_meat,
        exclude_id: Some(current_meal_id),
    }
}

/// A random meal matching `filter`, with its ingredients and steps loaded.
pub(crate) async fn swap_candidate(state: &AppState, filter: &MealFilter) -> ResponseResult<Meal> {
    let picked = state
        .db()
        .pick_meal(filter)
        .await
        .wrap_err("Error swapping meal")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| ServerError::not_found("No replacement meal available"))?;

    let meal = Meal::get_by_id(state.db(), picked.id)
        .await
        .wrap_err("Error swapping meal")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| ServerError::not_found("No replacement meal available"))?;

    Ok(meal)
}
