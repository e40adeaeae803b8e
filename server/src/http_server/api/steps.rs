use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use color_eyre::eyre::WrapErr;
use db::{NewStep, RecipeStep};
use serde::{Deserialize, Serialize};

use crate::{
    http_server::{
        errors::{ServerError, WithStatus as _},
        ResponseResult,
    },
    recipe_text::parse_steps,
    AppState,
};

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct BulkStepsRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub instructions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReorderRequest {
    pub step_ids: Vec<i32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct MessageResponse {
    pub message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

#[axum_macros::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    Path(meal_id): Path<i32>,
) -> ResponseResult<impl IntoResponse> {
    let steps = RecipeStep::list_for_meal(state.db(), meal_id)
        .await
        .wrap_err("Error retrieving steps")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(steps))
}

#[axum_macros::debug_handler]
pub async fn add(
    State(state): State<AppState>,
    Path(meal_id): Path<i32>,
    Json(step): Json<NewStep>,
) -> ResponseResult<impl IntoResponse> {
    if step.instruction.trim().is_empty() {
        return Err(ServerError::bad_request("Instruction is required"));
    }

    let created = RecipeStep::add(state.db(), meal_id, step)
        .await
        .wrap_err("Error adding step")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| ServerError::not_found("Meal not found"))?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Adds many steps at once, either pre-split or parsed from pasted text.
///
/// JSON bodies carry `instructions` or `text`. Any other content type is read
/// as the text itself.
#[axum_macros::debug_handler]
pub async fn add_bulk(
    State(state): State<AppState>,
    Path(meal_id): Path<i32>,
    headers: HeaderMap,
    body: Bytes,
) -> ResponseResult<impl IntoResponse> {
    let instructions = bulk_instructions(&headers, &body)?;

    let created = RecipeStep::add_many(state.db(), meal_id, instructions)
        .await
        .wrap_err("Error adding steps")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| ServerError::not_found("Meal not found"))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[axum_macros::debug_handler]
pub async fn reorder(
    State(state): State<AppState>,
    Path(meal_id): Path<i32>,
    Json(request): Json<ReorderRequest>,
) -> ResponseResult<impl IntoResponse> {
    if request.step_ids.is_empty() {
        return Err(ServerError::bad_request("No step IDs provided"));
    }

    let reordered = RecipeStep::reorder(state.db(), meal_id, &request.step_ids)
        .await
        .wrap_err("Error reordering steps")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !reordered {
        return Err(ServerError::bad_request(
            "Step IDs must list every step of the meal exactly once",
        ));
    }

    Ok(message("Steps reordered successfully"))
}

#[axum_macros::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Path((meal_id, step_id)): Path<(i32, i32)>,
    Json(step): Json<NewStep>,
) -> ResponseResult<impl IntoResponse> {
    if step.instruction.trim().is_empty() {
        return Err(ServerError::bad_request("Instruction is required"));
    }

    let updated = RecipeStep::update(state.db(), meal_id, step_id, step)
        .await
        .wrap_err("Error updating step")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !updated {
        return Err(ServerError::not_found("Step not found"));
    }

    Ok(message("Step updated successfully"))
}

#[axum_macros::debug_handler]
pub async fn delete_step(
    State(state): State<AppState>,
    Path((meal_id, step_id)): Path<(i32, i32)>,
) -> ResponseResult<impl IntoResponse> {
    let deleted = RecipeStep::delete(state.db(), meal_id, step_id)
        .await
        .wrap_err("Error deleting step")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !deleted {
        return Err(ServerError::not_found("Step not found"));
    }

    Ok(message("Step deleted successfully"))
}

#[axum_macros::debug_handler]
pub async fn delete_all(
    State(state): State<AppState>,
    Path(meal_id): Path<i32>,
) -> ResponseResult<impl IntoResponse> {
    let deleted = RecipeStep::delete_all(state.db(), meal_id)
        .await
        .wrap_err("Error deleting steps")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::debug!(meal_id, deleted, "Deleted all steps");

    Ok(message("All steps deleted successfully"))
}

fn bulk_instructions(headers: &HeaderMap, body: &[u8]) -> Result<Vec<String>, ServerError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.contains("application/json"));

    let instructions = if is_json {
        let request: BulkStepsRequest = serde_json::from_slice(body)
            .wrap_err("Invalid JSON payload")
            .with_status(StatusCode::BAD_REQUEST)?;

        match (request.instructions, request.text) {
            (Some(instructions), _) if !instructions.is_empty() => instructions,
            (_, Some(text)) if !text.is_empty() => parse_steps(&text),
            _ => {
                return Err(ServerError::bad_request(
                    "Either 'text' or 'instructions' must be provided",
                ))
            }
        }
    } else {
        let text = std::str::from_utf8(body)
            .wrap_err("Request body is not valid UTF-8")
            .with_status(StatusCode::BAD_REQUEST)?;
        if text.is_empty() {
            return Err(ServerError::bad_request("Empty request body"));
        }

        parse_steps(text)
    };

    let instructions: Vec<String> = instructions
        .into_iter()
        .map(|instruction| instruction.trim().to_string())
        .filter(|instruction| !instruction.is_empty())
        .collect();

    if instructions.is_empty() {
        return Err(ServerError::bad_request("No valid steps found in the input"));
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use db::{Meal, NewMeal};
    use serde_json::json;
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;
    use crate::http_server::test_helpers::{
        create_test_app, empty_request, json_request, response_body_json,
    };

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers
    }

    #[test]
    fn bulk_prefers_explicit_instructions() {
        let body = json!({ "instructions": ["Chop", "  ", "Fry"], "text": "1. ignored" });

        let instructions =
            bulk_instructions(&json_headers(), &serde_json::to_vec(&body).unwrap()).unwrap();

        assert_eq!(instructions, vec!["Chop", "Fry"]);
    }

    #[test]
    fn bulk_parses_json_text() {
        let body = json!({ "text": "1. Chop\n2. Fry" });

        let instructions =
            bulk_instructions(&json_headers(), &serde_json::to_vec(&body).unwrap()).unwrap();

        assert_eq!(instructions, vec!["Chop", "Fry"]);
    }

    #[test]
    fn bulk_reads_plain_text_bodies() {
        let instructions =
            bulk_instructions(&HeaderMap::new(), b"- Boil water\n- Add noodles").unwrap();

        assert_eq!(instructions, vec!["Boil water", "Add noodles"]);
    }

    #[test]
    fn bulk_rejects_empty_input() {
        let err = bulk_instructions(&json_headers(), b"{}").unwrap_err();
        assert_eq!(err.1, StatusCode::BAD_REQUEST);

        let err = bulk_instructions(&HeaderMap::new(), b"").unwrap_err();
        assert_eq!(err.1, StatusCode::BAD_REQUEST);

        let err = bulk_instructions(&HeaderMap::new(), b"   \n  ").unwrap_err();
        assert_eq!(err.1, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bulk_rejects_malformed_json() {
        let err = bulk_instructions(&json_headers(), b"{not json").unwrap_err();

        assert_eq!(err.1, StatusCode::BAD_REQUEST);
    }

    async fn meal_with_steps(pool: &PgPool, steps: &[&str]) -> Meal {
        Meal::create(
            pool,
            NewMeal {
                meal_name: "Dumplings".to_string(),
                relative_effort: 5,
                steps: steps.iter().map(|s| NewStep::new(*s)).collect(),
                ..NewMeal::default()
            },
        )
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn bulk_text_appends_parsed_steps(pool: PgPool) {
        let meal = meal_with_steps(&pool, &["Make the dough"]).await;
        let app = create_test_app(pool);

        let response = app
            .oneshot(
                axum::http::Request::post(format!("/api/meals/{}/steps/bulk", meal.id))
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(axum::body::Body::from("1. Fill\n2. Fold\n3. Steam"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Vec<RecipeStep> = response_body_json(response).await;
        let numbered: Vec<(i32, &str)> = created
            .iter()
            .map(|s| (s.step_number, s.instruction.as_str()))
            .collect();
        assert_eq!(numbered, vec![(2, "Fill"), (3, "Fold"), (4, "Steam")]);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn reorder_must_cover_every_step(pool: PgPool) {
        let meal = meal_with_steps(&pool, &["a", "b"]).await;
        let app = create_test_app(pool);
        let uri = format!("/api/meals/{}/steps/reorder", meal.id);

        let partial = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &uri,
                &json!({ "stepIds": [meal.steps[1].id] }),
            ))
            .await
            .unwrap();
        assert_eq!(partial.status(), StatusCode::BAD_REQUEST);

        let full = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &uri,
                &json!({ "stepIds": [meal.steps[1].id, meal.steps[0].id] }),
            ))
            .await
            .unwrap();
        assert_eq!(full.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("GET", &format!("/api/meals/{}/steps", meal.id)))
            .await
            .unwrap();
        let steps: Vec<RecipeStep> = response_body_json(response).await;
        let order: Vec<&str> = steps.iter().map(|s| s.instruction.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn add_to_missing_meal_is_not_found(pool: PgPool) {
        let app = create_test_app(pool);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/meals/4242/steps",
                &json!({ "instruction": "Stir" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn delete_step_renumbers(pool: PgPool) {
        let meal = meal_with_steps(&pool, &["a", "b", "c"]).await;
        let app = create_test_app(pool);

        let response = app
            .clone()
            .oneshot(empty_request(
                "DELETE",
                &format!("/api/meals/{}/steps/{}", meal.id, meal.steps[0].id),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("GET", &format!("/api/meals/{}/steps", meal.id)))
            .await
            .unwrap();
        let steps: Vec<RecipeStep> = response_body_json(response).await;
        let numbered: Vec<(i32, &str)> = steps
            .iter()
            .map(|s| (s.step_number, s.instruction.as_str()))
            .collect();
        assert_eq!(numbered, vec![(1, "b"), (2, "c")]);
    }
}
