use std::collections::HashMap;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::steps::{NewStep, RecipeStep};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: i32,
    pub meal_name: String,
    pub relative_effort: i32,
    pub last_planned: Option<DateTime<Utc>>,
    pub red_meat: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[sqlx(skip)]
    #[serde(default)]
    pub steps: Vec<RecipeStep>,
}

/// Ingredient rows keep the field casing the frontend already speaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Ingredient {
    #[serde(rename = "ID", default)]
    pub id: i32,
    #[serde(rename = "MealID", default)]
    pub meal_id: i32,
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewIngredient {
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeal {
    #[serde(default)]
    pub meal_name: String,
    #[serde(default)]
    pub relative_effort: i32,
    #[serde(default)]
    pub red_meat: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub last_planned: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ingredients: Vec<NewIngredient>,
    #[serde(default)]
    pub steps: Vec<NewStep>,
}

/// Selection constraints for [`Meal::pick_random`].
#[derive(Debug, Clone, PartialEq)]
pub struct MealFilter {
    pub min_effort: i32,
    pub max_effort: i32,
    /// Only meals never planned, or last planned strictly before this instant.
    pub planned_before: DateTime<Utc>,
    pub exclude_red_meat: bool,
    pub exclude_id: Option<i32>,
}

impl MealFilter {
    pub fn matches(&self, meal: &Meal) -> bool {
        (self.min_effort..=self.max_effort).contains(&meal.relative_effort)
            && meal
                .last_planned
                .map_or(true, |planned| planned < self.planned_before)
            && !(self.exclude_red_meat && meal.red_meat)
            && self.exclude_id != Some(meal.id)
    }
}

impl Meal {
    #[tracing::instrument(skip(pool), err)]
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>> {
        let meals = sqlx::query_as::<_, Meal>(
            r"
            SELECT
                id,
                meal_name,
                relative_effort,
                last_planned,
                red_meat,
                url
            FROM meals
            ORDER BY id
            ",
        )
        .fetch_all(pool)
        .await?;

        Self::with_details(pool, meals).await
    }

    /// Meals for `ids`, in the order requested. Unknown ids are skipped.
    #[tracing::instrument(skip(pool), err)]
    pub async fn get_by_ids(pool: &PgPool, ids: &[i32]) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = sqlx::query_as::<_, Meal>(
            r"
            SELECT
                id,
                meal_name,
                relative_effort,
                last_planned,
                red_meat,
                url
            FROM meals
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        let by_id: HashMap<i32, Meal> = found.into_iter().map(|m| (m.id, m)).collect();
        let ordered = ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect();

        Self::with_details(pool, ordered).await
    }

    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>> {
        Ok(Self::get_by_ids(pool, &[id]).await?.into_iter().next())
    }

    #[tracing::instrument(skip(pool, new_meal), fields(meal_name = %new_meal.meal_name), err)]
    pub async fn create(pool: &PgPool, new_meal: NewMeal) -> Result<Self> {
        let mut transaction = pool.begin().await?;

        let meal = Self::insert(&mut transaction, new_meal).await?;

        transaction.commit().await?;

        Ok(meal)
    }

    /// Inserts a meal with its ingredients and steps on an open connection.
    ///
    /// Callers own the transaction; nothing is committed here.
    pub async fn insert(conn: &mut PgConnection, new_meal: NewMeal) -> Result<Self> {
        let url = new_meal.url.filter(|u| !u.trim().is_empty());

        let mut meal = sqlx::query_as::<_, Meal>(
            r"
            INSERT INTO meals (meal_name, relative_effort, last_planned, red_meat, url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                id,
                meal_name,
                relative_effort,
                last_planned,
                red_meat,
                url
            ",
        )
        .bind(new_meal.meal_name.trim())
        .bind(new_meal.relative_effort)
        .bind(new_meal.last_planned)
        .bind(new_meal.red_meat)
        .bind(url)
        .fetch_one(&mut *conn)
        .await?;

        for ingredient in new_meal.ingredients {
            let saved = Ingredient::insert(&mut *conn, meal.id, ingredient).await?;
            meal.ingredients.push(saved);
        }

        let instructions: Vec<String> = new_meal
            .steps
            .into_iter()
            .map(|step| step.instruction.trim().to_string())
            .filter(|instruction| !instruction.is_empty())
            .collect();
        meal.steps = RecipeStep::insert_numbered(&mut *conn, meal.id, 1, instructions).await?;

        Ok(meal)
    }

    /// Deletes the meal and everything hanging off it.
    ///
    /// Returns `false` when no meal had that id.
    #[tracing::instrument(skip(pool), err)]
    pub async fn delete(pool: &PgPool, meal_id: i32) -> Result<bool> {
        let mut transaction = pool.begin().await?;

        sqlx::query("DELETE FROM recipe_steps WHERE meal_id = $1")
            .bind(meal_id)
            .execute(&mut *transaction)
            .await?;

        sqlx::query("DELETE FROM ingredients WHERE meal_id = $1")
            .bind(meal_id)
            .execute(&mut *transaction)
            .await?;

        let deleted = sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(meal_id)
            .execute(&mut *transaction)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Ok(false);
        }

        transaction.commit().await?;

        Ok(true)
    }

    /// One uniformly random meal matching `filter`, if any.
    #[tracing::instrument(skip(pool), err)]
    pub async fn pick_random(pool: &PgPool, filter: &MealFilter) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(
            r"
            SELECT
                id,
                meal_name,
                relative_effort,
                last_planned,
                red_meat,
                url
            FROM meals
            WHERE relative_effort BETWEEN $1 AND $2
                AND (last_planned IS NULL OR last_planned < $3)
                AND (NOT $4 OR red_meat = false)
                AND ($5::INTEGER IS NULL OR id <> $5)
            ORDER BY random()
            LIMIT 1
            ",
        )
        .bind(filter.min_effort)
        .bind(filter.max_effort)
        .bind(filter.planned_before)
        .bind(filter.exclude_red_meat)
        .bind(filter.exclude_id)
        .fetch_optional(pool)
        .await
    }

    /// The most recently planned meals, newest first.
    #[tracing::instrument(skip(pool), err)]
    pub async fn recently_planned(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(
            r"
            SELECT
                id,
                meal_name,
                relative_effort,
                last_planned,
                red_meat,
                url
            FROM meals
            WHERE last_planned IS NOT NULL
            ORDER BY last_planned DESC, id
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Stamps `last_planned` on every meal in a finalized plan.
    #[tracing::instrument(skip(pool), err)]
    pub async fn mark_planned(pool: &PgPool, meal_ids: &[i32], at: DateTime<Utc>) -> Result<u64> {
        let mut transaction = pool.begin().await?;
        let mut updated = 0;

        for meal_id in meal_ids {
            updated += sqlx::query("UPDATE meals SET last_planned = $1 WHERE id = $2")
                .bind(at)
                .bind(meal_id)
                .execute(&mut *transaction)
                .await?
                .rows_affected();
        }

        transaction.commit().await?;

        Ok(updated)
    }

    async fn with_details(pool: &PgPool, mut meals: Vec<Self>) -> Result<Vec<Self>> {
        let ids: Vec<i32> = meals.iter().map(|m| m.id).collect();

        let mut ingredients: HashMap<i32, Vec<Ingredient>> = HashMap::new();
        for ingredient in Ingredient::for_meals(pool, &ids).await? {
            ingredients
                .entry(ingredient.meal_id)
                .or_default()
                .push(ingredient);
        }

        let mut steps: HashMap<i32, Vec<RecipeStep>> = HashMap::new();
        for step in RecipeStep::for_meals(pool, &ids).await? {
            steps.entry(step.meal_id).or_default().push(step);
        }

        for meal in &mut meals {
            meal.ingredients = ingredients.get(&meal.id).cloned().unwrap_or_default();
            meal.steps = steps.get(&meal.id).cloned().unwrap_or_default();
        }

        Ok(meals)
    }
}

impl Ingredient {
    pub async fn for_meals(pool: &PgPool, meal_ids: &[i32]) -> Result<Vec<Self>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r"
            SELECT id, meal_id, quantity, unit, name
            FROM ingredients
            WHERE meal_id = ANY($1)
            ORDER BY meal_id, id
            ",
        )
        .bind(meal_ids)
        .fetch_all(pool)
        .await?;

        Ok(ingredients)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        meal_id: i32,
        ingredient: NewIngredient,
    ) -> Result<Self> {
        let saved = sqlx::query_as::<_, Ingredient>(
            r"
            INSERT INTO ingredients (meal_id, quantity, unit, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, meal_id, quantity, unit, name
            ",
        )
        .bind(meal_id)
        .bind(ingredient.quantity)
        .bind(ingredient.unit.trim())
        .bind(ingredient.name.trim())
        .fetch_one(conn)
        .await?;

        Ok(saved)
    }

    /// Returns `false` when the ingredient does not belong to `meal_id`.
    #[tracing::instrument(skip(pool, ingredient), err)]
    pub async fn update(
        pool: &PgPool,
        meal_id: i32,
        ingredient_id: i32,
        ingredient: NewIngredient,
    ) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE ingredients SET name = $1, quantity = $2, unit = $3 WHERE id = $4 AND meal_id = $5",
        )
        .bind(ingredient.name.trim())
        .bind(ingredient.quantity)
        .bind(ingredient.unit.trim())
        .bind(ingredient_id)
        .bind(meal_id)
        .execute(pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn delete(pool: &PgPool, meal_id: i32, ingredient_id: i32) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM ingredients WHERE id = $1 AND meal_id = $2")
            .bind(ingredient_id)
            .bind(meal_id)
            .execute(pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::PgPool;

    use super::*;

    fn meal(id: i32, effort: i32, red_meat: bool, last_planned: Option<DateTime<Utc>>) -> Meal {
        Meal {
            id,
            meal_name: format!("Meal {id}"),
            relative_effort: effort,
            last_planned,
            red_meat,
            url: None,
            ingredients: vec![],
            steps: vec![],
        }
    }

    fn new_meal(name: &str, effort: i32) -> NewMeal {
        NewMeal {
            meal_name: name.to_string(),
            relative_effort: effort,
            ingredients: vec![
                NewIngredient {
                    quantity: Some(2.0),
                    unit: "cup".to_string(),
                    name: "rice".to_string(),
                },
                NewIngredient {
                    quantity: None,
                    unit: String::new(),
                    name: "salt".to_string(),
                },
            ],
            steps: vec![
                NewStep::new("Rinse the rice"),
                NewStep::new("   "),
                NewStep::new("Simmer for 18 minutes"),
            ],
            ..NewMeal::default()
        }
    }

    #[test]
    fn filter_matches_effort_range_inclusively() {
        let filter = MealFilter {
            min_effort: 3,
            max_effort: 5,
            planned_before: Utc::now(),
            exclude_red_meat: false,
            exclude_id: None,
        };

        assert!(filter.matches(&meal(1, 3, false, None)));
        assert!(filter.matches(&meal(2, 5, false, None)));
        assert!(!filter.matches(&meal(3, 6, false, None)));
        assert!(!filter.matches(&meal(4, 2, false, None)));
    }

    #[test]
    fn filter_applies_recency_red_meat_and_exclusion() {
        let now = Utc::now();
        let filter = MealFilter {
            min_effort: 0,
            max_effort: 100,
            planned_before: now - Duration::days(21),
            exclude_red_meat: true,
            exclude_id: Some(7),
        };

        assert!(filter.matches(&meal(1, 1, false, Some(now - Duration::days(30)))));
        assert!(!filter.matches(&meal(2, 1, false, Some(now - Duration::days(3)))));
        assert!(!filter.matches(&meal(3, 1, true, None)));
        assert!(!filter.matches(&meal(7, 1, false, None)));
    }

    #[test]
    fn ingredient_json_uses_frontend_casing() {
        let ingredient = Ingredient {
            id: 4,
            meal_id: 2,
            quantity: Some(1.5),
            unit: "tbsp".to_string(),
            name: "butter".to_string(),
        };

        let json = serde_json::to_value(&ingredient).unwrap();
        assert_eq!(json["ID"], 4);
        assert_eq!(json["MealID"], 2);
        assert_eq!(json["Quantity"], 1.5);
        assert_eq!(json["Name"], "butter");
    }

    #[sqlx::test]
    async fn create_persists_ingredients_and_numbered_steps(pool: PgPool) {
        let created = Meal::create(&pool, new_meal("Fried rice", 3)).await.unwrap();

        assert_eq!(created.ingredients.len(), 2);
        let numbers: Vec<i32> = created.steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2]);

        let fetched = Meal::get_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.meal_name, "Fried rice");
        assert_eq!(fetched.ingredients, created.ingredients);
        assert_eq!(fetched.steps, created.steps);
    }

    #[sqlx::test]
    async fn delete_cascades_and_reports_missing(pool: PgPool) {
        let created = Meal::create(&pool, new_meal("Soup", 2)).await.unwrap();

        assert!(Meal::delete(&pool, created.id).await.unwrap());
        assert!(!Meal::delete(&pool, created.id).await.unwrap());

        let leftovers = Ingredient::for_meals(&pool, &[created.id]).await.unwrap();
        assert!(leftovers.is_empty());
    }

    #[sqlx::test]
    async fn get_by_ids_keeps_request_order(pool: PgPool) {
        let a = Meal::create(&pool, new_meal("A", 1)).await.unwrap();
        let b = Meal::create(&pool, new_meal("B", 1)).await.unwrap();

        let meals = Meal::get_by_ids(&pool, &[b.id, 9999, a.id]).await.unwrap();
        let names: Vec<&str> = meals.iter().map(|m| m.meal_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[sqlx::test]
    async fn pick_random_respects_filter(pool: PgPool) {
        let now = Utc::now();
        let recent = NewMeal {
            last_planned: Some(now - Duration::days(2)),
            ..new_meal("Recent", 4)
        };
        let steak = NewMeal {
            red_meat: true,
            ..new_meal("Steak", 4)
        };
        Meal::create(&pool, recent).await.unwrap();
        Meal::create(&pool, steak).await.unwrap();
        let eligible = Meal::create(&pool, new_meal("Curry", 4)).await.unwrap();

        let filter = MealFilter {
            min_effort: 3,
            max_effort: 5,
            planned_before: now - Duration::days(21),
            exclude_red_meat: true,
            exclude_id: None,
        };
        let picked = Meal::pick_random(&pool, &filter).await.unwrap().unwrap();
        assert_eq!(picked.id, eligible.id);

        let none_left = MealFilter {
            exclude_id: Some(eligible.id),
            ..filter
        };
        assert!(Meal::pick_random(&pool, &none_left).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn mark_planned_feeds_recently_planned(pool: PgPool) {
        let a = Meal::create(&pool, new_meal("A", 1)).await.unwrap();
        let b = Meal::create(&pool, new_meal("B", 1)).await.unwrap();
        let now = Utc::now();

        Meal::mark_planned(&pool, &[a.id], now - Duration::hours(1))
            .await
            .unwrap();
        Meal::mark_planned(&pool, &[b.id], now).await.unwrap();

        let recent = Meal::recently_planned(&pool, 7).await.unwrap();
        let ids: Vec<i32> = recent.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[sqlx::test]
    async fn ingredient_update_is_scoped_to_meal(pool: PgPool) {
        let a = Meal::create(&pool, new_meal("A", 1)).await.unwrap();
        let b = Meal::create(&pool, new_meal("B", 1)).await.unwrap();
        let ingredient_id = a.ingredients[0].id;
        let change = NewIngredient {
            quantity: Some(3.0),
            unit: "cup".to_string(),
            name: "brown rice".to_string(),
        };

        assert!(!Ingredient::update(&pool, b.id, ingredient_id, change.clone())
            .await
            .unwrap());
        assert!(Ingredient::update(&pool, a.id, ingredient_id, change)
            .await
            .unwrap());

        let a = Meal::get_by_id(&pool, a.id).await.unwrap().unwrap();
        assert_eq!(a.ingredients[0].name, "brown rice");

        assert!(Ingredient::delete(&pool, a.id, ingredient_id).await.unwrap());
        let a = Meal::get_by_id(&pool, a.id).await.unwrap().unwrap();
        assert_eq!(a.ingredients.len(), 1);
    }
}
