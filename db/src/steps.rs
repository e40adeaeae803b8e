use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStep {
    pub id: i32,
    pub meal_id: i32,
    pub step_number: i32, // 1-indexed, unique per meal
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStep {
    pub instruction: String,
    /// Where to put the step. Missing, zero or past-the-end appends.
    #[serde(default)]
    pub step_number: Option<i32>,
}

impl NewStep {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            step_number: None,
        }
    }
}

impl RecipeStep {
    pub async fn for_meals(pool: &PgPool, meal_ids: &[i32]) -> Result<Vec<Self>> {
        let steps = sqlx::query_as::<_, RecipeStep>(
            r"
            SELECT id, meal_id, step_number, instruction
            FROM recipe_steps
            WHERE meal_id = ANY($1)
            ORDER BY meal_id, step_number
            ",
        )
        .bind(meal_ids)
        .fetch_all(pool)
        .await?;

        Ok(steps)
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn list_for_meal(pool: &PgPool, meal_id: i32) -> Result<Vec<Self>> {
        let steps = sqlx::query_as::<_, RecipeStep>(
            r"
            SELECT id, meal_id, step_number, instruction
            FROM recipe_steps
            WHERE meal_id = $1
            ORDER BY step_number
            ",
        )
        .bind(meal_id)
        .fetch_all(pool)
        .await?;

        Ok(steps)
    }

    /// Adds a single step. Returns `None` when the meal does not exist.
    ///
    /// A `step_number` inside the current range inserts at that position and
    /// pushes the later steps down by one.
    #[tracing::instrument(skip(pool, step), err)]
    pub async fn add(pool: &PgPool, meal_id: i32, step: NewStep) -> Result<Option<Self>> {
        let mut transaction = pool.begin().await?;

        if !meal_exists(&mut transaction, meal_id).await? {
            return Ok(None);
        }

        let last = last_step_number(&mut transaction, meal_id).await?;
        let position = match step.step_number {
            Some(n) if (1..=last).contains(&n) => {
                sqlx::query(
                    r"
                    UPDATE recipe_steps
                    SET step_number = step_number + 1
                    WHERE meal_id = $1 AND step_number >= $2
                    ",
                )
                .bind(meal_id)
                .bind(n)
                .execute(&mut *transaction)
                .await?;

                n
            }
            _ => last + 1,
        };

        let saved = insert_step(&mut transaction, meal_id, position, step.instruction.trim()).await?;

        transaction.commit().await?;

        Ok(Some(saved))
    }

    /// Appends `instructions` after the existing steps in one transaction.
    /// Returns `None` when the meal does not exist.
    #[tracing::instrument(skip(pool, instructions), fields(count = instructions.len()), err)]
    pub async fn add_many(
        pool: &PgPool,
        meal_id: i32,
        instructions: Vec<String>,
    ) -> Result<Option<Vec<Self>>> {
        let mut transaction = pool.begin().await?;

        if !meal_exists(&mut transaction, meal_id).await? {
            return Ok(None);
        }

        let first = last_step_number(&mut transaction, meal_id).await? + 1;
        let saved = Self::insert_numbered(&mut transaction, meal_id, first, instructions).await?;

        transaction.commit().await?;

        Ok(Some(saved))
    }

    /// Inserts consecutive steps starting at `first`. The caller owns the transaction.
    pub async fn insert_numbered(
        conn: &mut PgConnection,
        meal_id: i32,
        first: i32,
        instructions: Vec<String>,
    ) -> Result<Vec<Self>> {
        let mut saved = Vec::with_capacity(instructions.len());

        for (step_number, instruction) in (first..).zip(instructions) {
            saved.push(insert_step(&mut *conn, meal_id, step_number, &instruction).await?);
        }

        Ok(saved)
    }

    /// Rewrites a step's instruction and, when `step_number` is given, moves it.
    ///
    /// Returns `false` when no such step exists on the meal.
    #[tracing::instrument(skip(pool, step), err)]
    pub async fn update(pool: &PgPool, meal_id: i32, step_id: i32, step: NewStep) -> Result<bool> {
        let mut transaction = pool.begin().await?;

        let current: Option<i32> = sqlx::query_scalar(
            r"
            SELECT step_number
            FROM recipe_steps
            WHERE id = $1 AND meal_id = $2
            FOR UPDATE
            ",
        )
        .bind(step_id)
        .bind(meal_id)
        .fetch_optional(&mut *transaction)
        .await?;

        let Some(current) = current else {
            return Ok(false);
        };

        sqlx::query("UPDATE recipe_steps SET instruction = $1 WHERE id = $2")
            .bind(step.instruction.trim())
            .bind(step_id)
            .execute(&mut *transaction)
            .await?;

        if let Some(requested) = step.step_number.filter(|n| *n > 0) {
            let last = last_step_number(&mut transaction, meal_id).await?;
            let target = requested.min(last);

            if target != current {
                move_step(&mut transaction, meal_id, step_id, current, target).await?;
            }
        }

        transaction.commit().await?;

        Ok(true)
    }

    /// Deletes one step and closes the gap it leaves.
    #[tracing::instrument(skip(pool), err)]
    pub async fn delete(pool: &PgPool, meal_id: i32, step_id: i32) -> Result<bool> {
        let mut transaction = pool.begin().await?;

        let removed: Option<i32> = sqlx::query_scalar(
            "DELETE FROM recipe_steps WHERE id = $1 AND meal_id = $2 RETURNING step_number",
        )
        .bind(step_id)
        .bind(meal_id)
        .fetch_optional(&mut *transaction)
        .await?;

        let Some(removed) = removed else {
            return Ok(false);
        };

        sqlx::query(
            r"
            UPDATE recipe_steps
            SET step_number = step_number - 1
            WHERE meal_id = $1 AND step_number > $2
            ",
        )
        .bind(meal_id)
        .bind(removed)
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(true)
    }

    /// Renumbers the meal's steps to follow `step_ids`.
    ///
    /// `step_ids` has to name every step of the meal exactly once, otherwise
    /// nothing changes and `false` comes back.
    #[tracing::instrument(skip(pool), err)]
    pub async fn reorder(pool: &PgPool, meal_id: i32, step_ids: &[i32]) -> Result<bool> {
        let mut transaction = pool.begin().await?;

        let mut existing: Vec<i32> = sqlx::query_scalar(
            "SELECT id FROM recipe_steps WHERE meal_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(meal_id)
        .fetch_all(&mut *transaction)
        .await?;
        existing.sort_unstable();

        let mut requested = step_ids.to_vec();
        requested.sort_unstable();

        if requested != existing {
            return Ok(false);
        }

        // Park everything on negative numbers first so no intermediate state
        // collides on (meal_id, step_number).
        sqlx::query("UPDATE recipe_steps SET step_number = -step_number WHERE meal_id = $1")
            .bind(meal_id)
            .execute(&mut *transaction)
            .await?;

        for (step_number, step_id) in (1..).zip(step_ids) {
            sqlx::query("UPDATE recipe_steps SET step_number = $1 WHERE id = $2 AND meal_id = $3")
                .bind(step_number)
                .bind(step_id)
                .bind(meal_id)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;

        Ok(true)
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn delete_all(pool: &PgPool, meal_id: i32) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM recipe_steps WHERE meal_id = $1")
            .bind(meal_id)
            .execute(pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

async fn meal_exists(conn: &mut PgConnection, meal_id: i32) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM meals WHERE id = $1)")
        .bind(meal_id)
        .fetch_one(conn)
        .await?;

    Ok(exists)
}

async fn last_step_number(conn: &mut PgConnection, meal_id: i32) -> Result<i32> {
    let last: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(step_number), 0) FROM recipe_steps WHERE meal_id = $1",
    )
    .bind(meal_id)
    .fetch_one(conn)
    .await?;

    Ok(last)
}

async fn insert_step(
    conn: &mut PgConnection,
    meal_id: i32,
    step_number: i32,
    instruction: &str,
) -> Result<RecipeStep> {
    let step = sqlx::query_as::<_, RecipeStep>(
        r"
        INSERT INTO recipe_steps (meal_id, step_number, instruction)
        VALUES ($1, $2, $3)
        RETURNING id, meal_id, step_number, instruction
        ",
    )
    .bind(meal_id)
    .bind(step_number)
    .bind(instruction)
    .fetch_one(conn)
    .await?;

    Ok(step)
}

async fn move_step(
    conn: &mut PgConnection,
    meal_id: i32,
    step_id: i32,
    from: i32,
    to: i32,
) -> Result<()> {
    sqlx::query("UPDATE recipe_steps SET step_number = 0 WHERE id = $1")
        .bind(step_id)
        .execute(&mut *conn)
        .await?;

    let shift = if to < from {
        r"
        UPDATE recipe_steps
        SET step_number = step_number + 1
        WHERE meal_id = $1 AND step_number >= $2 AND step_number < $3
        "
    } else {
        r"
        UPDATE recipe_steps
        SET step_number = step_number - 1
        WHERE meal_id = $1 AND step_number > $3 AND step_number <= $2
        "
    };

    sqlx::query(shift)
        .bind(meal_id)
        .bind(to)
        .bind(from)
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE recipe_steps SET step_number = $1 WHERE id = $2")
        .bind(to)
        .bind(step_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
