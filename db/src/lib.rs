use std::time::Duration;

use color_eyre::eyre::{eyre, Context, Result};
use sqlx::postgres::PgPoolOptions;

pub mod meals;
pub mod steps;

pub use meals::{Ingredient, Meal, MealFilter, NewIngredient, NewMeal};
pub use steps::{NewStep, RecipeStep};

pub use sqlx;
pub use sqlx::PgPool;

/// Connection settings for the meal store.
///
/// `DATABASE_URL` wins when present. Otherwise the URL is assembled from the
/// individual `DB_*` variables, which is how the docker-compose setup hands
/// them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_url: String,
}

impl DbConfig {
    #[tracing::instrument(name = "DbConfig::from_env")]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(database_url) = lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            return Ok(Self { database_url });
        }

        let host = lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string());
        let port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());
        let user = lookup("DB_USER")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| eyre!("database user is required: set DATABASE_URL or DB_USER"))?;
        let name = lookup("DB_NAME")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| eyre!("database name is required: set DATABASE_URL or DB_NAME"))?;
        let password = lookup("DB_PASSWORD").unwrap_or_default();

        let database_url = if password.is_empty() {
            format!("postgres://{user}@{host}:{port}/{name}")
        } else {
            format!("postgres://{user}:{password}@{host}:{port}/{name}")
        };

        Ok(Self { database_url })
    }
}

#[tracing::instrument(err, skip(config))]
pub async fn setup_db_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(25)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(5 * 60))
        .connect(&config.database_url)
        .await
        .wrap_err(
            "Failed to connect to the database. Make sure Postgres is running and reachable",
        )?;

    const MIGRATION_LOCK_ID: i64 = 0xDB_DB_DB_DB_DB_DB_DB;
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&pool)
        .await?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .wrap_err("Failed to run migrations")?;

    let unlock_result: Option<bool> = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&pool)
        .await?;

    match unlock_result {
        Some(true) => tracing::info!("Migration lock unlocked"),
        Some(false) => tracing::warn!("Failed to unlock migration lock"),
        None => return Err(eyre!("Failed to unlock migration lock")),
    }

    Ok(pool)
}

/// Cheap liveness probe used by the health endpoint.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}
