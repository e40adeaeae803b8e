use std::{collections::BTreeMap, fmt::Display};

use async_trait::async_trait;
use db::{Meal, MealFilter, PgPool};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod generate;
pub mod ics;
pub mod reconstruct;

pub use generate::{generate_weekly_plan, generate_weekly_plan_skipping, RECENCY_WINDOW_DAYS};
pub use ics::{plan_to_ics, week_start};
pub use reconstruct::{current_plan, last_plan, reconstruct_plan};

pub const EATING_OUT: &str = "Eating out";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Inclusive effort bounds for the day. Friday is never picked from the store.
    pub fn effort_range(self) -> Option<(i32, i32)> {
        match self {
            Weekday::Monday => Some((0, 2)),
            Weekday::Tuesday | Weekday::Wednesday | Weekday::Thursday | Weekday::Saturday => {
                Some((3, 5))
            }
            Weekday::Friday => None,
            Weekday::Sunday => Some((6, 100)),
        }
    }

    /// Days since Monday.
    pub fn offset(self) -> u64 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
            Weekday::Sunday => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|day| day.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The slice of a meal the plan views care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMeal {
    pub id: i32,
    pub meal_name: String,
    #[serde(default)]
    pub relative_effort: i32,
    #[serde(default)]
    pub red_meat: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PlannedMeal {
    pub fn eating_out() -> Self {
        Self {
            id: 0,
            meal_name: EATING_OUT.to_string(),
            relative_effort: 0,
            red_meat: false,
            url: None,
        }
    }
}

impl From<Meal> for PlannedMeal {
    fn from(meal: Meal) -> Self {
        Self {
            id: meal.id,
            meal_name: meal.meal_name,
            relative_effort: meal.relative_effort,
            red_meat: meal.red_meat,
            url: meal.url,
        }
    }
}

/// One meal per weekday, serialized as an object keyed by day name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealPlan(BTreeMap<Weekday, PlannedMeal>);

impl MealPlan {
    pub fn insert(&mut self, day: Weekday, meal: PlannedMeal) {
        self.0.insert(day, meal);
    }

    pub fn get(&self, day: Weekday) -> Option<&PlannedMeal> {
        self.0.get(&day)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Days in Monday to Sunday order.
    pub fn days(&self) -> impl Iterator<Item = (Weekday, &PlannedMeal)> {
        self.0.iter().map(|(day, meal)| (*day, meal))
    }

    pub fn red_meat_count(&self) -> usize {
        self.0.values().filter(|meal| meal.red_meat).count()
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed picking {day} meal: no meal matches the constraints")]
    NoMealAvailable { day: Weekday },
    #[error("not enough recently planned meals found: {found} days filled, need at least 6")]
    NotEnoughRecentMeals { found: usize },
    #[error("meal store query failed")]
    Store(#[from] sqlx::Error),
}

/// Where the planner gets its candidate meals from.
#[async_trait]
pub trait MealSource: Send + Sync {
    /// One random meal matching `filter`, or `None` when nothing qualifies.
    async fn pick_meal(&self, filter: &MealFilter) -> Result<Option<Meal>, sqlx::Error>;

    /// Up to `limit` meals ordered by `last_planned`, newest first.
    async fn recently_planned(&self, limit: i64) -> Result<Vec<Meal>, sqlx::Error>;
}

#[async_trait]
impl MealSource for PgPool {
    async fn pick_meal(&self, filter: &MealFilter) -> Result<Option<Meal>, sqlx::Error> {
        Meal::pick_random(self, filter).await
    }

    async fn recently_planned(&self, limit: i64) -> Result<Vec<Meal>, sqlx::Error> {
        Meal::recently_planned(self, limit).await
    }
}
