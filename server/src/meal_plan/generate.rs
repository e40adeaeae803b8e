use chrono::{DateTime, Duration, Utc};
use db::MealFilter;

use super::{MealPlan, MealSource, PlanError, PlannedMeal, Weekday};

/// Meals planned within this many days are not picked again.
pub const RECENCY_WINDOW_DAYS: i64 = 21;

pub async fn generate_weekly_plan<S>(source: &S, now: DateTime<Utc>) -> Result<MealPlan, PlanError>
where
    S: MealSource + ?Sized,
{
    generate_weekly_plan_skipping(source, now, &[]).await
}

/// Builds a plan one day at a time, Monday first.
///
/// Days in `skip_days` are left out of the plan and never queried. Once a
/// red-meat meal lands in the week, later days only consider meals without
/// red meat.
#[tracing::instrument(skip(source), err)]
pub async fn generate_weekly_plan_skipping<S>(
    source: &S,
    now: DateTime<Utc>,
    skip_days: &[Weekday],
) -> Result<MealPlan, PlanError>
where
    S: MealSource + ?Sized,
{
    let planned_before = now - Duration::days(RECENCY_WINDOW_DAYS);
    let mut plan = MealPlan::default();
    let mut red_meat_used = false;

    for day in Weekday::ALL {
        if skip_days.contains(&day) {
            continue;
        }

        let Some((min_effort, max_effort)) = day.effort_range() else {
            plan.insert(day, PlannedMeal::eating_out());
            continue;
        };

        let filter = MealFilter {
            min_effort,
            max_effort,
            planned_before,
            exclude_red_meat: red_meat_used,
            exclude_id: None,
        };

        let meal = source
            .pick_meal(&filter)
            .await?
            .ok_or(PlanError::NoMealAvailable { day })?;

        tracing::debug!(%day, meal_id = meal.id, red_meat = meal.red_meat, "Picked meal");

        red_meat_used |= meal.red_meat;
        plan.insert(day, meal.into());
    }

    tracing::debug!(days = plan.len(), red_meat = plan.red_meat_count(), "Generated plan");

    Ok(plan)
}
