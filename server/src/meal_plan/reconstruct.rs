use chrono::{DateTime, Utc};
use db::Meal;

use super::{generate_weekly_plan, MealPlan, MealSource, PlanError, PlannedMeal, Weekday};

const RECENT_MEALS: i64 = 7;
const MIN_FILLED_DAYS: usize = 6;

/// Lays the most recently planned meals back onto the week.
///
/// Meals fill the days in the order given. The Friday slot always holds the
/// eating-out placeholder, so the meal that would have landed there moves to
/// Saturday. Anything past Sunday is dropped.
pub fn reconstruct_plan(recent: Vec<Meal>) -> Result<MealPlan, PlanError> {
    let mut plan = MealPlan::default();
    let mut days = Weekday::ALL.into_iter();

    for meal in recent {
        let Some(mut day) = days.next() else {
            break;
        };

        if day == Weekday::Friday {
            plan.insert(day, PlannedMeal::eating_out());

            let Some(next) = days.next() else {
                break;
            };
            day = next;
        }

        plan.insert(day, meal.into());
    }

    if plan.get(Weekday::Friday).is_none() {
        plan.insert(Weekday::Friday, PlannedMeal::eating_out());
    }

    if plan.len() < MIN_FILLED_DAYS {
        return Err(PlanError::NotEnoughRecentMeals { found: plan.len() });
    }

    Ok(plan)
}

/// The plan that was last finalized, rebuilt from `last_planned` stamps.
#[tracing::instrument(skip(source), err)]
pub async fn last_plan<S>(source: &S) -> Result<MealPlan, PlanError>
where
    S: MealSource + ?Sized,
{
    let recent = source.recently_planned(RECENT_MEALS).await?;

    reconstruct_plan(recent)
}

/// The last finalized plan, or a freshly generated one when there isn't enough
/// history to rebuild it.
pub async fn current_plan<S>(source: &S, now: DateTime<Utc>) -> Result<MealPlan, PlanError>
where
    S: MealSource + ?Sized,
{
    match last_plan(source).await {
        Err(PlanError::NotEnoughRecentMeals { found }) => {
            tracing::info!(found, "Not enough planned history, generating a new plan");

            generate_weekly_plan(source, now).await
        }
        other => other,
    }
}
