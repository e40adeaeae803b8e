use std::collections::BTreeSet;

use db::Meal;

/// Every ingredient name the meals need, once each, sorted.
pub fn shopping_list(meals: &[Meal]) -> Vec<String> {
    meals
        .iter()
        .flat_map(|meal| &meal.ingredients)
        .map(|ingredient| ingredient.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
