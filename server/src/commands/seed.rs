use std::{io::Read, path::Path};

use chrono::{DateTime, NaiveDateTime, Utc};
use color_eyre::eyre::{eyre, Context};
use db::{setup_db_pool, DbConfig, Meal, NewIngredient, NewMeal};

use crate::Result;

const RED_MEAT_KEYWORDS: [&str; 5] = ["beef", "steak", "burger", "pork", "ham"];
const LAST_PLANNED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[tracing::instrument(err)]
pub(crate) async fn seed(csv_path: &Path) -> Result<()> {
    let file = std::fs::File::open(csv_path)
        .wrap_err_with(|| format!("Failed to open seed CSV at {}", csv_path.display()))?;
    let meals = parse_seed_csv(file)?;

    let pool = setup_db_pool(&DbConfig::from_env()?).await?;
    let mut transaction = pool.begin().await?;

    let mut ingredients = 0;
    for new_meal in meals.iter().cloned() {
        ingredients += new_meal.ingredients.len();
        Meal::insert(&mut transaction, new_meal)
            .await
            .wrap_err("Failed to insert seed meal")?;
    }

    transaction.commit().await?;

    tracing::info!(meals = meals.len(), ingredients, "Database seeded");

    Ok(())
}

/// Groups the export's one-row-per-ingredient layout into meals.
///
/// The first row of a meal decides its effort and `last_planned`. Short rows
/// and rows with a non-numeric effort are skipped.
pub(crate) fn parse_seed_csv(reader: impl Read) -> Result<Vec<NewMeal>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut meals: Vec<NewMeal> = Vec::new();

    for (row_index, result) in rdr.records().enumerate() {
        let record =
            result.wrap_err_with(|| format!("Failed to read seed record at row {row_index}"))?;
        if record.len() < 4 {
            tracing::debug!(row_index, "Skipping short seed row");
            continue;
        }

        let meal_name = record[0].trim();
        let Ok(relative_effort) = record[2].trim().parse::<i32>() else {
            tracing::debug!(row_index, effort = &record[2], "Skipping row with bad effort");
            continue;
        };

        let ingredient = parse_ingredient(&record[1]);

        if let Some(meal) = meals.iter_mut().find(|m| m.meal_name == meal_name) {
            meal.ingredients.push(ingredient);
            continue;
        }

        meals.push(NewMeal {
            meal_name: meal_name.to_string(),
            relative_effort,
            red_meat: is_red_meat(meal_name),
            last_planned: parse_last_planned(&record[3]),
            ingredients: vec![ingredient],
            ..NewMeal::default()
        });
    }

    if meals.is_empty() {
        return Err(eyre!("Seed CSV contained no usable rows"));
    }

    Ok(meals)
}

pub(crate) fn is_red_meat(meal_name: &str) -> bool {
    let lower = meal_name.to_lowercase();

    RED_MEAT_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// `"1 cup unsalted butter"` becomes quantity 1, unit `cup`, name
/// `unsalted butter`. Anything with fewer than three words is all name.
pub(crate) fn parse_ingredient(text: &str) -> NewIngredient {
    let tokens: Vec<&str> = text.split_whitespace().collect();

    match tokens.as_slice() {
        [quantity, unit, rest @ ..] if !rest.is_empty() => NewIngredient {
            quantity: quantity.parse().ok(),
            unit: (*unit).to_string(),
            name: rest.join(" "),
        },
        _ => NewIngredient {
            quantity: None,
            unit: String::new(),
            name: text.trim().to_string(),
        },
    }
}

fn parse_last_planned(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), LAST_PLANNED_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn red_meat_is_detected_by_keyword() {
        assert!(is_red_meat("Beef Stew"));
        assert!(is_red_meat("cheeseBURGERS"));
        assert!(is_red_meat("Pulled pork"));
        assert!(is_red_meat("Ham and cheese toastie"));
        assert!(!is_red_meat("Chicken curry"));
    }

    #[test]
    fn ingredient_with_quantity_and_unit() {
        let ingredient = parse_ingredient("1.5 cup unsalted butter, softened");

        assert_eq!(ingredient.quantity, Some(1.5));
        assert_eq!(ingredient.unit, "cup");
        assert_eq!(ingredient.name, "unsalted butter, softened");
    }

    #[test]
    fn ingredient_with_non_numeric_quantity() {
        let ingredient = parse_ingredient("a pinch of salt");

        assert_eq!(ingredient.quantity, None);
        assert_eq!(ingredient.unit, "pinch");
        assert_eq!(ingredient.name, "of salt");
    }

    #[test]
    fn short_ingredient_is_all_name() {
        let ingredient = parse_ingredient(" 2 eggs ");

        assert_eq!(ingredient.quantity, None);
        assert_eq!(ingredient.unit, "");
        assert_eq!(ingredient.name, "2 eggs");
    }

    #[test]
    fn rows_are_grouped_by_meal() {
        let csv = "\
meal_name,ingredient,relative_effort,last_planned
Beef tacos,1 lb ground beef,2,2024-11-02 18:30:00.000000
Beef tacos,tortillas,2,
Veggie curry,2 tbsp curry paste,4,
Veggie curry,rice,4,
Broken row,salt
Bad effort,pepper,lots,
";

        let meals = parse_seed_csv(csv.as_bytes()).unwrap();

        assert_eq!(meals.len(), 2);

        let tacos = &meals[0];
        assert_eq!(tacos.meal_name, "Beef tacos");
        assert_eq!(tacos.relative_effort, 2);
        assert!(tacos.red_meat);
        assert_eq!(tacos.ingredients.len(), 2);
        assert_eq!(tacos.ingredients[0].unit, "lb");
        let planned = tacos.last_planned.unwrap();
        assert_eq!((planned.year(), planned.month(), planned.day()), (2024, 11, 2));
        assert_eq!(planned.hour(), 18);

        let curry = &meals[1];
        assert!(!curry.red_meat);
        assert_eq!(curry.last_planned, None);
        assert_eq!(curry.ingredients[1].name, "rice");
    }

    #[test]
    fn csv_without_rows_is_an_error() {
        let err = parse_seed_csv("meal_name,ingredient,relative_effort,last_planned\n".as_bytes())
            .unwrap_err();

        assert!(err.to_string().contains("no usable rows"));
    }
}
