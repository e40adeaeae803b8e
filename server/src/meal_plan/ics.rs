use std::fmt::Write;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

use super::MealPlan;

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Renders the plan as an iCalendar document with one all-day event per day,
/// anchored on `monday`.
pub fn plan_to_ics(plan: &MealPlan, monday: NaiveDate, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%dT%H%M%SZ");
    let mut out = String::new();

    out.push_str("BEGIN:VCALENDAR\r\n");
    out.push_str("VERSION:2.0\r\n");
    out.push_str("PRODID:-//Meal Planner//EN\r\n");

    for (day, meal) in plan.days() {
        let date = (monday + Days::new(day.offset())).format("%Y%m%d");

        // Writing into a String can't fail.
        let _ = write!(
            out,
            "BEGIN:VEVENT\r\n\
             DTSTAMP:{stamp}\r\n\
             UID:{id}-{date}@mealplanner\r\n\
             DTSTART;VALUE=DATE:{date}\r\n\
             SUMMARY:{summary}\r\n",
            id = meal.id,
            summary = escape_text(&meal.meal_name),
        );

        if let Some(url) = meal.url.as_deref().map(strip_controls).filter(|u| !u.is_empty()) {
            let _ = write!(out, "URL:{url}\r\n");
        }

        out.push_str("END:VEVENT\r\n");
    }

    out.push_str("END:VCALENDAR\r\n");

    out
}

/// URI values can't be escaped, so control characters are dropped instead.
fn strip_controls(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ',' => escaped.push_str("\\,"),
            ';' => escaped.push_str("\\;"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            c => escaped.push(c),
        }
    }

    escaped
}
