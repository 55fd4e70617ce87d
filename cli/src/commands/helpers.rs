use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use resepku_core::models::{Ingredient, Recipe};

/// Parse an ingredient argument of the form `name=quantity`. A bare `name`
/// has an empty quantity.
pub(crate) fn parse_ingredient(s: &str) -> Ingredient {
    match s.split_once('=') {
        Some((name, quantity)) => Ingredient::new(name.trim(), quantity.trim()),
        None => Ingredient::new(s.trim(), ""),
    }
}

pub(crate) fn parse_ingredients(args: &[String]) -> Vec<Ingredient> {
    args.iter().map(|s| parse_ingredient(s)).collect()
}

/// Ask a yes/no question on stderr. Anything but an explicit yes is a no.
pub(crate) fn prompt_confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "ya")
}

/// Render a stored ISO-8601 timestamp in local time. Unparseable values are
/// shown as stored.
pub(crate) fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_string(),
        |dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
        #[tabled(rename = "Fav")]
        favorite: &'static str,
        #[tabled(rename = "Updated")]
        updated: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            name: truncate(&r.name, 35),
            category: r
                .category
                .as_deref()
                .map(|c| truncate(c, 20))
                .unwrap_or_default(),
            ingredients: r.ingredients.len(),
            favorite: if r.is_favorite { "*" } else { "" },
            updated: format_timestamp(&r.updated_at),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_recipe_detail(recipe: &Recipe) {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
    }

    let name = &recipe.name;
    let id = recipe.id;
    let star = if recipe.is_favorite { " *" } else { "" };
    println!("=== {name}{star} ===");
    println!(
        "  ID: {id}  |  Category: {}  |  Updated: {}\n",
        recipe.category.as_deref().unwrap_or("-"),
        format_timestamp(&recipe.updated_at)
    );

    if recipe.ingredients.is_empty() {
        println!("  (no ingredients)");
        return;
    }

    let rows: Vec<IngredientRow> = recipe
        .ingredients
        .iter()
        .enumerate()
        .map(|(i, ing)| IngredientRow {
            idx: i + 1,
            name: ing.name.clone(),
            quantity: ing.quantity.clone(),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// What an empty result looks like on stdout under `--json`.
#[derive(Clone, Copy)]
pub(crate) enum Empty {
    /// A listing with no rows prints `[]`.
    List,
    /// A single lookup that found nothing prints `{"error": ...}`.
    Missing,
}

fn empty_body(message: &str, kind: Empty) -> serde_json::Value {
    match kind {
        Empty::List => serde_json::json!([]),
        Empty::Missing => serde_json::json!({ "error": message }),
    }
}

/// Report an empty result and exit with status 2.
pub(crate) fn exit_empty(message: &str, kind: Empty, json: bool) -> ! {
    if json {
        println!("{}", empty_body(message, kind));
    } else {
        eprintln!("{message}");
    }
    std::process::exit(2);
}

/// Cut `s` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredient() {
        assert_eq!(
            parse_ingredient("Nasi=2 piring"),
            Ingredient::new("Nasi", "2 piring")
        );
        assert_eq!(
            parse_ingredient(" Bawang putih = 3 siung "),
            Ingredient::new("Bawang putih", "3 siung")
        );
        assert_eq!(parse_ingredient("Garam"), Ingredient::new("Garam", ""));
    }

    #[test]
    fn test_parse_ingredient_splits_on_first_equals() {
        assert_eq!(
            parse_ingredient("Air=1 l = 4 gelas"),
            Ingredient::new("Air", "1 l = 4 gelas")
        );
        assert_eq!(parse_ingredient("=1 sdt"), Ingredient::new("", "1 sdt"));
    }

    #[test]
    fn test_parse_ingredients_keeps_order() {
        let args = vec!["B=2".to_string(), "A=1".to_string()];
        let parsed = parse_ingredients(&args);
        assert_eq!(parsed[0].name, "B");
        assert_eq!(parsed[1].name, "A");
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES \n"));
        assert!(is_yes("ya"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("maybe"));
    }

    #[test]
    fn test_format_timestamp_fallback() {
        assert_eq!(format_timestamp("kemarin"), "kemarin");
        let formatted = format_timestamp("2024-06-15T08:30:00.000Z");
        assert_eq!(formatted.len(), "2024-06-15 08:30".len());
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(empty_body("No recipes found", Empty::List).to_string(), "[]");
        assert_eq!(
            empty_body("Recipe 9 not found", Empty::Missing).to_string(),
            r#"{"error":"Recipe 9 not found"}"#
        );
        assert_eq!(
            empty_body("say \"hi\"", Empty::Missing).to_string(),
            r#"{"error":"say \"hi\""}"#
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("abcdef", 2), "...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème brûlée maison", 10), "Crème b...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }
}
