use anyhow::{Context, Result, anyhow, bail};
use std::path::Path;

use resepku_core::RecipeService;
use resepku_core::models::{Ingredient, prepare_recipe};

use super::recipe::save_recipe;

/// Import a Cooklang (`.cook`) file as a new recipe.
pub(crate) fn cmd_cook(
    service: &RecipeService,
    file: &Path,
    name_override: Option<String>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let (title, ingredients) = parse_cooklang(&input)?;
    let name = name_override
        .or(title)
        .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
        .context("Could not determine recipe name. Use --name to specify one")?;

    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let recipe = prepare_recipe(&name, ingredients, category)?;
    save_recipe(service, &recipe, "Imported", json)?;
    Ok(())
}

/// Title (if the file declares one) and the grouped ingredient list.
fn parse_cooklang(input: &str) -> Result<(Option<String>, Vec<Ingredient>)> {
    let (recipe_data, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow!("Failed to parse Cooklang file: {e}"))?;

    let title = recipe_data.metadata.title().map(String::from);

    let converter = cooklang::Converter::default();
    let ingredients = recipe_data
        .group_ingredients(&converter)
        .iter()
        .map(|gi| {
            let quantity = gi
                .quantity
                .iter()
                .map(quantity_text)
                .collect::<Vec<_>>()
                .join(", ");
            Ingredient::new(gi.ingredient.display_name().to_string(), quantity)
        })
        .collect();

    Ok((title, ingredients))
}

fn quantity_text(qty: &cooklang::Quantity) -> String {
    let value = match qty.value() {
        cooklang::Value::Number(n) => format_number(n.value()),
        cooklang::Value::Range { start, end } => {
            format!("{}-{}", format_number(start.value()), format_number(end.value()))
        }
        cooklang::Value::Text(t) => t.clone(),
    };
    match qty.unit() {
        Some(unit) => format!("{value} {unit}"),
        None => value,
    }
}

fn format_number(n: f64) -> String {
    if n.fract().abs() < f64::EPSILON {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}
