use anyhow::{Context, Result, bail};

use resepku_core::RecipeService;
use resepku_core::models::{NewRecipe, SortOrder, prepare_recipe};

use super::helpers::{
    Empty, exit_empty, parse_ingredients, print_json, print_recipe_detail, print_recipe_table,
    prompt_confirm,
};

/// Insert a prepared recipe and report it. `verb` heads the text output
/// ("Added", "Imported").
pub(super) fn save_recipe(
    service: &RecipeService,
    recipe: &NewRecipe,
    verb: &str,
    json: bool,
) -> Result<i64> {
    let id = service
        .add_menu_item(recipe)
        .context("Failed to save recipe")?;

    if json {
        let saved = service
            .get_menu_item_by_id(id)
            .context("Saved recipe could not be read back")?;
        print_json(&saved)?;
    } else {
        let count = recipe.ingredients.len();
        println!("{verb} recipe: {} (id: {id}, {count} ingredients)", recipe.name);
    }
    Ok(id)
}

pub(crate) fn cmd_add(
    service: &RecipeService,
    name: &str,
    ingredients: &[String],
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipe = prepare_recipe(name, parse_ingredients(ingredients), category)?;
    save_recipe(service, &recipe, "Added", json)?;
    Ok(())
}

pub(crate) fn cmd_list(
    service: &RecipeService,
    search: Option<&str>,
    category: Option<&str>,
    sort: &str,
    json: bool,
) -> Result<()> {
    let recipes = service.get_menu_items(
        search.unwrap_or_default(),
        category.unwrap_or_default(),
        SortOrder::from_key(sort),
    );

    if recipes.is_empty() {
        exit_empty("No recipes found", Empty::List, json);
    }

    if json {
        return print_json(&recipes);
    }
    print_recipe_table(&recipes);
    Ok(())
}

pub(crate) fn cmd_show(service: &RecipeService, id: i64, json: bool) -> Result<()> {
    let Some(recipe) = service.get_menu_item_by_id(id) else {
        exit_empty(&format!("Recipe {id} not found"), Empty::Missing, json);
    };

    if json {
        return print_json(&recipe);
    }
    print_recipe_detail(&recipe);
    Ok(())
}

/// Fields left out keep their current value. Passing any `--ingredient`
/// replaces the whole list.
pub(crate) struct RecipeEdit {
    pub name: Option<String>,
    pub ingredients: Vec<String>,
    pub category: Option<String>,
    pub clear_category: bool,
}

pub(crate) fn cmd_edit(
    service: &RecipeService,
    id: i64,
    edit: RecipeEdit,
    json: bool,
) -> Result<()> {
    let Some(current) = service.get_menu_item_by_id(id) else {
        bail!("Recipe {id} not found");
    };

    let name = edit.name.unwrap_or(current.name);
    let ingredients = if edit.ingredients.is_empty() {
        current.ingredients
    } else {
        parse_ingredients(&edit.ingredients)
    };
    let category = if edit.clear_category {
        None
    } else {
        edit.category.or(current.category)
    };

    let recipe = prepare_recipe(&name, ingredients, category.as_deref())?;
    service
        .update_menu_item(id, &recipe)
        .with_context(|| format!("Failed to update recipe {id}"))?;

    if json {
        let updated = service
            .get_menu_item_by_id(id)
            .context("Updated recipe could not be read back")?;
        print_json(&updated)?;
    } else {
        println!("Updated recipe {id}: {}", recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_delete(service: &RecipeService, id: i64, yes: bool, json: bool) -> Result<()> {
    let Some(recipe) = service.get_menu_item_by_id(id) else {
        bail!("Recipe {id} not found");
    };

    if !yes && !prompt_confirm(&format!("Delete '{}'?", recipe.name))? {
        eprintln!("Cancelled");
        return Ok(());
    }

    service
        .delete_menu_item(id)
        .with_context(|| format!("Failed to delete recipe {id}"))?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted recipe {id}: {}", recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_categories(service: &RecipeService, json: bool) -> Result<()> {
    let categories = service.get_unique_categories();
    if categories.is_empty() {
        exit_empty("No categories yet", Empty::List, json);
    }

    if json {
        return print_json(&categories);
    }
    for category in &categories {
        println!("{category}");
    }
    Ok(())
}

pub(crate) fn cmd_count(service: &RecipeService, table: &str, json: bool) -> Result<()> {
    let count = service.get_total_row_count(table)?;
    if json {
        println!("{}", serde_json::json!({ "table": table, "count": count }));
    } else {
        println!("{count}");
    }
    Ok(())
}
