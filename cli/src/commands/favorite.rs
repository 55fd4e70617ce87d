use anyhow::{Context, Result, bail};

use resepku_core::RecipeService;

use super::helpers::{Empty, exit_empty, print_json, print_recipe_table};

fn recipe_name(service: &RecipeService, id: i64) -> Result<String> {
    match service.get_menu_item_by_id(id) {
        Some(recipe) => Ok(recipe.name),
        None => bail!("Recipe {id} not found"),
    }
}

pub(crate) fn cmd_favorite_add(service: &RecipeService, id: i64, json: bool) -> Result<()> {
    let name = recipe_name(service, id)?;
    service
        .add_favorite(id)
        .with_context(|| format!("Failed to bookmark recipe {id}"))?;
    report(id, &name, true, json);
    Ok(())
}

pub(crate) fn cmd_favorite_remove(service: &RecipeService, id: i64, json: bool) -> Result<()> {
    service
        .remove_favorite(id)
        .with_context(|| format!("Failed to remove bookmark for recipe {id}"))?;
    if json {
        println!("{}", serde_json::json!({ "id": id, "favorite": false }));
    } else {
        println!("Removed bookmark for recipe {id}");
    }
    Ok(())
}

pub(crate) fn cmd_favorite_toggle(service: &RecipeService, id: i64, json: bool) -> Result<()> {
    let name = recipe_name(service, id)?;
    let favorite = service
        .toggle_favorite(id)
        .with_context(|| format!("Failed to toggle bookmark for recipe {id}"))?;
    report(id, &name, favorite, json);
    Ok(())
}

pub(crate) fn cmd_favorite_list(service: &RecipeService, json: bool) -> Result<()> {
    let recipes = service.get_favorite_menu_items();
    if recipes.is_empty() {
        exit_empty("No bookmarked recipes", Empty::List, json);
    }

    if json {
        return print_json(&recipes);
    }
    print_recipe_table(&recipes);
    Ok(())
}

fn report(id: i64, name: &str, favorite: bool, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "id": id, "favorite": favorite }));
    } else if favorite {
        println!("Bookmarked {name} (id: {id})");
    } else {
        println!("Removed bookmark for {name} (id: {id})");
    }
}
