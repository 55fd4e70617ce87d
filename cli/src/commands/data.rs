use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use resepku_core::{ConnectionState, RecipeService};

use super::helpers::{print_json, prompt_confirm};

#[derive(Serialize)]
struct DataInfo<'a> {
    path: &'a Path,
    state: ConnectionState,
    bytes: Option<u64>,
    recipes: i64,
    favorites: i64,
}

pub(crate) fn cmd_data_info(service: &RecipeService, json: bool) -> Result<()> {
    let info = DataInfo {
        path: service.db_path(),
        state: service.state(),
        bytes: std::fs::metadata(service.db_path()).ok().map(|m| m.len()),
        recipes: service.get_total_row_count("menu")?,
        favorites: service.get_total_row_count("favorites")?,
    };

    if json {
        return print_json(&info);
    }

    println!("Database:  {}", info.path.display());
    println!("State:     {:?}", info.state);
    match info.bytes {
        Some(bytes) => println!("Size:      {bytes} bytes"),
        None => println!("Size:      -"),
    }
    println!("Recipes:   {}", info.recipes);
    println!("Bookmarks: {}", info.favorites);
    Ok(())
}

pub(crate) fn cmd_data_export(service: &RecipeService, dest: &Path, json: bool) -> Result<()> {
    let summary = service
        .export_database(dest)
        .with_context(|| format!("Failed to export database to {}", dest.display()))?;

    if json {
        return print_json(&summary);
    }
    println!(
        "Exported {} recipes ({} bytes) to {}",
        summary.recipes,
        summary.bytes,
        summary.destination.display()
    );
    Ok(())
}

pub(crate) fn cmd_data_import(
    service: &RecipeService,
    source: &Path,
    yes: bool,
    json: bool,
) -> Result<()> {
    if !yes {
        let question = format!(
            "Importing {} replaces every recipe and bookmark in {}. This cannot be undone. Continue?",
            source.display(),
            service.db_path().display()
        );
        if !prompt_confirm(&question)? {
            eprintln!("Cancelled");
            return Ok(());
        }
    }

    let summary = service
        .import_database(source)
        .with_context(|| format!("Failed to import {}", source.display()))?;

    if json {
        return print_json(&summary);
    }
    println!(
        "Imported {}: {} recipes, {} bookmarks",
        summary.source.display(),
        summary.recipes,
        summary.favorites
    );
    Ok(())
}
