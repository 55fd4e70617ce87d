mod commands;
mod config;
mod tracing_setup;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    RecipeEdit, cmd_add, cmd_categories, cmd_cook, cmd_count, cmd_data_export, cmd_data_import,
    cmd_data_info, cmd_delete, cmd_edit, cmd_favorite_add, cmd_favorite_list, cmd_favorite_remove,
    cmd_favorite_toggle, cmd_list, cmd_show,
};
use crate::config::Config;
use resepku_core::RecipeService;

#[derive(Parser)]
#[command(
    name = "resepku",
    version,
    about = "A local recipe book",
    long_about = "A local recipe book. Recipes and bookmarks live in a single SQLite \
                  file that can be exported and imported whole."
)]
struct Cli {
    /// Database file (default: resepku.db in the platform data directory)
    #[arg(long, global = true, env = "RESEPKU_DB")]
    db: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a recipe
    Add {
        /// Recipe name
        name: String,
        /// Ingredient as "name=quantity" (repeatable, order is kept)
        #[arg(short, long = "ingredient", required = true)]
        ingredients: Vec<String>,
        /// Category label (e.g. "Nusantara")
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recipes
    List {
        /// Only names containing this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only this category (case-insensitive; "semua" or "all" for every category)
        #[arg(short, long)]
        category: Option<String>,
        /// Sort order: terbaru, terlama, nama-az, nama-za
        #[arg(long, default_value = "terbaru")]
        sort: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its ingredients
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a recipe (omitted fields are kept)
    Edit {
        /// Recipe ID
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// Replacement ingredient list as "name=quantity" (repeatable)
        #[arg(short, long = "ingredient")]
        ingredients: Vec<String>,
        /// New category
        #[arg(short, long, conflicts_with = "clear_category")]
        category: Option<String>,
        /// Remove the category
        #[arg(long)]
        clear_category: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe (and its bookmark)
    Delete {
        /// Recipe ID
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the categories in use
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage bookmarked recipes
    Favorite {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
    /// Count rows in a table (menu or favorites)
    Count {
        /// Table name
        table: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect, export or import the database file
    Data {
        #[command(subcommand)]
        command: DataCommands,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Cook {
        /// Path to the .cook file
        file: PathBuf,
        /// Recipe name override (defaults to metadata title or filename)
        #[arg(long)]
        name: Option<String>,
        /// Category label
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Bookmark a recipe
    Add {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a bookmark
    Remove {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip a recipe's bookmark
    Toggle {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List bookmarked recipes, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Show the database location, state and row counts
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy the database file to DEST
    Export {
        /// Destination file
        dest: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the database with the file at SOURCE
    Import {
        /// Database file to import
        source: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    tracing_setup::init_tracing(cli.debug)?;
    let config = Config::load(cli.db)?;
    let service = RecipeService::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

    match cli.command {
        Commands::Add {
            name,
            ingredients,
            category,
            json,
        } => cmd_add(&service, &name, &ingredients, category.as_deref(), json),
        Commands::List {
            search,
            category,
            sort,
            json,
        } => cmd_list(
            &service,
            search.as_deref(),
            category.as_deref(),
            &sort,
            json,
        ),
        Commands::Show { id, json } => cmd_show(&service, id, json),
        Commands::Edit {
            id,
            name,
            ingredients,
            category,
            clear_category,
            json,
        } => cmd_edit(
            &service,
            id,
            RecipeEdit {
                name,
                ingredients,
                category,
                clear_category,
            },
            json,
        ),
        Commands::Delete { id, yes, json } => cmd_delete(&service, id, yes, json),
        Commands::Categories { json } => cmd_categories(&service, json),
        Commands::Favorite { command } => match command {
            FavoriteCommands::Add { id, json } => cmd_favorite_add(&service, id, json),
            FavoriteCommands::Remove { id, json } => cmd_favorite_remove(&service, id, json),
            FavoriteCommands::Toggle { id, json } => cmd_favorite_toggle(&service, id, json),
            FavoriteCommands::List { json } => cmd_favorite_list(&service, json),
        },
        Commands::Count { table, json } => cmd_count(&service, &table, json),
        Commands::Data { command } => match command {
            DataCommands::Info { json } => cmd_data_info(&service, json),
            DataCommands::Export { dest, json } => cmd_data_export(&service, &dest, json),
            DataCommands::Import { source, yes, json } => {
                cmd_data_import(&service, &source, yes, json)
            }
        },
        Commands::Cook {
            file,
            name,
            category,
            json,
        } => cmd_cook(&service, &file, name, category.as_deref(), json),
    }
}
