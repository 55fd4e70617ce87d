//! The application-facing API.
//!
//! Each method's return type is its error policy. List reads return a plain
//! `Vec` and log failures, insert returns `None` on failure, and mutations
//! hand the error back. Callers cannot tell an empty list from a failed one;
//! the warning in the log is the only trace.

use std::path::Path;

use tracing::warn;

use crate::connection::{ConnectionManager, ConnectionState};
use crate::db::Database;
use crate::error::{DbError, Result};
use crate::models::{ExportSummary, ImportSummary, NewRecipe, Recipe, SortOrder, Table};
use crate::transfer;

pub struct RecipeService {
    manager: ConnectionManager,
}

impl RecipeService {
    /// Build a service for the database at `path` and open it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let service = Self::new(path);
        service.initialize_database()?;
        Ok(service)
    }

    /// Build a service without touching the file. Call
    /// [`initialize_database`](Self::initialize_database) before use.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            manager: ConnectionManager::new(path.as_ref()),
        }
    }

    pub fn db_path(&self) -> &Path {
        self.manager.path()
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    // --- Lifecycle ---

    pub fn initialize_database(&self) -> Result<()> {
        self.manager.initialize()
    }

    pub fn close_current_database(&self) -> Result<()> {
        self.manager.close()
    }

    pub fn reinitialize_database_connection(&self) -> Result<()> {
        self.manager.reopen()
    }

    pub fn checkpoint_database(&self) -> Result<()> {
        self.manager.checkpoint()
    }

    // --- Recipes ---

    /// Insert a recipe and return its id, or `None` if the write failed.
    pub fn add_menu_item(&self, recipe: &NewRecipe) -> Option<i64> {
        self.manager
            .with_db(|db| db.insert_recipe(recipe))
            .inspect_err(|err| warn!(error = %err, "failed to add recipe"))
            .ok()
    }

    /// Matching recipes, or an empty list on any failure.
    pub fn get_menu_items(&self, search: &str, category: &str, sort: SortOrder) -> Vec<Recipe> {
        self.manager
            .with_db(|db| db.list_recipes(search, category, sort))
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to list recipes");
                Vec::new()
            })
    }

    pub fn get_unique_categories(&self) -> Vec<String> {
        self.manager
            .with_db(Database::list_categories)
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to list categories");
                Vec::new()
            })
    }

    /// `None` for a missing id and also for a failed lookup.
    pub fn get_menu_item_by_id(&self, id: i64) -> Option<Recipe> {
        self.manager
            .with_db(|db| db.get_recipe(id))
            .unwrap_or_else(|err| {
                warn!(id, error = %err, "failed to load recipe");
                None
            })
    }

    pub fn update_menu_item(&self, id: i64, recipe: &NewRecipe) -> Result<()> {
        self.manager.with_db(|db| db.update_recipe(id, recipe))
    }

    pub fn delete_menu_item(&self, id: i64) -> Result<()> {
        self.manager.with_db(|db| db.delete_recipe(id))
    }

    /// Row count for a table named by the caller. An unknown or malformed
    /// name is an error; a failing count reads as zero.
    pub fn get_total_row_count(&self, table: &str) -> Result<i64> {
        let table: Table = table.parse()?;
        Ok(self
            .manager
            .with_db(|db| db.count_rows(table))
            .unwrap_or_else(|err| {
                warn!(%table, error = %err, "failed to count rows");
                0
            }))
    }

    // --- Favorites ---

    pub fn add_favorite(&self, recipe_id: i64) -> Result<()> {
        self.manager.with_db(|db| db.add_favorite(recipe_id))
    }

    pub fn remove_favorite(&self, recipe_id: i64) -> Result<()> {
        self.manager.with_db(|db| db.remove_favorite(recipe_id))
    }

    /// Flip the bookmark and return the new state.
    pub fn toggle_favorite(&self, recipe_id: i64) -> Result<bool> {
        self.manager.with_db(|db| {
            if db.get_recipe(recipe_id)?.is_none() {
                return Err(DbError::NotFound { id: recipe_id });
            }
            if db.is_favorite(recipe_id)? {
                db.remove_favorite(recipe_id)?;
                Ok(false)
            } else {
                db.add_favorite(recipe_id)?;
                Ok(true)
            }
        })
    }

    pub fn get_favorite_menu_items(&self) -> Vec<Recipe> {
        self.manager
            .with_db(Database::list_favorites)
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to list favorites");
                Vec::new()
            })
    }

    // --- Data management ---

    pub fn export_database(&self, dest: &Path) -> Result<ExportSummary> {
        transfer::export_database(&self.manager, dest)
    }

    pub fn import_database(&self, source: &Path) -> Result<ImportSummary> {
        transfer::import_database(&self.manager, source)
    }
}
