use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::error::{DbError, QueryContext, Result};
use crate::models::{
    NewRecipe, Recipe, SortOrder, Table, decode_ingredients, encode_ingredients,
    is_unfiltered_category,
};

// Column order expected by `recipe_from_row`.
const RECIPE_COLUMNS: &str =
    "m.id, m.nama, m.ingredients, m.kategori, m.tanggal, f.menu_id IS NOT NULL";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if absent) the database file, switch it to WAL and
    /// ensure both tables exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DbError::Connection {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Database { conn };
        db.configure().map_err(|source| DbError::Connection {
            path: path.to_path_buf(),
            source,
        })?;
        db.ensure_schema()?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| DbError::Connection {
            path: ":memory:".into(),
            source,
        })?;
        let db = Database { conn };
        db.configure().map_err(|source| DbError::Connection {
            path: ":memory:".into(),
            source,
        })?;
        db.ensure_schema()?;
        Ok(db)
    }

    fn configure(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mode: String =
            self.conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = %mode, "journal mode set");
        // Reads the file header, so a file that is not a database fails here
        // rather than at table creation.
        self.conn
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(())
    }

    /// Idempotent; safe on every startup and after a file swap.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS menu (
                    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                    nama TEXT NOT NULL,
                    ingredients TEXT,
                    kategori TEXT,
                    tanggal TEXT
                );

                CREATE TABLE IF NOT EXISTS favorites (
                    menu_id INTEGER PRIMARY KEY REFERENCES menu(id) ON DELETE CASCADE
                );",
            )
            .map_err(|source| DbError::Schema { source })
    }

    /// Merge the write-ahead log into the main file and truncate it, leaving
    /// a self-contained file on disk.
    pub fn checkpoint(&self) -> Result<()> {
        let (busy, log_frames, checkpointed): (i64, i64, i64) = self
            .conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|err| DbError::Checkpoint {
                reason: err.to_string(),
            })?;
        if busy != 0 {
            return Err(DbError::Checkpoint {
                reason: "database is busy".to_string(),
            });
        }
        debug!(log_frames, checkpointed, "wal checkpoint complete");
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, source)| DbError::Query {
                context: "failed to close database",
                source,
            })
    }

    pub fn journal_mode(&self) -> Result<String> {
        self.conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .query_context("failed to read journal mode")
    }

    // --- Row mapping ---

    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        let raw: Option<String> = row.get(2)?;
        let ingredients = decode_ingredients(raw.as_deref()).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(err))
        })?;
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            ingredients,
            category: row.get(3)?,
            updated_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            is_favorite: row.get(5)?,
        })
    }

    // --- Recipes ---

    pub fn insert_recipe(&self, recipe: &NewRecipe) -> Result<i64> {
        let ingredients = encode_ingredients(&recipe.ingredients)?;
        let now = timestamp();
        self.conn
            .execute(
                "INSERT INTO menu (nama, ingredients, kategori, tanggal) VALUES (?1, ?2, ?3, ?4)",
                params![recipe.name, ingredients, recipe.category, now],
            )
            .query_context("failed to insert recipe")?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "recipe inserted");
        Ok(id)
    }

    /// Recipes matching an optional name substring and category, in the
    /// requested order. Returns the full matching set.
    pub fn list_recipes(
        &self,
        search: &str,
        category: &str,
        sort: SortOrder,
    ) -> Result<Vec<Recipe>> {
        let mut sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM menu m LEFT JOIN favorites f ON m.id = f.menu_id"
        );
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        let search = search.trim();
        if !search.is_empty() {
            conditions.push("m.nama LIKE ? ESCAPE '\\'");
            values.push(format!("%{}%", escape_like(search)));
        }
        if !is_unfiltered_category(category) {
            conditions.push("LOWER(m.kategori) = LOWER(?)");
            values.push(category.trim().to_string());
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(sort.order_by());

        debug!(%sql, ?values, "listing recipes");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .query_context("failed to prepare recipe query")?;
        let recipes = stmt
            .query_map(params_from_iter(values.iter()), Self::recipe_from_row)
            .query_context("failed to load recipes")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .query_context("failed to read recipe rows")?;
        Ok(recipes)
    }

    pub fn list_categories(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT DISTINCT kategori FROM menu
                 WHERE kategori IS NOT NULL AND kategori <> ''
                 ORDER BY kategori ASC",
            )
            .query_context("failed to prepare category query")?;
        let categories = stmt
            .query_map([], |row| row.get(0))
            .query_context("failed to load categories")?
            .collect::<rusqlite::Result<Vec<String>>>()
            .query_context("failed to read category rows")?;
        Ok(categories)
    }

    pub fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {RECIPE_COLUMNS} FROM menu m
                     LEFT JOIN favorites f ON m.id = f.menu_id
                     WHERE m.id = ?1"
                ),
                params![id],
                Self::recipe_from_row,
            )
            .optional()
            .query_context("failed to load recipe")
    }

    /// Replace every mutable field and refresh the timestamp. Favorite status
    /// is untouched.
    pub fn update_recipe(&self, id: i64, recipe: &NewRecipe) -> Result<()> {
        let ingredients = encode_ingredients(&recipe.ingredients)?;
        let now = timestamp();
        let updated = self
            .conn
            .execute(
                "UPDATE menu SET nama = ?1, ingredients = ?2, kategori = ?3, tanggal = ?4 WHERE id = ?5",
                params![recipe.name, ingredients, recipe.category, now, id],
            )
            .query_context("failed to update recipe")?;

        if updated == 0 {
            Err(DbError::NotFound { id })
        } else {
            Ok(())
        }
    }

    /// The favorites row, if any, goes with it via `ON DELETE CASCADE`.
    pub fn delete_recipe(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM menu WHERE id = ?1", params![id])
            .query_context("failed to delete recipe")?;

        if deleted == 0 {
            Err(DbError::NotFound { id })
        } else {
            Ok(())
        }
    }

    pub fn count_rows(&self, table: Table) -> Result<i64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .query_context("failed to count rows")
    }

    // --- Favorites ---

    pub fn add_favorite(&self, recipe_id: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO favorites (menu_id) VALUES (?1)",
                params![recipe_id],
            )
            .query_context("failed to add favorite")?;
        Ok(())
    }

    pub fn remove_favorite(&self, recipe_id: i64) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM favorites WHERE menu_id = ?1",
                params![recipe_id],
            )
            .query_context("failed to remove favorite")?;
        Ok(())
    }

    pub fn is_favorite(&self, recipe_id: i64) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM favorites WHERE menu_id = ?1)",
                params![recipe_id],
                |row| row.get(0),
            )
            .query_context("failed to check favorite")
    }

    /// Favorited recipes, newest first.
    pub fn list_favorites(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {RECIPE_COLUMNS} FROM menu m
                 JOIN favorites f ON m.id = f.menu_id
                 ORDER BY m.id DESC"
            ))
            .query_context("failed to prepare favorites query")?;
        let recipes = stmt
            .query_map([], Self::recipe_from_row)
            .query_context("failed to load favorites")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .query_context("failed to read favorite rows")?;
        Ok(recipes)
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-06-15T08:30:00.000Z`.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ingredient;

    fn recipe(name: &str, category: Option<&str>) -> NewRecipe {
        NewRecipe {
            name: name.to_string(),
            ingredients: vec![Ingredient::new("Garam", "1 sdt")],
            category: category.map(String::from),
        }
    }

    fn names(recipes: &[Recipe]) -> Vec<&str> {
        recipes.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_insert_and_get_recipe() {
        let db = Database::open_in_memory().unwrap();
        let new = NewRecipe {
            name: "Nasi Goreng".to_string(),
            ingredients: vec![
                Ingredient::new("Nasi", "2 piring"),
                Ingredient::new("Telur", ""),
            ],
            category: Some("Nusantara".to_string()),
        };
        let id = db.insert_recipe(&new).unwrap();

        let fetched = db.get_recipe(id).unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.name, "Nasi Goreng");
        assert_eq!(fetched.ingredients, new.ingredients);
        assert_eq!(fetched.category.as_deref(), Some("Nusantara"));
        assert!(!fetched.is_favorite);
        assert!(chrono::DateTime::parse_from_rfc3339(&fetched.updated_at).is_ok());
        assert!(fetched.updated_at.ends_with('Z'));
    }

    #[test]
    fn test_get_recipe_missing() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_recipe(42).unwrap().is_none());
    }

    #[test]
    fn test_ids_are_unique_and_not_reused() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_recipe(&recipe("A", None)).unwrap();
        let b = db.insert_recipe(&recipe("B", None)).unwrap();
        assert_ne!(a, b);
        db.delete_recipe(b).unwrap();
        let c = db.insert_recipe(&recipe("C", None)).unwrap();
        assert!(c > b);
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_recipe(&recipe("Soto", None)).unwrap();
        db.ensure_schema().unwrap();
        db.ensure_schema().unwrap();
        assert!(db.get_recipe(id).unwrap().is_some());
    }

    #[test]
    fn test_legacy_row_without_ingredients() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO menu (nama, ingredients, kategori, tanggal) VALUES ('Lama', NULL, NULL, NULL)",
                [],
            )
            .unwrap();
        db.conn
            .execute(
                "INSERT INTO menu (nama, ingredients) VALUES ('Kosong', '')",
                [],
            )
            .unwrap();

        let all = db.list_recipes("", "", SortOrder::Oldest).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.ingredients.is_empty()));
        assert_eq!(all[0].updated_at, "");
        assert!(all[0].category.is_none());
    }

    #[test]
    fn test_malformed_ingredients_is_query_error() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute("INSERT INTO menu (nama, ingredients) VALUES ('Rusak', '{oops')", [])
            .unwrap();
        let err = db.list_recipes("", "", SortOrder::Newest).unwrap_err();
        assert!(matches!(err, DbError::Query { .. }));
    }

    #[test]
    fn test_list_recipes_sorting() {
        let db = Database::open_in_memory().unwrap();
        let zebra = db.insert_recipe(&recipe("Zebra", None)).unwrap();
        db.insert_recipe(&recipe("Apple", None)).unwrap();
        let mango = db.insert_recipe(&recipe("Mango", None)).unwrap();

        let az = db.list_recipes("", "", SortOrder::NameAsc).unwrap();
        assert_eq!(names(&az), vec!["Apple", "Mango", "Zebra"]);

        let za = db.list_recipes("", "", SortOrder::NameDesc).unwrap();
        assert_eq!(names(&za), vec!["Zebra", "Mango", "Apple"]);

        let newest = db.list_recipes("", "", SortOrder::Newest).unwrap();
        assert_eq!(newest[0].id, mango);

        let oldest = db.list_recipes("", "", SortOrder::Oldest).unwrap();
        assert_eq!(oldest[0].id, zebra);
    }

    #[test]
    fn test_list_recipes_category_filter() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe("Sop Buntut", Some("Soup"))).unwrap();
        db.insert_recipe(&recipe("Soto", Some("soup"))).unwrap();
        db.insert_recipe(&recipe("Rendang", Some("Nusantara"))).unwrap();
        db.insert_recipe(&recipe("Roti", None)).unwrap();

        let soups = db.list_recipes("", "Soup", SortOrder::Oldest).unwrap();
        assert_eq!(names(&soups), vec!["Sop Buntut", "Soto"]);

        let soups = db.list_recipes("", "  SOUP ", SortOrder::Oldest).unwrap();
        assert_eq!(soups.len(), 2);

        for unfiltered in ["", "Semua", "semua", "all", "ALL"] {
            let all = db.list_recipes("", unfiltered, SortOrder::Oldest).unwrap();
            assert_eq!(all.len(), 4, "category {unfiltered:?}");
        }

        assert!(db.list_recipes("", "Dessert", SortOrder::Oldest).unwrap().is_empty());
    }

    #[test]
    fn test_list_recipes_search() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe("Nasi Goreng", Some("Nusantara"))).unwrap();
        db.insert_recipe(&recipe("Mie Goreng", Some("Nusantara"))).unwrap();
        db.insert_recipe(&recipe("Nasi Uduk", Some("Betawi"))).unwrap();
        db.insert_recipe(&recipe("Diskon 50% Kue", None)).unwrap();

        let goreng = db.list_recipes("goreng", "", SortOrder::NameAsc).unwrap();
        assert_eq!(names(&goreng), vec!["Mie Goreng", "Nasi Goreng"]);

        let combined = db.list_recipes(" Nasi ", "nusantara", SortOrder::NameAsc).unwrap();
        assert_eq!(names(&combined), vec!["Nasi Goreng"]);

        // Wildcards in the term match literally.
        let pct = db.list_recipes("%", "", SortOrder::NameAsc).unwrap();
        assert_eq!(names(&pct), vec!["Diskon 50% Kue"]);
        assert!(db.list_recipes("_", "", SortOrder::NameAsc).unwrap().is_empty());
    }

    #[test]
    fn test_list_categories() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe("A", Some("Soup"))).unwrap();
        db.insert_recipe(&recipe("B", Some("Dessert"))).unwrap();
        db.insert_recipe(&recipe("C", Some("Soup"))).unwrap();
        db.insert_recipe(&recipe("D", None)).unwrap();
        db.conn
            .execute("INSERT INTO menu (nama, kategori) VALUES ('E', '')", [])
            .unwrap();

        assert_eq!(db.list_categories().unwrap(), vec!["Dessert", "Soup"]);
    }

    #[test]
    fn test_update_recipe() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_recipe(&recipe("Soto", Some("Soup"))).unwrap();
        db.add_favorite(id).unwrap();
        db.conn
            .execute(
                "UPDATE menu SET tanggal = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
                params![id],
            )
            .unwrap();

        let replacement = NewRecipe {
            name: "Soto Betawi".to_string(),
            ingredients: vec![Ingredient::new("Santan", "200 ml")],
            category: None,
        };
        db.update_recipe(id, &replacement).unwrap();

        let fetched = db.get_recipe(id).unwrap().unwrap();
        assert_eq!(fetched.name, "Soto Betawi");
        assert_eq!(fetched.ingredients, replacement.ingredients);
        assert!(fetched.category.is_none());
        assert_ne!(fetched.updated_at, "2020-01-01T00:00:00.000Z");
        assert!(fetched.is_favorite);
    }

    #[test]
    fn test_update_recipe_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.update_recipe(999, &recipe("X", None)).unwrap_err();
        assert!(matches!(err, DbError::NotFound { id: 999 }));
    }

    #[test]
    fn test_delete_recipe_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.delete_recipe(5).unwrap_err(),
            DbError::NotFound { id: 5 }
        ));
    }

    #[test]
    fn test_favorite_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_recipe(&recipe("Rendang", None)).unwrap();

        db.add_favorite(id).unwrap();
        db.add_favorite(id).unwrap();
        assert_eq!(db.count_rows(Table::Favorites).unwrap(), 1);
        assert!(db.is_favorite(id).unwrap());
        assert!(db.get_recipe(id).unwrap().unwrap().is_favorite);

        db.remove_favorite(id).unwrap();
        db.remove_favorite(id).unwrap();
        assert_eq!(db.count_rows(Table::Favorites).unwrap(), 0);
        assert!(!db.is_favorite(id).unwrap());
    }

    #[test]
    fn test_favorite_requires_existing_recipe() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.add_favorite(123).is_err());
        assert_eq!(db.count_rows(Table::Favorites).unwrap(), 0);
    }

    #[test]
    fn test_delete_cascades_to_favorites() {
        let db = Database::open_in_memory().unwrap();
        let keep = db.insert_recipe(&recipe("Keep", None)).unwrap();
        let gone = db.insert_recipe(&recipe("Gone", None)).unwrap();
        db.add_favorite(keep).unwrap();
        db.add_favorite(gone).unwrap();

        db.delete_recipe(gone).unwrap();

        assert!(db.get_recipe(gone).unwrap().is_none());
        assert_eq!(db.count_rows(Table::Favorites).unwrap(), 1);
        let favorites = db.list_favorites().unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, keep);
    }

    #[test]
    fn test_list_favorites_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_recipe(&recipe("A", None)).unwrap();
        db.insert_recipe(&recipe("B", None)).unwrap();
        let c = db.insert_recipe(&recipe("C", None)).unwrap();
        db.add_favorite(a).unwrap();
        db.add_favorite(c).unwrap();

        let favorites = db.list_favorites().unwrap();
        assert_eq!(names(&favorites), vec!["C", "A"]);
        assert!(favorites.iter().all(|r| r.is_favorite));
    }

    #[test]
    fn test_list_recipes_marks_favorites() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_recipe(&recipe("A", None)).unwrap();
        db.insert_recipe(&recipe("B", None)).unwrap();
        db.add_favorite(a).unwrap();

        let all = db.list_recipes("", "", SortOrder::Oldest).unwrap();
        assert!(all[0].is_favorite);
        assert!(!all[1].is_favorite);
    }

    #[test]
    fn test_count_rows() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.count_rows(Table::Menu).unwrap(), 0);
        db.insert_recipe(&recipe("A", None)).unwrap();
        db.insert_recipe(&recipe("B", None)).unwrap();
        assert_eq!(db.count_rows(Table::Menu).unwrap(), 2);
    }

    #[test]
    fn test_checkpoint_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe("A", None)).unwrap();
        db.checkpoint().unwrap();
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
