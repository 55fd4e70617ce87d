use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// One line of a recipe's ingredient list. Stored as part of a JSON array in
/// the `menu.ingredients` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.quantity.trim().is_empty()
    }
}

/// A `menu` row shaped for callers, with the favorite flag computed from the
/// `favorites` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub category: Option<String>,
    /// Set on insert and overwritten on every update.
    pub updated_at: String,
    pub is_favorite: bool,
}

/// Mutable fields of a recipe, used for both insert and full-replacement
/// update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub const KEYS: &'static [&'static str] = &["terbaru", "terlama", "nama-az", "nama-za"];

    /// Resolve a sort key. Anything unrecognised sorts newest-first.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "terlama" | "oldest" => Self::Oldest,
            "nama-az" | "name-asc" => Self::NameAsc,
            "nama-za" | "name-desc" => Self::NameDesc,
            _ => Self::Newest,
        }
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Newest => "terbaru",
            Self::Oldest => "terlama",
            Self::NameAsc => "nama-az",
            Self::NameDesc => "nama-za",
        }
    }

    pub(crate) fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "m.id DESC",
            Self::Oldest => "m.id ASC",
            Self::NameAsc => "m.nama ASC",
            Self::NameDesc => "m.nama DESC",
        }
    }
}

/// Tables whose rows may be counted. The closed set keeps identifiers out of
/// caller-controlled text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Menu,
    Favorites,
}

impl Table {
    pub const ALL: &'static [Table] = &[Table::Menu, Table::Favorites];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Menu => "menu",
            Table::Favorites => "favorites",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
            return Err(DbError::validation(format!("Invalid table name '{s}'")));
        }
        Table::ALL
            .iter()
            .copied()
            .find(|table| table.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Table::ALL.iter().map(|t| t.as_str()).collect();
                DbError::validation(format!(
                    "Unknown table '{s}'. Must be one of: {}",
                    known.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub destination: PathBuf,
    pub bytes: u64,
    pub recipes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub source: PathBuf,
    pub recipes: i64,
    pub favorites: i64,
}

/// True when `category` means "do not filter": blank, `all` or `semua`.
#[must_use]
pub fn is_unfiltered_category(category: &str) -> bool {
    let trimmed = category.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("all")
        || trimmed.eq_ignore_ascii_case("semua")
}

pub fn encode_ingredients(ingredients: &[Ingredient]) -> Result<String> {
    Ok(serde_json::to_string(ingredients)?)
}

/// Parse the stored ingredient blob. Absent or empty text is an empty list.
pub fn decode_ingredients(raw: Option<&str>) -> serde_json::Result<Vec<Ingredient>> {
    match raw {
        Some(text) if !text.trim().is_empty() => serde_json::from_str(text),
        _ => Ok(Vec::new()),
    }
}

/// Validate and normalise user input before it is written: the name must be
/// non-blank, fully blank ingredient rows are dropped, at least one
/// ingredient must remain, and a blank category is stored as NULL.
pub fn prepare_recipe(
    name: &str,
    ingredients: Vec<Ingredient>,
    category: Option<&str>,
) -> Result<NewRecipe> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DbError::validation("Recipe name must not be empty"));
    }

    let ingredients: Vec<Ingredient> = ingredients
        .into_iter()
        .filter(|ing| !ing.is_blank())
        .map(|ing| Ingredient::new(ing.name.trim(), ing.quantity.trim()))
        .collect();
    if ingredients.is_empty() {
        return Err(DbError::validation("Recipe must have at least one ingredient"));
    }

    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from);

    Ok(NewRecipe {
        name: name.to_string(),
        ingredients,
        category,
    })
}
