use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use resepku_core::DATABASE_FILE_NAME;

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve the database path: an explicit `--db` / `RESEPKU_DB` wins,
    /// otherwise the platform data directory. The directory itself is
    /// created when the database is opened.
    pub fn load(db_override: Option<PathBuf>) -> Result<Self> {
        if let Some(db_path) = db_override {
            return Ok(Config { db_path });
        }

        let proj_dirs =
            ProjectDirs::from("", "", "resepku").context("Could not determine home directory")?;
        let db_path = proj_dirs.data_dir().join(DATABASE_FILE_NAME);

        Ok(Config { db_path })
    }
}
