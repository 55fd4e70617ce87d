//! Whole-file export and import of the database.
//!
//! Export checkpoints the live connection and copies the raw file out.
//! Import swaps a user-supplied file in: close, set the live file aside,
//! copy, reopen, verify. If any step from the close onwards fails, a partial
//! copy is cleared and the set-aside file put back before the connection is
//! reopened, so a bad import never leaves the app without a database.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::connection::ConnectionManager;
use crate::error::{DbError, Result};
use crate::models::{ExportSummary, ImportSummary, Table};

const BACKUP_SUFFIX: &str = "import-backup";
const SIDECAR_SUFFIXES: &[&str] = &["-wal", "-shm"];

/// Copy a checkpointed, self-contained database file to `dest`.
pub fn export_database(manager: &ConnectionManager, dest: &Path) -> Result<ExportSummary> {
    let _guard = manager.begin_transfer()?;
    let source = manager.path();

    if !source.is_file() {
        return Err(DbError::io(
            format!("database file not found at {}", source.display()),
            io::Error::from(io::ErrorKind::NotFound),
        ));
    }
    if same_file(source, dest) {
        return Err(DbError::validation(
            "export destination is the live database file",
        ));
    }

    manager.checkpoint()?;
    let recipes = manager.with_db(|db| db.count_rows(Table::Menu))?;

    let bytes = fs::copy(source, dest).map_err(|err| {
        DbError::io(format!("failed to copy database to {}", dest.display()), err)
    })?;
    info!(dest = %dest.display(), bytes, recipes, "database exported");

    Ok(ExportSummary {
        destination: dest.to_path_buf(),
        bytes,
        recipes,
    })
}

/// Replace the live database with the file at `source`.
pub fn import_database(manager: &ConnectionManager, source: &Path) -> Result<ImportSummary> {
    let _guard = manager.begin_transfer()?;
    let live = manager.path().to_path_buf();

    if !source.is_file() {
        return Err(DbError::io(
            format!("import file not found at {}", source.display()),
            io::Error::from(io::ErrorKind::NotFound),
        ));
    }
    if same_file(source, &live) {
        return Err(DbError::validation(
            "import source is the live database file",
        ));
    }

    info!(source = %source.display(), "closing database for import");
    if let Err(err) = manager.close() {
        error!(error = %err, "failed to close database for import");
        recover(manager, &live, Recovery::KeepLive);
        return Err(err);
    }

    let backup = sidecar_path(&live, &format!(".{BACKUP_SUFFIX}"));
    let had_previous = live.exists();
    if had_previous {
        if let Err(err) = fs::rename(&live, &backup) {
            let err = DbError::io("failed to set aside the current database", err);
            recover(manager, &live, Recovery::KeepLive);
            return Err(err);
        }
    }
    remove_sidecars(&live);

    match swap_in(manager, source, &live) {
        Ok((recipes, favorites)) => {
            if had_previous {
                if let Err(err) = fs::remove_file(&backup) {
                    warn!(error = %err, backup = %backup.display(), "failed to remove previous database");
                }
            }
            info!(recipes, favorites, "database import verified");
            Ok(ImportSummary {
                source: source.to_path_buf(),
                recipes,
                favorites,
            })
        }
        Err(err) => {
            error!(error = %err, "database import failed; restoring previous file");
            recover(
                manager,
                &live,
                Recovery::DiscardLive {
                    backup: had_previous.then_some(backup.as_path()),
                },
            );
            Err(err)
        }
    }
}

fn swap_in(manager: &ConnectionManager, source: &Path, live: &Path) -> Result<(i64, i64)> {
    fs::copy(source, live).map_err(|err| {
        DbError::io(format!("failed to copy {}", source.display()), err)
    })?;
    manager.reopen()?;
    manager.with_db(|db| Ok((db.count_rows(Table::Menu)?, db.count_rows(Table::Favorites)?)))
}

/// What sits at the live path when recovery starts.
enum Recovery<'a> {
    /// The live file was never touched.
    KeepLive,
    /// The live path may hold a partial copy. It is removed and the
    /// set-aside file, if any, moved back.
    DiscardLive { backup: Option<&'a Path> },
}

/// The one recovery attempt: clear out a partial copy, put the previous file
/// back (if there was one) and reopen. With nothing to restore the reopen
/// starts from a fresh schema.
fn recover(manager: &ConnectionManager, live: &Path, recovery: Recovery<'_>) {
    if let Err(err) = manager.close() {
        warn!(error = %err, "failed to close connection during recovery");
    }
    if let Recovery::DiscardLive { backup } = recovery {
        remove_if_exists(live);
        remove_sidecars(live);
        if let Some(backup) = backup {
            if let Err(err) = fs::rename(backup, live) {
                error!(error = %err, "failed to restore previous database file");
            }
        }
    }
    match manager.reopen() {
        Ok(()) => info!("database connection recovered"),
        Err(err) => error!(error = %err, "database unavailable after failed import"),
    }
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_sidecars(path: &Path) {
    for suffix in SIDECAR_SUFFIXES {
        remove_if_exists(&sidecar_path(path, suffix));
    }
}

fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(error = %err, path = %path.display(), "failed to remove file"),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
