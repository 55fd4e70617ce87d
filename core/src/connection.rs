//! Ownership of the single live database handle.
//!
//! `ConnectionManager` owns the well-known file path and at most one open
//! `Database`. Every query goes through [`ConnectionManager::with_db`], so a
//! connection that was closed for a file swap and never reopened shows up as
//! [`DbError::Unavailable`] instead of a dangling handle.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use serde::Serialize;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{DbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Uninitialized,
    Open,
    Closed,
}

struct Slot {
    state: ConnectionState,
    db: Option<Database>,
}

pub struct ConnectionManager {
    path: PathBuf,
    slot: Mutex<Slot>,
    transfer: Mutex<()>,
}

/// Held for the duration of an import or export. Dropping it releases the
/// transfer lock.
pub struct TransferGuard<'a> {
    _lock: MutexGuard<'a, ()>,
}

impl ConnectionManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: Mutex::new(Slot {
                state: ConnectionState::Uninitialized,
                db: None,
            }),
            transfer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ConnectionState {
        self.lock_slot().state
    }

    /// Open the database (creating the file and its parent directory if
    /// needed) and ensure the schema. On an already open connection this only
    /// re-runs the idempotent schema step.
    pub fn initialize(&self) -> Result<()> {
        let mut slot = self.lock_slot();
        if let Some(db) = &slot.db {
            return db.ensure_schema();
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                DbError::io(
                    format!("failed to create data directory {}", parent.display()),
                    err,
                )
            })?;
        }

        slot.db = Some(Database::open(&self.path)?);
        slot.state = ConnectionState::Open;
        Ok(())
    }

    pub fn checkpoint(&self) -> Result<()> {
        self.with_db(Database::checkpoint)
    }

    /// Checkpoint, then release the handle. Only meant as the first step of
    /// a file swap. Closing an already closed connection is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut slot = self.lock_slot();
        let Some(db) = slot.db.take() else {
            return Ok(());
        };
        if let Err(err) = db.checkpoint() {
            slot.db = Some(db);
            return Err(err);
        }
        slot.state = ConnectionState::Closed;
        db.close()?;
        info!(path = %self.path.display(), "database connection closed");
        Ok(())
    }

    /// Drop any current handle and open the file at the well-known path from
    /// scratch. On failure the manager stays `Closed`.
    pub fn reopen(&self) -> Result<()> {
        let mut slot = self.lock_slot();
        if let Some(db) = slot.db.take() {
            if let Err(err) = db.close() {
                warn!(error = %err, "failed to close previous connection before reopen");
            }
        }
        slot.state = ConnectionState::Closed;

        info!(path = %self.path.display(), "reopening database connection");
        slot.db = Some(Database::open(&self.path)?);
        slot.state = ConnectionState::Open;
        Ok(())
    }

    /// Run `f` against the open connection.
    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let slot = self.lock_slot();
        match &slot.db {
            Some(db) => f(db),
            None => Err(DbError::Unavailable),
        }
    }

    /// Claim the import/export critical section without blocking.
    pub fn begin_transfer(&self) -> Result<TransferGuard<'_>> {
        match self.transfer.try_lock() {
            Ok(lock) => Ok(TransferGuard { _lock: lock }),
            Err(TryLockError::Poisoned(poisoned)) => Ok(TransferGuard {
                _lock: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => Err(DbError::TransferInProgress),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
