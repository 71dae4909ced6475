use std::{str::FromStr, time::Duration};

use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Sqlite, SqlitePool, Transaction,
};
use thiserror::Error;

use employee_mgmt_core::{types::EntityId, ValidationError};

mod departments;
mod employees;
mod locations;
mod title_histories;
mod titles;

pub use departments::DepartmentRepository;
pub use employees::{EmployeeFilter, EmployeeRepository};
pub use locations::LocationRepository;
pub use title_histories::{TitleHistoryFilter, TitleHistoryRepository};
pub use titles::TitleRepository;

/// Open SQLite transaction; dropped without `commit` it rolls back.
pub type DbTransaction<'a> = Transaction<'a, Sqlite>;

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    ///
    /// The database file is created when missing. Every pooled connection
    /// enforces foreign keys.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Connect)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for the `locations` table.
    pub fn locations(&self) -> LocationRepository {
        LocationRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for the `titles` table.
    pub fn titles(&self) -> TitleRepository {
        TitleRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for the `departments` table.
    pub fn departments(&self) -> DepartmentRepository {
        DepartmentRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for the `employees` table.
    pub fn employees(&self) -> EmployeeRepository {
        EmployeeRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for the `title_histories` table.
    pub fn title_histories(&self) -> TitleHistoryRepository {
        TitleHistoryRepository {
            pool: self.pool.clone(),
        }
    }

    /// Begins a SQLite transaction for multi-record writes.
    ///
    /// The repositories' `*_in` methods run inside it.
    pub async fn begin(&self) -> Result<DbTransaction<'_>, RepositoryError> {
        Ok(self.pool.begin().await?)
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

/// Errors shared by every entity repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: EntityId },
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("email address is already in use")]
    DuplicateEmail,
    #[error("referenced record is missing or still referenced elsewhere")]
    ForeignKey,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // SQLITE_CONSTRAINT_UNIQUE; email is the only unique column.
                Some("2067") => Self::DuplicateEmail,
                // SQLITE_CONSTRAINT_FOREIGNKEY
                Some("787") => Self::ForeignKey,
                _ => Self::Database(sqlx::Error::Database(db_err)),
            },
            other => Self::Database(other),
        }
    }
}

/// Limit/offset window applied to list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// SQLite treats a negative limit as "no limit".
    pub(crate) fn limit_value(self) -> i64 {
        self.limit.map(i64::from).unwrap_or(-1)
    }

    pub(crate) fn offset_value(self) -> i64 {
        self.offset.map(i64::from).unwrap_or(0)
    }
}

pub(crate) fn not_found(entity: &'static str, id: EntityId) -> RepositoryError {
    RepositoryError::NotFound { entity, id }
}
