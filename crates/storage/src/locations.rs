use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

use employee_mgmt_core::types::{Department, EntityId, Location, LocationPatch, NewLocation};

use crate::{departments::DepartmentRow, not_found, DbTransaction, Page, RepositoryError};

const ENTITY: &str = "location";

/// Repository for the `locations` table.
#[derive(Clone)]
pub struct LocationRepository {
    pub(crate) pool: SqlitePool,
}

impl LocationRepository {
    /// Validates and inserts a new location.
    pub async fn create(&self, location: NewLocation) -> Result<Location, RepositoryError> {
        insert(&self.pool, &location).await
    }

    /// [`create`](Self::create) inside the caller's transaction.
    pub async fn create_in(
        &self,
        tx: &mut DbTransaction<'_>,
        location: NewLocation,
    ) -> Result<Location, RepositoryError> {
        insert(&mut **tx, &location).await
    }

    pub async fn list(&self, page: Page) -> Result<Vec<Location>, RepositoryError> {
        let rows = sqlx::query_as::<_, LocationRow>(
            "SELECT id, location_name, address, postal_code, city, country \
             FROM locations ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(page.limit_value())
        .bind(page.offset_value())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Location::from).collect())
    }

    pub async fn find_by_id(&self, id: EntityId) -> Result<Location, RepositoryError> {
        sqlx::query_as::<_, LocationRow>(
            "SELECT id, location_name, address, postal_code, city, country \
             FROM locations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Location::from)
        .ok_or_else(|| not_found(ENTITY, id))
    }

    /// Applies a partial update and returns the stored record.
    pub async fn update_by_id(
        &self,
        id: EntityId,
        patch: LocationPatch,
    ) -> Result<Location, RepositoryError> {
        let current = self.find_by_id(id).await?;
        let merged = patch.apply(&current);
        self.replace_by_id(id, merged).await?;
        self.find_by_id(id).await
    }

    pub async fn replace_by_id(
        &self,
        id: EntityId,
        location: NewLocation,
    ) -> Result<(), RepositoryError> {
        location.validate()?;
        let result = sqlx::query(
            "UPDATE locations \
             SET location_name = ?, address = ?, postal_code = ?, city = ?, country = ? \
             WHERE id = ?",
        )
        .bind(&location.location_name)
        .bind(&location.address)
        .bind(&location.postal_code)
        .bind(&location.city)
        .bind(&location.country)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, "updated");
        Ok(())
    }

    pub async fn delete_by_id(&self, id: EntityId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, "deleted");
        Ok(())
    }

    /// Departments hosted at the location.
    pub async fn departments(
        &self,
        id: EntityId,
        page: Page,
    ) -> Result<Vec<Department>, RepositoryError> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, department_name, manager_id, location_id \
             FROM departments WHERE location_id = ? ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(id)
        .bind(page.limit_value())
        .bind(page.offset_value())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Department::from).collect())
    }
}

async fn insert<'c, E>(executor: E, location: &NewLocation) -> Result<Location, RepositoryError>
where
    E: Executor<'c, Database = Sqlite>,
{
    location.validate()?;
    let row = sqlx::query_as::<_, LocationRow>(
        "INSERT INTO locations (location_name, address, postal_code, city, country) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id, location_name, address, postal_code, city, country",
    )
    .bind(&location.location_name)
    .bind(&location.address)
    .bind(&location.postal_code)
    .bind(&location.city)
    .bind(&location.country)
    .fetch_one(executor)
    .await?;

    info!(stage = "store", entity = ENTITY, id = row.id, "created");
    Ok(row.into())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LocationRow {
    id: i64,
    location_name: String,
    address: String,
    postal_code: String,
    city: String,
    country: String,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            location_name: row.location_name,
            address: row.address,
            postal_code: row.postal_code,
            city: row.city,
            country: row.country,
        }
    }
}
