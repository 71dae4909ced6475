use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

use employee_mgmt_core::types::{
    Department, DepartmentPatch, Employee, EntityId, Location, NewDepartment,
};

use crate::{
    employees::{EmployeeFilter, EmployeeRepository},
    locations::LocationRepository,
    not_found, DbTransaction, Page, RepositoryError,
};

const ENTITY: &str = "department";

/// Repository for the `departments` table.
#[derive(Clone)]
pub struct DepartmentRepository {
    pub(crate) pool: SqlitePool,
}

impl DepartmentRepository {
    /// Validates and inserts a new department.
    ///
    /// `manager_id` is stored as given; it is not checked against employees.
    pub async fn create(&self, department: NewDepartment) -> Result<Department, RepositoryError> {
        insert(&self.pool, &department).await
    }

    pub async fn create_in(
        &self,
        tx: &mut DbTransaction<'_>,
        department: NewDepartment,
    ) -> Result<Department, RepositoryError> {
        insert(&mut **tx, &department).await
    }

    /// Points the department at another manager inside the caller's transaction.
    pub async fn set_manager_in(
        &self,
        tx: &mut DbTransaction<'_>,
        id: EntityId,
        manager_id: EntityId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE departments SET manager_id = ? WHERE id = ?")
            .bind(manager_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, manager_id, "manager updated");
        Ok(())
    }

    pub async fn list(&self, page: Page) -> Result<Vec<Department>, RepositoryError> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, department_name, manager_id, location_id \
             FROM departments ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(page.limit_value())
        .bind(page.offset_value())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Department::from).collect())
    }

    pub async fn find_by_id(&self, id: EntityId) -> Result<Department, RepositoryError> {
        sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, department_name, manager_id, location_id FROM departments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Department::from)
        .ok_or_else(|| not_found(ENTITY, id))
    }

    pub async fn update_by_id(
        &self,
        id: EntityId,
        patch: DepartmentPatch,
    ) -> Result<Department, RepositoryError> {
        let current = self.find_by_id(id).await?;
        self.replace_by_id(id, patch.apply(&current)).await?;
        self.find_by_id(id).await
    }

    pub async fn replace_by_id(
        &self,
        id: EntityId,
        department: NewDepartment,
    ) -> Result<(), RepositoryError> {
        department.validate()?;
        let result = sqlx::query(
            "UPDATE departments SET department_name = ?, manager_id = ?, location_id = ? \
             WHERE id = ?",
        )
        .bind(&department.department_name)
        .bind(department.manager_id)
        .bind(department.location_id)
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
        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, "deleted");
        Ok(())
    }

    /// Location the department belongs to.
    pub async fn location(&self, id: EntityId) -> Result<Location, RepositoryError> {
        let department = self.find_by_id(id).await?;
        LocationRepository {
            pool: self.pool.clone(),
        }
        .find_by_id(department.location_id)
        .await
    }

    /// Employees of the department; the filter's own `department_id` is overridden.
    pub async fn employees(
        &self,
        id: EntityId,
        filter: &EmployeeFilter,
    ) -> Result<Vec<Employee>, RepositoryError> {
        let scoped = EmployeeFilter {
            department_id: Some(id),
            ..filter.clone()
        };
        EmployeeRepository {
            pool: self.pool.clone(),
        }
        .list(&scoped)
        .await
    }
}

async fn insert<'c, E>(
    executor: E,
    department: &NewDepartment,
) -> Result<Department, RepositoryError>
where
    E: Executor<'c, Database = Sqlite>,
{
    department.validate()?;
    let row = sqlx::query_as::<_, DepartmentRow>(
        "INSERT INTO departments (department_name, manager_id, location_id) \
         VALUES (?, ?, ?) \
         RETURNING id, department_name, manager_id, location_id",
    )
    .bind(&department.department_name)
    .bind(department.manager_id)
    .bind(department.location_id)
    .fetch_one(executor)
    .await?;

    info!(stage = "store", entity = ENTITY, id = row.id, "created");
    Ok(row.into())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DepartmentRow {
    id: i64,
    department_name: String,
    manager_id: i64,
    location_id: i64,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Self {
            id: row.id,
            department_name: row.department_name,
            manager_id: row.manager_id,
            location_id: row.location_id,
        }
    }
}
