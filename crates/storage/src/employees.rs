use chrono::NaiveDate;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

use employee_mgmt_core::types::{
    Department, Employee, EmployeePatch, EmployeeWithTitleHistories, EntityId, NewEmployee, Title,
    TitleHistory,
};

use crate::{
    departments::DepartmentRepository,
    not_found,
    title_histories::{TitleHistoryFilter, TitleHistoryRepository},
    titles::TitleRepository,
    DbTransaction, Page, RepositoryError,
};

const ENTITY: &str = "employee";

const EMPLOYEE_COLUMNS: &str = "id, name, surname, phone, email, start_date, salary, \
                                department_id, title_id, manager_id";

/// Filter accepted by [`EmployeeRepository::list`]; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    pub department_id: Option<EntityId>,
    pub title_id: Option<EntityId>,
    pub manager_id: Option<EntityId>,
    pub page: Page,
}

impl EmployeeFilter {
    pub fn department(department_id: EntityId) -> Self {
        Self {
            department_id: Some(department_id),
            ..Self::default()
        }
    }
}

/// Repository for the `employees` table.
#[derive(Clone)]
pub struct EmployeeRepository {
    pub(crate) pool: SqlitePool,
}

impl EmployeeRepository {
    /// Validates and inserts a new employee.
    ///
    /// Fails with [`RepositoryError::DuplicateEmail`] when the address is taken
    /// and [`RepositoryError::ForeignKey`] when a referenced record is missing.
    pub async fn create(&self, employee: NewEmployee) -> Result<Employee, RepositoryError> {
        insert(&self.pool, &employee).await
    }

    pub async fn create_in(
        &self,
        tx: &mut DbTransaction<'_>,
        employee: NewEmployee,
    ) -> Result<Employee, RepositoryError> {
        insert(&mut **tx, &employee).await
    }

    /// Sets or clears the manager inside the caller's transaction.
    pub async fn set_manager_in(
        &self,
        tx: &mut DbTransaction<'_>,
        id: EntityId,
        manager_id: Option<EntityId>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE employees SET manager_id = ? WHERE id = ?")
            .bind(manager_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, ?manager_id, "manager updated");
        Ok(())
    }

    /// Lists employees matching `filter`, ordered by id.
    pub async fn list(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees \
             WHERE (?1 IS NULL OR department_id = ?1) \
               AND (?2 IS NULL OR title_id = ?2) \
               AND (?3 IS NULL OR manager_id = ?3) \
             ORDER BY id LIMIT ?4 OFFSET ?5"
        ))
        .bind(filter.department_id)
        .bind(filter.title_id)
        .bind(filter.manager_id)
        .bind(filter.page.limit_value())
        .bind(filter.page.offset_value())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Employee::from).collect())
    }

    pub async fn find_by_id(&self, id: EntityId) -> Result<Employee, RepositoryError> {
        sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Employee::from)
        .ok_or_else(|| not_found(ENTITY, id))
    }

    pub async fn update_by_id(
        &self,
        id: EntityId,
        patch: EmployeePatch,
    ) -> Result<Employee, RepositoryError> {
        let current = self.find_by_id(id).await?;
        self.replace_by_id(id, patch.apply(&current)).await?;
        self.find_by_id(id).await
    }

    pub async fn replace_by_id(
        &self,
        id: EntityId,
        employee: NewEmployee,
    ) -> Result<(), RepositoryError> {
        employee.validate()?;
        let result = sqlx::query(
            "UPDATE employees \
             SET name = ?, surname = ?, phone = ?, email = ?, start_date = ?, salary = ?, \
                 department_id = ?, title_id = ?, manager_id = ? \
             WHERE id = ?",
        )
        .bind(&employee.name)
        .bind(&employee.surname)
        .bind(&employee.phone)
        .bind(&employee.email)
        .bind(employee.start_date)
        .bind(employee.salary)
        .bind(employee.department_id)
        .bind(employee.title_id)
        .bind(employee.manager_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, "updated");
        Ok(())
    }

    /// Deletes the employee. Subordinates lose their manager and the
    /// employee's title history is removed with it.
    pub async fn delete_by_id(&self, id: EntityId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, "deleted");
        Ok(())
    }

    pub async fn department(&self, id: EntityId) -> Result<Department, RepositoryError> {
        let employee = self.find_by_id(id).await?;
        DepartmentRepository {
            pool: self.pool.clone(),
        }
        .find_by_id(employee.department_id)
        .await
    }

    pub async fn title(&self, id: EntityId) -> Result<Title, RepositoryError> {
        let employee = self.find_by_id(id).await?;
        TitleRepository {
            pool: self.pool.clone(),
        }
        .find_by_id(employee.title_id)
        .await
    }

    /// Manager of the employee, `None` for top-level employees.
    pub async fn manager(&self, id: EntityId) -> Result<Option<Employee>, RepositoryError> {
        let employee = self.find_by_id(id).await?;
        match employee.manager_id {
            Some(manager_id) => self.find_by_id(manager_id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Direct subordinates of the employee.
    pub async fn subordinates(
        &self,
        id: EntityId,
        page: Page,
    ) -> Result<Vec<Employee>, RepositoryError> {
        self.list(&EmployeeFilter {
            manager_id: Some(id),
            page,
            ..EmployeeFilter::default()
        })
        .await
    }

    pub async fn title_histories(
        &self,
        id: EntityId,
        page: Page,
    ) -> Result<Vec<TitleHistory>, RepositoryError> {
        TitleHistoryRepository {
            pool: self.pool.clone(),
        }
        .list(&TitleHistoryFilter {
            employee_id: Some(id),
            page,
            ..TitleHistoryFilter::default()
        })
        .await
    }

    /// Loads the employee with its full title history embedded.
    pub async fn find_with_title_histories(
        &self,
        id: EntityId,
    ) -> Result<EmployeeWithTitleHistories, RepositoryError> {
        let employee = self.find_by_id(id).await?;
        let title_histories = self.title_histories(id, Page::default()).await?;
        Ok(EmployeeWithTitleHistories {
            employee,
            title_histories,
        })
    }
}

async fn insert<'c, E>(executor: E, employee: &NewEmployee) -> Result<Employee, RepositoryError>
where
    E: Executor<'c, Database = Sqlite>,
{
    employee.validate()?;
    let row = sqlx::query_as::<_, EmployeeRow>(&format!(
        "INSERT INTO employees \
         (name, surname, phone, email, start_date, salary, department_id, title_id, manager_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {EMPLOYEE_COLUMNS}"
    ))
    .bind(&employee.name)
    .bind(&employee.surname)
    .bind(&employee.phone)
    .bind(&employee.email)
    .bind(employee.start_date)
    .bind(employee.salary)
    .bind(employee.department_id)
    .bind(employee.title_id)
    .bind(employee.manager_id)
    .fetch_one(executor)
    .await?;

    info!(stage = "store", entity = ENTITY, id = row.id, "created");
    Ok(row.into())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EmployeeRow {
    id: i64,
    name: String,
    surname: String,
    phone: String,
    email: String,
    start_date: NaiveDate,
    salary: f64,
    department_id: i64,
    title_id: i64,
    manager_id: Option<i64>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            surname: row.surname,
            phone: row.phone,
            email: row.email,
            start_date: row.start_date,
            salary: row.salary,
            department_id: row.department_id,
            title_id: row.title_id,
            manager_id: row.manager_id,
        }
    }
}
