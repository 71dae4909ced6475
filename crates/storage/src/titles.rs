use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

use employee_mgmt_core::types::{Employee, EntityId, NewTitle, Title, TitleHistory, TitlePatch};

use crate::{
    employees::{EmployeeFilter, EmployeeRepository},
    not_found,
    title_histories::{TitleHistoryFilter, TitleHistoryRepository},
    DbTransaction, Page, RepositoryError,
};

const ENTITY: &str = "title";

/// Repository for the `titles` table.
#[derive(Clone)]
pub struct TitleRepository {
    pub(crate) pool: SqlitePool,
}

impl TitleRepository {
    pub async fn create(&self, title: NewTitle) -> Result<Title, RepositoryError> {
        insert(&self.pool, &title).await
    }

    pub async fn create_in(
        &self,
        tx: &mut DbTransaction<'_>,
        title: NewTitle,
    ) -> Result<Title, RepositoryError> {
        insert(&mut **tx, &title).await
    }

    pub async fn list(&self, page: Page) -> Result<Vec<Title>, RepositoryError> {
        let rows = sqlx::query_as::<_, TitleRow>(
            "SELECT id, name FROM titles ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(page.limit_value())
        .bind(page.offset_value())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Title::from).collect())
    }

    pub async fn find_by_id(&self, id: EntityId) -> Result<Title, RepositoryError> {
        sqlx::query_as::<_, TitleRow>("SELECT id, name FROM titles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Title::from)
            .ok_or_else(|| not_found(ENTITY, id))
    }

    pub async fn update_by_id(
        &self,
        id: EntityId,
        patch: TitlePatch,
    ) -> Result<Title, RepositoryError> {
        let current = self.find_by_id(id).await?;
        self.replace_by_id(id, patch.apply(&current)).await?;
        self.find_by_id(id).await
    }

    pub async fn replace_by_id(&self, id: EntityId, title: NewTitle) -> Result<(), RepositoryError> {
        title.validate()?;
        let result = sqlx::query("UPDATE titles SET name = ? WHERE id = ?")
            .bind(&title.name)
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
        let result = sqlx::query("DELETE FROM titles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, "deleted");
        Ok(())
    }

    /// Employees currently holding the title.
    pub async fn employees(
        &self,
        id: EntityId,
        page: Page,
    ) -> Result<Vec<Employee>, RepositoryError> {
        EmployeeRepository {
            pool: self.pool.clone(),
        }
        .list(&EmployeeFilter {
            title_id: Some(id),
            page,
            ..EmployeeFilter::default()
        })
        .await
    }

    /// Title history records referencing the title.
    pub async fn title_histories(
        &self,
        id: EntityId,
        page: Page,
    ) -> Result<Vec<TitleHistory>, RepositoryError> {
        TitleHistoryRepository {
            pool: self.pool.clone(),
        }
        .list(&TitleHistoryFilter {
            title_id: Some(id),
            page,
            ..TitleHistoryFilter::default()
        })
        .await
    }
}

async fn insert<'c, E>(executor: E, title: &NewTitle) -> Result<Title, RepositoryError>
where
    E: Executor<'c, Database = Sqlite>,
{
    title.validate()?;
    let row =
        sqlx::query_as::<_, TitleRow>("INSERT INTO titles (name) VALUES (?) RETURNING id, name")
            .bind(&title.name)
            .fetch_one(executor)
            .await?;

    info!(stage = "store", entity = ENTITY, id = row.id, "created");
    Ok(row.into())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TitleRow {
    id: i64,
    name: String,
}

impl From<TitleRow> for Title {
    fn from(row: TitleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_department, seed_employee, seed_location, seed_title, setup_db};

    #[tokio::test]
    async fn create_and_rename_title() {
        let (_dir, db) = setup_db().await;
        let title = seed_title(&db, "Engineer").await;

        let renamed = db
            .titles()
            .update_by_id(
                title.id,
                TitlePatch {
                    name: Some("Senior Engineer".to_string()),
                },
            )
            .await
            .expect("update");
        assert_eq!(renamed.name, "Senior Engineer");
        assert_eq!(renamed.id, title.id);
    }

    #[tokio::test]
    async fn create_rejects_short_title() {
        let (_dir, db) = setup_db().await;
        let err = db
            .titles()
            .create(NewTitle {
                name: "QA".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[tokio::test]
    async fn employees_lists_title_holders() {
        let (_dir, db) = setup_db().await;
        let location = seed_location(&db).await;
        let department = seed_department(&db, "Engineering", location.id).await;
        let engineer = seed_title(&db, "Engineer").await;
        let manager = seed_title(&db, "Manager").await;
        seed_employee(&db, "a@example.com", department.id, engineer.id, None).await;
        seed_employee(&db, "b@example.com", department.id, manager.id, None).await;
        seed_employee(&db, "c@example.com", department.id, engineer.id, None).await;

        let holders = db
            .titles()
            .employees(engineer.id, Page::default())
            .await
            .expect("employees");
        let emails: Vec<_> = holders.iter().map(|e| e.email.as_str()).collect();
        assert_eq!(emails, vec!["a@example.com", "c@example.com"]);
    }
}
