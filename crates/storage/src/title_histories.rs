use chrono::NaiveDate;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

use employee_mgmt_core::types::{EntityId, NewTitleHistory, TitleHistory, TitleHistoryPatch};

use crate::{not_found, DbTransaction, Page, RepositoryError};

const ENTITY: &str = "title history";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleHistoryFilter {
    pub employee_id: Option<EntityId>,
    pub title_id: Option<EntityId>,
    pub page: Page,
}

/// Repository for the `title_histories` table.
#[derive(Clone)]
pub struct TitleHistoryRepository {
    pub(crate) pool: SqlitePool,
}

impl TitleHistoryRepository {
    pub async fn create(&self, history: NewTitleHistory) -> Result<TitleHistory, RepositoryError> {
        insert(&self.pool, &history).await
    }

    pub async fn create_in(
        &self,
        tx: &mut DbTransaction<'_>,
        history: NewTitleHistory,
    ) -> Result<TitleHistory, RepositoryError> {
        insert(&mut **tx, &history).await
    }

    /// Lists title histories ordered by start date, then id.
    pub async fn list(
        &self,
        filter: &TitleHistoryFilter,
    ) -> Result<Vec<TitleHistory>, RepositoryError> {
        let rows = sqlx::query_as::<_, TitleHistoryRow>(
            "SELECT id, start_date, end_date, employee_id, title_id, department_id \
             FROM title_histories \
             WHERE (?1 IS NULL OR employee_id = ?1) \
               AND (?2 IS NULL OR title_id = ?2) \
             ORDER BY start_date, id LIMIT ?3 OFFSET ?4",
        )
        .bind(filter.employee_id)
        .bind(filter.title_id)
        .bind(filter.page.limit_value())
        .bind(filter.page.offset_value())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TitleHistory::from).collect())
    }

    pub async fn find_by_id(&self, id: EntityId) -> Result<TitleHistory, RepositoryError> {
        sqlx::query_as::<_, TitleHistoryRow>(
            "SELECT id, start_date, end_date, employee_id, title_id, department_id \
             FROM title_histories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(TitleHistory::from)
        .ok_or_else(|| not_found(ENTITY, id))
    }

    pub async fn update_by_id(
        &self,
        id: EntityId,
        patch: TitleHistoryPatch,
    ) -> Result<TitleHistory, RepositoryError> {
        let current = self.find_by_id(id).await?;
        self.replace_by_id(id, patch.apply(&current)).await?;
        self.find_by_id(id).await
    }

    pub async fn replace_by_id(
        &self,
        id: EntityId,
        history: NewTitleHistory,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE title_histories \
             SET start_date = ?, end_date = ?, employee_id = ?, title_id = ?, department_id = ? \
             WHERE id = ?",
        )
        .bind(history.start_date)
        .bind(history.end_date)
        .bind(history.employee_id)
        .bind(history.title_id)
        .bind(history.department_id)
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
        let result = sqlx::query("DELETE FROM title_histories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }
        info!(stage = "store", entity = ENTITY, id, "deleted");
        Ok(())
    }
}

async fn insert<'c, E>(
    executor: E,
    history: &NewTitleHistory,
) -> Result<TitleHistory, RepositoryError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, TitleHistoryRow>(
        "INSERT INTO title_histories (start_date, end_date, employee_id, title_id, department_id) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id, start_date, end_date, employee_id, title_id, department_id",
    )
    .bind(history.start_date)
    .bind(history.end_date)
    .bind(history.employee_id)
    .bind(history.title_id)
    .bind(history.department_id)
    .fetch_one(executor)
    .await?;

    info!(stage = "store", entity = ENTITY, id = row.id, "created");
    Ok(row.into())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TitleHistoryRow {
    id: i64,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    employee_id: i64,
    title_id: i64,
    department_id: i64,
}

impl From<TitleHistoryRow> for TitleHistory {
    fn from(row: TitleHistoryRow) -> Self {
        Self {
            id: row.id,
            start_date: row.start_date,
            end_date: row.end_date,
            employee_id: row.employee_id,
            title_id: row.title_id,
            department_id: row.department_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_department, seed_employee, seed_location, seed_title, setup_db};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[tokio::test]
    async fn employee_history_is_ordered_and_embedded() {
        let (_dir, db) = setup_db().await;
        let location = seed_location(&db).await;
        let department = seed_department(&db, "Engineering", location.id).await;
        let junior = seed_title(&db, "Junior Engineer").await;
        let senior = seed_title(&db, "Senior Engineer").await;
        let employee = seed_employee(&db, "a@example.com", department.id, senior.id, None).await;

        let repo = db.title_histories();
        repo.create(NewTitleHistory {
            start_date: date(2023, 1, 1),
            end_date: None,
            employee_id: employee.id,
            title_id: senior.id,
            department_id: department.id,
        })
        .await
        .expect("create");
        repo.create(NewTitleHistory {
            start_date: date(2021, 1, 1),
            end_date: Some(date(2022, 12, 31)),
            employee_id: employee.id,
            title_id: junior.id,
            department_id: department.id,
        })
        .await
        .expect("create");

        let loaded = db
            .employees()
            .find_with_title_histories(employee.id)
            .await
            .expect("with histories");
        assert_eq!(loaded.employee, employee);
        let titles: Vec<_> = loaded.title_histories.iter().map(|h| h.title_id).collect();
        assert_eq!(titles, vec![junior.id, senior.id]);

        let by_title = db
            .titles()
            .title_histories(junior.id, Page::default())
            .await
            .expect("by title");
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].end_date, Some(date(2022, 12, 31)));
    }

    #[tokio::test]
    async fn history_requires_existing_employee() {
        let (_dir, db) = setup_db().await;
        let location = seed_location(&db).await;
        let department = seed_department(&db, "Engineering", location.id).await;
        let title = seed_title(&db, "Engineer").await;

        let err = db
            .title_histories()
            .create(NewTitleHistory {
                start_date: date(2023, 1, 1),
                end_date: None,
                employee_id: 404,
                title_id: title.id,
                department_id: department.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKey));
    }

    #[tokio::test]
    async fn patch_closes_an_open_period() {
        let (_dir, db) = setup_db().await;
        let location = seed_location(&db).await;
        let department = seed_department(&db, "Engineering", location.id).await;
        let title = seed_title(&db, "Engineer").await;
        let employee = seed_employee(&db, "a@example.com", department.id, title.id, None).await;
        let history = db
            .title_histories()
            .create(NewTitleHistory {
                start_date: date(2023, 1, 1),
                end_date: None,
                employee_id: employee.id,
                title_id: title.id,
                department_id: department.id,
            })
            .await
            .expect("create");

        let closed = db
            .title_histories()
            .update_by_id(
                history.id,
                TitleHistoryPatch {
                    end_date: Some(Some(date(2024, 6, 30))),
                    ..TitleHistoryPatch::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(closed.end_date, Some(date(2024, 6, 30)));
        assert_eq!(closed.start_date, history.start_date);

        db.title_histories()
            .delete_by_id(history.id)
            .await
            .expect("delete");
        assert!(db
            .title_histories()
            .find_by_id(history.id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
