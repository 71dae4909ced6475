use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{info, warn};

use employee_mgmt_core::{
    EmployeeNode, Hierarchy, HierarchyError, NameCollisionPolicy, SalaryAverages, SalaryError,
};
use employee_mgmt_storage::{Database, EmployeeFilter, Page, RepositoryError};

/// Loads every department and its employees, then averages salaries per department.
///
/// Issues one department query plus one employee query per department.
pub async fn load_salary_averages(database: &Database) -> Result<SalaryAverages, ReportError> {
    let departments = database.departments().list(Page::default()).await?;
    let employee_repo = database.employees();

    let mut groups = Vec::with_capacity(departments.len());
    for department in &departments {
        let members = employee_repo
            .list(&EmployeeFilter::department(department.id))
            .await?;
        groups.push(members);
    }

    let averages = SalaryAverages::from_groups(
        departments
            .iter()
            .zip(groups.iter().map(Vec::as_slice)),
    );
    info!(
        stage = "report",
        departments = departments.len(),
        employees = groups.iter().map(Vec::len).sum::<usize>(),
        "salary averages computed"
    );
    Ok(averages)
}

/// Department name → mean salary, resolving shared names with `policy`.
pub async fn compute_salary_averages(
    database: &Database,
    policy: NameCollisionPolicy,
) -> Result<BTreeMap<String, f64>, ReportError> {
    let averages = load_salary_averages(database).await?;
    Ok(averages.by_name(policy)?)
}

/// Rebuilds the management forest from the current employee snapshot.
pub async fn build_hierarchy(database: &Database) -> Result<Vec<EmployeeNode>, ReportError> {
    let employees = database
        .employees()
        .list(&EmployeeFilter::default())
        .await?;
    let total = employees.len();

    let hierarchy = Hierarchy::build(employees);
    if !hierarchy.orphans().is_empty() {
        warn!(
            stage = "report",
            orphans = ?hierarchy.orphans(),
            "employees with unresolved managers were left out of the hierarchy"
        );
    }

    let forest = hierarchy.forest()?;
    info!(
        stage = "report",
        employees = total,
        roots = forest.len(),
        "hierarchy built"
    );
    Ok(forest)
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to load entities: {0}")]
    Storage(#[from] RepositoryError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Salary(#[from] SalaryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use employee_mgmt_core::types::{
        EmployeePatch, EntityId, NewDepartment, NewEmployee, NewLocation, NewTitle,
    };
    use tempfile::TempDir;

    async fn setup_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("reports.db").display());
        let database = Database::connect(&url).await.expect("connect");
        database.run_migrations().await.expect("migrations");
        (dir, database)
    }

    struct Seed {
        database: Database,
        location_id: EntityId,
        title_id: EntityId,
    }

    impl Seed {
        async fn new(database: Database) -> Self {
            let location = database
                .locations()
                .create(NewLocation {
                    location_name: "Head Office".to_string(),
                    address: "Büyükdere Caddesi No 1".to_string(),
                    postal_code: "34394".to_string(),
                    city: "Istanbul".to_string(),
                    country: "Turkey".to_string(),
                })
                .await
                .expect("location");
            let title = database
                .titles()
                .create(NewTitle {
                    name: "Engineer".to_string(),
                })
                .await
                .expect("title");
            Self {
                database,
                location_id: location.id,
                title_id: title.id,
            }
        }

        async fn department(&self, name: &str) -> EntityId {
            self.database
                .departments()
                .create(NewDepartment {
                    department_name: name.to_string(),
                    manager_id: 1,
                    location_id: self.location_id,
                })
                .await
                .expect("department")
                .id
        }

        async fn employee(
            &self,
            email: &str,
            department_id: EntityId,
            salary: f64,
            manager_id: Option<EntityId>,
        ) -> EntityId {
            self.database
                .employees()
                .create(NewEmployee {
                    name: "Test".to_string(),
                    surname: "Employee".to_string(),
                    phone: "+1234567890".to_string(),
                    email: email.to_string(),
                    start_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date"),
                    salary,
                    department_id,
                    title_id: self.title_id,
                    manager_id,
                })
                .await
                .expect("employee")
                .id
        }
    }

    #[tokio::test]
    async fn salary_averages_per_department_name() {
        let (_dir, database) = setup_db().await;
        let seed = Seed::new(database.clone()).await;
        let engineering = seed.department("Engineering").await;
        let sales = seed.department("Sales").await;
        seed.department("Support").await;
        seed.employee("a@example.com", engineering, 5000.0, None).await;
        seed.employee("b@example.com", engineering, 7000.0, None).await;
        seed.employee("c@example.com", sales, 3000.0, None).await;

        let averages = compute_salary_averages(&database, NameCollisionPolicy::LastWins)
            .await
            .expect("averages");

        assert_eq!(averages.len(), 3);
        assert_eq!(averages["Engineering"], 6000.0);
        assert_eq!(averages["Sales"], 3000.0);
        assert_eq!(averages["Support"], 0.0);
    }

    #[tokio::test]
    async fn salary_averages_with_shared_names() {
        let (_dir, database) = setup_db().await;
        let seed = Seed::new(database.clone()).await;
        let first = seed.department("Ops").await;
        let second = seed.department("Ops").await;
        seed.employee("a@example.com", first, 1000.0, None).await;
        seed.employee("b@example.com", second, 4000.0, None).await;

        let last_wins = compute_salary_averages(&database, NameCollisionPolicy::LastWins)
            .await
            .expect("averages");
        assert_eq!(last_wins.len(), 1);
        assert_eq!(last_wins["Ops"], 4000.0);

        let rejected = compute_salary_averages(&database, NameCollisionPolicy::Reject)
            .await
            .unwrap_err();
        assert!(matches!(
            rejected,
            ReportError::Salary(SalaryError::DuplicateDepartmentName { .. })
        ));

        let by_id = load_salary_averages(&database).await.expect("averages");
        assert_eq!(by_id.get(first).expect("first").average_salary, 1000.0);
        assert_eq!(by_id.get(second).expect("second").average_salary, 4000.0);
    }

    #[tokio::test]
    async fn hierarchy_nests_subordinates() {
        let (_dir, database) = setup_db().await;
        let seed = Seed::new(database.clone()).await;
        let department = seed.department("Engineering").await;
        let a = seed.employee("a@example.com", department, 1000.0, None).await;
        let b = seed.employee("b@example.com", department, 1000.0, Some(a)).await;
        let c = seed.employee("c@example.com", department, 1000.0, Some(b)).await;

        let forest = build_hierarchy(&database).await.expect("hierarchy");

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].employee.id, a);
        assert_eq!(forest[0].employees.len(), 1);
        assert_eq!(forest[0].employees[0].employee.id, b);
        assert_eq!(forest[0].employees[0].employees[0].employee.id, c);
    }

    #[tokio::test]
    async fn hierarchy_rejects_manager_cycles() {
        let (_dir, database) = setup_db().await;
        let seed = Seed::new(database.clone()).await;
        let department = seed.department("Engineering").await;
        seed.employee("root@example.com", department, 1000.0, None).await;
        let b = seed.employee("b@example.com", department, 1000.0, None).await;
        let c = seed.employee("c@example.com", department, 1000.0, Some(b)).await;
        database
            .employees()
            .update_by_id(
                b,
                EmployeePatch {
                    manager_id: Some(Some(c)),
                    ..EmployeePatch::default()
                },
            )
            .await
            .expect("close the loop");

        let err = build_hierarchy(&database).await.unwrap_err();
        assert!(matches!(
            err,
            ReportError::Hierarchy(HierarchyError::CyclicManagerReference { .. })
        ));
    }
}
