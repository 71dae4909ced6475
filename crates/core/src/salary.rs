use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::types::{Department, Employee, EntityId};

/// Mean salary computed for one department.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentAverage {
    pub department_id: EntityId,
    pub department_name: String,
    pub employee_count: usize,
    pub average_salary: f64,
}

/// How the name-keyed view resolves departments that share a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameCollisionPolicy {
    /// The department processed last overwrites earlier ones.
    #[default]
    LastWins,
    /// Duplicate names are reported as an error.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SalaryError {
    #[error("departments {first} and {second} share the name {name:?}")]
    DuplicateDepartmentName {
        name: String,
        first: EntityId,
        second: EntityId,
    },
}

/// Salary averages keyed by department id, in department order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalaryAverages {
    entries: Vec<DepartmentAverage>,
}

impl SalaryAverages {
    /// Groups `employees` by department id and averages each department.
    ///
    /// Employees that reference an unknown department are not counted anywhere.
    pub fn compute(departments: &[Department], employees: &[Employee]) -> Self {
        let mut by_department: HashMap<EntityId, Vec<&Employee>> = HashMap::new();
        for employee in employees {
            by_department
                .entry(employee.department_id)
                .or_default()
                .push(employee);
        }

        let entries = departments
            .iter()
            .map(|department| {
                let members = by_department
                    .get(&department.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                average_for(department, members.iter().copied())
            })
            .collect();

        Self { entries }
    }

    /// Averages pre-grouped employees, one group per department.
    ///
    /// Members are filtered by `department_id` so a loosely filtered group
    /// cannot leak salaries into the wrong department.
    pub fn from_groups<'a, I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (&'a Department, &'a [Employee])>,
    {
        let entries = groups
            .into_iter()
            .map(|(department, members)| {
                average_for(
                    department,
                    members
                        .iter()
                        .filter(|employee| employee.department_id == department.id),
                )
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[DepartmentAverage] {
        &self.entries
    }

    pub fn get(&self, department_id: EntityId) -> Option<&DepartmentAverage> {
        self.entries
            .iter()
            .find(|entry| entry.department_id == department_id)
    }

    /// Produces the department name → average view.
    pub fn by_name(
        &self,
        policy: NameCollisionPolicy,
    ) -> Result<BTreeMap<String, f64>, SalaryError> {
        let mut owners: HashMap<&str, EntityId> = HashMap::new();
        let mut averages = BTreeMap::new();

        for entry in &self.entries {
            let name = entry.department_name.as_str();
            if let Some(previous) = owners.insert(name, entry.department_id) {
                match policy {
                    NameCollisionPolicy::Reject => {
                        return Err(SalaryError::DuplicateDepartmentName {
                            name: name.to_string(),
                            first: previous,
                            second: entry.department_id,
                        });
                    }
                    NameCollisionPolicy::LastWins => {
                        warn!(
                            stage = "salary",
                            department = name,
                            overwritten = previous,
                            kept = entry.department_id,
                            "duplicate department name; later average overwrites earlier"
                        );
                    }
                }
            }
            averages.insert(name.to_string(), entry.average_salary);
        }

        Ok(averages)
    }
}

/// Returns the group size and the arithmetic mean of its salaries.
/// An empty group averages to exactly `0`.
pub fn mean_salary<'a, I>(employees: I) -> (usize, f64)
where
    I: IntoIterator<Item = &'a Employee>,
{
    let (count, total) = employees
        .into_iter()
        .fold((0usize, 0.0f64), |(count, total), employee| {
            (count + 1, total + employee.salary)
        });

    if count == 0 {
        (0, 0.0)
    } else {
        (count, total / count as f64)
    }
}

fn average_for<'a, I>(department: &Department, members: I) -> DepartmentAverage
where
    I: IntoIterator<Item = &'a Employee>,
{
    let (employee_count, average_salary) = mean_salary(members);
    DepartmentAverage {
        department_id: department.id,
        department_name: department.department_name.clone(),
        employee_count,
        average_salary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn department(id: EntityId, name: &str) -> Department {
        Department {
            id,
            department_name: name.to_string(),
            manager_id: 1,
            location_id: 1,
        }
    }

    fn employee(id: EntityId, department_id: EntityId, salary: f64) -> Employee {
        Employee {
            id,
            name: "Test".to_string(),
            surname: "Employee".to_string(),
            phone: "+1234567890".to_string(),
            email: format!("employee{id}@example.com"),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date"),
            salary,
            department_id,
            title_id: 1,
            manager_id: None,
        }
    }

    #[test]
    fn averages_each_department_by_name() {
        let departments = vec![department(1, "Engineering"), department(2, "Sales")];
        let employees = vec![
            employee(1, 1, 5000.0),
            employee(2, 2, 3000.0),
            employee(3, 1, 7000.0),
        ];

        let averages = SalaryAverages::compute(&departments, &employees)
            .by_name(NameCollisionPolicy::LastWins)
            .expect("no collisions");

        assert_eq!(averages.len(), 2);
        assert_eq!(averages["Engineering"], 6000.0);
        assert_eq!(averages["Sales"], 3000.0);
    }

    #[test]
    fn empty_department_averages_to_exactly_zero() {
        let departments = vec![department(1, "Empty")];
        let averages = SalaryAverages::compute(&departments, &[]);

        let entry = averages.get(1).expect("department present");
        assert_eq!(entry.employee_count, 0);
        assert_eq!(entry.average_salary, 0.0);
        assert!(!entry.average_salary.is_nan());
    }

    #[test]
    fn average_matches_sum_over_count() {
        let salaries = [1234.5, 9876.25, 0.0, 42.0, 100_000.0];
        let employees: Vec<_> = salaries
            .iter()
            .enumerate()
            .map(|(index, salary)| employee(index as EntityId + 1, 9, *salary))
            .collect();
        let departments = vec![department(9, "Research")];

        let averages = SalaryAverages::compute(&departments, &employees);
        let expected = salaries.iter().sum::<f64>() / salaries.len() as f64;
        let actual = averages.get(9).expect("department present").average_salary;
        assert!((actual - expected).abs() < 1e-9);
    }

    #[test]
    fn duplicate_names_keep_the_later_department() {
        let departments = vec![department(1, "Ops"), department(2, "Ops")];
        let employees = vec![employee(1, 1, 1000.0), employee(2, 2, 4000.0)];

        let averages = SalaryAverages::compute(&departments, &employees);
        assert_eq!(averages.get(1).expect("first").average_salary, 1000.0);
        assert_eq!(averages.get(2).expect("second").average_salary, 4000.0);

        let by_name = averages
            .by_name(NameCollisionPolicy::LastWins)
            .expect("last wins never fails");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name["Ops"], 4000.0);
    }

    #[test]
    fn duplicate_names_are_rejected_on_request() {
        let departments = vec![department(1, "Ops"), department(2, "Ops")];
        let err = SalaryAverages::compute(&departments, &[])
            .by_name(NameCollisionPolicy::Reject)
            .unwrap_err();

        assert_eq!(
            err,
            SalaryError::DuplicateDepartmentName {
                name: "Ops".to_string(),
                first: 1,
                second: 2,
            }
        );
    }

    #[test]
    fn grouped_input_ignores_members_of_other_departments() {
        let engineering = department(1, "Engineering");
        let sales = department(2, "Sales");
        let engineering_staff = vec![employee(1, 1, 5000.0), employee(2, 1, 7000.0)];
        let mixed = vec![employee(3, 2, 3000.0), employee(4, 1, 9999.0)];

        let averages = SalaryAverages::from_groups([
            (&engineering, engineering_staff.as_slice()),
            (&sales, mixed.as_slice()),
        ]);

        assert_eq!(averages.get(1).expect("engineering").average_salary, 6000.0);
        let sales_entry = averages.get(2).expect("sales");
        assert_eq!(sales_entry.employee_count, 1);
        assert_eq!(sales_entry.average_salary, 3000.0);
    }

    #[test]
    fn employees_of_unknown_departments_are_ignored() {
        let departments = vec![department(1, "Engineering")];
        let employees = vec![employee(1, 1, 5000.0), employee(2, 42, 1_000_000.0)];

        let averages = SalaryAverages::compute(&departments, &employees);
        assert_eq!(averages.entries().len(), 1);
        assert_eq!(averages.get(1).expect("engineering").average_salary, 5000.0);
    }
}
