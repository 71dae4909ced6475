use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::validation::{
    alphanumeric_regex, ascii_letters_regex, check_email, check_phone, check_postal_code,
    check_salary, person_name_regex, title_name_regex, TextRule, ValidationError,
};

/// Store-assigned identifier shared by every entity.
pub type EntityId = i64;

/// Physical site that hosts departments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: EntityId,
    pub location_name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

/// Payload used to create or fully replace a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub location_name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

impl NewLocation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        TextRule {
            field: "locationName",
            min: 3,
            max: 100,
            pattern: Some(alphanumeric_regex),
            too_short: "Location name must be at least 3 characters.",
            too_long: "Location name cannot exceed 100 characters.",
            invalid: "Location name can only contain letters, numbers, and spaces.",
        }
        .check(&self.location_name)?;
        TextRule {
            field: "address",
            min: 10,
            max: 200,
            pattern: None,
            too_short: "Address must be at least 10 characters.",
            too_long: "Address cannot exceed 200 characters.",
            invalid: "",
        }
        .check(&self.address)?;
        check_postal_code(&self.postal_code)?;
        TextRule {
            field: "city",
            min: 2,
            max: 50,
            pattern: Some(ascii_letters_regex),
            too_short: "City name must be at least 2 characters.",
            too_long: "City name cannot exceed 50 characters.",
            invalid: "City name can only contain letters and spaces.",
        }
        .check(&self.city)?;
        TextRule {
            field: "country",
            min: 2,
            max: 50,
            pattern: Some(ascii_letters_regex),
            too_short: "Country name must be at least 2 characters.",
            too_long: "Country name cannot exceed 50 characters.",
            invalid: "Country name can only contain letters and spaces.",
        }
        .check(&self.country)
    }
}

/// Partial location update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl LocationPatch {
    /// Merges the patch over the current record.
    pub fn apply(self, current: &Location) -> NewLocation {
        NewLocation {
            location_name: self
                .location_name
                .unwrap_or_else(|| current.location_name.clone()),
            address: self.address.unwrap_or_else(|| current.address.clone()),
            postal_code: self
                .postal_code
                .unwrap_or_else(|| current.postal_code.clone()),
            city: self.city.unwrap_or_else(|| current.city.clone()),
            country: self.country.unwrap_or_else(|| current.country.clone()),
        }
    }
}

/// Job title an employee can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTitle {
    pub name: String,
}

impl NewTitle {
    pub fn validate(&self) -> Result<(), ValidationError> {
        TextRule {
            field: "name",
            min: 3,
            max: 50,
            pattern: Some(title_name_regex),
            too_short: "Title must be at least 3 characters long.",
            too_long: "Title cannot exceed 50 characters.",
            invalid: "Title can only contain letters, numbers, and spaces.",
        }
        .check(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitlePatch {
    #[serde(default)]
    pub name: Option<String>,
}

impl TitlePatch {
    pub fn apply(self, current: &Title) -> NewTitle {
        NewTitle {
            name: self.name.unwrap_or_else(|| current.name.clone()),
        }
    }
}

/// Organisational unit; `manager_id` names an employee but is not a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: EntityId,
    pub department_name: String,
    pub manager_id: EntityId,
    pub location_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    pub department_name: String,
    pub manager_id: EntityId,
    pub location_id: EntityId,
}

impl NewDepartment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        TextRule {
            field: "departmentName",
            min: 3,
            max: 100,
            pattern: Some(person_name_regex),
            too_short: "Department name must be at least 3 characters long.",
            too_long: "Department name cannot exceed 100 characters.",
            invalid: "Department name can only contain letters and spaces.",
        }
        .check(&self.department_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPatch {
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub manager_id: Option<EntityId>,
    #[serde(default)]
    pub location_id: Option<EntityId>,
}

impl DepartmentPatch {
    pub fn apply(self, current: &Department) -> NewDepartment {
        NewDepartment {
            department_name: self
                .department_name
                .unwrap_or_else(|| current.department_name.clone()),
            manager_id: self.manager_id.unwrap_or(current.manager_id),
            location_id: self.location_id.unwrap_or(current.location_id),
        }
    }
}

/// Employee record as persisted. Subordinates are derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EntityId,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub email: String,
    pub start_date: NaiveDate,
    pub salary: f64,
    pub department_id: EntityId,
    pub title_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub email: String,
    pub start_date: NaiveDate,
    pub salary: f64,
    pub department_id: EntityId,
    pub title_id: EntityId,
    #[serde(default)]
    pub manager_id: Option<EntityId>,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<(), ValidationError> {
        TextRule {
            field: "name",
            min: 2,
            max: 50,
            pattern: Some(person_name_regex),
            too_short: "Name must be at least 2 characters long.",
            too_long: "Name cannot exceed 50 characters.",
            invalid: "Name can only contain letters and spaces.",
        }
        .check(&self.name)?;
        TextRule {
            field: "surname",
            min: 2,
            max: 50,
            pattern: Some(person_name_regex),
            too_short: "Surname must be at least 2 characters long.",
            too_long: "Surname cannot exceed 50 characters.",
            invalid: "Surname can only contain letters and spaces.",
        }
        .check(&self.surname)?;
        check_phone(&self.phone)?;
        check_email(&self.email)?;
        check_salary(self.salary)
    }
}

/// Partial employee update.
///
/// `manager_id` distinguishes an absent field (`None`) from an explicit
/// `null` (`Some(None)`) which clears the manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub salary: Option<f64>,
    #[serde(default)]
    pub department_id: Option<EntityId>,
    #[serde(default)]
    pub title_id: Option<EntityId>,
    #[serde(default, deserialize_with = "present")]
    pub manager_id: Option<Option<EntityId>>,
}

impl EmployeePatch {
    pub fn apply(self, current: &Employee) -> NewEmployee {
        NewEmployee {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            surname: self.surname.unwrap_or_else(|| current.surname.clone()),
            phone: self.phone.unwrap_or_else(|| current.phone.clone()),
            email: self.email.unwrap_or_else(|| current.email.clone()),
            start_date: self.start_date.unwrap_or(current.start_date),
            salary: self.salary.unwrap_or(current.salary),
            department_id: self.department_id.unwrap_or(current.department_id),
            title_id: self.title_id.unwrap_or(current.title_id),
            manager_id: self.manager_id.unwrap_or(current.manager_id),
        }
    }
}

/// Period during which an employee held a title in a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleHistory {
    pub id: EntityId,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub employee_id: EntityId,
    pub title_id: EntityId,
    pub department_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTitleHistory {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub employee_id: EntityId,
    pub title_id: EntityId,
    pub department_id: EntityId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleHistoryPatch {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "present")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub employee_id: Option<EntityId>,
    #[serde(default)]
    pub title_id: Option<EntityId>,
    #[serde(default)]
    pub department_id: Option<EntityId>,
}

impl TitleHistoryPatch {
    pub fn apply(self, current: &TitleHistory) -> NewTitleHistory {
        NewTitleHistory {
            start_date: self.start_date.unwrap_or(current.start_date),
            end_date: self.end_date.unwrap_or(current.end_date),
            employee_id: self.employee_id.unwrap_or(current.employee_id),
            title_id: self.title_id.unwrap_or(current.title_id),
            department_id: self.department_id.unwrap_or(current.department_id),
        }
    }
}

/// Employee together with its title history, as returned by the
/// "with title history" lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeWithTitleHistories {
    #[serde(flatten)]
    pub employee: Employee,
    pub title_histories: Vec<TitleHistory>,
}

/// Marks a field as present so that an explicit `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
