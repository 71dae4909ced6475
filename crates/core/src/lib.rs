//! Domain types and the in-memory aggregations computed over store snapshots.

pub mod hierarchy;
pub mod salary;
pub mod types;
pub mod validation;

pub use hierarchy::{EmployeeNode, Hierarchy, HierarchyError};
pub use salary::{DepartmentAverage, NameCollisionPolicy, SalaryAverages, SalaryError};
pub use validation::ValidationError;
