use std::{
    collections::{HashMap, HashSet},
    io,
    path::Path,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use employee_mgmt_core::{
    types::{EntityId, NewDepartment, NewEmployee, NewLocation, NewTitle, NewTitleHistory},
    ValidationError,
};
use employee_mgmt_storage::{Database, RepositoryError};

/// Seed document accepted by `import`.
///
/// Every record carries a file-local `id`; references between records use
/// those ids and are translated to store-assigned ids on the way in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportDocument {
    pub locations: Vec<Keyed<NewLocation>>,
    pub titles: Vec<Keyed<NewTitle>>,
    pub departments: Vec<Keyed<NewDepartment>>,
    pub employees: Vec<Keyed<NewEmployee>>,
    pub title_histories: Vec<Keyed<NewTitleHistory>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Keyed<T> {
    pub id: EntityId,
    #[serde(flatten)]
    pub record: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub locations: usize,
    pub titles: usize,
    pub departments: usize,
    pub employees: usize,
    pub title_histories: usize,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read import file: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse import file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{entity} {id} is referenced but not defined in the import file")]
    UnknownReference { entity: &'static str, id: EntityId },
    #[error("{entity} {id} is defined more than once in the import file")]
    DuplicateKey { entity: &'static str, id: EntityId },
    #[error("invalid record in import file: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Reads and imports the document at `path`.
pub async fn import_file(database: &Database, path: &Path) -> Result<ImportSummary, ImportError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let document: ImportDocument = serde_json::from_str(&raw)?;
    info!(stage = "import", path = %path.display(), "import file parsed");
    import_document(database, document).await
}

/// Creates every record of `document`, parents before children, in one
/// transaction.
///
/// References and field rules are checked before anything is written. Any
/// later store failure (duplicate email, for instance) rolls the whole
/// import back.
pub async fn import_document(
    database: &Database,
    document: ImportDocument,
) -> Result<ImportSummary, ImportError> {
    check_document(&document)?;

    let mut tx = database.begin().await?;

    let location_repo = database.locations();
    let mut locations = HashMap::new();
    for Keyed { id, record } in document.locations {
        let created = location_repo.create_in(&mut tx, record).await?;
        locations.insert(id, created.id);
    }

    let title_repo = database.titles();
    let mut titles = HashMap::new();
    for Keyed { id, record } in document.titles {
        let created = title_repo.create_in(&mut tx, record).await?;
        titles.insert(id, created.id);
    }

    // Department managers are employees, which do not exist yet. The
    // file-local id stays as a placeholder until employees are in.
    let department_repo = database.departments();
    let mut departments = HashMap::new();
    let mut department_managers = Vec::new();
    for Keyed { id, record } in document.departments {
        let manager = record.manager_id;
        let location_id = remap(&locations, "location", record.location_id)?;
        let created = department_repo
            .create_in(
                &mut tx,
                NewDepartment {
                    location_id,
                    ..record
                },
            )
            .await?;
        departments.insert(id, created.id);
        department_managers.push((created.id, manager));
    }

    let employee_repo = database.employees();
    let mut employees = HashMap::new();
    let mut employee_managers = Vec::new();
    for Keyed { id, record } in document.employees {
        let manager = record.manager_id;
        let department_id = remap(&departments, "department", record.department_id)?;
        let title_id = remap(&titles, "title", record.title_id)?;
        let created = employee_repo
            .create_in(
                &mut tx,
                NewEmployee {
                    department_id,
                    title_id,
                    manager_id: None,
                    ..record
                },
            )
            .await?;
        employees.insert(id, created.id);
        if let Some(manager) = manager {
            employee_managers.push((created.id, manager));
        }
    }

    for (employee_id, manager) in employee_managers {
        let manager_id = remap(&employees, "employee", manager)?;
        employee_repo
            .set_manager_in(&mut tx, employee_id, Some(manager_id))
            .await?;
        debug!(stage = "import", employee_id, manager_id, "manager linked");
    }

    for (department_id, manager) in department_managers {
        let manager_id = remap(&employees, "employee", manager)?;
        department_repo
            .set_manager_in(&mut tx, department_id, manager_id)
            .await?;
    }

    let history_repo = database.title_histories();
    let mut title_histories = 0;
    for Keyed { record, .. } in document.title_histories {
        let employee_id = remap(&employees, "employee", record.employee_id)?;
        let title_id = remap(&titles, "title", record.title_id)?;
        let department_id = remap(&departments, "department", record.department_id)?;
        history_repo
            .create_in(
                &mut tx,
                NewTitleHistory {
                    employee_id,
                    title_id,
                    department_id,
                    ..record
                },
            )
            .await?;
        title_histories += 1;
    }

    tx.commit().await.map_err(RepositoryError::from)?;

    let summary = ImportSummary {
        locations: locations.len(),
        titles: titles.len(),
        departments: departments.len(),
        employees: employees.len(),
        title_histories,
    };
    info!(
        stage = "import",
        locations = summary.locations,
        titles = summary.titles,
        departments = summary.departments,
        employees = summary.employees,
        title_histories = summary.title_histories,
        "import committed"
    );
    Ok(summary)
}

fn remap(
    ids: &HashMap<EntityId, EntityId>,
    entity: &'static str,
    id: EntityId,
) -> Result<EntityId, ImportError> {
    ids.get(&id)
        .copied()
        .ok_or(ImportError::UnknownReference { entity, id })
}

fn keys<T>(entity: &'static str, records: &[Keyed<T>]) -> Result<HashSet<EntityId>, ImportError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(ImportError::DuplicateKey {
                entity,
                id: record.id,
            });
        }
    }
    Ok(seen)
}

fn require(
    known: &HashSet<EntityId>,
    entity: &'static str,
    id: EntityId,
) -> Result<(), ImportError> {
    if known.contains(&id) {
        Ok(())
    } else {
        Err(ImportError::UnknownReference { entity, id })
    }
}

fn check_document(document: &ImportDocument) -> Result<(), ImportError> {
    let locations = keys("location", &document.locations)?;
    let titles = keys("title", &document.titles)?;
    let departments = keys("department", &document.departments)?;
    let employees = keys("employee", &document.employees)?;
    keys("title history", &document.title_histories)?;

    for Keyed { record, .. } in &document.locations {
        record.validate()?;
    }
    for Keyed { record, .. } in &document.titles {
        record.validate()?;
    }
    for Keyed { record, .. } in &document.departments {
        record.validate()?;
        require(&locations, "location", record.location_id)?;
        require(&employees, "employee", record.manager_id)?;
    }
    for Keyed { record, .. } in &document.employees {
        record.validate()?;
        require(&departments, "department", record.department_id)?;
        require(&titles, "title", record.title_id)?;
        if let Some(manager) = record.manager_id {
            require(&employees, "employee", manager)?;
        }
    }
    for Keyed { record, .. } in &document.title_histories {
        require(&employees, "employee", record.employee_id)?;
        require(&titles, "title", record.title_id)?;
        require(&departments, "department", record.department_id)?;
    }
    Ok(())
}
