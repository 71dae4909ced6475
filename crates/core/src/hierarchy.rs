use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::types::{Employee, EntityId};

/// Employee together with its direct subordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeNode {
    #[serde(flatten)]
    pub employee: Employee,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub employees: Vec<EmployeeNode>,
}

// Deep chains would otherwise be torn down one recursive call per level.
impl Drop for EmployeeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.employees);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.employees);
        }
    }
}

/// Partially built node on the `forest` walk stack.
struct Frame<'a> {
    employee: &'a Employee,
    children: &'a [EntityId],
    next: usize,
    built: Vec<EmployeeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("cyclic manager reference detected at employee {employee_id}")]
    CyclicManagerReference { employee_id: EntityId },
}

/// Manager/subordinate adjacency rebuilt from flat manager references.
///
/// The source records are left untouched; subordinate lists live in a
/// separate id → child ids map built once per snapshot.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    employees: HashMap<EntityId, Employee>,
    roots: Vec<EntityId>,
    subordinates: HashMap<EntityId, Vec<EntityId>>,
    orphans: Vec<EntityId>,
}

impl Hierarchy {
    /// Builds the adjacency in a single pass over `employees`.
    ///
    /// Roots and subordinate lists follow the iteration order of the input.
    /// When ids repeat, the last record wins and earlier duplicates are skipped.
    pub fn build(employees: Vec<Employee>) -> Self {
        let mut winner: HashMap<EntityId, usize> = HashMap::with_capacity(employees.len());
        for (index, employee) in employees.iter().enumerate() {
            if winner.insert(employee.id, index).is_some() {
                warn!(
                    stage = "hierarchy",
                    employee_id = employee.id,
                    "duplicate employee id; keeping the last record"
                );
            }
        }

        let mut roots = Vec::new();
        let mut subordinates: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
        let mut orphans = Vec::new();

        for (index, employee) in employees.iter().enumerate() {
            if winner.get(&employee.id) != Some(&index) {
                continue;
            }

            match employee.manager_id {
                None => roots.push(employee.id),
                Some(manager_id) if winner.contains_key(&manager_id) => {
                    subordinates.entry(manager_id).or_default().push(employee.id);
                }
                Some(manager_id) => {
                    warn!(
                        stage = "hierarchy",
                        employee_id = employee.id,
                        manager_id,
                        "manager reference does not resolve; employee omitted from hierarchy"
                    );
                    orphans.push(employee.id);
                }
            }
        }

        let employees = employees
            .into_iter()
            .enumerate()
            .filter(|(index, employee)| winner.get(&employee.id) == Some(index))
            .map(|(_, employee)| (employee.id, employee))
            .collect();

        Self {
            employees,
            roots,
            subordinates,
            orphans,
        }
    }

    /// Employees without a manager reference, in source order.
    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    /// Direct subordinates of `manager_id`, in source order.
    pub fn subordinates_of(&self, manager_id: EntityId) -> &[EntityId] {
        self.subordinates
            .get(&manager_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Employees whose manager reference names no known employee.
    pub fn orphans(&self) -> &[EntityId] {
        &self.orphans
    }

    pub fn employee(&self, id: EntityId) -> Option<&Employee> {
        self.employees.get(&id)
    }

    /// Materializes the nested root forest.
    ///
    /// Subordinates of orphans are omitted along with them. Fails when an
    /// employee sits on, or below, a manager cycle.
    pub fn forest(&self) -> Result<Vec<EmployeeNode>, HierarchyError> {
        let mut visited = HashSet::with_capacity(self.employees.len());
        let mut forest = Vec::with_capacity(self.roots.len());
        for &root in &self.roots {
            if let Some(node) = self.node(root, &mut visited)? {
                forest.push(node);
            }
        }

        let mut unreachable: Vec<EntityId> = self
            .subordinates
            .values()
            .flatten()
            .copied()
            .filter(|id| !visited.contains(id))
            .collect();
        unreachable.sort_unstable();

        // Unreached employees either hang below an orphan or sit on a cycle.
        let mut below_orphan = HashSet::new();
        for id in unreachable {
            if let Some(employee_id) = self.find_cycle(id, &mut below_orphan) {
                return Err(HierarchyError::CyclicManagerReference { employee_id });
            }
        }

        Ok(forest)
    }

    /// Builds the subtree under `root` depth-first with an explicit stack.
    ///
    /// Children are attached to their parent once their own subtree is
    /// complete, so the nesting depth never reaches the call stack.
    fn node(
        &self,
        root: EntityId,
        visited: &mut HashSet<EntityId>,
    ) -> Result<Option<EmployeeNode>, HierarchyError> {
        let Some(frame) = self.frame(root, visited)? else {
            return Ok(None);
        };

        let mut stack = vec![frame];
        let mut finished = None;
        while let Some(top) = stack.last_mut() {
            let next = top.children.get(top.next).copied();
            top.next += 1;

            if let Some(child) = next {
                if let Some(frame) = self.frame(child, visited)? {
                    stack.push(frame);
                }
                continue;
            }

            let Some(done) = stack.pop() else { break };
            let node = EmployeeNode {
                employee: done.employee.clone(),
                employees: done.built,
            };
            match stack.last_mut() {
                Some(parent) => parent.built.push(node),
                None => finished = Some(node),
            }
        }

        Ok(finished)
    }

    fn frame(
        &self,
        id: EntityId,
        visited: &mut HashSet<EntityId>,
    ) -> Result<Option<Frame<'_>>, HierarchyError> {
        if !visited.insert(id) {
            return Err(HierarchyError::CyclicManagerReference { employee_id: id });
        }
        Ok(self.employees.get(&id).map(|employee| Frame {
            employee,
            children: self.subordinates_of(id),
            next: 0,
            built: Vec::new(),
        }))
    }

    /// Follows manager links upwards from `start`.
    ///
    /// Returns the first repeated id when the chain loops, or `None` when it
    /// ends at an employee whose manager does not resolve.
    fn find_cycle(
        &self,
        start: EntityId,
        below_orphan: &mut HashSet<EntityId>,
    ) -> Option<EntityId> {
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut current = start;
        loop {
            if below_orphan.contains(&current) {
                break;
            }
            if !on_path.insert(current) {
                return Some(current);
            }
            path.push(current);
            match self
                .employees
                .get(&current)
                .and_then(|employee| employee.manager_id)
            {
                Some(manager_id) if self.employees.contains_key(&manager_id) => {
                    current = manager_id;
                }
                _ => break,
            }
        }
        below_orphan.extend(path);
        None
    }
}
