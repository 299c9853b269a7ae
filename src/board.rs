use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::models::{Employee, Notification, PushEvent, Task};

#[derive(Debug, Clone)]
pub struct TaskGroup {
    pub employee: Employee,
    pub tasks: Vec<Task>,
}

/// In-memory projection of the backend's tasks, grouped per employee and
/// ordered by `position`. Disposable: a full rebuild from a fresh snapshot is
/// always authoritative. All mutations run to completion on the caller's
/// task, so there is no locking here.
///
/// Groups exist only for employees in the current scope (all employees for an
/// admin, just themselves for an employee), which is what scopes push events:
/// a push for a subject outside the scope finds no group and is ignored.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    groups: BTreeMap<i64, TaskGroup>,
}

impl TaskBoard {
    pub fn new() -> Self {
        TaskBoard::default()
    }

    /// Replaces the whole projection from a REST snapshot. The only operation
    /// that may add or remove a group; an employee with zero tasks keeps an
    /// empty group. A task assigned to several employees appears once in each
    /// of their groups.
    pub fn rebuild(&mut self, employees: Vec<Employee>, tasks: Vec<Task>) {
        self.groups = employees
            .into_iter()
            .map(|employee| {
                (
                    employee.id,
                    TaskGroup {
                        employee,
                        tasks: Vec::new(),
                    },
                )
            })
            .collect();

        for task in tasks {
            for employee_id in &task.employee_ids {
                if let Some(group) = self.groups.get_mut(employee_id) {
                    group.tasks.push(task.clone());
                }
            }
        }

        for group in self.groups.values_mut() {
            sort_by_position(&mut group.tasks);
        }
        info!(groups = self.groups.len(), "Rebuilt task board");
    }

    /// Applies one server push to the affected groups, re-sorting only those.
    /// Idempotent against at-least-once delivery: a `NewTask` for an id
    /// already present replaces rather than duplicates. Returns the
    /// notification to surface, or `None` when the event was out of scope.
    pub fn apply_push(&mut self, event: &PushEvent) -> Option<Notification> {
        match event {
            PushEvent::NewTask { task } => {
                if self.upsert(task) {
                    Some(Notification::TaskAssigned {
                        title: task.title.clone(),
                    })
                } else {
                    None
                }
            }
            PushEvent::UpdateTask { task } => {
                // No assigned-employee match in this scope: the task was
                // unassigned from the subject, ignore and let the next
                // rebuild reconcile.
                if !self.upsert(task) {
                    return None;
                }
                // The update may have moved the task between groups.
                for group in self.groups.values_mut() {
                    if !task.employee_ids.contains(&group.employee.id) {
                        group.tasks.retain(|t| t.id != task.id);
                    }
                }
                Some(Notification::TaskUpdated {
                    title: task.title.clone(),
                })
            }
            PushEvent::DeleteTask { id } => {
                let mut removed = false;
                for group in self.groups.values_mut() {
                    let before = group.tasks.len();
                    group.tasks.retain(|t| t.id != *id);
                    removed |= group.tasks.len() != before;
                }
                // Absence is not an error; the delete may have raced a rebuild.
                removed.then_some(Notification::TaskRemoved { id: *id })
            }
        }
    }

    fn upsert(&mut self, task: &Task) -> bool {
        let mut touched = false;
        for employee_id in &task.employee_ids {
            if let Some(group) = self.groups.get_mut(employee_id) {
                match group.tasks.iter_mut().find(|t| t.id == task.id) {
                    Some(existing) => *existing = task.clone(),
                    None => group.tasks.push(task.clone()),
                }
                sort_by_position(&mut group.tasks);
                touched = true;
            }
        }
        touched
    }

    /// Optimistic reorder within one employee's group: splice the task from
    /// `from` to `to`, then reassign every task its index as `position`.
    /// Returns clones of the tasks whose position changed (the set to
    /// persist), or `None` for a no-op (missing group, equal or out-of-range
    /// indices) in which case nothing was mutated.
    pub fn reorder(&mut self, employee_id: i64, from: usize, to: usize) -> Option<Vec<Task>> {
        let group = self.groups.get_mut(&employee_id)?;
        if from == to || from >= group.tasks.len() || to >= group.tasks.len() {
            return None;
        }

        let task = group.tasks.remove(from);
        group.tasks.insert(to, task);

        let mut changed = Vec::new();
        for (index, task) in group.tasks.iter_mut().enumerate() {
            if task.position != index as i64 {
                task.position = index as i64;
                changed.push(task.clone());
            }
        }
        info!(employee_id, from, to, changed = changed.len(), "Reordered tasks");
        Some(changed)
    }

    pub fn group(&self, employee_id: i64) -> Option<&TaskGroup> {
        self.groups.get(&employee_id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &TaskGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Tasks not yet completed, in display order.
    pub fn active_tasks(&self, employee_id: i64) -> Vec<&Task> {
        self.tasks_where(employee_id, |t| !t.is_completed())
    }

    pub fn completed_tasks(&self, employee_id: i64) -> Vec<&Task> {
        self.tasks_where(employee_id, Task::is_completed)
    }

    /// Completed tasks whose completion timestamp falls on the given LOCAL
    /// calendar day. Both sides are normalized to the local date so a UTC
    /// timestamp near midnight still matches the user's day.
    pub fn completed_on(&self, employee_id: i64, date: NaiveDate) -> Vec<&Task> {
        self.tasks_where(employee_id, |t| {
            t.completion_date
                .is_some_and(|ts| ts.with_timezone(&Local).date_naive() == date)
        })
    }

    fn tasks_where(&self, employee_id: i64, pred: impl Fn(&Task) -> bool) -> Vec<&Task> {
        self.groups
            .get(&employee_id)
            .map(|group| group.tasks.iter().filter(|&t| pred(t)).collect())
            .unwrap_or_default()
    }

    /// Every task is either active or completed, never both, and carries a
    /// completion date exactly when completed.
    pub fn invariants_hold(&self) -> bool {
        self.groups.values().all(|group| {
            group
                .tasks
                .iter()
                .all(|t| t.completion_date.is_some() == t.is_completed())
        })
    }
}

// Stable, so snapshot order breaks position ties.
fn sort_by_position(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.position);
}
