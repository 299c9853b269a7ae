use chrono::{Local, NaiveDate, TimeZone, Utc};

use taskboard_sync::{
    Employee, Gender, PushEvent, Task, TaskBoard, TaskStatus,
};

fn employee(id: i64, first_name: &str) -> Employee {
    Employee {
        id,
        first_name: first_name.to_string(),
        last_name: "Doe".to_string(),
        gender: Gender::Unspecified,
        designation: None,
        status: true,
    }
}

fn task(id: i64, title: &str, employee_ids: &[i64], position: i64) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: None,
        start_date: None,
        due_date: None,
        priority: None,
        status: TaskStatus::Todo,
        completion_date: None,
        employee_ids: employee_ids.to_vec(),
        position,
    }
}

fn completed(mut t: Task, at: chrono::DateTime<Utc>) -> Task {
    t.set_status(TaskStatus::Completed, at);
    t
}

fn titles(tasks: &[&Task]) -> Vec<String> {
    tasks.iter().map(|t| t.title.clone()).collect()
}

#[test]
fn rebuild_sorts_by_position_and_is_stable_on_ties() {
    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana"), employee(8, "Erin")],
        vec![
            task(1, "later", &[7], 2),
            task(2, "first-tie", &[7], 0),
            task(3, "second-tie", &[7], 0),
        ],
    );

    let group = board.group(7).unwrap();
    assert_eq!(
        group.tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![2, 3, 1],
        "ascending position, snapshot order on ties"
    );

    // An employee with zero tasks still gets a group.
    assert_eq!(board.group(8).unwrap().tasks.len(), 0);
}

#[test]
fn rebuild_duplicates_multi_assigned_tasks_per_group() {
    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana"), employee(8, "Erin")],
        vec![task(1, "shared", &[7, 8], 0)],
    );

    assert_eq!(board.group(7).unwrap().tasks.len(), 1);
    assert_eq!(board.group(8).unwrap().tasks.len(), 1);
}

#[test]
fn new_task_push_is_idempotent() {
    let mut board = TaskBoard::new();
    board.rebuild(vec![employee(7, "Dana")], vec![]);

    let event = PushEvent::NewTask {
        task: task(42, "pushed", &[7], 0),
    };
    assert!(board.apply_push(&event).is_some());
    assert!(board.apply_push(&event).is_some());

    let group = board.group(7).unwrap();
    assert_eq!(group.tasks.len(), 1, "duplicate delivery must not duplicate");
    assert_eq!(group.tasks[0].id, 42);
}

#[test]
fn push_for_unscoped_subject_is_ignored() {
    // Employee dashboard: the board only carries the subject's own group.
    let mut board = TaskBoard::new();
    board.rebuild(vec![employee(7, "Dana")], vec![]);

    let mine = PushEvent::NewTask {
        task: task(1, "mine", &[7], 0),
    };
    let theirs = PushEvent::NewTask {
        task: task(2, "theirs", &[9], 0),
    };

    assert!(board.apply_push(&mine).is_some());
    assert!(board.apply_push(&theirs).is_none());
    assert_eq!(board.group(7).unwrap().tasks.len(), 1);
}

#[test]
fn update_push_moves_task_between_groups() {
    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana"), employee(8, "Erin")],
        vec![task(1, "t", &[7], 0)],
    );

    // Reassigned from 7 to 8.
    let event = PushEvent::UpdateTask {
        task: task(1, "t", &[8], 0),
    };
    assert!(board.apply_push(&event).is_some());
    assert!(board.group(7).unwrap().tasks.is_empty());
    assert_eq!(board.group(8).unwrap().tasks.len(), 1);
}

#[test]
fn update_push_without_scope_match_is_ignored() {
    // Employee dashboard for subject 7; the task was unassigned to 9.
    let mut board = TaskBoard::new();
    board.rebuild(vec![employee(7, "Dana")], vec![task(1, "t", &[7], 0)]);

    let event = PushEvent::UpdateTask {
        task: task(1, "t", &[9], 0),
    };
    assert!(board.apply_push(&event).is_none());
    // Untouched; the next full rebuild reconciles the unassignment.
    assert_eq!(board.group(7).unwrap().tasks.len(), 1);
}

#[test]
fn delete_push_removes_from_all_groups_and_tolerates_absence() {
    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana"), employee(8, "Erin")],
        vec![task(1, "shared", &[7, 8], 0)],
    );

    assert!(board.apply_push(&PushEvent::DeleteTask { id: 1 }).is_some());
    assert!(board.group(7).unwrap().tasks.is_empty());
    assert!(board.group(8).unwrap().tasks.is_empty());

    // Already gone: no-op, no notification.
    assert!(board.apply_push(&PushEvent::DeleteTask { id: 1 }).is_none());
}

#[test]
fn reorder_reindexes_every_shifted_task() {
    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana")],
        vec![
            task(1, "A", &[7], 0),
            task(2, "B", &[7], 1),
            task(3, "C", &[7], 2),
        ],
    );

    // Drag C to the front: every task's position changes.
    let changed = board.reorder(7, 2, 0).unwrap();
    assert_eq!(changed.len(), 3);

    let group = board.group(7).unwrap();
    assert_eq!(titles(&group.tasks.iter().collect::<Vec<_>>()), ["C", "A", "B"]);
    assert_eq!(
        group.tasks.iter().map(|t| t.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn reorder_reports_only_shifted_tasks() {
    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana")],
        vec![
            task(1, "A", &[7], 0),
            task(2, "B", &[7], 1),
            task(3, "C", &[7], 2),
            task(4, "D", &[7], 3),
        ],
    );

    // Swap B and C: A and D keep their positions.
    let changed = board.reorder(7, 1, 2).unwrap();
    assert_eq!(changed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3, 2]);
}

#[test]
fn reorder_guards_are_noops() {
    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana")],
        vec![task(1, "A", &[7], 0), task(2, "B", &[7], 1)],
    );

    assert!(board.reorder(7, 1, 1).is_none(), "same index");
    assert!(board.reorder(7, 5, 0).is_none(), "source out of range");
    assert!(board.reorder(7, 0, 5).is_none(), "destination out of range");
    assert!(board.reorder(99, 0, 1).is_none(), "unknown group");

    let group = board.group(7).unwrap();
    assert_eq!(group.tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn active_and_completed_partition_exactly() {
    let now = Utc::now();
    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana")],
        vec![
            task(1, "open", &[7], 0),
            completed(task(2, "done", &[7], 1), now),
            task(3, "in-progress", &[7], 2),
        ],
    );

    let active = board.active_tasks(7);
    let done = board.completed_tasks(7);
    assert_eq!(titles(&active), ["open", "in-progress"]);
    assert_eq!(titles(&done), ["done"]);
    assert_eq!(active.len() + done.len(), board.group(7).unwrap().tasks.len());
    assert!(board.invariants_hold());
    assert!(done.iter().all(|t| t.completion_date.is_some()));
    assert!(active.iter().all(|t| t.completion_date.is_none()));
}

#[test]
fn completion_date_filter_uses_local_calendar_day() {
    // Anchor the timestamp at local noon so the test holds in any timezone:
    // the UTC instant may land on a different UTC date, but its local
    // calendar day is fixed.
    let local_noon = Local.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
    let as_utc = local_noon.with_timezone(&Utc);

    let mut board = TaskBoard::new();
    board.rebuild(
        vec![employee(7, "Dana")],
        vec![completed(task(1, "done", &[7], 0), as_utc)],
    );

    let on_day = board.completed_on(7, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    assert_eq!(on_day.len(), 1);

    let off_day = board.completed_on(7, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
    assert!(off_day.is_empty());
}

#[test]
fn status_change_keeps_completion_date_invariant() {
    let now = Utc::now();
    let mut t = task(1, "t", &[7], 0);

    t.set_status(TaskStatus::Completed, now);
    assert_eq!(t.completion_date, Some(now));

    t.set_status(TaskStatus::InProgress, now);
    assert_eq!(t.completion_date, None);
}
