//! Property-based tests for client-side reconciliation.
//!
//! Uses proptest to verify:
//! 1. Applying any event twice leaves the store as applying it once.
//! 2. No sequence of events leaves a completed task on the board, and the
//!    completed archive only ever holds completed tasks.
//! 3. A reorder renumbers the list to contiguous positions.
//! 4. Projection never alters the store and only shows matching cards.

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation)]

use chrono::NaiveDate;
use proptest::prelude::*;
use taskboard::tasks::{EmployeeGroup, Reconciler, TaskStore, project};
use taskboard_proto::employee::{EmployeeId, EmployeeRecord, Gender, OwnerId};
use taskboard_proto::event::PushEvent;
use taskboard_proto::task::{Task, TaskId, TaskPatch, TaskRecord, TaskStatus};

const NAMES: [&str; 3] = ["Alice", "Bob", "Carol"];

fn employees() -> Vec<EmployeeRecord> {
    NAMES
        .iter()
        .enumerate()
        .map(|(i, first)| EmployeeRecord {
            id: EmployeeId::new(i as u64 + 1),
            first_name: (*first).to_string(),
            last_name: "Smith".to_string(),
            gender: Gender::Other,
            owner_id: OwnerId::new(1),
            active: true,
        })
        .collect()
}

fn snapshot(store: &TaskStore) -> (Vec<EmployeeGroup>, Vec<Task>) {
    (
        store.groups().cloned().collect(),
        store.archived_tasks().cloned().collect(),
    )
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
}

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        3 => Just(TaskStatus::Todo),
        3 => Just(TaskStatus::InProgress),
        1 => Just(TaskStatus::Completed),
    ]
}

fn arb_assignees() -> impl Strategy<Value = Vec<EmployeeId>> {
    prop::collection::btree_set(1u64..=4, 0..4)
        .prop_map(|set| set.into_iter().map(EmployeeId::new).collect())
}

fn arb_record() -> impl Strategy<Value = TaskRecord> {
    (
        1u64..8,
        prop_oneof![Just("Fix login"), Just("Write docs"), Just("Plan sprint")],
        arb_status(),
        0u32..6,
        prop::option::of((1u64..=4).prop_map(EmployeeId::new)),
        arb_assignees(),
    )
        .prop_map(
            |(id, title, status, position, employee_id, employee_ids)| TaskRecord {
                task_id: Some(TaskId::new(id)),
                title: title.to_string(),
                description: String::new(),
                start_date: day(),
                due_date: day(),
                completion_date: None,
                priority: None,
                status,
                position,
                employee_id,
                employee_ids,
                employees: Vec::new(),
            },
        )
}

fn arb_patch() -> impl Strategy<Value = TaskPatch> {
    (
        1u64..8,
        prop::option::of(prop_oneof![Just("Renamed"), Just("Fix login twice")]),
        prop::option::of(arb_status()),
        prop::option::of(0u32..6),
        prop::option::of((1u64..=4).prop_map(EmployeeId::new)),
        prop::option::of(arb_assignees()),
    )
        .prop_map(
            |(id, title, status, position, employee_id, employee_ids)| TaskPatch {
                task_id: Some(TaskId::new(id)),
                title: title.map(str::to_string),
                status,
                position,
                employee_id,
                employee_ids,
                ..TaskPatch::default()
            },
        )
}

fn arb_event() -> impl Strategy<Value = PushEvent> {
    prop_oneof![
        3 => arb_record().prop_map(PushEvent::TaskCreated),
        3 => arb_patch().prop_map(PushEvent::TaskUpdated),
        1 => (1u64..8).prop_map(|id| PushEvent::TaskDeleted {
            task_id: Some(TaskId::new(id)),
        }),
        1 => ((1u64..=4), any::<bool>()).prop_map(|(id, online)| PushEvent::EmployeePresence {
            employee_id: EmployeeId::new(id),
            online,
        }),
        1 => ((1u64..=4), any::<bool>()).prop_map(|(id, active)| PushEvent::EmployeeStatus {
            employee_id: EmployeeId::new(id),
            active,
        }),
    ]
}

fn seeded(events: &[PushEvent]) -> Reconciler {
    let mut reconciler = Reconciler::new();
    reconciler.load_snapshot(&employees(), &[]);
    for event in events {
        let _ = reconciler.apply(event);
    }
    reconciler
}

proptest! {
    #[test]
    fn replaying_an_event_is_idempotent(
        history in prop::collection::vec(arb_event(), 0..12),
        event in arb_event(),
    ) {
        let mut reconciler = seeded(&history);
        let _ = reconciler.apply(&event);
        let once = snapshot(reconciler.store());
        let _ = reconciler.apply(&event);
        prop_assert_eq!(snapshot(reconciler.store()), once);
    }

    #[test]
    fn completed_tasks_never_stay_listed(history in prop::collection::vec(arb_event(), 0..24)) {
        let reconciler = seeded(&history);
        for group in reconciler.store().groups() {
            prop_assert!(group.tasks().iter().all(|t| t.status.is_active()));
        }
        prop_assert!(reconciler.store().archived_tasks().all(|t| !t.status.is_active()));
    }

    #[test]
    fn events_for_unknown_employees_never_create_groups(
        history in prop::collection::vec(arb_event(), 0..24),
    ) {
        let reconciler = seeded(&history);
        prop_assert_eq!(reconciler.store().groups().count(), NAMES.len());
    }

    #[test]
    fn reorder_leaves_contiguous_positions(
        positions in prop::collection::vec(0u32..20, 2..8),
        from_seed in any::<usize>(),
        to_seed in any::<usize>(),
    ) {
        let employee_id = EmployeeId::new(1);
        let rows: Vec<TaskRecord> = positions
            .iter()
            .enumerate()
            .map(|(i, position)| TaskRecord {
                task_id: Some(TaskId::new(i as u64 + 1)),
                title: format!("Task {i}"),
                description: String::new(),
                start_date: day(),
                due_date: day(),
                completion_date: None,
                priority: None,
                status: TaskStatus::Todo,
                position: *position,
                employee_id: Some(employee_id),
                employee_ids: vec![employee_id],
                employees: Vec::new(),
            })
            .collect();
        let mut reconciler = Reconciler::new();
        reconciler.load_snapshot(&employees(), &rows);

        let len = rows.len();
        let from = from_seed % len;
        let to = to_seed % len;
        prop_assume!(from != to);
        let moved = reconciler.store().read(employee_id)[from].id;

        let patches = reconciler.reorder(employee_id, from, to).unwrap();
        let list = reconciler.store().read(employee_id);

        prop_assert_eq!(list[to].id, moved);
        for (index, task) in list.iter().enumerate() {
            prop_assert_eq!(task.position as usize, index);
        }
        prop_assert!(patches.len() <= len);
        for patch in &patches {
            prop_assert_eq!(patch.employee_id, Some(employee_id));
        }
    }

    #[test]
    fn projection_does_not_touch_the_store(
        history in prop::collection::vec(arb_event(), 0..16),
        query in prop_oneof![Just(""), Just("login"), Just("ALICE"), Just("  docs "), Just("zzz")],
    ) {
        let reconciler = seeded(&history);
        let before = snapshot(reconciler.store());
        let projection = project(reconciler.store(), query);
        prop_assert_eq!(snapshot(reconciler.store()), before);

        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            prop_assert_eq!(projection.task_count(), reconciler.store().task_count());
        }
        for group in &projection.groups {
            if !group.matched_by_name {
                prop_assert!(
                    group.tasks.iter().all(|t| t.title.to_lowercase().contains(&needle))
                );
            }
        }
    }
}
