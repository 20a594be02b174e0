//! Property-based tests for push-channel frames.
//!
//! Uses proptest to verify:
//! 1. Any event frame survives encode → decode unchanged.
//! 2. Random bytes never cause a panic in `decode` (returns `Err` gracefully).
//! 3. `decode_bounded` rejects every frame larger than its limit.
//! 4. Patches built from records carry the record's assignee set.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use proptest::prelude::*;
use taskboard_proto::channel::{ChannelMessage, Topic};
use taskboard_proto::codec::{self, CodecError};
use taskboard_proto::employee::{EmployeeId, OwnerId};
use taskboard_proto::event::PushEvent;
use taskboard_proto::task::{Priority, TaskId, TaskPatch, TaskRecord, TaskStatus};

// --- Strategies for protocol types ---

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Completed),
    ]
}

fn arb_priority() -> impl Strategy<Value = Option<Priority>> {
    prop_oneof![
        Just(None),
        Just(Some(Priority::Low)),
        Just(Some(Priority::Medium)),
        Just(Some(Priority::High)),
    ]
}

fn arb_employee_ids() -> impl Strategy<Value = Vec<EmployeeId>> {
    prop::collection::vec((1u64..50).prop_map(EmployeeId::new), 0..6)
}

fn arb_record() -> impl Strategy<Value = TaskRecord> {
    (
        prop::option::of((1u64..10_000).prop_map(TaskId::new)),
        "[^\x00]{0,64}",
        arb_date(),
        arb_date(),
        arb_priority(),
        arb_status(),
        0u32..100,
        prop::option::of((1u64..50).prop_map(EmployeeId::new)),
        arb_employee_ids(),
    )
        .prop_map(
            |(task_id, title, start_date, due_date, priority, status, position, employee_id, employee_ids)| {
                TaskRecord {
                    task_id,
                    title,
                    description: String::new(),
                    start_date,
                    due_date,
                    completion_date: None,
                    priority,
                    status,
                    position,
                    employee_id,
                    employee_ids,
                    employees: Vec::new(),
                }
            },
        )
}

fn arb_event() -> impl Strategy<Value = PushEvent> {
    prop_oneof![
        arb_record().prop_map(PushEvent::TaskCreated),
        arb_record().prop_map(|r| PushEvent::TaskUpdated(TaskPatch::from_record(&r))),
        prop::option::of((1u64..10_000).prop_map(TaskId::new))
            .prop_map(|task_id| PushEvent::TaskDeleted { task_id }),
        ((1u64..50), any::<bool>()).prop_map(|(id, online)| PushEvent::EmployeePresence {
            employee_id: EmployeeId::new(id),
            online,
        }),
        ((1u64..50), any::<bool>()).prop_map(|(id, active)| PushEvent::EmployeeStatus {
            employee_id: EmployeeId::new(id),
            active,
        }),
    ]
}

fn arb_topic() -> impl Strategy<Value = Topic> {
    prop_oneof![
        any::<u64>().prop_map(|n| Topic::Owner(OwnerId::new(n))),
        any::<u64>().prop_map(|n| Topic::Employee(EmployeeId::new(n))),
    ]
}

proptest! {
    #[test]
    fn event_frames_survive_encoding(event in arb_event()) {
        let msg = ChannelMessage::Event(event);
        let bytes = codec::encode(&msg).unwrap();
        prop_assert_eq!(codec::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn join_frames_survive_encoding(topic in arb_topic()) {
        let msg = ChannelMessage::Join { topic };
        let bytes = codec::encode(&msg).unwrap();
        prop_assert_eq!(codec::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode(&bytes);
    }

    #[test]
    fn oversized_frames_are_rejected(event in arb_event()) {
        let bytes = codec::encode(&ChannelMessage::Event(event)).unwrap();
        let max = bytes.len() - 1;
        let result = codec::decode_bounded(&bytes, max);
        prop_assert!(
            matches!(result, Err(CodecError::FrameTooLarge { size, .. }) if size == bytes.len()),
            "frame should exceed the limit"
        );
    }

    #[test]
    fn patches_from_records_keep_assignees(record in arb_record()) {
        let patch = TaskPatch::from_record(&record);
        prop_assert_eq!(patch.task_id, record.task_id);
        prop_assert_eq!(patch.employee_ids, Some(record.employee_ids.clone()));
        prop_assert_eq!(patch.position.is_some(), record.employee_id.is_some());
    }
}
