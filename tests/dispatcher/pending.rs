//! Lazy startup, handoff and capacity exhaustion.

use std::thread;
use std::time::Duration;

use crate::helpers::{park_all, started, wait_for_available, BlockingTask, SIZE, WAIT_LIMIT};

#[test]
fn test_started_lazily() {
    let (exec, d) = started(SIZE);

    // Reserved threads are lazily started.
    assert_eq!(exec.queued(), 0);
    assert_eq!(d.available(), 0);
    assert_eq!(d.pending(), 0);
}

#[test]
fn test_pending() {
    let (exec, d) = started(SIZE);

    // No worker parked yet: both calls decline and start one worker each
    for _ in 0..SIZE {
        assert!(!d.try_execute(|| {}));
    }
    assert_eq!(exec.queued(), SIZE);
    assert_eq!(d.starting(), SIZE);

    // Further declines do not over-provision
    assert!(!d.try_execute(|| {}));
    assert_eq!(exec.queued(), SIZE);

    for _ in 0..SIZE {
        exec.start_thread().unwrap();
    }
    assert_eq!(exec.queued(), 0);
    wait_for_available(&d, SIZE);
    assert_eq!(d.starting(), 0);

    let tasks: Vec<BlockingTask> = (0..SIZE).map(|_| BlockingTask::new()).collect();
    for task in &tasks {
        assert!(d.try_execute(task.job()));
    }
    assert_eq!(d.available(), 0);
    assert_eq!(d.pending(), SIZE);

    // Pool at capacity: decline without starting anything
    for _ in 0..SIZE {
        assert!(!d.try_execute(|| {}));
    }
    assert_eq!(exec.queued(), 0);
    assert_eq!(d.available(), 0);

    for task in &tasks {
        task.complete.open();
    }
    wait_for_available(&d, SIZE);
    assert_eq!(d.pending(), 0);
}

#[test]
fn test_executed() {
    let (exec, d) = started(SIZE);
    park_all(&exec, &d, SIZE);

    let tasks: Vec<BlockingTask> = (0..SIZE).map(|_| BlockingTask::new()).collect();
    for task in &tasks {
        assert!(d.try_execute(task.job()));
    }
    for task in &tasks {
        assert!(task.ran.wait(WAIT_LIMIT));
    }

    let extra = BlockingTask::new();
    assert!(!d.try_execute(extra.job()));

    // A declined task is never run by the dispatcher
    thread::sleep(Duration::from_millis(500));
    assert!(!extra.ran.is_open());

    for task in &tasks {
        task.complete.open();
    }
    wait_for_available(&d, SIZE);

    let stats = d.stats();
    assert_eq!(stats.accepted, SIZE as u64);
    assert_eq!(stats.spawned, SIZE as u64);
}

#[test]
fn test_capacity_exhaustion_for_any_size() {
    for size in 1..=4 {
        let (exec, d) = started(size);
        park_all(&exec, &d, size);

        let tasks: Vec<BlockingTask> = (0..size).map(|_| BlockingTask::new()).collect();
        for task in &tasks {
            assert!(d.try_execute(task.job()));
        }
        assert_eq!(d.available(), 0);
        assert!(!d.try_execute(|| {}));

        for task in &tasks {
            task.complete.open();
        }
        wait_for_available(&d, size);
    }
}

#[test]
fn test_zero_capacity_always_declines() {
    let (exec, d) = started(0);
    for _ in 0..3 {
        assert!(!d.try_execute(|| {}));
    }
    assert_eq!(exec.queued(), 0);
    assert_eq!(d.available(), 0);
}
