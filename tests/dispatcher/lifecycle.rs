//! Start/stop lifecycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use reserved_dispatch::executor::ThreadPerTask;
use reserved_dispatch::reserved::{Dispatcher, State};

use crate::helpers::{
    park_all, started, wait_for_available, wait_until, BlockingTask, Latch, WAIT_LIMIT,
};

#[test]
fn test_stop_retires_parked_workers() {
    let (exec, d) = started(2);
    park_all(&exec, &d, 2);

    d.stop();

    assert_eq!(d.state(), State::Stopped);
    assert_eq!(d.available(), 0);
    assert_eq!(d.pending(), 0);
    assert!(!d.try_execute(|| {}));
    assert_eq!(exec.queued(), 0);
}

#[test]
fn test_stop_waits_for_busy_worker() {
    let d = Arc::new(Dispatcher::new(ThreadPerTask::new("busy"), 1));
    d.start().unwrap();
    assert!(!d.try_execute(|| {}));
    wait_for_available(&d, 1);

    let task = BlockingTask::new();
    assert!(d.try_execute(task.job()));
    assert!(task.ran.wait(WAIT_LIMIT));

    let stopper = {
        let d = Arc::clone(&d);
        thread::spawn(move || d.stop())
    };

    wait_until("state == stopping", || d.state() == State::Stopping);
    // Work offered during shutdown is declined
    assert!(!d.try_execute(|| {}));
    assert_eq!(d.pending(), 1);

    thread::sleep(Duration::from_millis(100));
    assert!(!stopper.is_finished());

    task.complete.open();
    stopper.join().unwrap();

    assert_eq!(d.state(), State::Stopped);
    assert_eq!(d.pending(), 0);
    assert_eq!(d.available(), 0);
}

#[test]
fn test_concurrent_stops_both_return_after_shutdown() {
    let d = Arc::new(Dispatcher::new(ThreadPerTask::new("stops"), 1));
    d.start().unwrap();
    assert!(!d.try_execute(|| {}));
    wait_for_available(&d, 1);

    let task = BlockingTask::new();
    assert!(d.try_execute(task.job()));
    assert!(task.ran.wait(WAIT_LIMIT));

    let stoppers: Vec<_> = (0..2)
        .map(|_| {
            let d = Arc::clone(&d);
            thread::spawn(move || {
                d.stop();
                d.state()
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    task.complete.open();

    for stopper in stoppers {
        assert_eq!(stopper.join().unwrap(), State::Stopped);
    }
}

#[test]
fn test_restart_applies_new_idle_timeout() {
    let exec = crate::helpers::ManualExecutor::new();
    let d = Dispatcher::builder()
        .capacity(2)
        .idle_timeout(None)
        .build(Arc::clone(&exec));
    d.start().unwrap();

    assert!(!d.try_execute(|| {}));
    assert!(!d.try_execute(|| {}));
    assert_eq!(exec.queued(), 2);

    // One worker parks; the other loop is still queued when we stop
    exec.start_thread().unwrap();
    wait_for_available(&d, 1);

    d.stop();
    assert_eq!(d.available(), 0);
    assert_eq!(d.starting(), 0);

    d.set_idle_timeout(Some(Duration::from_millis(200))).unwrap();
    d.start().unwrap();

    // The loop left over from the previous run exits without registering
    exec.start_thread().unwrap().join().unwrap();
    assert_eq!(d.available(), 0);
    assert_eq!(d.starting(), 0);

    assert!(!d.try_execute(|| {}));
    exec.start_thread().unwrap();
    wait_for_available(&d, 1);

    // Only the new timeout can retire this worker
    wait_until("new worker to retire", || d.available() == 0);
    assert_eq!(d.stats().idle_retired, 1);
}

#[test]
fn test_lifecycle_usage_errors() {
    let (_exec, d) = started(1);

    assert!(d.start().unwrap_err().is_illegal_state());
    assert!(d
        .set_idle_timeout(Some(Duration::from_secs(1)))
        .unwrap_err()
        .is_illegal_state());

    d.stop();
    d.stop();
    assert_eq!(d.state(), State::Stopped);
    assert!(!d.try_execute(|| {}));
}

#[test]
fn test_task_panic_keeps_worker() {
    let d = Dispatcher::new(ThreadPerTask::new("panics"), 1);
    d.start().unwrap();
    assert!(!d.try_execute(|| {}));
    wait_for_available(&d, 1);

    assert!(d.try_execute(|| panic!("task failure")));
    wait_until("task failure recorded", || d.stats().task_failures == 1);
    wait_for_available(&d, 1);

    let ran = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&ran);
    assert!(d.try_execute(move || {
        r.fetch_add(1, Ordering::SeqCst);
    }));
    wait_until("follow-up task", || ran.load(Ordering::SeqCst) == 1);
}

#[test]
fn test_drop_retires_parked_workers() {
    let (exec, d) = started(1);
    assert!(!d.try_execute(|| {}));
    let worker = exec.start_thread().unwrap();
    wait_for_available(&d, 1);

    drop(d);

    // The worker loop only returns once retired
    worker.join().unwrap();
    assert_eq!(exec.queued(), 0);
}

#[test]
fn test_last_handle_dropped_inside_reserved_task() {
    let (exec, d) = started(1);
    assert!(!d.try_execute(|| {}));
    let worker = exec.start_thread().unwrap();
    wait_for_available(&d, 1);

    let d = Arc::new(d);
    let release = Latch::new();
    let (done_tx, done_rx) = mpsc::channel();

    let last = Arc::clone(&d);
    let gate = Arc::clone(&release);
    assert!(d.try_execute(move || {
        gate.wait(WAIT_LIMIT);
        drop(last);
        done_tx.send(()).unwrap();
    }));

    // The task now holds the only handle
    drop(d);
    release.open();

    done_rx
        .recv_timeout(WAIT_LIMIT)
        .expect("task should finish after dropping the last handle");
    worker.join().unwrap();
}
