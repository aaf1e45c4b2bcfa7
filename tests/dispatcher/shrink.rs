//! Idle-timeout shrink and regrowth.

use std::thread;
use std::time::Duration;

use crate::helpers::{started, wait_for_available, wait_until};

const IDLE: Duration = Duration::from_millis(1000);

#[test]
fn test_shrink() {
    let (exec, d) = started(2);

    d.stop();
    d.set_idle_timeout(Some(IDLE)).unwrap();
    d.start().unwrap();
    assert_eq!(d.available(), 0);

    assert!(!d.try_execute(|| {}));
    assert!(!d.try_execute(|| {}));

    exec.start_thread().unwrap();
    exec.start_thread().unwrap();

    wait_for_available(&d, 2);

    thread::sleep(IDLE * 5 / 2);
    assert_eq!(d.available(), 0);
    assert_eq!(d.pending(), 0);
    assert_eq!(d.stats().idle_retired, 2);
}

#[test]
fn test_regrows_after_shrink() {
    let (exec, d) = started(1);
    d.stop();
    d.set_idle_timeout(Some(Duration::from_millis(100))).unwrap();
    d.start().unwrap();

    assert!(!d.try_execute(|| {}));
    let first = exec.start_thread().unwrap();
    wait_for_available(&d, 1);

    // Retires and its thread ends
    first.join().unwrap();
    assert_eq!(d.available(), 0);

    // Capacity was released, so demand starts a fresh worker
    assert!(!d.try_execute(|| {}));
    assert_eq!(exec.queued(), 1);
    exec.start_thread().unwrap();
    wait_for_available(&d, 1);

    let (tx, rx) = std::sync::mpsc::channel();
    assert!(d.try_execute(move || tx.send(()).unwrap()));
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
}

#[test]
fn test_busy_worker_does_not_retire_mid_task() {
    let (exec, d) = started(1);
    d.stop();
    d.set_idle_timeout(Some(Duration::from_millis(50))).unwrap();
    d.start().unwrap();

    assert!(!d.try_execute(|| {}));
    exec.start_thread().unwrap();
    wait_for_available(&d, 1);

    // Task runs well past the idle timeout
    let (tx, rx) = std::sync::mpsc::channel();
    assert!(d.try_execute(move || {
        thread::sleep(Duration::from_millis(300));
        tx.send(()).unwrap();
    }));
    rx.recv_timeout(Duration::from_secs(5)).unwrap();

    wait_until("worker to retire after re-parking", || {
        d.stats().idle_retired == 1
    });
    assert_eq!(d.pending(), 0);
}
