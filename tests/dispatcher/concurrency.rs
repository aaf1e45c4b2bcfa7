//! Exclusive handoff and exactly-once execution under contention.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use reserved_dispatch::executor::{QueuedPool, ThreadPerTask};
use reserved_dispatch::reserved::{Dispatcher, Route, State};

use crate::helpers::{park_all, started, wait_for_available, wait_until, Latch, WAIT_LIMIT};

#[test]
fn test_handoff_is_exclusive() {
    let (exec, d) = started(1);
    let d = Arc::new(d);
    park_all(&exec, &d, 1);

    for _ in 0..50 {
        let callers = 8;
        let barrier = Arc::new(Barrier::new(callers));
        let ran = Arc::new(AtomicUsize::new(0));
        // Held until every caller returns so the worker cannot re-park
        // and take a second task mid-round.
        let release = Latch::new();

        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let d = Arc::clone(&d);
                let barrier = Arc::clone(&barrier);
                let ran = Arc::clone(&ran);
                let release = Arc::clone(&release);
                thread::spawn(move || {
                    barrier.wait();
                    d.try_execute(move || {
                        ran.fetch_add(1, Ordering::SeqCst);
                        release.wait(WAIT_LIMIT);
                    })
                })
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(accepted, 1);
        release.open();

        wait_until("accepted task to run", || ran.load(Ordering::SeqCst) == 1);
        wait_for_available(&d, 1);
        // The pool was full the whole time, so nothing new was started
        assert_eq!(exec.queued(), 0);
    }
}

#[test]
fn test_every_task_runs_exactly_once() {
    // A tiny idle timeout keeps workers retiring while handoffs race them.
    let d = Arc::new(
        Dispatcher::builder()
            .capacity(4)
            .idle_timeout(Some(Duration::from_millis(1)))
            .build(ThreadPerTask::new("exactly-once")),
    );
    d.start().unwrap();

    let producers = 4;
    let per_producer = 500;
    let runs: Arc<Vec<AtomicUsize>> =
        Arc::new((0..producers * per_producer).map(|_| AtomicUsize::new(0)).collect());
    let reserved_routes = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..producers)
        .map(|p| {
            let d = Arc::clone(&d);
            let runs = Arc::clone(&runs);
            let reserved_routes = Arc::clone(&reserved_routes);
            thread::spawn(move || {
                for i in 0..per_producer {
                    let idx = p * per_producer + i;
                    let runs = Arc::clone(&runs);
                    let route = d
                        .execute_or_fallback(move || {
                            runs[idx].fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                    if route == Route::Reserved {
                        reserved_routes.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    wait_until("all tasks to run", || {
        runs.iter().all(|r| r.load(Ordering::SeqCst) >= 1)
    });
    d.stop();

    assert!(runs.iter().all(|r| r.load(Ordering::SeqCst) == 1));
    assert_eq!(
        d.stats().accepted as usize,
        reserved_routes.load(Ordering::SeqCst)
    );
}

#[test]
fn test_reserved_over_queued_pool() {
    let pool = Arc::new(QueuedPool::with_capacity(4, 64, "backing").unwrap());
    let d = Dispatcher::builder()
        .capacity(2)
        .build(Arc::clone(&pool));
    d.start().unwrap();

    assert!(!d.try_execute(|| {}));
    assert!(!d.try_execute(|| {}));
    wait_for_available(&d, 2);

    // Parked workers hold two of the four pool threads
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let done = Arc::clone(&done);
        d.execute_or_fallback(move || {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    wait_until("all tasks to run", || done.load(Ordering::SeqCst) == 10);

    d.stop();
    pool.shutdown();
    pool.join();
    assert_eq!(d.stats().spawned, 2);
}

#[test]
fn test_accepted_tasks_run_once_across_concurrent_stop() {
    let d = Arc::new(
        Dispatcher::builder()
            .capacity(4)
            .idle_timeout(None)
            .build(ThreadPerTask::new("stop-race")),
    );
    d.start().unwrap();

    let next_id = Arc::new(AtomicUsize::new(0));
    let runs: Arc<Mutex<HashMap<usize, usize>>> = Arc::new(Mutex::new(HashMap::new()));
    let late_accept = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let d = Arc::clone(&d);
            let next_id = Arc::clone(&next_id);
            let runs = Arc::clone(&runs);
            let late_accept = Arc::clone(&late_accept);
            thread::spawn(move || {
                let mut accepted = Vec::new();
                loop {
                    let seen_state = d.state();
                    let id = next_id.fetch_add(1, Ordering::SeqCst);
                    let runs = Arc::clone(&runs);
                    let ok = d.try_execute(move || {
                        *runs.lock().unwrap().entry(id).or_insert(0) += 1;
                    });
                    if ok {
                        if seen_state != State::Running {
                            late_accept.store(true, Ordering::SeqCst);
                        }
                        accepted.push(id);
                    }
                    if seen_state == State::Stopped {
                        return accepted;
                    }
                }
            })
        })
        .collect();

    // Let the workers start and the producers get going
    wait_until("reserved tasks accepted", || d.stats().accepted >= 100);

    let stopper = {
        let d = Arc::clone(&d);
        thread::spawn(move || d.stop())
    };
    stopper.join().unwrap();
    assert_eq!(d.state(), State::Stopped);

    // Every worker has exited, so every accepted task has already run
    let ran = runs.lock().unwrap().clone();

    let mut accepted = Vec::new();
    for producer in producers {
        accepted.extend(producer.join().unwrap());
    }

    assert!(!late_accept.load(Ordering::SeqCst));
    assert!(!accepted.is_empty());
    assert_eq!(ran.len(), accepted.len());
    for id in &accepted {
        assert_eq!(ran.get(id), Some(&1), "task {} ran {:?} times", id, ran.get(id));
    }
    assert_eq!(d.stats().accepted as usize, accepted.len());
}
