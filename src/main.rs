//! Load driver: tasks that re-dispatch themselves, preferring reserved
//! threads and falling back to the backing pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use reserved_dispatch::config::Config;
use reserved_dispatch::executor::QueuedPool;
use reserved_dispatch::logging;
use reserved_dispatch::observability::Metrics;
use reserved_dispatch::reserved::{Dispatcher, DispatcherBuilder, Route};

/// How long to wait for the run to finish before giving up.
const RUN_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared progress of one load run.
struct Run {
    remaining: AtomicU64,
    used_reserved: AtomicU64,
    used_pool: AtomicU64,
    failed: AtomicU64,
    dispatched: mpsc::Sender<()>,
}

/// Claim one dispatch from the budget and hand the next step of the chain
/// to the dispatcher.
fn step(run: Arc<Run>, reserved: Arc<Dispatcher>) {
    let claimed = run
        .remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok();
    if !claimed {
        return;
    }

    let next_run = Arc::clone(&run);
    let next_reserved = Arc::clone(&reserved);
    match reserved.execute_or_fallback(move || step(next_run, next_reserved)) {
        Ok(Route::Reserved) => {
            run.used_reserved.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Route::Fallback) => {
            run.used_pool.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            run.failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "dispatch failed");
        }
    }
    let _ = run.dispatched.send(());
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    logging::init(&config.logging)?;

    info!(version = reserved_dispatch::VERSION, "starting reserved_dispatch load run");
    config.log_summary();

    let pool = Arc::new(QueuedPool::with_capacity(
        config.backing.threads(),
        config.backing.queue_capacity(),
        "backing",
    )?);

    let reserved = Arc::new(
        DispatcherBuilder::from_config(&config.reserved)
            .name("reserved")
            .build(Arc::clone(&pool)),
    );
    reserved.start()?;

    let loops = config.driver.loops;
    let (dispatched_tx, dispatched_rx) = mpsc::channel();
    let run = Arc::new(Run {
        remaining: AtomicU64::new(loops),
        used_reserved: AtomicU64::new(0),
        used_pool: AtomicU64::new(0),
        failed: AtomicU64::new(0),
        dispatched: dispatched_tx,
    });

    let started = Instant::now();
    for _ in 0..config.driver.chains {
        step(Arc::clone(&run), Arc::clone(&reserved));
    }

    let deadline = started + RUN_TIMEOUT;
    let mut seen = 0u64;
    while seen < loops {
        let left = deadline.saturating_duration_since(Instant::now());
        match dispatched_rx.recv_timeout(left) {
            Ok(()) => seen += 1,
            Err(_) => {
                warn!(seen, loops, "load run timed out");
                break;
            }
        }
    }
    let elapsed = started.elapsed();

    // Parked reserved workers hold pool threads; retire them before joining.
    reserved.stop();
    pool.shutdown();
    pool.join();
    seen += dispatched_rx.try_iter().count() as u64;

    let used_reserved = run.used_reserved.load(Ordering::Relaxed);
    let used_pool = run.used_pool.load(Ordering::Relaxed);
    let failed = run.failed.load(Ordering::Relaxed);

    info!(
        reserved = used_reserved,
        pool = used_pool,
        failed,
        total = loops,
        elapsed_ms = elapsed.as_millis() as u64,
        "load run finished"
    );

    let stats = reserved.stats();
    println!("{}", serde_json::to_string(&stats)?);

    if config.driver.print_metrics {
        let metrics = Metrics::new().map_err(|e| e.to_string())?;
        metrics.observe(&stats, reserved.name());
        print!("{}", metrics.export().map_err(|e| e.to_string())?);
    }

    if used_reserved + used_pool + failed != seen {
        return Err(format!(
            "accounting mismatch: reserved={} pool={} failed={} dispatched={}",
            used_reserved, used_pool, failed, seen
        )
        .into());
    }

    Ok(())
}
