//! Watch mode
//!
//! Tasks run once, then their `sources` are polled and the tasks rerun
//! whenever a file is added, removed or modified. Failures are reported
//! and watching continues until the process is interrupted.

use crate::error::{ExecutionError, ExecutionResult};
use crate::executor::LocalExecutor;
use crate::taskfile::Call;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// Interval used when `--interval` is zero
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Granularity at which the stop flag is checked while sleeping
const STOP_POLL: Duration = Duration::from_millis(100);

type Snapshot = BTreeMap<PathBuf, Option<SystemTime>>;

/// Parse a duration written like `500ms`, `5s`, `1m30s` or `1.5h`.
///
/// Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `0` is allowed.
pub fn parse_interval(raw: &str) -> ExecutionResult<Duration> {
    let invalid = || ExecutionError::InvalidInterval(raw.to_string());
    let mut rest = raw.trim();

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        nanos += value * unit_nanos;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Run `calls` and rerun them on every change of their sources
pub fn watch(executor: &LocalExecutor, calls: &[Call], interval: Duration) -> ExecutionResult<()> {
    let interval = if interval.is_zero() {
        DEFAULT_INTERVAL
    } else {
        interval
    };
    let logger = executor.logger();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || stop_handler.store(true, Ordering::SeqCst)) {
        logger.warn(&format!("task: could not install interrupt handler: {}", e));
    }

    let names: Vec<&str> = calls.iter().map(|c| c.task.as_str()).collect();
    logger.info(&format!("task: Started watching for tasks: {}", names.join(", ")));

    run_and_report(executor, calls);
    let mut snapshot = take_snapshot(executor, calls)?;

    while !stop.load(Ordering::SeqCst) {
        sleep_unless_stopped(interval, &stop);
        if stop.load(Ordering::SeqCst) {
            break;
        }

        let current = match take_snapshot(executor, calls) {
            Ok(current) => current,
            Err(e) => {
                logger.error(&format!("task: {}", e));
                continue;
            }
        };
        if current != snapshot {
            logger.debug("task: sources changed");
            snapshot = current;
            run_and_report(executor, calls);
        }
    }

    logger.info("task: Signal received: interrupt");
    Ok(())
}

fn run_and_report(executor: &LocalExecutor, calls: &[Call]) {
    if let Err(e) = executor.run_once(calls) {
        executor.logger().error(&format!("task: {}", e));
    }
}

fn take_snapshot(executor: &LocalExecutor, calls: &[Call]) -> ExecutionResult<Snapshot> {
    Ok(executor
        .watched_files(calls)?
        .into_iter()
        .map(|path| {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
            (path, modified)
        })
        .collect())
}

fn sleep_unless_stopped(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        let now = Instant::now();
        if now >= deadline || stop.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep(STOP_POLL.min(deadline - now));
    }
}
