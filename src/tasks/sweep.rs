//! TTL Sweep Task
//!
//! Background task that periodically reclaims expired and invalidated entries.
//! Runs as a tokio task when a runtime is available, otherwise on a dedicated
//! thread driving its own single-threaded runtime.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::Reclaimed;

/// Something the sweep task can clean.
pub trait Sweep: Send + Sync + 'static {
    /// Runs one full cleanup pass. May block on shard locks.
    fn sweep(&self) -> Reclaimed;
}

#[derive(Debug)]
enum Runner {
    Task(JoinHandle<()>),
    Thread(thread::JoinHandle<()>),
}

// == Sweep Handle ==
/// Owner of a running sweep loop.
///
/// Dropping the handle closes the shutdown channel, which stops the loop at
/// its next wake-up. [`SweepHandle::shutdown`] and [`SweepHandle::stop`] also
/// wait for it to exit where they can.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown_tx: watch::Sender<bool>,
    runner: Runner,
}

impl SweepHandle {
    /// Signals the loop to stop and waits until it has exited.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        match self.runner {
            Runner::Task(task) => {
                if let Err(e) = task.await {
                    warn!("Sweep task ended abnormally: {}", e);
                }
            }
            Runner::Thread(thread) => {
                let joined = match tokio::runtime::Handle::try_current() {
                    Ok(_) => tokio::task::spawn_blocking(move || thread.join())
                        .await
                        .unwrap_or(Ok(())),
                    Err(_) => thread.join(),
                };
                if joined.is_err() {
                    warn!("Sweep thread panicked");
                }
            }
        }
    }

    /// Signals the loop to stop without an async context. Joins a sweep
    /// thread; a tokio task is left to exit on its own.
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Runner::Thread(thread) = self.runner {
            if thread.join().is_err() {
                warn!("Sweep thread panicked");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.runner {
            Runner::Task(task) => task.is_finished(),
            Runner::Thread(thread) => thread.is_finished(),
        }
    }
}

/// Spawns a task that calls `target.sweep()` every `interval` until the
/// returned handle is shut down or dropped.
///
/// Must be called from within a tokio runtime.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(shards.clone(), Duration::from_secs(300));
/// // Later, during shutdown:
/// handle.shutdown().await;
/// ```
pub fn spawn_sweep_task<S: Sweep>(target: Arc<S>, interval: Duration) -> SweepHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(sweep_loop(target, interval, shutdown_rx));

    SweepHandle {
        shutdown_tx,
        runner: Runner::Task(task),
    }
}

/// Runs the same loop as [`spawn_sweep_task`] on a dedicated thread, for
/// callers that have no tokio runtime.
pub fn spawn_sweep_thread<S: Sweep>(
    target: Arc<S>,
    interval: Duration,
) -> io::Result<SweepHandle> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let thread = thread::Builder::new()
        .name("shardcache-sweep".to_string())
        .spawn(move || runtime.block_on(sweep_loop(target, interval, shutdown_rx)))?;

    Ok(SweepHandle {
        shutdown_tx,
        runner: Runner::Thread(thread),
    })
}

async fn sweep_loop<S: Sweep>(
    target: Arc<S>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(
        "Starting TTL sweep task with interval of {} ms",
        interval.as_millis()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Shard locks block, keep them off the async workers
                let pass = Arc::clone(&target);
                match tokio::task::spawn_blocking(move || pass.sweep()).await {
                    Ok(reclaimed) if reclaimed.entries > 0 => info!(
                        "TTL sweep: reclaimed {} entries ({} bytes)",
                        reclaimed.entries, reclaimed.bytes
                    ),
                    Ok(_) => debug!("TTL sweep: nothing to reclaim"),
                    Err(e) => warn!("TTL sweep pass failed: {}", e),
                }
            }
            // Fires on an explicit signal and when the sender is dropped
            _ = shutdown_rx.changed() => {
                debug!("TTL sweep task stopping");
                break;
            }
        }
    }
}
