//! Bounded worker pool with idle recycling.
//!
//! Workers are spawned on demand up to `max_workers`; the first
//! `min_workers` are started eagerly and never retire. A worker idle for
//! longer than `idle_timeout` exits while more than `min_workers` are alive.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use log::{debug, warn};

use crate::config::PoolConfig;

use super::error::PoolError;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    live: AtomicUsize,
    idle: AtomicUsize,
    shut_down: AtomicBool,
}

pub struct WorkerPool {
    config: PoolConfig,
    sender: Mutex<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
    state: Arc<PoolState>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicUsize,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let (sender, receiver) = bounded(config.queue_capacity.max(1));
        let pool = Self {
            config,
            sender: Mutex::new(Some(sender)),
            receiver,
            state: Arc::new(PoolState {
                live: AtomicUsize::new(0),
                idle: AtomicUsize::new(0),
                shut_down: AtomicBool::new(false),
            }),
            handles: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        };
        for _ in 0..pool.config.min_workers.min(pool.config.max_workers) {
            pool.spawn_worker()?;
        }
        Ok(pool)
    }

    /// Queue a job without blocking.
    ///
    /// # Errors
    /// `Saturated` when the queue is full; the job is dropped.
    pub fn submit(&self, job: Job) -> Result<(), PoolError> {
        if self.state.shut_down.load(Ordering::Acquire) {
            return Err(PoolError::ShutDown);
        }
        {
            let sender = self.sender.lock().map_err(|_| PoolError::ShutDown)?;
            let sender = sender.as_ref().ok_or(PoolError::ShutDown)?;
            sender.try_send(job).map_err(|err| match err {
                TrySendError::Full(_) => PoolError::Saturated,
                TrySendError::Disconnected(_) => PoolError::ShutDown,
            })?;
        }
        if self.state.idle.load(Ordering::Acquire) == 0 {
            match self.spawn_worker() {
                Ok(_) => {}
                Err(err) if self.state.live.load(Ordering::Acquire) == 0 => return Err(err),
                Err(err) => warn!("{err}; continuing with existing workers"),
            }
        }
        Ok(())
    }

    pub fn live_workers(&self) -> usize {
        self.state.live.load(Ordering::Acquire)
    }

    /// Stop accepting jobs, drain the queue, and join every worker.
    pub fn shutdown(&self) {
        if self.state.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let handles = match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(_) => return,
        };
        for handle in handles {
            if handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        debug!("worker pool shut down");
    }

    /// Start one more worker if below `max_workers`. Returns whether a
    /// worker was started.
    fn spawn_worker(&self) -> Result<bool, PoolError> {
        let max = self.config.max_workers.max(1);
        let reserved = self
            .state
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < max).then_some(live + 1)
            })
            .is_ok();
        if !reserved {
            return Ok(false);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let receiver = self.receiver.clone();
        let state = Arc::clone(&self.state);
        let min = self.config.min_workers;
        let idle_timeout = self.config.idle_timeout();
        let spawned = thread::Builder::new()
            .name(format!("doipshark-worker-{id}"))
            .spawn(move || worker_loop(receiver, state, min, idle_timeout));
        match spawned {
            Ok(handle) => {
                if let Ok(mut handles) = self.handles.lock() {
                    handles.retain(|handle| !handle.is_finished());
                    handles.push(handle);
                }
                debug!("spawned worker {id}");
                Ok(true)
            }
            Err(err) => {
                self.state.live.fetch_sub(1, Ordering::AcqRel);
                Err(PoolError::Spawn(err.to_string()))
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(receiver: Receiver<Job>, state: Arc<PoolState>, min: usize, idle_timeout: Duration) {
    loop {
        state.idle.fetch_add(1, Ordering::AcqRel);
        let next = receiver.recv_timeout(idle_timeout);
        state.idle.fetch_sub(1, Ordering::AcqRel);
        match next {
            Ok(job) => {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!("worker job panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if receiver.is_empty() && try_retire(&state, min) {
                    debug!("idle worker retired");
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                state.live.fetch_sub(1, Ordering::AcqRel);
                return;
            }
        }
    }
}

fn try_retire(state: &PoolState, min: usize) -> bool {
    state
        .live
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
            (live > min).then(|| live - 1)
        })
        .is_ok()
}
