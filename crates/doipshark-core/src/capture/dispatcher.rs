//! Capture thread and fan-out to the worker pool.
//!
//! The capture thread reads frames from a [`PacketSource`], decodes each one
//! synchronously and hands the record plus its transport payload to the
//! [`WorkerPool`]. Workers run the filter and DoIP/UDS classification, stamp
//! the record index and deliver to the [`RecordSink`].
//!
//! Version française (résumé):
//! Un thread de capture lit les trames, les décode puis confie le
//! classement DoIP/UDS au pool de travailleurs. Une file pleine fait
//! abandonner la trame (comptée), sans jamais bloquer la capture.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use arc_swap::ArcSwap;
use log::{debug, info, warn};
use pcap_parser::Linktype;
use serde::Serialize;

use crate::config::{CaptureConfig, PoolConfig};
use crate::filter::FilterRule;
use crate::source::{PacketSource, SourceError};

use super::classify::{WorkItem, classify};
use super::error::{CaptureError, PoolError};
use super::pool::WorkerPool;
use super::sink::RecordSink;

/// Snapshot of the dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Frames read from the source.
    pub frames_seen: u64,
    /// Frames dropped while paused or because the worker queue was full.
    pub frames_dropped: u64,
    /// Frames with a link type the decoder does not handle.
    pub frames_skipped: u64,
    pub records_delivered: u64,
}

#[derive(Default)]
struct Counters {
    frames_seen: AtomicU64,
    frames_dropped: AtomicU64,
    frames_skipped: AtomicU64,
    records_delivered: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            frames_seen: self.frames_seen.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            records_delivered: self.records_delivered.load(Ordering::Relaxed),
        }
    }
}

struct DispatchShared {
    filter: ArcSwap<FilterRule>,
    sink: Arc<dyn RecordSink>,
    next_index: AtomicU64,
    max_doip_payload: u32,
    counters: Counters,
    paused: AtomicBool,
    stop: AtomicBool,
}

impl DispatchShared {
    fn process(&self, item: WorkItem) {
        let filter = self.filter.load();
        for mut record in classify(item, &filter, self.max_doip_payload) {
            record.index = self.next_index.fetch_add(1, Ordering::AcqRel) + 1;
            self.counters.records_delivered.fetch_add(1, Ordering::Relaxed);
            self.sink.deliver(record);
        }
    }
}

type CaptureHandle = JoinHandle<Result<(), CaptureError>>;

/// Owns one capture attempt: the capture thread, its worker pool and the
/// shared filter.
///
/// Every method takes `&self`, so the dispatcher can sit behind an `Arc`
/// and be paused or stopped from another thread.
pub struct CaptureDispatcher {
    capture: CaptureConfig,
    pool: PoolConfig,
    shared: Arc<DispatchShared>,
    started: AtomicBool,
    handle: Mutex<Option<CaptureHandle>>,
}

impl CaptureDispatcher {
    pub fn new(
        capture: CaptureConfig,
        pool: PoolConfig,
        filter: FilterRule,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let shared = DispatchShared {
            filter: ArcSwap::from_pointee(filter),
            sink,
            next_index: AtomicU64::new(0),
            max_doip_payload: capture.max_doip_payload,
            counters: Counters::default(),
            paused: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        };
        Self {
            capture,
            pool,
            shared: Arc::new(shared),
            started: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// Start the capture thread on `source`.
    ///
    /// # Errors
    /// `AlreadyStarted` on a second call; pool or thread spawn failures.
    pub fn start<S>(&self, source: S) -> Result<(), CaptureError>
    where
        S: PacketSource + Send + 'static,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::AlreadyStarted);
        }
        let pool = WorkerPool::new(self.pool.clone())?;
        let shared = Arc::clone(&self.shared);
        let ceiling = self.capture.frame_ceiling;
        let handle = thread::Builder::new()
            .name("doipshark-capture".to_string())
            .spawn(move || run_capture(source, pool, shared, ceiling))
            .map_err(|err| CaptureError::Spawn(err.to_string()))?;
        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
        Ok(())
    }

    /// Open the configured interface and start capturing from it.
    #[cfg(feature = "live")]
    pub fn start_live(&self) -> Result<(), CaptureError> {
        let source = crate::source::LiveCapture::open(&self.capture)?;
        self.start(source)
    }

    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
        info!("capture paused");
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
        info!("capture resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Replace the filter; records classified after the swap use it.
    pub fn set_filter(&self, filter: FilterRule) {
        self.shared.filter.store(Arc::new(filter));
    }

    pub fn filter(&self) -> Arc<FilterRule> {
        self.shared.filter.load_full()
    }

    pub fn stats(&self) -> CaptureStats {
        self.shared.counters.snapshot()
    }

    pub fn is_running(&self) -> bool {
        match self.handle.lock() {
            Ok(slot) => slot.as_ref().is_some_and(|handle| !handle.is_finished()),
            Err(_) => false,
        }
    }

    /// Ask the capture thread to stop after the current read.
    pub fn request_stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Stop and wait for the capture thread and its workers.
    pub fn stop(&self) -> Result<(), CaptureError> {
        self.request_stop();
        self.join()
    }

    /// Wait for the capture thread to finish on its own.
    ///
    /// Returns the fatal error that ended the capture, if any. Subsequent
    /// calls return `Ok(())`.
    pub fn join(&self) -> Result<(), CaptureError> {
        let handle = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match handle {
            Some(handle) => handle.join().map_err(|_| CaptureError::Panicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for CaptureDispatcher {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            debug!("capture ended with error during drop: {err}");
        }
    }
}

fn run_capture<S: PacketSource>(
    mut source: S,
    pool: WorkerPool,
    shared: Arc<DispatchShared>,
    ceiling: usize,
) -> Result<(), CaptureError> {
    info!("capture started");
    let result = pump(&mut source, &pool, &shared, ceiling);
    pool.shutdown();
    let stats = shared.counters.snapshot();
    match &result {
        Ok(()) => info!(
            "capture stopped: {} frames, {} dropped, {} records",
            stats.frames_seen, stats.frames_dropped, stats.records_delivered
        ),
        Err(err) => shared.sink.capture_failed(err),
    }
    result
}

fn pump<S: PacketSource>(
    source: &mut S,
    pool: &WorkerPool,
    shared: &Arc<DispatchShared>,
    ceiling: usize,
) -> Result<(), CaptureError> {
    let counters = &shared.counters;
    while !shared.stop.load(Ordering::Acquire) {
        let event = match source.next_packet() {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(SourceError::Timeout) => continue,
            Err(err) => return Err(err.into()),
        };
        counters.frames_seen.fetch_add(1, Ordering::Relaxed);

        let length = event.captured_len();
        if length > ceiling {
            return Err(CaptureError::FrameTooLarge { length, ceiling });
        }
        if shared.paused.load(Ordering::Acquire) {
            counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        if event.linktype != Linktype::ETHERNET {
            counters.frames_skipped.fetch_add(1, Ordering::Relaxed);
            debug!("skipping frame with linktype {}", event.linktype.0);
            continue;
        }

        let item = WorkItem::from_event(&event);
        let worker = Arc::clone(shared);
        match pool.submit(Box::new(move || worker.process(item))) {
            Ok(()) => {}
            Err(PoolError::Saturated) => {
                counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("worker queue full; frame dropped");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
