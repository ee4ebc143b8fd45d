//! Threaded capture pipeline: dispatcher, worker pool, classification and
//! record sinks.

pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod pool;
pub mod sink;

pub use classify::{WorkItem, classify};
pub use dispatcher::{CaptureDispatcher, CaptureStats};
pub use error::{CaptureError, PoolError};
pub use pool::{Job, WorkerPool};
pub use sink::{ChannelSink, FnSink, RecordSink};
