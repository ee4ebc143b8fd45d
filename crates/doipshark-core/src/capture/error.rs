use thiserror::Error;

use crate::source::SourceError;

/// Errors raised by the worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker queue is full")]
    Saturated,
    #[error("worker pool is shut down")]
    ShutDown,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Fatal errors for one capture attempt.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture source failed: {0}")]
    Source(#[from] SourceError),
    #[error("frame of {length} bytes exceeds the {ceiling}-byte ceiling")]
    FrameTooLarge { length: usize, ceiling: usize },
    #[error("worker pool failed: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to spawn capture thread: {0}")]
    Spawn(String),
    #[error("capture already started")]
    AlreadyStarted,
    #[error("capture thread panicked")]
    Panicked,
}
