use crossbeam_channel::Sender;
use log::{debug, error};

use crate::PacketRecord;

use super::error::CaptureError;

/// Receiver of classified records.
///
/// Called from worker threads, possibly concurrently; delivery order across
/// records is not guaranteed. Implementations must not block for long.
pub trait RecordSink: Send + Sync {
    fn deliver(&self, record: PacketRecord);

    /// Called once when the capture loop ends on a fatal error.
    fn capture_failed(&self, error: &CaptureError) {
        error!("capture failed: {error}");
    }
}

/// Sink forwarding records into a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<PacketRecord>,
}

impl ChannelSink {
    pub fn new(sender: Sender<PacketRecord>) -> Self {
        Self { sender }
    }
}

impl RecordSink for ChannelSink {
    fn deliver(&self, record: PacketRecord) {
        if self.sender.send(record).is_err() {
            debug!("record receiver dropped; discarding record");
        }
    }
}

/// Sink calling a closure per record.
pub struct FnSink<F>(pub F);

impl<F> RecordSink for FnSink<F>
where
    F: Fn(PacketRecord) + Send + Sync,
{
    fn deliver(&self, record: PacketRecord) {
        (self.0)(record)
    }
}
