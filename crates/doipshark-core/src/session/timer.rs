//! Single-deadline timer thread owned by one session.

use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::debug;

pub(crate) enum TimerCommand {
    /// Replace any armed deadline.
    Arm { generation: u64, deadline: Instant },
    Cancel,
    Shutdown,
}

/// Receiver of expired deadlines.
pub(crate) trait Expire: Send + Sync + 'static {
    fn expired(&self, generation: u64);
}

pub(crate) struct Timer {
    commands: Sender<TimerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    pub(crate) fn spawn<T: Expire>(target: Weak<T>) -> std::io::Result<Self> {
        let (commands, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("doipshark-session-timer".to_string())
            .spawn(move || run(receiver, target))?;
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    pub(crate) fn arm(&self, generation: u64, deadline: Instant) {
        let _ = self.commands.send(TimerCommand::Arm {
            generation,
            deadline,
        });
    }

    pub(crate) fn cancel(&self) {
        let _ = self.commands.send(TimerCommand::Cancel);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let _ = self.commands.send(TimerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn run<T: Expire>(commands: Receiver<TimerCommand>, target: Weak<T>) {
    let mut armed: Option<(u64, Instant)> = None;
    loop {
        let command = match armed {
            Some((_, deadline)) => commands.recv_deadline(deadline),
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match command {
            Ok(TimerCommand::Arm {
                generation,
                deadline,
            }) => armed = Some((generation, deadline)),
            Ok(TimerCommand::Cancel) => armed = None,
            Ok(TimerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if let Some((generation, _)) = armed.take() {
                    match target.upgrade() {
                        Some(target) => target.expired(generation),
                        None => break,
                    }
                }
            }
        }
    }
    debug!("session timer stopped");
}
