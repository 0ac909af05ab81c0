use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use strata_core::types::{ProjectionStatus, StreamName};
use strata_core::{Result, StrataError};

/// Out-of-band control request posted by the projection manager,
/// observed by the runner at the start of its next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionCommand {
    Stop,
    Reset,
    Delete { delete_emitted_events: bool },
}

/// State shared between a projection runner and its manager.
///
/// The manager keeps one handle per registered name; every runner
/// created for that name is bound to the same handle, which carries
/// status, cursors, accumulated state, the pending control command and
/// the reentrancy guard.
pub struct ProjectionHandle {
    status: AtomicU8,
    running: AtomicBool,
    deleted: AtomicBool,
    command: Mutex<Option<ProjectionCommand>>,
    pub(crate) positions: Mutex<BTreeMap<StreamName, u64>>,
    pub(crate) state: Mutex<Value>,
}

impl ProjectionHandle {
    pub(crate) fn new() -> Self {
        Self {
            status: AtomicU8::new(encode_status(ProjectionStatus::Idle)),
            running: AtomicBool::new(false),
            deleted: AtomicBool::new(false),
            command: Mutex::new(None),
            positions: Mutex::new(BTreeMap::new()),
            state: Mutex::new(Value::Null),
        }
    }

    pub fn status(&self) -> ProjectionStatus {
        decode_status(self.status.load(Ordering::SeqCst))
    }

    pub(crate) fn set_status(&self, status: ProjectionStatus) {
        self.status.store(encode_status(status), Ordering::SeqCst);
    }

    pub fn stream_positions(&self) -> BTreeMap<StreamName, u64> {
        self.positions.lock().clone()
    }

    pub fn state(&self) -> Value {
        self.state.lock().clone()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }

    /// Post a control command and reflect it in the visible status.
    pub(crate) fn post_command(&self, command: ProjectionCommand) {
        self.set_status(match command {
            ProjectionCommand::Stop => ProjectionStatus::Stopping,
            ProjectionCommand::Reset => ProjectionStatus::Resetting,
            ProjectionCommand::Delete { .. } => ProjectionStatus::Deleting,
        });
        *self.command.lock() = Some(command);
    }

    pub(crate) fn take_command(&self) -> Option<ProjectionCommand> {
        self.command.lock().take()
    }
}

/// RAII token for the "exactly one runner per projection" rule.
///
/// Acquiring flips the running flag and sets status to Running;
/// dropping (normal exit or error propagation alike) restores Idle.
pub(crate) struct RunGuard {
    handle: Arc<ProjectionHandle>,
}

impl RunGuard {
    pub(crate) fn acquire(handle: &Arc<ProjectionHandle>) -> Result<Self> {
        if handle
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(StrataError::RuntimeMisuse(
                "Another projection process is already running".into(),
            ));
        }
        handle.set_status(ProjectionStatus::Running);
        Ok(Self {
            handle: Arc::clone(handle),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.handle.set_status(ProjectionStatus::Idle);
        self.handle.running.store(false, Ordering::SeqCst);
    }
}

fn encode_status(status: ProjectionStatus) -> u8 {
    match status {
        ProjectionStatus::Idle => 0,
        ProjectionStatus::Running => 1,
        ProjectionStatus::Stopping => 2,
        ProjectionStatus::Deleting => 3,
        ProjectionStatus::Resetting => 4,
    }
}

fn decode_status(raw: u8) -> ProjectionStatus {
    match raw {
        1 => ProjectionStatus::Running,
        2 => ProjectionStatus::Stopping,
        3 => ProjectionStatus::Deleting,
        4 => ProjectionStatus::Resetting,
        _ => ProjectionStatus::Idle,
    }
}
