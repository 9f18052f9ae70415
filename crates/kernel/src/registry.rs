use std::collections::BTreeMap;

use thiserror::Error;
use threads::{Condition, KThread, Lock};
use types::{Config, Pid};

use crate::process::{ExitStatus, ProcessState};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    #[error("a process cannot join itself")]
    SelfJoin,
    #[error("process {0} is not a child of the caller")]
    NotAChild(Pid),
}

#[derive(Debug)]
struct ProcessRecord {
    name: String,
    parent: Option<Pid>,
    /// Children in creation order.
    children: Vec<Pid>,
    state: ProcessState,
    status: Option<ExitStatus>,
    thread: Option<KThread>,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_pid: Pid,
    records: BTreeMap<Pid, ProcessRecord>,
}

impl RegistryState {
    /// Drops a record and detaches it from its parent.
    fn reap(&mut self, pid: Pid) -> Option<ProcessRecord> {
        let record = self.records.remove(&pid)?;
        if let Some(parent) = record.parent.and_then(|p| self.records.get_mut(&p)) {
            parent.children.retain(|&c| c != pid);
        }
        tracing::trace!(target: "kernel::registry", pid, name = %record.name, "reaped");
        Some(record)
    }
}

/// The process tree.
///
/// Parents own their children by pid; children point back at their parent
/// by pid. All links change under one lock, and `exited` is signalled
/// whenever some process publishes its exit status.
///
/// A record lives until its status has been collected: by the parent's
/// `join`, immediately at exit for a process nobody can join, or by
/// [`ProcessRegistry::wait`] for the root.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    state: Lock<RegistryState>,
    exited: Condition,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            state: Lock::new(RegistryState {
                next_pid: Config::ROOT_PID,
                records: BTreeMap::new(),
            }),
            exited: Condition::new(),
        }
    }

    /// Creates a record in the `Created` state and links it under `parent`.
    pub fn register(&self, parent: Option<Pid>, name: &str) -> Pid {
        let mut state = self.state.acquire();
        let pid = state.next_pid;
        state.next_pid += 1;

        let parent = parent.filter(|p| state.records.contains_key(p));
        if let Some(record) = parent.and_then(|p| state.records.get_mut(&p)) {
            record.children.push(pid);
        }
        state.records.insert(
            pid,
            ProcessRecord {
                name: name.to_string(),
                parent,
                children: Vec::new(),
                state: ProcessState::Created,
                status: None,
                thread: None,
            },
        );
        tracing::debug!(target: "kernel::registry", pid, ?parent, name, "registered");
        pid
    }

    /// Undoes `register` for a process that never started.
    pub fn unregister(&self, pid: Pid) {
        self.state.acquire().reap(pid);
    }

    pub fn mark_running(&self, pid: Pid) {
        let mut state = self.state.acquire();
        if let Some(record) = state.records.get_mut(&pid) {
            if record.state == ProcessState::Created {
                record.state = ProcessState::Running;
            }
        }
    }

    /// Stores the thread handle so whoever collects the status can join
    /// it. A process that is already gone just drops the handle.
    pub fn attach_thread(&self, pid: Pid, thread: KThread) {
        let mut state = self.state.acquire();
        if let Some(record) = state.records.get_mut(&pid) {
            record.thread = Some(thread);
        }
    }

    /// Waits for `child` to exit and collects its status.
    ///
    /// Fails at once when `child` is the caller or not one of the caller's
    /// children. Each child can be joined successfully only once.
    pub fn join(&self, parent: Pid, child: Pid) -> Result<ExitStatus, JoinError> {
        if parent == child {
            return Err(JoinError::SelfJoin);
        }
        let state = self.state.acquire();
        let is_child = state
            .records
            .get(&parent)
            .is_some_and(|record| record.children.contains(&child));
        if !is_child {
            return Err(JoinError::NotAChild(child));
        }

        tracing::debug!(target: "kernel::registry", parent, child, "joining");
        let mut state = self.exited.sleep_until(state, |state| {
            state
                .records
                .get(&child)
                .is_none_or(|record| record.status.is_some())
        });

        // The child stays linked to us until we reap it, so it is still here.
        let record = state.reap(child).ok_or(JoinError::NotAChild(child))?;
        drop(state);

        let status = record.status.ok_or(JoinError::NotAChild(child))?;
        if let Some(thread) = record.thread {
            thread.join();
        }
        tracing::debug!(target: "kernel::registry", parent, child, %status, "joined");
        Ok(status)
    }

    /// Publishes `pid`'s exit status and wakes every joiner.
    ///
    /// Children are orphaned: their parent link is cleared and the ones
    /// that already exited are reaped. A process without a parent is
    /// reaped here, except the root, whose status [`Self::wait`] collects.
    pub fn exit(&self, pid: Pid, status: ExitStatus) {
        let mut state = self.state.acquire();
        let Some(record) = state.records.get_mut(&pid) else {
            tracing::warn!(target: "kernel::registry", pid, "exit from unknown process");
            return;
        };
        if record.status.is_some() {
            return;
        }
        record.status = Some(status);
        record.state = ProcessState::Exited;
        let children = std::mem::take(&mut record.children);
        let orphan = record.parent.is_none();

        for child in children {
            let Some(record) = state.records.get_mut(&child) else {
                continue;
            };
            record.parent = None;
            if record.status.is_some() {
                state.reap(child);
            }
        }
        if orphan && pid != Config::ROOT_PID {
            state.reap(pid);
        }
        drop(state);

        tracing::debug!(target: "kernel::registry", pid, %status, "exited");
        self.exited.wake_all();
    }

    /// Blocks until `pid` exits, then removes its record and returns the
    /// status. Meant for the root, which has no parent to join it.
    pub fn wait(&self, pid: Pid) -> Option<ExitStatus> {
        let state = self.state.acquire();
        let mut state = self.exited.sleep_until(state, |state| {
            state
                .records
                .get(&pid)
                .is_none_or(|record| record.status.is_some())
        });
        let record = state.reap(pid)?;
        drop(state);
        if let Some(thread) = record.thread {
            thread.join();
        }
        record.status
    }

    pub fn state_of(&self, pid: Pid) -> Option<ProcessState> {
        self.state.acquire().records.get(&pid).map(|r| r.state)
    }

    pub fn status_of(&self, pid: Pid) -> Option<ExitStatus> {
        self.state.acquire().records.get(&pid).and_then(|r| r.status)
    }

    pub fn parent_of(&self, pid: Pid) -> Option<Pid> {
        self.state.acquire().records.get(&pid).and_then(|r| r.parent)
    }

    pub fn children_of(&self, pid: Pid) -> Vec<Pid> {
        self.state
            .acquire()
            .records
            .get(&pid)
            .map(|r| r.children.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.state.acquire().records.contains_key(&pid)
    }

    /// Processes that have been created and not yet exited.
    pub fn live_count(&self) -> usize {
        self.state
            .acquire()
            .records
            .values()
            .filter(|r| r.state != ProcessState::Exited)
            .count()
    }
}
