//! System call handlers.
//!
//! Every handler validates its arguments against the caller's address
//! space and descriptor table before acting. Bad arguments return -1 to
//! the caller; only protocol violations end the process.

use std::sync::Arc;

use types::*;

use crate::kernel::Kernel;
use crate::process::{ExitStatus, KillReason, Process};

mod file;
mod process;

/// Result of one system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Resume the caller with this value in the result register.
    Return(i32),
    /// The caller does not resume.
    Terminate(ExitStatus),
}

const ERROR: SyscallOutcome = SyscallOutcome::Return(Config::SYSCALL_ERROR);

pub fn dispatch(kernel: &Arc<Kernel>, caller: &mut Process, call_id: u32, args: [u32; 4]) -> SyscallOutcome {
    tracing::debug!(
        target: "kernel::syscall",
        pid = caller.pid,
        call = syscall_name(call_id),
        args = format_args!("[0x{:x}, 0x{:x}, 0x{:x}, 0x{:x}]", args[0], args[1], args[2], args[3]),
    );
    let outcome = match call_id {
        SYSCALL_HALT => process::sys_halt(kernel, caller),
        SYSCALL_EXIT => process::sys_exit(args[0]),
        SYSCALL_EXEC => process::sys_exec(kernel, caller, args[0], args[1], args[2]),
        SYSCALL_JOIN => process::sys_join(kernel, caller, args[0], args[1]),
        SYSCALL_CREATE => file::sys_open(kernel, caller, args[0], true),
        SYSCALL_OPEN => file::sys_open(kernel, caller, args[0], false),
        SYSCALL_READ => file::sys_read(caller, args[0], args[1], args[2]),
        SYSCALL_WRITE => file::sys_write(caller, args[0], args[1], args[2]),
        SYSCALL_CLOSE => file::sys_close(caller, args[0]),
        SYSCALL_UNLINK => file::sys_unlink(kernel, caller, args[0]),
        _ => {
            tracing::warn!(target: "kernel::syscall", pid = caller.pid, call_id, "unknown syscall");
            SyscallOutcome::Terminate(ExitStatus::Killed(KillReason::UnknownSyscall(call_id)))
        }
    };
    if let SyscallOutcome::Return(value) = outcome {
        tracing::trace!(target: "kernel::syscall", pid = caller.pid, call = syscall_name(call_id), value);
    }
    outcome
}

/// Reads a file name or argument string from the caller's memory.
fn user_string(caller: &Process, addr: u32) -> Option<String> {
    let text = caller.space.read_string(addr, Config::MAX_STRING_LEN);
    if text.is_none() {
        tracing::debug!(
            target: "kernel::syscall",
            pid = caller.pid,
            addr = format_args!("0x{:08x}", addr),
            "bad string argument"
        );
    }
    text
}

/// Interprets a register as a non-negative int.
fn non_negative(value: u32) -> Option<usize> {
    let value = value as i32;
    (value >= 0).then_some(value as usize)
}
