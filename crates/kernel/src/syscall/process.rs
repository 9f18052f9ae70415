use std::sync::Arc;

use types::{Config, Pid};

use super::{ERROR, SyscallOutcome, non_negative, user_string};
use crate::kernel::Kernel;
use crate::loader::argument_block_size;
use crate::process::{ExitStatus, KillReason, Process};

pub(super) fn sys_halt(kernel: &Arc<Kernel>, caller: &Process) -> SyscallOutcome {
    if caller.pid != Config::ROOT_PID {
        tracing::warn!(target: "kernel::syscall", pid = caller.pid, "halt from non-root process");
        return SyscallOutcome::Terminate(ExitStatus::Killed(KillReason::IllegalHalt));
    }
    kernel.machine().halt();
    SyscallOutcome::Terminate(ExitStatus::Exited(0))
}

pub(super) fn sys_exit(status: u32) -> SyscallOutcome {
    SyscallOutcome::Terminate(ExitStatus::Exited(status as i32))
}

pub(super) fn sys_exec(
    kernel: &Arc<Kernel>,
    caller: &mut Process,
    name_addr: u32,
    argc: u32,
    argv_addr: u32,
) -> SyscallOutcome {
    let Some(name) = user_string(caller, name_addr) else {
        return ERROR;
    };
    if !name.ends_with(Config::EXECUTABLE_SUFFIX) {
        tracing::debug!(target: "kernel::syscall", pid = caller.pid, program = %name, "not an executable name");
        return ERROR;
    }
    let Some(argc) = non_negative(argc).filter(|&n| n <= Config::MAX_EXEC_ARGS) else {
        return ERROR;
    };

    let mut args = Vec::with_capacity(argc);
    for i in 0..argc {
        let Some(pointer) = argv_addr
            .checked_add((i * 4) as u32)
            .and_then(|addr| caller.space.read_u32(addr))
        else {
            return ERROR;
        };
        let Some(arg) = user_string(caller, pointer) else {
            return ERROR;
        };
        args.push(arg);
        if argument_block_size(&args) > Config::PAGE_SIZE {
            return ERROR;
        }
    }

    match kernel.spawn(Some(caller.pid), &name, &args) {
        Ok(pid) => SyscallOutcome::Return(pid as i32),
        Err(err) => {
            tracing::debug!(target: "kernel::syscall", pid = caller.pid, program = %name, error = %err, "exec failed");
            ERROR
        }
    }
}

pub(super) fn sys_join(kernel: &Arc<Kernel>, caller: &mut Process, child: u32, status_addr: u32) -> SyscallOutcome {
    let child = child as Pid;
    if child == caller.pid {
        return ERROR;
    }
    // Check the status buffer first so a bad pointer does not consume the child.
    if !caller.space.is_writable(status_addr, 4) {
        return ERROR;
    }
    match kernel.registry().join(caller.pid, child) {
        Ok(ExitStatus::Exited(code)) => {
            if !caller.space.write_u32(status_addr, code as u32) {
                return ERROR;
            }
            SyscallOutcome::Return(1)
        }
        // No status to hand back; the child is still collected.
        Ok(ExitStatus::Killed(reason)) => {
            tracing::debug!(target: "kernel::syscall", pid = caller.pid, child, %reason, "joined killed child");
            ERROR
        }
        Err(err) => {
            tracing::debug!(target: "kernel::syscall", pid = caller.pid, child, error = %err, "join failed");
            ERROR
        }
    }
}
