use std::sync::Arc;

use types::Config;

use super::{ERROR, SyscallOutcome, non_negative, user_string};
use crate::kernel::Kernel;
use crate::process::Process;

const CHUNK: usize = Config::PAGE_SIZE;

/// `create` when `create` is set, `open` otherwise.
pub(super) fn sys_open(kernel: &Arc<Kernel>, caller: &mut Process, name_addr: u32, create: bool) -> SyscallOutcome {
    let Some(name) = user_string(caller, name_addr) else {
        return ERROR;
    };
    // A full table must not create the file as a side effect.
    if !caller.files.has_free_slot() {
        tracing::debug!(target: "kernel::syscall", pid = caller.pid, file = %name, "descriptor table full");
        return ERROR;
    }
    let Some(file) = kernel.file_system().open(&name, create) else {
        return ERROR;
    };
    match caller.files.allocate(file) {
        Ok(fd) => SyscallOutcome::Return(fd as i32),
        Err(mut file) => {
            file.close();
            ERROR
        }
    }
}

pub(super) fn sys_read(caller: &mut Process, fd: u32, buf_addr: u32, count: u32) -> SyscallOutcome {
    let (Some(fd), Some(count)) = (non_negative(fd), non_negative(count)) else {
        return ERROR;
    };
    if !caller.files.is_open(fd) {
        return ERROR;
    }
    if count == 0 {
        return SyscallOutcome::Return(0);
    }
    if !caller.space.is_writable(buf_addr, count) {
        return ERROR;
    }
    let Some(file) = caller.files.get(fd) else {
        return ERROR;
    };

    let mut chunk = vec![0u8; CHUNK.min(count)];
    let mut total = 0;
    while total < count {
        let want = (count - total).min(CHUNK);
        let got = match file.read(&mut chunk[..want]) {
            Ok(got) => got,
            Err(err) => {
                tracing::debug!(target: "kernel::syscall", pid = caller.pid, fd, error = %err, "read failed");
                if total == 0 {
                    return ERROR;
                }
                break;
            }
        };
        let copied = caller.space.write(buf_addr + total as u32, &chunk[..got]);
        total += copied;
        // Short reads mean end of file, or no more console input for now.
        if got < want || copied < got {
            break;
        }
    }
    SyscallOutcome::Return(total as i32)
}

pub(super) fn sys_write(caller: &mut Process, fd: u32, buf_addr: u32, count: u32) -> SyscallOutcome {
    let (Some(fd), Some(count)) = (non_negative(fd), non_negative(count)) else {
        return ERROR;
    };
    if !caller.files.is_open(fd) {
        return ERROR;
    }
    if count == 0 {
        return SyscallOutcome::Return(0);
    }
    if !caller.space.contains(buf_addr, count) {
        return ERROR;
    }
    let Some(file) = caller.files.get(fd) else {
        return ERROR;
    };

    let mut chunk = vec![0u8; CHUNK.min(count)];
    let mut total = 0;
    while total < count {
        let want = (count - total).min(CHUNK);
        let copied = caller.space.read(buf_addr + total as u32, &mut chunk[..want]);
        let written = match file.write(&chunk[..copied]) {
            Ok(written) => written,
            Err(err) => {
                tracing::debug!(target: "kernel::syscall", pid = caller.pid, fd, error = %err, "write failed");
                if total == 0 {
                    return ERROR;
                }
                break;
            }
        };
        total += written;
        if written < want {
            break;
        }
    }
    SyscallOutcome::Return(total as i32)
}

pub(super) fn sys_close(caller: &mut Process, fd: u32) -> SyscallOutcome {
    let Some(fd) = non_negative(fd) else {
        return ERROR;
    };
    match caller.files.release(fd) {
        Ok(()) => SyscallOutcome::Return(0),
        Err(err) => {
            tracing::debug!(target: "kernel::syscall", pid = caller.pid, error = %err, "close failed");
            ERROR
        }
    }
}

pub(super) fn sys_unlink(kernel: &Arc<Kernel>, caller: &mut Process, name_addr: u32) -> SyscallOutcome {
    let Some(name) = user_string(caller, name_addr) else {
        return ERROR;
    };
    if kernel.file_system().remove(&name) {
        SyscallOutcome::Return(0)
    } else {
        ERROR
    }
}
