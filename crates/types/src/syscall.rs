//! Syscall numbers. The call id travels in `a7`, arguments in `a0..a3`,
//! and the result comes back in `a0`.

pub const SYSCALL_HALT: u32 = 0;
pub const SYSCALL_EXIT: u32 = 1;
pub const SYSCALL_EXEC: u32 = 2;
pub const SYSCALL_JOIN: u32 = 3;
pub const SYSCALL_CREATE: u32 = 4;
pub const SYSCALL_OPEN: u32 = 5;
pub const SYSCALL_READ: u32 = 6;
pub const SYSCALL_WRITE: u32 = 7;
pub const SYSCALL_CLOSE: u32 = 8;
pub const SYSCALL_UNLINK: u32 = 9;

/// Human readable name for log lines.
pub fn syscall_name(call_id: u32) -> &'static str {
    match call_id {
        SYSCALL_HALT => "halt",
        SYSCALL_EXIT => "exit",
        SYSCALL_EXEC => "exec",
        SYSCALL_JOIN => "join",
        SYSCALL_CREATE => "create",
        SYSCALL_OPEN => "open",
        SYSCALL_READ => "read",
        SYSCALL_WRITE => "write",
        SYSCALL_CLOSE => "close",
        SYSCALL_UNLINK => "unlink",
        _ => "unknown",
    }
}
