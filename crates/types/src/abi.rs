//! Register indices used by the syscall calling convention.

pub const REG_SP: usize = 2;
pub const REG_A0: usize = 10;
pub const REG_A1: usize = 11;
pub const REG_A2: usize = 12;
pub const REG_A3: usize = 13;
pub const REG_A7: usize = 17;

/// Argument registers in order.
pub const SYSCALL_ARG_REGS: [usize; 4] = [REG_A0, REG_A1, REG_A2, REG_A3];
pub const SYSCALL_ID_REG: usize = REG_A7;
pub const SYSCALL_RET_REG: usize = REG_A0;
