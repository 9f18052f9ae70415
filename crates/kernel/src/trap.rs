use std::sync::Arc;

use types::abi::{SYSCALL_ARG_REGS, SYSCALL_ID_REG, SYSCALL_RET_REG};
use vm::Processor;

use crate::kernel::Kernel;
use crate::process::{ExitStatus, Process};
use crate::syscall::{self, SyscallOutcome};

/// What the process thread does after a trap has been serviced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapAction {
    Continue,
    Terminate(ExitStatus),
}

/// Services an `ecall`: call id from a7, arguments from a0-a3, result
/// into a0, then step past the `ecall`.
pub fn handle_syscall(kernel: &Arc<Kernel>, process: &mut Process, cpu: &mut Processor) -> TrapAction {
    let call_id = cpu.read_register(SYSCALL_ID_REG);
    let args = SYSCALL_ARG_REGS.map(|reg| cpu.read_register(reg));
    match syscall::dispatch(kernel, process, call_id, args) {
        SyscallOutcome::Return(value) => {
            cpu.write_register(SYSCALL_RET_REG, value as u32);
            cpu.advance_pc();
            TrapAction::Continue
        }
        SyscallOutcome::Terminate(status) => TrapAction::Terminate(status),
    }
}
