use std::fmt;

use types::Pid;
use types::abi::{REG_A0, REG_A1, REG_SP};
use vm::{ExceptionCause, Processor};

use crate::address_space::AddressSpace;
use crate::fd_table::FileTable;
use crate::loader::LoadedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Created,
    Running,
    Exited,
}

/// Why the kernel ended a process that did not call `exit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillReason {
    /// An exception other than a system call.
    Exception(ExceptionCause),
    UnknownSyscall(u32),
    /// `halt` from anyone but the root process.
    IllegalHalt,
    /// The machine was switched off under the process.
    MachineHalted,
}

impl fmt::Display for KillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillReason::Exception(cause) => write!(f, "{} (cause {})", cause, cause.code()),
            KillReason::UnknownSyscall(id) => write!(f, "unknown syscall {}", id),
            KillReason::IllegalHalt => f.write_str("halt from a non-root process"),
            KillReason::MachineHalted => f.write_str("machine halted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process called `exit(status)`.
    Exited(i32),
    Killed(KillReason),
}

impl ExitStatus {
    pub fn is_normal(&self) -> bool {
        matches!(self, ExitStatus::Exited(_))
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exited with status {}", code),
            ExitStatus::Killed(reason) => write!(f, "killed: {}", reason),
        }
    }
}

/// Everything a running user process owns. Lives on its kernel thread.
#[derive(Debug)]
pub struct Process {
    pub pid: Pid,
    pub name: String,
    pub space: AddressSpace,
    pub files: FileTable,
    pub initial_pc: u32,
    pub initial_sp: u32,
    pub argc: u32,
    pub argv: u32,
}

impl Process {
    pub fn new(pid: Pid, name: &str, image: LoadedImage, files: FileTable) -> Self {
        Self {
            pid,
            name: name.to_string(),
            space: image.space,
            files,
            initial_pc: image.initial_pc,
            initial_sp: image.initial_sp,
            argc: image.argc,
            argv: image.argv,
        }
    }

    /// Puts the processor in the entry state: everything zero except the
    /// pc, the stack pointer and `a0 = argc`, `a1 = argv`.
    pub fn init_registers(&self, cpu: &mut Processor) {
        cpu.regs = [0; 32];
        cpu.pc = self.initial_pc;
        cpu.write_register(REG_SP, self.initial_sp);
        cpu.write_register(REG_A0, self.argc);
        cpu.write_register(REG_A1, self.argv);
    }
}
