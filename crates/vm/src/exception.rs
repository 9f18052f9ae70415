use thiserror::Error;

/// Reasons the processor stops executing a user instruction and hands
/// control to the kernel.
///
/// `Syscall` is the only cause a process is expected to raise. The kernel
/// treats every other cause as fatal for the faulting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExceptionCause {
    #[error("system call")]
    Syscall,
    #[error("page fault")]
    PageFault,
    #[error("write to read-only page")]
    ReadOnly,
    #[error("bus error")]
    BusError,
    #[error("misaligned address")]
    AddressError,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("illegal instruction")]
    IllegalInstruction,
    #[error("breakpoint")]
    Breakpoint,
}

impl ExceptionCause {
    /// Stable numeric code, used in log lines and kill reasons.
    pub fn code(self) -> u32 {
        match self {
            ExceptionCause::Syscall => 1,
            ExceptionCause::PageFault => 2,
            ExceptionCause::ReadOnly => 3,
            ExceptionCause::BusError => 4,
            ExceptionCause::AddressError => 5,
            ExceptionCause::Overflow => 6,
            ExceptionCause::IllegalInstruction => 7,
            ExceptionCause::Breakpoint => 8,
        }
    }
}
