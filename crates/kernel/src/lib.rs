//! Kernel side of a user process: address spaces, program loading,
//! descriptor tables, the process tree and the system call interface.

pub mod address_space;
pub mod fd_table;
pub mod kernel;
pub mod loader;
pub mod process;
pub mod registry;
pub mod syscall;
pub mod trap;

pub use address_space::{AddressSpace, TranslationEntry};
pub use fd_table::{FdError, FileTable};
pub use kernel::{Kernel, KernelError, SpawnError};
pub use loader::{LoadError, LoadedImage};
pub use process::{ExitStatus, KillReason, Process, ProcessState};
pub use registry::{JoinError, ProcessRegistry};
pub use syscall::SyscallOutcome;
pub use trap::TrapAction;
