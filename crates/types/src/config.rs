/// Process identifier handed out by the kernel. Pids are never reused.
pub type Pid = u32;

/// Compile-time constants shared by the machine, the kernel and guest code.
pub struct Config;

impl Config {
    /// Page size in bytes. Frames and virtual pages share this size.
    pub const PAGE_SIZE: usize = 0x400;
    pub const PAGE_SHIFT: u32 = 10;
    pub const PAGE_OFFSET_MASK: u32 = (Self::PAGE_SIZE as u32) - 1;

    /// Pages reserved for the user stack above the loaded sections.
    pub const STACK_PAGES: usize = 8;
    /// One page after the stack holds argc pointers and argument strings.
    pub const ARGUMENT_PAGES: usize = 1;

    /// Physical frames the machine owns when nothing else is configured.
    pub const DEFAULT_PHYS_PAGES: usize = 128;

    pub const MAX_OPEN_FILES: usize = 16;
    /// Descriptors below this are reserved for the console streams.
    pub const RESERVED_DESCRIPTORS: usize = 2;
    pub const STDIN_FD: usize = 0;
    pub const STDOUT_FD: usize = 1;

    /// Longest file name or argument accepted from guest memory, NUL excluded.
    pub const MAX_STRING_LEN: usize = 256;

    /// `exec` only accepts names with this suffix.
    pub const EXECUTABLE_SUFFIX: &'static str = ".elf";

    /// Pid of the first process. Its termination halts the machine.
    pub const ROOT_PID: Pid = 0;

    /// Each argument costs a pointer plus its bytes plus a NUL. With empty
    /// strings a page fits at most this many.
    pub const MAX_EXEC_ARGS: usize = Self::PAGE_SIZE / 5;

    /// Value placed in the result register when a syscall fails.
    pub const SYSCALL_ERROR: i32 = -1;
}
