#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use filesys::{Console, FileSystem, MemFileSystem, OutputBuffer};
use image::{ImageWriter, SectionKind};
use kernel::Kernel;
use types::*;
use vm::asm::Assembler;
use tracing_subscriber::EnvFilter;
use vm::{MachineConfig, Register::*};

pub const PAGE: usize = Config::PAGE_SIZE;
/// Every test program reserves this many pages of code.
pub const CODE_PAGES: usize = 4;
/// Writable scratch memory right after the code.
pub const SCRATCH: u32 = (CODE_PAGES * PAGE) as u32;
pub const SCRATCH_PAGES: usize = 2;
/// Pages one test program occupies once loaded.
pub const PROGRAM_PAGES: usize = CODE_PAGES + SCRATCH_PAGES + Config::STACK_PAGES + Config::ARGUMENT_PAGES;

/// Wraps assembled code in an executable: read-only code at page 0 and a
/// zeroed scratch area at `SCRATCH`.
pub fn executable(asm: &Assembler) -> Vec<u8> {
    let mut code = asm.finish().expect("program assembles");
    assert!(code.len() <= CODE_PAGES * PAGE, "test program too large");
    code.resize(CODE_PAGES * PAGE, 0);
    ImageWriter::new(0)
        .section(".text", SectionKind::Code, 0, &code)
        .bss(".bss", SCRATCH, (SCRATCH_PAGES * PAGE) as u32)
        .build()
}

pub struct Harness {
    pub kernel: Arc<Kernel>,
    pub fs: Arc<MemFileSystem>,
    pub output: OutputBuffer,
}

impl Harness {
    pub fn new(input: &str) -> Self {
        Self::with_pages(Config::DEFAULT_PHYS_PAGES, input)
    }

    pub fn with_pages(num_phys_pages: usize, input: &str) -> Self {
        init_logging();
        let fs = Arc::new(MemFileSystem::new());
        let (console, output) = Console::capture(input);
        let kernel = Kernel::new(
            MachineConfig { num_phys_pages },
            Arc::clone(&fs) as Arc<dyn FileSystem>,
            console,
        );
        Self { kernel, fs, output }
    }

    pub fn install(&self, name: &str, asm: &Assembler) -> &Self {
        self.fs.insert(name, executable(asm));
        self
    }

    pub fn free_pages(&self) -> usize {
        self.kernel.machine().memory().free_pages()
    }

    /// Polls until every frame is back, or gives up after a few seconds.
    pub fn wait_for_free_memory(&self) -> bool {
        let total = self.kernel.machine().memory().num_pages();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.free_pages() == total {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

/// Kernel events go to the test output when `RUST_LOG` asks for them.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `exit(code)`.
pub fn exit_with(asm: &mut Assembler, code: i32) -> &mut Assembler {
    asm.li(A0, code).syscall(SYSCALL_EXIT)
}

/// A parent that execs `child` with `args`, joins it and reports through
/// its own exit status: the child's status after a normal exit, 100 plus
/// the join result otherwise, 200 when exec fails.
pub fn parent_of(child: &str, args: &[&str]) -> Assembler {
    let mut asm = Assembler::new(0);
    let argv = SCRATCH as i32 + 64;
    for i in 0..args.len() {
        asm.la(T0, &format!("arg{i}"))
            .li(T1, argv)
            .sw(T0, T1, (i * 4) as i32);
    }
    asm.la(A0, "child")
        .li(A1, args.len() as i32)
        .li(A2, argv)
        .syscall(SYSCALL_EXEC)
        .blt(A0, Zero, "exec_failed")
        .li(A1, SCRATCH as i32)
        .syscall(SYSCALL_JOIN)
        .li(T0, 1)
        .bne(A0, T0, "abnormal")
        .li(T0, SCRATCH as i32)
        .lw(A0, T0, 0)
        .syscall(SYSCALL_EXIT)
        .label("abnormal")
        .addi(A0, A0, 100)
        .syscall(SYSCALL_EXIT)
        .label("exec_failed");
    exit_with(&mut asm, 200);
    asm.label("child").asciz(child);
    for (i, arg) in args.iter().enumerate() {
        asm.label(&format!("arg{i}")).asciz(arg);
    }
    asm
}

/// Writes each argument followed by a newline, then exits with 42.
pub fn echo() -> Assembler {
    let mut asm = Assembler::new(0);
    asm.mv(S0, A0)
        .mv(S1, A1)
        .label("next")
        .beqz(S0, "done")
        .lw(S2, S1, 0)
        .li(T2, 0)
        .label("strlen")
        .add(T0, S2, T2)
        .lbu(T1, T0, 0)
        .beqz(T1, "print")
        .addi(T2, T2, 1)
        .j("strlen")
        .label("print")
        .li(A0, Config::STDOUT_FD as i32)
        .mv(A1, S2)
        .mv(A2, T2)
        .syscall(SYSCALL_WRITE)
        .li(A0, Config::STDOUT_FD as i32)
        .la(A1, "newline")
        .li(A2, 1)
        .syscall(SYSCALL_WRITE)
        .addi(S1, S1, 4)
        .addi(S0, S0, -1)
        .j("next")
        .label("done");
    exit_with(&mut asm, 42);
    asm.label("newline").asciz("\n");
    asm
}
