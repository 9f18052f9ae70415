//! Built-in guest programs, assembled at startup.

use anyhow::{Result, ensure};
use image::{ImageWriter, SectionKind};
use types::*;
use vm::Register::*;
use vm::asm::Assembler;

pub const INIT: &str = "init.elf";
const ECHO: &str = "echo.elf";
const LOG: &str = "demo.log";

const PAGE: usize = Config::PAGE_SIZE;
const CODE_PAGES: usize = 2;
const SCRATCH: i32 = (CODE_PAGES * PAGE) as i32;

pub fn programs() -> Result<Vec<(&'static str, Vec<u8>)>> {
    Ok(vec![(INIT, link(&init())?), (ECHO, link(&echo())?)])
}

/// Code at page 0, followed by one page of zeroed scratch memory.
fn link(asm: &Assembler) -> Result<Vec<u8>> {
    let mut code = asm.finish()?;
    ensure!(code.len() <= CODE_PAGES * PAGE, "demo program does not fit");
    code.resize(CODE_PAGES * PAGE, 0);
    Ok(ImageWriter::new(0)
        .section(".text", SectionKind::Code, 0, &code)
        .bss(".bss", SCRATCH as u32, PAGE as u32)
        .build())
}

/// Execs `echo.elf hello world`, joins it, logs to `demo.log` and exits
/// with the child's status.
fn init() -> Assembler {
    let argv = SCRATCH + 64;
    let status = SCRATCH;
    let mut asm = Assembler::new(0);
    for (i, label) in ["arg0", "arg1", "arg2"].iter().enumerate() {
        asm.la(T0, label).li(T1, argv).sw(T0, T1, (i * 4) as i32);
    }
    asm.la(A0, "arg0")
        .li(A1, 3)
        .li(A2, argv)
        .syscall(SYSCALL_EXEC)
        .blt(A0, Zero, "fail")
        .li(A1, status)
        .syscall(SYSCALL_JOIN)
        .li(T0, 1)
        .bne(A0, T0, "fail")
        // Record the run in a file.
        .la(A0, "log")
        .syscall(SYSCALL_CREATE)
        .blt(A0, Zero, "fail")
        .mv(S0, A0)
        .la(A1, "message")
        .li(A2, 14)
        .syscall(SYSCALL_WRITE)
        .mv(A0, S0)
        .syscall(SYSCALL_CLOSE)
        .li(T0, status)
        .lw(A0, T0, 0)
        .syscall(SYSCALL_EXIT)
        .label("fail")
        .li(A0, -1)
        .syscall(SYSCALL_EXIT)
        .label("arg0")
        .asciz(ECHO)
        .label("arg1")
        .asciz("hello")
        .label("arg2")
        .asciz("world")
        .label("log")
        .asciz(LOG)
        .label("message")
        .asciz("echo finished\n");
    asm
}

/// Prints `argv[1..]` separated by spaces.
fn echo() -> Assembler {
    let mut asm = Assembler::new(0);
    asm.addi(S0, A0, -1)
        .addi(S1, A1, 4)
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
        .addi(S0, S0, -1)
        .addi(S1, S1, 4)
        .la(A1, "space")
        .beqz(S0, "last")
        .j("separator")
        .label("last")
        .la(A1, "newline")
        .label("separator")
        .li(A0, Config::STDOUT_FD as i32)
        .li(A2, 1)
        .syscall(SYSCALL_WRITE)
        .j("next")
        .label("done")
        .li(A0, 0)
        .syscall(SYSCALL_EXIT)
        .label("space")
        .asciz(" ")
        .label("newline")
        .asciz("\n");
    asm
}
