mod common;

use std::sync::Arc;

use common::*;
use kernel::syscall::dispatch;
use kernel::trap::{TrapAction, handle_syscall};
use kernel::{ExitStatus, KillReason, Process, SyscallOutcome};
use types::abi::*;
use types::*;
use vm::Processor;
use vm::asm::Assembler;

const ERR: SyscallOutcome = SyscallOutcome::Return(-1);

fn idle() -> Assembler {
    let mut asm = Assembler::new(0);
    exit_with(&mut asm, 0);
    asm
}

/// A loaded but never started process, plus a string area in its scratch page.
fn setup() -> (Harness, Process) {
    let h = Harness::new("");
    h.install("idle.elf", &idle());
    let process = h.kernel.create_process(None, "idle.elf", &[]).unwrap();
    (h, process)
}

fn put_str(process: &mut Process, addr: u32, text: &str) -> u32 {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    assert_eq!(process.space.write(addr, &bytes), bytes.len());
    addr
}

fn call(h: &Harness, process: &mut Process, id: u32, args: [u32; 4]) -> SyscallOutcome {
    dispatch(&h.kernel, process, id, args)
}

#[test]
fn open_missing_file_fails() {
    let (h, mut p) = setup();
    let name = put_str(&mut p, SCRATCH, "missing.txt");
    assert_eq!(call(&h, &mut p, SYSCALL_OPEN, [name, 0, 0, 0]), ERR);
    assert!(!h.fs.contains("missing.txt"));
}

#[test]
fn create_hands_out_lowest_descriptors() {
    let (h, mut p) = setup();
    let name = put_str(&mut p, SCRATCH, "a.txt");
    assert_eq!(call(&h, &mut p, SYSCALL_CREATE, [name, 0, 0, 0]), SyscallOutcome::Return(2));
    assert_eq!(call(&h, &mut p, SYSCALL_OPEN, [name, 0, 0, 0]), SyscallOutcome::Return(3));
    assert_eq!(call(&h, &mut p, SYSCALL_CLOSE, [2, 0, 0, 0]), SyscallOutcome::Return(0));
    assert_eq!(call(&h, &mut p, SYSCALL_OPEN, [name, 0, 0, 0]), SyscallOutcome::Return(2));
    assert!(h.fs.contains("a.txt"));
}

#[test]
fn full_table_does_not_create_files() {
    let (h, mut p) = setup();
    let name = put_str(&mut p, SCRATCH, "f.txt");
    for fd in Config::RESERVED_DESCRIPTORS..Config::MAX_OPEN_FILES {
        assert_eq!(
            call(&h, &mut p, SYSCALL_CREATE, [name, 0, 0, 0]),
            SyscallOutcome::Return(fd as i32)
        );
    }
    let other = put_str(&mut p, SCRATCH + 64, "g.txt");
    assert_eq!(call(&h, &mut p, SYSCALL_CREATE, [other, 0, 0, 0]), ERR);
    assert!(!h.fs.contains("g.txt"));
}

#[test]
fn bad_name_pointers_fail() {
    let (h, mut p) = setup();
    let beyond = p.space.size() as u32;
    assert_eq!(call(&h, &mut p, SYSCALL_OPEN, [beyond, 0, 0, 0]), ERR);

    // No terminator within the length limit.
    let long = "x".repeat(Config::MAX_STRING_LEN + 1);
    let addr = put_str(&mut p, SCRATCH, &long);
    assert_eq!(call(&h, &mut p, SYSCALL_CREATE, [addr, 0, 0, 0]), ERR);

    // Terminated, but not UTF-8.
    assert_eq!(p.space.write(SCRATCH, &[0xff, b'x', 0]), 3);
    assert_eq!(call(&h, &mut p, SYSCALL_CREATE, [SCRATCH, 0, 0, 0]), ERR);
    assert_eq!(h.fs.names(), vec!["idle.elf".to_string()]);
}

#[test]
fn close_validates_descriptors() {
    let (h, mut p) = setup();
    assert_eq!(call(&h, &mut p, SYSCALL_CLOSE, [5, 0, 0, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_CLOSE, [99, 0, 0, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_CLOSE, [-1i32 as u32, 0, 0, 0]), ERR);
    // The console descriptors can be closed like any other.
    assert_eq!(call(&h, &mut p, SYSCALL_CLOSE, [1, 0, 0, 0]), SyscallOutcome::Return(0));
    assert_eq!(call(&h, &mut p, SYSCALL_CLOSE, [1, 0, 0, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_WRITE, [1, 0, 4, 0]), ERR);
}

#[test]
fn read_and_write_check_their_buffers() {
    let (h, mut p) = setup();
    h.fs.insert("in.txt", b"abcdef".to_vec());
    let name = put_str(&mut p, SCRATCH, "in.txt");
    let fd = match call(&h, &mut p, SYSCALL_OPEN, [name, 0, 0, 0]) {
        SyscallOutcome::Return(fd) => fd as u32,
        other => panic!("open failed: {other:?}"),
    };

    // Code pages are read-only, so reading into them is refused.
    assert_eq!(call(&h, &mut p, SYSCALL_READ, [fd, 0, 4, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_READ, [fd, SCRATCH, -1i32 as u32, 0]), ERR);
    let end = p.space.size() as u32;
    assert_eq!(call(&h, &mut p, SYSCALL_READ, [fd, end - 2, 4, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_READ, [fd, SCRATCH, 0, 0]), SyscallOutcome::Return(0));

    assert_eq!(call(&h, &mut p, SYSCALL_READ, [fd, SCRATCH, 4, 0]), SyscallOutcome::Return(4));
    let mut buf = [0u8; 4];
    p.space.read(SCRATCH, &mut buf);
    assert_eq!(&buf, b"abcd");
    assert_eq!(call(&h, &mut p, SYSCALL_READ, [fd, SCRATCH, 4, 0]), SyscallOutcome::Return(2));
    assert_eq!(call(&h, &mut p, SYSCALL_READ, [fd, SCRATCH, 4, 0]), SyscallOutcome::Return(0));

    assert_eq!(call(&h, &mut p, SYSCALL_WRITE, [1, end - 2, 4, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_WRITE, [7, SCRATCH, 4, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_WRITE, [1, end, 0, 0]), SyscallOutcome::Return(0));
}

#[test]
fn write_spanning_pages_reaches_the_file() {
    let (h, mut p) = setup();
    // Runs from the scratch pages into the stack.
    let payload: Vec<u8> = (0..PAGE * 2 + 10).map(|i| (i % 251) as u8).collect();
    assert_eq!(p.space.write(SCRATCH, &payload), payload.len());
    let name = put_str(&mut p, SCRATCH + payload.len() as u32 + 16, "big.bin");
    let SyscallOutcome::Return(fd) = call(&h, &mut p, SYSCALL_CREATE, [name, 0, 0, 0]) else {
        panic!("create failed");
    };
    assert_eq!(
        call(&h, &mut p, SYSCALL_WRITE, [fd as u32, SCRATCH, payload.len() as u32, 0]),
        SyscallOutcome::Return(payload.len() as i32)
    );
    assert_eq!(h.fs.contents("big.bin").unwrap(), payload);
}

#[test]
fn unlink_reports_missing_files() {
    let (h, mut p) = setup();
    h.fs.insert("gone.txt", Vec::new());
    let name = put_str(&mut p, SCRATCH, "gone.txt");
    assert_eq!(call(&h, &mut p, SYSCALL_UNLINK, [name, 0, 0, 0]), SyscallOutcome::Return(0));
    assert_eq!(call(&h, &mut p, SYSCALL_UNLINK, [name, 0, 0, 0]), ERR);
}

#[test]
fn exec_validates_arguments() {
    let (h, mut p) = setup();
    let name = put_str(&mut p, SCRATCH, "idle.elf");
    let too_many = Config::MAX_EXEC_ARGS as u32 + 1;
    assert_eq!(call(&h, &mut p, SYSCALL_EXEC, [name, too_many, SCRATCH + 64, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_EXEC, [name, -1i32 as u32, SCRATCH + 64, 0]), ERR);
    // argv pointing outside the address space.
    let end = p.space.size() as u32;
    assert_eq!(call(&h, &mut p, SYSCALL_EXEC, [name, 1, end, 0]), ERR);
    // An argument string that does not exist.
    assert!(p.space.write_u32(SCRATCH + 64, end + 100));
    assert_eq!(call(&h, &mut p, SYSCALL_EXEC, [name, 1, SCRATCH + 64, 0]), ERR);
    assert!(h.kernel.registry().children_of(p.pid).is_empty());
}

#[test]
fn exec_then_join_collects_status() {
    let (h, mut p) = setup();
    let name = put_str(&mut p, SCRATCH, "idle.elf");
    let SyscallOutcome::Return(child) = call(&h, &mut p, SYSCALL_EXEC, [name, 0, 0, 0]) else {
        panic!("exec failed");
    };
    assert!(child > 0);
    assert_eq!(h.kernel.registry().parent_of(child as Pid), Some(p.pid));

    let status_addr = SCRATCH + 0x100;
    assert_eq!(
        call(&h, &mut p, SYSCALL_JOIN, [child as u32, status_addr, 0, 0]),
        SyscallOutcome::Return(1)
    );
    assert_eq!(p.space.read_u32(status_addr), Some(0));
    // A child can be joined only once.
    assert_eq!(call(&h, &mut p, SYSCALL_JOIN, [child as u32, status_addr, 0, 0]), ERR);
}

#[test]
fn join_of_killed_child_fails_and_collects_it() {
    let (h, mut p) = setup();
    let mut bad = Assembler::new(0);
    bad.syscall(77);
    h.install("bad.elf", &bad);
    let name = put_str(&mut p, SCRATCH, "bad.elf");
    let SyscallOutcome::Return(child) = call(&h, &mut p, SYSCALL_EXEC, [name, 0, 0, 0]) else {
        panic!("exec failed");
    };

    let status_addr = SCRATCH + 0x100;
    assert!(p.space.write_u32(status_addr, 0x1234_5678));
    assert_eq!(call(&h, &mut p, SYSCALL_JOIN, [child as u32, status_addr, 0, 0]), ERR);
    assert_eq!(p.space.read_u32(status_addr), Some(0x1234_5678));
    assert!(!h.kernel.registry().contains(child as Pid));
    assert_eq!(call(&h, &mut p, SYSCALL_JOIN, [child as u32, status_addr, 0, 0]), ERR);
}

#[test]
fn join_rejects_bad_targets() {
    let (h, mut p) = setup();
    let self_pid = p.pid;
    assert_eq!(call(&h, &mut p, SYSCALL_JOIN, [self_pid, SCRATCH, 0, 0]), ERR);
    assert_eq!(call(&h, &mut p, SYSCALL_JOIN, [12345, SCRATCH, 0, 0]), ERR);

    let name = put_str(&mut p, SCRATCH, "idle.elf");
    let SyscallOutcome::Return(child) = call(&h, &mut p, SYSCALL_EXEC, [name, 0, 0, 0]) else {
        panic!("exec failed");
    };
    // Status pointer into read-only code: refused, and the child stays joinable.
    assert_eq!(call(&h, &mut p, SYSCALL_JOIN, [child as u32, 0, 0, 0]), ERR);
    assert_eq!(
        call(&h, &mut p, SYSCALL_JOIN, [child as u32, SCRATCH, 0, 0]),
        SyscallOutcome::Return(1)
    );
}

#[test]
fn exit_and_unknown_calls_terminate() {
    let (h, mut p) = setup();
    assert_eq!(
        call(&h, &mut p, SYSCALL_EXIT, [-3i32 as u32, 0, 0, 0]),
        SyscallOutcome::Terminate(ExitStatus::Exited(-3))
    );
    assert_eq!(
        call(&h, &mut p, 77, [0; 4]),
        SyscallOutcome::Terminate(ExitStatus::Killed(KillReason::UnknownSyscall(77)))
    );
}

#[test]
fn only_the_root_may_halt() {
    let (h, mut root) = setup();
    let mut other = h.kernel.create_process(Some(root.pid), "idle.elf", &[]).unwrap();
    assert_eq!(root.pid, Config::ROOT_PID);

    assert_eq!(
        call(&h, &mut other, SYSCALL_HALT, [0; 4]),
        SyscallOutcome::Terminate(ExitStatus::Killed(KillReason::IllegalHalt))
    );
    assert!(!h.kernel.machine().is_halted());

    assert_eq!(
        call(&h, &mut root, SYSCALL_HALT, [0; 4]),
        SyscallOutcome::Terminate(ExitStatus::Exited(0))
    );
    assert!(h.kernel.machine().is_halted());
    assert!(h.kernel.create_process(None, "idle.elf", &[]).is_err());
}

#[test]
fn trap_returns_value_and_steps_past_ecall() {
    let (h, mut p) = setup();
    let mut cpu = Processor::new();
    p.init_registers(&mut cpu);
    cpu.pc = 0x40;
    cpu.write_register(SYSCALL_ID_REG, SYSCALL_CLOSE);
    cpu.write_register(REG_A0, 42);

    let kernel = Arc::clone(&h.kernel);
    assert_eq!(handle_syscall(&kernel, &mut p, &mut cpu), TrapAction::Continue);
    assert_eq!(cpu.read_register(SYSCALL_RET_REG), -1i32 as u32);
    assert_eq!(cpu.pc, 0x44);

    cpu.write_register(SYSCALL_ID_REG, SYSCALL_EXIT);
    cpu.write_register(REG_A0, 5);
    assert_eq!(
        handle_syscall(&kernel, &mut p, &mut cpu),
        TrapAction::Terminate(ExitStatus::Exited(5))
    );
    assert_eq!(cpu.pc, 0x44);
}

#[test]
fn processes_start_with_entry_registers() {
    let h = Harness::new("");
    h.install("idle.elf", &idle());
    let args = vec!["idle.elf".to_string(), "x".to_string()];
    let p = h.kernel.create_process(None, "idle.elf", &args).unwrap();

    let mut cpu = Processor::new();
    cpu.regs[5] = 99;
    p.init_registers(&mut cpu);
    assert_eq!(cpu.pc, 0);
    assert_eq!(cpu.read_register(REG_A0), 2);
    assert_eq!(cpu.read_register(REG_A1), p.argv);
    assert_eq!(cpu.read_register(REG_SP), p.initial_sp);
    assert_eq!(cpu.read_register(5), 0);
    assert_eq!(p.files.open_count(), 2);
}
