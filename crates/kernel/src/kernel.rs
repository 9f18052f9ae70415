use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use filesys::{Console, FileSystem};
use thiserror::Error;
use threads::KThread;
use types::{Config, Pid};
use vm::{ExceptionCause, Machine, MachineConfig, Processor, VirtualAddress};

use crate::fd_table::FileTable;
use crate::loader::{self, LoadError};
use crate::process::{ExitStatus, KillReason, Process};
use crate::registry::ProcessRegistry;
use crate::trap::{self, TrapAction};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("could not start a kernel thread: {0}")]
    Thread(#[from] io::Error),
    #[error("the machine is halted")]
    MachineHalted,
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("could not start the root process: {0}")]
    Boot(#[from] SpawnError),
    #[error("the kernel has already been booted")]
    AlreadyBooted,
    #[error("the root process disappeared without an exit status")]
    RootLost,
}

/// The kernel: the machine plus the services every process shares.
///
/// It is handed around as `Arc<Kernel>`; each process thread holds one.
#[derive(Debug)]
pub struct Kernel {
    machine: Machine,
    fs: Arc<dyn FileSystem>,
    console: Console,
    registry: ProcessRegistry,
    booted: AtomicBool,
}

impl Kernel {
    pub fn new(config: MachineConfig, fs: Arc<dyn FileSystem>, console: Console) -> Arc<Self> {
        Arc::new(Self {
            machine: Machine::new(config),
            fs,
            console,
            registry: ProcessRegistry::new(),
            booted: AtomicBool::new(false),
        })
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Boots `program` as the root process and blocks until it terminates.
    /// The machine is halted when this returns.
    pub fn run(self: &Arc<Self>, program: &str, args: &[String]) -> Result<ExitStatus, KernelError> {
        if self.booted.swap(true, Ordering::SeqCst) {
            return Err(KernelError::AlreadyBooted);
        }
        tracing::info!(target: "kernel", program, ?args, "booting root process");
        let pid = self.spawn(None, program, args)?;
        let status = self.registry.wait(pid).ok_or(KernelError::RootLost)?;
        tracing::info!(target: "kernel", pid, %status, "root process finished");
        Ok(status)
    }

    /// Loads `name` and registers it under `parent` without starting it.
    ///
    /// The returned process has the console on descriptors 0 and 1. On
    /// failure nothing is registered and no memory stays allocated.
    pub fn create_process(
        &self,
        parent: Option<Pid>,
        name: &str,
        args: &[String],
    ) -> Result<Process, SpawnError> {
        if self.machine.is_halted() {
            return Err(SpawnError::MachineHalted);
        }
        let image = loader::load(self.fs.as_ref(), self.machine.memory(), name, args)?;
        let pid = self.registry.register(parent, name);
        Ok(Process::new(pid, name, image, FileTable::with_console(&self.console)))
    }

    /// Creates a process and starts it on its own kernel thread.
    pub fn spawn(self: &Arc<Self>, parent: Option<Pid>, name: &str, args: &[String]) -> Result<Pid, SpawnError> {
        let process = self.create_process(parent, name, args)?;
        let pid = process.pid;
        let kernel = Arc::clone(self);
        let thread = KThread::fork(format!("{name}#{pid}"), move || kernel.run_process(process))
            .inspect_err(|err| {
                tracing::warn!(target: "kernel", pid, error = %err, "fork failed");
                self.registry.unregister(pid);
            })?;
        self.registry.mark_running(pid);
        self.registry.attach_thread(pid, thread);
        Ok(pid)
    }

    /// Body of every process thread: run user code until it exits or dies.
    fn run_process(self: Arc<Self>, mut process: Process) {
        let mut cpu = Processor::new();
        process.init_registers(&mut cpu);
        tracing::debug!(
            target: "kernel",
            pid = process.pid,
            pc = format_args!("0x{:08x}", cpu.pc),
            sp = format_args!("0x{:08x}", process.initial_sp),
            "process started"
        );

        let status = loop {
            if self.machine.is_halted() {
                break ExitStatus::Killed(KillReason::MachineHalted);
            }
            match cpu.step(&mut process.space) {
                Ok(()) => {}
                Err(ExceptionCause::Syscall) => {
                    if let TrapAction::Terminate(status) = trap::handle_syscall(&self, &mut process, &mut cpu) {
                        break status;
                    }
                }
                Err(cause) => {
                    tracing::warn!(
                        target: "kernel",
                        pid = process.pid,
                        pc = format_args!("0x{:08x}", cpu.pc),
                        %cause,
                        "unhandled exception"
                    );
                    if tracing::enabled!(target: "kernel", tracing::Level::TRACE) {
                        let pc = VirtualAddress(cpu.pc);
                        if let Some(page) = process.space.dump_page(pc) {
                            tracing::trace!(
                                target: "kernel",
                                pid = process.pid,
                                vpn = pc.vpn(),
                                offset = pc.offset(),
                                page = %page,
                                "page at faulting pc"
                            );
                        }
                    }
                    break ExitStatus::Killed(KillReason::Exception(cause));
                }
            }
        };
        self.terminate(&mut process, status);
    }

    /// Releases everything `process` holds, then publishes its status.
    /// The root taking this path switches the machine off.
    pub fn terminate(&self, process: &mut Process, status: ExitStatus) {
        process.files.close_all();
        process.space.release();
        if process.pid == Config::ROOT_PID {
            self.machine.halt();
        }
        tracing::debug!(target: "kernel", pid = process.pid, %status, "terminating");
        self.registry.exit(process.pid, status);
    }
}
