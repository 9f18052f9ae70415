use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use types::Config;

use crate::memory::PhysicalMemory;

/// Runtime sizing of the simulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    pub num_phys_pages: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            num_phys_pages: Config::DEFAULT_PHYS_PAGES,
        }
    }
}

/// The simulated machine: main memory shared by all processes plus a
/// power switch.
///
/// Processors are per process and live with the kernel threads, so the
/// machine itself only tracks what every hart has in common.
#[derive(Debug)]
pub struct Machine {
    memory: Arc<PhysicalMemory>,
    halted: AtomicBool,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        tracing::info!(
            target: "vm::machine",
            phys_pages = config.num_phys_pages,
            page_size = Config::PAGE_SIZE,
            "machine powered on"
        );
        Self {
            memory: Arc::new(PhysicalMemory::new(config.num_phys_pages)),
            halted: AtomicBool::new(false),
        }
    }

    pub fn memory(&self) -> &Arc<PhysicalMemory> {
        &self.memory
    }

    /// Stops the machine. Every hart notices before its next instruction.
    pub fn halt(&self) {
        if !self.halted.swap(true, Ordering::SeqCst) {
            tracing::info!(target: "vm::machine", "machine halting");
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }
}
