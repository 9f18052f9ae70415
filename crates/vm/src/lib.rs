pub mod asm;
pub mod cpu;
pub mod decoder;
pub mod exception;
pub mod instruction;
pub mod isa;
pub mod machine;
pub mod memory;
pub mod registers;

pub use cpu::Processor;
pub use exception::ExceptionCause;
pub use machine::{Machine, MachineConfig};
pub use memory::{Mmu, PhysicalMemory, VirtualAddress};
pub use registers::Register;
