//! Executable images: ELF32 RISC-V files cut into page-sized sections.

pub mod elf;
pub mod section;
pub mod writer;

pub use elf::{Executable, ImageError};
pub use section::{Section, SectionKind};
pub use writer::ImageWriter;
