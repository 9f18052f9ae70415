use std::io;

use filesys::OpenFile;
use goblin::elf::Elf;
use goblin::elf::header::EM_RISCV;
use goblin::elf::section_header::SHT_NOBITS;
use thiserror::Error;
use types::Config;

use crate::section::{Section, SectionKind};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("malformed ELF: {0}")]
    Parse(#[from] goblin::error::Error),
    #[error("could not read image: {0}")]
    Read(#[from] io::Error),
    #[error("expected a 32-bit little-endian image")]
    WrongClass,
    #[error("expected a RISC-V image, found machine {0}")]
    WrongMachine(u16),
    #[error("section `{name}` at 0x{addr:x} does not start on a page boundary")]
    MisalignedSection { name: String, addr: u64 },
    #[error("section `{name}` lies outside the 32-bit address space")]
    SectionOutOfRange { name: String },
    #[error("section `{name}` data runs past the end of the file")]
    TruncatedSection { name: String },
    #[error("image has no loadable sections")]
    NoSections,
}

/// A parsed executable: its entry point and its loadable sections in
/// address order.
#[derive(Debug, Clone)]
pub struct Executable {
    entry: u32,
    sections: Vec<Section>,
}

impl Executable {
    /// Reads the whole file and parses it.
    pub fn read_from(file: &mut dyn OpenFile) -> Result<Self, ImageError> {
        let mut bytes = Vec::new();
        let mut chunk = [0u8; Config::PAGE_SIZE];
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
        }
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ImageError> {
        let elf = Elf::parse(bytes)?;
        if elf.is_64 || !elf.little_endian {
            return Err(ImageError::WrongClass);
        }
        if elf.header.e_machine != EM_RISCV {
            return Err(ImageError::WrongMachine(elf.header.e_machine));
        }

        let mut sections = Vec::new();
        for header in elf.section_headers.iter() {
            if !header.is_alloc() || header.sh_size == 0 {
                continue;
            }
            let name = elf
                .shdr_strtab
                .get_at(header.sh_name)
                .unwrap_or("")
                .to_string();

            if header.sh_addr % Config::PAGE_SIZE as u64 != 0 {
                return Err(ImageError::MisalignedSection {
                    name,
                    addr: header.sh_addr,
                });
            }
            if header.sh_addr.saturating_add(header.sh_size) > u64::from(u32::MAX) + 1 {
                return Err(ImageError::SectionOutOfRange { name });
            }

            let is_nobits = header.sh_type == SHT_NOBITS;
            let kind = if is_nobits {
                SectionKind::Bss
            } else if header.is_executable() {
                SectionKind::Code
            } else if header.is_writable() {
                SectionKind::Data
            } else {
                SectionKind::ReadOnlyData
            };

            let data = if is_nobits {
                Vec::new()
            } else {
                let start = header.sh_offset as usize;
                let end = start
                    .checked_add(header.sh_size as usize)
                    .filter(|&end| end <= bytes.len())
                    .ok_or_else(|| ImageError::TruncatedSection { name: name.clone() })?;
                bytes[start..end].to_vec()
            };

            let size = header.sh_size as usize;
            sections.push(Section {
                name,
                kind,
                first_vpn: (header.sh_addr as usize) / Config::PAGE_SIZE,
                num_pages: size.div_ceil(Config::PAGE_SIZE),
                size,
                data,
            });
        }

        if sections.is_empty() {
            return Err(ImageError::NoSections);
        }
        sections.sort_by_key(|s| s.first_vpn);

        tracing::debug!(
            target: "image",
            entry = format_args!("0x{:08x}", elf.entry),
            sections = sections.len(),
            "parsed executable"
        );

        Ok(Self {
            entry: elf.entry as u32,
            sections,
        })
    }

    pub fn entry_point(&self) -> u32 {
        self.entry
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }
}
