use goblin::elf::header::{EM_RISCV, ET_EXEC};
use goblin::elf::section_header::{
    SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHT_NOBITS, SHT_PROGBITS, SHT_STRTAB,
};

use crate::section::SectionKind;

const EHDR_SIZE: usize = 52;
const PHDR_SIZE: u16 = 32;
const SHDR_SIZE: usize = 40;

#[derive(Debug, Clone)]
struct PendingSection {
    name: String,
    kind: SectionKind,
    addr: u32,
    data: Vec<u8>,
    size: u32,
}

/// Builds minimal ELF32 RISC-V executables: a file header, section data
/// and a section header table. No program headers are emitted.
#[derive(Debug, Clone)]
pub struct ImageWriter {
    entry: u32,
    machine: u16,
    sections: Vec<PendingSection>,
}

impl ImageWriter {
    pub fn new(entry: u32) -> Self {
        Self {
            entry,
            machine: EM_RISCV,
            sections: Vec::new(),
        }
    }

    /// Overrides `e_machine`.
    pub fn machine(&mut self, machine: u16) -> &mut Self {
        self.machine = machine;
        self
    }

    pub fn section(&mut self, name: &str, kind: SectionKind, addr: u32, data: &[u8]) -> &mut Self {
        self.sections.push(PendingSection {
            name: name.to_string(),
            kind,
            addr,
            data: data.to_vec(),
            size: data.len() as u32,
        });
        self
    }

    pub fn bss(&mut self, name: &str, addr: u32, size: u32) -> &mut Self {
        self.sections.push(PendingSection {
            name: name.to_string(),
            kind: SectionKind::Bss,
            addr,
            data: Vec::new(),
            size,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; EHDR_SIZE];

        // Section contents.
        let mut offsets = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            align4(&mut out);
            offsets.push(out.len() as u32);
            out.extend_from_slice(&section.data);
        }

        // Section name table: leading NUL, user names, then its own name.
        let mut strtab = vec![0u8];
        let mut name_offsets = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            name_offsets.push(strtab.len() as u32);
            strtab.extend_from_slice(section.name.as_bytes());
            strtab.push(0);
        }
        let shstrtab_name = strtab.len() as u32;
        strtab.extend_from_slice(b".shstrtab\0");
        let strtab_offset = out.len() as u32;
        out.extend_from_slice(&strtab);

        align4(&mut out);
        let shoff = out.len() as u32;

        // Null section header.
        out.extend_from_slice(&[0u8; SHDR_SIZE]);
        for (i, section) in self.sections.iter().enumerate() {
            let (sh_type, flags) = match section.kind {
                SectionKind::Code => (SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR),
                SectionKind::ReadOnlyData => (SHT_PROGBITS, SHF_ALLOC),
                SectionKind::Data => (SHT_PROGBITS, SHF_ALLOC | SHF_WRITE),
                SectionKind::Bss => (SHT_NOBITS, SHF_ALLOC | SHF_WRITE),
            };
            push_shdr(
                &mut out,
                [
                    name_offsets[i],
                    sh_type,
                    flags,
                    section.addr,
                    offsets[i],
                    section.size,
                    0,
                    0,
                    4,
                    0,
                ],
            );
        }
        push_shdr(
            &mut out,
            [
                shstrtab_name,
                SHT_STRTAB,
                0,
                0,
                strtab_offset,
                strtab.len() as u32,
                0,
                0,
                1,
                0,
            ],
        );

        let shnum = (self.sections.len() + 2) as u16;
        let header = &mut out[..EHDR_SIZE];
        header[..4].copy_from_slice(b"\x7fELF");
        header[4] = 1; // ELFCLASS32
        header[5] = 1; // little endian
        header[6] = 1; // EV_CURRENT
        put16(header, 16, ET_EXEC);
        put16(header, 18, self.machine);
        put32(header, 20, 1);
        put32(header, 24, self.entry);
        put32(header, 28, 0); // e_phoff
        put32(header, 32, shoff);
        put32(header, 36, 0); // e_flags
        put16(header, 40, EHDR_SIZE as u16);
        put16(header, 42, PHDR_SIZE);
        put16(header, 44, 0); // e_phnum
        put16(header, 46, SHDR_SIZE as u16);
        put16(header, 48, shnum);
        put16(header, 50, shnum - 1);
        out
    }
}

fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn push_shdr(out: &mut Vec<u8>, fields: [u32; 10]) {
    for field in fields {
        out.extend_from_slice(&field.to_le_bytes());
    }
}

fn put16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
