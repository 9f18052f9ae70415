//! A tiny RV32IM assembler.
//!
//! Guest programs for tests and the demo runner are written with it instead
//! of a cross toolchain. It knows the handful of pseudo-instructions user
//! programs need (`li`, `la`, `mv`, `j`, `ret`) and resolves labels in a
//! second pass when [`Assembler::finish`] is called.

use std::collections::HashMap;

use thiserror::Error;

use crate::instruction::Instruction;
use crate::isa::{Opcode, EBREAK_WORD, ECALL_WORD};
use crate::registers::Register;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsmError {
    #[error("undefined label `{0}`")]
    UnknownLabel(String),
    #[error("label `{0}` defined twice")]
    DuplicateLabel(String),
    #[error("label `{label}` is out of range ({offset} bytes away)")]
    OutOfRange { label: String, offset: i64 },
}

#[derive(Debug, Clone, Copy)]
enum FixupKind {
    Branch,
    Jump,
    AbsoluteHi,
    AbsoluteLo,
}

#[derive(Debug)]
struct Fixup {
    index: usize,
    label: String,
    kind: FixupKind,
}

#[derive(Debug)]
pub struct Assembler {
    base: u32,
    words: Vec<u32>,
    labels: HashMap<String, u32>,
    duplicates: Vec<String>,
    fixups: Vec<Fixup>,
}

impl Assembler {
    /// Starts a program whose first word lives at virtual address `base`.
    pub fn new(base: u32) -> Self {
        Self {
            base,
            words: Vec::new(),
            labels: HashMap::new(),
            duplicates: Vec::new(),
            fixups: Vec::new(),
        }
    }

    /// Address the next emitted word will occupy.
    pub fn pc(&self) -> u32 {
        self.base + (self.words.len() as u32) * 4
    }

    pub fn label(&mut self, name: &str) -> &mut Self {
        let pc = self.pc();
        if self.labels.insert(name.to_string(), pc).is_some() {
            self.duplicates.push(name.to_string());
        }
        self
    }

    pub fn emit(&mut self, instr: Instruction) -> &mut Self {
        self.words.push(encode(&instr));
        self
    }

    pub fn word(&mut self, value: u32) -> &mut Self {
        self.words.push(value);
        self
    }

    /// Raw bytes, zero padded to a word boundary.
    pub fn data(&mut self, bytes: &[u8]) -> &mut Self {
        for chunk in bytes.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.words.push(u32::from_le_bytes(word));
        }
        self
    }

    /// NUL-terminated string data.
    pub fn asciz(&mut self, text: &str) -> &mut Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.data(&bytes)
    }

    /// Loads a 32-bit constant.
    pub fn li(&mut self, rd: Register, value: i32) -> &mut Self {
        let rd = rd.index();
        if (-2048..2048).contains(&value) {
            return self.emit(Instruction::Addi { rd, rs1: 0, imm: value });
        }
        let (hi, lo) = split_hi_lo(value as u32);
        self.emit(Instruction::Lui { rd, imm: hi });
        if lo != 0 {
            self.emit(Instruction::Addi { rd, rs1: rd, imm: lo });
        }
        self
    }

    /// Loads the absolute address of a label. Always two words.
    pub fn la(&mut self, rd: Register, label: &str) -> &mut Self {
        let rd = rd.index();
        self.fixup(label, FixupKind::AbsoluteHi);
        self.emit(Instruction::Lui { rd, imm: 0 });
        self.fixup(label, FixupKind::AbsoluteLo);
        self.emit(Instruction::Addi { rd, rs1: rd, imm: 0 })
    }

    pub fn mv(&mut self, rd: Register, rs: Register) -> &mut Self {
        self.addi(rd, rs, 0)
    }

    pub fn addi(&mut self, rd: Register, rs1: Register, imm: i32) -> &mut Self {
        self.emit(Instruction::Addi {
            rd: rd.index(),
            rs1: rs1.index(),
            imm,
        })
    }

    pub fn add(&mut self, rd: Register, rs1: Register, rs2: Register) -> &mut Self {
        self.emit(Instruction::Add {
            rd: rd.index(),
            rs1: rs1.index(),
            rs2: rs2.index(),
        })
    }

    pub fn lw(&mut self, rd: Register, rs1: Register, offset: i32) -> &mut Self {
        self.emit(Instruction::Lw {
            rd: rd.index(),
            rs1: rs1.index(),
            offset,
        })
    }

    pub fn sw(&mut self, rs2: Register, rs1: Register, offset: i32) -> &mut Self {
        self.emit(Instruction::Sw {
            rs1: rs1.index(),
            rs2: rs2.index(),
            offset,
        })
    }

    pub fn lbu(&mut self, rd: Register, rs1: Register, offset: i32) -> &mut Self {
        self.emit(Instruction::Lbu {
            rd: rd.index(),
            rs1: rs1.index(),
            offset,
        })
    }

    pub fn sb(&mut self, rs2: Register, rs1: Register, offset: i32) -> &mut Self {
        self.emit(Instruction::Sb {
            rs1: rs1.index(),
            rs2: rs2.index(),
            offset,
        })
    }

    pub fn beq(&mut self, rs1: Register, rs2: Register, label: &str) -> &mut Self {
        self.branch(label, |rs1, rs2| Instruction::Beq { rs1, rs2, offset: 0 }, rs1, rs2)
    }

    pub fn bne(&mut self, rs1: Register, rs2: Register, label: &str) -> &mut Self {
        self.branch(label, |rs1, rs2| Instruction::Bne { rs1, rs2, offset: 0 }, rs1, rs2)
    }

    pub fn blt(&mut self, rs1: Register, rs2: Register, label: &str) -> &mut Self {
        self.branch(label, |rs1, rs2| Instruction::Blt { rs1, rs2, offset: 0 }, rs1, rs2)
    }

    pub fn bge(&mut self, rs1: Register, rs2: Register, label: &str) -> &mut Self {
        self.branch(label, |rs1, rs2| Instruction::Bge { rs1, rs2, offset: 0 }, rs1, rs2)
    }

    pub fn beqz(&mut self, rs1: Register, label: &str) -> &mut Self {
        self.beq(rs1, Register::Zero, label)
    }

    pub fn bnez(&mut self, rs1: Register, label: &str) -> &mut Self {
        self.bne(rs1, Register::Zero, label)
    }

    /// Unconditional jump.
    pub fn j(&mut self, label: &str) -> &mut Self {
        self.fixup(label, FixupKind::Jump);
        self.emit(Instruction::Jal { rd: 0, offset: 0 })
    }

    /// Call: jump and link through `ra`.
    pub fn call(&mut self, label: &str) -> &mut Self {
        self.fixup(label, FixupKind::Jump);
        self.emit(Instruction::Jal {
            rd: Register::Ra.index(),
            offset: 0,
        })
    }

    pub fn ret(&mut self) -> &mut Self {
        self.emit(Instruction::Jalr {
            rd: 0,
            rs1: Register::Ra.index(),
            offset: 0,
        })
    }

    pub fn ecall(&mut self) -> &mut Self {
        self.word(ECALL_WORD)
    }

    pub fn ebreak(&mut self) -> &mut Self {
        self.word(EBREAK_WORD)
    }

    /// `li a7, id` followed by `ecall`.
    pub fn syscall(&mut self, id: u32) -> &mut Self {
        self.li(Register::A7, id as i32);
        self.ecall()
    }

    /// Resolves labels and returns the little-endian program bytes.
    pub fn finish(&self) -> Result<Vec<u8>, AsmError> {
        if let Some(name) = self.duplicates.first() {
            return Err(AsmError::DuplicateLabel(name.clone()));
        }
        let mut words = self.words.clone();
        for fixup in &self.fixups {
            let target = *self
                .labels
                .get(&fixup.label)
                .ok_or_else(|| AsmError::UnknownLabel(fixup.label.clone()))?;
            let at = self.base + (fixup.index as u32) * 4;
            let offset = target as i64 - at as i64;
            let word = &mut words[fixup.index];
            match fixup.kind {
                FixupKind::Branch => {
                    if !(-4096..4096).contains(&offset) {
                        return Err(out_of_range(fixup, offset));
                    }
                    *word = (*word & 0x01ff_f07f) | b_imm(offset as i32);
                }
                FixupKind::Jump => {
                    if !(-(1 << 20)..(1 << 20)).contains(&offset) {
                        return Err(out_of_range(fixup, offset));
                    }
                    *word = (*word & 0x0000_0fff) | j_imm(offset as i32);
                }
                FixupKind::AbsoluteHi => {
                    let (hi, _) = split_hi_lo(target);
                    *word = (*word & 0x0000_0fff) | ((hi as u32) << 12);
                }
                FixupKind::AbsoluteLo => {
                    let (_, lo) = split_hi_lo(target);
                    *word = (*word & 0x000f_ffff) | ((lo as u32 & 0xfff) << 20);
                }
            }
        }
        Ok(words.iter().flat_map(|w| w.to_le_bytes()).collect())
    }

    fn fixup(&mut self, label: &str, kind: FixupKind) {
        self.fixups.push(Fixup {
            index: self.words.len(),
            label: label.to_string(),
            kind,
        });
    }

    fn branch(
        &mut self,
        label: &str,
        make: fn(usize, usize) -> Instruction,
        rs1: Register,
        rs2: Register,
    ) -> &mut Self {
        self.fixup(label, FixupKind::Branch);
        self.emit(make(rs1.index(), rs2.index()))
    }
}

fn out_of_range(fixup: &Fixup, offset: i64) -> AsmError {
    AsmError::OutOfRange {
        label: fixup.label.clone(),
        offset,
    }
}

/// Splits a constant into a `lui` upper part and a sign-extended `addi` part.
fn split_hi_lo(value: u32) -> (i32, i32) {
    let hi = (value.wrapping_add(0x800) >> 12) & 0xfffff;
    let lo = value.wrapping_sub(hi << 12) as i32;
    (hi as i32, lo)
}

/// Encodes a decoded instruction back into its 32-bit word.
pub fn encode(instr: &Instruction) -> u32 {
    use Instruction::*;
    let op = |o: Opcode| o as u32;
    match *instr {
        Add { rd, rs1, rs2 } => r_type(0x00, rs2, rs1, 0x0, rd),
        Sub { rd, rs1, rs2 } => r_type(0x20, rs2, rs1, 0x0, rd),
        Sll { rd, rs1, rs2 } => r_type(0x00, rs2, rs1, 0x1, rd),
        Slt { rd, rs1, rs2 } => r_type(0x00, rs2, rs1, 0x2, rd),
        Sltu { rd, rs1, rs2 } => r_type(0x00, rs2, rs1, 0x3, rd),
        Xor { rd, rs1, rs2 } => r_type(0x00, rs2, rs1, 0x4, rd),
        Srl { rd, rs1, rs2 } => r_type(0x00, rs2, rs1, 0x5, rd),
        Sra { rd, rs1, rs2 } => r_type(0x20, rs2, rs1, 0x5, rd),
        Or { rd, rs1, rs2 } => r_type(0x00, rs2, rs1, 0x6, rd),
        And { rd, rs1, rs2 } => r_type(0x00, rs2, rs1, 0x7, rd),
        Mul { rd, rs1, rs2 } => r_type(0x01, rs2, rs1, 0x0, rd),
        Mulh { rd, rs1, rs2 } => r_type(0x01, rs2, rs1, 0x1, rd),
        Mulhsu { rd, rs1, rs2 } => r_type(0x01, rs2, rs1, 0x2, rd),
        Mulhu { rd, rs1, rs2 } => r_type(0x01, rs2, rs1, 0x3, rd),
        Div { rd, rs1, rs2 } => r_type(0x01, rs2, rs1, 0x4, rd),
        Divu { rd, rs1, rs2 } => r_type(0x01, rs2, rs1, 0x5, rd),
        Rem { rd, rs1, rs2 } => r_type(0x01, rs2, rs1, 0x6, rd),
        Remu { rd, rs1, rs2 } => r_type(0x01, rs2, rs1, 0x7, rd),

        Addi { rd, rs1, imm } => i_type(imm, rs1, 0x0, rd, op(Opcode::OpImm)),
        Slti { rd, rs1, imm } => i_type(imm, rs1, 0x2, rd, op(Opcode::OpImm)),
        Sltiu { rd, rs1, imm } => i_type(imm, rs1, 0x3, rd, op(Opcode::OpImm)),
        Xori { rd, rs1, imm } => i_type(imm, rs1, 0x4, rd, op(Opcode::OpImm)),
        Ori { rd, rs1, imm } => i_type(imm, rs1, 0x6, rd, op(Opcode::OpImm)),
        Andi { rd, rs1, imm } => i_type(imm, rs1, 0x7, rd, op(Opcode::OpImm)),
        Slli { rd, rs1, shamt } => i_type(shamt as i32 & 0x1f, rs1, 0x1, rd, op(Opcode::OpImm)),
        Srli { rd, rs1, shamt } => i_type(shamt as i32 & 0x1f, rs1, 0x5, rd, op(Opcode::OpImm)),
        Srai { rd, rs1, shamt } => {
            i_type(0x400 | (shamt as i32 & 0x1f), rs1, 0x5, rd, op(Opcode::OpImm))
        }

        Lb { rd, rs1, offset } => i_type(offset, rs1, 0x0, rd, op(Opcode::Load)),
        Lh { rd, rs1, offset } => i_type(offset, rs1, 0x1, rd, op(Opcode::Load)),
        Lw { rd, rs1, offset } => i_type(offset, rs1, 0x2, rd, op(Opcode::Load)),
        Lbu { rd, rs1, offset } => i_type(offset, rs1, 0x4, rd, op(Opcode::Load)),
        Lhu { rd, rs1, offset } => i_type(offset, rs1, 0x5, rd, op(Opcode::Load)),
        Sb { rs1, rs2, offset } => s_type(offset, rs2, rs1, 0x0),
        Sh { rs1, rs2, offset } => s_type(offset, rs2, rs1, 0x1),
        Sw { rs1, rs2, offset } => s_type(offset, rs2, rs1, 0x2),

        Beq { rs1, rs2, offset } => branch_word(offset, rs2, rs1, 0x0),
        Bne { rs1, rs2, offset } => branch_word(offset, rs2, rs1, 0x1),
        Blt { rs1, rs2, offset } => branch_word(offset, rs2, rs1, 0x4),
        Bge { rs1, rs2, offset } => branch_word(offset, rs2, rs1, 0x5),
        Bltu { rs1, rs2, offset } => branch_word(offset, rs2, rs1, 0x6),
        Bgeu { rs1, rs2, offset } => branch_word(offset, rs2, rs1, 0x7),

        Jal { rd, offset } => j_imm(offset) | ((rd as u32) << 7) | op(Opcode::Jal),
        Jalr { rd, rs1, offset } => i_type(offset, rs1, 0x0, rd, op(Opcode::Jalr)),
        Lui { rd, imm } => ((imm as u32 & 0xfffff) << 12) | ((rd as u32) << 7) | op(Opcode::Lui),
        Auipc { rd, imm } => {
            ((imm as u32 & 0xfffff) << 12) | ((rd as u32) << 7) | op(Opcode::Auipc)
        }

        Fence => 0x0ff0_000f,
        Ecall => ECALL_WORD,
        Ebreak => EBREAK_WORD,
    }
}

fn r_type(funct7: u32, rs2: usize, rs1: usize, funct3: u32, rd: usize) -> u32 {
    (funct7 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((rd as u32) << 7)
        | Opcode::Op as u32
}

fn i_type(imm: i32, rs1: usize, funct3: u32, rd: usize, opcode: u32) -> u32 {
    ((imm as u32 & 0xfff) << 20) | ((rs1 as u32) << 15) | (funct3 << 12) | ((rd as u32) << 7) | opcode
}

fn s_type(imm: i32, rs2: usize, rs1: usize, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7f) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((imm & 0x1f) << 7)
        | Opcode::Store as u32
}

fn branch_word(offset: i32, rs2: usize, rs1: usize, funct3: u32) -> u32 {
    b_imm(offset)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | Opcode::Branch as u32
}

fn b_imm(offset: i32) -> u32 {
    let imm = offset as u32;
    (((imm >> 12) & 0x1) << 31)
        | (((imm >> 5) & 0x3f) << 25)
        | (((imm >> 1) & 0xf) << 8)
        | (((imm >> 11) & 0x1) << 7)
}

fn j_imm(offset: i32) -> u32 {
    let imm = offset as u32;
    (((imm >> 20) & 0x1) << 31)
        | (((imm >> 1) & 0x3ff) << 21)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 12) & 0xff) << 12)
}
