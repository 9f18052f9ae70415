use crate::instruction::Instruction;
use crate::isa::{Opcode, EBREAK_WORD, ECALL_WORD};

/// Decodes one 32-bit little-endian instruction word.
///
/// Only the RV32I base set plus the M extension are recognized. Returns
/// `None` for anything else, including the all-zero word, so running into
/// zero-filled memory raises an illegal-instruction exception.
///
/// ```text
/// 31:25 funct7 | 24:20 rs2 | 19:15 rs1 | 14:12 funct3 | 11:7 rd | 6:0 opcode
/// ```
pub fn decode(word: u32) -> Option<Instruction> {
    let opcode = Opcode::from_u8((word & 0x7f) as u8)?;

    let rd = ((word >> 7) & 0x1f) as usize;
    let funct3 = ((word >> 12) & 0x07) as u8;
    let rs1 = ((word >> 15) & 0x1f) as usize;
    let rs2 = ((word >> 20) & 0x1f) as usize;
    let funct7 = ((word >> 25) & 0x7f) as u8;

    match opcode {
        Opcode::Op => match (funct3, funct7) {
            (0x0, 0x00) => Some(Instruction::Add { rd, rs1, rs2 }),
            (0x0, 0x20) => Some(Instruction::Sub { rd, rs1, rs2 }),
            (0x1, 0x00) => Some(Instruction::Sll { rd, rs1, rs2 }),
            (0x2, 0x00) => Some(Instruction::Slt { rd, rs1, rs2 }),
            (0x3, 0x00) => Some(Instruction::Sltu { rd, rs1, rs2 }),
            (0x4, 0x00) => Some(Instruction::Xor { rd, rs1, rs2 }),
            (0x5, 0x00) => Some(Instruction::Srl { rd, rs1, rs2 }),
            (0x5, 0x20) => Some(Instruction::Sra { rd, rs1, rs2 }),
            (0x6, 0x00) => Some(Instruction::Or { rd, rs1, rs2 }),
            (0x7, 0x00) => Some(Instruction::And { rd, rs1, rs2 }),

            // M extension
            (0x0, 0x01) => Some(Instruction::Mul { rd, rs1, rs2 }),
            (0x1, 0x01) => Some(Instruction::Mulh { rd, rs1, rs2 }),
            (0x2, 0x01) => Some(Instruction::Mulhsu { rd, rs1, rs2 }),
            (0x3, 0x01) => Some(Instruction::Mulhu { rd, rs1, rs2 }),
            (0x4, 0x01) => Some(Instruction::Div { rd, rs1, rs2 }),
            (0x5, 0x01) => Some(Instruction::Divu { rd, rs1, rs2 }),
            (0x6, 0x01) => Some(Instruction::Rem { rd, rs1, rs2 }),
            (0x7, 0x01) => Some(Instruction::Remu { rd, rs1, rs2 }),
            _ => None,
        },

        Opcode::OpImm => {
            let imm = i_imm(word);
            let shamt = rs2 as u8;
            match funct3 {
                0x0 => Some(Instruction::Addi { rd, rs1, imm }),
                0x2 => Some(Instruction::Slti { rd, rs1, imm }),
                0x3 => Some(Instruction::Sltiu { rd, rs1, imm }),
                0x4 => Some(Instruction::Xori { rd, rs1, imm }),
                0x6 => Some(Instruction::Ori { rd, rs1, imm }),
                0x7 => Some(Instruction::Andi { rd, rs1, imm }),
                0x1 if funct7 == 0x00 => Some(Instruction::Slli { rd, rs1, shamt }),
                0x5 if funct7 == 0x00 => Some(Instruction::Srli { rd, rs1, shamt }),
                0x5 if funct7 == 0x20 => Some(Instruction::Srai { rd, rs1, shamt }),
                _ => None,
            }
        }

        Opcode::Load => {
            let offset = i_imm(word);
            match funct3 {
                0x0 => Some(Instruction::Lb { rd, rs1, offset }),
                0x1 => Some(Instruction::Lh { rd, rs1, offset }),
                0x2 => Some(Instruction::Lw { rd, rs1, offset }),
                0x4 => Some(Instruction::Lbu { rd, rs1, offset }),
                0x5 => Some(Instruction::Lhu { rd, rs1, offset }),
                _ => None,
            }
        }

        Opcode::Store => {
            let offset = s_imm(word);
            match funct3 {
                0x0 => Some(Instruction::Sb { rs1, rs2, offset }),
                0x1 => Some(Instruction::Sh { rs1, rs2, offset }),
                0x2 => Some(Instruction::Sw { rs1, rs2, offset }),
                _ => None,
            }
        }

        Opcode::Branch => {
            let offset = extract_branch_offset(word);
            match funct3 {
                0x0 => Some(Instruction::Beq { rs1, rs2, offset }),
                0x1 => Some(Instruction::Bne { rs1, rs2, offset }),
                0x4 => Some(Instruction::Blt { rs1, rs2, offset }),
                0x5 => Some(Instruction::Bge { rs1, rs2, offset }),
                0x6 => Some(Instruction::Bltu { rs1, rs2, offset }),
                0x7 => Some(Instruction::Bgeu { rs1, rs2, offset }),
                _ => None,
            }
        }

        Opcode::Jal => Some(Instruction::Jal {
            rd,
            offset: extract_jal_offset(word),
        }),

        Opcode::Jalr if funct3 == 0 => Some(Instruction::Jalr {
            rd,
            rs1,
            offset: i_imm(word),
        }),
        Opcode::Jalr => None,

        Opcode::Lui => Some(Instruction::Lui {
            rd,
            imm: ((word >> 12) & 0xfffff) as i32,
        }),
        Opcode::Auipc => Some(Instruction::Auipc {
            rd,
            imm: ((word >> 12) & 0xfffff) as i32,
        }),

        Opcode::MiscMem => Some(Instruction::Fence),

        Opcode::System => match word {
            ECALL_WORD => Some(Instruction::Ecall),
            EBREAK_WORD => Some(Instruction::Ebreak),
            _ => None,
        },
    }
}

/// I-type: 12-bit immediate in bits 31:20, sign extended.
fn i_imm(word: u32) -> i32 {
    (word as i32) >> 20
}

/// S-type: 12-bit immediate split across bits 31:25 and 11:7.
fn s_imm(word: u32) -> i32 {
    (((word & 0xfe00_0000) as i32) >> 20) | ((word >> 7) & 0x1f) as i32
}

fn extract_branch_offset(word: u32) -> i32 {
    let imm12 = ((word >> 31) & 0x1) << 12;
    let imm10_5 = ((word >> 25) & 0x3f) << 5;
    let imm4_1 = ((word >> 8) & 0xf) << 1;
    let imm11 = ((word >> 7) & 0x1) << 11;
    let imm = (imm12 | imm11 | imm10_5 | imm4_1) as i32;
    (imm << 19) >> 19
}

fn extract_jal_offset(word: u32) -> i32 {
    let imm20 = ((word >> 31) & 0x1) << 20;
    let imm10_1 = ((word >> 21) & 0x3ff) << 1;
    let imm11 = ((word >> 20) & 0x1) << 11;
    let imm19_12 = ((word >> 12) & 0xff) << 12;
    let imm = (imm20 | imm19_12 | imm11 | imm10_1) as i32;
    (imm << 11) >> 11
}
