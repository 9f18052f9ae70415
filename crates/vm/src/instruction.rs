use crate::registers::reg_name;

/// Decoded RV32IM instruction.
///
/// Register fields are raw indices (0..32). Immediates are already sign
/// extended. `Lui`/`Auipc` carry the unshifted 20-bit upper immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // ===== RV32I =====
    /// Add: rd = rs1 + rs2
    Add { rd: usize, rs1: usize, rs2: usize },
    /// Subtract: rd = rs1 - rs2
    Sub { rd: usize, rs1: usize, rs2: usize },
    /// Add immediate: rd = rs1 + imm
    Addi { rd: usize, rs1: usize, imm: i32 },

    And { rd: usize, rs1: usize, rs2: usize },
    Or { rd: usize, rs1: usize, rs2: usize },
    Xor { rd: usize, rs1: usize, rs2: usize },
    Andi { rd: usize, rs1: usize, imm: i32 },
    Ori { rd: usize, rs1: usize, imm: i32 },
    Xori { rd: usize, rs1: usize, imm: i32 },

    /// Set less than (signed)
    Slt { rd: usize, rs1: usize, rs2: usize },
    /// Set less than (unsigned)
    Sltu { rd: usize, rs1: usize, rs2: usize },
    Slti { rd: usize, rs1: usize, imm: i32 },
    Sltiu { rd: usize, rs1: usize, imm: i32 },

    Sll { rd: usize, rs1: usize, rs2: usize },
    Srl { rd: usize, rs1: usize, rs2: usize },
    Sra { rd: usize, rs1: usize, rs2: usize },
    Slli { rd: usize, rs1: usize, shamt: u8 },
    Srli { rd: usize, rs1: usize, shamt: u8 },
    Srai { rd: usize, rs1: usize, shamt: u8 },

    /// Load byte, sign extended
    Lb { rd: usize, rs1: usize, offset: i32 },
    /// Load halfword, sign extended
    Lh { rd: usize, rs1: usize, offset: i32 },
    Lw { rd: usize, rs1: usize, offset: i32 },
    /// Load byte, zero extended
    Lbu { rd: usize, rs1: usize, offset: i32 },
    /// Load halfword, zero extended
    Lhu { rd: usize, rs1: usize, offset: i32 },
    Sb { rs1: usize, rs2: usize, offset: i32 },
    Sh { rs1: usize, rs2: usize, offset: i32 },
    Sw { rs1: usize, rs2: usize, offset: i32 },

    Beq { rs1: usize, rs2: usize, offset: i32 },
    Bne { rs1: usize, rs2: usize, offset: i32 },
    Blt { rs1: usize, rs2: usize, offset: i32 },
    Bge { rs1: usize, rs2: usize, offset: i32 },
    Bltu { rs1: usize, rs2: usize, offset: i32 },
    Bgeu { rs1: usize, rs2: usize, offset: i32 },

    /// Jump and link: rd = pc + 4; pc += offset
    Jal { rd: usize, offset: i32 },
    /// Jump and link register: rd = pc + 4; pc = (rs1 + offset) & !1
    Jalr { rd: usize, rs1: usize, offset: i32 },

    /// Load upper immediate: rd = imm << 12
    Lui { rd: usize, imm: i32 },
    /// Add upper immediate to pc: rd = pc + (imm << 12)
    Auipc { rd: usize, imm: i32 },

    // ===== RV32M =====
    Mul { rd: usize, rs1: usize, rs2: usize },
    Mulh { rd: usize, rs1: usize, rs2: usize },
    Mulhsu { rd: usize, rs1: usize, rs2: usize },
    Mulhu { rd: usize, rs1: usize, rs2: usize },
    Div { rd: usize, rs1: usize, rs2: usize },
    Divu { rd: usize, rs1: usize, rs2: usize },
    Rem { rd: usize, rs1: usize, rs2: usize },
    Remu { rd: usize, rs1: usize, rs2: usize },

    // ===== System =====
    Fence,
    /// Environment call into the kernel
    Ecall,
    Ebreak,
}

impl Instruction {
    /// Assembly-style rendering for trace output.
    pub fn pretty_print(&self) -> String {
        use Instruction::*;
        let r = reg_name;
        match *self {
            Add { rd, rs1, rs2 } => format!("add {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Sub { rd, rs1, rs2 } => format!("sub {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Addi { rd, rs1, imm } => format!("addi {}, {}, {}", r(rd), r(rs1), imm),
            And { rd, rs1, rs2 } => format!("and {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Or { rd, rs1, rs2 } => format!("or {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Xor { rd, rs1, rs2 } => format!("xor {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Andi { rd, rs1, imm } => format!("andi {}, {}, {}", r(rd), r(rs1), imm),
            Ori { rd, rs1, imm } => format!("ori {}, {}, {}", r(rd), r(rs1), imm),
            Xori { rd, rs1, imm } => format!("xori {}, {}, {}", r(rd), r(rs1), imm),
            Slt { rd, rs1, rs2 } => format!("slt {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Sltu { rd, rs1, rs2 } => format!("sltu {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Slti { rd, rs1, imm } => format!("slti {}, {}, {}", r(rd), r(rs1), imm),
            Sltiu { rd, rs1, imm } => format!("sltiu {}, {}, {}", r(rd), r(rs1), imm),
            Sll { rd, rs1, rs2 } => format!("sll {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Srl { rd, rs1, rs2 } => format!("srl {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Sra { rd, rs1, rs2 } => format!("sra {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Slli { rd, rs1, shamt } => format!("slli {}, {}, {}", r(rd), r(rs1), shamt),
            Srli { rd, rs1, shamt } => format!("srli {}, {}, {}", r(rd), r(rs1), shamt),
            Srai { rd, rs1, shamt } => format!("srai {}, {}, {}", r(rd), r(rs1), shamt),
            Lb { rd, rs1, offset } => format!("lb {}, {}({})", r(rd), offset, r(rs1)),
            Lh { rd, rs1, offset } => format!("lh {}, {}({})", r(rd), offset, r(rs1)),
            Lw { rd, rs1, offset } => format!("lw {}, {}({})", r(rd), offset, r(rs1)),
            Lbu { rd, rs1, offset } => format!("lbu {}, {}({})", r(rd), offset, r(rs1)),
            Lhu { rd, rs1, offset } => format!("lhu {}, {}({})", r(rd), offset, r(rs1)),
            Sb { rs1, rs2, offset } => format!("sb {}, {}({})", r(rs2), offset, r(rs1)),
            Sh { rs1, rs2, offset } => format!("sh {}, {}({})", r(rs2), offset, r(rs1)),
            Sw { rs1, rs2, offset } => format!("sw {}, {}({})", r(rs2), offset, r(rs1)),
            Beq { rs1, rs2, offset } => format!("beq {}, {}, {}", r(rs1), r(rs2), offset),
            Bne { rs1, rs2, offset } => format!("bne {}, {}, {}", r(rs1), r(rs2), offset),
            Blt { rs1, rs2, offset } => format!("blt {}, {}, {}", r(rs1), r(rs2), offset),
            Bge { rs1, rs2, offset } => format!("bge {}, {}, {}", r(rs1), r(rs2), offset),
            Bltu { rs1, rs2, offset } => format!("bltu {}, {}, {}", r(rs1), r(rs2), offset),
            Bgeu { rs1, rs2, offset } => format!("bgeu {}, {}, {}", r(rs1), r(rs2), offset),
            Jal { rd, offset } => format!("jal {}, {}", r(rd), offset),
            Jalr { rd, rs1, offset } => format!("jalr {}, {}({})", r(rd), offset, r(rs1)),
            Lui { rd, imm } => format!("lui {}, 0x{:x}", r(rd), imm),
            Auipc { rd, imm } => format!("auipc {}, 0x{:x}", r(rd), imm),
            Mul { rd, rs1, rs2 } => format!("mul {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Mulh { rd, rs1, rs2 } => format!("mulh {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Mulhsu { rd, rs1, rs2 } => format!("mulhsu {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Mulhu { rd, rs1, rs2 } => format!("mulhu {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Div { rd, rs1, rs2 } => format!("div {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Divu { rd, rs1, rs2 } => format!("divu {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Rem { rd, rs1, rs2 } => format!("rem {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Remu { rd, rs1, rs2 } => format!("remu {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Fence => "fence".to_string(),
            Ecall => "ecall".to_string(),
            Ebreak => "ebreak".to_string(),
        }
    }
}
