/// Major opcodes (bits 6:0) of the RV32IM base encoding.
///
/// Each opcode selects an instruction format. The decoder reads the
/// remaining fields according to that format.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// LB, LH, LW, LBU, LHU (I-type)
    Load = 0x03,
    /// FENCE (treated as a no-op, there is one hart per address space)
    MiscMem = 0x0f,
    /// ADDI, SLTI, SLTIU, XORI, ORI, ANDI, SLLI, SRLI, SRAI (I-type)
    OpImm = 0x13,
    /// AUIPC (U-type)
    Auipc = 0x17,
    /// SB, SH, SW (S-type)
    Store = 0x23,
    /// Register-register ALU and the M extension (R-type)
    Op = 0x33,
    /// LUI (U-type)
    Lui = 0x37,
    /// BEQ, BNE, BLT, BGE, BLTU, BGEU (B-type)
    Branch = 0x63,
    /// JALR (I-type)
    Jalr = 0x67,
    /// JAL (J-type)
    Jal = 0x6f,
    /// ECALL, EBREAK
    System = 0x73,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x03 => Some(Opcode::Load),
            0x0f => Some(Opcode::MiscMem),
            0x13 => Some(Opcode::OpImm),
            0x17 => Some(Opcode::Auipc),
            0x23 => Some(Opcode::Store),
            0x33 => Some(Opcode::Op),
            0x37 => Some(Opcode::Lui),
            0x63 => Some(Opcode::Branch),
            0x67 => Some(Opcode::Jalr),
            0x6f => Some(Opcode::Jal),
            0x73 => Some(Opcode::System),
            _ => None,
        }
    }
}

pub const ECALL_WORD: u32 = 0x0000_0073;
pub const EBREAK_WORD: u32 = 0x0010_0073;
