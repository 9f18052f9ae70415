use crate::decoder::decode;
use crate::exception::ExceptionCause;
use crate::instruction::Instruction;
use crate::memory::{Mmu, VirtualAddress};

/// User-mode register state of one hart: 32 integer registers plus the pc.
///
/// Every process owns its own `Processor`, so there is nothing to save or
/// restore on a context switch. Memory goes through the `Mmu` passed to
/// [`Processor::step`].
#[derive(Debug, Clone, Default)]
pub struct Processor {
    /// Address of the next instruction to execute.
    pub pc: u32,
    /// General-purpose registers x0-x31. x0 always reads as zero.
    pub regs: [u32; 32],
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_register(&self, index: usize) -> u32 {
        self.regs.get(index).copied().unwrap_or(0)
    }

    /// Writes a register. Writes to x0 and out-of-range indices are dropped.
    pub fn write_register(&mut self, index: usize, value: u32) {
        if index != 0 && index < self.regs.len() {
            self.regs[index] = value;
        }
    }

    /// Moves past the current instruction. Used by the kernel after it
    /// services an `ecall`.
    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Fetches, decodes and executes one instruction.
    ///
    /// On `Err` the pc still points at the faulting instruction. That
    /// includes `ecall`, which surfaces as `ExceptionCause::Syscall`.
    pub fn step(&mut self, mmu: &mut dyn Mmu) -> Result<(), ExceptionCause> {
        let pc = VirtualAddress(self.pc);
        let word = mmu.fetch_u32(pc)?;
        let Some(instr) = decode(word) else {
            tracing::debug!(
                target: "vm::cpu",
                pc = %pc,
                bytes = %hex::encode(word.to_le_bytes()),
                "illegal instruction"
            );
            return Err(ExceptionCause::IllegalInstruction);
        };
        tracing::trace!(target: "vm::cpu", pc = %pc, instr = %instr.pretty_print());

        let next_pc = self.execute(instr, mmu)?;
        if next_pc % 4 != 0 {
            return Err(ExceptionCause::AddressError);
        }
        self.pc = next_pc;
        Ok(())
    }

    /// Executes one decoded instruction and returns the next pc.
    fn execute(&mut self, instr: Instruction, mmu: &mut dyn Mmu) -> Result<u32, ExceptionCause> {
        use Instruction::*;

        let pc = self.pc;
        let fallthrough = pc.wrapping_add(4);
        let r = |s: &Self, i: usize| s.read_register(i);

        match instr {
            Add { rd, rs1, rs2 } => self.write_register(rd, r(self, rs1).wrapping_add(r(self, rs2))),
            Sub { rd, rs1, rs2 } => self.write_register(rd, r(self, rs1).wrapping_sub(r(self, rs2))),
            Addi { rd, rs1, imm } => self.write_register(rd, r(self, rs1).wrapping_add(imm as u32)),
            And { rd, rs1, rs2 } => self.write_register(rd, r(self, rs1) & r(self, rs2)),
            Or { rd, rs1, rs2 } => self.write_register(rd, r(self, rs1) | r(self, rs2)),
            Xor { rd, rs1, rs2 } => self.write_register(rd, r(self, rs1) ^ r(self, rs2)),
            Andi { rd, rs1, imm } => self.write_register(rd, r(self, rs1) & imm as u32),
            Ori { rd, rs1, imm } => self.write_register(rd, r(self, rs1) | imm as u32),
            Xori { rd, rs1, imm } => self.write_register(rd, r(self, rs1) ^ imm as u32),

            Slt { rd, rs1, rs2 } => {
                let v = (r(self, rs1) as i32) < (r(self, rs2) as i32);
                self.write_register(rd, v as u32)
            }
            Sltu { rd, rs1, rs2 } => self.write_register(rd, (r(self, rs1) < r(self, rs2)) as u32),
            Slti { rd, rs1, imm } => self.write_register(rd, ((r(self, rs1) as i32) < imm) as u32),
            Sltiu { rd, rs1, imm } => self.write_register(rd, (r(self, rs1) < imm as u32) as u32),

            Sll { rd, rs1, rs2 } => self.write_register(rd, r(self, rs1) << (r(self, rs2) & 0x1f)),
            Srl { rd, rs1, rs2 } => self.write_register(rd, r(self, rs1) >> (r(self, rs2) & 0x1f)),
            Sra { rd, rs1, rs2 } => {
                let v = (r(self, rs1) as i32) >> (r(self, rs2) & 0x1f);
                self.write_register(rd, v as u32)
            }
            Slli { rd, rs1, shamt } => self.write_register(rd, r(self, rs1) << shamt),
            Srli { rd, rs1, shamt } => self.write_register(rd, r(self, rs1) >> shamt),
            Srai { rd, rs1, shamt } => self.write_register(rd, ((r(self, rs1) as i32) >> shamt) as u32),

            Lb { rd, rs1, offset } => {
                let v = mmu.load_u8(effective(r(self, rs1), offset))? as i8 as i32;
                self.write_register(rd, v as u32)
            }
            Lh { rd, rs1, offset } => {
                let v = mmu.load_u16(effective(r(self, rs1), offset))? as i16 as i32;
                self.write_register(rd, v as u32)
            }
            Lw { rd, rs1, offset } => {
                let v = mmu.load_u32(effective(r(self, rs1), offset))?;
                self.write_register(rd, v)
            }
            Lbu { rd, rs1, offset } => {
                let v = mmu.load_u8(effective(r(self, rs1), offset))?;
                self.write_register(rd, v as u32)
            }
            Lhu { rd, rs1, offset } => {
                let v = mmu.load_u16(effective(r(self, rs1), offset))?;
                self.write_register(rd, v as u32)
            }
            Sb { rs1, rs2, offset } => {
                mmu.store_u8(effective(r(self, rs1), offset), r(self, rs2) as u8)?
            }
            Sh { rs1, rs2, offset } => {
                mmu.store_u16(effective(r(self, rs1), offset), r(self, rs2) as u16)?
            }
            Sw { rs1, rs2, offset } => mmu.store_u32(effective(r(self, rs1), offset), r(self, rs2))?,

            Beq { rs1, rs2, offset } => return Ok(branch(pc, offset, r(self, rs1) == r(self, rs2))),
            Bne { rs1, rs2, offset } => return Ok(branch(pc, offset, r(self, rs1) != r(self, rs2))),
            Blt { rs1, rs2, offset } => {
                let taken = (r(self, rs1) as i32) < (r(self, rs2) as i32);
                return Ok(branch(pc, offset, taken));
            }
            Bge { rs1, rs2, offset } => {
                let taken = (r(self, rs1) as i32) >= (r(self, rs2) as i32);
                return Ok(branch(pc, offset, taken));
            }
            Bltu { rs1, rs2, offset } => return Ok(branch(pc, offset, r(self, rs1) < r(self, rs2))),
            Bgeu { rs1, rs2, offset } => return Ok(branch(pc, offset, r(self, rs1) >= r(self, rs2))),

            Jal { rd, offset } => {
                self.write_register(rd, fallthrough);
                return Ok(pc.wrapping_add(offset as u32));
            }
            Jalr { rd, rs1, offset } => {
                // Read the base before writing rd, they may be the same register.
                let target = r(self, rs1).wrapping_add(offset as u32) & !1;
                self.write_register(rd, fallthrough);
                return Ok(target);
            }

            Lui { rd, imm } => self.write_register(rd, (imm as u32) << 12),
            Auipc { rd, imm } => self.write_register(rd, pc.wrapping_add((imm as u32) << 12)),

            Mul { rd, rs1, rs2 } => self.write_register(rd, r(self, rs1).wrapping_mul(r(self, rs2))),
            Mulh { rd, rs1, rs2 } => {
                let v = (r(self, rs1) as i32 as i64) * (r(self, rs2) as i32 as i64);
                self.write_register(rd, (v >> 32) as u32)
            }
            Mulhsu { rd, rs1, rs2 } => {
                let v = (r(self, rs1) as i32 as i64).wrapping_mul(r(self, rs2) as u64 as i64);
                self.write_register(rd, (v >> 32) as u32)
            }
            Mulhu { rd, rs1, rs2 } => {
                let v = (r(self, rs1) as u64) * (r(self, rs2) as u64);
                self.write_register(rd, (v >> 32) as u32)
            }
            Div { rd, rs1, rs2 } => {
                let (a, b) = (r(self, rs1) as i32, r(self, rs2) as i32);
                let v = if b == 0 { -1 } else { a.wrapping_div(b) };
                self.write_register(rd, v as u32)
            }
            Divu { rd, rs1, rs2 } => {
                let (a, b) = (r(self, rs1), r(self, rs2));
                self.write_register(rd, a.checked_div(b).unwrap_or(u32::MAX))
            }
            Rem { rd, rs1, rs2 } => {
                let (a, b) = (r(self, rs1) as i32, r(self, rs2) as i32);
                let v = if b == 0 { a } else { a.wrapping_rem(b) };
                self.write_register(rd, v as u32)
            }
            Remu { rd, rs1, rs2 } => {
                let (a, b) = (r(self, rs1), r(self, rs2));
                self.write_register(rd, a.checked_rem(b).unwrap_or(a))
            }

            Fence => {}
            Ecall => return Err(ExceptionCause::Syscall),
            Ebreak => return Err(ExceptionCause::Breakpoint),
        }
        Ok(fallthrough)
    }
}

fn effective(base: u32, offset: i32) -> VirtualAddress {
    VirtualAddress(base.wrapping_add(offset as u32))
}

fn branch(pc: u32, offset: i32, taken: bool) -> u32 {
    if taken {
        pc.wrapping_add(offset as u32)
    } else {
        pc.wrapping_add(4)
    }
}
