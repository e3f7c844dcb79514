//! Branch handlers. All control flow lands in the shadow next-PC.

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use crate::state::{Cpu, REG_LR};

/// Sign-extended branch offset: 24-bit field, shifted to a byte offset.
const fn offset24(instr: u32) -> u32 {
    (((instr & 0x00FF_FFFF) << 8) as i32 >> 6) as u32
}

/// Relative branch. The target is relative to the pipeline PC.
pub fn b(cpu: &mut Cpu, instr: u32) {
    let target = cpu.pc().wrapping_add(8).wrapping_add(offset24(instr));
    cpu.set_next_pc(target);
}

/// Branch with link: the return address is the instruction after this one.
pub fn bl(cpu: &mut Cpu, instr: u32) {
    cpu.set_reg(REG_LR, cpu.pc().wrapping_add(4));
    b(cpu, instr);
}

/// Branch to a register target. The low bit would select the other
/// instruction set; it is dropped since only A32 executes here.
pub fn bx(cpu: &mut Cpu, instr: u32) {
    let target = cpu.read_operand(instr & 0xF);
    cpu.set_next_pc(target & !1);
}

/// Branch-and-link to a register target.
pub fn blx_reg(cpu: &mut Cpu, instr: u32) {
    cpu.set_reg(REG_LR, cpu.pc().wrapping_add(4));
    bx(cpu, instr);
}
