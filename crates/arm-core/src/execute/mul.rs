//! Multiply and multiply-accumulate, 32-bit and long forms.
//!
//! Multiplies update N and Z only; C and V are left alone. Encodings that
//! name `r15` anywhere write nothing.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use crate::decode::Op;
use crate::state::{Cpu, REG_PC};

const fn operands(instr: u32) -> (u32, u32, u32, u32) {
    let rd_hi = (instr >> 16) & 0xF;
    let rd_lo = (instr >> 12) & 0xF;
    let rs = (instr >> 8) & 0xF;
    let rm = instr & 0xF;
    (rd_hi, rd_lo, rs, rm)
}

/// 32-bit multiply. `Rd` sits in the usual `Rn` slot.
pub fn mul(cpu: &mut Cpu, instr: u32) {
    let (rd, _, rs, rm) = operands(instr);
    let result = cpu.read_operand(rm).wrapping_mul(cpu.read_operand(rs));
    finish_32(cpu, instr, rd, result);
}

/// 32-bit multiply-accumulate; the accumulator sits in the `Rd` slot.
pub fn mla(cpu: &mut Cpu, instr: u32) {
    let (rd, ra, rs, rm) = operands(instr);
    let result = cpu
        .read_operand(rm)
        .wrapping_mul(cpu.read_operand(rs))
        .wrapping_add(cpu.read_operand(ra));
    finish_32(cpu, instr, rd, result);
}

fn finish_32(cpu: &mut Cpu, instr: u32, rd: u32, result: u32) {
    if rd == REG_PC {
        return;
    }
    cpu.set_reg(rd, result);
    if instr & (1 << 20) != 0 {
        cpu.cpsr_mut().set_nz(result);
    }
}

/// 64-bit multiply family: signed/unsigned, with and without accumulate.
pub fn multiply_long(cpu: &mut Cpu, op: Op, instr: u32) {
    let (rd_hi, rd_lo, rs, rm) = operands(instr);
    if rd_hi == REG_PC || rd_lo == REG_PC || rs == REG_PC || rm == REG_PC {
        return;
    }

    let m = cpu.read_operand(rm);
    let s = cpu.read_operand(rs);
    let acc = (u64::from(cpu.reg(rd_hi)) << 32) | u64::from(cpu.reg(rd_lo));

    let result = match op {
        Op::Umull => u64::from(m) * u64::from(s),
        Op::Umlal => (u64::from(m) * u64::from(s)).wrapping_add(acc),
        Op::Smull => (i64::from(m as i32) * i64::from(s as i32)) as u64,
        Op::Smlal => (i64::from(m as i32) * i64::from(s as i32)).wrapping_add(acc as i64) as u64,
        _ => unreachable!("non long-multiply op routed to the wrong handler"),
    };

    cpu.set_reg(rd_lo, result as u32);
    cpu.set_reg(rd_hi, (result >> 32) as u32);
    if instr & (1 << 20) != 0 {
        cpu.cpsr_mut().set_nz_64(result);
    }
}
