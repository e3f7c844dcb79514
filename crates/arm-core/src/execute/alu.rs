//! Data-processing handlers: the sixteen classic opcodes plus the wide
//! moves.
//!
//! Arithmetic ops derive C and V from a widened computation; logical ops
//! take C from the shifter and leave V alone. A write that targets `r15`
//! becomes a word-aligned branch through the shadow next-PC, or a full
//! exception return when the S bit is set.

#![allow(clippy::cast_possible_truncation)]

use crate::decode::Op;
use crate::operand::dp_operand2;
use crate::state::{Cpu, REG_PC};

struct Arith {
    value: u32,
    carry: bool,
    overflow: bool,
}

fn add_with_carry(a: u32, b: u32, carry_in: u32) -> Arith {
    let wide = u64::from(a) + u64::from(b) + u64::from(carry_in);
    let value = wide as u32;
    // Overflow is judged against the effective addend, carry included.
    let b_eff = b.wrapping_add(carry_in);
    Arith {
        value,
        carry: wide >> 32 != 0,
        overflow: (!(a ^ b_eff) & (a ^ value)) >> 31 != 0,
    }
}

fn sub_with_borrow(a: u32, b: u32, borrow: u32) -> Arith {
    let wide = u64::from(a)
        .wrapping_sub(u64::from(b))
        .wrapping_sub(u64::from(borrow));
    let value = wide as u32;
    let b_eff = b.wrapping_add(borrow);
    Arith {
        value,
        carry: wide >> 32 == 0,
        overflow: ((a ^ b_eff) & (a ^ value)) >> 31 != 0,
    }
}

fn retire_arith(cpu: &mut Cpu, rd: u32, r: &Arith, set_flags: bool) {
    if rd == REG_PC {
        if set_flags {
            cpu.exception_return(r.value);
        } else {
            cpu.branch_to(r.value);
        }
        return;
    }
    cpu.set_reg(rd, r.value);
    if set_flags {
        let psr = cpu.cpsr_mut();
        psr.set_nz(r.value);
        psr.set_c(r.carry);
        psr.set_v(r.overflow);
    }
}

fn retire_logic(cpu: &mut Cpu, rd: u32, value: u32, shifter_carry: bool, set_flags: bool) {
    if rd == REG_PC {
        if set_flags {
            cpu.exception_return(value);
        } else {
            cpu.branch_to(value);
        }
        return;
    }
    cpu.set_reg(rd, value);
    if set_flags {
        let psr = cpu.cpsr_mut();
        psr.set_nz(value);
        psr.set_c(shifter_carry);
    }
}

fn compare_arith(cpu: &mut Cpu, r: &Arith) {
    let psr = cpu.cpsr_mut();
    psr.set_nz(r.value);
    psr.set_c(r.carry);
    psr.set_v(r.overflow);
}

fn compare_logic(cpu: &mut Cpu, value: u32, shifter_carry: bool) {
    let psr = cpu.cpsr_mut();
    psr.set_nz(value);
    psr.set_c(shifter_carry);
}

/// Executes one of the sixteen data-processing opcodes.
pub fn data_processing(cpu: &mut Cpu, op: Op, instr: u32) {
    let set_flags = instr & (1 << 20) != 0;
    let rn = (instr >> 16) & 0xF;
    let rd = (instr >> 12) & 0xF;

    let shifted = dp_operand2(cpu, instr);
    let a = cpu.read_operand(rn);
    let b = shifted.value;
    let carry_in = u32::from(cpu.cpsr().c());
    let borrow_in = 1 - carry_in;

    match op {
        Op::And => retire_logic(cpu, rd, a & b, shifted.carry, set_flags),
        Op::Eor => retire_logic(cpu, rd, a ^ b, shifted.carry, set_flags),
        Op::Orr => retire_logic(cpu, rd, a | b, shifted.carry, set_flags),
        Op::Bic => retire_logic(cpu, rd, a & !b, shifted.carry, set_flags),
        Op::Mov => retire_logic(cpu, rd, b, shifted.carry, set_flags),
        Op::Mvn => retire_logic(cpu, rd, !b, shifted.carry, set_flags),

        Op::Add => retire_arith(cpu, rd, &add_with_carry(a, b, 0), set_flags),
        Op::Adc => retire_arith(cpu, rd, &add_with_carry(a, b, carry_in), set_flags),
        Op::Sub => retire_arith(cpu, rd, &sub_with_borrow(a, b, 0), set_flags),
        Op::Sbc => retire_arith(cpu, rd, &sub_with_borrow(a, b, borrow_in), set_flags),
        Op::Rsb => retire_arith(cpu, rd, &sub_with_borrow(b, a, 0), set_flags),
        Op::Rsc => retire_arith(cpu, rd, &sub_with_borrow(b, a, borrow_in), set_flags),

        Op::Tst => compare_logic(cpu, a & b, shifted.carry),
        Op::Teq => compare_logic(cpu, a ^ b, shifted.carry),
        Op::Cmp => compare_arith(cpu, &sub_with_borrow(a, b, 0)),
        Op::Cmn => compare_arith(cpu, &add_with_carry(a, b, 0)),

        _ => unreachable!("non data-processing op routed to the wrong handler"),
    }
}

const fn imm16(instr: u32) -> u32 {
    ((instr >> 4) & 0xF000) | (instr & 0xFFF)
}

/// Loads a zero-extended 16-bit immediate into the low half, clearing the
/// high half.
pub fn movw(cpu: &mut Cpu, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let value = imm16(instr);
    if rd == REG_PC {
        cpu.set_next_pc(value & !1);
    } else {
        cpu.set_reg(rd, value);
    }
}

/// Replaces the high half of the destination, preserving the low half. A
/// `r15` destination is ignored.
pub fn movt(cpu: &mut Cpu, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    if rd == REG_PC {
        return;
    }
    let value = (cpu.reg(rd) & 0xFFFF) | (imm16(instr) << 16);
    cpu.set_reg(rd, value);
}
