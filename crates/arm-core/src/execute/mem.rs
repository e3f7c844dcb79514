//! Load/store handlers: single transfers, halfword/doubleword forms, block
//! transfers, and atomic swaps.
//!
//! Address arithmetic wraps; the bus itself decides what an out-of-range
//! data access does. A load that targets `r15` becomes a word-aligned
//! branch through the shadow next-PC.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use crate::memory::Bus;
use crate::operand::scaled_offset;
use crate::state::{Cpu, PC_READ_AHEAD, REG_PC};

struct Addressing {
    addr: u32,
    writeback: Option<u32>,
}

fn index_bits(instr: u32) -> (bool, bool, bool) {
    let p = instr & (1 << 24) != 0;
    let u = instr & (1 << 23) != 0;
    let w = instr & (1 << 21) != 0;
    (p, u, w)
}

fn resolve(base: u32, offset: u32, p: bool, u: bool, w: bool) -> Addressing {
    let computed = if u {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    };
    Addressing {
        // Post-indexed forms access the unmodified base.
        addr: if p { computed } else { base },
        writeback: (w || !p).then_some(computed),
    }
}

/// Word/byte transfer addressing: 12-bit immediate or scaled register.
fn single_addressing(cpu: &Cpu, instr: u32) -> Addressing {
    let (p, u, w) = index_bits(instr);
    let offset = if instr & (1 << 25) != 0 {
        scaled_offset(cpu, instr)
    } else {
        instr & 0xFFF
    };
    let base = cpu.read_operand((instr >> 16) & 0xF);
    resolve(base, offset, p, u, w)
}

/// Halfword/doubleword addressing: split 8-bit immediate or plain register.
fn extra_addressing(cpu: &Cpu, instr: u32) -> Addressing {
    let (p, u, w) = index_bits(instr);
    let offset = if instr & (1 << 22) != 0 {
        ((instr >> 4) & 0xF0) | (instr & 0xF)
    } else {
        cpu.read_operand(instr & 0xF)
    };
    let base = cpu.read_operand((instr >> 16) & 0xF);
    resolve(base, offset, p, u, w)
}

fn apply_writeback(cpu: &mut Cpu, instr: u32, writeback: Option<u32>) {
    if let Some(value) = writeback {
        cpu.set_reg((instr >> 16) & 0xF, value);
    }
}

fn load_to(cpu: &mut Cpu, rd: u32, value: u32) {
    if rd == REG_PC {
        cpu.branch_to(value);
    } else {
        cpu.set_reg(rd, value);
    }
}

/// Word load.
pub fn ldr(cpu: &mut Cpu, bus: &impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let a = single_addressing(cpu, instr);
    apply_writeback(cpu, instr, a.writeback);
    let value = bus.read32(a.addr);
    load_to(cpu, rd, value);
}

/// Word store; a `r15` source stores the pipeline value.
pub fn str(cpu: &mut Cpu, bus: &mut impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let a = single_addressing(cpu, instr);
    bus.write32(a.addr, cpu.read_operand(rd));
    apply_writeback(cpu, instr, a.writeback);
}

/// Byte load, zero-extended.
pub fn ldrb(cpu: &mut Cpu, bus: &impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let a = single_addressing(cpu, instr);
    apply_writeback(cpu, instr, a.writeback);
    let value = u32::from(bus.read8(a.addr));
    load_to(cpu, rd, value);
}

/// Byte store from the low eight bits of the source.
pub fn strb(cpu: &mut Cpu, bus: &mut impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let a = single_addressing(cpu, instr);
    bus.write8(a.addr, cpu.read_operand(rd) as u8);
    apply_writeback(cpu, instr, a.writeback);
}

/// PC-relative load. The base is the word-aligned pipeline PC; the
/// encoding pins pre-indexing without writeback.
pub fn ldr_literal(cpu: &mut Cpu, bus: &impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let u = instr & (1 << 23) != 0;
    let base = (cpu.pc() & !3).wrapping_add(PC_READ_AHEAD);
    let offset = instr & 0xFFF;
    let addr = if u {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    };
    load_to(cpu, rd, bus.read32(addr));
}

/// Halfword load, zero-extended.
pub fn ldrh(cpu: &mut Cpu, bus: &impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let a = extra_addressing(cpu, instr);
    apply_writeback(cpu, instr, a.writeback);
    load_to(cpu, rd, u32::from(bus.read16(a.addr)));
}

/// Halfword store from the low sixteen bits of the source.
pub fn strh(cpu: &mut Cpu, bus: &mut impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let a = extra_addressing(cpu, instr);
    bus.write16(a.addr, cpu.read_operand(rd) as u16);
    apply_writeback(cpu, instr, a.writeback);
}

/// Byte load, sign-extended.
pub fn ldrsb(cpu: &mut Cpu, bus: &impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let a = extra_addressing(cpu, instr);
    apply_writeback(cpu, instr, a.writeback);
    load_to(cpu, rd, i32::from(bus.read8(a.addr) as i8) as u32);
}

/// Halfword load, sign-extended.
pub fn ldrsh(cpu: &mut Cpu, bus: &impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let a = extra_addressing(cpu, instr);
    apply_writeback(cpu, instr, a.writeback);
    load_to(cpu, rd, i32::from(bus.read16(a.addr) as i16) as u32);
}

/// Structural checks shared by the doubleword forms. A violation makes the
/// instruction a no-op: no memory access, no writeback.
fn dword_rejected(instr: u32, rt: u32, a: &Addressing) -> bool {
    let rn = (instr >> 16) & 0xF;
    rt & 1 != 0
        || rt + 1 == REG_PC
        || (a.writeback.is_some() && (rn == rt || rn == rt + 1))
        || a.addr & 3 != 0
}

/// Doubleword load into an even/odd register pair.
pub fn ldrd(cpu: &mut Cpu, bus: &impl Bus, instr: u32) {
    let rt = (instr >> 12) & 0xF;
    let a = extra_addressing(cpu, instr);
    if dword_rejected(instr, rt, &a) {
        return;
    }
    let lo = bus.read32(a.addr);
    let hi = bus.read32(a.addr.wrapping_add(4));
    cpu.set_reg(rt, lo);
    cpu.set_reg(rt + 1, hi);
    apply_writeback(cpu, instr, a.writeback);
}

/// Doubleword store from an even/odd register pair.
pub fn strd(cpu: &mut Cpu, bus: &mut impl Bus, instr: u32) {
    let rt = (instr >> 12) & 0xF;
    let a = extra_addressing(cpu, instr);
    if dword_rejected(instr, rt, &a) {
        return;
    }
    bus.write32(a.addr, cpu.reg(rt));
    bus.write32(a.addr.wrapping_add(4), cpu.reg(rt + 1));
    apply_writeback(cpu, instr, a.writeback);
}

/// Block store. Registers are visited in ascending order with the address
/// adjusted by four before or after each slot; register values are stored
/// raw, `r15` included.
pub fn stm(cpu: &mut Cpu, bus: &mut impl Bus, instr: u32) {
    let list = instr & 0xFFFF;
    let (p, u, w) = index_bits(instr);
    let delta = if u { 4u32 } else { 4u32.wrapping_neg() };

    let mut addr = cpu.read_operand((instr >> 16) & 0xF);
    for r in 0..16 {
        if list & (1 << r) != 0 {
            if p {
                addr = addr.wrapping_add(delta);
            }
            bus.write32(addr, cpu.reg(r));
            if !p {
                addr = addr.wrapping_add(delta);
            }
        }
    }
    if w {
        cpu.set_reg((instr >> 16) & 0xF, addr);
    }
}

/// Block load, mirror of [`stm`]. Loading `r15` branches through the
/// shadow next-PC.
pub fn ldm(cpu: &mut Cpu, bus: &impl Bus, instr: u32) {
    let list = instr & 0xFFFF;
    let (p, u, w) = index_bits(instr);
    let delta = if u { 4u32 } else { 4u32.wrapping_neg() };

    let mut addr = cpu.read_operand((instr >> 16) & 0xF);
    for r in 0..16 {
        if list & (1 << r) != 0 {
            if p {
                addr = addr.wrapping_add(delta);
            }
            let value = bus.read32(addr);
            load_to(cpu, r, value);
            if !p {
                addr = addr.wrapping_add(delta);
            }
        }
    }
    if w {
        cpu.set_reg((instr >> 16) & 0xF, addr);
    }
}

/// Atomic word exchange between a register and memory.
pub fn swp(cpu: &mut Cpu, bus: &mut impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let addr = cpu.read_operand((instr >> 16) & 0xF);
    let old = bus.read32(addr);
    bus.write32(addr, cpu.read_operand(instr & 0xF));
    if rd != REG_PC {
        cpu.set_reg(rd, old);
    }
}

/// Atomic byte exchange between a register and memory.
pub fn swpb(cpu: &mut Cpu, bus: &mut impl Bus, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    let addr = cpu.read_operand((instr >> 16) & 0xF);
    let old = u32::from(bus.read8(addr));
    bus.write8(addr, cpu.read_operand(instr & 0xF) as u8);
    if rd != REG_PC {
        cpu.set_reg(rd, old);
    }
}
