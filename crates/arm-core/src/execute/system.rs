//! Status-register transfers, mode changes, software-interrupt entry,
//! traps, and the bit-field/count ops that share the system decode space.

#![allow(clippy::cast_possible_truncation)]

use crate::halt::HaltReason;
use crate::state::registers::{MODE_SUPERVISOR, PSR_A, PSR_F, PSR_I};
use crate::state::{Cpu, Psr, REG_LR, REG_PC};

/// Software-interrupt entry: save state, switch to supervisor mode with
/// interrupts masked, and vector to the handler slot.
pub fn svc(cpu: &mut Cpu) {
    cpu.set_spsr(cpu.cpsr());
    cpu.set_reg(REG_LR, cpu.next_pc());

    let mut psr = cpu.cpsr();
    psr.set_mode(MODE_SUPERVISOR);
    psr.clear_thumb();
    cpu.set_cpsr(Psr::from_bits(psr.bits() | PSR_I));

    cpu.set_next_pc(0x08);
}

/// Breakpoint trap: latch a halt for the host debugger.
pub fn bkpt(cpu: &mut Cpu) {
    cpu.halt(HaltReason::Breakpoint);
}

/// Status-register read into a general register.
pub fn mrs(cpu: &mut Cpu, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    if rd == REG_PC {
        return;
    }
    let value = if instr & (1 << 22) != 0 {
        cpu.spsr().bits()
    } else {
        cpu.cpsr().bits()
    };
    cpu.set_reg(rd, value);
}

fn msr(cpu: &mut Cpu, instr: u32, value: u32) {
    let fields = (instr >> 16) & 0xF;
    if instr & (1 << 22) != 0 {
        // The saved status register is privileged.
        if cpu.cpsr().is_user_mode() {
            return;
        }
        cpu.spsr_mut().write_fields(value, fields);
    } else {
        cpu.cpsr_mut().write_fields(value, fields);
    }
}

/// Status-register write from a register source.
pub fn msr_reg(cpu: &mut Cpu, instr: u32) {
    let value = cpu.read_operand(instr & 0xF);
    msr(cpu, instr, value);
}

/// Status-register write from a rotated immediate.
pub fn msr_imm(cpu: &mut Cpu, instr: u32) {
    let rot = (instr >> 8) & 0xF;
    let value = (instr & 0xFF).rotate_right(rot * 2);
    msr(cpu, instr, value);
}

/// Change processor state: set or clear the A/I/F masks and optionally
/// switch mode.
pub fn cps(cpu: &mut Cpu, instr: u32) {
    let disable = instr & (1 << 18) != 0;
    let change_mode = instr & (1 << 17) != 0;

    let mut bits = cpu.cpsr().bits();
    for (select, mask) in [(1 << 8, PSR_A), (1 << 7, PSR_I), (1 << 6, PSR_F)] {
        if instr & select != 0 {
            if disable {
                bits |= mask;
            } else {
                bits &= !mask;
            }
        }
    }
    let mut psr = Psr::from_bits(bits);
    if change_mode {
        psr.set_mode(instr & 0x1F);
    }
    cpu.set_cpsr(psr);
}

fn bitfield_range(instr: u32) -> Option<(u32, u32)> {
    let msb = (instr >> 16) & 0x1F;
    let lsb = (instr >> 7) & 0x1F;
    (msb >= lsb).then_some((msb, lsb))
}

fn bitfield_mask(msb: u32, lsb: u32) -> u32 {
    let width = msb - lsb + 1;
    (((1u64 << width) - 1) as u32) << lsb
}

/// Bit-field clear. Malformed ranges and a `r15` destination are ignored.
pub fn bfc(cpu: &mut Cpu, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    if rd == REG_PC {
        return;
    }
    let Some((msb, lsb)) = bitfield_range(instr) else {
        return;
    };
    let value = cpu.reg(rd) & !bitfield_mask(msb, lsb);
    cpu.set_reg(rd, value);
}

/// Bit-field insert from the low bits of the source register.
pub fn bfi(cpu: &mut Cpu, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    if rd == REG_PC {
        return;
    }
    let Some((msb, lsb)) = bitfield_range(instr) else {
        return;
    };
    let mask = bitfield_mask(msb, lsb);
    let field = (cpu.read_operand(instr & 0xF) << lsb) & mask;
    let value = (cpu.reg(rd) & !mask) | field;
    cpu.set_reg(rd, value);
}

/// Count leading zeros; an all-zero source yields 32.
pub fn clz(cpu: &mut Cpu, instr: u32) {
    let rd = (instr >> 12) & 0xF;
    if rd == REG_PC {
        return;
    }
    let value = cpu.read_operand(instr & 0xF).leading_zeros();
    cpu.set_reg(rd, value);
}
