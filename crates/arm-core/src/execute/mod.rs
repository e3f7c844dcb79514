//! Fetch, condition gating, dispatch, and PC commit for one step.
//!
//! The step driver owns the only write to `r15`: handlers steer control
//! flow exclusively through the shadow next-PC, and the commit happens
//! once per step, after the handler returns, unless a halt was latched.

pub mod alu;
pub mod branch;
pub mod mem;
pub mod mul;
pub mod system;

use crate::cond::condition_passes;
use crate::decode::{DecodeTable, Op};
use crate::halt::HaltReason;
use crate::memory::Bus;
use crate::state::Cpu;

/// What one call to [`step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction executed and the PC advanced.
    Retired,
    /// The instruction decoded but its condition failed; the PC advanced.
    Suppressed,
    /// The core halted; the PC did not advance.
    Halted(HaltReason),
}

impl StepOutcome {
    /// Whether further stepping can make progress.
    #[must_use]
    pub const fn may_continue(self) -> bool {
        matches!(self, Self::Retired | Self::Suppressed)
    }
}

/// Executes one instruction against `cpu` and `bus`.
///
/// Stepping a halted core returns the latched reason without touching any
/// state; callers clear the latch explicitly to resume.
pub fn step(cpu: &mut Cpu, bus: &mut impl Bus, table: &DecodeTable) -> StepOutcome {
    if cpu.halted() {
        return StepOutcome::Halted(cpu.halt_reason());
    }

    let Some(instr) = fetch(cpu, bus) else {
        return StepOutcome::Halted(HaltReason::Abort);
    };

    let Some(rule) = table.lookup(instr) else {
        cpu.halt(HaltReason::Undefined);
        return StepOutcome::Halted(HaltReason::Undefined);
    };

    if rule.check_cond {
        let cond = instr >> 28;
        if cond != 0xF && !condition_passes(cond, cpu.cpsr()) {
            cpu.commit();
            return StepOutcome::Suppressed;
        }
    }

    dispatch(cpu, bus, rule.op, instr);

    if cpu.halted() {
        StepOutcome::Halted(cpu.halt_reason())
    } else {
        cpu.commit();
        StepOutcome::Retired
    }
}

/// Reads the next instruction word, arming the shadow next-PC.
///
/// The instruction-set select bit is normalized away first; only the A32
/// set is executed. A fetch that does not fit inside the bound memory
/// latches an abort and yields `None`.
fn fetch(cpu: &mut Cpu, bus: &impl Bus) -> Option<u32> {
    cpu.cpsr_mut().clear_thumb();

    let pc = cpu.pc();
    let len = bus.len();
    if len < 4 || pc as usize > len - 4 {
        cpu.halt(HaltReason::Abort);
        return None;
    }

    cpu.set_next_pc(pc.wrapping_add(4));
    Some(bus.read32(pc))
}

fn dispatch(cpu: &mut Cpu, bus: &mut impl Bus, op: Op, instr: u32) {
    match op {
        Op::And | Op::Eor | Op::Sub | Op::Rsb | Op::Add | Op::Adc | Op::Sbc | Op::Rsc
        | Op::Tst | Op::Teq | Op::Cmp | Op::Cmn | Op::Orr | Op::Mov | Op::Bic | Op::Mvn => {
            alu::data_processing(cpu, op, instr);
        }
        Op::Movw => alu::movw(cpu, instr),
        Op::Movt => alu::movt(cpu, instr),

        Op::Mul => mul::mul(cpu, instr),
        Op::Mla => mul::mla(cpu, instr),
        Op::Umull | Op::Umlal | Op::Smull | Op::Smlal => mul::multiply_long(cpu, op, instr),

        Op::B => branch::b(cpu, instr),
        Op::Bl => branch::bl(cpu, instr),
        Op::Bx => branch::bx(cpu, instr),
        Op::BlxReg => branch::blx_reg(cpu, instr),

        Op::Str => mem::str(cpu, bus, instr),
        Op::Ldr => mem::ldr(cpu, bus, instr),
        Op::Strb => mem::strb(cpu, bus, instr),
        Op::Ldrb => mem::ldrb(cpu, bus, instr),
        Op::LdrLiteral => mem::ldr_literal(cpu, bus, instr),
        Op::Strh => mem::strh(cpu, bus, instr),
        Op::Ldrh => mem::ldrh(cpu, bus, instr),
        Op::Ldrsb => mem::ldrsb(cpu, bus, instr),
        Op::Ldrsh => mem::ldrsh(cpu, bus, instr),
        Op::Strd => mem::strd(cpu, bus, instr),
        Op::Ldrd => mem::ldrd(cpu, bus, instr),
        Op::Stm => mem::stm(cpu, bus, instr),
        Op::Ldm => mem::ldm(cpu, bus, instr),
        Op::Swp => mem::swp(cpu, bus, instr),
        Op::Swpb => mem::swpb(cpu, bus, instr),

        Op::Bfc => system::bfc(cpu, instr),
        Op::Bfi => system::bfi(cpu, instr),
        Op::Clz => system::clz(cpu, instr),
        Op::Svc => system::svc(cpu),
        Op::Bkpt => system::bkpt(cpu),
        Op::Mrs => system::mrs(cpu, instr),
        Op::MsrReg => system::msr_reg(cpu, instr),
        Op::MsrImm => system::msr_imm(cpu, instr),
        Op::Cps => system::cps(cpu, instr),
        Op::Dsb | Op::Dmb | Op::Isb | Op::Nop | Op::Wfi => {}
        Op::Sentinel => cpu.halt(HaltReason::SentinelTrap),
    }
}

#[cfg(test)]
mod tests {
    use super::{step, StepOutcome};
    use crate::decode::DecodeTable;
    use crate::halt::HaltReason;
    use crate::memory::{Bus, FlatRam};
    use crate::state::Cpu;

    fn setup(words: &[u32]) -> (Cpu, FlatRam, DecodeTable) {
        let mut ram = FlatRam::new(0x100);
        for (i, w) in words.iter().enumerate() {
            ram.write32(u32::try_from(i * 4).unwrap(), *w);
        }
        (Cpu::new(), ram, DecodeTable::new())
    }

    #[test]
    fn retired_step_advances_pc_and_cycle() {
        let (mut cpu, mut ram, table) = setup(&[0xE3A0_0005]); // mov r0, #5
        let out = step(&mut cpu, &mut ram, &table);
        assert_eq!(out, StepOutcome::Retired);
        assert_eq!(cpu.reg(0), 5);
        assert_eq!(cpu.pc(), 4);
        assert_eq!(cpu.cycle(), 1);
    }

    #[test]
    fn failed_condition_suppresses_but_still_advances() {
        // moveq r0, #5 with Z clear.
        let (mut cpu, mut ram, table) = setup(&[0x03A0_0005]);
        let out = step(&mut cpu, &mut ram, &table);
        assert_eq!(out, StepOutcome::Suppressed);
        assert_eq!(cpu.reg(0), 0);
        assert_eq!(cpu.pc(), 4);
        assert_eq!(cpu.cycle(), 1);
    }

    #[test]
    fn unknown_word_halts_without_advancing() {
        let (mut cpu, mut ram, table) = setup(&[0xE7F0_00F0]);
        let out = step(&mut cpu, &mut ram, &table);
        assert_eq!(out, StepOutcome::Halted(HaltReason::Undefined));
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.cycle(), 0);
    }

    #[test]
    fn fetch_past_end_of_memory_aborts() {
        let (mut cpu, mut ram, table) = setup(&[0xE3A0_0005]);
        cpu.seed_pc(0x100);
        assert_eq!(
            step(&mut cpu, &mut ram, &table),
            StepOutcome::Halted(HaltReason::Abort)
        );
        assert_eq!(cpu.halt_reason(), HaltReason::Abort);
    }

    #[test]
    fn stepping_a_halted_core_is_inert() {
        let (mut cpu, mut ram, table) = setup(&[0xDEAD_BEEF, 0xE3A0_0005]);
        assert_eq!(
            step(&mut cpu, &mut ram, &table),
            StepOutcome::Halted(HaltReason::SentinelTrap)
        );
        let pc = cpu.pc();
        assert_eq!(
            step(&mut cpu, &mut ram, &table),
            StepOutcome::Halted(HaltReason::SentinelTrap)
        );
        assert_eq!(cpu.pc(), pc);
        assert_eq!(cpu.cycle(), 0);
    }

    #[test]
    fn sentinel_word_halts_with_trap_reason() {
        let (mut cpu, mut ram, table) = setup(&[0xDEAD_BEEF]);
        let out = step(&mut cpu, &mut ram, &table);
        assert_eq!(out, StepOutcome::Halted(HaltReason::SentinelTrap));
        assert!(cpu.halt_reason().is_trap());
    }

    #[test]
    fn hint_instructions_retire_without_effect() {
        let words = [0xE320_F000, 0xE320_F003, 0xF57F_F04F, 0xF57F_F05F, 0xF57F_F06F];
        let (mut cpu, mut ram, table) = setup(&words);
        let snapshot_regs: Vec<u32> = (0..15).map(|i| cpu.reg(i)).collect();
        for _ in 0..words.len() {
            assert_eq!(step(&mut cpu, &mut ram, &table), StepOutcome::Retired);
        }
        assert_eq!(cpu.pc(), 20);
        for (i, v) in snapshot_regs.iter().enumerate() {
            assert_eq!(cpu.reg(u32::try_from(i).unwrap()), *v);
        }
    }
}
