//! Architectural processor state owned by one engine instance.

#![allow(clippy::cast_possible_truncation)]

pub mod registers;

use crate::halt::HaltReason;
pub use registers::Psr;

/// Stack-pointer register index.
pub const REG_SP: u32 = 13;
/// Link-register index.
pub const REG_LR: u32 = 14;
/// Program-counter register index.
pub const REG_PC: u32 = 15;

/// Offset of the program counter as seen by source-operand reads.
pub const PC_READ_AHEAD: u32 = 8;

/// Register file, status registers, shadow next-PC, and halt latch.
///
/// Handlers and the step driver are the only mutators. The program counter
/// is committed from [`Cpu::next_pc`] exactly once per retired step; no
/// handler writes `r15` directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cpu {
    regs: [u32; 16],
    cpsr: Psr,
    spsr: Psr,
    next_pc: u32,
    halted: bool,
    halt_reason: HaltReason,
    cycle: u64,
}

impl Cpu {
    /// Zeroed state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-zeroes everything, clearing any latched halt.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Raw value of a general register. The index is masked to 4 bits.
    #[must_use]
    pub const fn reg(&self, index: u32) -> u32 {
        self.regs[(index & 0xF) as usize]
    }

    /// Writes a general register. The index is masked to 4 bits.
    pub fn set_reg(&mut self, index: u32, value: u32) {
        self.regs[(index & 0xF) as usize] = value;
    }

    /// Source-operand register read: r15 yields the pipeline value `pc + 8`,
    /// every other register its raw value.
    #[must_use]
    pub const fn read_operand(&self, index: u32) -> u32 {
        let index = index & 0xF;
        let value = self.regs[index as usize];
        if index == REG_PC {
            value.wrapping_add(PC_READ_AHEAD)
        } else {
            value
        }
    }

    /// Raw program counter (the address of the current instruction).
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.regs[REG_PC as usize]
    }

    /// Seeds the program counter directly. Reset/load path only; handlers
    /// route control flow through [`Self::set_next_pc`].
    pub fn seed_pc(&mut self, pc: u32) {
        self.regs[REG_PC as usize] = pc;
    }

    /// Shadow next-fetch address.
    #[must_use]
    pub const fn next_pc(&self) -> u32 {
        self.next_pc
    }

    /// Overwrites the shadow next-fetch address. Callers apply their own
    /// alignment masking (`!3` for word entry, `!1` for exchange forms).
    pub fn set_next_pc(&mut self, target: u32) {
        self.next_pc = target;
    }

    /// Word-aligned control-flow write used by loads and data-processing
    /// writes that target the program counter.
    pub fn branch_to(&mut self, target: u32) {
        self.next_pc = target & !3;
    }

    /// Commits the shadow next-PC into the program counter and counts the
    /// completed instruction.
    pub fn commit(&mut self) {
        self.regs[REG_PC as usize] = self.next_pc;
        self.cycle += 1;
    }

    /// Current status register.
    #[must_use]
    pub const fn cpsr(&self) -> Psr {
        self.cpsr
    }

    /// Mutable access to the current status register.
    pub fn cpsr_mut(&mut self) -> &mut Psr {
        &mut self.cpsr
    }

    /// Replaces the current status register wholesale.
    pub fn set_cpsr(&mut self, psr: Psr) {
        self.cpsr = psr;
    }

    /// Saved status register (one-deep, no banking).
    #[must_use]
    pub const fn spsr(&self) -> Psr {
        self.spsr
    }

    /// Mutable access to the saved status register.
    pub fn spsr_mut(&mut self) -> &mut Psr {
        &mut self.spsr
    }

    /// Replaces the saved status register.
    pub fn set_spsr(&mut self, psr: Psr) {
        self.spsr = psr;
    }

    /// Exception return: restore the status register from its saved copy and
    /// schedule the branch through the shadow next-PC.
    pub fn exception_return(&mut self, target: u32) {
        self.cpsr = self.spsr;
        self.next_pc = target;
    }

    /// Latches the halt condition. The pending PC commit is suppressed by
    /// the step driver when this is set.
    pub fn halt(&mut self, reason: HaltReason) {
        self.halted = true;
        self.halt_reason = reason;
    }

    /// Clears the halt latch so stepping can resume.
    pub fn clear_halt(&mut self) {
        self.halted = false;
        self.halt_reason = HaltReason::None;
    }

    /// Whether the core is halted.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// Reason for the latched halt, [`HaltReason::None`] when running.
    #[must_use]
    pub const fn halt_reason(&self) -> HaltReason {
        self.halt_reason
    }

    /// Completed-instruction counter.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    pub(crate) fn set_cycle(&mut self, cycle: u64) {
        self.cycle = cycle;
    }

    pub(crate) const fn regs(&self) -> &[u32; 16] {
        &self.regs
    }

    pub(crate) fn set_regs(&mut self, regs: [u32; 16]) {
        self.regs = regs;
    }
}
