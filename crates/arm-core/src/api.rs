//! Host-facing engine: owns the processor state, its memory, and the
//! decode table, and exposes the step/run lifecycle.

#![allow(clippy::cast_possible_truncation)]

use crate::decode::DecodeTable;
use crate::execute::{step, StepOutcome};
use crate::halt::{HaltReason, ImageError, SnapshotError};
use crate::memory::{Bus, FlatRam};
use crate::state::{Cpu, Psr, REG_SP};

/// Default load and start address for program images.
pub const ENTRY_POINT: u32 = 0x8000;

/// Default memory size in bytes.
pub const DEFAULT_MEMORY: usize = 0x10_0000;

/// Snapshot layout revision.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Construction-time engine options.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Bytes of flat memory to allocate.
    pub memory_size: usize,
    /// Whether step events are delivered to an attached trace sink.
    pub trace: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY,
            trace: false,
        }
    }
}

/// One step-level observation delivered to a [`TraceSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// An instruction executed and the PC advanced.
    Retired {
        /// Address of the instruction.
        pc: u32,
        /// The instruction word.
        instr: u32,
        /// Address of the next instruction.
        next_pc: u32,
    },
    /// An instruction's condition failed; the PC still advanced.
    Suppressed {
        /// Address of the instruction.
        pc: u32,
        /// The instruction word.
        instr: u32,
    },
    /// The core halted at this address.
    Halted {
        /// Address of the halting instruction.
        pc: u32,
        /// Latched reason.
        reason: HaltReason,
    },
}

/// Receiver for step-level trace events.
pub trait TraceSink {
    /// Called once per step when tracing is enabled.
    fn record(&mut self, event: &TraceEvent);
}

/// Outcome of a bounded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Steps actually taken.
    pub steps: u64,
    /// Outcome of the final step.
    pub outcome: StepOutcome,
}

/// Serializable copy of the processor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuSnapshot {
    /// Layout revision, [`SNAPSHOT_VERSION`] when produced by this build.
    pub version: u32,
    /// General registers r0..r15.
    pub regs: [u32; 16],
    /// Current status register.
    pub cpsr: u32,
    /// Saved status register.
    pub spsr: u32,
    /// Shadow next-fetch address.
    pub next_pc: u32,
    /// Halt latch.
    pub halted: bool,
    /// Halt reason wire code.
    pub halt_reason: u8,
    /// Completed-instruction counter.
    pub cycle: u64,
}

/// A complete instruction-execution engine instance.
pub struct Vm {
    cpu: Cpu,
    ram: FlatRam,
    table: DecodeTable,
    config: CoreConfig,
    sink: Option<Box<dyn TraceSink>>,
}

impl Vm {
    /// Engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    /// Engine with explicit configuration. The stack pointer is seeded to
    /// the top of memory and the PC to the entry point.
    #[must_use]
    pub fn with_config(config: CoreConfig) -> Self {
        let mut vm = Self {
            cpu: Cpu::new(),
            ram: FlatRam::new(config.memory_size),
            table: DecodeTable::new(),
            config,
            sink: None,
        };
        vm.seed();
        vm
    }

    fn seed(&mut self) {
        self.cpu
            .set_reg(REG_SP, self.ram.len().saturating_sub(4) as u32);
        self.cpu.seed_pc(ENTRY_POINT);
    }

    /// Re-zeroes the processor and memory, then re-seeds SP and PC.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.ram.clear();
        self.seed();
    }

    /// Replaces the backing memory with `size` zeroed bytes and re-seeds
    /// the stack pointer to its top.
    pub fn attach_ram(&mut self, size: usize) {
        self.ram = FlatRam::new(size);
        self.cpu.set_reg(REG_SP, size.saturating_sub(4) as u32);
    }

    /// Copies a raw image into memory.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::OutOfBounds`] when the image does not fit.
    pub fn load_image(&mut self, addr: u32, image: &[u8]) -> Result<(), ImageError> {
        self.ram.load_image(addr, image)
    }

    /// Loads an image at the entry point and points the PC at it.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::OutOfBounds`] when the image does not fit.
    pub fn load_program(&mut self, image: &[u8]) -> Result<(), ImageError> {
        self.ram.load_image(ENTRY_POINT, image)?;
        self.cpu.seed_pc(ENTRY_POINT);
        Ok(())
    }

    /// Executes one instruction.
    pub fn step(&mut self) -> StepOutcome {
        let pc = self.cpu.pc();
        let outcome = step(&mut self.cpu, &mut self.ram, &self.table);

        if self.config.trace {
            if let Some(sink) = self.sink.as_mut() {
                let event = match outcome {
                    StepOutcome::Retired => TraceEvent::Retired {
                        pc,
                        instr: self.ram.read32(pc),
                        next_pc: self.cpu.pc(),
                    },
                    StepOutcome::Suppressed => TraceEvent::Suppressed {
                        pc,
                        instr: self.ram.read32(pc),
                    },
                    StepOutcome::Halted(reason) => TraceEvent::Halted { pc, reason },
                };
                sink.record(&event);
            }
        }
        outcome
    }

    /// Steps until the core halts or `max_steps` instructions complete.
    /// A budget of zero runs without a step limit.
    pub fn run(&mut self, max_steps: u64) -> RunOutcome {
        let mut steps = 0;
        let mut outcome = StepOutcome::Halted(self.cpu.halt_reason());
        while max_steps == 0 || steps < max_steps {
            outcome = self.step();
            steps += 1;
            if !outcome.may_continue() {
                break;
            }
        }
        RunOutcome { steps, outcome }
    }

    /// Attaches a trace sink; events flow only while the configuration
    /// enables tracing.
    pub fn set_trace(&mut self, sink: Box<dyn TraceSink>) {
        self.sink = Some(sink);
    }

    /// Reads a general register.
    #[must_use]
    pub fn reg(&self, index: u32) -> u32 {
        self.cpu.reg(index)
    }

    /// Writes a general register.
    pub fn set_reg(&mut self, index: u32, value: u32) {
        self.cpu.set_reg(index, value);
    }

    /// Current status register.
    #[must_use]
    pub fn cpsr(&self) -> Psr {
        self.cpu.cpsr()
    }

    /// Replaces the current status register.
    pub fn set_cpsr(&mut self, psr: Psr) {
        self.cpu.set_cpsr(psr);
    }

    /// Current program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.cpu.pc()
    }

    /// Whether the core is halted.
    #[must_use]
    pub fn halted(&self) -> bool {
        self.cpu.halted()
    }

    /// Latched halt reason.
    #[must_use]
    pub fn halt_reason(&self) -> HaltReason {
        self.cpu.halt_reason()
    }

    /// Clears the halt latch so stepping can resume.
    pub fn clear_halt(&mut self) {
        self.cpu.clear_halt();
    }

    /// Completed-instruction counter.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cpu.cycle()
    }

    /// Backing memory, read-only.
    #[must_use]
    pub fn ram(&self) -> &FlatRam {
        &self.ram
    }

    /// Backing memory, mutable.
    pub fn ram_mut(&mut self) -> &mut FlatRam {
        &mut self.ram
    }

    /// Captures the processor state. Memory is not included; hosts persist
    /// it separately through [`Self::ram`].
    #[must_use]
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            version: SNAPSHOT_VERSION,
            regs: *self.cpu.regs(),
            cpsr: self.cpu.cpsr().bits(),
            spsr: self.cpu.spsr().bits(),
            next_pc: self.cpu.next_pc(),
            halted: self.cpu.halted(),
            halt_reason: self.cpu.halt_reason().as_u8(),
            cycle: self.cpu.cycle(),
        }
    }

    /// Restores a previously captured processor state.
    ///
    /// # Errors
    ///
    /// Rejects snapshots from an unknown layout revision or carrying an
    /// unassigned halt-reason code; the engine is untouched on error.
    pub fn restore(&mut self, snapshot: &CpuSnapshot) -> Result<(), SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        let reason = HaltReason::from_u8(snapshot.halt_reason)
            .ok_or(SnapshotError::UnknownHaltReason(snapshot.halt_reason))?;

        self.cpu.set_regs(snapshot.regs);
        self.cpu.set_cpsr(Psr::from_bits(snapshot.cpsr));
        self.cpu.set_spsr(Psr::from_bits(snapshot.spsr));
        self.cpu.set_next_pc(snapshot.next_pc);
        self.cpu.set_cycle(snapshot.cycle);
        self.cpu.clear_halt();
        if snapshot.halted {
            self.cpu.halt(reason);
        }
        Ok(())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
