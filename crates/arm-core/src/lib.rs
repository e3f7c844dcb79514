//! A32 instruction-execution engine built around a key12 decode table.
//!
//! One [`Vm`] owns the processor state, a flat little-endian memory, and a
//! decode table built once at construction. Each step fetches a word,
//! selects the most specific matching pattern, gates on the condition
//! field, and commits the shadow next-PC unless the handler latched a
//! halt.

/// Halt reasons and host-facing error types.
pub mod halt;
pub use halt::{HaltReason, ImageError, SnapshotError};

/// Architectural processor state.
pub mod state;
pub use state::{Cpu, Psr, PC_READ_AHEAD, REG_LR, REG_PC, REG_SP};

/// Condition-code evaluation.
pub mod cond;
pub use cond::condition_passes;

/// Barrel shifter and addressing offsets.
pub mod operand;
pub use operand::{dp_operand2, scaled_offset, Shifted};

/// Byte-addressed memory behind the bus trait.
pub mod memory;
pub use memory::{Bus, FlatRam};

/// Key12 pattern table and operation tags.
pub mod decode;
pub use decode::{key12, DecodeTable, Op, Rule, KEY_SPACE, MAX_PER_KEY};

/// Fetch/dispatch/commit driver and the per-operation handlers.
pub mod execute;
pub use execute::{step, StepOutcome};

/// Host-facing engine and lifecycle types.
pub mod api;
pub use api::{
    CoreConfig, CpuSnapshot, RunOutcome, TraceEvent, TraceSink, Vm, DEFAULT_MEMORY, ENTRY_POINT,
    SNAPSHOT_VERSION,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
