//! Halt reasons and host-facing error types.
//!
//! The core never propagates errors across the step boundary: every stop
//! condition is latched as a [`HaltReason`] for the host to inspect. The
//! `thiserror` enums here cover the engine-level API only (image loading and
//! snapshot restore).

use thiserror::Error;

/// Why the core stopped executing.
///
/// Discriminants are stable and part of the snapshot format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum HaltReason {
    /// Not halted.
    #[default]
    #[error("not halted")]
    None = 0,
    /// The `0xDEADBEEF` halt-sentinel word was executed.
    #[error("halt sentinel executed")]
    SentinelTrap = 1,
    /// A breakpoint instruction was executed.
    #[error("breakpoint")]
    Breakpoint = 2,
    /// Reserved for hosts that trap software-interrupt entry instead of
    /// vectoring it.
    #[error("software interrupt")]
    SoftwareInterrupt = 3,
    /// No decode-table entry matched the fetched word.
    #[error("undefined instruction")]
    Undefined = 4,
    /// Instruction fetch fell outside the bound memory region.
    #[error("fetch abort")]
    Abort = 5,
}

impl HaltReason {
    /// Stable wire code for this reason.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a wire code produced by [`Self::as_u8`].
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::SentinelTrap),
            2 => Some(Self::Breakpoint),
            3 => Some(Self::SoftwareInterrupt),
            4 => Some(Self::Undefined),
            5 => Some(Self::Abort),
            _ => None,
        }
    }

    /// Returns `true` for reasons raised by explicit trap instructions.
    #[must_use]
    pub const fn is_trap(self) -> bool {
        matches!(self, Self::SentinelTrap | Self::Breakpoint)
    }
}

/// Failure to place a raw image into backing memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The image does not fit between `addr` and the end of memory.
    #[error("image of {len} bytes at {addr:#010x} exceeds {memory} bytes of memory")]
    OutOfBounds {
        /// Requested load address.
        addr: u32,
        /// Image length in bytes.
        len: usize,
        /// Size of the attached memory.
        memory: usize,
    },
}

/// Failure to restore a snapshot into an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The snapshot carries a halt-reason code this build does not know.
    #[error("unknown halt reason code {0}")]
    UnknownHaltReason(u8),
    /// The snapshot layout revision is not supported by this build.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}
