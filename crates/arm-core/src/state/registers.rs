//! Program-status register layout and field-masked writes.

/// Negative flag.
pub const PSR_N: u32 = 1 << 31;
/// Zero flag.
pub const PSR_Z: u32 = 1 << 30;
/// Carry / not-borrow flag.
pub const PSR_C: u32 = 1 << 29;
/// Signed-overflow flag.
pub const PSR_V: u32 = 1 << 28;
/// Sticky saturation flag.
pub const PSR_Q: u32 = 1 << 27;
/// SIMD greater-or-equal bits.
pub const PSR_GE_MASK: u32 = 0xF << 16;
/// Endianness select.
pub const PSR_E: u32 = 1 << 9;
/// Asynchronous-abort mask.
pub const PSR_A: u32 = 1 << 8;
/// IRQ mask.
pub const PSR_I: u32 = 1 << 7;
/// FIQ mask.
pub const PSR_F: u32 = 1 << 6;
/// Instruction-set select; normalized away by the fetch stage.
pub const PSR_T: u32 = 1 << 5;
/// Processor-mode field.
pub const PSR_MODE_MASK: u32 = 0x1F;

/// Unprivileged mode value.
pub const MODE_USER: u32 = 0x10;
/// Supervisor mode, entered on software interrupt.
pub const MODE_SUPERVISOR: u32 = 0x13;
/// Privileged system mode.
pub const MODE_SYSTEM: u32 = 0x1F;

/// A 32-bit status register (current or saved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Psr(u32);

impl Psr {
    /// Wraps a raw status word.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw status word.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Negative flag.
    #[must_use]
    pub const fn n(self) -> bool {
        self.0 & PSR_N != 0
    }

    /// Zero flag.
    #[must_use]
    pub const fn z(self) -> bool {
        self.0 & PSR_Z != 0
    }

    /// Carry flag.
    #[must_use]
    pub const fn c(self) -> bool {
        self.0 & PSR_C != 0
    }

    /// Overflow flag.
    #[must_use]
    pub const fn v(self) -> bool {
        self.0 & PSR_V != 0
    }

    /// Instruction-set select bit.
    #[must_use]
    pub const fn thumb(self) -> bool {
        self.0 & PSR_T != 0
    }

    /// Current processor mode bits.
    #[must_use]
    pub const fn mode(self) -> u32 {
        self.0 & PSR_MODE_MASK
    }

    /// Returns `true` in the unprivileged mode.
    #[must_use]
    pub const fn is_user_mode(self) -> bool {
        self.mode() == MODE_USER
    }

    fn assign(&mut self, mask: u32, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// Sets N and Z from a 32-bit result.
    pub fn set_nz(&mut self, result: u32) {
        self.assign(PSR_N, result & 0x8000_0000 != 0);
        self.assign(PSR_Z, result == 0);
    }

    /// Sets N and Z from a full 64-bit result (long multiplies).
    pub fn set_nz_64(&mut self, result: u64) {
        self.assign(PSR_N, result & 0x8000_0000_0000_0000 != 0);
        self.assign(PSR_Z, result == 0);
    }

    /// Sets the carry flag.
    pub fn set_c(&mut self, carry: bool) {
        self.assign(PSR_C, carry);
    }

    /// Sets the overflow flag.
    pub fn set_v(&mut self, overflow: bool) {
        self.assign(PSR_V, overflow);
    }

    /// Clears the instruction-set select bit.
    pub fn clear_thumb(&mut self) {
        self.0 &= !PSR_T;
    }

    /// Replaces the mode field.
    pub fn set_mode(&mut self, mode: u32) {
        self.0 = (self.0 & !PSR_MODE_MASK) | (mode & PSR_MODE_MASK);
    }

    /// Field-masked status write as performed by the mode-transfer
    /// instructions. `fields` is the 4-bit `{f,s,x,c}` group selector.
    ///
    /// The control group replaces E, the A/I/F masks, and the mode; T is
    /// dropped from the written value so the instruction set cannot be
    /// switched this way. The extension group is ignored. The status group
    /// replaces the GE bits. The flags group replaces N/Z/C/V/Q.
    pub fn write_fields(&mut self, value: u32, fields: u32) {
        const FIELD_C: u32 = 1 << 0;
        const FIELD_X: u32 = 1 << 1;
        const FIELD_S: u32 = 1 << 2;
        const FIELD_F: u32 = 1 << 3;

        let mut p = self.0;

        if fields & FIELD_C != 0 {
            let keep = p & !(PSR_E | PSR_A | PSR_I | PSR_F | PSR_T | PSR_MODE_MASK);
            let set = value & (PSR_E | PSR_A | PSR_I | PSR_F | PSR_MODE_MASK);
            p = keep | set;
        }
        if fields & FIELD_X != 0 {
            // Extension field has no assigned bits here.
        }
        if fields & FIELD_S != 0 {
            p = (p & !PSR_GE_MASK) | (value & PSR_GE_MASK);
        }
        if fields & FIELD_F != 0 {
            let keep = p & !(PSR_N | PSR_Z | PSR_C | PSR_V | PSR_Q);
            let set = value & (PSR_N | PSR_Z | PSR_C | PSR_V | PSR_Q);
            p = keep | set;
        }

        self.0 = p;
    }
}

#[cfg(test)]
mod tests {
    use super::{Psr, MODE_SUPERVISOR, PSR_C, PSR_I, PSR_N, PSR_Q, PSR_T, PSR_V, PSR_Z};
    use rstest::rstest;

    #[test]
    fn nz_tracks_result() {
        let mut psr = Psr::default();
        psr.set_nz(0);
        assert!(psr.z());
        assert!(!psr.n());
        psr.set_nz(0x8000_0001);
        assert!(psr.n());
        assert!(!psr.z());
    }

    #[rstest]
    #[case::flags_group(0b1000, PSR_N | PSR_Z | PSR_C | PSR_V | PSR_Q)]
    #[case::status_group(0b0100, 0xF << 16)]
    fn field_groups_touch_only_their_bits(#[case] fields: u32, #[case] expected: u32) {
        let mut psr = Psr::default();
        psr.write_fields(0xFFFF_FFFF, fields);
        assert_eq!(psr.bits(), expected);
    }

    #[test]
    fn control_group_never_sets_thumb() {
        let mut psr = Psr::from_bits(0);
        psr.write_fields(PSR_T | PSR_I | MODE_SUPERVISOR, 0b0001);
        assert!(!psr.thumb());
        assert_eq!(psr.bits() & PSR_I, PSR_I);
        assert_eq!(psr.mode(), MODE_SUPERVISOR);
    }

    #[test]
    fn extension_group_is_ignored() {
        let mut psr = Psr::from_bits(0x1234_0010);
        psr.write_fields(0xFFFF_FFFF, 0b0010);
        assert_eq!(psr.bits(), 0x1234_0010);
    }
}
