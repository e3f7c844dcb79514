//! Condition-code evaluation against the current arithmetic flags.

use crate::state::Psr;

/// Evaluates a 4-bit condition code against N/Z/C/V.
///
/// Code `0xE` is always-true; the reserved code `0xF` evaluates false here
/// (the dispatcher bypasses evaluation entirely for entries that repurpose
/// the condition field).
#[must_use]
pub const fn condition_passes(cond: u32, psr: Psr) -> bool {
    let n = psr.n();
    let z = psr.z();
    let c = psr.c();
    let v = psr.v();

    match cond & 0xF {
        0x0 => z,               // EQ
        0x1 => !z,              // NE
        0x2 => c,               // CS
        0x3 => !c,              // CC
        0x4 => n,               // MI
        0x5 => !n,              // PL
        0x6 => v,               // VS
        0x7 => !v,              // VC
        0x8 => c && !z,         // HI
        0x9 => !c || z,         // LS
        0xA => n == v,          // GE
        0xB => n != v,          // LT
        0xC => !z && n == v,    // GT
        0xD => z || n != v,     // LE
        0xE => true,            // AL
        _ => false,             // reserved
    }
}
