//! Pattern-rule decode table indexed by a 12-bit instruction key.
//!
//! The key packs the three coarse class bits, the five mode/opcode bits,
//! and the four low discriminator bits of a word:
//!
//! ```text
//! key[11:9] = instr[27:25]
//! key[8:4]  = instr[24:20]
//! key[3:0]  = instr[7:4]
//! ```
//!
//! Each rule constrains the key through `mask12`/`value12` and optionally
//! pins extra word bits through `xmask`/`xvalue`. The table is built once
//! at engine construction: every rule is inserted into every key bucket it
//! can match, and buckets are sorted by specificity (total constrained
//! bits) so the most specific rule wins. Lookup takes the first candidate
//! whose extra bits match; later candidates are never consulted.

#![allow(clippy::cast_possible_truncation)]

/// Executable operation selected by decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Op {
    // Data processing.
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
    Movw,
    Movt,
    // Multiplies.
    Mul,
    Mla,
    Umull,
    Umlal,
    Smull,
    Smlal,
    // Bit-field and miscellaneous register ops.
    Bfc,
    Bfi,
    Clz,
    // Branches.
    B,
    Bl,
    Bx,
    BlxReg,
    // Loads and stores.
    Str,
    Ldr,
    Strb,
    Ldrb,
    LdrLiteral,
    Strh,
    Ldrh,
    Ldrsb,
    Ldrsh,
    Strd,
    Ldrd,
    Ldm,
    Stm,
    Swp,
    Swpb,
    // System.
    Svc,
    Bkpt,
    Mrs,
    MsrReg,
    MsrImm,
    Cps,
    Dsb,
    Dmb,
    Isb,
    Nop,
    Wfi,
    Sentinel,
}

/// One decode pattern.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Key bits this rule constrains.
    pub mask12: u16,
    /// Required values of the constrained key bits.
    pub value12: u16,
    /// Additional full-word bits this rule constrains.
    pub xmask: u32,
    /// Required values of the additional bits.
    pub xvalue: u32,
    /// Whether the condition field gates execution. Rules whose encodings
    /// repurpose the condition field set this to `false`.
    pub check_cond: bool,
    /// Operation selected when the rule matches.
    pub op: Op,
}

const fn rule(
    mask12: u16,
    value12: u16,
    xmask: u32,
    xvalue: u32,
    check_cond: bool,
    op: Op,
) -> Rule {
    Rule {
        mask12,
        value12,
        xmask,
        xvalue,
        check_cond,
        op,
    }
}

/// The full pattern set. Bucket ordering is by specificity, so source order
/// only breaks ties between equally specific rules.
#[rustfmt::skip]
const RULES: &[Rule] = &[
    // Bit-field clear pins the all-ones source field; it must outrank the
    // insert form that shares the rest of the encoding.
    rule(0x0FE7, 0x07C1, 0x0FE0_007F, 0x07C0_001F, true,  Op::Bfc),
    rule(0x0FE7, 0x07C1, 0x0FE0_0070, 0x07C0_0010, true,  Op::Bfi),
    rule(0x0FFF, 0x0161, 0x0FFF_0FF0, 0x016F_0F10, true,  Op::Clz),

    // Barriers carry the unconditional 0xF prefix.
    rule(0x0FFF, 0x0574, 0x0FFF_0FF0, 0x057F_0040, false, Op::Dsb),
    rule(0x0FFF, 0x0575, 0x0FFF_0FF0, 0x057F_0050, false, Op::Dmb),
    rule(0x0FFF, 0x0576, 0x0FFF_0FF0, 0x057F_0060, false, Op::Isb),

    // PC-relative load pins Rn = r15; beats the generic immediate load.
    rule(0x0F50, 0x0510, 0x033F_0000, 0x011F_0000, true,  Op::LdrLiteral),

    rule(0x0FFF, 0x0127, 0x0FF0_00F0, 0x0120_0070, false, Op::Bkpt),
    rule(0x0F00, 0x0100, 0xFF00_F000, 0xF100_0000, true,  Op::Cps),

    // Wide moves sit in the hole left by the test ops with S = 0; their
    // extra constraint outranks the coarse data-processing patterns.
    rule(0x0F00, 0x0300, 0x0FF0_0000, 0x0300_0000, true,  Op::Movw),
    rule(0x0F00, 0x0300, 0x0FF0_0000, 0x0340_0000, true,  Op::Movt),

    // Halfword and doubleword transfers, immediate and register forms.
    rule(0x0E1F, 0x000B, 0, 0, true, Op::Strh),
    rule(0x0E1F, 0x001B, 0, 0, true, Op::Ldrh),
    rule(0x0E1F, 0x000D, 0, 0, true, Op::Ldrd),
    rule(0x0E1F, 0x001D, 0, 0, true, Op::Ldrsb),
    rule(0x0E1F, 0x000F, 0, 0, true, Op::Strd),
    rule(0x0E1F, 0x001F, 0, 0, true, Op::Ldrsh),

    // Data processing: the immediate bit and the S bit stay free so one
    // pattern covers all four encodings of each opcode.
    rule(0x0DE0, 0x0000, 0, 0, true, Op::And),
    rule(0x0DE0, 0x0020, 0, 0, true, Op::Eor),
    rule(0x0DE0, 0x0040, 0, 0, true, Op::Sub),
    rule(0x0DE0, 0x0060, 0, 0, true, Op::Rsb),
    rule(0x0DE0, 0x0080, 0, 0, true, Op::Add),
    rule(0x0DE0, 0x00A0, 0, 0, true, Op::Adc),
    rule(0x0DE0, 0x00C0, 0, 0, true, Op::Sbc),
    rule(0x0DE0, 0x00E0, 0, 0, true, Op::Rsc),
    rule(0x0DE0, 0x0100, 0, 0, true, Op::Tst),
    rule(0x0DE0, 0x0120, 0, 0, true, Op::Teq),
    rule(0x0DE0, 0x0140, 0, 0, true, Op::Cmp),
    rule(0x0DE0, 0x0160, 0, 0, true, Op::Cmn),
    rule(0x0DE0, 0x0180, 0, 0, true, Op::Orr),
    rule(0x0DE0, 0x01A0, 0, 0, true, Op::Mov),
    rule(0x0DE0, 0x01C0, 0, 0, true, Op::Bic),
    rule(0x0DE0, 0x01E0, 0, 0, true, Op::Mvn),

    // Single data transfer, immediate-offset class.
    rule(0x0E50, 0x0400, 0, 0, true, Op::Str),
    rule(0x0E50, 0x0410, 0, 0, true, Op::Ldr),
    rule(0x0E50, 0x0440, 0, 0, true, Op::Strb),
    rule(0x0E50, 0x0450, 0, 0, true, Op::Ldrb),
    // Register-offset class; bit 4 must be clear.
    rule(0x0E50, 0x0600, 0x0000_0010, 0, true, Op::Str),
    rule(0x0E50, 0x0610, 0x0000_0010, 0, true, Op::Ldr),
    rule(0x0E50, 0x0640, 0x0000_0010, 0, true, Op::Strb),
    rule(0x0E50, 0x0650, 0x0000_0010, 0, true, Op::Ldrb),

    rule(0x0E10, 0x0800, 0, 0, true, Op::Stm),
    rule(0x0E10, 0x0810, 0, 0, true, Op::Ldm),

    rule(0x0FEF, 0x0009, 0, 0, true, Op::Mul),
    rule(0x0FEF, 0x0029, 0, 0, true, Op::Mla),
    rule(0x0E0F, 0x0009, 0x0FE0_00F0, 0x0080_0090, true, Op::Umull),
    rule(0x0E0F, 0x0009, 0x0FE0_00F0, 0x00A0_0090, true, Op::Umlal),
    rule(0x0E0F, 0x0009, 0x0FE0_00F0, 0x00C0_0090, true, Op::Smull),
    rule(0x0E0F, 0x0009, 0x0FE0_00F0, 0x00E0_0090, true, Op::Smlal),

    rule(0x0FEF, 0x0109, 0x0FF0_0FF0, 0x0100_0090, true, Op::Swp),
    rule(0x0FEF, 0x0149, 0x0FF0_0FF0, 0x0140_0090, true, Op::Swpb),

    rule(0x0FFF, 0x0121, 0, 0, true, Op::Bx),
    rule(0x0FFF, 0x0123, 0x0FF0_00F0, 0x0120_0030, true, Op::BlxReg),
    rule(0x0F00, 0x0A00, 0, 0, true, Op::B),
    rule(0x0F00, 0x0B00, 0, 0, true, Op::Bl),

    rule(0x0F00, 0x0F00, 0x0F00_0000, 0x0F00_0000, true, Op::Svc),

    rule(0x0FBF, 0x0100, 0x0FBF_0FFF, 0x010F_0000, true, Op::Mrs),
    rule(0x0FBF, 0x0120, 0x0FB0_FFF0, 0x0120_F000, true, Op::MsrReg),
    rule(0x0FB0, 0x0320, 0x0FB0_F000, 0x0320_F000, true, Op::MsrImm),

    // Hint space: exact-word matches, condition field not consulted.
    rule(0x0FFF, 0x0320, 0xFFFF_FFFF, 0xE320_F000, false, Op::Nop),
    rule(0x0FFF, 0x0320, 0xFFFF_FFFF, 0xE320_F003, false, Op::Wfi),

    // The halt sentinel is a single reserved word.
    rule(0x0FFF, 0x0EAE, 0xFFFF_FFFF, 0xDEAD_BEEF, false, Op::Sentinel),
];

/// Number of key values.
pub const KEY_SPACE: usize = 1 << 12;

/// Upper bound on candidates sharing one key, asserted at build time.
pub const MAX_PER_KEY: usize = 16;

/// Extracts the 12-bit dispatch key from an instruction word.
#[must_use]
pub const fn key12(instr: u32) -> u16 {
    let class = (instr >> 25) & 0x7;
    let mode = (instr >> 20) & 0x1F;
    let low = (instr >> 4) & 0xF;
    ((class << 9) | (mode << 4) | low) as u16
}

const fn specificity(r: &Rule) -> u32 {
    r.mask12.count_ones() + r.xmask.count_ones()
}

/// Per-key candidate lists, specificity-sorted.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    buckets: Vec<Vec<u16>>,
}

impl DecodeTable {
    /// Builds the table from the pattern set.
    #[must_use]
    pub fn new() -> Self {
        let mut buckets: Vec<Vec<u16>> = vec![Vec::new(); KEY_SPACE];

        for (index, r) in RULES.iter().enumerate() {
            let index = u16::try_from(index).unwrap_or(u16::MAX);
            for (key, bucket) in buckets.iter_mut().enumerate() {
                let key = key as u16;
                if key & r.mask12 == r.value12 & r.mask12 {
                    bucket.push(index);
                }
            }
        }

        for bucket in &mut buckets {
            // Stable: equally specific rules keep their source order.
            bucket.sort_by_key(|&i| std::cmp::Reverse(specificity(&RULES[usize::from(i)])));
            debug_assert!(bucket.len() <= MAX_PER_KEY);
        }

        Self { buckets }
    }

    /// Returns the most specific rule structurally matching `instr`, or
    /// `None` when the word decodes to nothing.
    #[must_use]
    pub fn lookup(&self, instr: u32) -> Option<&'static Rule> {
        let key = key12(instr);
        for &index in &self.buckets[usize::from(key)] {
            let r = &RULES[usize::from(index)];
            if instr & r.xmask == r.xvalue & r.xmask {
                return Some(r);
            }
        }
        None
    }
}

impl Default for DecodeTable {
    fn default() -> Self {
        Self::new()
    }
}
