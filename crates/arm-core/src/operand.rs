//! Operand2 barrel shifter for data-processing instructions.
//!
//! The shift-amount special cases here (0 vs 32 vs greater, immediate vs
//! register encodings) are the most divergence-prone part of the core and
//! are covered by dedicated property tests.

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use crate::state::Cpu;

/// Shifter output: the second operand plus its carry-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shifted {
    /// Computed second operand.
    pub value: u32,
    /// Shifter carry-out. Equal to the incoming carry when the shift form
    /// leaves carry untouched.
    pub carry: bool,
}

const fn ror32(value: u32, amount: u32) -> u32 {
    value.rotate_right(amount & 31)
}

/// Computes the second operand of a data-processing instruction.
///
/// The incoming carry is `cpu`'s current C flag; it is used by the
/// rotate-with-extend form and passed through unchanged whenever the shift
/// does not define a carry-out. Register reads follow the `pc + 8`
/// convention.
#[must_use]
pub fn dp_operand2(cpu: &Cpu, instr: u32) -> Shifted {
    let carry_in = cpu.cpsr().c();

    // Rotated immediate form.
    if instr & (1 << 25) != 0 {
        let imm8 = instr & 0xFF;
        let rot = (instr >> 8) & 0xF;
        if rot == 0 {
            return Shifted {
                value: imm8,
                carry: carry_in,
            };
        }
        let value = ror32(imm8, rot * 2);
        return Shifted {
            value,
            carry: value >> 31 != 0,
        };
    }

    let rm_val = cpu.read_operand(instr & 0xF);
    let shift_type = (instr >> 5) & 0x3;

    if instr & (1 << 4) == 0 {
        shift_by_immediate(rm_val, shift_type, (instr >> 7) & 0x1F, carry_in)
    } else {
        let amount = cpu.read_operand((instr >> 8) & 0xF) & 0xFF;
        shift_by_register(rm_val, shift_type, amount, carry_in)
    }
}

fn shift_by_immediate(value: u32, shift_type: u32, amount: u32, carry_in: bool) -> Shifted {
    match shift_type {
        0 => {
            // LSL: amount 0 passes value and carry through.
            if amount == 0 {
                Shifted {
                    value,
                    carry: carry_in,
                }
            } else {
                Shifted {
                    value: value << amount,
                    carry: value >> (32 - amount) & 1 != 0,
                }
            }
        }
        1 => {
            // LSR #0 encodes LSR #32.
            if amount == 0 {
                Shifted {
                    value: 0,
                    carry: value >> 31 != 0,
                }
            } else {
                Shifted {
                    value: value >> amount,
                    carry: value >> (amount - 1) & 1 != 0,
                }
            }
        }
        2 => {
            // ASR #0 encodes ASR #32: all sign bits, carry from bit 31.
            if amount == 0 {
                Shifted {
                    value: sign_fill(value),
                    carry: value >> 31 != 0,
                }
            } else {
                Shifted {
                    value: ((value as i32) >> amount) as u32,
                    carry: value >> (amount - 1) & 1 != 0,
                }
            }
        }
        _ => {
            // ROR #0 encodes RRX.
            if amount == 0 {
                Shifted {
                    value: (value >> 1) | (u32::from(carry_in) << 31),
                    carry: value & 1 != 0,
                }
            } else {
                Shifted {
                    value: ror32(value, amount),
                    carry: value >> (amount - 1) & 1 != 0,
                }
            }
        }
    }
}

fn shift_by_register(value: u32, shift_type: u32, amount: u32, carry_in: bool) -> Shifted {
    if amount == 0 {
        return Shifted {
            value,
            carry: carry_in,
        };
    }

    match shift_type {
        0 => match amount {
            1..=31 => Shifted {
                value: value << amount,
                carry: value >> (32 - amount) & 1 != 0,
            },
            32 => Shifted {
                value: 0,
                carry: value & 1 != 0,
            },
            _ => Shifted {
                value: 0,
                carry: false,
            },
        },
        1 => match amount {
            1..=31 => Shifted {
                value: value >> amount,
                carry: value >> (amount - 1) & 1 != 0,
            },
            32 => Shifted {
                value: 0,
                carry: value >> 31 != 0,
            },
            _ => Shifted {
                value: 0,
                carry: false,
            },
        },
        2 => {
            if amount < 32 {
                Shifted {
                    value: ((value as i32) >> amount) as u32,
                    carry: value >> (amount - 1) & 1 != 0,
                }
            } else {
                Shifted {
                    value: sign_fill(value),
                    carry: value >> 31 != 0,
                }
            }
        }
        _ => {
            let rot = amount & 31;
            if rot == 0 {
                // Rotate by a multiple of 32: value unchanged, C from bit 31.
                Shifted {
                    value,
                    carry: value >> 31 != 0,
                }
            } else {
                Shifted {
                    value: ror32(value, rot),
                    carry: value >> (rot - 1) & 1 != 0,
                }
            }
        }
    }
}

const fn sign_fill(value: u32) -> u32 {
    if value & 0x8000_0000 != 0 {
        0xFFFF_FFFF
    } else {
        0
    }
}

/// Scaled register offset for single-data-transfer addressing. Carry is
/// read (for the rotate-with-extend form) but never written back.
#[must_use]
pub fn scaled_offset(cpu: &Cpu, instr: u32) -> u32 {
    let rm_val = cpu.read_operand(instr & 0xF);
    let shift_type = (instr >> 5) & 0x3;
    let amount = (instr >> 7) & 0x1F;

    match shift_type {
        0 => {
            if amount == 0 {
                rm_val
            } else {
                rm_val << amount
            }
        }
        1 => {
            if amount == 0 {
                0
            } else {
                rm_val >> amount
            }
        }
        2 => {
            if amount == 0 {
                sign_fill(rm_val)
            } else {
                ((rm_val as i32) >> amount) as u32
            }
        }
        _ => {
            if amount == 0 {
                (rm_val >> 1) | (u32::from(cpu.cpsr().c()) << 31)
            } else {
                ror32(rm_val, amount)
            }
        }
    }
}
