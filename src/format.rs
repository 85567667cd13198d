//! Bit layouts of the five encodings.
//!
//! Every layout starts with a marker in the high bits of the first byte,
//! followed by the opcode; marker plus opcode always fill exactly that first
//! byte, so the first byte alone tells a decoder the format. Fields follow in
//! MSB-first order.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::AsmError;
use crate::instructions::{Format, ImmVariant, InstructionSpec, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Operand(Role),
    /// Size/encoding byte of the wide RegImm variant.
    ImmFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub slot: Slot,
    pub width: u32,
}

const fn op(role: Role, width: u32) -> Field {
    Field { slot: Slot::Operand(role), width }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Layout {
    pub format: Format,
    pub len: u8,
    pub marker: u8,
    pub marker_width: u32,
    pub fields: &'static [Field],
}

pub static FIXED1: Layout = Layout {
    format: Format::Fixed1,
    len: 1,
    marker: 0b0,
    marker_width: 1,
    fields: &[],
};

pub static REG2: Layout = Layout {
    format: Format::Reg2,
    len: 2,
    marker: 0b110,
    marker_width: 3,
    fields: &[op(Role::Rd, 4), op(Role::Rs, 4)],
};

pub static REG3: Layout = Layout {
    format: Format::Reg3,
    len: 3,
    marker: 0b1110,
    marker_width: 4,
    fields: &[
        op(Role::Rd, 4),
        op(Role::Rs, 4),
        op(Role::Rt, 4),
        op(Role::Shamt, 4),
    ],
};

pub static REG_IMM_SHORT: Layout = Layout {
    format: Format::RegImm,
    len: 4,
    marker: 0b11110,
    marker_width: 5,
    fields: &[op(Role::Rd, 4), op(Role::Rs, 4), op(Role::Imm, 16)],
};

pub static REG_IMM_WIDE: Layout = Layout {
    format: Format::RegImm,
    len: 7,
    marker: 0b11110,
    marker_width: 5,
    fields: &[
        op(Role::Rd, 4),
        op(Role::Rs, 4),
        Field { slot: Slot::ImmFormat, width: 8 },
        op(Role::Imm, 32),
    ],
};

/// Size in bytes of the wide variant's immediate, stored in the format byte.
pub const WIDE_IMM_BYTES: u8 = 4;

bitflags! {
    /// Low nibble of the wide variant's format byte (`S 1 R 2`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ImmEncoding: u8 {
        const SIGNED = 0b1000;
        const ONES_COMPLEMENT = 0b0100;
        const RELATIVE = 0b0010;
        const TWOS_COMPLEMENT = 0b0001;
    }
}

pub fn format_byte(size: u8, encoding: ImmEncoding) -> u8 {
    ((size & 0xF) << 4) | encoding.bits()
}

pub fn split_format_byte(byte: u8) -> (u8, ImmEncoding) {
    (byte >> 4, ImmEncoding::from_bits_truncate(byte & 0xF))
}

pub fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl Layout {
    pub fn for_spec(spec: &InstructionSpec) -> Result<&'static Layout, AsmError> {
        match (spec.format, spec.variant) {
            (Format::Fixed1, None) => Ok(&FIXED1),
            (Format::Reg2, None) => Ok(&REG2),
            (Format::Reg3, None) => Ok(&REG3),
            (Format::RegImm, Some(ImmVariant::Short)) => Ok(&REG_IMM_SHORT),
            (Format::RegImm, Some(ImmVariant::Wide)) => Ok(&REG_IMM_WIDE),
            (Format::RegImm, None) => Err(AsmError::UnsupportedFormat(format!(
                "`{}` is RegImm but names no immediate variant",
                spec.mnemonic
            ))),
            (format, Some(variant)) => Err(AsmError::UnsupportedFormat(format!(
                "`{}` is {format:?}, which has no {variant:?} variant",
                spec.mnemonic
            ))),
        }
    }

    /// Format whose marker starts `byte`, if any.
    pub fn format_of(byte: u8) -> Option<Format> {
        if byte & 0x80 == 0 {
            Some(Format::Fixed1)
        } else if byte >> 5 == 0b110 {
            Some(Format::Reg2)
        } else if byte >> 4 == 0b1110 {
            Some(Format::Reg3)
        } else if byte >> 3 == 0b11110 {
            Some(Format::RegImm)
        } else {
            None
        }
    }

    pub fn bits(&self) -> u32 {
        u32::from(self.len) * 8
    }

    pub fn opcode_width(&self) -> u32 {
        self.format.opcode_width()
    }

    pub fn accepts(&self, role: Role) -> bool {
        self.fields.iter().any(|f| f.slot == Slot::Operand(role))
    }

    /// Shift of `slot` counted from the least significant bit.
    pub fn shift_of(&self, slot: Slot) -> Option<u32> {
        let mut used = self.marker_width + self.opcode_width();
        for field in self.fields {
            used += field.width;
            if field.slot == slot {
                return Some(self.bits() - used);
            }
        }
        None
    }
}
