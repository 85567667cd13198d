use tracing::debug;

use crate::error::{AsmError, Range};
use crate::format::{format_byte, mask, ImmEncoding, Layout, Slot, WIDE_IMM_BYTES};
use crate::instructions::{ImmVariant, InstructionSpec, PatchKind, Role};
use crate::operand::ResolvedOperand;

/// Where a pending instruction still needs a label's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixup {
    pub symbol: String,
    /// Distance of the field's lowest bit from bit 0 of the pattern.
    pub shift: u32,
    pub width: u32,
    pub kind: PatchKind,
    /// Values the field can hold and still decode to the same number.
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInstruction {
    /// 1-based source line, 0 when not built from source.
    pub line: usize,
    pub address: u32,
    pub len: u8,
    /// Only the low `8 * len` bits are used.
    pub bits: u64,
    /// `Some` while the instruction is pending.
    pub fixup: Option<Fixup>,
}

impl EncodedInstruction {
    pub fn is_pending(&self) -> bool {
        self.fixup.is_some()
    }

    /// Address of the byte right after this instruction. May be 2^32 for
    /// an instruction occupying the last byte of the address space.
    pub fn end(&self) -> u64 {
        u64::from(self.address) + u64::from(self.len)
    }

    /// Big-endian bytes, exactly `len` of them.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.to_be_bytes()[8 - self.len as usize..].to_vec()
    }
}

pub fn check_arity(spec: &InstructionSpec, found: usize) -> Result<(), AsmError> {
    if found != spec.roles.len() {
        return Err(AsmError::ArityMismatch {
            mnemonic: spec.mnemonic.clone(),
            expected: spec.roles.len(),
            found,
        });
    }
    Ok(())
}

/// Packs `operands` (one per `spec.roles`) into the layout of `spec`.
///
/// Register and SHAMT values are masked to 4 bits and numeric immediates are
/// stored two's-complement in the full immediate field; neither overflows.
/// A label is only allowed in the IMM role: its field is left zero and the
/// result carries a [`Fixup`] for the patch pass.
pub fn encode(
    spec: &InstructionSpec,
    operands: &[ResolvedOperand],
    address: u32,
) -> Result<EncodedInstruction, AsmError> {
    let layout = Layout::for_spec(spec)?;
    check_arity(spec, operands.len())?;

    let mut values: Vec<(Role, u64)> = Vec::with_capacity(operands.len());
    let mut pending: Option<String> = None;
    let mut imm_is_symbol = false;
    for (operand, &role) in operands.iter().zip(&spec.roles) {
        if !layout.accepts(role) || values.iter().any(|(r, _)| *r == role) {
            return Err(AsmError::OperandRoleMismatch {
                operand: operand.to_string(),
                role,
            });
        }
        let value = match (operand, role) {
            (ResolvedOperand::Register(r), Role::Rd | Role::Rs | Role::Rt) => u64::from(*r),
            (ResolvedOperand::Immediate(v), Role::Shamt | Role::Imm) => *v as u64,
            (ResolvedOperand::Symbol(label), Role::Imm) => {
                pending = Some(label.clone());
                imm_is_symbol = true;
                0
            }
            (ResolvedOperand::Symbol(label), _) => {
                return Err(AsmError::InvalidPatchTarget {
                    label: label.clone(),
                    role,
                })
            }
            _ => {
                return Err(AsmError::OperandRoleMismatch {
                    operand: operand.to_string(),
                    role,
                })
            }
        };
        values.push((role, value));
    }

    let encoding = match (spec.patch, imm_is_symbol) {
        (PatchKind::Relative, _) => {
            ImmEncoding::SIGNED | ImmEncoding::RELATIVE | ImmEncoding::TWOS_COMPLEMENT
        }
        (PatchKind::Absolute, false) => ImmEncoding::SIGNED | ImmEncoding::TWOS_COMPLEMENT,
        (PatchKind::Absolute, true) => ImmEncoding::empty(),
    };

    let opcode_width = layout.opcode_width();
    let mut bits = u64::from(layout.marker);
    bits = (bits << opcode_width) | u64::from(spec.opcode_bits());
    for field in layout.fields {
        let value = match field.slot {
            Slot::Operand(role) => values
                .iter()
                .find(|(r, _)| *r == role)
                .map_or(0, |(_, v)| *v),
            Slot::ImmFormat => u64::from(format_byte(WIDE_IMM_BYTES, encoding)),
        };
        bits = (bits << field.width) | (value & mask(field.width));
    }

    let fixup = match pending {
        Some(symbol) => {
            let slot = Slot::Operand(Role::Imm);
            let shift = layout.shift_of(slot).unwrap_or(0);
            let width = layout
                .fields
                .iter()
                .find(|f| f.slot == slot)
                .map_or(0, |f| f.width);
            // the short variant has no format byte and always reads back signed
            let range = match (spec.patch, spec.variant) {
                (PatchKind::Absolute, Some(ImmVariant::Wide)) => Range::Unsigned,
                _ => Range::Signed,
            };
            Some(Fixup {
                symbol,
                shift,
                width,
                kind: spec.patch,
                range,
            })
        }
        None => None,
    };

    debug!(
        mnemonic = %spec.mnemonic,
        address,
        len = layout.len,
        pending = fixup.is_some(),
        "encoded {bits:#x}"
    );
    Ok(EncodedInstruction {
        line: 0,
        address,
        len: layout.len,
        bits,
        fixup,
    })
}
