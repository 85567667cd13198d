use bitvec::prelude::*;

use crate::error::AsmError;
use crate::format::{mask, split_format_byte, ImmEncoding, Layout, Slot};
use crate::instructions::{Format, ImmVariant, InstructionSet, InstructionSpec, Role};
use crate::operand::ResolvedOperand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub spec: InstructionSpec,
    pub len: u8,
    /// One per `spec.roles`, as the encoder received them.
    pub operands: Vec<ResolvedOperand>,
    /// Format byte flags of the wide RegImm variant.
    pub encoding: Option<ImmEncoding>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated instruction: {needed} byte(s) needed, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("byte {0:#04x} does not start any instruction format")]
    BadMarker(u8),
    #[error("no {format:?} instruction has opcode {opcode:#b}")]
    UnknownOpcode { format: Format, opcode: u8 },
    #[error("{0}")]
    Layout(String),
}

impl From<AsmError> for DecodeError {
    fn from(err: AsmError) -> Self {
        DecodeError::Layout(err.to_string())
    }
}

pub trait Decoder {
    fn decode(&self, bytes: &[u8]) -> Result<Decoded, DecodeError>;
}

fn sign_extend(value: u64, width: u32) -> i64 {
    let s = 64 - width;
    ((value << s) as i64) >> s
}

/// Decodes against the same table the program was assembled with.
pub struct TableDecoder<'t> {
    isa: &'t InstructionSet,
}

impl<'t> TableDecoder<'t> {
    pub fn new(isa: &'t InstructionSet) -> Self {
        Self { isa }
    }

    /// Decodes back to back from `bytes`, pairing each instruction with its
    /// address (starting at `base`). Fails on the first undecodable byte.
    pub fn decode_all(&self, bytes: &[u8], base: u32) -> Result<Vec<(u32, Decoded)>, DecodeError> {
        let mut out = Vec::new();
        let mut off = 0usize;
        while off < bytes.len() {
            let d = self.decode(&bytes[off..])?;
            let len = d.len as usize;
            out.push((base.wrapping_add(off as u32), d));
            off += len;
        }
        Ok(out)
    }
}

impl Decoder for TableDecoder<'_> {
    fn decode(&self, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        let first = *bytes.first().ok_or(DecodeError::Truncated {
            needed: 1,
            available: 0,
        })?;
        let format = Layout::format_of(first).ok_or(DecodeError::BadMarker(first))?;
        // marker and opcode share the first byte
        let opcode = first & mask(format.opcode_width()) as u8;
        let spec = self
            .isa
            .by_opcode(format, opcode)
            .ok_or(DecodeError::UnknownOpcode { format, opcode })?;
        let layout = Layout::for_spec(spec)?;
        let len = layout.len as usize;
        if bytes.len() < len {
            return Err(DecodeError::Truncated {
                needed: len,
                available: bytes.len(),
            });
        }

        let bits = bytes[..len].view_bits::<Msb0>();
        let mut pos = (layout.marker_width + layout.opcode_width()) as usize;
        let mut raw: Vec<(Slot, u64, u32)> = Vec::with_capacity(layout.fields.len());
        for field in layout.fields {
            let width = field.width as usize;
            let value = bits[pos..pos + width].load_be::<u64>();
            raw.push((field.slot, value, field.width));
            pos += width;
        }
        let field = |slot: Slot| raw.iter().find(|(s, _, _)| *s == slot).copied();

        let encoding = match spec.variant {
            Some(ImmVariant::Wide) => field(Slot::ImmFormat).map(|(_, v, _)| split_format_byte(v as u8).1),
            _ => None,
        };

        let mut operands = Vec::with_capacity(spec.roles.len());
        for &role in &spec.roles {
            let (_, value, width) = field(Slot::Operand(role)).unwrap_or((Slot::Operand(role), 0, 0));
            operands.push(match role {
                Role::Rd | Role::Rs | Role::Rt => ResolvedOperand::Register(value as u8),
                Role::Shamt => ResolvedOperand::Immediate(value as i64),
                Role::Imm => ResolvedOperand::Immediate(immediate(value, width, encoding)),
            });
        }

        Ok(Decoded {
            spec: spec.clone(),
            len: layout.len,
            operands,
            encoding,
        })
    }
}

fn immediate(value: u64, width: u32, encoding: Option<ImmEncoding>) -> i64 {
    if width == 0 {
        return 0;
    }
    match encoding {
        // short variant carries no flags and is always two's complement
        None => sign_extend(value, width),
        Some(flags) if flags.contains(ImmEncoding::SIGNED) => {
            let v = sign_extend(value, width);
            if flags.contains(ImmEncoding::ONES_COMPLEMENT) && v < 0 {
                v + 1
            } else {
                v
            }
        }
        Some(_) => value as i64,
    }
}
