use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AsmError;

/// Operand slot an instruction field is filled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Rd,
    Rs,
    Rt,
    Shamt,
    Imm,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Rd => "RD",
            Role::Rs => "RS",
            Role::Rt => "RT",
            Role::Shamt => "SHAMT",
            Role::Imm => "IMM",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Format {
    Fixed1,
    Reg2,
    Reg3,
    RegImm,
}

impl Format {
    /// Bits left for the opcode once the marker is in place.
    pub fn opcode_width(self) -> u32 {
        match self {
            Format::Fixed1 => 7,
            Format::Reg2 => 5,
            Format::Reg3 => 4,
            Format::RegImm => 3,
        }
    }
}

/// RegImm sub-layout: 16-bit immediate in 4 bytes, or format byte plus
/// 32-bit immediate in 7 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImmVariant {
    Short,
    Wide,
}

/// How a label in the immediate field turns into bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PatchKind {
    #[default]
    #[serde(rename = "abs")]
    Absolute,
    /// Signed distance from the end of the instruction to the label.
    #[serde(rename = "rel")]
    Relative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSpec {
    pub mnemonic: String,
    pub format: Format,
    pub variant: Option<ImmVariant>,
    pub opcode: u8,
    pub roles: Vec<Role>,
    pub patch: PatchKind,
}

impl InstructionSpec {
    pub fn new(mnemonic: impl Into<String>, format: Format, opcode: u8, roles: &[Role]) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            format,
            variant: None,
            opcode,
            roles: roles.to_vec(),
            patch: PatchKind::Absolute,
        }
    }

    pub fn with_variant(mut self, variant: ImmVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_patch(mut self, patch: PatchKind) -> Self {
        self.patch = patch;
        self
    }

    /// Opcode as it lands in the encoding, masked to the format's width.
    pub fn opcode_bits(&self) -> u8 {
        let width = self.format.opcode_width();
        self.opcode & ((1u8 << width) - 1)
    }
}

/// One row of the JSON table, keyed by mnemonic in the enclosing object.
#[derive(Debug, Deserialize)]
struct RawSpec {
    size: u8,
    opcode: String,
    #[serde(default)]
    args: Vec<Role>,
    #[serde(default)]
    patch: PatchKind,
}

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("malformed instruction table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`{mnemonic}`: opcode `{opcode}` is not a binary string of at most 8 bits")]
    BadOpcode { mnemonic: String, opcode: String },
    #[error("`{mnemonic}`: {source}")]
    Entry {
        mnemonic: String,
        #[source]
        source: AsmError,
    },
}

fn format_for_size(size: u8) -> Result<(Format, Option<ImmVariant>), AsmError> {
    match size {
        1 => Ok((Format::Fixed1, None)),
        2 => Ok((Format::Reg2, None)),
        3 => Ok((Format::Reg3, None)),
        4 => Ok((Format::RegImm, Some(ImmVariant::Short))),
        7 => Ok((Format::RegImm, Some(ImmVariant::Wide))),
        other => Err(AsmError::UnsupportedFormat(format!("no {other}-byte encoding"))),
    }
}

fn parse_opcode(mnemonic: &str, text: &str) -> Result<u8, TableError> {
    let bad = || TableError::BadOpcode {
        mnemonic: mnemonic.to_string(),
        opcode: text.to_string(),
    };
    let digits = text.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(bad());
    }
    u8::from_str_radix(digits, 2).map_err(|_| bad())
}

/// The instruction-set table, ordered by mnemonic.
#[derive(Debug, Clone, Default)]
pub struct InstructionSet {
    specs: BTreeMap<String, InstructionSpec>,
}

impl InstructionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: InstructionSpec) -> Option<InstructionSpec> {
        self.specs.insert(spec.mnemonic.clone(), spec)
    }

    pub fn from_json(text: &str) -> Result<Self, TableError> {
        let raw: BTreeMap<String, RawSpec> = serde_json::from_str(text)?;
        let mut set = Self::new();
        for (mnemonic, row) in raw {
            let (format, variant) =
                format_for_size(row.size).map_err(|source| TableError::Entry {
                    mnemonic: mnemonic.clone(),
                    source,
                })?;
            let opcode = parse_opcode(&mnemonic, &row.opcode)?;
            set.insert(InstructionSpec {
                mnemonic,
                format,
                variant,
                opcode,
                roles: row.args,
                patch: row.patch,
            });
        }
        set.warn_on_collisions();
        Ok(set)
    }

    fn warn_on_collisions(&self) {
        let mut seen: BTreeMap<(Format, u8), &str> = BTreeMap::new();
        for spec in self.iter() {
            let key = (spec.format, spec.opcode_bits());
            if let Some(first) = seen.get(&key) {
                warn!(
                    first = *first,
                    second = %spec.mnemonic,
                    format = ?spec.format,
                    opcode = spec.opcode_bits(),
                    "opcode collision, decoding will pick `{first}`"
                );
            } else {
                seen.insert(key, spec.mnemonic.as_str());
            }
        }
    }

    pub fn get(&self, mnemonic: &str) -> Option<&InstructionSpec> {
        self.specs.get(mnemonic)
    }

    pub fn lookup(&self, mnemonic: &str) -> Result<&InstructionSpec, AsmError> {
        self.get(mnemonic)
            .ok_or_else(|| AsmError::UnknownMnemonic(mnemonic.to_string()))
    }

    /// First entry (in mnemonic order) whose masked opcode matches.
    pub fn by_opcode(&self, format: Format, opcode: u8) -> Option<&InstructionSpec> {
        self.iter()
            .find(|s| s.format == format && s.opcode_bits() == opcode)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
