use crate::instructions::Role;

/// Everything that can go wrong while turning one program into bytes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("`{mnemonic}` takes {expected} operand(s), found {found}")]
    ArityMismatch {
        mnemonic: String,
        expected: usize,
        found: usize,
    },
    #[error("operand `{operand}` cannot fill the {role} role")]
    OperandRoleMismatch { operand: String, role: Role },
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
    #[error("unsupported instruction format: {0}")]
    UnsupportedFormat(String),
    #[error("label `{label}` cannot be used as a {role} operand")]
    InvalidPatchTarget { label: String, role: Role },
    #[error("label `{0}` is already defined")]
    DuplicateLabel(String),
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("address {0:#x} is past the end of the 32-bit address space")]
    AddressOverflow(u64),
    #[error("value {value} does not fit in a {width}-bit {range} field")]
    ImmediateOutOfRange { value: i64, width: u32, range: Range },
}

/// How a patched field interprets its bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    Unsigned,
    Signed,
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Range::Unsigned => f.write_str("unsigned"),
            Range::Signed => f.write_str("signed"),
        }
    }
}

/// An [`AsmError`] tagged with where it happened.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: AsmError,
    },
    #[error("instruction #{index} (line {line}): {source}")]
    Patch {
        index: usize,
        line: usize,
        #[source]
        source: AsmError,
    },
}

impl AssembleError {
    pub fn kind(&self) -> &AsmError {
        match self {
            AssembleError::Parse { source, .. } | AssembleError::Patch { source, .. } => source,
        }
    }
}
