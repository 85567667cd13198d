use serde::{Deserialize, Serialize};

use crate::operand::{RegisterSet, DEFAULT_REGISTERS};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("malformed assembler config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} register names given, a 4-bit field holds at most 16")]
    TooManyRegisters(usize),
    #[error("register `{0}` is listed twice")]
    DuplicateRegister(String),
}

/// Source-level conventions of the assembler. Every field has a default, so
/// a config file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsmConfig {
    /// Truncates a line at its first occurrence.
    pub comment: char,
    /// Prefix marking a register operand.
    pub sigil: char,
    pub registers: Vec<String>,
    /// Address of the first emitted byte.
    pub origin: u32,
}

impl Default for AsmConfig {
    fn default() -> Self {
        Self {
            comment: '#',
            sigil: '$',
            registers: DEFAULT_REGISTERS.iter().map(|r| r.to_string()).collect(),
            origin: 0,
        }
    }
}

impl AsmConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn register_set(&self) -> Result<RegisterSet, ConfigError> {
        RegisterSet::new(self.sigil, self.registers.iter().cloned())
    }
}
