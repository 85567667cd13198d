use std::fmt;

use crate::config::ConfigError;
use crate::error::AsmError;
use crate::instructions::Role;

pub const DEFAULT_REGISTERS: [&str; 16] = [
    "zero", "at", "sp", "fp", "pc", "ra", "v0", "v1", "g0", "g1", "g2", "g3", "g4", "g5", "g6",
    "g7",
];

/// Named registers; a register's index is its position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSet {
    sigil: char,
    names: Vec<String>,
}

impl Default for RegisterSet {
    fn default() -> Self {
        Self {
            sigil: '$',
            names: DEFAULT_REGISTERS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl RegisterSet {
    pub fn new<I>(sigil: char, names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let names: Vec<String> = names.into_iter().collect();
        if names.len() > 16 {
            return Err(ConfigError::TooManyRegisters(names.len()));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ConfigError::DuplicateRegister(name.clone()));
            }
        }
        Ok(Self { sigil, names })
    }

    pub fn sigil(&self) -> char {
        self.sigil
    }

    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.names.iter().position(|n| n == name).map(|i| i as u8)
    }

    pub fn name_of(&self, index: u8) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    /// `index` as it would be written in source, e.g. `$g0`.
    pub fn display(&self, index: u8) -> String {
        match self.name_of(index) {
            Some(name) => format!("{}{}", self.sigil, name),
            None => format!("{}{}", self.sigil, index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedOperand {
    Register(u8),
    Immediate(i64),
    Symbol(String),
}

impl fmt::Display for ResolvedOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedOperand::Register(r) => write!(f, "register {r}"),
            ResolvedOperand::Immediate(v) => write!(f, "{v}"),
            ResolvedOperand::Symbol(s) => f.write_str(s),
        }
    }
}

/// Address given on a command line, decimal or `0x` hex.
pub fn parse_address(s: &str) -> Result<u32, std::num::ParseIntError> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse::<u32>()
    }
}

/// Signed integer literal: decimal, `0x` hex or `0b` binary, optional sign.
pub fn parse_int(s: &str) -> Option<i64> {
    let t = s.trim();
    let (negative, body) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let (radix, digits) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        (2, bin)
    } else {
        (10, body)
    };
    // from_str_radix would accept a second sign
    if !digits.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        if magnitude > i64::MIN.unsigned_abs() {
            return None;
        }
        Some((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).ok()
    }
}

/// Turns operand text into typed values against a fixed register set.
#[derive(Debug, Clone, Default)]
pub struct OperandResolver {
    registers: RegisterSet,
}

impl OperandResolver {
    pub fn new(registers: RegisterSet) -> Self {
        Self { registers }
    }

    pub fn registers(&self) -> &RegisterSet {
        &self.registers
    }

    pub fn resolve(&self, text: &str, role: Role) -> Result<ResolvedOperand, AsmError> {
        let token = text.trim();
        let mismatch = || AsmError::OperandRoleMismatch {
            operand: token.to_string(),
            role,
        };
        if token.is_empty() {
            return Err(mismatch());
        }

        let operand = if let Some(name) = token.strip_prefix(self.registers.sigil) {
            let index = self
                .registers
                .index_of(name)
                .ok_or_else(|| AsmError::UnknownRegister(token.to_string()))?;
            ResolvedOperand::Register(index)
        } else if let Some(value) = parse_int(token) {
            ResolvedOperand::Immediate(value)
        } else {
            ResolvedOperand::Symbol(token.to_string())
        };

        // Labels are let through for every role; the encoder decides.
        match (&operand, role) {
            (ResolvedOperand::Register(_), Role::Rd | Role::Rs | Role::Rt) => Ok(operand),
            (ResolvedOperand::Immediate(_), Role::Shamt | Role::Imm) => Ok(operand),
            (ResolvedOperand::Symbol(_), _) => Ok(operand),
            _ => Err(mismatch()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("-8"), Some(-8));
        assert_eq!(parse_int("+0x1F"), Some(31));
        assert_eq!(parse_int("-0b101"), Some(-5));
        assert_eq!(parse_int("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775808"), None);
        assert_eq!(parse_int("0x+5"), None);
        assert_eq!(parse_int("--5"), None);
        assert_eq!(parse_int("loop"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn addresses_hex_and_dec() {
        assert_eq!(parse_address("4096"), Ok(4096));
        assert_eq!(parse_address(" 0x1000 "), Ok(0x1000));
        assert_eq!(parse_address("0XFFFFFFFF"), Ok(u32::MAX));
        assert!(parse_address("0x1_0000_0000").is_err());
        assert!(parse_address("-1").is_err());
        assert!(parse_address("loop").is_err());
    }

    #[test]
    fn registers_by_name() {
        let r = OperandResolver::default();
        assert_eq!(r.resolve("$zero", Role::Rd), Ok(ResolvedOperand::Register(0)));
        assert_eq!(r.resolve(" $g0 ", Role::Rs), Ok(ResolvedOperand::Register(8)));
        assert_eq!(r.resolve("$g7", Role::Rt), Ok(ResolvedOperand::Register(15)));
        assert_eq!(
            r.resolve("$g8", Role::Rd),
            Err(AsmError::UnknownRegister("$g8".into()))
        );
    }

    #[test]
    fn role_mismatches() {
        let r = OperandResolver::default();
        assert_eq!(
            r.resolve("12", Role::Rd),
            Err(AsmError::OperandRoleMismatch { operand: "12".into(), role: Role::Rd })
        );
        assert_eq!(
            r.resolve("$sp", Role::Imm),
            Err(AsmError::OperandRoleMismatch { operand: "$sp".into(), role: Role::Imm })
        );
        assert!(matches!(
            r.resolve("  ", Role::Imm),
            Err(AsmError::OperandRoleMismatch { .. })
        ));
    }

    #[test]
    fn anything_else_is_a_symbol() {
        let r = OperandResolver::default();
        assert_eq!(r.resolve("loop", Role::Imm), Ok(ResolvedOperand::Symbol("loop".into())));
        assert_eq!(r.resolve("g0", Role::Rd), Ok(ResolvedOperand::Symbol("g0".into())));
    }

    #[test]
    fn custom_register_set() {
        let regs = RegisterSet::new('%', ["acc".to_string(), "x".to_string()]).unwrap();
        let r = OperandResolver::new(regs);
        assert_eq!(r.resolve("%x", Role::Rd), Ok(ResolvedOperand::Register(1)));
        assert_eq!(r.registers().display(0), "%acc");
        assert_eq!(r.registers().display(9), "%9");
        assert_eq!(r.resolve("$x", Role::Rd), Ok(ResolvedOperand::Symbol("$x".into())));
    }
}
