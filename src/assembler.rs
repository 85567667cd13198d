//! Two-pass driver: encode and collect labels, then patch.

use std::fmt::Write as _;

use tracing::{debug, info};

use crate::config::{AsmConfig, ConfigError};
use crate::encoder::{check_arity, encode, EncodedInstruction};
use crate::error::{AsmError, AssembleError};
use crate::instructions::InstructionSet;
use crate::operand::{OperandResolver, ResolvedOperand};
use crate::patch::patch;
use crate::symbols::SymbolTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Parsing,
    Patching,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'s> {
    /// Passed through untouched, e.g. `.text`.
    Directive(&'s str),
    Instruction {
        mnemonic: &'s str,
        operands: Vec<&'s str>,
    },
}

/// One source line after comment stripping. `loop: add ...` carries both
/// a label and a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLine<'s> {
    pub label: Option<&'s str>,
    pub statement: Option<Statement<'s>>,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

pub fn parse_line(raw: &str, comment: char) -> SourceLine<'_> {
    let code = match raw.find(comment) {
        Some(p) => &raw[..p],
        None => raw,
    };
    let mut rest = code.trim();
    let mut line = SourceLine::default();

    if let Some((head, tail)) = rest.split_once(':') {
        if is_identifier(head.trim()) {
            line.label = Some(head.trim());
            rest = tail.trim();
        }
    }
    if rest.is_empty() {
        return line;
    }

    line.statement = Some(if rest.starts_with('.') {
        Statement::Directive(rest)
    } else {
        let (mnemonic, body) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        let body = body.trim();
        let operands = if body.is_empty() {
            Vec::new()
        } else {
            body.split(',').map(str::trim).collect()
        };
        Statement::Instruction { mnemonic, operands }
    });
    line
}

/// A fully assembled program: every instruction final, every label bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<EncodedInstruction>,
    pub symbols: SymbolTable,
    /// `(line, text)` of each directive seen, in order.
    pub directives: Vec<(usize, String)>,
}

impl Program {
    /// The object byte stream: each instruction big-endian, back to back.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        for instr in &self.instructions {
            out.extend_from_slice(&instr.to_bytes());
        }
        out
    }

    pub fn size(&self) -> usize {
        self.instructions.iter().map(|i| i.len as usize).sum()
    }

    /// `address  bytes  source` per instruction, for humans.
    pub fn listing(&self, source: &str) -> String {
        let lines: Vec<&str> = source.lines().collect();
        let mut out = String::new();
        for instr in &self.instructions {
            let hex: Vec<String> = instr.to_bytes().iter().map(|b| format!("{b:02x}")).collect();
            let text = instr
                .line
                .checked_sub(1)
                .and_then(|i| lines.get(i))
                .map_or("", |l| l.trim());
            let _ = writeln!(out, "{:08x}  {:<20}  {}", instr.address, hex.join(" "), text);
        }
        out
    }
}

pub struct Assembler<'a> {
    isa: &'a InstructionSet,
    resolver: OperandResolver,
    comment: char,
    origin: u32,
    state: State,
    /// Wider than an address so running off the end is detectable.
    pc: u64,
    symbols: SymbolTable,
    code: Vec<EncodedInstruction>,
    directives: Vec<(usize, String)>,
}

impl<'a> Assembler<'a> {
    pub fn new(isa: &'a InstructionSet, resolver: OperandResolver) -> Self {
        Self {
            isa,
            resolver,
            comment: '#',
            origin: 0,
            state: State::Parsing,
            pc: 0,
            symbols: SymbolTable::new(),
            code: Vec::new(),
            directives: Vec::new(),
        }
    }

    pub fn from_config(isa: &'a InstructionSet, config: &AsmConfig) -> Result<Self, ConfigError> {
        let resolver = OperandResolver::new(config.register_set()?);
        Ok(Self::new(isa, resolver)
            .with_comment(config.comment)
            .with_origin(config.origin))
    }

    pub fn with_comment(mut self, comment: char) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_origin(mut self, origin: u32) -> Self {
        self.origin = origin;
        self
    }

    /// Where the last (or current) run stands.
    pub fn state(&self) -> State {
        self.state
    }

    /// Runs both passes over `source`. Nothing is returned unless every
    /// instruction encoded and every label reference resolved.
    pub fn assemble(&mut self, source: &str) -> Result<Program, AssembleError> {
        self.state = State::Parsing;
        self.pc = u64::from(self.origin);
        self.symbols = SymbolTable::new();
        self.code.clear();
        self.directives.clear();

        let result = self.first_pass(source).and_then(|()| {
            self.state = State::Patching;
            self.second_pass()
        });
        if let Err(err) = result {
            debug!(state = ?self.state, "assembly failed: {err}");
            self.state = State::Failed;
            return Err(err);
        }

        self.state = State::Done;
        let program = Program {
            instructions: std::mem::take(&mut self.code),
            symbols: std::mem::take(&mut self.symbols),
            directives: std::mem::take(&mut self.directives),
        };
        info!(
            instructions = program.instructions.len(),
            labels = program.symbols.len(),
            bytes = program.size(),
            "assembled"
        );
        Ok(program)
    }

    fn first_pass(&mut self, source: &str) -> Result<(), AssembleError> {
        for (idx, raw) in source.lines().enumerate() {
            let line = idx + 1;
            let parsed = parse_line(raw, self.comment);
            let at = |source| AssembleError::Parse { line, source };

            if let Some(label) = parsed.label {
                let address = self.address().map_err(at)?;
                self.symbols.define(label, address).map_err(at)?;
                debug!(line, label, address, "label");
            }
            match parsed.statement {
                None => {}
                Some(Statement::Directive(text)) => {
                    debug!(line, directive = text, "directive ignored");
                    self.directives.push((line, text.to_string()));
                }
                Some(Statement::Instruction { mnemonic, operands }) => {
                    let address = self.address().map_err(at)?;
                    let mut encoded = self
                        .encode_line(mnemonic, &operands, address)
                        .map_err(at)?;
                    encoded.line = line;
                    self.pc = encoded.end();
                    self.code.push(encoded);
                }
            }
        }
        Ok(())
    }

    fn address(&self) -> Result<u32, AsmError> {
        u32::try_from(self.pc).map_err(|_| AsmError::AddressOverflow(self.pc))
    }

    fn encode_line(
        &self,
        mnemonic: &str,
        operands: &[&str],
        address: u32,
    ) -> Result<EncodedInstruction, AsmError> {
        let spec = self.isa.lookup(mnemonic)?;
        check_arity(spec, operands.len())?;
        let resolved = operands
            .iter()
            .zip(&spec.roles)
            .map(|(text, role)| self.resolver.resolve(text, *role))
            .collect::<Result<Vec<ResolvedOperand>, _>>()?;
        encode(spec, &resolved, address)
    }

    fn second_pass(&mut self) -> Result<(), AssembleError> {
        for (index, instr) in self.code.iter_mut().enumerate() {
            patch(instr, &self.symbols).map_err(|source| AssembleError::Patch {
                index,
                line: instr.line,
                source,
            })?;
        }
        Ok(())
    }
}

/// Assembles `source` with the default register set and conventions.
pub fn assemble(source: &str, isa: &InstructionSet) -> Result<Program, AssembleError> {
    Assembler::new(isa, OperandResolver::default()).assemble(source)
}
