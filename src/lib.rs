pub mod assembler;
pub mod config;
pub mod decoder;
pub mod disasm;
pub mod encoder;
pub mod error;
pub mod format;
pub mod instructions;
pub mod operand;
pub mod patch;
pub mod symbols;

pub use assembler::{assemble, Assembler, Program, State};
pub use config::{AsmConfig, ConfigError};
pub use decoder::{Decoded, DecodeError, Decoder, TableDecoder};
pub use encoder::{encode, EncodedInstruction, Fixup};
pub use error::{AsmError, AssembleError, Range};
pub use instructions::{Format, ImmVariant, InstructionSet, InstructionSpec, PatchKind, Role, TableError};
pub use operand::{OperandResolver, RegisterSet, ResolvedOperand};
pub use patch::patch;
pub use symbols::SymbolTable;
