//! Caller-supplied instruction-set configuration.
//!
//! An [`AssemblerConfig`] is plain data, usually deserialized from JSON:
//!
//! ```json
//! {
//!   "opcodes": [
//!     { "mnemonic": "nop", "binary": 0, "operands": 0 },
//!     { "mnemonic": "lda", "binary": 1, "operands": ["immediate"] },
//!     { "mnemonic": "sta", "binary": 2, "operands": ["indirect"] }
//!   ]
//! }
//! ```
//!
//! It is validated by turning it into an [`InstructionSet`](crate::InstructionSet).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The instruction set the assembler translates against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Opcodes in declaration order.
    pub opcodes: Vec<OpcodeSpec>,
}

impl AssemblerConfig {
    /// Create a configuration from a list of opcodes.
    pub fn new(opcodes: Vec<OpcodeSpec>) -> Self {
        Self { opcodes }
    }
}

/// One mnemonic and its encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeSpec {
    /// Case-sensitive instruction name.
    pub mnemonic: String,
    /// The opcode byte emitted for this instruction.
    pub binary: u8,
    /// Number and/or kind of operands.
    #[serde(alias = "args", alias = "num_args", alias = "numArgs")]
    pub operands: OperandShape,
}

impl OpcodeSpec {
    /// Opcode in the legacy numeric-arity form.
    pub fn with_arity(mnemonic: impl Into<String>, binary: u8, arity: usize) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            binary,
            operands: OperandShape::Arity(arity),
        }
    }

    /// Opcode in the typed operand-kind form.
    pub fn with_kinds(mnemonic: impl Into<String>, binary: u8, kinds: Vec<OperandKind>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            binary,
            operands: OperandShape::Kinds(kinds),
        }
    }
}

/// Declared operands of an opcode.
///
/// Both forms are accepted on input; the instruction-set table converts
/// them to one canonical slot list (see [`OperandSlot`](crate::OperandSlot)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandShape {
    /// Legacy form: only a count. Operand kinds follow the written prefix.
    Arity(usize),
    /// Typed form: one declared kind per operand.
    Kinds(Vec<OperandKind>),
}

impl OperandShape {
    /// Number of operands (and operand bytes) the opcode takes.
    pub fn arity(&self) -> usize {
        match self {
            OperandShape::Arity(n) => *n,
            OperandShape::Kinds(kinds) => kinds.len(),
        }
    }
}

/// How the target architecture interprets an operand byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
    /// The byte is the value itself.
    #[serde(alias = "Immediate")]
    Immediate,
    /// The byte is a memory address.
    #[serde(alias = "Indirect")]
    Indirect,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::Immediate => f.write_str("immediate"),
            OperandKind::Indirect => f.write_str("indirect"),
        }
    }
}
