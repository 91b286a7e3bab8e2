//! Validated, queryable view of an [`AssemblerConfig`].

use std::collections::HashMap;

use crate::config::{AssemblerConfig, OperandKind, OperandShape};
use crate::error::ConfigError;

/// Canonical description of one operand position.
///
/// Rule for resolving prefixes against slots:
/// - `Untyped`: `#` means immediate, `+` means indirect, no prefix means
///   immediate.
/// - `Immediate` / `Indirect`: no prefix takes the declared kind, the
///   matching prefix is accepted, the other prefix is a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandSlot {
    /// Declared through the legacy numeric-arity form.
    Untyped,
    /// Declared as an immediate operand.
    Immediate,
    /// Declared as an indirect operand.
    Indirect,
}

impl OperandSlot {
    /// The declared kind, if the slot is typed.
    pub fn declared(self) -> Option<OperandKind> {
        match self {
            OperandSlot::Untyped => None,
            OperandSlot::Immediate => Some(OperandKind::Immediate),
            OperandSlot::Indirect => Some(OperandKind::Indirect),
        }
    }

    /// Whether an operand written as `kind` (explicitly prefixed) fits here.
    pub fn accepts(self, kind: OperandKind) -> bool {
        self.declared().map_or(true, |declared| declared == kind)
    }

    /// Kind of an operand written without a prefix.
    pub fn default_kind(self) -> OperandKind {
        self.declared().unwrap_or(OperandKind::Immediate)
    }
}

impl From<OperandKind> for OperandSlot {
    fn from(kind: OperandKind) -> Self {
        match kind {
            OperandKind::Immediate => OperandSlot::Immediate,
            OperandKind::Indirect => OperandSlot::Indirect,
        }
    }
}

impl From<&OperandShape> for Vec<OperandSlot> {
    fn from(shape: &OperandShape) -> Self {
        match shape {
            OperandShape::Arity(n) => vec![OperandSlot::Untyped; *n],
            OperandShape::Kinds(kinds) => kinds.iter().copied().map(OperandSlot::from).collect(),
        }
    }
}

/// A validated opcode in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    /// Case-sensitive instruction name.
    pub mnemonic: String,
    /// The opcode byte.
    pub binary: u8,
    /// One slot per operand, in order.
    pub slots: Vec<OperandSlot>,
}

impl Opcode {
    /// Number of operands.
    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    /// Bytes this instruction occupies: the opcode plus one per operand.
    pub fn byte_len(&self) -> usize {
        1 + self.slots.len()
    }
}

/// The instruction-set table.
///
/// Immutable once built, so one table can be shared by reference across
/// any number of concurrent assemble calls.
#[derive(Debug, Clone)]
pub struct InstructionSet {
    config: AssemblerConfig,
    opcodes: Vec<Opcode>,
    index: HashMap<String, usize>,
}

impl InstructionSet {
    /// Validate a configuration and build the lookup table.
    ///
    /// Checks run in declaration order and the first failure is returned.
    pub fn new(config: AssemblerConfig) -> Result<Self, ConfigError> {
        let mut opcodes = Vec::with_capacity(config.opcodes.len());
        let mut index = HashMap::with_capacity(config.opcodes.len());

        for (i, spec) in config.opcodes.iter().enumerate() {
            if spec.mnemonic.trim().is_empty() {
                return Err(ConfigError::BlankMnemonic { index: i });
            }
            if !is_identifier(&spec.mnemonic) {
                return Err(ConfigError::MalformedMnemonic {
                    mnemonic: spec.mnemonic.clone(),
                });
            }
            if let Some(&first) = index.get(&spec.mnemonic) {
                return Err(ConfigError::DuplicateMnemonic {
                    mnemonic: spec.mnemonic.clone(),
                    first,
                    second: i,
                });
            }

            index.insert(spec.mnemonic.clone(), i);
            opcodes.push(Opcode {
                mnemonic: spec.mnemonic.clone(),
                binary: spec.binary,
                slots: Vec::from(&spec.operands),
            });
        }

        Ok(Self {
            config,
            opcodes,
            index,
        })
    }

    /// Look up an opcode by its exact mnemonic.
    pub fn lookup(&self, mnemonic: &str) -> Option<&Opcode> {
        self.index.get(mnemonic).map(|&i| &self.opcodes[i])
    }

    /// Opcodes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Opcode> {
        self.opcodes.iter()
    }

    /// Number of opcodes.
    pub fn len(&self) -> usize {
        self.opcodes.len()
    }

    /// Returns true if the table declares no opcodes.
    pub fn is_empty(&self) -> bool {
        self.opcodes.is_empty()
    }

    /// The configuration this table was built from.
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }
}

impl TryFrom<AssemblerConfig> for InstructionSet {
    type Error = ConfigError;

    fn try_from(config: AssemblerConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

/// First character of an identifier.
pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

/// Any later character of an identifier.
pub fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Whether `text` lexes as exactly one identifier token.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_continue)
}
