//! Configuration errors for nandasm instruction sets.

use thiserror::Error;

/// Errors raised while building an [`InstructionSet`](crate::InstructionSet).
///
/// These are reported before any source text is looked at: an assembler
/// cannot run with an invalid instruction set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A mnemonic is empty or only whitespace.
    #[error("opcode #{index} has a blank mnemonic")]
    BlankMnemonic { index: usize },

    /// A mnemonic that the lexer could never read as a single identifier.
    #[error("mnemonic '{mnemonic}' is not a valid identifier")]
    MalformedMnemonic { mnemonic: String },

    /// The same mnemonic is declared twice (mnemonics are case-sensitive).
    #[error("mnemonic '{mnemonic}' is declared twice (opcodes #{first} and #{second})")]
    DuplicateMnemonic {
        mnemonic: String,
        first: usize,
        second: usize,
    },
}
