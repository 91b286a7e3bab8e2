//! nandasm assembler: source text → machine bytes for a configurable
//! instruction set.
//!
//! The pipeline is lexer → parser → two-pass label resolution → encoder.
//! Every stage collects diagnostics instead of stopping at the first one.
//!
//! # Usage
//!
//! ```
//! use nandasm_assembler::assemble;
//! use nandasm_common::{AssemblerConfig, InstructionSet, OpcodeSpec};
//!
//! let isa = InstructionSet::new(AssemblerConfig::new(vec![
//!     OpcodeSpec::with_arity("lda", 0x01, 1),
//!     OpcodeSpec::with_arity("jmp", 0x02, 1),
//!     OpcodeSpec::with_arity("hlt", 0xFF, 0),
//! ]))
//! .unwrap();
//!
//! let bytes = assemble("start:\n\tlda #0x05\n\tjmp start\n\thlt\n", &isa).unwrap();
//! assert_eq!(bytes, vec![0x01, 0x05, 0x02, 0x00, 0xFF]);
//! ```
//!
//! # Formatting
//!
//! [`format`] rewrites source in canonical layout without needing an
//! instruction set. Formatting never changes what a program assembles to.

pub mod diagnostic;
pub mod encoder;
pub mod error;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod span;

pub use diagnostic::Diagnostic;
pub use error::{AssembleError, InternalError};
pub use formatter::format;
pub use resolver::{Symbol, SymbolTable};
pub use span::{Position, Span};

use nandasm_common::InstructionSet;

use lexer::tokenize;
use parser::{parse, Grammar, Statement};

/// A successful assembly with the intermediate results kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub bytes: Vec<u8>,
    pub symbols: SymbolTable,
    /// Statements with every label operand replaced by its address.
    pub statements: Vec<Statement>,
}

/// Assemble `source` into bytes.
pub fn assemble(source: &str, isa: &InstructionSet) -> Result<Vec<u8>, AssembleError> {
    assemble_program(source, isa).map(|assembly| assembly.bytes)
}

/// Assemble `source`, keeping the symbol table and resolved statements.
///
/// Label checks still run on the lines that parsed when others did not,
/// so one call reports syntax and label problems together. Encoding only
/// happens once everything before it is clean.
pub fn assemble_program(source: &str, isa: &InstructionSet) -> Result<Assembly, AssembleError> {
    tracing::debug!(bytes = source.len(), opcodes = isa.len(), "assembling");

    let parsed = parse(tokenize(source), Grammar::Checked(isa));
    let mut diagnostics = parsed.diagnostics;

    let layout = match resolver::assign_addresses(&parsed.statements) {
        Ok(layout) => layout,
        Err(duplicates) => {
            diagnostics.extend(duplicates);
            return Err(AssembleError::Diagnostics(diagnostics));
        }
    };

    let statements = match resolver::resolve_references(parsed.statements, &layout.symbols) {
        Ok(statements) => statements,
        Err(unknown) => {
            diagnostics.extend(unknown);
            return Err(AssembleError::Diagnostics(diagnostics));
        }
    };

    if !diagnostics.is_empty() {
        return Err(AssembleError::Diagnostics(diagnostics));
    }

    let bytes = encoder::encode(&statements, isa, layout.size)?;
    Ok(Assembly {
        bytes,
        symbols: layout.symbols,
        statements,
    })
}
