//! Label resolution in two passes.
//!
//! 1. **Address assignment** walks statements in order with a running byte
//!    offset. An instruction occupies one opcode byte plus one byte per
//!    operand; a label takes the offset at its position and occupies
//!    nothing.
//! 2. **Reference resolution** replaces every label operand with the
//!    address from pass 1, keeping the operand's kind.
//!
//! Pass 2 only reads the finished table, so forward and backward
//! references see the same address.

use std::collections::HashMap;

use nandasm_common::OperandKind;
use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::lexer::NumberLiteral;
use crate::parser::{Instruction, LabelRef, Literal, Operand, Statement};
use crate::span::Span;

/// A defined label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Symbol {
    /// Byte offset from the start of the program.
    pub address: usize,
    /// Where the label is defined.
    pub span: Span,
}

/// Label name → address. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a label. Returns the existing symbol if the name is taken,
    /// leaving the table unchanged.
    pub fn define(&mut self, name: &str, symbol: Symbol) -> Result<(), Symbol> {
        match self.symbols.get(name) {
            Some(existing) => Err(*existing),
            None => {
                self.symbols.insert(name.to_string(), symbol);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn address(&self, name: &str) -> Option<usize> {
        self.get(name).map(|symbol| symbol.address)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols ordered by address, then name.
    pub fn sorted(&self) -> Vec<(&str, Symbol)> {
        let mut entries: Vec<(&str, Symbol)> = self
            .symbols
            .iter()
            .map(|(name, symbol)| (name.as_str(), *symbol))
            .collect();
        entries.sort_by(|a, b| a.1.address.cmp(&b.1.address).then(a.0.cmp(b.0)));
        entries
    }
}

/// Result of pass 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub symbols: SymbolTable,
    /// Total program size in bytes.
    pub size: usize,
}

/// Bytes an instruction occupies.
pub fn instruction_len(instruction: &Instruction) -> usize {
    1 + instruction.operands.len()
}

/// Pass 1: give every label its address.
///
/// Every duplicate definition is reported. Any duplicate fails the pass,
/// since references to that name would be ambiguous.
pub fn assign_addresses(statements: &[Statement]) -> Result<Layout, Vec<Diagnostic>> {
    let mut symbols = SymbolTable::new();
    let mut diagnostics = Vec::new();
    let mut offset = 0;

    for statement in statements {
        match statement {
            Statement::Label(label) => {
                let symbol = Symbol {
                    address: offset,
                    span: label.span,
                };
                match symbols.define(&label.name, symbol) {
                    Ok(()) => tracing::trace!(label = %label.name, address = offset, "assigned label"),
                    Err(first) => diagnostics.push(Diagnostic::DuplicateLabel {
                        name: label.name.clone(),
                        first_span: first.span,
                        second_span: label.span,
                    }),
                }
            }
            Statement::Instruction(instruction) => offset += instruction_len(instruction),
        }
    }

    tracing::debug!(labels = symbols.len(), size = offset, "assigned addresses");

    if diagnostics.is_empty() {
        Ok(Layout {
            symbols,
            size: offset,
        })
    } else {
        Err(diagnostics)
    }
}

/// Pass 2: replace label operands with their addresses.
///
/// Every unknown label is reported.
pub fn resolve_references(
    statements: Vec<Statement>,
    symbols: &SymbolTable,
) -> Result<Vec<Statement>, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    let resolved = statements
        .into_iter()
        .map(|statement| match statement {
            Statement::Instruction(mut instruction) => {
                for operand in &mut instruction.operands {
                    if let Operand::Label(label) = operand {
                        match symbols.get(&label.name) {
                            Some(symbol) => *operand = address_operand(label, symbol.address),
                            None => diagnostics.push(Diagnostic::UnknownLabel {
                                name: label.name.clone(),
                                span: label.span,
                            }),
                        }
                    }
                }
                Statement::Instruction(instruction)
            }
            label => label,
        })
        .collect();

    tracing::debug!(unknown = diagnostics.len(), "resolved references");

    if diagnostics.is_empty() {
        Ok(resolved)
    } else {
        Err(diagnostics)
    }
}

fn address_operand(label: &LabelRef, address: usize) -> Operand {
    let literal = Literal {
        number: NumberLiteral::decimal(i64::try_from(address).unwrap_or(i64::MAX)),
        prefix: label.prefix,
        span: label.span,
    };
    match label.kind {
        OperandKind::Immediate => Operand::Immediate(literal),
        OperandKind::Indirect => Operand::Indirect(literal),
    }
}
