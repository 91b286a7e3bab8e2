//! Source-located diagnostics shared by every stage.
//!
//! A [`Diagnostic`] is a problem with the user's source text. Each one
//! carries at least one labelled [`Span`] and implements
//! [`miette::Diagnostic`], so attaching the source with
//! [`Diagnostic::report`] gives a snippet with the spans highlighted.

use miette::{NamedSource, Report};
use nandasm_common::OperandKind;
use serde::Serialize;
use thiserror::Error;

use crate::lexer::{LexError, TokenClass};
use crate::span::Span;

/// A problem found in the source text.
#[derive(Error, miette::Diagnostic, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Malformed literal or unrecognized character.
    #[error("{error}")]
    #[diagnostic(
        code(nandasm::lex_error),
        help("Numbers are decimal, 0x, 0b or 0o; a '-' must touch its digits.")
    )]
    Lex {
        error: LexError,
        #[label("here")]
        span: Span,
    },

    /// A mnemonic that the instruction set does not declare.
    #[error("opcode '{mnemonic}' does not exist")]
    #[diagnostic(
        code(nandasm::opcode_does_not_exist),
        help("Mnemonics are case-sensitive; check the instruction-set config.")
    )]
    OpcodeDoesNotExist {
        mnemonic: String,
        #[label("this opcode")]
        span: Span,
    },

    /// A token that does not fit the grammar at this point.
    #[error("expected {}, found {found}", join_expected(.expected))]
    #[diagnostic(code(nandasm::unexpected))]
    Unexpected {
        expected: Vec<TokenClass>,
        found: TokenClass,
        #[label("unexpected token")]
        span: Span,
    },

    /// A label defined a second time.
    #[error("label '{name}' is already defined")]
    #[diagnostic(
        code(nandasm::duplicate_label),
        help("Rename one of the definitions.")
    )]
    DuplicateLabel {
        name: String,
        #[label("first defined here")]
        first_span: Span,
        #[label("defined again here")]
        second_span: Span,
    },

    /// A reference to a label that is never defined.
    #[error("label '{name}' does not exist")]
    #[diagnostic(
        code(nandasm::unknown_label),
        help("Define this label somewhere in the program.")
    )]
    UnknownLabel {
        name: String,
        #[label("referenced here")]
        span: Span,
    },

    /// An operand value that does not fit in its byte.
    #[error("{value} does not fit in an {kind} operand byte")]
    #[diagnostic(
        code(nandasm::value_out_of_range),
        help("Immediate operands take -128 to 255, indirect operands 0 to 255.")
    )]
    ValueOutOfRange {
        value: i64,
        #[serde(rename = "operand_kind")]
        kind: OperandKind,
        #[label("this operand")]
        span: Span,
    },
}

impl Diagnostic {
    /// Where the problem is. For duplicate labels, the second definition.
    pub fn span(&self) -> Span {
        match self {
            Diagnostic::Lex { span, .. }
            | Diagnostic::OpcodeDoesNotExist { span, .. }
            | Diagnostic::Unexpected { span, .. }
            | Diagnostic::UnknownLabel { span, .. }
            | Diagnostic::ValueOutOfRange { span, .. } => *span,
            Diagnostic::DuplicateLabel { second_span, .. } => *second_span,
        }
    }

    /// Every span the diagnostic refers to, primary span last.
    pub fn spans(&self) -> Vec<Span> {
        match self {
            Diagnostic::DuplicateLabel {
                first_span,
                second_span,
                ..
            } => vec![*first_span, *second_span],
            other => vec![other.span()],
        }
    }

    /// A report carrying the source, ready to print with `{:?}`.
    pub fn report(self, name: impl AsRef<str>, source: impl Into<String>) -> Report {
        Report::new(self).with_source_code(NamedSource::new(name, source.into()))
    }
}

/// "a", "a or b", "a, b, or c".
fn join_expected(list: &[TokenClass]) -> String {
    match list {
        [] => "nothing".to_string(),
        [only] => only.to_string(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => {
            let init: Vec<String> = init.iter().map(ToString::to_string).collect();
            format!("{}, or {last}", init.join(", "))
        }
    }
}
