//! Parser for nandasm tokens → statements.
//!
//! One statement per line: `name:` defines a label, `mnemonic operand*`
//! is an instruction. With a checked grammar the instruction set decides
//! how many operands follow a mnemonic and of which kind; with the
//! structural grammar (used by the formatter) every operand up to the end
//! of the line is read.
//!
//! Errors never stop the parse. The offending line is skipped and parsing
//! resumes on the next one, so a single pass reports every bad line.

use std::mem;

use nandasm_common::{InstructionSet, OperandKind, OperandSlot};
use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::lexer::{Lexer, NumberLiteral, OperandPrefix, Token, TokenClass, TokenKind};
use crate::span::Span;

/// A numeric operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub number: NumberLiteral,
    /// The prefix as written, kept so formatting never changes meaning.
    pub prefix: Option<OperandPrefix>,
    pub span: Span,
}

impl Literal {
    pub fn value(&self) -> i64 {
        self.number.value()
    }
}

/// A label used as an operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelRef {
    pub name: String,
    /// The kind the resolved address will be encoded as.
    #[serde(rename = "operand_kind")]
    pub kind: OperandKind,
    pub prefix: Option<OperandPrefix>,
    pub span: Span,
}

/// One operand of an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    Immediate(Literal),
    Indirect(Literal),
    Label(LabelRef),
}

impl Operand {
    pub fn span(&self) -> Span {
        match self {
            Operand::Immediate(lit) | Operand::Indirect(lit) => lit.span,
            Operand::Label(label) => label.span,
        }
    }

    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Immediate(_) => OperandKind::Immediate,
            Operand::Indirect(_) => OperandKind::Indirect,
            Operand::Label(label) => label.kind,
        }
    }

    pub fn prefix(&self) -> Option<OperandPrefix> {
        match self {
            Operand::Immediate(lit) | Operand::Indirect(lit) => lit.prefix,
            Operand::Label(label) => label.prefix,
        }
    }
}

/// `name:`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelDefinition {
    pub name: String,
    /// Covers the name and the colon.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub mnemonic: String,
    pub mnemonic_span: Span,
    pub operands: Vec<Operand>,
    /// Covers the mnemonic and every operand.
    pub span: Span,
}

/// A parsed line, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    Label(LabelDefinition),
    Instruction(Instruction),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Label(label) => label.span,
            Statement::Instruction(instr) => instr.span,
        }
    }
}

/// A comment. `text` excludes the `;` or `//` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

/// Everything one parse pass produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutput {
    pub statements: Vec<Statement>,
    pub comments: Vec<Comment>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Where operand shapes come from.
#[derive(Debug, Clone, Copy)]
pub enum Grammar<'a> {
    /// Mnemonics must exist; arity and kinds come from the table.
    Checked(&'a InstructionSet),
    /// Any mnemonic; operands run to the end of the line, untyped.
    Structural,
}

/// Parse a token stream.
pub fn parse(tokens: Lexer<'_>, grammar: Grammar<'_>) -> ParseOutput {
    Parser::new(tokens, grammar).parse()
}

struct Parser<'a, 'g> {
    lexer: Lexer<'a>,
    lookahead: Token,
    grammar: Grammar<'g>,
    output: ParseOutput,
}

type Parsed<T> = Result<T, Diagnostic>;

const LINE_END: [TokenClass; 3] = [
    TokenClass::Newline,
    TokenClass::Comment,
    TokenClass::EndOfInput,
];

impl<'a, 'g> Parser<'a, 'g> {
    fn new(mut lexer: Lexer<'a>, grammar: Grammar<'g>) -> Self {
        let lookahead = next_token(&mut lexer);
        Self {
            lexer,
            lookahead,
            grammar,
            output: ParseOutput::default(),
        }
    }

    fn parse(mut self) -> ParseOutput {
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::EndOfInput => break,
                TokenKind::Newline => {}
                TokenKind::Comment(text) => self.output.comments.push(Comment {
                    text,
                    span: token.span,
                }),
                TokenKind::Identifier(name) => {
                    if let Err(diagnostic) = self.statement(name, token.span) {
                        self.output.diagnostics.push(diagnostic);
                        self.skip_line();
                    }
                }
                kind => {
                    let diagnostic = unexpected(&[TokenClass::Identifier], &kind, token.span);
                    self.output.diagnostics.push(diagnostic);
                    self.skip_line();
                }
            }
        }

        tracing::debug!(
            statements = self.output.statements.len(),
            comments = self.output.comments.len(),
            diagnostics = self.output.diagnostics.len(),
            "parsed source"
        );
        self.output
    }

    fn advance(&mut self) -> Token {
        let next = next_token(&mut self.lexer);
        mem::replace(&mut self.lookahead, next)
    }

    /// Skip the rest of a broken line, keeping its comment and any further
    /// lexical errors. The newline itself is left for the main loop.
    fn skip_line(&mut self) {
        while !matches!(
            self.lookahead.kind,
            TokenKind::Newline | TokenKind::EndOfInput
        ) {
            let token = self.advance();
            match token.kind {
                TokenKind::Comment(text) => self.output.comments.push(Comment {
                    text,
                    span: token.span,
                }),
                TokenKind::Error(error) => self.output.diagnostics.push(Diagnostic::Lex {
                    error,
                    span: token.span,
                }),
                _ => {}
            }
        }
    }

    /// Succeeds without consuming anything if the line ends here.
    fn expect_line_end(&mut self) -> Parsed<()> {
        if self.lookahead.kind.ends_line() {
            Ok(())
        } else {
            Err(self.reject(&LINE_END))
        }
    }

    /// Diagnose the lookahead. Error tokens are consumed so that skipping
    /// the rest of the line does not report them a second time.
    fn reject(&mut self, expected: &[TokenClass]) -> Diagnostic {
        if matches!(self.lookahead.kind, TokenKind::Error(_)) {
            let token = self.advance();
            unexpected(expected, &token.kind, token.span)
        } else {
            unexpected(expected, &self.lookahead.kind, self.lookahead.span)
        }
    }

    fn statement(&mut self, name: String, span: Span) -> Parsed<()> {
        if self.lookahead.kind == TokenKind::Colon {
            let colon = self.advance();
            self.output
                .statements
                .push(Statement::Label(LabelDefinition {
                    name,
                    span: span.join(colon.span),
                }));
            return self.expect_line_end();
        }

        let instruction = self.instruction(name, span)?;
        self.expect_line_end()?;
        self.output
            .statements
            .push(Statement::Instruction(instruction));
        Ok(())
    }

    fn instruction(&mut self, mnemonic: String, mnemonic_span: Span) -> Parsed<Instruction> {
        let mut operands = Vec::new();

        match self.grammar {
            Grammar::Checked(isa) => {
                let opcode = isa
                    .lookup(&mnemonic)
                    .ok_or_else(|| Diagnostic::OpcodeDoesNotExist {
                        mnemonic: mnemonic.clone(),
                        span: mnemonic_span,
                    })?;
                for &slot in &opcode.slots {
                    operands.push(self.operand(slot)?);
                }
            }
            Grammar::Structural => {
                while !self.lookahead.kind.ends_line() {
                    operands.push(self.operand(OperandSlot::Untyped)?);
                }
            }
        }

        let span = operands
            .iter()
            .fold(mnemonic_span, |acc, operand| acc.join(operand.span()));
        Ok(Instruction {
            mnemonic,
            mnemonic_span,
            operands,
            span,
        })
    }

    /// `operand := prefix? (number | identifier)`
    fn operand(&mut self, slot: OperandSlot) -> Parsed<Operand> {
        let mut prefix = None;
        let mut span = self.lookahead.span;

        if let TokenKind::Prefix(written) = self.lookahead.kind {
            if !slot.accepts(prefix_kind(written)) {
                return Err(self.reject(&operand_start(slot)));
            }
            self.advance();
            prefix = Some(written);
        }

        if !matches!(
            self.lookahead.kind,
            TokenKind::Number(_) | TokenKind::Identifier(_)
        ) {
            let expected = if prefix.is_some() {
                vec![TokenClass::Number, TokenClass::Identifier]
            } else {
                operand_start(slot)
            };
            return Err(self.reject(&expected));
        }

        let kind = prefix.map_or(slot.default_kind(), prefix_kind);
        let token = self.advance();
        span = span.join(token.span);

        Ok(match token.kind {
            TokenKind::Number(number) => {
                let literal = Literal {
                    number,
                    prefix,
                    span,
                };
                match kind {
                    OperandKind::Immediate => Operand::Immediate(literal),
                    OperandKind::Indirect => Operand::Indirect(literal),
                }
            }
            TokenKind::Identifier(name) => Operand::Label(LabelRef {
                name,
                kind,
                prefix,
                span,
            }),
            _ => unreachable!("only numbers and identifiers are consumed as operand values"),
        })
    }
}

fn next_token(lexer: &mut Lexer<'_>) -> Token {
    let end = lexer.source().len();
    lexer
        .next()
        .unwrap_or_else(|| Token::new(TokenKind::EndOfInput, Span::point(end)))
}

fn prefix_kind(prefix: OperandPrefix) -> OperandKind {
    match prefix {
        OperandPrefix::Immediate => OperandKind::Immediate,
        OperandPrefix::Indirect => OperandKind::Indirect,
    }
}

/// Tokens that may start an operand in `slot`.
fn operand_start(slot: OperandSlot) -> Vec<TokenClass> {
    let mut expected = match slot {
        OperandSlot::Untyped => vec![TokenClass::ImmediatePrefix, TokenClass::IndirectPrefix],
        OperandSlot::Immediate => vec![TokenClass::ImmediatePrefix],
        OperandSlot::Indirect => vec![TokenClass::IndirectPrefix],
    };
    expected.extend([TokenClass::Number, TokenClass::Identifier]);
    expected
}

/// An error token reports its own lexical problem; anything else is a
/// grammar mismatch.
fn unexpected(expected: &[TokenClass], found: &TokenKind, span: Span) -> Diagnostic {
    match found {
        TokenKind::Error(error) => Diagnostic::Lex {
            error: error.clone(),
            span,
        },
        other => Diagnostic::Unexpected {
            expected: expected.to_vec(),
            found: other.class(),
            span,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{tokenize, LexError, Radix};
    use nandasm_common::{AssemblerConfig, OpcodeSpec};

    fn isa() -> InstructionSet {
        InstructionSet::new(AssemblerConfig::new(vec![
            OpcodeSpec::with_arity("nop", 0x00, 0),
            OpcodeSpec::with_arity("lda", 0x01, 1),
            OpcodeSpec::with_arity("add", 0x02, 3),
            OpcodeSpec::with_kinds("sta", 0x03, vec![OperandKind::Indirect]),
            OpcodeSpec::with_kinds(
                "mov",
                0x05,
                vec![OperandKind::Indirect, OperandKind::Immediate],
            ),
            OpcodeSpec::with_arity("hlt", 0xFF, 0),
        ]))
        .unwrap()
    }

    fn code(d: &Diagnostic) -> String {
        miette::Diagnostic::code(d).map(|c| c.to_string()).unwrap_or_default()
    }

    fn checked(source: &str) -> ParseOutput {
        let isa = isa();
        parse(tokenize(source), Grammar::Checked(&isa))
    }

    fn structural(source: &str) -> ParseOutput {
        parse(tokenize(source), Grammar::Structural)
    }

    fn instruction(output: &ParseOutput, index: usize) -> &Instruction {
        match &output.statements[index] {
            Statement::Instruction(instr) => instr,
            other => panic!("expected instruction, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty_source() {
        assert_eq!(checked(""), ParseOutput::default());
        assert_eq!(checked("\n\n\n"), ParseOutput::default());
    }

    #[test]
    fn parse_label() {
        let output = checked("loop:");
        assert_eq!(
            output.statements,
            vec![Statement::Label(LabelDefinition {
                name: "loop".to_string(),
                span: Span::new(0, 5),
            })]
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn parse_label_with_comment() {
        let output = checked("label: ;testing 1 2 3");
        assert_eq!(output.statements.len(), 1);
        assert_eq!(
            output.comments,
            vec![Comment {
                text: "testing 1 2 3".to_string(),
                span: Span::new(7, 21),
            }]
        );
    }

    #[test]
    fn parse_zero_operand_instruction() {
        let output = checked("nop \r\n\n   \n ");
        assert_eq!(
            output.statements,
            vec![Statement::Instruction(Instruction {
                mnemonic: "nop".to_string(),
                mnemonic_span: Span::new(0, 3),
                operands: vec![],
                span: Span::new(0, 3),
            })]
        );
    }

    #[test]
    fn untyped_operand_kinds_follow_prefix() {
        let output = checked("add #1 +2 3");
        let add = instruction(&output, 0);
        let kinds: Vec<OperandKind> = add.operands.iter().map(Operand::kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperandKind::Immediate,
                OperandKind::Indirect,
                OperandKind::Immediate
            ]
        );
        assert_eq!(add.span, Span::new(0, 11));
    }

    #[test]
    fn prefixed_operand_span_covers_prefix() {
        let output = checked("lda # 0x05");
        match &instruction(&output, 0).operands[0] {
            Operand::Immediate(lit) => {
                assert_eq!(lit.value(), 5);
                assert_eq!(lit.number.radix, Radix::Hexadecimal);
                assert_eq!(lit.prefix, Some(OperandPrefix::Immediate));
                assert_eq!(lit.span, Span::new(4, 10));
            }
            other => panic!("expected immediate, got {other:?}"),
        }
    }

    #[test]
    fn typed_slot_defaults_bare_operand() {
        let output = checked("sta 0x10\nsta target");
        assert!(matches!(
            instruction(&output, 0).operands[0],
            Operand::Indirect(_)
        ));
        match &instruction(&output, 1).operands[0] {
            Operand::Label(label) => {
                assert_eq!(label.name, "target");
                assert_eq!(label.kind, OperandKind::Indirect);
            }
            other => panic!("expected label, got {other:?}"),
        }
    }

    #[test]
    fn typed_slot_rejects_other_prefix() {
        let output = checked("sta #5");
        assert!(output.statements.is_empty());
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::Unexpected {
                expected: vec![
                    TokenClass::IndirectPrefix,
                    TokenClass::Number,
                    TokenClass::Identifier
                ],
                found: TokenClass::ImmediatePrefix,
                span: Span::new(4, 5),
            }]
        );
    }

    #[test]
    fn typed_slot_accepts_matching_prefix() {
        let output = checked("mov +1 #2");
        assert!(output.diagnostics.is_empty());
        let kinds: Vec<OperandKind> = instruction(&output, 0)
            .operands
            .iter()
            .map(Operand::kind)
            .collect();
        assert_eq!(kinds, vec![OperandKind::Indirect, OperandKind::Immediate]);
    }

    #[test]
    fn unknown_opcode_skips_line() {
        let output = checked("foo 1 2 3\nnop");
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::OpcodeDoesNotExist {
                mnemonic: "foo".to_string(),
                span: Span::new(0, 3),
            }]
        );
        assert_eq!(output.statements.len(), 1);
        assert_eq!(instruction(&output, 0).mnemonic, "nop");
    }

    #[test]
    fn missing_operand_at_end_of_line() {
        let output = checked("lda\nnop");
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::Unexpected {
                expected: vec![
                    TokenClass::ImmediatePrefix,
                    TokenClass::IndirectPrefix,
                    TokenClass::Number,
                    TokenClass::Identifier
                ],
                found: TokenClass::Newline,
                span: Span::new(3, 4),
            }]
        );
        // The newline is not swallowed, so the next line still parses.
        assert_eq!(output.statements.len(), 1);
    }

    #[test]
    fn label_operand_serializes_without_duplicate_keys() {
        let output = checked("L:\nlda L");
        let text = serde_json::to_string(&output.statements).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let operand = &json[1]["operands"][0];
        assert_eq!(operand["kind"], "label");
        assert_eq!(operand["operand_kind"], "immediate");
        assert_eq!(operand["name"], "L");
        assert_eq!(text.matches("\"kind\"").count(), 3, "{text}");
    }

    #[test]
    fn prefix_without_value() {
        let output = checked("lda #");
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::Unexpected {
                expected: vec![TokenClass::Number, TokenClass::Identifier],
                found: TokenClass::EndOfInput,
                span: Span::point(5),
            }]
        );
    }

    #[test]
    fn too_many_operands() {
        let output = checked("nop 5");
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::Unexpected {
                expected: LINE_END.to_vec(),
                found: TokenClass::Number,
                span: Span::new(4, 5),
            }]
        );
        assert!(output.statements.is_empty());
    }

    #[test]
    fn label_must_end_line() {
        let output = checked("start: nop");
        assert_eq!(output.statements.len(), 1);
        assert!(matches!(
            output.diagnostics[..],
            [Diagnostic::Unexpected {
                found: TokenClass::Identifier,
                ..
            }]
        ));
    }

    #[test]
    fn line_starting_with_number() {
        let output = checked("5\nnop");
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::Unexpected {
                expected: vec![TokenClass::Identifier],
                found: TokenClass::Number,
                span: Span::new(0, 1),
            }]
        );
        assert_eq!(output.statements.len(), 1);
    }

    #[test]
    fn lex_error_in_operand_position() {
        let output = checked("lda 0xZZ");
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::Lex {
                error: LexError::MalformedNumber("0xZZ".to_string()),
                span: Span::new(4, 8),
            }]
        );
    }

    #[test]
    fn every_bad_line_is_reported() {
        let output = checked("foo\nlda\nnop 1\n$\nbar\nhlt");
        let codes: Vec<String> = output.diagnostics.iter().map(code).collect();
        assert_eq!(
            codes,
            vec![
                "nandasm::opcode_does_not_exist",
                "nandasm::unexpected",
                "nandasm::unexpected",
                "nandasm::lex_error",
                "nandasm::opcode_does_not_exist"
            ]
        );
        assert_eq!(output.statements.len(), 1);
    }

    #[test]
    fn lex_errors_later_on_a_skipped_line_are_reported() {
        let output = checked("foo @ $");
        assert_eq!(output.diagnostics.len(), 3);
        assert_eq!(code(&output.diagnostics[0]), "nandasm::opcode_does_not_exist");
        assert_eq!(code(&output.diagnostics[1]), "nandasm::lex_error");
        assert_eq!(code(&output.diagnostics[2]), "nandasm::lex_error");
    }

    #[test]
    fn negative_literal_operand() {
        let output = checked("lda #-0x01");
        match &instruction(&output, 0).operands[0] {
            Operand::Immediate(lit) => assert_eq!(lit.value(), -1),
            other => panic!("expected immediate, got {other:?}"),
        }
    }

    #[test]
    fn structural_grammar_accepts_any_mnemonic() {
        let output = structural("frob 1 +2 #x ; note\nL:\n  zap");
        assert!(output.diagnostics.is_empty());
        assert_eq!(output.statements.len(), 3);
        assert_eq!(instruction(&output, 0).operands.len(), 3);
        assert_eq!(output.comments.len(), 1);
    }

    #[test]
    fn structural_grammar_still_reports_syntax() {
        let output = structural("lda # ;oops\n: x");
        assert_eq!(output.diagnostics.len(), 2);
        assert_eq!(output.comments.len(), 1);
    }
}
