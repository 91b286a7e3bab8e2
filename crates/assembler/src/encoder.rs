//! Resolved statements → bytes.
//!
//! Each instruction emits its opcode byte followed by one byte per
//! operand, in order. Labels emit nothing.
//!
//! | kind      | accepted values | byte                |
//! |-----------|-----------------|---------------------|
//! | immediate | -128 ..= 255    | two's complement    |
//! | indirect  | 0 ..= 255       | the value           |

use nandasm_common::{InstructionSet, OperandKind};

use crate::diagnostic::Diagnostic;
use crate::error::{AssembleError, InternalError};
use crate::parser::{Literal, Operand, Statement};

/// Encode `statements`, which must be free of label references.
///
/// `expected_len` is the size address assignment computed. Out-of-range
/// operands are all reported; a length disagreement is an internal fault.
pub fn encode(
    statements: &[Statement],
    isa: &InstructionSet,
    expected_len: usize,
) -> Result<Vec<u8>, AssembleError> {
    let mut bytes = Vec::with_capacity(expected_len);
    let mut diagnostics = Vec::new();

    for statement in statements {
        let Statement::Instruction(instruction) = statement else {
            continue;
        };
        let opcode =
            isa.lookup(&instruction.mnemonic)
                .ok_or_else(|| InternalError::UnknownMnemonic {
                    mnemonic: instruction.mnemonic.clone(),
                })?;
        bytes.push(opcode.binary);

        for operand in &instruction.operands {
            let (kind, literal) = match operand {
                Operand::Immediate(literal) => (OperandKind::Immediate, literal),
                Operand::Indirect(literal) => (OperandKind::Indirect, literal),
                Operand::Label(label) => {
                    return Err(InternalError::UnresolvedLabel {
                        name: label.name.clone(),
                    }
                    .into())
                }
            };
            match operand_byte(kind, literal) {
                Ok(byte) => bytes.push(byte),
                Err(diagnostic) => {
                    // Keep the length right so later checks stay meaningful.
                    bytes.push(0);
                    diagnostics.push(diagnostic);
                }
            }
        }
    }

    if !diagnostics.is_empty() {
        return Err(AssembleError::Diagnostics(diagnostics));
    }
    if bytes.len() != expected_len {
        return Err(InternalError::LengthMismatch {
            expected: expected_len,
            actual: bytes.len(),
        }
        .into());
    }

    tracing::debug!(bytes = bytes.len(), "encoded program");
    Ok(bytes)
}

/// The byte for one operand value.
pub fn operand_byte(kind: OperandKind, literal: &Literal) -> Result<u8, Diagnostic> {
    let value = literal.value();
    let byte = match kind {
        OperandKind::Immediate => i8::try_from(value)
            .map(|signed| signed as u8)
            .or_else(|_| u8::try_from(value)),
        OperandKind::Indirect => u8::try_from(value),
    };
    byte.map_err(|_| Diagnostic::ValueOutOfRange {
        value,
        kind,
        span: literal.span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{NumberLiteral, OperandPrefix};
    use crate::parser::{Instruction, LabelDefinition, LabelRef};
    use crate::span::Span;
    use nandasm_common::{AssemblerConfig, OpcodeSpec};

    fn isa() -> InstructionSet {
        InstructionSet::new(AssemblerConfig::new(vec![
            OpcodeSpec::with_arity("nop", 0x00, 0),
            OpcodeSpec::with_arity("lda", 0x01, 1),
            OpcodeSpec::with_kinds("sta", 0x03, vec![OperandKind::Indirect]),
            OpcodeSpec::with_arity("hlt", 0xFF, 0),
        ]))
        .unwrap()
    }

    fn literal(value: i64, span: Span) -> Literal {
        Literal {
            number: NumberLiteral::decimal(value),
            prefix: None,
            span,
        }
    }

    fn instr(mnemonic: &str, operands: Vec<Operand>) -> Statement {
        Statement::Instruction(Instruction {
            mnemonic: mnemonic.to_string(),
            mnemonic_span: Span::default(),
            operands,
            span: Span::default(),
        })
    }

    #[test]
    fn encode_opcodes_and_operands() {
        let statements = vec![
            instr(
                "lda",
                vec![Operand::Immediate(literal(5, Span::default()))],
            ),
            Statement::Label(LabelDefinition {
                name: "end".to_string(),
                span: Span::default(),
            }),
            instr("hlt", vec![]),
        ];
        assert_eq!(
            encode(&statements, &isa(), 3).unwrap(),
            vec![0x01, 0x05, 0xFF]
        );
    }

    #[test]
    fn immediate_range() {
        let span = Span::default();
        let byte = |v| operand_byte(OperandKind::Immediate, &literal(v, span));
        assert_eq!(byte(-1), Ok(0xFF));
        assert_eq!(byte(-128), Ok(0x80));
        assert_eq!(byte(127), Ok(0x7F));
        assert_eq!(byte(255), Ok(0xFF));
        assert!(byte(256).is_err());
        assert!(byte(-129).is_err());
    }

    #[test]
    fn indirect_range() {
        let span = Span::default();
        let byte = |v| operand_byte(OperandKind::Indirect, &literal(v, span));
        assert_eq!(byte(0), Ok(0));
        assert_eq!(byte(255), Ok(255));
        assert!(byte(-1).is_err());
        assert!(byte(256).is_err());
    }

    #[test]
    fn every_out_of_range_operand_reported() {
        let statements = vec![
            instr("lda", vec![Operand::Immediate(literal(300, Span::new(4, 7)))]),
            instr("sta", vec![Operand::Indirect(literal(-1, Span::new(12, 14)))]),
        ];
        let err = encode(&statements, &isa(), 4).unwrap_err();
        assert_eq!(
            err,
            AssembleError::Diagnostics(vec![
                Diagnostic::ValueOutOfRange {
                    value: 300,
                    kind: OperandKind::Immediate,
                    span: Span::new(4, 7),
                },
                Diagnostic::ValueOutOfRange {
                    value: -1,
                    kind: OperandKind::Indirect,
                    span: Span::new(12, 14),
                },
            ])
        );
    }

    #[test]
    fn length_mismatch_is_internal() {
        let statements = vec![instr("nop", vec![])];
        let err = encode(&statements, &isa(), 2).unwrap_err();
        assert_eq!(
            err,
            AssembleError::Internal(InternalError::LengthMismatch {
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn unresolved_label_is_internal() {
        let statements = vec![instr(
            "lda",
            vec![Operand::Label(LabelRef {
                name: "L".to_string(),
                kind: OperandKind::Immediate,
                prefix: Some(OperandPrefix::Immediate),
                span: Span::default(),
            })],
        )];
        let err = encode(&statements, &isa(), 2).unwrap_err();
        assert_eq!(
            err,
            AssembleError::Internal(InternalError::UnresolvedLabel {
                name: "L".to_string(),
            })
        );
    }

    #[test]
    fn unknown_mnemonic_is_internal() {
        let err = encode(&[instr("zap", vec![])], &isa(), 1).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::Internal(InternalError::UnknownMnemonic { .. })
        ));
    }
}
