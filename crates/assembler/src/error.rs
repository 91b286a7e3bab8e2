//! Error types returned by the assembler entry points.

use thiserror::Error;

use crate::diagnostic::Diagnostic;

/// Why `assemble` produced no bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// The source has problems. Diagnostics are in pipeline order: lexing
    /// and parsing first, then resolution, then encoding.
    #[error("assembly failed with {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),

    /// The engine broke one of its own invariants. Not a user error.
    #[error("internal assembler fault: {0}")]
    Internal(#[from] InternalError),
}

impl AssembleError {
    /// The user-facing diagnostics, empty for internal faults.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            AssembleError::Diagnostics(diagnostics) => diagnostics,
            AssembleError::Internal(_) => &[],
        }
    }
}

/// Engine defects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    /// The encoder produced a different length than address assignment sized.
    #[error("encoded {actual} bytes but addresses were assigned for {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A label reference survived resolution.
    #[error("label reference '{name}' reached the encoder unresolved")]
    UnresolvedLabel { name: String },

    /// An instruction whose mnemonic is not in the table reached the encoder.
    #[error("mnemonic '{mnemonic}' reached the encoder without a table entry")]
    UnknownMnemonic { mnemonic: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn display_diagnostics_count() {
        let e = AssembleError::Diagnostics(vec![Diagnostic::UnknownLabel {
            name: "X".to_string(),
            span: Span::new(0, 1),
        }]);
        assert_eq!(e.to_string(), "assembly failed with 1 diagnostic(s)");
        assert_eq!(e.diagnostics().len(), 1);
    }

    #[test]
    fn display_length_mismatch() {
        let e = AssembleError::from(InternalError::LengthMismatch {
            expected: 4,
            actual: 3,
        });
        assert_eq!(
            e.to_string(),
            "internal assembler fault: encoded 3 bytes but addresses were assigned for 4"
        );
        assert!(e.diagnostics().is_empty());
    }

    #[test]
    fn display_unresolved_label() {
        let e = InternalError::UnresolvedLabel {
            name: "L".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "label reference 'L' reached the encoder unresolved"
        );
    }

    #[test]
    fn error_clone_and_eq() {
        let e1 = AssembleError::Diagnostics(vec![]);
        let e2 = e1.clone();
        assert_eq!(e1, e2);
    }
}
