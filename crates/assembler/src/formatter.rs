//! Canonical layout for nandasm source.
//!
//! Formatting only reads the structure of the text, so no instruction set
//! is needed. Source that does not parse is not formatted; its diagnostics
//! are returned instead.
//!
//! Layout:
//! - leading and trailing blank lines are dropped, runs of blank lines
//!   collapse to one
//! - labels start at column 0 as `name:`
//! - after the first label, instructions and comment lines are indented
//!   with one tab
//! - operands are separated by one space, prefixes stay attached
//! - numbers keep their radix and digit count
//! - comments are written `; text`
//! - the output ends with exactly one newline, unless it is empty

use crate::diagnostic::Diagnostic;
use crate::lexer::tokenize;
use crate::parser::{parse, Comment, Grammar, Instruction, Operand, Statement};

/// What one source line holds after parsing.
#[derive(Debug, Default, Clone, Copy)]
struct Line<'p> {
    statement: Option<&'p Statement>,
    comment: Option<&'p Comment>,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.statement.is_none() && self.comment.is_none()
    }
}

/// Rewrite `source` in canonical layout.
pub fn format(source: &str) -> Result<String, Vec<Diagnostic>> {
    let parsed = parse(tokenize(source), Grammar::Structural);
    if !parsed.diagnostics.is_empty() {
        return Err(parsed.diagnostics);
    }

    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let line_of = |offset: usize| line_starts.partition_point(|&start| start <= offset) - 1;

    let mut lines = vec![Line::default(); line_starts.len()];
    for statement in &parsed.statements {
        lines[line_of(statement.span().start)].statement = Some(statement);
    }
    for comment in &parsed.comments {
        lines[line_of(comment.span.start)].comment = Some(comment);
    }

    let mut out = String::with_capacity(source.len());
    let mut indent = false;
    let mut pending_blank = false;

    for line in &lines {
        if line.is_blank() {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push('\n');
            pending_blank = false;
        }

        match line.statement {
            Some(Statement::Label(label)) => {
                indent = true;
                out.push_str(&label.name);
                out.push(':');
            }
            Some(Statement::Instruction(instruction)) => {
                if indent {
                    out.push('\t');
                }
                write_instruction(&mut out, instruction);
            }
            None if indent => out.push('\t'),
            None => {}
        }

        if let Some(comment) = line.comment {
            if line.statement.is_some() {
                out.push(' ');
            }
            write_comment(&mut out, comment);
        }
        out.push('\n');
    }

    tracing::debug!(lines = lines.len(), "formatted source");
    Ok(out)
}

fn write_instruction(out: &mut String, instruction: &Instruction) {
    out.push_str(&instruction.mnemonic);
    for operand in &instruction.operands {
        out.push(' ');
        if let Some(prefix) = operand.prefix() {
            out.push(prefix.as_char());
        }
        match operand {
            Operand::Immediate(literal) | Operand::Indirect(literal) => {
                out.push_str(&literal.number.to_string())
            }
            Operand::Label(label) => out.push_str(&label.name),
        }
    }
}

fn write_comment(out: &mut String, comment: &Comment) {
    let text = comment.text.trim();
    out.push(';');
    if !text.is_empty() {
        out.push(' ');
        out.push_str(text);
    }
}
