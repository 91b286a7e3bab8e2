//! CLI command implementations.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use nandasm_assembler::{AssembleError, Diagnostic, Span};
use nandasm_common::{AssemblerConfig, InstructionSet};
use serde::Serialize;

#[derive(Args)]
pub struct AssembleArgs {
    /// Source file
    pub input: PathBuf,

    /// Instruction-set description (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Output file (default: input with a `.bin` extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print diagnostics to stdout as a JSON array
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct FormatArgs {
    /// Source file
    pub input: PathBuf,

    /// Rewrite the file in place instead of printing
    #[arg(short, long)]
    pub write: bool,
}

/// Assemble a source file to raw bytes.
pub fn assemble(args: &AssembleArgs) -> Result<(), i32> {
    let isa = load_instruction_set(&args.config)?;
    let source = read_source(&args.input)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("bin"));

    let assembly = match nandasm_assembler::assemble_program(&source, &isa) {
        Ok(assembly) => assembly,
        Err(AssembleError::Diagnostics(diagnostics)) => {
            report(&args.input, &source, &diagnostics, args.json);
            return Err(1);
        }
        Err(AssembleError::Internal(e)) => {
            eprintln!("internal error: {e}");
            return Err(3);
        }
    };

    if args.json {
        println!("[]");
    }

    fs::write(&output, &assembly.bytes).map_err(|e| {
        eprintln!("error: cannot write '{}': {e}", output.display());
        1
    })?;

    eprintln!(
        "assembled {} bytes ({} labels) -> {}",
        assembly.bytes.len(),
        assembly.symbols.len(),
        output.display()
    );
    Ok(())
}

/// Print or rewrite a source file in canonical layout.
pub fn format(args: &FormatArgs) -> Result<(), i32> {
    let source = read_source(&args.input)?;

    let formatted = nandasm_assembler::format(&source).map_err(|diagnostics| {
        report(&args.input, &source, &diagnostics, false);
        1
    })?;

    if !args.write {
        print!("{formatted}");
        return Ok(());
    }

    if formatted == source {
        tracing::info!(path = %args.input.display(), "already formatted");
        return Ok(());
    }
    fs::write(&args.input, &formatted).map_err(|e| {
        eprintln!("error: cannot write '{}': {e}", args.input.display());
        1
    })?;
    eprintln!("formatted {}", args.input.display());
    Ok(())
}

fn read_source(path: &Path) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read '{}': {e}", path.display());
        1
    })
}

fn load_instruction_set(path: &Path) -> Result<InstructionSet, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read config '{}': {e}", path.display());
        1
    })?;

    let config: AssemblerConfig = serde_json::from_str(&text).map_err(|e| {
        eprintln!("error: invalid config '{}': {e}", path.display());
        1
    })?;

    let isa = InstructionSet::new(config).map_err(|e| {
        eprintln!("error: invalid config '{}': {e}", path.display());
        1
    })?;

    tracing::info!(path = %path.display(), opcodes = isa.len(), "loaded instruction set");
    Ok(isa)
}

/// A diagnostic as printed by `--json`.
#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: Option<String>,
    message: String,
    line: usize,
    column: usize,
    span: Span,
    detail: &'a Diagnostic,
}

impl<'a> JsonDiagnostic<'a> {
    fn new(diagnostic: &'a Diagnostic, source: &str) -> Self {
        let position = diagnostic.span().position(source);
        Self {
            code: miette::Diagnostic::code(diagnostic).map(|c| c.to_string()),
            message: diagnostic.to_string(),
            line: position.line,
            column: position.column,
            span: diagnostic.span(),
            detail: diagnostic,
        }
    }
}

fn report(path: &Path, source: &str, diagnostics: &[Diagnostic], json: bool) {
    if json {
        let entries: Vec<JsonDiagnostic<'_>> = diagnostics
            .iter()
            .map(|d| JsonDiagnostic::new(d, source))
            .collect();
        match serde_json::to_string_pretty(&entries) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("error: cannot serialize diagnostics: {e}"),
        }
        return;
    }

    let name = path.display().to_string();
    for diagnostic in diagnostics {
        let position = diagnostic.span().position(source);
        tracing::debug!(line = position.line, column = position.column, "{diagnostic}");
        eprintln!("{:?}", diagnostic.clone().report(&name, source));
    }
    eprintln!("{} error(s) in {}", diagnostics.len(), path.display());
}
