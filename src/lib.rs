//! Compiler library: source text in, MIPS-style assembly text out.
//!
//! The pipeline is strictly sequential and abort-between-phases: lex+parse,
//! then name analysis (C3), then type checking (C4), then code generation
//! (C5). A phase that records any diagnostic stops the pipeline before the
//! next one runs — see [`compile_file`] and SPEC_FULL.md §4.7.

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod parser;
pub mod resolver;
pub mod symtab;
pub mod typechecker;

pub use ast::Program;
pub use diagnostics::{Diagnostic, DiagnosticSink};
pub use parser::Parser;
pub use resolver::NameAnalyzer;

use std::fs;
use std::path::Path;

/// Everything the pipeline can fail with, as the single line the driver
/// prints to stderr before exiting nonzero.
#[derive(Debug)]
pub enum CompileError {
    Io(String),
    Syntax(String),
    Semantic(String),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Io(e) => write!(f, "{}", e),
            CompileError::Syntax(e) => write!(f, "{}", e),
            CompileError::Semantic(e) => write!(f, "{}", e),
        }
    }
}

/// Runs the full pipeline and writes `<asm-out>` (and, if requested, a
/// structural unparse of the bound/typed AST to `unparse_out`).
pub fn compile_file(
    source_path: &Path,
    asm_out: &Path,
    unparse_out: Option<&Path>,
) -> Result<(), CompileError> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| CompileError::Io(format!("Failed to read '{}': {}", source_path.display(), e)))?;

    let asm = compile_to_asm(&source, unparse_out)?;

    fs::write(asm_out, asm)
        .map_err(|e| CompileError::Io(format!("Failed to write '{}': {}", asm_out.display(), e)))?;
    Ok(())
}

/// The same pipeline over an in-memory source string, returning the
/// generated assembly text. Used by [`compile_file`] and by integration
/// tests that don't want to touch the filesystem for the input side.
pub fn compile_to_asm(source: &str, unparse_out: Option<&Path>) -> Result<String, CompileError> {
    let program = Parser::new(source)
        .parse_program()
        .map_err(CompileError::Syntax)?;

    let mut sink = DiagnosticSink::new();
    NameAnalyzer::new(&mut sink).analyze(&program);
    if sink.has_errors() {
        return Err(CompileError::Semantic(sink.render()));
    }

    typechecker::typecheck_program(&program, &mut sink);
    if sink.has_errors() {
        return Err(CompileError::Semantic(sink.render()));
    }

    if let Some(path) = unparse_out {
        fs::write(path, program.unparse())
            .map_err(|e| CompileError::Io(format!("Failed to write '{}': {}", path.display(), e)))?;
    }

    Ok(codegen::generate(&program))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world_compiles_to_assembly() {
        let asm = compile_to_asm(r#"void main() { cout << "hi"; }"#, None).unwrap();
        assert!(asm.contains(".data"));
        assert!(asm.contains(".text"));
        assert!(asm.contains("main:"));
    }

    #[test]
    fn missing_main_is_a_semantic_error() {
        let err = compile_to_asm("int g;", None).unwrap_err();
        match err {
            CompileError::Semantic(msg) => assert!(msg.contains("No main function")),
            other => panic!("expected a semantic error, got {:?}", other),
        }
    }

    #[test]
    fn syntax_error_is_reported_before_name_analysis_runs() {
        let err = compile_to_asm("void main() { 1 = 2; }", None).unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
    }

    #[test]
    fn type_error_stops_the_pipeline_before_codegen() {
        let err = compile_to_asm("void main() { return 1; }", None).unwrap_err();
        match err {
            CompileError::Semantic(msg) => {
                assert!(msg.contains("Return with a value in a void function"))
            }
            other => panic!("expected a semantic error, got {:?}", other),
        }
    }
}
