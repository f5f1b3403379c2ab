//! End-to-end tests driving the compiler through its file-based CLI entry
//! point (`compiler::compile_file`) rather than the in-memory helper, so
//! they also exercise the I/O error paths an in-memory call can't reach.

use compiler::CompileError;
use std::fs;
use tempfile::tempdir;

fn write_source(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn missing_main_is_reported_and_nothing_is_written() {
    let dir = tempdir().unwrap();
    let input = write_source(dir.path(), "in.lang", "int g;");
    let asm_out = dir.path().join("out.s");

    let err = compiler::compile_file(&input, &asm_out, None).unwrap_err();
    match err {
        CompileError::Semantic(msg) => {
            assert_eq!(msg, "0:0 ***ERROR*** No main function");
        }
        other => panic!("expected a semantic error, got {:?}", other),
    }
    assert!(!asm_out.exists());
}

#[test]
fn duplicate_local_is_reported_once_at_the_second_declaration() {
    let dir = tempdir().unwrap();
    let input = write_source(dir.path(), "in.lang", "void main() { int x; int x; }");
    let asm_out = dir.path().join("out.s");

    let err = compiler::compile_file(&input, &asm_out, None).unwrap_err();
    let CompileError::Semantic(msg) = err else {
        panic!("expected a semantic error")
    };
    let lines: Vec<&str> = msg.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("***ERROR*** Multiply declared identifier"));
}

#[test]
fn struct_field_access_chain_compiles_and_addresses_the_nested_field() {
    let dir = tempdir().unwrap();
    let input = write_source(
        dir.path(),
        "in.lang",
        "struct A { int f; } struct B { struct A a; } void main() { struct B b; b.a.f = 1; }",
    );
    let asm_out = dir.path().join("out.s");

    compiler::compile_file(&input, &asm_out, None).unwrap();
    let asm = fs::read_to_string(&asm_out).unwrap();
    // `a` is B's only field (offset 0), `f` is A's only field (offset 0): the
    // store address is the base address of `b` with both offsets folded in.
    assert!(asm.contains("li $t0,1"));
    assert!(asm.contains("sw $t1,0($t0)"));
}

#[test]
fn short_circuit_write_compiles_without_evaluating_the_rhs_unconditionally() {
    let dir = tempdir().unwrap();
    let input = write_source(
        dir.path(),
        "in.lang",
        "void main() { bool b; b = true; if (b || (1/0 == 0)) { cout << 1; } }",
    );
    let asm_out = dir.path().join("out.s");

    compiler::compile_file(&input, &asm_out, None).unwrap();
    let asm = fs::read_to_string(&asm_out).unwrap();
    // Jump-mode Or: branches to the then-label as soon as `b` is true,
    // without ever emitting the division that would appear in the RHS.
    assert!(asm.contains("bne $t0,$zero,"));
    assert!(asm.contains("div"));
    let or_rhs_pos = asm.find("div").unwrap();
    let first_branch_pos = asm.find("bne $t0,$zero,").unwrap();
    assert!(first_branch_pos < or_rhs_pos, "the short-circuit branch must precede the RHS's division");
}

#[test]
fn void_return_mismatch_is_reported_at_the_returned_values_position() {
    let dir = tempdir().unwrap();
    let input = write_source(dir.path(), "in.lang", "void main() { return 1; }");
    let asm_out = dir.path().join("out.s");

    let err = compiler::compile_file(&input, &asm_out, None).unwrap_err();
    let CompileError::Semantic(msg) = err else {
        panic!("expected a semantic error")
    };
    assert!(msg.contains("***ERROR*** Return with a value in a void function"));
}

#[test]
fn hello_world_produces_the_expected_assembly_shape() {
    let dir = tempdir().unwrap();
    let input = write_source(dir.path(), "in.lang", r#"void main() { cout << "hi"; }"#);
    let asm_out = dir.path().join("out.s");

    compiler::compile_file(&input, &asm_out, None).unwrap();
    let asm = fs::read_to_string(&asm_out).unwrap();
    assert!(asm.contains(".asciiz \"hi\""));
    assert!(asm.contains("li $v0,4"));
    assert!(asm.contains("syscall"));
    assert!(asm.contains("li $v0,10"));
}

#[test]
fn unparse_output_is_written_when_requested() {
    let dir = tempdir().unwrap();
    let input = write_source(dir.path(), "in.lang", "void main() { cout << 1; }");
    let asm_out = dir.path().join("out.s");
    let unparse_out = dir.path().join("out.unparsed");

    compiler::compile_file(&input, &asm_out, Some(&unparse_out)).unwrap();
    let unparsed = fs::read_to_string(&unparse_out).unwrap();
    assert!(unparsed.contains("void main()"));
    assert!(unparsed.contains("cout << 1;"));
}

#[test]
fn missing_input_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.lang");
    let asm_out = dir.path().join("out.s");

    let err = compiler::compile_file(&missing, &asm_out, None).unwrap_err();
    assert!(matches!(err, CompileError::Io(_)));
}
