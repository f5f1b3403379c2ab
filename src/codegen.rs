//! MIPS-style assembly code generation (C5).
//!
//! Every expression pushes exactly one 4-byte word on the runtime stack;
//! l-value contexts (assignment target, read target, increment/decrement
//! operand) push an *address* instead of a value. Two buffers are built up
//! independently — `data` for globals/string constants, `text` for
//! instructions — and concatenated once generation finishes, so string
//! literals discovered mid-function still land in `.data`.
//!
//! Boolean-producing expressions have two lowering paths: `gen_exp` (value
//! mode, leaves 0/1 on the stack) and `gen_jump_code` (jump mode, branches
//! straight to caller-supplied labels). `if`/`while` conditions always use
//! jump mode so `&&`/`||` short-circuit without ever materialising an
//! intermediate boolean.

use crate::ast::*;
use crate::symtab::{SemType, Storage};
use std::fmt::Write as _;

pub fn generate(program: &Program) -> String {
    let mut cg = CodeGen::new();
    cg.gen_program(program);
    cg.finish()
}

struct CodeGen {
    data: String,
    text: String,
    label_counter: u32,
    /// String constants already emitted, by value, so the same literal text
    /// reuses one label instead of duplicating `.asciiz` entries.
    strings: Vec<(String, String)>,
    /// The current function's single exit label; `return` compiles to a jump
    /// here rather than an inline epilogue.
    epilogue_label: String,
}

impl CodeGen {
    fn new() -> Self {
        CodeGen {
            data: String::new(),
            text: String::new(),
            label_counter: 0,
            strings: Vec::new(),
            epilogue_label: String::new(),
        }
    }

    fn finish(self) -> String {
        format!(".data\n{}\n.text\n{}", self.data, self.text)
    }

    fn fresh_label(&mut self) -> String {
        let l = format!("_L{}", self.label_counter);
        self.label_counter += 1;
        l
    }

    fn string_label(&mut self, value: &str) -> String {
        if let Some((_, label)) = self.strings.iter().find(|(v, _)| v == value) {
            return label.clone();
        }
        let label = format!("_str{}", self.strings.len());
        let _ = writeln!(self.data, "{}: .asciiz \"{}\"", label, escape(value));
        self.strings.push((value.to_string(), label.clone()));
        label
    }

    fn emit(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    fn push(&mut self, reg: &str) {
        self.emit("subu $sp,$sp,4");
        self.emit(format!("sw {},0($sp)", reg));
    }

    fn pop(&mut self, reg: &str) {
        self.emit(format!("lw {},0($sp)", reg));
        self.emit("addu $sp,$sp,4");
    }

    fn gen_program(&mut self, program: &Program) {
        for decl in &program.decls {
            if let Decl::Var(vd) = decl {
                let sym = vd.id.symbol().expect("bound by name analysis");
                let size = sym.as_variable().expect("global is a variable").size;
                let _ = writeln!(self.data, "_{}: .space {}", vd.id.name, size);
            }
        }
        for decl in &program.decls {
            if let Decl::Fn(fd) = decl {
                self.gen_function(fd);
            }
        }
    }

    fn gen_function(&mut self, fd: &FnDecl) {
        let formals_size = fd.formals_size.get();
        self.epilogue_label = self.fresh_label();

        if fd.id.name == "main" {
            self.emit("main:");
            self.emit("__start:");
        } else {
            self.emit(format!("_{}:", fd.id.name));
        }

        self.emit("subu $sp,$sp,8");
        self.emit("sw $ra,4($sp)");
        self.emit("sw $fp,0($sp)");
        self.emit(format!("addu $fp,$sp,{}", 8 + formals_size));
        let frame_size = fd.frame_size.get();
        if frame_size > 0 {
            self.emit(format!("subu $sp,$sp,{}", frame_size));
        }

        for stmt in &fd.body_stmts {
            self.gen_stmt(stmt);
        }

        self.emit(format!("{}:", self.epilogue_label));
        if fd.id.name == "main" {
            self.emit("li $v0,10");
            self.emit("syscall");
        } else {
            self.emit(format!("lw $ra,{}($fp)", -(formals_size + 4)));
            self.emit(format!("lw $t0,{}($fp)", -(formals_size + 8)));
            self.emit("move $sp,$fp");
            self.emit("move $fp,$t0");
            self.emit("jr $ra");
        }
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(a) => {
                self.gen_addr(&a.lhs);
                self.gen_exp(&a.rhs);
                self.pop("$t1");
                self.pop("$t0");
                self.emit("sw $t1,0($t0)");
            }
            Stmt::PostInc(e, _) => self.gen_post(e, "add"),
            Stmt::PostDec(e, _) => self.gen_post(e, "sub"),
            Stmt::Read(e) => {
                self.emit("li $v0,5");
                self.emit("syscall");
                if e.ty() == SemType::Bool {
                    self.emit("sne $v0,$v0,$zero");
                }
                self.gen_addr(e);
                self.pop("$t0");
                self.emit("sw $v0,0($t0)");
            }
            Stmt::Write(e) => {
                self.gen_exp(e);
                self.pop("$a0");
                if e.ty() == SemType::String {
                    self.emit("li $v0,4");
                } else {
                    self.emit("li $v0,1");
                }
                self.emit("syscall");
            }
            Stmt::Call(c) => self.gen_call(c, false),
            Stmt::Return(expr, _) => {
                if let Some(e) = expr {
                    self.gen_exp(e);
                    self.pop("$v0");
                }
                self.emit(format!("b {}", self.epilogue_label));
            }
            Stmt::If(cond, _, stmts) => {
                let t = self.fresh_label();
                let end = self.fresh_label();
                self.gen_jump_code(cond, &t, &end);
                self.emit(format!("{}:", t));
                for s in stmts {
                    self.gen_stmt(s);
                }
                self.emit(format!("{}:", end));
            }
            Stmt::IfElse(cond, _, tstmts, _, estmts) => {
                let t = self.fresh_label();
                let f = self.fresh_label();
                let end = self.fresh_label();
                self.gen_jump_code(cond, &t, &f);
                self.emit(format!("{}:", t));
                for s in tstmts {
                    self.gen_stmt(s);
                }
                self.emit(format!("b {}", end));
                self.emit(format!("{}:", f));
                for s in estmts {
                    self.gen_stmt(s);
                }
                self.emit(format!("{}:", end));
            }
            Stmt::While(cond, _, stmts) => {
                let top = self.fresh_label();
                let body = self.fresh_label();
                let end = self.fresh_label();
                self.emit(format!("{}:", top));
                self.gen_jump_code(cond, &body, &end);
                self.emit(format!("{}:", body));
                for s in stmts {
                    self.gen_stmt(s);
                }
                self.emit(format!("b {}", top));
                self.emit(format!("{}:", end));
            }
        }
    }

    fn gen_post(&mut self, e: &Exp, op: &str) {
        self.gen_addr(e);
        self.pop("$t0");
        self.emit("lw $t1,0($t0)");
        self.emit(format!("{} $t1,$t1,1", op));
        self.emit("sw $t1,0($t0)");
    }

    /// Pushes the runtime address of an l-value (`Id` or a `DotAccess` chain).
    fn gen_addr(&mut self, exp: &Exp) {
        match &exp.kind {
            ExpKind::Id(id) => {
                let sym = id.symbol().expect("bound by name analysis");
                let v = sym.as_variable().expect("lvalue Id names a variable");
                match v.storage {
                    Storage::Global => self.emit(format!("la $t0,_{}", id.name)),
                    Storage::Local => self.emit(format!("addu $t0,$fp,{}", v.offset)),
                    Storage::Field => unreachable!("a bare Id is never Field-stored"),
                }
                self.push("$t0");
            }
            ExpKind::DotAccess(loc, field, field_slot) => {
                self.gen_addr(loc);
                self.pop("$t0");
                let fsym = field_slot.borrow().clone().expect("bound by name analysis");
                let offset = fsym.as_variable().expect("field is a variable").offset;
                self.emit(format!("addu $t0,$t0,{}", offset));
                self.push("$t0");
                let _ = field;
            }
            _ => unreachable!("gen_addr is only called on dottable l-value shapes"),
        }
    }

    /// Value-mode expression evaluation: leaves exactly one word on the stack.
    fn gen_exp(&mut self, exp: &Exp) {
        match &exp.kind {
            ExpKind::IntLit(n) => {
                self.emit(format!("li $t0,{}", n));
                self.push("$t0");
            }
            ExpKind::True => {
                self.emit("li $t0,1");
                self.push("$t0");
            }
            ExpKind::False => {
                self.emit("li $t0,0");
                self.push("$t0");
            }
            ExpKind::StrLit(s) => {
                let label = self.string_label(s);
                self.emit(format!("la $t0,{}", label));
                self.push("$t0");
            }
            ExpKind::Id(_) | ExpKind::DotAccess(..) => {
                self.gen_addr(exp);
                self.pop("$t0");
                self.emit("lw $t0,0($t0)");
                self.push("$t0");
            }
            ExpKind::Assign(a) => {
                self.gen_addr(&a.lhs);
                self.gen_exp(&a.rhs);
                self.pop("$t1");
                self.pop("$t0");
                self.emit("sw $t1,0($t0)");
                self.push("$t1");
            }
            ExpKind::Call(c) => self.gen_call(c, true),
            ExpKind::UnaryMinus(e) => {
                self.gen_exp(e);
                self.pop("$t0");
                self.emit("sub $t0,$zero,$t0");
                self.push("$t0");
            }
            ExpKind::Not(e) => {
                self.gen_exp(e);
                self.pop("$t0");
                self.emit("seq $t0,$t0,$zero");
                self.push("$t0");
            }
            ExpKind::Bin(BinOp::And, l, r) => self.gen_short_circuit(l, r, true),
            ExpKind::Bin(BinOp::Or, l, r) => self.gen_short_circuit(l, r, false),
            ExpKind::Bin(op, l, r) => {
                self.gen_exp(l);
                self.gen_exp(r);
                self.pop("$t1");
                self.pop("$t0");
                self.emit(format!("{} $t0,$t0,$t1", value_mode_mnemonic(*op)));
                self.push("$t0");
            }
        }
    }

    /// Value-mode `&&`/`||`: evaluate LHS, peek it, and skip RHS (leaving the
    /// peeked value as the result) when the outcome is already determined.
    fn gen_short_circuit(&mut self, l: &Exp, r: &Exp, is_and: bool) {
        let end = self.fresh_label();
        self.gen_exp(l);
        self.emit("lw $t0,0($sp)");
        if is_and {
            self.emit(format!("beq $t0,$zero,{}", end));
        } else {
            self.emit(format!("bne $t0,$zero,{}", end));
        }
        self.emit("addu $sp,$sp,4");
        self.gen_exp(r);
        self.emit(format!("{}:", end));
    }

    /// Jump-mode condition evaluation: branches to `t_label`/`f_label`
    /// without ever materialising a 0/1 value for `exp` itself.
    fn gen_jump_code(&mut self, exp: &Exp, t_label: &str, f_label: &str) {
        match &exp.kind {
            ExpKind::Bin(BinOp::And, l, r) => {
                let mid = self.fresh_label();
                self.gen_jump_code(l, &mid, f_label);
                self.emit(format!("{}:", mid));
                self.gen_jump_code(r, t_label, f_label);
            }
            ExpKind::Bin(BinOp::Or, l, r) => {
                let mid = self.fresh_label();
                self.gen_jump_code(l, t_label, &mid);
                self.emit(format!("{}:", mid));
                self.gen_jump_code(r, t_label, f_label);
            }
            ExpKind::Not(e) => self.gen_jump_code(e, f_label, t_label),
            ExpKind::Bin(op, l, r) if is_relational_or_eq(*op) => {
                self.gen_exp(l);
                self.gen_exp(r);
                self.pop("$t1");
                self.pop("$t0");
                self.emit(format!("{} $t0,$t1,{}", branch_mnemonic(*op), t_label));
                self.emit(format!("b {}", f_label));
            }
            _ => {
                self.gen_exp(exp);
                self.pop("$t0");
                self.emit(format!("bne $t0,$zero,{}", t_label));
                self.emit(format!("b {}", f_label));
            }
        }
    }

    fn gen_call(&mut self, call: &CallExp, want_value: bool) {
        for arg in &call.args {
            self.gen_exp(arg);
        }
        let name = &call.callee.name;
        if name == "main" {
            self.emit("jal main");
        } else {
            self.emit(format!("jal _{}", name));
        }
        if want_value {
            self.push("$v0");
        }
    }
}

fn is_relational_or_eq(op: BinOp) -> bool {
    matches!(
        op,
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
    )
}

fn branch_mnemonic(op: BinOp) -> &'static str {
    match op {
        BinOp::Eq => "beq",
        BinOp::Ne => "bne",
        BinOp::Lt => "blt",
        BinOp::Gt => "bgt",
        BinOp::Le => "ble",
        BinOp::Ge => "bge",
        _ => unreachable!("not a relational/equality operator"),
    }
}

fn value_mode_mnemonic(op: BinOp) -> &'static str {
    match op {
        BinOp::Plus => "add",
        BinOp::Minus => "sub",
        BinOp::Times => "mulo",
        BinOp::Divide => "div",
        BinOp::Eq => "seq",
        BinOp::Ne => "sne",
        BinOp::Lt => "slt",
        BinOp::Gt => "sgt",
        BinOp::Le => "sle",
        BinOp::Ge => "sge",
        BinOp::And | BinOp::Or => unreachable!("short-circuit ops have their own codegen path"),
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n").replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSink;
    use crate::parser::Parser;
    use crate::resolver::NameAnalyzer;
    use crate::typechecker::typecheck_program;

    fn compile(src: &str) -> String {
        let program = Parser::new(src).parse_program().expect("parses");
        let mut sink = DiagnosticSink::new();
        NameAnalyzer::new(&mut sink).analyze(&program);
        assert!(!sink.has_errors(), "{}", sink.render());
        typecheck_program(&program, &mut sink);
        assert!(!sink.has_errors(), "{}", sink.render());
        generate(&program)
    }

    #[test]
    fn hello_world_shape() {
        let asm = compile(r#"void main() { cout << "hi"; }"#);
        assert!(asm.contains(".asciiz \"hi\""));
        assert!(asm.contains("li $v0,4"));
        assert!(asm.contains("syscall"));
        assert!(asm.contains("li $v0,10"));
        assert!(asm.contains("main:"));
        assert!(asm.contains("__start:"));
    }

    #[test]
    fn global_gets_a_data_space_directive() {
        let asm = compile("int g; void main() { g = 1; }");
        assert!(asm.contains("_g: .space 4"));
        assert!(asm.contains("la $t0,_g"));
    }

    #[test]
    fn formal_offsets_are_negative_and_sequential() {
        let asm = compile("int add(int a, int b) { return a + b; } void main() { }");
        assert!(asm.contains("addu $t0,$fp,-4"));
        assert!(asm.contains("addu $t0,$fp,-8"));
    }

    #[test]
    fn struct_field_access_adds_its_offset() {
        let asm = compile(
            "struct A { int a; int b; } void main() { struct A s; s.b = 1; }",
        );
        assert!(asm.contains("addu $t0,$t0,4"));
    }

    #[test]
    fn non_main_function_uses_underscored_label_and_restores_frame() {
        let asm = compile("void f() { } void main() { f(); }");
        assert!(asm.contains("_f:"));
        assert!(asm.contains("jal _f"));
        assert!(asm.contains("jr $ra"));
    }

    #[test]
    fn while_loop_branches_back_to_its_own_top() {
        let asm = compile("void main() { bool b; b = true; while (b) { b = false; } }");
        let top_idx = asm.find("_L").expect("has a label");
        assert!(asm[top_idx..].contains("b _L"));
    }
}
