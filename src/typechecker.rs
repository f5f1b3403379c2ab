//! Type checker (C4).
//!
//! A post-order pass: every expression is assigned a `SemType` (stashed back
//! onto the `Exp` node via `Exp::set_ty`, so code generation can read it back
//! without re-deriving it) and every statement is checked against the
//! operator/statement rules in SPEC_FULL.md §4.4. Runs after name analysis has
//! bound every `Id`/`DotAccess`, so this phase never needs a symbol table of
//! its own — it only reads the bindings resolver.rs already filled in.
//!
//! On any error the offending (sub-)expression's type becomes `SemType::Error`,
//! and an operand already of type `Error` suppresses further complaints about
//! the operator that contains it — errors don't cascade across an already-
//! reported mistake (SPEC_FULL.md §7).

use crate::ast::*;
use crate::diagnostics::DiagnosticSink;
use crate::symtab::SemType;

pub fn typecheck_program(program: &Program, sink: &mut DiagnosticSink) {
    for decl in &program.decls {
        if let Decl::Fn(fd) = decl {
            typecheck_fn(fd, sink);
        }
    }
}

fn typecheck_fn(fd: &FnDecl, sink: &mut DiagnosticSink) {
    let ret_ty = fd.id.symbol().and_then(|s| s.as_function().map(|f| f.return_type.clone())).unwrap_or(SemType::Error);
    let mut ctx = FnCtx { ret_ty, sink };
    for stmt in &fd.body_stmts {
        ctx.check_stmt(stmt);
    }
}

struct FnCtx<'a> {
    ret_ty: SemType,
    sink: &'a mut DiagnosticSink,
}

impl<'a> FnCtx<'a> {
    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(a) => {
                check_assign(a, self.sink);
            }
            Stmt::PostInc(e, pos) | Stmt::PostDec(e, pos) => {
                let ty = self.check_exp(e);
                if !ty.is_error() && ty != SemType::Int {
                    self.sink.fatal(*pos, "Arithmetic operator applied to non-numeric operand");
                }
            }
            Stmt::Read(e) => {
                let ty = self.check_exp(e);
                emit_for_category(
                    &ty,
                    self.sink,
                    e.pos,
                    "Attempt to read a function",
                    "Attempt to read a struct name",
                    "Attempt to read a struct variable",
                    None,
                );
            }
            Stmt::Write(e) => {
                let ty = self.check_exp(e);
                emit_for_category(
                    &ty,
                    self.sink,
                    e.pos,
                    "Attempt to write a function",
                    "Attempt to write a struct name",
                    "Attempt to write a struct variable",
                    Some("Attempt to write void"),
                );
            }
            Stmt::Call(c) => {
                check_call(c, self.sink);
            }
            Stmt::If(cond, _, stmts) => {
                self.check_condition(cond);
                for s in stmts {
                    self.check_stmt(s);
                }
            }
            Stmt::IfElse(cond, _, tstmts, _, estmts) => {
                self.check_condition(cond);
                for s in tstmts {
                    self.check_stmt(s);
                }
                for s in estmts {
                    self.check_stmt(s);
                }
            }
            Stmt::While(cond, _, stmts) => {
                self.check_condition(cond);
                for s in stmts {
                    self.check_stmt(s);
                }
            }
            Stmt::Return(expr, pos) => self.check_return(expr.as_ref(), *pos),
        }
    }

    fn check_condition(&mut self, cond: &Exp) {
        let ty = self.check_exp(cond);
        if !ty.is_error() && ty != SemType::Bool {
            self.sink.fatal(cond.pos, "Non-bool expression used as an if/while condition");
        }
    }

    fn check_return(&mut self, expr: Option<&Exp>, pos: Pos) {
        match (&self.ret_ty, expr) {
            (SemType::Void, Some(e)) => {
                let _ = self.check_exp(e);
                self.sink.fatal(e.pos, "Return with a value in a void function");
            }
            (SemType::Void, None) => {}
            (_, None) => {
                self.sink.fatal(Pos::SYNTHETIC, "Missing return value");
            }
            (ret_ty, Some(e)) => {
                let ty = self.check_exp(e);
                if !ty.is_error() && !ret_ty.semantically_eq(&ty) {
                    self.sink.fatal(e.pos, "Bad return value");
                }
            }
        }
        let _ = pos;
    }

    fn check_exp(&mut self, exp: &Exp) -> SemType {
        let ty = eval_exp(exp, self.sink);
        exp.set_ty(ty.clone());
        ty
    }
}

/// Emits the matching "attempt to read/write a <category>" diagnostic for a
/// non-scalar type, or nothing for Int/Bool/String/Error. Shared by `Read` and
/// `Write` since their category lists differ only in whether `Void` is legal.
fn emit_for_category(
    ty: &SemType,
    sink: &mut DiagnosticSink,
    pos: Pos,
    fn_msg: &str,
    struct_name_msg: &str,
    struct_var_msg: &str,
    void_msg: Option<&str>,
) {
    match ty {
        SemType::Fn(..) => sink.fatal(pos, fn_msg),
        SemType::StructDecl(_) => sink.fatal(pos, struct_name_msg),
        SemType::StructVar(_) => sink.fatal(pos, struct_var_msg),
        SemType::Void => {
            if let Some(msg) = void_msg {
                sink.fatal(pos, msg);
            }
        }
        _ => {}
    }
}

fn check_assign(a: &AssignExp, sink: &mut DiagnosticSink) -> SemType {
    let lty = eval_exp(&a.lhs, sink);
    a.lhs.set_ty(lty.clone());
    let rty = eval_exp(&a.rhs, sink);
    a.rhs.set_ty(rty.clone());
    if lty.is_error() || rty.is_error() {
        return SemType::Error;
    }
    if lty.semantically_eq(&rty) {
        match &lty {
            SemType::Fn(..) => {
                sink.fatal(a.pos, "Function assignment");
                return SemType::Error;
            }
            SemType::StructDecl(_) => {
                sink.fatal(a.pos, "Struct name assignment");
                return SemType::Error;
            }
            SemType::StructVar(_) => {
                sink.fatal(a.pos, "Struct variable assignment");
                return SemType::Error;
            }
            _ => return lty,
        }
    }
    sink.fatal(a.pos, "Type mismatch");
    SemType::Error
}

fn check_call(c: &CallExp, sink: &mut DiagnosticSink) -> SemType {
    let arg_types: Vec<SemType> = c.args.iter().map(|a| eval_exp(a, sink)).collect();
    for (arg, ty) in c.args.iter().zip(&arg_types) {
        arg.set_ty(ty.clone());
    }
    let Some(sym) = c.callee.symbol() else {
        // Name analysis already reported "Undeclared identifier"; don't cascade.
        return SemType::Error;
    };
    let Some(func) = sym.as_function() else {
        sink.fatal(c.callee.pos, "Attempt to call a non-function");
        return SemType::Error;
    };
    if func.params.len() != c.args.len() {
        sink.fatal(c.pos, "Function call with wrong number of args");
        return func.return_type.clone();
    }
    for (arg, (actual_ty, formal_ty)) in c
        .args
        .iter()
        .zip(arg_types.iter().zip(func.params.iter()))
    {
        if actual_ty.is_error() {
            continue;
        }
        // Struct-by-value has no representation in this compiler's one-word-
        // per-expression operand stack (SPEC_FULL.md §4.5a/§8), so a struct-
        // typed argument is never a legal actual, matching formal or not.
        if matches!(actual_ty, SemType::StructVar(_)) || !actual_ty.semantically_eq(formal_ty) {
            sink.fatal(arg.pos, "Type of actual does not match type of formal");
        }
    }
    func.return_type.clone()
}

fn eval_binop(
    op: BinOp,
    l: &Exp,
    r: &Exp,
    pos: Pos,
    sink: &mut DiagnosticSink,
) -> SemType {
    let lty = eval_exp(l, sink);
    l.set_ty(lty.clone());
    let rty = eval_exp(r, sink);
    r.set_ty(rty.clone());

    match op {
        BinOp::Plus | BinOp::Minus | BinOp::Times | BinOp::Divide => {
            check_operand_numeric(&lty, l.pos, sink);
            check_operand_numeric(&rty, r.pos, sink);
            SemType::Int
        }
        BinOp::And | BinOp::Or => {
            check_operand_bool(&lty, l.pos, sink);
            check_operand_bool(&rty, r.pos, sink);
            SemType::Bool
        }
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
            check_operand_relational(&lty, l.pos, sink);
            check_operand_relational(&rty, r.pos, sink);
            SemType::Bool
        }
        BinOp::Eq | BinOp::Ne => check_equality(&lty, &rty, pos, sink),
    }
}

fn check_operand_numeric(ty: &SemType, pos: Pos, sink: &mut DiagnosticSink) {
    if !ty.is_error() && *ty != SemType::Int {
        sink.fatal(pos, "Arithmetic operator applied to non-numeric operand");
    }
}

fn check_operand_bool(ty: &SemType, pos: Pos, sink: &mut DiagnosticSink) {
    if !ty.is_error() && *ty != SemType::Bool {
        sink.fatal(pos, "Logical operator applied to non-bool operand");
    }
}

fn check_operand_relational(ty: &SemType, pos: Pos, sink: &mut DiagnosticSink) {
    if !ty.is_error() && *ty != SemType::Int {
        sink.fatal(pos, "Relational operator applied to non-numeric operand");
    }
}

fn check_equality(lty: &SemType, rty: &SemType, pos: Pos, sink: &mut DiagnosticSink) -> SemType {
    if lty.is_error() || rty.is_error() {
        return SemType::Error;
    }
    // Void only ever arises from calling a void-returning function, so a pair
    // of Void operands is exactly the "two void function calls" shape.
    if *lty == SemType::Void && *rty == SemType::Void {
        sink.fatal(pos, "Equality operator applied to void functions");
        return SemType::Error;
    }
    if matches!(lty, SemType::Fn(..)) && matches!(rty, SemType::Fn(..)) {
        sink.fatal(pos, "Equality operator applied to functions");
        return SemType::Error;
    }
    if matches!(lty, SemType::StructDecl(_)) && matches!(rty, SemType::StructDecl(_)) {
        sink.fatal(pos, "Equality operator applied to struct names");
        return SemType::Error;
    }
    if matches!(lty, SemType::StructVar(_)) && matches!(rty, SemType::StructVar(_)) {
        sink.fatal(pos, "Equality operator applied to struct variables");
        return SemType::Error;
    }
    if !lty.semantically_eq(rty) {
        sink.fatal(pos, "Type mismatch");
        return SemType::Error;
    }
    SemType::Bool
}

fn eval_exp(exp: &Exp, sink: &mut DiagnosticSink) -> SemType {
    let ty = match &exp.kind {
        ExpKind::IntLit(..) => SemType::Int,
        ExpKind::StrLit(..) => SemType::String,
        ExpKind::True | ExpKind::False => SemType::Bool,
        ExpKind::Id(id) => id.symbol().map(|s| s.sem_type()).unwrap_or(SemType::Error),
        ExpKind::DotAccess(loc, _field, field_slot) => {
            let _ = eval_exp(loc, sink);
            field_slot
                .borrow()
                .clone()
                .map(|s| s.sem_type())
                .unwrap_or(SemType::Error)
        }
        ExpKind::Assign(a) => check_assign(a, sink),
        ExpKind::Call(c) => check_call(c, sink),
        ExpKind::UnaryMinus(e) => {
            let ty = eval_exp(e, sink);
            e.set_ty(ty.clone());
            check_operand_numeric(&ty, e.pos, sink);
            SemType::Int
        }
        ExpKind::Not(e) => {
            let ty = eval_exp(e, sink);
            e.set_ty(ty.clone());
            check_operand_bool(&ty, e.pos, sink);
            SemType::Bool
        }
        ExpKind::Bin(op, l, r) => eval_binop(*op, l, r, exp.pos, sink),
    };
    exp.set_ty(ty.clone());
    ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::NameAnalyzer;

    fn check(src: &str) -> DiagnosticSink {
        let program = Parser::new(src).parse_program().expect("parses");
        let mut sink = DiagnosticSink::new();
        NameAnalyzer::new(&mut sink).analyze(&program);
        assert!(!sink.has_errors(), "unexpected name-analysis errors: {}", sink.render());
        typecheck_program(&program, &mut sink);
        sink
    }

    #[test]
    fn void_return_mismatch() {
        let sink = check("void main() { return 1; }");
        assert_eq!(sink.diagnostics().len(), 1);
        assert_eq!(
            sink.diagnostics()[0].message,
            "Return with a value in a void function"
        );
    }

    #[test]
    fn missing_return_value() {
        let sink = check("int f() { } void main() { }");
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message == "Missing return value" && d.pos == Pos::SYNTHETIC));
    }

    #[test]
    fn arithmetic_on_bool_is_rejected() {
        let sink = check("void main() { bool b; int x; b = true; x = 1 + b; }");
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message == "Arithmetic operator applied to non-numeric operand"));
    }

    #[test]
    fn if_condition_must_be_bool() {
        let sink = check("void main() { if (1) { } }");
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message == "Non-bool expression used as an if/while condition"));
    }

    #[test]
    fn call_arity_mismatch() {
        let sink = check("int f(int a) { return a; } void main() { f(1, 2); }");
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message == "Function call with wrong number of args"));
    }

    #[test]
    fn struct_variable_assignment_is_rejected() {
        let sink = check(
            "struct A { int f; } void main() { struct A a; struct A b; a = b; }",
        );
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message == "Struct variable assignment"));
    }

    #[test]
    fn struct_valued_call_argument_is_rejected() {
        let sink = check(
            "struct A { int f; } \
             int useA(struct A a) { return a.f; } \
             void main() { struct A s; useA(s); }",
        );
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message == "Type of actual does not match type of formal"));
    }

    #[test]
    fn well_typed_program_has_no_diagnostics() {
        let sink = check(
            "struct A { int f; } \
             int add(int a, int b) { return a + b; } \
             void main() { struct A s; s.f = add(1, 2); if (s.f > 0) { cout << s.f; } }",
        );
        assert!(!sink.has_errors(), "{}", sink.render());
    }
}
