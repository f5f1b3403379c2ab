//! Name analyser (C3).
//!
//! Binds every `Id`/`DotAccess` node to a symbol, assigns frame offsets to
//! locals and formals as they're declared, and records every semantic
//! diagnostic this phase is responsible for. Mutates the AST in place (fills
//! binding slots) and returns nothing but the diagnostics it recorded into the
//! shared sink — the driver checks `sink.has_errors()` before moving on to type
//! checking (SPEC_FULL.md §2).

use crate::ast::*;
use crate::diagnostics::DiagnosticSink;
use crate::symtab::{
    FunctionSymbol, ScopeGuard, SemType, StructSymbol, Storage, Symbol, SymbolTable,
    VariableSymbol,
};
use std::rc::Rc;

/// Tracks the next free byte offset for locals within a single function body.
/// Shared across every nested `if`/`while` block in that function: this
/// compiler does not reuse stack slots between sibling blocks (SPEC_FULL.md
/// §4.5a) — it's simpler and correctness doesn't depend on reuse.
struct FrameLayout {
    base: i32,
    used: i32,
}

impl FrameLayout {
    fn new(formals_size: i32) -> Self {
        FrameLayout {
            base: -(formals_size + 8),
            used: 0,
        }
    }

    fn alloc(&mut self, size: i32) -> i32 {
        self.used += size;
        self.base - self.used
    }

    fn total_size(&self) -> i32 {
        self.used
    }
}

pub struct NameAnalyzer<'a> {
    table: SymbolTable,
    sink: &'a mut DiagnosticSink,
    saw_main: bool,
}

impl<'a> NameAnalyzer<'a> {
    pub fn new(sink: &'a mut DiagnosticSink) -> Self {
        NameAnalyzer {
            table: SymbolTable::new(),
            sink,
            saw_main: false,
        }
    }

    pub fn analyze(mut self, program: &Program) {
        for decl in &program.decls {
            self.analyze_top_decl(decl);
        }
        if !self.saw_main {
            self.sink.fatal(Pos::SYNTHETIC, "No main function");
        }
    }

    fn analyze_top_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(vd) => {
                self.declare_var(vd, Storage::Global, None);
            }
            Decl::Struct(sd) => self.declare_struct(sd),
            Decl::Fn(fd) => self.declare_fn(fd),
        }
    }

    /// Resolves the semantic type named by a surface `TypeExpr`, emitting the
    /// type-validity diagnostics (`Non-function declared void`,
    /// `Invalid name of struct type`) as a side effect.
    fn resolve_type(&mut self, ty: &TypeExpr, void_is_error: bool, pos: Pos) -> SemType {
        resolve_type_in(&mut self.table, self.sink, ty, void_is_error, pos)
    }

    /// Declares one `VarDecl` in the current innermost scope. `layout` is
    /// `Some` for locals/formals (to assign a frame offset) and `None` for
    /// globals (which need none — they're addressed by label).
    fn declare_var(&mut self, vd: &VarDecl, storage: Storage, layout: Option<&mut FrameLayout>) {
        let sem_ty = self.resolve_type(&vd.ty, true, vd.id.pos);
        let size = sem_ty.byte_size();
        let offset = match (&storage, layout) {
            (Storage::Local, Some(layout)) => layout.alloc(size),
            (Storage::Global, _) => 0,
            _ => unreachable!("declare_var is only called with Global or Local storage"),
        };
        let sym = Rc::new(Symbol::Variable(VariableSymbol {
            name: vd.id.name.clone(),
            ty: sem_ty,
            storage,
            offset,
            size,
        }));
        match self.table.declare(&vd.id.name, sym.clone()) {
            Ok(()) => vd.id.bind(sym),
            Err(_) => self.sink.fatal(vd.id.pos, "Multiply declared identifier"),
        }
    }

    fn declare_struct(&mut self, sd: &StructDecl) {
        // Fields live in an isolated table: they do not see the enclosing
        // lexical scope, and the enclosing scope does not see them either.
        // `StructRef` fields are still resolved against the *global* scope.
        let mut fields = Vec::with_capacity(sd.fields.len());
        let mut seen = std::collections::HashSet::new();
        let mut offset = 0i32;
        for f in &sd.fields {
            let sem_ty = self.resolve_type(&f.ty, true, f.id.pos);
            let size = sem_ty.byte_size();
            if !seen.insert(f.id.name.clone()) {
                self.sink.fatal(f.id.pos, "Multiply declared identifier");
                continue;
            }
            let sym = Rc::new(Symbol::Variable(VariableSymbol {
                name: f.id.name.clone(),
                ty: sem_ty,
                storage: Storage::Field,
                offset,
                size,
            }));
            f.id.bind(sym.clone());
            fields.push((f.id.name.clone(), sym));
            offset += size;
        }
        let total_size = offset;
        let struct_sym = Rc::new(Symbol::Struct(Rc::new(StructSymbol {
            name: sd.id.name.clone(),
            fields,
            total_size,
        })));
        match self.table.declare(&sd.id.name, struct_sym.clone()) {
            Ok(()) => sd.id.bind(struct_sym),
            Err(_) => self.sink.fatal(sd.id.pos, "Multiply declared identifier"),
        }
    }

    fn declare_fn(&mut self, fd: &FnDecl) {
        if fd.id.name == "main" {
            self.saw_main = true;
        }
        let ret_ty = self.resolve_type(&fd.ret_ty, false, fd.id.pos);
        // Formal types only need global lookups (struct names), so they can be
        // computed before the new scope is open — letting the function symbol
        // carry its full signature before the body (which may call it
        // recursively) is analysed.
        let param_types: Vec<SemType> = fd
            .formals
            .iter()
            .map(|f| self.resolve_type(&f.ty, true, f.id.pos))
            .collect();
        let fn_sym = Rc::new(Symbol::Function(FunctionSymbol {
            name: fd.id.name.clone(),
            return_type: ret_ty.clone(),
            params: param_types.clone(),
        }));
        match self.table.declare(&fd.id.name, fn_sym.clone()) {
            Ok(()) => fd.id.bind(fn_sym),
            Err(_) => self.sink.fatal(fd.id.pos, "Multiply declared identifier"),
        }

        let mut guard = ScopeGuard::open(&mut self.table);
        let table = guard.table();

        // Formal i (declaration/push order) sits at fp - (size_1 + ... + size_i):
        // the caller pushes formals left to right, so the first-pushed formal
        // ends up at the highest address, just below $fp, and each later
        // formal reserves its own byte size below that — the same rule locals
        // use, generalized from the scalar-only `-4*i` case.
        let mut cum = 0i32;
        for formal in &fd.formals {
            let sem_ty = resolve_type_in(table, self.sink, &formal.ty, true, formal.id.pos);
            let size = sem_ty.byte_size();
            cum += size;
            let offset = -cum;
            let sym = Rc::new(Symbol::Variable(VariableSymbol {
                name: formal.id.name.clone(),
                ty: sem_ty,
                storage: Storage::Local,
                offset,
                size,
            }));
            match table.declare(&formal.id.name, sym.clone()) {
                Ok(()) => formal.id.bind(sym),
                Err(_) => self.sink.fatal(formal.id.pos, "Multiply declared identifier"),
            }
        }
        fd.formals_size.set(cum);

        let mut layout = FrameLayout::new(cum);
        for vd in &fd.body_decls {
            declare_local(table, self.sink, vd, &mut layout);
        }
        let mut ctx = BodyCtx {
            table,
            sink: self.sink,
            ret_ty: &ret_ty,
            layout: &mut layout,
        };
        for stmt in &fd.body_stmts {
            ctx.analyze_stmt(stmt);
        }
        fd.frame_size.set(layout.total_size());
    }
}

fn resolve_type_in(
    table: &mut SymbolTable,
    sink: &mut DiagnosticSink,
    ty: &TypeExpr,
    void_is_error: bool,
    pos: Pos,
) -> SemType {
    match ty {
        TypeExpr::Int => SemType::Int,
        TypeExpr::Bool => SemType::Bool,
        TypeExpr::Void => {
            if void_is_error {
                sink.fatal(pos, "Non-function declared void");
            }
            SemType::Error
        }
        TypeExpr::StructRef(sid) => match table.find_global(&sid.name) {
            Some(sym) => match sym.as_struct() {
                Some(st) => {
                    sid.bind(sym.clone());
                    SemType::StructVar(st.clone())
                }
                None => {
                    sink.fatal(sid.pos, "Invalid name of struct type");
                    SemType::Error
                }
            },
            None => {
                sink.fatal(sid.pos, "Invalid name of struct type");
                SemType::Error
            }
        },
    }
}

fn declare_local(
    table: &mut SymbolTable,
    sink: &mut DiagnosticSink,
    vd: &VarDecl,
    layout: &mut FrameLayout,
) {
    let sem_ty = resolve_type_in(table, sink, &vd.ty, true, vd.id.pos);
    let size = sem_ty.byte_size();
    let offset = layout.alloc(size);
    let sym = Rc::new(Symbol::Variable(VariableSymbol {
        name: vd.id.name.clone(),
        ty: sem_ty,
        storage: Storage::Local,
        offset,
        size,
    }));
    match table.declare(&vd.id.name, sym.clone()) {
        Ok(()) => vd.id.bind(sym),
        Err(_) => sink.fatal(vd.id.pos, "Multiply declared identifier"),
    }
}

/// Threaded through statement/expression analysis within one function body.
struct BodyCtx<'a> {
    table: &'a mut SymbolTable,
    sink: &'a mut DiagnosticSink,
    ret_ty: &'a SemType,
    layout: &'a mut FrameLayout,
}

impl<'a> BodyCtx<'a> {
    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(a) => {
                self.analyze_exp(&a.lhs);
                self.analyze_exp(&a.rhs);
            }
            Stmt::PostInc(e, _) | Stmt::PostDec(e, _) => self.analyze_exp(e),
            Stmt::Read(e) | Stmt::Write(e) => self.analyze_exp(e),
            Stmt::Call(c) => self.analyze_call(c),
            Stmt::Return(Some(e), _) => self.analyze_exp(e),
            Stmt::Return(None, _) => {}
            Stmt::If(cond, decls, stmts) => {
                self.analyze_exp(cond);
                self.analyze_block(decls, stmts);
            }
            Stmt::IfElse(cond, tdecls, tstmts, edecls, estmts) => {
                self.analyze_exp(cond);
                self.analyze_block(tdecls, tstmts);
                self.analyze_block(edecls, estmts);
            }
            Stmt::While(cond, decls, stmts) => {
                self.analyze_exp(cond);
                self.analyze_block(decls, stmts);
            }
        }
    }

    fn analyze_block(&mut self, decls: &[VarDecl], stmts: &[Stmt]) {
        let depth_before = self.table.depth();
        {
            let mut guard = ScopeGuard::open(self.table);
            let table = guard.table();
            for vd in decls {
                declare_local(table, self.sink, vd, self.layout);
            }
            // Analyze statements with the guard still open so this block's
            // own declarations are visible to them.
            let mut inner = BodyCtx {
                table,
                sink: self.sink,
                ret_ty: self.ret_ty,
                layout: self.layout,
            };
            for stmt in stmts {
                inner.analyze_stmt(stmt);
            }
        }
        debug_assert_eq!(self.table.depth(), depth_before);
    }

    fn analyze_call(&mut self, call: &CallExp) {
        match self.table.find(&call.callee.name) {
            Some(sym) => call.callee.bind(sym),
            None => self.sink.fatal(call.callee.pos, "Undeclared identifier"),
        }
        for arg in &call.args {
            self.analyze_exp(arg);
        }
    }

    fn analyze_exp(&mut self, exp: &Exp) {
        match &exp.kind {
            ExpKind::IntLit(..) | ExpKind::StrLit(..) | ExpKind::True | ExpKind::False => {}
            ExpKind::Id(id) => match self.table.find(&id.name) {
                Some(sym) => id.bind(sym),
                None => self.sink.fatal(id.pos, "Undeclared identifier"),
            },
            ExpKind::DotAccess(loc, field, field_slot) => {
                self.analyze_exp(loc);
                if !loc.is_dottable_shape() {
                    self.sink.fatal(field.pos, "Dot-access of non-struct type");
                    return;
                }
                let struct_sym = match &loc.kind {
                    ExpKind::Id(id) => id.symbol().and_then(|s| struct_of(&s)),
                    ExpKind::DotAccess(_, _, slot) => {
                        slot.borrow().clone().and_then(|s| struct_of(&s))
                    }
                    _ => None,
                };
                match struct_sym {
                    Some(st) => match st.find_field(&field.name) {
                        Some(fsym) => {
                            field.bind(fsym.clone());
                            *field_slot.borrow_mut() = Some(fsym);
                        }
                        None => self.sink.fatal(field.pos, "Invalid struct field name"),
                    },
                    None => self.sink.fatal(field.pos, "Dot-access of non-struct type"),
                }
            }
            ExpKind::Assign(a) => {
                self.analyze_exp(&a.lhs);
                self.analyze_exp(&a.rhs);
            }
            ExpKind::Call(c) => self.analyze_call(c),
            ExpKind::UnaryMinus(e) | ExpKind::Not(e) => self.analyze_exp(e),
            ExpKind::Bin(_, l, r) => {
                self.analyze_exp(l);
                self.analyze_exp(r);
            }
        }
    }
}

/// If `sym` is a variable of struct type, returns the struct it's an instance
/// of (the table to continue a dot-access chain into).
fn struct_of(sym: &Rc<Symbol>) -> Option<Rc<StructSymbol>> {
    match sym.as_variable()?.ty {
        SemType::StructVar(ref st) => Some(st.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze(src: &str) -> DiagnosticSink {
        let program = Parser::new(src).parse_program().expect("parses");
        let mut sink = DiagnosticSink::new();
        NameAnalyzer::new(&mut sink).analyze(&program);
        sink
    }

    #[test]
    fn missing_main_is_fatal() {
        let sink = analyze("int g;");
        assert_eq!(sink.render(), "0:0 ***ERROR*** No main function");
    }

    #[test]
    fn duplicate_local_reported_once_at_second_site() {
        let sink = analyze("void main() { int x; int x; }");
        assert_eq!(sink.diagnostics().len(), 1);
        assert_eq!(sink.diagnostics()[0].message, "Multiply declared identifier");
    }

    #[test]
    fn struct_field_chain_binds_cleanly() {
        let sink = analyze(
            "struct A { int f; } \
             struct B { struct A a; } \
             void main() { struct B b; b.a.f = 1; }",
        );
        assert!(!sink.has_errors(), "{}", sink.render());
    }

    #[test]
    fn dot_access_on_scalar_is_rejected() {
        let sink = analyze("void main() { int x; x.f = 1; }");
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.message == "Dot-access of non-struct type"));
    }

    #[test]
    fn undeclared_identifier_is_reported() {
        let sink = analyze("void main() { y = 1; }");
        assert_eq!(sink.diagnostics()[0].message, "Undeclared identifier");
    }

    #[test]
    fn formals_get_negative_sequential_offsets() {
        let program = Parser::new("void f(int a, int b) { } void main() { }")
            .parse_program()
            .unwrap();
        let mut sink = DiagnosticSink::new();
        NameAnalyzer::new(&mut sink).analyze(&program);
        assert!(!sink.has_errors());
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected fn decl")
        };
        let a = f.formals[0].id.symbol().unwrap();
        let b = f.formals[1].id.symbol().unwrap();
        assert_eq!(a.as_variable().unwrap().offset, -4);
        assert_eq!(b.as_variable().unwrap().offset, -8);
    }

    #[test]
    fn struct_valued_formal_gets_its_own_byte_size_not_a_fixed_stride() {
        let program = Parser::new(
            "struct A { int f; int g; } \
             int useA(struct A a, int b) { return b; } \
             void main() { }",
        )
        .parse_program()
        .unwrap();
        let mut sink = DiagnosticSink::new();
        NameAnalyzer::new(&mut sink).analyze(&program);
        assert!(!sink.has_errors(), "{}", sink.render());
        let Decl::Fn(f) = &program.decls[1] else {
            panic!("expected fn decl")
        };
        let a = f.formals[0].id.symbol().unwrap();
        let b = f.formals[1].id.symbol().unwrap();
        // `a` is an 8-byte struct, so `b` starts 8 bytes below $fp, not 4.
        assert_eq!(a.as_variable().unwrap().offset, -8);
        assert_eq!(b.as_variable().unwrap().offset, -12);
        assert_eq!(f.formals_size.get(), 12);
    }

    #[test]
    fn recursive_call_resolves_to_its_own_function_symbol() {
        let sink = analyze("void main() { } int fact(int n) { return fact(n); }");
        assert!(!sink.has_errors(), "{}", sink.render());
    }
}
