//! Abstract syntax tree for the language.
//!
//! A plain sum-of-products tree: declarations, statements, expressions as tagged
//! enums. Every leaf carries a source position. `Id` and `DotAccess` nodes carry a
//! binding slot that name analysis (`crate::resolver`) fills in; the slot holds a
//! clone of the `Rc<Symbol>` that also lives in the symbol table, never an owning
//! AST-to-AST edge (struct-type references are by name, resolved through the symbol
//! table, not by pointing at the `StructDecl` node).

use crate::symtab::Symbol;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// 1-indexed source position. `(0, 0)` is reserved for synthetic diagnostics that
/// have no single anchoring token (e.g. "No main function").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Self {
        Pos { line, col }
    }

    pub const SYNTHETIC: Pos = Pos { line: 0, col: 0 };
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The surface type syntax as written by the programmer (`int`, `bool`, `void`,
/// `struct Name`). Distinct from `crate::symtab::SemType`, which is the resolved
/// semantic type assigned once name analysis has looked up struct names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Int,
    Bool,
    Void,
    StructRef(Id),
}

/// An identifier reference. `symbol` starts empty and is filled by name analysis.
#[derive(Debug, Clone)]
pub struct Id {
    pub name: String,
    pub pos: Pos,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

impl Id {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Id {
            name: name.into(),
            pos,
            symbol: RefCell::new(None),
        }
    }

    pub fn symbol(&self) -> Option<Rc<Symbol>> {
        self.symbol.borrow().clone()
    }

    pub fn bind(&self, sym: Rc<Symbol>) {
        *self.symbol.borrow_mut() = Some(sym);
    }
}

// `Id` instances are compared by name/position only; the binding slot is populated
// in place during name analysis and shouldn't affect structural equality in tests.
impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.pos == other.pos
    }
}
impl Eq for Id {}

#[derive(Debug)]
pub struct Program {
    pub decls: Vec<Decl>,
}

impl Program {
    /// A structural pretty-print of the (bound, typed) AST — a debugging aid
    /// for inspecting what name analysis and type checking actually bound,
    /// not a faithful reconstruction of the original source formatting.
    pub fn unparse(&self) -> String {
        let mut out = String::new();
        for decl in &self.decls {
            unparse_decl(decl, &mut out);
        }
        out
    }
}

fn unparse_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Int => "int".to_string(),
        TypeExpr::Bool => "bool".to_string(),
        TypeExpr::Void => "void".to_string(),
        TypeExpr::StructRef(id) => format!("struct {}", id.name),
    }
}

fn unparse_var_decl(vd: &VarDecl) -> String {
    format!("{} {};", unparse_type(&vd.ty), vd.id.name)
}

fn unparse_decl(decl: &Decl, out: &mut String) {
    match decl {
        Decl::Var(vd) => {
            out.push_str(&unparse_var_decl(vd));
            out.push('\n');
        }
        Decl::Struct(sd) => {
            out.push_str(&format!("struct {} {{\n", sd.id.name));
            for f in &sd.fields {
                out.push_str("  ");
                out.push_str(&unparse_var_decl(f));
                out.push('\n');
            }
            out.push_str("};\n");
        }
        Decl::Fn(fd) => {
            let formals = fd
                .formals
                .iter()
                .map(|f| format!("{} {}", unparse_type(&f.ty), f.id.name))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "{} {}({}) {{\n",
                unparse_type(&fd.ret_ty),
                fd.id.name,
                formals
            ));
            for vd in &fd.body_decls {
                out.push_str("  ");
                out.push_str(&unparse_var_decl(vd));
                out.push('\n');
            }
            for stmt in &fd.body_stmts {
                unparse_stmt(stmt, 1, out);
            }
            out.push_str("}\n");
        }
    }
}

fn indent(n: usize, out: &mut String) {
    for _ in 0..n {
        out.push_str("  ");
    }
}

fn unparse_block(decls: &[VarDecl], stmts: &[Stmt], depth: usize, out: &mut String) {
    out.push_str("{\n");
    for vd in decls {
        indent(depth + 1, out);
        out.push_str(&unparse_var_decl(vd));
        out.push('\n');
    }
    for stmt in stmts {
        unparse_stmt(stmt, depth + 1, out);
    }
    indent(depth, out);
    out.push_str("}\n");
}

fn unparse_stmt(stmt: &Stmt, depth: usize, out: &mut String) {
    indent(depth, out);
    match stmt {
        Stmt::Assign(a) => out.push_str(&format!(
            "{} = {};\n",
            unparse_exp(&a.lhs),
            unparse_exp(&a.rhs)
        )),
        Stmt::PostInc(e, _) => out.push_str(&format!("{}++;\n", unparse_exp(e))),
        Stmt::PostDec(e, _) => out.push_str(&format!("{}--;\n", unparse_exp(e))),
        Stmt::Read(e) => out.push_str(&format!("cin >> {};\n", unparse_exp(e))),
        Stmt::Write(e) => out.push_str(&format!("cout << {};\n", unparse_exp(e))),
        Stmt::Call(c) => out.push_str(&format!("{};\n", unparse_call(c))),
        Stmt::Return(Some(e), _) => out.push_str(&format!("return {};\n", unparse_exp(e))),
        Stmt::Return(None, _) => out.push_str("return;\n"),
        Stmt::If(cond, decls, stmts) => {
            out.push_str(&format!("if ({}) ", unparse_exp(cond)));
            unparse_block(decls, stmts, depth, out);
        }
        Stmt::IfElse(cond, tdecls, tstmts, edecls, estmts) => {
            out.push_str(&format!("if ({}) ", unparse_exp(cond)));
            unparse_block(tdecls, tstmts, depth, out);
            indent(depth, out);
            out.push_str("else ");
            unparse_block(edecls, estmts, depth, out);
        }
        Stmt::While(cond, decls, stmts) => {
            out.push_str(&format!("while ({}) ", unparse_exp(cond)));
            unparse_block(decls, stmts, depth, out);
        }
    }
}

fn unparse_call(c: &CallExp) -> String {
    let args = c.args.iter().map(unparse_exp).collect::<Vec<_>>().join(", ");
    format!("{}({})", c.callee.name, args)
}

fn unparse_exp(exp: &Exp) -> String {
    match &exp.kind {
        ExpKind::IntLit(n) => n.to_string(),
        ExpKind::StrLit(s) => format!("{:?}", s),
        ExpKind::True => "true".to_string(),
        ExpKind::False => "false".to_string(),
        ExpKind::Id(id) => id.name.clone(),
        ExpKind::DotAccess(loc, field, _) => format!("{}.{}", unparse_exp(loc), field.name),
        ExpKind::Assign(a) => format!("({} = {})", unparse_exp(&a.lhs), unparse_exp(&a.rhs)),
        ExpKind::Call(c) => unparse_call(c),
        ExpKind::UnaryMinus(e) => format!("(-{})", unparse_exp(e)),
        ExpKind::Not(e) => format!("(!{})", unparse_exp(e)),
        ExpKind::Bin(op, l, r) => format!("({} {} {})", unparse_exp(l), binop_str(*op), unparse_exp(r)),
    }
}

fn binop_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Plus => "+",
        BinOp::Minus => "-",
        BinOp::Times => "*",
        BinOp::Divide => "/",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Le => "<=",
        BinOp::Ge => ">=",
    }
}

#[derive(Debug)]
pub enum Decl {
    Var(VarDecl),
    Fn(FnDecl),
    Struct(StructDecl),
}

#[derive(Debug)]
pub struct VarDecl {
    pub ty: TypeExpr,
    pub id: Id,
}

#[derive(Debug)]
pub struct FnDecl {
    pub ret_ty: TypeExpr,
    pub id: Id,
    pub formals: Vec<VarDecl>,
    pub body_decls: Vec<VarDecl>,
    pub body_stmts: Vec<Stmt>,
    /// Total bytes reserved for locals (including ones declared inside nested
    /// `if`/`while` blocks), filled in by name analysis once the whole body
    /// has been walked. Codegen uses it to size the prologue's `subu $sp`.
    pub frame_size: Cell<i32>,
    /// Total bytes the formals occupy on the caller's side of `$fp`, filled in
    /// by name analysis alongside their offsets. Not simply `4 * formals.len()`:
    /// a struct-valued formal reserves its own byte size, same as a local.
    pub formals_size: Cell<i32>,
}

#[derive(Debug)]
pub struct StructDecl {
    pub id: Id,
    pub fields: Vec<VarDecl>,
}

#[derive(Debug)]
pub enum Stmt {
    Assign(AssignExp),
    PostInc(Exp, Pos),
    PostDec(Exp, Pos),
    Read(Exp),
    Write(Exp),
    If(Exp, Vec<VarDecl>, Vec<Stmt>),
    IfElse(Exp, Vec<VarDecl>, Vec<Stmt>, Vec<VarDecl>, Vec<Stmt>),
    While(Exp, Vec<VarDecl>, Vec<Stmt>),
    Call(CallExp),
    Return(Option<Exp>, Pos),
}

#[derive(Debug)]
pub struct AssignExp {
    pub lhs: Exp,
    pub rhs: Exp,
    pub pos: Pos,
}

#[derive(Debug)]
pub struct CallExp {
    pub callee: Id,
    pub args: Vec<Exp>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Minus,
    Times,
    Divide,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug)]
pub enum ExpKind {
    IntLit(i32),
    StrLit(String),
    True,
    False,
    Id(Id),
    DotAccess(Box<Exp>, Id, RefCell<Option<Rc<Symbol>>>),
    Assign(Box<AssignExp>),
    Call(Box<CallExp>),
    UnaryMinus(Box<Exp>),
    Not(Box<Exp>),
    Bin(BinOp, Box<Exp>, Box<Exp>),
}

/// An expression node. `ty` starts at `Error` and is filled in by the type
/// checker (C4) in the same post-order pass that validates operator typing;
/// code generation reads it back to decide things like which `Write` syscall
/// to emit. Keeping it out of `ExpKind` means every arm of a match on the kind
/// doesn't have to thread a type slot through by hand.
#[derive(Debug)]
pub struct Exp {
    pub kind: ExpKind,
    pub pos: Pos,
    pub ty: RefCell<crate::symtab::SemType>,
}

impl Exp {
    pub fn new(kind: ExpKind, pos: Pos) -> Self {
        Exp {
            kind,
            pos,
            ty: RefCell::new(crate::symtab::SemType::Error),
        }
    }

    pub fn ty(&self) -> crate::symtab::SemType {
        self.ty.borrow().clone()
    }

    pub fn set_ty(&self, ty: crate::symtab::SemType) {
        *self.ty.borrow_mut() = ty;
    }

    /// `true` for the AST shapes name analysis allows as the `loc` of a DotAccess:
    /// a bare identifier or another dot-access chain.
    pub fn is_dottable_shape(&self) -> bool {
        matches!(self.kind, ExpKind::Id(_) | ExpKind::DotAccess(..))
    }
}
