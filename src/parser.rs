//! Lexer and recursive-descent parser (C0).
//!
//! No generator: a hand-written scanner produces a flat token stream up
//! front, then `Parser` consumes it with one token of lookahead. Every
//! token carries the `(line, col)` it started at, 1-indexed, so syntax
//! errors can be reported in the same `line:col ***ERROR*** message` shape
//! the rest of the pipeline uses.

use crate::ast::*;
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    IntLit(i32),
    StrLit(String),
    KwStruct,
    KwInt,
    KwBool,
    KwVoid,
    KwMain,
    KwCin,
    KwCout,
    KwIf,
    KwElse,
    KwWhile,
    KwReturn,
    KwTrue,
    KwFalse,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Semi,
    Comma,
    Dot,
    Assign,
    PlusPlus,
    MinusMinus,
    ShiftIn,
    ShiftOut,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Eof,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'/') {
                        while !matches!(self.peek(), None | Some('\n')) {
                            self.bump();
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_all(mut self) -> Result<Vec<(Tok, Pos)>, String> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            let pos = self.pos();
            let Some(c) = self.peek() else {
                out.push((Tok::Eof, pos));
                return Ok(out);
            };
            let tok = match c {
                '{' => {
                    self.bump();
                    Tok::LBrace
                }
                '}' => {
                    self.bump();
                    Tok::RBrace
                }
                '(' => {
                    self.bump();
                    Tok::LParen
                }
                ')' => {
                    self.bump();
                    Tok::RParen
                }
                ';' => {
                    self.bump();
                    Tok::Semi
                }
                ',' => {
                    self.bump();
                    Tok::Comma
                }
                '.' => {
                    self.bump();
                    Tok::Dot
                }
                '+' => {
                    self.bump();
                    if self.peek() == Some('+') {
                        self.bump();
                        Tok::PlusPlus
                    } else {
                        Tok::Plus
                    }
                }
                '-' => {
                    self.bump();
                    if self.peek() == Some('-') {
                        self.bump();
                        Tok::MinusMinus
                    } else {
                        Tok::Minus
                    }
                }
                '*' => {
                    self.bump();
                    Tok::Star
                }
                '/' => {
                    self.bump();
                    Tok::Slash
                }
                '!' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        Tok::NotEq
                    } else {
                        Tok::Bang
                    }
                }
                '=' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        Tok::EqEq
                    } else {
                        Tok::Assign
                    }
                }
                '<' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        Tok::Le
                    } else if self.peek() == Some('<') {
                        self.bump();
                        Tok::ShiftOut
                    } else {
                        Tok::Lt
                    }
                }
                '>' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        Tok::Ge
                    } else if self.peek() == Some('>') {
                        self.bump();
                        Tok::ShiftIn
                    } else {
                        Tok::Gt
                    }
                }
                '&' => {
                    self.bump();
                    if self.peek() == Some('&') {
                        self.bump();
                        Tok::AndAnd
                    } else {
                        return Err(format!("{} ***ERROR*** Illegal character '&'", pos));
                    }
                }
                '|' => {
                    self.bump();
                    if self.peek() == Some('|') {
                        self.bump();
                        Tok::OrOr
                    } else {
                        return Err(format!("{} ***ERROR*** Illegal character '|'", pos));
                    }
                }
                '"' => self.lex_string(pos)?,
                c if c.is_ascii_digit() => self.lex_number(pos)?,
                c if c.is_alphabetic() || c == '_' => self.lex_word(),
                other => {
                    return Err(format!("{} ***ERROR*** Illegal character '{}'", pos, other));
                }
            };
            out.push((tok, pos));
        }
    }

    fn lex_string(&mut self, start: Pos) -> Result<Tok, String> {
        self.bump(); // opening quote
        let mut s = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(format!("{} ***ERROR*** Unterminated string literal", start));
                }
                Some('"') => return Ok(Tok::StrLit(s)),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('"') => s.push('"'),
                    Some('\\') => s.push('\\'),
                    Some(other) => {
                        return Err(format!(
                            "{} ***ERROR*** Illegal escape sequence '\\{}'",
                            start, other
                        ));
                    }
                    None => {
                        return Err(format!("{} ***ERROR*** Unterminated string literal", start));
                    }
                },
                Some(c) => s.push(c),
            }
        }
    }

    fn lex_number(&mut self, start: Pos) -> Result<Tok, String> {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match s.parse() {
            Ok(n) => Ok(Tok::IntLit(n)),
            Err(_) => Err(format!("{} ***ERROR*** Integer literal out of range '{}'", start, s)),
        }
    }

    fn lex_word(&mut self) -> Tok {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match s.as_str() {
            "struct" => Tok::KwStruct,
            "int" => Tok::KwInt,
            "bool" => Tok::KwBool,
            "void" => Tok::KwVoid,
            "main" => Tok::KwMain,
            "cin" => Tok::KwCin,
            "cout" => Tok::KwCout,
            "if" => Tok::KwIf,
            "else" => Tok::KwElse,
            "while" => Tok::KwWhile,
            "return" => Tok::KwReturn,
            "true" => Tok::KwTrue,
            "false" => Tok::KwFalse,
            _ => Tok::Ident(s),
        }
    }
}

/// What an identifier-led term parses to before its syntactic context (a
/// statement vs. a sub-expression) decides what shape is actually legal.
enum Primary {
    Call(CallExp),
    Lvalue(Exp),
}

pub struct Parser {
    tokens: Vec<(Tok, Pos)>,
    pos: usize,
    lex_error: Option<String>,
}

impl Parser {
    pub fn new(src: &str) -> Self {
        match Lexer::new(src).lex_all() {
            Ok(tokens) => Parser {
                tokens,
                pos: 0,
                lex_error: None,
            },
            Err(e) => Parser {
                tokens: vec![(Tok::Eof, Pos::SYNTHETIC)],
                pos: 0,
                lex_error: Some(e),
            },
        }
    }

    pub fn parse_program(mut self) -> Result<Program, String> {
        if let Some(e) = self.lex_error.take() {
            return Err(e);
        }
        let mut decls = Vec::new();
        while !self.at(Tok::Eof) {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls })
    }

    fn cur(&self) -> &Tok {
        &self.tokens[self.pos].0
    }

    fn cur_pos(&self) -> Pos {
        self.tokens[self.pos].1
    }

    fn at(&self, t: Tok) -> bool {
        *self.cur() == t
    }

    fn advance(&mut self) -> (Tok, Pos) {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, t: Tok) -> bool {
        if self.at(t) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: Tok) -> Result<Pos, String> {
        if self.at(t.clone()) {
            Ok(self.advance().1)
        } else {
            Err(format!(
                "{} ***ERROR*** Expected {:?}, found {:?}",
                self.cur_pos(),
                t,
                self.cur()
            ))
        }
    }

    fn parse_id(&mut self) -> Result<Id, String> {
        let pos = self.cur_pos();
        match self.cur().clone() {
            Tok::Ident(name) => {
                self.advance();
                Ok(Id::new(name, pos))
            }
            Tok::KwMain => {
                self.advance();
                Ok(Id::new("main", pos))
            }
            other => Err(format!("{} ***ERROR*** Expected identifier, found {:?}", pos, other)),
        }
    }

    fn starts_type(&self) -> bool {
        matches!(self.cur(), Tok::KwInt | Tok::KwBool | Tok::KwVoid | Tok::KwStruct)
    }

    fn parse_type(&mut self) -> Result<TypeExpr, String> {
        match self.cur().clone() {
            Tok::KwInt => {
                self.advance();
                Ok(TypeExpr::Int)
            }
            Tok::KwBool => {
                self.advance();
                Ok(TypeExpr::Bool)
            }
            Tok::KwVoid => {
                self.advance();
                Ok(TypeExpr::Void)
            }
            Tok::KwStruct => {
                self.advance();
                Ok(TypeExpr::StructRef(self.parse_id()?))
            }
            other => Err(format!("{} ***ERROR*** Expected a type, found {:?}", self.cur_pos(), other)),
        }
    }

    fn parse_decl(&mut self) -> Result<Decl, String> {
        if self.eat(Tok::KwStruct) {
            return self.parse_struct_decl();
        }
        let ty = self.parse_type()?;
        let id = self.parse_id()?;
        if self.at(Tok::LParen) {
            self.parse_fn_decl_rest(ty, id).map(Decl::Fn)
        } else {
            self.expect(Tok::Semi)?;
            Ok(Decl::Var(VarDecl { ty, id }))
        }
    }

    fn parse_struct_decl(&mut self) -> Result<Decl, String> {
        let id = self.parse_id()?;
        self.expect(Tok::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(Tok::RBrace) {
            fields.push(self.parse_var_decl()?);
        }
        self.expect(Tok::RBrace)?;
        self.expect(Tok::Semi)?;
        Ok(Decl::Struct(StructDecl { id, fields }))
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, String> {
        let ty = self.parse_type()?;
        let id = self.parse_id()?;
        self.expect(Tok::Semi)?;
        Ok(VarDecl { ty, id })
    }

    fn parse_fn_decl_rest(&mut self, ret_ty: TypeExpr, id: Id) -> Result<FnDecl, String> {
        self.expect(Tok::LParen)?;
        let mut formals = Vec::new();
        if !self.at(Tok::RParen) {
            loop {
                let ty = self.parse_type()?;
                let fid = self.parse_id()?;
                formals.push(VarDecl { ty, id: fid });
                if !self.eat(Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(Tok::RParen)?;
        self.expect(Tok::LBrace)?;
        let mut body_decls = Vec::new();
        while self.starts_type() {
            body_decls.push(self.parse_var_decl()?);
        }
        let mut body_stmts = Vec::new();
        while !self.at(Tok::RBrace) {
            body_stmts.push(self.parse_stmt()?);
        }
        self.expect(Tok::RBrace)?;
        Ok(FnDecl {
            ret_ty,
            id,
            formals,
            body_decls,
            body_stmts,
            frame_size: std::cell::Cell::new(0),
            formals_size: std::cell::Cell::new(0),
        })
    }

    fn parse_block(&mut self) -> Result<(Vec<VarDecl>, Vec<Stmt>), String> {
        self.expect(Tok::LBrace)?;
        let mut decls = Vec::new();
        while self.starts_type() {
            decls.push(self.parse_var_decl()?);
        }
        let mut stmts = Vec::new();
        while !self.at(Tok::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(Tok::RBrace)?;
        Ok((decls, stmts))
    }

    fn parse_stmt(&mut self) -> Result<Stmt, String> {
        match self.cur().clone() {
            Tok::KwCin => {
                self.advance();
                self.expect(Tok::ShiftIn)?;
                let lvalue = self.parse_lvalue_exp()?;
                self.expect(Tok::Semi)?;
                Ok(Stmt::Read(lvalue))
            }
            Tok::KwCout => {
                self.advance();
                self.expect(Tok::ShiftOut)?;
                let exp = self.parse_exp()?;
                self.expect(Tok::Semi)?;
                Ok(Stmt::Write(exp))
            }
            Tok::KwIf => {
                self.advance();
                self.expect(Tok::LParen)?;
                let cond = self.parse_exp()?;
                self.expect(Tok::RParen)?;
                let (tdecls, tstmts) = self.parse_block()?;
                if self.eat(Tok::KwElse) {
                    let (edecls, estmts) = self.parse_block()?;
                    Ok(Stmt::IfElse(cond, tdecls, tstmts, edecls, estmts))
                } else {
                    Ok(Stmt::If(cond, tdecls, tstmts))
                }
            }
            Tok::KwWhile => {
                self.advance();
                self.expect(Tok::LParen)?;
                let cond = self.parse_exp()?;
                self.expect(Tok::RParen)?;
                let (decls, stmts) = self.parse_block()?;
                Ok(Stmt::While(cond, decls, stmts))
            }
            Tok::KwReturn => {
                let pos = self.cur_pos();
                self.advance();
                let exp = if self.at(Tok::Semi) {
                    None
                } else {
                    Some(self.parse_exp()?)
                };
                self.expect(Tok::Semi)?;
                Ok(Stmt::Return(exp, pos))
            }
            Tok::Ident(_) | Tok::KwMain => {
                let pos = self.cur_pos();
                match self.parse_ident_primary()? {
                    Primary::Call(c) => {
                        self.expect(Tok::Semi)?;
                        Ok(Stmt::Call(c))
                    }
                    Primary::Lvalue(lhs) => match self.cur().clone() {
                        Tok::Assign => {
                            self.advance();
                            let rhs = self.parse_exp()?;
                            self.expect(Tok::Semi)?;
                            Ok(Stmt::Assign(AssignExp { lhs, rhs, pos }))
                        }
                        Tok::PlusPlus => {
                            self.advance();
                            self.expect(Tok::Semi)?;
                            Ok(Stmt::PostInc(lhs, pos))
                        }
                        Tok::MinusMinus => {
                            self.advance();
                            self.expect(Tok::Semi)?;
                            Ok(Stmt::PostDec(lhs, pos))
                        }
                        other => Err(format!(
                            "{} ***ERROR*** Expected '=', '++' or '--', found {:?}",
                            self.cur_pos(),
                            other
                        )),
                    },
                }
            }
            other => Err(format!("{} ***ERROR*** Expected a statement, found {:?}", self.cur_pos(), other)),
        }
    }

    fn parse_lvalue_exp(&mut self) -> Result<Exp, String> {
        match self.parse_ident_primary()? {
            Primary::Lvalue(e) => Ok(e),
            Primary::Call(_) => Err(format!("{} ***ERROR*** Expected an lvalue, found a call", self.cur_pos())),
        }
    }

    fn parse_ident_primary(&mut self) -> Result<Primary, String> {
        let id = self.parse_id()?;
        let pos = id.pos;
        if self.eat(Tok::LParen) {
            let mut args = Vec::new();
            if !self.at(Tok::RParen) {
                loop {
                    args.push(self.parse_exp()?);
                    if !self.eat(Tok::Comma) {
                        break;
                    }
                }
            }
            self.expect(Tok::RParen)?;
            return Ok(Primary::Call(CallExp { callee: id, args, pos }));
        }
        let mut exp = Exp::new(ExpKind::Id(id), pos);
        while self.at(Tok::Dot) {
            let dot_pos = self.cur_pos();
            self.advance();
            let field = self.parse_id()?;
            exp = Exp::new(
                ExpKind::DotAccess(Box::new(exp), field, RefCell::new(None)),
                dot_pos,
            );
        }
        Ok(Primary::Lvalue(exp))
    }

    fn parse_exp(&mut self) -> Result<Exp, String> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> Result<Exp, String> {
        let pos = self.cur_pos();
        let lhs = self.parse_or()?;
        if self.at(Tok::Assign) {
            if !lhs.is_dottable_shape() {
                return Err(format!("{} ***ERROR*** Invalid assignment target", pos));
            }
            self.advance();
            let rhs = self.parse_assign()?;
            return Ok(Exp::new(
                ExpKind::Assign(Box::new(AssignExp { lhs, rhs, pos })),
                pos,
            ));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Exp, String> {
        let mut left = self.parse_and()?;
        while self.at(Tok::OrOr) {
            let pos = self.cur_pos();
            self.advance();
            let right = self.parse_and()?;
            left = Exp::new(ExpKind::Bin(BinOp::Or, Box::new(left), Box::new(right)), pos);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Exp, String> {
        let mut left = self.parse_equality()?;
        while self.at(Tok::AndAnd) {
            let pos = self.cur_pos();
            self.advance();
            let right = self.parse_equality()?;
            left = Exp::new(ExpKind::Bin(BinOp::And, Box::new(left), Box::new(right)), pos);
        }
        Ok(left)
    }

    /// Non-associative: binds at most one relational/equality operator.
    fn parse_equality(&mut self) -> Result<Exp, String> {
        let left = self.parse_additive()?;
        let op = match self.cur() {
            Tok::EqEq => BinOp::Eq,
            Tok::NotEq => BinOp::Ne,
            Tok::Lt => BinOp::Lt,
            Tok::Gt => BinOp::Gt,
            Tok::Le => BinOp::Le,
            Tok::Ge => BinOp::Ge,
            _ => return Ok(left),
        };
        let pos = self.cur_pos();
        self.advance();
        let right = self.parse_additive()?;
        Ok(Exp::new(ExpKind::Bin(op, Box::new(left), Box::new(right)), pos))
    }

    fn parse_additive(&mut self) -> Result<Exp, String> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.cur() {
                Tok::Plus => BinOp::Plus,
                Tok::Minus => BinOp::Minus,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Exp::new(ExpKind::Bin(op, Box::new(left), Box::new(right)), pos);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Exp, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.cur() {
                Tok::Star => BinOp::Times,
                Tok::Slash => BinOp::Divide,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let right = self.parse_unary()?;
            left = Exp::new(ExpKind::Bin(op, Box::new(left), Box::new(right)), pos);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Exp, String> {
        match self.cur() {
            Tok::Bang => {
                let pos = self.cur_pos();
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Exp::new(ExpKind::Not(Box::new(operand)), pos))
            }
            Tok::Minus => {
                let pos = self.cur_pos();
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Exp::new(ExpKind::UnaryMinus(Box::new(operand)), pos))
            }
            _ => self.parse_term(),
        }
    }

    fn parse_term(&mut self) -> Result<Exp, String> {
        let pos = self.cur_pos();
        match self.cur().clone() {
            Tok::IntLit(n) => {
                self.advance();
                Ok(Exp::new(ExpKind::IntLit(n), pos))
            }
            Tok::StrLit(s) => {
                self.advance();
                Ok(Exp::new(ExpKind::StrLit(s), pos))
            }
            Tok::KwTrue => {
                self.advance();
                Ok(Exp::new(ExpKind::True, pos))
            }
            Tok::KwFalse => {
                self.advance();
                Ok(Exp::new(ExpKind::False, pos))
            }
            Tok::LParen => {
                self.advance();
                let e = self.parse_exp()?;
                self.expect(Tok::RParen)?;
                Ok(e)
            }
            Tok::Ident(_) | Tok::KwMain => match self.parse_ident_primary()? {
                Primary::Call(c) => Ok(Exp::new(ExpKind::Call(Box::new(c)), pos)),
                Primary::Lvalue(e) => Ok(e),
            },
            other => Err(format!("{} ***ERROR*** Expected an expression, found {:?}", pos, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hello_world() {
        let program = Parser::new(r#"void main() { cout << "hi"; }"#)
            .parse_program()
            .unwrap();
        assert_eq!(program.decls.len(), 1);
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected a function")
        };
        assert_eq!(f.id.name, "main");
        assert_eq!(f.body_stmts.len(), 1);
        assert!(matches!(f.body_stmts[0], Stmt::Write(_)));
    }

    #[test]
    fn skips_line_comments() {
        let program = Parser::new("// hello\nint g; // trailing\nvoid main() { }")
            .parse_program()
            .unwrap();
        assert_eq!(program.decls.len(), 2);
    }

    #[test]
    fn parses_struct_decl_and_struct_typed_var() {
        let program = Parser::new("struct A { int f; bool g; } void main() { struct A a; }")
            .parse_program()
            .unwrap();
        assert_eq!(program.decls.len(), 2);
        let Decl::Struct(s) = &program.decls[0] else {
            panic!("expected a struct decl")
        };
        assert_eq!(s.fields.len(), 2);
    }

    #[test]
    fn operator_precedence_multiplication_binds_tighter_than_addition() {
        let program = Parser::new("void main() { int x; x = 1 + 2 * 3; }")
            .parse_program()
            .unwrap();
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected a function")
        };
        let Stmt::Assign(a) = &f.body_stmts[0] else {
            panic!("expected an assignment")
        };
        let ExpKind::Bin(BinOp::Plus, _, rhs) = &a.rhs.kind else {
            panic!("expected a top-level '+'")
        };
        assert!(matches!(rhs.kind, ExpKind::Bin(BinOp::Times, ..)));
    }

    #[test]
    fn string_escapes_are_interpreted() {
        let program = Parser::new(r#"void main() { cout << "a\nb"; }"#)
            .parse_program()
            .unwrap();
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected a function")
        };
        let Stmt::Write(e) = &f.body_stmts[0] else {
            panic!("expected a write statement")
        };
        assert!(matches!(&e.kind, ExpKind::StrLit(s) if s == "a\nb"));
    }

    #[test]
    fn unterminated_string_is_a_parse_error() {
        let err = Parser::new(r#"void main() { cout << "oops; }"#)
            .parse_program()
            .unwrap_err();
        assert!(err.contains("Unterminated string literal"));
    }

    #[test]
    fn integer_literal_out_of_i32_range_is_a_parse_error() {
        let err = Parser::new("void main() { cout << 99999999999999999999; }")
            .parse_program()
            .unwrap_err();
        assert!(err.contains("Integer literal out of range"));
    }

    #[test]
    fn dot_chain_parses_as_nested_dot_access() {
        let program = Parser::new(
            "struct A { int f; } struct B { struct A a; } void main() { struct B b; b.a.f = 1; }",
        )
        .parse_program()
        .unwrap();
        let Decl::Fn(f) = &program.decls[2] else {
            panic!("expected a function")
        };
        let Stmt::Assign(a) = &f.body_stmts[0] else {
            panic!("expected an assignment")
        };
        assert!(matches!(&a.lhs.kind, ExpKind::DotAccess(..)));
    }

    #[test]
    fn function_call_as_statement_and_as_operand() {
        let program = Parser::new(
            "int f(int a) { return a; } void main() { int x; f(1); x = f(2) + 1; }",
        )
        .parse_program()
        .unwrap();
        let Decl::Fn(m) = &program.decls[1] else {
            panic!("expected a function")
        };
        assert!(matches!(m.body_stmts[0], Stmt::Call(_)));
    }
}
