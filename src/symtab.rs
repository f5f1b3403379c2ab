//! Symbol table and semantic type model (C2).
//!
//! A symbol table is a stack of scope frames, innermost first. Symbols are
//! created once, during name analysis, and shared (via `Rc`) between the table
//! and whichever AST nodes reference them; the table itself is a transient
//! scaffold discarded as scopes close, while the `Rc`s it handed out keep living
//! as long as the AST does.

use std::collections::HashMap;
use std::rc::Rc;

/// Where a variable's storage lives, which determines how codegen addresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// A `.data` global, addressed by label.
    Global,
    /// A local or formal, addressed as `offset($fp)`.
    Local,
    /// A struct field, addressed at a struct-relative offset from the struct's
    /// own base address (itself Global or Local).
    Field,
}

/// The closed set of semantic types from spec §3. `StructVar`/`StructDecl` carry
/// the struct's own symbol so equality can be nominal (same `Rc` identity via
/// name, not structural).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemType {
    Int,
    Bool,
    Void,
    /// Only ever the type of a string literal; no variable may have this type.
    String,
    Fn(Vec<SemType>, Box<SemType>),
    /// An identifier that names a struct type itself (not an instance of it).
    StructDecl(String),
    /// An identifier that is a variable of struct type.
    StructVar(Rc<StructSymbol>),
    /// Assigned after an error; suppresses further complaints about expressions
    /// that contain it.
    Error,
}

impl SemType {
    pub fn is_error(&self) -> bool {
        matches!(self, SemType::Error)
    }

    /// Structural equality for scalars, nominal (by declaration identity) for
    /// struct-valued types. `Fn`/`StructDecl` are intentionally excluded from
    /// "assignable" contexts by the type checker, not by this predicate.
    pub fn semantically_eq(&self, other: &SemType) -> bool {
        match (self, other) {
            (SemType::StructVar(a), SemType::StructVar(b)) => Rc::ptr_eq(a, b),
            (SemType::Fn(pa, ra), SemType::Fn(pb, rb)) => pa == pb && ra == rb,
            _ => self == other,
        }
    }

    /// Byte size of a value of this type, for frame/field layout. Only ever
    /// called on types that can actually be declared as a variable.
    pub fn byte_size(&self) -> i32 {
        match self {
            SemType::StructVar(s) => s.total_size,
            _ => 4,
        }
    }
}

/// A declared variable or formal parameter.
#[derive(Debug)]
pub struct VariableSymbol {
    pub name: String,
    pub ty: SemType,
    pub storage: Storage,
    /// Byte offset: `$fp`-relative for `Local`, struct-relative for `Field`,
    /// unused (0) for `Global` (globals are addressed by label instead).
    pub offset: i32,
    pub size: i32,
}

/// A declared function.
#[derive(Debug)]
pub struct FunctionSymbol {
    pub name: String,
    pub return_type: SemType,
    pub params: Vec<SemType>,
}

impl FunctionSymbol {
    pub fn as_sem_type(&self) -> SemType {
        SemType::Fn(self.params.clone(), Box::new(self.return_type.clone()))
    }
}

/// A declared struct type: a frozen field table plus the struct's total size.
#[derive(Debug)]
pub struct StructSymbol {
    pub name: String,
    /// Fields in declaration order; each is a `Symbol::Variable` with
    /// `storage: Storage::Field`.
    pub fields: Vec<(String, Rc<Symbol>)>,
    pub total_size: i32,
}

impl StructSymbol {
    pub fn find_field(&self, name: &str) -> Option<Rc<Symbol>> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.clone())
    }
}

/// A symbol table entry. `StructVar` is not a separate kind here: it's a
/// `Variable` whose `SemType` is `SemType::StructVar` — see SPEC_FULL.md §9.
#[derive(Debug)]
pub enum Symbol {
    Variable(VariableSymbol),
    Function(FunctionSymbol),
    Struct(Rc<StructSymbol>),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(v) => &v.name,
            Symbol::Function(f) => &f.name,
            Symbol::Struct(s) => &s.name,
        }
    }

    /// The semantic type an expression naming this symbol has (not the type of
    /// calling it, for functions — the type of the bare name).
    pub fn sem_type(&self) -> SemType {
        match self {
            Symbol::Variable(v) => v.ty.clone(),
            Symbol::Function(f) => f.as_sem_type(),
            Symbol::Struct(s) => SemType::StructDecl(s.name.clone()),
        }
    }

    pub fn as_variable(&self) -> Option<&VariableSymbol> {
        match self {
            Symbol::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionSymbol> {
        match self {
            Symbol::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Rc<StructSymbol>> {
        match self {
            Symbol::Struct(s) => Some(s),
            _ => None,
        }
    }
}

/// Internal invariant violations: programmer error in this compiler, not a
/// diagnostic about the compiled program. See SPEC_FULL.md §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerBug {
    EmptyScope,
}

impl std::fmt::Display for CompilerBug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompilerBug::EmptyScope => write!(f, "internal error: close_scope on empty stack"),
        }
    }
}

/// `declare` failed because the name is already bound in the innermost frame.
/// This is an ordinary, expected outcome the name analyser turns into a
/// `Multiply declared identifier` diagnostic — not a `CompilerBug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateName;

/// A stack of scope frames. `frames.last()` is the innermost (most recently
/// opened) scope; `frames[0]`/`frames.first()` is the outermost (global)
/// scope and is never popped.
pub struct SymbolTable {
    frames: Vec<HashMap<String, Rc<Symbol>>>,
}

impl SymbolTable {
    /// A fresh table with just the global scope open.
    pub fn new() -> Self {
        SymbolTable {
            frames: vec![HashMap::new()],
        }
    }

    pub fn open_scope(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn close_scope(&mut self) -> Result<(), CompilerBug> {
        if self.frames.len() <= 1 {
            return Err(CompilerBug::EmptyScope);
        }
        self.frames.pop();
        Ok(())
    }

    /// Depth of the scope stack, for the "scope closure" testable property.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn declare(&mut self, name: &str, sym: Rc<Symbol>) -> Result<(), DuplicateName> {
        let innermost = self
            .frames
            .last_mut()
            .expect("global scope is never popped");
        if innermost.contains_key(name) {
            return Err(DuplicateName);
        }
        innermost.insert(name.to_string(), sym);
        Ok(())
    }

    pub fn find_innermost(&self, name: &str) -> Option<Rc<Symbol>> {
        self.frames.last().and_then(|f| f.get(name)).cloned()
    }

    pub fn find(&self, name: &str) -> Option<Rc<Symbol>> {
        self.frames.iter().rev().find_map(|f| f.get(name).cloned())
    }

    /// Looks up `name` in the outermost (global) scope only, used when
    /// resolving `struct Name` type references, which are always global.
    pub fn find_global(&self, name: &str) -> Option<Rc<Symbol>> {
        self.frames.first().and_then(|f| f.get(name)).cloned()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes a scope when dropped, so an early `return` out of a fallible visitor
/// can't skip the matching `close_scope` (see SPEC_FULL.md §5).
pub struct ScopeGuard<'a> {
    table: &'a mut SymbolTable,
}

impl<'a> ScopeGuard<'a> {
    pub fn open(table: &'a mut SymbolTable) -> Self {
        table.open_scope();
        ScopeGuard { table }
    }

    pub fn table(&mut self) -> &mut SymbolTable {
        self.table
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        // Name analysis never unbalances scopes itself; an empty-scope pop here
        // would mean a bug in this compiler, not in the program being compiled.
        self.table
            .close_scope()
            .expect("ScopeGuard always pairs with a scope it opened");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, ty: SemType, storage: Storage, offset: i32) -> Rc<Symbol> {
        Rc::new(Symbol::Variable(VariableSymbol {
            name: name.to_string(),
            ty,
            storage,
            offset,
            size: 4,
        }))
    }

    #[test]
    fn global_scope_is_never_popped() {
        let mut t = SymbolTable::new();
        assert_eq!(t.depth(), 1);
        assert_eq!(t.close_scope(), Err(CompilerBug::EmptyScope));
    }

    #[test]
    fn lookup_prefers_innermost() {
        let mut t = SymbolTable::new();
        t.declare("x", var("x", SemType::Int, Storage::Global, 0))
            .unwrap();
        t.open_scope();
        t.declare("x", var("x", SemType::Bool, Storage::Local, -4))
            .unwrap();
        let found = t.find("x").unwrap();
        assert_eq!(found.as_variable().unwrap().ty, SemType::Bool);
        t.close_scope().unwrap();
        let found = t.find("x").unwrap();
        assert_eq!(found.as_variable().unwrap().ty, SemType::Int);
    }

    #[test]
    fn duplicate_in_innermost_frame_is_rejected() {
        let mut t = SymbolTable::new();
        t.declare("x", var("x", SemType::Int, Storage::Global, 0))
            .unwrap();
        assert_eq!(
            t.declare("x", var("x", SemType::Int, Storage::Global, 0)),
            Err(DuplicateName)
        );
    }

    #[test]
    fn find_innermost_does_not_see_outer_frames() {
        let mut t = SymbolTable::new();
        t.declare("x", var("x", SemType::Int, Storage::Global, 0))
            .unwrap();
        t.open_scope();
        assert!(t.find_innermost("x").is_none());
        assert!(t.find("x").is_some());
    }

    #[test]
    fn scope_guard_closes_on_early_return() {
        let mut t = SymbolTable::new();
        fn visit(t: &mut SymbolTable) -> Option<()> {
            let mut guard = ScopeGuard::open(t);
            guard.table().declare("x", var("x", SemType::Int, Storage::Local, -4)).ok()?;
            None? // simulate an early bail from an error path
        }
        assert_eq!(visit(&mut t), None);
        assert_eq!(t.depth(), 1);
    }
}
