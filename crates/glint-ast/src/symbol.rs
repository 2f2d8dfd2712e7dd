//! Variable and function records referenced from the tree.
//!
//! Symbols are allocated in the compilation's pool and never change after
//! creation. Every symbol gets a process-unique [`SymbolId`]; nodes refer to
//! the record itself, so identity comparisons go through the id.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use glint_core::{NameHash, PoolAllocator};

use crate::types::Type;

static NEXT_SYMBOL_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique symbol identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Allocate a fresh id. Safe to call from concurrent compilations.
    pub fn fresh() -> Self {
        SymbolId(NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a symbol came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Provided by the language or an extension.
    BuiltIn,
    /// Declared in the shader source.
    UserDefined,
    /// Introduced by a compiler pass.
    Internal,
    /// Nameless, such as an unnamed prototype parameter.
    Empty,
}

#[derive(Debug)]
pub struct Variable<'a> {
    pub id: SymbolId,
    pub name: &'a str,
    pub ty: Type<'a>,
    pub kind: SymbolKind,
}

impl<'a> Variable<'a> {
    /// Allocate a variable with a fresh id in `pool`.
    pub fn new_in(
        pool: &'a PoolAllocator,
        name: &str,
        ty: Type<'a>,
        kind: SymbolKind,
    ) -> &'a Variable<'a> {
        let name = pool.alloc_str(name);
        pool.alloc(Variable {
            id: SymbolId::fresh(),
            name,
            ty,
            kind,
        })
    }

    pub fn is_builtin(&self) -> bool {
        self.kind == SymbolKind::BuiltIn
    }

    pub fn name_hash(&self) -> NameHash {
        NameHash::from_name(self.name)
    }
}

impl PartialEq for Variable<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable<'_> {}

/// A function signature, shared by its prototype, definition and call sites.
#[derive(Debug)]
pub struct Function<'a> {
    pub id: SymbolId,
    pub name: &'a str,
    /// `name(` followed by one `;`-terminated code per parameter type.
    pub mangled_name: &'a str,
    pub return_type: Type<'a>,
    pub params: &'a [&'a Variable<'a>],
    pub kind: SymbolKind,
    pub hash: NameHash,
}

impl<'a> Function<'a> {
    /// Allocate a function with a fresh id and computed mangled name.
    pub fn new_in(
        pool: &'a PoolAllocator,
        name: &str,
        return_type: Type<'a>,
        params: &[&'a Variable<'a>],
        kind: SymbolKind,
    ) -> &'a Function<'a> {
        let mangled = Self::mangle(name, params.iter().map(|param| param.ty));
        let hash = NameHash::from_mangled_name(&mangled);
        let name = pool.alloc_str(name);
        let mangled_name = pool.alloc_str(&mangled);
        let params = pool.alloc_slice_copy(params);
        pool.alloc(Function {
            id: SymbolId::fresh(),
            name,
            mangled_name,
            return_type,
            params,
            kind,
            hash,
        })
    }

    /// Build the mangled name for `name` applied to `param_types`.
    pub fn mangle<'t>(name: &str, param_types: impl IntoIterator<Item = Type<'t>>) -> String {
        let mut mangled = format!("{name}(");
        for ty in param_types {
            mangled.push_str(&ty.mangled_name());
            mangled.push(';');
        }
        mangled
    }

    pub fn is_builtin(&self) -> bool {
        self.kind == SymbolKind::BuiltIn
    }

    pub fn is_main(&self) -> bool {
        self.name == "main"
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

impl PartialEq for Function<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Function<'_> {}

impl fmt::Display for Function<'_> {
    /// Signature spelling, e.g. `float f(int x, vec2)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param.ty)?;
            if !param.name.is_empty() {
                write!(f, " {}", param.name)?;
            }
        }
        f.write_str(")")
    }
}
