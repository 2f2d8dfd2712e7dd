//! Compiler-introduced variables.

use glint_core::PoolAllocator;

use crate::symbol::{SymbolKind, Variable};
use crate::types::Type;

/// Hands out internal temporaries named `_t0`, `_t1`, ...
///
/// One counter is shared by every pass of a compilation, so names never
/// collide within a shader. Temporaries are [`SymbolKind::Internal`] and
/// carry the requested type with its storage qualifier dropped.
#[derive(Debug, Default)]
pub struct Temporaries {
    next: u32,
}

impl Temporaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create<'a>(&mut self, pool: &'a PoolAllocator, ty: Type<'a>) -> &'a Variable<'a> {
        let name = format!("_t{}", self.next);
        self.next += 1;
        Variable::new_in(pool, &name, ty.as_temporary(), SymbolKind::Internal)
    }

    /// Temporaries created so far.
    pub fn count(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Qualifier;

    #[test]
    fn sequential_names() {
        let pool = PoolAllocator::default();
        let mut temps = Temporaries::new();
        let a = temps.create(&pool, Type::float());
        let b = temps.create(&pool, Type::int().with_qualifier(Qualifier::Uniform));
        assert_eq!(a.name, "_t0");
        assert_eq!(b.name, "_t1");
        assert_eq!(b.ty.qualifier, Qualifier::Temporary);
        assert_eq!(b.kind, SymbolKind::Internal);
        assert_eq!(temps.count(), 2);
    }
}
