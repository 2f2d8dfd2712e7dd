//! Deterministic hashes for symbol names.
//!
//! [`NameHash`] identifies variables and functions by a 64-bit XXHash of
//! their (mangled) name. Function hashes can be computed either from a full
//! mangled name or piecewise from the plain name and parameter codes, and the
//! two always agree, so built-in lookups never need to build the string.
//!
//! ```
//! use glint_core::NameHash;
//!
//! let whole = NameHash::from_mangled_name("texelFetch(s2;vi2;i1;");
//! let parts = NameHash::from_function("texelFetch", &["s2", "vi2", "i1"]);
//! assert_eq!(whole, parts);
//! ```

use std::fmt;

use xxhash_rust::xxh64::{Xxh64, xxh64};

/// Domain markers so that a variable and a function with the same spelling
/// never collide.
pub mod hash_constants {
    /// Domain marker for variable names.
    pub const VARIABLE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for mangled function names.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;
}

/// A deterministic 64-bit hash of a symbol name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NameHash(pub u64);

impl NameHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: NameHash = NameHash(0);

    /// Hash a variable name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        NameHash(hash_constants::VARIABLE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash a complete mangled function name such as `max(f1;f1;`.
    #[inline]
    pub fn from_mangled_name(mangled: &str) -> Self {
        NameHash(hash_constants::FUNCTION ^ xxh64(mangled.as_bytes(), 0))
    }

    /// Hash the mangled name `name(code;code;...` without building it.
    pub fn from_function(name: &str, param_codes: &[&str]) -> Self {
        let mut hasher = Xxh64::new(0);
        hasher.update(name.as_bytes());
        hasher.update(b"(");
        for code in param_codes {
            hasher.update(code.as_bytes());
            hasher.update(b";");
        }
        NameHash(hash_constants::FUNCTION ^ hasher.digest())
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl fmt::Debug for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameHash({:#018x})", self.0)
    }
}

impl fmt::Display for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(NameHash::from_name("gl_LastFragData"), NameHash::from_name("gl_LastFragData"));
        assert_ne!(NameHash::from_name("a"), NameHash::from_name("b"));
    }

    #[test]
    fn domains_do_not_collide() {
        assert_ne!(NameHash::from_name("main("), NameHash::from_mangled_name("main("));
    }

    #[test]
    fn piecewise_matches_whole() {
        assert_eq!(
            NameHash::from_function("main", &[]),
            NameHash::from_mangled_name("main(")
        );
        assert_eq!(
            NameHash::from_function("texelFetchOffset", &["s2a", "vi3", "i1", "vi2"]),
            NameHash::from_mangled_name("texelFetchOffset(s2a;vi3;i1;vi2;")
        );
    }

    #[test]
    fn parameter_order_matters() {
        assert_ne!(
            NameHash::from_function("f", &["i1", "f1"]),
            NameHash::from_function("f", &["f1", "i1"])
        );
    }

    #[test]
    fn display_is_hex() {
        assert!(NameHash(0xabc).to_string().starts_with("0x"));
        assert!(NameHash::EMPTY.is_empty());
    }
}
