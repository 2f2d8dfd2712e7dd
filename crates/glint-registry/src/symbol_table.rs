//! Scoped symbol records with the built-ins the passes rely on.
//!
//! The table is created once per compilation. Level 0 is the global scope;
//! function bodies and nested blocks push further levels while the front end
//! declares their variables. Built-ins live outside the level stack and are
//! keyed by the [`NameHash`] of their mangled name, so a pass that needs a
//! specific overload (say `texelFetch` on a `sampler2DArray`) finds it in one
//! lookup.

use glint_ast::{BasicType, Function, Precision, Qualifier, SymbolKind, Type, Variable};
use glint_core::{
    CompileError, Extensions, NameHash, PoolAllocator, Resources, ShaderFeatures, Span,
};
use rustc_hash::FxHashMap;

/// Name of the framebuffer-fetch input array.
pub const LAST_FRAG_DATA: &str = "gl_LastFragData";

/// Samplers that have integer texel fetches.
const TEXEL_FETCH_SAMPLERS: [BasicType; 9] = [
    BasicType::Sampler2D,
    BasicType::Sampler3D,
    BasicType::Sampler2DArray,
    BasicType::ISampler2D,
    BasicType::ISampler3D,
    BasicType::ISampler2DArray,
    BasicType::USampler2D,
    BasicType::USampler3D,
    BasicType::USampler2DArray,
];

#[derive(Debug, Default)]
struct ScopeLevel<'a> {
    variables: FxHashMap<&'a str, &'a Variable<'a>>,
}

#[derive(Debug)]
pub struct SymbolTable<'a> {
    pool: &'a PoolAllocator,
    features: ShaderFeatures,
    levels: Vec<ScopeLevel<'a>>,
    /// User functions by mangled name, in declaration order.
    functions: FxHashMap<&'a str, &'a Function<'a>>,
    function_order: Vec<&'a Function<'a>>,
    builtins: FxHashMap<NameHash, &'a Function<'a>>,
    builtin_variables: FxHashMap<&'a str, &'a Variable<'a>>,
}

impl<'a> SymbolTable<'a> {
    /// Create a table with the built-ins enabled by `features`.
    pub fn new(pool: &'a PoolAllocator, features: ShaderFeatures, resources: &Resources) -> Self {
        let mut table = Self {
            pool,
            features,
            levels: vec![ScopeLevel::default()],
            functions: FxHashMap::default(),
            function_order: Vec::new(),
            builtins: FxHashMap::default(),
            builtin_variables: FxHashMap::default(),
        };
        table.install_builtins(resources);
        table
    }

    pub fn features(&self) -> ShaderFeatures {
        self.features
    }

    pub fn pool(&self) -> &'a PoolAllocator {
        self.pool
    }

    // ==========================================================================
    // Scopes
    // ==========================================================================

    pub fn push_scope(&mut self) {
        self.levels.push(ScopeLevel::default());
    }

    /// Leave the innermost scope. The global scope is never popped.
    pub fn pop_scope(&mut self) {
        debug_assert!(self.levels.len() > 1, "popping the global scope");
        if self.levels.len() > 1 {
            self.levels.pop();
        }
    }

    /// Number of open scopes, the global one included.
    pub fn scope_depth(&self) -> usize {
        self.levels.len()
    }

    pub fn at_global_scope(&self) -> bool {
        self.levels.len() == 1
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    /// Declare `variable` in the innermost scope.
    pub fn declare_variable(
        &mut self,
        variable: &'a Variable<'a>,
        span: Span,
    ) -> Result<(), CompileError> {
        let innermost = self.levels.len() - 1;
        let level = &mut self.levels[innermost];
        if level.variables.contains_key(variable.name) {
            return Err(CompileError::Redefinition {
                name: variable.name.to_string(),
                span,
            });
        }
        level.variables.insert(variable.name, variable);
        Ok(())
    }

    /// Declare a user function. A second declaration with the same signature
    /// (a prototype followed by its definition) returns the first record.
    pub fn declare_function(
        &mut self,
        function: &'a Function<'a>,
        span: Span,
    ) -> Result<&'a Function<'a>, CompileError> {
        if self.builtins.contains_key(&function.hash) {
            return Err(CompileError::Redefinition {
                name: function.name.to_string(),
                span,
            });
        }
        if let Some(existing) = self.functions.get(function.mangled_name).copied() {
            return Ok(existing);
        }
        self.functions.insert(function.mangled_name, function);
        self.function_order.push(function);
        Ok(function)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Innermost variable called `name`, falling back to built-in variables.
    pub fn find_variable(&self, name: &str) -> Option<&'a Variable<'a>> {
        self.levels
            .iter()
            .rev()
            .find_map(|level| level.variables.get(name).copied())
            .or_else(|| self.builtin_variables.get(name).copied())
    }

    /// User function or built-in with the given mangled name.
    pub fn find_function(&self, mangled_name: &str) -> Option<&'a Function<'a>> {
        self.functions
            .get(mangled_name)
            .copied()
            .or_else(|| self.builtins.get(&NameHash::from_mangled_name(mangled_name)).copied())
    }

    /// The built-in overload of `name` taking exactly `param_types`.
    pub fn find_builtin(&self, name: &str, param_types: &[Type<'_>]) -> Option<&'a Function<'a>> {
        let codes: Vec<String> = param_types.iter().map(Type::mangled_name).collect();
        let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
        self.builtins
            .get(&NameHash::from_function(name, &codes))
            .copied()
    }

    /// The `gl_LastFragData` built-in, when framebuffer fetch is enabled.
    pub fn last_frag_data(&self) -> Option<&'a Variable<'a>> {
        self.builtin_variables.get(LAST_FRAG_DATA).copied()
    }

    /// User functions in declaration order.
    pub fn user_functions(&self) -> impl Iterator<Item = &'a Function<'a>> + '_ {
        self.function_order.iter().copied()
    }

    pub fn builtin_count(&self) -> usize {
        self.builtins.len()
    }

    // ==========================================================================
    // Built-ins
    // ==========================================================================

    fn install_builtins(&mut self, resources: &Resources) {
        if self.features.has_texel_fetch() {
            for sampler in TEXEL_FETCH_SAMPLERS {
                self.install_texel_fetch(sampler);
            }
        }

        let fetch = Extensions::FRAMEBUFFER_FETCH | Extensions::FRAMEBUFFER_FETCH_NON_COHERENT;
        if self.features.extensions.intersects(fetch) {
            let sizes = self.pool.alloc_slice_copy(&[resources.max_draw_buffers]);
            let ty = Type::vec(BasicType::Float, 4)
                .with_precision(Precision::Medium)
                .with_qualifier(Qualifier::LastFragData)
                .with_array_sizes(sizes);
            let variable = Variable::new_in(self.pool, LAST_FRAG_DATA, ty, SymbolKind::BuiltIn);
            self.builtin_variables.insert(variable.name, variable);
        }

        tracing::trace!(
            functions = self.builtins.len(),
            variables = self.builtin_variables.len(),
            "installed built-ins"
        );
    }

    /// `texelFetch(gsampler, ivecN P, int lod)` and
    /// `texelFetchOffset(gsampler, ivecN P, int lod, ivecM offset)`.
    fn install_texel_fetch(&mut self, sampler: BasicType) {
        let Some(coords) = sampler.texel_coordinate_size() else {
            return;
        };
        let offset_size = if sampler.is_sampler_2d_array() { 2 } else { coords };
        let result = Type::vec(sampler_result_type(sampler), 4);

        let pool = self.pool;
        let param = |name: &str, ty: Type<'a>| {
            Variable::new_in(pool, name, ty.with_qualifier(Qualifier::ParamIn), SymbolKind::Empty)
        };
        let sampler_param = param("sampler", Type::scalar(sampler));
        let coord_param = param("P", Type::vec(BasicType::Int, coords));
        let lod_param = param("lod", Type::int());
        let offset_param = param("offset", Type::vec(BasicType::Int, offset_size));

        let fetch = Function::new_in(
            pool,
            "texelFetch",
            result,
            &[sampler_param, coord_param, lod_param],
            SymbolKind::BuiltIn,
        );
        let fetch_offset = Function::new_in(
            pool,
            "texelFetchOffset",
            result,
            &[sampler_param, coord_param, lod_param, offset_param],
            SymbolKind::BuiltIn,
        );
        self.builtins.insert(fetch.hash, fetch);
        self.builtins.insert(fetch_offset.hash, fetch_offset);
    }
}

/// Component type returned by texel fetches from a sampler.
fn sampler_result_type(sampler: BasicType) -> BasicType {
    match sampler {
        BasicType::ISampler2D | BasicType::ISampler3D | BasicType::ISampler2DArray => {
            BasicType::Int
        }
        BasicType::USampler2D | BasicType::USampler3D | BasicType::USampler2DArray => {
            BasicType::UInt
        }
        _ => BasicType::Float,
    }
}
