//! Per-compilation state shared by every stage.

use glint_ast::Temporaries;
use glint_ast::traverse::TraverseCx;
use glint_core::{CompileOptions, Diagnostics, PoolAllocator, Resources, ShaderFeatures};
use glint_registry::SymbolTable;

/// Everything one compilation owns apart from the tree itself: the arena
/// handle, configuration, the diagnostics sink and the temporary counter.
///
/// A session is single-threaded. Independent sessions with their own pools
/// can run on separate threads.
#[derive(Debug)]
pub struct CompileSession<'a> {
    pool: &'a PoolAllocator,
    features: ShaderFeatures,
    options: CompileOptions,
    resources: Resources,
    diagnostics: Diagnostics,
    temporaries: Temporaries,
}

impl<'a> CompileSession<'a> {
    /// Create a session with default options and resources.
    pub fn new(pool: &'a PoolAllocator, features: ShaderFeatures) -> Self {
        Self {
            pool,
            features,
            options: CompileOptions::default(),
            resources: Resources::default(),
            diagnostics: Diagnostics::new(),
            temporaries: Temporaries::new(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    #[inline]
    pub fn pool(&self) -> &'a PoolAllocator {
        self.pool
    }

    pub fn features(&self) -> &ShaderFeatures {
        &self.features
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Consume the session, keeping only its diagnostics.
    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn temporaries(&self) -> &Temporaries {
        &self.temporaries
    }

    /// A symbol table with the built-ins this session's features enable.
    pub fn symbol_table(&self) -> SymbolTable<'a> {
        SymbolTable::new(self.pool, self.features, &self.resources)
    }

    /// A traversal context borrowing this session's diagnostics and
    /// temporaries.
    pub fn cx(&mut self) -> TraverseCx<'_, 'a> {
        TraverseCx::new(self.pool, &mut self.temporaries, &mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_ast::{BasicType, Type};
    use glint_core::{Extensions, ShaderStage, ShaderVersion};

    #[test]
    fn builder_overrides_defaults() {
        let pool = PoolAllocator::default();
        let features = ShaderFeatures::new(ShaderVersion::Es310, ShaderStage::Compute);
        let resources = Resources {
            max_call_stack_depth: 8,
            ..Resources::default()
        };
        let session = CompileSession::new(&pool, features)
            .with_options(CompileOptions::LIMIT_CALL_STACK_DEPTH)
            .with_resources(resources);

        assert_eq!(session.options(), CompileOptions::LIMIT_CALL_STACK_DEPTH);
        assert_eq!(session.resources().max_call_stack_depth, 8);
        assert_eq!(session.features().stage, ShaderStage::Compute);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn temporaries_are_shared_across_contexts() {
        let pool = PoolAllocator::default();
        let features = ShaderFeatures::new(ShaderVersion::Es300, ShaderStage::Fragment);
        let mut session = CompileSession::new(&pool, features);

        let first = session.cx().create_temp_variable(Type::float());
        let second = session.cx().create_temp_variable(Type::vec(BasicType::Float, 2));
        assert_eq!(first.name, "_t0");
        assert_eq!(second.name, "_t1");
        assert_eq!(session.temporaries().count(), 2);
    }

    #[test]
    fn symbol_table_follows_features() {
        let pool = PoolAllocator::default();
        let features = ShaderFeatures::new(ShaderVersion::Es300, ShaderStage::Fragment)
            .with_extensions(Extensions::FRAMEBUFFER_FETCH);
        let session = CompileSession::new(&pool, features);
        assert!(session.symbol_table().last_frag_data().is_some());
    }
}
