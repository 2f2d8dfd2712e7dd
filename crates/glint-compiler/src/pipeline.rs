//! The fixed stage sequence run over a translation unit.
//!
//! Stages run strictly in the order of [`Stage::ALL`]. After each one the
//! error count is compared with the count before it; the first stage that
//! adds an error aborts the pipeline and nothing after it runs. With
//! [`CompileOptions::VALIDATE_AST`] the tree is checked after every mutating
//! stage, and a malformed tree panics since it means a pass is broken.

use std::fmt;

use glint_ast::TranslationUnit;
use glint_core::CompileOptions;
use glint_registry::{CallGraph, SymbolTable, check_call_depth};

use crate::passes::{
    ValidationOutcome, add_default_return_statements, check_main_defined,
    rewrite_texel_fetch_offset, scalarize_constructor_args, separate_declarations,
    unfold_short_circuit_to_if, validate_array_sizes, validate_ast, validate_framebuffer_fetch,
    validate_pixel_local_storage,
};
use crate::session::CompileSession;

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ValidateArraySizes,
    BuildCallGraph,
    CheckCallDepth,
    CheckMainDefined,
    ValidatePixelLocalStorage,
    ValidateFramebufferFetch,
    SeparateDeclarations,
    AddDefaultReturnStatements,
    RewriteTexelFetchOffset,
    UnfoldShortCircuit,
    ScalarizeConstructorArgs,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 11] = [
        Stage::ValidateArraySizes,
        Stage::BuildCallGraph,
        Stage::CheckCallDepth,
        Stage::CheckMainDefined,
        Stage::ValidatePixelLocalStorage,
        Stage::ValidateFramebufferFetch,
        Stage::SeparateDeclarations,
        Stage::AddDefaultReturnStatements,
        Stage::RewriteTexelFetchOffset,
        Stage::UnfoldShortCircuit,
        Stage::ScalarizeConstructorArgs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ValidateArraySizes => "validate_array_sizes",
            Stage::BuildCallGraph => "build_call_graph",
            Stage::CheckCallDepth => "check_call_depth",
            Stage::CheckMainDefined => "check_main_defined",
            Stage::ValidatePixelLocalStorage => "validate_pixel_local_storage",
            Stage::ValidateFramebufferFetch => "validate_framebuffer_fetch",
            Stage::SeparateDeclarations => "separate_declarations",
            Stage::AddDefaultReturnStatements => "add_default_return_statements",
            Stage::RewriteTexelFetchOffset => "rewrite_texel_fetch_offset",
            Stage::UnfoldShortCircuit => "unfold_short_circuit",
            Stage::ScalarizeConstructorArgs => "scalarize_constructor_args",
        }
    }

    /// Whether the stage edits the tree.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Stage::SeparateDeclarations
                | Stage::AddDefaultReturnStatements
                | Stage::RewriteTexelFetchOffset
                | Stage::UnfoldShortCircuit
                | Stage::ScalarizeConstructorArgs
        )
    }

    /// Whether `options` switch the stage on. Stages without an option
    /// always run.
    pub fn is_enabled(self, options: CompileOptions) -> bool {
        let required = match self {
            Stage::CheckCallDepth => CompileOptions::LIMIT_CALL_STACK_DEPTH,
            Stage::SeparateDeclarations => CompileOptions::SEPARATE_DECLARATIONS,
            Stage::RewriteTexelFetchOffset => {
                CompileOptions::REWRITE_TEXEL_FETCH_OFFSET_TO_TEXEL_FETCH
            }
            Stage::UnfoldShortCircuit => CompileOptions::UNFOLD_SHORT_CIRCUIT,
            Stage::ScalarizeConstructorArgs => {
                CompileOptions::SCALARIZE_VEC_AND_MAT_CONSTRUCTOR_ARGS
            }
            _ => return true,
        };
        options.contains(required)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    /// Every enabled stage ran without adding an error.
    Completed,
    /// `stage` added an error; later stages did not run.
    Aborted { stage: Stage },
}

impl PipelineStatus {
    pub fn is_completed(self) -> bool {
        self == PipelineStatus::Completed
    }
}

/// Outcomes of the read-only validation stages. A stage that did not run
/// keeps [`ValidationOutcome::FeatureUnused`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub array_sizes: ValidationOutcome,
    pub pixel_local_storage: ValidationOutcome,
    pub framebuffer_fetch: ValidationOutcome,
}

#[derive(Debug)]
pub struct PipelineOutput<'a> {
    pub status: PipelineStatus,
    /// Empty when the pipeline aborted before or while building it.
    pub call_graph: CallGraph<'a>,
    pub validation: ValidationReport,
    /// Edits made by each mutating stage that ran.
    pub changes: Vec<(Stage, usize)>,
}

impl<'a> PipelineOutput<'a> {
    fn new() -> Self {
        Self {
            status: PipelineStatus::Completed,
            call_graph: CallGraph::new(),
            validation: ValidationReport::default(),
            changes: Vec::new(),
        }
    }

    /// Edits made by `stage`, if it ran.
    pub fn changes_in(&self, stage: Stage) -> Option<usize> {
        self.changes
            .iter()
            .find(|(changed, _)| *changed == stage)
            .map(|&(_, count)| count)
    }
}

/// Runs [`Stage::ALL`] over one translation unit.
pub struct Pipeline<'s, 'a> {
    session: &'s mut CompileSession<'a>,
    symbols: &'s SymbolTable<'a>,
    /// Declarations are one per statement from here on.
    separated: bool,
}

impl<'s, 'a> Pipeline<'s, 'a> {
    pub fn new(session: &'s mut CompileSession<'a>, symbols: &'s SymbolTable<'a>) -> Self {
        Self {
            session,
            symbols,
            separated: false,
        }
    }

    /// Run every enabled stage over `unit`, editing it in place.
    pub fn run(mut self, unit: TranslationUnit<'a>) -> PipelineOutput<'a> {
        let mut output = PipelineOutput::new();
        let options = self.session.options();

        for stage in Stage::ALL {
            if !stage.is_enabled(options) {
                tracing::trace!(%stage, "stage disabled");
                continue;
            }

            let span = tracing::debug_span!("stage", stage = %stage);
            let _guard = span.enter();

            let errors_before = self.session.diagnostics().error_count();
            let changed = self.run_stage(stage, unit, &mut output);

            if stage.is_mutating() {
                tracing::debug!(changed, "stage finished");
                output.changes.push((stage, changed));
                if options.contains(CompileOptions::VALIDATE_AST)
                    && let Err(error) = validate_ast(unit.root(), self.separated)
                {
                    panic!("malformed tree after {stage}: {error}");
                }
            }

            let errors = self.session.diagnostics().error_count();
            if errors > errors_before {
                tracing::warn!(errors = errors - errors_before, "aborting pipeline");
                output.status = PipelineStatus::Aborted { stage };
                return output;
            }
        }

        output
    }

    /// Run one stage. Returns the number of edits for mutating stages and
    /// zero otherwise.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn run_stage(
        &mut self,
        stage: Stage,
        unit: TranslationUnit<'a>,
        output: &mut PipelineOutput<'a>,
    ) -> usize {
        let root = unit.root();
        let pool = self.session.pool();
        match stage {
            Stage::ValidateArraySizes => {
                let resources = *self.session.resources();
                output.validation.array_sizes =
                    validate_array_sizes(&mut self.session.cx(), root, &resources);
                0
            }
            Stage::BuildCallGraph => {
                output
                    .call_graph
                    .init(pool, root, self.session.diagnostics_mut());
                0
            }
            Stage::CheckCallDepth => {
                let limit = self.session.resources().max_call_stack_depth;
                check_call_depth(&output.call_graph, limit, self.session.diagnostics_mut());
                0
            }
            Stage::CheckMainDefined => {
                check_main_defined(&output.call_graph, self.session.diagnostics_mut());
                0
            }
            Stage::ValidatePixelLocalStorage => {
                output.validation.pixel_local_storage =
                    validate_pixel_local_storage(&mut self.session.cx(), root);
                0
            }
            Stage::ValidateFramebufferFetch => {
                let features = *self.session.features();
                output.validation.framebuffer_fetch =
                    validate_framebuffer_fetch(&mut self.session.cx(), root, &features);
                0
            }
            Stage::SeparateDeclarations => {
                let changed = separate_declarations(&mut self.session.cx(), root);
                self.separated = true;
                changed
            }
            Stage::AddDefaultReturnStatements => add_default_return_statements(pool, unit),
            Stage::RewriteTexelFetchOffset => {
                rewrite_texel_fetch_offset(&mut self.session.cx(), root, self.symbols)
            }
            Stage::UnfoldShortCircuit => unfold_short_circuit_to_if(&mut self.session.cx(), root),
            Stage::ScalarizeConstructorArgs => {
                scalarize_constructor_args(&mut self.session.cx(), root)
            }
        }
    }
}
