//! Compilation configuration.
//!
//! Everything that changes how a shader is compiled lives here: the language
//! version and stage, enabled extensions, the option word that switches
//! rewrite passes on, and implementation limits.

use std::fmt;

use bitflags::bitflags;

/// Shading language version declared by the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ShaderVersion {
    /// ESSL 1.00.
    #[default]
    Es100,
    /// ESSL 3.00.
    Es300,
    /// ESSL 3.10.
    Es310,
    /// ESSL 3.20.
    Es320,
}

impl ShaderVersion {
    /// The number used in a `#version` directive.
    pub fn number(self) -> u32 {
        match self {
            ShaderVersion::Es100 => 100,
            ShaderVersion::Es300 => 300,
            ShaderVersion::Es310 => 310,
            ShaderVersion::Es320 => 320,
        }
    }

    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            100 => Some(ShaderVersion::Es100),
            300 => Some(ShaderVersion::Es300),
            310 => Some(ShaderVersion::Es310),
            320 => Some(ShaderVersion::Es320),
            _ => None,
        }
    }
}

impl fmt::Display for ShaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} es", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderStage {
    Vertex,
    #[default]
    Fragment,
    Compute,
}

bitflags! {
    /// Extensions enabled by `#extension` directives.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Extensions: u32 {
        /// `GL_EXT_shader_framebuffer_fetch`
        const FRAMEBUFFER_FETCH = 1 << 0;
        /// `GL_EXT_shader_framebuffer_fetch_non_coherent`
        const FRAMEBUFFER_FETCH_NON_COHERENT = 1 << 1;
        /// `GL_ANGLE_shader_pixel_local_storage`
        const PIXEL_LOCAL_STORAGE = 1 << 2;
    }
}

bitflags! {
    /// Switches for optional rewrite and validation stages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompileOptions: u32 {
        /// Replace `texelFetchOffset` with `texelFetch` on an offset coordinate.
        const REWRITE_TEXEL_FETCH_OFFSET_TO_TEXEL_FETCH = 1 << 0;
        /// Turn `&&`, `||` and `?:` with side effects into `if` statements.
        const UNFOLD_SHORT_CIRCUIT = 1 << 1;
        /// Flatten vector/matrix constructor arguments to scalars.
        const SCALARIZE_VEC_AND_MAT_CONSTRUCTOR_ARGS = 1 << 2;
        /// Reject call chains deeper than `Resources::max_call_stack_depth`.
        const LIMIT_CALL_STACK_DEPTH = 1 << 3;
        /// Check tree well-formedness after every mutating stage.
        const VALIDATE_AST = 1 << 4;
        /// Split multi-declarator declarations into one per statement.
        const SEPARATE_DECLARATIONS = 1 << 5;
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions::SEPARATE_DECLARATIONS
    }
}

/// Implementation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    /// Longest allowed call chain, counting the entry function.
    pub max_call_stack_depth: u32,
    /// Largest array variable, in bytes, after std140-style padding.
    pub max_array_size_bytes: u64,
    /// Size of the built-in `gl_LastFragData` array.
    pub max_draw_buffers: u32,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            max_call_stack_depth: 256,
            max_array_size_bytes: 2 * 1024 * 1024 * 1024,
            max_draw_buffers: 1,
        }
    }
}

/// Language features a shader was compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShaderFeatures {
    pub version: ShaderVersion,
    pub stage: ShaderStage,
    pub extensions: Extensions,
}

impl ShaderFeatures {
    pub fn new(version: ShaderVersion, stage: ShaderStage) -> Self {
        Self {
            version,
            stage,
            extensions: Extensions::empty(),
        }
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions |= extensions;
        self
    }

    pub fn has_extension(&self, extension: Extensions) -> bool {
        self.extensions.contains(extension)
    }

    /// Integer texel fetches exist from ESSL 3.00 on.
    pub fn has_texel_fetch(&self) -> bool {
        self.version >= ShaderVersion::Es300
    }
}
