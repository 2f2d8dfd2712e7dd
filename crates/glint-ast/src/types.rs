//! Type descriptors carried by every expression node.
//!
//! A [`Type`] is a small `Copy` value. Array sizes and structure definitions
//! are borrowed from the compilation's pool, so two descriptors compare
//! structurally: equal basic kind, precision, qualifier, flags, dimensions,
//! array sizes, and field-by-field equal structures.

use std::fmt;

use bitflags::bitflags;

/// The scalar or opaque kind underlying a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Void,
    Float,
    Int,
    UInt,
    Bool,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler2DArray,
    ISampler2D,
    ISampler3D,
    ISampler2DArray,
    USampler2D,
    USampler3D,
    USampler2DArray,
    Struct,
}

impl BasicType {
    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            BasicType::Sampler2D
                | BasicType::Sampler3D
                | BasicType::SamplerCube
                | BasicType::Sampler2DArray
                | BasicType::ISampler2D
                | BasicType::ISampler3D
                | BasicType::ISampler2DArray
                | BasicType::USampler2D
                | BasicType::USampler3D
                | BasicType::USampler2DArray
        )
    }

    pub fn is_sampler_2d_array(self) -> bool {
        matches!(
            self,
            BasicType::Sampler2DArray | BasicType::ISampler2DArray | BasicType::USampler2DArray
        )
    }

    /// Number of coordinates `texelFetch` takes for this sampler.
    pub fn texel_coordinate_size(self) -> Option<u8> {
        match self {
            BasicType::Sampler2D | BasicType::ISampler2D | BasicType::USampler2D => Some(2),
            BasicType::Sampler3D
            | BasicType::ISampler3D
            | BasicType::USampler3D
            | BasicType::Sampler2DArray
            | BasicType::ISampler2DArray
            | BasicType::USampler2DArray => Some(3),
            _ => None,
        }
    }

    /// Short code used in mangled function names.
    pub fn mangle_code(self) -> &'static str {
        match self {
            BasicType::Void => "o",
            BasicType::Float => "f",
            BasicType::Int => "i",
            BasicType::UInt => "u",
            BasicType::Bool => "b",
            BasicType::Sampler2D => "s2",
            BasicType::Sampler3D => "s3",
            BasicType::SamplerCube => "sC",
            BasicType::Sampler2DArray => "s2a",
            BasicType::ISampler2D => "is2",
            BasicType::ISampler3D => "is3",
            BasicType::ISampler2DArray => "is2a",
            BasicType::USampler2D => "us2",
            BasicType::USampler3D => "us3",
            BasicType::USampler2DArray => "us2a",
            BasicType::Struct => "S",
        }
    }

    /// Keyword spelling of the scalar or sampler type.
    pub fn keyword(self) -> &'static str {
        match self {
            BasicType::Void => "void",
            BasicType::Float => "float",
            BasicType::Int => "int",
            BasicType::UInt => "uint",
            BasicType::Bool => "bool",
            BasicType::Sampler2D => "sampler2D",
            BasicType::Sampler3D => "sampler3D",
            BasicType::SamplerCube => "samplerCube",
            BasicType::Sampler2DArray => "sampler2DArray",
            BasicType::ISampler2D => "isampler2D",
            BasicType::ISampler3D => "isampler3D",
            BasicType::ISampler2DArray => "isampler2DArray",
            BasicType::USampler2D => "usampler2D",
            BasicType::USampler3D => "usampler3D",
            BasicType::USampler2DArray => "usampler2DArray",
            BasicType::Struct => "struct",
        }
    }

    /// Prefix of the vector keyword (`vec`, `ivec`, ...).
    fn vector_prefix(self) -> &'static str {
        match self {
            BasicType::Int => "i",
            BasicType::UInt => "u",
            BasicType::Bool => "b",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    #[default]
    Undefined,
    Low,
    Medium,
    High,
}

/// Storage qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Qualifier {
    /// Function-local variable or expression result.
    #[default]
    Temporary,
    /// Non-uniform global variable.
    Global,
    Const,
    Uniform,
    VertexIn,
    VertexOut,
    FragmentIn,
    FragmentOut,
    /// `inout` fragment output (framebuffer fetch).
    FragmentInOut,
    /// The built-in `gl_LastFragData` array.
    LastFragData,
    /// Pixel local storage plane.
    PixelLocal,
    ParamIn,
    ParamOut,
    ParamInOut,
    ParamConst,
}

impl Qualifier {
    pub fn is_param(self) -> bool {
        matches!(
            self,
            Qualifier::ParamIn | Qualifier::ParamOut | Qualifier::ParamInOut | Qualifier::ParamConst
        )
    }
}

bitflags! {
    /// Layout and memory qualifiers that do not change the storage class.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        const INVARIANT = 1 << 0;
        const NONCOHERENT = 1 << 1;
        const PRECISE = 1 << 2;
    }
}

/// A named structure definition.
#[derive(Debug, PartialEq, Eq)]
pub struct StructType<'a> {
    pub name: &'a str,
    pub fields: &'a [Field<'a>],
}

#[derive(Debug, PartialEq, Eq)]
pub struct Field<'a> {
    pub name: &'a str,
    pub ty: Type<'a>,
}

/// A complete type descriptor.
///
/// `primary_size` is the vector size or the number of matrix columns,
/// `secondary_size` the number of matrix rows (1 for scalars and vectors).
/// Array sizes are stored innermost first, so the outermost dimension is the
/// last entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type<'a> {
    pub basic: BasicType,
    pub precision: Precision,
    pub qualifier: Qualifier,
    pub flags: TypeFlags,
    pub primary_size: u8,
    pub secondary_size: u8,
    pub array_sizes: &'a [u32],
    pub structure: Option<&'a StructType<'a>>,
}

impl<'a> Type<'a> {
    /// A scalar (or sampler) type with default precision and qualifier.
    pub const fn scalar(basic: BasicType) -> Self {
        Self {
            basic,
            precision: Precision::Undefined,
            qualifier: Qualifier::Temporary,
            flags: TypeFlags::empty(),
            primary_size: 1,
            secondary_size: 1,
            array_sizes: &[],
            structure: None,
        }
    }

    pub const fn void() -> Self {
        Self::scalar(BasicType::Void)
    }

    pub const fn float() -> Self {
        Self::scalar(BasicType::Float)
    }

    pub const fn int() -> Self {
        Self::scalar(BasicType::Int)
    }

    pub const fn uint() -> Self {
        Self::scalar(BasicType::UInt)
    }

    pub const fn bool() -> Self {
        Self::scalar(BasicType::Bool)
    }

    pub const fn vec(basic: BasicType, size: u8) -> Self {
        let mut ty = Self::scalar(basic);
        ty.primary_size = size;
        ty
    }

    /// A float matrix with `cols` columns and `rows` rows.
    pub const fn mat(cols: u8, rows: u8) -> Self {
        let mut ty = Self::scalar(BasicType::Float);
        ty.primary_size = cols;
        ty.secondary_size = rows;
        ty
    }

    pub const fn structure(structure: &'a StructType<'a>) -> Self {
        let mut ty = Self::scalar(BasicType::Struct);
        ty.structure = Some(structure);
        ty
    }

    pub const fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub const fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub const fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Attach array sizes, innermost first.
    pub const fn with_array_sizes(mut self, sizes: &'a [u32]) -> Self {
        self.array_sizes = sizes;
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_void(&self) -> bool {
        self.basic == BasicType::Void && !self.is_array()
    }

    pub fn is_array(&self) -> bool {
        !self.array_sizes.is_empty()
    }

    pub fn is_struct(&self) -> bool {
        self.basic == BasicType::Struct
    }

    pub fn is_sampler(&self) -> bool {
        self.basic.is_sampler()
    }

    /// A single value of a numeric or boolean basic type.
    pub fn is_scalar(&self) -> bool {
        self.primary_size == 1
            && self.secondary_size == 1
            && !self.is_array()
            && !self.is_struct()
            && !self.is_sampler()
    }

    pub fn is_vector(&self) -> bool {
        self.primary_size > 1 && self.secondary_size == 1 && !self.is_array()
    }

    pub fn is_matrix(&self) -> bool {
        self.primary_size > 1 && self.secondary_size > 1 && !self.is_array()
    }

    pub fn cols(&self) -> u8 {
        self.primary_size
    }

    pub fn rows(&self) -> u8 {
        self.secondary_size
    }

    /// The outermost array dimension, if any.
    pub fn outermost_array_size(&self) -> Option<u32> {
        self.array_sizes.last().copied()
    }

    /// Total number of scalar components, counting arrays and struct fields.
    pub fn component_count(&self) -> u64 {
        let element = match self.structure {
            Some(structure) if self.is_struct() => structure
                .fields
                .iter()
                .map(|field| field.ty.component_count())
                .sum(),
            _ => u64::from(self.primary_size) * u64::from(self.secondary_size),
        };
        self.array_sizes
            .iter()
            .fold(element, |count, &size| count * u64::from(size))
    }

    /// The type with the outermost array dimension removed.
    pub fn element_type(&self) -> Type<'a> {
        let mut element = *self;
        if let Some((_, inner)) = self.array_sizes.split_last() {
            element.array_sizes = inner;
        }
        element
    }

    /// One component of this type: same basic kind and precision, no arrays.
    pub fn scalar_type(&self) -> Type<'a> {
        Type::scalar(self.basic).with_precision(self.precision)
    }

    /// A column of a matrix type.
    pub fn column_type(&self) -> Type<'a> {
        Type::vec(self.basic, self.secondary_size).with_precision(self.precision)
    }

    /// The type with storage qualifier and flags dropped, as used for
    /// compiler-introduced temporaries.
    pub fn as_temporary(&self) -> Type<'a> {
        let mut ty = *self;
        ty.qualifier = Qualifier::Temporary;
        ty.flags = TypeFlags::empty();
        ty
    }

    /// Whether two types describe the same values, ignoring qualifiers,
    /// precision and flags.
    pub fn same_shape(&self, other: &Type<'_>) -> bool {
        self.basic == other.basic
            && self.primary_size == other.primary_size
            && self.secondary_size == other.secondary_size
            && self.array_sizes == other.array_sizes
            && match (self.structure, other.structure) {
                (Some(a), Some(b)) => a.name == b.name,
                (None, None) => true,
                _ => false,
            }
    }

    /// Code used to mangle this type into function names.
    ///
    /// Scalars are `<basic>1` (`f1`), vectors `v<basic><size>` (`vi2`),
    /// matrices `m<basic><cols><rows>` (`mf33`), samplers their basic code,
    /// structures `S<name>`; each array dimension appends `[N]`.
    pub fn mangled_name(&self) -> String {
        let mut mangled = String::new();
        if self.is_sampler() {
            mangled.push_str(self.basic.mangle_code());
        } else if let (true, Some(structure)) = (self.is_struct(), self.structure) {
            mangled.push('S');
            mangled.push_str(structure.name);
        } else if self.secondary_size > 1 {
            mangled.push('m');
            mangled.push_str(self.basic.mangle_code());
            mangled.push_str(&format!("{}{}", self.primary_size, self.secondary_size));
        } else if self.primary_size > 1 {
            mangled.push('v');
            mangled.push_str(self.basic.mangle_code());
            mangled.push_str(&self.primary_size.to_string());
        } else {
            mangled.push_str(self.basic.mangle_code());
            mangled.push('1');
        }
        for size in self.array_sizes.iter().rev() {
            mangled.push_str(&format!("[{size}]"));
        }
        mangled
    }
}

impl fmt::Display for Type<'_> {
    /// Shading-language spelling, e.g. `vec3`, `mat2x3`, `float[3]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.basic, self.structure) {
            (BasicType::Struct, Some(structure)) => write!(f, "struct {}", structure.name)?,
            (basic, _) if basic.is_sampler() || basic == BasicType::Void => {
                f.write_str(basic.keyword())?
            }
            (basic, _) if self.secondary_size > 1 => {
                if self.primary_size == self.secondary_size {
                    write!(f, "mat{}", self.primary_size)?
                } else {
                    write!(f, "mat{}x{}", self.primary_size, self.secondary_size)?
                }
                if basic != BasicType::Float {
                    write!(f, "<{}>", basic.keyword())?
                }
            }
            (basic, _) if self.primary_size > 1 => {
                write!(f, "{}vec{}", basic.vector_prefix(), self.primary_size)?
            }
            (basic, _) => f.write_str(basic.keyword())?,
        }
        for size in self.array_sizes.iter().rev() {
            write!(f, "[{size}]")?;
        }
        Ok(())
    }
}
