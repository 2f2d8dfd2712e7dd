//! Tree model and traversal framework for glint.
//!
//! Nodes, symbols and types all live in one [`PoolAllocator`] per compilation
//! and are referenced by plain shared references. The tree is edited through
//! interior-mutable child slots, either directly from a traversal hook or via
//! queued edits committed after the walk.
//!
//! ## Modules
//!
//! - [`node`]: the closed set of node kinds and [`TranslationUnit`]
//! - [`types`]: [`Type`] descriptors
//! - [`symbol`]: [`Variable`] and [`Function`] records
//! - [`builder`]: [`NodeBuilder`], the only way to create nodes
//! - [`traverse`]: the [`Visitor`](traverse::Visitor) walker, edit queues and
//!   fixed-point driver
//! - [`dump`]: textual tree rendering
//!
//! [`PoolAllocator`]: glint_core::PoolAllocator

pub mod builder;
pub mod constant;
pub mod dump;
pub mod node;
pub mod ops;
pub mod symbol;
pub mod temporaries;
pub mod traverse;
pub mod types;

pub use builder::NodeBuilder;
pub use constant::ConstantValue;
pub use dump::{TreeDumper, dump_tree};
pub use node::{
    AggregateNode, AggregateOp, BinaryNode, BlockNode, BranchNode, ConstantNode, DeclarationNode,
    FunctionDefinitionNode, IfElseNode, Link, LoopNode, Node, NodeKind, NodeRef, OptLink,
    PrototypeNode, Sequence, SymbolNode, TernaryNode, TranslationUnit, UnaryNode,
};
pub use ops::{BinaryOp, BranchOp, LoopKind, UnaryOp};
pub use symbol::{Function, SymbolId, SymbolKind, Variable};
pub use temporaries::Temporaries;
pub use types::{BasicType, Field, Precision, Qualifier, StructType, Type, TypeFlags};
