//! Abstract syntax tree for descent.

pub mod node;
pub mod types;

pub use node::{BinaryOp, Initializer, Node, NodeKind, Program, UnaryOp};
pub use types::TypeExpr;
