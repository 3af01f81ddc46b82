use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::{range::Range, value::Value};

pub type Args = SmallVec<[Node; 4]>;

/// A node of the raw syntax tree produced by the parser.
#[derive(PartialEq, Debug, Clone)]
pub struct Node {
    pub range: Range,
    pub expr: Box<Expr>,
}

impl Node {
    pub fn new(range: Range, expr: Expr) -> Self {
        Self {
            range,
            expr: Box::new(expr),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expr {
    Literal(Value),
    /// Reference to a literal binding registered for the parse call.
    Bound(SmolStr),
    Ident(SmolStr),
    /// `object.property` when `computed` is false, `object[property]` otherwise.
    Member {
        object: Node,
        property: Node,
        computed: bool,
    },
    Array(Vec<Node>),
    Unary(SmolStr, Node),
    Binary(SmolStr, Node, Node),
    Logical(SmolStr, Node, Node),
    Conditional(Node, Node, Node),
    Call(SmolStr, Args),
}
