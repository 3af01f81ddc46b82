//! Lowers the raw syntax tree into the runtime [`Node`] tree.
//!
//! Lowering is total and has no side effects: every raw tree compiles.
//! Problems that can only be judged against data, such as a call to an
//! unknown function, surface when the tree is evaluated.

pub mod node;

use smol_str::SmolStr;

use crate::{
    ast::node::{self as ast, Expr},
    eval::builtin::BUILTIN_FUNCTIONS,
    feature::{PathSegment, PropertyPath},
    range::Range,
    value::Value,
};
pub use node::{BinaryOp, Call, LogicalOp, Node, UnaryOp};

pub fn compile(node: &ast::Node) -> Node {
    match &*node.expr {
        Expr::Literal(value) => Node::Literal(value.clone()),
        Expr::Bound(name) => Node::Binding(name.clone()),
        Expr::Ident(name) => Node::Identifier(PropertyPath::key(name)),
        Expr::Member {
            object,
            property,
            computed,
        } => match static_path(node).map(PropertyPath::without_feature_prefix) {
            Some(path) => Node::Identifier(path),
            None => Node::Member(
                Box::new(compile(object)),
                Box::new(compile_member_key(property, *computed)),
            ),
        },
        Expr::Array(elements) => Node::Array(elements.iter().map(compile).collect()),
        Expr::Unary(op, operand) => match node::UnaryOp::from_symbol(op) {
            Some(op) => Node::Unary(op, Box::new(compile(operand))),
            None => compile_call(op, [operand], node.range),
        },
        // Operators without a builtin meaning become calls named by their symbol.
        Expr::Binary(op, lhs, rhs) => match node::BinaryOp::from_symbol(op) {
            Some(op) => Node::Binary(op, Box::new(compile(lhs)), Box::new(compile(rhs))),
            None => compile_call(op, [lhs, rhs], node.range),
        },
        Expr::Logical(op, lhs, rhs) => match node::LogicalOp::from_symbol(op) {
            Some(op) => Node::Logical(op, Box::new(compile(lhs)), Box::new(compile(rhs))),
            None => compile_call(op, [lhs, rhs], node.range),
        },
        Expr::Conditional(test, consequent, alternate) => Node::Conditional(
            Box::new(compile(test)),
            Box::new(compile(consequent)),
            Box::new(compile(alternate)),
        ),
        Expr::Call(name, args) => compile_call(name, args, node.range),
    }
}

fn compile_call<'a>(
    name: &SmolStr,
    args: impl IntoIterator<Item = &'a ast::Node>,
    range: Range,
) -> Node {
    Node::Call(Call {
        name: name.clone(),
        function: BUILTIN_FUNCTIONS.get(name.as_str()),
        args: args.into_iter().map(compile).collect(),
        range,
    })
}

fn compile_member_key(property: &ast::Node, computed: bool) -> Node {
    match (&*property.expr, computed) {
        (Expr::Ident(name), false) => Node::Literal(Value::String(name.to_string())),
        _ => compile(property),
    }
}

// `a.b`, `a['b']` and `a[0]` chains rooted at an identifier. As in `${...}`
// references, `feature.a` names the attribute `a`.
fn static_path(node: &ast::Node) -> Option<PropertyPath> {
    match &*node.expr {
        Expr::Ident(name) => Some(PropertyPath::key(name)),
        Expr::Member {
            object,
            property,
            computed,
        } => {
            let segment = match (&*property.expr, *computed) {
                (Expr::Ident(name), false) => PathSegment::Key(name.clone()),
                (Expr::Literal(Value::String(key)), true) => PathSegment::Key(SmolStr::new(key)),
                (Expr::Literal(Value::Number(n)), true) => PathSegment::Index(n.as_index()?),
                _ => return None,
            };
            let mut path = static_path(object)?;
            path.push(segment);
            Some(path)
        }
        _ => None,
    }
}
