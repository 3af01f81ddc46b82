use smol_str::SmolStr;

use crate::{
    ast::constants, eval::builtin::BuiltinFunction, feature::PropertyPath, range::Range,
    value::Value,
};

/// Immutable runtime tree evaluated against one feature at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Value),
    /// Static property path resolved against the feature's properties.
    Identifier(PropertyPath),
    /// Synthetic literal reference; the value comes from the expression's bindings.
    Binding(SmolStr),
    Member(Box<Node>, Box<Node>),
    Array(Vec<Node>),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Logical(LogicalOp, Box<Node>, Box<Node>),
    Conditional(Box<Node>, Box<Node>, Box<Node>),
    Call(Call),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub name: SmolStr,
    /// `None` when no builtin has this name; evaluating the call then fails.
    pub function: Option<&'static BuiltinFunction>,
    pub args: Vec<Node>,
    pub range: Range,
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.function.is_some() == other.function.is_some()
            && self.args == other.args
            && self.range == other.range
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            constants::NOT => Some(UnaryOp::Not),
            constants::SUB => Some(UnaryOp::Neg),
            constants::ADD => Some(UnaryOp::Plus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Match,
    NotMatch,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            constants::ADD => Some(BinaryOp::Add),
            constants::SUB => Some(BinaryOp::Sub),
            constants::MUL => Some(BinaryOp::Mul),
            constants::DIV => Some(BinaryOp::Div),
            constants::MOD => Some(BinaryOp::Mod),
            constants::EQ => Some(BinaryOp::Eq),
            constants::NE => Some(BinaryOp::Ne),
            constants::LT => Some(BinaryOp::Lt),
            constants::LTE => Some(BinaryOp::Lte),
            constants::GT => Some(BinaryOp::Gt),
            constants::GTE => Some(BinaryOp::Gte),
            constants::MATCH => Some(BinaryOp::Match),
            constants::NOT_MATCH => Some(BinaryOp::NotMatch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            constants::AND => Some(LogicalOp::And),
            constants::OR => Some(LogicalOp::Or),
            _ => None,
        }
    }
}
