pub const OR: &str = "||";
pub const AND: &str = "&&";

pub const EQ: &str = "==";
pub const NE: &str = "!=";
pub const MATCH: &str = "=~";
pub const NOT_MATCH: &str = "!~";

pub const LT: &str = "<";
pub const LTE: &str = "<=";
pub const GT: &str = ">";
pub const GTE: &str = ">=";

pub const ADD: &str = "+";
pub const SUB: &str = "-";
pub const MUL: &str = "*";
pub const DIV: &str = "/";
pub const MOD: &str = "%";

pub const NOT: &str = "!";

pub const UNARY_OPERATORS: [&str; 3] = [NOT, SUB, ADD];

pub const OR_PRECEDENCE: u8 = 1;
pub const AND_PRECEDENCE: u8 = 2;
pub const EQUALITY_PRECEDENCE: u8 = 6;
pub const RELATIONAL_PRECEDENCE: u8 = 7;
pub const ADDITIVE_PRECEDENCE: u8 = 9;
pub const MULTIPLICATIVE_PRECEDENCE: u8 = 10;

pub const BINARY_OPERATORS: [(&str, u8); 13] = [
    (OR, OR_PRECEDENCE),
    (AND, AND_PRECEDENCE),
    (EQ, EQUALITY_PRECEDENCE),
    (NE, EQUALITY_PRECEDENCE),
    (LT, RELATIONAL_PRECEDENCE),
    (LTE, RELATIONAL_PRECEDENCE),
    (GT, RELATIONAL_PRECEDENCE),
    (GTE, RELATIONAL_PRECEDENCE),
    (ADD, ADDITIVE_PRECEDENCE),
    (SUB, ADDITIVE_PRECEDENCE),
    (MUL, MULTIPLICATIVE_PRECEDENCE),
    (DIV, MULTIPLICATIVE_PRECEDENCE),
    (MOD, MULTIPLICATIVE_PRECEDENCE),
];
