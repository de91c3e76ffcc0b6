//! ClassAd expression tree definitions.

/// Source span for error reporting.
/// Uses byte offsets into the source string.
pub type Span = std::ops::Range<usize>;

/// A literal constant appearing in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Undefined,
    Error,
    Null,
}

impl Literal {
    /// Returns true for integer and float literals.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Literal::Integer(_) | Literal::Float(_))
    }
}

/// Scale flag carried by numeric literals and arithmetic nodes.
///
/// `Kilo` divides the computed result by 1024 (written `k` or `K` after
/// the operand in source text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    None,
    Kilo,
}

impl Unit {
    pub fn is_kilo(self) -> bool {
        self == Unit::Kilo
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mult,
    Div,

    // Comparison
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
    /// `=?=`: same type and same value.
    MetaEq,
    /// `=!=`: negation of `=?=`.
    MetaNeq,

    // Logical
    And,
    Or,

    /// `name = expr`
    Assign,
}

impl BinaryOp {
    /// All operator kinds, in declaration order.
    pub const ALL: [BinaryOp; 15] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mult,
        BinaryOp::Div,
        BinaryOp::Eq,
        BinaryOp::Neq,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::MetaEq,
        BinaryOp::MetaNeq,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Assign,
    ];

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mult | BinaryOp::Div
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::MetaEq
                | BinaryOp::MetaNeq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Aggregate operators folding one attribute across a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AggregateOp {
    /// Numeric sum of every child value.
    AggAdd,
    /// The common value of every child, or `Null` once two disagree.
    #[default]
    AggEq,
}

/// ClassAd expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        unit: Unit,
    },

    /// Attribute reference, possibly scoped (`MY.Memory`, `TARGET.Arch`).
    Variable(String),

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        unit: Unit,
    },

    /// Left-associated fold whose leaves are `Assign` nodes.
    Aggregate {
        op: AggregateOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    // === Constructors ===

    pub fn literal(value: Literal) -> Self {
        Expr::Literal {
            value,
            unit: Unit::None,
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::literal(Literal::Integer(value))
    }

    pub fn float(value: f64) -> Self {
        Self::literal(Literal::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(Literal::String(value.into()))
    }

    pub fn bool(value: bool) -> Self {
        Self::literal(Literal::Bool(value))
    }

    pub fn undefined() -> Self {
        Self::literal(Literal::Undefined)
    }

    pub fn error() -> Self {
        Self::literal(Literal::Error)
    }

    pub fn null() -> Self {
        Self::literal(Literal::Null)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            unit: Unit::None,
        }
    }

    /// Build `name = rhs`.
    pub fn assign(name: impl Into<String>, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Assign, Expr::variable(name), rhs)
    }

    pub fn aggregate(op: AggregateOp, left: Expr, right: Expr) -> Self {
        Expr::Aggregate {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Returns this node with its unit flag set to `Kilo`.
    ///
    /// Only numeric literals and arithmetic nodes carry a unit; any other
    /// node is returned unchanged.
    pub fn with_kilo(self) -> Self {
        match self {
            Expr::Literal { value, .. } if value.is_numeric() => Expr::Literal {
                value,
                unit: Unit::Kilo,
            },
            Expr::Binary {
                op, left, right, ..
            } if op.is_arithmetic() => Expr::Binary {
                op,
                left,
                right,
                unit: Unit::Kilo,
            },
            other => other,
        }
    }

    // === Accessors ===

    /// If this is `Assign(Variable(name), rhs)`, returns `(name, rhs)`.
    pub fn as_assignment(&self) -> Option<(&str, &Expr)> {
        match self {
            Expr::Binary {
                op: BinaryOp::Assign,
                left,
                right,
                ..
            } => match left.as_ref() {
                Expr::Variable(name) => Some((name.as_str(), right.as_ref())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns true if this node is a well-formed assignment statement.
    pub fn is_assignment(&self) -> bool {
        self.as_assignment().is_some()
    }

    /// Returns the literal value if this node is a literal.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Collect every variable name referenced by this expression, in
    /// left-to-right order. The target of an assignment is not included.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Literal { .. } => {}
            Expr::Variable(name) => names.push(name),
            Expr::Binary {
                op: BinaryOp::Assign,
                right,
                ..
            } => right.collect_variables(names),
            Expr::Binary { left, right, .. } | Expr::Aggregate { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
        }
    }
}
