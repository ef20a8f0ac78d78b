//! Abstract syntax tree for XPath 1.0 expressions.
//!
//! The AST is produced by [`super::parser::parse`] and consumed by the
//! evaluator. Location paths are sequences of [`Step`]s, each with an
//! [`Axis`], a [`NodeTest`], and predicate expressions.
//!
//! Abbreviations are expanded at parse time: `//` becomes a
//! `descendant-or-self::node()` step, `.` becomes `self::node()`, and `..`
//! becomes `parent::node()`, so the evaluator only sees canonical steps.

use std::fmt;

/// An XPath 1.0 expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A numeric literal (e.g., `42`, `3.14`, `0x1F`, `1e3`).
    Number(f64),

    /// A string literal (e.g., `"hello"` or `'world'`).
    Literal(String),

    /// A unary operation (`-x`, and the tolerated `+x`).
    UnaryOp {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        expr: Box<Expr>,
    },

    /// A binary operation (e.g., `a + b`, `x = y`, `p and q`).
    BinaryOp {
        /// The operator.
        op: BinaryOp,
        /// The left-hand operand.
        left: Box<Expr>,
        /// The right-hand operand.
        right: Box<Expr>,
    },

    /// A union of two node-sets (`a | b`).
    Union(Box<Expr>, Box<Expr>),

    /// A function call (e.g., `contains(a, 'b')`).
    FunctionCall {
        /// The function name.
        name: String,
        /// The argument expressions.
        args: Vec<Expr>,
    },

    /// A location path.
    Path(Path),

    /// A filter expression: a parenthesized (or otherwise primary)
    /// expression with predicates and an optional path continuation,
    /// e.g., `(//a)[1]/b`. Allowed only at the head of a path.
    Filter {
        /// The primary expression being filtered.
        expr: Box<Expr>,
        /// Predicates applied to the primary's node-set (document order).
        predicates: Vec<Expr>,
        /// Steps applied after the predicates.
        steps: Vec<Step>,
    },
}

/// A location path: an optional leading `/` and a sequence of steps.
#[derive(Debug, Clone)]
pub struct Path {
    /// Starts at the root (`/…`) rather than the context node.
    pub absolute: bool,
    /// The steps, evaluated left to right.
    pub steps: Vec<Step>,
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Numeric negation (`-`).
    Neg,
    /// Numeric identity (`+`, tolerated).
    Plus,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`div`).
    Div,
    /// Modulo (`mod`).
    Mod,
    /// Equality (`=`).
    Eq,
    /// Inequality (`!=`).
    Neq,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Lte,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Gte,
    /// Logical conjunction (`and`).
    And,
    /// Logical disjunction (`or`).
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::And => "and",
            Self::Or => "or",
        };
        f.write_str(s)
    }
}

/// A single step in a location path.
#[derive(Debug, Clone)]
pub struct Step {
    /// The axis along which candidates are selected.
    pub axis: Axis,
    /// The test applied to each candidate.
    pub node_test: NodeTest,
    /// Predicates filtering the selected partition. Positions count in the
    /// axis's natural order (reverse axes count from the axis origin).
    pub predicates: Vec<Expr>,
}

/// An XPath axis. XPath 1.0 defines thirteen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Direct children.
    Child,
    /// All proper descendants, pre-order.
    Descendant,
    /// The immediate parent.
    Parent,
    /// The parent chain up to and including the root.
    Ancestor,
    /// Siblings after the context node.
    FollowingSibling,
    /// Siblings before the context node, nearest first.
    PrecedingSibling,
    /// All nodes after the context node in document order that are not
    /// descendants.
    Following,
    /// All nodes before the context node that are not ancestors, nearest
    /// first.
    Preceding,
    /// Attributes of the context element.
    Attribute,
    /// In-scope namespaces of the context element.
    Namespace,
    /// The context node itself.
    Self_,
    /// The context node, then its descendants.
    DescendantOrSelf,
    /// The context node, then its ancestor chain.
    AncestorOrSelf,
}

impl Axis {
    /// Returns the axis name as it appears in XPath syntax.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::Parent => "parent",
            Self::Ancestor => "ancestor",
            Self::FollowingSibling => "following-sibling",
            Self::PrecedingSibling => "preceding-sibling",
            Self::Following => "following",
            Self::Preceding => "preceding",
            Self::Attribute => "attribute",
            Self::Namespace => "namespace",
            Self::Self_ => "self",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::AncestorOrSelf => "ancestor-or-self",
        }
    }

    /// Parses an axis name string into an `Axis` variant.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Self::Child),
            "descendant" => Some(Self::Descendant),
            "parent" => Some(Self::Parent),
            "ancestor" => Some(Self::Ancestor),
            "following-sibling" => Some(Self::FollowingSibling),
            "preceding-sibling" => Some(Self::PrecedingSibling),
            "following" => Some(Self::Following),
            "preceding" => Some(Self::Preceding),
            "attribute" => Some(Self::Attribute),
            "namespace" => Some(Self::Namespace),
            "self" => Some(Self::Self_),
            "descendant-or-self" => Some(Self::DescendantOrSelf),
            "ancestor-or-self" => Some(Self::AncestorOrSelf),
            _ => None,
        }
    }

    /// Returns `true` for the reverse axes, whose natural order runs
    /// against document order. Predicate positions count in this natural
    /// order.
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Ancestor
                | Self::AncestorOrSelf
                | Self::Parent
                | Self::Preceding
                | Self::PrecedingSibling
        )
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node test in a location path step: a name test or a kind test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// The `*` wildcard: any node of the axis's principal kind.
    Wildcard,

    /// An unprefixed name test, matched by qualified-name equality.
    Name(String),

    /// A prefixed wildcard like `p:*`: any node whose bound namespace URI
    /// equals the URI bound to `p` at the context node.
    PrefixWildcard(String),

    /// A prefixed name test like `p:l`, matched by expanded name
    /// (namespace URI + local name).
    PrefixName(String, String),

    /// `node()`: any node.
    Node,

    /// `text()`: text nodes (including CDATA).
    Text,

    /// `comment()`: comment nodes.
    Comment,

    /// `processing-instruction(target?)`: PI nodes, optionally filtered by
    /// target.
    ProcessingInstruction(Option<String>),
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => f.write_str("*"),
            Self::Name(name) => f.write_str(name),
            Self::PrefixWildcard(prefix) => write!(f, "{prefix}:*"),
            Self::PrefixName(prefix, local) => write!(f, "{prefix}:{local}"),
            Self::Node => f.write_str("node()"),
            Self::Text => f.write_str("text()"),
            Self::Comment => f.write_str("comment()"),
            Self::ProcessingInstruction(None) => f.write_str("processing-instruction()"),
            Self::ProcessingInstruction(Some(target)) => {
                write!(f, "processing-instruction('{target}')")
            }
        }
    }
}
