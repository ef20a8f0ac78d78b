//! XPath expression evaluator.
//!
//! Walks an [`Expr`] AST against a [`Document`] tree and produces a
//! [`Value`]. Every expression is evaluated with respect to a context
//! frame: a context node, a 1-based position, and a size. The initial
//! frame is `{node, 1, 1}`; predicate iteration pushes a fresh frame per
//! candidate.
//!
//! # Location paths
//!
//! Steps are applied one at a time. For each context node in the incoming
//! set the axis is enumerated and tested separately, producing one
//! partition per context node; predicates filter each partition in the
//! axis's natural order (so `position()` counts from the axis origin on
//! reverse axes) before the partitions are flattened, deduplicated, and
//! sorted into document order. This is what makes `//x[1]` select the
//! first `x` under each parent while `(//x)[1]` selects the globally
//! first.

use crate::tree::{Document, NodeId, NodeKind};

use super::ast::{BinaryOp, Expr, Path, Step, UnaryOp};
use super::axes;
use super::types::{parse_number, QueryError, Value};

/// An evaluation context frame: the context node plus its position and the
/// size of the node-set it was drawn from.
pub struct Context<'a> {
    /// The document being queried.
    pub(crate) doc: &'a Document,
    /// The context node.
    pub(crate) node: NodeId,
    /// 1-based position of the context node within its partition.
    pub(crate) position: usize,
    /// The size of the partition.
    pub(crate) size: usize,
}

impl<'a> Context<'a> {
    /// Creates the initial context frame `{node, 1, 1}`.
    #[must_use]
    pub fn new(doc: &'a Document, node: NodeId) -> Self {
        Self {
            doc,
            node,
            position: 1,
            size: 1,
        }
    }

    /// Evaluates an expression AST against this context.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on a type mismatch, an unknown function, or
    /// an argument count violation.
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, QueryError> {
        self.eval_expr(expr)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    pub(crate) fn eval_expr(&self, expr: &Expr) -> Result<Value, QueryError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Literal(s) => Ok(Value::String(s.clone())),
            Expr::UnaryOp { op, expr } => self.eval_unary(*op, expr),
            Expr::BinaryOp { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Union(left, right) => self.eval_union(left, right),
            Expr::FunctionCall { name, args } => self.call_function(name, args),
            Expr::Path(path) => self.eval_path(path),
            Expr::Filter {
                expr,
                predicates,
                steps,
            } => self.eval_filter(expr, predicates, steps),
        }
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn eval_unary(&self, op: UnaryOp, expr: &Expr) -> Result<Value, QueryError> {
        let n = self.value_to_number(&self.eval_expr(expr)?);
        Ok(Value::Number(match op {
            UnaryOp::Neg => -n,
            UnaryOp::Plus => n,
        }))
    }

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, QueryError> {
        match op {
            BinaryOp::And => {
                let lv = self.eval_expr(left)?;
                if !lv.to_boolean() {
                    return Ok(Value::Boolean(false));
                }
                let rv = self.eval_expr(right)?;
                Ok(Value::Boolean(rv.to_boolean()))
            }
            BinaryOp::Or => {
                let lv = self.eval_expr(left)?;
                if lv.to_boolean() {
                    return Ok(Value::Boolean(true));
                }
                let rv = self.eval_expr(right)?;
                Ok(Value::Boolean(rv.to_boolean()))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let ln = self.value_to_number(&self.eval_expr(left)?);
                let rn = self.value_to_number(&self.eval_expr(right)?);
                // IEEE semantics throughout: NaN propagates, `div` by zero
                // yields a signed infinity, `mod` of non-finite operands is
                // NaN.
                let result = match op {
                    BinaryOp::Add => ln + rn,
                    BinaryOp::Sub => ln - rn,
                    BinaryOp::Mul => ln * rn,
                    BinaryOp::Div => ln / rn,
                    BinaryOp::Mod => ln % rn,
                    _ => unreachable!(),
                };
                Ok(Value::Number(result))
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                let eq = self.compare_equality(&lv, &rv);
                Ok(Value::Boolean(if op == BinaryOp::Eq { eq } else { !eq }))
            }
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                Ok(Value::Boolean(self.compare_relational(op, &lv, &rv)))
            }
        }
    }

    fn eval_union(&self, left: &Expr, right: &Expr) -> Result<Value, QueryError> {
        let mut nodes = self.expect_node_set(self.eval_expr(left)?)?;
        nodes.extend(self.expect_node_set(self.eval_expr(right)?)?);
        sort_document_order(&mut nodes);
        Ok(Value::NodeSet(nodes))
    }

    fn expect_node_set(&self, value: Value) -> Result<Vec<NodeId>, QueryError> {
        match value {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(QueryError::Type {
                expected: "node-set".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Location paths
    // -----------------------------------------------------------------------

    fn eval_path(&self, path: &Path) -> Result<Value, QueryError> {
        let start = if path.absolute {
            self.doc.root()
        } else {
            self.node
        };
        let mut nodes = vec![start];
        for step in &path.steps {
            nodes = self.apply_step(&nodes, step)?;
        }
        Ok(Value::NodeSet(nodes))
    }

    /// Applies one step to every node of the incoming set. Each context
    /// node produces its own partition; predicates run per partition before
    /// the results are merged into document order.
    fn apply_step(&self, input: &[NodeId], step: &Step) -> Result<Vec<NodeId>, QueryError> {
        let mut result: Vec<NodeId> = Vec::new();
        for &context in input {
            let mut partition: Vec<NodeId> = axes::enumerate(self.doc, context, step.axis)
                .into_iter()
                .filter(|&candidate| {
                    axes::matches(self.doc, candidate, &step.node_test, step.axis, context)
                })
                .collect();
            partition = self.apply_predicates(partition, &step.predicates)?;
            result.extend(partition);
        }
        sort_document_order(&mut result);
        Ok(result)
    }

    /// Filters a partition through a predicate list. The partition arrives
    /// in the axis's natural order, which is exactly the order positions
    /// count in.
    fn apply_predicates(
        &self,
        mut partition: Vec<NodeId>,
        predicates: &[Expr],
    ) -> Result<Vec<NodeId>, QueryError> {
        for predicate in predicates {
            let size = partition.len();
            let mut kept = Vec::with_capacity(size);
            for (i, &node) in partition.iter().enumerate() {
                let frame = Context {
                    doc: self.doc,
                    node,
                    position: i + 1,
                    size,
                };
                let value = frame.eval_expr(predicate)?;
                if predicate_truth(&value, i + 1) {
                    kept.push(node);
                }
            }
            partition = kept;
        }
        Ok(partition)
    }

    // -----------------------------------------------------------------------
    // Filter expressions
    // -----------------------------------------------------------------------

    /// Evaluates `(expr)[predicates]/steps`. The primary must yield a
    /// node-set; it is flattened into a single document-ordered partition
    /// for the predicates.
    fn eval_filter(
        &self,
        expr: &Expr,
        predicates: &[Expr],
        steps: &[Step],
    ) -> Result<Value, QueryError> {
        let value = self.eval_expr(expr)?;
        let mut nodes = match value {
            Value::NodeSet(nodes) => nodes,
            other => {
                return Err(QueryError::Type {
                    expected: "node-set".to_string(),
                    found: other.type_name().to_string(),
                });
            }
        };

        sort_document_order(&mut nodes);
        nodes = self.apply_predicates(nodes, predicates)?;
        for step in steps {
            nodes = self.apply_step(&nodes, step)?;
        }
        Ok(Value::NodeSet(nodes))
    }

    // -----------------------------------------------------------------------
    // Type conversion (document-aware)
    // -----------------------------------------------------------------------

    /// Converts a value to a number. The first node (in document order) of
    /// a node-set supplies its string-value; an empty set converts to NaN.
    pub(crate) fn value_to_number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::String(s) => parse_number(s),
            Value::NodeSet(nodes) => match first_in_document_order(nodes) {
                Some(node) => parse_number(&self.string_value(node)),
                None => f64::NAN,
            },
        }
    }

    /// Converts a value to a string. The first node (in document order) of
    /// a node-set supplies its string-value; an empty set converts to the
    /// empty string.
    pub(crate) fn value_to_string(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Boolean(b) => {
                if *b {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            Value::Number(n) => super::types::format_number(*n),
            Value::NodeSet(nodes) => match first_in_document_order(nodes) {
                Some(node) => self.string_value(node),
                None => String::new(),
            },
        }
    }

    /// Computes the string-value of a node.
    ///
    /// Root and element nodes concatenate their descendant text; text,
    /// comment, PI, attribute, doctype, and namespace nodes yield their own
    /// content.
    pub(crate) fn string_value(&self, node: NodeId) -> String {
        match &self.doc.node(node).kind {
            NodeKind::Root { .. } | NodeKind::Element { .. } => self.doc.text_content(node),
            NodeKind::Text { content, .. } | NodeKind::Comment { content } => content.clone(),
            NodeKind::ProcessingInstruction { value, .. } | NodeKind::Doctype { value } => {
                value.clone()
            }
            NodeKind::Attribute { value, .. } => value.clone(),
            NodeKind::Namespace { uri, .. } => uri.clone(),
            NodeKind::XmlDecl { .. } => String::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Comparison matrix
    // -----------------------------------------------------------------------

    /// Equality per the XPath 1.0 comparison matrix. Node-set operands
    /// compare existentially by string-value; among primitives, boolean
    /// coercion wins over numeric, numeric over string.
    #[allow(clippy::float_cmp)]
    pub(crate) fn compare_equality(&self, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (Value::NodeSet(lns), Value::NodeSet(rns)) => {
                let right_strings: Vec<String> =
                    rns.iter().map(|&n| self.string_value(n)).collect();
                lns.iter().any(|&ln| {
                    let lsv = self.string_value(ln);
                    right_strings.iter().any(|rsv| *rsv == lsv)
                })
            }
            (Value::NodeSet(ns), Value::Boolean(b)) | (Value::Boolean(b), Value::NodeSet(ns)) => {
                !ns.is_empty() == *b
            }
            (Value::NodeSet(ns), Value::Number(n)) | (Value::Number(n), Value::NodeSet(ns)) => ns
                .iter()
                .any(|&node| parse_number(&self.string_value(node)) == *n),
            (Value::NodeSet(ns), Value::String(s)) | (Value::String(s), Value::NodeSet(ns)) => {
                ns.iter().any(|&node| self.string_value(node) == *s)
            }
            (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                lhs.to_boolean() == rhs.to_boolean()
            }
            (Value::Number(_), _) | (_, Value::Number(_)) => {
                self.value_to_number(lhs) == self.value_to_number(rhs)
            }
            _ => self.value_to_string(lhs) == self.value_to_string(rhs),
        }
    }

    /// Ordering comparisons per the XPath 1.0 matrix: node-set operands
    /// compare existentially by numeric value, everything else coerces to
    /// numbers.
    pub(crate) fn compare_relational(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> bool {
        let cmp = |a: f64, b: f64| match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Lte => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::Gte => a >= b,
            _ => false,
        };

        match (lhs, rhs) {
            (Value::NodeSet(lns), Value::NodeSet(rns)) => {
                let right_numbers: Vec<f64> = rns
                    .iter()
                    .map(|&n| parse_number(&self.string_value(n)))
                    .collect();
                lns.iter().any(|&ln| {
                    let lv = parse_number(&self.string_value(ln));
                    right_numbers.iter().any(|&rv| cmp(lv, rv))
                })
            }
            (Value::NodeSet(ns), other) => {
                let rv = self.value_to_number(other);
                ns.iter()
                    .any(|&node| cmp(parse_number(&self.string_value(node)), rv))
            }
            (other, Value::NodeSet(ns)) => {
                let lv = self.value_to_number(other);
                ns.iter()
                    .any(|&node| cmp(lv, parse_number(&self.string_value(node))))
            }
            _ => cmp(self.value_to_number(lhs), self.value_to_number(rhs)),
        }
    }
}

/// The predicate conversion rule: a number is true iff it equals the
/// context position; everything else coerces to boolean.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn predicate_truth(value: &Value, position: usize) -> bool {
    match value {
        Value::Number(n) => *n == position as f64,
        other => other.to_boolean(),
    }
}

/// Sorts a node-set into document order and drops duplicates. Arena
/// allocation order is document order, so `NodeId` ordering is the
/// comparison key.
fn sort_document_order(nodes: &mut Vec<NodeId>) {
    nodes.sort_unstable();
    nodes.dedup();
}

/// Returns the first node in document order.
fn first_in_document_order(nodes: &[NodeId]) -> Option<NodeId> {
    nodes.iter().copied().min()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::parser::{parse_xml, ParseOptions};
    use crate::xpath::parser::parse;

    fn eval(xml: &str, query: &str) -> Value {
        let doc = parse_xml(xml, &ParseOptions::default()).unwrap();
        let expr = parse(query).unwrap();
        Context::new(&doc, doc.root()).evaluate(&expr).unwrap()
    }

    fn eval_count(xml: &str, query: &str) -> usize {
        match eval(xml, query) {
            Value::NodeSet(nodes) => nodes.len(),
            other => panic!("expected node-set, got {other:?}"),
        }
    }

    fn eval_number(xml: &str, query: &str) -> f64 {
        match eval(xml, query) {
            Value::Number(n) => n,
            other => panic!("expected number, got {other:?}"),
        }
    }

    fn eval_bool(xml: &str, query: &str) -> bool {
        match eval(xml, query) {
            Value::Boolean(b) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    // -- Arithmetic ---------------------------------------------------------

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_number("<r/>", "1 + 2"), 3.0);
        assert_eq!(eval_number("<r/>", "5 - 3"), 2.0);
        assert_eq!(eval_number("<r/>", "3 * 4"), 12.0);
        assert_eq!(eval_number("<r/>", "10 mod 3"), 1.0);
        assert!((eval_number("<r/>", "10 div 3") - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_div_by_zero_signed_infinity() {
        assert_eq!(eval_number("<r/>", "1 div 0"), f64::INFINITY);
        assert_eq!(eval_number("<r/>", "-1 div 0"), f64::NEG_INFINITY);
        assert!(eval_number("<r/>", "0 div 0").is_nan());
    }

    #[test]
    fn test_mod_nan_propagation() {
        assert!(eval_number("<r/>", "'x' mod 2").is_nan());
        assert!(eval_number("<r/>", "1 div 0 mod 2").is_nan());
    }

    #[test]
    fn test_unary() {
        assert_eq!(eval_number("<r/>", "-5"), -5.0);
        assert_eq!(eval_number("<r/>", "--5"), 5.0);
        assert_eq!(eval_number("<r/>", "+5"), 5.0);
    }

    // -- Paths --------------------------------------------------------------

    #[test]
    fn test_absolute_path() {
        assert_eq!(eval_count("<a><b/><b/></a>", "/a/b"), 2);
        assert_eq!(eval_count("<a><b/><b/></a>", "/a/c"), 0);
    }

    #[test]
    fn test_descendant_path() {
        assert_eq!(eval_count("<a><b><c/></b><c/></a>", "//c"), 2);
    }

    #[test]
    fn test_wildcard() {
        assert_eq!(eval_count("<a><b/><c/>text</a>", "/a/*"), 2);
        assert_eq!(eval_count("<a><b/><c/>text</a>", "/a/node()"), 3);
    }

    #[test]
    fn test_result_in_document_order_and_deduped() {
        let xml = "<a><b><c/></b><b><c/></b></a>";
        match eval(xml, "//c | //b") {
            Value::NodeSet(nodes) => {
                assert_eq!(nodes.len(), 4);
                let mut sorted = nodes.clone();
                sorted.sort_unstable();
                assert_eq!(nodes, sorted);
            }
            other => panic!("expected node-set, got {other:?}"),
        }
    }

    // -- Predicates ---------------------------------------------------------

    #[test]
    fn test_positional_predicate_per_partition() {
        // //x[1] is first-per-parent.
        let xml = "<r><a><x i=\"1\"/><x i=\"2\"/></a><a><x i=\"3\"/></a></r>";
        assert_eq!(eval_count(xml, "//x[1]"), 2);
    }

    #[test]
    fn test_filter_predicate_is_global() {
        // (//x)[1] is the globally first.
        let xml = "<r><a><x i=\"1\"/><x i=\"2\"/></a><a><x i=\"3\"/></a></r>";
        assert_eq!(eval_count(xml, "(//x)[1]"), 1);
    }

    #[test]
    fn test_reverse_axis_position_counts_from_origin() {
        let xml = "<a><b/><c/><d/></a>";
        let doc = parse_xml(xml, &ParseOptions::default()).unwrap();
        let expr = parse("ancestor::*[1]").unwrap();
        // Context: the innermost element d.
        let d = doc
            .descendants(doc.root())
            .find(|&id| doc.node_name(id).as_deref() == Some("d"))
            .unwrap();
        let result = Context::new(&doc, d).evaluate(&expr).unwrap();
        match result {
            Value::NodeSet(nodes) => {
                assert_eq!(nodes.len(), 1);
                assert_eq!(doc.node_name(nodes[0]).as_deref(), Some("a"));
            }
            other => panic!("expected node-set, got {other:?}"),
        }
    }

    #[test]
    fn test_preceding_sibling_position() {
        let xml = "<a><b i=\"1\"/><b i=\"2\"/><b i=\"3\"/></a>";
        let doc = parse_xml(xml, &ParseOptions::default()).unwrap();
        let last = doc
            .descendants(doc.root())
            .filter(|&id| doc.node_name(id).as_deref() == Some("b"))
            .last()
            .unwrap();
        let expr = parse("preceding-sibling::b[1]").unwrap();
        let result = Context::new(&doc, last).evaluate(&expr).unwrap();
        match result {
            Value::NodeSet(nodes) => {
                assert_eq!(nodes.len(), 1);
                // Nearest preceding sibling: i="2".
                assert_eq!(doc.attribute(nodes[0], "i"), Some("2"));
            }
            other => panic!("expected node-set, got {other:?}"),
        }
    }

    #[test]
    fn test_boolean_predicate() {
        let xml = "<r><x a=\"1\"/><x/><x a=\"2\"/></r>";
        assert_eq!(eval_count(xml, "//x[@a]"), 2);
        assert_eq!(eval_count(xml, "//x[@a='2']"), 1);
    }

    #[test]
    fn test_predicate_on_scalar_fails() {
        let doc = parse_xml("<r/>", &ParseOptions::default()).unwrap();
        let expr = parse("(1)[1]").unwrap();
        let result = Context::new(&doc, doc.root()).evaluate(&expr);
        assert!(matches!(result, Err(QueryError::Type { .. })));
    }

    // -- Union --------------------------------------------------------------

    #[test]
    fn test_union_requires_node_sets() {
        let doc = parse_xml("<r/>", &ParseOptions::default()).unwrap();
        let expr = parse("1 | /r").unwrap();
        let result = Context::new(&doc, doc.root()).evaluate(&expr);
        assert!(matches!(result, Err(QueryError::Type { .. })));
    }

    // -- Comparisons --------------------------------------------------------

    #[test]
    fn test_scalar_comparisons() {
        assert!(eval_bool("<r/>", "1 = 1"));
        assert!(eval_bool("<r/>", "1 != 2"));
        assert!(eval_bool("<r/>", "'a' = 'a'"));
        assert!(eval_bool("<r/>", "1 < 2"));
        assert!(eval_bool("<r/>", "2 >= 2"));
        assert!(!eval_bool("<r/>", "2 < 1"));
    }

    #[test]
    fn test_boolean_coercion_wins() {
        // A boolean operand coerces the other side to boolean.
        assert!(eval_bool("<r/>", "true() = 'nonempty'"));
        assert!(eval_bool("<r/>", "false() = ''"));
    }

    #[test]
    fn test_number_string_comparison() {
        assert!(eval_bool("<r/>", "1 = '1'"));
        assert!(!eval_bool("<r/>", "1 = 'x'"));
    }

    #[test]
    fn test_nodeset_scalar_comparison_existential() {
        let xml = "<r><v>1</v><v>2</v><v>3</v></r>";
        assert!(eval_bool(xml, "//v = 2"));
        assert!(!eval_bool(xml, "//v = 4"));
        assert!(eval_bool(xml, "//v > 2"));
        // Existential: both can hold at once.
        assert!(eval_bool(xml, "//v != 2"));
    }

    #[test]
    fn test_nodeset_nodeset_comparison() {
        let xml = "<r><a><v>1</v><v>2</v></a><b><v>2</v><v>3</v></b></r>";
        assert!(eval_bool(xml, "/r/a/v = /r/b/v"));
        assert!(eval_bool(xml, "/r/a/v < /r/b/v"));
    }

    #[test]
    fn test_nodeset_boolean_comparison() {
        assert!(eval_bool("<r><x/></r>", "//x = true()"));
        assert!(eval_bool("<r/>", "//x = false()"));
    }

    #[test]
    fn test_and_or_short_circuit() {
        assert!(eval_bool("<r/>", "false() and sum('x') or true()"));
        assert!(eval_bool("<r/>", "true() or sum('x')"));
    }

    // -- Filter with path continuation --------------------------------------

    #[test]
    fn test_filter_path_continuation() {
        let xml = "<r><a><b i=\"1\"/></a><a><b i=\"2\"/></a></r>";
        let doc = parse_xml(xml, &ParseOptions::default()).unwrap();
        let expr = parse("(//a)[2]/b").unwrap();
        let result = Context::new(&doc, doc.root()).evaluate(&expr).unwrap();
        match result {
            Value::NodeSet(nodes) => {
                assert_eq!(nodes.len(), 1);
                assert_eq!(doc.attribute(nodes[0], "i"), Some("2"));
            }
            other => panic!("expected node-set, got {other:?}"),
        }
    }

    // -- String values ------------------------------------------------------

    #[test]
    fn test_element_string_value() {
        let xml = "<r>a<b>b</b>c</r>";
        assert!(eval_bool(xml, "string(/r) = 'abc'"));
    }

    #[test]
    fn test_attribute_string_value() {
        let xml = "<r a=\"hello\"/>";
        assert!(eval_bool(xml, "string(/r/@a) = 'hello'"));
    }
}
