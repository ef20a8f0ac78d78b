//! XPath expression parser.
//!
//! A recursive descent parser over the token stream produced by the query
//! lexer. Operator precedence, loosest to tightest: `or`, `and`, `= !=`,
//! `< <= > >=`, `+ -`, `* div mod`, unary `-` (and the tolerated unary
//! `+`), `|`, path expression.
//!
//! A path expression is either a filter expression (primary expression plus
//! predicates, allowed only at the first step) or an axis step; steps after
//! `/` or `//` must be axis steps. Every `//` is expanded at parse time
//! into a `descendant-or-self::node()` step, and `.` / `..` into
//! `self::node()` / `parent::node()`.

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Path, Step, UnaryOp};
use super::lexer::{Lexer, Token};
use super::types::QueryError;

/// Parses an XPath expression string into an AST.
///
/// # Errors
///
/// Returns [`QueryError::Lex`] or [`QueryError::Parse`] if the input is not
/// a valid XPath 1.0 expression.
pub fn parse(input: &str) -> Result<Expr, QueryError> {
    let tokens = Lexer::new(input).tokenize()?;

    if tokens.is_empty() {
        return Err(QueryError::Parse {
            message: "empty expression".to_string(),
            position: 0,
        });
    }

    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;

    if parser.pos < parser.tokens.len() {
        return Err(parser.error(&format!(
            "unexpected token '{}' after expression",
            parser.tokens[parser.pos]
        )));
    }

    Ok(expr)
}

/// Internal recursive descent parser over the token stream.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    // -----------------------------------------------------------------------
    // Token access helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), QueryError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected '{token}', found {}",
                self.describe_current()
            )))
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn describe_current(&self) -> String {
        self.peek()
            .map_or_else(|| "end of expression".to_string(), |t| format!("'{t}'"))
    }

    fn error(&self, message: &str) -> QueryError {
        QueryError::Parse {
            message: message.to_string(),
            position: self.pos,
        }
    }

    // -----------------------------------------------------------------------
    // Expression grammar
    // -----------------------------------------------------------------------

    /// `Expr ::= OrExpr`
    fn parse_expr(&mut self) -> Result<Expr, QueryError> {
        self.parse_or_expr()
    }

    /// `OrExpr ::= AndExpr ('or' AndExpr)*`
    fn parse_or_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and_expr()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    /// `AndExpr ::= EqualityExpr ('and' EqualityExpr)*`
    fn parse_and_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_equality_expr()?;
        while self.eat(&Token::And) {
            let right = self.parse_equality_expr()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    /// `EqualityExpr ::= RelationalExpr (('=' | '!=') RelationalExpr)*`
    fn parse_equality_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = if self.eat(&Token::Equal) {
                BinaryOp::Eq
            } else if self.eat(&Token::NotEqual) {
                BinaryOp::Neq
            } else {
                break;
            };
            let right = self.parse_relational_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `RelationalExpr ::= AdditiveExpr (('<' | '<=' | '>' | '>=') AdditiveExpr)*`
    fn parse_relational_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = if self.eat(&Token::LessThan) {
                BinaryOp::Lt
            } else if self.eat(&Token::LessThanEqual) {
                BinaryOp::Lte
            } else if self.eat(&Token::GreaterThan) {
                BinaryOp::Gt
            } else if self.eat(&Token::GreaterThanEqual) {
                BinaryOp::Gte
            } else {
                break;
            };
            let right = self.parse_additive_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `AdditiveExpr ::= MultiplicativeExpr (('+' | '-') MultiplicativeExpr)*`
    fn parse_additive_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinaryOp::Add
            } else if self.eat(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `MultiplicativeExpr ::= UnaryExpr (('*' | 'div' | 'mod') UnaryExpr)*`
    fn parse_multiplicative_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinaryOp::Mul
            } else if self.eat(&Token::Div) {
                BinaryOp::Div
            } else if self.eat(&Token::Mod) {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `UnaryExpr ::= ('-' | '+')* UnionExpr`
    ///
    /// Unary `+` is not in the XPath 1.0 grammar but is tolerated as a
    /// numeric identity.
    fn parse_unary_expr(&mut self) -> Result<Expr, QueryError> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary_expr()?;
            Ok(Expr::UnaryOp {
                op: UnaryOp::Neg,
                expr: Box::new(inner),
            })
        } else if self.eat(&Token::Plus) {
            let inner = self.parse_unary_expr()?;
            Ok(Expr::UnaryOp {
                op: UnaryOp::Plus,
                expr: Box::new(inner),
            })
        } else {
            self.parse_union_expr()
        }
    }

    /// `UnionExpr ::= PathExpr ('|' PathExpr)*`
    fn parse_union_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `PathExpr ::= LocationPath | FilterExpr (('/' | '//') RelativeLocationPath)?`
    fn parse_path_expr(&mut self) -> Result<Expr, QueryError> {
        match self.peek() {
            Some(
                Token::Slash
                | Token::DoubleSlash
                | Token::Dot
                | Token::DotDot
                | Token::At
                | Token::AxisName(_)
                | Token::NodeType(_)
                | Token::Name(_),
            ) => self.parse_location_path(),

            Some(
                Token::Literal(_) | Token::Number(_) | Token::LeftParen | Token::FunctionName(_),
            ) => self.parse_filter_expr(),

            _ => Err(self.error(&format!(
                "expected expression, found {}",
                self.describe_current()
            ))),
        }
    }

    /// `FilterExpr ::= PrimaryExpr Predicate* (('/' | '//') RelativeLocationPath)?`
    ///
    /// A bare primary is returned as-is; predicates or a path continuation
    /// wrap it in a `Filter` node.
    fn parse_filter_expr(&mut self) -> Result<Expr, QueryError> {
        let expr = self.parse_primary_expr()?;

        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RightBracket)?;
        }

        let mut steps = Vec::new();
        if self.check(&Token::Slash) || self.check(&Token::DoubleSlash) {
            if self.eat(&Token::DoubleSlash) {
                steps.push(descendant_or_self_step());
            } else {
                self.eat(&Token::Slash);
            }
            self.parse_relative_path_into(&mut steps)?;
        }

        if predicates.is_empty() && steps.is_empty() {
            Ok(expr)
        } else {
            Ok(Expr::Filter {
                expr: Box::new(expr),
                predicates,
                steps,
            })
        }
    }

    /// `PrimaryExpr ::= '(' Expr ')' | Literal | Number | FunctionCall`
    fn parse_primary_expr(&mut self) -> Result<Expr, QueryError> {
        match self.peek().cloned() {
            Some(Token::Literal(value)) => {
                self.pos += 1;
                Ok(Expr::Literal(value))
            }
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            Some(Token::LeftParen) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Some(Token::FunctionName(_)) => self.parse_function_call(),
            _ => Err(self.error(&format!(
                "expected primary expression, found {}",
                self.describe_current()
            ))),
        }
    }

    /// `FunctionCall ::= FunctionName '(' (Expr (',' Expr)*)? ')'`
    fn parse_function_call(&mut self) -> Result<Expr, QueryError> {
        let Some(Token::FunctionName(name)) = self.advance() else {
            return Err(self.error("expected function name"));
        };
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();
        if !self.check(&Token::RightParen) {
            args.push(self.parse_expr()?);
            while self.eat(&Token::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect(&Token::RightParen)?;

        Ok(Expr::FunctionCall { name, args })
    }

    /// `LocationPath ::= '/' RelativeLocationPath? | '//' RelativeLocationPath
    ///                 | RelativeLocationPath`
    fn parse_location_path(&mut self) -> Result<Expr, QueryError> {
        if self.eat(&Token::Slash) {
            let mut steps = Vec::new();
            if self.at_step_start() {
                self.parse_relative_path_into(&mut steps)?;
            }
            Ok(Expr::Path(Path {
                absolute: true,
                steps,
            }))
        } else if self.eat(&Token::DoubleSlash) {
            let mut steps = vec![descendant_or_self_step()];
            self.parse_relative_path_into(&mut steps)?;
            Ok(Expr::Path(Path {
                absolute: true,
                steps,
            }))
        } else {
            let mut steps = Vec::new();
            self.parse_relative_path_into(&mut steps)?;
            Ok(Expr::Path(Path {
                absolute: false,
                steps,
            }))
        }
    }

    /// `RelativeLocationPath ::= Step (('/' | '//') Step)*`
    fn parse_relative_path_into(&mut self, steps: &mut Vec<Step>) -> Result<(), QueryError> {
        steps.push(self.parse_step()?);
        loop {
            if self.eat(&Token::DoubleSlash) {
                steps.push(descendant_or_self_step());
                steps.push(self.parse_step()?);
            } else if self.eat(&Token::Slash) {
                steps.push(self.parse_step()?);
            } else {
                return Ok(());
            }
        }
    }

    /// Returns `true` if the current token can start an axis step.
    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Dot
                    | Token::DotDot
                    | Token::At
                    | Token::AxisName(_)
                    | Token::NodeType(_)
                    | Token::Name(_)
            )
        )
    }

    /// `Step ::= '.' | '..' | AxisSpecifier? NodeTest Predicate*`
    fn parse_step(&mut self) -> Result<Step, QueryError> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::Self_,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let Some(Token::AxisName(name)) = self.peek().cloned() {
            self.pos += 1;
            self.expect(&Token::ColonColon)?;
            Axis::parse(&name).ok_or_else(|| self.error(&format!("unknown axis '{name}'")))?
        } else {
            Axis::Child
        };

        let node_test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RightBracket)?;
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    /// `NodeTest ::= NameTest | NodeType '(' Literal? ')'`
    fn parse_node_test(&mut self) -> Result<NodeTest, QueryError> {
        match self.advance() {
            Some(Token::Name(name)) => Ok(name_test(&name)),
            Some(Token::NodeType(kind)) => {
                self.expect(&Token::LeftParen)?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    "processing-instruction" => {
                        if let Some(Token::Literal(target)) = self.peek().cloned() {
                            self.pos += 1;
                            NodeTest::ProcessingInstruction(Some(target))
                        } else {
                            NodeTest::ProcessingInstruction(None)
                        }
                    }
                    other => {
                        return Err(self.error(&format!("unknown node type '{other}'")));
                    }
                };
                self.expect(&Token::RightParen)?;
                Ok(test)
            }
            other => Err(self.error(&format!(
                "expected node test, found {}",
                other.map_or_else(|| "end of expression".to_string(), |t| format!("'{t}'"))
            ))),
        }
    }
}

/// Builds a binary operation node.
fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// The step `//` expands into: `descendant-or-self::node()`.
fn descendant_or_self_step() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        node_test: NodeTest::Node,
        predicates: Vec::new(),
    }
}

/// Classifies a name lexeme into a name test.
fn name_test(name: &str) -> NodeTest {
    if name == "*" {
        return NodeTest::Wildcard;
    }
    if let Some((prefix, local)) = name.split_once(':') {
        if local == "*" {
            return NodeTest::PrefixWildcard(prefix.to_string());
        }
        return NodeTest::PrefixName(prefix.to_string(), local.to_string());
    }
    NodeTest::Name(name.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Expr {
        parse(input).unwrap_or_else(|e| panic!("parse failed for '{input}': {e}"))
    }

    fn path_steps(expr: &Expr) -> &[Step] {
        match expr {
            Expr::Path(path) => &path.steps,
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_absolute_path() {
        let expr = parse_ok("/html/body");
        let Expr::Path(path) = &expr else {
            panic!("expected path");
        };
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].axis, Axis::Child);
        assert_eq!(path.steps[0].node_test, NodeTest::Name("html".to_string()));
    }

    #[test]
    fn test_parse_bare_slash() {
        let expr = parse_ok("/");
        let Expr::Path(path) = &expr else {
            panic!("expected path");
        };
        assert!(path.absolute);
        assert!(path.steps.is_empty());
    }

    #[test]
    fn test_double_slash_expansion() {
        let steps = &path_steps(&parse_ok("//div")).to_vec();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(steps[0].node_test, NodeTest::Node);
        assert_eq!(steps[1].axis, Axis::Child);
        assert_eq!(steps[1].node_test, NodeTest::Name("div".to_string()));
    }

    #[test]
    fn test_interior_double_slash_expansion() {
        let steps = &path_steps(&parse_ok("a//b")).to_vec();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].axis, Axis::DescendantOrSelf);
    }

    #[test]
    fn test_dot_and_dotdot_expansion() {
        let steps = &path_steps(&parse_ok("./..")).to_vec();
        assert_eq!(steps[0].axis, Axis::Self_);
        assert_eq!(steps[0].node_test, NodeTest::Node);
        assert_eq!(steps[1].axis, Axis::Parent);
        assert_eq!(steps[1].node_test, NodeTest::Node);
    }

    #[test]
    fn test_attribute_abbreviation() {
        let steps = &path_steps(&parse_ok("@class")).to_vec();
        assert_eq!(steps[0].axis, Axis::Attribute);
        assert_eq!(steps[0].node_test, NodeTest::Name("class".to_string()));
    }

    #[test]
    fn test_explicit_axis() {
        let steps = &path_steps(&parse_ok("ancestor-or-self::node()")).to_vec();
        assert_eq!(steps[0].axis, Axis::AncestorOrSelf);
        assert_eq!(steps[0].node_test, NodeTest::Node);
    }

    #[test]
    fn test_unknown_axis_fails() {
        assert!(parse("sideways::a").is_err());
    }

    #[test]
    fn test_name_test_variants() {
        assert_eq!(
            path_steps(&parse_ok("*"))[0].node_test,
            NodeTest::Wildcard
        );
        assert_eq!(
            path_steps(&parse_ok("p:*"))[0].node_test,
            NodeTest::PrefixWildcard("p".to_string())
        );
        assert_eq!(
            path_steps(&parse_ok("p:l"))[0].node_test,
            NodeTest::PrefixName("p".to_string(), "l".to_string())
        );
        assert_eq!(
            path_steps(&parse_ok("l"))[0].node_test,
            NodeTest::Name("l".to_string())
        );
    }

    #[test]
    fn test_pi_target_test() {
        assert_eq!(
            path_steps(&parse_ok("processing-instruction('xsl')"))[0].node_test,
            NodeTest::ProcessingInstruction(Some("xsl".to_string()))
        );
    }

    #[test]
    fn test_predicates_attach_to_step() {
        let steps = &path_steps(&parse_ok("p[1][@a]")).to_vec();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].predicates.len(), 2);
    }

    #[test]
    fn test_precedence_or_loosest() {
        // a or b and c  →  or(a, and(b, c))
        let expr = parse_ok("a or b and c");
        let Expr::BinaryOp { op, right, .. } = &expr else {
            panic!("expected binary op");
        };
        assert_eq!(*op, BinaryOp::Or);
        let Expr::BinaryOp { op: inner, .. } = right.as_ref() else {
            panic!("expected nested binary op");
        };
        assert_eq!(*inner, BinaryOp::And);
    }

    #[test]
    fn test_precedence_additive_vs_multiplicative() {
        // 1 + 2 * 3  →  add(1, mul(2, 3))
        let expr = parse_ok("1 + 2 * 3");
        let Expr::BinaryOp { op, right, .. } = &expr else {
            panic!("expected binary op");
        };
        assert_eq!(*op, BinaryOp::Add);
        let Expr::BinaryOp { op: inner, .. } = right.as_ref() else {
            panic!("expected nested binary op");
        };
        assert_eq!(*inner, BinaryOp::Mul);
    }

    #[test]
    fn test_unary_minus() {
        let expr = parse_ok("-5");
        let Expr::UnaryOp { op, .. } = &expr else {
            panic!("expected unary op");
        };
        assert_eq!(*op, UnaryOp::Neg);
    }

    #[test]
    fn test_unary_plus_tolerated() {
        let expr = parse_ok("+5");
        let Expr::UnaryOp { op, .. } = &expr else {
            panic!("expected unary op");
        };
        assert_eq!(*op, UnaryOp::Plus);
    }

    #[test]
    fn test_union() {
        let expr = parse_ok("a | b | c");
        assert!(matches!(expr, Expr::Union(..)));
    }

    #[test]
    fn test_function_call() {
        let expr = parse_ok("concat('a', 'b')");
        let Expr::FunctionCall { name, args } = &expr else {
            panic!("expected function call");
        };
        assert_eq!(name, "concat");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_trailing_comma_fails() {
        assert!(parse("concat('a', 'b',)").is_err());
    }

    #[test]
    fn test_filter_expression() {
        let expr = parse_ok("(//a)[1]");
        let Expr::Filter {
            predicates, steps, ..
        } = &expr
        else {
            panic!("expected filter, got {expr:?}");
        };
        assert_eq!(predicates.len(), 1);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_filter_with_path_continuation() {
        let expr = parse_ok("(//a)[1]/b");
        let Expr::Filter { steps, .. } = &expr else {
            panic!("expected filter, got {expr:?}");
        };
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].node_test, NodeTest::Name("b".to_string()));
    }

    #[test]
    fn test_bare_parenthesized_expr_unwraps() {
        let expr = parse_ok("(1 + 2)");
        assert!(matches!(expr, Expr::BinaryOp { .. }));
    }

    #[test]
    fn test_missing_bracket_fails() {
        assert!(parse("a[1").is_err());
        assert!(parse("concat('a'").is_err());
    }

    #[test]
    fn test_empty_expression_fails() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_trailing_token_fails() {
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn test_keyword_names_usable_as_steps() {
        let steps = &path_steps(&parse_ok("/div/mod")).to_vec();
        assert_eq!(steps[0].node_test, NodeTest::Name("div".to_string()));
        assert_eq!(steps[1].node_test, NodeTest::Name("mod".to_string()));
    }
}
