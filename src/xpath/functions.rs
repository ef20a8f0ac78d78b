//! The XPath 1.0 core function library.
//!
//! Twenty-five functions across the node-set, string, boolean, and number
//! groups, dispatched by name with argument counts enforced at the call
//! site. Optional node-set arguments default to a singleton of the context
//! node; where a single node is needed from a set, the first in document
//! order is used.

use crate::tree::{NodeId, NodeKind};

use super::ast::Expr;
use super::eval::Context;
use super::types::{parse_number, round_half_to_even, round_half_up, QueryError, Value};

impl Context<'_> {
    /// Dispatches a function call by name.
    pub(crate) fn call_function(&self, name: &str, args: &[Expr]) -> Result<Value, QueryError> {
        match name {
            // Node-set functions.
            "last" => self.fn_last(args),
            "position" => self.fn_position(args),
            "count" => self.fn_count(args),
            "local-name" => self.fn_local_name(args),
            "namespace-uri" => self.fn_namespace_uri(args),
            "name" => self.fn_name(args),

            // Boolean functions.
            "boolean" => self.fn_boolean(args),
            "not" => self.fn_not(args),
            "true" => self.fn_true(args),
            "false" => self.fn_false(args),
            "lang" => self.fn_lang(args),

            // Number functions.
            "number" => self.fn_number(args),
            "sum" => self.fn_sum(args),
            "floor" => self.fn_floor(args),
            "ceiling" => self.fn_ceiling(args),
            "round" => self.fn_round(args),

            // String functions.
            "string" => self.fn_string(args),
            "concat" => self.fn_concat(args),
            "starts-with" => self.fn_starts_with(args),
            "contains" => self.fn_contains(args),
            "substring-before" => self.fn_substring_before(args),
            "substring-after" => self.fn_substring_after(args),
            "substring" => self.fn_substring(args),
            "string-length" => self.fn_string_length(args),
            "normalize-space" => self.fn_normalize_space(args),
            "translate" => self.fn_translate(args),

            _ => Err(QueryError::UnknownFunction {
                name: name.to_string(),
            }),
        }
    }

    // -- Argument helpers ---------------------------------------------------

    /// Resolves an optional trailing node-set argument: absent means a
    /// singleton of the context node; present, the first node in document
    /// order (or `None` when the set is empty).
    fn optional_node_arg(&self, args: &[Expr]) -> Result<Option<NodeId>, QueryError> {
        if args.is_empty() {
            return Ok(Some(self.node));
        }
        match self.eval_expr(&args[0])? {
            Value::NodeSet(nodes) => Ok(nodes.iter().copied().min()),
            other => Err(QueryError::Type {
                expected: "node-set".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    // -- Node-set functions -------------------------------------------------

    #[allow(clippy::cast_precision_loss)]
    fn fn_last(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("last", args, 0)?;
        Ok(Value::Number(self.size as f64))
    }

    #[allow(clippy::cast_precision_loss)]
    fn fn_position(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("position", args, 0)?;
        Ok(Value::Number(self.position as f64))
    }

    #[allow(clippy::cast_precision_loss)]
    fn fn_count(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("count", args, 1)?;
        match self.eval_expr(&args[0])? {
            Value::NodeSet(nodes) => Ok(Value::Number(nodes.len() as f64)),
            other => Err(QueryError::Type {
                expected: "node-set".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    fn fn_local_name(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_range("local-name", args, 0, 1)?;
        let local = match self.optional_node_arg(args)? {
            Some(node) => match &self.doc.node(node).kind {
                NodeKind::Element { name, .. } | NodeKind::Attribute { name, .. } => {
                    name.local.clone()
                }
                NodeKind::ProcessingInstruction { target, .. } => target.clone(),
                NodeKind::Namespace { prefix, .. } => prefix.clone(),
                _ => String::new(),
            },
            None => String::new(),
        };
        Ok(Value::String(local))
    }

    fn fn_namespace_uri(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_range("namespace-uri", args, 0, 1)?;
        let uri = match self.optional_node_arg(args)? {
            Some(node) => {
                let ns = match &self.doc.node(node).kind {
                    NodeKind::Element { namespace, .. }
                    | NodeKind::Attribute { namespace, .. } => *namespace,
                    _ => None,
                };
                ns.and_then(|ns| self.doc.namespace_uri(ns))
                    .unwrap_or("")
                    .to_string()
            }
            None => String::new(),
        };
        Ok(Value::String(uri))
    }

    fn fn_name(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_range("name", args, 0, 1)?;
        let name = match self.optional_node_arg(args)? {
            Some(node) => self.doc.node_name(node).unwrap_or_default(),
            None => String::new(),
        };
        Ok(Value::String(name))
    }

    // -- Boolean functions --------------------------------------------------

    fn fn_boolean(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("boolean", args, 1)?;
        let value = self.eval_expr(&args[0])?;
        Ok(Value::Boolean(value.to_boolean()))
    }

    fn fn_not(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("not", args, 1)?;
        let value = self.eval_expr(&args[0])?;
        Ok(Value::Boolean(!value.to_boolean()))
    }

    fn fn_true(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("true", args, 0)?;
        Ok(Value::Boolean(true))
    }

    fn fn_false(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("false", args, 0)?;
        Ok(Value::Boolean(false))
    }

    /// `lang(string)`: walks the ancestor-or-self chain for an `xml:lang`
    /// attribute; matches on equality or a primary subtag, case-insensitive.
    fn fn_lang(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("lang", args, 1)?;
        let target = self
            .value_to_string(&self.eval_expr(&args[0])?)
            .to_lowercase();

        let mut node = Some(self.node);
        while let Some(n) = node {
            if let Some(lang) = self.doc.attribute(n, "xml:lang") {
                let lang = lang.to_lowercase();
                let matched = lang == target || lang.starts_with(&format!("{target}-"));
                return Ok(Value::Boolean(matched));
            }
            node = self.doc.parent(n);
        }
        Ok(Value::Boolean(false))
    }

    // -- Number functions ---------------------------------------------------

    fn fn_number(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_range("number", args, 0, 1)?;
        if args.is_empty() {
            let sv = self.string_value(self.node);
            return Ok(Value::Number(parse_number(&sv)));
        }
        let value = self.eval_expr(&args[0])?;
        Ok(Value::Number(self.value_to_number(&value)))
    }

    fn fn_sum(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("sum", args, 1)?;
        match self.eval_expr(&args[0])? {
            Value::NodeSet(nodes) => {
                let total: f64 = nodes
                    .iter()
                    .map(|&n| parse_number(&self.string_value(n)))
                    .sum();
                Ok(Value::Number(total))
            }
            other => Err(QueryError::Type {
                expected: "node-set".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    fn fn_floor(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("floor", args, 1)?;
        let n = self.value_to_number(&self.eval_expr(&args[0])?);
        Ok(Value::Number(n.floor()))
    }

    fn fn_ceiling(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("ceiling", args, 1)?;
        let n = self.value_to_number(&self.eval_expr(&args[0])?);
        Ok(Value::Number(n.ceil()))
    }

    /// `round(number)`: nearest integer, ties toward positive infinity.
    fn fn_round(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("round", args, 1)?;
        let n = self.value_to_number(&self.eval_expr(&args[0])?);
        Ok(Value::Number(round_half_up(n)))
    }

    // -- String functions ---------------------------------------------------

    fn fn_string(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_range("string", args, 0, 1)?;
        if args.is_empty() {
            return Ok(Value::String(self.string_value(self.node)));
        }
        let value = self.eval_expr(&args[0])?;
        Ok(Value::String(self.value_to_string(&value)))
    }

    fn fn_concat(&self, args: &[Expr]) -> Result<Value, QueryError> {
        if args.len() < 2 {
            return Err(QueryError::ArgCount {
                function: "concat".to_string(),
                expected: "at least 2".to_string(),
                found: args.len(),
            });
        }
        let mut result = String::new();
        for arg in args {
            result.push_str(&self.value_to_string(&self.eval_expr(arg)?));
        }
        Ok(Value::String(result))
    }

    fn fn_starts_with(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("starts-with", args, 2)?;
        let s = self.value_to_string(&self.eval_expr(&args[0])?);
        let prefix = self.value_to_string(&self.eval_expr(&args[1])?);
        Ok(Value::Boolean(s.starts_with(prefix.as_str())))
    }

    fn fn_contains(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("contains", args, 2)?;
        let s = self.value_to_string(&self.eval_expr(&args[0])?);
        let needle = self.value_to_string(&self.eval_expr(&args[1])?);
        Ok(Value::Boolean(s.contains(needle.as_str())))
    }

    fn fn_substring_before(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("substring-before", args, 2)?;
        let s = self.value_to_string(&self.eval_expr(&args[0])?);
        let needle = self.value_to_string(&self.eval_expr(&args[1])?);
        let result = s
            .find(needle.as_str())
            .map_or_else(String::new, |pos| s[..pos].to_string());
        Ok(Value::String(result))
    }

    fn fn_substring_after(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("substring-after", args, 2)?;
        let s = self.value_to_string(&self.eval_expr(&args[0])?);
        let needle = self.value_to_string(&self.eval_expr(&args[1])?);
        let result = s
            .find(needle.as_str())
            .map_or_else(String::new, |pos| s[pos + needle.len()..].to_string());
        Ok(Value::String(result))
    }

    /// `substring(string, start, length?)` with 1-based indexing over
    /// UTF-16 code units (the same unit `string-length` counts). The
    /// numeric arguments round with ties to even; a unit at position `p`
    /// is kept iff `p >= round(start)` and `p < round(start) +
    /// round(length)`. NaN comparisons are false, so a NaN start or
    /// length yields the empty string; an infinite length keeps the tail.
    fn fn_substring(&self, args: &[Expr]) -> Result<Value, QueryError> {
        if args.len() < 2 || args.len() > 3 {
            return Err(QueryError::ArgCount {
                function: "substring".to_string(),
                expected: "2 or 3".to_string(),
                found: args.len(),
            });
        }
        let s = self.value_to_string(&self.eval_expr(&args[0])?);
        let start = round_half_to_even(self.value_to_number(&self.eval_expr(&args[1])?));
        let end = if args.len() == 3 {
            start + round_half_to_even(self.value_to_number(&self.eval_expr(&args[2])?))
        } else {
            f64::INFINITY
        };

        #[allow(clippy::cast_precision_loss)]
        let kept: Vec<u16> = s
            .encode_utf16()
            .enumerate()
            .filter(|(i, _)| {
                let p = (i + 1) as f64;
                p >= start && p < end
            })
            .map(|(_, unit)| unit)
            .collect();
        Ok(Value::String(String::from_utf16_lossy(&kept)))
    }

    /// `string-length(string?)` counts UTF-16 code units.
    #[allow(clippy::cast_precision_loss)]
    fn fn_string_length(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_range("string-length", args, 0, 1)?;
        let s = if args.is_empty() {
            self.string_value(self.node)
        } else {
            self.value_to_string(&self.eval_expr(&args[0])?)
        };
        Ok(Value::Number(s.encode_utf16().count() as f64))
    }

    /// `normalize-space(string?)`: trim, then collapse internal whitespace
    /// runs to a single space.
    fn fn_normalize_space(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_range("normalize-space", args, 0, 1)?;
        let s = if args.is_empty() {
            self.string_value(self.node)
        } else {
            self.value_to_string(&self.eval_expr(&args[0])?)
        };
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(Value::String(normalized))
    }

    /// `translate(src, from, to)`: positional character map. The first
    /// occurrence in `from` wins; characters without a `to` counterpart are
    /// deleted; excess `to` characters are ignored.
    fn fn_translate(&self, args: &[Expr]) -> Result<Value, QueryError> {
        check_arg_count("translate", args, 3)?;
        let src = self.value_to_string(&self.eval_expr(&args[0])?);
        let from = self.value_to_string(&self.eval_expr(&args[1])?);
        let to = self.value_to_string(&self.eval_expr(&args[2])?);

        let from_chars: Vec<char> = from.chars().collect();
        let to_chars: Vec<char> = to.chars().collect();

        let result: String = src
            .chars()
            .filter_map(|c| match from_chars.iter().position(|&fc| fc == c) {
                Some(pos) => to_chars.get(pos).copied(),
                None => Some(c),
            })
            .collect();
        Ok(Value::String(result))
    }
}

/// Checks an exact argument count.
fn check_arg_count(name: &str, args: &[Expr], expected: usize) -> Result<(), QueryError> {
    if args.len() != expected {
        return Err(QueryError::ArgCount {
            function: name.to_string(),
            expected: expected.to_string(),
            found: args.len(),
        });
    }
    Ok(())
}

/// Checks an argument count range (for optional arguments).
fn check_arg_range(name: &str, args: &[Expr], min: usize, max: usize) -> Result<(), QueryError> {
    if args.len() < min || args.len() > max {
        return Err(QueryError::ArgCount {
            function: name.to_string(),
            expected: format!("{min} to {max}"),
            found: args.len(),
        });
    }
    Ok(())
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

    fn eval_err(xml: &str, query: &str) -> QueryError {
        let doc = parse_xml(xml, &ParseOptions::default()).unwrap();
        let expr = parse(query).unwrap();
        Context::new(&doc, doc.root()).evaluate(&expr).unwrap_err()
    }

    fn eval_string(xml: &str, query: &str) -> String {
        match eval(xml, query) {
            Value::String(s) => s,
            other => panic!("expected string, got {other:?}"),
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

    // -- Node-set -----------------------------------------------------------

    #[test]
    fn test_count() {
        assert_eq!(eval_number("<r><a/><a/><a/></r>", "count(//a)"), 3.0);
        assert_eq!(eval_number("<r/>", "count(//missing)"), 0.0);
    }

    #[test]
    fn test_count_of_scalar_fails() {
        assert!(matches!(
            eval_err("<r/>", "count('x')"),
            QueryError::Type { .. }
        ));
    }

    #[test]
    fn test_last_and_position_in_predicates() {
        let xml = "<r><a i=\"1\"/><a i=\"2\"/><a i=\"3\"/></r>";
        match eval(xml, "//a[last()]") {
            Value::NodeSet(nodes) => assert_eq!(nodes.len(), 1),
            other => panic!("expected node-set, got {other:?}"),
        }
        match eval(xml, "//a[position() = 2]") {
            Value::NodeSet(nodes) => assert_eq!(nodes.len(), 1),
            other => panic!("expected node-set, got {other:?}"),
        }
    }

    #[test]
    fn test_name_functions() {
        let xml = "<r xmlns:p=\"urn:x\"><p:c/></r>";
        assert_eq!(eval_string(xml, "name(//p:c)"), "p:c");
        assert_eq!(eval_string(xml, "local-name(//p:c)"), "c");
        assert_eq!(eval_string(xml, "namespace-uri(//p:c)"), "urn:x");
        assert_eq!(eval_string(xml, "namespace-uri(/r)"), "");
    }

    #[test]
    fn test_name_of_empty_set() {
        assert_eq!(eval_string("<r/>", "name(//missing)"), "");
        assert_eq!(eval_string("<r/>", "local-name(//missing)"), "");
    }

    #[test]
    fn test_name_first_in_document_order() {
        let xml = "<r><a/><b/></r>";
        assert_eq!(eval_string(xml, "name(/r/*)"), "a");
    }

    // -- Boolean ------------------------------------------------------------

    #[test]
    fn test_boolean_and_not() {
        assert!(eval_bool("<r/>", "boolean(1)"));
        assert!(!eval_bool("<r/>", "boolean(0)"));
        assert!(!eval_bool("<r/>", "boolean('')"));
        assert!(eval_bool("<r/>", "not('')"));
        assert!(eval_bool("<r/>", "true()"));
        assert!(!eval_bool("<r/>", "false()"));
    }

    #[test]
    fn test_not_not_is_boolean() {
        assert!(eval_bool("<r><a/></r>", "not(not(//a)) = boolean(//a)"));
        assert!(eval_bool("<r/>", "not(not(//a)) = boolean(//a)"));
    }

    #[test]
    fn test_lang() {
        let xml = "<r xml:lang=\"en\"><a><b/></a></r>";
        let doc = parse_xml(xml, &ParseOptions::default()).unwrap();
        let b = doc
            .descendants(doc.root())
            .find(|&id| doc.node_name(id).as_deref() == Some("b"))
            .unwrap();
        let check = |query: &str| match Context::new(&doc, b)
            .evaluate(&parse(query).unwrap())
            .unwrap()
        {
            Value::Boolean(v) => v,
            other => panic!("expected boolean, got {other:?}"),
        };
        assert!(check("lang('en')"));
        assert!(check("lang('EN')"));
        assert!(!check("lang('de')"));
    }

    #[test]
    fn test_lang_primary_subtag() {
        let xml = "<r xml:lang=\"en-US\"/>";
        let doc = parse_xml(xml, &ParseOptions::default()).unwrap();
        let r = doc.root_element().unwrap();
        let result = Context::new(&doc, r)
            .evaluate(&parse("lang('en')").unwrap())
            .unwrap();
        assert_eq!(result, Value::Boolean(true));
    }

    // -- Number -------------------------------------------------------------

    #[test]
    fn test_number() {
        assert_eq!(eval_number("<r/>", "number('42')"), 42.0);
        assert_eq!(eval_number("<r/>", "number(true())"), 1.0);
        assert!(eval_number("<r/>", "number('x')").is_nan());
    }

    #[test]
    fn test_number_of_context_node() {
        let xml = "<r>7</r>";
        let doc = parse_xml(xml, &ParseOptions::default()).unwrap();
        let r = doc.root_element().unwrap();
        let result = Context::new(&doc, r)
            .evaluate(&parse("number()").unwrap())
            .unwrap();
        assert_eq!(result, Value::Number(7.0));
    }

    #[test]
    fn test_sum() {
        assert_eq!(eval_number("<r><v>1</v><v>2</v><v>3</v></r>", "sum(//v)"), 6.0);
        assert_eq!(eval_number("<r/>", "sum(//v)"), 0.0);
        assert!(eval_number("<r><v>1</v><v>x</v></r>", "sum(//v)").is_nan());
    }

    #[test]
    fn test_sum_of_scalar_fails() {
        assert!(matches!(
            eval_err("<r/>", "sum('3')"),
            QueryError::Type { .. }
        ));
    }

    #[test]
    fn test_floor_ceiling_round() {
        assert_eq!(eval_number("<r/>", "floor(1.9)"), 1.0);
        assert_eq!(eval_number("<r/>", "floor(-1.1)"), -2.0);
        assert_eq!(eval_number("<r/>", "ceiling(1.1)"), 2.0);
        assert_eq!(eval_number("<r/>", "ceiling(-1.9)"), -1.0);
        assert_eq!(eval_number("<r/>", "round(1.5)"), 2.0);
        assert_eq!(eval_number("<r/>", "round(-0.5)"), 0.0);
        assert_eq!(eval_number("<r/>", "round(-1.5)"), -1.0);
    }

    // -- String -------------------------------------------------------------

    #[test]
    fn test_string() {
        assert_eq!(eval_string("<r/>", "string(42)"), "42");
        assert_eq!(eval_string("<r/>", "string(true())"), "true");
        assert_eq!(eval_string("<r>hi</r>", "string(/r)"), "hi");
    }

    #[test]
    fn test_concat() {
        assert_eq!(eval_string("<r/>", "concat('a', 'b')"), "ab");
        assert_eq!(eval_string("<r/>", "concat('a', 'b', 'c', 'd')"), "abcd");
    }

    #[test]
    fn test_concat_one_arg_fails() {
        assert!(matches!(
            eval_err("<r/>", "concat('a')"),
            QueryError::ArgCount { .. }
        ));
    }

    #[test]
    fn test_starts_with_and_contains() {
        assert!(eval_bool("<r/>", "starts-with('hello', 'hel')"));
        assert!(!eval_bool("<r/>", "starts-with('hello', 'world')"));
        assert!(eval_bool("<r/>", "contains('hello', 'ell')"));
        assert!(!eval_bool("<r/>", "contains('hello', 'xyz')"));
    }

    #[test]
    fn test_substring_before_after() {
        assert_eq!(
            eval_string("<r/>", "substring-before('1999/04/01', '/')"),
            "1999"
        );
        assert_eq!(
            eval_string("<r/>", "substring-after('1999/04/01', '/')"),
            "04/01"
        );
        assert_eq!(eval_string("<r/>", "substring-before('abc', 'z')"), "");
        assert_eq!(eval_string("<r/>", "substring-after('abc', 'z')"), "");
    }

    #[test]
    fn test_substring_basic() {
        assert_eq!(eval_string("<r/>", "substring('12345', 2, 3)"), "234");
        assert_eq!(eval_string("<r/>", "substring('12345', 2)"), "2345");
    }

    #[test]
    fn test_substring_fractional_arguments() {
        assert_eq!(eval_string("<r/>", "substring('12345', 1.5, 2.6)"), "234");
    }

    #[test]
    fn test_substring_ties_round_to_even() {
        // start 2.5 rounds to 2 (even), not 3; round() itself would give 3.
        assert_eq!(eval_string("<r/>", "substring('abcdef', 2.5, 2)"), "bc");
        assert_eq!(eval_number("<r/>", "round(2.5)"), 3.0);
        // length 1.5 rounds to 2.
        assert_eq!(eval_string("<r/>", "substring('abcdef', 1, 1.5)"), "ab");
        // length 2.5 rounds to 2.
        assert_eq!(eval_string("<r/>", "substring('abcdef', 1, 2.5)"), "ab");
    }

    #[test]
    fn test_substring_positions_are_utf16_code_units() {
        // '𝄞' (U+1D11E) occupies two code units, matching string-length.
        assert_eq!(eval_string("<r/>", "substring('𝄞ab', 3, 2)"), "ab");
        assert_eq!(eval_string("<r/>", "substring('a𝄞b', 2, 2)"), "𝄞");
        assert_eq!(
            eval_number("<r/>", "string-length(substring('𝄞abc', 1, 3))"),
            3.0
        );
    }

    #[test]
    fn test_substring_nan_start() {
        assert_eq!(eval_string("<r/>", "substring('12345', 0 div 0, 3)"), "");
    }

    #[test]
    fn test_substring_infinite_length() {
        assert_eq!(
            eval_string("<r/>", "substring('12345', -42, 1 div 0)"),
            "12345"
        );
    }

    #[test]
    fn test_substring_negative_infinity_start() {
        assert_eq!(
            eval_string("<r/>", "substring('12345', -1 div 0, 1 div 0)"),
            ""
        );
    }

    #[test]
    fn test_string_length() {
        assert_eq!(eval_number("<r/>", "string-length('hello')"), 5.0);
        assert_eq!(eval_number("<r/>", "string-length('')"), 0.0);
    }

    #[test]
    fn test_string_length_counts_code_units() {
        // '𝄞' (U+1D11E) is one surrogate pair: two UTF-16 code units.
        assert_eq!(eval_number("<r/>", "string-length('𝄞')"), 2.0);
    }

    #[test]
    fn test_normalize_space() {
        assert_eq!(
            eval_string("<r/>", "normalize-space('  a  b \t c  ')"),
            "a b c"
        );
    }

    #[test]
    fn test_translate() {
        assert_eq!(eval_string("<r/>", "translate('bar', 'abc', 'ABC')"), "BAr");
        // '-' has no counterpart in the to-string: deleted.
        assert_eq!(
            eval_string("<r/>", "translate('--aaa--', 'abc-', 'ABC')"),
            "AAA"
        );
        // Excess to-characters are ignored.
        assert_eq!(eval_string("<r/>", "translate('ab', 'a', 'XY')"), "Xb");
        // The first from-occurrence wins.
        assert_eq!(eval_string("<r/>", "translate('a', 'aa', 'XY')"), "X");
    }

    #[test]
    fn test_unknown_function_fails() {
        assert!(matches!(
            eval_err("<r/>", "frobnicate(1)"),
            QueryError::UnknownFunction { .. }
        ));
    }

    #[test]
    fn test_arg_count_enforced() {
        assert!(matches!(
            eval_err("<r/>", "true(1)"),
            QueryError::ArgCount { .. }
        ));
        assert!(matches!(
            eval_err("<r/>", "floor()"),
            QueryError::ArgCount { .. }
        ));
        assert!(matches!(
            eval_err("<r/>", "substring('x')"),
            QueryError::ArgCount { .. }
        ));
    }
}
