//! XPath query behavior tests.
//!
//! End-to-end coverage through the public API: paths, axes, predicates,
//! the function library, and the coercion rules.

use markquery::{parse, query, query_all, query_one, Document, ParseMode, QueryError, Value};

fn doc(input: &str) -> Document {
    parse(input, ParseMode::Xml, None).unwrap_or_else(|e| panic!("parse failed: {e}"))
}

fn number(doc: &Document, q: &str) -> f64 {
    match query(doc, q).unwrap_or_else(|e| panic!("query '{q}' failed: {e}")) {
        Value::Number(n) => n,
        other => panic!("expected number from '{q}', got {other:?}"),
    }
}

fn string(doc: &Document, q: &str) -> String {
    match query(doc, q).unwrap_or_else(|e| panic!("query '{q}' failed: {e}")) {
        Value::String(s) => s,
        other => panic!("expected string from '{q}', got {other:?}"),
    }
}

fn boolean(doc: &Document, q: &str) -> bool {
    match query(doc, q).unwrap_or_else(|e| panic!("query '{q}' failed: {e}")) {
        Value::Boolean(b) => b,
        other => panic!("expected boolean from '{q}', got {other:?}"),
    }
}

fn count(doc: &Document, q: &str) -> usize {
    query_all(doc, q)
        .unwrap_or_else(|e| panic!("query '{q}' failed: {e}"))
        .len()
}

// --- Scenario: basic paths -------------------------------------------------

#[test]
fn basic_path_scenario() {
    let d = doc("<tag id='1'>some value<data id='2'>123456</data></tag>");

    let data = query_all(&d, "/tag/data").unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(d.node_name(data[0]).as_deref(), Some("data"));

    assert!((number(&d, "number((//data)[1])") - 123_456.0).abs() < f64::EPSILON);
    assert!((number(&d, "string-length(normalize-space(//data))") - 6.0).abs() < f64::EPSILON);
}

#[test]
fn attribute_paths() {
    let d = doc("<tag id='1'><data id='2'/></tag>");
    assert_eq!(string(&d, "string(/tag/@id)"), "1");
    assert_eq!(count(&d, "//@id"), 2);
    assert!(boolean(&d, "/tag/data/@id = 2"));
}

// --- Scenario: axes and predicates -----------------------------------------

fn tools() -> Document {
    doc("<tools><tool id='1'/><tool id='2'/><tool id='3'/><tool id='4'/></tools>")
}

#[test]
fn last_predicate_selects_final_sibling() {
    let d = tools();
    let result = query_all(&d, "//tool[last()]").unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(d.attribute(result[0], "id"), Some("4"));
}

#[test]
fn position_beyond_size_is_empty() {
    let d = tools();
    assert_eq!(count(&d, "//tool[position()>4]"), 0);
}

#[test]
fn following_siblings_of_first_tool() {
    let d = tools();
    let result = query_all(&d, "(//tool)[1]/following-sibling::tool").unwrap();
    let ids: Vec<_> = result
        .iter()
        .map(|&id| d.attribute(id, "id").unwrap())
        .collect();
    assert_eq!(ids, vec!["2", "3", "4"]);
}

#[test]
fn positional_predicate_is_per_parent() {
    let d = doc("<r><g><x i='1'/><x i='2'/></g><g><x i='3'/></g></r>");
    // //x[1] gives the first x under each parent.
    let per_parent = query_all(&d, "//x[1]").unwrap();
    assert_eq!(per_parent.len(), 2);
    // (//x)[1] gives the globally first x.
    let global = query_all(&d, "(//x)[1]").unwrap();
    assert_eq!(global.len(), 1);
    assert_eq!(d.attribute(global[0], "i"), Some("1"));
}

#[test]
fn reverse_axis_counts_from_origin() {
    let d = doc("<a><b><c><target/></c></b></a>");
    let target = query_all(&d, "//target").unwrap()[0];
    let nearest = markquery::xpath::evaluate(&d, target, "ancestor::*[1]").unwrap();
    match nearest {
        Value::NodeSet(nodes) => {
            assert_eq!(nodes.len(), 1);
            assert_eq!(d.node_name(nodes[0]).as_deref(), Some("c"));
        }
        other => panic!("expected node-set, got {other:?}"),
    }
}

// --- Axis laws -------------------------------------------------------------

#[test]
fn star_count_law() {
    for input in [
        "<a><b><c/></b><d/></a>",
        "<x><y/><y/><y><z/></y></x>",
        "<single/>",
    ] {
        let d = doc(input);
        let all = number(&d, "count(//*)");
        let descendants = number(&d, "count(/descendant::*)");
        // Counting from the root container, //* and /descendant::* agree.
        assert!((all - descendants).abs() < f64::EPSILON, "law failed for {input}");
    }
}

#[test]
fn self_and_parent_of_root() {
    let d = doc("<a/>");
    assert_eq!(count(&d, "self::node()"), 1);
    let root_self = query_all(&d, "self::node()").unwrap();
    assert_eq!(root_self[0], d.root());
    assert_eq!(count(&d, "parent::node()"), 0);
}

#[test]
fn axis_partition_law() {
    let d = doc("<a><b><c/><d/></b><e><f/><g/></e></a>");
    let context = query_all(&d, "//d").unwrap()[0];
    let eval = |q: &str| {
        match markquery::xpath::evaluate(&d, context, q).unwrap() {
            Value::NodeSet(nodes) => nodes,
            other => panic!("expected node-set, got {other:?}"),
        }
    };
    let mut union = Vec::new();
    for axis in [
        "preceding::node()",
        "ancestor::node()",
        "self::node()",
        "descendant::node()",
        "following::node()",
    ] {
        let nodes = eval(axis);
        for node in nodes {
            assert!(!union.contains(&node), "node in two axes");
            union.push(node);
        }
    }
    union.sort_unstable();
    let mut all: Vec<_> = d.descendants(d.root()).collect();
    all.push(d.root());
    all.sort_unstable();
    assert_eq!(union, all);
}

#[test]
fn node_sets_are_deduplicated_and_ordered() {
    let d = doc("<a><b><c/></b><b><c/></b></a>");
    let nodes = query_all(&d, "//c/ancestor::b | //b | //c").unwrap();
    let mut sorted = nodes.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(nodes, sorted);
    assert_eq!(nodes.len(), 4);
}

#[test]
fn union_of_scalars_is_an_error() {
    let d = doc("<a/>");
    assert!(matches!(
        query(&d, "1 | 2"),
        Err(QueryError::Type { .. })
    ));
}

// --- Scenario: function corners --------------------------------------------

#[test]
fn substring_corner_cases() {
    let d = doc("<r/>");
    assert_eq!(string(&d, "substring('12345', 1.5, 2.6)"), "234");
    assert_eq!(string(&d, "substring('12345', 0 div 0, 3)"), "");
    assert_eq!(string(&d, "substring('12345', -42, 1 div 0)"), "12345");
    // substring's arguments round with ties to even, unlike round().
    assert_eq!(string(&d, "substring('abcdef', 2.5, 2)"), "bc");
    assert!(boolean(&d, "round(2.5) = 3"));
}

#[test]
fn translate_deletes_unmapped_characters() {
    let d = doc("<r/>");
    assert_eq!(string(&d, "translate('--aaa--','abc-','ABC')"), "AAA");
}

#[test]
fn concat_arity() {
    let d = doc("<r/>");
    assert_eq!(string(&d, "concat('a','b','c','d')"), "abcd");
    assert!(matches!(
        query(&d, "concat('a')"),
        Err(QueryError::ArgCount { .. })
    ));
}

#[test]
fn sum_requires_a_node_set() {
    let d = doc("<r/>");
    assert!(matches!(query(&d, "sum('3')"), Err(QueryError::Type { .. })));
}

// --- Coercion laws ---------------------------------------------------------

#[test]
fn number_string_roundtrip() {
    let d = doc("<r/>");
    for value in ["0", "1", "-1", "42", "1.5", "-2.75", "123456"] {
        assert!(
            boolean(&d, &format!("number(string({value})) = {value}")),
            "roundtrip failed for {value}"
        );
    }
}

#[test]
fn boolean_idempotence() {
    let d = doc("<r><a/></r>");
    assert!(boolean(&d, "boolean(boolean(//a)) = boolean(//a)"));
    assert!(boolean(&d, "boolean(boolean(//zzz)) = boolean(//zzz)"));
}

#[test]
fn nodeset_coercions() {
    let d = doc("<r><v>10</v><v>20</v></r>");
    // First node in document order drives scalar conversion.
    assert_eq!(string(&d, "string(//v)"), "10");
    assert!((number(&d, "number(//v)") - 10.0).abs() < f64::EPSILON);
    assert!(boolean(&d, "boolean(//v)"));
    // Empty sets.
    assert_eq!(string(&d, "string(//missing)"), "");
    assert!(number(&d, "number(//missing)").is_nan());
    assert!(!boolean(&d, "boolean(//missing)"));
}

#[test]
fn comparison_matrix_with_node_sets() {
    let d = doc("<r><v>1</v><v>2</v></r>");
    assert!(boolean(&d, "//v = 1"));
    assert!(boolean(&d, "//v != 1")); // existential: some node is not 1
    assert!(boolean(&d, "//v < 2"));
    assert!(boolean(&d, "//v >= 2"));
    assert!(!boolean(&d, "//v > 2"));
    assert!(boolean(&d, "//v = '2'"));
}

// --- Kind tests and namespace queries ---------------------------------------

#[test]
fn kind_tests() {
    let d = doc("<r>text<!-- c --><?pi data?><x><![CDATA[cd]]></x></r>");
    assert_eq!(count(&d, "/r/text()"), 1);
    assert_eq!(count(&d, "/r/comment()"), 1);
    assert_eq!(count(&d, "/r/processing-instruction()"), 1);
    assert_eq!(count(&d, "/r/processing-instruction('pi')"), 1);
    assert_eq!(count(&d, "/r/processing-instruction('other')"), 0);
    // CDATA is a text node.
    assert_eq!(count(&d, "/r/x/text()"), 1);
}

#[test]
fn element_names_shadowing_keywords() {
    let d = doc("<r><div>4</div><mod>2</mod></r>");
    assert!((number(&d, "//div div //mod") - 2.0).abs() < f64::EPSILON);
    assert_eq!(count(&d, "//div"), 1);
}

#[test]
fn expanded_name_queries() {
    let d = doc(r#"<r xmlns:p="urn:x"><p:c/><c/></r>"#);
    assert_eq!(count(&d, "//p:c"), 1);
    assert_eq!(count(&d, "//p:*"), 1);
    // Unprefixed test matches by qualified name: the plain <c> only.
    assert_eq!(count(&d, "//c"), 1);
}

#[test]
fn namespace_axis_queries() {
    let d = doc(r#"<r xmlns:p="urn:x"/>"#);
    // p plus the reserved xml and xmlns bindings.
    assert_eq!(count(&d, "/r/namespace::node()"), 3);
    assert_eq!(string(&d, "string(/r/namespace::p)"), "urn:x");
}

// --- Query comments ---------------------------------------------------------

#[test]
fn nested_comments_in_query_text() {
    let d = doc("<a><b/></a>");
    assert_eq!(count(&d, "(: pick (: all :) b elements :) //b"), 1);
}

// --- Facade wrappers --------------------------------------------------------

#[test]
fn query_one_and_query_all_are_wrappers() {
    let d = tools();
    match query_one(&d, "//tool").unwrap() {
        Value::NodeSet(nodes) => {
            assert_eq!(nodes.len(), 1);
            assert_eq!(d.attribute(nodes[0], "id"), Some("1"));
        }
        other => panic!("expected node-set, got {other:?}"),
    }
    assert_eq!(query_all(&d, "//tool").unwrap().len(), 4);
    assert_eq!(query_one(&d, "count(//tool)").unwrap(), Value::Number(4.0));
}

// --- HTML documents ----------------------------------------------------------

#[test]
fn queries_over_html_trees() {
    let d = parse(
        "<div><p>first</p><p>second</p><br></div>",
        ParseMode::Html,
        None,
    )
    .unwrap();
    assert_eq!(count(&d, "//p"), 2);
    assert_eq!(string(&d, "string((//p)[2])"), "second");
    assert_eq!(count(&d, "//br"), 1);
}
