use jsonsieve::{
    EngineConfig, EvalResult, Filter, FilterError, FilterKind, Lambda, Operation, Pool, Scalar,
};
use serde_json::json;

fn config() -> EngineConfig {
    EngineConfig::default()
}

fn filter(expr: &str, doc: &str) -> Result<bool, FilterError> {
    Filter::parse(expr, &config())
        .unwrap()
        .filter(doc.as_bytes())
}

fn eval(expr: &str, doc: &str) -> Result<serde_json::Value, FilterError> {
    Lambda::parse(expr, &config()).unwrap().eval(doc.as_bytes())
}

fn scalar(expr: &str, doc: &str) -> Scalar {
    match Lambda::parse(expr, &config())
        .unwrap()
        .eval_result(doc.as_bytes())
        .unwrap()
    {
        EvalResult::Single(s) => s,
        EvalResult::Many(items) => panic!("expected one value, got {:?}", items),
    }
}

const DOC: &str = r#"{"name":"Foo","tags":["a","b"]}"#;

// ============================================================================
// Section: Concrete scenario
// ============================================================================

#[test]
fn test_equal_field_literal() {
    let op = Operation::equal(Operation::field("o.name"), Operation::string("Foo"));
    let mut f: Filter = Lambda::new("o", op).unwrap().into();
    assert_eq!(f.filter(DOC.as_bytes()), Ok(true));
}

#[test]
fn test_any_tag_matches() {
    let op = Operation::any(
        Operation::field("o.tags"),
        "t",
        Operation::equal(Operation::field("t"), Operation::string("b")),
    );
    let mut f: Filter = Lambda::new("o", op).unwrap().into();
    assert_eq!(f.filter(DOC.as_bytes()), Ok(true));
}

#[test]
fn test_any_tag_misses() {
    assert_eq!(filter("o.tags.Any(t => t == 'z')", DOC), Ok(false));
}

#[test]
fn test_text_and_builder_agree() {
    let built = Operation::any(
        Operation::field("o.tags"),
        "t",
        Operation::equal(Operation::field("t"), Operation::string("b")),
    );
    let parsed = jsonsieve::parse_operation("o.tags.Any(t => t == 'b')").unwrap();
    assert_eq!(built, parsed);
}

// ============================================================================
// Section: Quantifiers
// ============================================================================

#[test]
fn test_quantifiers_over_empty_array() {
    let doc = r#"{"tags":[]}"#;
    assert_eq!(scalar("o.tags.Any(t => t == 'b')", doc), Scalar::FALSE);
    assert_eq!(scalar("o.tags.All(t => t == 'b')", doc), Scalar::TRUE);
    assert_eq!(scalar("o.tags.Count(t => t == 'b')", doc), Scalar::Long(0));
}

#[test]
fn test_all_and_count_where() {
    let doc = r#"{"n":[1,2,3,4]}"#;
    assert_eq!(scalar("o.n.All(x => x > 0)", doc), Scalar::TRUE);
    assert_eq!(scalar("o.n.All(x => x > 1)", doc), Scalar::FALSE);
    assert_eq!(scalar("o.n.Count(x => x % 2 == 0)", doc), Scalar::Long(2));
}

#[test]
fn test_quantifier_over_non_array_is_error() {
    assert!(scalar("o.name.Any(t => t == 'F')", DOC).is_error());
    assert!(scalar("o.missing.Any(t => t == 'F')", DOC).is_error());
}

#[test]
fn test_quantifier_predicate_error_propagates() {
    let r = scalar("o.tags.Any(t => t + 1 > 0)", DOC);
    assert!(r.error_message().unwrap().contains("incompatible operands"));
}

#[test]
fn test_nested_quantifier_sees_outer_argument() {
    let doc = r#"{"limit":2,"rows":[{"cells":[1,5]},{"cells":[0]}]}"#;
    assert_eq!(
        scalar("o.rows.Count(r => r.cells.Any(c => c > o.limit))", doc),
        Scalar::Long(1)
    );
}

// ============================================================================
// Section: Fields and values
// ============================================================================

#[test]
fn test_missing_field_is_null_not_error() {
    assert_eq!(scalar("o.nope", DOC), Scalar::Null);
    assert_eq!(filter("o.nope == 1", DOC), Ok(false));
    assert_eq!(filter("o.nope == null", DOC), Ok(true));
}

#[test]
fn test_index_steps() {
    assert_eq!(scalar("o.tags[1]", DOC), Scalar::String("b".into()));
    assert_eq!(scalar("o.tags[5]", DOC), Scalar::Null);
}

#[test]
fn test_string_predicates() {
    assert_eq!(filter("o.name.StartsWith('Fo')", DOC), Ok(true));
    assert_eq!(filter("o.name.EndsWith('oo') && o.name.Contains('o')", DOC), Ok(true));
    assert_eq!(scalar("o.name.Length()", DOC), Scalar::Long(3));
}

#[test]
fn test_arithmetic_coercion() {
    let doc = r#"{"a":3,"b":1.5}"#;
    assert_eq!(scalar("o.a + o.b", doc), Scalar::Double(4.5));
    assert_eq!(scalar("o.a * 2", doc), Scalar::Long(6));
    assert_eq!(scalar("o.a / 2", doc), Scalar::Double(1.5));
    assert_eq!(filter("o.a == 3.0", doc), Ok(true));
}

#[test]
fn test_math_functions() {
    let doc = r#"{"x":-2.5}"#;
    assert_eq!(scalar("Abs(o.x)", doc), Scalar::Double(2.5));
    assert_eq!(scalar("Floor(o.x)", doc), Scalar::Double(-3.0));
    assert_eq!(scalar("Ceiling(o.x)", doc), Scalar::Double(-2.0));
    assert_eq!(scalar("-o.x", doc), Scalar::Double(2.5));
}

// ============================================================================
// Section: Aggregates
// ============================================================================

#[test]
fn test_aggregates() {
    let doc = r#"{"items":[{"p":2,"q":3},{"p":0.5,"q":2},{"p":null,"q":1}]}"#;
    assert_eq!(scalar("o.items.Count()", doc), Scalar::Long(3));
    assert_eq!(scalar("o.items.Min(i => i.p)", doc), Scalar::Double(0.5));
    assert_eq!(scalar("o.items.Max(i => i.q)", doc), Scalar::Long(3));
    assert_eq!(scalar("o.items.Sum(i => i.q)", doc), Scalar::Long(6));
    assert_eq!(scalar("o.items.Sum(i => i.p * i.q)", doc), Scalar::Double(7.0));
    assert_eq!(scalar("o.items.Average(i => i.q)", doc), Scalar::Double(2.0));
}

#[test]
fn test_aggregates_over_empty() {
    let doc = r#"{"items":[]}"#;
    assert_eq!(scalar("o.items.Min(i => i)", doc), Scalar::Null);
    assert_eq!(scalar("o.items.Average(i => i)", doc), Scalar::Null);
    assert_eq!(scalar("o.items.Sum(i => i)", doc), Scalar::Long(0));
}

#[test]
fn test_sum_of_doubles_is_exact() {
    let doc = r#"{"v":[0.1,0.2]}"#;
    assert_eq!(scalar("o.v.Sum(x => x)", doc), Scalar::Double(0.3));
}

#[test]
fn test_sum_and_average_beyond_decimal_range() {
    let doc = r#"{"v":[1e30]}"#;
    assert_eq!(scalar("o.v.Sum(x => x)", doc), Scalar::Double(1e30));
    assert_eq!(scalar("o.v.Average(x => x)", doc), Scalar::Double(1e30));
    assert_eq!(scalar("o.v.Max(x => x)", doc), Scalar::Double(1e30));

    // each value fits, the running total does not
    let doc = r#"{"v":[5e28,5e28]}"#;
    assert_eq!(scalar("o.v.Sum(x => x)", doc), Scalar::Double(1e29));
    assert_eq!(scalar("o.v.Average(x => x)", doc), Scalar::Double(5e28));

    match scalar("o.v.Average(x => x)", r#"{"v":[1e30,3e30,2]}"#) {
        Scalar::Double(avg) => assert!((avg - 4e30 / 3.0).abs() < 1e16),
        other => panic!("expected a double, got {:?}", other),
    }
}

// ============================================================================
// Section: Wildcard fields
// ============================================================================

#[test]
fn test_wildcard_eval_returns_array() {
    let doc = r#"{"items":[{"p":1},{"p":2}]}"#;
    assert_eq!(eval("o.items[*].p * 10", doc), Ok(json!([10, 20])));
}

#[test]
fn test_wildcard_as_quantifier_source() {
    let doc = r#"{"items":[{"tags":["x"]},{"tags":["y","z"]}]}"#;
    assert_eq!(scalar("o.items[*].tags.Count()", doc), Scalar::Long(2));
}

// ============================================================================
// Section: Filter boundary
// ============================================================================

#[test]
fn test_error_surfaces_message() {
    let err = filter("o.name > 1", DOC).unwrap_err();
    match err {
        FilterError::Eval(msg) => {
            assert!(msg.contains("incompatible operands"), "{}", msg);
            assert!(msg.contains("o.name > 1"), "{}", msg);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_non_bool_result_is_false() {
    assert_eq!(filter("o.name", DOC), Ok(false));
}

#[test]
fn test_static_filters_never_read_document() {
    let poisoned = b"{\"a\": [1, 2,";
    let mut yes = Filter::parse("o => 1 + 1 == 2", &config()).unwrap();
    let mut no = Filter::parse("false || false", &config()).unwrap();
    assert_eq!(yes.kind(), FilterKind::TrueLiteral);
    assert_eq!(no.kind(), FilterKind::FalseLiteral);
    assert_eq!(yes.filter(poisoned), Ok(true));
    assert_eq!(no.filter(poisoned), Ok(false));
}

#[test]
fn test_malformed_document_is_read_error() {
    assert!(matches!(filter("o.a == 1", "{\"a\":"), Err(FilterError::Read(_))));
    assert!(matches!(filter("o.a == 1", ""), Err(FilterError::Read(_))));
}

#[test]
fn test_batch_continues_after_bad_document() {
    let mut f = Filter::parse("o.n > 1", &config()).unwrap();
    let docs = [r#"{"n":2}"#, r#"{"n":"x"}"#, "{", r#"{"n":3}"#];
    let results: Vec<_> = docs.iter().map(|d| f.filter(d.as_bytes())).collect();
    assert_eq!(results[0], Ok(true));
    assert!(matches!(results[1], Err(FilterError::Eval(_))));
    assert!(matches!(results[2], Err(FilterError::Read(_))));
    assert_eq!(results[3], Ok(true));
}

#[test]
fn test_custom_root_argument() {
    let cfg = EngineConfig {
        root_arg: "doc".into(),
        ..EngineConfig::default()
    };
    let mut f = Filter::parse("doc.name == 'Foo'", &cfg).unwrap();
    assert_eq!(f.filter(DOC.as_bytes()), Ok(true));
    assert!(Filter::parse("o.name == 'Foo'", &cfg).is_err());
}

#[test]
fn test_unknown_argument_is_compile_error() {
    assert!(Filter::parse("o => x.name == 'Foo'", &config()).is_err());
}

#[test]
fn test_max_depth() {
    let cfg = EngineConfig {
        max_depth: 2,
        ..EngineConfig::default()
    };
    let mut f = Filter::parse("o.a == 1", &cfg).unwrap();
    assert!(matches!(
        f.filter(br#"{"a":[[1]]}"#),
        Err(FilterError::Read(_))
    ));
}

// ============================================================================
// Section: Pooling
// ============================================================================

#[test]
fn test_pooled_filters_are_reusable() {
    let pool = Pool::new(2, || Filter::parse("o.n >= 2", &EngineConfig::default()).unwrap());
    {
        let mut f = pool.lend();
        assert_eq!(f.filter(br#"{"n":2}"#), Ok(true));
    }
    let mut f = pool.lend();
    assert_eq!(f.filter(br#"{"n":1}"#), Ok(false));
    assert_eq!(pool.idle(), 0);
}
