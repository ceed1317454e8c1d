use jsonsieve::EngineConfig;
use jsonsieve::cli::{
    self, CliError, PatchOptions, QueryOptions, SelectOptions, execute_eval, execute_explain,
    execute_filter, execute_filter_lines, execute_patch, execute_select,
};
use serde_json::json;

fn query(expr: &str, input: &str) -> QueryOptions {
    QueryOptions {
        expr: expr.to_string(),
        input: Some(input.to_string()),
        ..QueryOptions::default()
    }
}

// ============================================================================
// filter / eval
// ============================================================================

#[test]
fn test_filter_single_document() {
    let options = query("o => o.tags.Any(t => t == 'b')", r#"{"tags":["a","b"]}"#);
    assert!(execute_filter(&options).unwrap());
}

#[test]
fn test_filter_wire_expression() {
    let mut options = query(
        r#"{"op":"equal","left":{"op":"field","name":"o.name"},"right":{"op":"string","value":"Foo"}}"#,
        r#"{"name":"Foo"}"#,
    );
    options.wire = true;
    assert!(execute_filter(&options).unwrap());
}

#[test]
fn test_filter_lines_keeps_order_and_counts_failures() {
    let mut input = String::new();
    for n in 0..50 {
        input.push_str(&format!("{{\"n\":{}}}\n", n));
        if n % 10 == 0 {
            input.push_str("{\"n\":\"bad\"}\n\n");
        }
    }
    input.push_str("not json\n");

    let outcome = execute_filter_lines(&query("o.n % 2 == 0", &input)).unwrap();
    let expected: Vec<String> = (0..50)
        .filter(|n| n % 2 == 0)
        .map(|n| format!("{{\"n\":{}}}", n))
        .collect();
    assert_eq!(outcome.matched, expected);
    assert_eq!(outcome.failed, 6);
}

#[test]
fn test_filter_lines_single_worker() {
    let mut options = query("o.ok", "{\"ok\":true}\n{\"ok\":false}\n{\"ok\":true,\"x\":1}");
    options.config = EngineConfig {
        pool_capacity: 1,
        ..EngineConfig::default()
    };
    let outcome = execute_filter_lines(&options).unwrap();
    assert_eq!(outcome.matched, vec!["{\"ok\":true}", "{\"ok\":true,\"x\":1}"]);
    assert_eq!(outcome.failed, 0);
}

#[test]
fn test_eval_projection() {
    let options = query("o.items.Sum(i => i.price * i.qty)", r#"{"items":[{"price":2,"qty":3},{"price":1.5,"qty":2}]}"#);
    assert_eq!(execute_eval(&options).unwrap(), json!(9.0));

    let options = query("o.address", r#"{"address":{"city":"Oslo","zip":[1,2]}}"#);
    assert_eq!(execute_eval(&options).unwrap(), json!({"city": "Oslo", "zip": [1, 2]}));
}

#[test]
fn test_missing_input() {
    let options = QueryOptions {
        expr: "o.a".into(),
        ..QueryOptions::default()
    };
    assert!(matches!(execute_filter(&options), Err(CliError::NoInput)));
}

#[test]
fn test_compile_error() {
    assert!(matches!(
        execute_filter(&query("o.a ==", "{}")),
        Err(CliError::Compile(_))
    ));
}

// ============================================================================
// explain
// ============================================================================

#[test]
fn test_explain() {
    let options = QueryOptions {
        expr: "o => o.a > 1 + 2".into(),
        ..QueryOptions::default()
    };
    let out = execute_explain(&options).unwrap();
    assert_eq!(out["arg"], json!("o"));
    assert_eq!(out["expression"], json!("o.a > 3"));
    assert_eq!(out["wire"]["op"], json!("greaterThan"));
    assert_eq!(out["sql"], json!("(json_extract(data, '$.a') > 3)"));
}

// ============================================================================
// select / patch
// ============================================================================

#[test]
fn test_select() {
    let options = SelectOptions {
        paths: vec!["a".into(), "b[*].c".into(), "zz".into()],
        input: Some(r#"{"a":{"x":1},"b":[{"c":1},{"c":"two"}]}"#.into()),
        config: EngineConfig::default(),
    };
    assert_eq!(
        execute_select(&options).unwrap(),
        json!({"a": [{"x": 1}], "b[*].c": [1, "two"], "zz": []})
    );
}

#[test]
fn test_select_bad_path() {
    let options = SelectOptions {
        paths: vec!["a[".into()],
        input: Some("{}".into()),
        config: EngineConfig::default(),
    };
    assert!(matches!(execute_select(&options), Err(CliError::Path(_))));
}

#[test]
fn test_patch() {
    let options = PatchOptions {
        patch: r#"[{"op":"replace","path":"/a","value":[1]}]"#.into(),
        input: Some(r#"{"a":0,"b":{"keep" : true}}"#.into()),
        config: EngineConfig::default(),
    };
    assert_eq!(cli::execute_patch(&options).unwrap(), r#"{"a":[1],"b":{"keep" : true}}"#);

    let failing = PatchOptions {
        patch: r#"[{"op":"test","path":"/a","value":1}]"#.into(),
        ..options
    };
    assert!(matches!(execute_patch(&failing), Err(CliError::Patch(_))));
}
