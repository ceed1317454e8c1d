use jsonsieve::{JsonEvent, JsonReader, Pool, Reset, Scalar, Selector};

const DOC: &str = r#"{"name":"Foo","tags":["a","b"],"n":1.5,"o":{"x":true, "y":null},"items":[{"id":1},{"id":2,"extra":[1,2]},{"id":3}]}"#;

fn values(selector: &mut Selector, json: &str) -> Vec<Vec<Scalar>> {
    selector
        .select(json.as_bytes())
        .unwrap()
        .iter()
        .map(|r| r.values.clone())
        .collect()
}

fn total_events(json: &str) -> usize {
    let mut reader = JsonReader::new(json.as_bytes());
    while !matches!(reader.next_event(), JsonEvent::Eof | JsonEvent::Error) {}
    reader.events_read()
}

// ============================================================================
// Section: Matching
// ============================================================================

#[test]
fn test_select_many_paths() {
    let mut selector = Selector::new(&["name", "tags[1]", "n", "o.x", "o.y", "missing"]).unwrap();
    assert_eq!(
        values(&mut selector, DOC),
        vec![
            vec![Scalar::String("Foo".into())],
            vec![Scalar::String("b".into())],
            vec![Scalar::Double(1.5)],
            vec![Scalar::TRUE],
            vec![Scalar::Null],
            vec![],
        ]
    );
}

#[test]
fn test_wildcard_visits_every_element() {
    let mut selector = Selector::new(&["items[*].id", "tags[*]"]).unwrap();
    let results = selector.select(DOC.as_bytes()).unwrap();
    assert_eq!(
        results[0].values,
        vec![Scalar::Long(1), Scalar::Long(2), Scalar::Long(3)]
    );
    assert_eq!(results[1].json, vec![r#""a""#, r#""b""#]);
}

#[test]
fn test_container_match_has_placeholder_and_source() {
    let mut selector = Selector::new(&["o", "o.x", "items[1].extra"]).unwrap();
    let results = selector.select(DOC.as_bytes()).unwrap();
    assert_eq!(results[0].values, vec![Scalar::Object]);
    assert_eq!(results[0].json, vec![r#"{"x":true, "y":null}"#]);
    assert_eq!(results[1].single(), Some(&Scalar::TRUE));
    assert_eq!(results[2].values, vec![Scalar::Array]);
    assert_eq!(results[2].json, vec!["[1,2]"]);
}

#[test]
fn test_duplicate_paths_each_get_results() {
    let mut selector = Selector::new(&["name", "name"]).unwrap();
    let results = selector.select(DOC.as_bytes()).unwrap();
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].values.len(), 1);
}

#[test]
fn test_array_root() {
    let doc = r#"[{"a":1,"b":2},{"a":3}]"#;
    let mut selector = Selector::new(&["[1].a"]).unwrap();
    assert_eq!(values(&mut selector, doc), vec![vec![Scalar::Long(3)]]);
    let mut selector = Selector::new(&["[*].b"]).unwrap();
    assert_eq!(values(&mut selector, doc), vec![vec![Scalar::Long(2)]]);
}

#[test]
fn test_wildcard_shadows_literal_index() {
    let doc = r#"[{"a":1},{"a":3}]"#;
    let mut selector = Selector::new(&["[*].a", "[1].a"]).unwrap();
    assert_eq!(
        values(&mut selector, doc),
        vec![vec![Scalar::Long(1), Scalar::Long(3)], vec![]]
    );
}

// ============================================================================
// Section: Edge cases
// ============================================================================

#[test]
fn test_empty_document_has_no_matches() {
    let mut selector = Selector::new(&["a"]).unwrap();
    assert_eq!(values(&mut selector, ""), vec![Vec::<Scalar>::new()]);
    assert_eq!(values(&mut selector, "   "), vec![Vec::<Scalar>::new()]);
}

#[test]
fn test_scalar_root_has_no_matches() {
    let mut selector = Selector::new(&["a"]).unwrap();
    assert_eq!(values(&mut selector, "42"), vec![Vec::<Scalar>::new()]);
}

#[test]
fn test_malformed_document_reports_tokenizer_error() {
    let mut selector = Selector::new(&["a", "b"]).unwrap();
    assert!(selector.select(br#"{"a":1,"b":}"#).is_err());
    let message = selector.error_message().unwrap();
    assert!(message.contains("position"), "{}", message);
    assert!(selector.results().iter().all(|r| r.values.is_empty()));

    assert!(selector.select(br#"{"a":1}"#).is_ok());
    assert_eq!(selector.error_message(), None);
}

#[test]
fn test_results_are_recomputed_per_document() {
    let mut selector = Selector::new(&["a"]).unwrap();
    assert_eq!(values(&mut selector, r#"{"a":1}"#), vec![vec![Scalar::Long(1)]]);
    assert_eq!(values(&mut selector, r#"{"b":1}"#), vec![Vec::<Scalar>::new()]);
}

#[test]
fn test_invalid_path() {
    assert!(Selector::new(&["a[x]"]).is_err());
}

// ============================================================================
// Section: Linearity
// ============================================================================

#[test]
fn test_unmatched_subtrees_are_skipped_once() {
    let mut doc = String::from("{");
    for i in 0..10 {
        doc.push_str(&format!(r#""big{}":{{"deep":[1,2,{{"x":[3,4]}}]}},"#, i));
    }
    doc.push_str(r#""want":1,"other":{"x":2}}"#);

    let mut one = Selector::new(&["want"]).unwrap();
    one.select(doc.as_bytes()).unwrap();
    assert_eq!(one.skipped(), 11);

    let mut four = Selector::new(&["want", "other.x", "absent.y", "other.z"]).unwrap();
    four.select(doc.as_bytes()).unwrap();
    assert_eq!(four.skipped(), 10);

    // every token is read exactly once regardless of the number of paths
    let total = total_events(&doc);
    assert_eq!(one.events_read(), total);
    assert_eq!(four.events_read(), total);
}

// ============================================================================
// Section: Reuse
// ============================================================================

#[test]
fn test_reset_clears_tree() {
    let mut selector = Selector::new(&["a"]).unwrap();
    selector.reset();
    assert!(selector.paths().is_empty());
    assert!(selector.select(br#"{"a":1}"#).unwrap().is_empty());

    selector.set_paths(&["b"]).unwrap();
    assert_eq!(values(&mut selector, r#"{"a":1,"b":2}"#), vec![vec![Scalar::Long(2)]]);
}

#[test]
fn test_pooled_selectors() {
    let pool: Pool<Selector> = Pool::default();
    {
        let mut selector = pool.lend();
        selector.set_paths(&["a"]).unwrap();
        selector.select(br#"{"a":1}"#).unwrap();
    }
    let selector = pool.lend();
    assert!(selector.paths().is_empty());
    assert!(selector.results().is_empty());
}
