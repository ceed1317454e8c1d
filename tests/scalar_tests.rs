use jsonsieve::Scalar;

fn all_binary(a: &Scalar, b: &Scalar) -> Vec<Scalar> {
    vec![
        a.equals_to(b),
        a.not_equals_to(b),
        a.less(b),
        a.less_or_equal(b),
        a.greater(b),
        a.greater_or_equal(b),
        a.add(b),
        a.subtract(b),
        a.multiply(b),
        a.divide(b),
        a.modulo(b),
        a.contains(b),
        a.starts_with(b),
        a.ends_with(b),
    ]
}

fn samples() -> Vec<Scalar> {
    vec![
        Scalar::String("x".into()),
        Scalar::Double(2.5),
        Scalar::Long(7),
        Scalar::Bool(true),
        Scalar::Null,
        Scalar::Array,
        Scalar::Object,
    ]
}

// ============================================================================
// Section: Numeric coercion
// ============================================================================

#[test]
fn test_long_double_equality_widens() {
    let cases = [(1i64, 1.0f64), (3, 3.5), (-4, -4.0), (0, -0.0), (1 << 53, 9007199254740992.0)];
    for (a, b) in cases {
        assert_eq!(
            Scalar::Long(a).equals_to(&Scalar::Double(b)),
            Scalar::Bool(a as f64 == b),
            "{} == {}",
            a,
            b
        );
    }
}

#[test]
fn test_long_double_ordering() {
    assert_eq!(Scalar::Long(2).less(&Scalar::Double(2.5)), Scalar::TRUE);
    assert_eq!(Scalar::Double(2.5).greater_or_equal(&Scalar::Long(3)), Scalar::FALSE);
}

#[test]
fn test_long_arithmetic_stays_long() {
    assert_eq!(Scalar::Long(2).add(&Scalar::Long(3)), Scalar::Long(5));
    assert_eq!(Scalar::Long(6).divide(&Scalar::Long(3)), Scalar::Long(2));
    assert_eq!(Scalar::Long(7).modulo(&Scalar::Long(4)), Scalar::Long(3));
    assert_eq!(Scalar::Long(2).add(&Scalar::Double(0.5)), Scalar::Double(2.5));
}

#[test]
fn test_overflow_and_zero_division_are_errors() {
    assert!(Scalar::Long(i64::MAX).add(&Scalar::Long(1)).is_error());
    assert!(Scalar::Long(1).divide(&Scalar::Long(0)).is_error());
    assert!(Scalar::Double(1.0).modulo(&Scalar::Double(0.0)).is_error());
}

// ============================================================================
// Section: Null and type mismatches
// ============================================================================

#[test]
fn test_null_is_three_valued() {
    assert_eq!(Scalar::Null.equals_to(&Scalar::Null), Scalar::TRUE);
    assert_eq!(Scalar::Null.equals_to(&Scalar::Long(1)), Scalar::Null);
    assert_eq!(Scalar::Long(1).not_equals_to(&Scalar::Null), Scalar::Null);
    assert_eq!(Scalar::Null.less(&Scalar::Long(1)), Scalar::Null);
    assert_eq!(Scalar::Null.add(&Scalar::Long(1)), Scalar::Null);
    assert_eq!(Scalar::Null.contains(&Scalar::String("a".into())), Scalar::Null);
}

#[test]
fn test_incompatible_operands_name_both_sides() {
    let r = Scalar::String("Foo".into()).add(&Scalar::Bool(true));
    let msg = r.error_message().unwrap();
    assert!(msg.contains("'Foo' (string)"), "{}", msg);
    assert!(msg.contains("true (bool)"), "{}", msg);
}

#[test]
fn test_string_predicates_need_strings() {
    assert!(Scalar::Long(1).contains(&Scalar::String("1".into())).is_error());
    assert_eq!(
        Scalar::String("hello".into()).ends_with(&Scalar::String("lo".into())),
        Scalar::TRUE
    );
}

#[test]
fn test_unary_requires_number() {
    assert!(Scalar::String("a".into()).abs().is_error());
    assert_eq!(Scalar::Null.sqrt(), Scalar::Null);
    assert_eq!(Scalar::Long(-3).abs(), Scalar::Long(3));
    assert_eq!(Scalar::Double(4.0).sqrt(), Scalar::Double(2.0));
}

// ============================================================================
// Section: Error propagation
// ============================================================================

#[test]
fn test_error_operand_is_returned_unchanged() {
    let err = Scalar::error("boom: original");
    for other in samples() {
        for result in all_binary(&err, &other) {
            assert_eq!(result, err);
        }
        for result in all_binary(&other, &err) {
            assert_eq!(result, err);
        }
    }
    for result in [
        err.abs(),
        err.ceiling(),
        err.floor(),
        err.exp(),
        err.log(),
        err.sqrt(),
        err.negate(),
        err.length(),
        err.not(),
    ] {
        assert_eq!(result, err);
    }
}

#[test]
fn test_first_error_wins_in_connectives() {
    let first = Scalar::error("first");
    let second = Scalar::error("second");
    assert_eq!(Scalar::and([&Scalar::TRUE, &first, &second]), first);
    assert_eq!(Scalar::or([&Scalar::TRUE, &first]), first);
}

#[test]
fn test_connectives() {
    assert_eq!(Scalar::and([&Scalar::TRUE, &Scalar::Null]), Scalar::Null);
    assert_eq!(Scalar::and([&Scalar::FALSE, &Scalar::Null]), Scalar::FALSE);
    assert_eq!(Scalar::or([&Scalar::FALSE, &Scalar::Null]), Scalar::Null);
    assert_eq!(Scalar::or([&Scalar::TRUE, &Scalar::Null]), Scalar::TRUE);
    assert!(Scalar::and([&Scalar::Long(1)]).is_error());
}

// ============================================================================
// Section: Conversion
// ============================================================================

#[test]
fn test_json_conversion() {
    let value = serde_json::json!({"a": 1});
    assert_eq!(Scalar::from_json(&value), Scalar::Object);
    assert_eq!(Scalar::from_json(&serde_json::json!(1.5)), Scalar::Double(1.5));
    assert_eq!(Scalar::Long(3).to_json(), serde_json::json!(3));
    assert_eq!(Scalar::error("x").to_json(), serde_json::Value::Null);
}
