//! Tests for point registration and lookup.

use pointgrade::{GradingError, PointRegistry, PointTarget, SuiteDefinition, SuiteSpec, TestId};

#[test]
fn lookup_adds_suite_points_to_test_points() {
    let mut registry = PointRegistry::new();
    registry
        .register(PointTarget::Suite, "correction.TestCalc", 2)
        .unwrap();
    registry
        .register(PointTarget::Test, "correction.TestCalc.test_add", 3)
        .unwrap();

    assert_eq!(registry.lookup(&TestId::new("correction", "TestCalc", "test_add")), 5);
    // only the suite level is declared
    assert_eq!(registry.lookup(&TestId::new("correction", "TestCalc", "test_div")), 2);
    // neither level is declared
    assert_eq!(registry.lookup(&TestId::new("correction", "TestOther", "test_x")), 0);
}

#[test]
fn reregistering_overwrites_only_that_key() {
    let mut registry = PointRegistry::new();
    registry.register(PointTarget::Test, "m.C.test_a", 3).unwrap();
    registry.register(PointTarget::Test, "m.C.test_b", 4).unwrap();
    registry.register(PointTarget::Test, "m.C.test_a", 10).unwrap();

    assert_eq!(registry.lookup(&TestId::new("m", "C", "test_a")), 10);
    assert_eq!(registry.lookup(&TestId::new("m", "C", "test_b")), 4);
}

#[test]
fn suite_and_test_keys_do_not_collide() {
    let mut registry = PointRegistry::new();
    // a test-level key that happens to look like a suite key
    registry.register(PointTarget::Test, "m.C", 7).unwrap();
    assert_eq!(registry.lookup(&TestId::new("m", "C", "test_a")), 0);
}

#[test]
fn definition_registers_every_level() {
    let definition = SuiteDefinition::default()
        .with_suite(
            SuiteSpec::new("correction", "TestCalc")
                .points(2)
                .test("test_add", 3)
                .test("test_div", 7),
        )
        .with_suite(
            SuiteSpec::new("correction", "TestText")
                .test("test_upper", 1)
                .unweighted("test_lower"),
        );

    let mut registry = PointRegistry::new();
    definition.register_points(&mut registry).unwrap();

    let ids = definition.test_ids();
    assert_eq!(ids.len(), 4);
    assert_eq!(registry.total(&ids), 5 + 9 + 1);
}

#[test]
fn definition_stops_at_invalid_points() {
    let definition =
        SuiteDefinition::new(vec![SuiteSpec::new("m", "C").test("test_a", 1).test("test_b", -2)]);

    let mut registry = PointRegistry::new();
    let err = definition.register_points(&mut registry).unwrap_err();
    assert_eq!(
        err,
        GradingError::InvalidPoints {
            target: "m.C.test_b".into(),
            value:  "-2".into(),
        }
    );
}

#[test]
fn test_ids_parse_back() {
    let id = TestId::parse("pkg.correction.TestCalc.test_add").unwrap();
    assert_eq!(id.module, "pkg.correction");
    assert_eq!(id.class, "TestCalc");
    assert_eq!(id.short_name(), "test_add");
    assert_eq!(id.suite_key(), "pkg.correction.TestCalc");

    assert!(matches!(
        TestId::parse("TestCalc.test_add"),
        Err(GradingError::MalformedTestId(_))
    ));
    assert!(TestId::parse("m..test_add").is_err());
}
