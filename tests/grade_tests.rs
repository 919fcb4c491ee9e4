//! Tests for outcome recording and grading.

use std::time::Duration;

use pointgrade::{
    GradingError, PointRegistry, SuiteDefinition, SuiteSpec, TestId, compute_grade,
    outcome::{
        GroupedResults, NO_OUTCOME_MESSAGE, ResultObserver, ResultRecorder, Status, SuiteResults,
        TestError, TestOutcome,
    },
};
use pretty_assertions::assert_eq;

fn calc_definition() -> SuiteDefinition {
    SuiteDefinition::default().with_suite(
        SuiteSpec::new("correction", "TestCalc")
            .points(2)
            .test("test_add", 3)
            .test("test_div", 7),
    )
}

fn registry_for(definition: &SuiteDefinition) -> PointRegistry {
    let mut registry = PointRegistry::new();
    definition.register_points(&mut registry).unwrap();
    registry
}

fn id(class: &str, method: &str) -> TestId {
    TestId::new("correction", class, method)
}

const MS: Duration = Duration::from_millis(1);

#[test]
fn suite_points_count_per_test() {
    let definition = calc_definition();
    let registry = registry_for(&definition);

    let mut recorder = ResultRecorder::new(&registry);
    recorder.add_success(&id("TestCalc", "test_add"), MS);
    recorder.add_failure(&id("TestCalc", "test_div"), TestError::message("1 != 2"), MS);
    let results = recorder.finish(&definition);

    let grade = compute_grade(&results, 20.0).unwrap();
    assert_eq!(grade.raw_max, 14);
    assert_eq!(grade.raw_points, 5);
    assert_eq!(grade.grade, 7.1);

    let awarded: Vec<(u32, u32)> = results
        .outcomes()
        .map(|o| (o.points_awarded(), o.max_points()))
        .collect();
    assert_eq!(awarded, vec![(5, 5), (0, 9)]);
}

#[test]
fn grade_is_linear_in_awarded_points() {
    let definition = SuiteDefinition::default().with_suite(
        SuiteSpec::new("correction", "TestLinear")
            .test("test_a", 5)
            .test("test_b", 5)
            .test("test_c", 5)
            .test("test_d", 5),
    );
    let registry = registry_for(&definition);

    let run = |passing: &[&str]| {
        let mut recorder = ResultRecorder::new(&registry);
        for method in passing {
            recorder.add_success(&id("TestLinear", method), MS);
        }
        compute_grade(&recorder.finish(&definition), 20.0).unwrap()
    };

    let one = run(&["test_a"]);
    let two = run(&["test_a", "test_b"]);
    assert_eq!(one.grade, 5.0);
    assert_eq!(two.grade, 2.0 * one.grade);
    assert_eq!(one.coefficient, two.coefficient);
}

#[test]
fn zero_available_points_is_a_configuration_error() {
    let err = compute_grade(&GroupedResults::default(), 20.0).unwrap_err();
    assert_eq!(err, GradingError::NoPoints);
}

#[test]
fn skipped_tests_are_left_out_of_totals() {
    let definition = calc_definition();
    let registry = registry_for(&definition);

    let mut recorder = ResultRecorder::new(&registry);
    recorder.add_success(&id("TestCalc", "test_add"), MS);
    recorder.add_skip(&id("TestCalc", "test_div"), "not on this platform", MS);
    let grade = compute_grade(&recorder.finish(&definition), 20.0).unwrap();

    assert_eq!(grade.raw_max, 5);
    assert_eq!(grade.raw_points, 5);
    assert_eq!(grade.grade, 20.0);
}

#[test]
fn missing_outcomes_become_errors() {
    let definition = calc_definition();
    let registry = registry_for(&definition);

    let mut recorder = ResultRecorder::new(&registry);
    recorder.add_success(&id("TestCalc", "test_div"), MS);
    let results = recorder.finish(&definition);

    let add = results
        .outcomes()
        .find(|o| o.name() == "test_add")
        .unwrap();
    assert_eq!(add.status(), Status::Error);
    assert_eq!(add.message(), NO_OUTCOME_MESSAGE);
    assert_eq!(add.points_awarded(), 0);
    assert_eq!(add.max_points(), 5);
}

#[test]
fn outcomes_follow_declaration_order() {
    let definition = calc_definition().with_suite(
        SuiteSpec::new("correction", "TestText")
            .test("test_upper", 1)
            .test("test_lower", 1),
    );
    let registry = registry_for(&definition);

    let mut recorder = ResultRecorder::new(&registry);
    recorder.add_success(&id("TestText", "test_lower"), MS);
    recorder.add_failure(&id("TestUndeclared", "test_extra"), TestError::message("boom"), MS);
    recorder.add_success(&id("TestCalc", "test_div"), MS);
    recorder.add_success(&id("TestText", "test_upper"), MS);
    recorder.add_success(&id("TestCalc", "test_add"), MS);
    let results = recorder.finish(&definition);

    let order: Vec<String> = results.outcomes().map(|o| o.id().qualified()).collect();
    assert_eq!(
        order,
        vec![
            "correction.TestCalc.test_add",
            "correction.TestCalc.test_div",
            "correction.TestText.test_upper",
            "correction.TestText.test_lower",
            "correction.TestUndeclared.test_extra",
        ]
    );
    assert_eq!(results.suites.len(), 3);
}

#[test]
fn second_outcome_for_a_test_is_ignored() {
    let definition = calc_definition();
    let registry = registry_for(&definition);

    let mut recorder = ResultRecorder::new(&registry);
    recorder.add_success(&id("TestCalc", "test_add"), MS);
    recorder.add_error(&id("TestCalc", "test_add"), TestError::message("teardown"), MS);
    assert_eq!(recorder.outcomes().len(), 1);
    assert_eq!(recorder.outcomes()[0].status(), Status::Success);
}

#[test]
fn setup_failures_explain_the_tests_they_stopped() {
    let definition = calc_definition().with_suite(
        SuiteSpec::new("correction", "TestText").test("test_upper", 1),
    );
    let registry = registry_for(&definition);

    let mut recorder = ResultRecorder::new(&registry);
    recorder.add_success(&id("TestCalc", "test_add"), MS);
    recorder.add_setup_outcome(
        "correction.TestText",
        Status::Error,
        TestError::message("RuntimeError: no fixture"),
    );
    recorder.add_setup_outcome(
        "correction",
        Status::Error,
        TestError::message("ImportError: cannot import name 'mul'"),
    );
    let results = recorder.finish(&definition);

    let seen: Vec<(&str, Status, &str)> = results
        .outcomes()
        .map(|o| (o.name(), o.status(), o.message()))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("test_add", Status::Success, ""),
            ("test_div", Status::Error, "ImportError: cannot import name 'mul'"),
            ("test_upper", Status::Error, "RuntimeError: no fixture"),
        ]
    );
    assert_eq!(results.suites.len(), 2);
}

#[test]
fn oversized_totals_are_refused() {
    let outcome = |method: &str| {
        TestOutcome::new(id("TestCalc", method), Status::Success, TestError::default(), MS, u32::MAX)
    };
    let results = GroupedResults {
        suites: vec![SuiteResults {
            module:   "correction".into(),
            name:     "TestCalc".into(),
            outcomes: vec![outcome("test_add"), outcome("test_div")],
        }],
    };

    let err = compute_grade(&results, 20.0).unwrap_err();
    assert_eq!(err, GradingError::TooManyPoints(2 * u64::from(u32::MAX)));
}
