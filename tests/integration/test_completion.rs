//! Completion ranking, staleness and cancellation.

use crate::common::{TestProject, build, sample_code};
use tu_intel::completion::{CancellationToken, Freshness};
use tu_intel::{QueryError, TuError};

fn labels(completion: &tu_intel::completion::Completion) -> Vec<&str> {
    completion.items.iter().map(|item| &*item.label).collect()
}

fn completion_project() -> TestProject {
    let project = TestProject::new();
    project.add_file("Foo.java", sample_code::COMPLETION_JAVA);
    project.add_file("Other.java", sample_code::OTHER_JAVA);
    project
}

#[test]
fn test_items_ranked_by_scope_distance() {
    let project = completion_project();
    let engine = project.engine();
    build(&engine, &project, &["Foo.java", "Other.java"]);

    let completion = engine
        .complete(&project.path().join("Foo.java"), 5, 1, &CancellationToken::new())
        .unwrap();

    assert_eq!(completion.freshness, Freshness::Fresh);
    assert_eq!(completion.prefix, "");
    assert_eq!(
        labels(&completion),
        vec!["step", "total", "bar", "count", "Foo", "Other"]
    );
    let tiers: Vec<u8> = completion.items.iter().map(|item| item.tier).collect();
    assert_eq!(tiers, vec![0, 0, 1, 1, 2, 3]);
    assert_eq!(completion.items[5].detail, "Class in Other.java");
}

#[test]
fn test_edited_file_reports_stale_index() {
    let project = completion_project();
    let engine = project.engine();
    build(&engine, &project, &["Foo.java", "Other.java"]);

    project.add_file(
        "Foo.java",
        "class Foo {\n    int count;\n    void bar(int step) {\n        int total = 1;\n        to\n    }\n}\n",
    );
    let completion = engine
        .complete(&project.path().join("Foo.java"), 5, 11, &CancellationToken::new())
        .unwrap();

    assert_eq!(completion.freshness, Freshness::Stale);
    assert_eq!(completion.prefix, "to");
    assert_eq!(labels(&completion), vec!["total"]);
}

#[test]
fn test_member_completion_after_dot() {
    let project = TestProject::new();
    project.add_file("A.java", sample_code::FOO_JAVA);
    project.add_file("B.java", sample_code::USES_FOO_JAVA);
    let engine = project.engine();
    build(&engine, &project, &["A.java", "B.java"]);
    project.add_file(
        "B.java",
        "class B {\n    void run() {\n        Foo x = new Foo();\n        x.\n    }\n}\n",
    );

    let completion = engine
        .complete(&project.path().join("B.java"), 4, 11, &CancellationToken::new())
        .unwrap();

    assert_eq!(completion.freshness, Freshness::Stale);
    assert_eq!(labels(&completion), vec!["bar"]);
    assert_eq!(completion.items[0].tier, 1);
}

#[test]
fn test_cancelled_request_returns_error() {
    let project = completion_project();
    let engine = project.engine();
    build(&engine, &project, &["Foo.java", "Other.java"]);

    let token = CancellationToken::new();
    token.cancel();
    let result = engine.complete(&project.path().join("Foo.java"), 5, 1, &token);

    assert!(matches!(result, Err(TuError::Query(QueryError::Cancelled))));
}

#[test]
fn test_unbuilt_file_is_not_indexed() {
    let project = completion_project();
    let engine = project.engine();
    build(&engine, &project, &["Other.java"]);

    let result = engine.complete(&project.path().join("Foo.java"), 5, 1, &CancellationToken::new());

    assert!(matches!(
        result,
        Err(TuError::Query(QueryError::NotIndexed { .. }))
    ));
}
