//! Java front end through the engine: imports, dependencies, tree output.

use crate::common::{TestProject, build, sample_code};
use tu_intel::ast::PrintOptions;
use tu_intel::indexing::BuildStatus;
use tu_intel::{Location, QueryFilter, SymbolKind};

const HELPER_JAVA: &str = "package com.acme.util;\n\npublic class Helper {\n    public static void run() {}\n}\n";

const APP_JAVA: &str = "package com.acme;\n\nimport com.acme.util.Helper;\n\npublic class App {\n    void start() {\n        Helper.run();\n    }\n}\n";

#[test]
fn test_import_becomes_dependency() {
    let project = TestProject::new();
    project.add_file("src/com/acme/util/Helper.java", HELPER_JAVA);
    project.add_file("src/com/acme/App.java", APP_JAVA);
    let engine = project.engine();
    build(
        &engine,
        &project,
        &["src/com/acme/util/Helper.java", "src/com/acme/App.java"],
    );

    let run = engine
        .query(&QueryFilter {
            name: Some("run".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(run.len(), 1);
    assert!(
        run[0]
            .references
            .contains(&Location::new("src/com/acme/App.java", 7, 16))
    );

    project.add_file(
        "src/com/acme/util/Helper.java",
        "package com.acme.util;\n\npublic class Helper {\n    public static void run() {}\n    public static void stop() {}\n}\n",
    );
    let report = build(&engine, &project, &["src/com/acme/App.java"]);
    assert_eq!(report.count(BuildStatus::Rebuilt), 1);
}

#[test]
fn test_symbols_carry_kinds_and_containers() {
    let project = TestProject::new();
    project.add_file("Foo.java", sample_code::COMPLETION_JAVA);
    let engine = project.engine();
    build(&engine, &project, &["Foo.java"]);

    let records = engine.query(&QueryFilter::default()).unwrap();
    let find = |name: &str| records.iter().find(|r| &*r.name == name).unwrap();

    assert_eq!(find("Foo").kind, SymbolKind::Class);
    assert_eq!(find("count").kind, SymbolKind::Field);
    assert_eq!(find("count").container.as_deref(), Some("Foo"));
    assert_eq!(find("bar").kind, SymbolKind::Method);
    assert_eq!(find("step").kind, SymbolKind::Parameter);
    assert_eq!(find("total").definition, Location::new("Foo.java", 4, 13));
}

#[test]
fn test_syntax_error_reports_diagnostics() {
    let project = TestProject::new();
    project.add_file("Bad.java", "class Bad {\n    void f( {\n}\n");
    let engine = project.engine();

    let report = build(&engine, &project, &["Bad.java"]);

    assert_eq!(report.count(BuildStatus::Error), 1);
    assert!(report.diagnostics().count() > 0);
    assert_eq!(engine.index_stats().unwrap().files, 0);
}

#[test]
fn test_print_ast_renders_tree() {
    let project = TestProject::new();
    let path = project.add_file("Foo.java", sample_code::FOO_JAVA);
    let engine = project.engine();

    let full = engine.print_ast(&path, PrintOptions::default()).unwrap();
    assert!(full.contains("TRANSLATION UNIT: Foo.java (java)"));
    assert!(full.contains("Class: 'Foo'  @ 1:7"));
    assert!(full.contains("Method: 'bar' <void>  @ 2:10"));
    assert!(full.contains("SYMBOL TABLE SUMMARY:"));

    let untyped = engine
        .print_ast(
            &path,
            PrintOptions {
                show_types: false,
                ..Default::default()
            },
        )
        .unwrap();
    assert!(untyped.contains("Method: 'bar'  @ 2:10"));
    assert!(!untyped.contains("<void>"));

    let shallow = engine
        .print_ast(
            &path,
            PrintOptions {
                show_locations: false,
                max_depth: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(shallow.contains("Class: 'Foo'"));
    assert!(!shallow.contains("  @ 1:7"));
    assert!(!shallow.contains("Method: 'bar'"));
}
