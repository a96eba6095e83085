//! C and C++ through clang. Tests that need a real clang skip without one.

use crate::common::{TestProject, build, clang_available, sample_code};
use std::sync::Arc;
use tu_intel::indexing::BuildStatus;
use tu_intel::{Engine, QueryFilter, SymbolKind};

const COUNTER_CPP: &str = "#include \"util.h\"\n\nclass Counter {\npublic:\n    int bump() { return twice(value); }\n    int value;\n};\n";

fn named(engine: &Engine, name: &str) -> Vec<tu_intel::IndexRecord> {
    engine
        .query(&QueryFilter {
            name: Some(name.to_string()),
            ..Default::default()
        })
        .unwrap()
}

#[test]
fn test_cpp_class_members() {
    if !clang_available() {
        eprintln!("clang not found, skipping");
        return;
    }
    let project = TestProject::new();
    project.add_file("util.h", "inline int twice(int x) { return x * 2; }\n");
    project.add_file("counter.cpp", COUNTER_CPP);
    let engine = project.engine();

    let report = build(&engine, &project, &["counter.cpp"]);
    assert_eq!(report.count(BuildStatus::Rebuilt), 1);

    let counter = named(&engine, "Counter");
    assert_eq!(counter.len(), 1);
    assert_eq!(counter[0].kind, SymbolKind::Class);

    let bump = named(&engine, "bump");
    assert_eq!(bump[0].kind, SymbolKind::Method);
    assert_eq!(bump[0].container.as_deref(), Some("Counter"));

    // Declarations from the header stay out of this file's symbols
    assert!(named(&engine, "twice").is_empty());
}

#[test]
fn test_header_edit_rebuilds_includer() {
    if !clang_available() {
        eprintln!("clang not found, skipping");
        return;
    }
    let project = TestProject::new();
    project.add_file("util.h", "inline int twice(int x) { return x * 2; }\n");
    project.add_file("counter.cpp", COUNTER_CPP);
    let engine = project.engine();
    build(&engine, &project, &["counter.cpp"]);

    let cached = build(&engine, &project, &["counter.cpp"]);
    assert_eq!(cached.count(BuildStatus::Cached), 1);

    project.add_file("util.h", "inline int twice(int x) { return x + x; }\n");
    let report = build(&engine, &project, &["counter.cpp"]);
    assert_eq!(report.count(BuildStatus::Rebuilt), 1);
}

#[test]
fn test_c_call_resolves_to_definition_file() {
    if !clang_available() {
        eprintln!("clang not found, skipping");
        return;
    }
    let project = TestProject::new();
    project.add_file("util.h", "int twice(int x);\n");
    project.add_file("util.c", "#include \"util.h\"\n\nint twice(int x) { return x * 2; }\n");
    project.add_file(
        "main.c",
        "#include \"util.h\"\n\nint main(void) {\n    return twice(2);\n}\n",
    );
    let engine = project.engine();

    build(&engine, &project, &["util.c", "main.c"]);

    let twice = named(&engine, "twice");
    assert_eq!(twice.len(), 1);
    assert_eq!(twice[0].kind, SymbolKind::Function);
    assert_eq!(&*twice[0].definition.file, "util.c");
    assert!(
        twice[0]
            .references
            .iter()
            .any(|location| &*location.file == "main.c" && location.line == 4)
    );
}

#[test]
fn test_missing_clang_marks_language_unavailable() {
    let project = TestProject::new();
    project.add_file("main.cpp", "int main() { return 0; }\n");
    project.add_file("Foo.java", sample_code::FOO_JAVA);
    let mut settings = project.settings();
    settings
        .languages
        .get_mut("cpp")
        .unwrap()
        .parser_options
        .insert(
            "clang_path".to_string(),
            serde_json::json!("/nonexistent/bin/clang-tu-test"),
        );
    let engine = Engine::open(Arc::new(settings)).unwrap();

    let report = build(&engine, &project, &["main.cpp", "Foo.java"]);

    assert_eq!(report.count(BuildStatus::Error), 1);
    assert_eq!(report.count(BuildStatus::Rebuilt), 1);
    assert!(
        report
            .unavailable_languages
            .iter()
            .any(|(language, _)| language.as_str() == "cpp")
    );
    assert_eq!(named(&engine, "Foo").len(), 1);
}
