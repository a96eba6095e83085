//! Name resolution across files and its incremental updates.

use crate::common::{TestProject, build, sample_code};
use tu_intel::completion::CancellationToken;
use tu_intel::{Location, QueryFilter, SymbolKind};

fn by_name(name: &str) -> QueryFilter {
    QueryFilter {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_method_call_resolves_to_other_file() {
    let project = TestProject::new();
    project.add_file("A.java", sample_code::FOO_JAVA);
    project.add_file("B.java", sample_code::USES_FOO_JAVA);
    let engine = project.engine();

    build(&engine, &project, &["A.java", "B.java"]);

    let records = engine.query(&by_name("bar")).unwrap();
    assert_eq!(records.len(), 1);
    let bar = &records[0];
    assert_eq!(bar.kind, SymbolKind::Method);
    assert_eq!(bar.definition, Location::new("A.java", 2, 10));
    assert_eq!(bar.container.as_deref(), Some("Foo"));
    assert_eq!(bar.references, vec![Location::new("B.java", 4, 11)]);
}

#[test]
fn test_reference_binds_once_definition_arrives() {
    let project = TestProject::new();
    project.add_file("A.java", sample_code::FOO_JAVA);
    project.add_file("B.java", sample_code::USES_FOO_JAVA);
    let engine = project.engine();

    let report = build(&engine, &project, &["B.java"]);
    assert!(report.unresolved_references > 0);
    let unresolved_before = engine.index_stats().unwrap().unresolved;
    assert!(unresolved_before > 0);
    assert!(engine.query(&by_name("bar")).unwrap().is_empty());

    build(&engine, &project, &["A.java"]);

    let records = engine.query(&by_name("bar")).unwrap();
    assert_eq!(records[0].references, vec![Location::new("B.java", 4, 11)]);
    assert!(engine.index_stats().unwrap().unresolved < unresolved_before);
}

#[test]
fn test_removed_definition_unbinds_users() {
    let project = TestProject::new();
    project.add_file("A.java", sample_code::FOO_JAVA);
    project.add_file("B.java", sample_code::USES_FOO_JAVA);
    let engine = project.engine();
    build(&engine, &project, &["A.java", "B.java"]);
    let resolved_unresolved = engine.index_stats().unwrap().unresolved;

    project.remove_file("A.java");
    build(&engine, &project, &["A.java"]);

    assert!(engine.query(&by_name("bar")).unwrap().is_empty());
    assert!(engine.index_stats().unwrap().unresolved > resolved_unresolved);
}

#[test]
fn test_imported_definition_wins_over_path_order() {
    let project = TestProject::new();
    project.add_file("a/util.py", "def helper():\n    return 'a'\n");
    project.add_file("b/util.py", "def helper():\n    return 'b'\n");
    project.add_file("c/main.py", "from b.util import helper\n\nhelper()\n");
    project.add_file("d/main.py", "helper()\n");
    let engine = project.engine();

    build(
        &engine,
        &project,
        &["a/util.py", "b/util.py", "c/main.py", "d/main.py"],
    );

    let records = engine.query(&by_name("helper")).unwrap();
    assert_eq!(records.len(), 2);
    let from_a = records
        .iter()
        .find(|record| &*record.definition.file == "a/util.py")
        .unwrap();
    let from_b = records
        .iter()
        .find(|record| &*record.definition.file == "b/util.py")
        .unwrap();
    assert_eq!(from_b.references, vec![Location::new("c/main.py", 3, 1)]);
    assert_eq!(from_a.references, vec![Location::new("d/main.py", 1, 1)]);
}

#[test]
fn test_references_from_use_site() {
    let project = TestProject::new();
    project.add_file("A.java", sample_code::FOO_JAVA);
    project.add_file("B.java", sample_code::USES_FOO_JAVA);
    let engine = project.engine();
    build(&engine, &project, &["A.java", "B.java"]);
    let token = CancellationToken::new();

    let set = engine
        .references(&project.path().join("B.java"), 4, 12, &token)
        .unwrap()
        .unwrap();
    assert_eq!(set.definition(), &Location::new("A.java", 2, 10));
    assert_eq!(set.references(), &[Location::new("B.java", 4, 11)]);

    let (definition, _) = engine
        .definition(&project.path().join("A.java"), 2, 10, &token)
        .unwrap()
        .unwrap();
    assert_eq!(definition, Location::new("A.java", 2, 10));

    let nothing = engine
        .references(&project.path().join("B.java"), 5, 1, &token)
        .unwrap();
    assert!(nothing.is_none());
}

#[test]
fn test_call_on_unknown_receiver_type_stays_unresolved() {
    let project = TestProject::new();
    project.add_file("A.java", "class A {\n    void add(int x) {}\n}\n");
    project.add_file(
        "B.java",
        "import java.util.List;\n\
         class B {\n\
         \x20   void run(List<String> items) {\n\
         \x20       items.add(\"s\");\n\
         \x20   }\n\
         }\n",
    );
    let engine = project.engine();
    build(&engine, &project, &["A.java", "B.java"]);

    let records = engine.query(&by_name("add")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].container.as_deref(), Some("A"));
    assert!(records[0].references.is_empty());
}
