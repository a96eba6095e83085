//! Cache reuse, invalidation and eviction across builds.

use crate::common::{TestProject, build, sample_code};
use tu_intel::indexing::{BuildOptions, BuildStatus};
use tu_intel::QueryFilter;

fn names_in(engine: &tu_intel::Engine, project: &TestProject, file: &str) -> Vec<String> {
    let filter = QueryFilter {
        file: Some(project.path().join(file)),
        ..Default::default()
    };
    engine
        .query(&filter)
        .unwrap()
        .into_iter()
        .map(|record| record.name.to_string())
        .collect()
}

#[test]
fn test_second_build_reuses_cache() {
    let project = TestProject::new();
    project.add_file("Foo.java", sample_code::FOO_JAVA);
    let engine = project.engine();

    let first = build(&engine, &project, &["Foo.java"]);
    assert_eq!(first.count(BuildStatus::Rebuilt), 1);
    assert_eq!(engine.parser_runs(), 1);
    let before = engine.query(&QueryFilter::default()).unwrap();

    let second = build(&engine, &project, &["Foo.java"]);
    assert_eq!(second.count(BuildStatus::Cached), 1);
    assert_eq!(engine.parser_runs(), 1, "a fresh entry must not reparse");
    assert_eq!(second.indexed_files, 0);
    assert_eq!(engine.query(&QueryFilter::default()).unwrap(), before);
}

#[test]
fn test_cache_survives_new_session() {
    let project = TestProject::new();
    project.add_file("Foo.java", sample_code::FOO_JAVA);
    {
        let engine = project.engine();
        build(&engine, &project, &["Foo.java"]);
    }

    let engine = project.engine();
    let report = build(&engine, &project, &["Foo.java"]);
    assert_eq!(report.count(BuildStatus::Cached), 1);
    assert_eq!(engine.parser_runs(), 0);
    assert_eq!(names_in(&engine, &project, "Foo.java"), vec!["Foo", "bar"]);
}

#[test]
fn test_edit_invalidates_entry() {
    let project = TestProject::new();
    project.add_file("Foo.java", sample_code::FOO_JAVA);
    let engine = project.engine();
    build(&engine, &project, &["Foo.java"]);

    project.add_file("Foo.java", "class Foo {\n    void baz() {}\n}\n");
    let report = build(&engine, &project, &["Foo.java"]);

    assert_eq!(report.count(BuildStatus::Rebuilt), 1);
    assert_eq!(engine.parser_runs(), 2);
    assert_eq!(names_in(&engine, &project, "Foo.java"), vec!["Foo", "baz"]);
}

#[test]
fn test_dependency_change_invalidates_importer() {
    let project = TestProject::new();
    project.add_file("util.py", "def helper():\n    return 1\n");
    project.add_file("main.py", "from util import helper\n\nhelper()\n");
    let engine = project.engine();
    build(&engine, &project, &["util.py", "main.py"]);

    project.add_file("util.py", "def helper():\n    return 2\n");
    let report = build(&engine, &project, &["main.py"]);

    assert_eq!(report.count(BuildStatus::Rebuilt), 1);
}

#[test]
fn test_force_reparses_fresh_files() {
    let project = TestProject::new();
    project.add_file("Foo.java", sample_code::FOO_JAVA);
    let engine = project.engine();
    build(&engine, &project, &["Foo.java"]);

    let options = BuildOptions {
        force: true,
        ..Default::default()
    };
    let report = engine.build(&project.sources(&["Foo.java"]), options).unwrap();

    assert_eq!(report.count(BuildStatus::Rebuilt), 1);
    assert_eq!(engine.parser_runs(), 2);
}

#[test]
fn test_deleted_file_is_evicted() {
    let project = TestProject::new();
    project.add_file("src/Foo.java", sample_code::FOO_JAVA);
    project.add_file("src/Other.java", sample_code::OTHER_JAVA);
    let engine = project.engine();
    let dir = project.path().join("src");
    engine.build_paths(&[dir.clone()], BuildOptions::default()).unwrap();
    assert_eq!(engine.cache_stats().unwrap().entries, 2);

    project.remove_file("src/Foo.java");
    let report = engine.build_paths(&[dir], BuildOptions::default()).unwrap();

    assert_eq!(report.count(BuildStatus::Removed), 1);
    assert_eq!(report.count(BuildStatus::Cached), 1);
    assert!(names_in(&engine, &project, "src/Foo.java").is_empty());
    assert_eq!(engine.index_stats().unwrap().files, 1);
    assert_eq!(engine.cache_stats().unwrap().entries, 1);
}

#[test]
fn test_one_failure_does_not_block_batch() {
    let project = TestProject::new();
    let mut paths = Vec::new();
    for i in 0..10 {
        let path = format!("mod_{i}.py");
        if i == 5 {
            project.add_file(&path, sample_code::BROKEN_PYTHON);
        } else {
            project.add_file(&path, &format!("def func_{i}():\n    return {i}\n"));
        }
        paths.push(path);
    }
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
    let engine = project.engine();

    let report = build(&engine, &project, &paths);

    assert_eq!(report.count(BuildStatus::Rebuilt), 9);
    assert_eq!(report.count(BuildStatus::Error), 1);
    let failed = report
        .files
        .iter()
        .find(|file| file.status == BuildStatus::Error)
        .unwrap();
    assert_eq!(&*failed.path, "mod_5.py");
    assert!(!failed.diagnostics.is_empty());
    assert_eq!(engine.index_stats().unwrap().files, 9);
    assert!(names_in(&engine, &project, "mod_5.py").is_empty());
    assert_eq!(names_in(&engine, &project, "mod_7.py"), vec!["func_7"]);
}

#[test]
fn test_cache_clear_forces_rebuild() {
    let project = TestProject::new();
    project.add_file("Foo.java", sample_code::FOO_JAVA);
    let engine = project.engine();
    build(&engine, &project, &["Foo.java"]);

    assert_eq!(engine.cache_clear().unwrap(), 1);
    assert_eq!(engine.cache_stats().unwrap().entries, 0);

    let report = build(&engine, &project, &["Foo.java"]);
    assert_eq!(report.count(BuildStatus::Rebuilt), 1);
}
