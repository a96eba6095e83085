//! Parallel builds must agree with sequential ones.

use crate::common::{TestProject, build, sample_code};
use std::sync::atomic::{AtomicBool, Ordering};
use tu_intel::indexing::{BuildOptions, BuildStatus};
use tu_intel::QueryFilter;

const FILES: usize = 100;

fn generated_project() -> (TestProject, Vec<String>) {
    let project = TestProject::new();
    let mut paths = Vec::with_capacity(FILES);
    for i in 0..FILES {
        let path = format!("pkg/mod_{i:03}.py");
        let body = if i == 0 {
            "class Node0:\n    def run(self):\n        return 0\n\ndef func_0():\n    return Node0()\n".to_string()
        } else {
            format!(
                "class Node{i}:\n    def run(self):\n        return func_{prev}()\n\ndef func_{i}():\n    shared = func_{prev}()\n    return shared\n",
                prev = i - 1
            )
        };
        project.add_file(&path, &body);
        paths.push(path);
    }
    (project, paths)
}

fn build_with_threads(threads: usize) -> (TestProject, Vec<tu_intel::IndexRecord>) {
    let (project, paths) = generated_project();
    let engine = project.engine();
    let options = BuildOptions {
        threads: Some(threads),
        ..Default::default()
    };
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
    let report = engine.build(&project.sources(&paths), options).unwrap();
    assert_eq!(report.count(BuildStatus::Rebuilt), FILES);
    let records = engine.query(&QueryFilter::default()).unwrap();
    (project, records)
}

#[test]
fn test_thread_count_does_not_change_results() {
    let (_single, sequential) = build_with_threads(1);
    let (_multi, parallel) = build_with_threads(4);

    assert!(!sequential.is_empty());
    assert_eq!(sequential, parallel);
}

#[test]
fn test_same_file_built_from_two_threads_parses_once() {
    let project = TestProject::new();
    project.add_file("Foo.java", sample_code::FOO_JAVA);
    let engine = project.engine();

    std::thread::scope(|scope| {
        for _ in 0..2 {
            scope.spawn(|| build(&engine, &project, &["Foo.java"]));
        }
    });

    assert_eq!(engine.parser_runs(), 1);
    assert_eq!(engine.index_stats().unwrap().files, 1);
}

#[test]
fn test_readers_never_see_partial_batch() {
    let (project, paths) = generated_project();
    let engine = project.engine();
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Acquire) {
                let files = engine.index_stats().unwrap().files;
                assert!(files == 0 || files == FILES, "saw {files} indexed files");
            }
        });
        build(&engine, &project, &paths);
        done.store(true, Ordering::Release);
    });

    assert_eq!(engine.index_stats().unwrap().files, FILES);
}
