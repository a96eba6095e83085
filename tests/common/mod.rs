#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tu_intel::indexing::BuildOptions;
use tu_intel::{BuildReport, Engine, Settings, SourceFile};

/// A throwaway workspace with its own cache and index.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    pub fn remove_file(&self, path: &str) {
        fs::remove_file(self.dir.path().join(path)).expect("Failed to remove file");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.workspace_root = Some(self.path().to_path_buf());
        settings.cache_path = PathBuf::from(".tu/cache");
        settings.index_path = PathBuf::from(".tu/index");
        settings.indexing.parallel_threads = 2;
        settings.index.retry_backoff_ms = 1;
        settings
    }

    /// Engine over this project's cache and index.
    pub fn engine(&self) -> Engine {
        Engine::open(Arc::new(self.settings())).expect("Failed to open engine")
    }

    pub fn sources(&self, paths: &[&str]) -> Vec<SourceFile> {
        paths
            .iter()
            .map(|p| SourceFile::new(self.path().join(p)))
            .collect()
    }
}

pub fn build(engine: &Engine, project: &TestProject, paths: &[&str]) -> BuildReport {
    engine
        .build(&project.sources(paths), BuildOptions::default())
        .expect("build failed")
}

pub fn clang_available() -> bool {
    std::process::Command::new("clang")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

pub mod sample_code {
    pub const FOO_JAVA: &str = "class Foo {\n    void bar() {}\n}\n";

    pub const USES_FOO_JAVA: &str = "class B {\n    void run() {\n        Foo x = new Foo();\n        x.bar();\n    }\n}\n";

    pub const COMPLETION_JAVA: &str = "class Foo {\n    int count;\n    void bar(int step) {\n        int total = 1;\n\n    }\n}\n";

    pub const OTHER_JAVA: &str = "class Other {\n    void helper() {}\n}\n";

    pub const BROKEN_PYTHON: &str = "def broken(:\n    pass\n";
}
