//! Python front end through the engine.

use crate::common::{TestProject, build, sample_code};
use tu_intel::indexing::BuildStatus;
use tu_intel::{Location, QueryFilter, SymbolKind};

const MODELS_PY: &str = "class Account:\n    def deposit(self, amount):\n        self.balance = amount\n";

const SERVICE_PY: &str = "from .models import Account\n\ndef open_account():\n    acct = Account()\n    acct.deposit(10)\n    return acct\n";

fn named(engine: &tu_intel::Engine, name: &str) -> Vec<tu_intel::IndexRecord> {
    engine
        .query(&QueryFilter {
            name: Some(name.to_string()),
            ..Default::default()
        })
        .unwrap()
}

#[test]
fn test_relative_import_and_inferred_receiver() {
    let project = TestProject::new();
    project.add_file("pkg/__init__.py", "");
    project.add_file("pkg/models.py", MODELS_PY);
    project.add_file("pkg/service.py", SERVICE_PY);
    let engine = project.engine();
    build(
        &engine,
        &project,
        &["pkg/__init__.py", "pkg/models.py", "pkg/service.py"],
    );

    let deposit = named(&engine, "deposit");
    assert_eq!(deposit.len(), 1);
    assert_eq!(deposit[0].kind, SymbolKind::Method);
    assert_eq!(deposit[0].container.as_deref(), Some("Account"));
    assert_eq!(
        deposit[0].references,
        vec![Location::new("pkg/service.py", 5, 10)]
    );

    let account = named(&engine, "Account");
    assert!(
        account[0]
            .references
            .contains(&Location::new("pkg/service.py", 4, 12))
    );

    let balance = named(&engine, "balance");
    assert_eq!(balance[0].kind, SymbolKind::Field);
    assert_eq!(balance[0].container.as_deref(), Some("Account"));
}

#[test]
fn test_imported_module_edit_rebuilds_importer() {
    let project = TestProject::new();
    project.add_file("pkg/models.py", MODELS_PY);
    project.add_file("pkg/service.py", SERVICE_PY);
    let engine = project.engine();
    build(&engine, &project, &["pkg/models.py", "pkg/service.py"]);

    let unchanged = build(&engine, &project, &["pkg/service.py"]);
    assert_eq!(unchanged.count(BuildStatus::Cached), 1);

    project.add_file(
        "pkg/models.py",
        "class Account:\n    def deposit(self, amount):\n        self.balance = amount\n\n    def close(self):\n        pass\n",
    );
    let report = build(&engine, &project, &["pkg/service.py"]);
    assert_eq!(report.count(BuildStatus::Rebuilt), 1);
}

#[test]
fn test_syntax_error_keeps_previous_good_rows() {
    let project = TestProject::new();
    project.add_file("mod.py", "def working():\n    return 1\n");
    let engine = project.engine();
    build(&engine, &project, &["mod.py"]);

    project.add_file("mod.py", sample_code::BROKEN_PYTHON);
    let report = build(&engine, &project, &["mod.py"]);

    assert_eq!(report.count(BuildStatus::Error), 1);
    assert_eq!(named(&engine, "working").len(), 1);
    assert!(named(&engine, "broken").is_empty());
}
