//! Tables for build, query and cache output.

use crate::cache::CacheStats;
use crate::completion::CompletionItem;
use crate::engine::BuildReport;
use crate::indexing::BuildStatus;
use crate::storage::{IndexRecord, IndexStats};
use comfy_table::{
    Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

/// Builder for tables in the house style.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        Self { table }
    }

    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    fn add_cells(mut self, row: Vec<Cell>) -> Self {
        self.table.add_row(row);
        self
    }

    pub fn build(self) -> String {
        self.table.to_string()
    }
}

fn status_color(status: BuildStatus) -> Color {
    match status {
        BuildStatus::Cached => Color::DarkGrey,
        BuildStatus::Rebuilt => Color::Green,
        BuildStatus::Error => Color::Red,
        BuildStatus::Removed => Color::Yellow,
    }
}

/// Files that were rebuilt, failed or removed; cached files are only
/// counted in the footer.
pub fn create_build_table(report: &BuildReport) -> String {
    let mut table = TableBuilder::new().set_headers(vec!["File", "Language", "Status", "Diagnostics"]);
    for file in report.files.iter().filter(|f| f.status != BuildStatus::Cached) {
        let diagnostics = file
            .diagnostics
            .iter()
            .map(|d| match (d.line, d.column) {
                (Some(line), Some(column)) => format!("{line}:{column} {}", d.message),
                (Some(line), None) => format!("{line} {}", d.message),
                _ => d.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        table = table.add_cells(vec![
            Cell::new(&file.path),
            Cell::new(file.language.map_or("-", |l| l.as_str())),
            Cell::new(file.status.as_str()).fg(status_color(file.status)),
            Cell::new(diagnostics),
        ]);
    }
    table
        .add_cells(vec![
            Cell::new("TOTAL").add_attribute(Attribute::Bold),
            Cell::new(""),
            Cell::new(format!(
                "{} rebuilt, {} cached, {} failed",
                report.count(BuildStatus::Rebuilt),
                report.count(BuildStatus::Cached),
                report.count(BuildStatus::Error)
            ))
            .add_attribute(Attribute::Bold),
            Cell::new(format!(
                "{} resolved, {} unresolved",
                report.resolved_references, report.unresolved_references
            )),
        ])
        .build()
}

pub fn create_symbol_table(records: &[IndexRecord]) -> String {
    let mut table = TableBuilder::new().set_headers(vec!["Name", "Kind", "Definition", "Container", "Refs"]);
    for record in records {
        table = table.add_row(vec![
            record.name.to_string(),
            record.kind.to_string(),
            record.definition.to_string(),
            record.container.as_deref().unwrap_or("-").to_string(),
            record.references.len().to_string(),
        ]);
    }
    table.build()
}

pub fn create_completion_table(items: &[CompletionItem]) -> String {
    let mut table = TableBuilder::new().set_headers(vec!["Label", "Detail", "Tier"]);
    for item in items {
        table = table.add_row(vec![
            item.label.to_string(),
            item.detail.clone(),
            item.tier.to_string(),
        ]);
    }
    table.build()
}

pub fn create_cache_table(cache: &CacheStats, index: &IndexStats) -> String {
    TableBuilder::new()
        .set_headers(vec!["Metric", "Value"])
        .add_row(vec!["Cache entries".into(), cache.entries.to_string()])
        .add_row(vec!["Cache size".into(), format!("{} bytes", cache.total_bytes)])
        .add_row(vec!["Cache hits (session)".into(), cache.hits.to_string()])
        .add_row(vec!["Rebuilds (session)".into(), cache.rebuilds.to_string()])
        .add_row(vec!["Errors (session)".into(), cache.errors.to_string()])
        .add_row(vec!["Corrupt entries (session)".into(), cache.corruptions.to_string()])
        .add_row(vec!["Indexed files".into(), index.files.to_string()])
        .add_row(vec!["Indexed symbols".into(), index.symbols.to_string()])
        .add_row(vec![
            "References (unresolved)".into(),
            format!("{} ({})", index.references, index.unresolved),
        ])
        .build()
}
