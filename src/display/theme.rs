//! Colors for terminal output.

use crate::completion::Freshness;
use crate::indexing::BuildStatus;
use crate::types::Severity;
use console::Style;
use owo_colors::OwoColorize;
use std::sync::LazyLock;

pub static THEME: LazyLock<Theme> = LazyLock::new(Theme::default);

#[derive(Debug, Clone)]
pub struct Theme {
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub header: Style,
    pub dim: Style,
    pub path: Style,
    pub number: Style,
    /// Symbol names
    pub code: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Style::new().green().bright(),
            error: Style::new().red().bright(),
            warning: Style::new().yellow().bright(),
            header: Style::new().cyan().bold(),
            dim: Style::new().dim(),
            path: Style::new().magenta(),
            number: Style::new().cyan(),
            code: Style::new().yellow(),
        }
    }
}

impl Theme {
    pub fn success_with_icon(&self, text: &str) -> String {
        if Self::should_disable_colors() {
            format!("✓ {text}")
        } else {
            format!("{} {}", "✓".green(), self.success.apply_to(text))
        }
    }

    pub fn error_with_icon(&self, text: &str) -> String {
        if Self::should_disable_colors() {
            format!("✗ {text}")
        } else {
            format!("{} {}", "✗".red(), self.error.apply_to(text))
        }
    }

    pub fn warning_with_icon(&self, text: &str) -> String {
        if Self::should_disable_colors() {
            format!("⚠ {text}")
        } else {
            format!("{} {}", "⚠".yellow(), self.warning.apply_to(text))
        }
    }

    /// Style for a per-file build status.
    pub fn status(&self, status: BuildStatus) -> &Style {
        match status {
            BuildStatus::Cached => &self.dim,
            BuildStatus::Rebuilt => &self.success,
            BuildStatus::Error => &self.error,
            BuildStatus::Removed => &self.warning,
        }
    }

    pub fn severity(&self, severity: Severity) -> &Style {
        match severity {
            Severity::Error => &self.error,
            Severity::Warning => &self.warning,
            Severity::Note => &self.dim,
        }
    }

    /// One-line notice shown above query output when the index lags the file.
    pub fn freshness_notice(&self, file: &str, freshness: Freshness) -> Option<String> {
        match freshness {
            Freshness::Fresh => None,
            Freshness::Stale => Some(self.warning_with_icon(&format!(
                "{file} changed since it was indexed; run 'tu build {file}' to refresh"
            ))),
        }
    }

    /// Honors `NO_COLOR` and plain (non-terminal) stdout.
    pub fn should_disable_colors() -> bool {
        use is_terminal::IsTerminal;
        std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal()
    }

    pub fn apply<T: std::fmt::Display>(&self, style: &Style, text: T) -> String {
        if Self::should_disable_colors() {
            text.to_string()
        } else {
            style.apply_to(text).to_string()
        }
    }
}
