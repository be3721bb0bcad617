//! Output formatting and progress indicators
//!
//! This module provides the package table, the JSON summary, the progress
//! bar and error display.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::core::package::Package;

/// Output preferences resolved from flags and the global config
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// Only errors are printed
    pub quiet: bool,
    /// Print a JSON summary instead of the table
    pub json: bool,
    /// Verbosity level (`-v` count)
    pub verbose: u8,
    /// Colored output
    pub color: bool,
}

impl OutputConfig {
    /// Create an output configuration
    pub fn new(quiet: bool, json: bool, verbose: u8, color: bool) -> Self {
        Self {
            quiet,
            json,
            verbose,
            color,
        }
    }

    /// Enable or disable colors for stdout and stderr
    pub fn apply_global(&self) {
        if !self.color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
    }

    /// Log level for the tracing subscriber
    pub fn log_level(&self) -> tracing::Level {
        match (self.quiet, self.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, _) => tracing::Level::DEBUG,
        }
    }

    /// Whether package rows are printed
    pub fn shows_table(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Create a progress bar counting processed packages
///
/// The bar draws to stderr and stays hidden when that is not a terminal.
pub fn create_package_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} packages")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Row prefixes
pub mod status {
    /// Wheel selected
    pub const WHEEL: &str = "📦";

    /// Source distribution selected
    pub const SDIST: &str = "🏗";

    /// Package failed
    pub const FATAL: &str = "✘";
}

/// Widths of the name and version columns
pub fn column_widths<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> (usize, usize) {
    entries
        .into_iter()
        .fold((0, 0), |(name, version), (n, v)| {
            (name.max(n.chars().count()), version.max(v.chars().count()))
        })
}

/// Render a package as its table row followed by its indented log lines
///
/// Green for a clean package, yellow when it carries logs, red when it
/// failed.
pub fn format_row(package: &Package, (name_width, version_width): (usize, usize)) -> Vec<String> {
    let (style, icon) = if package.fatal {
        (Style::new().red(), status::FATAL)
    } else if package.logs.is_empty() {
        (Style::new().green().bold(), row_icon(package))
    } else {
        (Style::new().yellow().bold(), row_icon(package))
    };

    let row = format!(
        "{icon} {:<name_width$}  {:<version_width$}  {}",
        package.name,
        package.version,
        package.filename()
    );

    std::iter::once(style.apply_to(row.trim_end()).to_string())
        .chain(
            package
                .logs
                .iter()
                .map(|log| format!("    {}", style.apply_to(log))),
        )
        .collect()
}

fn row_icon(package: &Package) -> &'static str {
    if package.is_wheel() {
        status::WHEEL
    } else {
        status::SDIST
    }
}

/// Machine-readable package result
#[derive(Debug, Serialize)]
pub struct PackageSummary<'a> {
    /// Package name
    pub name: &'a str,
    /// Pinned version
    pub version: &'a str,
    /// Selected file, if any
    pub filename: Option<&'a str>,
    /// `wheel` or `sdist`
    pub kind: Option<&'static str>,
    /// Whether the package failed
    pub fatal: bool,
    /// Notes attached to the package
    pub logs: &'a [String],
}

impl<'a> From<&'a Package> for PackageSummary<'a> {
    fn from(package: &'a Package) -> Self {
        let selected = package.selected().ok();
        Self {
            name: &package.name,
            version: &package.version,
            filename: selected.map(|a| a.filename.as_str()),
            kind: selected.map(|_| if package.is_wheel() { "wheel" } else { "sdist" }),
            fatal: package.fatal,
            logs: &package.logs,
        }
    }
}

/// Serialize package results as a JSON array
pub fn to_json(packages: &[Package]) -> serde_json::Result<String> {
    let summaries: Vec<PackageSummary<'_>> = packages.iter().map(PackageSummary::from).collect();
    serde_json::to_string_pretty(&summaries)
}

/// Print an error to stderr in red
pub fn display_error(error: &anyhow::Error) {
    let style = Style::new().red().for_stderr();
    eprintln!("{}", style.apply_to(format!("{} {error:#}", status::FATAL)));
}
