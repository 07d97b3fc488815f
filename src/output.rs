//! CLI output formatting for all pipeline stages.
//!
//! # Page-First Display
//!
//! Output is organised around pages and panels, the units an author thinks
//! in. Every page line starts with its positional index in render order;
//! filesystem paths follow as indented `Source:` or `→` context. Panels are
//! always named as `<page> panel <n>` so a line in the render summary can be
//! matched to a line in the compose summary at a glance.
//!
//! # Output Format
//!
//! ## Pages
//!
//! ```text
//! Pages
//! 001 cover (no manifest)
//!     Source: cover/
//! 002 p01 (3 panels)
//!     Source: act1/p01/
//! ```
//!
//! ## Render
//!
//! ```text
//! Batch (3 prompts)
//! 001 p01 panel 1
//! 002 p01 panel 2
//! 003 p02 panel 1
//!
//! Submitted batches/abc123 (nano-banana-pro-preview)
//!
//! Renders
//!     p01 panel 1 → p01/renders/panel_1.png
//!     p01 panel 2 → p01/renders/panel_2.png
//! Missing
//!     p02 panel 1
//! Wrote 2 of 3 panels
//! ```
//!
//! ## Compose
//!
//! ```text
//! 001 p01 → p01/composition.html (2 panels, 3 overlays)
//!     Lettering omitted: panel 2
//! Skipped
//!     cover (no manifest)
//! Composed 1 page
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure
//! and do no I/O.

use crate::batch::{Batch, PanelTarget};
use crate::catalog::PageEntry;
use crate::compose::ComposeReport;
use crate::distribute::DistributionReport;
use crate::generation::JobId;
use crate::init::InitReport;
use crate::package::PackageReport;
use crate::rasterize::RasterizeReport;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn panel_label(target: &PanelTarget) -> String {
    format!("{} panel {}", target.page, target.panel)
}

/// Path relative to `root` when possible, for shorter lines.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Pages
// ============================================================================

/// Catalog listing; `panels` is `None` for pages without a manifest.
pub fn format_pages(pages: &[(PageEntry, Option<usize>)], pages_root: &Path) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    if pages.is_empty() {
        lines.push(format!("{}(none found)", indent(1)));
        return lines;
    }
    for (i, (page, panels)) in pages.iter().enumerate() {
        let detail = match panels {
            Some(n) => plural(*n, "panel"),
            None => "no manifest".to_string(),
        };
        lines.push(format!("{} {} ({})", format_index(i + 1), page.name, detail));
        lines.push(format!(
            "{}Source: {}/",
            indent(1),
            display_path(&page.dir, pages_root)
        ));
    }
    lines
}

pub fn print_pages(pages: &[(PageEntry, Option<usize>)], pages_root: &Path) {
    for line in format_pages(pages, pages_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Render
// ============================================================================

pub fn format_batch(batch: &Batch) -> Vec<String> {
    let mut lines = vec![format!("Batch ({})", plural(batch.len(), "prompt"))];
    for (i, entry) in batch.entries.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), panel_label(&entry.target)));
    }
    lines
}

pub fn print_batch(batch: &Batch) {
    for line in format_batch(batch) {
        println!("{}", line);
    }
}

pub fn format_submission(job: &JobId, model: &str, waiting: bool) -> Vec<String> {
    let mut lines = vec![format!("Submitted {} ({})", job, model)];
    if !waiting {
        lines.push(format!(
            "{}Not waiting; run `comic-factory collect` to fetch results",
            indent(1)
        ));
    }
    lines
}

pub fn print_submission(job: &JobId, model: &str, waiting: bool) {
    for line in format_submission(job, model, waiting) {
        println!("{}", line);
    }
}

pub fn format_distribution(report: &DistributionReport, pages_root: &Path) -> Vec<String> {
    let mut lines = vec!["Renders".to_string()];
    for (target, path) in &report.written {
        lines.push(format!(
            "{}{} → {}",
            indent(1),
            panel_label(target),
            display_path(path, pages_root)
        ));
    }
    if !report.missing.is_empty() {
        lines.push("Missing".to_string());
        for target in &report.missing {
            lines.push(format!("{}{}", indent(1), panel_label(target)));
        }
    }
    let total = report.written.len() + report.missing.len();
    lines.push(format!(
        "Wrote {} of {}",
        report.written.len(),
        plural(total, "panel")
    ));
    lines
}

pub fn print_distribution(report: &DistributionReport, pages_root: &Path) {
    for line in format_distribution(report, pages_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Compose / rasterize / package
// ============================================================================

pub fn format_compose(report: &ComposeReport, pages_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, page) in report.composed.iter().enumerate() {
        lines.push(format!(
            "{} {} → {} ({}, {})",
            format_index(i + 1),
            page.page,
            display_path(&page.path, pages_root),
            plural(page.panels, "panel"),
            plural(page.overlays, "overlay")
        ));
        for warning in report
            .lettering_warnings
            .iter()
            .filter(|w| w.page == page.page)
        {
            lines.push(format!(
                "{}Lettering omitted: panel {}",
                indent(1),
                warning.panel
            ));
        }
    }
    if !report.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for (page, reason) in &report.skipped {
            lines.push(format!("{}{} ({})", indent(1), page, reason));
        }
    }
    if !report.failed.is_empty() {
        lines.push("Failed".to_string());
        for e in &report.failed {
            lines.push(format!("{}{}", indent(1), e));
        }
    }
    lines.push(format!("Composed {}", plural(report.composed.len(), "page")));
    lines
}

pub fn print_compose(report: &ComposeReport, pages_root: &Path) {
    for line in format_compose(report, pages_root) {
        println!("{}", line);
    }
}

pub fn format_rasterize(report: &RasterizeReport, output_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for path in &report.written {
        lines.push(format!("{}{}", indent(1), display_path(path, output_dir)));
    }
    for (page, e) in &report.failed {
        lines.push(format!("{}{} failed: {}", indent(1), page, e));
    }
    lines.push(format!(
        "Rasterized {} into {}",
        plural(report.written.len(), "page"),
        output_dir.display()
    ));
    lines
}

pub fn print_rasterize(report: &RasterizeReport, output_dir: &Path) {
    for line in format_rasterize(report, output_dir) {
        println!("{}", line);
    }
}

pub fn format_package(report: &PackageReport) -> Vec<String> {
    let mut lines = vec![format!("{}", report.archive.display())];
    for (i, page) in report.pages.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), page));
    }
    lines.push(format!("Packaged {}", plural(report.pages.len(), "page")));
    lines
}

pub fn print_package(report: &PackageReport) {
    for line in format_package(report) {
        println!("{}", line);
    }
}

pub fn format_init(report: &InitReport) -> Vec<String> {
    let mut lines = Vec::new();
    for path in &report.created {
        lines.push(format!("{}created {}", indent(1), path.display()));
    }
    for path in &report.kept {
        lines.push(format!("{}kept {}", indent(1), path.display()));
    }
    lines.push("Project ready. Edit comic.toml, then run `comic-factory render`.".to_string());
    lines
}

pub fn print_init(report: &InitReport) {
    for line in format_init(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchEntry;
    use crate::compose::{ComposedPage, LetteringWarning};
    use crate::naming::PageKind;
    use std::path::PathBuf;

    fn target(page: &str, panel: u32) -> PanelTarget {
        PanelTarget {
            page: page.into(),
            panel,
            dir: PathBuf::from("/proj/pages").join(page),
        }
    }

    #[test]
    fn pages_listing_shows_index_counts_and_source() {
        let root = Path::new("/proj/pages");
        let pages = vec![
            (
                PageEntry {
                    name: "cover".into(),
                    kind: PageKind::Cover,
                    dir: root.join("cover"),
                },
                None,
            ),
            (
                PageEntry {
                    name: "p01".into(),
                    kind: PageKind::Numbered(1),
                    dir: root.join("act1/p01"),
                },
                Some(1),
            ),
        ];
        assert_eq!(
            format_pages(&pages, root),
            vec![
                "Pages",
                "001 cover (no manifest)",
                "    Source: cover/",
                "002 p01 (1 panel)",
                "    Source: act1/p01/",
            ]
        );
    }

    #[test]
    fn empty_catalog_says_so() {
        assert_eq!(
            format_pages(&[], Path::new("/x")),
            vec!["Pages", "    (none found)"]
        );
    }

    #[test]
    fn batch_lines_follow_entry_order() {
        let batch = Batch {
            entries: vec![
                BatchEntry {
                    prompt: "a".into(),
                    target: target("p01", 1),
                },
                BatchEntry {
                    prompt: "b".into(),
                    target: target("p02", 1),
                },
            ],
        };
        assert_eq!(
            format_batch(&batch),
            vec!["Batch (2 prompts)", "001 p01 panel 1", "002 p02 panel 1"]
        );
    }

    #[test]
    fn submission_without_wait_points_to_collect() {
        let lines = format_submission(&JobId("batches/1".into()), "m", false);
        assert_eq!(lines[0], "Submitted batches/1 (m)");
        assert!(lines[1].contains("collect"));
        assert_eq!(format_submission(&JobId("j".into()), "m", true).len(), 1);
    }

    #[test]
    fn distribution_lists_written_and_missing() {
        let root = Path::new("/proj/pages");
        let report = DistributionReport {
            written: vec![(target("p01", 1), root.join("p01/renders/panel_1.png"))],
            missing: vec![target("p01", 2)],
            skipped_items: 0,
            extra_items: 0,
        };
        assert_eq!(
            format_distribution(&report, root),
            vec![
                "Renders",
                "    p01 panel 1 → p01/renders/panel_1.png",
                "Missing",
                "    p01 panel 2",
                "Wrote 1 of 2 panels",
            ]
        );
    }

    #[test]
    fn compose_summary_mentions_omitted_lettering() {
        let root = Path::new("/proj/pages");
        let report = ComposeReport {
            composed: vec![ComposedPage {
                page: "p01".into(),
                path: root.join("p01/composition.html"),
                panels: 2,
                overlays: 1,
            }],
            skipped: vec![("cover".into(), "no manifest".into())],
            lettering_warnings: vec![LetteringWarning {
                page: "p01".into(),
                panel: 2,
                message: "bad".into(),
            }],
            failed: Vec::new(),
        };
        assert_eq!(
            format_compose(&report, root),
            vec![
                "001 p01 → p01/composition.html (2 panels, 1 overlay)",
                "    Lettering omitted: panel 2",
                "Skipped",
                "    cover (no manifest)",
                "Composed 1 page",
            ]
        );
    }

    #[test]
    fn package_summary() {
        let report = PackageReport {
            archive: PathBuf::from("/out/night-01.cbz"),
            pages: vec!["001-cover.png".into()],
        };
        assert_eq!(
            format_package(&report),
            vec!["/out/night-01.cbz", "    001 001-cover.png", "Packaged 1 page"]
        );
    }
}
