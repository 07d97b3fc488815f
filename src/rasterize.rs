//! Rasterization: screenshot each composed page to a PNG.
//!
//! Composition documents are loaded from disk into headless Chrome and
//! captured at the configured canvas size. Outputs are numbered in catalog
//! order so a plain file-name sort reproduces the reading order:
//!
//! ```text
//! renders/issue_01/
//! ├── 001-cover.png
//! ├── 002-p01.png
//! └── 003-p02.png
//! ```
//!
//! Every run starts by deleting the `NNN-*.png` images of the previous run,
//! so the output directory only ever holds the current numbering.
//!
//! Pages without a `composition.html` are skipped. A page that fails to
//! render is reported and the rest carry on; only failing to start the
//! browser stops the pass.

use crate::catalog::PageEntry;
use crate::compose::COMPOSITION_FILE;
use crate::config::PageConfig;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum RasterizeError {
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Something that turns an HTML file into a PNG of a given size.
pub trait Rasterizer {
    fn rasterize(
        &self,
        html: &Path,
        output: &Path,
        canvas: &PageConfig,
    ) -> Result<(), RasterizeError>;
}

pub struct ChromeRasterizer {
    browser: Browser,
}

impl ChromeRasterizer {
    pub fn launch(canvas: &PageConfig) -> Result<Self, RasterizeError> {
        let browser = Browser::new(LaunchOptions {
            window_size: Some((canvas.width, canvas.height)),
            ..Default::default()
        })
        .map_err(browser_error)?;
        Ok(Self { browser })
    }
}

fn browser_error(e: impl std::fmt::Display) -> RasterizeError {
    RasterizeError::Browser(e.to_string())
}

impl Rasterizer for ChromeRasterizer {
    fn rasterize(
        &self,
        html: &Path,
        output: &Path,
        canvas: &PageConfig,
    ) -> Result<(), RasterizeError> {
        let html = html.canonicalize().map_err(|source| RasterizeError::Io {
            path: html.to_path_buf(),
            source,
        })?;
        let url = file_url(&html)?;
        let tab = self.browser.new_tab().map_err(browser_error)?;

        let png = close_after(
            || {
                tab.navigate_to(url.as_str())
                    .map_err(browser_error)?
                    .wait_until_navigated()
                    .map_err(browser_error)?;
                let clip = Page::Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: f64::from(canvas.width),
                    height: f64::from(canvas.height),
                    scale: 1.0,
                };
                tab.capture_screenshot(
                    Page::CaptureScreenshotFormatOption::Png,
                    None,
                    Some(clip),
                    true,
                )
                .map_err(browser_error)
            },
            || tab.close(true).map(|_| ()).map_err(|e| e.to_string()),
        )?;

        fs::write(output, png).map_err(|source| RasterizeError::Io {
            path: output.to_path_buf(),
            source,
        })
    }
}

/// Percent-encoded `file://` URL for an absolute path.
pub fn file_url(path: &Path) -> Result<Url, RasterizeError> {
    Url::from_file_path(path)
        .map_err(|()| RasterizeError::Browser(format!("not an absolute path: {}", path.display())))
}

/// Run `work`, then `close` whatever its outcome. A failed close is logged.
fn close_after<T>(
    work: impl FnOnce() -> Result<T, RasterizeError>,
    close: impl FnOnce() -> Result<(), String>,
) -> Result<T, RasterizeError> {
    let result = work();
    if let Err(e) = close() {
        warn!("failed to close browser tab: {e}");
    }
    result
}

/// Whether `name` looks like a rasterized page, `<NNN>-<page>.png`.
fn is_page_output(name: &str) -> bool {
    let bytes = name.as_bytes();
    name.len() > 8
        && bytes[..3].iter().all(u8::is_ascii_digit)
        && bytes[3] == b'-'
        && name.ends_with(".png")
}

/// Delete page images left by an earlier run; numbering shifts whenever
/// pages are added, removed, or reordered.
fn clear_previous_outputs(output_dir: &Path) -> Result<(), RasterizeError> {
    let io_error = |source| RasterizeError::Io {
        path: output_dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(output_dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_stale = path.is_file()
            && path
                .file_name()
                .is_some_and(|n| is_page_output(&n.to_string_lossy()));
        if is_stale {
            fs::remove_file(&path).map_err(|source| RasterizeError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "removed previous page image");
        }
    }
    Ok(())
}

/// `<NNN>-<page>.png`, numbered from 1.
pub fn output_name(sequence: usize, page: &str) -> String {
    format!("{:03}-{}.png", sequence, page)
}

#[derive(Debug, Default)]
pub struct RasterizeReport {
    pub written: Vec<PathBuf>,
    /// Pages with no composition document.
    pub skipped: Vec<String>,
    pub failed: Vec<(String, RasterizeError)>,
}

/// Rasterize every composed page into `output_dir`.
pub fn rasterize_project(
    pages: &[PageEntry],
    output_dir: &Path,
    rasterizer: &impl Rasterizer,
    canvas: &PageConfig,
) -> Result<RasterizeReport, RasterizeError> {
    fs::create_dir_all(output_dir).map_err(|source| RasterizeError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    clear_previous_outputs(output_dir)?;

    let mut report = RasterizeReport::default();
    let mut sequence = 0;
    for page in pages {
        let html = page.dir.join(COMPOSITION_FILE);
        if !html.is_file() {
            info!(page = %page.name, "no composition, skipping");
            report.skipped.push(page.name.clone());
            continue;
        }
        sequence += 1;
        let output = output_dir.join(output_name(sequence, &page.name));
        match rasterizer.rasterize(&html, &output, canvas) {
            Ok(()) => {
                info!(page = %page.name, output = %output.display(), "rasterized page");
                report.written.push(output);
            }
            Err(e) => {
                warn!(page = %page.name, "rasterization failed: {e}");
                report.failed.push((page.name.clone(), e));
            }
        }
    }
    Ok(report)
}
