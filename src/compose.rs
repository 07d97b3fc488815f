//! Page composition: HTML documents that lay rendered panels out on a grid
//! and letter them.
//!
//! Each page with a grid spec gets a self-contained `composition.html` next
//! to its manifest. The document is sized to the configured canvas so the
//! rasterizer can screenshot it at exactly that size.
//!
//! ## Generated Structure
//!
//! ```html
//! <div class="page" style="width: 1325px; height: 2050px; grid-template: 1fr 1fr / 1fr 1fr;">
//!   <div class="panel" data-panel="1"
//!        style="grid-area: 1 / 1 / 2 / 3; background-image: url('renders/panel_1.png');">
//!     <div class="caption" style="top: 20px; left: 20px;">Night falls.</div>
//!     <div class="balloon" style="bottom: 12%; right: 30px;">
//!       Who's there?<span class="balloon-tail"></span>
//!     </div>
//!   </div>
//! </div>
//! ```
//!
//! Problems are isolated as narrowly as possible. Bad lettering drops the
//! overlays of that one panel; an unreadable manifest or a failed write
//! drops that one page. Neither stops the rest of the pass.

use crate::catalog::PageEntry;
use crate::config::PageConfig;
use crate::lettering::{self, LetteringItem, LetteringKind};
use crate::manifest::{Manifest, ManifestError, PageLayout};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// File written into each page directory.
pub const COMPOSITION_FILE: &str = "composition.html";

const CSS: &str = include_str!("../static/comic.css");

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Page {page}: {source}")]
    Manifest {
        page: String,
        #[source]
        source: ManifestError,
    },
    #[error("Page {page}: failed to write composition: {source}")]
    Io {
        page: String,
        #[source]
        source: std::io::Error,
    },
}

/// Lettering dropped from one panel.
#[derive(Debug, Clone, PartialEq)]
pub struct LetteringWarning {
    pub page: String,
    pub panel: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    pub page: String,
    pub path: PathBuf,
    pub panels: usize,
    pub overlays: usize,
}

#[derive(Debug, Default)]
pub struct ComposeReport {
    pub composed: Vec<ComposedPage>,
    /// Pages not laid out yet, with the reason.
    pub skipped: Vec<(String, String)>,
    pub lettering_warnings: Vec<LetteringWarning>,
    pub failed: Vec<ComposeError>,
}

/// A panel ready to render: layout plus parsed lettering.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPanel {
    pub number: u32,
    pub area: Option<String>,
    pub lettering: Vec<LetteringItem>,
}

/// Outcome for one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Composed(ComposedPage),
    /// Not laid out yet.
    Skipped(&'static str),
}

/// Compose every page, in catalog order.
pub fn compose_project(pages: &[PageEntry], canvas: &PageConfig) -> ComposeReport {
    let mut report = ComposeReport::default();
    for page in pages {
        match compose_page(page, canvas, &mut report.lettering_warnings) {
            Ok(PageOutcome::Composed(composed)) => {
                info!(page = %page.name, panels = composed.panels, "composed page");
                report.composed.push(composed);
            }
            Ok(PageOutcome::Skipped(reason)) => {
                info!(page = %page.name, "skipping page: {reason}");
                report.skipped.push((page.name.clone(), reason.to_string()));
            }
            Err(e) => {
                warn!("{e}");
                report.failed.push(e);
            }
        }
    }
    report
}

/// Compose one page into `<page>/composition.html`.
pub fn compose_page(
    page: &PageEntry,
    canvas: &PageConfig,
    warnings: &mut Vec<LetteringWarning>,
) -> Result<PageOutcome, ComposeError> {
    let manifest = Manifest::load(&page.dir).map_err(|source| ComposeError::Manifest {
        page: page.name.clone(),
        source,
    })?;
    let Some(manifest) = manifest else {
        return Ok(PageOutcome::Skipped("no manifest"));
    };
    let Some(layout) = manifest.layout() else {
        return Ok(PageOutcome::Skipped("no grid spec"));
    };

    let panels = letter_panels(&page.name, &layout, warnings);
    let title = manifest.title.as_deref().unwrap_or(&page.name);
    let markup = render_page(title, &layout, &panels, canvas);

    let path = page.dir.join(COMPOSITION_FILE);
    fs::write(&path, markup.into_string()).map_err(|source| ComposeError::Io {
        page: page.name.clone(),
        source,
    })?;

    Ok(PageOutcome::Composed(ComposedPage {
        page: page.name.clone(),
        path,
        panels: panels.len(),
        overlays: panels.iter().map(|p| p.lettering.len()).sum(),
    }))
}

/// Parse each panel's lettering; a panel whose literal fails keeps no overlays.
pub fn letter_panels(
    page: &str,
    layout: &PageLayout,
    warnings: &mut Vec<LetteringWarning>,
) -> Vec<ComposedPanel> {
    layout
        .panels
        .iter()
        .map(|panel| {
            let raw = panel.lettering.as_deref().unwrap_or("");
            let lettering = lettering::parse(raw).unwrap_or_else(|e| {
                warn!(
                    page,
                    panel = panel.number,
                    "Lettering omitted for page {} panel {}: {}",
                    page,
                    panel.number,
                    e
                );
                warnings.push(LetteringWarning {
                    page: page.to_string(),
                    panel: panel.number,
                    message: e.to_string(),
                });
                Vec::new()
            });
            ComposedPanel {
                number: panel.number,
                area: panel.area.clone(),
                lettering,
            }
        })
        .collect()
}

/// Render the composition document.
pub fn render_page(
    title: &str,
    layout: &PageLayout,
    panels: &[ComposedPanel],
    canvas: &PageConfig,
) -> Markup {
    let page_style = format!(
        "width: {}px; height: {}px; grid-template: {};",
        canvas.width,
        canvas.height,
        css_value(&layout.grid.template())
    );
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.page style=(page_style) {
                    @for panel in panels {
                        (render_panel(panel))
                    }
                }
            }
        }
    }
}

fn render_panel(panel: &ComposedPanel) -> Markup {
    let mut style = String::new();
    if let Some(area) = &panel.area {
        style.push_str(&format!("grid-area: {}; ", css_value(area)));
    }
    style.push_str(&format!(
        "background-image: url('renders/panel_{}.png');",
        panel.number
    ));
    html! {
        div.panel data-panel=(panel.number) style=(style) {
            @for item in &panel.lettering {
                (render_lettering(item))
            }
        }
    }
}

fn render_lettering(item: &LetteringItem) -> Markup {
    let style = item.position.to_css();
    html! {
        @match item.kind {
            LetteringKind::Caption => {
                div.caption style=(style) { (item.text) }
            }
            LetteringKind::Speech => {
                div.balloon style=(style) {
                    (item.text)
                    span.balloon-tail {}
                }
            }
        }
    }
}

/// Manifest text used inside a single CSS declaration.
fn css_value(raw: &str) -> String {
    raw.trim().replace([';', '{', '}'], "")
}
