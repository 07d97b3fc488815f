//! Page manifest parsing.
//!
//! A manifest is a markdown document (`<page>/manifest.md`) declaring the
//! page's grid, its panels, and one generation prompt per panel. It is parsed
//! once into a [`Manifest`] tree with pulldown-cmark; every later question
//! (how many panels, what is panel 3's prompt, what is the layout) is a
//! lookup on that tree, never another pass over the text.
//!
//! ## Format
//!
//! ```markdown
//! # Page 1: The Rooftop
//!
//! Grid: `1fr 2fr / 1fr 1fr`
//!
//! ### Panel 1
//! - Area: `1 / 1 / 2 / 3`
//! - Lettering: `[{kind: "caption", text: "Midnight.", position: {top: "4%", left: "4%"}}]`
//! - Prompt: `[character:hero] crouches on a rooftop, [location:city] below`
//!
//! ### Panel 2: close-up
//! **Prompt:** `Close-up of [character:hero]'s eyes`
//! ```
//!
//! A *field* is a line whose label text is followed by an inline code span,
//! either on the same line or alone on the next one.
//! Decoration around the label (bold, list bullets, trailing notes like
//! `Prompt (final):`) is ignored; a label matches a key when any of its words
//! equals the key, case-insensitively. A label followed by a fenced code block
//! on the next lines takes the block as its value.
//!
//! A panel section starts at any heading reading `Panel <n>` and runs until
//! the next panel heading or the end of the document. Fields before the first
//! panel heading belong to the page.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Panel {0} not found")]
    PanelNotFound(u32),
    #[error("No prompt for panel {0}")]
    PromptMissing(u32),
}

/// A `label: value` pair extracted from the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: String,
    pub value: String,
}

impl Field {
    /// Whether any word of the label equals `key`, ignoring case.
    pub fn is(&self, key: &str) -> bool {
        self.label
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word.eq_ignore_ascii_case(key))
    }
}

/// One `Panel <n>` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSection {
    pub number: u32,
    /// Full heading text, e.g. `Panel 2: close-up`.
    pub heading: String,
    pub fields: Vec<Field>,
}

impl PanelSection {
    pub fn field(&self, key: &str) -> Option<&str> {
        find_field(&self.fields, key)
    }
}

/// Parsed page manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// First level-1 heading before any panel, if present.
    pub title: Option<String>,
    /// Page-level fields (before the first panel heading).
    pub fields: Vec<Field>,
    /// Panel sections in document order.
    pub panels: Vec<PanelSection>,
}

/// Row/column grid specification, CSS `grid-template` shorthand.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub rows: String,
    pub columns: String,
}

impl GridSpec {
    /// Parse `"<rows> / <columns>"`. Both halves must be non-empty.
    pub fn parse(spec: &str) -> Option<GridSpec> {
        let (rows, columns) = spec.split_once('/')?;
        let (rows, columns) = (rows.trim(), columns.trim());
        if rows.is_empty() || columns.is_empty() {
            return None;
        }
        Some(GridSpec {
            rows: rows.to_string(),
            columns: columns.to_string(),
        })
    }

    /// Value for the CSS `grid-template` property.
    pub fn template(&self) -> String {
        format!("{} / {}", self.rows, self.columns)
    }
}

/// Layout of one panel: its grid cell and raw lettering literal.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelLayout {
    pub number: u32,
    pub area: Option<String>,
    pub lettering: Option<String>,
}

/// Everything the composer needs from a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub grid: GridSpec,
    pub panels: Vec<PanelLayout>,
}

impl Manifest {
    /// Load `manifest.md` from a page directory. `Ok(None)` if there is none.
    pub fn load(page_dir: &Path) -> Result<Option<Manifest>, ManifestError> {
        let path = page_dir.join(crate::catalog::MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(Manifest::parse(&content)))
    }

    /// Parse manifest text. Never fails: unrecognised content is ignored.
    pub fn parse(text: &str) -> Manifest {
        let mut builder = TreeBuilder::default();
        for event in Parser::new(text) {
            builder.event(event);
        }
        builder.finish()
    }

    /// Number of panel sections (panel headings) in the document.
    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Section for panel `number`, matched exactly.
    pub fn panel(&self, number: u32) -> Result<&PanelSection, ManifestError> {
        self.panels
            .iter()
            .find(|p| p.number == number)
            .ok_or(ManifestError::PanelNotFound(number))
    }

    /// Raw prompt of panel `number`, tag references unresolved.
    pub fn prompt(&self, number: u32) -> Result<&str, ManifestError> {
        self.panel(number)?
            .field("prompt")
            .ok_or(ManifestError::PromptMissing(number))
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        find_field(&self.fields, key)
    }

    /// Grid spec from a `Grid` field, or from separate `Rows`/`Columns` fields.
    pub fn grid(&self) -> Option<GridSpec> {
        if let Some(spec) = self.field("grid") {
            return GridSpec::parse(spec);
        }
        let rows = self.field("rows")?.trim();
        let columns = self.field("columns")?.trim();
        if rows.is_empty() || columns.is_empty() {
            return None;
        }
        Some(GridSpec {
            rows: rows.to_string(),
            columns: columns.to_string(),
        })
    }

    /// Page layout, or `None` when the page has no recognisable grid.
    ///
    /// Independent of prompts: a laid-out page with no prompt fields still
    /// yields a layout.
    pub fn layout(&self) -> Option<PageLayout> {
        let grid = self.grid()?;
        let panels = self
            .panels
            .iter()
            .map(|p| PanelLayout {
                number: p.number,
                area: p.field("area").map(str::to_string),
                lettering: p.field("lettering").map(str::to_string),
            })
            .collect();
        Some(PageLayout { grid, panels })
    }
}

fn find_field<'a>(fields: &'a [Field], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|f| f.is(key))
        .map(|f| f.value.as_str())
}

/// Panel number from heading text like `Panel 12` or `panel 3: Rooftop`.
fn panel_number(heading: &str) -> Option<u32> {
    let trimmed = heading.trim();
    let head = trimmed.get(..5)?;
    if !head.eq_ignore_ascii_case("panel") {
        return None;
    }
    let digits: String = trimmed[5..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Single-line form of a value: line breaks become spaces.
fn fold_lines(value: &str) -> String {
    value
        .trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Event-driven builder for [`Manifest`].
#[derive(Default)]
struct TreeBuilder {
    manifest: Manifest,
    heading: Option<(HeadingLevel, String)>,
    label: String,
    value: Option<String>,
    /// Label with no inline value, waiting for a fenced code block.
    dangling: Option<String>,
    code_block: Option<String>,
}

impl TreeBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush();
                self.dangling = None;
                self.heading = Some((level, String::new()));
            }
            Event::End(TagEnd::Heading(_)) => self.end_heading(),
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.code_block = Some(String::new());
            }
            Event::End(TagEnd::CodeBlock) => {
                let block = self.code_block.take().unwrap_or_default();
                if let Some(label) = self.dangling.take() {
                    self.push_field(label, fold_lines(&block));
                }
            }
            Event::Start(Tag::Paragraph | Tag::Item)
            | Event::End(TagEnd::Paragraph | TagEnd::Item)
            | Event::SoftBreak
            | Event::HardBreak => self.flush(),
            Event::Text(text) => {
                if let Some((_, heading)) = &mut self.heading {
                    heading.push_str(&text);
                } else if let Some(block) = &mut self.code_block {
                    block.push_str(&text);
                } else if self.value.is_none() {
                    self.label.push_str(&text);
                }
            }
            Event::Code(code) => {
                if let Some((_, heading)) = &mut self.heading {
                    heading.push_str(&code);
                } else if self.value.is_none() {
                    self.value = Some(fold_lines(&code));
                }
            }
            _ => {}
        }
    }

    fn end_heading(&mut self) {
        let Some((level, text)) = self.heading.take() else {
            return;
        };
        let text = text.trim().to_string();
        if let Some(number) = panel_number(&text) {
            self.manifest.panels.push(PanelSection {
                number,
                heading: text,
                fields: Vec::new(),
            });
        } else if level == HeadingLevel::H1
            && self.manifest.title.is_none()
            && self.manifest.panels.is_empty()
        {
            self.manifest.title = Some(text);
        }
    }

    /// Close the current line: store it as a field if it had a value.
    fn flush(&mut self) {
        let label = std::mem::take(&mut self.label);
        match self.value.take() {
            Some(value) => {
                // A label on the line above owns a bare code span
                let dangling = self.dangling.take();
                let label = match dangling {
                    Some(above) if label.trim().is_empty() => above,
                    _ => label,
                };
                self.push_field(label, value);
            }
            None => {
                let label = label.trim();
                if !label.is_empty() {
                    self.dangling = Some(label.to_string());
                }
            }
        }
    }

    fn push_field(&mut self, label: String, value: String) {
        let field = Field {
            label: label.trim().trim_end_matches(':').trim().to_string(),
            value,
        };
        match self.manifest.panels.last_mut() {
            Some(panel) => panel.fields.push(field),
            None => self.manifest.fields.push(field),
        }
    }

    fn finish(mut self) -> Manifest {
        self.flush();
        self.manifest
    }
}
