//! Batch construction: every panel of every page, resolved and composed, in
//! render order.
//!
//! A batch is a single list of [`BatchEntry`] values. Each entry pairs the
//! final prompt sent to the generation service with the panel it renders,
//! so the prompt file and the result mapping are two projections of the same
//! vector and cannot drift apart. Output item `i` of a job belongs to
//! `targets()[i]`.
//!
//! ## Artifacts
//!
//! ```text
//! <project>/
//! ├── prompts_batch.txt          # One prompt per line, submission order
//! └── .comic-factory/
//!     └── batch.json             # Job id, model, digest, and panel targets
//! ```
//!
//! The record lets `collect` pick up a job submitted with `--no-wait` using
//! exactly the mapping that was in force at submission time, even if
//! manifests changed since.

use crate::catalog::{self, CatalogError, PageEntry};
use crate::config::StyleConfig;
use crate::generation::JobId;
use crate::manifest::{Manifest, ManifestError};
use crate::tags::TagResolver;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Prompt file written at the project root before submission.
pub const PROMPT_FILE: &str = "prompts_batch.txt";

/// Directory holding pipeline state between commands.
pub const STATE_DIR: &str = ".comic-factory";

/// Batch record file inside [`STATE_DIR`].
pub const RECORD_FILE: &str = "batch.json";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Page {page}: {source}")]
    Manifest {
        page: String,
        #[source]
        source: ManifestError,
    },
    #[error("Page {0} has no manifest")]
    NoManifest(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Batch record error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BatchError {
    fn manifest(page: &PageEntry, source: ManifestError) -> Self {
        BatchError::Manifest {
            page: page.name.clone(),
            source,
        }
    }
}

/// The panel a generated image belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelTarget {
    pub page: String,
    pub panel: u32,
    /// Page directory; renders land in `<dir>/renders/`.
    pub dir: PathBuf,
}

impl PanelTarget {
    pub fn render_path(&self) -> PathBuf {
        self.dir
            .join("renders")
            .join(format!("panel_{}.png", self.panel))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub prompt: String,
    pub target: PanelTarget,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn prompts(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.prompt.as_str()).collect()
    }

    pub fn targets(&self) -> Vec<PanelTarget> {
        self.entries.iter().map(|e| e.target.clone()).collect()
    }

    /// Prompt file body: one prompt per line.
    pub fn prompt_file_contents(&self) -> String {
        let mut out = self.prompts().join("\n");
        out.push('\n');
        out
    }

    pub fn write_prompt_file(&self, path: &Path) -> Result<(), BatchError> {
        fs::write(path, self.prompt_file_contents())?;
        Ok(())
    }

    /// SHA-256 of the prompt file body, hex encoded.
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.prompt_file_contents().as_bytes());
        format!("{:x}", hash)
    }
}

/// Build the batch for every page in `pages`, in the given order.
///
/// Pages without a manifest are skipped. A missing panel or prompt on any
/// page aborts the whole build; no partial batch is returned.
pub fn build(
    pages: &[PageEntry],
    resolver: &TagResolver,
    style: &StyleConfig,
) -> Result<Batch, BatchError> {
    let mut entries = Vec::new();
    for page in pages {
        let loaded = Manifest::load(&page.dir).map_err(|e| BatchError::manifest(page, e))?;
        let Some(manifest) = loaded else {
            debug!(page = %page.name, "no manifest, skipping page");
            continue;
        };

        let count = manifest.panel_count() as u32;
        for panel in 1..=count {
            let prompt = panel_prompt(&manifest, page, panel, resolver, style)?;
            entries.push(BatchEntry {
                prompt,
                target: PanelTarget {
                    page: page.name.clone(),
                    panel,
                    dir: page.dir.clone(),
                },
            });
        }
        debug!(page = %page.name, panels = count, "added page to batch");
    }
    Ok(Batch { entries })
}

/// Final prompt for a single panel, as it would appear in the batch.
pub fn resolve_panel(
    pages: &[PageEntry],
    page_name: &str,
    panel: u32,
    resolver: &TagResolver,
    style: &StyleConfig,
) -> Result<String, BatchError> {
    let page = catalog::find(pages, page_name)?;
    let manifest = Manifest::load(&page.dir)
        .map_err(|e| BatchError::manifest(page, e))?
        .ok_or_else(|| BatchError::NoManifest(page.name.clone()))?;
    panel_prompt(&manifest, page, panel, resolver, style)
}

fn panel_prompt(
    manifest: &Manifest,
    page: &PageEntry,
    panel: u32,
    resolver: &TagResolver,
    style: &StyleConfig,
) -> Result<String, BatchError> {
    let raw = manifest
        .prompt(panel)
        .map_err(|e| BatchError::manifest(page, e))?;
    let composed = style.compose(&resolver.resolve(raw));
    // Each prompt occupies exactly one line of the prompt file
    Ok(composed.replace(['\r', '\n'], " "))
}

/// What was submitted, persisted between `render` and `collect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub job: JobId,
    pub model: String,
    pub digest: String,
    pub targets: Vec<PanelTarget>,
}

impl BatchRecord {
    pub fn path(project_root: &Path) -> PathBuf {
        project_root.join(STATE_DIR).join(RECORD_FILE)
    }

    pub fn save(&self, project_root: &Path) -> Result<(), BatchError> {
        let path = Self::path(project_root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The last record, or `None` if nothing was ever submitted.
    pub fn load(project_root: &Path) -> Result<Option<BatchRecord>, BatchError> {
        let path = Self::path(project_root);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}
