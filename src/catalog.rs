//! Page discovery and canonical render order.
//!
//! First stage of every pipeline command. Walks the pages root and returns
//! each page directory exactly once, in the order pages are rendered,
//! composed, and packaged.
//!
//! ## Directory Structure
//!
//! ```text
//! pages/
//! ├── cover/              # Always first
//! │   └── manifest.md
//! ├── p01/                # Numbered pages, by number
//! │   ├── manifest.md
//! │   └── renders/        # Written by the distributor
//! ├── act2/               # Grouping directories are searched for numbered pages
//! │   └── p02/
//! ├── bonus1/             # After every numbered page
//! └── bonus2/
//! ```
//!
//! Cover and bonus directories are only recognised directly under the pages
//! root; numbered pages are found at any depth. The walk never descends into
//! a recognised page directory, so `p01/renders` can't be mistaken for
//! anything. Ties in rank (two bonus pages without digits) keep discovery
//! order, which is file-name order.

use crate::naming::{PageKind, parse_page_name};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// File holding a page's manifest inside its directory.
pub const MANIFEST_FILE: &str = "manifest.md";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to walk pages directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Page not found: {0}")]
    PageNotFound(String),
}

/// A discovered page directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    /// Directory name; the page's identity throughout the pipeline.
    pub name: String,
    pub kind: PageKind,
    pub dir: PathBuf,
}

impl PageEntry {
    pub fn rank(&self) -> i64 {
        self.kind.rank()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Directory the distributor writes panel images into.
    pub fn renders_dir(&self) -> PathBuf {
        self.dir.join("renders")
    }
}

/// Discover all pages under `pages_root` in canonical render order.
///
/// A missing or empty pages root yields an empty catalog.
pub fn discover(pages_root: &Path) -> Result<Vec<PageEntry>, CatalogError> {
    if !pages_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut pages = Vec::new();
    let mut walker = WalkDir::new(pages_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            walker.skip_current_dir();
            continue;
        }

        let kind = match parse_page_name(&name) {
            Some(kind @ PageKind::Numbered(_)) => kind,
            Some(kind) if entry.depth() == 1 => kind,
            _ => continue,
        };

        pages.push(PageEntry {
            name,
            kind,
            dir: entry.path().to_path_buf(),
        });
        walker.skip_current_dir();
    }

    // Stable: equal ranks keep file-name order
    pages.sort_by_key(PageEntry::rank);
    Ok(pages)
}

/// Look up a page by its directory name.
pub fn find<'a>(pages: &'a [PageEntry], name: &str) -> Result<&'a PageEntry, CatalogError> {
    pages
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| CatalogError::PageNotFound(name.to_string()))
}
