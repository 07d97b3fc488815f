//! Tag reference resolution.
//!
//! Raw prompts refer to reusable text fragments with `[kind:value]` tags:
//!
//! ```text
//! [character:hero] on a rooftop   →   assets/prompts/characters/hero.txt
//! [location:city]                 →   assets/prompts/locations/city.txt
//! ```
//!
//! The kind is lowercased and pluralised with a trailing `s` to name the
//! fragment directory; the value is the file stem. Fragment contents are
//! trimmed and folded onto one line before substitution, because every
//! prompt is one line of the batch file.
//!
//! Resolution is a single left-to-right pass. Inserted fragments are never
//! scanned again, so a fragment mentioning `[character:villain]` is inserted
//! literally. A tag without a fragment file is left exactly as written: an
//! author can reference an asset before writing it and still render.

use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^:\[\]]+):([^\[\]]+)\]").expect("valid tag pattern"));

/// A `[kind:value]` reference found in prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub kind: String,
    pub value: String,
}

impl TagRef {
    /// Fragment directory name: lowercased kind plus `s`.
    pub fn directory(&self) -> String {
        format!("{}s", self.kind.trim().to_lowercase())
    }
}

/// Every tag reference in `raw`, left to right.
pub fn references(raw: &str) -> Vec<TagRef> {
    TAG_PATTERN
        .captures_iter(raw)
        .map(|caps| TagRef {
            kind: caps[1].to_string(),
            value: caps[2].to_string(),
        })
        .collect()
}

/// Resolves tag references against `<assets>/prompts/`.
#[derive(Debug, Clone)]
pub struct TagResolver {
    prompts_dir: PathBuf,
}

impl TagResolver {
    pub fn new(assets_dir: &Path) -> Self {
        Self {
            prompts_dir: assets_dir.join("prompts"),
        }
    }

    /// Path of the fragment file for a tag, or `None` if the value could
    /// escape the fragment directory.
    pub fn fragment_path(&self, tag: &TagRef) -> Option<PathBuf> {
        let value = tag.value.as_str();
        if value.is_empty() || value.contains(['/', '\\']) || value.contains("..") {
            return None;
        }
        Some(
            self.prompts_dir
                .join(tag.directory())
                .join(format!("{value}.txt")),
        )
    }

    /// Flattened fragment text for a tag, if its file exists.
    pub fn fragment(&self, tag: &TagRef) -> Option<String> {
        let path = self.fragment_path(tag)?;
        if !path.is_file() {
            return None;
        }
        fs::read_to_string(&path).ok().map(|text| flatten(&text))
    }

    /// Replace every resolvable tag in `raw`; unresolvable tags stay verbatim.
    pub fn resolve(&self, raw: &str) -> String {
        TAG_PATTERN
            .replace_all(raw, |caps: &Captures| {
                let tag = TagRef {
                    kind: caps[1].to_string(),
                    value: caps[2].to_string(),
                };
                match self.fragment(&tag) {
                    Some(text) => text,
                    None => {
                        debug!(tag = &caps[0], "no prompt fragment, leaving tag as written");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Tags in `raw` with no fragment file.
    pub fn unresolved(&self, raw: &str) -> Vec<TagRef> {
        references(raw)
            .into_iter()
            .filter(|tag| self.fragment(tag).is_none())
            .collect()
    }
}

/// Trim and fold line breaks into single spaces.
fn flatten(text: &str) -> String {
    text.trim()
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}
