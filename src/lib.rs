//! # Comic Factory
//!
//! Manifest-driven comic page production. Each page of an issue is a
//! directory holding a small markdown manifest: the page grid, and per panel
//! its grid cell, its lettering, and the prompt for its art. Comic Factory
//! turns those manifests into generated panel art, lettered page layouts,
//! page images, and finally a `.cbz` archive.
//!
//! # Architecture: Render, Then Lay Out
//!
//! ```text
//! 1. Render     manifests → prompts_batch.txt → batch job → pages/*/renders/panel_N.png
//! 2. Compose    manifests + renders → pages/*/composition.html
//! 3. Rasterize  composition.html → <output>/NNN-page.png
//! 4. Package    <output>/*.png → <output>/<series>-NN.cbz
//! ```
//!
//! Rendering is the delicate stage. Every panel of every page becomes one
//! line of a single batch job, and the generation service answers with a
//! list of images that carries no page or panel identity, only position.
//! [`batch`] therefore builds one ordered list of (prompt, panel) pairs in a
//! single pass; the prompt file and the output mapping are both read from
//! that list, so they cannot disagree.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Discovers page directories and orders them: cover, numbered pages, bonus pages |
//! | [`naming`] | Page directory naming convention and ranks |
//! | [`manifest`] | Parses `manifest.md` into panels, fields, and the page layout |
//! | [`tags`] | Expands `[kind:value]` references from `assets/prompts/` |
//! | [`prompt`] | Wraps resolved prompts in the project's house style |
//! | [`batch`] | Builds the prompt batch and persists what was submitted |
//! | [`generation`] | Generation service trait and the Gemini batch client |
//! | [`tracker`] | Submits the batch and polls it to completion |
//! | [`distribute`] | Writes returned images to their panels |
//! | [`lettering`] | Lenient parser for captions and speech balloons |
//! | [`compose`] | Renders per-page HTML layouts using Maud |
//! | [`rasterize`] | Screenshots layouts with headless Chrome |
//! | [`package`] | Writes the `.cbz` archive with `ComicInfo.xml` |
//! | [`config`] | `comic.toml` loading, stock defaults, and validation |
//! | [`init`] | Project scaffolding |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Forgiving Prompt Tags
//!
//! A `[kind:value]` tag whose fragment file doesn't exist stays in the prompt
//! exactly as written. Authors sketch pages before writing every character
//! sheet, and a render with a literal tag is more useful than no render.
//!
//! ## Lettering Lives With the Layout
//!
//! Lettering is HTML over the art, never part of the generated image. Text
//! stays editable and crisp, and a change of dialogue needs a recompose, not
//! a re-render.
//!
//! ## Logging
//!
//! Library code logs through `tracing` macros only. The binary installs the
//! subscriber; tests install their own, scoped to the test.

pub mod batch;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod distribute;
pub mod generation;
pub mod init;
pub mod lettering;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod package;
pub mod prompt;
pub mod rasterize;
pub mod tags;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_helpers;
