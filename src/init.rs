//! Project scaffolding for `comic-factory init`.

use crate::config::{CONFIG_FILE, stock_config_toml};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("{0} already exists; refusing to overwrite an existing project")]
    AlreadyInitialized(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const SAMPLE_MANIFEST: &str = r#"# Page 1

Grid: `1fr 1fr / 1fr 1fr`

## Panel 1

Area: `1 / 1 / 2 / 3`
Lettering: `[{type: "caption", text: "The city never sleeps.", position: {top: 24, left: 24}}]`
Prompt: `Wide establishing shot of [location:city], rain on the rooftops.`

## Panel 2

Area: `2 / 1 / 3 / 2`
Lettering: `[{type: "speech", text: "Someone's up there.", position: {bottom: 30, left: 30}}]`
Prompt: `[character:hero] looks up from the alley, collar turned against the rain.`

## Panel 3

Area: `2 / 2 / 3 / 3`
Prompt: `Close-up of a shadow moving across a lit window.`
"#;

const SAMPLE_FRAGMENTS: &[(&str, &str)] = &[
    (
        "assets/prompts/characters/hero.txt",
        "A lean detective in a long grey trench coat,\nshort dark hair, tired eyes.\n",
    ),
    (
        "assets/prompts/locations/city.txt",
        "a dense neon-lit city at night, wet streets reflecting signs\n",
    ),
];

/// Files written, relative to the project root.
#[derive(Debug, Default)]
pub struct InitReport {
    pub created: Vec<PathBuf>,
    /// Sample files left alone because something was already there.
    pub kept: Vec<PathBuf>,
}

/// Scaffold a new project at `root`.
pub fn init_project(root: &Path) -> Result<InitReport, InitError> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(InitError::AlreadyInitialized(config_path));
    }

    let mut report = InitReport::default();
    let files = [(CONFIG_FILE, stock_config_toml()), ("pages/p01/manifest.md", SAMPLE_MANIFEST)]
        .into_iter()
        .chain(SAMPLE_FRAGMENTS.iter().copied());

    for (rel, content) in files {
        let path = root.join(rel);
        if path.exists() {
            report.kept.push(PathBuf::from(rel));
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        report.created.push(PathBuf::from(rel));
    }
    Ok(report)
}
