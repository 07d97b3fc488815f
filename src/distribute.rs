//! Result distribution: write each generated image to its panel.
//!
//! Output items arrive in submission order. A separate cursor walks the
//! panel targets and only advances when an item carries image data, so an
//! item the service answered with text alone does not consume a panel. The
//! first image goes to the first target, the second image to the second
//! target, and so on.
//!
//! Each image is stored as `<page>/renders/panel_<n>.png`. The service may
//! answer with JPEG or WebP; those are transcoded to PNG so the file always
//! matches its extension. A payload the image decoder cannot read is written
//! unchanged.
//!
//! Fewer images than targets is not an error: the report lists the panels
//! left without a render and a warning is logged.

use crate::batch::PanelTarget;
use crate::generation::OutputItem;
use image::ImageFormat;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Error, Debug)]
pub enum DistributeError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionReport {
    /// Files written, in target order.
    pub written: Vec<(PanelTarget, PathBuf)>,
    /// Targets left without an image because the items ran out.
    pub missing: Vec<PanelTarget>,
    /// Items without image data.
    pub skipped_items: usize,
    /// Image items beyond the last target.
    pub extra_items: usize,
}

impl DistributionReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub fn distribute(
    items: &[OutputItem],
    targets: &[PanelTarget],
) -> Result<DistributionReport, DistributeError> {
    let mut report = DistributionReport::default();
    let mut cursor = 0;

    for (index, item) in items.iter().enumerate() {
        let Some(bytes) = &item.image else {
            debug!(index, "output item has no image, skipping");
            report.skipped_items += 1;
            continue;
        };
        let Some(target) = targets.get(cursor) else {
            report.extra_items += 1;
            continue;
        };

        let path = write_panel(target, bytes)?;
        debug!(page = %target.page, panel = target.panel, path = %path.display(), "wrote panel render");
        report.written.push((target.clone(), path));
        cursor += 1;
    }

    report.missing = targets[cursor.min(targets.len())..].to_vec();
    if !report.missing.is_empty() {
        warn!(
            written = report.written.len(),
            expected = targets.len(),
            "job returned fewer images than panels; {} panel(s) left without a render",
            report.missing.len()
        );
    }
    if report.extra_items > 0 {
        warn!(
            extra = report.extra_items,
            "job returned more images than panels; extras ignored"
        );
    }
    Ok(report)
}

fn write_panel(target: &PanelTarget, bytes: &[u8]) -> Result<PathBuf, DistributeError> {
    let path = target.render_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| DistributeError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let png = to_png(bytes, target)?;
    fs::write(&path, png).map_err(|source| DistributeError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// PNG bytes for a payload, transcoding other formats.
fn to_png(bytes: &[u8], target: &PanelTarget) -> Result<Vec<u8>, DistributeError> {
    if bytes.starts_with(PNG_MAGIC) {
        return Ok(bytes.to_vec());
    }
    match image::load_from_memory(bytes) {
        Ok(img) => {
            let mut out = Cursor::new(Vec::new());
            img.write_to(&mut out, ImageFormat::Png)?;
            Ok(out.into_inner())
        }
        Err(e) => {
            warn!(page = %target.page, panel = target.panel, "image payload not decodable ({e}), writing as-is");
            Ok(bytes.to_vec())
        }
    }
}
