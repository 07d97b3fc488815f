//! Packaging: bundle rasterized pages into a comic book archive.
//!
//! The archive is a zip with the `.cbz` extension holding the page PNGs in
//! file-name order (which is reading order, see [`crate::rasterize`]) and a
//! `ComicInfo.xml` metadata document, the de-facto standard read by comic
//! readers.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <ComicInfo>
//!   <Series>Night Shift</Series>
//!   <Number>1</Number>
//!   <PageCount>3</PageCount>
//!   <Writer>Jane Doe</Writer>
//!   <Pages>
//!     <Page Image="0" Type="FrontCover"></Page>
//!     <Page Image="1" Type="Story"></Page>
//!   </Pages>
//! </ComicInfo>
//! ```
//!
//! Extra elements come from the `[metadata]` table of `comic.toml`.

use crate::config::{ProjectConfig, metadata_text};
use crate::naming::{PageKind, parse_page_name};
use maud::{Markup, PreEscaped, html};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const COMIC_INFO_FILE: &str = "ComicInfo.xml";

/// Elements written from the project itself; metadata can't override them.
const GENERATED_ELEMENTS: &[&str] = &["Series", "Number", "PageCount", "Pages"];

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("No page images in {0}; run rasterize first")]
    NothingToPackage(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageReport {
    pub archive: PathBuf,
    pub pages: Vec<String>,
}

/// Lowercase, dash-separated form of the series title for file names.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "comic".to_string()
    } else {
        slug.to_string()
    }
}

/// `<series-slug>-<issue>.cbz`, issue zero-padded to two digits.
pub fn archive_name(config: &ProjectConfig) -> String {
    format!("{}-{:02}.cbz", slugify(&config.series), config.issue)
}

/// Page images in `dir`, sorted by file name.
pub fn page_images(dir: &Path) -> Result<Vec<PathBuf>, PackageError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    images.sort();
    Ok(images)
}

/// ComicInfo page type from a rasterized file name like `001-cover.png`.
fn page_type(file_name: &str) -> &'static str {
    let stem = file_name.strip_suffix(".png").unwrap_or(file_name);
    let page = stem.split_once('-').map_or(stem, |(_, rest)| rest);
    match parse_page_name(page) {
        Some(PageKind::Cover) => "FrontCover",
        Some(PageKind::Bonus(_)) => "Other",
        _ => "Story",
    }
}

fn is_xml_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render `ComicInfo.xml` for the given page file names.
pub fn comic_info(config: &ProjectConfig, pages: &[String]) -> Markup {
    let extra: Vec<(&String, String)> = config
        .metadata
        .iter()
        .filter(|(key, _)| {
            if GENERATED_ELEMENTS.contains(&key.as_str()) {
                return false;
            }
            if !is_xml_name(key) {
                warn!(key = %key, "metadata key is not a valid element name, skipped");
                return false;
            }
            true
        })
        .map(|(key, value)| (key, metadata_text(value)))
        .collect();

    html! {
        (PreEscaped("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"))
        ComicInfo {
            Series { (config.series) }
            Number { (config.issue) }
            PageCount { (pages.len()) }
            @for (key, value) in &extra {
                (PreEscaped(format!("<{key}>")))
                (value)
                (PreEscaped(format!("</{key}>")))
            }
            Pages {
                @for (index, page) in pages.iter().enumerate() {
                    Page Image=(index) Type=(page_type(page)) {}
                }
            }
        }
    }
}

/// Write the archive for the images in `output_dir`.
pub fn package_project(
    config: &ProjectConfig,
    output_dir: &Path,
) -> Result<PackageReport, PackageError> {
    let images = page_images(output_dir)?;
    if images.is_empty() {
        return Err(PackageError::NothingToPackage(output_dir.to_path_buf()));
    }
    let names: Vec<String> = images
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();

    let archive = output_dir.join(archive_name(config));
    let mut zip = ZipWriter::new(File::create(&archive)?);
    // PNGs are already compressed
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, name) in images.iter().zip(&names) {
        zip.start_file(name.as_str(), stored)?;
        zip.write_all(&fs::read(path)?)?;
    }
    zip.start_file(COMIC_INFO_FILE, deflated)?;
    zip.write_all(comic_info(config, &names).into_string().as_bytes())?;
    zip.finish()?;

    info!(archive = %archive.display(), pages = names.len(), "packaged issue");
    Ok(PackageReport {
        archive,
        pages: names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn config() -> ProjectConfig {
        let mut config = ProjectConfig {
            series: "Night Shift: Redux!".to_string(),
            issue: 3,
            ..ProjectConfig::default()
        };
        config
            .metadata
            .insert("Writer".into(), toml::Value::String("Jane & Co".into()));
        config
            .metadata
            .insert("Year".into(), toml::Value::Integer(2026));
        config
    }

    #[test]
    fn slug_and_archive_name() {
        assert_eq!(slugify("Night Shift: Redux!"), "night-shift-redux");
        assert_eq!(slugify("  "), "comic");
        assert_eq!(archive_name(&config()), "night-shift-redux-03.cbz");
    }

    #[test]
    fn page_types_follow_page_names() {
        assert_eq!(page_type("001-cover.png"), "FrontCover");
        assert_eq!(page_type("002-p01.png"), "Story");
        assert_eq!(page_type("009-bonus1.png"), "Other");
    }

    #[test]
    fn comic_info_fields_are_escaped() {
        let xml = comic_info(&config(), &["001-cover.png".into(), "002-p01.png".into()]).into_string();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<Series>Night Shift: Redux!</Series>"));
        assert!(xml.contains("<Number>3</Number>"));
        assert!(xml.contains("<PageCount>2</PageCount>"));
        assert!(xml.contains("<Writer>Jane &amp; Co</Writer>"));
        assert!(xml.contains("<Year>2026</Year>"));
        assert!(xml.contains(r#"<Page Image="0" Type="FrontCover"></Page>"#));
        assert!(xml.contains(r#"<Page Image="1" Type="Story"></Page>"#));
    }

    #[test]
    fn invalid_or_reserved_metadata_keys_are_skipped() {
        let mut config = config();
        config
            .metadata
            .insert("bad key<".into(), toml::Value::String("x".into()));
        config
            .metadata
            .insert("Series".into(), toml::Value::String("Override".into()));
        let xml = comic_info(&config, &[]).into_string();
        assert!(!xml.contains("bad key"));
        assert!(!xml.contains("Override"));
    }

    #[test]
    fn archive_holds_pages_in_order_and_comic_info() {
        let tmp = TempDir::new().unwrap();
        for name in ["002-p01.png", "001-cover.png", "003-p02.png"] {
            fs::write(tmp.path().join(name), name.as_bytes()).unwrap();
        }
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let report = package_project(&config(), tmp.path()).unwrap();
        assert_eq!(report.pages, vec!["001-cover.png", "002-p01.png", "003-p02.png"]);
        assert!(report.archive.ends_with("night-shift-redux-03.cbz"));

        let mut archive = zip::ZipArchive::new(File::open(&report.archive).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&COMIC_INFO_FILE.to_string()));

        let mut first = String::new();
        archive
            .by_name("001-cover.png")
            .unwrap()
            .read_to_string(&mut first)
            .unwrap();
        assert_eq!(first, "001-cover.png");
    }

    #[test]
    fn empty_output_is_nothing_to_package() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            package_project(&config(), tmp.path()),
            Err(PackageError::NothingToPackage(_))
        ));
        assert!(matches!(
            package_project(&config(), &tmp.path().join("missing")),
            Err(PackageError::NothingToPackage(_))
        ));
    }
}
