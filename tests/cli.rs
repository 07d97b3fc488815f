//! End-to-end tests driving the `comic-factory` binary against a copy of
//! `fixtures/project/`. Nothing here talks to the network: every command
//! under test either works offline or fails before submission.

use comic_factory::batch::{self, BatchRecord};
use comic_factory::catalog;
use comic_factory::config;
use comic_factory::generation::JobId;
use comic_factory::tags::TagResolver;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const API_KEY_ENV: &str = "COMIC_FACTORY_FIXTURE_API_KEY";

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn copy_dir_recursive(src: &Path, dst: &Path) {
    for entry in fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            fs::create_dir_all(&target).unwrap();
            copy_dir_recursive(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

fn fixture_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/project");
    copy_dir_recursive(&fixtures, tmp.path());
    tmp
}

fn run(project: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_comic-factory"))
        .arg("--project")
        .arg(project)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove(API_KEY_ENV)
        .output()
        .expect("failed to run comic-factory")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// pages / prompt
// ---------------------------------------------------------------------------

#[test]
fn pages_lists_catalog_in_render_order() {
    let project = fixture_project();
    let out = run(project.path(), &["pages"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().filter(|l| !l.starts_with(' ')).collect();
    assert_eq!(
        lines,
        vec![
            "Pages",
            "001 cover (1 panel)",
            "002 p01 (3 panels)",
            "003 p02 (2 panels)",
            "004 bonus1 (1 panel)",
        ]
    );
    assert!(!text.contains("drafts"));
}

#[test]
fn prompt_prints_fully_resolved_panel() {
    let project = fixture_project();
    let out = run(project.path(), &["prompt", "p02", "1"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "Noir comic illustration, heavy ink. A lean detective in a long grey trench coat, \
         short dark hair, tired eyes. walks down a narrow alley, steam rising from the gratings. \
         Portrait orientation, 2:3 aspect ratio.\n"
    );
}

#[test]
fn prompt_keeps_unknown_tags_verbatim() {
    let project = fixture_project();
    let out = run(project.path(), &["prompt", "p01", "3"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("[prop:lighter] on the desk"));
}

#[test]
fn prompt_for_unknown_page_fails() {
    let project = fixture_project();
    let out = run(project.path(), &["prompt", "p09", "1"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("p09"));
}

#[test]
fn prompt_for_unknown_panel_fails() {
    let project = fixture_project();
    let out = run(project.path(), &["prompt", "p01", "4"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Panel 4 not found"));
}

// ---------------------------------------------------------------------------
// render / collect (offline failure paths)
// ---------------------------------------------------------------------------

#[test]
fn render_without_api_key_fails_before_submitting() {
    let project = fixture_project();
    let out = run(project.path(), &["render"]);

    assert!(!out.status.success());
    assert!(stderr(&out).contains(API_KEY_ENV));
    // The batch itself was built and listed
    assert!(stdout(&out).contains("Batch (7 prompts)"));
    assert!(!project.path().join(".comic-factory/batch.json").exists());
}

#[test]
fn render_refuses_identical_resubmission() {
    let project = fixture_project();
    let root = project.path();

    let config = config::load_config(root).unwrap();
    let pages = catalog::discover(&config.pages_dir(root)).unwrap();
    let resolver = TagResolver::new(&config.assets_dir(root));
    let built = batch::build(&pages, &resolver, &config.style).unwrap();
    BatchRecord {
        job: JobId("batches/earlier".into()),
        model: config.render.model.clone(),
        digest: built.digest(),
        targets: built.targets(),
    }
    .save(root)
    .unwrap();

    let out = run(root, &["render"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("batches/earlier"));
    assert!(stderr(&out).contains("--force"));
}

#[test]
fn render_aborts_on_missing_prompt() {
    let project = fixture_project();
    let manifest = project.path().join("pages/p02/manifest.md");
    let text = fs::read_to_string(&manifest)
        .unwrap()
        .replace("Prompt: `A silhouette", "Notes: `A silhouette");
    fs::write(&manifest, text).unwrap();

    let out = run(project.path(), &["render"]);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("p02"), "{err}");
    assert!(err.contains("No prompt for panel 2"), "{err}");
    assert!(!project.path().join("prompts_batch.txt").exists());
}

#[test]
fn collect_without_record_fails() {
    let project = fixture_project();
    let out = run(project.path(), &["collect"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("render"));
}

// ---------------------------------------------------------------------------
// compose
// ---------------------------------------------------------------------------

#[test]
fn compose_writes_laid_out_pages_only() {
    let project = fixture_project();
    let out = run(project.path(), &["compose"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let pages = project.path().join("pages");
    for page in ["cover", "p01", "p02"] {
        assert!(pages.join(page).join("composition.html").exists(), "{page}");
    }
    assert!(!pages.join("bonus1/composition.html").exists());

    let text = stdout(&out);
    assert!(text.contains("bonus1 (no grid spec)"));
    assert!(text.contains("Composed 3 pages"));

    let html = fs::read_to_string(pages.join("p01/composition.html")).unwrap();
    assert!(html.contains("Midnight. The rain again."));
    assert!(html.contains("balloon-tail"));
}

#[test]
fn compose_survives_malformed_lettering() {
    let project = fixture_project();
    let manifest = project.path().join("pages/p01/manifest.md");
    let text = fs::read_to_string(&manifest)
        .unwrap()
        .replace(r#"{type: "speech","#, "{type: speech,");
    fs::write(&manifest, text).unwrap();

    let out = run(project.path(), &["compose"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let err = stderr(&out);
    assert!(err.contains("WARN"), "{err}");
    assert!(err.contains("page p01 panel 2"), "{err}");

    let html = fs::read_to_string(project.path().join("pages/p01/composition.html")).unwrap();
    assert!(html.contains("Midnight. The rain again."));
    assert!(!html.contains("Who&#39;s calling") && !html.contains("Who's calling"));
    assert!(stdout(&out).contains("Lettering omitted: panel 2"));
}

// ---------------------------------------------------------------------------
// package
// ---------------------------------------------------------------------------

#[test]
fn package_without_images_fails() {
    let project = fixture_project();
    let out = run(project.path(), &["package"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("rasterize first"));
}

#[test]
fn package_bundles_output_pngs() {
    let project = fixture_project();
    let output_dir = project.path().join("renders/issue_01");
    fs::create_dir_all(&output_dir).unwrap();
    fs::write(output_dir.join("001-cover.png"), b"cover").unwrap();
    fs::write(output_dir.join("002-p01.png"), b"p01").unwrap();

    let out = run(project.path(), &["package"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(output_dir.join("night-shift-01.cbz").exists());
    assert!(stdout(&out).contains("Packaged 2 pages"));
}

// ---------------------------------------------------------------------------
// init / gen-config
// ---------------------------------------------------------------------------

#[test]
fn init_scaffolds_once() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("new-comic");

    let out = run(&project, &["init"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(project.join("comic.toml").exists());
    assert!(project.join("pages/p01/manifest.md").exists());

    let pages = run(&project, &["pages"]);
    assert!(stdout(&pages).contains("001 p01 (3 panels)"));

    let again = run(&project, &["init"]);
    assert!(!again.status.success());
    assert!(stderr(&again).contains("already exists"));
}

#[test]
fn gen_config_is_valid_and_complete() {
    let tmp = TempDir::new().unwrap();
    let out = run(tmp.path(), &["gen-config"]);
    assert!(out.status.success());

    let text = stdout(&out);
    let value: toml::Value = toml::from_str(&text).unwrap();
    for section in ["style", "paths", "render", "page"] {
        assert!(value.get(section).is_some(), "missing [{section}]");
    }
}
