use clap::{Parser, Subcommand};
use comic_factory::batch::{self, BatchRecord, PROMPT_FILE};
use comic_factory::generation::GenerationBackend;
use comic_factory::generation::gemini::GeminiBackend;
use comic_factory::manifest::Manifest;
use comic_factory::rasterize::{ChromeRasterizer, rasterize_project};
use comic_factory::tags::TagResolver;
use comic_factory::tracker::{self, Collected};
use comic_factory::{catalog, compose, config, init, output, package};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "comic-factory")]
#[command(about = "Manifest-driven comic page production")]
#[command(long_about = "\
Manifest-driven comic page production

Every page is a directory with a manifest.md describing its grid and panels.
Panel prompts may reference reusable text fragments as [kind:value] tags.

Project structure:

  my-comic/
  ├── comic.toml                   # Project config (optional, see gen-config)
  ├── assets/prompts/
  │   ├── characters/hero.txt      # [character:hero]
  │   └── locations/city.txt       # [location:city]
  └── pages/
      ├── cover/manifest.md        # Always first
      ├── p01/manifest.md          # Numbered pages, by number
      ├── p02/
      │   ├── manifest.md
      │   ├── renders/panel_1.png  # Written by render/collect
      │   └── composition.html     # Written by compose
      └── bonus1/manifest.md       # After all numbered pages

Manifest fields:

  Grid: `1fr 1fr / 1fr 1fr`        # Page rows / columns
  ## Panel 1
  Area: `1 / 1 / 2 / 3`            # CSS grid-area
  Lettering: `[{type: \"caption\", text: \"...\", position: {top: 20, left: 20}}]`
  Prompt: `[character:hero] on a rooftop`

Pipeline: render → compose → rasterize → package")]
#[command(version)]
struct Cli {
    /// Project root (directory holding comic.toml)
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scaffold a new project
    Init,
    /// Build the prompt batch, submit it, and distribute the results
    Render {
        /// Model to render with (defaults to render.model from comic.toml)
        #[arg(long)]
        model: Option<String>,
        /// Submit and exit; fetch results later with `collect`
        #[arg(long)]
        no_wait: bool,
        /// Submit even if an identical batch was already submitted
        #[arg(long)]
        force: bool,
    },
    /// Fetch the results of the last submitted batch
    Collect {
        /// Check once instead of waiting for the job to finish
        #[arg(long)]
        no_wait: bool,
    },
    /// Print the final prompt for one panel
    Prompt {
        /// Page directory name, e.g. p01
        page: String,
        /// Panel number
        panel: u32,
    },
    /// List pages in render order
    Pages,
    /// Build composition.html for every laid-out page
    Compose,
    /// Screenshot each composition into the output directory
    Rasterize,
    /// Bundle the rasterized pages into a .cbz archive
    Package,
    /// Print a stock comic.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    run(cli).inspect_err(|e| error!("{e}"))
}

/// Install the global subscriber. `RUST_LOG` overrides the defaults.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,comic_factory={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let root = cli.project;

    match cli.command {
        Command::Init => {
            let report = init::init_project(&root)?;
            output::print_init(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Pages => {
            let config = config::load_config(&root)?;
            let pages_root = config.pages_dir(&root);
            let pages = catalog::discover(&pages_root)?;
            let mut listing = Vec::with_capacity(pages.len());
            for page in pages {
                let panels = Manifest::load(&page.dir)?.map(|m| m.panel_count());
                listing.push((page, panels));
            }
            output::print_pages(&listing, &pages_root);
        }
        Command::Prompt { page, panel } => {
            let config = config::load_config(&root)?;
            let pages = catalog::discover(&config.pages_dir(&root))?;
            let resolver = TagResolver::new(&config.assets_dir(&root));
            let prompt = batch::resolve_panel(&pages, &page, panel, &resolver, &config.style)?;
            println!("{}", prompt);
        }
        Command::Render {
            model,
            no_wait,
            force,
        } => {
            let config = config::load_config(&root)?;
            let pages = catalog::discover(&config.pages_dir(&root))?;
            let resolver = TagResolver::new(&config.assets_dir(&root));
            let batch = batch::build(&pages, &resolver, &config.style)?;
            if batch.is_empty() {
                println!("Nothing to render: no page has panels");
                return Ok(());
            }
            output::print_batch(&batch);

            let digest = batch.digest();
            if !force
                && let Some(previous) = BatchRecord::load(&root)?
                && previous.digest == digest
            {
                return Err(format!(
                    "this batch was already submitted as {}; run `collect`, or pass --force to submit again",
                    previous.job
                )
                .into());
            }

            let backend = GeminiBackend::from_config(&config.render)?;
            let prompt_file = root.join(PROMPT_FILE);
            batch.write_prompt_file(&prompt_file)?;

            let model = model.unwrap_or_else(|| config.render.model.clone());
            let job = tracker::submit(&backend, &prompt_file, &model)?;
            let record = BatchRecord {
                job,
                model,
                digest,
                targets: batch.targets(),
            };
            record.save(&root)?;
            output::print_submission(&record.job, &record.model, !no_wait);

            if !no_wait {
                collect(&backend, &record, &config, &root, true)?;
            }
        }
        Command::Collect { no_wait } => {
            let config = config::load_config(&root)?;
            let record = BatchRecord::load(&root)?
                .ok_or("no batch has been submitted yet; run `render` first")?;
            let backend = GeminiBackend::from_config(&config.render)?;
            collect(&backend, &record, &config, &root, !no_wait)?;
        }
        Command::Compose => {
            let config = config::load_config(&root)?;
            let pages_root = config.pages_dir(&root);
            let pages = catalog::discover(&pages_root)?;
            let report = compose::compose_project(&pages, &config.page);
            output::print_compose(&report, &pages_root);
        }
        Command::Rasterize => {
            let config = config::load_config(&root)?;
            let pages = catalog::discover(&config.pages_dir(&root))?;
            let output_dir = config.output_dir(&root);
            let rasterizer = ChromeRasterizer::launch(&config.page)?;
            let report = rasterize_project(&pages, &output_dir, &rasterizer, &config.page)?;
            output::print_rasterize(&report, &output_dir);
        }
        Command::Package => {
            let config = config::load_config(&root)?;
            let report = package::package_project(&config, &config.output_dir(&root))?;
            output::print_package(&report);
        }
    }

    Ok(())
}

/// Wait for (or check) the recorded job and distribute its images.
fn collect(
    backend: &impl GenerationBackend,
    record: &BatchRecord,
    config: &config::ProjectConfig,
    root: &Path,
    wait: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let interval = wait.then(|| config.render.poll_interval());
    match tracker::collect(backend, record, interval)? {
        Collected::Pending => println!("{} is still running", record.job),
        Collected::Distributed(report) => {
            output::print_distribution(&report, &config.pages_dir(root))
        }
    }
    Ok(())
}
