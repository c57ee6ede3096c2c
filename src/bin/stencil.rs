//! Command-line interface for rendering templates
//!
//! Renders a template file against JSON data, or only compiles it to report
//! syntax errors. Partials are looked up as `<name>.mustache` next to the
//! template file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stencil::engine::{MustacheEngineBuilder, TemplateLocator};
use stencil::{EngineConfig, MustacheEngine, MustacheError, Value};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Render logic-less templates against JSON data")]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template
    Render {
        /// Template file
        template: PathBuf,
        /// JSON file with the data (reads from stdin if not provided)
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// JSON file with engine configuration values
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Disable resolver hints
        #[arg(long)]
        no_hints: bool,
    },
    /// Compile a template and report syntax errors
    Check {
        /// Template file
        template: PathBuf,
    },
}

/// Finds partials as `<name>.mustache` files in one directory
#[derive(Debug)]
struct DirectoryLocator {
    root: PathBuf,
}

impl TemplateLocator for DirectoryLocator {
    fn locate(&self, name: &str) -> stencil::Result<Option<String>> {
        // Partials never leave the template directory
        if name.is_empty() || name.contains(['/', '\\']) {
            log::warn!("Ignoring partial name with path separators: {name}");
            return Ok(None);
        }
        let path = self.root.join(format!("{name}.mustache"));
        match fs::read_to_string(&path) {
            Ok(source) => Ok(Some(source)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(MustacheError::TemplateLocation {
                name: name.to_string(),
                message: format!("{}: {err}", path.display()),
            }),
        }
    }
}

fn main() {
    // Setup human-panic for better error messages
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Render {
            template,
            data,
            config,
            no_hints,
        } => handle_render(&template, data.as_deref(), config.as_deref(), no_hints),
        Commands::Check { template } => handle_check(&template),
    };

    if let Err(e) = result {
        eprintln!("✗ {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
    builder.parse_default_env();
    builder.init();
}

fn build_engine(template: &Path, config: EngineConfig) -> Result<MustacheEngine> {
    let root = template
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    MustacheEngineBuilder::new()
        .config(config)
        .add_template_locator(DirectoryLocator { root })
        .build()
        .context("Failed to build engine")
}

fn template_name(template: &Path) -> String {
    template
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string())
}

fn handle_render(template: &Path, data: Option<&Path>, config: Option<&Path>, no_hints: bool) -> Result<()> {
    let mut engine_config = match config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read configuration {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid configuration {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if no_hints {
        engine_config.resolver_hints_enabled = false;
    }

    let data = match data {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read data {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read data from stdin")?;
            buffer
        }
    };
    let data: serde_json::Value = if data.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&data).context("Data is not valid JSON")?
    };

    let source = fs::read_to_string(template)
        .with_context(|| format!("Failed to read template {}", template.display()))?;
    let engine = build_engine(template, engine_config)?;
    let compiled = engine.compile_mustache(&template_name(template), &source)?;
    let output = compiled.render(Value::from(data))?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn handle_check(template: &Path) -> Result<()> {
    let source = fs::read_to_string(template)
        .with_context(|| format!("Failed to read template {}", template.display()))?;
    let engine = build_engine(template, EngineConfig::default())?;
    let compiled = engine.compile_mustache(&template_name(template), &source)?;
    println!(
        "✓ Template {} compiled successfully ({} top-level segments)",
        compiled.name(),
        compiled.root().children().len()
    );
    Ok(())
}
