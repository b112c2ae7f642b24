use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::exclusion::DEFAULT_PLACEHOLDER;
use crate::generator::{self, Options, Report};

#[derive(Parser, Debug)]
#[command(name = "pkgexports")]
#[command(about = "Regenerate the exports map of a package.json from a build directory")]
#[command(version)]
pub struct Cli {
    /// Directory containing compiled .js and .d.ts files
    pub build_dir: PathBuf,

    /// Comma-separated basenames to leave out of the exports map
    #[arg(short = 'i', long = "exclude", value_delimiter = ',', allow_hyphen_values = true)]
    pub exclude: Vec<String>,

    /// Path to package.json (default: nearest one above the build directory)
    #[arg(short = 'p', long = "pkg")]
    pub pkg: Option<PathBuf>,

    /// Skip modules whose files contain this string (empty disables the check)
    #[arg(
        short = 'e',
        long = "exclude-placeholder",
        default_value = DEFAULT_PLACEHOLDER,
        allow_hyphen_values = true
    )]
    pub exclude_placeholder: String,

    /// Print the generated exports instead of writing the manifest
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_options(self) -> Result<Options> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;

        let exclude = self
            .exclude
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Options {
            build_dir: self.build_dir,
            manifest_path: self.pkg,
            exclude,
            placeholder: Some(self.exclude_placeholder),
            dry_run: self.dry_run,
            cwd,
        })
    }
}

pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "pkgexports=debug"
    } else {
        "pkgexports=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

pub fn run_cli(cli: Cli) -> Result<()> {
    let options = cli.into_options()?;
    let report = generator::generate(&options)?;

    if report.written {
        print_summary(&report);
    } else {
        let exports = serde_json::to_string_pretty(&report.exports)
            .context("Failed to serialize exports to JSON")?;
        println!("{}", exports);
    }

    Ok(())
}

fn print_summary(report: &Report) {
    println!("Updated exports in {}", report.manifest_path.display());

    if report.exports.is_empty() {
        println!("No exports generated");
        return;
    }

    for key in report.keys() {
        println!("  {}", key);
    }
}
