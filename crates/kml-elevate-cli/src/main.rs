// CLI handlers take owned clap values and print a lot.
#![allow(
    clippy::needless_pass_by_value,    // clap requires owned values
    clippy::unnecessary_wraps,         // consistent Result return for CLI handlers
    clippy::must_use_candidate,        // CLI functions don't need must_use
)]

//! kml-elevate CLI
//!
//! Shifts every `LineString` altitude in a KML or KMZ file and writes the
//! `_elevated` copy next to it.

mod config;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use config::Config;
use kml_elevate::{
    file_name_with_suffix, transform_bytes, ExtrudeMode, FileKind, LineColor, ProcessSummary,
    TransformOptions, ELEVATED_SUFFIX,
};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Path argument meaning stdin (input) or stdout (output)
const STDIO: &str = "-";

/// File name used for stdin input
const STDIN_NAME: &str = "stdin.kml";

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Check if output should be shown (not quiet)
    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Check if verbose output is requested
    const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Default `env_logger` filter when `RUST_LOG` is unset
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
enum ExtrudeArg {
    /// Force extrude to 0 only when --color is given (default)
    #[value(name = "follow-color")]
    FollowColor,
    /// Always force extrude to 0
    Always,
    /// Never touch extrude
    Never,
}

impl From<ExtrudeArg> for ExtrudeMode {
    fn from(arg: ExtrudeArg) -> Self {
        match arg {
            ExtrudeArg::FollowColor => Self::FollowLineColor,
            ExtrudeArg::Always => Self::Always,
            ExtrudeArg::Never => Self::Never,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "kml-elevate",
    version,
    about = "Shift LineString altitudes in KML/KMZ files",
    long_about = "Shift LineString altitudes in KML/KMZ files.\n\
                  \n\
                  Adds --delta meters to every coordinate of every LineString, giving\n\
                  2D coordinates an altitude equal to the delta, and sets altitudeMode\n\
                  to absolute. With --color, the enclosing Placemark's line style color\n\
                  is set as well.\n\
                  \n\
                  Defaults can be set via .kml-elevate.toml configuration file."
)]
struct Args {
    /// Input KML or KMZ file, or '-' to read KML from stdin
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Elevation change in meters (may be negative)
    #[arg(short, long, value_name = "METERS", allow_negative_numbers = true)]
    delta: Option<f64>,

    /// Line color for enclosing placemarks, as RRGGBB or #RRGGBB
    #[arg(short, long, value_name = "RRGGBB")]
    color: Option<LineColor>,

    /// How to treat <extrude> (default: follow-color, or from config)
    #[arg(long, value_enum)]
    extrude: Option<ExtrudeArg>,

    /// Output file path, or '-' for stdout (default: <name>_elevated.<ext>)
    /// When reading from stdin, output defaults to stdout unless -o is specified
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(long)]
    force: bool,

    /// Show what would be written without writing it
    #[arg(long)]
    dry_run: bool,

    /// Use this config file instead of ~/.kml-elevate.toml and ./.kml-elevate.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

/// Where the result goes
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Stdout,
    File(PathBuf),
}

fn main() -> ExitCode {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    let env = env_logger::Env::default().default_filter_or(verbosity.log_filter());
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Stderr)
        .init();

    match run(args, verbosity) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, verbosity: Verbosity) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => {
            let (user_config, project_config) = Config::discover_configs();
            Config::merge(user_config, project_config)
        }
    };

    let options = resolve_options(&args, &config)?;
    let from_stdin = args.input.as_os_str() == STDIO;
    let input_name = if from_stdin {
        STDIN_NAME.to_string()
    } else {
        args.input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Input path has no file name: {}", args.input.display()))?
    };

    let force = args.force || config.output().force.unwrap_or(false);
    let suffix = config
        .output()
        .suffix
        .unwrap_or_else(|| ELEVATED_SUFFIX.to_string());
    let target = resolve_target(&args, from_stdin, &input_name, &suffix);

    if let Target::File(path) = &target {
        if path.exists() && !force && !args.dry_run {
            bail!(
                "Output file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
    }

    let contents = read_input(&args.input, from_stdin)?;
    let kind = FileKind::from_name(&input_name);
    log::debug!("{input_name}: {} bytes, {kind:?}", contents.len());

    let (transformed, line_string_count) = transform_bytes(kind, &contents, &options)
        .with_context(|| format!("Failed to process {input_name}"))?;
    let summary = ProcessSummary {
        line_string_count,
        elevation_delta: options.elevation_delta,
    };

    let destination = match &target {
        Target::Stdout => "stdout".to_string(),
        Target::File(path) => path.display().to_string(),
    };

    if args.dry_run {
        if verbosity.should_show_output() {
            eprintln!("Would write: {input_name} → {destination}");
            eprintln!("{summary}");
        }
        return Ok(());
    }

    match &target {
        Target::Stdout => io::stdout()
            .write_all(&transformed)
            .context("Failed to write to stdout")?,
        Target::File(path) => fs::write(path, &transformed)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
    }

    if verbosity.should_show_output() {
        eprintln!("{} {summary}", "✓".green().bold());
        if let Target::File(_) = target {
            eprintln!(
                "{} Output written to: {}",
                "✓".green().bold(),
                destination.bright_white()
            );
        }
    }
    if verbosity.is_verbose() {
        eprintln!(
            "{} Media type: {}, {} bytes",
            "Info:".blue().bold(),
            kind.media_type(),
            transformed.len()
        );
        if let Some(color) = options.line_color {
            eprintln!("{} Line color: {color}", "Info:".blue().bold());
        }
    }

    Ok(())
}

/// Combine CLI flags with config defaults (flags win)
fn resolve_options(args: &Args, config: &Config) -> Result<TransformOptions> {
    let transform_config = config.transform();

    let delta = args.delta.or(transform_config.delta).ok_or_else(|| {
        anyhow!("Missing elevation delta: pass --delta <METERS> or set `delta` under [transform] in .kml-elevate.toml")
    })?;

    let line_color = match args.color {
        Some(color) => Some(color),
        None => transform_config
            .color
            .as_deref()
            .map(str::parse::<LineColor>)
            .transpose()
            .context("Invalid color in configuration file")?,
    };

    let extrude = args
        .extrude
        .map(ExtrudeMode::from)
        .or(transform_config.extrude)
        .unwrap_or_default();

    let mut options = TransformOptions::new(delta).with_extrude(extrude);
    if let Some(color) = line_color {
        options = options.with_line_color(color);
    }
    Ok(options)
}

/// Output destination from -o, or the `_elevated` sibling of the input
fn resolve_target(args: &Args, from_stdin: bool, input_name: &str, suffix: &str) -> Target {
    match &args.output {
        Some(path) if path.as_os_str() == STDIO => Target::Stdout,
        Some(path) => Target::File(path.clone()),
        None if from_stdin => Target::Stdout,
        None => Target::File(
            args.input
                .with_file_name(file_name_with_suffix(input_name, suffix)),
        ),
    }
}

fn read_input(input: &Path, from_stdin: bool) -> Result<Vec<u8>> {
    if from_stdin {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        fs::read(input).with_context(|| format!("Failed to read input file: {}", input.display()))
    }
}
