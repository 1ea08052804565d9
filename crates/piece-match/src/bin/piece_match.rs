//! `piece-match` command-line interface: extract references from a manual
//! photo and match frames against them.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use piece_match::detect::{self, backend_with_labels};
use piece_match::io::{load_labels, ExtractReport, MatchReport, PieceMatchConfig, ReferenceLibrary};
use piece_match::reference::Orientation;

#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
use log::{info, warn};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "piece-match")]
#[command(about = "Match assembly-manual pieces against camera frames")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON log lines (only with the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract reference descriptors from a parts-list photo.
    Extract(ExtractArgs),
    /// Match a frame against a saved reference library.
    Match(MatchArgs),
    /// Write a config file filled with the default settings.
    DefaultConfig {
        /// Destination path (stdout when omitted).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ExtractArgs {
    /// Photo of the manual page.
    #[arg(long)]
    photo: PathBuf,

    /// Clockwise correction that makes the photo upright.
    #[arg(long, value_enum, default_value_t = OrientationArg::Up)]
    orientation: OrientationArg,

    /// Recognized text as a JSON list of `{ text, bbox }` entries.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the reference library (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write a summary of the extraction (strategy, cells, references).
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct MatchArgs {
    /// Camera frame to match.
    #[arg(long)]
    frame: PathBuf,

    /// Reference library written by `extract`.
    #[arg(long)]
    library: PathBuf,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the match report (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Up,
    Right,
    Down,
    Left,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Up => Orientation::Up,
            OrientationArg::Right => Orientation::Right,
            OrientationArg::Down => Orientation::Down,
            OrientationArg::Left => Orientation::Left,
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs)?;

    match cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Match(args) => run_match(args),
        Commands::DefaultConfig { out } => {
            let cfg = PieceMatchConfig::with_defaults();
            match out {
                Some(path) => Ok(cfg.write_json(path)?),
                None => print_json(&cfg),
            }
        }
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8, _json: bool) -> CliResult<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    piece_match::core::init_with_level(level)?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(_verbose: u8, json: bool) -> CliResult<()> {
    let _ = tracing_log::LogTracer::init();
    piece_match::core::init_tracing(json);
    Ok(())
}

fn load_config(path: Option<&Path>) -> CliResult<PieceMatchConfig> {
    match path {
        Some(p) => Ok(PieceMatchConfig::load_json(p)?),
        None => Ok(PieceMatchConfig::default()),
    }
}

fn load_rgba(path: &Path) -> CliResult<image::RgbaImage> {
    let img = image::open(path).map_err(|e| -> CliError {
        format!("failed to open image {}: {e}", path.display()).into()
    })?;
    Ok(img.to_rgba8())
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(args)))]
fn run_extract(args: ExtractArgs) -> CliResult<()> {
    let cfg = load_config(args.config.as_deref())?;
    let photo = load_rgba(&args.photo)?;
    info!("photo {}x{}", photo.width(), photo.height());

    let labels = match &args.labels {
        Some(path) => load_labels(path)?,
        None => Vec::new(),
    };
    let backend = backend_with_labels(&cfg.cpu_params(), labels);
    let result = detect::extract_references_with(
        backend,
        &photo,
        args.orientation.into(),
        cfg.extract_params(),
    )?;
    info!(
        "{} references via {:?}",
        result.descriptors.len(),
        result.strategy
    );

    if let Some(path) = &args.report {
        let photo = Some(args.photo.to_string_lossy().into_owned());
        ExtractReport::from_result(photo, &result).write_json(path)?;
        info!("extraction report written to {}", path.display());
    }

    let library = ReferenceLibrary::from(result);
    match &args.out {
        Some(path) => {
            library.write_json(path)?;
            info!("library written to {}", path.display());
            Ok(())
        }
        None => print_json(&library),
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(args)))]
fn run_match(args: MatchArgs) -> CliResult<()> {
    let cfg = load_config(args.config.as_deref())?;
    let library = ReferenceLibrary::load_json(&args.library)?;
    if library.references.is_empty() {
        warn!("library {} holds no references", args.library.display());
    }
    let frame = load_rgba(&args.frame)?;

    let backend = piece_match::cpu::cpu_backend(&cfg.cpu_params());
    let candidates =
        detect::match_frame_with(backend, &frame, &library.references, cfg.match_params())?;
    info!("{} candidates", candidates.len());

    let report = MatchReport {
        frame: Some(args.frame.to_string_lossy().into_owned()),
        width: frame.width() as usize,
        height: frame.height() as usize,
        candidates,
    };
    match &args.out {
        Some(path) => {
            report.write_json(path)?;
            info!("report written to {}", path.display());
            Ok(())
        }
        None => print_json(&report),
    }
}
