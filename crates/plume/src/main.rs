//! plume: trace a photographed drawing and draw it with a robot arm.
//!
//! # Usage
//!
//! ```text
//! plume trace drawing.jpg --svg strokes.svg --png preview.png
//! plume trace photo.jpg --rectify --json > trajectory.json
//! plume draw drawing.jpg --config plume.toml --host 169.254.123.187
//! plume config > plume.toml
//! ```

#![allow(clippy::print_stdout)]

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use plume_pipeline::diagnostics::{
    Clock, PipelineDiagnostics, process_gray_with_diagnostics, process_staged_with_diagnostics,
};
use plume_pipeline::{
    CornerSelection, EdgeMethod, PipelineConfig, PipelineError, Point, StagedResult, grayscale,
    sheet,
};
use plume_robot::{CommandChannel, RtdeClient, run_session};

use crate::config::{AppConfig, ConfigError, RobotConfig};

/// Trace a photographed drawing into pen strokes and draw it with a
/// UR-style robot arm.
#[derive(Parser)]
#[command(name = "plume", version)]
struct Cli {
    /// TOML configuration file. Defaults apply to anything it omits.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline and report diagnostics or write previews.
    Trace(TraceArgs),
    /// Run the pipeline, then stream the trajectory to the robot.
    Draw(DrawArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Args)]
struct TraceArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Write an SVG of the ordered strokes.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write a PNG preview of the ordered strokes.
    #[arg(long)]
    png: Option<PathBuf>,

    /// Stroke width of the PNG preview in pixels.
    #[arg(long, default_value_t = 1.5)]
    line_width: f64,

    /// Print the trajectory as JSON instead of the diagnostics report.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DrawArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Robot controller address, overriding the configuration.
    #[arg(long)]
    host: Option<String>,
}

#[derive(Args)]
struct SourceArgs {
    /// Input image (PNG, JPEG, BMP, WebP).
    image: PathBuf,

    /// Find the sheet in the photo and straighten it first.
    #[arg(long, conflicts_with = "corners")]
    rectify: bool,

    /// Sheet corners in image pixels, straightened first:
    /// x1,y1,x2,y2,x3,y3,x4,y4 in any order.
    #[arg(long, value_parser = parse_corners)]
    corners: Option<CornerSelection>,
}

/// Pipeline overrides; unset flags keep the configured value.
#[derive(Args)]
struct PipelineArgs {
    /// Edge operator.
    #[arg(long, value_enum)]
    edge_method: Option<Method>,

    /// Gaussian blur sigma.
    #[arg(long)]
    blur_sigma: Option<f32>,

    /// Canny low threshold.
    #[arg(long)]
    canny_low: Option<f32>,

    /// Canny high threshold.
    #[arg(long)]
    canny_high: Option<f32>,

    /// Morphological closing radius (0 disables).
    #[arg(long)]
    closing_radius: Option<u8>,

    /// Polygon approximation tolerance in pixels.
    #[arg(long)]
    simplify_epsilon: Option<f64>,

    /// Keep every n-th contour point instead of approximating polygons.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    sample_stride: Option<usize>,

    /// Keep near-duplicate shapes.
    #[arg(long)]
    no_dedup: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Canny,
    Sobel,
    Laplacian,
}

impl PipelineArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(method) = self.edge_method {
            config.edge_method = match method {
                Method::Canny => EdgeMethod::Canny,
                Method::Sobel => EdgeMethod::Sobel,
                Method::Laplacian => EdgeMethod::Laplacian,
            };
        }
        if let Some(v) = self.blur_sigma {
            config.blur_sigma = v;
        }
        if let Some(v) = self.canny_low {
            config.canny_low = v;
        }
        if let Some(v) = self.canny_high {
            config.canny_high = v;
        }
        if let Some(v) = self.closing_radius {
            config.closing_radius = v;
        }
        if let Some(v) = self.simplify_epsilon {
            config.simplify_epsilon = v;
        }
        if self.sample_stride.is_some() {
            config.sample_stride = self.sample_stride;
        }
        if self.no_dedup {
            config.dedup = false;
        }
    }
}

/// Read `x,y` pairs into a complete corner selection.
fn parse_corners(s: &str) -> Result<CornerSelection, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() % 2 != 0 {
        return Err(format!("{} numbers do not form x,y pairs", values.len()));
    }

    let mut selection = CornerSelection::new();
    for pair in values.chunks_exact(2) {
        selection
            .push(Point::new(pair[0], pair[1]))
            .map_err(|extra| format!("more than four corners at ({}, {})", extra.x, extra.y))?;
    }
    if !selection.is_complete() {
        return Err(format!("expected four corners, got {}", selection.points().len()));
    }
    Ok(selection)
}

/// Errors surfaced by the binary.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("preview: {0}")]
    Export(#[from] plume_export::ExportError),

    #[error("robot link: {0}")]
    Link(#[from] plume_robot::LinkError),

    #[error("dashboard: {0}")]
    Command(#[from] plume_robot::CommandError),

    #[error("session: {0}")]
    Session(#[from] plume_robot::SessionError),

    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no sheet found in the image; pass --corners instead")]
    NoSheet,
}

fn read_file(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|source| AppError::File {
        path: path.to_owned(),
        source,
    })
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    std::fs::write(path, contents).map_err(|source| AppError::File {
        path: path.to_owned(),
        source,
    })?;
    log::info!("wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Output size for a straightened sheet: the longer of each pair of
/// opposite edges.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rectified_size(corners: [Point; 4]) -> (u32, u32) {
    let [tl, tr, br, bl] = sheet::order_corners(corners);
    let width = tl.distance(tr).max(bl.distance(br)).round().max(1.0);
    let height = tl.distance(bl).max(tr.distance(br)).round().max(1.0);
    (width as u32, height as u32)
}

/// Load the image, straighten it if asked, and run the pipeline.
fn run_pipeline(
    source: &SourceArgs,
    config: &AppConfig,
) -> Result<(StagedResult, PipelineDiagnostics), AppError> {
    let bytes = read_file(&source.image)?;
    log::info!("{}: {} bytes", source.image.display(), bytes.len());

    let corners = if source.rectify {
        let gray = grayscale::decode_and_grayscale(&bytes)?;
        let corners = sheet::detect_sheet(&gray).ok_or(AppError::NoSheet)?;
        Some((gray, corners))
    } else if let Some(corners) = source.corners.as_ref().and_then(CornerSelection::corners) {
        Some((grayscale::decode_and_grayscale(&bytes)?, corners))
    } else {
        None
    };

    let result = match corners {
        Some((gray, corners)) => {
            let (width, height) = rectified_size(corners);
            log::info!("straightening sheet {corners:?} to {width}x{height}");
            let rectified = sheet::rectify(&gray, corners, width, height)?;
            process_gray_with_diagnostics(rectified, &config.pipeline, &config.paper, &StdClock)?
        }
        None => {
            process_staged_with_diagnostics(&bytes, &config.pipeline, &config.paper, &StdClock)?
        }
    };
    Ok(result)
}

fn trace(args: &TraceArgs, mut config: AppConfig) -> Result<(), AppError> {
    args.pipeline.apply(&mut config.pipeline);
    let (staged, diagnostics) = run_pipeline(&args.source, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&staged.trajectory)?);
    } else {
        println!("{}", diagnostics.report());
    }

    if let Some(path) = &args.svg {
        let title = args.source.image.file_stem().and_then(|s| s.to_str());
        let description = format!("{:?}", config.pipeline);
        let metadata = plume_export::SvgMetadata {
            title,
            description: Some(&description),
        };
        let svg = plume_export::to_svg(&staged.strokes, staged.dimensions, &metadata);
        write_file(path, svg.as_bytes())?;
    }

    if let Some(path) = &args.png {
        let preview =
            plume_export::render_preview(&staged.strokes, staged.dimensions, args.line_width)?;
        write_file(path, &plume_export::encode_png(&preview)?)?;
    }
    Ok(())
}

/// Open both robot connections. The dashboard comes first: once the
/// register link is up the controller expects a pause before it closes.
fn connect_robot(robot: &RobotConfig) -> Result<(RtdeClient, CommandChannel), AppError> {
    let commands = CommandChannel::connect(&robot.host, robot.dashboard_port)?;
    let link = RtdeClient::connect(
        &robot.host,
        robot.rtde_port,
        &robot.registers,
        robot.frequency_hz,
    )?;
    Ok((link, commands))
}

fn draw(args: &DrawArgs, mut config: AppConfig) -> Result<(), AppError> {
    args.pipeline.apply(&mut config.pipeline);
    if let Some(host) = &args.host {
        config.robot.host.clone_from(host);
    }

    let (staged, diagnostics) = run_pipeline(&args.source, &config)?;
    log::info!(
        "{} strokes, {} waypoints, pipeline took {:.1} ms",
        staged.strokes.len(),
        staged.trajectory.len(),
        diagnostics.total_duration.as_secs_f64() * 1000.0
    );

    let (link, commands) = connect_robot(&config.robot)?;
    let report = run_session(link, commands, staged.trajectory, &config.session())?;

    log::info!(
        "drawing finished: {} waypoints in {} cycles",
        report.stream.waypoints_sent,
        report.stream.cycles
    );
    Ok(())
}

fn run(cli: &Cli, config: AppConfig) -> Result<(), AppError> {
    match &cli.command {
        Command::Trace(args) => trace(args, config),
        Command::Draw(args) => draw(args, config),
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = cli
        .config
        .as_deref()
        .map_or_else(|| Ok(AppConfig::default()), AppConfig::from_file);
    let level = config.as_ref().map_or("info", |c| c.logging.level.as_str());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match config.map_err(AppError::from).and_then(|config| run(&cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
