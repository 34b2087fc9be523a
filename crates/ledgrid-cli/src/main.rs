//! ledgrid CLI — measure per-LED brightness in photographs of LED arrays.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use ledgrid::{
    Analyzer, AnalyzerConfig, Boundary, GridSpec, MeasureMethod, MeasurementSet, Point, Scene,
    SessionState,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "ledgrid")]
#[command(about = "Measure per-LED brightness in photographs of LED arrays")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure an LED array and write the result table.
    Measure(CliMeasureArgs),

    /// Detect LED candidates and report them (with the pitch estimate).
    Detect(CliDetectArgs),
}

#[derive(Debug, Clone, Args)]
struct CliMeasureArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Optional background frame of identical dimensions.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Logical array size n (n×n grid).
    #[arg(long, default_value = "8")]
    size: usize,

    /// Boundary corners as "tlx,tly;trx,try;brx,bry;blx,bly".
    #[arg(long)]
    corners: Option<String>,

    /// Measurement method.
    #[arg(long, value_enum, default_value_t = MethodArg::Direct)]
    method: MethodArg,

    /// JSON file with manual click points (array of {"x":..,"y":..},
    /// row-major). Required with --method manual.
    #[arg(long)]
    points: Option<PathBuf>,

    /// Run automatic candidate detection instead of pure grid mapping.
    #[arg(long)]
    auto: bool,

    /// Restrict detection to the boundary quadrilateral.
    #[arg(long, requires = "corners")]
    restrict: bool,

    /// Sampling window side in pixels (odd, 3..=15).
    #[arg(long, default_value = "5")]
    sample_size: u32,

    /// Enhance dark regions before detection.
    #[arg(long)]
    enhance: bool,

    /// Sample the enhanced buffer instead of the original pixels.
    #[arg(long, requires = "enhance")]
    sample_enhanced: bool,

    /// Subtract the background frame before averaging.
    #[arg(long, requires = "background")]
    subtract_background: bool,

    /// Path to write the measurement table (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Also write the table as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also write a session file for later reloading.
    #[arg(long)]
    session: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Boundary corners as "tlx,tly;trx,try;brx,bry;blx,bly"; when given,
    /// detection is restricted to the quadrilateral.
    #[arg(long)]
    corners: Option<String>,

    /// Enhance dark regions before detection.
    #[arg(long)]
    enhance: bool,

    /// Path to write detected candidates (JSON).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Direct,
    Interpolation,
    Manual,
}

impl MethodArg {
    fn to_core(self) -> MeasureMethod {
        match self {
            Self::Direct => MeasureMethod::Direct,
            Self::Interpolation => MeasureMethod::Interpolation,
            Self::Manual => MeasureMethod::Manual,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Interpolation => "interpolation",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for MethodArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Measure(args) => run_measure(&args),
        Commands::Detect(args) => run_detect(&args),
    }
}

// ── shared parsing ─────────────────────────────────────────────────────────

fn parse_corners(spec: &str) -> CliResult<Boundary> {
    let mut points = Vec::new();
    for part in spec.split(';') {
        let (x, y) = part
            .split_once(',')
            .ok_or_else(|| -> CliError { format!("corner '{}' is not 'x,y'", part).into() })?;
        points.push(Point::new(x.trim().parse()?, y.trim().parse()?));
    }
    Ok(Boundary::from_points(&points)?)
}

fn load_rgb(path: &Path) -> CliResult<image::RgbImage> {
    let img = image::open(path)
        .map_err(|e| -> CliError { format!("failed to open {}: {}", path.display(), e).into() })?;
    Ok(img.to_rgb8())
}

fn load_points(path: &Path) -> CliResult<Vec<Point>> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

// ── measure ────────────────────────────────────────────────────────────────

fn run_measure(args: &CliMeasureArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let img = load_rgb(&args.image)?;
    let (w, h) = img.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let scene = match &args.background {
        Some(path) => Scene::with_background(img, load_rgb(path)?)?,
        None => Scene::new(img),
    };

    let mut config = AnalyzerConfig {
        method: args.method.to_core(),
        enhance_enabled: args.enhance,
        sample_enhanced: args.sample_enhanced,
        restrict_to_boundary: args.restrict,
        ..Default::default()
    };
    config.sample.sample_size = args.sample_size;
    config.sample.subtract_background = args.subtract_background;
    let analyzer = Analyzer::with_config(config);

    let result = match args.method {
        MethodArg::Manual => {
            let points_path = args.points.as_ref().ok_or_else(|| -> CliError {
                "--method manual requires --points".into()
            })?;
            let points = load_points(points_path)?;
            analyzer.measure_manual(&scene, &points, args.size, args.size)?
        }
        _ => {
            let corners = args.corners.as_ref().ok_or_else(|| -> CliError {
                "grid measurement requires --corners".into()
            })?;
            let boundary = parse_corners(corners)?;
            let spec = GridSpec::square(args.size, boundary)?;
            if args.auto {
                analyzer.measure_auto(&scene, &spec)?
            } else {
                analyzer.measure_grid(&scene, &spec)?
            }
        }
    };

    let n_interp = result.n_interpolated();
    tracing::info!(
        "Measured {} LEDs ({} interpolated)",
        result.measurements.len(),
        n_interp
    );
    if result.measurements.is_empty() && args.auto {
        tracing::warn!("Could not find enough LED candidates; consider --enhance or manual mode");
    }

    let json = serde_json::to_string_pretty(&result)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());

    if let Some(csv_path) = &args.csv {
        write_csv(csv_path, &result, args.method)?;
        tracing::info!("CSV written to {}", csv_path.display());
    }

    if let Some(session_path) = &args.session {
        let state = build_session(args, &result)?;
        std::fs::write(session_path, serde_json::to_string_pretty(&state)?)?;
        tracing::info!("Session written to {}", session_path.display());
    }

    Ok(())
}

fn write_csv(path: &Path, result: &MeasurementSet, method: MethodArg) -> CliResult<()> {
    use std::fmt::Write as _;

    let mut out = String::new();
    writeln!(
        out,
        "led_id,row,col,brightness,r,g,b,interpolated,measurement_method"
    )?;
    for (i, m) in result.measurements.iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{:.1},{:.1},{:.1},{:.1},{},{}",
            i + 1,
            m.row,
            m.col,
            m.brightness,
            m.r,
            m.g,
            m.b,
            m.interpolated,
            method.as_str()
        )?;
    }
    std::fs::write(path, out)?;
    Ok(())
}

fn build_session(args: &CliMeasureArgs, result: &MeasurementSet) -> CliResult<SessionState> {
    let mut state = SessionState::empty(args.size);
    state.image_path = Some(args.image.display().to_string());
    state.background_path = args.background.as_ref().map(|p| p.display().to_string());
    if let Some(corners) = &args.corners {
        state.corners = Some(parse_corners(corners)?.corners().to_vec());
    }
    if let Some(points_path) = &args.points {
        state.manual_points = Some(load_points(points_path)?);
    }
    state.sample.sample_size = args.sample_size;
    state.sample.subtract_background = args.subtract_background;
    state.method = args.method.to_core();
    state.measurements = result.measurements.clone();
    Ok(state)
}

// ── detect ─────────────────────────────────────────────────────────────────

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let img = load_rgb(&args.image)?;

    let boundary = args.corners.as_deref().map(parse_corners).transpose()?;

    let input = if args.enhance {
        ledgrid::enhance::enhance(&img, &ledgrid::EnhanceConfig::default())
    } else {
        img
    };
    let outcome = ledgrid::detect::detect(&input, boundary.as_ref(), &ledgrid::DetectConfig::default());

    tracing::info!(
        "{} candidates survived filtering",
        outcome.n_survivors
    );
    if let Some(pitch) = &outcome.pitch {
        tracing::info!(
            "Pitch estimate: {:.1}px horizontal, {:.1}px vertical",
            pitch.horizontal_px,
            pitch.vertical_px
        );
    }
    if outcome.candidates.is_empty() {
        tracing::warn!("Could not find enough LED candidates");
    }

    let json = serde_json::to_string_pretty(&outcome)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Candidates written to {}", args.out.display());
    Ok(())
}
