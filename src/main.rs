use anyhow::Context;
use clap::{Parser, Subcommand};
use stack_registration::config::{load_config_or_default, LogMode};
use stack_registration::logging::init_logging;
use stack_registration::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "stackreg")]
#[command(about = "Register image sequences against a reference slice")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON or TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce an RGB sequence to grayscale along its principal color axis
    Reduce {
        /// RGB slices, in sequence order
        #[arg(short, long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the reduced slices
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Fit a transform to anchor correspondences
    Estimate {
        /// translation, rigid-body, scaled-rotation or affine
        #[arg(short, long)]
        family: String,

        /// Source anchors as "x,y;x,y;..."
        #[arg(short, long)]
        source: String,

        /// Target anchors as "x,y;x,y;..."
        #[arg(short, long)]
        target: String,
    },

    /// Replay a transform log over a grayscale sequence
    Replay {
        /// Transform log written by a previous registration
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// Reference slice index (defaults to the configured one, then the middle slice)
        #[arg(short, long)]
        reference: Option<usize>,

        /// Transform family the log was written with
        #[arg(short, long)]
        family: Option<String>,

        /// Grayscale slices, in sequence order
        #[arg(short, long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the warped slices
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config_or_default(cli.config.as_deref());
    let logging = config.logging.clone().with_verbosity(cli.verbose);
    let _guard = init_logging(&logging)?;

    match cli.command {
        Commands::Reduce { inputs, output } => handle_reduce(&config, &inputs, &output)?,
        Commands::Estimate {
            family,
            source,
            target,
        } => handle_estimate(&family, &source, &target)?,
        Commands::Replay {
            log,
            reference,
            family,
            inputs,
            output,
        } => {
            let mut config = config;
            if let Some(log) = log {
                config.registration.log_path = log;
            }
            if let Some(reference) = reference {
                config.registration.reference_index = Some(reference);
            }
            if let Some(family) = family {
                config.registration.family = family.parse()?;
            }
            config.registration.log_mode = LogMode::Replay;
            handle_replay(&config, &inputs, &output)?;
        }
    }

    Ok(())
}

fn handle_reduce(config: &config::Config, inputs: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let images = load_rgb_sequence(inputs)?;
    let stack = ColorStack::from_rgb_images(&images)?;
    let reduction = RegistrationPipeline::new(config).reduce(&stack);
    save_planes(&reduction.planes, output)?;
    println!("{}", serde_json::to_string_pretty(&reduction.weights)?);
    Ok(())
}

fn handle_estimate(family: &str, source: &str, target: &str) -> anyhow::Result<()> {
    let family: TransformFamily = family.parse()?;
    let source = parse_anchors(source).context("invalid --source anchors")?;
    let target = parse_anchors(target).context("invalid --target anchors")?;
    let matrix = family.estimate(&source, &target)?;
    println!("{}", serde_json::to_string_pretty(&matrix)?);
    Ok(())
}

fn handle_replay(config: &config::Config, inputs: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let planes = load_gray_sequence(inputs)?;
    let pipeline = RegistrationPipeline::new(config);
    let aligned = pipeline
        .replay(&planes)
        .with_context(|| format!("replaying {}", config.registration.log_path.display()))?;
    save_planes(&aligned.planes, output)?;
    println!("{}", serde_json::to_string_pretty(&aligned.chain)?);
    Ok(())
}

fn parse_anchors(text: &str) -> anyhow::Result<AnchorSet> {
    let mut points = Vec::new();
    for pair in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (x, y) = pair
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("expected \"x,y\", got {:?}", pair))?;
        points.push([x.trim().parse::<f64>()?, y.trim().parse::<f64>()?]);
    }
    Ok(AnchorSet::new(points))
}
