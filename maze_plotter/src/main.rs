// main.rs - maze-portrait: turn a portrait into a plottable maze

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::info;

use maze_core::{GrayBuffer, MazeArtifact, MazeConfig, MazeSession};
use maze_plotter::{
    estimate, plan_job, plot_segments, PlotSegment, PlotState, PlotterBridge, PlotterConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the maze and write it as SVG
    Generate {
        #[command(flatten)]
        maze: MazeArgs,

        /// Output SVG path
        #[arg(short, long, default_value = "maze.svg")]
        output: PathBuf,

        /// Also write a JSON snapshot of cells and passages
        #[arg(long)]
        json: Option<PathBuf>,

        /// Generate this many consecutive seeds in parallel
        #[arg(long, default_value = "1")]
        batch: u64,
    },
    /// Print the expected plot duration
    Estimate {
        #[command(flatten)]
        maze: MazeArgs,

        /// Plotter settings (JSON)
        #[arg(short, long)]
        plotter: Option<PathBuf>,
    },
    /// Draw the maze on a connected plotter
    Plot {
        #[command(flatten)]
        maze: MazeArgs,

        /// Plotter settings (JSON)
        #[arg(short, long)]
        plotter: Option<PathBuf>,

        /// Controller address, host:port
        #[arg(short, long)]
        device: Option<String>,

        /// Print the command stream instead of plotting
        #[arg(long)]
        dry_run: bool,

        /// Only raise and lower the pen once
        #[arg(long)]
        test_pen: bool,
    },
}

#[derive(ClapArgs, Debug)]
pub struct MazeArgs {
    /// Portrait image (PNG or JPEG)
    pub image: PathBuf,

    /// Maze settings (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the configured seed
    #[arg(short, long)]
    pub seed: Option<u64>,
}

impl MazeArgs {
    fn session(&self) -> Result<MazeSession> {
        let mut config = match &self.config {
            Some(path) => MazeConfig::from_json_file(path)
                .with_context(|| format!("Failed to load maze config {}", path.display()))?,
            None => MazeConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        let image = GrayBuffer::open(&self.image)
            .with_context(|| format!("Failed to read image {}", self.image.display()))?;
        info!("Loaded {} ({}x{})", self.image.display(), image.width(), image.height());
        Ok(MazeSession::new(&image, config)?)
    }
}

fn load_plotter_config(path: Option<&Path>) -> Result<PlotterConfig> {
    let Some(path) = path else {
        return Ok(PlotterConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plotter config {}", path.display()))?;
    PlotterConfig::from_json(&text)
        .with_context(|| format!("Invalid plotter config {}", path.display()))
}

fn segments_for(
    session: &MazeSession,
    artifact: &MazeArtifact,
    plotter: &PlotterConfig,
) -> Vec<PlotSegment> {
    plot_segments(
        &artifact.chains,
        artifact.maze.width(),
        artifact.maze.height(),
        &session.config().stroke,
        plotter,
    )
}

async fn write_artifact(
    session: &MazeSession,
    artifact: &MazeArtifact,
    output: &Path,
    json: Option<&Path>,
) -> Result<()> {
    let svg = session.render_svg(artifact);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(output, svg)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(
        "Wrote {} ({} walls, {} chains, {:.0} units pen-up over {} lifts)",
        output.display(),
        artifact.walls.len(),
        artifact.chains.len(),
        artifact.travel.pen_up,
        artifact.travel.lifts
    );

    if let Some(json) = json {
        let snapshot = serde_json::to_string_pretty(&artifact.maze.snapshot())?;
        tokio::fs::write(json, snapshot)
            .await
            .with_context(|| format!("Failed to write {}", json.display()))?;
        info!("Wrote snapshot {}", json.display());
    }
    Ok(())
}

/// `out.svg` becomes `out-<seed>.svg` for batch runs.
fn with_seed(path: &Path, seed: u64) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("maze");
    let mut name = format!("{stem}-{seed}");
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        name.push('.');
        name.push_str(ext);
    }
    path.with_file_name(name)
}

async fn generate(maze: &MazeArgs, output: &Path, json: Option<&Path>, batch: u64) -> Result<()> {
    let session = maze.session()?;
    if batch <= 1 {
        let artifact = session.generate()?;
        return write_artifact(&session, &artifact, output, json).await;
    }

    let first = session.config().seed;
    let seeds: Vec<u64> = (0..batch).map(|i| first.wrapping_add(i)).collect();
    let artifacts = session.generate_batch(&seeds)?;
    for artifact in &artifacts {
        let json = json.map(|j| with_seed(j, artifact.seed));
        let output = with_seed(output, artifact.seed);
        write_artifact(&session, artifact, &output, json.as_deref()).await?;
    }
    Ok(())
}

async fn plot(
    maze: &MazeArgs,
    plotter: PlotterConfig,
    device: Option<&str>,
    dry_run: bool,
    test_pen: bool,
) -> Result<()> {
    let bridge = Arc::new(PlotterBridge::new(plotter)?);

    if test_pen {
        let Some(addr) = device else {
            bail!("--test-pen needs --device");
        };
        bridge.connect_tcp(addr).await.with_context(|| format!("Failed to connect to {addr}"))?;
        let version = bridge.test_pen().await?;
        println!("Pen test OK ({version})");
        return Ok(());
    }

    let session = maze.session()?;
    let artifact = session.generate()?;
    let segments = segments_for(&session, &artifact, bridge.config());
    let est = estimate(&segments, bridge.config());
    info!("{} strokes, estimated {:.1} min", segments.len(), est.seconds / 60.0);

    if dry_run {
        for command in plan_job(&segments, bridge.config()) {
            println!("{command}");
        }
        return Ok(());
    }

    let Some(addr) = device else {
        bail!("plotting needs --device host:port (or --dry-run)");
    };
    bridge.connect_tcp(addr).await.with_context(|| format!("Failed to connect to {addr}"))?;

    let control = bridge.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current stroke");
            control.stop();
        }
    });

    let mut progress = bridge.progress();
    tokio::spawn(async move {
        let mut last_logged = 0;
        while progress.changed().await.is_ok() {
            let p = progress.borrow_and_update().clone();
            let done = p.current * 10 / p.total.max(1);
            if done > last_logged || p.state != PlotState::Plotting {
                last_logged = done;
                info!("{:?}: {}/{} strokes", p.state, p.current, p.total);
            }
        }
    });

    let outcome = bridge.plot(&segments).await?;
    bridge.disconnect().await?;
    if outcome.stopped {
        println!("Stopped after {}/{} strokes", outcome.plotted, outcome.total);
    } else {
        println!("Plotted {} strokes (job {})", outcome.plotted, outcome.job_id);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Starting with {args:?}");

    match &args.command {
        Command::Generate { maze, output, json, batch } => {
            generate(maze, output, json.as_deref(), *batch).await
        }
        Command::Estimate { maze, plotter } => {
            let plotter = load_plotter_config(plotter.as_deref())?;
            let session = maze.session()?;
            let artifact = session.generate()?;
            let segments = segments_for(&session, &artifact, &plotter);
            let est = estimate(&segments, &plotter);
            println!(
                "{} strokes, {} repositions, {:.0} draw + {:.0} travel steps: {:.1} min",
                segments.len(),
                est.repositions,
                est.draw_steps,
                est.travel_steps,
                est.seconds / 60.0
            );
            Ok(())
        }
        Command::Plot { maze, plotter, device, dry_run, test_pen } => {
            let plotter = load_plotter_config(plotter.as_deref())?;
            plot(maze, plotter, device.as_deref(), *dry_run, *test_pen).await
        }
    }
}
