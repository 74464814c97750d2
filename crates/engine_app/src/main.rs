//! # engine_app
//!
//! Headless runner for the deterministic simulation. Plays a session with
//! scripted input, optionally records the input log, or replays a log and
//! reports the resulting state hash so peers can compare runs.

mod config;
mod session;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use engine_sim::{InputLog, Registry, replay};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use session::{Session, spawn_players};

#[derive(Parser)]
#[command(name = "engine_app", about = "Run, record and replay deterministic simulation sessions")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the simulation seed
    #[arg(short, long)]
    seed: Option<String>,

    /// Override the number of frames to run
    #[arg(short, long)]
    frames: Option<u64>,

    /// Override the number of players
    #[arg(short, long)]
    players: Option<u8>,

    /// Write the recorded input log to this file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Replay an input log instead of generating input
    #[arg(long, conflicts_with = "record")]
    replay: Option<PathBuf>,

    /// Print the component and pipeline schema as JSON and exit
    #[arg(long)]
    schema: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(frames) = args.frames {
        config.session.frames = frames;
    }
    if let Some(players) = args.players {
        config.session.players = players;
    }

    let registry = Rc::new(Registry::with_builtins()?);

    if args.schema {
        println!("{}", serde_json::to_string_pretty(&registry.schema_json())?);
        return Ok(());
    }

    if let Some(path) = &args.replay {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading input log {}", path.display()))?;
        let log = InputLog::from_bytes(&bytes)?;
        info!(path = %path.display(), frames = log.len(), seed = %log.seed, "replaying");
        let players = config.session.players;
        let sim = replay(registry, config.simulation, &log, |sim| {
            spawn_players(sim, players)
        })?;
        println!("frame {} hash {:016x}", sim.frame(), sim.state_hash()?);
        return Ok(());
    }

    let mut session = Session::new(registry, &config)?;
    if args.record.is_some() {
        session.start_recording();
    }
    let hash = session.run()?;

    if let Some(path) = &args.record
        && let Some(log) = session.take_recording()?
    {
        std::fs::write(path, log.to_bytes()?)
            .with_context(|| format!("writing input log {}", path.display()))?;
        info!(path = %path.display(), frames = log.len(), "input log written");
    }

    println!("frame {} hash {hash:016x}", session.simulation().frame());
    Ok(())
}
