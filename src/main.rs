// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use codecast::input::{self, StopSignal};
use codecast::loader::{self, InitOutcome, LoadError};
use codecast::render::{Renderer, TerminalGuard};
use codecast::{ManualGate, Pacing, Player, Program, Summary, Workbench};

#[derive(Parser)]
#[command(name = "codecast")]
#[command(about = "Replay scripted live coding with human-looking typing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the instructions found for a workspace
    Start(StartArgs),
    /// Write a starter instructions.json into a workspace
    Init(InitArgs),
}

#[derive(Args)]
struct StartArgs {
    /// Workspace directory (defaults to the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Override the keystroke delay in milliseconds
    #[arg(long)]
    delay: Option<u64>,

    /// Override the keystroke jitter in milliseconds
    #[arg(long)]
    randomness: Option<u64>,

    /// Seed the jitter for reproducible playback
    #[arg(long)]
    seed: Option<u64>,

    /// Run without drawing; resume manual waits with Enter on stdin
    #[arg(long)]
    headless: bool,

    /// Write logs to this file
    #[arg(long)]
    log: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct InitArgs {
    /// Workspace directory (defaults to the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Overwrite an existing instructions.json without asking
    #[arg(short, long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => start(args).await,
        Commands::Init(args) => init(args),
    }
}

fn init_logging(args: &StartArgs) -> Result<()> {
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // The terminal belongs to the view, so logs only go to stderr headless
    if let Some(path) = &args.log {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn resolve_workspace(workspace: Option<&Path>) -> Result<PathBuf> {
    let dir = match workspace {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("Workspace {} not found", dir.display()))
}

async fn start(args: StartArgs) -> Result<()> {
    init_logging(&args)?;
    let workspace = resolve_workspace(args.workspace.as_deref())?;

    let loaded = match loader::load_program(&workspace) {
        Ok(loaded) => loaded,
        Err(LoadError::NotFound { searched }) => {
            eprintln!("{}", loader::not_found_message(&searched));
            println!("Nothing to play.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut settings = loaded.settings()?;
    if let Some(delay) = args.delay {
        settings.delay = delay;
    }
    if let Some(randomness) = args.randomness {
        settings.randomness = randomness;
    }
    let seed = args.seed.or(settings.seed);

    let program = loaded.program;
    if program.is_empty() {
        println!("Nothing to play.");
        return Ok(());
    }

    let gate = ManualGate::new();
    let stop = StopSignal::new();

    if args.headless {
        input::install_ctrlc(stop.clone())?;
        input::spawn_line_listener(gate.clone());

        let workbench = Workbench::headless(Some(workspace));
        let mut player = Player::new(workbench, settings, Pacing::realtime(seed), gate)
            .with_stop_flag(stop.running_flag());
        let summary = play(&mut player, program, &stop).await;
        // Without a log file the errors were already logged to stderr
        let errors: &[String] = if args.log.is_some() { player.host().errors() } else { &[] };
        report(&summary, errors);

        if let Some(document) = player.host().active_document() {
            print!("{}", document.text());
            std::io::stdout().flush()?;
        }
        return Ok(());
    }

    let guard = TerminalGuard::enter()?;
    let renderer = Renderer::new()?;
    input::spawn_key_listener(gate.clone(), stop.clone());

    let workbench = Workbench::with_view(Some(workspace), renderer);
    let mut player = Player::new(workbench, settings, Pacing::realtime(seed), gate)
        .with_stop_flag(stop.running_flag());
    player.host_mut().redraw()?;

    let summary = play(&mut player, program, &stop).await;
    if !summary.stopped {
        // Leave the result on screen until the presenter quits
        stop.stopped().await;
    }

    drop(guard);
    report(&summary, player.host().errors());
    Ok(())
}

async fn play(player: &mut Player<Workbench>, program: Program, stop: &StopSignal) -> Summary {
    tokio::select! {
        summary = player.execute(program) => summary,
        _ = stop.stopped() => {
            info!("playback interrupted");
            Summary {
                stopped: true,
                ..Summary::default()
            }
        }
    }
}

fn report(summary: &Summary, errors: &[String]) {
    for error in errors {
        eprintln!("codecast: {error}");
    }
    if summary.stopped {
        eprintln!("Playback stopped.");
    }
    if summary.failed > 0 {
        eprintln!(
            "{} of {} instructions failed.",
            summary.failed,
            summary.executed + summary.failed
        );
    }
}

fn init(args: InitArgs) -> Result<()> {
    let workspace = resolve_workspace(args.workspace.as_deref())?;
    let force = args.force;

    let outcome = loader::init(&workspace, |path| {
        if force {
            return Ok(true);
        }
        print!("{} already exists. Overwrite? [y/N] ", path.display());
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
    })?;

    match outcome {
        InitOutcome::Created(path) => println!("Created {}", path.display()),
        InitOutcome::Overwritten(path) => println!("Overwrote {}", path.display()),
        InitOutcome::Kept(path) => println!("Kept {}", path.display()),
    }
    Ok(())
}
