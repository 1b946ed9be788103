/// Cadence - headless playback driver
use anyhow::Context;
use cadence_cli::{
    collaborators,
    config::CliConfig,
    describe,
    library::{read_item, DirectoryCatalogue},
    repl::{format_time, parse_line, Input, HELP},
};
use cadence_core::{Locator, SilenceScanner, Track};
use cadence_playback::{
    corrected_duration, PlaybackEvent, PlaybackService, ServiceHandle, SymphoniaScanner,
};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Headless Cadence playback engine", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Library directory (repeatable; replaces the configured roots)
    #[arg(short, long, global = true)]
    library: Vec<PathBuf>,

    /// State file path
    #[arg(long, global = true, env = "CADENCE_STATE")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive player (default)
    Run {
        /// Print time-display ticks
        #[arg(long)]
        show_time: bool,
    },
    /// List the catalogue
    Scan,
    /// Measure trailing silence in one file
    Probe {
        /// Audio file path
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info,cadence_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if !cli.library.is_empty() {
        config.library.roots = cli.library;
    }
    if let Some(state) = cli.state {
        config.state.path = state;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run { show_time: false }) {
        Commands::Run { show_time } => run(&config, show_time)?,
        Commands::Scan => scan(&config),
        Commands::Probe { path } => probe(&config, path)?,
    }

    Ok(())
}

fn run(config: &CliConfig, show_time: bool) -> anyhow::Result<()> {
    tracing::info!(
        roots = ?config.library.roots,
        state = %config.state.path.display(),
        "Starting Cadence"
    );

    let (service, events) = PlaybackService::spawn(collaborators(config), config.engine.clone())
        .context("Failed to start playback service")?;
    let handle = service.handle();

    let printer = thread::Builder::new()
        .name("cadence-events".to_string())
        .spawn(move || {
            for event in events {
                if !show_time && matches!(event, PlaybackEvent::TimeChanged { .. }) {
                    continue;
                }
                println!("{}", describe(&event));
            }
        })
        .context("Failed to start event printer")?;

    println!("Type 'help' for commands.");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read input")?;
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Input::Quit)) => break,
            Ok(Some(Input::Help)) => println!("{HELP}"),
            Ok(Some(Input::Status)) => print_status(&handle)?,
            Ok(Some(Input::Command(command))) => handle.send(command)?,
            Err(message) => println!("{message}"),
        }
        io::stdout().flush()?;
    }

    service.shutdown();
    if printer.join().is_err() {
        tracing::warn!("Event printer panicked");
    }
    Ok(())
}

fn print_status(handle: &ServiceHandle) -> anyhow::Result<()> {
    let snapshot = handle.snapshot()?;
    let track = snapshot
        .track
        .as_ref()
        .map_or_else(|| "(none)".to_string(), Track::to_string);
    println!(
        "{} | repeat {} | {}/{} | {} | {} / {}",
        snapshot.state,
        snapshot.repeat_mode,
        if snapshot.track_count == 0 { 0 } else { snapshot.cursor + 1 },
        snapshot.track_count,
        track,
        format_time(snapshot.elapsed),
        format_time(snapshot.duration),
    );
    Ok(())
}

fn scan(config: &CliConfig) {
    let catalogue = DirectoryCatalogue::new(config.library.roots.clone())
        .follow_links(config.library.follow_links);
    let files = catalogue.scan();

    for path in &files {
        let item = read_item(path);
        let track = Track::resolve(&item);
        println!(
            "{:>20}  {:>6}  {}",
            track.id,
            format_time(track.duration),
            track
        );
    }
    println!("{} tracks", files.len());
}

fn probe(config: &CliConfig, path: PathBuf) -> anyhow::Result<()> {
    let trim = &config.engine.silence_trim;
    let scanner = SymphoniaScanner::new(trim.threshold);
    let never = AtomicBool::new(false);

    let extent = scanner
        .scan(&Locator::from_path(&path), &never)
        .with_context(|| format!("Failed to scan {}", path.display()))?
        .context("Scan was cancelled")?;

    println!("length:        {:.2}s", extent.total.as_secs_f64());
    match extent.last_audible {
        Some(last) => println!("last audible:  {:.2}s", last.as_secs_f64()),
        None => println!("last audible:  (silent)"),
    }
    match corrected_duration(extent, trim) {
        Some(refined) => println!("refined:       {:.2}s", refined.as_secs_f64()),
        None => println!("refined:       unchanged"),
    }
    Ok(())
}
