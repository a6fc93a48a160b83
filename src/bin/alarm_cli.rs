use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use puzzle_alarm::audio::{CpalBackend, OutputBackend, SilentBackend};
use puzzle_alarm::config::AppConfig;
use puzzle_alarm::error::ErrorCode;
use puzzle_alarm::quotes::QuotePool;
use puzzle_alarm::recommend::{DisabledSink, HttpRecommendationSink, RecommendationSink};
use puzzle_alarm::scheduler::{parse_schedule, Scheduler};
use puzzle_alarm::session::{RingingSession, SessionEvent, SessionOutcome};
use tokio::io::BufReader;
use tokio::sync::broadcast;

/// Exit status when the schedule token cannot be parsed
const EXIT_PARSE_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "alarm_cli",
    about = "Console alarm that only stops once a puzzle is solved"
)]
struct Cli {
    /// Alarm time: HH:mm (24-hour) or +N minutes from now
    time: String,
    /// JSON configuration file (defaults to assets/alarm_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Line-delimited quote file shown after solving
    #[arg(long)]
    quotes: Option<PathBuf>,
    /// Base URL of the difficulty recommendation service
    #[arg(long)]
    recommender_url: Option<String>,
    /// Never contact the recommendation service
    #[arg(long)]
    no_recommender: bool,
    /// Do not open an audio device; ring with silent beeps only
    #[arg(long)]
    silent: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = resolve_config(&cli);

    let now = Local::now();
    let trigger = match parse_schedule(&cli.time, &now) {
        Ok(trigger) => trigger,
        Err(err) => {
            eprintln!("{} (error {})", err.message(), err.code());
            eprintln!("Expected HH:mm (e.g. 07:30) or +N minutes (e.g. +5).");
            return Ok(ExitCode::from(EXIT_PARSE_ERROR));
        }
    };

    let fire_at: DateTime<Local> = trigger
        .fire_at_utc()
        .context("armed time is out of range")?
        .with_timezone(&Local);

    let backend: Arc<dyn OutputBackend> = if config.audio.enabled {
        Arc::new(CpalBackend::new())
    } else {
        Arc::new(SilentBackend::new())
    };
    let sink = build_sink(&config);
    let quotes = Arc::new(QuotePool::load(
        cli.quotes.clone().unwrap_or_else(|| config.quotes.path.clone()),
    ));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let outcome = runtime.block_on(async move {
        println!("Alarm scheduled for: {}", fire_at.format("%Y-%m-%d %H:%M:%S"));
        tracing::info!(fire_at = %fire_at, "alarm armed");

        let handle = Scheduler::system().arm(trigger, move || async move {
            let session = RingingSession::new(&config, backend, sink, quotes)?;
            let renderer = tokio::spawn(render_events(session.subscribe()));
            let outcome = session.run(BufReader::new(tokio::io::stdin())).await;
            let _ = renderer.await;
            outcome
        });

        handle.wait().await
    });
    // A pending stdin read must not hold the process open
    runtime.shutdown_background();

    match outcome {
        Ok(Ok(SessionOutcome::Solved(report))) => {
            tracing::info!(
                attempts = report.total_attempts,
                difficulty = report.final_difficulty.level(),
                "alarm solved"
            );
            Ok(ExitCode::SUCCESS)
        }
        Ok(Ok(SessionOutcome::InputClosed)) => {
            eprintln!("Input closed before the alarm was solved.");
            Ok(ExitCode::from(1))
        }
        Ok(Err(err)) | Err(err) => Err(anyhow::Error::new(err).context("alarm session failed")),
    }
}

fn resolve_config(cli: &Cli) -> AppConfig {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    if let Some(url) = &cli.recommender_url {
        config.recommender.base_url = url.clone();
    }
    if cli.no_recommender {
        config.recommender.enabled = false;
    }
    if cli.silent {
        config.audio.enabled = false;
    }
    config
}

fn build_sink(config: &AppConfig) -> Arc<dyn RecommendationSink> {
    if !config.recommender.enabled {
        return Arc::new(DisabledSink);
    }
    match HttpRecommendationSink::new(&config.recommender) {
        Ok(sink) => Arc::new(sink),
        Err(err) => {
            tracing::warn!("recommender disabled: {}", err);
            Arc::new(DisabledSink)
        }
    }
}

async fn render_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            SessionEvent::Ringing { difficulty, prompt } => {
                println!("\n--- ALARM RINGING ---");
                println!("Solve the puzzle to stop the alarm, or type 'snooze'.");
                print_puzzle(difficulty.level(), &prompt);
            }
            SessionEvent::PuzzleIssued { difficulty, prompt } => {
                print_puzzle(difficulty.level(), &prompt);
            }
            SessionEvent::Incorrect { .. } => {
                println!("Incorrect. Try again or type 'snooze'.");
            }
            SessionEvent::FormatError { .. } => {
                println!("Couldn't understand that answer. Please try again or type 'snooze'.");
            }
            SessionEvent::DifficultyRaised { to, .. } => {
                println!("Difficulty increased to {}.", to);
            }
            SessionEvent::Snoozed { minutes, .. } => {
                println!("Snoozing for {} minute(s). Difficulty will increase.", minutes);
            }
            SessionEvent::Solved { quote } => {
                println!("Correct! Alarm stopped. Have a great day.");
                println!("Motivation: {}", quote);
            }
        }
        let _ = std::io::stdout().flush();
    }
}

fn print_puzzle(difficulty: u8, prompt: &str) {
    println!("\nDifficulty {}:", difficulty);
    println!("{}", prompt);
    print!("Your answer (or type snooze): ");
}

