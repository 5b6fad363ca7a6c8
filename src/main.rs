//! Audioloader - audio downloader built on yt-dlp
//!
//! Downloads and transcodes the audio of a video or a playlist, asking which
//! playlist entries to keep and retrying failed items.

use anyhow::{bail, Result};
use audioloader::app::AudioloaderApp;
use audioloader::orchestrator::{AudioFormat, AudioQuality, RunControl, RunEvent, RunOutcome};
use audioloader::selection::{SelectionDecision, SelectionGate};
use audioloader::Metadata;
use clap::Parser;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "audioloader", version, about = "Download audio from video URLs")]
struct Args {
    /// Video or playlist URL
    url: Option<String>,

    /// Output directory (must exist)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Audio format: mp3, m4a, wav, flac, opus
    #[arg(short, long)]
    format: Option<AudioFormat>,

    /// Bitrate target in kbps: 320, 192, 128, 96
    #[arg(short, long)]
    quality: Option<AudioQuality>,

    /// Download every playlist entry without asking
    #[arg(long)]
    all: bool,

    /// Write playlist entries straight into the output directory
    #[arg(long)]
    no_subfolder: bool,

    /// Attempts per item, first one included
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Print the download history, newest first, and exit
    #[arg(long)]
    history: bool,

    /// Delete the download history and exit
    #[arg(long)]
    clear_history: bool,

    /// Store the given format, quality, output and retry flags as defaults
    #[arg(long)]
    save_defaults: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(run(args));
    // A prompt abandoned on Ctrl-C leaves its stdin reader blocked
    rt.shutdown_background();
    result
}

async fn run(args: Args) -> Result<()> {
    let mut app = AudioloaderApp::initialize().await?;

    if args.clear_history {
        app.history().clear().await?;
        println!("History cleared");
        return Ok(());
    }

    if args.history {
        let entries = app.history().load_newest_first().await;
        if entries.is_empty() {
            println!("No downloads yet");
        }
        for entry in entries {
            println!("{}\n", entry);
        }
        return Ok(());
    }

    apply_overrides(&args, &mut app);
    if args.save_defaults {
        app.save_settings().await?;
        println!("Defaults saved");
    }

    let Some(url) = args.url.as_deref() else {
        if args.save_defaults {
            return Ok(());
        }
        bail!("Please enter a valid URL");
    };

    let orchestrator = app.orchestrator()?;
    let handle = orchestrator.start(app.request_for(url))?;
    info!("Run {} started", handle.run_id());

    let (mut events, control, task) = handle.into_parts();

    let interrupt = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            interrupt.cancel();
        }
    });

    while let Some(event) = events.recv().await {
        match event {
            RunEvent::Progress { message, percent } => {
                println!("[{:>5.1}%] {}", percent, message);
            }
            RunEvent::SelectionNeeded { metadata } => {
                let decision =
                    choose_entries(metadata, &control, args.all, !args.no_subfolder).await?;
                answer(&control, decision);
            }
            RunEvent::Error { .. } | RunEvent::RetryNotice { .. } => eprintln!("{}", event),
            RunEvent::Finished { .. } => println!("{}", event),
        }
    }

    let report = task.wait().await?;
    match report.outcome {
        RunOutcome::Finished => {
            for (item, cause) in &report.failed {
                eprintln!("  failed: {} ({})", item.title, cause);
            }
            Ok(())
        }
        RunOutcome::Aborted(kind) => bail!("Run aborted: {:?}", kind),
    }
}

fn apply_overrides(args: &Args, app: &mut AudioloaderApp) {
    let settings = app.settings_mut();
    if let Some(output) = &args.output {
        settings.download_location = output.clone();
    }
    if let Some(format) = args.format {
        settings.audio_format = format;
    }
    if let Some(quality) = args.quality {
        settings.audio_quality = quality;
    }
    if let Some(attempts) = args.max_attempts {
        settings.retry_attempts = attempts;
    }
    if let Some(delay) = args.retry_delay {
        settings.retry_delay_secs = delay;
    }
}

fn answer(control: &RunControl, decision: SelectionDecision) {
    if let Err(e) = control.select(decision) {
        warn!("Selection not delivered: {}", e);
    }
}

/// Render the checklist and read the user's picks from stdin
async fn choose_entries(
    metadata: Metadata,
    control: &RunControl,
    all: bool,
    create_subfolder: bool,
) -> Result<SelectionDecision> {
    let mut gate = SelectionGate::new(&metadata);
    gate.set_create_subfolder(create_subfolder);
    if all {
        return Ok(gate.decision());
    }

    println!("{}", gate.summary());
    for entry in gate.entries() {
        println!("  {}", entry.label());
    }

    let prompt = tokio::task::spawn_blocking(|| -> io::Result<String> {
        print!("Entries to download (e.g. 1,3,5-7), 'a' for all, empty to cancel: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    });
    let Some(line) = unless_cancelled(prompt, control.cancelled()).await else {
        println!();
        return Ok(SelectionDecision::cancel());
    };
    let line = line??;

    let last_ordinal = gate
        .entries()
        .iter()
        .map(|entry| entry.item.ordinal)
        .max()
        .unwrap_or(0);
    match parse_choice(&line, last_ordinal) {
        Choice::All => gate.select_all(true),
        Choice::Ordinals(ordinals) => {
            gate.select_all(false);
            for ordinal in ordinals {
                if !gate.set_checked(ordinal, true) {
                    debug!("No entry numbered {}", ordinal);
                }
            }
        }
    }

    println!("{}", gate.summary());
    Ok(gate.decision())
}

/// `input`, unless `cancelled` resolves first
async fn unless_cancelled<F, C>(input: F, cancelled: C) -> Option<F::Output>
where
    F: Future,
    C: Future<Output = ()>,
{
    tokio::select! {
        value = input => Some(value),
        _ = cancelled => None,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Choice {
    All,
    Ordinals(Vec<usize>),
}

/// `"a"` / `"all"`, or a comma list of numbers and inclusive ranges.
/// Unparsable parts are skipped and ranges stop at `last_ordinal`.
fn parse_choice(input: &str, last_ordinal: usize) -> Choice {
    let input = input.trim();
    if input.eq_ignore_ascii_case("a") || input.eq_ignore_ascii_case("all") {
        return Choice::All;
    }

    let mut ordinals = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) =
                    (start.trim().parse::<usize>(), end.trim().parse::<usize>())
                {
                    ordinals.extend(start..=end.min(last_ordinal));
                }
            }
            None => {
                if let Ok(ordinal) = part.parse() {
                    ordinals.push(ordinal);
                }
            }
        }
    }
    Choice::Ordinals(ordinals)
}
