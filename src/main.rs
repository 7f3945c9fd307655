use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lostspells_voice::command::{
    CommandResolver, GameContext, GameScreen, Language, OutcomeStatus, RecognitionOutcome,
    Resolution, ScreenState, Utterance, allowed, keyword_hints,
};
use lostspells_voice::pitch::{classify, gauge_position, note_name};
use lostspells_voice::voice::{AudioCapture, AudioSource, TRIM_LEVEL, VoiceServerClient, read_wav};
use lostspells_voice::{Config, Error, VoiceCommandOrchestrator, VoiceEvent};

/// Frame tick for the listen loop
const TICK: Duration = Duration::from_millis(20);

/// Lost Spells voice commands - pitch-driven spell casting by voice
#[derive(Parser)]
#[command(name = "lostspells-voice", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/lostspells/voice/config.toml)
    #[arg(short, long, env = "LOSTSPELLS_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen on the microphone and cast by voice
    Listen {
        /// Screen the game is on
        #[arg(short, long, default_value = "in-game")]
        screen: String,
        /// Game is paused
        #[arg(long)]
        paused: bool,
    },
    /// Analyze the pitch of a WAV recording
    Analyze {
        /// Path to a WAV file
        path: PathBuf,
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a transcript offline against the skill catalog
    Resolve {
        /// Transcript text
        text: String,
        /// Screen the game is on
        #[arg(short, long, default_value = "in-game")]
        screen: String,
        /// Game is paused
        #[arg(long)]
        paused: bool,
        /// Element for generic skills
        #[arg(short, long)]
        element: Option<String>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Show the commands allowed in each context
    Contexts,
    /// Check that the transcription server is reachable
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,lostspells_voice=info",
        1 => "info,lostspells_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Listen { screen, paused } => listen(config, &screen, paused).await,
        Command::Analyze { path, json } => analyze(&config, &path, json),
        Command::Resolve {
            text,
            screen,
            paused,
            element,
        } => resolve(&config, &text, &screen, paused, element.as_deref()),
        Command::TestMic { duration } => test_mic(&config, duration).await,
        Command::Contexts => {
            print_contexts(config.language);
            Ok(())
        }
        Command::Health => health(&config).await,
    }
}

fn screen_state(name: &str, paused: bool) -> anyhow::Result<ScreenState> {
    let screen =
        GameScreen::parse(name).ok_or_else(|| anyhow::anyhow!("unknown screen: {name}"))?;
    Ok(ScreenState {
        paused,
        ..ScreenState::on(screen)
    })
}

/// Run the orchestrator on the microphone until interrupted
#[allow(clippy::future_not_send)]
async fn listen(mut config: Config, screen: &str, paused: bool) -> anyhow::Result<()> {
    let screen = screen_state(screen, paused)?;

    // No push-to-talk key on a terminal
    config.segmenter.mode = lostspells_voice::voice::SegmentMode::Continuous;

    let catalog = config.skill_catalog()?;
    let client = VoiceServerClient::new(&config.server.url, config.server.timeout)?;
    if let Err(e) = client.health().await {
        tracing::warn!(error = %e, url = %client.base_url(), "voice server not reachable");
    }

    let mut capture = match AudioCapture::new(config.sample_rate, config.ring_seconds) {
        Ok(capture) => capture,
        Err(Error::NoMicrophone) => {
            tracing::error!("no microphone found, voice commands disabled");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    capture.start()?;

    let mut orchestrator = VoiceCommandOrchestrator::new(
        capture.ring(),
        Arc::new(client),
        catalog,
        config.orchestrator(),
        config.voice_settings(),
        tokio::runtime::Handle::current(),
    );
    orchestrator.set_screen(screen);

    println!("Listening in {} (Ctrl+C to stop)", orchestrator.context());
    let names: Vec<&str> = orchestrator
        .catalog()
        .active()
        .iter()
        .map(|s| s.display_name(config.language))
        .collect();
    println!("Active skills: {}", names.join(", "));

    let mut interval = tokio::time::interval(TICK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let dt = TICK.as_secs_f32();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                orchestrator.update(dt);
                for event in orchestrator.drain_events() {
                    print_event(&event);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    orchestrator.reset();
    capture.stop();
    Ok(())
}

fn print_event(event: &VoiceEvent) {
    match event {
        VoiceEvent::RecordingStarted => println!("● recording"),
        VoiceEvent::PitchUpdate {
            frequency,
            category,
            element,
            gauge,
        } => {
            tracing::debug!(frequency, %category, %element, gauge, "pitch");
        }
        VoiceEvent::Recognition { outcome, analysis } => {
            if let Some(analysis) = analysis {
                println!(
                    "  pitch: {} ({} detections)",
                    analysis.dominant,
                    analysis.estimates.len()
                );
            }
            print_outcome(outcome);
        }
        VoiceEvent::SegmentDiscarded { duration } => {
            println!("  (too short: {duration:.2}s)");
        }
        VoiceEvent::SegmentDropped => println!("  (busy, utterance dropped)"),
    }
}

fn print_outcome(outcome: &RecognitionOutcome) {
    println!("  heard: \"{}\"", outcome.transcript);
    match (&outcome.status, &outcome.matched) {
        (OutcomeStatus::Matched, Some(Resolution::Skill { skill, element })) => {
            let element = element.as_deref().unwrap_or("-");
            println!(
                "  → cast {skill} [{element}] ({:.0}%)",
                outcome.confidence * 100.0
            );
        }
        (OutcomeStatus::Matched, Some(Resolution::Command { command })) => {
            println!("  → command {command} ({:.0}%)", outcome.confidence * 100.0);
        }
        (OutcomeStatus::Blocked { hint }, _) => println!("  ✗ blocked: {hint}"),
        (OutcomeStatus::Failed { reason }, _) => println!("  ✗ failed: {reason}"),
        _ => println!("  ✗ no match"),
    }
}

/// Print a pitch report for a WAV file
fn analyze(config: &Config, path: &Path, json: bool) -> anyhow::Result<()> {
    let clip = read_wav(path)?.trim_silence(TRIM_LEVEL);
    let analysis = config.analyzer().analyze(&clip, &config.pitch.boundaries);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!(
        "{}: {:.2}s at {} Hz",
        path.display(),
        clip.duration_secs(),
        clip.sample_rate()
    );
    println!(
        "Boundaries: low < {:.2} Hz, high > {:.2} Hz",
        config.pitch.boundaries.low_max(),
        config.pitch.boundaries.high_min()
    );
    println!("---");

    for estimate in &analysis.estimates {
        let category = classify(estimate.frequency_hz, &config.pitch.boundaries);
        println!(
            "frame @{:>7}: {:>8.2} Hz  {:<4} {:<6} gauge {:.2}",
            estimate.frame_start,
            estimate.frequency_hz,
            note_name(estimate.frequency_hz).unwrap_or_default(),
            category,
            gauge_position(estimate.frequency_hz)
        );
    }

    if analysis.estimates.is_empty() {
        println!("no pitch detected");
    }

    println!("---");
    println!(
        "low {} / medium {} / high {}",
        analysis.counts[0], analysis.counts[1], analysis.counts[2]
    );
    println!(
        "dominant: {} → {}",
        analysis.dominant,
        config.elements.element_for(analysis.dominant)
    );

    Ok(())
}

/// Resolve a transcript without the server
fn resolve(
    config: &Config,
    text: &str,
    screen: &str,
    paused: bool,
    element: Option<&str>,
) -> anyhow::Result<()> {
    let screen = screen_state(screen, paused)?;
    let context = lostspells_voice::command::resolve_context(&screen);
    let catalog = config.skill_catalog()?;
    let resolver = CommandResolver::new(config.language);

    let element = element.or(config.pinned_element.as_deref());
    let outcome = resolver.resolve(&Utterance::text(text), catalog.active(), context, element);

    println!("context: {context}");
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new(config.sample_rate, config.ring_seconds)?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("Activation threshold: {:.4}", config.segmenter.activation_threshold);
    println!("---");

    let ring = capture.ring();
    let window = usize::try_from(sample_rate).unwrap_or(usize::MAX);

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = ring.latest(window);
        let energy = lostspells_voice::pitch::rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);
        let marker = if energy >= config.segmenter.activation_threshold {
            "voice"
        } else {
            ""
        };

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}] {}",
            i + 1,
            energy,
            peak,
            meter,
            marker
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Print the allow table
fn print_contexts(language: Language) {
    for context in GameContext::ALL {
        let commands: Vec<String> = allowed(context).iter().map(ToString::to_string).collect();
        let skills = if context.is_playing() { " + skills" } else { "" };

        println!("{context}{skills}");
        if commands.is_empty() {
            println!("    (nothing)");
            continue;
        }
        println!("    {}", commands.join(", "));
        println!("    say: {}", keyword_hints(context, language).join(" / "));
    }
}

async fn health(config: &Config) -> anyhow::Result<()> {
    let client = VoiceServerClient::new(&config.server.url, config.server.timeout)?;
    client.health().await?;
    println!("{} is up", client.base_url());
    Ok(())
}
