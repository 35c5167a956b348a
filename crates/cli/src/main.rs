use anyhow::Context;
use clap::{Parser, Subcommand};
use pinwire_config::{BoardConfig, ScriptAssertion, StimulusScript};
use pinwire_core::metrics::{ActivityMetrics, MetricsReport};
use pinwire_core::programs::{self, ToggleOutcome};
use pinwire_core::{Machine, Stimulus};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pinwire AVR pin demo simulator", long_about = None)]
struct Args {
    /// Enable register-level tracing
    #[arg(short, long, global = true)]
    trace: bool,

    /// Path to a board configuration (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the busy-wait blink loop and measure the LED waveform
    Blink {
        /// Number of full high/low periods to simulate
        #[arg(long, default_value = "3")]
        cycles: u32,

        /// Print the measurement as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write a machine snapshot (JSON) after the run
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run the interrupt toggle against a stimulus script
    Toggle {
        /// Path to the stimulus script (YAML)
        #[arg(short, long)]
        script: PathBuf,

        /// Directory for result.json
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Write a machine snapshot (JSON) after the run
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Serialize, Debug)]
struct BlinkReport {
    board: String,
    led: String,
    cycles: u32,
    high_ms: Vec<f64>,
    low_ms: Vec<f64>,
    period_ms: Vec<f64>,
    metrics: MetricsReport,
}

#[derive(Serialize, Debug)]
struct AssertionResult {
    assertion: ScriptAssertion,
    passed: bool,
    detail: String,
}

#[derive(Serialize, Debug)]
struct ToggleResult {
    status: &'static str,
    board: String,
    script_hash: String,
    outcome: Option<ToggleOutcome>,
    error: Option<String>,
    elapsed_ms: f64,
    metrics: MetricsReport,
    assertions: Vec<AssertionResult>,
}

fn as_ms(d: &Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn load_board(path: Option<&Path>) -> anyhow::Result<BoardConfig> {
    match path {
        Some(path) => {
            info!("Loading board config: {:?}", path);
            BoardConfig::from_file(path)
        }
        None => {
            info!("Using default board configuration");
            Ok(BoardConfig::default())
        }
    }
}

fn write_snapshot(machine: &Machine, path: &Path) -> anyhow::Result<()> {
    let json = machine.snapshot().to_json()?;
    std::fs::write(path, json).with_context(|| format!("Failed to write snapshot to {:?}", path))?;
    info!("Snapshot written to {:?}", path);
    Ok(())
}

fn run_blink(
    board: &BoardConfig,
    cycles: u32,
    json: bool,
    snapshot: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let metrics = Arc::new(ActivityMetrics::new());
    let mut machine = Machine::new(board.clock_hz);
    machine.observers.push(metrics.clone());

    let blink = board.blink_loop();
    let waveform = programs::simulate_blink(&mut machine, &blink, cycles)?;

    let report = BlinkReport {
        board: board.name.clone(),
        led: blink.led.to_string(),
        cycles,
        high_ms: waveform.high_durations().iter().map(as_ms).collect(),
        low_ms: waveform.low_durations().iter().map(as_ms).collect(),
        period_ms: waveform.periods().iter().map(as_ms).collect(),
        metrics: metrics.report(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} on {}: {} transitions over {:.1} ms",
            report.board,
            report.led,
            waveform.transitions(),
            as_ms(&machine.clock.elapsed())
        );
        println!("  high: {:?} ms", report.high_ms);
        println!("  low:  {:?} ms", report.low_ms);
    }

    if let Some(path) = snapshot {
        write_snapshot(&machine, path)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn evaluate(assertion: &ScriptAssertion, outcome: &ToggleOutcome) -> AssertionResult {
    let (passed, detail) = match assertion {
        ScriptAssertion::OutputLevel(a) => (
            a.output_level.is_high() == outcome.led_high,
            format!(
                "expected output {:?}, LED is {}",
                a.output_level,
                if outcome.led_high { "high" } else { "low" }
            ),
        ),
        ScriptAssertion::ToggleCount(a) => (
            a.toggle_count == outcome.toggles,
            format!("expected {} toggles, saw {}", a.toggle_count, outcome.toggles),
        ),
        ScriptAssertion::Sleeping(a) => (
            a.sleeping == outcome.sleeping.is_some(),
            format!(
                "expected sleeping={}, core is {:?}",
                a.sleeping, outcome.sleeping
            ),
        ),
    };
    AssertionResult {
        assertion: assertion.clone(),
        passed,
        detail,
    }
}

fn run_toggle(
    config: Option<&Path>,
    script_path: &Path,
    output_dir: Option<&Path>,
    snapshot: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    info!("Loading stimulus script: {:?}", script_path);
    let script_bytes = std::fs::read(script_path)
        .with_context(|| format!("Failed to read stimulus script {:?}", script_path))?;
    let script_hash = format!("{:x}", Sha256::digest(&script_bytes));
    let script = StimulusScript::from_slice(&script_bytes)
        .with_context(|| format!("Invalid stimulus script {:?}", script_path))?;

    // A board named by the script resolves relative to the script itself.
    let board = match (config, &script.board) {
        (Some(path), _) => load_board(Some(path))?,
        (None, Some(board)) => {
            let board_path = script_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(board);
            load_board(Some(board_path.as_path()))?
        }
        (None, None) => load_board(None)?,
    };

    let toggle = board.interrupt_toggle();
    let input = toggle.input();
    let metrics = Arc::new(ActivityMetrics::new());
    let mut machine = Machine::new(board.clock_hz);
    machine.observers.push(metrics.clone());

    if board.toggle.input_idles_high {
        machine.drive_pin(input, true)?;
    }
    for event in script.all_events() {
        machine.schedule(Stimulus {
            at_ms: event.at_ms,
            pin: input,
            high: event.level.is_high(),
        });
    }

    let (outcome, error) =
        match programs::simulate_toggle(&mut machine, &toggle, script.limits.max_passes) {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => {
                warn!("Simulation stopped: {}", e);
                (None, Some(e.to_string()))
            }
        };

    let assertions: Vec<AssertionResult> = match &outcome {
        Some(outcome) => script
            .assertions
            .iter()
            .map(|a| evaluate(a, outcome))
            .collect(),
        None => Vec::new(),
    };
    for result in &assertions {
        if result.passed {
            info!("PASS: {}", result.detail);
        } else {
            warn!("FAIL: {}", result.detail);
        }
    }

    let status = if error.is_some() {
        "error"
    } else if assertions.iter().all(|a| a.passed) {
        "pass"
    } else {
        "fail"
    };

    let result = ToggleResult {
        status,
        board: board.name.clone(),
        script_hash,
        outcome,
        error,
        elapsed_ms: as_ms(&machine.clock.elapsed()),
        metrics: metrics.report(),
        assertions,
    };

    let json = serde_json::to_string_pretty(&result)?;
    println!("{}", json);
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        let result_path = dir.join("result.json");
        std::fs::write(&result_path, &json)
            .with_context(|| format!("Failed to write {:?}", result_path))?;
        info!("Result written to {:?}", result_path);
    }
    if let Some(path) = snapshot {
        write_snapshot(&machine, path)?;
    }

    info!("Toggle run finished: {}", status);
    Ok(if status == "pass" {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable.
    let level = if args.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Pinwire Simulator");
    let config = args.config.as_deref();

    match args.command {
        Command::Blink {
            cycles,
            json,
            snapshot,
        } => {
            let board = load_board(config)?;
            board.validate()?;
            run_blink(&board, cycles, json, snapshot.as_deref())
        }
        Command::Toggle {
            script,
            output_dir,
            snapshot,
        } => run_toggle(config, &script, output_dir.as_deref(), snapshot.as_deref()),
    }
}
