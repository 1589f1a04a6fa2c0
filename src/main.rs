use std::{
    fs,
    path::PathBuf,
    process::ExitCode,
    sync::{Arc, Mutex, PoisonError},
};

use clap::{Parser, ValueEnum};
use colored::Colorize;
use observable_subject::{
    Activity, AfterLogging, BoxError, FailureAction, FailureCollector, IndexSource, Observable,
    Observer, RandomIndex, Routine, Subject, SubjectConfig, SubjectError, observer,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the observable routine demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of cycle steps to run
    #[arg(short, long, default_value_t = 8)]
    steps: usize,

    /// Seed for a reproducible run (OS entropy otherwise)
    #[arg(long)]
    seed: Option<u64>,

    /// Failure action; overrides the one from --config
    #[arg(short, long, value_enum)]
    policy: Option<Policy>,

    /// Register an observer that fails whenever the routine is bending
    #[arg(long)]
    faulty: bool,

    /// JSON file holding a subject configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the transcript as JSON instead of prose
    #[arg(long)]
    json: bool,
}

/// Failure actions selectable from the command line
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    /// Abort the run on the first observer failure
    Rethrow,
    /// Swallow observer failures
    Ignore,
    /// Collect every observer failure and report them at the end
    Collect,
    /// Log observer failures and continue
    Log,
}

/// One delivered activity
#[derive(Debug, Serialize)]
struct Step {
    /// Position in the run, starting at 1
    step: usize,
    /// Activity delivered to the observers
    activity: Activity,
    /// Its label
    label: &'static str,
}

/// A collected observer failure
#[derive(Debug, Serialize)]
struct FailureLine {
    /// Cycle step whose notification pass failed, starting at 1
    step: usize,
    /// Observer index within that pass
    index: usize,
    /// Observer name
    observer: String,
    /// Failure message
    cause: String,
}

/// Whole-run report printed with --json
#[derive(Debug, Serialize)]
struct Report {
    /// Activity the routine started with
    initial: Activity,
    /// Delivered activities
    steps: Vec<Step>,
    /// Failures gathered by the collect policy
    failures: Vec<FailureLine>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Observer that refuses to bend
fn faulty_observer() -> Arc<dyn Observer<Activity>> {
    observer::named("faulty", |a: &Activity| {
        if *a == Activity::Bending {
            Err("refuses to bend".into())
        } else {
            Ok(())
        }
    })
}

/// Cycles `steps` times, draining the collector after every pass.
///
/// The collector keys failures by index within a pass, so each pass is
/// drained before the next one can overwrite it.
fn drive(
    routine: &Routine,
    collector: &FailureCollector<Activity>,
    steps: usize,
) -> Result<Vec<FailureLine>, SubjectError> {
    let mut failures = Vec::new();
    for step in 1..=steps {
        routine.cycle()?;
        failures.extend(
            collector
                .drain()
                .into_iter()
                .map(|(index, failure)| FailureLine {
                    step,
                    index,
                    observer: failure.observer.name().to_string(),
                    cause: failure.cause.to_string(),
                }),
        );
    }
    Ok(failures)
}

/// Builds the routine from the arguments and runs it
fn run(args: &Args) -> Result<(), BoxError> {
    let config = match &args.config {
        Some(path) => SubjectConfig::from_json(&fs::read_to_string(path)?)?,
        None => SubjectConfig::default(),
    };

    let collector = Arc::new(FailureCollector::new());
    let mut builder = Subject::builder()
        .initial_state(Activity::Working)
        .config(config);
    if let Some(policy) = args.policy {
        builder = builder.failure_action(match policy {
            Policy::Rethrow => FailureAction::Rethrow,
            Policy::Ignore => FailureAction::Ignore,
            Policy::Collect => FailureAction::Collect(Arc::clone(&collector)),
            Policy::Log => FailureAction::Log(AfterLogging::Ignore),
        });
    }
    let source: Box<dyn IndexSource> = match args.seed {
        Some(seed) => Box::new(RandomIndex::seeded(seed)),
        None => Box::new(RandomIndex::from_entropy()),
    };
    let routine = Routine::with_parts(builder.build()?, source);
    let initial = routine.activity();

    let transcript = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&transcript);
    routine.add_observer(observer::named("transcript", move |a: &Activity| {
        sink.lock().unwrap_or_else(PoisonError::into_inner).push(*a);
        Ok(())
    }))?;
    if !args.json {
        routine.add_observer(observer::named("printer", |a: &Activity| {
            println!("  {} {}", "->".cyan(), a.label().bold());
            Ok(())
        }))?;
    }
    if args.faulty {
        routine.add_observer(faulty_observer())?;
    }

    if !args.json {
        println!("{}", "Observable routine demo".green().bold());
        println!("=======================\n");
        println!("Starting as: {}", initial.label().yellow());
    }

    let failures = drive(&routine, &collector, args.steps)?;
    let steps: Vec<Step> = transcript
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .zip(1..)
        .map(|(activity, step)| Step {
            step,
            activity: *activity,
            label: activity.label(),
        })
        .collect();

    if args.json {
        let report = Report {
            initial,
            steps,
            failures,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\nDelivered {} activities.", steps.len());
    if !failures.is_empty() {
        println!("{}", "Collected failures:".red().bold());
        for f in &failures {
            println!("  step {} #{} {}: {}", f.step, f.index, f.observer, f.cause);
        }
    }
    println!("\n{}", "Demonstration complete!".green().bold());
    Ok(())
}
