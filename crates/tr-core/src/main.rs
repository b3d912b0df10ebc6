//! Trigrate CLI — rate computation, menu fitting, and sample reduction.
//!
//! Subcommands:
//! - `rate`: compute menu rates for a sample
//! - `fit`: fit menu thresholds to a target total rate
//! - `reduce`: reduce full samples into a reduced-sample artifact
//! - `curves`: build the rate curves for every menu trigger
//! - `show-menu`: print the menu a reduced sample was built against
//! - `list-triggers`: list the registered trigger kinds

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tr_common::OutputFormat;
use tr_core::fit::MenuFitter;
use tr_core::logging::init_logging;
use tr_core::menu::{load_menu_file, menu_from_entries, write_menu_table, MenuEntry};
use tr_core::rate::{menu_rate, RateCurveSet};
use tr_core::sample::{FullSample, ReducedSample, ReducedSampleBuilder, Sample};
use tr_core::trigger::TriggerRegistry;
use tr_core::{Error, Result};
use tracing::{info, warn};

/// Trigrate — trigger-menu rate studies
#[derive(Parser)]
#[command(name = "tr-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute per-trigger, pure, and total rates for a menu
    Rate(RateArgs),

    /// Fit menu thresholds to a target total rate
    Fit(FitArgs),

    /// Reduce full samples into a reduced-sample artifact
    Reduce(ReduceArgs),

    /// Build the rate curves for every menu trigger
    Curves(CurvesArgs),

    /// Show the menu a reduced sample was built against
    ShowMenu(ShowMenuArgs),

    /// List the registered trigger kinds
    ListTriggers,
}

#[derive(Args, Debug)]
struct RateArgs {
    /// Sample file: a .trs reduced artifact or a JSONL full sample
    #[arg(long)]
    sample: PathBuf,

    /// Menu file: legacy table or JSON tree
    #[arg(long)]
    menu: PathBuf,

    /// Output encoding
    #[arg(long, short = 'f', default_value = "json")]
    format: OutputFormat,

    /// Write to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override the sample's absolute event rate in Hz
    #[arg(long)]
    event_rate: Option<f64>,
}

#[derive(Args, Debug)]
struct FitArgs {
    /// Sample file: a .trs reduced artifact or a JSONL full sample
    #[arg(long)]
    sample: PathBuf,

    /// Menu file with requested rates and lock flags
    #[arg(long)]
    menu: PathBuf,

    /// Target total menu rate in Hz
    #[arg(long)]
    target: f64,

    /// Convergence tolerance in Hz (default: 1% of the target)
    #[arg(long)]
    tolerance: Option<f64>,

    /// Iteration cap
    #[arg(long, default_value_t = tr_core::fit::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Reuse pre-built curves from a `curves` JSON file
    #[arg(long)]
    curves: Option<PathBuf>,

    /// Output encoding for the fitted rates
    #[arg(long, short = 'f', default_value = "table")]
    format: OutputFormat,

    /// Write the fitted rates to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the fitted menu as a legacy table
    #[arg(long)]
    output_menu: Option<PathBuf>,

    /// Write the per-iteration log as JSON
    #[arg(long)]
    log: Option<PathBuf>,

    /// Override the sample's absolute event rate in Hz
    #[arg(long)]
    event_rate: Option<f64>,
}

#[derive(Args, Debug)]
struct ReduceArgs {
    /// Full-sample JSONL input files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Menu file naming the triggers to reduce against
    #[arg(long)]
    menu: PathBuf,

    /// Output artifact path
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Absolute event rate of the sample in Hz
    #[arg(long, default_value_t = 1.0)]
    event_rate: f64,

    /// Bisection tolerance for the tightest-threshold search
    #[arg(long, default_value_t = tr_core::sample::reduce::REDUCTION_TOLERANCE)]
    tolerance: f64,
}

#[derive(Args, Debug)]
struct CurvesArgs {
    /// Sample file: a .trs reduced artifact or a JSONL full sample
    #[arg(long)]
    sample: PathBuf,

    /// Menu file naming the triggers to build curves for
    #[arg(long)]
    menu: PathBuf,

    /// Output JSON path
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Override the sample's absolute event rate in Hz
    #[arg(long)]
    event_rate: Option<f64>,
}

#[derive(Args, Debug)]
struct ShowMenuArgs {
    /// Reduced-sample artifact
    #[arg(long)]
    sample: PathBuf,
}

/// Either concrete sample kind behind one dispatch point.
enum AnySample {
    Full(FullSample),
    Reduced(ReducedSample),
}

impl AnySample {
    fn load(path: &Path, registry: &TriggerRegistry, event_rate: Option<f64>) -> Result<Self> {
        let is_reduced = path
            .extension()
            .map(|extension| extension == "trs")
            .unwrap_or(false);

        let mut sample = if is_reduced {
            AnySample::Reduced(ReducedSample::load(path, registry)?)
        } else {
            AnySample::Full(FullSample::load_jsonl(path)?)
        };

        if let Some(rate) = event_rate {
            match &mut sample {
                AnySample::Full(full) => full.set_event_rate(rate),
                AnySample::Reduced(reduced) => reduced.set_event_rate(rate),
            }
        }
        Ok(sample)
    }

    fn as_sample(&self) -> &dyn Sample {
        match self {
            AnySample::Full(full) => full,
            AnySample::Reduced(reduced) => reduced,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet);

    let registry = TriggerRegistry::standard();
    let result = match cli.command {
        Commands::Rate(args) => run_rate(&args, &registry),
        Commands::Fit(args) => run_fit(&args, &registry),
        Commands::Reduce(args) => run_reduce(&args, &registry),
        Commands::Curves(args) => run_curves(&args, &registry),
        Commands::ShowMenu(args) => run_show_menu(&args, &registry),
        Commands::ListTriggers => run_list_triggers(&registry),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error[{}]: {error}", error.code());
            ExitCode::FAILURE
        }
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}

fn report_error(error: tr_report::ReportError) -> Error {
    match error {
        tr_report::ReportError::Io(error) => Error::Io(error),
        tr_report::ReportError::Json(error) => Error::Json(error),
        tr_report::ReportError::Malformed(message) => Error::Config(message),
    }
}

fn run_rate(args: &RateArgs, registry: &TriggerRegistry) -> Result<()> {
    let sample = AnySample::load(&args.sample, registry, args.event_rate)?;
    let entries = load_menu_file(&args.menu, registry)?;
    let menu = menu_from_entries(&entries);

    let rate = menu_rate(&menu, sample.as_sample())?;

    let mut output = open_output(args.output.as_deref())?;
    tr_report::write_menu_rate(&mut output, &rate, args.format).map_err(report_error)?;
    Ok(())
}

fn run_fit(args: &FitArgs, registry: &TriggerRegistry) -> Result<()> {
    let sample = AnySample::load(&args.sample, registry, args.event_rate)?;
    let entries = load_menu_file(&args.menu, registry)?;
    let tolerance = args.tolerance.unwrap_or(args.target * 0.01);

    let curves = match &args.curves {
        Some(path) => RateCurveSet::load_json(path, registry)?,
        None => RateCurveSet::default(),
    };

    let mut fitter = MenuFitter::with_curves(sample.as_sample(), registry, curves);
    fitter.set_max_iterations(args.max_iterations);
    fitter.load_entries(&entries)?;

    let result = fitter.fit(args.target, tolerance)?;
    match result.outcome {
        tr_core::fit::FitOutcome::Converged { iterations } => {
            info!(
                iterations,
                total_rate = result.rate.total_rate,
                "fit converged"
            );
        }
        tr_core::fit::FitOutcome::CapReached { cap } => {
            warn!(
                cap,
                total_rate = result.rate.total_rate,
                "fit hit the iteration cap; reporting the last attempt"
            );
        }
    }

    let mut output = open_output(args.output.as_deref())?;
    tr_report::write_menu_rate(&mut output, &result.rate, args.format).map_err(report_error)?;

    if let Some(path) = &args.output_menu {
        let fitted: Vec<MenuEntry> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| MenuEntry {
                trigger: fitter.menu().trigger(index).clone(),
                requested_rate: entry.requested_rate,
                locked: entry.locked,
            })
            .collect();
        write_menu_table(BufWriter::new(File::create(path)?), &fitted)?;
        info!(path = %path.display(), "wrote fitted menu");
    }

    if let Some(path) = &args.log {
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &result.iterations)?;
        info!(path = %path.display(), "wrote iteration log");
    }
    Ok(())
}

fn run_reduce(args: &ReduceArgs, registry: &TriggerRegistry) -> Result<()> {
    let entries = load_menu_file(&args.menu, registry)?;
    let menu = menu_from_entries(&entries);

    let mut builder =
        ReducedSampleBuilder::new(menu, registry).with_tolerance(args.tolerance);
    builder.set_event_rate(args.event_rate);

    let batch = builder.append_jsonl_files(&args.inputs);
    for failure in &batch.failed {
        warn!(item = %failure.item, error = %failure.error, "input skipped");
    }
    if !batch.any_succeeded() {
        return Err(Error::Config(
            "every input file failed to reduce".to_string(),
        ));
    }

    let sample = builder.finish();
    sample.save(&args.output)?;
    info!(
        path = %args.output.display(),
        events = sample.len(),
        succeeded = batch.succeeded.len(),
        failed = batch.failed.len(),
        "reduced sample written"
    );
    Ok(())
}

fn run_curves(args: &CurvesArgs, registry: &TriggerRegistry) -> Result<()> {
    let sample = AnySample::load(&args.sample, registry, args.event_rate)?;
    let entries = load_menu_file(&args.menu, registry)?;
    let menu = menu_from_entries(&entries);

    let mut curves = RateCurveSet::for_menu(&menu, registry)?;
    curves.fill(sample.as_sample())?;
    curves.save_json(&args.output)?;
    info!(
        path = %args.output.display(),
        curves = curves.curves().len(),
        "rate curves written"
    );
    Ok(())
}

fn run_show_menu(args: &ShowMenuArgs, registry: &TriggerRegistry) -> Result<()> {
    let sample = ReducedSample::load(&args.sample, registry)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "menu of {} ({} events, event rate {} Hz)",
        args.sample.display(),
        sample.len(),
        sample.event_rate()
    )?;
    for trigger in sample.menu().iter() {
        write!(stdout, "  {:<22} v{}", trigger.name(), trigger.version())?;
        for name in trigger.parameter_names() {
            if let Some(value) = trigger.try_parameter(name) {
                write!(stdout, "  {name}={value}")?;
            }
        }
        writeln!(stdout)?;
    }
    Ok(())
}

fn run_list_triggers(registry: &TriggerRegistry) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for (name, version) in registry.list() {
        writeln!(stdout, "{name} v{version}")?;
    }
    Ok(())
}
