use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use skimflow_pipeline::{Config, RecordingSink, RunReport, StageReport};

use crate::generator::{generate, GeneratorOptions};
use crate::histograms::HistogramSpec;
use crate::workflow::{self, Producer, KNOWN_OPTIONS, N_COLLISIONS, PT_MIN, SEED};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WorkflowKind {
    /// Event selection and V0 mass spectrum.
    Vzero,
    /// HF candidate skimming into `MyTable` plus the derived-table readers.
    Skimming,
    /// Both of the above in one pipeline.
    All,
}

/// Run the tutorial workflows on synthetic data and summarize the histograms they fill.
#[derive(Parser)]
#[command(name = "skimflow", about = "Run the derived-table tutorial workflows.")]
pub struct Args {
    /// Which workflow to run.
    #[arg(long, value_enum, default_value_t = WorkflowKind::All)]
    workflow: WorkflowKind,

    /// Number of synthetic collisions (overrides `nCollisions`).
    #[arg(long)]
    collisions: Option<usize>,

    /// Generator seed (overrides `seed`).
    #[arg(long)]
    seed: Option<u64>,

    /// Candidate pT threshold in GeV/c (overrides `ptMin`).
    #[arg(long, conflicts_with = "no_pt_filter")]
    pt_min: Option<f64>,

    /// Produce `MyTable` without the pT filter.
    #[arg(long)]
    no_pt_filter: bool,

    /// JSON object of option overrides, e.g. `{"nBins": 50, "ptMin": 5.0}`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct JsonHistogram<'a> {
    #[serde(flatten)]
    spec: &'a HistogramSpec,
    fills: usize,
    in_range: usize,
    mean: Option<f64>,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generator: GeneratorOptions,
    stages: &'a [StageReport],
    histograms: Vec<JsonHistogram<'a>>,
}

pub fn run() -> Result<()> {
    run_with_args(Args::parse())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config file {}", path.display()))?;
            Config::from_json_str(&text)
                .with_context(|| format!("parse config file {}", path.display()))?
        }
        None => Config::new(),
    };
    config.check_known(&KNOWN_OPTIONS)?;

    if let Some(collisions) = args.collisions {
        let collisions = i64::try_from(collisions).context("--collisions is too large")?;
        config.set(N_COLLISIONS.name, collisions);
    }
    if let Some(seed) = args.seed {
        let seed = i64::try_from(seed).context("--seed is too large")?;
        config.set(SEED.name, seed);
    }
    if let Some(pt_min) = args.pt_min {
        config.set(PT_MIN.name, pt_min);
    }
    Ok(config)
}

pub fn run_with_args(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let producer = if args.no_pt_filter {
        Producer::Unfiltered
    } else {
        Producer::Filtered
    };

    let pipeline = match args.workflow {
        WorkflowKind::Vzero => workflow::vzero_workflow(&config),
        WorkflowKind::Skimming => workflow::skimming_workflow(&config, producer),
        WorkflowKind::All => workflow::tutorial_workflow(&config, producer),
    }?;
    let specs = workflow::histograms(
        &config,
        args.workflow != WorkflowKind::Skimming,
        args.workflow != WorkflowKind::Vzero,
    )?;

    let options = GeneratorOptions::from_config(&config)?;
    let mut store = generate(&options).context("generate synthetic tables")?;
    let mut sink = RecordingSink::new();
    let report = pipeline.run(&mut store, &mut sink)?;

    match args.format {
        OutputFormat::Text => print_text(&options, &report, &specs, &sink),
        OutputFormat::Json => {
            let json = JsonReport {
                generator: options,
                stages: &report.stages,
                histograms: specs
                    .iter()
                    .map(|spec| JsonHistogram {
                        spec,
                        fills: sink.count(spec.name),
                        in_range: in_range(spec, &sink),
                        mean: sink.mean(spec.name),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

fn in_range(spec: &HistogramSpec, sink: &RecordingSink) -> usize {
    sink.values(spec.name)
        .iter()
        .filter(|&&v| spec.bin_of(v).is_some())
        .count()
}

fn print_text(
    options: &GeneratorOptions,
    report: &RunReport,
    specs: &[HistogramSpec],
    sink: &RecordingSink,
) {
    println!(
        "skimflow: {} collisions, seed {}",
        options.collisions, options.seed
    );
    println!();
    println!("Stages:");
    for stage in &report.stages {
        let output = match &stage.output {
            Some(table) => format!(" -> {table} ({} rows)", stage.output_rows),
            None => String::new(),
        };
        println!(
            "  {:<30} {:<14} {:>7} rows, {:>7} selected{output}",
            stage.stage,
            stage.input.as_str(),
            stage.input_rows,
            stage.selected_rows
        );
    }
    println!();
    println!("Histograms:");
    for spec in specs {
        let mean = sink
            .mean(spec.name)
            .map(|m| format!("{m:.4}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<14} fills={:<7} in-range={:<7} mean={mean}  [{} bins, {}..{}]",
            spec.name,
            sink.count(spec.name),
            in_range(spec, sink),
            spec.bins,
            spec.min,
            spec.max
        );
    }
}
