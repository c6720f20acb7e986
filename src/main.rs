// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS germ selection CLI
//!
//! Selects and tests germ sets for the built-in gate models.
//!
//! # Usage
//!
//! ```bash
//! # Select germs for the X/Y single-qubit model
//! qubit-os-germsel optimize --model std1q_xy
//!
//! # Custom candidates, fixed slack, JSON output
//! qubit-os-germsel optimize --germs Gx,Gy,GxGy,GxGxGy --fixed-slack 1e-3 --json
//!
//! # Robust selection over 5 perturbed copies
//! qubit-os-germsel robust --num-copies 5 --seed 3
//!
//! # Completeness tests
//! qubit-os-germsel test --germs Gx,Gy,GxGy asymptotic
//! qubit-os-germsel test finite --length 8
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qubit_os_germsel::{
    config::Config,
    germsel::{
        optimize_germ_set_robust, test_germ_set_asymptotic, test_germ_set_finite,
        CompletenessReport, GermSelection, GermSetOptimizer, RobustModels, RobustOutcome,
        ScoreMode, Termination,
    },
    model::{GateSequence, GateSet},
    validation::parse_inclusion_bits,
    Result, VERSION,
};

/// QubitOS germ selection
#[derive(Parser)]
#[command(name = "qubit-os-germsel")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Germ selection for gate set tomography")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Built-in gate models.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum BuiltinModel {
    /// Gx = X(π/2), Gy = Y(π/2)
    #[value(name = "std1q_xy")]
    Std1qXy,
    /// Gi, Gx = X(π/2), Gy = Y(π/2)
    #[value(name = "std1q_xyi")]
    Std1qXyi,
}

impl BuiltinModel {
    fn build(self) -> GateSet {
        match self {
            BuiltinModel::Std1qXy => GateSet::std1q_xy(),
            BuiltinModel::Std1qXyi => GateSet::std1q_xyi(),
        }
    }

    /// Candidate germs used when none are given.
    fn default_germs(self) -> &'static str {
        match self {
            BuiltinModel::Std1qXy => "Gx,Gy,GxGy,GxGxGy,GxGyGy,GxGxGyGxGyGy",
            BuiltinModel::Std1qXyi => {
                "Gi,Gx,Gy,GxGy,GxGyGi,GxGiGy,GxGiGi,GyGiGi,GxGxGiGy,GxGyGyGi,GxGxGyGxGyGy"
            }
        }
    }
}

/// Model and candidate selection shared by all germ commands.
#[derive(clap::Args)]
struct Problem {
    /// Built-in gate model
    #[arg(short, long, value_enum, default_value = "std1q_xy")]
    model: BuiltinModel,

    /// Comma-separated candidate germs (e.g. Gx,Gy,GxGy)
    #[arg(short, long)]
    germs: Option<String>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

impl Problem {
    fn germs(&self) -> Result<Vec<GateSequence>> {
        let list = self
            .germs
            .as_deref()
            .unwrap_or_else(|| self.model.default_germs());
        GateSequence::parse_list(list)
    }
}

/// Search overrides shared by `optimize` and `robust`.
#[derive(clap::Args)]
struct SearchArgs {
    /// Maximum search iterations
    #[arg(long)]
    max_iter: Option<usize>,

    /// Score mode (sum-reciprocal | worst-case)
    #[arg(long)]
    score_mode: Option<ScoreMode>,

    /// Constant slack added when relaxing
    #[arg(long, conflicts_with = "slack_frac")]
    fixed_slack: Option<f64>,

    /// Slack as a fraction of the current score
    #[arg(long)]
    slack_frac: Option<f64>,

    /// Allow dropping elementary gates
    #[arg(long)]
    no_force_singletons: bool,

    /// Cross-check bulk twirled derivatives
    #[arg(long)]
    check: bool,
}

impl SearchArgs {
    fn apply(&self, config: &mut Config) {
        let opt = &mut config.optimizer;
        if let Some(n) = self.max_iter {
            opt.max_iterations = n;
        }
        if let Some(mode) = self.score_mode {
            opt.score_mode = mode;
        }
        if let Some(v) = self.fixed_slack {
            opt.fixed_slack = Some(v);
            opt.slack_fraction = None;
        }
        if let Some(v) = self.slack_frac {
            opt.slack_fraction = Some(v);
            opt.fixed_slack = None;
        }
        if self.no_force_singletons {
            opt.force_singletons = false;
        }
        if self.check {
            opt.check = true;
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TestKind {
    /// Plain derivatives of germs repeated L times
    Finite,
    /// Twirled derivatives (L -> ∞)
    Asymptotic,
}

#[derive(Subcommand)]
enum Commands {
    /// Select a small complete germ set for one model
    Optimize {
        #[command(flatten)]
        problem: Problem,

        #[command(flatten)]
        search: SearchArgs,

        /// Initial inclusion vector as 0/1 digits (default: all candidates)
        #[arg(long)]
        initial: Option<String>,
    },

    /// Select germs that work for perturbed copies of a model
    Robust {
        #[command(flatten)]
        problem: Problem,

        #[command(flatten)]
        search: SearchArgs,

        /// Number of perturbed copies
        #[arg(long)]
        num_copies: Option<usize>,

        /// Seed of the first copy
        #[arg(long)]
        seed: Option<u64>,

        /// Perturbation strength
        #[arg(long)]
        strength: Option<f64>,
    },

    /// Test a germ set for completeness
    Test {
        #[command(flatten)]
        problem: Problem,

        #[arg(value_enum, default_value = "asymptotic")]
        kind: TestKind,

        /// Germ power for the finite test
        #[arg(long)]
        length: Option<usize>,

        /// Score threshold for the asymptotic test
        #[arg(long)]
        threshold: Option<f64>,

        /// Score mode for the asymptotic test
        #[arg(long)]
        score_mode: Option<ScoreMode>,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

/// JSON view of a germ selection.
#[derive(Serialize)]
struct SelectionOutput {
    germs: Vec<String>,
    weights: String,
    score: f64,
    iterations: usize,
    termination: Termination,
    scores_computed: usize,
}

impl From<&GermSelection> for SelectionOutput {
    fn from(s: &GermSelection) -> Self {
        Self {
            germs: s.germs.iter().map(ToString::to_string).collect(),
            weights: s.weights.to_string(),
            score: s.score,
            iterations: s.iterations,
            termination: s.termination,
            scores_computed: s.score_cache.len(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    // Initialize logging
    init_logging(&config.logging.level, config.logging.format == "json");

    match cli.command {
        Commands::Optimize {
            problem,
            search,
            initial,
        } => {
            search.apply(&mut config);
            config.validate()?;

            let model = problem.model.build();
            let germs = problem.germs()?;
            info!(version = VERSION, model = ?problem.model, candidates = germs.len(), "Optimizing germ set");

            let mut optimizer = GermSetOptimizer::new(config.optimizer.clone())?;
            if let Some(bits) = initial {
                optimizer = optimizer.with_initial_weights(parse_inclusion_bits(&bits)?);
            }
            let selection = optimizer.optimize(&model, &germs)?;
            print_selection(&selection, problem.json)?;
        }

        Commands::Robust {
            problem,
            search,
            num_copies,
            seed,
            strength,
        } => {
            search.apply(&mut config);
            if let Some(n) = num_copies {
                config.robust.num_copies = n;
            }
            if let Some(s) = seed {
                config.robust.seed = s;
            }
            if let Some(s) = strength {
                config.robust.randomization_strength = s;
            }
            config.validate()?;

            let germs = problem.germs()?;
            let models = RobustModels::Copies {
                base: problem.model.build(),
                num_copies: config.robust.num_copies,
            };
            match optimize_germ_set_robust(models, &germs, &config.optimizer, &config.robust)? {
                RobustOutcome::Selected(selection) => print_selection(&selection, problem.json)?,
                RobustOutcome::Infeasible {
                    model_index,
                    report,
                } => {
                    if problem.json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        eprintln!(
                            "Full germ set fails on model copy {} (score {:.6e}); aborting",
                            model_index, report.score
                        );
                    }
                    std::process::exit(1);
                }
            }
        }

        Commands::Test {
            problem,
            kind,
            length,
            threshold,
            score_mode,
        } => {
            if let Some(l) = length {
                config.completeness.finite_length = l;
            }
            if let Some(t) = threshold {
                config.completeness.threshold = t;
            }
            config.validate()?;

            let model = problem.model.build();
            let germs = problem.germs()?;
            let report = match kind {
                TestKind::Finite => test_germ_set_finite(
                    &model,
                    &germs,
                    config.completeness.finite_length,
                    None,
                    config.completeness.finite_tol,
                )?,
                TestKind::Asymptotic => test_germ_set_asymptotic(
                    &model,
                    &germs,
                    score_mode.unwrap_or(config.optimizer.score_mode),
                    None,
                    config.completeness.threshold,
                )?,
            };
            print_report(&report, problem.json)?;
            if !report.success {
                std::process::exit(1);
            }
        }

        Commands::Config => {
            // Show effective configuration
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => {
            // Validate configuration
            match config.validate() {
                Ok(()) => {
                    println!("Configuration is valid");
                }
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn print_selection(selection: &GermSelection, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SelectionOutput::from(selection))?
        );
        return Ok(());
    }
    println!("Selected {} germs:", selection.germs.len());
    for germ in &selection.germs {
        println!("  {}", germ);
    }
    println!("Weights:     {}", selection.weights);
    println!("Score:       {:.6e}", selection.score);
    println!(
        "Iterations:  {} ({:?})",
        selection.iterations, selection.termination
    );
    Ok(())
}

fn print_report(report: &CompletenessReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "Complete: {}  (score {:.6e}, {} gauge params)",
        if report.success { "yes" } else { "no" },
        report.score,
        report.num_gauge_params
    );
    let shown: Vec<String> = report.spectrum.iter().map(|l| format!("{:.3e}", l)).collect();
    println!("Spectrum: [{}]", shown.join(", "));
    Ok(())
}
