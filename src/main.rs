//! TC-TSP Solver - Command Line Interface
//!
//! Pricing and column generation for the time-constrained TSP over a
//! time-expanded network.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tc_tsp_solver::colgen::ColumnGenerationConfig;
use tc_tsp_solver::exact::{solve_root, GurobiConfig};
use tc_tsp_solver::heuristics::{ConstructionHeuristic, MultiStartConstruction, NearestNeighborHeuristic};
use tc_tsp_solver::instance::Instance;
use tc_tsp_solver::master::InMemoryMaster;
use tc_tsp_solver::pricing::{build_pricer, DualValues, PathRestriction, PricerKind, PricingConfig, PricingManager};
use tc_tsp_solver::timed::TimeExpandedGraph;

use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "tc-tsp-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Branch-and-price pricing for the time-constrained TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an instance and its time expansion
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Override the time horizon
        #[arg(long)]
        horizon: Option<u32>,
    },

    /// Build an initial tour
    Construct {
        #[arg(short, long)]
        instance: PathBuf,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Randomized multi-start instead of a single nearest neighbor run
        #[arg(long)]
        randomized: bool,

        #[arg(long)]
        horizon: Option<u32>,

        /// Output tour to file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run one pricing round against given duals
    Price {
        #[arg(short, long)]
        instance: PathBuf,

        /// JSON file with one dual price per original edge
        #[arg(short, long)]
        duals: Option<PathBuf>,

        /// Objective value of the LP the duals come from
        #[arg(long, default_value = "0")]
        objective: f64,

        #[arg(short, long, value_enum, default_value = "path")]
        pricer: Pricer,

        #[arg(short, long, value_enum, default_value = "acyclic")]
        restriction: Restriction,

        /// Lookback window of the acyclic restriction
        #[arg(long, default_value = "3")]
        lookback: usize,

        /// Treat the duals as Farkas multipliers
        #[arg(long)]
        farkas: bool,

        /// JSON pricing configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        horizon: Option<u32>,

        /// Output round summary to file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Column generation at the root node (requires the gurobi feature)
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        #[arg(short, long, value_enum, default_value = "stabilized")]
        pricer: Pricer,

        #[arg(short, long, value_enum, default_value = "acyclic")]
        restriction: Restriction,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of column generation rounds
        #[arg(long, default_value = "500")]
        max_rounds: usize,

        /// Time limit per LP solve in seconds
        #[arg(short, long, default_value = "60")]
        time_limit: f64,

        #[arg(long)]
        horizon: Option<u32>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose solver output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Pricer {
    /// Label-correcting path search
    Path,
    /// Top instances per original edge
    Edge,
    /// Path search with dual smoothing
    Stabilized,
}

impl From<Pricer> for PricerKind {
    fn from(p: Pricer) -> Self {
        match p {
            Pricer::Path => PricerKind::Path,
            Pricer::Edge => PricerKind::Edge,
            Pricer::Stabilized => PricerKind::Stabilized,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Restriction {
    /// No revisit within the lookback window
    Acyclic,
    /// No revisit at all
    HoleFree,
    /// No immediate return
    TwoCycleFree,
}

#[derive(Serialize)]
struct RoundSummary {
    instance: String,
    pricer: String,
    farkas: bool,
    new_variables: usize,
    found_columns: bool,
    lower_bound: Option<f64>,
    variables: usize,
    flow_constraints: usize,
    coefficients: usize,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { instance, horizon } => {
            analyze_instance(&instance, horizon);
        }

        Commands::Construct { instance, seed, randomized, horizon, output } => {
            construct_tour(&instance, seed, randomized, horizon, output);
        }

        Commands::Price { instance, duals, objective, pricer, restriction, lookback, farkas, config, horizon, output } => {
            let config = pricing_config(config.as_deref(), restriction, lookback);
            price_round(&instance, duals, objective, pricer, &config, farkas, horizon, output);
        }

        Commands::Solve { instance, pricer, restriction, config, max_rounds, time_limit, horizon, output, verbose } => {
            let config = pricing_config(config.as_deref(), restriction, 3);
            let colgen = ColumnGenerationConfig { max_rounds, ..Default::default() };
            let gurobi = GurobiConfig { time_limit, verbose, ..Default::default() };
            solve_instance(&instance, pricer, &config, &colgen, &gurobi, horizon, output);
        }
    }
}

fn load_instance(path: &Path, horizon: Option<u32>) -> Instance {
    let mut instance = match Instance::from_file(path) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(horizon) = horizon {
        instance.horizon = horizon;
    }
    instance
}

fn pricing_config(path: Option<&Path>, restriction: Restriction, lookback: usize) -> PricingConfig {
    let mut config = match path {
        Some(path) => {
            let loaded = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {:?}: {}", path, e))
                .and_then(|text| PricingConfig::from_json(&text));
            match loaded {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error loading configuration: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => PricingConfig::default(),
    };

    config.path.restriction = match restriction {
        Restriction::Acyclic => PathRestriction::Acyclic { lookback },
        Restriction::HoleFree => PathRestriction::HoleFree,
        Restriction::TwoCycleFree => PathRestriction::TwoCycleFree,
    };
    config
}

fn load_duals(path: &Path, num_edges: usize) -> DualValues {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading duals: {}", e);
            std::process::exit(1);
        }
    };

    // Either a bare array or a serialized DualValues
    let duals = serde_json::from_str::<Vec<f64>>(&text)
        .map(DualValues::new)
        .or_else(|_| serde_json::from_str::<DualValues>(&text));
    match duals {
        Ok(duals) if duals.len() == num_edges => duals,
        Ok(duals) => {
            eprintln!("Expected {} dual values, got {}", num_edges, duals.len());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error parsing duals: {}", e);
            std::process::exit(1);
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    let written = serde_json::to_string_pretty(value)
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
    match written {
        Ok(()) => println!("Written to {:?}", path),
        Err(e) => eprintln!("Failed to write output: {}", e),
    }
}

fn analyze_instance(path: &Path, horizon: Option<u32>) {
    let instance = load_instance(path, horizon);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let instance = Arc::new(instance);
    let graph = TimeExpandedGraph::from_instance(instance.clone());
    let reachable = (0..instance.dimension).filter(|&v| !graph.departures(v).is_empty()).count();

    println!("\nTime Expansion:");
    println!("  Horizon: {}", graph.horizon());
    println!("  Timed vertices: {}", graph.num_timed_vertices());
    println!("  Timed edges: {}", graph.num_timed_edges());
    println!("  Reachable vertices: {}/{}", reachable, instance.dimension);

    let nn = NearestNeighborHeuristic::new().construct(&instance);
    let multi = MultiStartConstruction::default().construct(&instance);

    println!("\nQuick Solution Estimates:");
    println!("  Nearest Neighbor: {:.2} (feasible: {})", nn.cost, nn.feasible);
    println!("  Multi-Start: {:.2} (feasible: {})", multi.cost, multi.feasible);
}

fn construct_tour(path: &Path, seed: u64, randomized: bool, horizon: Option<u32>, output: Option<PathBuf>) {
    let instance = load_instance(path, horizon);

    let tour = if randomized {
        MultiStartConstruction::with_seeds(seed, 16).construct(&instance)
    } else {
        NearestNeighborHeuristic::new().construct(&instance)
    };
    println!("{}", tour);

    if let Some(out_path) = output {
        write_json(&out_path, &tour);
    }
}

#[allow(clippy::too_many_arguments)]
fn price_round(
    path: &Path,
    duals: Option<PathBuf>,
    objective: f64,
    pricer: Pricer,
    config: &PricingConfig,
    farkas: bool,
    horizon: Option<u32>,
    output: Option<PathBuf>,
) {
    let instance = Arc::new(load_instance(path, horizon));
    let num_edges = instance.num_edges();
    let duals = duals.map_or_else(|| DualValues::zeros(num_edges), |p| load_duals(&p, num_edges));

    let initial = MultiStartConstruction::default().construct(&instance);
    if !initial.feasible {
        eprintln!("No feasible initial tour for {}", instance.name);
        std::process::exit(1);
    }

    let mut master = InMemoryMaster::for_instance(&instance);
    master.set_objective(objective);
    if farkas {
        master.set_farkas_duals(duals);
    } else {
        master.set_duals(duals);
    }

    let graph = Arc::new(TimeExpandedGraph::from_instance(instance.clone()));
    let kind = PricerKind::from(pricer);
    let mut manager = PricingManager::new(master, graph.clone(), build_pricer(kind, graph, config), initial, config.manager.clone());

    // the first Farkas call only injects the initial tour
    let outcome = manager
        .init()
        .and_then(|_| manager.farkas_pricing())
        .and_then(|_| if farkas { manager.farkas_pricing() } else { manager.reduced_cost_pricing() });
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Pricing failed: {}", e);
            std::process::exit(1);
        }
    };

    let summary = RoundSummary {
        instance: instance.name.clone(),
        pricer: format!("{:?}", kind),
        farkas,
        new_variables: outcome.new_variables,
        found_columns: outcome.found_columns,
        lower_bound: outcome.lower_bound,
        variables: manager.num_variables(),
        flow_constraints: manager.num_flow_constraints(),
        coefficients: manager.master().num_coefficients(),
    };

    println!("Pricing round ({:?}, {})", kind, if farkas { "Farkas" } else { "reduced cost" });
    println!("  New variables: {}", summary.new_variables);
    println!("  Lower bound: {:?}", summary.lower_bound);
    println!("  Variables: {}", summary.variables);
    println!("  Flow constraints: {}", summary.flow_constraints);

    if let Some(out_path) = output {
        write_json(&out_path, &summary);
    }
}

fn solve_instance(
    path: &Path,
    pricer: Pricer,
    config: &PricingConfig,
    colgen: &ColumnGenerationConfig,
    gurobi: &GurobiConfig,
    horizon: Option<u32>,
    output: Option<PathBuf>,
) {
    let instance = load_instance(path, horizon);
    println!("Solving {} ({} vertices, horizon {})", instance.name, instance.dimension, instance.horizon);

    match solve_root(&instance, gurobi, PricerKind::from(pricer), config, colgen) {
        Ok(result) => {
            println!("{}", result.report);
            if let Some(value) = result.integer_objective {
                println!("Integer restricted master: {:.2}", value);
            }
            if let Some(out_path) = output {
                write_json(&out_path, &result);
            }
        }
        Err(e) => {
            eprintln!("Solve failed: {}", e);
            std::process::exit(1);
        }
    }
}
