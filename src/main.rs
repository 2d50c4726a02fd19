use clap::Parser;
use ndarray::array;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use neuroevo::{Genome, NeatError, Params, Population};

/// Evolves a network that computes XOR.
#[derive(Parser, Debug)]
#[command(name = "neuroevo", version, long_about = None)]
struct Args {
    /// JSON parameter file; defaults are used for missing fields
    #[arg(short, long)]
    config: Option<String>,

    /// Resume from a population checkpoint instead of starting fresh
    #[arg(long)]
    resume: Option<String>,

    /// Maximum number of generations to run
    #[arg(short, long, default_value_t = 300)]
    generations: usize,

    /// Stop once the best fitness reaches this value (maximum is 4.0)
    #[arg(long, default_value_t = 3.9)]
    target: f64,

    /// Random seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write the champion genome here when the run ends
    #[arg(long)]
    save: Option<String>,

    /// Write a population checkpoint here when the run ends
    #[arg(long)]
    checkpoint: Option<String>,
}

const XOR_CASES: [([f32; 2], f32); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// 4 minus the summed squared error over the truth table.
fn xor_fitness(genome: &Genome) -> Result<f64, NeatError> {
    let mut network = genome.network();
    let mut error = 0.0;
    for (inputs, expected) in XOR_CASES {
        network.reset();
        let out = network.tick(&array![inputs[0], inputs[1]])?;
        error += f64::from((out[0] - expected).powi(2));
    }
    Ok(4.0 - error)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut population = if let Some(path) = &args.resume {
        info!(path = %path, "resuming from checkpoint");
        Population::load_from_file(path)?
    } else {
        let mut params = match &args.config {
            Some(path) => Params::load_from_file(path)?,
            None => Params::new(2, 1),
        };
        if args.seed.is_some() {
            params.seed = args.seed;
        }
        Population::new(params)?
    };

    for _ in 0..args.generations {
        let report = population.epoch(xor_fitness)?;
        if report.failures > 0 {
            warn!(failures = report.failures, "some genomes failed evaluation");
        }
        if report.best_fitness >= args.target {
            info!(
                generation = report.generation,
                fitness = report.best_fitness,
                "target reached"
            );
            break;
        }
    }

    if let Some(champion) = population.champion() {
        info!(
            fitness = champion.fitness,
            nodes = champion.node_count(),
            connections = champion.enabled_connections().count(),
            "champion"
        );
        let mut network = champion.network();
        for (inputs, expected) in XOR_CASES {
            network.reset();
            let out = network.tick(&array![inputs[0], inputs[1]])?;
            println!("{:?} -> {:.3} (expected {})", inputs, out[0], expected);
        }
        if let Some(path) = &args.save {
            champion.save_to_file(path)?;
            info!(path = %path, "champion saved");
        }
    }

    if let Some(path) = &args.checkpoint {
        population.save_to_file(path)?;
        info!(path = %path, "checkpoint saved");
    }

    Ok(())
}
