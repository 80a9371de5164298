//! Evorun CLI - Run an evolutionary search from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use evorun::{
    engine::EvolutionEngine,
    problem::builtin_problem,
    schema::{RunConfig, RunResult},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [problem] [dims]", args[0]);
        eprintln!();
        eprintln!("Run an evolutionary search from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!("  problem      parabola, rastrigin or inversions (default: parabola)");
        eprintln!("  dims         Problem dimension (default: 2)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let problem_name = args.get(2).map(String::as_str).unwrap_or("parabola");
    let dims: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(2);

    let config = RunConfig::from_json_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    let problem = builtin_problem(problem_name, dims).unwrap_or_else(|| {
        eprintln!("Unknown problem: {}", problem_name);
        std::process::exit(1);
    });

    println!("Evorun");
    println!("======");
    println!("Problem: {}", problem.name());
    println!("Algorithm: {}", config.algorithm);
    println!(
        "Population: {}, generations: {}",
        config.basic.popsize, config.basic.generations
    );
    println!(
        "Orientation: {}",
        if config.basic.max { "maximize" } else { "minimize" }
    );
    println!("Execution: {:?}", config.execution.model);
    println!();

    let mut engine = EvolutionEngine::new(problem, config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    println!("Running...");
    let start = Instant::now();

    let result = engine
        .run_with_callback(|progress| {
            // Print progress every 10%
            let every = (progress.total_generations / 10).max(1);
            if progress.generation % every == 0 {
                println!(
                    "  Generation {}/{}: best={:.6}, mean fitness={:.6}, T={:.4}, failures={}",
                    progress.generation,
                    progress.total_generations,
                    progress.best_value,
                    progress.statistics.mean,
                    progress.temperature,
                    progress.failures
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        });

    print_summary(&result, start.elapsed().as_secs_f32());
}

fn print_summary(result: &RunResult, seconds: f32) {
    let solution = &result.solution;

    println!();
    println!("Result:");
    println!("  Stop reason: {:?}", result.stop_reason);
    println!("  Generations: {}", result.generations);
    println!("  Best value: {:.6}", solution.value);
    if let Some(phenotype) = &solution.phenotype {
        println!("  Phenotype: {:?}", phenotype);
    }
    if solution.ties > 1 {
        println!("  Equally best genes: {}", solution.ties);
    }
    println!("  Failed evaluations: {}", result.failures);
    println!(
        "  Evaluations: {} ({:.1}/s)",
        result.timings.evaluations,
        result.timings.evaluations as f32 / seconds.max(f32::EPSILON)
    );
    if let Some(path) = &result.output_path {
        println!("  Written to: {}", path.display());
    }
    println!();
    println!("Replay seed: {}", result.seed);
    match result.replay_json() {
        Ok(json) => {
            println!("Replay configuration:");
            println!("{}", json);
        }
        Err(e) => eprintln!("Error serializing replay configuration: {}", e),
    }
    println!("Time: {:.2}s", seconds);
}

fn print_example_config() {
    let config = RunConfig::default();

    println!("Example configuration (config.json):");
    match config.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing configuration: {}", e),
    }
}
