//! Wellfield CLI - Run placement scenarios from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;

use wellfield::{
    compute::{ExtractionEstimate, ExtractionModel, placement::PlacementEngine},
    record::{self, GenerationRecorder, RecorderConfig},
    schema::Scenario,
};

#[derive(Serialize)]
struct RunReport<'a> {
    scenario: &'a Scenario,
    field_seed: u64,
    result: &'a wellfield::PlacementResult,
    extraction: &'a ExtractionEstimate,
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <scenario.json> [--record <run.wgen>] [--output <result.json>]", program);
    eprintln!();
    eprintln!("Run evolutionary well placement from a JSON scenario.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  scenario.json  Path to scenario configuration file");
    eprintln!("  --record       Write every generation to a binary record file");
    eprintln!("  --output       Write the final placement and estimate as JSON");
    eprintln!();
    eprintln!("Example configuration is generated with --example flag.");
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_scenario();
        return;
    }

    let scenario_path = PathBuf::from(&args[1]);
    let mut record_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;

    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        let target = match flag.as_str() {
            "--record" => &mut record_path,
            "--output" => &mut output_path,
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        };
        match rest.next() {
            Some(value) => *target = Some(PathBuf::from(value)),
            None => {
                eprintln!("Missing value for {}", flag);
                std::process::exit(1);
            }
        }
    }

    let scenario = Scenario::load(&scenario_path).unwrap_or_else(|e| {
        eprintln!("Error loading scenario: {}", e);
        std::process::exit(1);
    });

    let field_seed = scenario
        .field
        .seed
        .or(scenario.random_seed)
        .unwrap_or_else(rand::random);

    println!("Wellfield Placement");
    println!("===================");
    println!("Scenario: {}", scenario.name);
    println!(
        "Field: {}x{} {} (seed {}){}",
        scenario.field.size,
        scenario.field.size,
        scenario.field.kind.name(),
        field_seed,
        if scenario.field.geological_mask {
            " with geological mask"
        } else {
            ""
        }
    );
    println!("Wells: {}", scenario.wells);
    println!("Generations: {}", scenario.generations);
    println!("Mate policy: {} / centroid: {}", scenario.mate, scenario.centroid);
    println!();

    let field = record::load_or_generate(&scenario.field, field_seed).unwrap_or_else(|e| {
        eprintln!("Error preparing field: {}", e);
        std::process::exit(1);
    });
    let (lo, hi) = field.range();
    println!("Field value range: [{:.4}, {:.4}]", lo, hi);

    let mut recorder = record_path.as_ref().map(|path| {
        GenerationRecorder::create(path, field.size(), scenario.wells, RecorderConfig::default())
            .unwrap_or_else(|e| {
                eprintln!("Error creating record file: {}", e);
                std::process::exit(1);
            })
    });
    let mut record_error: Option<io::Error> = None;

    let mut engine = PlacementEngine::new(scenario.clone(), field).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("Running placement...");
    let progress_every = (scenario.generations / 10).max(1);
    let result = engine
        .run_with_callback(|record, _field| {
            if let Some(rec) = recorder.as_mut()
                && record_error.is_none()
                && let Err(e) = rec.record(record)
            {
                record_error = Some(e);
            }

            if (record.generation + 1) % progress_every == 0 {
                println!(
                    "  Generation {}/{}: best={:.4} mean={:.4} offspring={}",
                    record.generation + 1,
                    scenario.generations,
                    record.stats.best_fitness,
                    record.stats.mean_fitness,
                    record.offspring.len()
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    if let Some(e) = record_error {
        eprintln!("Error writing record file: {}", e);
        std::process::exit(1);
    }
    if let Some(rec) = recorder {
        match rec.finalize() {
            Ok(stats) => println!("Recorded {}", stats),
            Err(e) => {
                eprintln!("Error finalizing record file: {}", e);
                std::process::exit(1);
            }
        }
    }

    let extraction = ExtractionModel::default().estimate(engine.field(), &result.population);

    println!();
    println!("Final placement:");
    println!(
        "  Best well: ({}, {}) fitness {:.4}",
        result.best.point.row, result.best.point.col, result.best.fitness
    );
    println!("  Mean fitness: {:.4}", result.stats.final_mean_fitness);
    println!("  Wells placed: {}", result.population.len());
    println!(
        "  Estimated extractable lithium: {:.3} tonnes",
        extraction.total_tonnes
    );
    println!("Time: {:.2}s", result.stats.elapsed_seconds);

    if let Some(path) = output_path {
        let report = RunReport {
            scenario: &scenario,
            field_seed,
            result: &result,
            extraction: &extraction,
        };
        let written = serde_json::to_string_pretty(&report)
            .map_err(io::Error::from)
            .and_then(|json| fs::write(&path, json));
        if let Err(e) = written {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        }
        println!("Result written to {}", path.display());
    }
}

fn print_example_scenario() {
    let scenario = Scenario::default();

    println!("Example scenario (scenario.json):");
    match serde_json::to_string_pretty(&scenario) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
